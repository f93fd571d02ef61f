//! Random key generation for unset primary keys.

use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyOptions {
    /// Number of hex characters, hyphens excluded
    pub length: usize,
    pub hyphenate: bool,
    /// Characters per hyphen-separated group
    pub group_len: usize,
}

impl Default for KeyOptions {
    fn default() -> Self {
        Self {
            length: 32,
            hyphenate: false,
            group_len: 4,
        }
    }
}

impl KeyOptions {
    pub fn with_length(length: usize) -> Self {
        Self {
            length,
            ..Default::default()
        }
    }
}

/// Lowercase hex key drawn from UUID v4s, `options.length` characters long
/// before hyphenation.
pub fn generate_key(options: &KeyOptions) -> String {
    let mut hex = String::with_capacity(options.length + 32);
    while hex.len() < options.length {
        hex.push_str(&Uuid::new_v4().simple().to_string());
    }
    hex.truncate(options.length);

    if !options.hyphenate || options.group_len == 0 {
        return hex;
    }

    hex.as_bytes()
        .chunks(options.group_len)
        .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
        .collect::<Vec<_>>()
        .join("-")
}
