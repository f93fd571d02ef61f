/// Parameter substitution and SQL escaping
///
/// Statements are built with `$name` placeholders and a map of bound values.
/// Rendering replaces every placeholder with a properly escaped literal, so no
/// caller-supplied value is ever concatenated into SQL text directly.
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, thiserror::Error)]
pub enum ParameterSubstitutionError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(String),

    #[error("Invalid parameter name: {0} (must be alphanumeric or underscore)")]
    InvalidParameterName(String),

    #[error("Unsupported parameter type for value: {0}")]
    UnsupportedType(String),
}

/// Escape a string value for use inside a single-quoted SQL literal
///
/// - Backslash \ escapes special characters
/// - Single quotes must be escaped as \'
/// - Backslashes must be escaped as \\
/// - Newlines, tabs, etc. must be escaped
pub fn escape_string(s: &str) -> String {
    s.replace('\\', "\\\\") // Must be first!
        .replace('\'', "\\'")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
        .replace('\t', "\\t")
        .replace('\0', "\\0")
}

/// Format a bound value as a SQL literal
///
/// Booleans render as `1`/`0`. Arrays and objects are rejected: membership
/// lists bind one placeholder per element.
pub fn format_parameter(value: &Value) -> Result<String, ParameterSubstitutionError> {
    match value {
        Value::String(s) => Ok(format!("'{}'", escape_string(s))),

        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(i.to_string())
            } else if let Some(u) = n.as_u64() {
                Ok(u.to_string())
            } else {
                match n.as_f64() {
                    Some(f) if f.is_finite() => Ok(f.to_string()),
                    _ => Err(ParameterSubstitutionError::UnsupportedType(format!(
                        "Non-finite number: {}",
                        n
                    ))),
                }
            }
        }

        Value::Bool(b) => Ok(if *b { "1".to_string() } else { "0".to_string() }),

        Value::Null => Ok("NULL".to_string()),

        Value::Array(_) | Value::Object(_) => Err(ParameterSubstitutionError::UnsupportedType(
            format!("Composite value cannot be bound as a scalar: {}", value),
        )),
    }
}

/// Validate parameter name (alphanumeric + underscore only)
fn is_valid_parameter_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_alphanumeric() || c == '_')
}

/// Substitute parameters in SQL string
///
/// Replaces all $paramName placeholders with properly escaped values.
///
/// # Errors
/// - `MissingParameter` if a placeholder is found but no value provided
/// - `InvalidParameterName` if a parameter name contains invalid characters
/// - `UnsupportedType` if a value cannot be formatted as SQL
///
/// # Example
/// ```ignore
/// use serde_json::json;
/// use std::collections::HashMap;
///
/// let mut params = HashMap::new();
/// params.insert("p0".to_string(), json!("alice@example.com"));
///
/// let sql = "select id from users WHERE email = $p0";
/// let result = substitute_parameters(sql, &params).unwrap();
/// // Result: "select id from users WHERE email = 'alice@example.com'"
/// ```
pub fn substitute_parameters(
    sql: &str,
    parameters: &HashMap<String, Value>,
) -> Result<String, ParameterSubstitutionError> {
    let mut result = String::with_capacity(sql.len() * 2); // Pre-allocate
    let mut chars = sql.chars().peekable();

    let mut in_literal = false;

    while let Some(ch) = chars.next() {
        // Text inside single-quoted literals is never a placeholder
        if in_literal {
            result.push(ch);
            match ch {
                '\\' => {
                    if let Some(escaped) = chars.next() {
                        result.push(escaped);
                    }
                }
                '\'' => in_literal = false,
                _ => {}
            }
        } else if ch == '\'' {
            in_literal = true;
            result.push(ch);
        } else if ch == '$' {
            // Found potential parameter
            let mut param_name = String::new();

            // Collect parameter name (alphanumeric + underscore)
            while let Some(&next_ch) = chars.peek() {
                if next_ch.is_alphanumeric() || next_ch == '_' {
                    param_name.push(next_ch);
                    chars.next();
                } else {
                    break;
                }
            }

            if param_name.is_empty() {
                // Just a lone $ character
                result.push('$');
            } else {
                if !is_valid_parameter_name(&param_name) {
                    return Err(ParameterSubstitutionError::InvalidParameterName(param_name));
                }

                match parameters.get(&param_name) {
                    Some(value) => {
                        let formatted = format_parameter(value)?;
                        result.push_str(&formatted);
                    }
                    None => {
                        return Err(ParameterSubstitutionError::MissingParameter(param_name));
                    }
                }
            }
        } else {
            result.push(ch);
        }
    }

    Ok(result)
}
