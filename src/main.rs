use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tablemap::config::OrmConfig;
use tablemap::sql::{Statement, StatementKind};
use tablemap::warehouse::{ClickHouseProvider, ConnectionProvider, QueryExecutor, RecordingProvider};

/// tablemap - run SQL through the configured warehouse connection
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// YAML configuration file (defaults to TABLEMAP_* environment variables)
    #[arg(long, global = true)]
    config: Option<std::path::PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Execute one statement and print the resulting rows as JSON lines
    Exec {
        sql: String,

        /// Submit asynchronously, then collect the rows through the query handle
        #[arg(long = "async")]
        asynchronous: bool,

        /// Print the statement instead of sending it to the warehouse
        #[arg(long)]
        dry_run: bool,

        /// Per-statement timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,
    },
}

/// Statements that return rows; everything else runs as a command.
fn statement_kind(sql: &str) -> StatementKind {
    let first = sql
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();
    match first.as_str() {
        "select" | "with" | "show" | "describe" | "desc" | "explain" => StatementKind::Query,
        _ => StatementKind::Command,
    }
}

fn load_config(path: Option<&std::path::Path>) -> anyhow::Result<OrmConfig> {
    let config = match path {
        Some(path) => OrmConfig::from_yaml_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => OrmConfig::from_env().context("reading TABLEMAP_* environment")?,
    };
    Ok(config)
}

/// Loads `.env` (or `env_file`), then builds the logger from `RUST_LOG`.
fn logging(env_file: Option<&std::path::Path>) -> env_logger::Builder {
    // .env must be read before the filter is taken from the environment
    match env_file {
        Some(path) => dotenvy::from_path(path).ok(),
        None => dotenvy::dotenv().ok().map(|_| ()),
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging(None).init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Exec {
            sql,
            asynchronous,
            dry_run,
            timeout,
        } => {
            let recorder = RecordingProvider::new();
            let provider: Arc<dyn ConnectionProvider> = if dry_run {
                Arc::new(recorder.clone())
            } else {
                Arc::new(ClickHouseProvider::new(&config))
            };
            let executor = QueryExecutor::new(provider, config.query_timeout());
            let statement = Statement::raw(sql.clone(), statement_kind(&sql));
            let timeout = timeout.map(Duration::from_secs);

            let rows = if asynchronous {
                let handle = executor.execute_async(&statement, timeout).await?;
                log::info!("Submitted query {}", handle);
                executor.fetch_async_result(&handle).await?
            } else {
                executor.execute(&statement, timeout).await?
            };

            if dry_run {
                for recorded in recorder.statements() {
                    println!("{:?}\t{}", recorded.kind, recorded.sql);
                }
                return Ok(());
            }

            for row in &rows {
                println!("{}", serde_json::to_string(row)?);
            }
            log::info!("{} row(s)", rows.len());
        }
    }

    Ok(())
}
