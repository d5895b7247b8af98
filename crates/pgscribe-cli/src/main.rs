use std::io;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use pgscribe_export::{Error as ExportError, ExportConfig, PostgresExporter};
use thiserror::Error;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Error)]
enum CliError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("logging error: {0}")]
    Logging(String),
    #[error("unsupported engine: {0}")]
    UnsupportedEngine(String),
    #[error("export error: {0}")]
    Export(#[from] ExportError),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Parser, Debug)]
#[command(name = "pgscribe", version, about = "pgscribe CLI")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Export(ExportArgs),
}

#[derive(Args, Debug)]
struct ExportArgs {
    /// TOML configuration file.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Database connection string (flag form).
    #[arg(long, value_name = "CONNECTION_STRING", conflicts_with = "conn_pos")]
    conn: Option<String>,
    /// Database connection string (positional form).
    #[arg(value_name = "CONNECTION_STRING")]
    conn_pos: Option<String>,
    /// Database user name.
    #[arg(long)]
    username: Option<String>,
    /// Database password.
    #[arg(long)]
    password: Option<String>,
    /// Database name, when not taken from the connection string.
    #[arg(long)]
    database: Option<String>,
    /// Base name for the generated dump file, without extension.
    #[arg(long, value_name = "NAME")]
    output: Option<String>,
    /// Working directory for the dump and archive.
    #[arg(long, value_name = "DIR")]
    temp_dir: Option<PathBuf>,
    /// Emit plain CREATE statements without IF NOT EXISTS guards.
    #[arg(long, default_value_t = false)]
    no_if_not_exists: bool,
    /// Keep the archive and its directory after the run.
    #[arg(long, default_value_t = false)]
    preserve_archive: bool,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let cli = Cli::parse();
    init_logging()?;

    match cli.command {
        Command::Export(args) => run_export(args).await,
    }
}

async fn run_export(args: ExportArgs) -> Result<(), CliError> {
    let ExportArgs {
        config,
        conn,
        conn_pos,
        username,
        password,
        database,
        output,
        temp_dir,
        no_if_not_exists,
        preserve_archive,
    } = args;

    let mut export_config = match config {
        Some(path) => {
            let raw = std::fs::read_to_string(&path)?;
            toml::from_str::<ExportConfig>(&raw)
                .map_err(|err| CliError::InvalidConfig(format!("{}: {err}", path.display())))?
        }
        None => ExportConfig::default(),
    };

    if let Some(conn) = conn.or(conn_pos) {
        let engine = detect_engine(&conn)?;
        tracing::debug!(engine = %engine, "engine detected");
        export_config.database.connection_string = Some(conn);
    }
    if let Some(username) = username {
        export_config.database.username = Some(username);
    }
    if let Some(password) = password {
        export_config.database.password = Some(password);
    }
    if let Some(database) = database {
        export_config.database.name = Some(database);
    }
    if let Some(output) = output {
        export_config.output.sql_file_name = Some(output);
    }
    if let Some(temp_dir) = temp_dir {
        export_config.output.temp_dir = Some(temp_dir);
    }
    if no_if_not_exists {
        export_config.output.add_if_not_exists = false;
    }
    if preserve_archive {
        export_config.output.preserve_archive = true;
    }

    let mut exporter = PostgresExporter::new(export_config);
    exporter.export().await?;

    match exporter.archive_file() {
        Some(path) => tracing::info!(path = %path.display(), "export finished"),
        None if !exporter.sql_file_name().is_empty() => {
            tracing::info!("export finished, working files cleaned up")
        }
        None => tracing::warn!("export did not produce artifacts"),
    }

    Ok(())
}

fn init_logging() -> Result<(), CliError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let layer = tracing_subscriber::fmt::layer().with_writer(io::stderr);

    tracing_subscriber::registry()
        .with(filter)
        .with(layer)
        .try_init()
        .map_err(|err| CliError::Logging(err.to_string()))?;

    Ok(())
}

fn detect_engine(conn: &str) -> Result<&'static str, CliError> {
    if conn.starts_with("postgres://") || conn.starts_with("postgresql://") {
        Ok("postgres")
    } else {
        Err(CliError::UnsupportedEngine(conn.to_string()))
    }
}
