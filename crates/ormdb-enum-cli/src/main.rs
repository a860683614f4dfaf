//! ORMDB Enum Command-Line Inspector
//!
//! Loads lookup tables and host declarations from a JSON fixture and runs a
//! single command against them.

mod commands;
mod formatter;
mod workspace;

use std::path::PathBuf;

use clap::Parser;
use commands::Command;
use formatter::OutputFormat;
use ormdb_enum::CacheConfig;
use tracing_subscriber::EnvFilter;
use workspace::Workspace;

/// ORMDB Enum Command-Line Inspector
#[derive(Parser, Debug)]
#[command(name = "ormdb-enum")]
#[command(version, about = "Inspect ORMDB lookup-table enumerations")]
pub struct Args {
    /// JSON fixture with lookup tables and host declarations
    #[arg(short = 'f', long)]
    pub fixture: PathBuf,

    /// Output format
    #[arg(long, default_value = "table", value_enum)]
    pub format: OutputFormat,

    /// Match row names case-sensitively
    #[arg(long)]
    pub case_sensitive: bool,

    #[command(subcommand)]
    pub command: Command,
}

fn main() {
    // Logs go to stderr so JSON output stays parseable
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ormdb_enum=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let formatter = formatter::create_formatter(args.format);

    match run(&args) {
        Ok(output) => println!("{}", output),
        Err(e) => {
            eprintln!("{}", formatter.format_error(&e.to_string()));
            std::process::exit(1);
        }
    }
}

fn run(args: &Args) -> Result<String, commands::CommandError> {
    let config = if args.case_sensitive {
        CacheConfig::new().case_sensitive()
    } else {
        CacheConfig::new()
    };

    let workspace = Workspace::load(&args.fixture, config)?;
    tracing::debug!(fixture = %workspace.path().display(), command = ?args.command, "Running command");

    let formatter = formatter::create_formatter(args.format);
    commands::execute(&workspace, &args.command, &*formatter)
}
