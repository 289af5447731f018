//! Macsync CLI - keep a local SQLite snapshot of the NMDP MAC code list current

use clap::{Parser, Subcommand, ValueEnum};
use macsync::config::{MacsyncConfig, DEFAULT_CONFIG_FILE};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;

#[derive(Parser)]
#[command(name = "macsync")]
#[command(version)]
#[command(about = "Local, versioned SQLite snapshot of the NMDP MAC code list")]
#[command(long_about = r#"
Macsync keeps a SQLite copy of the NMDP MAC list (code -> subtype) and
brings it up to date with the fewest possible writes. Each run commits
once, or not at all.

Example usage:
  macsync init --database mac.db
  macsync sync --database mac.db --source alpha.v3.txt
  macsync lookup --database mac.db --code AB
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the config file (default: macsync.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = OutputMode::Human)]
    format: OutputMode,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an empty store
    Init {
        /// Path to the database file
        #[arg(short, long)]
        database: Option<PathBuf>,

        /// Also write a config file pointing at this store
        #[arg(long)]
        write_config: bool,

        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Reconcile the store with an extracted member file
    Sync {
        /// Path to the database file (created if missing)
        #[arg(short, long)]
        database: Option<PathBuf>,

        /// Path to the extracted member file
        #[arg(short, long)]
        source: Option<PathBuf>,

        /// Dataset member name the file is recorded under
        #[arg(short, long)]
        member: Option<String>,

        /// Member modification time, e.g. 2024-06-01T04:15:00 (default: file mtime)
        #[arg(long)]
        modified: Option<String>,
    },

    /// Show what the store holds
    Stats {
        /// Path to the database file
        #[arg(short, long)]
        database: Option<PathBuf>,
    },

    /// Print the subtype stored for a code
    Lookup {
        /// MAC code (case-sensitive)
        #[arg(short, long)]
        code: String,

        /// Path to the database file
        #[arg(short, long)]
        database: Option<PathBuf>,
    },

    /// Print version information
    Version,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputMode {
    Human,
    Json,
}

impl OutputMode {
    pub fn is_human(self) -> bool {
        self == OutputMode::Human
    }
}

/// Print a JSON envelope for `command` (no-op in human mode)
pub fn emit_success(
    output_mode: OutputMode,
    command: &str,
    data: serde_json::Value,
) -> anyhow::Result<()> {
    if output_mode == OutputMode::Json {
        let envelope = serde_json::json!({
            "ok": true,
            "command": command,
            "data": data,
        });
        println!("{}", serde_json::to_string_pretty(&envelope)?);
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let config = MacsyncConfig::load(cli.config.as_deref())?;
    let output_mode = cli.format;

    match cli.command {
        Commands::Init {
            database,
            write_config,
            force,
        } => {
            let database = config.database_path(database);
            let config_path = write_config.then(|| {
                cli.config
                    .clone()
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
            });
            commands::run_init(output_mode, &database, config_path.as_deref(), force)?;
        }

        Commands::Sync {
            database,
            source,
            member,
            modified,
        } => {
            let database = config.database_path(database);
            let source = config.source_path(source).ok_or_else(|| {
                anyhow::anyhow!("no source file given (use --source or set `source` in macsync.toml)")
            })?;
            let member = config.member_name(member);
            commands::run_sync(output_mode, &database, &source, &member, modified.as_deref())?;
        }

        Commands::Stats { database } => {
            commands::run_stats(output_mode, &config.database_path(database))?;
        }

        Commands::Lookup { code, database } => {
            commands::run_lookup(output_mode, &config.database_path(database), &code)?;
        }

        Commands::Version => {
            commands::run_version(output_mode)?;
        }
    }

    Ok(())
}
