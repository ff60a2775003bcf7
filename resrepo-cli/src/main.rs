//! resrepo CLI - Command-line interface
//!
//! Thin front end over the resrepo library: scan a resource root, resolve
//! resources for a device configuration, list items, manage the persistent
//! cache and watch a tree for changes.

mod commands;
mod error;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use resrepo::logging::{init_logging, LoggingOptions, Verbosity};
use resrepo::RepositoryConfig;

use commands::common::{default_config_file, RepoOptions};
use error::CliError;

#[derive(Parser)]
#[command(name = "resrepo")]
#[command(about = "Inspect and resolve configuration-qualified resource trees", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Settings file (default: ~/.config/resrepo/config.ini)
    #[arg(long, global = true)]
    config_file: Option<PathBuf>,

    /// Do not read or write the persistent cache
    #[arg(long, global = true)]
    no_cache: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a resource root and summarize what it contains
    Scan {
        /// Resource root (the `res` directory)
        root: PathBuf,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Resolve resources for a device configuration
    Resolve {
        /// Resource root (the `res` directory)
        root: PathBuf,

        /// Qualifier string of the target configuration (e.g. fr-rCA-land-hdpi)
        #[arg(long = "config", default_value = "")]
        qualifiers: String,

        /// Only resolve resources of this type (e.g. string, drawable)
        #[arg(long = "type")]
        resource_type: Option<String>,

        /// Resolve a single resource; requires --type
        #[arg(long)]
        name: Option<String>,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// List the items of one resource type with their variants
    List {
        /// Resource root (the `res` directory)
        root: PathBuf,

        /// Resource type (e.g. string, layout)
        #[arg(long = "type")]
        resource_type: String,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Write the persistent cache for a resource root, or remove it
    Cache {
        /// Resource root (the `res` directory)
        root: PathBuf,

        /// Remove the cache file instead of writing it
        #[arg(long)]
        clear: bool,
    },

    /// Follow file system changes until Ctrl-C
    Watch {
        /// Resource root (the `res` directory)
        root: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Logging comes from the settings file too; a broken file is reported by
    // the command itself.
    let settings = cli
        .config_file
        .clone()
        .or_else(|| default_config_file().filter(|p| p.is_file()))
        .and_then(|p| RepositoryConfig::load(&p).ok())
        .unwrap_or_default();
    let log_guard = match init_logging(LoggingOptions {
        verbosity: Verbosity::from_flags(cli.verbose, cli.quiet),
        level: Some(settings.logging.level.clone()),
        directory: settings.logging.directory.clone(),
    }) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Warning: logging disabled: {}", e);
            None
        }
    };

    let repo = RepoOptions {
        config_file: cli.config_file,
        no_cache: cli.no_cache,
    };

    let result = run(cli.command, repo).await;
    if let Err(e) = result {
        eprintln!("Error: {}", e);
        drop(log_guard);
        std::process::exit(e.exit_code());
    }
}

async fn run(command: Commands, repo: RepoOptions) -> Result<(), CliError> {
    match command {
        Commands::Scan { root, json } => {
            commands::scan::run(commands::scan::ScanArgs { root, json, repo }).await
        }
        Commands::Resolve {
            root,
            qualifiers,
            resource_type,
            name,
            json,
        } => {
            commands::resolve::run(commands::resolve::ResolveArgs {
                root,
                qualifiers,
                resource_type,
                name,
                json,
                repo,
            })
            .await
        }
        Commands::List {
            root,
            resource_type,
            json,
        } => {
            commands::list::run(commands::list::ListArgs {
                root,
                resource_type,
                json,
                repo,
            })
            .await
        }
        Commands::Cache { root, clear } => {
            commands::cache::run(commands::cache::CacheArgs { root, clear, repo }).await
        }
        Commands::Watch { root } => {
            commands::watch::run(commands::watch::WatchArgs { root, repo }).await
        }
    }
}
