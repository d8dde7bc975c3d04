#![forbid(unsafe_code)]

use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use trail_core::config::AppConfig;
use trail_core::db::open_store;

use trail_server::seed;
use trail_server::serve::{self, AppState};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "trail: workflow backend with a built-in audit trail",
    long_about = None
)]
struct Cli {
    /// Path to the configuration file.
    #[arg(short, long, global = true, default_value = "trail.toml")]
    config: PathBuf,

    /// Override the store database path from the config.
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        about = "Initialize the store database",
        after_help = "EXAMPLES:\n    # Create trail.sqlite3 with the latest schema\n    trail init\n\n    # Use an explicit store path\n    trail --db /var/lib/trail/trail.sqlite3 init"
    )]
    Init,

    #[command(
        about = "Run the HTTP API server",
        after_help = "EXAMPLES:\n    # Serve on the configured bind address\n    trail serve\n\n    # Override the bind address\n    trail serve --bind 0.0.0.0:9000"
    )]
    Serve {
        /// Override the bind address from the config.
        #[arg(long)]
        bind: Option<String>,
    },

    #[command(
        about = "Load demo users and entities into the store",
        after_help = "EXAMPLES:\n    # Populate a fresh store with demo data\n    trail init && trail seed"
    )]
    Seed,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("TRAIL_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if env::var("DEBUG").is_ok() {
            "trail=debug,info"
        } else {
            "trail=info,warn"
        })
    });

    let format = env::var("TRAIL_LOG_FORMAT").unwrap_or_else(|_| "compact".to_owned());

    let registry = tracing_subscriber::registry().with(filter);
    if format == "json" {
        registry.with(fmt::layer().json().with_ansi(false)).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    if cli.verbose {
        info!("Verbose mode enabled");
    }

    let mut config = AppConfig::load(&cli.config)?;
    if let Some(db) = cli.db {
        config.store.path = db;
    }

    match cli.command {
        Commands::Init => {
            let _conn = open_store(&config.store.path)?;
            info!(path = %config.store.path.display(), "store initialized");
        }
        Commands::Serve { bind } => {
            let conn = open_store(&config.store.path)?;
            let state = Arc::new(AppState::new(
                conn,
                config.server.per_page_default,
                config.server.per_page_max,
            ));
            let bind = bind.unwrap_or(config.server.bind);
            serve::run(&bind, state).await?;
        }
        Commands::Seed => {
            let conn = open_store(&config.store.path)?;
            seed::run(&conn)?;
            info!(path = %config.store.path.display(), "demo data loaded");
        }
    }

    Ok(())
}
