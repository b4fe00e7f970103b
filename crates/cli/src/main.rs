use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use booklove_cli::commands;
use booklove_cli::config::{CliConfig, DEFAULT_LOG_FILTER};

#[derive(Parser, Debug)]
#[command(author, version, about = "Inspect and migrate BookLove guest state", long_about = None)]
struct Args {
    /// Directory holding the guest state (overrides BOOKLOVE_STATE_DIR)
    #[arg(long, global = true)]
    state_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the stored guest state and its derived flags as JSON
    Inspect,
    /// Forget passed characters so they are dealt again
    Reset {
        /// Delete the whole guest state instead
        #[arg(long)]
        all: bool,
    },
    /// Copy the guest state into a user's account and clear it
    Migrate {
        #[arg(long)]
        user_id: Uuid,
    },
    /// Check database connectivity and apply pending migrations
    DbCheck,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    let mut config = CliConfig::from_env()?;
    if let Some(dir) = args.state_dir {
        config.state_dir = dir;
    }

    // --- Tracing ---
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());
    let json = config.log_json;
    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr)))
        .with((!json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)))
        .init();

    tracing::debug!(state_dir = %config.state_dir.display(), "Loaded CLI configuration");

    match args.command {
        Command::Inspect => {
            let store = commands::open_guest_store(&config.state_dir);
            let report = commands::inspect(&store);
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Reset { all } => {
            let store = commands::open_guest_store(&config.state_dir);
            let state = commands::reset(&store, all);
            println!("{}", serde_json::to_string_pretty(&state)?);
        }
        Command::Migrate { user_id } => {
            let store = commands::open_guest_store(&config.state_dir);
            let pool = connect(&config).await?;
            let report = commands::migrate(&store, pool, user_id)
                .await
                .with_context(|| format!("Failed to migrate guest state to user {user_id}"))?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::DbCheck => {
            let pool = connect(&config).await?;
            commands::db_check(&pool).await?;
            println!("ok");
        }
    }

    Ok(())
}

async fn connect(config: &CliConfig) -> anyhow::Result<booklove_db::DbPool> {
    let url = config.require_database_url()?;
    let pool = booklove_db::create_pool(url, config.db_max_connections)
        .await
        .context("Failed to connect to database")?;
    tracing::info!(max_connections = config.db_max_connections, "Database connection pool created");
    Ok(pool)
}
