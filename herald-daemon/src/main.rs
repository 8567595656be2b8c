//! Sanctuary Herald daemon.
//!
//! A headless notification daemon that polls a Diablo IV world-event API and
//! announces events to subscribed Discord guilds.

mod config;
mod notices;
mod shutdown;

use clap::Parser;
use config::{ConfigLoader, get_database_url, get_discord_token};
use herald_core::discord::DiscordClient;
use herald_core::entities::{PgNotificationStore, PgSubscriberStore};
use herald_core::events::notify_request_channel;
use herald_core::processors::{Dispatcher, EventWatcher};
use herald_core::source::ArmoryClient;
use notices::PlainRenderer;
use sqlx::postgres::PgPoolOptions;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Sanctuary Herald - Diablo IV world-event notifications for Discord
#[derive(Parser, Debug)]
#[command(name = "herald-daemon")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "./herald-config.toml")]
    config: PathBuf,

    /// Run database migrations on startup
    #[arg(long, default_value = "false")]
    migrate: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    init_tracing();

    // Parse command line arguments
    let args = Args::parse();

    tracing::info!("Starting herald-daemon v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let loaded_config = ConfigLoader::new(&args.config).load().map_err(|e| {
        tracing::error!("Failed to load configuration: {}", e);
        e
    })?;
    tracing::info!("Configuration loaded from {:?}", args.config);

    // Secrets come from the environment first, then the config file
    let database_url = get_database_url().map_err(|e| {
        tracing::error!("DATABASE_URL environment variable not set");
        e
    })?;
    let discord_token = get_discord_token(loaded_config.discord.token.as_deref()).map_err(|e| {
        tracing::error!("Failed to resolve Discord token: {}", e);
        e
    })?;

    // Create database connection pool
    tracing::info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .map_err(|e| {
            tracing::error!("Failed to connect to database: {}", e);
            e
        })?;
    tracing::info!("Database connection established");

    // Run migrations if requested
    if args.migrate {
        tracing::info!("Running database migrations...");
        sqlx::migrate!("../migrations")
            .run(&db_pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to run migrations: {}", e);
                e
            })?;
        tracing::info!("Migrations completed successfully");
    }

    // Wire the processors together
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let (notify_tx, notify_rx) = notify_request_channel();

    let watcher = EventWatcher::new(
        ArmoryClient::new(loaded_config.source.base_url.clone()),
        PgNotificationStore::new(db_pool.clone()),
        notify_tx,
        Duration::from_secs(loaded_config.daemon.poll_interval_secs),
        shutdown_rx.clone(),
    );
    let dispatcher = Dispatcher::new(
        PgSubscriberStore::new(db_pool.clone()),
        PlainRenderer,
        DiscordClient::new(loaded_config.discord.api_base.clone(), discord_token),
        notify_rx,
        shutdown_rx,
    );

    let watcher_handle = tokio::spawn(watcher.run());
    let dispatcher_handle = tokio::spawn(dispatcher.run());

    // Wait for a shutdown signal, then drain the processors
    shutdown::shutdown_signal().await;
    let _ = shutdown_tx.send(true);
    let _ = watcher_handle.await;
    let _ = dispatcher_handle.await;

    // Close database connections gracefully
    tracing::info!("Closing database connections...");
    db_pool.close().await;
    tracing::info!("Daemon shutdown complete");

    Ok(())
}

/// Initialize the tracing subscriber with environment-based filtering.
fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
