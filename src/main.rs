//! Vestibule - connection cache for credential sign-in services

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};

use vestibule::{
    config::Args,
    db::{MongoConnectionCache, MongoConnector},
    logging, ConnectionSettings,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    logging::init_tracing(&args.log_level, &args.log_format)?;

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    let cache = Arc::new(MongoConnectionCache::new(
        ConnectionSettings::from_args(&args),
        MongoConnector,
    ));
    if let Err(e) = cache.init() {
        error!("{}", e);
        std::process::exit(1);
    }

    let settings = cache.settings();
    info!("======================================");
    info!("  Vestibule");
    info!("======================================");
    info!("MongoDB: {}", vestibule::db::mongo::redact_uri(settings.target()?));
    info!("Fallback database: {}", settings.fallback_db);
    info!("Max pool size: {}", settings.max_pool_size);
    info!(
        "Timeouts: server selection {}ms, socket {}ms",
        settings.server_selection_timeout.as_millis(),
        settings.socket_timeout.as_millis()
    );
    info!("======================================");

    match cache.acquire().await {
        Ok(client) => info!("MongoDB ready (database '{}')", client.db_name()),
        Err(e) => {
            error!("MongoDB connection failed: {}", e);
            std::process::exit(1);
        }
    }

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");
    cache.shutdown().await;

    Ok(())
}
