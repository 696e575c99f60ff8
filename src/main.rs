mod config;
mod db;
mod error;
mod export;
mod fleet;
mod models;
mod scraper;
mod store;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::fleet::FleetOptions;
use crate::scraper::factory::PlatformRegistry;
use crate::scraper::location::LocationIntelligence;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("jobharvest=info")),
        )
        .init();

    let config = Config::parse();

    tracing::info!("Connecting to database...");
    let pool = db::create_pool(&config.database_url).await?;

    if config.run_migrations {
        tracing::info!("Running database migrations...");
        db::run_migrations(&pool).await?;
        tracing::info!("Migrations complete");
    }

    let registry = PlatformRegistry::new();
    let location = LocationIntelligence::from_config(&config)?;
    let options = FleetOptions::from_config(&config);

    let summary = fleet::run(&pool, &registry, &location, &options).await?;

    tracing::info!(
        "Fleet complete: {} boards scraped, {} failed, {} listings saved{}",
        summary.boards_scraped,
        summary.boards_failed,
        summary.listings_saved,
        if summary.cancelled { " (cancelled)" } else { "" }
    );
    for failure in &summary.failures {
        tracing::warn!("{failure}");
    }

    Ok(())
}
