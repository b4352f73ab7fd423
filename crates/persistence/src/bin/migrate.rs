#![deny(warnings)]

use anyhow::Context;
use persistence::default_sqlite_url;
use std::path::PathBuf;
use stock_core::Inventory;
use tracing_subscriber::EnvFilter;

/// Create the store and seed it from an inventory file.
///
/// Usage: migrate [INVENTORY] [DB_URL]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut args = std::env::args().skip(1);
    let inventory_path = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("assets/inventory.yaml"));
    let url = args.next().unwrap_or_else(|| default_sqlite_url().to_string());

    persistence::ensure_db_dir(&url)?;
    let inventory = Inventory::load(&inventory_path)
        .with_context(|| format!("loading {}", inventory_path.display()))?;
    let pool = persistence::init_db(&url).await?;
    persistence::upsert_species(&pool, &inventory.species).await?;
    let seeded = persistence::seed_lots_if_empty(&pool, &inventory.lots).await?;
    println!(
        "DB migrated at {} ({} species, {} lots seeded)",
        url,
        inventory.species.len(),
        seeded
    );
    Ok(())
}
