#![deny(warnings)]

//! Persistence layer: SQLite store for lots and species parameters.
//!
//! The engine never waits on this crate. Bulk weight updates reach the store
//! through [`SqliteSink`], which writes in the background and logs failures.

use chrono::NaiveDate;
pub use sqlx::sqlite::SqlitePool;
use rust_decimal::prelude::ToPrimitive;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::str::FromStr;
use std::sync::Mutex;
use stock_core::{
    BulkUpdate, BulkUpdateSink, CostParams, DefaultPrices, GrowthParams, Lot, LotId, NewLot,
    SizeClassKey, SpeciesKey, SpeciesSpec,
};
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Returns the default SQLite URL used for the local store.
pub fn default_sqlite_url() -> &'static str {
    "sqlite://./saves/aquastock.db"
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("stored value out of range: {0}")]
    OutOfRange(&'static str),
    #[error("unknown species: {0}")]
    UnknownSpecies(String),
    #[error("no tokio runtime available for background writes")]
    NoRuntime,
    #[error("stored session date is not a date: {0}")]
    BadDate(String),
    #[error("cannot create store directory: {0}")]
    Io(#[from] std::io::Error),
}

/// Create the directory holding a file-backed database. In-memory URLs are
/// left alone.
pub fn ensure_db_dir(url: &str) -> Result<(), StoreError> {
    let path = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))
        .map(|p| p.split('?').next().unwrap_or(p));
    if let Some(path) = path.filter(|p| !p.contains(":memory:")) {
        if let Some(parent) = std::path::Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
    }
    Ok(())
}

/// Open (creating if needed) the database at `url` and create the schema.
///
/// In-memory databases get a single connection so every query sees the
/// same data.
pub async fn init_db(url: &str) -> Result<SqlitePool, StoreError> {
    let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
    let max_connections = if url.contains(":memory:") { 1 } else { 5 };
    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await?;
    create_schema(&pool).await?;
    info!(url, "store ready");
    Ok(pool)
}

async fn create_schema(pool: &SqlitePool) -> Result<(), StoreError> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS species (
            key                TEXT PRIMARY KEY,
            name               TEXT NOT NULL,
            latin              TEXT,
            sort_order         INTEGER NOT NULL DEFAULT 0,
            cost_price_default REAL,
            sale_price_default REAL,
            growth_a           REAL NOT NULL,
            growth_k           REAL NOT NULL,
            cost_high          REAL NOT NULL,
            cost_min           REAL NOT NULL,
            cost_mature        REAL NOT NULL,
            optimal_weight     REAL NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS lots (
            id             INTEGER PRIMARY KEY AUTOINCREMENT,
            name           TEXT NOT NULL,
            species_key    TEXT NOT NULL,
            size_class_key TEXT NOT NULL,
            quantity       REAL NOT NULL DEFAULT 0,
            current_weight REAL NOT NULL DEFAULT 0,
            cost_price     REAL NOT NULL DEFAULT 0,
            sale_price     REAL NOT NULL DEFAULT 0,
            to_remove      INTEGER NOT NULL DEFAULT 0,
            updated_at     TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await?;
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS session (
            id    INTEGER PRIMARY KEY CHECK (id = 1),
            as_of TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

/// Calendar date the stored weights refer to, if one was ever saved.
pub async fn load_as_of(pool: &SqlitePool) -> Result<Option<NaiveDate>, StoreError> {
    let raw: Option<String> = sqlx::query_scalar("SELECT as_of FROM session WHERE id = 1")
        .fetch_optional(pool)
        .await?;
    raw.map(|s| s.parse().map_err(|_| StoreError::BadDate(s)))
        .transpose()
}

pub async fn save_as_of(pool: &SqlitePool, date: NaiveDate) -> Result<(), StoreError> {
    upsert_as_of(pool, date).await
}

async fn upsert_as_of<'e, E>(executor: E, date: NaiveDate) -> Result<(), StoreError>
where
    E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
    sqlx::query(
        "INSERT INTO session (id, as_of) VALUES (1, ?) ON CONFLICT(id) DO UPDATE SET as_of = excluded.as_of",
    )
    .bind(date.to_string())
    .execute(executor)
    .await?;
    Ok(())
}

/// Insert or replace species rows, keeping the given order.
pub async fn upsert_species(pool: &SqlitePool, species: &[SpeciesSpec]) -> Result<(), StoreError> {
    let mut tx = pool.begin().await?;
    for (order, s) in species.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO species (key, name, latin, sort_order, cost_price_default,
                                 sale_price_default, growth_a, growth_k, cost_high,
                                 cost_min, cost_mature, optimal_weight)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET
                name = excluded.name,
                latin = excluded.latin,
                sort_order = excluded.sort_order,
                cost_price_default = excluded.cost_price_default,
                sale_price_default = excluded.sale_price_default,
                growth_a = excluded.growth_a,
                growth_k = excluded.growth_k,
                cost_high = excluded.cost_high,
                cost_min = excluded.cost_min,
                cost_mature = excluded.cost_mature,
                optimal_weight = excluded.optimal_weight
            "#,
        )
        .bind(&s.key.0)
        .bind(&s.name)
        .bind(&s.latin)
        .bind(order as i64)
        .bind(s.default_prices.map(|p| p.cost_price_per_kg))
        .bind(s.default_prices.map(|p| p.sale_price_per_kg))
        .bind(s.growth.asymptotic_weight_g)
        .bind(s.growth.rate_k)
        .bind(s.cost.cost_high)
        .bind(s.cost.cost_min)
        .bind(s.cost.cost_mature)
        .bind(s.cost.optimal_weight_g)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;
    Ok(())
}

/// Species in display order.
pub async fn load_species_params(pool: &SqlitePool) -> Result<Vec<SpeciesSpec>, StoreError> {
    let rows = sqlx::query("SELECT * FROM species ORDER BY sort_order, key")
        .fetch_all(pool)
        .await?;
    rows.iter().map(species_from_row).collect()
}

fn species_from_row(row: &SqliteRow) -> Result<SpeciesSpec, StoreError> {
    let cost_default: Option<f64> = row.try_get("cost_price_default")?;
    let sale_default: Option<f64> = row.try_get("sale_price_default")?;
    Ok(SpeciesSpec {
        key: SpeciesKey(row.try_get("key")?),
        name: row.try_get("name")?,
        latin: row.try_get("latin")?,
        default_prices: cost_default.zip(sale_default).map(|(c, s)| DefaultPrices {
            cost_price_per_kg: c,
            sale_price_per_kg: s,
        }),
        growth: GrowthParams {
            asymptotic_weight_g: row.try_get("growth_a")?,
            rate_k: row.try_get("growth_k")?,
        },
        cost: CostParams {
            cost_high: row.try_get("cost_high")?,
            cost_min: row.try_get("cost_min")?,
            cost_mature: row.try_get("cost_mature")?,
            optimal_weight_g: row.try_get("optimal_weight")?,
        },
    })
}

/// Store new growth and cost parameters for one species.
pub async fn update_species(
    pool: &SqlitePool,
    key: &SpeciesKey,
    growth: &GrowthParams,
    cost: &CostParams,
) -> Result<(), StoreError> {
    let done = sqlx::query(
        r#"
        UPDATE species SET growth_a = ?, growth_k = ?, cost_high = ?, cost_min = ?,
                           cost_mature = ?, optimal_weight = ?
        WHERE key = ?
        "#,
    )
    .bind(growth.asymptotic_weight_g)
    .bind(growth.rate_k)
    .bind(cost.cost_high)
    .bind(cost.cost_min)
    .bind(cost.cost_mature)
    .bind(cost.optimal_weight_g)
    .bind(&key.0)
    .execute(pool)
    .await?;
    if done.rows_affected() == 0 {
        return Err(StoreError::UnknownSpecies(key.0.clone()));
    }
    info!(species = %key.0, "species parameters stored");
    Ok(())
}

/// Insert the given lots, ids included, when the table is empty.
/// Returns the number of lots inserted.
pub async fn seed_lots_if_empty(pool: &SqlitePool, lots: &[Lot]) -> Result<usize, StoreError> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM lots")
        .fetch_one(pool)
        .await?;
    if count > 0 {
        debug!(count, "lots already present, seeding skipped");
        return Ok(0);
    }
    let mut tx = pool.begin().await?;
    for lot in lots {
        let id = i64::try_from(lot.id.0).map_err(|_| StoreError::OutOfRange("lot id"))?;
        sqlx::query(
            r#"
            INSERT INTO lots (id, name, species_key, size_class_key, quantity,
                              current_weight, cost_price, sale_price, to_remove)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(id)
        .bind(&lot.name)
        .bind(&lot.species.0)
        .bind(&lot.size_class.0)
        .bind(lot.quantity)
        .bind(lot.current_weight_g)
        .bind(lot.cost_price_per_kg)
        .bind(lot.sale_price_per_kg)
        .bind(lot.to_remove)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;
    info!(lots = lots.len(), "lots seeded");
    Ok(lots.len())
}

/// Insert a lot and return the id the store allocated.
pub async fn insert_lot(pool: &SqlitePool, lot: &NewLot) -> Result<LotId, StoreError> {
    let done = sqlx::query(
        r#"
        INSERT INTO lots (name, species_key, size_class_key, quantity,
                          current_weight, cost_price, sale_price)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&lot.name)
    .bind(&lot.species.0)
    .bind(&lot.size_class.0)
    .bind(lot.quantity)
    .bind(lot.current_weight_g)
    .bind(lot.cost_price_per_kg)
    .bind(lot.sale_price_per_kg)
    .execute(pool)
    .await?;
    let id = u64::try_from(done.last_insert_rowid()).map_err(|_| StoreError::OutOfRange("lot id"))?;
    Ok(LotId(id))
}

pub async fn delete_lot(pool: &SqlitePool, id: LotId) -> Result<bool, StoreError> {
    let id = i64::try_from(id.0).map_err(|_| StoreError::OutOfRange("lot id"))?;
    let done = sqlx::query("DELETE FROM lots WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(done.rows_affected() > 0)
}

/// Every lot, ordered by id.
pub async fn load_lots(pool: &SqlitePool) -> Result<Vec<Lot>, StoreError> {
    let rows = sqlx::query("SELECT * FROM lots ORDER BY id")
        .fetch_all(pool)
        .await?;
    rows.iter().map(lot_from_row).collect()
}

fn lot_from_row(row: &SqliteRow) -> Result<Lot, StoreError> {
    let id: i64 = row.try_get("id")?;
    Ok(Lot {
        id: LotId(u64::try_from(id).map_err(|_| StoreError::OutOfRange("lot id"))?),
        name: row.try_get("name")?,
        species: SpeciesKey(row.try_get("species_key")?),
        size_class: SizeClassKey(row.try_get("size_class_key")?),
        quantity: row.try_get("quantity")?,
        current_weight_g: row.try_get("current_weight")?,
        cost_price_per_kg: row.try_get("cost_price")?,
        sale_price_per_kg: row.try_get("sale_price")?,
        to_remove: row.try_get("to_remove")?,
    })
}

/// Apply a bulk weight update in one transaction, together with its date
/// when it carries one. Rows with unknown ids are skipped. Returns the number
/// of rows updated.
pub async fn apply_bulk_update(pool: &SqlitePool, update: &BulkUpdate) -> Result<u64, StoreError> {
    let mut tx = pool.begin().await?;
    let mut updated = 0;
    for row in &update.lots {
        let id = i64::try_from(row.id.0).map_err(|_| StoreError::OutOfRange("lot id"))?;
        let weight = row
            .current_weight_g
            .to_f64()
            .ok_or(StoreError::OutOfRange("current weight"))?;
        let done = sqlx::query(
            "UPDATE lots SET current_weight = ?, to_remove = ?, updated_at = datetime('now') WHERE id = ?",
        )
        .bind(weight)
        .bind(row.to_remove)
        .bind(id)
        .execute(&mut *tx)
        .await?;
        updated += done.rows_affected();
    }
    if let Some(date) = update.as_of {
        upsert_as_of(&mut *tx, date).await?;
    }
    tx.commit().await?;
    info!(rows = updated, lots = update.len(), "bulk update stored");
    Ok(updated)
}

/// Background writer for bulk updates.
///
/// `submit` spawns the write on the runtime captured at construction and
/// returns at once; failures are logged and dropped. [`SqliteSink::flush`]
/// waits for the writes still in flight.
pub struct SqliteSink {
    pool: SqlitePool,
    runtime: Handle,
    pending: Mutex<Vec<JoinHandle<()>>>,
}

impl SqliteSink {
    /// Must be called from within a tokio runtime.
    pub fn new(pool: SqlitePool) -> Result<Self, StoreError> {
        let runtime = Handle::try_current().map_err(|_| StoreError::NoRuntime)?;
        Ok(Self {
            pool,
            runtime,
            pending: Mutex::new(Vec::new()),
        })
    }

    /// Wait for every submitted write. Returns how many of them completed.
    pub async fn flush(&self) -> usize {
        let handles: Vec<_> = self
            .pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .drain(..)
            .collect();
        let mut done = 0;
        for handle in handles {
            match handle.await {
                Ok(()) => done += 1,
                Err(err) => warn!(%err, "bulk update task aborted"),
            }
        }
        done
    }
}

impl BulkUpdateSink for SqliteSink {
    fn submit(&self, update: BulkUpdate) {
        let pool = self.pool.clone();
        let handle = self.runtime.spawn(async move {
            if let Err(err) = apply_bulk_update(&pool, &update).await {
                warn!(%err, lots = update.len(), "bulk update not stored, in-memory state kept");
            }
        });
        self.pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(handle);
    }
}
