#![deny(warnings)]

//! Headless CLI: load an inventory, move its clock, print the stock report.

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use persistence::SqlitePool;
use std::path::PathBuf;
use stock_core::{Inventory, LotId, Registry};
use stock_sim::{
    advance, advance_and_report, chart_series, report, SimContext, StockReport, WindowEvent,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, PartialEq)]
struct Args {
    inventory: PathBuf,
    days: Option<i64>,
    date: Option<NaiveDate>,
    db: Option<String>,
    series: Option<u64>,
    json: bool,
    version: bool,
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Args> {
    let mut parsed = Args {
        inventory: PathBuf::from("assets/inventory.yaml"),
        days: None,
        date: None,
        db: None,
        series: None,
        json: false,
        version: false,
    };
    let mut it = args.into_iter();
    while let Some(arg) = it.next() {
        let mut value = |name: &str| it.next().with_context(|| format!("{name} needs a value"));
        match arg.as_str() {
            "--inventory" => parsed.inventory = PathBuf::from(value("--inventory")?),
            "--days" => {
                parsed.days = Some(value("--days")?.parse().context("--days expects an integer")?)
            }
            "--date" => {
                let raw = value("--date")?;
                parsed.date = Some(
                    raw.parse::<NaiveDate>()
                        .with_context(|| format!("--date expects YYYY-MM-DD, got {raw}"))?,
                )
            }
            "--db" => parsed.db = Some(value("--db")?),
            "--series" => {
                parsed.series = Some(value("--series")?.parse().context("--series expects a lot id")?)
            }
            "--json" => parsed.json = true,
            "--version" => parsed.version = true,
            other => bail!("unknown argument: {other}"),
        }
    }
    if parsed.days.is_some() && parsed.date.is_some() {
        bail!("--days and --date are mutually exclusive");
    }
    Ok(parsed)
}

/// Days to move the clock, from either flag.
fn delta_days(args: &Args, today: NaiveDate) -> i64 {
    match (args.days, args.date) {
        (Some(days), _) => days,
        (None, Some(date)) => (date - today).num_days(),
        (None, None) => 0,
    }
}

fn event_label(event: WindowEvent) -> String {
    match event {
        WindowEvent::Already => "now".into(),
        WindowEvent::On(date) => date.to_string(),
        WindowEvent::Never => "never".into(),
    }
}

fn print_report(ctx: &SimContext, r: &StockReport) {
    println!(
        "AquaStock {} ({}) | as of {} | lots: {} | flagged: {} | unresolved: {}",
        env!("AQUASTOCK_GIT_SHA"),
        env!("AQUASTOCK_BUILD_DATE"),
        r.as_of,
        r.lots.len(),
        r.margins.flagged_lots,
        r.margins.unresolved_lots
    );
    for s in &r.margins.per_species {
        let counts = r
            .status_by_species
            .iter()
            .find(|c| c.species == s.species)
            .map(|c| c.counts)
            .unwrap_or_default();
        println!(
            "Species | {:<20} | lots: {:>3} | ready: {:>2} | too small: {:>2} | overripe: {:>2} | margin: {}",
            s.name, s.lots, counts.ready, counts.too_small, counts.overripe, s.total_margin
        );
    }
    println!("Total margin: {}", r.margins.grand_total);
    for l in &r.lots {
        let name = ctx
            .registry()
            .species_by_key(&l.species)
            .map_or(l.species.0.as_str(), |s| s.name());
        let (ready, max) = l.window.map_or(("-".into(), "-".into()), |w| {
            (event_label(w.ready), event_label(w.max))
        });
        let cost = if l.margin.cost_known {
            format!("{:.2}", l.margin.unit_cost_per_kg)
        } else {
            "?".into()
        };
        println!(
            "{:<5} {:<20} {:<10} {:>9.2} g  {:<9} gauge {:>5.1}  cost/kg {:>6}  margin/kg {:>6.2}  total {:>10.2}  ready {:<10}  max {}",
            l.name,
            name,
            l.size_class.0,
            l.weight_g,
            l.status.label(),
            l.gauge,
            cost,
            l.margin.margin_per_kg,
            l.margin.total_margin,
            ready,
            max
        );
    }
}

fn print_series(ctx: &SimContext, id: LotId) -> Result<()> {
    let lot = ctx.lot(id).with_context(|| format!("no lot with id {}", id.0))?;
    let resolved = ctx.resolve(lot);
    let series = chart_series(&resolved);
    let markers = series.markers;
    let month = |m: Option<f64>| m.map_or("-".to_string(), |m| format!("{m:.1}"));
    println!(
        "Series | lot {} | points: {} | today: month {:.1} | ready: {} | max: {} | past prime: {}",
        lot.name,
        series.points.len(),
        markers.today_month,
        month(markers.ready_month),
        month(markers.max_month),
        month(markers.overshoot_month)
    );
    let best = series.best_margin();
    println!(
        "Best margin | {:.2}/kg at {:.0} g, {:+} days from today",
        best.margin_per_kg,
        best.weight_g,
        series.days_to_best_margin()
    );
    if let Some(profile) = resolved.margin_profile() {
        let stops: Vec<String> = profile.stops.iter().map(|r| format!("{r:.2}")).collect();
        println!(
            "Margin profile | [{}] | today at {:.2}",
            stops.join(" "),
            profile.today_fraction
        );
    }
    for (i, p) in series.points.iter().enumerate() {
        if i % 30 == 0 || i == series.today_index || i + 1 == series.points.len() {
            println!(
                "  day {:>5}  month {:>5.1}  {:>9.2} g  cost {:>6.2}  margin {:>6.2}",
                p.age_day, p.month, p.weight_g, p.cost_per_kg, p.margin_per_kg
            );
        }
    }
    Ok(())
}

/// Build the context from the store, seeding it from `inventory` on first
/// use. Stored species parameters and the stored date win over the file.
async fn store_context(pool: &SqlitePool, inventory: Inventory) -> Result<SimContext> {
    let stored = persistence::load_species_params(pool).await?;
    let species = if stored.is_empty() {
        persistence::upsert_species(pool, &inventory.species).await?;
        inventory.species
    } else {
        stored
    };
    persistence::seed_lots_if_empty(pool, &inventory.lots).await?;
    let today = match persistence::load_as_of(pool).await? {
        Some(date) => date,
        None => {
            persistence::save_as_of(pool, inventory.as_of).await?;
            inventory.as_of
        }
    };
    let registry = Registry::new(species, inventory.size_classes)?;
    let lots = persistence::load_lots(pool).await?;
    Ok(SimContext::new(registry, lots, inventory.engine, today)?)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logging setup
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = parse_args(std::env::args().skip(1))?;
    if args.version {
        println!(
            "aquastock {} ({} {})",
            env!("CARGO_PKG_VERSION"),
            env!("AQUASTOCK_GIT_SHA"),
            env!("AQUASTOCK_BUILD_DATE")
        );
        return Ok(());
    }
    info!(inventory = %args.inventory.display(), db = ?args.db, "starting CLI");

    let inventory = Inventory::load(&args.inventory)
        .with_context(|| format!("loading {}", args.inventory.display()))?;

    let mut ctx = match &args.db {
        None => SimContext::from_inventory(inventory)?,
        Some(url) => {
            persistence::ensure_db_dir(url)?;
            let pool = persistence::init_db(url).await?;
            let mut ctx = store_context(&pool, inventory).await?;
            let delta = delta_days(&args, ctx.today());
            if delta != 0 {
                let sink = persistence::SqliteSink::new(pool)?;
                advance_and_report(&mut ctx, delta, &sink);
                sink.flush().await;
            }
            ctx
        }
    };
    if args.db.is_none() {
        let delta = delta_days(&args, ctx.today());
        if delta != 0 {
            advance(&mut ctx, delta);
        }
    }

    let r = report(&ctx);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&r)?);
    } else {
        print_report(&ctx, &r);
    }
    if let Some(id) = args.series {
        print_series(&ctx, LotId(id))?;
    }
    Ok(())
}
