#![deny(warnings)]

//! Day-stepping simulation over an AquaStock inventory.
//!
//! Growth projection, lifecycle classification, ready-window dates, time
//! travel over every lot, chart series and the stock report, all driven from
//! an explicit [`SimContext`].

pub mod advance;
pub mod classify;
pub mod context;
pub mod report;
pub mod series;
pub mod simulator;
pub mod window;

pub use advance::{advance, advance_and_report};
pub use classify::{gauge_position, status, LotStatus};
pub use context::{ContextError, ResolvedLot, SimContext};
pub use report::{report, LotView, SpeciesStatus, StatusCounts, StockReport};
pub use series::{chart_series, species_growth_curve, ChartSeries, SeriesMarkers, SeriesPoint};
pub use simulator::{Direction, Reach, Simulator, WeightPoint};
pub use window::{days_to_max, days_to_target, window_dates, WindowDates, WindowEvent};


#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::{inventory, round_trip_tolerance};
    use stock_core::LotId;

    fn demo_context() -> SimContext {
        let inv = stock_core::Inventory::from_yaml_str(include_str!(
            "../../../assets/inventory.yaml"
        ))
        .unwrap();
        SimContext::from_inventory(inv).unwrap()
    }

    #[test]
    fn overripe_lot_margin_follows_cost_law_at_bucket_180() {
        let ctx = SimContext::from_inventory(inventory()).unwrap();
        let r = ctx.resolve(ctx.lot(LotId(3)).unwrap());
        assert_eq!(r.status(), LotStatus::Overripe);

        let w: f64 = 1800.0;
        let (high, min, mature, opt) = (14.0, 6.2, 7.5, 300.0);
        let down = (high - min) * (-4.5 * w / opt).exp();
        let up = (mature - min) * (1.0 - (-1.8 * w / opt).exp());
        let ramp = (w - 0.6 * opt) / (5000.0 - 0.6 * opt);
        let cost = ((min + down + up * ramp) * 1000.0).round() / 1000.0;

        let m = r.margin();
        assert!((m.unit_cost_per_kg - cost).abs() < 1e-12);
        assert!((m.margin_per_kg - (9.9 - cost)).abs() < 1e-12);
    }

    #[test]
    fn time_travel_round_trip_through_the_report() {
        let mut ctx = SimContext::from_inventory(inventory()).unwrap();
        let start = report(&ctx);
        advance(&mut ctx, 45);
        let later = report(&ctx);
        assert!(later.as_of > start.as_of);
        let young = later.lots.iter().find(|l| l.id == LotId(2)).unwrap();
        assert_eq!(young.status, LotStatus::Ready);
        advance(&mut ctx, -45);
        assert_eq!(report(&ctx).as_of, start.as_of);
    }

    #[test]
    fn demo_inventory_loads_and_reports() {
        let ctx = demo_context();
        assert_eq!(ctx.registry().all_species().len(), 5);
        assert_eq!(ctx.registry().size_classes().len(), 7);
        let r = report(&ctx);
        assert_eq!(r.lots.len(), 47);
        assert_eq!(r.margins.unresolved_lots, 0);
        assert_eq!(r.margins.per_species.len(), 5);
        let counted: usize = r.status_by_species.iter().map(|s| s.counts.total()).sum();
        assert_eq!(counted, 47);
    }

    #[test]
    fn demo_stock_survives_a_month_back_and_forth() {
        let mut ctx = demo_context();
        let before: Vec<f64> = ctx.lots().iter().map(|l| l.current_weight_g).collect();
        advance(&mut ctx, -30);
        let low: Vec<f64> = ctx.lots().iter().map(|l| l.current_weight_g).collect();
        advance(&mut ctx, 30);
        for ((lot, w0), lo) in ctx.lots().iter().zip(before).zip(low) {
            let table = ctx.resolve(lot).species.unwrap().growth_table().entries();
            let tolerance = round_trip_tolerance(table, lo, w0.max(lot.current_weight_g), 30);
            let drift = (lot.current_weight_g - w0).abs();
            assert!(drift <= tolerance, "{}: {drift} g over {tolerance} g", lot.name);
            assert!(drift < 2.0, "{}: {drift} g", lot.name);
        }
    }
}
