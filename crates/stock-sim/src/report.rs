//! Stock report: what the lot list and summary views show.

use crate::classify::LotStatus;
use crate::context::SimContext;
use crate::window::WindowDates;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use stock_core::{LotId, SizeClassKey, SpeciesKey};
use stock_econ::{summarize, LotMargin, MarginSummary};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LotView {
    pub id: LotId,
    pub name: String,
    pub species: SpeciesKey,
    pub size_class: SizeClassKey,
    pub quantity: f64,
    pub weight_g: f64,
    pub status: LotStatus,
    pub gauge: f64,
    pub margin: LotMargin,
    pub window: Option<WindowDates>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub too_small: usize,
    pub ready: usize,
    pub overripe: usize,
    pub perished: usize,
}

impl StatusCounts {
    pub fn add(&mut self, status: LotStatus) {
        match status {
            LotStatus::TooSmall => self.too_small += 1,
            LotStatus::Ready => self.ready += 1,
            LotStatus::Overripe => self.overripe += 1,
            LotStatus::Perished => self.perished += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.too_small + self.ready + self.overripe + self.perished
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpeciesStatus {
    pub species: SpeciesKey,
    pub counts: StatusCounts,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StockReport {
    pub as_of: NaiveDate,
    /// Grouped by species then size class in registry order, then by
    /// status; lots with unknown references come last.
    pub lots: Vec<LotView>,
    /// Species in registry order, only those holding lots.
    pub status_by_species: Vec<SpeciesStatus>,
    pub margins: MarginSummary,
}

pub fn report(ctx: &SimContext) -> StockReport {
    let registry = ctx.registry();
    let today = ctx.today();

    let mut keyed: Vec<((usize, usize, LotStatus), LotView)> = ctx
        .resolved()
        .map(|r| {
            let status = r.status();
            let species_rank = registry
                .species_handle(&r.lot.species)
                .map_or(usize::MAX, |h| h.index());
            let class_rank = registry
                .size_class_handle(&r.lot.size_class)
                .map_or(usize::MAX, |h| h.index());
            let view = LotView {
                id: r.lot.id,
                name: r.lot.name.clone(),
                species: r.lot.species.clone(),
                size_class: r.lot.size_class.clone(),
                quantity: r.lot.quantity,
                weight_g: r.lot.current_weight_g,
                status,
                gauge: r.gauge(),
                margin: r.margin(),
                window: r.window(today),
            };
            ((species_rank, class_rank, status), view)
        })
        .collect();
    keyed.sort_by_key(|(k, _)| *k);

    let mut status_by_species: Vec<SpeciesStatus> = registry
        .all_species()
        .iter()
        .map(|s| SpeciesStatus {
            species: s.key().clone(),
            counts: StatusCounts::default(),
        })
        .collect();
    for (_, view) in &keyed {
        if let Some(h) = registry.species_handle(&view.species) {
            status_by_species[h.index()].counts.add(view.status);
        }
    }
    status_by_species.retain(|s| s.counts.total() > 0);

    StockReport {
        as_of: today,
        lots: keyed.into_iter().map(|(_, v)| v).collect(),
        status_by_species,
        margins: summarize(registry, ctx.lots(), ctx.config()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::inventory;
    use crate::window::WindowEvent;
    use rust_decimal::Decimal;

    #[test]
    fn report_groups_and_counts() {
        let mut ctx = SimContext::from_inventory(inventory()).unwrap();
        ctx.set_to_remove(LotId(1), true).unwrap();
        let r = report(&ctx);
        let ids: Vec<u64> = r.lots.iter().map(|l| l.id.0).collect();
        // truite-arc e200400: perished, overripe, too small; then omble.
        assert_eq!(ids, vec![1, 3, 2, 4]);

        assert_eq!(r.status_by_species.len(), 2);
        let trout = &r.status_by_species[0];
        assert_eq!(trout.species, SpeciesKey("truite-arc".into()));
        assert_eq!(trout.counts.perished, 1);
        assert_eq!(trout.counts.overripe, 1);
        assert_eq!(trout.counts.too_small, 1);
        assert_eq!(trout.counts.total(), 3);

        assert_eq!(r.margins.flagged_lots, 1);
        let flagged = &r.lots[0];
        assert_eq!(flagged.gauge, 0.0);
        assert!(flagged.window.is_none());
        assert!(flagged.margin.cost_known);
    }

    #[test]
    fn flagging_a_lot_keeps_it_in_the_totals() {
        let mut ctx = SimContext::from_inventory(inventory()).unwrap();
        let before = report(&ctx).margins;
        ctx.set_to_remove(LotId(1), true).unwrap();
        let after = report(&ctx).margins;
        assert_eq!(after.grand_total, before.grand_total);
        assert_eq!(after.per_species, before.per_species);
        assert_eq!(after.flagged_lots, 1);
    }

    #[test]
    fn report_totals_match_lot_views() {
        let ctx = SimContext::from_inventory(inventory()).unwrap();
        let r = report(&ctx);
        let sum: Decimal = r
            .lots
            .iter()
            .map(|l| stock_econ::to_money(l.margin.total_margin))
            .sum();
        assert_eq!(r.margins.grand_total, sum);
        let young = r.lots.iter().find(|l| l.id == LotId(2)).unwrap();
        assert!(matches!(
            young.window.unwrap().ready,
            WindowEvent::On(d) if d > r.as_of
        ));
    }
}
