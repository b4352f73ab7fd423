#![deny(warnings)]

//! Margin economics for AquaStock.
//!
//! This module provides:
//! - Per-lot margin from the species cost law and the lot's sale price
//! - Per-species and inventory-wide margin totals
//! - A normalized margin profile along a lot's simulated trajectory

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use stock_core::{
    CostLookup, EngineConfig, GrowthLookup, Lot, Registry, SizeClass, SpeciesKey,
};
use tracing::debug;

/// Margin per kg at a given unit cost.
///
/// Example:
/// assert_eq!(margin_per_unit(9.5, 6.0), 3.5);
pub fn margin_per_unit(sale_price_per_kg: f64, unit_cost_per_kg: f64) -> f64 {
    sale_price_per_kg - unit_cost_per_kg
}

/// Margin figures of one lot at its current weight.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LotMargin {
    /// Production cost per kg at the current weight.
    pub unit_cost_per_kg: f64,
    /// False when the cost came from the fallback policy.
    pub cost_known: bool,
    pub margin_per_kg: f64,
    /// `margin_per_kg` times the lot quantity.
    pub total_margin: f64,
}

/// Evaluate a lot's margin. Flagged lots still report a margin.
pub fn lot_margin(lot: &Lot, costs: &CostLookup<'_>) -> LotMargin {
    let unit_cost = costs.cost_at(lot.current_weight_g);
    let per_kg = margin_per_unit(lot.sale_price_per_kg, unit_cost);
    LotMargin {
        unit_cost_per_kg: unit_cost,
        cost_known: costs.is_known(),
        margin_per_kg: per_kg,
        total_margin: per_kg * lot.quantity,
    }
}

/// Round a money amount to cents.
pub fn to_money(value: f64) -> Decimal {
    Decimal::from_f64(value)
        .unwrap_or(Decimal::ZERO)
        .round_dp(2)
}

/// Margin total of one species.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpeciesMargin {
    pub species: SpeciesKey,
    pub name: String,
    /// Lots counted in the total.
    pub lots: usize,
    pub total_margin: Decimal,
}

/// Margin totals for the summary view.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MarginSummary {
    /// Species in registry order; species without counted lots are omitted.
    pub per_species: Vec<SpeciesMargin>,
    pub grand_total: Decimal,
    /// Lots flagged for removal. They still count in the totals.
    pub flagged_lots: usize,
    /// Lots whose species is unknown, left out of every total.
    pub unresolved_lots: usize,
}

/// Sum lot margins per species and overall.
pub fn summarize(registry: &Registry, lots: &[Lot], config: &EngineConfig) -> MarginSummary {
    let mut summary = MarginSummary::default();
    let mut totals: Vec<(usize, Decimal)> = vec![(0, Decimal::ZERO); registry.all_species().len()];
    for lot in lots {
        if lot.to_remove {
            summary.flagged_lots += 1;
        }
        let resolved = registry
            .species_handle(&lot.species)
            .and_then(|h| registry.species(h).map(|s| (h, s)));
        let Some((handle, species)) = resolved else {
            debug!(lot = lot.id.0, species = %lot.species.0, "lot left out of totals, unknown species");
            summary.unresolved_lots += 1;
            continue;
        };
        let costs = CostLookup::new(Some(species), &config.fallback);
        let margin = lot_margin(lot, &costs);
        let slot = &mut totals[handle.index()];
        slot.0 += 1;
        slot.1 += to_money(margin.total_margin);
    }
    for (species, (count, total)) in registry.all_species().iter().zip(totals) {
        if count == 0 {
            continue;
        }
        summary.grand_total += total;
        summary.per_species.push(SpeciesMargin {
            species: species.key().clone(),
            name: species.name().to_string(),
            lots: count,
            total_margin: total,
        });
    }
    summary
}

/// Margin along a lot's trajectory, normalized to `[0, 1]`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarginProfile {
    /// Evenly spaced samples from the oldest to the newest point.
    pub stops: Vec<f64>,
    /// Where today sits along the trajectory, in `[0, 1]`.
    pub today_fraction: f64,
    /// Today's margin on the same scale as `stops`.
    pub today_ratio: f64,
    pub margin_min: f64,
    pub margin_max: f64,
}

/// Build the margin profile of a lot.
///
/// The trajectory runs from 70% of the smaller of the current weight and the
/// window start to 130% of the larger of the current weight and the window
/// end. Returns `None` for lots flagged for removal.
pub fn margin_profile(
    lot: &Lot,
    size_class: Option<&SizeClass>,
    growth: &GrowthLookup<'_>,
    costs: &CostLookup<'_>,
    config: &EngineConfig,
) -> Option<MarginProfile> {
    if lot.to_remove {
        return None;
    }
    let current = lot.current_weight_g;
    let (past_bound, future_bound) = match size_class {
        Some(sc) => (
            current.min(sc.target_min_g) * 0.70,
            current.max(sc.target_max_g) * 1.30,
        ),
        None => (current * 0.70, current * 1.30),
    };
    let cap = config.profile_max_points;

    let mut past = Vec::new();
    let mut w = current;
    while w > past_bound && w > 1.0 && past.len() < cap {
        w = (w - growth.gain_at(w)).max(1.0);
        past.push(w);
    }
    past.reverse();
    let today_idx = past.len();

    let mut weights = past;
    weights.push(current);
    let mut w = current;
    let mut ahead = 0;
    while w < future_bound && ahead < cap {
        w += growth.gain_at(w);
        weights.push(w);
        ahead += 1;
    }

    let margins: Vec<f64> = weights
        .iter()
        .map(|w| margin_per_unit(lot.sale_price_per_kg, costs.cost_at(*w)))
        .collect();
    let margin_min = margins.iter().copied().fold(f64::INFINITY, f64::min);
    let margin_max = margins.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = if margin_max - margin_min > 0.0 {
        margin_max - margin_min
    } else {
        1.0
    };
    let ratio = |m: f64| ((m - margin_min) / range).clamp(0.0, 1.0);

    let last = margins.len() - 1;
    let n = config.profile_stops.max(2);
    let stops = (0..n)
        .map(|i| {
            let idx = ((i as f64 / (n - 1) as f64) * last as f64).round() as usize;
            ratio(margins[idx.min(last)])
        })
        .collect();
    let today_fraction = if last == 0 {
        0.0
    } else {
        (today_idx as f64 / last as f64).clamp(0.0, 1.0)
    };
    Some(MarginProfile {
        stops,
        today_fraction,
        today_ratio: ratio(margins[today_idx]),
        margin_min,
        margin_max,
    })
}
