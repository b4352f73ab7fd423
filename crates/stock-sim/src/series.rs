//! Weight, cost and margin series for charting a lot or a species.

use crate::context::ResolvedLot;
use crate::simulator::WeightPoint;
use serde::{Deserialize, Serialize};
use stock_core::{bucket_index, LotId, Species};
use stock_econ::margin_per_unit;

/// Average month length used on chart axes.
pub const DAYS_PER_MONTH: f64 = 30.44;
/// Overshoot past the window at which a lot is charted as past its prime.
pub const OVERSHOOT_FACTOR: f64 = 1.15;

pub fn month_of(day: i64) -> f64 {
    day as f64 / DAYS_PER_MONTH
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    /// Estimated age of the fish in days.
    pub age_day: i64,
    pub month: f64,
    pub weight_g: f64,
    pub cost_per_kg: f64,
    pub margin_per_kg: f64,
}

/// Months at which notable weights are reached.
///
/// Without a size class only `today_month` is meaningful and the window
/// markers are `None`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SeriesMarkers {
    pub today_month: f64,
    pub ready_month: Option<f64>,
    pub max_month: Option<f64>,
    pub overshoot_month: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChartSeries {
    pub lot: LotId,
    /// Chronological, one point per simulated day.
    pub points: Vec<SeriesPoint>,
    /// Index of today's point.
    pub today_index: usize,
    pub markers: SeriesMarkers,
    /// Index of the highest margin (first one on ties).
    pub best_margin_index: usize,
}

impl ChartSeries {
    pub fn today(&self) -> &SeriesPoint {
        &self.points[self.today_index]
    }

    pub fn best_margin(&self) -> &SeriesPoint {
        &self.points[self.best_margin_index]
    }

    /// Days from today to the best margin; negative when it lies in the past.
    pub fn days_to_best_margin(&self) -> i64 {
        self.best_margin().age_day - self.today().age_day
    }
}

/// Build the chart series of a lot.
///
/// History runs back to 70% of the smaller of the current weight and the
/// window start, projection forward to 130% of the larger of the current
/// weight and the window end, each side capped at `chart_max_days`.
pub fn chart_series(resolved: &ResolvedLot<'_>) -> ChartSeries {
    let lot = resolved.lot;
    let config = resolved.config();
    let sim = resolved.simulator();
    let costs = resolved.costs();
    let w = lot.current_weight_g;

    let (past_bound, future_bound) = match resolved.size_class {
        Some(sc) => (w.min(sc.target_min_g) * 0.70, w.max(sc.target_max_g) * 1.30),
        None => (w * 0.70, w * 1.30),
    };
    let past = sim.step_backward_to_weight(w, past_bound, config.chart_max_days);
    let future = sim.step_forward_to_weight(w, future_bound, config.chart_max_days);
    let today_age = i64::from(sim.estimate_age_days(w));

    let to_point = |p: &WeightPoint| {
        let age_day = today_age + p.day_offset;
        let cost = costs.cost_at(p.weight_g);
        SeriesPoint {
            age_day,
            month: month_of(age_day),
            weight_g: p.weight_g,
            cost_per_kg: cost,
            margin_per_kg: margin_per_unit(lot.sale_price_per_kg, cost),
        }
    };
    let points: Vec<SeriesPoint> = past.iter().chain(future.iter()).map(to_point).collect();
    let today_index = past.len();

    let first_month_at = |weight: f64| {
        points
            .iter()
            .find(|p| p.weight_g >= weight)
            .or(points.last())
            .map(|p| p.month)
    };
    let markers = SeriesMarkers {
        today_month: month_of(today_age),
        ready_month: resolved.size_class.and_then(|sc| first_month_at(sc.target_min_g)),
        max_month: resolved.size_class.and_then(|sc| first_month_at(sc.target_max_g)),
        overshoot_month: resolved
            .size_class
            .and_then(|sc| first_month_at(sc.target_max_g * OVERSHOOT_FACTOR)),
    };

    let mut best_margin_index = 0;
    for (i, p) in points.iter().enumerate() {
        if p.margin_per_kg > points[best_margin_index].margin_per_kg {
            best_margin_index = i;
        }
    }

    ChartSeries {
        lot: lot.id,
        points,
        today_index,
        markers,
        best_margin_index,
    }
}

/// Days simulated at most for a species growth curve.
pub const GROWTH_CURVE_MAX_DAYS: u32 = 1500;
/// Gains at or below this are treated as the end of useful growth.
const GROWTH_CURVE_MIN_GAIN: f64 = 0.1;

/// Growth curve of a species from 1 g, unrounded, up to the last weight at
/// which it still gains more than 0.1 g/day (4000 g when none does).
pub fn species_growth_curve(species: &Species) -> Vec<WeightPoint> {
    let table = species.growth_table().entries();
    let end_weight = (1..=490)
        .rev()
        .find(|&i| table[i] > GROWTH_CURVE_MIN_GAIN)
        .map_or(4000.0, |i| i as f64 * 10.0);

    let mut points = Vec::new();
    let mut w = 1.0;
    let mut day = 0i64;
    while w < end_weight && day < i64::from(GROWTH_CURVE_MAX_DAYS) {
        points.push(WeightPoint {
            day_offset: day,
            weight_g: w,
        });
        w = (w + table[bucket_index(w)]).min(end_weight + 100.0);
        day += 1;
    }
    points.push(WeightPoint {
        day_offset: day,
        weight_g: w,
    });
    points
}
