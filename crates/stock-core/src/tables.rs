//! Discretized per-species growth and cost laws.
//!
//! Both tables hold one entry per 10 g bucket from 0 to 5000 g. A weight is
//! mapped to its bucket with [`bucket_index`]; anything beyond the last bucket
//! reads the last entry.

use crate::{CostParams, GrowthParams};

/// Number of entries in every lookup table.
pub const TABLE_LEN: usize = 501;
/// Index of the last bucket (5000 g).
pub const MAX_BUCKET: usize = TABLE_LEN - 1;
/// Width of one bucket in grams.
pub const BUCKET_WIDTH_G: f64 = 10.0;
/// Lowest daily gain a table may hold, in g/day.
pub const MIN_DAILY_GAIN_G: f64 = 0.05;
/// Highest daily gain a table may hold, in g/day.
pub const MAX_DAILY_GAIN_G: f64 = 30.0;
/// Lowest production cost a table may hold, per kg.
pub const MIN_UNIT_COST: f64 = 0.1;
/// Upper end of the weight axis used by the cost law, in grams.
pub const WEIGHT_AXIS_MAX_G: f64 = 5000.0;

/// Map a live weight in grams to its table bucket, clamped to `[0, 500]`.
///
/// Non-finite or negative weights land in bucket 0.
pub fn bucket_index(weight_g: f64) -> usize {
    let i = (weight_g / BUCKET_WIDTH_G).round();
    if !(i > 0.0) {
        0
    } else if i >= MAX_BUCKET as f64 {
        MAX_BUCKET
    } else {
        i as usize
    }
}

/// Round to a fixed number of decimal places.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Daily weight gain (g/day) per weight bucket, from the Gompertz law.
#[derive(Clone, Debug, PartialEq)]
pub struct GrowthTable {
    entries: Box<[f64; TABLE_LEN]>,
}

impl GrowthTable {
    /// Build the table from `dW/dt = k · W · ln(A / W)`.
    ///
    /// Gains are capped at 30 g/day, rounded to 3 decimals and floored at
    /// 0.05 g/day so that a lot at or past `A` still creeps forward.
    pub fn build(params: &GrowthParams) -> Self {
        let mut entries = Box::new([0.0; TABLE_LEN]);
        for (i, slot) in entries.iter_mut().enumerate() {
            let w = (i as f64 * BUCKET_WIDTH_G).max(1.0);
            let gain = params.rate_k * w * (params.asymptotic_weight_g / w).ln();
            // NaN must hit the floor, not the cap
            let gain = if gain.is_nan() {
                MIN_DAILY_GAIN_G
            } else {
                gain.min(MAX_DAILY_GAIN_G)
            };
            *slot = floor_finite(round_to(gain, 3), MIN_DAILY_GAIN_G);
        }
        Self { entries }
    }

    /// Gain in g/day for a lot currently weighing `weight_g`.
    pub fn gain_at(&self, weight_g: f64) -> f64 {
        self.entries[bucket_index(weight_g)]
    }

    pub fn entries(&self) -> &[f64] {
        &self.entries[..]
    }
}

/// Production cost per kg per weight bucket (U-shaped).
#[derive(Clone, Debug, PartialEq)]
pub struct CostTable {
    entries: Box<[f64; TABLE_LEN]>,
}

impl CostTable {
    /// Build the table: cost falls from `cost_high` toward `cost_min` as the
    /// fish leaves hatchling size, then climbs toward `cost_mature` past
    /// 60% of the optimal weight.
    pub fn build(params: &CostParams) -> Self {
        let mut entries = Box::new([0.0; TABLE_LEN]);
        let opt = params.optimal_weight_g;
        for (i, slot) in entries.iter_mut().enumerate() {
            let w = (i as f64 * BUCKET_WIDTH_G).max(BUCKET_WIDTH_G);
            let down = (params.cost_high - params.cost_min) * (-4.5 * w / opt).exp();
            let up = (params.cost_mature - params.cost_min) * (1.0 - (-1.8 * w / opt).exp());
            let ramp = ((w - 0.6 * opt) / (WEIGHT_AXIS_MAX_G - 0.6 * opt)).max(0.0);
            let cost = params.cost_min + down + up * ramp;
            *slot = floor_finite(round_to(cost, 3), MIN_UNIT_COST);
        }
        Self { entries }
    }

    /// Cost per kg for a lot currently weighing `weight_g`.
    pub fn cost_at(&self, weight_g: f64) -> f64 {
        self.entries[bucket_index(weight_g)]
    }

    pub fn entries(&self) -> &[f64] {
        &self.entries[..]
    }

    /// Bucket holding the lowest cost (first one on ties).
    pub fn cheapest_bucket(&self) -> usize {
        let mut best = 0;
        for (i, c) in self.entries.iter().enumerate() {
            if *c < self.entries[best] {
                best = i;
            }
        }
        best
    }
}

// NaN compares false everywhere; route it to the floor explicitly.
fn floor_finite(value: f64, floor: f64) -> f64 {
    if value.is_finite() {
        value.max(floor)
    } else {
        floor
    }
}
