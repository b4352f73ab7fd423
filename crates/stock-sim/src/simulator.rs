//! Day-stepping growth simulator.
//!
//! Every step reads the gain of the weight *before* the step, applies it, then
//! counts the day. Steps that produce persisted or charted weights round to
//! two decimals and never go below 1 g.

use serde::{Deserialize, Serialize};
use stock_core::{round_to, EngineConfig, GrowthLookup, Species};
use tracing::debug;

/// Lowest weight a simulated lot can reach, in grams.
pub const MIN_WEIGHT_G: f64 = 1.0;
/// Decimal places kept on stepped weights.
pub const WEIGHT_DECIMALS: i32 = 2;

/// Outcome of a projection toward a target weight.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reach {
    /// Target reached after this many days; 0 means already there.
    Within(u32),
    /// Target not reached before the iteration ceiling.
    Never,
}

impl Reach {
    pub fn days(self) -> Option<u32> {
        match self {
            Reach::Within(days) => Some(days),
            Reach::Never => None,
        }
    }

    pub fn is_reached(self) -> bool {
        matches!(self, Reach::Within(_))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

/// A simulated weight, `day_offset` days from today.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeightPoint {
    pub day_offset: i64,
    pub weight_g: f64,
}

/// Growth simulator for one species (or the fallback gain).
#[derive(Clone, Copy, Debug)]
pub struct Simulator<'a> {
    growth: GrowthLookup<'a>,
    max_days: u32,
}

impl<'a> Simulator<'a> {
    pub fn new(growth: GrowthLookup<'a>, max_days: u32) -> Self {
        Self { growth, max_days }
    }

    pub fn for_species(species: Option<&'a Species>, config: &EngineConfig) -> Self {
        Self::new(
            GrowthLookup::new(species, &config.fallback),
            config.max_sim_days,
        )
    }

    /// Iteration ceiling in days.
    pub fn max_days(&self) -> u32 {
        self.max_days
    }

    pub fn daily_gain(&self, weight_g: f64) -> f64 {
        self.growth.gain_at(weight_g)
    }

    /// Days of growth needed to go from `start_g` to `target_g`.
    ///
    /// Intermediate weights are not rounded here, matching a lot that is
    /// left in the water untouched.
    pub fn days_to_weight(&self, start_g: f64, target_g: f64) -> Reach {
        if start_g >= target_g {
            return Reach::Within(0);
        }
        let mut w = start_g;
        let mut days = 0;
        while w < target_g && days < self.max_days {
            w += self.daily_gain(w);
            days += 1;
        }
        if w >= target_g {
            Reach::Within(days)
        } else {
            debug!(start_g, target_g, days, "target weight not reached before ceiling");
            Reach::Never
        }
    }

    /// One simulated day, rounded and floored.
    pub fn step(&self, weight_g: f64, direction: Direction) -> f64 {
        let gain = self.daily_gain(weight_g);
        let next = match direction {
            Direction::Forward => weight_g + gain,
            Direction::Backward => weight_g - gain,
        };
        round_to(next, WEIGHT_DECIMALS).max(MIN_WEIGHT_G)
    }

    /// Apply `days` single-day steps; the floor holds after every step.
    pub fn step_days(&self, start_g: f64, days: u64, direction: Direction) -> f64 {
        let mut w = start_g;
        for _ in 0..days {
            w = self.step(w, direction);
        }
        w
    }

    pub fn step_forward_days(&self, start_g: f64, days: u64) -> f64 {
        self.step_days(start_g, days, Direction::Forward)
    }

    pub fn step_backward_days(&self, start_g: f64, days: u64) -> f64 {
        self.step_days(start_g, days, Direction::Backward)
    }

    /// Weight history going back from `start_g` while it stays above
    /// `floor_g` (and above 1 g), at most `max_days` points.
    ///
    /// Points are returned oldest first; offsets run from `-n` to `-1`.
    pub fn step_backward_to_weight(
        &self,
        start_g: f64,
        floor_g: f64,
        max_days: u32,
    ) -> Vec<WeightPoint> {
        let mut points = Vec::new();
        let mut w = start_g;
        let mut day = 0i64;
        while w > floor_g && w > MIN_WEIGHT_G && day < i64::from(max_days) {
            w = self.step(w, Direction::Backward);
            day += 1;
            points.push(WeightPoint {
                day_offset: -day,
                weight_g: w,
            });
        }
        points.reverse();
        points
    }

    /// Projection from today (offset 0) while the weight stays below
    /// `ceiling_g`, at most `max_days` steps. The first weight at or above
    /// the ceiling closes the series.
    pub fn step_forward_to_weight(
        &self,
        start_g: f64,
        ceiling_g: f64,
        max_days: u32,
    ) -> Vec<WeightPoint> {
        let mut points = Vec::new();
        let mut w = start_g;
        let mut day = 0i64;
        while w < ceiling_g && day < i64::from(max_days) {
            points.push(WeightPoint {
                day_offset: day,
                weight_g: w,
            });
            w = self.step(w, Direction::Forward);
            day += 1;
        }
        points.push(WeightPoint {
            day_offset: day,
            weight_g: w,
        });
        points
    }

    /// Estimated age in days: backward steps from `weight_g` down to 1 g,
    /// capped at the iteration ceiling.
    pub fn estimate_age_days(&self, weight_g: f64) -> u32 {
        let mut w = weight_g;
        let mut age = 0;
        while w > MIN_WEIGHT_G && age < self.max_days {
            w = self.step(w, Direction::Backward);
            age += 1;
        }
        age
    }
}
