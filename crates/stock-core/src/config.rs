//! Engine configuration carried alongside an inventory.

use serde::{Deserialize, Serialize};

/// What the engine answers when a lot references a species it does not know.
///
/// The defaults keep every query total: a missing species grows 3 g/day and
/// costs 0 (reported as unknown, not free).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackPolicy {
    /// Daily gain used for a lot without a known species, in g/day.
    pub missing_gain_g_per_day: f64,
    /// Unit cost used for a lot without a known species, per kg.
    pub missing_cost_per_kg: f64,
}

impl Default for FallbackPolicy {
    fn default() -> Self {
        Self {
            missing_gain_g_per_day: 3.0,
            missing_cost_per_kg: 0.0,
        }
    }
}

/// Simulation limits and fallbacks.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub fallback: FallbackPolicy,
    /// Iteration ceiling for projections and age estimation, in days.
    pub max_sim_days: u32,
    /// Days simulated on each side of today for chart series.
    pub chart_max_days: u32,
    /// Points simulated on each side of today for margin profiles.
    pub profile_max_points: usize,
    /// Number of samples in a margin profile.
    pub profile_stops: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fallback: FallbackPolicy::default(),
            max_sim_days: 3000,
            chart_max_days: 1200,
            profile_max_points: 300,
            profile_stops: 16,
        }
    }
}
