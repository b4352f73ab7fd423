//! Time travel over the whole inventory.

use crate::context::SimContext;
use crate::simulator::{Direction, Simulator};
use chrono::Days;
use stock_core::{BulkUpdate, BulkUpdateSink};
use tracing::{info, warn};

/// Move every lot `delta_days` days forward (positive) or backward
/// (negative), one day at a time, and shift the context date.
///
/// Each day rounds to 2 decimals and floors at 1 g, so a long backward jump
/// never dips below the floor and "recovers". Flagged lots are stepped too.
/// Returns the bulk update describing every lot after the move.
pub fn advance(ctx: &mut SimContext, delta_days: i64) -> BulkUpdate {
    let direction = if delta_days >= 0 {
        Direction::Forward
    } else {
        Direction::Backward
    };
    let steps = delta_days.unsigned_abs();

    let SimContext {
        registry,
        lots,
        config,
        today,
    } = ctx;
    for lot in lots.iter_mut() {
        let sim = Simulator::for_species(registry.species_by_key(&lot.species), config);
        lot.current_weight_g = sim.step_days(lot.current_weight_g, steps, direction);
    }

    let moved = match direction {
        Direction::Forward => today.checked_add_days(Days::new(steps)),
        Direction::Backward => today.checked_sub_days(Days::new(steps)),
    };
    match moved {
        Some(date) => *today = date,
        None => warn!(delta_days, "date out of range, calendar left unchanged"),
    }
    info!(lots = lots.len(), delta_days, today = %today, "inventory advanced");
    BulkUpdate::from_lots(lots.iter()).with_as_of(*today)
}

/// [`advance`], then hand the bulk update to `sink`.
///
/// The sink is called once all weights are mutated. Whatever it does with
/// the update, in-memory state stays as advanced. Returns the number of lots
/// reported.
pub fn advance_and_report(
    ctx: &mut SimContext,
    delta_days: i64,
    sink: &dyn BulkUpdateSink,
) -> usize {
    let update = advance(ctx, delta_days);
    let reported = update.len();
    sink.submit(update);
    reported
}
