//! Bulk weight updates handed to the external store after time travel.

use crate::{Lot, LotId};
use chrono::NaiveDate;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// One row of a bulk update, keyed by lot id.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LotWeightUpdate {
    pub id: LotId,
    /// Live weight in grams, two decimal places.
    pub current_weight_g: Decimal,
    pub to_remove: bool,
}

impl LotWeightUpdate {
    pub fn from_lot(lot: &Lot) -> Self {
        let weight = Decimal::from_f64(lot.current_weight_g)
            .unwrap_or(Decimal::ONE)
            .round_dp(2);
        Self {
            id: lot.id,
            current_weight_g: weight,
            to_remove: lot.to_remove,
        }
    }
}

/// Every lot's weight and removal flag after one advance.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BulkUpdate {
    pub lots: Vec<LotWeightUpdate>,
    /// Calendar date the weights refer to, stored with them when present.
    #[serde(default)]
    pub as_of: Option<NaiveDate>,
}

impl BulkUpdate {
    pub fn from_lots<'a>(lots: impl IntoIterator<Item = &'a Lot>) -> Self {
        Self {
            lots: lots.into_iter().map(LotWeightUpdate::from_lot).collect(),
            as_of: None,
        }
    }

    pub fn with_as_of(mut self, date: NaiveDate) -> Self {
        self.as_of = Some(date);
        self
    }

    pub fn len(&self) -> usize {
        self.lots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lots.is_empty()
    }
}

/// Receiver of bulk updates.
///
/// Submission is fire-and-forget: implementations report their own failures
/// and must not expect the caller to roll anything back.
pub trait BulkUpdateSink {
    fn submit(&self, update: BulkUpdate);
}

/// Drops every update. Used when no store is attached.
#[derive(Clone, Copy, Debug, Default)]
pub struct DiscardSink;

impl BulkUpdateSink for DiscardSink {
    fn submit(&self, update: BulkUpdate) {
        tracing::debug!(lots = update.len(), "no store attached, bulk update dropped");
    }
}

/// Keeps updates in memory, in submission order.
#[derive(Debug, Default)]
pub struct MemorySink {
    received: Mutex<Vec<BulkUpdate>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn received(&self) -> Vec<BulkUpdate> {
        self.received
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl BulkUpdateSink for MemorySink {
    fn submit(&self, update: BulkUpdate) {
        self.received
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(update);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{SizeClassKey, SpeciesKey};

    fn lot(id: u64, weight: f64) -> Lot {
        Lot {
            id: LotId(id),
            name: format!("L{id}"),
            species: SpeciesKey("lavaret".into()),
            size_class: SizeClassKey("e200400".into()),
            quantity: 100.0,
            current_weight_g: weight,
            cost_price_per_kg: 9.3,
            sale_price_per_kg: 11.0,
            to_remove: false,
        }
    }

    #[test]
    fn weights_are_carried_with_two_decimals() {
        let update = BulkUpdate::from_lots(&[lot(1, 310.456), lot(2, 1.0)]);
        assert_eq!(update.len(), 2);
        assert_eq!(update.lots[0].current_weight_g, Decimal::new(31046, 2));
        assert_eq!(update.lots[1].current_weight_g, Decimal::new(100, 2));
        assert!(!update.lots[0].to_remove);
    }

    #[test]
    fn memory_sink_keeps_order() {
        let sink = MemorySink::new();
        sink.submit(BulkUpdate::from_lots(&[lot(1, 100.0)]));
        sink.submit(BulkUpdate::default());
        let got = sink.received();
        assert_eq!(got.len(), 2);
        assert_eq!(got[0].lots[0].id, LotId(1));
        assert!(got[1].is_empty());
    }
}
