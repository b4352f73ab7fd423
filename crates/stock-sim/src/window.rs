//! Calendar dates at which a lot enters and leaves its ready window.

use crate::classify::{status, LotStatus};
use crate::simulator::{Reach, Simulator};
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use stock_core::{Lot, SizeClass};

/// Days until the lot reaches the start of its window.
pub fn days_to_target(sim: &Simulator<'_>, lot: &Lot, size_class: &SizeClass) -> Reach {
    sim.days_to_weight(lot.current_weight_g, size_class.target_min_g)
}

/// Days until the lot reaches the end of its window.
pub fn days_to_max(sim: &Simulator<'_>, lot: &Lot, size_class: &SizeClass) -> Reach {
    sim.days_to_weight(lot.current_weight_g, size_class.target_max_g)
}

/// A window boundary seen from today.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "event", content = "date")]
pub enum WindowEvent {
    /// Already crossed; not a computed event.
    Already,
    /// Crossed on this date.
    On(NaiveDate),
    /// Not crossed within the simulation ceiling.
    Never,
}

impl WindowEvent {
    fn from_reach(reach: Reach, today: NaiveDate) -> Self {
        match reach {
            Reach::Within(0) => WindowEvent::Already,
            Reach::Within(days) => today
                .checked_add_days(Days::new(u64::from(days)))
                .map_or(WindowEvent::Never, WindowEvent::On),
            Reach::Never => WindowEvent::Never,
        }
    }

    pub fn date(self) -> Option<NaiveDate> {
        match self {
            WindowEvent::On(date) => Some(date),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowDates {
    pub ready: WindowEvent,
    pub max: WindowEvent,
    pub days_to_ready: Reach,
    pub days_to_max: Reach,
}

/// Ready-window dates of a lot, or `None` for a flagged lot or a lot without
/// a size class.
pub fn window_dates(
    sim: &Simulator<'_>,
    lot: &Lot,
    size_class: Option<&SizeClass>,
    today: NaiveDate,
) -> Option<WindowDates> {
    let sc = size_class?;
    if status(lot, Some(sc)) == LotStatus::Perished {
        return None;
    }
    let days_to_ready = days_to_target(sim, lot, sc);
    let days_to_max = days_to_max(sim, lot, sc);
    Some(WindowDates {
        ready: WindowEvent::from_reach(days_to_ready, today),
        max: WindowEvent::from_reach(days_to_max, today),
        days_to_ready,
        days_to_max,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use stock_core::{
        CostParams, EngineConfig, GrowthParams, LotId, SizeClassKey, SizeClassKind, Species,
        SpeciesKey, SpeciesSpec,
    };

    fn species(a: f64, k: f64) -> Species {
        Species::new(SpeciesSpec {
            key: SpeciesKey("truite-arc".into()),
            name: "Truite Arc-en-ciel".into(),
            latin: None,
            default_prices: None,
            growth: GrowthParams {
                asymptotic_weight_g: a,
                rate_k: k,
            },
            cost: CostParams {
                cost_high: 14.0,
                cost_min: 6.2,
                cost_mature: 7.5,
                optimal_weight_g: 300.0,
            },
        })
    }

    fn class(lo: f64, hi: f64) -> SizeClass {
        SizeClass {
            key: SizeClassKey("e200400".into()),
            label: "Entier 200/400".into(),
            kind: SizeClassKind::Whole,
            min_g: lo,
            max_g: hi,
            target_min_g: lo,
            target_max_g: hi,
            species: BTreeSet::new(),
        }
    }

    fn lot(weight: f64) -> Lot {
        Lot {
            id: LotId(4),
            name: "A4".into(),
            species: SpeciesKey("truite-arc".into()),
            size_class: SizeClassKey("e200400".into()),
            quantity: 310.0,
            current_weight_g: weight,
            cost_price_per_kg: 7.8,
            sale_price_per_kg: 9.5,
            to_remove: false,
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 1).unwrap()
    }

    #[test]
    fn young_lot_gets_two_future_dates() {
        let sp = species(4200.0, 0.0045);
        let sim = Simulator::for_species(Some(&sp), &EngineConfig::default());
        let sc = class(200.0, 400.0);
        let w = window_dates(&sim, &lot(140.0), Some(&sc), today()).unwrap();
        let (Reach::Within(ready), Reach::Within(max)) = (w.days_to_ready, w.days_to_max) else {
            panic!("both boundaries should be reachable");
        };
        assert!(ready > 0 && max > ready);
        assert_eq!(
            w.ready,
            WindowEvent::On(today() + Days::new(u64::from(ready)))
        );
        assert!(w.max.date().unwrap() > w.ready.date().unwrap());
    }

    #[test]
    fn ready_lot_reports_already() {
        let sp = species(4200.0, 0.0045);
        let sim = Simulator::for_species(Some(&sp), &EngineConfig::default());
        let sc = class(200.0, 400.0);
        let w = window_dates(&sim, &lot(310.0), Some(&sc), today()).unwrap();
        assert_eq!(w.ready, WindowEvent::Already);
        assert!(w.max.date().is_some());

        let w = window_dates(&sim, &lot(1800.0), Some(&sc), today()).unwrap();
        assert_eq!(w.ready, WindowEvent::Already);
        assert_eq!(w.max, WindowEvent::Already);
    }

    #[test]
    fn unreachable_window_is_never() {
        let sp = species(300.0, 0.002);
        let sim = Simulator::for_species(Some(&sp), &EngineConfig::default());
        let sc = class(1500.0, 2500.0);
        let w = window_dates(&sim, &lot(280.0), Some(&sc), today()).unwrap();
        assert_eq!(w.ready, WindowEvent::Never);
        assert_eq!(w.days_to_ready, Reach::Never);
        assert_eq!(w.max, WindowEvent::Never);
    }

    #[test]
    fn flagged_or_unclassified_lot_has_no_window() {
        let sp = species(4200.0, 0.0045);
        let sim = Simulator::for_species(Some(&sp), &EngineConfig::default());
        let sc = class(200.0, 400.0);
        let mut flagged = lot(140.0);
        flagged.to_remove = true;
        assert!(window_dates(&sim, &flagged, Some(&sc), today()).is_none());
        assert!(window_dates(&sim, &lot(140.0), None, today()).is_none());
    }
}
