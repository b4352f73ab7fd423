//! Lifecycle status and gauge position of a lot.

use serde::{Deserialize, Serialize};
use stock_core::{Lot, SizeClass};

/// Lot lifecycle, ordered the way the stock view lists lots.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LotStatus {
    /// Flagged for removal (dead or culled).
    Perished,
    /// Heavier than the ready window.
    Overripe,
    /// Inside the ready window.
    Ready,
    /// Lighter than the ready window, or without a size class.
    TooSmall,
}

impl LotStatus {
    pub const ALL: [LotStatus; 4] = [
        LotStatus::TooSmall,
        LotStatus::Ready,
        LotStatus::Overripe,
        LotStatus::Perished,
    ];

    pub fn label(self) -> &'static str {
        match self {
            LotStatus::TooSmall => "too small",
            LotStatus::Ready => "ready",
            LotStatus::Overripe => "overripe",
            LotStatus::Perished => "perished",
        }
    }
}

/// Classify a lot. The removal flag wins over everything else.
pub fn status(lot: &Lot, size_class: Option<&SizeClass>) -> LotStatus {
    if lot.to_remove {
        return LotStatus::Perished;
    }
    let Some(sc) = size_class else {
        return LotStatus::TooSmall;
    };
    let w = lot.current_weight_g;
    if w < sc.target_min_g {
        LotStatus::TooSmall
    } else if w <= sc.target_max_g {
        LotStatus::Ready
    } else {
        LotStatus::Overripe
    }
}

/// Upper end of the too-small band.
pub const GAUGE_TOO_SMALL_MAX: f64 = 59.0;
/// Start of the ready band.
pub const GAUGE_READY_START: f64 = 60.0;
/// Start of the overripe band.
pub const GAUGE_OVERRIPE_START: f64 = 92.0;
/// Overshoot past the window that fills the overripe band.
const OVERSHOOT_SPAN: f64 = 0.15;

/// Position of the lot on a 0-100 gauge.
///
/// Bands: 0-59 below the window, 60-92 inside it, 92-100 past it. Each band
/// is monotonic in weight; perished lots sit at 0.
pub fn gauge_position(lot: &Lot, size_class: Option<&SizeClass>) -> f64 {
    let w = lot.current_weight_g;
    let pos = match status(lot, size_class) {
        LotStatus::Perished => 0.0,
        LotStatus::TooSmall => {
            let target_min = size_class.map_or(1.0, |sc| sc.target_min_g);
            (w / target_min * GAUGE_READY_START).min(GAUGE_TOO_SMALL_MAX)
        }
        LotStatus::Ready => {
            let (lo, hi) = window(size_class);
            let width = if hi - lo > 0.0 { hi - lo } else { 1.0 };
            GAUGE_READY_START + (w - lo) / width * (GAUGE_OVERRIPE_START - GAUGE_READY_START)
        }
        LotStatus::Overripe => {
            let (_, hi) = window(size_class);
            let overshoot = ((w - hi) / (hi * OVERSHOOT_SPAN)).min(1.0);
            GAUGE_OVERRIPE_START + overshoot * (100.0 - GAUGE_OVERRIPE_START)
        }
    };
    if pos.is_finite() {
        pos.clamp(0.0, 100.0)
    } else {
        0.0
    }
}

fn window(size_class: Option<&SizeClass>) -> (f64, f64) {
    size_class.map_or((0.0, 0.0), |sc| (sc.target_min_g, sc.target_max_g))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::BTreeSet;
    use stock_core::{LotId, SizeClassKey, SizeClassKind, SpeciesKey};

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

    fn lot(weight: f64, to_remove: bool) -> Lot {
        Lot {
            id: LotId(1),
            name: "A4".into(),
            species: SpeciesKey("truite-arc".into()),
            size_class: SizeClassKey("e200400".into()),
            quantity: 310.0,
            current_weight_g: weight,
            cost_price_per_kg: 7.8,
            sale_price_per_kg: 9.5,
            to_remove,
        }
    }

    #[test]
    fn window_boundaries() {
        let sc = class(200.0, 400.0);
        assert_eq!(status(&lot(140.0, false), Some(&sc)), LotStatus::TooSmall);
        assert_eq!(status(&lot(199.99, false), Some(&sc)), LotStatus::TooSmall);
        assert_eq!(status(&lot(200.0, false), Some(&sc)), LotStatus::Ready);
        assert_eq!(status(&lot(400.0, false), Some(&sc)), LotStatus::Ready);
        assert_eq!(status(&lot(400.01, false), Some(&sc)), LotStatus::Overripe);
        assert_eq!(status(&lot(1800.0, false), Some(&sc)), LotStatus::Overripe);
    }

    #[test]
    fn missing_size_class_is_too_small() {
        assert_eq!(status(&lot(5000.0, false), None), LotStatus::TooSmall);
        assert_eq!(gauge_position(&lot(5000.0, false), None), GAUGE_TOO_SMALL_MAX);
        assert_eq!(status(&lot(5000.0, true), None), LotStatus::Perished);
    }

    #[test]
    fn gauge_bands() {
        let sc = class(200.0, 400.0);
        assert_eq!(gauge_position(&lot(100.0, false), Some(&sc)), 30.0);
        assert_eq!(gauge_position(&lot(200.0, false), Some(&sc)), 60.0);
        assert_eq!(gauge_position(&lot(300.0, false), Some(&sc)), 76.0);
        assert_eq!(gauge_position(&lot(400.0, false), Some(&sc)), 92.0);
        assert_eq!(gauge_position(&lot(430.0, false), Some(&sc)), 96.0);
        assert_eq!(gauge_position(&lot(1800.0, false), Some(&sc)), 100.0);
        assert_eq!(gauge_position(&lot(300.0, true), Some(&sc)), 0.0);
    }

    #[test]
    fn degenerate_window_stays_in_range() {
        let sc = class(0.0, 0.0);
        assert_eq!(status(&lot(10.0, false), Some(&sc)), LotStatus::Overripe);
        assert_eq!(gauge_position(&lot(10.0, false), Some(&sc)), 100.0);
        let point = class(300.0, 300.0);
        assert_eq!(gauge_position(&lot(300.0, false), Some(&point)), 60.0);
    }

    #[test]
    fn statuses_sort_in_listing_order() {
        let mut all = LotStatus::ALL.to_vec();
        all.sort();
        assert_eq!(
            all,
            vec![
                LotStatus::Perished,
                LotStatus::Overripe,
                LotStatus::Ready,
                LotStatus::TooSmall
            ]
        );
    }

    proptest! {
        #[test]
        fn status_is_total_and_flag_wins(
            w in prop::num::f64::ANY,
            lo in 0.0f64..3000.0,
            span in 0.0f64..2000.0,
            flagged in any::<bool>(),
        ) {
            let sc = class(lo, lo + span);
            let l = lot(w, flagged);
            let s = status(&l, Some(&sc));
            prop_assert!(LotStatus::ALL.contains(&s));
            if flagged {
                prop_assert_eq!(s, LotStatus::Perished);
            }
            let g = gauge_position(&l, Some(&sc));
            prop_assert!((0.0..=100.0).contains(&g));
        }

        #[test]
        fn gauge_is_monotonic_within_a_status(a in 1.0f64..3000.0, b in 1.0f64..3000.0) {
            let sc = class(200.0, 400.0);
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            let (l1, l2) = (lot(lo, false), lot(hi, false));
            if status(&l1, Some(&sc)) == status(&l2, Some(&sc)) {
                prop_assert!(gauge_position(&l1, Some(&sc)) <= gauge_position(&l2, Some(&sc)));
            }
        }
    }
}
