#![deny(warnings)]

//! Core domain models and invariants for AquaStock.
//!
//! This crate defines the serializable species, size-class and lot types,
//! the per-species growth and cost tables derived from them, the registry
//! that resolves keys to typed handles, and the validation helpers applied
//! at the boundary where external data enters the engine.

pub mod config;
pub mod registry;
pub mod tables;
pub mod update;

pub use config::{EngineConfig, FallbackPolicy};
pub use registry::{Registry, RegistryError, SizeClassHandle, SpeciesHandle};
pub use tables::{bucket_index, round_to, CostTable, GrowthTable, TABLE_LEN};
pub use update::{BulkUpdate, BulkUpdateSink, DiscardSink, LotWeightUpdate, MemorySink};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Species identifier, e.g. "truite-arc".
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SpeciesKey(pub String);

/// Size-class identifier, e.g. "e200400".
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SizeClassKey(pub String);

/// Lot identifier assigned by the store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LotId(pub u64);

/// Gompertz growth-law parameters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GrowthParams {
    /// Asymptotic weight `A` in grams.
    pub asymptotic_weight_g: f64,
    /// Rate constant `k` (per day).
    pub rate_k: f64,
}

/// Production-cost law parameters, all costs per kg.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CostParams {
    /// Cost at hatchling size.
    pub cost_high: f64,
    /// Floor the cost falls toward.
    pub cost_min: f64,
    /// Cost reached by fully grown fish.
    pub cost_mature: f64,
    /// Weight around which the cost is lowest, in grams.
    pub optimal_weight_g: f64,
}

/// Prices suggested when a lot of this species is created.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DefaultPrices {
    pub cost_price_per_kg: f64,
    pub sale_price_per_kg: f64,
}

/// Editable description of a species.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpeciesSpec {
    pub key: SpeciesKey,
    pub name: String,
    #[serde(default)]
    pub latin: Option<String>,
    #[serde(default)]
    pub default_prices: Option<DefaultPrices>,
    pub growth: GrowthParams,
    pub cost: CostParams,
}

/// A species with its derived lookup tables.
///
/// Tables are rebuilt in full whenever the parameters they derive from change.
#[derive(Clone, Debug, PartialEq)]
pub struct Species {
    spec: SpeciesSpec,
    growth_table: GrowthTable,
    cost_table: CostTable,
}

impl Species {
    pub fn new(spec: SpeciesSpec) -> Self {
        let growth_table = GrowthTable::build(&spec.growth);
        let cost_table = CostTable::build(&spec.cost);
        Self {
            spec,
            growth_table,
            cost_table,
        }
    }

    pub fn key(&self) -> &SpeciesKey {
        &self.spec.key
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn spec(&self) -> &SpeciesSpec {
        &self.spec
    }

    pub fn growth_table(&self) -> &GrowthTable {
        &self.growth_table
    }

    pub fn cost_table(&self) -> &CostTable {
        &self.cost_table
    }

    pub fn set_growth(&mut self, params: GrowthParams) {
        self.spec.growth = params;
        self.growth_table = GrowthTable::build(&params);
    }

    pub fn set_cost(&mut self, params: CostParams) {
        self.spec.cost = params;
        self.cost_table = CostTable::build(&params);
    }
}

/// Commercial presentation of a size class.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SizeClassKind {
    Whole,
    Fillet,
}

/// A commercial size bracket ("calibre") with its ready-to-sell window.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SizeClass {
    pub key: SizeClassKey,
    pub label: String,
    pub kind: SizeClassKind,
    /// Physical lower bound in grams.
    pub min_g: f64,
    /// Physical upper bound in grams.
    pub max_g: f64,
    /// Lowest sellable weight in grams.
    pub target_min_g: f64,
    /// Highest sellable weight in grams.
    pub target_max_g: f64,
    /// Species this size class is offered for.
    #[serde(default)]
    pub species: BTreeSet<SpeciesKey>,
}

impl SizeClass {
    pub fn applies_to(&self, species: &SpeciesKey) -> bool {
        self.species.contains(species)
    }
}

/// A tracked batch of fish of one species.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Lot {
    pub id: LotId,
    pub name: String,
    pub species: SpeciesKey,
    pub size_class: SizeClassKey,
    /// Count or mass, whatever unit the lot is recorded in.
    pub quantity: f64,
    /// Live weight of one fish in grams.
    pub current_weight_g: f64,
    pub cost_price_per_kg: f64,
    pub sale_price_per_kg: f64,
    /// Perished or culled, waiting to be taken out.
    #[serde(default)]
    pub to_remove: bool,
}

/// Request to create a lot; the id is allocated by the caller's context.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewLot {
    pub name: String,
    pub species: SpeciesKey,
    pub size_class: SizeClassKey,
    pub quantity: f64,
    pub current_weight_g: f64,
    pub cost_price_per_kg: f64,
    pub sale_price_per_kg: f64,
}

impl NewLot {
    pub fn into_lot(self, id: LotId) -> Lot {
        Lot {
            id,
            name: self.name,
            species: self.species,
            size_class: self.size_class,
            quantity: self.quantity,
            current_weight_g: self.current_weight_g,
            cost_price_per_kg: self.cost_price_per_kg,
            sale_price_per_kg: self.sale_price_per_kg,
            to_remove: false,
        }
    }
}

/// Everything the engine needs to start a session.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Inventory {
    /// Calendar date the recorded weights refer to.
    pub as_of: NaiveDate,
    #[serde(default)]
    pub engine: EngineConfig,
    pub species: Vec<SpeciesSpec>,
    #[serde(default)]
    pub size_classes: Vec<SizeClass>,
    #[serde(default)]
    pub lots: Vec<Lot>,
}

/// Errors raised while reading an inventory file.
#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("inventory parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

impl Inventory {
    pub fn from_yaml_str(text: &str) -> Result<Self, InventoryError> {
        let inventory: Inventory = serde_yaml::from_str(text)?;
        inventory.validate()?;
        Ok(inventory)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, InventoryError> {
        let text = fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_inventory(self)
    }
}

/// Validation errors for domain invariants.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    /// Numeric field must be finite.
    #[error("non-finite value for {0}")]
    NonFinite(&'static str),
    /// Field must be strictly positive.
    #[error("{0} must be > 0")]
    NonPositive(&'static str),
    /// Field must not be negative.
    #[error("{0} must be >= 0")]
    Negative(&'static str),
    /// Lower bound above upper bound.
    #[error("{field}: lower bound {low} is above upper bound {high}")]
    InvertedRange {
        field: &'static str,
        low: f64,
        high: f64,
    },
    /// Cost ramp needs 60% of the optimal weight below 5000 g.
    #[error("optimal weight {0} g is outside (0, 8333) g")]
    OptimalWeightOutOfRange(f64),
    /// Keys and names must not be blank.
    #[error("{0} must not be empty")]
    Empty(&'static str),
    #[error("species {0} defined more than once")]
    DuplicateSpecies(String),
    #[error("size class {0} defined more than once")]
    DuplicateSizeClass(String),
    #[error("lot id {0} used more than once")]
    DuplicateLot(u64),
    /// New lots must sell above their cost price.
    #[error("sale price must be above cost price")]
    SaleNotAboveCost,
}

fn finite(value: f64, field: &'static str) -> Result<f64, ValidationError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ValidationError::NonFinite(field))
    }
}

fn positive(value: f64, field: &'static str) -> Result<(), ValidationError> {
    if finite(value, field)? <= 0.0 {
        return Err(ValidationError::NonPositive(field));
    }
    Ok(())
}

fn non_negative(value: f64, field: &'static str) -> Result<(), ValidationError> {
    if finite(value, field)? < 0.0 {
        return Err(ValidationError::Negative(field));
    }
    Ok(())
}

/// Validate growth-law parameters.
pub fn validate_growth_params(p: &GrowthParams) -> Result<(), ValidationError> {
    positive(p.asymptotic_weight_g, "asymptotic weight")?;
    positive(p.rate_k, "growth rate")?;
    Ok(())
}

/// Validate cost-law parameters.
pub fn validate_cost_params(p: &CostParams) -> Result<(), ValidationError> {
    non_negative(p.cost_high, "cost_high")?;
    non_negative(p.cost_min, "cost_min")?;
    non_negative(p.cost_mature, "cost_mature")?;
    let opt = finite(p.optimal_weight_g, "optimal weight")?;
    if opt <= 0.0 || 0.6 * opt >= tables::WEIGHT_AXIS_MAX_G {
        return Err(ValidationError::OptimalWeightOutOfRange(opt));
    }
    Ok(())
}

/// Validate a species description.
pub fn validate_species(s: &SpeciesSpec) -> Result<(), ValidationError> {
    if s.key.0.trim().is_empty() {
        return Err(ValidationError::Empty("species key"));
    }
    validate_growth_params(&s.growth)?;
    validate_cost_params(&s.cost)?;
    if let Some(prices) = &s.default_prices {
        non_negative(prices.cost_price_per_kg, "default cost price")?;
        non_negative(prices.sale_price_per_kg, "default sale price")?;
    }
    Ok(())
}

/// Validate a size class.
pub fn validate_size_class(c: &SizeClass) -> Result<(), ValidationError> {
    if c.key.0.trim().is_empty() {
        return Err(ValidationError::Empty("size class key"));
    }
    non_negative(c.min_g, "size class min")?;
    non_negative(c.max_g, "size class max")?;
    non_negative(c.target_min_g, "target min")?;
    non_negative(c.target_max_g, "target max")?;
    if c.min_g > c.max_g {
        return Err(ValidationError::InvertedRange {
            field: "size class bounds",
            low: c.min_g,
            high: c.max_g,
        });
    }
    if c.target_min_g > c.target_max_g {
        return Err(ValidationError::InvertedRange {
            field: "target window",
            low: c.target_min_g,
            high: c.target_max_g,
        });
    }
    Ok(())
}

/// Validate a stored lot. Unknown species or size-class keys are accepted;
/// the engine resolves them through its fallback policy.
pub fn validate_lot(l: &Lot) -> Result<(), ValidationError> {
    non_negative(l.quantity, "quantity")?;
    positive(l.current_weight_g, "current weight")?;
    non_negative(l.cost_price_per_kg, "cost price")?;
    non_negative(l.sale_price_per_kg, "sale price")?;
    Ok(())
}

/// Validate a lot creation request.
pub fn validate_new_lot(l: &NewLot) -> Result<(), ValidationError> {
    if l.name.trim().is_empty() {
        return Err(ValidationError::Empty("lot name"));
    }
    positive(l.quantity, "quantity")?;
    positive(l.current_weight_g, "current weight")?;
    non_negative(l.cost_price_per_kg, "cost price")?;
    non_negative(l.sale_price_per_kg, "sale price")?;
    if l.sale_price_per_kg <= l.cost_price_per_kg {
        return Err(ValidationError::SaleNotAboveCost);
    }
    Ok(())
}

/// Validate an inventory, including key and id uniqueness.
pub fn validate_inventory(inv: &Inventory) -> Result<(), ValidationError> {
    let mut species = HashSet::new();
    for s in &inv.species {
        validate_species(s)?;
        if !species.insert(&s.key) {
            return Err(ValidationError::DuplicateSpecies(s.key.0.clone()));
        }
    }
    let mut classes = HashSet::new();
    for c in &inv.size_classes {
        validate_size_class(c)?;
        if !classes.insert(&c.key) {
            return Err(ValidationError::DuplicateSizeClass(c.key.0.clone()));
        }
    }
    let mut ids = HashSet::new();
    for l in &inv.lots {
        validate_lot(l)?;
        if !ids.insert(l.id) {
            return Err(ValidationError::DuplicateLot(l.id.0));
        }
    }
    Ok(())
}

/// Growth lookup for one query, falling back when the species is unknown.
#[derive(Clone, Copy, Debug)]
pub struct GrowthLookup<'a> {
    table: Option<&'a GrowthTable>,
    fallback: f64,
}

impl<'a> GrowthLookup<'a> {
    pub fn new(species: Option<&'a Species>, policy: &FallbackPolicy) -> Self {
        Self {
            table: species.map(Species::growth_table),
            fallback: policy.missing_gain_g_per_day,
        }
    }

    /// Daily gain in g/day at the given weight.
    pub fn gain_at(&self, weight_g: f64) -> f64 {
        match self.table {
            Some(table) => table.gain_at(weight_g),
            None => self.fallback,
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.table.is_none()
    }
}

/// Cost lookup for one query, falling back when the species is unknown.
#[derive(Clone, Copy, Debug)]
pub struct CostLookup<'a> {
    table: Option<&'a CostTable>,
    fallback: f64,
}

impl<'a> CostLookup<'a> {
    pub fn new(species: Option<&'a Species>, policy: &FallbackPolicy) -> Self {
        Self {
            table: species.map(Species::cost_table),
            fallback: policy.missing_cost_per_kg,
        }
    }

    /// Production cost per kg at the given weight.
    pub fn cost_at(&self, weight_g: f64) -> f64 {
        match self.table {
            Some(table) => table.cost_at(weight_g),
            None => self.fallback,
        }
    }

    /// Whether costs come from a real table. A fallback cost is unknown, not free.
    pub fn is_known(&self) -> bool {
        self.table.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn rainbow() -> SpeciesSpec {
        SpeciesSpec {
            key: SpeciesKey("truite-arc".into()),
            name: "Truite Arc-en-ciel".into(),
            latin: Some("Oncorhynchus mykiss".into()),
            default_prices: Some(DefaultPrices {
                cost_price_per_kg: 7.8,
                sale_price_per_kg: 9.5,
            }),
            growth: GrowthParams {
                asymptotic_weight_g: 4200.0,
                rate_k: 0.0045,
            },
            cost: CostParams {
                cost_high: 14.0,
                cost_min: 6.2,
                cost_mature: 7.5,
                optimal_weight_g: 300.0,
            },
        }
    }

    fn new_lot() -> NewLot {
        NewLot {
            name: "A5".into(),
            species: SpeciesKey("truite-arc".into()),
            size_class: SizeClassKey("e200400".into()),
            quantity: 300.0,
            current_weight_g: 120.0,
            cost_price_per_kg: 7.8,
            sale_price_per_kg: 9.5,
        }
    }

    #[test]
    fn editing_parameters_rebuilds_tables() {
        let mut sp = Species::new(rainbow());
        let before = sp.growth_table().gain_at(500.0);
        sp.set_growth(GrowthParams {
            asymptotic_weight_g: 2200.0,
            rate_k: 0.0032,
        });
        assert_ne!(sp.growth_table().gain_at(500.0), before);
        assert_eq!(
            sp.growth_table(),
            &GrowthTable::build(&sp.spec().growth)
        );

        let cheap = sp.cost_table().cost_at(400.0);
        let mut cost = sp.spec().cost;
        cost.cost_min = 3.0;
        sp.set_cost(cost);
        assert!(sp.cost_table().cost_at(400.0) < cheap);
    }

    #[test]
    fn lookups_fall_back_without_species() {
        let policy = FallbackPolicy::default();
        let growth = GrowthLookup::new(None, &policy);
        let cost = CostLookup::new(None, &policy);
        assert!(growth.is_fallback());
        assert_eq!(growth.gain_at(250.0), 3.0);
        assert_eq!(cost.cost_at(250.0), 0.0);
        assert!(!cost.is_known());

        let sp = Species::new(rainbow());
        let growth = GrowthLookup::new(Some(&sp), &policy);
        assert_eq!(growth.gain_at(250.0), sp.growth_table().gain_at(250.0));
        assert!(CostLookup::new(Some(&sp), &policy).is_known());
    }

    #[test]
    fn species_validation() {
        assert!(validate_species(&rainbow()).is_ok());
        let mut bad = rainbow();
        bad.growth.rate_k = 0.0;
        assert_eq!(
            validate_species(&bad),
            Err(ValidationError::NonPositive("growth rate"))
        );
        let mut bad = rainbow();
        bad.cost.optimal_weight_g = 9000.0;
        assert_eq!(
            validate_species(&bad),
            Err(ValidationError::OptimalWeightOutOfRange(9000.0))
        );
        let mut bad = rainbow();
        bad.growth.asymptotic_weight_g = f64::NAN;
        assert_eq!(
            validate_species(&bad),
            Err(ValidationError::NonFinite("asymptotic weight"))
        );
    }

    #[test]
    fn new_lot_validation_follows_add_form() {
        assert!(validate_new_lot(&new_lot()).is_ok());
        let mut l = new_lot();
        l.sale_price_per_kg = 7.8;
        assert_eq!(validate_new_lot(&l), Err(ValidationError::SaleNotAboveCost));
        let mut l = new_lot();
        l.quantity = 0.0;
        assert_eq!(validate_new_lot(&l), Err(ValidationError::NonPositive("quantity")));
        let mut l = new_lot();
        l.name = "  ".into();
        assert_eq!(validate_new_lot(&l), Err(ValidationError::Empty("lot name")));
    }

    #[test]
    fn inverted_window_is_rejected() {
        let c = SizeClass {
            key: SizeClassKey("f400600".into()),
            label: "Filet 400/600".into(),
            kind: SizeClassKind::Fillet,
            min_g: 400.0,
            max_g: 600.0,
            target_min_g: 600.0,
            target_max_g: 400.0,
            species: BTreeSet::new(),
        };
        assert!(matches!(
            validate_size_class(&c),
            Err(ValidationError::InvertedRange { field: "target window", .. })
        ));
    }

    #[test]
    fn inventory_yaml_roundtrip_and_duplicates() {
        let text = r#"
as_of: "2026-03-02"
engine:
  max_sim_days: 2000
species:
  - key: truite-arc
    name: Truite Arc-en-ciel
    growth: { asymptotic_weight_g: 4200.0, rate_k: 0.0045 }
    cost: { cost_high: 14.0, cost_min: 6.2, cost_mature: 7.5, optimal_weight_g: 300.0 }
size_classes:
  - key: e200400
    label: Entier 200/400
    kind: whole
    min_g: 200
    max_g: 400
    target_min_g: 200
    target_max_g: 400
    species: [truite-arc]
lots:
  - id: 1
    name: A1
    species: truite-arc
    size_class: e200400
    quantity: 620
    current_weight_g: 430
    cost_price_per_kg: 7.8
    sale_price_per_kg: 9.5
"#;
        let inv = Inventory::from_yaml_str(text).unwrap();
        assert_eq!(inv.as_of, NaiveDate::from_ymd_opt(2026, 3, 2).unwrap());
        assert_eq!(inv.engine.max_sim_days, 2000);
        assert_eq!(inv.engine.chart_max_days, 1200);
        assert!(inv.size_classes[0].applies_to(&SpeciesKey("truite-arc".into())));
        assert!(!inv.lots[0].to_remove);

        let json = serde_json::to_string(&inv.lots[0]).unwrap();
        let back: Lot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, inv.lots[0]);

        let mut dup = inv.clone();
        dup.lots.push(dup.lots[0].clone());
        assert_eq!(dup.validate(), Err(ValidationError::DuplicateLot(1)));
    }

    proptest! {
        #[test]
        fn valid_new_lots_pass(qty in 0.1f64..10_000.0, w in 0.5f64..5000.0, cost in 0.0f64..50.0, markup in 0.01f64..20.0) {
            let l = NewLot {
                quantity: qty,
                current_weight_g: w,
                cost_price_per_kg: cost,
                sale_price_per_kg: cost + markup,
                ..new_lot()
            };
            prop_assert!(validate_new_lot(&l).is_ok());
        }
    }
}
