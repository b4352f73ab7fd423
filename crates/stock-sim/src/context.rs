//! Simulation context: registry, lots, engine config and the current date.

use crate::classify::{gauge_position, status, LotStatus};
use crate::simulator::Simulator;
use crate::window::{window_dates, WindowDates};
use chrono::NaiveDate;
use std::collections::HashSet;
use stock_core::{
    validate_inventory, validate_lot, validate_new_lot, CostLookup, CostParams, EngineConfig,
    GrowthLookup, GrowthParams, Inventory, Lot, LotId, NewLot, Registry, RegistryError,
    SizeClass, SizeClassKey, Species, SpeciesKey, ValidationError,
};
use stock_econ::{lot_margin, margin_profile, LotMargin, MarginProfile};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error, PartialEq)]
pub enum ContextError {
    #[error("unknown lot: {0}")]
    UnknownLot(u64),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

/// Everything a query needs, owned in one place and passed explicitly.
#[derive(Clone, Debug)]
pub struct SimContext {
    pub(crate) registry: Registry,
    pub(crate) lots: Vec<Lot>,
    pub(crate) config: EngineConfig,
    pub(crate) today: NaiveDate,
}

impl SimContext {
    pub fn new(
        registry: Registry,
        lots: Vec<Lot>,
        config: EngineConfig,
        today: NaiveDate,
    ) -> Result<Self, ContextError> {
        let mut seen = HashSet::new();
        for lot in &lots {
            validate_lot(lot)?;
            if !seen.insert(lot.id) {
                return Err(ValidationError::DuplicateLot(lot.id.0).into());
            }
        }
        Ok(Self {
            registry,
            lots,
            config,
            today,
        })
    }

    pub fn from_inventory(inventory: Inventory) -> Result<Self, ContextError> {
        validate_inventory(&inventory)?;
        let registry = Registry::new(inventory.species, inventory.size_classes)?;
        Self::new(registry, inventory.lots, inventory.engine, inventory.as_of)
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn lots(&self) -> &[Lot] {
        &self.lots
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    pub fn set_today(&mut self, today: NaiveDate) {
        self.today = today;
    }

    pub fn lot(&self, id: LotId) -> Option<&Lot> {
        self.lots.iter().find(|l| l.id == id)
    }

    /// Look up the species and size class of a lot once for this query.
    pub fn resolve<'a>(&'a self, lot: &'a Lot) -> ResolvedLot<'a> {
        ResolvedLot {
            lot,
            species: self.registry.species_by_key(&lot.species),
            size_class: self.registry.size_class_by_key(&lot.size_class),
            config: &self.config,
        }
    }

    pub fn resolved(&self) -> impl Iterator<Item = ResolvedLot<'_>> + '_ {
        self.lots.iter().map(move |l| self.resolve(l))
    }

    /// Validate and insert a new lot under the next free id.
    pub fn add_lot(&mut self, new_lot: NewLot) -> Result<LotId, ContextError> {
        validate_new_lot(&new_lot)?;
        let next = self.lots.iter().map(|l| l.id.0).max().map_or(1, |m| m + 1);
        let id = LotId(next);
        info!(lot = id.0, name = %new_lot.name, "lot added");
        self.lots.push(new_lot.into_lot(id));
        Ok(id)
    }

    pub fn remove_lot(&mut self, id: LotId) -> Result<Lot, ContextError> {
        let idx = self
            .lots
            .iter()
            .position(|l| l.id == id)
            .ok_or(ContextError::UnknownLot(id.0))?;
        info!(lot = id.0, "lot removed");
        Ok(self.lots.remove(idx))
    }

    /// Flag or unflag a lot for removal.
    pub fn set_to_remove(&mut self, id: LotId, to_remove: bool) -> Result<(), ContextError> {
        let lot = self
            .lots
            .iter_mut()
            .find(|l| l.id == id)
            .ok_or(ContextError::UnknownLot(id.0))?;
        lot.to_remove = to_remove;
        Ok(())
    }

    pub fn update_species_params(
        &mut self,
        key: &SpeciesKey,
        growth: GrowthParams,
        cost: CostParams,
    ) -> Result<(), ContextError> {
        Ok(self.registry.update_species_params(key, growth, cost)?)
    }

    pub fn upsert_size_class(&mut self, class: SizeClass) -> Result<(), ContextError> {
        Ok(self.registry.upsert_size_class(class)?)
    }

    /// Lots keep their key; a lot whose size class is gone classifies as too small.
    pub fn remove_size_class(&mut self, key: &SizeClassKey) -> Result<SizeClass, ContextError> {
        Ok(self.registry.remove_size_class(key)?)
    }

    pub fn size_classes_for<'a>(
        &'a self,
        species: &'a SpeciesKey,
    ) -> impl Iterator<Item = &'a SizeClass> + 'a {
        self.registry.size_classes_for(species)
    }
}

/// A lot with its species and size class looked up.
#[derive(Clone, Copy, Debug)]
pub struct ResolvedLot<'a> {
    pub lot: &'a Lot,
    pub species: Option<&'a Species>,
    pub size_class: Option<&'a SizeClass>,
    config: &'a EngineConfig,
}

impl<'a> ResolvedLot<'a> {
    pub fn config(&self) -> &'a EngineConfig {
        self.config
    }

    pub fn growth(&self) -> GrowthLookup<'a> {
        GrowthLookup::new(self.species, &self.config.fallback)
    }

    pub fn costs(&self) -> CostLookup<'a> {
        CostLookup::new(self.species, &self.config.fallback)
    }

    pub fn simulator(&self) -> Simulator<'a> {
        Simulator::new(self.growth(), self.config.max_sim_days)
    }

    pub fn status(&self) -> LotStatus {
        status(self.lot, self.size_class)
    }

    pub fn gauge(&self) -> f64 {
        gauge_position(self.lot, self.size_class)
    }

    pub fn margin(&self) -> LotMargin {
        lot_margin(self.lot, &self.costs())
    }

    pub fn window(&self, today: NaiveDate) -> Option<WindowDates> {
        window_dates(&self.simulator(), self.lot, self.size_class, today)
    }

    pub fn margin_profile(&self) -> Option<MarginProfile> {
        margin_profile(
            self.lot,
            self.size_class,
            &self.growth(),
            &self.costs(),
            self.config,
        )
    }
}
