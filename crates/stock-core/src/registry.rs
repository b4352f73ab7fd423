//! Species and size-class registry.
//!
//! Keys coming from lots are resolved once per query into typed handles.
//! Handles stay valid until the next structural edit (insert or removal of
//! a size class); parameter edits keep them valid.

use crate::{
    validate_cost_params, validate_growth_params, validate_size_class, validate_species,
    CostParams, GrowthParams, SizeClass, SizeClassKey, Species, SpeciesKey, SpeciesSpec,
    ValidationError,
};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::info;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SpeciesHandle(usize);

impl SpeciesHandle {
    /// Position of the species in registry order.
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SizeClassHandle(usize);

impl SizeClassHandle {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum RegistryError {
    #[error("unknown species: {0}")]
    UnknownSpecies(String),
    #[error("unknown size class: {0}")]
    UnknownSizeClass(String),
    /// At least one size class must remain.
    #[error("cannot remove the last size class")]
    LastSizeClass,
    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

/// Species and size classes, kept in insertion order.
#[derive(Clone, Debug, Default)]
pub struct Registry {
    species: Vec<Species>,
    species_index: BTreeMap<SpeciesKey, SpeciesHandle>,
    size_classes: Vec<SizeClass>,
    size_class_index: BTreeMap<SizeClassKey, SizeClassHandle>,
}

impl Registry {
    /// Build a registry, validating every entry and rejecting duplicate keys.
    pub fn new(
        species: Vec<SpeciesSpec>,
        size_classes: Vec<SizeClass>,
    ) -> Result<Self, ValidationError> {
        let mut reg = Registry::default();
        for spec in species {
            validate_species(&spec)?;
            if reg.species_index.contains_key(&spec.key) {
                return Err(ValidationError::DuplicateSpecies(spec.key.0));
            }
            let handle = SpeciesHandle(reg.species.len());
            reg.species_index.insert(spec.key.clone(), handle);
            reg.species.push(Species::new(spec));
        }
        for class in size_classes {
            validate_size_class(&class)?;
            if reg.size_class_index.contains_key(&class.key) {
                return Err(ValidationError::DuplicateSizeClass(class.key.0));
            }
            let handle = SizeClassHandle(reg.size_classes.len());
            reg.size_class_index.insert(class.key.clone(), handle);
            reg.size_classes.push(class);
        }
        Ok(reg)
    }

    pub fn species_handle(&self, key: &SpeciesKey) -> Option<SpeciesHandle> {
        self.species_index.get(key).copied()
    }

    /// `None` for a handle from another registry.
    pub fn species(&self, handle: SpeciesHandle) -> Option<&Species> {
        self.species.get(handle.0)
    }

    pub fn species_by_key(&self, key: &SpeciesKey) -> Option<&Species> {
        self.species_handle(key).and_then(|h| self.species(h))
    }

    /// Species in registry order.
    pub fn all_species(&self) -> &[Species] {
        &self.species
    }

    pub fn size_class_handle(&self, key: &SizeClassKey) -> Option<SizeClassHandle> {
        self.size_class_index.get(key).copied()
    }

    /// `None` once the handle is stale, e.g. after a removal shortened the list.
    pub fn size_class(&self, handle: SizeClassHandle) -> Option<&SizeClass> {
        self.size_classes.get(handle.0)
    }

    pub fn size_class_by_key(&self, key: &SizeClassKey) -> Option<&SizeClass> {
        self.size_class_handle(key).and_then(|h| self.size_class(h))
    }

    /// Size classes in registry order.
    pub fn size_classes(&self) -> &[SizeClass] {
        &self.size_classes
    }

    /// Size classes offered for a species, in registry order.
    pub fn size_classes_for<'a>(
        &'a self,
        species: &'a SpeciesKey,
    ) -> impl Iterator<Item = &'a SizeClass> + 'a {
        self.size_classes
            .iter()
            .filter(move |c| c.applies_to(species))
    }

    /// Replace the growth and cost laws of a species; both tables are rebuilt.
    pub fn update_species_params(
        &mut self,
        key: &SpeciesKey,
        growth: GrowthParams,
        cost: CostParams,
    ) -> Result<(), RegistryError> {
        validate_growth_params(&growth)?;
        validate_cost_params(&cost)?;
        let handle = self
            .species_handle(key)
            .ok_or_else(|| RegistryError::UnknownSpecies(key.0.clone()))?;
        let species = &mut self.species[handle.0];
        species.set_growth(growth);
        species.set_cost(cost);
        info!(species = %key.0, "species parameters updated, tables rebuilt");
        Ok(())
    }

    /// Insert a size class, or replace the one with the same key.
    pub fn upsert_size_class(&mut self, class: SizeClass) -> Result<(), RegistryError> {
        validate_size_class(&class)?;
        match self.size_class_handle(&class.key) {
            Some(handle) => self.size_classes[handle.0] = class,
            None => {
                let handle = SizeClassHandle(self.size_classes.len());
                self.size_class_index.insert(class.key.clone(), handle);
                self.size_classes.push(class);
            }
        }
        Ok(())
    }

    /// Remove a size class. The last remaining one cannot be removed.
    pub fn remove_size_class(&mut self, key: &SizeClassKey) -> Result<SizeClass, RegistryError> {
        let handle = self
            .size_class_handle(key)
            .ok_or_else(|| RegistryError::UnknownSizeClass(key.0.clone()))?;
        if self.size_classes.len() <= 1 {
            return Err(RegistryError::LastSizeClass);
        }
        let removed = self.size_classes.remove(handle.0);
        self.size_class_index = self
            .size_classes
            .iter()
            .enumerate()
            .map(|(i, c)| (c.key.clone(), SizeClassHandle(i)))
            .collect();
        Ok(removed)
    }
}
