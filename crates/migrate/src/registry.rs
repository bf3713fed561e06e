//! Immutable ordered migration registry.
//!
//! Units are registered on a builder, from already-resolved store
//! handles, and frozen into an immutable ordered sequence. No singleton
//! state, no hidden global list: the registry a runner receives is the
//! complete, explicit unit list for that run.

use std::collections::BTreeSet;

use quorum_storage::MembershipStore;

use crate::error::MigrationError;
use crate::unit::MigrationUnit;

/// An immutable, ordered sequence of migration units.
///
/// List position is the application order and is part of the deployed
/// contract -- append new units, never reorder released ones.
pub struct MigrationRegistry<S> {
    units: Vec<Box<dyn MigrationUnit<S>>>,
}

impl<S: MembershipStore> std::fmt::Debug for MigrationRegistry<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MigrationRegistry")
            .field("units", &self.units.iter().map(|u| u.name()).collect::<Vec<_>>())
            .finish()
    }
}

impl<S: MembershipStore> MigrationRegistry<S> {
    pub fn builder() -> RegistryBuilder<S> {
        RegistryBuilder { units: Vec::new() }
    }

    /// Units in application order.
    pub fn iter(&self) -> impl Iterator<Item = &dyn MigrationUnit<S>> {
        self.units.iter().map(|u| u.as_ref())
    }

    /// Resolve a unit by name.
    pub fn find(&self, name: &str) -> Option<&dyn MigrationUnit<S>> {
        self.units
            .iter()
            .find(|u| u.name() == name)
            .map(|u| u.as_ref())
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Unit names in application order.
    pub fn names(&self) -> Vec<&str> {
        self.units.iter().map(|u| u.name()).collect()
    }
}

/// Builder for [`MigrationRegistry`].
pub struct RegistryBuilder<S> {
    units: Vec<Box<dyn MigrationUnit<S>>>,
}

impl<S: MembershipStore> RegistryBuilder<S> {
    /// Append a unit at the end of the order.
    pub fn register<U>(mut self, unit: U) -> Self
    where
        U: MigrationUnit<S> + 'static,
    {
        self.units.push(Box::new(unit));
        self
    }

    /// Freeze the registry.
    ///
    /// Fails with [`MigrationError::DuplicateName`] if two units share a
    /// name -- names are the idempotence key, a duplicate would make the
    /// second unit unreachable and its record ambiguous.
    pub fn build(self) -> Result<MigrationRegistry<S>, MigrationError> {
        let mut seen = BTreeSet::new();
        for unit in &self.units {
            if !seen.insert(unit.name().to_string()) {
                return Err(MigrationError::DuplicateName {
                    name: unit.name().to_string(),
                });
            }
        }
        Ok(MigrationRegistry { units: self.units })
    }
}
