//! Write-once address registry scoped to one orchestration run.

use std::collections::BTreeMap;

use alloy_core::primitives::Address;

use crate::error::OrchestrationError;

/// Mapping from component name to its address.
///
/// Two layers are kept: seeds are pinned per-network addresses supplied before the run
/// starts and act as a fallback, resolved entries are written by the run itself. A name
/// is resolved at most once; a resolved entry shadows a seed of the same name.
#[derive(Debug, Clone, Default)]
pub struct AddressRegistry {
    seeded: BTreeMap<String, Address>,
    resolved: BTreeMap<String, Address>,
}

impl AddressRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry pre-populated with pinned addresses.
    pub fn with_seeds<I, S>(seeds: I) -> Result<Self, OrchestrationError>
    where
        I: IntoIterator<Item = (S, Address)>,
        S: Into<String>,
    {
        let mut registry = Self::new();
        for (name, address) in seeds {
            registry.seed(name, address)?;
        }
        Ok(registry)
    }

    /// Pre-populate a known address. Fails once the name has been resolved.
    ///
    /// Re-seeding an unresolved name replaces the previous seed.
    pub fn seed(
        &mut self,
        name: impl Into<String>,
        address: Address,
    ) -> Result<(), OrchestrationError> {
        let name = name.into();
        if self.resolved.contains_key(&name) {
            return Err(OrchestrationError::DuplicateComponent { name });
        }
        tracing::debug!(component = %name, %address, "Seeded pinned address");
        self.seeded.insert(name, address);
        Ok(())
    }

    /// Record the address a component resolved to. Never overwrites.
    pub fn set(
        &mut self,
        name: impl Into<String>,
        address: Address,
    ) -> Result<(), OrchestrationError> {
        let name = name.into();
        if self.resolved.contains_key(&name) {
            return Err(OrchestrationError::DuplicateComponent { name });
        }
        self.resolved.insert(name, address);
        Ok(())
    }

    /// Look up an address, preferring a resolved entry over a seed.
    pub fn get(&self, name: &str) -> Result<Address, OrchestrationError> {
        self.resolved
            .get(name)
            .or_else(|| self.seeded.get(name))
            .copied()
            .ok_or_else(|| OrchestrationError::UnresolvedDependency {
                name: name.to_string(),
            })
    }

    pub fn is_resolved(&self, name: &str) -> bool {
        self.resolved.contains_key(name)
    }

    pub fn is_seeded(&self, name: &str) -> bool {
        self.seeded.contains_key(name)
    }

    /// Names with a seed, resolved or not.
    pub fn seeded_names(&self) -> impl Iterator<Item = &str> {
        self.seeded.keys().map(String::as_str)
    }

    /// Entries written during the run, in name order.
    pub fn entries(&self) -> &BTreeMap<String, Address> {
        &self.resolved
    }

    pub fn len(&self) -> usize {
        self.resolved.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolved.is_empty()
    }
}
