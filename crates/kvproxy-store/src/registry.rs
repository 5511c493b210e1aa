//! Name → creator table the workload driver instantiates stores from.

use std::collections::HashMap;
use std::sync::Arc;

use figment::Figment;

use crate::error::{Result, StoreError};
use crate::redis_proxy::{RedisProxyCreator, STORE_NAME};
use crate::store::RecordStore;

/// Builds a store from the process configuration. Each creator extracts its
/// own section from the figment it is handed.
pub trait StoreCreator: Send + Sync {
    fn create(&self, properties: &Figment) -> Result<Arc<dyn RecordStore>>;
}

/// Explicit registry of store creators, filled at startup and passed to
/// whoever needs to build stores.
#[derive(Default)]
pub struct StoreRegistry {
    creators: HashMap<String, Box<dyn StoreCreator>>,
}

impl StoreRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `creator` under `name`, replacing any earlier registration.
    pub fn register(&mut self, name: impl Into<String>, creator: impl StoreCreator + 'static) {
        let name = name.into();
        tracing::info!(store = %name, "Registering store creator");
        if self.creators.insert(name.clone(), Box::new(creator)).is_some() {
            tracing::warn!(store = %name, "Replaced existing store creator");
        }
    }

    pub fn create(&self, name: &str, properties: &Figment) -> Result<Arc<dyn RecordStore>> {
        let creator = self
            .creators
            .get(name)
            .ok_or_else(|| StoreError::UnknownStore(name.to_string()))?;
        creator.create(properties)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.creators.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// Registry holding every store this crate ships.
pub fn default_registry() -> StoreRegistry {
    let mut registry = StoreRegistry::new();
    registry.register(STORE_NAME, RedisProxyCreator);
    registry
}
