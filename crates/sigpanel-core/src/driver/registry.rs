//! Driver Registry
//!
//! Resolves a configured driver name to a ready driver instance.

use super::hmail::HmailDriver;
use super::memory::{MemoryDriver, MemoryStore};
use super::types::{Driver, LoadError};
use sigpanel_common::config::SignatureSettings;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Builds a driver from the signature settings
pub type DriverFactory =
    Arc<dyn Fn(&SignatureSettings) -> Result<Arc<dyn Driver>, LoadError> + Send + Sync>;

/// Registry of driver factories, keyed by driver name
#[derive(Clone, Default)]
pub struct DriverRegistry {
    factories: HashMap<String, DriverFactory>,
}

impl DriverRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the built-in drivers
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();

        registry.register(HmailDriver::NAME, |settings| {
            Ok(Arc::new(HmailDriver::from_settings(settings)?) as Arc<dyn Driver>)
        });

        let store = Arc::new(MemoryStore::new());
        registry.register(MemoryDriver::NAME, move |settings| {
            Ok(Arc::new(MemoryDriver::new(
                store.clone(),
                settings.username_domain.clone(),
                &settings.memory,
            )) as Arc<dyn Driver>)
        });

        registry
    }

    /// Register a driver factory, replacing any previous one of that name
    pub fn register<F>(&mut self, name: &str, factory: F)
    where
        F: Fn(&SignatureSettings) -> Result<Arc<dyn Driver>, LoadError> + Send + Sync + 'static,
    {
        if self
            .factories
            .insert(name.to_string(), Arc::new(factory))
            .is_some()
        {
            info!("Signature driver {} replaced", name);
        } else {
            debug!("Signature driver {} registered", name);
        }
    }

    /// Whether a driver of that name is registered
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Names of all registered drivers, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.keys().cloned().collect();
        names.sort();
        names
    }

    /// Resolve a driver by name
    pub fn resolve(
        &self,
        name: &str,
        settings: &SignatureSettings,
    ) -> Result<Arc<dyn Driver>, LoadError> {
        let factory = self.factories.get(name).ok_or_else(|| {
            error!("Unable to find signature driver ({})", name);
            LoadError::NotFound(name.to_string())
        })?;

        let driver = factory(settings).map_err(|e| {
            error!("Broken signature driver {}: {}", name, e);
            e
        })?;

        if driver.name() != name {
            debug!(
                "Driver registered as {} reports name {}",
                name,
                driver.name()
            );
        }

        Ok(driver)
    }
}
