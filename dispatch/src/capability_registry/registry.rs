//! CapabilityRegistry - name to instance resolution with alias support and
//! lifecycle hooks.
//!
//! All maps live in a single [`RegistryState`] behind one `RwLock`, so a reader
//! always observes either the state before or after a lifecycle operation.
//! Register, unregister and reload are additionally serialized by a lifecycle
//! mutex because they await capability hooks between reads and writes.

use super::types::{
    Capability, CapabilityConfig, CapabilityFactory, CapabilityMetadata, CapabilityQuery,
};
use super::versioning::SemanticVersion;
use crate::error::RegistryError;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

/// Mutable slot holding the live implementation and what is needed to rebuild it.
#[derive(Clone)]
struct CapabilitySlot {
    factory: CapabilityFactory,
    config: CapabilityConfig,
    instance: Arc<dyn Capability>,
}

#[derive(Default)]
struct RegistryState {
    slots: HashMap<String, CapabilitySlot>,
    /// alias -> canonical name
    aliases: HashMap<String, String>,
    version_history: HashMap<String, Vec<SemanticVersion>>,
}

impl RegistryState {
    fn resolve<'a>(&'a self, name: &'a str) -> Option<&'a str> {
        if self.slots.contains_key(name) {
            return Some(name);
        }
        self.aliases.get(name).map(String::as_str)
    }

    fn install(&mut self, slot: CapabilitySlot) {
        let metadata = slot.instance.metadata();
        let name = metadata.name.clone();

        self.aliases.retain(|_, target| target != &name);
        if let Some(alias) = &metadata.legacy_alias {
            self.aliases.insert(alias.clone(), name.clone());
        }

        let history = self.version_history.entry(name.clone()).or_default();
        if history.last() != Some(&metadata.version) {
            history.push(metadata.version);
        }

        self.slots.insert(name, slot);
    }

    fn remove(&mut self, name: &str) -> Option<CapabilitySlot> {
        let removed = self.slots.remove(name);
        if removed.is_some() {
            self.aliases.retain(|_, target| target != name);
        }
        removed
    }
}

pub struct CapabilityRegistry {
    state: RwLock<RegistryState>,
    lifecycle: Mutex<()>,
}

impl Default for CapabilityRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(RegistryState::default()),
            lifecycle: Mutex::new(()),
        }
    }

    /// Instantiate and register a capability.
    ///
    /// Re-registering an identical name+version is a no-op returning the live
    /// instance. A different version replaces the live one. `on_load` runs
    /// before the instance becomes visible; if it fails nothing is published
    /// and any previous version stays in place.
    pub async fn register(
        &self,
        factory: CapabilityFactory,
        config: CapabilityConfig,
    ) -> Result<Arc<dyn Capability>, RegistryError> {
        let _guard = self.lifecycle.lock().await;

        let instance = (factory)(config.clone())
            .map_err(|e| RegistryError::InstantiationFailed(e.to_string()))?;
        let metadata = instance.metadata().clone();

        let previous = {
            let state = self.state.read().await;
            match state.slots.get(&metadata.name) {
                Some(existing) if existing.instance.metadata().version == metadata.version => {
                    debug!(
                        capability = %metadata.name,
                        version = %metadata.version,
                        "Capability already registered, skipping duplicate registration"
                    );
                    return Ok(existing.instance.clone());
                }
                Some(existing) => Some(existing.instance.clone()),
                None => None,
            }
        };

        if let Err(e) = instance.on_load().await {
            warn!(capability = %metadata.name, error = %e, "on_load failed, registration rolled back");
            return Err(RegistryError::OnLoadFailed {
                name: metadata.name,
                message: e.to_string(),
            });
        }

        {
            let mut state = self.state.write().await;
            state.install(CapabilitySlot {
                factory,
                config,
                instance: instance.clone(),
            });
        }

        if let Some(old) = previous {
            let from = old.metadata().version;
            if metadata.version.is_newer_than(&from) {
                info!(
                    capability = %metadata.name,
                    %from,
                    to = %metadata.version,
                    breaking = metadata.version.is_major_bump(&from),
                    "Capability version replaced"
                );
            } else {
                warn!(
                    capability = %metadata.name,
                    %from,
                    to = %metadata.version,
                    "Capability downgraded"
                );
            }
            if let Err(e) = old.on_unload().await {
                warn!(capability = %metadata.name, error = %e, "on_unload of replaced version failed");
            }
        } else {
            info!(capability = %metadata.name, version = %metadata.version, "Capability registered");
        }

        Ok(instance)
    }

    /// Remove a capability (by name or alias). Returns whether anything was removed.
    ///
    /// `on_unload` is best-effort: a failure is logged and removal proceeds.
    pub async fn unregister(&self, name: &str) -> bool {
        let _guard = self.lifecycle.lock().await;

        let slot = {
            let state = self.state.read().await;
            match state.resolve(name) {
                Some(canonical) => state.slots.get(canonical).cloned(),
                None => None,
            }
        };

        let Some(slot) = slot else {
            debug!(capability = %name, "unregister: capability not present");
            return false;
        };

        let canonical = slot.instance.metadata().name.clone();
        if let Err(e) = slot.instance.on_unload().await {
            warn!(capability = %canonical, error = %e, "on_unload failed, removing anyway");
        }

        self.state.write().await.remove(&canonical);
        info!(capability = %canonical, "Capability unregistered");
        true
    }

    /// Direct lookup falling back to alias resolution.
    pub async fn get(&self, name: &str) -> Option<Arc<dyn Capability>> {
        let state = self.state.read().await;
        let canonical = state.resolve(name)?;
        state.slots.get(canonical).map(|s| s.instance.clone())
    }

    /// Unregister then register again from the captured factory and config.
    ///
    /// The fresh instance replaces the old one in a single write. If it cannot
    /// be built or loaded, the capability stays unregistered and the error
    /// propagates.
    pub async fn reload(&self, name: &str) -> Result<Arc<dyn Capability>, RegistryError> {
        let _guard = self.lifecycle.lock().await;

        let slot = {
            let state = self.state.read().await;
            state
                .resolve(name)
                .and_then(|canonical| state.slots.get(canonical).cloned())
                .ok_or_else(|| RegistryError::NotFound(name.to_string()))?
        };
        let canonical = slot.instance.metadata().name.clone();

        if let Err(e) = slot.instance.on_unload().await {
            warn!(capability = %canonical, error = %e, "on_unload failed during reload");
        }

        let rebuilt = match (slot.factory)(slot.config.clone()) {
            Ok(instance) => instance,
            Err(e) => {
                self.state.write().await.remove(&canonical);
                return Err(RegistryError::InstantiationFailed(e.to_string()));
            }
        };

        if let Err(e) = rebuilt.on_load().await {
            self.state.write().await.remove(&canonical);
            warn!(capability = %canonical, error = %e, "reload failed, capability removed");
            return Err(RegistryError::OnLoadFailed {
                name: canonical,
                message: e.to_string(),
            });
        }

        {
            let mut state = self.state.write().await;
            state.remove(&canonical);
            state.install(CapabilitySlot {
                factory: slot.factory,
                config: slot.config,
                instance: rebuilt.clone(),
            });
        }

        info!(capability = %canonical, version = %rebuilt.metadata().version, "Capability reloaded");
        Ok(rebuilt)
    }

    /// Metadata of matching capabilities sorted by (category, name).
    pub async fn list(&self, query: &CapabilityQuery) -> Vec<CapabilityMetadata> {
        let state = self.state.read().await;
        let mut results: Vec<CapabilityMetadata> = state
            .slots
            .values()
            .map(|s| s.instance.metadata())
            .filter(|m| query.matches(m))
            .cloned()
            .collect();
        results.sort_by(|a, b| (&a.category, &a.name).cmp(&(&b.category, &b.name)));
        results
    }

    /// Case-insensitive substring search over name, description and tags.
    pub async fn search(&self, text: &str) -> Vec<CapabilityMetadata> {
        let needle = text.to_lowercase();
        self.list(&CapabilityQuery::new())
            .await
            .into_iter()
            .filter(|m| {
                m.name.to_lowercase().contains(&needle)
                    || m.description.to_lowercase().contains(&needle)
                    || m.tags.iter().any(|t| t.to_lowercase().contains(&needle))
            })
            .collect()
    }

    /// Every version registered under this name, oldest first.
    pub async fn version_history(&self, name: &str) -> Vec<SemanticVersion> {
        let state = self.state.read().await;
        let canonical = state.resolve(name).unwrap_or(name);
        state
            .version_history
            .get(canonical)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn contains(&self, name: &str) -> bool {
        self.state.read().await.resolve(name).is_some()
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.slots.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
