//! Model-to-provider directory
//!
//! The routing table is an immutable snapshot behind an [`ArcSwap`]: lookups
//! load the current snapshot with no locking, and every mutation builds a
//! complete replacement and swaps it in atomically. A reader holds whatever
//! snapshot it loaded for the duration of one lookup, so it either sees the
//! table fully before a change or fully after it, never in between.
//!
//! Health is advisory at lookup time only. A provider that trips its failure
//! threshold is refused for new lookups; requests already in flight are left
//! alone.

use arc_swap::ArcSwap;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::{Config, ProviderConfig};
use crate::core::providers::{HttpProviderClient, ProviderClient, ProviderStatus};
use crate::core::types::ModelInfo;
use crate::utils::error::{GatewayError, Result};

/// One provider held by a snapshot
#[derive(Clone)]
struct RegisteredProvider {
    client: Arc<dyn ProviderClient>,
    enabled: bool,
}

/// Immutable routing table: model bindings plus provider entries.
///
/// Bindings hold provider ids, not provider references, so a binding can
/// outlive its provider; `lookup` reports that case as `ProviderUnavailable`.
#[derive(Default, Clone)]
struct DirectorySnapshot {
    bindings: HashMap<String, String>,
    providers: HashMap<String, RegisteredProvider>,
}

/// Copy-on-write directory mapping model names to provider clients
pub struct ProviderDirectory {
    snapshot: ArcSwap<DirectorySnapshot>,
}

impl ProviderDirectory {
    pub fn new() -> Self {
        Self {
            snapshot: ArcSwap::from_pointee(DirectorySnapshot::default()),
        }
    }

    /// Build a directory from a configuration snapshot
    pub fn from_config(config: &Config) -> Result<Self> {
        let directory = Self::new();
        directory.apply_config(config)?;
        Ok(directory)
    }

    /// Replace the whole table with providers built from `config`
    pub fn apply_config(&self, config: &Config) -> Result<()> {
        let threshold = config.gateway.failure_threshold;
        let mut entries: Vec<(ProviderConfig, Arc<dyn ProviderClient>)> = Vec::new();
        for provider in &config.providers {
            let client = HttpProviderClient::new(provider, threshold)?;
            entries.push((provider.clone(), Arc::new(client)));
        }
        self.replace_all(entries);
        Ok(())
    }

    /// Add or overwrite one provider and its bindings.
    ///
    /// Bindings previously pointing at this provider are dropped first, so a
    /// shrunk model list does not leave stale routes behind.
    pub fn register(&self, config: &ProviderConfig, client: Arc<dyn ProviderClient>) {
        let provider_id = config.name.clone();
        self.snapshot.rcu(|current| {
            let mut next = DirectorySnapshot::clone(current);
            next.bindings.retain(|_, bound| bound != &provider_id);
            for model in &config.models {
                next.bindings.insert(model.clone(), provider_id.clone());
            }
            next.providers.insert(
                provider_id.clone(),
                RegisteredProvider {
                    client: Arc::clone(&client),
                    enabled: config.enabled,
                },
            );
            next
        });
        debug!(provider = %config.name, models = config.models.len(), "provider registered");
    }

    /// Remove a provider entry. Its bindings stay behind on purpose and
    /// surface as `ProviderUnavailable` until the next `replace_all`.
    pub fn deregister(&self, provider_id: &str) -> bool {
        let mut removed = false;
        self.snapshot.rcu(|current| {
            let mut next = DirectorySnapshot::clone(current);
            removed = next.providers.remove(provider_id).is_some();
            next
        });
        if removed {
            info!(provider = %provider_id, "provider deregistered");
        }
        removed
    }

    /// Swap in a freshly built table; the reload entry point
    pub fn replace_all(&self, entries: Vec<(ProviderConfig, Arc<dyn ProviderClient>)>) {
        let mut next = DirectorySnapshot::default();
        for (config, client) in entries {
            for model in &config.models {
                next.bindings.insert(model.clone(), config.name.clone());
            }
            next.providers.insert(
                config.name.clone(),
                RegisteredProvider {
                    client,
                    enabled: config.enabled,
                },
            );
        }
        info!(
            providers = next.providers.len(),
            models = next.bindings.len(),
            "provider directory replaced"
        );
        self.snapshot.store(Arc::new(next));
    }

    /// Resolve a model name to a healthy, enabled provider client
    pub fn lookup(&self, model: &str) -> Result<Arc<dyn ProviderClient>> {
        let snapshot = self.snapshot.load();

        let Some(provider_id) = snapshot.bindings.get(model) else {
            return Err(GatewayError::model_not_found(model));
        };
        let Some(entry) = snapshot.providers.get(provider_id) else {
            return Err(GatewayError::provider_unavailable(
                provider_id,
                "provider was removed after the model was bound",
            ));
        };
        if !entry.enabled {
            return Err(GatewayError::provider_unavailable(
                provider_id,
                "provider is disabled",
            ));
        }
        if !entry.client.is_healthy() {
            return Err(GatewayError::provider_unhealthy(
                provider_id,
                format!(
                    "{} consecutive failures",
                    entry.client.status().health.consecutive_failures
                ),
            ));
        }
        Ok(Arc::clone(&entry.client))
    }

    /// Models currently routable, with provider attribution, sorted by id.
    /// Disabled providers are left out; their models are not callable.
    pub fn all_models(&self) -> Vec<ModelInfo> {
        let snapshot = self.snapshot.load();
        let mut models: Vec<ModelInfo> = snapshot
            .bindings
            .iter()
            .filter(|(_, provider_id)| {
                snapshot
                    .providers
                    .get(*provider_id)
                    .is_some_and(|entry| entry.enabled)
            })
            .map(|(model, provider_id)| ModelInfo::new(model, provider_id))
            .collect();
        models.sort_by(|a, b| a.id.cmp(&b.id));
        models
    }

    /// Status of every registered provider, disabled ones included, sorted
    /// by id
    pub fn status_by_provider(&self) -> Vec<ProviderStatus> {
        let snapshot = self.snapshot.load();
        let mut statuses: Vec<ProviderStatus> = snapshot
            .providers
            .values()
            .map(|entry| {
                let mut status = entry.client.status();
                status.enabled = entry.enabled;
                status
            })
            .collect();
        statuses.sort_by(|a, b| a.id.cmp(&b.id));
        statuses
    }

    /// Enabled provider clients, for the background prober
    pub fn all_providers(&self) -> Vec<Arc<dyn ProviderClient>> {
        let snapshot = self.snapshot.load();
        snapshot
            .providers
            .values()
            .filter(|entry| entry.enabled)
            .map(|entry| Arc::clone(&entry.client))
            .collect()
    }

    pub fn provider_count(&self) -> usize {
        self.snapshot.load().providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot.load().providers.is_empty()
    }
}

impl Default for ProviderDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ProviderDirectory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let snapshot = self.snapshot.load();
        f.debug_struct("ProviderDirectory")
            .field("providers", &snapshot.providers.len())
            .field("bindings", &snapshot.bindings.len())
            .finish()
    }
}
