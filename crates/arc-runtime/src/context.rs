//! # Arc Context
//!
//! Owns every piece of shared client state for one network connection:
//! event bus, transaction tracker, handle cache, handle directory and
//! entity discovery. Nothing here is global; callers hold the context and
//! pass it (or its parts) where needed.
//!
//! ## Lifecycle
//!
//! | Call | Effect |
//! |------|--------|
//! | `initialize(config, network)` | build components, resolve the directory |
//! | `reinitialize(network)` | clear the cache, rebuild the directory for the new network |
//!
//! The bus and tracker survive re-initialization, so existing subscriptions
//! keep receiving notifications.

use crate::config::ArcConfig;
use crate::errors::ArcError;
use crate::organization::OrganizationService;
use arc_01_transaction_tracking::TransactionTracker;
use arc_02_contract_handles::{ContractHandle, HandleCache, HandleDirectory};
use arc_03_entity_discovery::EntityDiscovery;
use shared_bus::InMemoryEventBus;
use shared_types::{NetworkClient, NetworkId};
use std::sync::Arc;
use tracing::{info, warn};

/// Lifecycle-scoped client state.
pub struct ArcContext {
    config: ArcConfig,
    network: Arc<dyn NetworkClient>,
    bus: Arc<InMemoryEventBus>,
    tracker: Arc<TransactionTracker>,
    cache: Arc<HandleCache<ContractHandle>>,
    directory: Arc<HandleDirectory>,
    discovery: EntityDiscovery,
}

impl ArcContext {
    /// Build a context and resolve the directory against `network`.
    ///
    /// # Errors
    ///
    /// - `ArcError::Config` if the configuration is invalid
    /// - `ArcError::Directory` if any deployable type cannot be resolved
    pub async fn initialize(
        config: ArcConfig,
        network: Arc<dyn NetworkClient>,
    ) -> Result<Self, ArcError> {
        config.validate()?;

        let bus = Arc::new(InMemoryEventBus::with_capacity(config.channel_capacity));
        let tracker = Arc::new(TransactionTracker::new(bus.clone()));
        let cache = Arc::new(HandleCache::new());
        let directory = Arc::new(HandleDirectory::new(cache.clone()));

        let resolved = directory
            .initialize(network.as_ref(), &config.deployable_types)
            .await?;
        if resolved.as_str() != config.network {
            warn!(
                expected = %config.network,
                resolved = %resolved,
                "Connected to a different network than configured"
            );
        }
        info!(
            network = %resolved,
            types = config.deployable_types.len(),
            "Arc context initialized"
        );

        let discovery = EntityDiscovery::new(network.clone()).with_directory(directory.clone());
        Ok(Self {
            config,
            network,
            bus,
            tracker,
            cache,
            directory,
            discovery,
        })
    }

    /// Switch to another network connection.
    ///
    /// The cache is cleared before anything is resolved. On failure the
    /// directory stays uninitialized and the new connection is kept, so a
    /// later call can retry.
    ///
    /// # Errors
    ///
    /// `ArcError::Directory` if any deployable type cannot be resolved.
    pub async fn reinitialize(
        &mut self,
        network: Arc<dyn NetworkClient>,
    ) -> Result<NetworkId, ArcError> {
        let previous = self.directory.network();
        self.cache.clear();
        self.directory.reset();
        self.network = network;
        self.discovery =
            EntityDiscovery::new(self.network.clone()).with_directory(self.directory.clone());

        let resolved = self
            .directory
            .initialize(self.network.as_ref(), &self.config.deployable_types)
            .await?;
        info!(
            previous = ?previous.as_ref().map(NetworkId::as_str),
            network = %resolved,
            "Arc context re-initialized"
        );
        Ok(resolved)
    }

    #[must_use]
    pub fn config(&self) -> &ArcConfig {
        &self.config
    }

    #[must_use]
    pub fn network(&self) -> &Arc<dyn NetworkClient> {
        &self.network
    }

    /// Event bus carrying lifecycle notifications.
    #[must_use]
    pub fn bus(&self) -> &Arc<InMemoryEventBus> {
        &self.bus
    }

    #[must_use]
    pub fn tracker(&self) -> &Arc<TransactionTracker> {
        &self.tracker
    }

    #[must_use]
    pub fn cache(&self) -> &Arc<HandleCache<ContractHandle>> {
        &self.cache
    }

    #[must_use]
    pub fn directory(&self) -> &Arc<HandleDirectory> {
        &self.directory
    }

    #[must_use]
    pub fn discovery(&self) -> &EntityDiscovery {
        &self.discovery
    }

    /// Organization operations bound to this context.
    #[must_use]
    pub fn organizations(&self) -> OrganizationService<'_> {
        OrganizationService::new(self)
    }
}
