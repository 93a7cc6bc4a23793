//! # Handle Directory
//!
//! Process-wide answer to "the canonical deployed instance of contract
//! type X" for the network the client is connected to.
//!
//! ## Lifecycle
//!
//! ```text
//! uninitialized --initialize(ok)--> initialized(network)
//!       ^                                 |
//!       +------ initialize(err) / reset --+
//! ```
//!
//! `initialize` clears the previous state before it resolves anything, so
//! lookups made during or after a failed re-initialization never see
//! entries from the previous network.

use crate::cache::HandleCache;
use crate::domain::ContractHandle;
use crate::errors::DirectoryError;
use parking_lot::RwLock;
use shared_types::{Address, DeploymentResolver, NetworkId};
use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;
use tracing::{error, info};

struct DirectoryState {
    network: NetworkId,
    by_type: HashMap<String, Arc<ContractHandle>>,
    by_address: HashMap<Address, Arc<ContractHandle>>,
    types: Vec<String>,
}

/// Type- and address-indexed registry of canonical deployments.
pub struct HandleDirectory {
    cache: Arc<HandleCache<ContractHandle>>,
    state: RwLock<Option<DirectoryState>>,
}

impl HandleDirectory {
    /// Create an uninitialized directory drawing handles from `cache`.
    pub fn new(cache: Arc<HandleCache<ContractHandle>>) -> Self {
        Self {
            cache,
            state: RwLock::new(None),
        }
    }

    /// Resolve every deployable type against the resolver's network and
    /// publish the result.
    ///
    /// Handles of the previous network are invalidated in the cache.
    ///
    /// # Errors
    ///
    /// Any resolution failure aborts the call and leaves the directory
    /// uninitialized.
    pub async fn initialize<R>(
        &self,
        resolver: &R,
        deployable_types: &[String],
    ) -> Result<NetworkId, DirectoryError>
    where
        R: DeploymentResolver + ?Sized,
    {
        let previous = self.state.write().take();
        if let Some(previous) = previous {
            for handle in previous.by_type.values() {
                self.cache.invalidate(handle.contract_type(), handle.address());
            }
            info!(network = %previous.network, "Directory cleared for re-initialization");
        }

        let network = resolver.network_id().await.map_err(|source| {
            error!(error = %source, "Directory initialization failed: network unknown");
            DirectoryError::Network(source)
        })?;

        let mut by_type = HashMap::with_capacity(deployable_types.len());
        let mut by_address = HashMap::with_capacity(deployable_types.len());
        for contract_type in deployable_types {
            let address = resolver
                .deployed_address(contract_type)
                .await
                .map_err(|source| {
                    error!(
                        network = %network,
                        contract_type = %contract_type,
                        error = %source,
                        "Directory initialization failed"
                    );
                    DirectoryError::Resolution {
                        contract_type: contract_type.clone(),
                        source,
                    }
                })?;

            let handle = ContractHandle::new(contract_type.clone(), address, network.clone());
            let handle = self
                .cache
                .get_or_create(contract_type, address, move || async move {
                    Ok::<_, Infallible>(handle)
                })
                .await?;

            by_address.entry(address).or_insert_with(|| handle.clone());
            by_type.insert(contract_type.clone(), handle);
        }

        info!(network = %network, types = by_type.len(), "Directory initialized");
        *self.state.write() = Some(DirectoryState {
            network: network.clone(),
            by_type,
            by_address,
            types: deployable_types.to_vec(),
        });
        Ok(network)
    }

    /// Canonical handle for a contract type.
    #[must_use]
    pub fn by_type(&self, contract_type: &str) -> Option<Arc<ContractHandle>> {
        self.state
            .read()
            .as_ref()
            .and_then(|state| state.by_type.get(contract_type).cloned())
    }

    /// Canonical handle deployed at `address`. If several types share an
    /// address, the first in deployable order wins.
    #[must_use]
    pub fn by_address(&self, address: Address) -> Option<Arc<ContractHandle>> {
        self.state
            .read()
            .as_ref()
            .and_then(|state| state.by_address.get(&address).cloned())
    }

    /// Drop all state.
    pub fn reset(&self) {
        if self.state.write().take().is_some() {
            info!("Directory reset");
        }
    }

    /// Network of the current state.
    #[must_use]
    pub fn network(&self) -> Option<NetworkId> {
        self.state.read().as_ref().map(|state| state.network.clone())
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.state.read().is_some()
    }

    /// Registered contract types, in deployable order.
    #[must_use]
    pub fn contract_types(&self) -> Vec<String> {
        self.state
            .read()
            .as_ref()
            .map(|state| state.types.clone())
            .unwrap_or_default()
    }

    /// Cache the directory draws handles from.
    #[must_use]
    pub fn cache(&self) -> &Arc<HandleCache<ContractHandle>> {
        &self.cache
    }
}

// =============================================================================
// TESTS
// =============================================================================
