//! # Handles and Cache Keys

use shared_types::{Address, NetworkId};
use std::fmt;

/// Identity of a cached handle: contract type plus deployed address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    /// Contract type name, e.g. `"SchemeRegistrar"`.
    pub contract_type: String,
    /// Deployed address.
    pub address: Address,
}

impl CacheKey {
    /// Build a key.
    pub fn new(contract_type: impl Into<String>, address: Address) -> Self {
        Self {
            contract_type: contract_type.into(),
            address,
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.contract_type, self.address)
    }
}

/// Client-side representation of one deployed contract instance.
///
/// Only valid on the network it was resolved against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractHandle {
    contract_type: String,
    address: Address,
    network: NetworkId,
}

impl ContractHandle {
    /// Create a handle.
    pub fn new(contract_type: impl Into<String>, address: Address, network: NetworkId) -> Self {
        Self {
            contract_type: contract_type.into(),
            address,
            network,
        }
    }

    #[must_use]
    pub fn contract_type(&self) -> &str {
        &self.contract_type
    }

    #[must_use]
    pub fn address(&self) -> Address {
        self.address
    }

    #[must_use]
    pub fn network(&self) -> &NetworkId {
        &self.network
    }

    /// Cache key for this handle.
    #[must_use]
    pub fn key(&self) -> CacheKey {
        CacheKey::new(self.contract_type.clone(), self.address)
    }
}

impl fmt::Display for ContractHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{} ({})", self.contract_type, self.address, self.network)
    }
}
