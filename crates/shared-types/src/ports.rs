//! # Driven Ports (SPI - Outbound)
//!
//! Capabilities the Arc client core consumes from the network collaborator.
//! Transport, signing and argument encoding live behind these traits.
//!
//! | Trait | Purpose |
//! |-------|---------|
//! | `TransactionSubmitter` | Send a call, suspend until mined |
//! | `LogSource` | Fetch historical logs in a block range |
//! | `StateReader` | Read current on-chain state |
//! | `DeploymentResolver` | Canonical deployed address per contract type |

use crate::entities::{
    AbiValue, Address, ContractCall, LogEntry, LogFilter, NetworkId, StateQuery,
    TransactionReceipt,
};
use crate::errors::NetworkError;
use async_trait::async_trait;

// =============================================================================
// TRANSACTIONS
// =============================================================================

/// Submits signed contract calls.
#[async_trait]
pub trait TransactionSubmitter: Send + Sync {
    /// Submit a call and wait for it to be mined.
    ///
    /// # Returns
    ///
    /// * `Ok(TransactionReceipt)` - once the transaction is mined
    /// * `Err(NetworkError)` - if it fails to be sent or reverts
    async fn submit(&self, call: ContractCall) -> Result<TransactionReceipt, NetworkError>;
}

// =============================================================================
// HISTORY
// =============================================================================

/// Reads historical event logs.
#[async_trait]
pub trait LogSource: Send + Sync {
    /// Fetch the logs matching `filter`, ordered by block and log index.
    async fn get_logs(&self, filter: &LogFilter) -> Result<Vec<LogEntry>, NetworkError>;

    /// Number of the most recently mined block.
    async fn latest_block(&self) -> Result<u64, NetworkError>;
}

// =============================================================================
// STATE
// =============================================================================

/// Reads current on-chain state.
#[async_trait]
pub trait StateReader: Send + Sync {
    /// Execute a read-only query.
    async fn read_state(&self, query: &StateQuery) -> Result<AbiValue, NetworkError>;

    /// Execute a query expected to return a `bool`.
    ///
    /// A non-boolean answer is reported as `NetworkError::EmptyState`.
    async fn read_flag(&self, query: &StateQuery) -> Result<bool, NetworkError> {
        self.read_state(query)
            .await?
            .as_bool()
            .ok_or_else(|| NetworkError::EmptyState {
                contract: query.contract.to_string(),
                method: query.method.clone(),
            })
    }
}

// =============================================================================
// DEPLOYMENTS
// =============================================================================

/// Resolves canonical deployments for the current network.
#[async_trait]
pub trait DeploymentResolver: Send + Sync {
    /// The network the collaborator is connected to.
    async fn network_id(&self) -> Result<NetworkId, NetworkError>;

    /// Canonical deployed address of `contract_type` on the current network.
    async fn deployed_address(&self, contract_type: &str) -> Result<Address, NetworkError>;
}

/// Every capability the core needs, in one trait object.
pub trait NetworkClient:
    TransactionSubmitter + LogSource + StateReader + DeploymentResolver
{
}

impl<T> NetworkClient for T where
    T: TransactionSubmitter + LogSource + StateReader + DeploymentResolver
{
}
