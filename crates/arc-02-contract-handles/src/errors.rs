//! # Error Types

use crate::domain::CacheKey;
use shared_types::NetworkError;
use std::error::Error as StdError;
use std::sync::Arc;
use thiserror::Error;

/// Cause of a failed hydration, shared by every waiter on the key.
pub type HydrationSource = Arc<dyn StdError + Send + Sync>;

// =============================================================================
// HANDLE CACHE
// =============================================================================

/// Errors from the handle cache.
#[derive(Debug, Error, Clone)]
pub enum HandleError {
    /// The hydrate function failed. The key was not cached.
    #[error("failed to hydrate {key}: {source}")]
    Hydration {
        key: CacheKey,
        #[source]
        source: HydrationSource,
    },
}

impl HandleError {
    /// Key whose hydration failed.
    #[must_use]
    pub fn key(&self) -> &CacheKey {
        match self {
            Self::Hydration { key, .. } => key,
        }
    }
}

// =============================================================================
// HANDLE DIRECTORY
// =============================================================================

/// Errors from directory initialization. Any of them leaves the directory
/// uninitialized.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// The network could not be identified.
    #[error("failed to identify network: {0}")]
    Network(#[source] NetworkError),

    /// A contract type's canonical address could not be resolved.
    #[error("failed to resolve {contract_type}: {source}")]
    Resolution {
        contract_type: String,
        #[source]
        source: NetworkError,
    },

    /// A resolved handle could not be obtained from the cache.
    #[error(transparent)]
    Handle(#[from] HandleError),
}
