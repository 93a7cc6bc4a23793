//! # Error Types

use shared_types::{Address, NetworkError};
use thiserror::Error;

/// Errors raised while discovering registered entities.
///
/// An empty history is not an error.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DiscoveryError {
    /// The log history could not be fetched.
    #[error("failed to fetch {stream} history of {entity}: {source}")]
    History {
        entity: Address,
        stream: String,
        #[source]
        source: NetworkError,
    },

    /// A candidate's live registration state could not be read.
    #[error("failed to read registration of {subject} on {entity}: {source}")]
    LiveState {
        entity: Address,
        subject: Address,
        #[source]
        source: NetworkError,
    },
}
