//! # Error Types
//!
//! Every failure a caller of the runtime sees names the high-level
//! operation that was attempted and carries the original cause.

use arc_01_transaction_tracking::TrackerError;
use arc_02_contract_handles::DirectoryError;
use arc_03_entity_discovery::DiscoveryError;
use shared_types::{Hash, NetworkError};
use thiserror::Error;

/// Configuration problems found by `ArcConfig::validate`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("network name is empty")]
    EmptyNetwork,

    #[error("channel capacity must be at least 1")]
    ZeroChannelCapacity,

    #[error("no deployable contract types configured")]
    NoDeployableTypes,

    /// Contract type names become topic segments and must be single,
    /// well-formed segments.
    #[error("invalid contract type name {0:?}")]
    InvalidContractType(String),
}

/// Cause of a failed organization operation.
#[derive(Debug, Error)]
pub enum OperationFailure {
    #[error(transparent)]
    Tracking(#[from] TrackerError),

    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error("failed to encode call arguments: {0}")]
    Encoding(#[from] serde_json::Error),

    /// A required contract type has no canonical deployment on this network.
    #[error("contract type {0} is not deployed on the current network")]
    NotDeployed(String),

    /// A mined transaction lacked the log the operation relies on.
    #[error("transaction {tx} did not emit {event}")]
    MissingEvent { tx: Hash, event: String },
}

/// Top-level runtime error.
#[derive(Debug, Error)]
pub enum ArcError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to initialize logging: {0}")]
    Logging(String),

    #[error("handle directory initialization failed: {0}")]
    Directory(#[from] DirectoryError),

    /// A high-level operation failed.
    #[error("{operation} failed: {source}")]
    Operation {
        operation: String,
        #[source]
        source: OperationFailure,
    },
}

impl ArcError {
    /// Wrap `source` as a failure of `operation`.
    pub fn operation(operation: impl Into<String>, source: impl Into<OperationFailure>) -> Self {
        Self::Operation {
            operation: operation.into(),
            source: source.into(),
        }
    }

    /// Name of the failed operation, if this is an operation failure.
    #[must_use]
    pub fn operation_name(&self) -> Option<&str> {
        match self {
            Self::Operation { operation, .. } => Some(operation),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_error_names_operation_and_cause() {
        let err = ArcError::operation(
            "DAO.new",
            NetworkError::TransactionFailed {
                reason: "out of gas".to_string(),
            },
        );
        assert_eq!(err.operation_name(), Some("DAO.new"));
        let message = err.to_string();
        assert!(message.starts_with("DAO.new failed"));
        assert!(message.contains("out of gas"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
