//! # Error Types
//!
//! Defines error types used across the Arc client crates.

use thiserror::Error;

/// Errors reported by the network collaborator.
///
/// The core never retries these; they surface to the caller of the
/// operation that triggered them.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NetworkError {
    /// The node could not be reached.
    #[error("Network unavailable: {0}")]
    Unavailable(String),

    /// The transaction was rejected or reverted before being mined.
    #[error("Transaction failed: {reason}")]
    TransactionFailed { reason: String },

    /// No deployment of the contract type exists on this network.
    #[error("Contract type {contract_type} is not deployed on network {network}")]
    NotDeployed {
        contract_type: String,
        network: String,
    },

    /// A state read returned no value.
    #[error("State query {method} on {contract} returned no value")]
    EmptyState { contract: String, method: String },

    /// Any other transport-level failure.
    #[error("Network error: {0}")]
    Other(String),
}

/// Errors from parsing textual primitives.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseError {
    /// Input was not valid hex.
    #[error("Invalid hex: {0}")]
    InvalidHex(String),

    /// Decoded byte length was wrong.
    #[error("Invalid length: expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}
