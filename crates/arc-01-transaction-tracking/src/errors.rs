//! # Error Types

use shared_bus::TopicError;
use shared_types::NetworkError;
use thiserror::Error;

/// Errors raised while tracking an operation.
///
/// The estimate variants mean the calling operation computed the wrong step
/// count. They are programming errors and are never retried.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TrackerError {
    /// More transactions were recorded than the context (or an ancestor)
    /// announced at kickoff.
    #[error("operation {topic} exceeded its estimate of {expected} transactions")]
    EstimateExceeded { topic: String, expected: u32 },

    /// The operation finished with fewer transactions than announced.
    #[error("operation {topic} finished after {observed} of {expected} estimated transactions")]
    EstimateShortfall {
        topic: String,
        expected: u32,
        observed: u32,
    },

    /// A nested operation announced more transactions than its parent has left.
    #[error("nested operation {topic} needs {requested} transactions but {parent} has {remaining} left")]
    NestedEstimateExceeded {
        topic: String,
        parent: String,
        requested: u32,
        remaining: u32,
    },

    /// The operation name did not form a valid topic.
    #[error("invalid operation topic: {0}")]
    Topic(#[from] TopicError),

    /// A transaction failed before it was mined. No notification was published.
    #[error("transaction {step} of {topic} failed: {source}")]
    StepFailed {
        topic: String,
        step: u32,
        #[source]
        source: NetworkError,
    },
}

impl TrackerError {
    /// True for errors caused by a wrong step estimate.
    #[must_use]
    pub fn is_estimate_mismatch(&self) -> bool {
        matches!(
            self,
            Self::EstimateExceeded { .. }
                | Self::EstimateShortfall { .. }
                | Self::NestedEstimateExceeded { .. }
        )
    }
}
