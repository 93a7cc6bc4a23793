//! # ARC-01 Transaction Tracking
//!
//! Turns a multi-transaction operation into a stream of progress
//! notifications on the event bus.
//!
//! ## Protocol
//!
//! | Moment | `txCount` | `tx` |
//! |--------|-----------|------|
//! | Kickoff | 0 | `null` |
//! | Transaction `i` mined | `i` | receipt of transaction `i` |
//!
//! An operation announcing `N` transactions produces one kickoff and `N`
//! step notifications on its own topic, with strictly increasing step counts.
//!
//! ## Nesting
//!
//! A nested operation's topic extends its parent's
//! (`txReceipts.DAO.new.SchemeRegistrar.registerSchemes`). Its kickoff is
//! re-published on each ancestor's topic at that ancestor's current count.
//! Every mined transaction advances the count of each context in the lineage
//! and is published on each of their topics, so the parent's steps still run
//! `1..=N`, and a `txReceipts.DAO.new.*` subscriber sees the child's
//! notifications as they are.
//!
//! ## Estimate Invariants
//!
//! | Violation | Error | Detected at |
//! |-----------|-------|-------------|
//! | More transactions than announced | `EstimateExceeded` | `record_step_mined` |
//! | Fewer transactions than announced | `EstimateShortfall` | `complete` |
//! | Child estimate larger than parent's remainder | `NestedEstimateExceeded` | `begin_operation` |
//!
//! ## Usage Example
//!
//! ```ignore
//! use arc_01_transaction_tracking::prelude::*;
//!
//! let tracker = TransactionTracker::new(bus.clone());
//! let context = tracker.begin_operation("DAO.new", options, 3, None)?;
//! let receipt = tracker.run_step(&context, network.submit(call)).await?;
//! tracker.complete(&context)?;
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

// =============================================================================
// MODULES
// =============================================================================

pub mod domain;
pub mod errors;
pub mod service;

// =============================================================================
// PRELUDE
// =============================================================================

/// Convenient re-exports for common usage.
pub mod prelude {
    pub use crate::domain::{estimate_step_count, Composite, SingleCall, TrackedOperation, TxEventContext};
    pub use crate::errors::TrackerError;
    pub use crate::service::TransactionTracker;
}

pub use domain::{estimate_step_count, Composite, SingleCall, TrackedOperation, TxEventContext};
pub use errors::TrackerError;
pub use service::TransactionTracker;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
