//! # Shared Types Crate
//!
//! Domain primitives, receipts, log entries and the network collaborator
//! ports shared by every Arc client crate.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: All cross-crate types are defined here.
//! - **Narrow Collaborator Surface**: The core consumes only submit-and-wait,
//!   log fetches, state reads and deployment resolution (`ports`).
//! - **Network-Scoped Addresses**: Anything keyed by `Address` is only valid
//!   for the `NetworkId` it was resolved against.

pub mod adapters;
pub mod entities;
pub mod errors;
pub mod ports;

pub use adapters::{ChainState, InMemoryNetwork};
pub use entities::*;
pub use errors::*;
pub use ports::*;
