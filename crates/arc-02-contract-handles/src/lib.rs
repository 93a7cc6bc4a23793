//! # ARC-02 Contract Handles
//!
//! Client-side handles for deployed contracts.
//!
//! | Component | Location | Purpose |
//! |-----------|----------|---------|
//! | `HandleCache` | `cache.rs` | One handle instance per `(type, address)`, at most one hydration in flight per key |
//! | `HandleDirectory` | `directory.rs` | Canonical deployment of each contract type on the current network |
//! | `ContractHandle` | `domain/handle.rs` | Handle bound to a network |
//!
//! Both components are owned values with explicit `initialize`/`reset`
//! (directory) and `invalidate`/`clear` (cache) contracts. They are shared
//! by `Arc` through the runtime context, never through globals.
//!
//! ## Network Scope
//!
//! Addresses are not portable across networks. Switching networks must go
//! through `HandleDirectory::initialize`, which invalidates the previous
//! network's handles in the cache before resolving the new ones.

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod cache;
pub mod directory;
pub mod domain;
pub mod errors;

pub use cache::HandleCache;
pub use directory::HandleDirectory;
pub use domain::{CacheKey, ContractHandle};
pub use errors::{DirectoryError, HandleError, HydrationSource};
