//! # ARC-03 Entity Discovery
//!
//! Finds the entities currently registered on an organization (schemes,
//! global constraints) or created by a factory (organizations), using only
//! the append-only log history and live state reads.
//!
//! ## Pipeline
//!
//! | Step | Location | Notes |
//! |------|----------|-------|
//! | Fetch `0..=latest` | `service.rs` | register and deregister events of one entity |
//! | Sort, drop exact duplicates | `domain/history.rs` | by `(block, log index)` |
//! | Last write wins per subject | `domain/history.rs` | pure fold |
//! | Verify live state | `service.rs` | `is registered` view on the entity |
//!
//! An entity with no history yields an empty result.

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod domain;
pub mod errors;
pub mod service;

pub use domain::{EventStream, RegisteredEntity};
pub use errors::DiscoveryError;
pub use service::EntityDiscovery;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registered_entity_serializes_camel_case() {
        let entity = RegisteredEntity {
            address: shared_types::Address::from_low_u8(1),
            contract_type: Some("SchemeRegistrar".to_string()),
            params_hash: None,
            registered_at_block: 4,
        };
        let json = serde_json::to_value(&entity).unwrap();
        assert_eq!(json["contractType"], "SchemeRegistrar");
        assert_eq!(json["registeredAtBlock"], 4);
    }
}
