//! # Shared Bus - Hierarchical Topic Event Bus
//!
//! In-process publish/subscribe used by the transaction tracker and by
//! applications observing it.
//!
//! ## Topics
//!
//! ```text
//! txReceipts                              <- "txReceipts.*" sees everything below
//! └── DAO
//!     └── new                             <- "txReceipts.DAO.new"
//!         └── SchemeRegistrar
//!             └── registerSchemes         <- nested operation topic
//! ```
//!
//! ## Delivery Rules
//!
//! - Callbacks run synchronously inside `publish`; publish order per topic
//!   is delivery order.
//! - A failing or panicking callback is logged and skipped; other
//!   subscribers still receive the event and the publisher never sees it.
//! - Once `Subscription::unsubscribe` returns, no new invocation begins.

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod events;
pub mod publisher;
pub mod subscriber;
pub mod topic;

// Re-export main types
pub use events::{ArcEvent, BusMessage};
pub use publisher::{EventPublisher, InMemoryEventBus};
pub use subscriber::{
    EventStream, SubscriberError, Subscription, SubscriptionError, TopicReceiver,
};
pub use topic::{Topic, TopicError, TopicPattern};

/// Maximum events to buffer per channel receiver before it lags.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;

/// Root segment for transaction lifecycle topics.
pub const TX_RECEIPTS_ROOT: &str = "txReceipts";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_capacity() {
        assert_eq!(DEFAULT_CHANNEL_CAPACITY, 1000);
    }

    #[test]
    fn test_tx_receipts_root_is_valid_topic() {
        assert!(Topic::parse(TX_RECEIPTS_ROOT).is_ok());
    }
}
