//! # Bus Events
//!
//! Payloads that flow through the event bus.

use crate::topic::Topic;
use serde::{Deserialize, Serialize};
use shared_types::TxEventInfo;

/// Everything that can be published on the bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ArcEvent {
    /// Transaction lifecycle notification (kickoff or mined step).
    TxLifecycle(TxEventInfo),

    /// Application-defined payload for external publishers.
    Custom(serde_json::Value),
}

impl ArcEvent {
    /// The lifecycle payload, if this is a lifecycle notification.
    #[must_use]
    pub fn as_tx_lifecycle(&self) -> Option<&TxEventInfo> {
        match self {
            Self::TxLifecycle(info) => Some(info),
            Self::Custom(_) => None,
        }
    }

    /// Short label for logging.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::TxLifecycle(_) => "tx_lifecycle",
            Self::Custom(_) => "custom",
        }
    }
}

impl From<TxEventInfo> for ArcEvent {
    fn from(info: TxEventInfo) -> Self {
        Self::TxLifecycle(info)
    }
}

/// A published event together with its topic, as seen by channel receivers.
#[derive(Debug, Clone, PartialEq)]
pub struct BusMessage {
    /// Topic the event was published on.
    pub topic: Topic,
    /// The event.
    pub event: ArcEvent,
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_lifecycle_accessor() {
        let info = TxEventInfo {
            topic: "txReceipts.DAO.new".to_string(),
            options: serde_json::Value::Null,
            tx_count: 0,
            tx: None,
            context_id: Uuid::nil(),
        };
        let event = ArcEvent::from(info.clone());
        assert_eq!(event.as_tx_lifecycle(), Some(&info));
        assert_eq!(event.kind(), "tx_lifecycle");

        let custom = ArcEvent::Custom(serde_json::json!({ "k": 1 }));
        assert!(custom.as_tx_lifecycle().is_none());
    }
}
