//! # History Replay
//!
//! Pure fold of a register/deregister log into the latest event per
//! subject. No I/O; the service supplies the logs and verifies the result
//! against live state.

use super::stream::EventStream;
use serde::{Deserialize, Serialize};
use shared_types::{Address, Hash, LogEntry};
use std::collections::HashMap;
use tracing::warn;

/// An entity found registered against another entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisteredEntity {
    /// Subject address.
    pub address: Address,
    /// Contract type, when the address is a known canonical deployment.
    pub contract_type: Option<String>,
    /// Parameters hash from the latest registration.
    pub params_hash: Option<Hash>,
    /// Block of the subject's latest logged event.
    pub registered_at_block: u64,
}

/// Latest state of one subject in the replayed history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayedSubject {
    pub address: Address,
    pub registered: bool,
    pub params_hash: Option<Hash>,
    pub block_number: u64,
    position: (u64, u64),
}

/// Order logs chronologically and drop exact duplicates.
#[must_use]
pub fn normalize(mut logs: Vec<LogEntry>) -> Vec<LogEntry> {
    logs.sort_by_key(LogEntry::position);
    let mut unique: Vec<LogEntry> = Vec::with_capacity(logs.len());
    for log in logs {
        let duplicate = unique
            .iter()
            .rev()
            .take_while(|seen| seen.position() == log.position())
            .any(|seen| *seen == log);
        if !duplicate {
            unique.push(log);
        }
    }
    unique
}

/// Fold chronological logs into the latest event per subject
/// (last write wins). Result is ordered by the position of that event.
#[must_use]
pub fn replay(stream: &EventStream, logs: &[LogEntry]) -> Vec<ReplayedSubject> {
    let mut latest: HashMap<Address, ReplayedSubject> = HashMap::new();

    for log in logs {
        let registered = if stream.is_register(&log.event_name) {
            true
        } else if stream.is_deregister(&log.event_name) {
            false
        } else {
            continue;
        };

        let Some(address) = log.address_arg(&stream.subject_arg) else {
            warn!(
                stream = %stream.name,
                event = %log.event_name,
                block = log.block_number,
                "Log lacks subject argument, skipped"
            );
            continue;
        };

        let params_hash = stream
            .params_hash_arg
            .as_deref()
            .and_then(|arg| log.hash_arg(arg));
        latest.insert(
            address,
            ReplayedSubject {
                address,
                registered,
                params_hash,
                block_number: log.block_number,
                position: log.position(),
            },
        );
    }

    let mut subjects: Vec<ReplayedSubject> = latest.into_values().collect();
    subjects.sort_by_key(|subject| subject.position);
    subjects
}
