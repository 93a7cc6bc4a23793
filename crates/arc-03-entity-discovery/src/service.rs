//! # Entity Discovery Service
//!
//! Answers "what is currently registered on this entity" from an
//! append-only log. Two phases:
//!
//! 1. Replay the stream's history from genesis to the latest block, keeping
//!    the latest event per subject.
//! 2. Keep every replayed subject whose live state, read from the entity,
//!    says registered. The log says what happened, the entity says what
//!    holds now. Streams without a live query fall back to the log.
//!
//! Cost grows with the total history of the stream; nothing is cached
//! between calls.

use crate::domain::{normalize, replay, EventStream, RegisteredEntity, ReplayedSubject};
use crate::errors::DiscoveryError;
use arc_02_contract_handles::HandleDirectory;
use shared_types::{
    AbiValue, Address, LogEntry, LogFilter, LogSource, NetworkClient, NetworkError, StateQuery,
    StateReader,
};
use std::sync::Arc;
use tracing::{debug, info};

/// Discovers registered entities through the network collaborator.
pub struct EntityDiscovery {
    network: Arc<dyn NetworkClient>,
    directory: Option<Arc<HandleDirectory>>,
}

impl EntityDiscovery {
    /// Create a discovery service without type resolution.
    pub fn new(network: Arc<dyn NetworkClient>) -> Self {
        Self {
            network,
            directory: None,
        }
    }

    /// Resolve contract type names of discovered subjects through `directory`.
    #[must_use]
    pub fn with_directory(mut self, directory: Arc<HandleDirectory>) -> Self {
        self.directory = Some(directory);
        self
    }

    /// Subjects currently registered on `entity` through `stream`.
    ///
    /// # Errors
    ///
    /// - `DiscoveryError::History` if the logs cannot be fetched
    /// - `DiscoveryError::LiveState` if a subject's state cannot be read
    pub async fn discover(
        &self,
        entity: Address,
        stream: &EventStream,
    ) -> Result<Vec<RegisteredEntity>, DiscoveryError> {
        let logs = self.history(entity, stream).await?;
        let replayed = replay(stream, &logs);

        let mut registered = Vec::with_capacity(replayed.len());
        for subject in replayed {
            if self.is_live(entity, stream, &subject).await? {
                registered.push(self.describe(&subject));
            } else {
                debug!(
                    stream = %stream.name,
                    subject = %subject.address,
                    logged_registered = subject.registered,
                    "Subject not registered on chain"
                );
            }
        }

        info!(
            entity = %entity,
            stream = %stream.name,
            logs = logs.len(),
            registered = registered.len(),
            "Discovery complete"
        );
        Ok(registered)
    }

    /// Every subject `entity` ever registered through `stream`, in order of
    /// latest registration. Deregistrations and live state are ignored;
    /// meant for register-only streams such as organizations created by a
    /// factory.
    ///
    /// # Errors
    ///
    /// `DiscoveryError::History` if the logs cannot be fetched.
    pub async fn discover_created(
        &self,
        entity: Address,
        stream: &EventStream,
    ) -> Result<Vec<RegisteredEntity>, DiscoveryError> {
        let logs = self.history(entity, stream).await?;
        let register_only = EventStream {
            deregister_event: None,
            ..stream.clone()
        };
        let created: Vec<RegisteredEntity> = replay(&register_only, &logs)
            .iter()
            .map(|subject| self.describe(subject))
            .collect();

        info!(
            entity = %entity,
            stream = %stream.name,
            created = created.len(),
            "Created entities discovered"
        );
        Ok(created)
    }

    async fn history(
        &self,
        entity: Address,
        stream: &EventStream,
    ) -> Result<Vec<LogEntry>, DiscoveryError> {
        let fetch_error = |source: NetworkError| DiscoveryError::History {
            entity,
            stream: stream.name.clone(),
            source,
        };
        let latest = self.network.latest_block().await.map_err(fetch_error)?;
        let filter = LogFilter::events(stream.event_names(), latest).at(entity);
        let logs = self.network.get_logs(&filter).await.map_err(fetch_error)?;

        debug!(
            entity = %entity,
            stream = %stream.name,
            latest,
            fetched = logs.len(),
            "History fetched"
        );
        Ok(normalize(logs))
    }

    async fn is_live(
        &self,
        entity: Address,
        stream: &EventStream,
        subject: &ReplayedSubject,
    ) -> Result<bool, DiscoveryError> {
        let Some(method) = stream.is_registered_method.as_deref() else {
            return Ok(subject.registered);
        };
        let query = StateQuery::new(entity, method).arg(AbiValue::Address(subject.address));
        self.network
            .read_flag(&query)
            .await
            .map_err(|source| DiscoveryError::LiveState {
                entity,
                subject: subject.address,
                source,
            })
    }

    fn describe(&self, subject: &ReplayedSubject) -> RegisteredEntity {
        let contract_type = self
            .directory
            .as_ref()
            .and_then(|directory| directory.by_address(subject.address))
            .map(|handle| handle.contract_type().to_string());
        RegisteredEntity {
            address: subject.address,
            contract_type,
            params_hash: subject.params_hash,
            registered_at_block: subject.block_number,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
