//! # In-Memory Network Adapter
//!
//! Implements every network port against an in-process chain model.
//! Used by tests across the workspace and for local wiring without a node.

use crate::entities::{
    AbiValue, Address, ContractCall, Hash, LogEntry, LogFilter, NetworkId, StateQuery,
    TransactionReceipt,
};
use crate::errors::NetworkError;
use crate::ports::{DeploymentResolver, LogSource, StateReader, TransactionSubmitter};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;
use tracing::debug;

/// Side effect applied when a call to a given method is mined.
pub type CallEffect =
    Arc<dyn Fn(&ContractCall, &mut ChainState) -> Result<(), NetworkError> + Send + Sync>;

/// Mutable chain model handed to call effects.
#[derive(Debug)]
pub struct ChainState {
    network: NetworkId,
    block_number: u64,
    tx_counter: u64,
    address_counter: u64,
    logs: Vec<LogEntry>,
    state: HashMap<StateQuery, AbiValue>,
    deployments: HashMap<String, Address>,
    current_tx: Hash,
    created: Option<Address>,
}

impl ChainState {
    fn new(network: NetworkId) -> Self {
        Self {
            network,
            block_number: 0,
            tx_counter: 0,
            address_counter: 0,
            logs: Vec::new(),
            state: HashMap::new(),
            deployments: HashMap::new(),
            current_tx: Hash::ZERO,
            created: None,
        }
    }

    /// Current block number.
    #[must_use]
    pub fn block_number(&self) -> u64 {
        self.block_number
    }

    /// Emit a log in the current block from the current transaction.
    pub fn emit(
        &mut self,
        address: Address,
        event_name: &str,
        args: BTreeMap<String, AbiValue>,
    ) -> LogEntry {
        let log_index = self
            .logs
            .iter()
            .filter(|log| log.block_number == self.block_number)
            .count() as u64;
        let log = LogEntry {
            address,
            event_name: event_name.to_string(),
            block_number: self.block_number,
            log_index,
            tx_hash: self.current_tx,
            args,
        };
        self.logs.push(log.clone());
        log
    }

    /// Set the answer to a state query.
    pub fn set_state(&mut self, query: StateQuery, value: AbiValue) {
        self.state.insert(query, value);
    }

    /// Allocate a fresh contract address, reported as created by the
    /// current transaction.
    pub fn create_contract(&mut self) -> Address {
        self.address_counter += 1;
        let mut bytes = [0u8; 20];
        bytes[0] = 0xc0;
        bytes[12..].copy_from_slice(&self.address_counter.to_be_bytes());
        let address = Address::new(bytes);
        self.created = Some(address);
        address
    }

    fn begin_block(&mut self) {
        self.block_number += 1;
        self.tx_counter += 1;
        self.current_tx = Hash::from_low_u64(self.tx_counter);
        self.created = None;
    }
}

#[derive(Default)]
struct Faults {
    submissions: VecDeque<String>,
    unavailable: bool,
}

/// In-process stand-in for the network collaborator.
pub struct InMemoryNetwork {
    chain: Mutex<ChainState>,
    effects: Mutex<HashMap<String, CallEffect>>,
    faults: Mutex<Faults>,
    submitted: Mutex<Vec<ContractCall>>,
    log_fetches: Mutex<usize>,
}

impl InMemoryNetwork {
    /// Create an empty chain for the named network.
    pub fn new(network: impl Into<String>) -> Self {
        Self {
            chain: Mutex::new(ChainState::new(NetworkId::new(network))),
            effects: Mutex::new(HashMap::new()),
            faults: Mutex::new(Faults::default()),
            submitted: Mutex::new(Vec::new()),
            log_fetches: Mutex::new(0),
        }
    }

    /// Record the canonical deployment of a contract type.
    pub fn deploy(&self, contract_type: &str, address: Address) {
        self.chain
            .lock()
            .deployments
            .insert(contract_type.to_string(), address);
    }

    /// Point the chain at a different network. Deployments are dropped,
    /// since addresses do not carry over.
    pub fn switch_network(&self, network: impl Into<String>) {
        let mut chain = self.chain.lock();
        chain.network = NetworkId::new(network);
        chain.deployments.clear();
    }

    /// Register the side effect for calls to `method`.
    pub fn on_call<F>(&self, method: &str, effect: F)
    where
        F: Fn(&ContractCall, &mut ChainState) -> Result<(), NetworkError> + Send + Sync + 'static,
    {
        self.effects
            .lock()
            .insert(method.to_string(), Arc::new(effect));
    }

    /// Mine a block holding a single log.
    pub fn emit_log(
        &self,
        address: Address,
        event_name: &str,
        args: BTreeMap<String, AbiValue>,
    ) -> LogEntry {
        let mut chain = self.chain.lock();
        chain.begin_block();
        chain.emit(address, event_name, args)
    }

    /// Append a log entry verbatim (duplicates and out-of-order entries allowed).
    pub fn push_log(&self, log: LogEntry) {
        let mut chain = self.chain.lock();
        chain.block_number = chain.block_number.max(log.block_number);
        chain.logs.push(log);
    }

    /// Set the answer to a state query.
    pub fn set_state(&self, query: StateQuery, value: AbiValue) {
        self.chain.lock().set_state(query, value);
    }

    /// Make the next submission fail with `reason`.
    pub fn fail_next_submission(&self, reason: &str) {
        self.faults.lock().submissions.push_back(reason.to_string());
    }

    /// Toggle whole-node unavailability.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.faults.lock().unavailable = unavailable;
    }

    /// Calls submitted so far, including failed ones.
    #[must_use]
    pub fn submitted_calls(&self) -> Vec<ContractCall> {
        self.submitted.lock().clone()
    }

    /// Number of `get_logs` requests served.
    #[must_use]
    pub fn log_fetches(&self) -> usize {
        *self.log_fetches.lock()
    }

    fn check_available(&self) -> Result<(), NetworkError> {
        if self.faults.lock().unavailable {
            return Err(NetworkError::Unavailable("in-memory node offline".to_string()));
        }
        Ok(())
    }
}

impl Default for InMemoryNetwork {
    fn default() -> Self {
        Self::new("ganache")
    }
}

#[async_trait]
impl TransactionSubmitter for InMemoryNetwork {
    async fn submit(&self, call: ContractCall) -> Result<TransactionReceipt, NetworkError> {
        self.check_available()?;
        self.submitted.lock().push(call.clone());

        if let Some(reason) = self.faults.lock().submissions.pop_front() {
            return Err(NetworkError::TransactionFailed { reason });
        }

        let effect = self.effects.lock().get(&call.method).cloned();
        let mut chain = self.chain.lock();
        chain.begin_block();
        let first_log = chain.logs.len();

        if let Some(effect) = effect {
            effect(&call, &mut *chain)?;
        }

        let receipt = TransactionReceipt {
            tx_hash: chain.current_tx,
            block_number: chain.block_number,
            from: call.from.unwrap_or_default(),
            to: Some(call.contract),
            contract_address: chain.created,
            gas_used: 21_000,
            logs: chain.logs[first_log..].to_vec(),
        };

        debug!(
            method = %call.method,
            block = receipt.block_number,
            tx = %receipt.tx_hash,
            "Transaction mined"
        );
        Ok(receipt)
    }
}

#[async_trait]
impl LogSource for InMemoryNetwork {
    async fn get_logs(&self, filter: &LogFilter) -> Result<Vec<LogEntry>, NetworkError> {
        self.check_available()?;
        *self.log_fetches.lock() += 1;

        let mut logs: Vec<LogEntry> = self
            .chain
            .lock()
            .logs
            .iter()
            .filter(|log| filter.matches(log))
            .cloned()
            .collect();
        logs.sort_by_key(LogEntry::position);
        Ok(logs)
    }

    async fn latest_block(&self) -> Result<u64, NetworkError> {
        self.check_available()?;
        Ok(self.chain.lock().block_number)
    }
}

#[async_trait]
impl StateReader for InMemoryNetwork {
    async fn read_state(&self, query: &StateQuery) -> Result<AbiValue, NetworkError> {
        self.check_available()?;
        self.chain
            .lock()
            .state
            .get(query)
            .cloned()
            .ok_or_else(|| NetworkError::EmptyState {
                contract: query.contract.to_string(),
                method: query.method.clone(),
            })
    }
}

#[async_trait]
impl DeploymentResolver for InMemoryNetwork {
    async fn network_id(&self) -> Result<NetworkId, NetworkError> {
        self.check_available()?;
        Ok(self.chain.lock().network.clone())
    }

    async fn deployed_address(&self, contract_type: &str) -> Result<Address, NetworkError> {
        self.check_available()?;
        let chain = self.chain.lock();
        chain
            .deployments
            .get(contract_type)
            .copied()
            .ok_or_else(|| NetworkError::NotDeployed {
                contract_type: contract_type.to_string(),
                network: chain.network.to_string(),
            })
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_submit_runs_effect_and_collects_logs() {
        let network = InMemoryNetwork::default();
        let registry = Address::from_low_u8(7);
        network.on_call("register", move |call, chain| {
            let mut args = BTreeMap::new();
            args.insert("_subject".to_string(), AbiValue::Address(call.contract));
            chain.emit(registry, "Registered", args);
            Ok(())
        });

        let receipt = network
            .submit(ContractCall::new(Address::from_low_u8(1), "Registry", "register"))
            .await
            .unwrap();

        assert_eq!(receipt.block_number, 1);
        assert_eq!(receipt.logs.len(), 1);
        assert_eq!(
            receipt.find_log("Registered").unwrap().address_arg("_subject"),
            Some(Address::from_low_u8(1))
        );
        assert_eq!(network.latest_block().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_injected_submission_failure() {
        let network = InMemoryNetwork::default();
        network.fail_next_submission("reverted");

        let err = network
            .submit(ContractCall::new(Address::ZERO, "Registry", "register"))
            .await
            .unwrap_err();
        assert!(matches!(err, NetworkError::TransactionFailed { .. }));
        assert_eq!(network.submitted_calls().len(), 1);
    }

    #[tokio::test]
    async fn test_switch_network_drops_deployments() {
        let network = InMemoryNetwork::new("kovan");
        network.deploy("DaoCreator", Address::from_low_u8(9));
        assert_eq!(
            network.deployed_address("DaoCreator").await.unwrap(),
            Address::from_low_u8(9)
        );

        network.switch_network("mainnet");
        assert_eq!(network.network_id().await.unwrap(), NetworkId::new("mainnet"));
        assert!(network.deployed_address("DaoCreator").await.is_err());
    }

    #[tokio::test]
    async fn test_read_flag_requires_bool() {
        let network = InMemoryNetwork::default();
        let query = StateQuery::new(Address::from_low_u8(1), "isRegistered");
        network.set_state(query.clone(), AbiValue::Text("yes".to_string()));

        assert!(network.read_flag(&query).await.is_err());

        network.set_state(query.clone(), AbiValue::Bool(true));
        assert!(network.read_flag(&query).await.unwrap());
    }
}
