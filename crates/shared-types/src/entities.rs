//! # Core Domain Entities
//!
//! Primitives and records exchanged between the Arc client crates and the
//! network collaborator.
//!
//! ## Clusters
//!
//! - **Identity**: `Address`, `Hash`, `NetworkId`
//! - **Transactions**: `ContractCall`, `TransactionReceipt`, `TxEventInfo`
//! - **History & State**: `LogEntry`, `LogFilter`, `AbiValue`, `StateQuery`

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::errors::ParseError;

// Re-export U256 from primitive-types for use across all crates
pub use primitive_types::U256;

// =============================================================================
// CLUSTER A: IDENTITY
// =============================================================================

/// A 20-byte Ethereum-style address.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Address(pub [u8; 20]);

impl Address {
    /// The zero address (0x0000...0000).
    pub const ZERO: Self = Self([0u8; 20]);

    /// Creates an address from a 20-byte array.
    #[must_use]
    pub const fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Creates an address whose last byte is `n`. Handy for fixtures.
    #[must_use]
    pub const fn from_low_u8(n: u8) -> Self {
        let mut bytes = [0u8; 20];
        bytes[19] = n;
        Self(bytes)
    }

    /// Returns the underlying bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Returns true if this is the zero address.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for Address {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(digits).map_err(|e| ParseError::InvalidHex(e.to_string()))?;
        let bytes: [u8; 20] = bytes
            .try_into()
            .map_err(|v: Vec<u8>| ParseError::InvalidLength {
                expected: 20,
                actual: v.len(),
            })?;
        Ok(Self(bytes))
    }
}

impl From<[u8; 20]> for Address {
    fn from(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }
}

/// A 32-byte hash (transaction hashes, parameter hashes).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Hash(pub [u8; 32]);

impl Hash {
    /// The zero hash.
    pub const ZERO: Self = Self([0u8; 32]);

    /// Creates a hash from a 32-byte array.
    #[must_use]
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Creates a hash whose trailing eight bytes encode `n` big-endian.
    #[must_use]
    pub fn from_low_u64(n: u64) -> Self {
        let mut bytes = [0u8; 32];
        bytes[24..].copy_from_slice(&n.to_be_bytes());
        Self(bytes)
    }

    /// Returns true if this is the zero hash.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let encoded = hex::encode(self.0);
        write!(f, "0x{}...{}", &encoded[..8], &encoded[56..])
    }
}

/// Identifies the network the client is currently talking to.
///
/// Addresses are not portable across networks, so every piece of address
/// keyed state is scoped to one `NetworkId`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NetworkId(pub String);

impl NetworkId {
    /// Creates a network id from a name (e.g. `"ganache"`, `"kovan"`).
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the network name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NetworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// CLUSTER B: TRANSACTIONS
// =============================================================================

/// A contract call to be signed and submitted by the network collaborator.
///
/// Argument encoding is the collaborator's concern; the core only carries
/// the already-validated arguments through.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractCall {
    /// Target contract.
    pub contract: Address,
    /// Contract type name of the target (e.g. `"DaoCreator"`).
    pub contract_type: String,
    /// Method to invoke.
    pub method: String,
    /// Call arguments.
    pub args: serde_json::Value,
    /// Sending account, `None` for the collaborator's default account.
    pub from: Option<Address>,
}

impl ContractCall {
    /// Creates a call with no arguments from the default account.
    pub fn new(contract: Address, contract_type: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            contract,
            contract_type: contract_type.into(),
            method: method.into(),
            args: serde_json::Value::Null,
            from: None,
        }
    }

    /// Sets the call arguments.
    #[must_use]
    pub fn with_args(mut self, args: serde_json::Value) -> Self {
        self.args = args;
        self
    }

    /// Sets the sending account.
    #[must_use]
    pub fn from_account(mut self, from: Address) -> Self {
        self.from = Some(from);
        self
    }
}

/// Confirmation record returned once a submitted transaction is mined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    /// Transaction hash.
    pub tx_hash: Hash,
    /// Block the transaction was mined in.
    pub block_number: u64,
    /// Sending account.
    pub from: Address,
    /// Called contract, `None` for a deployment.
    pub to: Option<Address>,
    /// Address of a contract created by this transaction.
    pub contract_address: Option<Address>,
    /// Gas consumed.
    pub gas_used: u64,
    /// Logs emitted by the transaction.
    pub logs: Vec<LogEntry>,
}

impl TransactionReceipt {
    /// Finds the first log with the given event name.
    #[must_use]
    pub fn find_log(&self, event_name: &str) -> Option<&LogEntry> {
        self.logs.iter().find(|log| log.event_name == event_name)
    }
}

/// Payload delivered to transaction lifecycle subscribers.
///
/// Wire shape: `{ topic, options, txCount, tx }` where `tx` is `null` for the
/// kickoff notification and the mined receipt afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxEventInfo {
    /// Topic the notification was published on.
    pub topic: String,
    /// Arguments of the originating call.
    pub options: serde_json::Value,
    /// Transactions observed so far for the publishing context.
    pub tx_count: u32,
    /// The mined transaction, `None` for the kickoff.
    pub tx: Option<TransactionReceipt>,
    /// Context that published this notification.
    pub context_id: Uuid,
}

impl TxEventInfo {
    /// Returns true for a kickoff, including one re-published on an ancestor topic.
    #[must_use]
    pub fn is_kickoff(&self) -> bool {
        self.tx.is_none()
    }
}

// =============================================================================
// CLUSTER C: HISTORY & STATE
// =============================================================================

/// A decoded ABI value, as found in log arguments and state reads.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AbiValue {
    /// `address`
    Address(Address),
    /// `bytes32`
    Hash(Hash),
    /// `uint256`
    Uint(U256),
    /// `bool`
    Bool(bool),
    /// `string`
    Text(String),
}

impl AbiValue {
    /// Returns the address if this is an `Address` value.
    #[must_use]
    pub fn as_address(&self) -> Option<Address> {
        match self {
            Self::Address(address) => Some(*address),
            _ => None,
        }
    }

    /// Returns the hash if this is a `Hash` value.
    #[must_use]
    pub fn as_hash(&self) -> Option<Hash> {
        match self {
            Self::Hash(hash) => Some(*hash),
            _ => None,
        }
    }

    /// Returns the flag if this is a `Bool` value.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(flag) => Some(*flag),
            _ => None,
        }
    }
}

/// A decoded historical log entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    /// Contract that emitted the log.
    pub address: Address,
    /// Event name (e.g. `"RegisterScheme"`).
    pub event_name: String,
    /// Block the log was emitted in.
    pub block_number: u64,
    /// Position of the log within its block.
    pub log_index: u64,
    /// Emitting transaction.
    pub tx_hash: Hash,
    /// Decoded event arguments keyed by parameter name.
    pub args: BTreeMap<String, AbiValue>,
}

impl LogEntry {
    /// Returns the named argument as an address.
    #[must_use]
    pub fn address_arg(&self, name: &str) -> Option<Address> {
        self.args.get(name).and_then(AbiValue::as_address)
    }

    /// Returns the named argument as a hash.
    #[must_use]
    pub fn hash_arg(&self, name: &str) -> Option<Hash> {
        self.args.get(name).and_then(AbiValue::as_hash)
    }

    /// Chronological ordering key.
    #[must_use]
    pub fn position(&self) -> (u64, u64) {
        (self.block_number, self.log_index)
    }
}

/// Block range and event selection for a log fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFilter {
    /// Only logs emitted by this contract, if set.
    pub address: Option<Address>,
    /// Event names to include. Empty means all events.
    pub events: Vec<String>,
    /// First block, inclusive.
    pub from_block: u64,
    /// Last block, inclusive.
    pub to_block: u64,
}

impl LogFilter {
    /// Filter for the given events over the whole chain up to `to_block`.
    #[must_use]
    pub fn events(events: Vec<String>, to_block: u64) -> Self {
        Self {
            address: None,
            events,
            from_block: 0,
            to_block,
        }
    }

    /// Restricts the filter to one emitting contract.
    #[must_use]
    pub fn at(mut self, address: Address) -> Self {
        self.address = Some(address);
        self
    }

    /// Check if a log entry matches this filter.
    #[must_use]
    pub fn matches(&self, log: &LogEntry) -> bool {
        let address_match = self.address.map_or(true, |a| a == log.address);
        let event_match = self.events.is_empty() || self.events.contains(&log.event_name);
        let range_match = (self.from_block..=self.to_block).contains(&log.block_number);
        address_match && event_match && range_match
    }
}

/// A read-only query against current on-chain state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StateQuery {
    /// Contract to query.
    pub contract: Address,
    /// View method name (e.g. `"isSchemeRegistered"`).
    pub method: String,
    /// Positional arguments.
    pub args: Vec<AbiValue>,
}

impl StateQuery {
    /// Creates a query with no arguments.
    pub fn new(contract: Address, method: impl Into<String>) -> Self {
        Self {
            contract,
            method: method.into(),
            args: Vec::new(),
        }
    }

    /// Appends a positional argument.
    #[must_use]
    pub fn arg(mut self, value: AbiValue) -> Self {
        self.args.push(value);
        self
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_parse_and_display() {
        let address: Address = "0x00000000000000000000000000000000000000ff".parse().unwrap();
        assert_eq!(address, Address::from_low_u8(0xff));
        assert_eq!(
            address.to_string(),
            "0x00000000000000000000000000000000000000ff"
        );
    }

    #[test]
    fn test_address_parse_rejects_wrong_length() {
        let err = "0x1234".parse::<Address>().unwrap_err();
        assert!(matches!(
            err,
            ParseError::InvalidLength {
                expected: 20,
                actual: 2
            }
        ));
    }

    #[test]
    fn test_tx_event_info_wire_shape() {
        let info = TxEventInfo {
            topic: "txReceipts.DAO.new".to_string(),
            options: serde_json::json!({ "name": "Acme" }),
            tx_count: 0,
            tx: None,
            context_id: Uuid::nil(),
        };

        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["topic"], "txReceipts.DAO.new");
        assert_eq!(json["txCount"], 0);
        assert!(json["tx"].is_null());
        assert_eq!(json["options"]["name"], "Acme");
        assert!(info.is_kickoff());
    }

    #[test]
    fn test_log_filter_matches() {
        let log = LogEntry {
            address: Address::from_low_u8(1),
            event_name: "RegisterScheme".to_string(),
            block_number: 5,
            log_index: 0,
            tx_hash: Hash::ZERO,
            args: BTreeMap::new(),
        };

        let filter = LogFilter::events(vec!["RegisterScheme".to_string()], 10);
        assert!(filter.matches(&log));
        assert!(filter.clone().at(Address::from_low_u8(1)).matches(&log));
        assert!(!filter.clone().at(Address::from_low_u8(2)).matches(&log));
        assert!(!LogFilter::events(vec![], 4).matches(&log));
    }
}
