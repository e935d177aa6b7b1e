use std::fmt;
use std::hash::{Hash, Hasher};

use ruint::aliases::U256;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::ErrorInfo;

// ============================================================
// Accounts
// ============================================================

#[derive(Debug, Error)]
#[error("invalid address '{0}'")]
pub struct AddressError(pub String);

/// 20-byte account identifier. Keeps the mixed-case text it arrived as for
/// display, but compares and hashes on the bytes, so differently-cased
/// renderings of one account are equal.
#[derive(Debug, Clone)]
pub struct Address {
    bytes: [u8; 20],
    text: String,
}

impl Address {
    pub fn parse(text: &str) -> Result<Self, AddressError> {
        let trimmed = text.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .ok_or_else(|| AddressError(text.into()))?;
        let raw = hex::decode(digits).map_err(|_| AddressError(text.into()))?;
        let bytes: [u8; 20] = raw.try_into().map_err(|_| AddressError(text.into()))?;
        Ok(Address {
            bytes,
            text: trimmed.to_string(),
        })
    }

    pub fn bytes(&self) -> &[u8; 20] {
        &self.bytes
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Abbreviated form for logs and labels: 0x1234...abcd
    pub fn short(&self) -> String {
        format!("{}...{}", &self.text[..6], &self.text[self.text.len() - 4..])
    }
}

impl PartialEq for Address {
    fn eq(&self, other: &Self) -> bool {
        self.bytes == other.bytes
    }
}

impl Eq for Address {}

impl Hash for Address {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.bytes.hash(state);
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl Serialize for Address {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.text)
    }
}

// ============================================================
// Connection state
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
    Failed,
}

/// Snapshot of the signing-agent link. `account` and `chain_id` are present
/// exactly when `status` is `Connected`.
#[derive(Debug, Clone)]
pub struct ConnectionState {
    pub status: ConnectionStatus,
    pub account: Option<Address>,
    pub chain_id: Option<u64>,
    pub last_error: Option<ErrorInfo>,
}

impl ConnectionState {
    pub fn disconnected() -> Self {
        ConnectionState {
            status: ConnectionStatus::Disconnected,
            account: None,
            chain_id: None,
            last_error: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.status == ConnectionStatus::Connected
    }
}

impl Default for ConnectionState {
    fn default() -> Self {
        ConnectionState::disconnected()
    }
}

// ============================================================
// Packets
// ============================================================

/// How a packet's total is split across claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistributionMode {
    Equal,
    Random,
}

impl DistributionMode {
    /// Wire values other than 1 read as equal split.
    pub fn from_wire(value: u8) -> Self {
        if value == 1 {
            DistributionMode::Random
        } else {
            DistributionMode::Equal
        }
    }

    pub fn wire(self) -> u8 {
        match self {
            DistributionMode::Equal => 0,
            DistributionMode::Random => 1,
        }
    }
}

/// One row of the packet list. `has_claimed` is relative to the viewer the
/// refresh ran for; rows are replaced wholesale on every refresh.
#[derive(Debug, Clone)]
pub struct PacketRecord {
    pub id: u64,
    pub creator: Address,
    pub total_amount: U256,
    pub remain_count: u32,
    pub total_count: u32,
    pub message: String,
    pub is_active: bool,
    pub mode: DistributionMode,
    pub created_at: Option<u64>,
    pub has_claimed: bool,
}

/// Single-packet detail, richer than the list row.
#[derive(Debug, Clone)]
pub struct PacketInfo {
    pub creator: Address,
    pub total_amount: U256,
    pub remain_amount: U256,
    pub total_count: u32,
    pub remain_count: u32,
    pub message: String,
    pub is_active: bool,
    pub created_at: u64,
    pub mode: DistributionMode,
}

// ============================================================
// Operation results
// ============================================================

/// Result of a committed submission. `value` is the event-extracted payload
/// and is absent when the expected event was not found; the transaction
/// itself is still authoritative.
#[derive(Debug, Clone)]
pub struct OperationOutcome<T> {
    pub transaction_id: String,
    pub value: Option<T>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RefreshStatus {
    Loaded,
    /// The registry holds no packets yet; informational, not an error.
    Empty,
}

#[derive(Debug)]
pub struct RefreshOutcome {
    pub records: Vec<PacketRecord>,
    pub status: RefreshStatus,
}
