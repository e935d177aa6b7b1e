use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ruint::aliases::U256;
use serde_json::{json, Map, Value};

use crate::agent::{SigningAgent, StateCall};
use crate::amount;
use crate::connection::ConnectionManager;
use crate::consts::*;
use crate::error::ClientError;
use crate::registry::{Confirmation, RegistryRpc};
use crate::types::{
    Address, ConnectionStatus, DistributionMode, OperationOutcome, PacketInfo, PacketRecord,
};

/// Submits state-changing packet operations and serves registry reads.
/// Identity is read from the connection manager on every call, never cached.
pub struct LedgerGateway {
    connection: Arc<ConnectionManager>,
    agent: Arc<dyn SigningAgent>,
    registry: Arc<dyn RegistryRpc>,
    create_busy: AtomicBool,
    claim_busy: AtomicBool,
}

impl LedgerGateway {
    pub fn new(
        connection: Arc<ConnectionManager>,
        agent: Arc<dyn SigningAgent>,
        registry: Arc<dyn RegistryRpc>,
    ) -> Self {
        LedgerGateway {
            connection,
            agent,
            registry,
            create_busy: AtomicBool::new(false),
            claim_busy: AtomicBool::new(false),
        }
    }

    // ============================================================
    // State-changing operations
    // ============================================================

    /// Fund a new packet. Validates locally, submits a value-carrying call,
    /// waits for one confirmation and pulls the packet id out of the
    /// creation event.
    pub async fn create_packet(
        &self,
        count: u32,
        message: &str,
        mode: DistributionMode,
        total_amount: &str,
    ) -> Result<OperationOutcome<u64>, ClientError> {
        let value = amount::parse_base_units(total_amount)
            .map_err(|err| ClientError::validation(format!("amount '{total_amount}': {err}")))?;
        if value.is_zero() {
            return Err(ClientError::validation("amount must be greater than zero"));
        }
        if !(MIN_PACKET_COUNT..=MAX_PACKET_COUNT).contains(&count) {
            return Err(ClientError::validation(format!(
                "count must be between {MIN_PACKET_COUNT} and {MAX_PACKET_COUNT}"
            )));
        }
        let message = if message.is_empty() { DEFAULT_MESSAGE } else { message };
        if message.chars().count() > MAX_MESSAGE_CHARS {
            return Err(ClientError::validation(format!(
                "message longer than {MAX_MESSAGE_CHARS} characters"
            )));
        }
        if mode == DistributionMode::Equal && (value / U256::from(count)).is_zero() {
            return Err(ClientError::validation(
                "amount too small to give every claim a share",
            ));
        }

        let account = self.require_account()?;
        let _busy = BusyGuard::acquire(&self.create_busy, "create")?;

        tracing::info!("creating packet: {count} claims, {total_amount} total, by {account}");
        let confirmation = self
            .run(StateCall {
                operation: OP_CREATE.to_string(),
                args: vec![json!(count), json!(message), json!(mode.wire())],
                value,
                gas_limit: GAS_LIMIT_CREATE,
            })
            .await?;

        let value = match confirmation.event_arg(EVENT_PACKET_CREATED, EVENT_FIELD_PACKET_ID) {
            Some(raw) => match amount::normalize(raw).ok().and_then(|id| u64::try_from(id).ok()) {
                Some(id) => Some(id),
                None => {
                    tracing::warn!("{EVENT_PACKET_CREATED} carried an unreadable packet id: {raw}");
                    None
                }
            },
            None => {
                tracing::warn!(
                    "{} committed without a {EVENT_PACKET_CREATED} event",
                    confirmation.transaction_id
                );
                None
            }
        };
        Ok(OperationOutcome {
            transaction_id: confirmation.transaction_id,
            value,
        })
    }

    /// Claim a share of a packet. The registry decides eligibility; a repeat
    /// claim comes back as a revert.
    pub async fn claim_packet(&self, id: u64) -> Result<OperationOutcome<String>, ClientError> {
        let account = self.require_account()?;
        let _busy = BusyGuard::acquire(&self.claim_busy, "claim")?;

        tracing::info!("claiming packet {id} for {account}");
        let confirmation = self
            .run(StateCall {
                operation: OP_CLAIM.to_string(),
                args: vec![json!(id)],
                value: U256::ZERO,
                gas_limit: GAS_LIMIT_CLAIM,
            })
            .await?;

        let value = match confirmation.event_arg(EVENT_PACKET_CLAIMED, EVENT_FIELD_AMOUNT) {
            Some(raw) => Some(amount::to_decimal_string(raw)),
            None => {
                tracing::warn!(
                    "{} committed without a {EVENT_PACKET_CLAIMED} event",
                    confirmation.transaction_id
                );
                None
            }
        };
        Ok(OperationOutcome {
            transaction_id: confirmation.transaction_id,
            value,
        })
    }

    /// Submit, wait for one confirmation, surface reverts. No retries.
    async fn run(&self, call: StateCall) -> Result<Confirmation, ClientError> {
        let operation = call.operation.clone();
        let transaction_id = self.agent.submit(call).await.map_err(|err| {
            if err.is_rejection() {
                ClientError::UserRejected
            } else {
                ClientError::GasOrRevert {
                    reason: Some(err.to_string()),
                }
            }
        })?;
        tracing::info!("{operation} submitted as {transaction_id}");

        let confirmation = self
            .registry
            .await_confirmation(&transaction_id)
            .await
            .map_err(|err| ClientError::read("await_confirmation", err))?;
        if !confirmation.committed {
            let reason = confirmation.revert_reason;
            tracing::warn!(
                "{operation} reverted: {}",
                reason.as_deref().unwrap_or("no reason given")
            );
            return Err(ClientError::GasOrRevert { reason });
        }
        Ok(confirmation)
    }

    fn require_account(&self) -> Result<Address, ClientError> {
        let state = self.connection.snapshot();
        match (state.status, state.account) {
            (ConnectionStatus::Connected, Some(account)) => Ok(account),
            _ => Err(ClientError::NotConnected),
        }
    }

    // ============================================================
    // Reads anchoring a refresh (failures propagate)
    // ============================================================

    pub async fn fetch_total_count(&self) -> Result<u64, ClientError> {
        let value = self
            .registry
            .call(OP_TOTAL_PACKETS, vec![])
            .await
            .map_err(|err| ClientError::read(OP_TOTAL_PACKETS, err))?;
        let count =
            amount::normalize(&value).map_err(|err| ClientError::read(OP_TOTAL_PACKETS, err))?;
        u64::try_from(count).map_err(|_| ClientError::read(OP_TOTAL_PACKETS, "count exceeds u64"))
    }

    /// Fetch `count` rows starting at `start`, oldest first, exactly as the
    /// registry stores them. Any undecodable cell fails the whole fetch;
    /// partial lists are never returned.
    pub async fn fetch_packet_range(
        &self,
        start: u64,
        count: u64,
    ) -> Result<Vec<PacketRecord>, ClientError> {
        let payload = self
            .registry
            .call(OP_PACKET_LIST, vec![json!(start), json!(count)])
            .await
            .map_err(|err| ClientError::read(OP_PACKET_LIST, err))?;
        decode_packet_rows(&payload).map_err(|detail| ClientError::read(OP_PACKET_LIST, detail))
    }

    // ============================================================
    // Advisory reads (failures absorbed)
    // ============================================================

    pub async fn total_packet_count(&self) -> u64 {
        match self.fetch_total_count().await {
            Ok(count) => count,
            Err(err) => {
                tracing::warn!("packet count unavailable: {err}");
                0
            }
        }
    }

    /// Whether `viewer` already claimed from packet `id`. Advisory: failures
    /// read as false.
    pub async fn has_claimed(&self, id: u64, viewer: &Address) -> bool {
        match self
            .registry
            .call(OP_HAS_CLAIMED, vec![json!(id), json!(viewer)])
            .await
        {
            Ok(value) => match value.as_bool() {
                Some(flag) => flag,
                None => {
                    tracing::debug!("{OP_HAS_CLAIMED}({id}) returned non-bool {value}");
                    false
                }
            },
            Err(err) => {
                tracing::warn!("{OP_HAS_CLAIMED}({id}, {viewer}) failed: {err}");
                false
            }
        }
    }

    pub async fn packet_info(&self, id: u64) -> Option<PacketInfo> {
        let payload = match self.registry.call(OP_PACKET_INFO, vec![json!(id)]).await {
            Ok(payload) => payload,
            Err(err) => {
                tracing::warn!("packet {id} detail unavailable: {err}");
                return None;
            }
        };
        match decode_packet_info(&payload) {
            Ok(info) => Some(info),
            Err(detail) => {
                tracing::warn!("packet {id} detail undecodable: {detail}");
                None
            }
        }
    }
}

/// One state-changing call per action type at a time. Cleared on drop, so
/// every exit path releases the slot.
struct BusyGuard<'a>(&'a AtomicBool);

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool, action: &'static str) -> Result<Self, ClientError> {
        if flag
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Acquire)
            .is_err()
        {
            return Err(ClientError::validation(format!(
                "another {action} is already in progress"
            )));
        }
        Ok(BusyGuard(flag))
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

// ============================================================
// Wire decoding
// ============================================================

/// The list result is an object of parallel arrays; row i is assembled from
/// position i of every column.
fn decode_packet_rows(payload: &Value) -> Result<Vec<PacketRecord>, String> {
    let object = payload
        .as_object()
        .ok_or_else(|| "result is not an object".to_string())?;
    let ids = column(object, "ids")?;
    let creators = column(object, "creators")?;
    let total_amounts = column(object, "totalAmounts")?;
    let remain_counts = column(object, "remainCounts")?;
    let total_counts = column(object, "totalCounts")?;
    let messages = column(object, "messages")?;
    let is_actives = column(object, "isActives")?;
    let modes = column(object, "packetTypes")?;
    let created_ats = object.get("createdAts").and_then(Value::as_array);

    let rows = ids.len();
    let columns: [(&str, &Vec<Value>); 7] = [
        ("creators", creators),
        ("totalAmounts", total_amounts),
        ("remainCounts", remain_counts),
        ("totalCounts", total_counts),
        ("messages", messages),
        ("isActives", is_actives),
        ("packetTypes", modes),
    ];
    for (name, column) in columns {
        if column.len() != rows {
            return Err(format!(
                "column {name} holds {} cells, expected {rows}",
                column.len()
            ));
        }
    }
    if let Some(col) = created_ats {
        if col.len() != rows {
            return Err(format!(
                "column createdAts holds {} cells, expected {rows}",
                col.len()
            ));
        }
    }

    let mut records = Vec::with_capacity(rows);
    for i in 0..rows {
        records.push(PacketRecord {
            id: u64_cell(&ids[i], "ids")?,
            creator: address_cell(&creators[i], "creators")?,
            total_amount: amount::normalize(&total_amounts[i])
                .map_err(|err| format!("totalAmounts: {err}"))?,
            remain_count: u32_cell(&remain_counts[i], "remainCounts")?,
            total_count: u32_cell(&total_counts[i], "totalCounts")?,
            message: str_cell(&messages[i], "messages")?.to_string(),
            is_active: bool_cell(&is_actives[i], "isActives")?,
            mode: mode_cell(&modes[i])?,
            created_at: created_ats.map(|col| u64_cell(&col[i], "createdAts")).transpose()?,
            has_claimed: false,
        });
    }
    Ok(records)
}

fn decode_packet_info(payload: &Value) -> Result<PacketInfo, String> {
    let object = payload
        .as_object()
        .ok_or_else(|| "result is not an object".to_string())?;
    let field = |name: &str| {
        object
            .get(name)
            .ok_or_else(|| format!("missing field {name}"))
    };
    Ok(PacketInfo {
        creator: address_cell(field("creator")?, "creator")?,
        total_amount: amount::normalize(field("totalAmount")?)
            .map_err(|err| format!("totalAmount: {err}"))?,
        remain_amount: amount::normalize(field("remainAmount")?)
            .map_err(|err| format!("remainAmount: {err}"))?,
        total_count: u32_cell(field("totalCount")?, "totalCount")?,
        remain_count: u32_cell(field("remainCount")?, "remainCount")?,
        message: str_cell(field("message")?, "message")?.to_string(),
        is_active: bool_cell(field("isActive")?, "isActive")?,
        created_at: u64_cell(field("createTime")?, "createTime")?,
        mode: mode_cell(field("packetType")?)?,
    })
}

fn column<'a>(object: &'a Map<String, Value>, name: &str) -> Result<&'a Vec<Value>, String> {
    object
        .get(name)
        .and_then(Value::as_array)
        .ok_or_else(|| format!("missing column {name}"))
}

fn u64_cell(value: &Value, what: &str) -> Result<u64, String> {
    let n = amount::normalize(value).map_err(|err| format!("{what}: {err}"))?;
    u64::try_from(n).map_err(|_| format!("{what}: exceeds u64"))
}

fn u32_cell(value: &Value, what: &str) -> Result<u32, String> {
    let n = amount::normalize(value).map_err(|err| format!("{what}: {err}"))?;
    u32::try_from(n).map_err(|_| format!("{what}: exceeds u32"))
}

fn str_cell<'a>(value: &'a Value, what: &str) -> Result<&'a str, String> {
    value.as_str().ok_or_else(|| format!("{what}: not a string"))
}

fn bool_cell(value: &Value, what: &str) -> Result<bool, String> {
    value.as_bool().ok_or_else(|| format!("{what}: not a bool"))
}

fn address_cell(value: &Value, what: &str) -> Result<Address, String> {
    Address::parse(str_cell(value, what)?).map_err(|err| format!("{what}: {err}"))
}

fn mode_cell(value: &Value) -> Result<DistributionMode, String> {
    let n = amount::normalize(value).map_err(|err| format!("packetTypes: {err}"))?;
    Ok(DistributionMode::from_wire(u8::try_from(n).unwrap_or(0)))
}
