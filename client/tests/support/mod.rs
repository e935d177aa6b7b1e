#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::sync::{broadcast, Notify, Semaphore};

use redpacket_client::agent::{AgentError, AgentEvent, SigningAgent, StateCall};
use redpacket_client::consts::*;
use redpacket_client::registry::{Confirmation, RegistryRpc, RpcError};
use redpacket_client::types::{Address, ConnectionStatus};
use redpacket_client::{ConnectionManager, LedgerGateway, ListSynchronizer};

// ============================================================
// Scripted signing agent
// ============================================================

/// Pauses `submit` until released, so tests can hold a call in flight.
#[derive(Clone)]
pub struct SubmitGate {
    pub entered: Arc<Notify>,
    pub release: Arc<Semaphore>,
}

impl SubmitGate {
    pub fn new() -> Self {
        SubmitGate {
            entered: Arc::new(Notify::new()),
            release: Arc::new(Semaphore::new(0)),
        }
    }

    pub fn open(&self) {
        self.release.add_permits(1);
    }
}

pub struct ScriptedAgent {
    pub authorized: Mutex<Vec<Address>>,
    pub chain: AtomicU64,
    pub reject_requests: AtomicBool,
    pub reject_permissions: AtomicBool,
    pub reject_submissions: AtomicBool,
    pub submission_failure: Mutex<Option<String>>,
    pub gate: Mutex<Option<SubmitGate>>,
    pub submissions: Mutex<Vec<StateCall>>,
    pub submit_attempts: AtomicU64,
    pub request_account_calls: AtomicU64,
    pub events: broadcast::Sender<AgentEvent>,
    next_tx: AtomicU64,
}

impl ScriptedAgent {
    pub fn new(accounts: Vec<Address>, chain: u64) -> Arc<Self> {
        let (events, _) = broadcast::channel(16);
        Arc::new(ScriptedAgent {
            authorized: Mutex::new(accounts),
            chain: AtomicU64::new(chain),
            reject_requests: AtomicBool::new(false),
            reject_permissions: AtomicBool::new(false),
            reject_submissions: AtomicBool::new(false),
            submission_failure: Mutex::new(None),
            gate: Mutex::new(None),
            submissions: Mutex::new(Vec::new()),
            submit_attempts: AtomicU64::new(0),
            request_account_calls: AtomicU64::new(0),
            events,
            next_tx: AtomicU64::new(0),
        })
    }

    pub fn push(&self, event: AgentEvent) {
        let _ = self.events.send(event);
    }

    pub fn submitted(&self) -> Vec<StateCall> {
        self.submissions.lock().clone()
    }
}

#[async_trait]
impl SigningAgent for ScriptedAgent {
    async fn accounts(&self) -> Result<Vec<Address>, AgentError> {
        Ok(self.authorized.lock().clone())
    }

    async fn request_accounts(&self) -> Result<Vec<Address>, AgentError> {
        self.request_account_calls.fetch_add(1, Ordering::SeqCst);
        if self.reject_requests.load(Ordering::SeqCst) {
            return Err(AgentError::Rejected);
        }
        Ok(self.authorized.lock().clone())
    }

    async fn request_permissions(&self) -> Result<Vec<Address>, AgentError> {
        if self.reject_permissions.load(Ordering::SeqCst) {
            return Err(AgentError::Rejected);
        }
        Ok(self.authorized.lock().clone())
    }

    async fn chain_id(&self) -> Result<u64, AgentError> {
        Ok(self.chain.load(Ordering::SeqCst))
    }

    async fn submit(&self, call: StateCall) -> Result<String, AgentError> {
        self.submit_attempts.fetch_add(1, Ordering::SeqCst);
        if self.reject_submissions.load(Ordering::SeqCst) {
            return Err(AgentError::Rejected);
        }
        if let Some(message) = self.submission_failure.lock().clone() {
            return Err(AgentError::Transport(message));
        }
        let gate = self.gate.lock().clone();
        if let Some(gate) = gate {
            gate.entered.notify_one();
            if let Ok(permit) = gate.release.acquire().await {
                permit.forget();
            }
        }
        self.submissions.lock().push(call);
        let n = self.next_tx.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("0xtx{n}"))
    }

    fn subscribe(&self) -> broadcast::Receiver<AgentEvent> {
        self.events.subscribe()
    }
}

// ============================================================
// Scripted registry
// ============================================================

#[derive(Clone)]
pub struct SeedPacket {
    pub id: u64,
    pub creator: Address,
    pub total_amount: String,
    pub remain_count: u32,
    pub total_count: u32,
    pub message: String,
    pub is_active: bool,
    pub mode: u8,
    pub created_at: u64,
}

impl SeedPacket {
    pub fn basic(id: u64) -> Self {
        SeedPacket {
            id,
            creator: address(0xC0),
            total_amount: "1000000000000000000".to_string(),
            remain_count: 3,
            total_count: 5,
            message: format!("packet {id}"),
            is_active: true,
            mode: 0,
            created_at: 1_700_000_000 + id,
        }
    }
}

pub struct ScriptedRegistry {
    pub packets: Mutex<Vec<SeedPacket>>,
    pub claimed: Mutex<HashSet<(u64, Address)>>,
    pub receipts: Mutex<VecDeque<Confirmation>>,
    pub failing_ops: Mutex<HashSet<String>>,
    pub balances: Mutex<HashMap<Address, Value>>,
    pub reads: Mutex<Vec<String>>,
}

impl ScriptedRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(ScriptedRegistry {
            packets: Mutex::new(Vec::new()),
            claimed: Mutex::new(HashSet::new()),
            receipts: Mutex::new(VecDeque::new()),
            failing_ops: Mutex::new(HashSet::new()),
            balances: Mutex::new(HashMap::new()),
            reads: Mutex::new(Vec::new()),
        })
    }

    /// Seed packets with ids 0..count, oldest first, the way the registry
    /// numbers them.
    pub fn seed(&self, count: u64) {
        let mut packets = self.packets.lock();
        for id in 0..count {
            packets.push(SeedPacket::basic(id));
        }
    }

    pub fn mark_claimed(&self, id: u64, viewer: &Address) {
        self.claimed.lock().insert((id, viewer.clone()));
    }

    pub fn fail_op(&self, operation: &str) {
        self.failing_ops.lock().insert(operation.to_string());
    }

    pub fn queue_receipt(&self, confirmation: Confirmation) {
        self.receipts.lock().push_back(confirmation);
    }

    pub fn read_count(&self, operation: &str) -> usize {
        self.reads.lock().iter().filter(|op| *op == operation).count()
    }
}

#[async_trait]
impl RegistryRpc for ScriptedRegistry {
    async fn call(&self, operation: &str, args: Vec<Value>) -> Result<Value, RpcError> {
        self.reads.lock().push(operation.to_string());
        if self.failing_ops.lock().contains(operation) {
            return Err(RpcError::Transport(format!("{operation} unavailable")));
        }
        match operation {
            OP_TOTAL_PACKETS => Ok(json!(self.packets.lock().len() as u64)),
            OP_PACKET_LIST => {
                let start = args[0].as_u64().unwrap() as usize;
                let count = args[1].as_u64().unwrap() as usize;
                let packets = self.packets.lock();
                let end = (start + count).min(packets.len());
                let slice = &packets[start.min(packets.len())..end];
                Ok(json!({
                    "ids": slice.iter().map(|p| json!(p.id)).collect::<Vec<_>>(),
                    "creators": slice.iter().map(|p| json!(p.creator)).collect::<Vec<_>>(),
                    "totalAmounts": slice.iter().map(|p| json!(p.total_amount)).collect::<Vec<_>>(),
                    "remainCounts": slice.iter().map(|p| json!(p.remain_count)).collect::<Vec<_>>(),
                    "totalCounts": slice.iter().map(|p| json!(p.total_count)).collect::<Vec<_>>(),
                    "messages": slice.iter().map(|p| json!(p.message)).collect::<Vec<_>>(),
                    "isActives": slice.iter().map(|p| json!(p.is_active)).collect::<Vec<_>>(),
                    "packetTypes": slice.iter().map(|p| json!(p.mode)).collect::<Vec<_>>(),
                    "createdAts": slice.iter().map(|p| json!(p.created_at)).collect::<Vec<_>>(),
                }))
            }
            OP_HAS_CLAIMED => {
                let id = args[0].as_u64().unwrap();
                let viewer = Address::parse(args[1].as_str().unwrap()).unwrap();
                Ok(json!(self.claimed.lock().contains(&(id, viewer))))
            }
            OP_PACKET_INFO => {
                let id = args[0].as_u64().unwrap();
                let packets = self.packets.lock();
                let packet = packets.iter().find(|p| p.id == id).ok_or_else(|| RpcError::Call {
                    operation: operation.to_string(),
                    code: -32000,
                    message: "no such packet".to_string(),
                })?;
                Ok(json!({
                    "creator": packet.creator,
                    "totalAmount": packet.total_amount,
                    "remainAmount": packet.total_amount,
                    "totalCount": packet.total_count,
                    "remainCount": packet.remain_count,
                    "message": packet.message,
                    "isActive": packet.is_active,
                    "createTime": packet.created_at,
                    "packetType": packet.mode,
                }))
            }
            other => Err(RpcError::Call {
                operation: other.to_string(),
                code: -32601,
                message: "method not found".to_string(),
            }),
        }
    }

    async fn balance_of(&self, account: &Address) -> Result<Value, RpcError> {
        if self.failing_ops.lock().contains("getBalance") {
            return Err(RpcError::Transport("getBalance unavailable".to_string()));
        }
        Ok(self.balances.lock().get(account).cloned().unwrap_or(json!("0x0")))
    }

    async fn await_confirmation(&self, transaction_id: &str) -> Result<Confirmation, RpcError> {
        if self.failing_ops.lock().contains("awaitConfirmation") {
            return Err(RpcError::Transport("confirmation unavailable".to_string()));
        }
        match self.receipts.lock().pop_front() {
            Some(mut confirmation) => {
                confirmation.transaction_id = transaction_id.to_string();
                Ok(confirmation)
            }
            None => Ok(Confirmation {
                transaction_id: transaction_id.to_string(),
                committed: true,
                revert_reason: None,
                events: Vec::new(),
            }),
        }
    }
}

// ============================================================
// Fixtures
// ============================================================

pub fn address(tag: u8) -> Address {
    Address::parse(&format!("0x{tag:040x}")).unwrap()
}

pub fn created_receipt(packet_id: u64) -> Confirmation {
    Confirmation {
        transaction_id: String::new(),
        committed: true,
        revert_reason: None,
        events: vec![json!({ "event": EVENT_PACKET_CREATED, "args": { EVENT_FIELD_PACKET_ID: packet_id } })],
    }
}

pub fn claimed_receipt(amount_base_units: &str) -> Confirmation {
    Confirmation {
        transaction_id: String::new(),
        committed: true,
        revert_reason: None,
        events: vec![json!({ "event": EVENT_PACKET_CLAIMED, "args": { EVENT_FIELD_AMOUNT: amount_base_units } })],
    }
}

pub fn reverted_receipt(reason: &str) -> Confirmation {
    Confirmation {
        transaction_id: String::new(),
        committed: false,
        revert_reason: Some(reason.to_string()),
        events: Vec::new(),
    }
}

pub struct World {
    pub agent: Arc<ScriptedAgent>,
    pub registry: Arc<ScriptedRegistry>,
    pub connection: Arc<ConnectionManager>,
    pub gateway: Arc<LedgerGateway>,
    pub lists: ListSynchronizer,
}

pub fn world(accounts: Vec<Address>) -> World {
    let agent = ScriptedAgent::new(accounts, DEFAULT_CHAIN_ID);
    let registry = ScriptedRegistry::new();
    let connection = Arc::new(ConnectionManager::new(agent.clone(), registry.clone()));
    let gateway = Arc::new(LedgerGateway::new(
        connection.clone(),
        agent.clone(),
        registry.clone(),
    ));
    let lists = ListSynchronizer::new(gateway.clone());
    World {
        agent,
        registry,
        connection,
        gateway,
        lists,
    }
}

pub async fn connected_world() -> World {
    let w = world(vec![address(0xA1)]);
    w.connection.connect().await.unwrap();
    w
}

/// Watcher-driven transitions land asynchronously; poll for them.
pub async fn wait_for_status(connection: &ConnectionManager, status: ConnectionStatus) {
    for _ in 0..200 {
        if connection.snapshot().status == status {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("connection never reached {status:?}");
}
