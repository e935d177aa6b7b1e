use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::agent::{AgentError, AgentEvent, SigningAgent, StateCall};
use crate::amount;
use crate::consts::*;
use crate::registry::{Confirmation, RegistryRpc, RpcError};
use crate::types::Address;

const METHOD_ACCOUNTS: &str = "wallet_accounts";
const METHOD_REQUEST_ACCOUNTS: &str = "wallet_requestAccounts";
const METHOD_REQUEST_PERMISSIONS: &str = "wallet_requestPermissions";
const METHOD_CHAIN_ID: &str = "wallet_chainId";
const METHOD_SEND_TRANSACTION: &str = "wallet_sendTransaction";
const METHOD_BALANCE: &str = "getBalance";
const METHOD_RECEIPT: &str = "getTransactionReceipt";

// ============================================================
// JSON-RPC envelope
// ============================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub method: String,
    pub params: Vec<Value>,
    pub id: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JsonRpcResponse {
    Success {
        jsonrpc: String,
        result: Value,
        id: Value,
    },
    Error {
        jsonrpc: String,
        error: JsonRpcError,
        id: Value,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

#[derive(Debug, Error)]
enum WireError {
    #[error("transport: {0}")]
    Transport(String),
    #[error("{message} (code {code})")]
    Remote { code: i32, message: String },
}

async fn roundtrip(
    http: &Client,
    url: &str,
    method: &str,
    params: Vec<Value>,
) -> Result<Value, WireError> {
    let request = JsonRpcRequest {
        jsonrpc: "2.0".to_string(),
        method: method.to_string(),
        params,
        id: json!(1),
    };
    let response = http
        .post(url)
        .json(&request)
        .send()
        .await
        .map_err(|err| WireError::Transport(err.to_string()))?;
    let body: JsonRpcResponse = response
        .json()
        .await
        .map_err(|err| WireError::Transport(err.to_string()))?;
    match body {
        JsonRpcResponse::Success { result, .. } => Ok(result),
        JsonRpcResponse::Error { error, .. } => Err(WireError::Remote {
            code: error.code,
            message: error.message,
        }),
    }
}

fn http_client() -> Result<Client, String> {
    Client::builder()
        .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
        .build()
        .map_err(|err| err.to_string())
}

// ============================================================
// Registry over HTTP
// ============================================================

/// JSON-RPC client for a registry daemon. Confirmation waits are a receipt
/// poll at a fixed interval; each request carries its own timeout, the wait
/// itself is unbounded.
pub struct HttpRegistryRpc {
    http: Client,
    url: String,
    poll_interval: Duration,
}

impl HttpRegistryRpc {
    pub fn new(url: impl Into<String>) -> Result<Self, RpcError> {
        Ok(HttpRegistryRpc {
            http: http_client().map_err(RpcError::Transport)?,
            url: url.into(),
            poll_interval: Duration::from_millis(RECEIPT_POLL_MS),
        })
    }
}

fn registry_error(operation: &str, err: WireError) -> RpcError {
    match err {
        WireError::Transport(detail) => RpcError::Transport(detail),
        WireError::Remote { code, message } => RpcError::Call {
            operation: operation.to_string(),
            code,
            message,
        },
    }
}

#[async_trait]
impl RegistryRpc for HttpRegistryRpc {
    async fn call(&self, operation: &str, args: Vec<Value>) -> Result<Value, RpcError> {
        roundtrip(&self.http, &self.url, operation, args)
            .await
            .map_err(|err| registry_error(operation, err))
    }

    async fn balance_of(&self, account: &Address) -> Result<Value, RpcError> {
        roundtrip(&self.http, &self.url, METHOD_BALANCE, vec![json!(account)])
            .await
            .map_err(|err| registry_error(METHOD_BALANCE, err))
    }

    async fn await_confirmation(&self, transaction_id: &str) -> Result<Confirmation, RpcError> {
        loop {
            let receipt = roundtrip(
                &self.http,
                &self.url,
                METHOD_RECEIPT,
                vec![json!(transaction_id)],
            )
            .await
            .map_err(|err| registry_error(METHOD_RECEIPT, err))?;
            if receipt.is_null() {
                tokio::time::sleep(self.poll_interval).await;
                continue;
            }
            return decode_receipt(transaction_id, &receipt);
        }
    }
}

fn decode_receipt(transaction_id: &str, receipt: &Value) -> Result<Confirmation, RpcError> {
    let object = receipt.as_object().ok_or_else(|| RpcError::Malformed {
        operation: METHOD_RECEIPT.to_string(),
        detail: "receipt is not an object".to_string(),
    })?;
    // receipts without a status field read as committed
    let committed = match object.get("status") {
        None | Some(Value::Null) => true,
        Some(Value::Bool(flag)) => *flag,
        Some(other) => amount::normalize(other)
            .map(|n| !n.is_zero())
            .unwrap_or(false),
    };
    let revert_reason = object
        .get("revertReason")
        .and_then(Value::as_str)
        .map(str::to_string);
    let events = object
        .get("events")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    let transaction_id = object
        .get("transactionHash")
        .and_then(Value::as_str)
        .unwrap_or(transaction_id)
        .to_string();
    Ok(Confirmation {
        transaction_id,
        committed,
        revert_reason,
        events,
    })
}

// ============================================================
// Signing agent over HTTP
// ============================================================

/// JSON-RPC client for a wallet daemon. The daemon is plain request/response,
/// so push notifications are synthesized: a background poller compares
/// successive account and chain reads and broadcasts the changes.
pub struct HttpSigningAgent {
    http: Client,
    url: String,
    notifications: broadcast::Sender<AgentEvent>,
    poller: Mutex<Option<JoinHandle<()>>>,
}

impl HttpSigningAgent {
    pub fn new(url: impl Into<String>) -> Result<Self, AgentError> {
        let (notifications, _) = broadcast::channel(16);
        Ok(HttpSigningAgent {
            http: http_client().map_err(AgentError::Transport)?,
            url: url.into(),
            notifications,
            poller: Mutex::new(None),
        })
    }

    /// Start change detection. Safe to call more than once.
    pub fn spawn_poller(&self) {
        let mut slot = self.poller.lock();
        if slot.is_some() {
            return;
        }
        *slot = Some(tokio::spawn(poll_wallet(
            self.http.clone(),
            self.url.clone(),
            self.notifications.clone(),
            Duration::from_millis(AGENT_POLL_MS),
        )));
    }
}

impl Drop for HttpSigningAgent {
    fn drop(&mut self) {
        if let Some(handle) = self.poller.lock().take() {
            handle.abort();
        }
    }
}

fn agent_error(err: WireError) -> AgentError {
    match err {
        WireError::Transport(detail) => AgentError::Transport(detail),
        WireError::Remote { code, .. } if code == AGENT_REJECTED_CODE => AgentError::Rejected,
        WireError::Remote { code, message } => {
            AgentError::Protocol(format!("{message} (code {code})"))
        }
    }
}

async fn fetch_accounts(http: &Client, url: &str) -> Result<Vec<Address>, AgentError> {
    let value = roundtrip(http, url, METHOD_ACCOUNTS, vec![])
        .await
        .map_err(agent_error)?;
    decode_accounts(&value)
}

fn decode_accounts(value: &Value) -> Result<Vec<Address>, AgentError> {
    let entries = value
        .as_array()
        .ok_or_else(|| AgentError::Protocol("accounts result is not an array".to_string()))?;
    entries
        .iter()
        .map(|entry| {
            let text = entry.as_str().ok_or_else(|| {
                AgentError::Protocol(format!("account entry {entry} is not a string"))
            })?;
            Address::parse(text).map_err(|err| AgentError::Protocol(err.to_string()))
        })
        .collect()
}

async fn fetch_chain_id(http: &Client, url: &str) -> Result<u64, AgentError> {
    let value = roundtrip(http, url, METHOD_CHAIN_ID, vec![])
        .await
        .map_err(agent_error)?;
    let id = amount::normalize(&value).map_err(|err| AgentError::Protocol(err.to_string()))?;
    u64::try_from(id).map_err(|_| AgentError::Protocol("chain id exceeds u64".to_string()))
}

#[async_trait]
impl SigningAgent for HttpSigningAgent {
    async fn accounts(&self) -> Result<Vec<Address>, AgentError> {
        fetch_accounts(&self.http, &self.url).await
    }

    async fn request_accounts(&self) -> Result<Vec<Address>, AgentError> {
        let value = roundtrip(&self.http, &self.url, METHOD_REQUEST_ACCOUNTS, vec![])
            .await
            .map_err(agent_error)?;
        decode_accounts(&value)
    }

    async fn request_permissions(&self) -> Result<Vec<Address>, AgentError> {
        roundtrip(&self.http, &self.url, METHOD_REQUEST_PERMISSIONS, vec![])
            .await
            .map_err(agent_error)?;
        fetch_accounts(&self.http, &self.url).await
    }

    async fn chain_id(&self) -> Result<u64, AgentError> {
        fetch_chain_id(&self.http, &self.url).await
    }

    async fn submit(&self, call: StateCall) -> Result<String, AgentError> {
        let request = json!({
            "operation": call.operation,
            "args": call.args,
            "value": format!("0x{:x}", call.value),
            "gasLimit": call.gas_limit,
        });
        let value = roundtrip(&self.http, &self.url, METHOD_SEND_TRANSACTION, vec![request])
            .await
            .map_err(agent_error)?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| AgentError::Protocol(format!("transaction id {value} is not a string")))
    }

    fn subscribe(&self) -> broadcast::Receiver<AgentEvent> {
        self.notifications.subscribe()
    }
}

/// Emits nothing on the first observation; every later difference becomes a
/// notification. Poll failures are skipped, not surfaced.
async fn poll_wallet(
    http: Client,
    url: String,
    notify: broadcast::Sender<AgentEvent>,
    every: Duration,
) {
    let mut known_accounts: Option<Vec<Address>> = None;
    let mut known_chain: Option<u64> = None;
    loop {
        tokio::time::sleep(every).await;
        match fetch_accounts(&http, &url).await {
            Ok(accounts) => {
                if known_accounts.as_ref().is_some_and(|known| known != &accounts) {
                    let _ = notify.send(AgentEvent::AccountsChanged(accounts.clone()));
                }
                known_accounts = Some(accounts);
            }
            Err(err) => tracing::debug!("account poll failed: {err}"),
        }
        match fetch_chain_id(&http, &url).await {
            Ok(chain_id) => {
                if known_chain.is_some_and(|known| known != chain_id) {
                    let _ = notify.send(AgentEvent::ChainChanged(chain_id));
                }
                known_chain = Some(chain_id);
            }
            Err(err) => tracing::debug!("chain poll failed: {err}"),
        }
    }
}
