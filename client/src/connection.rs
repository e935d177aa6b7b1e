use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::agent::{AgentEvent, SigningAgent};
use crate::amount;
use crate::error::{ClientError, ErrorInfo};
use crate::registry::RegistryRpc;
use crate::types::{Address, ConnectionState, ConnectionStatus};

struct Shared {
    state: RwLock<ConnectionState>,
}

/// Owns the signing-agent link. All mutation of the connection state happens
/// here: the lifecycle operations below and the notification watcher they
/// spawn. Everyone else reads snapshots.
pub struct ConnectionManager {
    agent: Arc<dyn SigningAgent>,
    registry: Arc<dyn RegistryRpc>,
    shared: Arc<Shared>,
    watcher: Mutex<Option<JoinHandle<()>>>,
}

impl ConnectionManager {
    pub fn new(agent: Arc<dyn SigningAgent>, registry: Arc<dyn RegistryRpc>) -> Self {
        ConnectionManager {
            agent,
            registry,
            shared: Arc::new(Shared {
                state: RwLock::new(ConnectionState::disconnected()),
            }),
            watcher: Mutex::new(None),
        }
    }

    pub fn snapshot(&self) -> ConnectionState {
        self.shared.state.read().clone()
    }

    // ============================================================
    // Lifecycle
    // ============================================================

    /// Establish a session, prompting the user for account access. Anything
    /// but `Disconnected` is a no-op returning the current snapshot.
    pub async fn connect(&self) -> Result<ConnectionState, ClientError> {
        {
            let mut state = self.shared.state.write();
            if state.status != ConnectionStatus::Disconnected {
                return Ok(state.clone());
            }
            state.status = ConnectionStatus::Connecting;
        }

        let accounts = match self.agent.request_accounts().await {
            Ok(accounts) => accounts,
            Err(err) if err.is_rejection() => return Err(self.fail(ClientError::UserRejected)),
            Err(err) => return Err(self.fail(ClientError::read("request_accounts", err))),
        };
        let Some(account) = accounts.into_iter().next() else {
            // empty grant reads as refusal
            return Err(self.fail(ClientError::UserRejected));
        };
        self.finish(account).await
    }

    /// Re-establish a previously granted session without prompting. Stays
    /// `Disconnected` when no account is authorized; best-effort, read
    /// failures are absorbed.
    pub async fn resume(&self) -> Result<ConnectionState, ClientError> {
        {
            let mut state = self.shared.state.write();
            if state.status != ConnectionStatus::Disconnected {
                return Ok(state.clone());
            }
            state.status = ConnectionStatus::Connecting;
        }

        match self.agent.accounts().await {
            Ok(accounts) => match accounts.into_iter().next() {
                Some(account) => self.finish(account).await,
                None => {
                    self.shared.state.write().status = ConnectionStatus::Disconnected;
                    Ok(self.snapshot())
                }
            },
            Err(err) => {
                tracing::warn!("session resume failed: {err}");
                self.shared.state.write().status = ConnectionStatus::Disconnected;
                Ok(self.snapshot())
            }
        }
    }

    /// Tear the session down. Valid from any state and idempotent.
    pub fn disconnect(&self) -> ConnectionState {
        self.abort_watcher();
        let mut state = self.shared.state.write();
        *state = ConnectionState::disconnected();
        state.clone()
    }

    /// Prompt the user to re-grant permissions and rebind the active account
    /// to the newly selected one. Refusal leaves the state untouched.
    pub async fn request_account_switch(&self) -> Result<ConnectionState, ClientError> {
        if !self.snapshot().is_connected() {
            return Err(ClientError::NotConnected);
        }
        let accounts = match self.agent.request_permissions().await {
            Ok(accounts) => accounts,
            Err(err) if err.is_rejection() => return Err(ClientError::UserRejected),
            Err(err) => return Err(ClientError::read("request_permissions", err)),
        };
        let Some(account) = accounts.into_iter().next() else {
            return Err(ClientError::UserRejected);
        };
        {
            let mut state = self.shared.state.write();
            if state.status == ConnectionStatus::Connected {
                tracing::info!("active account switched to {account}");
                state.account = Some(account);
            }
        }
        Ok(self.snapshot())
    }

    // ============================================================
    // Reads
    // ============================================================

    /// Native balance as a display string. Advisory: any failure, including
    /// not being connected, reads as "0".
    pub async fn get_balance(&self, account: &Address) -> String {
        if !self.snapshot().is_connected() {
            tracing::debug!("balance requested while disconnected");
            return "0".to_string();
        }
        match self.registry.balance_of(account).await {
            Ok(value) => amount::to_decimal_string(&value),
            Err(err) => {
                tracing::warn!("balance read for {account} failed: {err}");
                "0".to_string()
            }
        }
    }

    // ============================================================
    // Internals
    // ============================================================

    async fn finish(&self, account: Address) -> Result<ConnectionState, ClientError> {
        let chain_id = match self.agent.chain_id().await {
            Ok(chain_id) => chain_id,
            Err(err) => return Err(self.fail(ClientError::read("chain_id", err))),
        };
        {
            let mut state = self.shared.state.write();
            tracing::info!("connected as {account} on chain {chain_id}");
            state.status = ConnectionStatus::Connected;
            state.account = Some(account);
            state.chain_id = Some(chain_id);
            state.last_error = None;
        }
        self.spawn_watcher();
        Ok(self.snapshot())
    }

    /// Record the failure, pass through `Failed`, and fold back to
    /// `Disconnected` keeping `last_error` for callers to inspect.
    fn fail(&self, err: ClientError) -> ClientError {
        let info = ErrorInfo::from(&err);
        tracing::warn!("connection attempt failed: {}", info.message);
        let mut state = self.shared.state.write();
        state.status = ConnectionStatus::Failed;
        state.account = None;
        state.chain_id = None;
        state.last_error = Some(info);
        state.status = ConnectionStatus::Disconnected;
        err
    }

    fn spawn_watcher(&self) {
        self.abort_watcher();
        let receiver = self.agent.subscribe();
        let shared = self.shared.clone();
        *self.watcher.lock() = Some(tokio::spawn(watch_agent(shared, receiver)));
    }

    fn abort_watcher(&self) {
        if let Some(handle) = self.watcher.lock().take() {
            handle.abort();
        }
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        self.abort_watcher();
    }
}

/// Applies agent push notifications to the session. Ends itself once the
/// session it watches is gone.
async fn watch_agent(shared: Arc<Shared>, mut receiver: broadcast::Receiver<AgentEvent>) {
    loop {
        match receiver.recv().await {
            Ok(AgentEvent::AccountsChanged(accounts)) => match accounts.into_iter().next() {
                None => {
                    tracing::info!("agent revoked account access, disconnecting");
                    *shared.state.write() = ConnectionState::disconnected();
                    break;
                }
                Some(account) => {
                    let mut state = shared.state.write();
                    if state.status == ConnectionStatus::Connected
                        && state.account.as_ref() != Some(&account)
                    {
                        tracing::info!("active account changed to {account}");
                        state.account = Some(account);
                    }
                }
            },
            Ok(AgentEvent::ChainChanged(chain_id)) => {
                // Everything identity-scoped is stale on another network;
                // drop the session and let the caller reconnect.
                tracing::info!("network changed to chain {chain_id}, resetting session");
                *shared.state.write() = ConnectionState::disconnected();
                break;
            }
            Err(broadcast::error::RecvError::Lagged(missed)) => {
                tracing::warn!("agent notifications lagged, {missed} dropped");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
