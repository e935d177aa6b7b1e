use async_trait::async_trait;
use ruint::aliases::U256;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::broadcast;

use crate::types::Address;

/// State-changing call addressed to the packet registry.
#[derive(Debug, Clone)]
pub struct StateCall {
    pub operation: String,
    pub args: Vec<Value>,
    /// Native value attached to the call, in base units
    pub value: U256,
    pub gas_limit: u64,
}

/// Push notification from the signing agent.
#[derive(Debug, Clone)]
pub enum AgentEvent {
    /// The authorized account set changed; empty means access was revoked.
    AccountsChanged(Vec<Address>),
    ChainChanged(u64),
}

#[derive(Debug, Error)]
pub enum AgentError {
    /// The user declined the prompt
    #[error("user rejected the request")]
    Rejected,
    #[error("agent transport: {0}")]
    Transport(String),
    #[error("agent protocol: {0}")]
    Protocol(String),
}

impl AgentError {
    pub fn is_rejection(&self) -> bool {
        matches!(self, AgentError::Rejected)
    }
}

/// The signing agent holds the user's keys and submits on their behalf.
/// Prompting methods say so; the rest never interrupt the user.
#[async_trait]
pub trait SigningAgent: Send + Sync {
    /// Accounts the agent has already authorized, without prompting.
    async fn accounts(&self) -> Result<Vec<Address>, AgentError>;

    /// Request account access; may prompt the user.
    async fn request_accounts(&self) -> Result<Vec<Address>, AgentError>;

    /// Ask the user to re-grant account permissions (account switch); returns
    /// the newly authorized set. Prompts.
    async fn request_permissions(&self) -> Result<Vec<Address>, AgentError>;

    async fn chain_id(&self) -> Result<u64, AgentError>;

    /// Sign and submit a state-changing call; returns the transaction id.
    /// May prompt for approval.
    async fn submit(&self, call: StateCall) -> Result<String, AgentError>;

    /// Subscribe to push notifications.
    fn subscribe(&self) -> broadcast::Receiver<AgentEvent>;
}
