//! Wallet and ledger interaction layer for the red packet registry:
//! connection lifecycle, packet create/claim submission with event
//! extraction, windowed list reads, and wire-value normalization.

pub mod agent;
pub mod amount;
pub mod connection;
pub mod consts;
pub mod error;
pub mod gateway;
pub mod registry;
pub mod rpc;
pub mod sync;
pub mod types;

pub use agent::{AgentError, AgentEvent, SigningAgent, StateCall};
pub use connection::ConnectionManager;
pub use error::{ClientError, ErrorInfo, ErrorKind};
pub use gateway::LedgerGateway;
pub use registry::{Confirmation, RegistryRpc, RpcError};
pub use rpc::{HttpRegistryRpc, HttpSigningAgent};
pub use sync::ListSynchronizer;
pub use types::{
    Address, ConnectionState, ConnectionStatus, DistributionMode, OperationOutcome, PacketInfo,
    PacketRecord, RefreshOutcome, RefreshStatus,
};
