use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::types::Address;

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("transport: {0}")]
    Transport(String),
    #[error("'{operation}' failed: {message}")]
    Call {
        operation: String,
        code: i32,
        message: String,
    },
    #[error("malformed response for '{operation}': {detail}")]
    Malformed { operation: String, detail: String },
}

/// What the network reports once a submission has one confirmation.
#[derive(Debug, Clone)]
pub struct Confirmation {
    pub transaction_id: String,
    pub committed: bool,
    pub revert_reason: Option<String>,
    /// Decoded event entries, kept loosely typed; consumers scan by name.
    pub events: Vec<Value>,
}

impl Confirmation {
    /// Field of the first event with the given name. Entries that are not
    /// objects, or that lack the expected layout, are skipped over.
    pub fn event_arg(&self, event: &str, field: &str) -> Option<&Value> {
        self.events
            .iter()
            .filter_map(Value::as_object)
            .find(|entry| entry.get("event").and_then(Value::as_str) == Some(event))
            .and_then(|entry| entry.get("args"))
            .and_then(Value::as_object)
            .and_then(|args| args.get(field))
    }
}

/// Read-side view of the packet registry plus the confirmation wait.
/// Implementations own their own polling and timeout behavior.
#[async_trait]
pub trait RegistryRpc: Send + Sync {
    /// Read-only registry call by operation name with ordered arguments.
    async fn call(&self, operation: &str, args: Vec<Value>) -> Result<Value, RpcError>;

    /// Native balance of an account, in the wire's own numeric shape.
    async fn balance_of(&self, account: &Address) -> Result<Value, RpcError>;

    /// Block until the transaction has one confirmation.
    async fn await_confirmation(&self, transaction_id: &str) -> Result<Confirmation, RpcError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn confirmation(events: Vec<Value>) -> Confirmation {
        Confirmation {
            transaction_id: "0xtx".into(),
            committed: true,
            revert_reason: None,
            events,
        }
    }

    #[test]
    fn finds_first_matching_event() {
        let c = confirmation(vec![
            json!({ "event": "Other", "args": { "packetId": 1 } }),
            json!({ "event": "PacketCreated", "args": { "packetId": 7 } }),
            json!({ "event": "PacketCreated", "args": { "packetId": 9 } }),
        ]);
        assert_eq!(c.event_arg("PacketCreated", "packetId"), Some(&json!(7)));
    }

    #[test]
    fn skips_undecodable_entries() {
        let c = confirmation(vec![
            json!("raw log data"),
            json!(42),
            json!({ "topic": "0xdead" }),
            json!({ "event": "PacketClaimed", "args": { "amount": "0x5" } }),
        ]);
        assert_eq!(c.event_arg("PacketClaimed", "amount"), Some(&json!("0x5")));
    }

    #[test]
    fn missing_event_or_field_is_none() {
        let c = confirmation(vec![json!({ "event": "PacketCreated", "args": {} })]);
        assert_eq!(c.event_arg("PacketCreated", "packetId"), None);
        assert_eq!(c.event_arg("PacketClaimed", "amount"), None);

        let no_args = confirmation(vec![json!({ "event": "PacketCreated" })]);
        assert_eq!(no_args.event_arg("PacketCreated", "packetId"), None);
    }
}
