use serde::Serialize;
use serde_json::Value;

/// Inbound wire payloads, one closed variant per routable operation.
///
/// Each valid frame produces at most one registry mutation or one broadcast
/// fan-out, never both.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientFrame {
    Subscribe { event: String },
    Unsubscribe { event: String },
    Broadcast { event: String, args: Vec<Value> },
}

impl ClientFrame {
    /// Parse one decoded candidate string.
    ///
    /// Fail-open on garbage, fail-closed on action: anything that does not
    /// parse as a JSON object with a string `type`, a non-empty string
    /// `event`, and (for broadcasts) an array `args` yields `None` and is
    /// silently discarded by the caller. `args` defaults to an empty list
    /// when absent.
    pub fn parse(candidate: &str) -> Option<Self> {
        let value: Value = serde_json::from_str(candidate).ok()?;
        let obj = value.as_object()?;
        let kind = obj.get("type")?.as_str()?;
        let event = obj.get("event")?.as_str()?;
        if event.is_empty() {
            return None;
        }
        let event = event.to_string();

        match kind {
            "subscribe" => Some(Self::Subscribe { event }),
            "unsubscribe" => Some(Self::Unsubscribe { event }),
            "broadcast" => {
                let args = match obj.get("args") {
                    None | Some(Value::Null) => Vec::new(),
                    Some(Value::Array(items)) => items.clone(),
                    Some(_) => return None,
                };
                Some(Self::Broadcast { event, args })
            }
            _ => None,
        }
    }
}

/// Outbound broadcast payload. Deliberately has no `type` field: the
/// server->client shape is asymmetric to the client->server one, and clients
/// are written against that contract.
#[derive(Debug, Serialize)]
pub struct OutboundFrame<'a> {
    pub event: &'a str,
    pub args: &'a [Value],
}
