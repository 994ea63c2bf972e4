/// Event envelope for the notification relay
///
/// Every frame pushed to a client is a JSON object with two fields:
///
/// ```json
/// { "event": "task:created", "data": { ... } }
/// ```
///
/// The envelope is serialized once per emission; fan-out to a tenant
/// clones the resulting string, not the payload.

use serde::Serialize;
use serde_json::Value as JsonValue;

/// Kinds of events pushed over the relay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    TaskCreated,
    TaskUpdated,
    TaskDeleted,
    TaskAssigned,
    CommentCreated,
}

impl EventKind {
    /// Wire name of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::TaskCreated => "task:created",
            EventKind::TaskUpdated => "task:updated",
            EventKind::TaskDeleted => "task:deleted",
            EventKind::TaskAssigned => "task:assigned",
            EventKind::CommentCreated => "comment:created",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wire envelope: event name plus payload
#[derive(Debug, Clone, Serialize)]
pub struct WsEvent {
    pub event: &'static str,
    pub data: JsonValue,
}

impl WsEvent {
    pub fn new(kind: EventKind, data: impl Serialize) -> Self {
        Self {
            event: kind.as_str(),
            data: serde_json::to_value(data).unwrap_or(JsonValue::Null),
        }
    }

    /// Serializes the envelope to its wire form
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(r#"{{"event":"{}","data":null}}"#, self.event)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_kind_wire_names() {
        assert_eq!(EventKind::TaskCreated.as_str(), "task:created");
        assert_eq!(EventKind::TaskUpdated.as_str(), "task:updated");
        assert_eq!(EventKind::TaskDeleted.as_str(), "task:deleted");
        assert_eq!(EventKind::TaskAssigned.as_str(), "task:assigned");
        assert_eq!(EventKind::CommentCreated.as_str(), "comment:created");
    }

    #[test]
    fn test_envelope_shape() {
        let event = WsEvent::new(EventKind::TaskCreated, json!({"id": "abc"}));
        let wire: JsonValue = serde_json::from_str(&event.to_json()).unwrap();

        assert_eq!(wire["event"], "task:created");
        assert_eq!(wire["data"]["id"], "abc");
    }

    #[test]
    fn test_envelope_with_struct_payload() {
        #[derive(Serialize)]
        struct Payload {
            id: u32,
        }

        let event = WsEvent::new(EventKind::CommentCreated, Payload { id: 7 });
        let wire: JsonValue = serde_json::from_str(&event.to_json()).unwrap();

        assert_eq!(wire["event"], "comment:created");
        assert_eq!(wire["data"]["id"], 7);
    }
}
