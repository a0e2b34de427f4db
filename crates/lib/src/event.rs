//! Chat platform event payloads and the bot's reply.
//!
//! Inbound events are parsed in two steps: a lenient envelope that only reads
//! `type`, then the branch-specific payload (e.g. `message.text` for MESSAGE).
//! Fields outside what a branch needs are never looked at, so a malformed
//! `message` on an ADDED_TO_SPACE event does not matter.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

/// Event type from the `type` field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventType {
    /// Bot was added to a space or a direct message.
    AddedToSpace,
    /// A user sent a message to the bot.
    Message,
    /// Any other value. `None` when `type` is missing or not a string.
    Other(Option<String>),
}

impl EventType {
    pub fn from_value(value: Option<&Value>) -> Self {
        match value.and_then(Value::as_str) {
            Some("ADDED_TO_SPACE") => EventType::AddedToSpace,
            Some("MESSAGE") => EventType::Message,
            Some(other) => EventType::Other(Some(other.to_string())),
            None => EventType::Other(None),
        }
    }
}

impl Default for EventType {
    fn default() -> Self {
        EventType::Other(None)
    }
}

impl<'de> Deserialize<'de> for EventType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Option::<Value>::deserialize(deserializer)?;
        Ok(EventType::from_value(value.as_ref()))
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventType::AddedToSpace => f.write_str("ADDED_TO_SPACE"),
            EventType::Message => f.write_str("MESSAGE"),
            EventType::Other(Some(s)) => f.write_str(s),
            EventType::Other(None) => f.write_str("<none>"),
        }
    }
}

#[derive(Debug, Deserialize)]
struct EventEnvelope {
    #[serde(rename = "type", default)]
    event_type: EventType,
}

#[derive(Debug, Deserialize)]
struct MessageEvent {
    message: ChatMessage,
}

/// The `message` object of a MESSAGE event.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChatMessage {
    pub text: String,
}

/// A classified inbound event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    AddedToSpace,
    Message(ChatMessage),
    /// Event type the bot does not act on; carries the raw `type` for logging.
    Other(Option<String>),
}

/// Errors turning a parsed JSON body into a [`ChatEvent`].
#[derive(Debug, thiserror::Error)]
pub enum EventError {
    #[error("event payload is a JSON {0}, expected an object")]
    NotAnObject(&'static str),
    #[error("malformed event payload: {0}")]
    Malformed(#[from] serde_json::Error),
}

impl ChatEvent {
    /// Classify a parsed JSON body. Only MESSAGE events require more than `type`.
    pub fn from_value(value: Value) -> Result<Self, EventError> {
        if !value.is_object() {
            return Err(EventError::NotAnObject(json_kind(&value)));
        }
        let envelope: EventEnvelope = serde_json::from_value(value.clone())?;
        match envelope.event_type {
            EventType::AddedToSpace => Ok(ChatEvent::AddedToSpace),
            EventType::Message => {
                let event: MessageEvent = serde_json::from_value(value)?;
                Ok(ChatEvent::Message(event.message))
            }
            EventType::Other(raw) => Ok(ChatEvent::Other(raw)),
        }
    }

    pub fn event_type(&self) -> EventType {
        match self {
            ChatEvent::AddedToSpace => EventType::AddedToSpace,
            ChatEvent::Message(_) => EventType::Message,
            ChatEvent::Other(raw) => EventType::Other(raw.clone()),
        }
    }
}

/// Where an event came from (space and sender), read best-effort for logs only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventContext {
    pub space_name: Option<String>,
    pub space_type: Option<String>,
    pub user_display_name: Option<String>,
}

impl EventContext {
    pub fn from_value(value: &Value) -> Self {
        let field = |pointer: &str| {
            value
                .pointer(pointer)
                .and_then(Value::as_str)
                .map(str::to_string)
        };
        Self {
            space_name: field("/space/name"),
            space_type: field("/space/type"),
            user_display_name: field("/user/displayName"),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.space_name.is_none() && self.space_type.is_none() && self.user_display_name.is_none()
    }
}

/// Synchronous reply body: `{ "text": ... }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    pub text: String,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// JSON type name for log messages.
pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
