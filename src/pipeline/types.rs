//! Shared types for the relay pipeline.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::RelayError;

/// `source` value stamped by the downstream automation on events it injects.
pub const LOOP_MARKER: &str = "n8n";

/// `source` value this router stamps on every event it forwards.
pub const ROUTER_MARKER: &str = "router";

// ── Inbound event ───────────────────────────────────────────────────

/// A messaging webhook payload.
///
/// The full JSON object is kept so it can be forwarded as-is. Accessors
/// never coerce: a `"true"` string is not a boolean, and a JSON `null`
/// is treated the same as a missing key.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundEvent {
    payload: Map<String, Value>,
}

impl InboundEvent {
    /// Parse a raw request body. Anything but a JSON object is rejected.
    pub fn parse(raw: &[u8]) -> Result<Self, RelayError> {
        let value: Value =
            serde_json::from_slice(raw).map_err(|e| RelayError::MalformedPayload(e.to_string()))?;
        Self::from_value(value)
    }

    /// Wrap an already-decoded JSON value.
    pub fn from_value(value: Value) -> Result<Self, RelayError> {
        match value {
            Value::Object(payload) => Ok(Self { payload }),
            other => Err(RelayError::MalformedPayload(format!(
                "expected a JSON object, got {}",
                json_kind(&other)
            ))),
        }
    }

    /// The underlying JSON document.
    pub fn payload(&self) -> &Map<String, Value> {
        &self.payload
    }

    /// Look up a top-level field, treating `null` as absent.
    fn field(&self, key: &str) -> Option<&Value> {
        self.payload.get(key).filter(|v| !v.is_null())
    }

    pub fn source(&self) -> Option<&str> {
        self.field("source").and_then(Value::as_str)
    }

    /// True when the event was injected by the downstream automation.
    pub fn is_loop(&self) -> bool {
        self.source() == Some(LOOP_MARKER)
    }

    /// Dedupe key: the JSON text of `messageId` when it is truthy.
    ///
    /// `null`, `false`, `0`, `""`, `[]` and `{}` carry no identity. Keys are
    /// JSON text, so `12345` and `"12345"` stay distinct.
    pub fn dedupe_key(&self) -> Option<String> {
        self.field("messageId")
            .filter(|id| is_truthy(id))
            .map(Value::to_string)
    }

    /// `messageId` as it should be echoed back to the caller: the raw value,
    /// or an empty string when the key is missing.
    pub fn message_id_echo(&self) -> Value {
        self.payload
            .get("messageId")
            .cloned()
            .unwrap_or_else(|| Value::String(String::new()))
    }

    pub fn from_me(&self) -> Option<bool> {
        self.field("fromMe").and_then(Value::as_bool)
    }

    pub fn from_api(&self) -> Option<bool> {
        self.field("fromApi").and_then(Value::as_bool)
    }

    /// The account's own number on this messaging instance.
    pub fn connected_phone(&self) -> Option<&Value> {
        self.field("connectedPhone")
    }

    /// `chat.id`. Missing when `chat` is absent, not an object, or has no `id`.
    pub fn chat_id(&self) -> Option<&Value> {
        self.field("chat")
            .and_then(Value::as_object)
            .and_then(|chat| chat.get("id"))
            .filter(|v| !v.is_null())
    }

    /// Plain text body (`msgContent.conversation`), if any.
    pub fn text(&self) -> Option<&str> {
        self.field("msgContent")
            .and_then(Value::as_object)
            .and_then(|content| content.get("conversation"))
            .and_then(Value::as_str)
            .filter(|text| !text.is_empty())
    }

    /// Raw value of a top-level field for diagnostics (`null` when missing).
    pub fn raw(&self, key: &str) -> Value {
        self.payload.get(key).cloned().unwrap_or(Value::Null)
    }

    /// Outbound copy of the payload with `source` set to `marker`.
    pub fn stamped(&self, marker: &str) -> Value {
        let mut outbound = self.payload.clone();
        outbound.insert("source".into(), Value::String(marker.into()));
        Value::Object(outbound)
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(fields) => !fields.is_empty(),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// ── Routing verdict ─────────────────────────────────────────────────

/// Why an event was or wasn't routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteReason {
    /// Event came back from the downstream automation.
    LoopProtection,
    /// `messageId` already seen inside the dedupe window.
    Duplicate,
    /// Not a manual message to the account's own chat.
    Blocked,
    /// No text body while text is required.
    NoText,
    /// Manual message to self, forwarded downstream.
    ManualSelfChat,
}

impl RouteReason {
    /// Short label for logging.
    pub fn label(&self) -> &'static str {
        match self {
            Self::LoopProtection => "loop_protection",
            Self::Duplicate => "duplicate",
            Self::Blocked => "blocked",
            Self::NoText => "no_text",
            Self::ManualSelfChat => "manual_self_chat",
        }
    }
}

/// Inputs echoed back when the eligibility rules block an event.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockDiagnostics {
    pub is_self_chat: bool,
    pub is_manual: bool,
    pub from_me: Value,
    pub from_api: Value,
    pub connected_phone: Value,
    pub chat_id: Value,
}

/// Outcome of the routing policy. Serializes as the webhook response body.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutingVerdict {
    pub ok: bool,
    pub routed: bool,
    pub reason: RouteReason,
    #[serde(flatten)]
    pub diagnostics: Option<BlockDiagnostics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<Value>,
}

impl RoutingVerdict {
    fn new(routed: bool, reason: RouteReason, message_id: Option<Value>) -> Self {
        Self {
            ok: true,
            routed,
            reason,
            diagnostics: None,
            message_id,
        }
    }

    pub fn loop_protected() -> Self {
        Self::new(false, RouteReason::LoopProtection, None)
    }

    pub fn duplicate(message_id: Value) -> Self {
        Self::new(false, RouteReason::Duplicate, Some(message_id))
    }

    pub fn blocked(diagnostics: BlockDiagnostics, message_id: Value) -> Self {
        Self {
            diagnostics: Some(diagnostics),
            ..Self::new(false, RouteReason::Blocked, Some(message_id))
        }
    }

    pub fn no_text(message_id: Value) -> Self {
        Self::new(false, RouteReason::NoText, Some(message_id))
    }

    pub fn routed(message_id: Value) -> Self {
        Self::new(true, RouteReason::ManualSelfChat, Some(message_id))
    }
}
