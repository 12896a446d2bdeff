//! Routing policy — decides whether an inbound event is forwarded.
//!
//! Rules run in a fixed order and the first match wins:
//! - `source == "n8n"` → loop protection
//! - failed dedupe check → duplicate
//! - not a manual message to the account's own chat → blocked
//! - no text body (only when text is required) → no_text
//!
//! Anything left is routed. Evaluation is pure; the dedupe outcome is
//! supplied by the caller.

use serde_json::Value;
use tracing::debug;

use crate::pipeline::types::{BlockDiagnostics, InboundEvent, RoutingVerdict};

/// `connectedPhone` is set and `chat.id` equals it exactly.
pub fn is_self_chat(event: &InboundEvent) -> bool {
    match event.connected_phone() {
        Some(phone) => event.chat_id() == Some(phone),
        None => false,
    }
}

/// Sent by the account holder (`fromMe: true`) and not through the API
/// (`fromApi: false`). Both must be real booleans.
pub fn is_manual(event: &InboundEvent) -> bool {
    event.from_me() == Some(true) && event.from_api() == Some(false)
}

/// Eligibility rules for forwarding.
#[derive(Debug, Clone, Default)]
pub struct RoutingPolicy {
    /// Only forward events that carry a text body.
    require_text: bool,
}

impl RoutingPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block events without `msgContent.conversation`.
    pub fn with_require_text(mut self, require_text: bool) -> Self {
        self.require_text = require_text;
        self
    }

    /// Evaluate an event given the result of the dedupe check.
    pub fn evaluate(&self, event: &InboundEvent, dedupe_ok: bool) -> RoutingVerdict {
        if event.is_loop() {
            debug!("Event carries loop marker");
            return RoutingVerdict::loop_protected();
        }

        let message_id = event.message_id_echo();

        if !dedupe_ok {
            debug!(message_id = %message_id, "Event already seen");
            return RoutingVerdict::duplicate(message_id);
        }

        let self_chat = is_self_chat(event);
        let manual = is_manual(event);

        if !(self_chat && manual) {
            let diagnostics = BlockDiagnostics {
                is_self_chat: self_chat,
                is_manual: manual,
                from_me: event.raw("fromMe"),
                from_api: event.raw("fromApi"),
                connected_phone: event.raw("connectedPhone"),
                chat_id: event.chat_id().cloned().unwrap_or(Value::Null),
            };
            return RoutingVerdict::blocked(diagnostics, message_id);
        }

        if self.require_text && event.text().is_none() {
            return RoutingVerdict::no_text(message_id);
        }

        RoutingVerdict::routed(message_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::pipeline::types::RouteReason;

    fn event(value: Value) -> InboundEvent {
        InboundEvent::from_value(value).unwrap()
    }

    /// Manual message to self: the one shape that gets routed.
    fn scenario_a() -> Value {
        json!({
            "fromMe": true,
            "fromApi": false,
            "connectedPhone": "5511999",
            "chat": {"id": "5511999"},
            "messageId": "m1"
        })
    }

    fn with(mut base: Value, key: &str, value: Value) -> Value {
        base[key] = value;
        base
    }

    #[test]
    fn routes_manual_self_chat() {
        let verdict = RoutingPolicy::new().evaluate(&event(scenario_a()), true);
        assert!(verdict.routed);
        assert_eq!(verdict.reason, RouteReason::ManualSelfChat);
        assert_eq!(verdict.message_id, Some(json!("m1")));
    }

    #[test]
    fn blocks_api_send() {
        let verdict =
            RoutingPolicy::new().evaluate(&event(with(scenario_a(), "fromApi", json!(true))), true);
        assert!(!verdict.routed);
        assert_eq!(verdict.reason, RouteReason::Blocked);

        let diagnostics = verdict.diagnostics.unwrap();
        assert!(diagnostics.is_self_chat);
        assert!(!diagnostics.is_manual);
        assert_eq!(diagnostics.from_api, json!(true));
    }

    #[test]
    fn blocks_other_chat() {
        let verdict = RoutingPolicy::new().evaluate(
            &event(with(scenario_a(), "chat", json!({"id": "5511888"}))),
            true,
        );
        assert!(!verdict.routed);
        assert_eq!(verdict.reason, RouteReason::Blocked);

        let diagnostics = verdict.diagnostics.unwrap();
        assert!(!diagnostics.is_self_chat);
        assert!(diagnostics.is_manual);
        assert_eq!(diagnostics.chat_id, json!("5511888"));
        assert_eq!(diagnostics.connected_phone, json!("5511999"));
    }

    #[test]
    fn loop_marker_wins_over_everything() {
        let looped = with(scenario_a(), "source", json!("n8n"));
        let policy = RoutingPolicy::new();

        for dedupe_ok in [true, false] {
            let verdict = policy.evaluate(&event(looped.clone()), dedupe_ok);
            assert!(!verdict.routed);
            assert_eq!(verdict.reason, RouteReason::LoopProtection);
            assert_eq!(verdict.message_id, None);
        }
    }

    #[test]
    fn router_marker_is_not_a_loop() {
        let verdict = RoutingPolicy::new()
            .evaluate(&event(with(scenario_a(), "source", json!("router"))), true);
        assert!(verdict.routed);
    }

    #[test]
    fn failed_dedupe_reports_duplicate() {
        let verdict = RoutingPolicy::new().evaluate(&event(scenario_a()), false);
        assert!(!verdict.routed);
        assert_eq!(verdict.reason, RouteReason::Duplicate);
        assert_eq!(verdict.message_id, Some(json!("m1")));
        assert!(verdict.diagnostics.is_none());
    }

    #[test]
    fn string_from_me_is_not_manual() {
        let e = event(with(scenario_a(), "fromMe", json!("true")));
        assert!(!is_manual(&e));
        assert!(!RoutingPolicy::new().evaluate(&e, true).routed);
    }

    #[test]
    fn missing_from_api_is_not_manual() {
        let mut payload = scenario_a();
        payload.as_object_mut().unwrap().remove("fromApi");
        let e = event(payload);

        assert!(!is_manual(&e));
        let verdict = RoutingPolicy::new().evaluate(&e, true);
        assert_eq!(verdict.reason, RouteReason::Blocked);
        assert_eq!(verdict.diagnostics.unwrap().from_api, Value::Null);
    }

    #[test]
    fn missing_connected_phone_is_never_self_chat() {
        let e = event(json!({"fromMe": true, "fromApi": false, "chat": {}}));
        assert!(!is_self_chat(&e));

        let null_both = event(json!({"connectedPhone": null, "chat": {"id": null}}));
        assert!(!is_self_chat(&null_both));
    }

    #[test]
    fn number_and_string_ids_do_not_match() {
        let e = event(json!({"connectedPhone": "5511999", "chat": {"id": 5511999}}));
        assert!(!is_self_chat(&e));
    }

    #[test]
    fn require_text_blocks_empty_messages() {
        let policy = RoutingPolicy::new().with_require_text(true);

        let verdict = policy.evaluate(&event(scenario_a()), true);
        assert!(!verdict.routed);
        assert_eq!(verdict.reason, RouteReason::NoText);

        let with_text = with(scenario_a(), "msgContent", json!({"conversation": "oi"}));
        assert!(policy.evaluate(&event(with_text), true).routed);
    }

    #[test]
    fn evaluation_is_repeatable() {
        let policy = RoutingPolicy::new();
        let e = event(with(scenario_a(), "fromApi", json!(true)));
        assert_eq!(policy.evaluate(&e, true), policy.evaluate(&e, true));
    }
}
