//! Relay controller — runs one webhook through dedupe, policy and forwarding.
//!
//! Flow:
//! 1. Parse the body into an `InboundEvent`
//! 2. Dedupe check on `messageId` (skipped for loop-marked events)
//! 3. Routing policy → verdict
//! 4. Routed events are stamped `source: "router"` and forwarded once

use std::sync::Arc;

use tracing::{info, warn};

use crate::config::RelayConfig;
use crate::error::{Error, ForwardError, RelayError};
use crate::pipeline::dedupe::{DedupeStore, InMemoryDedupe};
use crate::pipeline::forward::{Forwarder, HttpForwarder};
use crate::pipeline::rules::RoutingPolicy;
use crate::pipeline::types::{InboundEvent, ROUTER_MARKER, RoutingVerdict};

/// Per-request orchestration of store, policy and forwarder.
pub struct RelayController {
    store: Arc<dyn DedupeStore>,
    policy: RoutingPolicy,
    forwarder: Arc<dyn Forwarder>,
    log_payloads: bool,
}

impl RelayController {
    pub fn new(
        store: Arc<dyn DedupeStore>,
        policy: RoutingPolicy,
        forwarder: Arc<dyn Forwarder>,
    ) -> Self {
        Self {
            store,
            policy,
            forwarder,
            log_payloads: true,
        }
    }

    /// Wire up the in-memory store and HTTP forwarder from config.
    pub fn from_config(config: &RelayConfig) -> Result<Self, Error> {
        let store = Arc::new(InMemoryDedupe::new(config.dedupe_ttl));
        let forwarder = Arc::new(HttpForwarder::new(
            config.forwarding_url.clone(),
            config.forward_timeout,
        )?);
        let policy = RoutingPolicy::new().with_require_text(config.require_text);

        Ok(Self::new(store, policy, forwarder).with_payload_logging(config.log_enabled))
    }

    pub fn with_payload_logging(mut self, enabled: bool) -> Self {
        self.log_payloads = enabled;
        self
    }

    /// Handle a raw webhook body.
    ///
    /// Blocked, duplicate and loop-protected events are `Ok` verdicts;
    /// only unparseable bodies and failed forwards are errors.
    pub async fn handle(&self, raw: &[u8]) -> Result<RoutingVerdict, RelayError> {
        let event = InboundEvent::parse(raw)?;
        self.log_payload(&event);

        let dedupe_ok =
            event.is_loop() || self.store.check_and_record(event.dedupe_key().as_deref());
        let verdict = self.policy.evaluate(&event, dedupe_ok);

        if !verdict.routed {
            info!(
                message_id = %event.message_id_echo(),
                reason = verdict.reason.label(),
                "Event not routed"
            );
            return Ok(verdict);
        }

        let outbound = event.stamped(ROUTER_MARKER);
        let forwarder = Arc::clone(&self.forwarder);

        // Spawned so the forward completes even if the caller goes away.
        tokio::spawn(async move { forwarder.forward(&outbound).await })
            .await
            .map_err(|e| ForwardError::Unreachable(format!("forward task aborted: {e}")))??;

        info!(
            message_id = %event.message_id_echo(),
            reason = verdict.reason.label(),
            "Event forwarded"
        );
        Ok(verdict)
    }

    fn log_payload(&self, event: &InboundEvent) {
        if !self.log_payloads {
            return;
        }
        match serde_json::to_string_pretty(event.payload()) {
            Ok(pretty) => info!("Webhook received\n{pretty}"),
            Err(e) => warn!(error = %e, "Could not render webhook payload"),
        }
    }
}
