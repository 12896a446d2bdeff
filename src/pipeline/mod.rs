//! Webhook relay pipeline.
//!
//! Every inbound event flows through:
//! 1. `DedupeStore::check_and_record()` — drop repeats inside the window
//! 2. `RoutingPolicy::evaluate()` — loop protection + self-chat rules
//! 3. `Forwarder::forward()` — single POST to the n8n webhook
//!
//! `RelayController` ties the three together per request.

pub mod dedupe;
pub mod forward;
pub mod processor;
pub mod rules;
pub mod types;

pub use dedupe::{Clock, DedupeStore, InMemoryDedupe, SystemClock};
pub use forward::{Forwarder, HttpForwarder};
pub use processor::RelayController;
pub use rules::RoutingPolicy;
pub use types::{InboundEvent, RouteReason, RoutingVerdict};
