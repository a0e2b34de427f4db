//! Webhook: HTTP endpoint the chat platform POSTs events to.
//!
//! Single port serves the event route (configurable path) and a health probe.

mod server;

pub use server::{router, run_server, WebhookState};
