//! Echobot core library: chat event types, the event handler, config,
//! and the webhook server used by the CLI.

pub mod config;
pub mod event;
pub mod handler;
pub mod webhook;

pub use event::{ChatEvent, ChatMessage, EventType, Reply};
pub use handler::{EventHandler, HandlerError, HandlerResponse};
