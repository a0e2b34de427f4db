//! Chat event handler: parse body, classify event, build the synchronous reply.
//!
//! The only failure the caller ever sees is a malformed body (400 "Bad Request").
//! Everything else that goes wrong is logged and acknowledged with an empty 200
//! so the chat platform does not surface an error to the user or retry.

use crate::config::Config;
use crate::event::{json_kind, ChatEvent, EventContext, EventError, Reply};
use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde_json::Value;

pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";
pub const BAD_REQUEST_BODY: &str = "Bad Request";

/// Why a body was rejected with 400.
#[derive(Debug, thiserror::Error)]
pub enum BadRequestReason {
    #[error("empty body")]
    Empty,
    #[error("body is not valid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),
    #[error("body is an empty JSON {0}")]
    EmptyValue(&'static str),
}

#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error("bad request: {0}")]
    BadRequest(#[from] BadRequestReason),
    #[error(transparent)]
    Event(#[from] EventError),
    #[error("serializing reply: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// Status, body, and content type to send back. Headers are empty unless the body is JSON.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerResponse {
    pub status: StatusCode,
    pub body: String,
    pub content_type: Option<&'static str>,
}

impl HandlerResponse {
    pub fn json(body: String) -> Self {
        Self {
            status: StatusCode::OK,
            body,
            content_type: Some(JSON_CONTENT_TYPE),
        }
    }

    /// Silent acknowledgment: 200 with no body.
    pub fn empty() -> Self {
        Self {
            status: StatusCode::OK,
            body: String::new(),
            content_type: None,
        }
    }

    pub fn bad_request() -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            body: BAD_REQUEST_BODY.to_string(),
            content_type: None,
        }
    }

    pub fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(ct) = self.content_type {
            headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(ct));
        }
        headers
    }
}

impl IntoResponse for HandlerResponse {
    fn into_response(self) -> Response {
        let headers = self.headers();
        let mut res = Response::new(Body::from(self.body));
        *res.status_mut() = self.status;
        res.headers_mut().extend(headers);
        res
    }
}

/// Parse a request body. Empty bodies, invalid JSON, and empty JSON values
/// (`null`, `false`, `0`, `""`, `[]`, `{}`) are all bad requests.
pub fn parse_body(body: &[u8]) -> Result<Value, BadRequestReason> {
    if body.is_empty() {
        return Err(BadRequestReason::Empty);
    }
    let value: Value = serde_json::from_slice(body).map_err(BadRequestReason::InvalidJson)?;
    if is_empty_value(&value) {
        return Err(BadRequestReason::EmptyValue(json_kind(&value)));
    }
    Ok(value)
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}

/// Trim surrounding whitespace from message text. Besides Unicode White_Space this
/// also strips the ASCII information separators U+001C..U+001F.
pub fn trim_message_text(text: &str) -> &str {
    text.trim_matches(|c: char| c.is_whitespace() || ('\x1c'..='\x1f').contains(&c))
}

/// Stateless event handler; cheap to clone and safe to share across requests.
#[derive(Debug, Clone)]
pub struct EventHandler {
    greeting: String,
    log_target: String,
}

impl Default for EventHandler {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl EventHandler {
    pub fn new(greeting: impl Into<String>, log_target: impl Into<String>) -> Self {
        Self {
            greeting: greeting.into(),
            log_target: log_target.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.bot.greeting.clone(), config.logging.target.clone())
    }

    pub fn greeting(&self) -> &str {
        &self.greeting
    }

    /// Handle one request body. Never fails: errors become 400 (bad body) or an empty 200.
    pub fn handle(&self, body: &[u8]) -> HandlerResponse {
        let target = self.log_target.as_str();
        match self.process(body) {
            Ok(Some(json)) => HandlerResponse::json(json),
            Ok(None) => HandlerResponse::empty(),
            Err(HandlerError::BadRequest(reason)) => {
                log::warn!(target: target, "received empty or non-JSON payload: {}", reason);
                HandlerResponse::bad_request()
            }
            Err(e) => {
                log::error!(target: target, "error handling request: {}; detail: {:?}", e, e);
                HandlerResponse::empty()
            }
        }
    }

    /// Parse and classify the body, returning the serialized reply (None when there is nothing to send).
    pub fn process(&self, body: &[u8]) -> Result<Option<String>, HandlerError> {
        let target = self.log_target.as_str();
        let value = parse_body(body)?;
        log::info!(target: target, "received event: {}", value);

        let context = EventContext::from_value(&value);
        let event = ChatEvent::from_value(value)?;
        if !context.is_empty() {
            log::debug!(
                target: target,
                "event {} space={:?} ({:?}) user={:?}",
                event.event_type(),
                context.space_name,
                context.space_type,
                context.user_display_name
            );
        }

        let Some(reply) = self.reply_for(&event) else {
            log::info!(target: target, "ignored event type: {}", event.event_type());
            return Ok(None);
        };
        serde_json::to_string(&reply)
            .map(Some)
            .map_err(HandlerError::Serialize)
    }

    /// Reply for a classified event: greeting, trimmed echo, or nothing.
    pub fn reply_for(&self, event: &ChatEvent) -> Option<Reply> {
        match event {
            ChatEvent::AddedToSpace => Some(Reply::text(self.greeting.as_str())),
            ChatEvent::Message(message) => Some(Reply::text(trim_message_text(&message.text))),
            ChatEvent::Other(_) => None,
        }
    }
}
