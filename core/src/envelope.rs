//! The last-response result envelope.

use serde_json::Value;

use crate::http::HttpResponse;

/// What the response body turned out to be.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BodyKind {
    /// No bytes, or only ASCII whitespace.
    #[default]
    Empty,
    Json,
    /// Non-empty but not valid JSON, including bytes that are not UTF-8.
    NotJson,
}

/// Status, parsed body and raw response of a completed call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResponseEnvelope {
    /// Parsed body. `None` unless `body` is `BodyKind::Json`.
    pub data: Option<Value>,
    pub status: u16,
    pub raw: Option<HttpResponse>,
    pub body: BodyKind,
}

impl ResponseEnvelope {
    /// Build an envelope from a transport response. Parse failures are
    /// recorded, not returned.
    pub fn from_response(response: HttpResponse) -> Self {
        let (data, body) = if response.body.iter().all(u8::is_ascii_whitespace) {
            (None, BodyKind::Empty)
        } else {
            match serde_json::from_slice::<Value>(&response.body) {
                Ok(value) => (Some(value), BodyKind::Json),
                Err(_) => (None, BodyKind::NotJson),
            }
        };
        Self {
            data,
            status: response.status,
            raw: Some(response),
            body,
        }
    }

    pub fn ok(&self) -> bool {
        is_success(self.status)
    }

    /// `ok()` and the body parsed.
    pub fn check(&self) -> bool {
        self.ok() && self.data.is_some()
    }
}

pub fn is_success(status: u16) -> bool {
    (200..300).contains(&status)
}
