//! Per-call request options.

use serde_json::Value;

use crate::auth::AuthConfig;
use crate::http::{Credentials, HttpMethod};

/// Everything a single `Client::send` call needs to know.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestOptions {
    pub method: HttpMethod,
    /// Relative path appended to the base URL, or an absolute URL.
    pub path: String,
    pub body: Option<Value>,
    /// Caller headers. These win over defaults on a name clash.
    pub headers: Vec<(String, String)>,
    /// Skip the implicit `Authorization: Bearer <token>` header.
    pub skip_token: bool,
    pub credentials: Option<Credentials>,
    /// Replaces the client's default auth for this call only.
    pub auth: Option<AuthConfig>,
}

impl RequestOptions {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn skip_token(mut self) -> Self {
        self.skip_token = true;
        self
    }

    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn auth(mut self, auth: AuthConfig) -> Self {
        self.auth = Some(auth);
        self
    }
}
