//! Error types for the request dispatcher.
//!
//! # Design
//! Configuration failures surface at configuration time through
//! `ConfigError` and never from `send`. A request only fails when the
//! transport cannot complete the exchange or a typed body cannot be
//! serialized. HTTP 4xx/5xx are data, not errors: they land in the response
//! envelope and the `Error` hook.

use thiserror::Error;

/// Boxed error returned by a failing hook callback.
pub type HookError = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised while configuring a `Client`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// The resolved environment tag has no entry in the profile map.
    #[error("no base URL configured for environment `{env}`")]
    UnknownEnvironment { env: String },

    /// The profile entry exists but holds an empty URL.
    #[error("base URL for environment `{env}` is empty")]
    EmptyBaseUrl { env: String },
}

/// The network primitive failed to produce a response.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("request timed out")]
    Timeout,

    #[error("transport error: {0}")]
    Other(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Errors returned by `Client::send` and the verb shortcuts.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),
}
