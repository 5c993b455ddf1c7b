//! Reusable HTTP request dispatcher for client applications.
//!
//! # Overview
//! A [`Client`] centralizes what every call to a backend repeats: picking the
//! base URL for the current deployment environment, attaching credentials,
//! notifying observers around the request lifecycle, and keeping the last
//! response at hand.
//!
//! # Design
//! - The network is a [`Transport`] the caller supplies. The core builds an
//!   [`HttpRequest`], hands it over and interprets the [`HttpResponse`];
//!   [`backends::UreqTransport`] is the stock blocking implementation.
//! - Configuration (profiles, token, default auth, hooks) lives on the
//!   client and changes only through its `configure_*` / `on` methods.
//! - Each call overwrites one shared [`ResponseEnvelope`]. Callers running
//!   requests concurrently should use [`Client::exchange`] and keep the
//!   returned envelope instead.
//! - HTTP error statuses are data. Only transport failures are `Err`.

pub mod auth;
pub mod backends;
pub mod client;
pub mod env;
pub mod envelope;
pub mod error;
pub mod hooks;
pub mod http;
pub mod profile;
pub mod request;
pub mod store;

pub use auth::AuthConfig;
pub use client::{Client, ClientBuilder, ClientSnapshot};
pub use env::Environment;
pub use envelope::{BodyKind, ResponseEnvelope};
pub use error::{ConfigError, DispatchError, HookError, TransportError};
pub use hooks::{HookEvent, HookPayload, HookRegistry};
pub use http::{Credentials, HttpMethod, HttpRequest, HttpResponse, Transport};
pub use profile::ProfileConfig;
pub use request::RequestOptions;
pub use store::{CredentialStore, MemoryStore};

#[cfg(feature = "ureq")]
pub use backends::UreqTransport;

/// Process-wide default client over [`UreqTransport`].
///
/// Created on first use with no base URL; configure it like any other
/// client. Applications that need more than one target should build their
/// own [`Client`] values instead.
#[cfg(feature = "ureq")]
pub fn shared() -> &'static Client<UreqTransport> {
    static SHARED: std::sync::OnceLock<Client<UreqTransport>> = std::sync::OnceLock::new();
    SHARED.get_or_init(|| Client::new(UreqTransport::new()))
}
