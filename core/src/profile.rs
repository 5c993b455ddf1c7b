//! Profile map resolution: environment tag to base URL.
//!
//! # Design
//! Resolution is a configuration-time step. A profile map that cannot
//! produce a non-empty URL for the chosen environment is rejected with a
//! `ConfigError` instead of leaving the client pointed at a stale or empty
//! base.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::env::Environment;
use crate::error::ConfigError;

/// Input to `Client::configure_profiles`.
///
/// Derives serde so applications can load it from whatever config file
/// they already keep, e.g. `{"profiles": {"dev": "...", "prod": "..."}}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileConfig {
    /// Explicit environment tag. Skips host inference when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<String>,

    /// Host hint for inference, overriding the client's own hint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    pub profiles: BTreeMap<String, String>,

    /// Token forwarded to credential storage after a successful resolve.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl ProfileConfig {
    pub fn new<K, V>(profiles: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            profiles: profiles
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            ..Self::default()
        }
    }

    pub fn env(mut self, env: impl Into<String>) -> Self {
        self.env = Some(env.into());
        self
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Pick the environment tag: explicit override first, then inference
    /// from `config.host`, then from `fallback_host`.
    pub fn environment_tag(&self, fallback_host: &str) -> String {
        match &self.env {
            Some(env) => env.clone(),
            None => {
                let host = self.host.as_deref().unwrap_or(fallback_host);
                Environment::infer(host).tag().to_string()
            }
        }
    }

    /// Resolve to `(environment tag, base URL)`.
    pub fn resolve(&self, fallback_host: &str) -> Result<(String, String), ConfigError> {
        let env = self.environment_tag(fallback_host);
        match self.profiles.get(&env) {
            None => Err(ConfigError::UnknownEnvironment { env }),
            Some(url) if url.is_empty() => Err(ConfigError::EmptyBaseUrl { env }),
            Some(url) => Ok((env, url.clone())),
        }
    }
}
