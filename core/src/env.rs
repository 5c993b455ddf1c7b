//! Deployment environment inference from a host identifier.

use std::fmt;

/// Host that marks a local development run. Matched exactly.
pub const LOCAL_MARKER: &str = "localhost";

/// Any host containing this fragment is treated as QA.
pub const QA_MARKER: &str = "qa";

/// Environment variable consulted for the host hint when none is configured.
pub const HOST_ENV_VAR: &str = "DISPATCH_HOST";

/// Logical deployment target used to pick a base URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Environment {
    Dev,
    Qa,
    Prod,
}

impl Environment {
    /// Classify a hostname. Checks run in order: exact local marker, QA
    /// substring, then the production fallback.
    pub fn infer(host: &str) -> Self {
        if host == LOCAL_MARKER {
            Environment::Dev
        } else if host.contains(QA_MARKER) {
            Environment::Qa
        } else {
            Environment::Prod
        }
    }

    /// Profile-map key for this environment.
    pub fn tag(self) -> &'static str {
        match self {
            Environment::Dev => "dev",
            Environment::Qa => "qa",
            Environment::Prod => "prod",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}
