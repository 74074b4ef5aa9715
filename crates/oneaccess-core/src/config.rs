// ── Runtime client configuration ──
//
// The explicit context object handed to the credential client, the
// card-emulation session, and the refresh scheduler. Built once by the
// host (usually via `oneaccess-config`); core never reads files or env.

use std::path::PathBuf;
use std::time::Duration;

use oneaccess_api::{TlsMode, TransportConfig};
use url::Url;

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// Bundled web PKI roots (strict).
    #[default]
    SystemDefaults,
    /// Additional CA certificate file.
    CustomCa(PathBuf),
    /// Skip verification. Development backends only.
    DangerAcceptInvalid,
}

impl From<&TlsVerification> for TlsMode {
    fn from(tls: &TlsVerification) -> Self {
        match tls {
            TlsVerification::SystemDefaults => Self::System,
            TlsVerification::CustomCa(path) => Self::CustomCa(path.clone()),
            TlsVerification::DangerAcceptInvalid => Self::DangerAcceptInvalid,
        }
    }
}

/// Cadence of the visual-channel refresh loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshTiming {
    /// Pause after a credential was issued.
    pub success_interval: Duration,
    /// Pause after a failed attempt.
    pub failure_backoff: Duration,
    /// Ceiling for a single issuance call.
    pub issue_deadline: Duration,
}

impl Default for RefreshTiming {
    fn default() -> Self {
        Self {
            success_interval: Duration::from_secs(25),
            failure_backoff: Duration::from_secs(5),
            issue_deadline: Duration::from_secs(10),
        }
    }
}

/// Card-emulation tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Hard ceiling for the issuance call behind a GET_TOKEN command.
    /// Must fit inside the reader's response window.
    pub deadline: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            deadline: Duration::from_secs(3),
        }
    }
}

/// Everything needed to talk to one issuing authority.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Authority root, e.g. `https://access.example.com`.
    pub base_url: Url,
    pub tls: TlsVerification,
    /// Transport-level request timeout. Per-call deadlines are shorter.
    pub timeout: Duration,
    pub refresh: RefreshTiming,
    pub session: SessionConfig,
}

impl ClientConfig {
    /// Config with default timing for the given authority.
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(30),
            refresh: RefreshTiming::default(),
            session: SessionConfig::default(),
        }
    }

    /// Identity of the backend, used to key scheduler runs.
    pub fn backend_identity(&self) -> String {
        self.base_url.as_str().trim_end_matches('/').to_owned()
    }

    pub(crate) fn transport(&self) -> TransportConfig {
        TransportConfig {
            tls: TlsMode::from(&self.tls),
            timeout: self.timeout,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_refresh_cadence() {
        let timing = RefreshTiming::default();
        assert_eq!(timing.success_interval, Duration::from_secs(25));
        assert_eq!(timing.failure_backoff, Duration::from_secs(5));
    }

    #[test]
    fn backend_identity_ignores_trailing_slash() {
        let a = ClientConfig::new(Url::parse("https://access.example.com/").unwrap());
        let b = ClientConfig::new(Url::parse("https://access.example.com").unwrap());
        assert_eq!(a.backend_identity(), b.backend_identity());
    }
}
