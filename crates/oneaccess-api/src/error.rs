use thiserror::Error;

/// Top-level error type for the `oneaccess-api` crate.
///
/// Covers every failure mode of a call to the issuing authority:
/// rejected credentials, non-success statuses, transport failures and
/// undecodable bodies. `oneaccess-core` maps these into its token and
/// auth taxonomies.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// The authority rejected the caller (HTTP 401 / 403).
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    // ── Authority ───────────────────────────────────────────────────
    /// Any other non-success status from the authority.
    #[error("Authority error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Request timed out.
    #[error("Request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// TLS setup or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed or a required field was empty,
    /// with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if the authority refused the presented identity.
    pub fn is_auth_rejected(&self) -> bool {
        matches!(self, Self::Authentication { .. })
    }

    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Timeout { .. } => true,
            Self::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Returns `true` if the failure was a timeout at any layer.
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout(),
            Self::Timeout { .. } => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_errors_are_transient() {
        let err = Error::Api {
            status: 503,
            message: "maintenance".into(),
        };
        assert!(err.is_transient());
        assert!(!err.is_auth_rejected());
    }

    #[test]
    fn client_errors_are_not_transient() {
        let err = Error::Api {
            status: 404,
            message: "Unknown gateId".into(),
        };
        assert!(!err.is_transient());
    }

    #[test]
    fn authentication_is_rejection() {
        let err = Error::Authentication {
            message: "Device revoked".into(),
        };
        assert!(err.is_auth_rejected());
        assert!(!err.is_timeout());
    }
}
