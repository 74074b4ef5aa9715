// ── Core error types ──
//
// Domain errors for credential issuance and sign-in. Callers never see
// HTTP status codes or JSON parse failures directly; the `From` impls
// translate transport-layer errors into these taxonomies.

use thiserror::Error;

/// Why a credential could not be obtained.
///
/// Cheap to clone so the refresh scheduler can publish it to observers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    /// The authority rejected the session, or no session is available.
    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    /// Non-success status other than a rejection, or the authority was unreachable.
    #[error("Issuing authority unavailable: {message}")]
    BackendUnavailable { message: String },

    /// Success status, but the body lacked a token or expiry.
    #[error("Malformed credential response: {message}")]
    MalformedResponse { message: String },

    /// The call did not complete within its deadline.
    #[error("Credential request timed out: {message}")]
    Timeout { message: String },
}

impl TokenError {
    pub(crate) fn deadline_exceeded(deadline: std::time::Duration) -> Self {
        Self::Timeout {
            message: format!("no response within {}ms", deadline.as_millis()),
        }
    }

    pub(crate) fn no_session() -> Self {
        Self::Unauthorized {
            message: "no access session in local store".into(),
        }
    }

    pub(crate) fn no_device_id() -> Self {
        Self::Unauthorized {
            message: "device identifier unavailable".into(),
        }
    }
}

/// Why an interactive sign-in failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// The authority refused the identity, or the input was unusable.
    #[error("Sign-in rejected: {message}")]
    Rejected { message: String },

    #[error("Issuing authority unavailable: {message}")]
    BackendUnavailable { message: String },

    #[error("Malformed sign-in response: {message}")]
    MalformedResponse { message: String },
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<oneaccess_api::Error> for TokenError {
    fn from(err: oneaccess_api::Error) -> Self {
        use oneaccess_api::Error as Api;

        match err {
            Api::Authentication { message } => Self::Unauthorized { message },
            Api::Deserialization { message, body: _ } => Self::MalformedResponse { message },
            Api::Timeout { timeout_ms } => Self::Timeout {
                message: format!("transport timeout after {timeout_ms}ms"),
            },
            Api::Transport(ref e) if e.is_timeout() => Self::Timeout {
                message: e.to_string(),
            },
            other @ (Api::Api { .. } | Api::Transport(_) | Api::InvalidUrl(_) | Api::Tls(_)) => {
                Self::BackendUnavailable {
                    message: other.to_string(),
                }
            }
        }
    }
}

impl From<oneaccess_api::Error> for AuthError {
    fn from(err: oneaccess_api::Error) -> Self {
        use oneaccess_api::Error as Api;

        match err {
            Api::Authentication { message } => Self::Rejected { message },
            Api::Deserialization { message, body: _ } => Self::MalformedResponse { message },
            other => Self::BackendUnavailable {
                message: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authentication_maps_to_unauthorized() {
        let err = TokenError::from(oneaccess_api::Error::Authentication {
            message: "Device revoked".into(),
        });
        assert_eq!(
            err,
            TokenError::Unauthorized {
                message: "Device revoked".into()
            }
        );
    }

    #[test]
    fn other_statuses_map_to_backend_unavailable() {
        let err = TokenError::from(oneaccess_api::Error::Api {
            status: 404,
            message: "Unknown gateId".into(),
        });
        assert!(matches!(err, TokenError::BackendUnavailable { ref message } if message.contains("404")));
    }

    #[test]
    fn decode_failures_map_to_malformed() {
        let err = TokenError::from(oneaccess_api::Error::Deserialization {
            message: "missing field `expEpochSeconds`".into(),
            body: "{}".into(),
        });
        assert!(matches!(err, TokenError::MalformedResponse { .. }));
    }

    #[test]
    fn transport_timeout_maps_to_timeout() {
        let err = TokenError::from(oneaccess_api::Error::Timeout { timeout_ms: 3000 });
        assert!(matches!(err, TokenError::Timeout { .. }));
    }

    #[test]
    fn login_forbidden_maps_to_rejected() {
        let err = AuthError::from(oneaccess_api::Error::Authentication {
            message: "Not allowed".into(),
        });
        assert!(matches!(err, AuthError::Rejected { .. }));
    }
}
