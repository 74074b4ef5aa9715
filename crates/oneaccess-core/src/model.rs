// ── Domain model ──
//
// Credentials, sessions, and request parameters shared by the
// card-emulation and visual channels.

use std::fmt;

use chrono::{DateTime, Utc};
use secrecy::SecretString;

/// Durable login credential, obtained at sign-in.
///
/// Owned by the local credential store; core only reads it.
#[derive(Debug, Clone)]
pub struct AccessSession {
    bearer_token: SecretString,
}

impl AccessSession {
    pub fn new(bearer_token: SecretString) -> Self {
        Self { bearer_token }
    }

    pub fn bearer_token(&self) -> &SecretString {
        &self.bearer_token
    }
}

impl From<SecretString> for AccessSession {
    fn from(bearer_token: SecretString) -> Self {
        Self::new(bearer_token)
    }
}

/// A short-lived, gate-scoped credential issued by the authority.
///
/// The token is opaque: it is presented verbatim and never parsed.
/// A newer issuance supersedes it; it is never mutated.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    token: String,
    expires_at_epoch_seconds: i64,
}

impl Credential {
    pub fn new(token: impl Into<String>, expires_at_epoch_seconds: i64) -> Self {
        Self {
            token: token.into(),
            expires_at_epoch_seconds,
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn expires_at_epoch_seconds(&self) -> i64 {
        self.expires_at_epoch_seconds
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.expires_at_epoch_seconds, 0)
    }

    /// Whole seconds left before expiry, clamped at zero.
    pub fn seconds_remaining(&self, now: DateTime<Utc>) -> i64 {
        (self.expires_at_epoch_seconds - now.timestamp()).max(0)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() >= self.expires_at_epoch_seconds
    }

    /// The string the visual channel renders as a scannable code.
    pub fn display_payload(&self) -> &str {
        &self.token
    }
}

// Tokens are bearer material: keep them out of logs.
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("token", &format_args!("<{} bytes>", self.token.len()))
            .field("expires_at_epoch_seconds", &self.expires_at_epoch_seconds)
            .finish()
    }
}

/// Credential issued against a visitor pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisitorCredential {
    pub credential: Credential,
    pub visitor_name: String,
    pub remaining_uses: i64,
}

/// Parameters of a single issuance call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueRequest {
    pub gate_id: String,
    pub reader_nonce: String,
    pub device_id: String,
}

/// Single-use freshness tag for a visual-channel issuance.
///
/// 16 uppercase hex characters (64 bits) cut from a random v4 UUID. Not a
/// secret; the authority binds it into the credential to resist replay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReaderNonce(String);

impl ReaderNonce {
    pub const LEN: usize = 16;

    pub fn generate() -> Self {
        let mut hex = uuid::Uuid::new_v4().simple().to_string();
        hex.truncate(Self::LEN);
        hex.make_ascii_uppercase();
        Self(hex)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for ReaderNonce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn nonce_is_sixteen_uppercase_hex() {
        let nonce = ReaderNonce::generate();
        assert_eq!(nonce.as_str().len(), ReaderNonce::LEN);
        assert!(
            nonce
                .as_str()
                .chars()
                .all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c))
        );
    }

    #[test]
    fn nonces_differ_between_cycles() {
        assert_ne!(ReaderNonce::generate(), ReaderNonce::generate());
    }

    #[test]
    fn seconds_remaining_clamps_at_zero() {
        let cred = Credential::new("tok", 1_000);
        let before = DateTime::from_timestamp(990, 0).unwrap();
        let after = DateTime::from_timestamp(1_010, 0).unwrap();
        assert_eq!(cred.seconds_remaining(before), 10);
        assert_eq!(cred.seconds_remaining(after), 0);
        assert!(!cred.is_expired(before));
        assert!(cred.is_expired(after));
    }

    #[test]
    fn debug_redacts_token() {
        let cred = Credential::new("super-secret-jwt", 1_000);
        let rendered = format!("{cred:?}");
        assert!(!rendered.contains("super-secret-jwt"));
        assert!(rendered.contains("16 bytes"));
    }
}
