//! Credential presentation core for the OneAccess mobile client.
//!
//! Two channels present short-lived, server-issued credentials to gate
//! readers, and this crate owns the parts of both that carry protocol or
//! timing guarantees:
//!
//! - **[`apdu`]** — Frame codec for the reader protocol. Parses raw command
//!   bytes into a [`Command`] and encodes a [`ResponseFrame`]. Never fails:
//!   anything it cannot classify is [`Command::Unknown`].
//!
//! - **[`CardSession`]** — Per-activation state machine for the
//!   card-emulation channel. Every command gets exactly one response frame,
//!   and every internal failure collapses to the fail-closed status word.
//!
//! - **[`CredentialClient`]** — Single-attempt, deadline-bounded calls to the
//!   issuing authority, mapped onto [`TokenError`] / [`AuthError`]. Implements
//!   the [`TokenIssuer`] port consumed by the session and the scheduler.
//!
//! - **[`RefreshScheduler`]** — Cancellable background loop that keeps a
//!   fresh credential published for the visual channel, backing off on
//!   failure. Observable through a `watch` cell and a `broadcast` event feed.
//!
//! - **[`CredentialStore`]** — Port to the durable login session and device
//!   identifier, read copy-on-read by both paths.

pub mod apdu;
pub mod config;
pub mod credential;
pub mod error;
pub mod model;
pub mod scheduler;
pub mod session;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;

// ── Primary re-exports ──────────────────────────────────────────────
pub use apdu::{Command, ResponseFrame, encode_response, parse_command};
pub use config::{ClientConfig, RefreshTiming, SessionConfig, TlsVerification};
pub use credential::{CredentialClient, TokenIssuer};
pub use error::{AuthError, TokenError};
pub use model::{AccessSession, Credential, IssueRequest, ReaderNonce, VisitorCredential};
pub use scheduler::{RefreshEvent, RefreshKey, RefreshScheduler, RefreshState};
pub use session::{CardSession, SessionState};
pub use store::{CredentialStore, MemoryCredentialStore};
