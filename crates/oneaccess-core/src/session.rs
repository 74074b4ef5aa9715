// ── Card-emulation session ──
//
// Per-activation state machine behind the reader transport. The reader
// drives it one command at a time; each command yields exactly one
// response frame, and every internal failure is absorbed into the
// fail-closed status word.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::apdu::{self, Command, ResponseFrame};
use crate::config::SessionConfig;
use crate::credential::TokenIssuer;
use crate::error::TokenError;
use crate::model::IssueRequest;
use crate::store::CredentialStore;

/// Where the current activation stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No SELECT seen since the last deactivation.
    Idle,
    /// Application selected; waiting for GET_TOKEN.
    Ready,
    /// A credential was returned in this activation.
    Completed,
    /// The last GET_TOKEN failed closed.
    Failed,
}

/// State machine for one card-emulation channel.
///
/// The transport serializes activations, so the session is driven through
/// `&mut self` and needs no internal locking.
pub struct CardSession {
    issuer: Arc<dyn TokenIssuer>,
    store: Arc<dyn CredentialStore>,
    config: SessionConfig,
    state: SessionState,
}

impl CardSession {
    pub fn new(
        issuer: Arc<dyn TokenIssuer>,
        store: Arc<dyn CredentialStore>,
        config: SessionConfig,
    ) -> Self {
        Self {
            issuer,
            store,
            config,
            state: SessionState::Idle,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Handle raw command bytes and return the wire response.
    pub async fn process_command(&mut self, raw: &[u8]) -> Vec<u8> {
        self.handle(apdu::parse_command(raw)).await.encode()
    }

    /// Handle a classified command.
    pub async fn handle(&mut self, command: Command) -> ResponseFrame {
        match command {
            Command::Select => {
                debug!(from = ?self.state, "SELECT");
                self.state = SessionState::Ready;
                ResponseFrame::ok(Vec::new())
            }
            Command::GetToken {
                gate_id,
                reader_nonce,
            } => match self.get_token(gate_id, reader_nonce).await {
                Ok(token) => {
                    self.state = SessionState::Completed;
                    ResponseFrame::ok(token.into_bytes())
                }
                Err(e) => {
                    warn!(error = %e, "GET_TOKEN failed closed");
                    self.state = SessionState::Failed;
                    ResponseFrame::fail_closed()
                }
            },
            Command::Unknown => {
                debug!(state = ?self.state, "unrecognized command");
                ResponseFrame::fail_closed()
            }
        }
    }

    /// Field lost or tap removed.
    pub fn on_deactivated(&mut self) {
        debug!(from = ?self.state, "deactivated");
        self.state = SessionState::Idle;
    }

    /// Everything behind GET_TOKEN, store reads included, runs under the
    /// reader deadline.
    async fn get_token(&self, gate_id: String, reader_nonce: String) -> Result<String, TokenError> {
        let deadline = self.config.deadline;
        tokio::time::timeout(deadline, self.fetch_token(gate_id, reader_nonce))
            .await
            .map_err(|_| TokenError::deadline_exceeded(deadline))?
    }

    async fn fetch_token(&self, gate_id: String, reader_nonce: String) -> Result<String, TokenError> {
        let session = self.store.access_session().ok_or_else(TokenError::no_session)?;
        let device_id = self.store.device_id().ok_or_else(TokenError::no_device_id)?;

        let request = IssueRequest {
            gate_id,
            reader_nonce,
            device_id,
        };
        let gate = request.gate_id.clone();

        let credential = self
            .issuer
            .issue(&session, request, self.config.deadline)
            .await?;

        if !credential.token().is_ascii() {
            return Err(TokenError::MalformedResponse {
                message: "token is not ASCII".into(),
            });
        }

        info!(gate_id = %gate, "credential presented to reader");
        Ok(credential.token().to_owned())
    }
}
