// ── Credential client ──
//
// Exchanges the durable login session for gate-scoped credentials.
// Every call is a single attempt under a caller-supplied deadline: the
// card-emulation path and the refresh loop each own their retry policy.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use oneaccess_api::{
    AuthorityClient, DelegationRequest, TokenRequest, VisitorPassRequest, VisitorTokenRequest,
};
use tracing::{debug, warn};
use url::Url;

use crate::config::ClientConfig;
use crate::error::{AuthError, TokenError};
use crate::model::{AccessSession, Credential, IssueRequest, VisitorCredential};

/// Port for credential issuance.
///
/// Implemented by [`CredentialClient`]; the session and the scheduler
/// depend only on this trait.
#[async_trait]
pub trait TokenIssuer: Send + Sync {
    /// Obtain one credential. Single attempt; must give up by `deadline`.
    async fn issue(
        &self,
        session: &AccessSession,
        request: IssueRequest,
        deadline: Duration,
    ) -> Result<Credential, TokenError>;
}

/// Stateless client for the issuing authority.
///
/// Cheap to clone and safe to share between the card-emulation path and
/// the refresh loop.
#[derive(Debug, Clone)]
pub struct CredentialClient {
    api: AuthorityClient,
}

impl CredentialClient {
    /// Build a client from the runtime configuration.
    pub fn new(config: &ClientConfig) -> Result<Self, oneaccess_api::Error> {
        let api = AuthorityClient::new(config.base_url.clone(), &config.transport())?;
        Ok(Self::from_api(api))
    }

    /// Wrap an existing API client.
    pub fn from_api(api: AuthorityClient) -> Self {
        Self { api }
    }

    pub fn base_url(&self) -> &Url {
        self.api.base_url()
    }

    /// Interactive sign-in. Never retried; the caller stores the result.
    pub async fn login(&self, email: &str) -> Result<AccessSession, AuthError> {
        if email.trim().is_empty() {
            return Err(AuthError::Rejected {
                message: "email is required".into(),
            });
        }
        match self.api.login(email).await {
            Ok(token) => Ok(AccessSession::new(token)),
            Err(e) => {
                warn!(error = %e, "sign-in failed");
                Err(AuthError::from(e))
            }
        }
    }

    /// Grant another account access to `gate_ids` for `hours`.
    pub async fn create_delegation(
        &self,
        session: &AccessSession,
        delegatee_email: &str,
        gate_ids: Vec<String>,
        hours: u32,
    ) -> Result<String, TokenError> {
        let request = DelegationRequest {
            delegatee_email: delegatee_email.trim().to_owned(),
            gate_ids,
            hours,
        };
        Ok(self
            .api
            .create_delegation(session.bearer_token(), &request)
            .await?)
    }

    /// Create a visitor pass for `gate_ids`, valid for `hours`.
    pub async fn create_visitor_pass(
        &self,
        session: &AccessSession,
        visitor_name: &str,
        visitor_phone: &str,
        gate_ids: Vec<String>,
        hours: u32,
    ) -> Result<String, TokenError> {
        let request = VisitorPassRequest {
            visitor_name: visitor_name.trim().to_owned(),
            visitor_phone: visitor_phone.trim().to_owned(),
            gate_ids,
            hours,
        };
        Ok(self
            .api
            .create_visitor_pass(session.bearer_token(), &request)
            .await?)
    }

    /// Obtain a credential for a visitor pass. Same single-attempt and
    /// deadline semantics as [`TokenIssuer::issue`].
    pub async fn issue_visitor(
        &self,
        pass_id: &str,
        gate_id: &str,
        reader_nonce: &str,
        deadline: Duration,
    ) -> Result<VisitorCredential, TokenError> {
        let request = VisitorTokenRequest {
            pass_id: pass_id.to_owned(),
            gate_id: gate_id.to_owned(),
            reader_nonce: reader_nonce.to_owned(),
        };
        let resp = within_deadline(deadline, self.api.issue_visitor_token(&request)).await?;
        Ok(VisitorCredential {
            credential: Credential::new(resp.token, resp.exp_epoch_seconds),
            visitor_name: resp.visitor_name,
            remaining_uses: resp.remaining_uses,
        })
    }
}

#[async_trait]
impl TokenIssuer for CredentialClient {
    async fn issue(
        &self,
        session: &AccessSession,
        request: IssueRequest,
        deadline: Duration,
    ) -> Result<Credential, TokenError> {
        let request = TokenRequest {
            gate_id: request.gate_id,
            reader_nonce: request.reader_nonce,
            device_id: request.device_id,
        };
        debug!(gate_id = %request.gate_id, "requesting credential");

        let resp = within_deadline(
            deadline,
            self.api.issue_token(session.bearer_token(), &request),
        )
        .await?;
        Ok(Credential::new(resp.token, resp.exp_epoch_seconds))
    }
}

/// Run an API call under `deadline`, mapping lapse to [`TokenError::Timeout`].
async fn within_deadline<T>(
    deadline: Duration,
    call: impl Future<Output = Result<T, oneaccess_api::Error>>,
) -> Result<T, TokenError> {
    match tokio::time::timeout(deadline, call).await {
        Ok(result) => result.map_err(TokenError::from),
        Err(_) => Err(TokenError::deadline_exceeded(deadline)),
    }
}
