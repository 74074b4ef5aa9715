// Test doubles for the issuer and store ports.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use secrecy::SecretString;
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::credential::TokenIssuer;
use crate::error::TokenError;
use crate::model::{AccessSession, Credential, IssueRequest};
use crate::store::MemoryCredentialStore;

/// One observed `issue` call.
#[derive(Debug, Clone)]
pub(crate) struct IssueCall {
    pub request: IssueRequest,
    pub bearer: String,
    pub at: Instant,
}

/// How the fake answers once its script runs out.
#[derive(Clone)]
pub(crate) enum Fallback {
    Succeed,
    Fail(TokenError),
    /// Sleep this long, then succeed.
    Stall(Duration),
}

/// Issuer that plays back scripted results and reports every call.
pub(crate) struct ScriptedIssuer {
    script: Mutex<VecDeque<Result<Credential, TokenError>>>,
    fallback: Fallback,
    calls: mpsc::UnboundedSender<IssueCall>,
}

impl ScriptedIssuer {
    pub fn new(
        script: Vec<Result<Credential, TokenError>>,
        fallback: Fallback,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<IssueCall>) {
        let (calls, rx) = mpsc::unbounded_channel();
        let issuer = Arc::new(Self {
            script: Mutex::new(script.into()),
            fallback,
            calls,
        });
        (issuer, rx)
    }

    pub fn succeeding() -> (Arc<Self>, mpsc::UnboundedReceiver<IssueCall>) {
        Self::new(Vec::new(), Fallback::Succeed)
    }
}

#[async_trait]
impl TokenIssuer for ScriptedIssuer {
    async fn issue(
        &self,
        session: &AccessSession,
        request: IssueRequest,
        _deadline: Duration,
    ) -> Result<Credential, TokenError> {
        use secrecy::ExposeSecret;

        let _ = self.calls.send(IssueCall {
            request: request.clone(),
            bearer: session.bearer_token().expose_secret().to_owned(),
            at: Instant::now(),
        });

        let scripted = self
            .script
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .pop_front();
        if let Some(result) = scripted {
            return result;
        }

        match &self.fallback {
            Fallback::Succeed => Ok(credential_for(&request)),
            Fallback::Fail(err) => Err(err.clone()),
            Fallback::Stall(pause) => {
                tokio::time::sleep(*pause).await;
                Ok(credential_for(&request))
            }
        }
    }
}

pub(crate) fn credential_for(request: &IssueRequest) -> Credential {
    Credential::new(
        format!("tok-{}-{}", request.gate_id, request.reader_nonce),
        4_102_444_800,
    )
}

pub(crate) fn backend_unavailable() -> TokenError {
    TokenError::BackendUnavailable {
        message: "HTTP 503".into(),
    }
}

pub(crate) fn signed_in_store() -> Arc<MemoryCredentialStore> {
    let store = MemoryCredentialStore::with_device_id("android-42");
    store.set_access_session(AccessSession::new(SecretString::from(
        "session-jwt".to_string(),
    )));
    Arc::new(store)
}
