// ── Visual-channel refresh scheduler ──
//
// Keeps a fresh credential published for the rotating-code display.
// One background run per `RefreshKey`; a key change cancels and joins
// the old run before the new one starts, so nothing issued for a stale
// key is ever published after the change is applied.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, broadcast, watch};
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::RefreshTiming;
use crate::credential::TokenIssuer;
use crate::error::TokenError;
use crate::model::{Credential, IssueRequest, ReaderNonce};
use crate::store::CredentialStore;

const EVENT_CHANNEL_SIZE: usize = 32;

/// Inputs that define a refresh run. Any change restarts the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshKey {
    pub signed_in: bool,
    pub gate_id: String,
    /// Identity of the issuing authority, e.g. its base URL.
    pub backend: String,
}

impl RefreshKey {
    pub fn new(signed_in: bool, gate_id: impl Into<String>, backend: impl Into<String>) -> Self {
        Self {
            signed_in,
            gate_id: gate_id.into().trim().to_owned(),
            backend: backend.into(),
        }
    }

    /// Only signed-in keys with a gate selected produce a run.
    pub fn is_active(&self) -> bool {
        self.signed_in && !self.gate_id.is_empty()
    }
}

/// Latest outcome of the current run, as seen by the display.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshState {
    pub gate_id: Option<String>,
    /// Kept across failures so the display can keep showing it until expiry.
    pub last_credential: Option<Credential>,
    pub last_error: Option<TokenError>,
    pub next_wake_at: Option<DateTime<Utc>>,
}

/// Informational event stream for observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshEvent {
    Issued { gate_id: String, credential: Credential },
    Failed { gate_id: String, error: TokenError },
}

struct ActiveRun {
    key: RefreshKey,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Owner of the background refresh task.
///
/// Dropping the scheduler cancels any run in flight.
pub struct RefreshScheduler {
    store: Arc<dyn CredentialStore>,
    timing: RefreshTiming,
    state: Arc<watch::Sender<RefreshState>>,
    event_tx: broadcast::Sender<RefreshEvent>,
    cancel: CancellationToken,
    current: Mutex<Option<ActiveRun>>,
}

impl RefreshScheduler {
    pub fn new(store: Arc<dyn CredentialStore>, timing: RefreshTiming) -> Self {
        let (state, _) = watch::channel(RefreshState::default());
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_SIZE);
        Self {
            store,
            timing,
            state: Arc::new(state),
            event_tx,
            cancel: CancellationToken::new(),
            current: Mutex::new(None),
        }
    }

    /// Observe the published state.
    pub fn subscribe(&self) -> watch::Receiver<RefreshState> {
        self.state.subscribe()
    }

    /// Observe issuance and failure events.
    pub fn events(&self) -> broadcast::Receiver<RefreshEvent> {
        self.event_tx.subscribe()
    }

    /// Snapshot of the published state.
    pub fn state(&self) -> RefreshState {
        self.state.borrow().clone()
    }

    /// Key of the run in progress, if any.
    pub async fn current_key(&self) -> Option<RefreshKey> {
        self.current.lock().await.as_ref().map(|run| run.key.clone())
    }

    /// Apply a new key.
    ///
    /// An unchanged key leaves the current run alone. Otherwise the current
    /// run is cancelled and joined, the published state is reset, and a new
    /// run starts if the key is active. When this returns, no further
    /// `issue` call for the previous key will be made.
    pub async fn reconfigure(&self, key: RefreshKey, issuer: Arc<dyn TokenIssuer>) {
        let mut current = self.current.lock().await;

        if current
            .as_ref()
            .is_some_and(|run| run.key == key && !run.handle.is_finished())
        {
            return;
        }
        if let Some(run) = current.take() {
            stop_run(run).await;
        }
        self.state.send_replace(RefreshState::default());

        if !key.is_active() {
            debug!(signed_in = key.signed_in, "refresh key inactive, not starting");
            return;
        }

        let cancel = self.cancel.child_token();
        let run = RefreshRun {
            key: key.clone(),
            issuer,
            store: Arc::clone(&self.store),
            timing: self.timing.clone(),
            state: Arc::clone(&self.state),
            event_tx: self.event_tx.clone(),
        };
        let handle = tokio::spawn(refresh_task(run, cancel.clone()));
        *current = Some(ActiveRun {
            key,
            cancel,
            handle,
        });
    }

    /// Cancel the current run without starting another.
    pub async fn stop(&self) {
        if let Some(run) = self.current.lock().await.take() {
            stop_run(run).await;
        }
        self.state.send_replace(RefreshState::default());
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn stop_run(run: ActiveRun) {
    debug!(gate_id = %run.key.gate_id, "cancelling refresh run");
    run.cancel.cancel();
    if let Some(e) = run.handle.await.err().filter(JoinError::is_panic) {
        warn!(error = %e, "refresh task panicked");
    }
}

/// Everything one run needs, owned by its task.
struct RefreshRun {
    key: RefreshKey,
    issuer: Arc<dyn TokenIssuer>,
    store: Arc<dyn CredentialStore>,
    timing: RefreshTiming,
    state: Arc<watch::Sender<RefreshState>>,
    event_tx: broadcast::Sender<RefreshEvent>,
}

impl RefreshRun {
    /// One issuance attempt. The local session is re-read every cycle.
    async fn cycle(&self) -> Result<Credential, TokenError> {
        let session = self.store.access_session().ok_or_else(TokenError::no_session)?;
        let device_id = self.store.device_id().ok_or_else(TokenError::no_device_id)?;

        let deadline = self.timing.issue_deadline;
        let request = IssueRequest {
            gate_id: self.key.gate_id.clone(),
            reader_nonce: ReaderNonce::generate().into_string(),
            device_id,
        };

        tokio::time::timeout(deadline, self.issuer.issue(&session, request, deadline))
            .await
            .map_err(|_| TokenError::deadline_exceeded(deadline))?
    }

    /// Publish an outcome and return how long to sleep before the next cycle.
    fn publish(&self, outcome: Result<Credential, TokenError>) -> Duration {
        let gate_id = self.key.gate_id.clone();
        match outcome {
            Ok(credential) => {
                let pause = self.timing.success_interval;
                info!(gate_id = %gate_id, exp = credential.expires_at_epoch_seconds(), "credential refreshed");
                self.state.send_modify(|s| {
                    s.gate_id = Some(gate_id.clone());
                    s.last_credential = Some(credential.clone());
                    s.last_error = None;
                    s.next_wake_at = wake_at(pause);
                });
                let _ = self.event_tx.send(RefreshEvent::Issued {
                    gate_id,
                    credential,
                });
                pause
            }
            Err(error) => {
                let pause = self.timing.failure_backoff;
                warn!(gate_id = %gate_id, error = %error, "credential refresh failed");
                self.state.send_modify(|s| {
                    s.gate_id = Some(gate_id.clone());
                    s.last_error = Some(error.clone());
                    s.next_wake_at = wake_at(pause);
                });
                let _ = self.event_tx.send(RefreshEvent::Failed { gate_id, error });
                pause
            }
        }
    }
}

fn wake_at(pause: Duration) -> Option<DateTime<Utc>> {
    chrono::Duration::from_std(pause).ok().map(|d| Utc::now() + d)
}

/// Issue, publish, sleep, repeat. Failures are never terminal; only
/// cancellation ends the loop.
async fn refresh_task(run: RefreshRun, cancel: CancellationToken) {
    info!(gate_id = %run.key.gate_id, "credential refresh started");

    loop {
        let outcome = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            outcome = run.cycle() => outcome,
        };
        // A cancelled run must not publish.
        if cancel.is_cancelled() {
            break;
        }
        let pause = run.publish(outcome);

        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(pause) => {}
        }
    }

    debug!(gate_id = %run.key.gate_id, "credential refresh stopped");
}
