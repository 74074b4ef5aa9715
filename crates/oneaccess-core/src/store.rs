// ── Local credential store port ──
//
// Durable sign-in state lives outside this crate. Both the card-emulation
// session and the refresh scheduler read it copy-on-read through this
// trait; neither writes to it.

use std::sync::Arc;

use arc_swap::ArcSwapOption;

use crate::model::AccessSession;

/// Read-only view of the durable sign-in state.
///
/// Reads happen on async tasks inside the reader deadline and must not
/// block: back durable storage with an in-memory copy.
pub trait CredentialStore: Send + Sync {
    /// The current login session, if signed in.
    fn access_session(&self) -> Option<AccessSession>;

    /// Stable identifier of this device, if known.
    fn device_id(&self) -> Option<String>;
}

/// In-process store with atomic whole-value replacement.
///
/// Suitable for hosts that persist elsewhere and for tests.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    session: ArcSwapOption<AccessSession>,
    device_id: ArcSwapOption<String>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_device_id(device_id: impl Into<String>) -> Self {
        let store = Self::new();
        store.set_device_id(device_id);
        store
    }

    pub fn set_access_session(&self, session: AccessSession) {
        self.session.store(Some(Arc::new(session)));
    }

    pub fn clear_access_session(&self) {
        self.session.store(None);
    }

    pub fn set_device_id(&self, device_id: impl Into<String>) {
        self.device_id.store(Some(Arc::new(device_id.into())));
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn access_session(&self) -> Option<AccessSession> {
        self.session.load_full().map(|s| (*s).clone())
    }

    fn device_id(&self) -> Option<String> {
        self.device_id.load_full().map(|d| (*d).clone())
    }
}
