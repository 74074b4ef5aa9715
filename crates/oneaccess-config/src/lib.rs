//! Profile configuration for OneAccess hosts.
//!
//! TOML profiles merged with `ONEACCESS_` environment overrides, the
//! keyring-backed local credential store, and translation of a profile
//! into `oneaccess_core::ClientConfig`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwapOption;
use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use oneaccess_core::{AccessSession, ClientConfig, CredentialStore, TlsVerification};

pub const DEFAULT_GATE_ID: &str = "MAIN_GATE";

const KEYRING_SERVICE: &str = "oneaccess";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no profile named '{profile}'")]
    NoProfile { profile: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    pub default_profile: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    /// Named backend profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

impl Config {
    /// Look up a profile by name, falling back to `default_profile`.
    pub fn profile(&self, name: Option<&str>) -> Result<(&str, &Profile), ConfigError> {
        let name = name
            .or(self.default_profile.as_deref())
            .unwrap_or("default");
        self.profiles
            .get_key_value(name)
            .map(|(k, p)| (k.as_str(), p))
            .ok_or_else(|| ConfigError::NoProfile {
                profile: name.into(),
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default)]
    pub insecure: bool,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            insecure: false,
            timeout: default_timeout(),
        }
    }
}

fn default_timeout() -> u64 {
    30
}

/// A named issuing-authority profile.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Profile {
    /// Authority base URL (e.g., "https://access.example.com").
    pub backend_url: String,

    /// Last email used to sign in.
    pub email: Option<String>,

    #[serde(default = "default_gate_id")]
    pub gate_id: String,

    /// Stable device identifier sent with every issuance.
    pub device_id: Option<String>,

    pub ca_cert: Option<PathBuf>,

    pub insecure: Option<bool>,

    pub timeout: Option<u64>,
}

fn default_gate_id() -> String {
    DEFAULT_GATE_ID.into()
}

impl Profile {
    pub fn new(backend_url: impl Into<String>) -> Self {
        Self {
            backend_url: backend_url.into(),
            email: None,
            gate_id: default_gate_id(),
            device_id: None,
            ca_cert: None,
            insecure: None,
            timeout: None,
        }
    }

    /// Backend URL with surrounding whitespace and trailing slashes removed.
    pub fn normalized_backend_url(&self) -> &str {
        self.backend_url.trim().trim_end_matches('/')
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "oneaccess", "oneaccess").map_or_else(
        || {
            let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
            p.push(".config");
            p.push("oneaccess");
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

// ── Loading / saving ────────────────────────────────────────────────

/// Load the config from the canonical path plus environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from an explicit file. A missing file yields defaults.
///
/// Environment overrides use `__` as the nesting separator, e.g.
/// `ONEACCESS_DEFAULTS__TIMEOUT=10`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let config = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("ONEACCESS_").split("__"))
        .extract()?;
    Ok(config)
}

/// Serialize config to TOML at the canonical path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    debug!(path = %path.display(), "config saved");
    Ok(())
}

// ── Profile → ClientConfig ──────────────────────────────────────────

/// Build a `ClientConfig` from a profile, falling back to `defaults`.
pub fn profile_to_client_config(
    profile: &Profile,
    defaults: &Defaults,
) -> Result<ClientConfig, ConfigError> {
    let raw = profile.normalized_backend_url();
    let base_url: url::Url = raw.parse().map_err(|_| ConfigError::Validation {
        field: "backend_url".into(),
        reason: format!("invalid URL: {}", profile.backend_url),
    })?;
    if !matches!(base_url.scheme(), "http" | "https") {
        return Err(ConfigError::Validation {
            field: "backend_url".into(),
            reason: format!("unsupported scheme '{}'", base_url.scheme()),
        });
    }

    let tls = if profile.insecure.unwrap_or(defaults.insecure) {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::SystemDefaults
    };

    let mut config = ClientConfig::new(base_url);
    config.tls = tls;
    config.timeout = Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout));
    Ok(config)
}

// ── Keyring-backed credential store ─────────────────────────────────

/// Local credential store backed by the OS keyring.
///
/// The bearer token lives under service `oneaccess`, account
/// `<profile>/access-token`, and is cached in memory so reads never
/// touch the keyring. The device id comes from the profile.
#[derive(Debug)]
pub struct KeyringCredentialStore {
    profile_name: String,
    device_id: Option<String>,
    session: ArcSwapOption<AccessSession>,
}

impl KeyringCredentialStore {
    /// Store with an empty session cache. Nothing is read from the keyring.
    pub fn new(profile_name: impl Into<String>, device_id: Option<String>) -> Self {
        Self {
            profile_name: profile_name.into(),
            device_id,
            session: ArcSwapOption::empty(),
        }
    }

    /// Open the store for a profile and load the saved session.
    ///
    /// Blocks on the OS keyring; call from startup code, not from a
    /// runtime worker.
    pub fn for_profile(profile_name: &str, profile: &Profile) -> Self {
        let store = Self::new(profile_name, profile.device_id.clone());
        store.reload();
        store
    }

    pub fn account(&self) -> String {
        format!("{}/access-token", self.profile_name)
    }

    fn entry(&self) -> Result<keyring::Entry, ConfigError> {
        Ok(keyring::Entry::new(KEYRING_SERVICE, &self.account())?)
    }

    /// Refresh the cached session from the keyring. Blocks.
    pub fn reload(&self) {
        let session = self.read_keyring();
        self.session.store(session.map(Arc::new));
    }

    fn read_keyring(&self) -> Option<AccessSession> {
        let secret = self.entry().ok()?.get_password();
        match secret {
            Ok(token) if !token.trim().is_empty() => {
                Some(AccessSession::new(SecretString::from(token)))
            }
            Ok(_) | Err(keyring::Error::NoEntry) => None,
            Err(e) => {
                debug!(profile = %self.profile_name, error = %e, "keyring read failed");
                None
            }
        }
    }

    /// Persist the bearer token after a successful sign-in. Blocks.
    pub fn save_access_session(&self, session: AccessSession) -> Result<(), ConfigError> {
        self.entry()?
            .set_password(session.bearer_token().expose_secret())?;
        self.session.store(Some(Arc::new(session)));
        debug!(profile = %self.profile_name, "access session stored");
        Ok(())
    }

    /// Forget the stored bearer token. Signing out twice is not an error.
    pub fn sign_out(&self) -> Result<(), ConfigError> {
        self.session.store(None);
        match self.entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

impl CredentialStore for KeyringCredentialStore {
    fn access_session(&self) -> Option<AccessSession> {
        self.session.load_full().map(|s| (*s).clone())
    }

    fn device_id(&self) -> Option<String> {
        self.device_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_owned)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn keyring_account_is_scoped_by_profile() {
        let store = KeyringCredentialStore::new("work", None);
        assert_eq!(store.account(), "work/access-token");
    }

    #[test]
    fn new_store_reads_nothing_from_keyring() {
        let store = KeyringCredentialStore::new("work", Some("android-42".into()));
        assert!(store.access_session().is_none());
    }

    #[test]
    fn blank_device_id_is_absent() {
        let store = KeyringCredentialStore::new("work", Some("  ".into()));
        assert_eq!(store.device_id(), None);
        let store = KeyringCredentialStore::new("work", Some("android-42".into()));
        assert_eq!(store.device_id().as_deref(), Some("android-42"));
    }

    #[test]
    fn backend_url_is_normalized() {
        let profile = Profile::new(" https://access.example.com// ");
        assert_eq!(profile.normalized_backend_url(), "https://access.example.com");
    }
}
