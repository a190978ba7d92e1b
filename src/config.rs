//! Configuration (layered: code > env > defaults).

use std::path::PathBuf;

use crate::error::AuthError;

/// Whether the exchanged application token is persisted alongside the
/// username/secret pair or discarded once the login completes.
///
/// Persisting it enables silent re-login without a fresh exchange; discarding
/// it keeps only the credential on disk. Policy, not behavior, so it defaults
/// to the conservative choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum TokenPersistence {
    #[default]
    DiscardAfterExchange,
    StoreWithCredential,
}

/// Per-login policy knobs shared by every orchestrator.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoginPolicy {
    pub token_persistence: TokenPersistence,
    /// Maximum number of rejected codes before the challenge loop gives up.
    /// `None` (the default) leaves the user's cancellation and the remote
    /// side's rate limiting as the only bounds.
    pub max_challenge_retries: Option<u32>,
}

/// Top-level configuration for hubauth.
///
/// # Example
/// ```no_run
/// use hubauth::config::HubAuthConfig;
///
/// let config = HubAuthConfig::from_env()?;
/// # Ok::<(), hubauth::error::AuthError>(())
/// ```
#[derive(Debug, Clone)]
pub struct HubAuthConfig {
    /// Directory holding the file-backed credential store and identity cache.
    pub storage_dir: PathBuf,
    pub policy: LoginPolicy,
}

impl Default for HubAuthConfig {
    fn default() -> Self {
        Self {
            storage_dir: default_storage_dir(),
            policy: LoginPolicy::default(),
        }
    }
}

impl HubAuthConfig {
    /// Load from `HUBAUTH_*` environment variables, reading `.env` first if
    /// present.
    ///
    /// Recognized: `HUBAUTH_STORAGE_DIR`, `HUBAUTH_PERSIST_TOKEN`
    /// (`true`/`false`), `HUBAUTH_MAX_CHALLENGE_RETRIES`.
    pub fn from_env() -> Result<Self, AuthError> {
        let _ = dotenvy::dotenv(); // load .env if present, ignore error
        let mut config = Self::default();
        if let Ok(dir) = std::env::var("HUBAUTH_STORAGE_DIR") {
            if !dir.trim().is_empty() {
                config.storage_dir = PathBuf::from(dir);
            }
        }
        if let Ok(value) = std::env::var("HUBAUTH_PERSIST_TOKEN") {
            config.policy.token_persistence = match value.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" => TokenPersistence::StoreWithCredential,
                "false" | "0" | "no" | "" => TokenPersistence::DiscardAfterExchange,
                other => {
                    return Err(AuthError::InvalidResponse(format!(
                        "HUBAUTH_PERSIST_TOKEN must be true or false, got {other}"
                    )))
                }
            };
        }
        if let Ok(value) = std::env::var("HUBAUTH_MAX_CHALLENGE_RETRIES") {
            let parsed = value.trim().parse::<u32>().map_err(|_| {
                AuthError::InvalidResponse(format!(
                    "HUBAUTH_MAX_CHALLENGE_RETRIES must be an integer, got {value}"
                ))
            })?;
            config.policy.max_challenge_retries = Some(parsed);
        }
        Ok(config)
    }

    pub fn with_storage_dir(mut self, dir: PathBuf) -> Self {
        self.storage_dir = dir;
        self
    }

    pub fn with_policy(mut self, policy: LoginPolicy) -> Self {
        self.policy = policy;
        self
    }
}

pub(crate) fn default_storage_dir() -> PathBuf {
    directories::UserDirs::new()
        .map(|dirs| dirs.home_dir().join(".hubauth"))
        .unwrap_or_else(|| PathBuf::from(".hubauth"))
}
