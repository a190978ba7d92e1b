//! Per-host login/logout state machine.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cache::IdentityCache;
use crate::challenge::{
    ChallengeCancelled, ChallengeContext, ChallengeHandler, ChallengeReason, ChallengeResolver,
    ChallengeResult, NonInteractiveHandler,
};
use crate::client::{ApplicationAuthorization, RemoteAuthClient};
use crate::config::{LoginPolicy, TokenPersistence};
use crate::error::AuthError;
use crate::host::HostAddress;
use crate::identity::IdentityRecord;
use crate::store::{Credential, CredentialStore};

/// Login state for one host. Mutated only by its [`AuthOrchestrator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum AuthState {
    LoggedOut,
    Authenticating,
    ChallengePending,
    LoggedIn,
    LoginFailed,
}

/// How a login ended when it did not fail.
///
/// Cancellation of the two-factor prompt is a normal termination path, so it
/// is an outcome rather than an [`AuthError`].
#[derive(Debug, Clone)]
pub enum LoginOutcome {
    Authenticated { identity: IdentityRecord },
    Cancelled,
}

/// Drives the login/logout state machine for one host, coordinating the
/// remote client, the interactive challenge handler, and both stores.
///
/// Created lazily by [`HostRegistry`](crate::registry::HostRegistry) on the
/// first login attempt for a host and kept for the process lifetime. At most
/// one login is in flight per orchestrator; a second call while one is
/// running fails with [`AuthError::LoginInProgress`].
pub struct AuthOrchestrator {
    host: HostAddress,
    client: Arc<dyn RemoteAuthClient>,
    handler: Arc<dyn ChallengeHandler>,
    credentials: Arc<dyn CredentialStore>,
    identities: Arc<dyn IdentityCache>,
    policy: LoginPolicy,
    state: Mutex<AuthState>,
    cancel: Mutex<Option<CancellationToken>>,
}

impl AuthOrchestrator {
    pub fn new(
        host: HostAddress,
        client: Arc<dyn RemoteAuthClient>,
        handler: Arc<dyn ChallengeHandler>,
        credentials: Arc<dyn CredentialStore>,
        identities: Arc<dyn IdentityCache>,
        policy: LoginPolicy,
    ) -> Self {
        Self {
            host,
            client,
            handler,
            credentials,
            identities,
            policy,
            state: Mutex::new(AuthState::LoggedOut),
            cancel: Mutex::new(None),
        }
    }

    pub fn host(&self) -> &HostAddress {
        &self.host
    }

    pub fn state(&self) -> AuthState {
        *self.state_guard()
    }

    pub fn is_logged_in(&self) -> bool {
        self.state() == AuthState::LoggedIn
    }

    /// Exchange `username`/`secret` for an application token, resolving any
    /// two-factor challenges through the configured handler.
    ///
    /// On success the credential and identity are persisted and the state is
    /// `LoggedIn`. On failure the state is `LoginFailed` and neither store
    /// has a fresh entry. Cancelling the two-factor prompt resolves to
    /// [`LoginOutcome::Cancelled`] with state `LoggedOut` so a retry is a
    /// clean login.
    pub async fn login(
        &self,
        username: &str,
        secret: &str,
    ) -> Result<LoginOutcome, AuthError> {
        if username.trim().is_empty() || secret.is_empty() {
            return Err(AuthError::InvalidCredentials);
        }
        let handler = self.handler.clone();
        self.run_login(username, secret, handler.as_ref()).await
    }

    /// Re-run the login flow with the credential persisted by a previous
    /// login. Any two-factor challenge cancels immediately rather than
    /// prompting, so this never blocks on the user.
    pub async fn login_from_cache(&self) -> Result<LoginOutcome, AuthError> {
        let credential = self
            .credentials
            .load(&self.host)?
            .ok_or_else(|| AuthError::NoStoredCredential(self.host.clone()))?;
        self.run_login(&credential.username, &credential.secret, &NonInteractiveHandler)
            .await
    }

    /// Clear the host's login state and purge its stored credential and
    /// cached identity. Idempotent; a login in flight is cancelled first.
    pub fn logout(&self) -> Result<(), AuthError> {
        if let Some(token) = self.take_cancel() {
            debug!(host = %self.host, "logout cancelling in-flight login");
            token.cancel();
        }
        self.set_state(AuthState::LoggedOut);
        let credentials = self.credentials.clear(&self.host);
        let identities = self.identities.clear(&self.host);
        info!(host = %self.host, "logged out");
        credentials.and(identities)
    }

    async fn run_login(
        &self,
        username: &str,
        secret: &str,
        handler: &dyn ChallengeHandler,
    ) -> Result<LoginOutcome, AuthError> {
        let cancel = self.begin_login()?;
        debug!(host = %self.host, username, "starting credential exchange");
        let resolver = LoginResolver {
            orchestrator: self,
            handler,
            cancel: cancel.clone(),
            rejections: AtomicU32::new(0),
        };
        let result = self.drive_exchange(username, secret, &resolver).await;
        self.finish_login(&cancel, result)
    }

    /// Exchange, identity fetch, and persistence. Writes happen only once
    /// both remote calls have succeeded, credential first; a failed identity
    /// write rolls the credential back so no partial state survives.
    async fn drive_exchange(
        &self,
        username: &str,
        secret: &str,
        resolver: &dyn ChallengeResolver,
    ) -> Result<IdentityRecord, AuthError> {
        let authorization = self
            .client
            .exchange_credentials(username, secret, resolver)
            .await?;
        let identity = self.client.fetch_identity(&authorization).await?;
        let credential = self.build_credential(username, secret, &authorization);
        self.credentials.save(&self.host, &credential)?;
        if let Err(err) = self.identities.save(&self.host, &identity) {
            let _ = self.credentials.clear(&self.host);
            return Err(err);
        }
        Ok(identity)
    }

    fn build_credential(
        &self,
        username: &str,
        secret: &str,
        authorization: &ApplicationAuthorization,
    ) -> Credential {
        let credential = Credential::new(username, secret);
        match self.policy.token_persistence {
            TokenPersistence::StoreWithCredential => {
                credential.with_token(authorization.token.clone())
            }
            TokenPersistence::DiscardAfterExchange => credential,
        }
    }

    fn begin_login(&self) -> Result<CancellationToken, AuthError> {
        let mut state = self.state_guard();
        if matches!(
            *state,
            AuthState::Authenticating | AuthState::ChallengePending
        ) {
            return Err(AuthError::LoginInProgress(self.host.clone()));
        }
        *state = AuthState::Authenticating;
        drop(state);
        let token = CancellationToken::new();
        *self.cancel_guard() = Some(token.clone());
        Ok(token)
    }

    fn finish_login(
        &self,
        cancel: &CancellationToken,
        result: Result<IdentityRecord, AuthError>,
    ) -> Result<LoginOutcome, AuthError> {
        self.take_cancel();
        match result {
            Ok(_) if cancel.is_cancelled() => {
                // Logout won the race after the exchange finished; drop the
                // writes it may have missed and honor the logout.
                let _ = self.credentials.clear(&self.host);
                let _ = self.identities.clear(&self.host);
                self.set_state(AuthState::LoggedOut);
                Ok(LoginOutcome::Cancelled)
            }
            Ok(identity) => {
                self.set_state(AuthState::LoggedIn);
                info!(host = %self.host, login = %identity.login, "login succeeded");
                Ok(LoginOutcome::Authenticated { identity })
            }
            Err(AuthError::Cancelled) => {
                self.set_state(AuthState::LoggedOut);
                info!(host = %self.host, "login cancelled");
                Ok(LoginOutcome::Cancelled)
            }
            Err(err) if cancel.is_cancelled() => {
                // Logout raced the exchange; whatever the exchange returned,
                // the user asked to stop.
                debug!(host = %self.host, error = %err, "login aborted by logout");
                self.set_state(AuthState::LoggedOut);
                Ok(LoginOutcome::Cancelled)
            }
            Err(err) => {
                self.set_state(AuthState::LoginFailed);
                warn!(host = %self.host, error = %err, "login failed");
                Err(err)
            }
        }
    }

    fn set_state(&self, next: AuthState) {
        let mut state = self.state_guard();
        if *state != next {
            debug!(host = %self.host, from = %state, to = %next, "auth state transition");
            *state = next;
        }
    }

    fn take_cancel(&self) -> Option<CancellationToken> {
        self.cancel_guard().take()
    }

    fn state_guard(&self) -> MutexGuard<'_, AuthState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn cancel_guard(&self) -> MutexGuard<'_, Option<CancellationToken>> {
        self.cancel.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl std::fmt::Debug for AuthOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthOrchestrator")
            .field("host", &self.host)
            .field("state", &self.state())
            .finish()
    }
}

/// Resolver handed to the exchange for the duration of one login.
///
/// Owns the `Authenticating` / `ChallengePending` transitions around each
/// handler wait, retry accounting, the configured retry bound, and the
/// cancellation race against logout.
struct LoginResolver<'a> {
    orchestrator: &'a AuthOrchestrator,
    handler: &'a dyn ChallengeHandler,
    cancel: CancellationToken,
    rejections: AtomicU32,
}

#[async_trait]
impl ChallengeResolver for LoginResolver<'_> {
    async fn resolve(
        &self,
        reason: ChallengeReason,
    ) -> Result<ChallengeResult, ChallengeCancelled> {
        let retry_count = match reason {
            ChallengeReason::CodeRejected => self.rejections.fetch_add(1, Ordering::SeqCst) + 1,
            ChallengeReason::CodeRequired { .. } => self.rejections.load(Ordering::SeqCst),
        };
        if let Some(max) = self.orchestrator.policy.max_challenge_retries {
            if retry_count > max {
                warn!(host = %self.orchestrator.host, retry_count, "challenge retry limit reached");
                return Err(ChallengeCancelled);
            }
        }
        let context = ChallengeContext {
            host: self.orchestrator.host.clone(),
            reason,
            retry_count,
        };
        self.orchestrator.set_state(AuthState::ChallengePending);
        debug!(host = %context.host, retry_count, "waiting for two-factor code");
        let resolved = tokio::select! {
            _ = self.cancel.cancelled() => Err(ChallengeCancelled),
            result = self.handler.resolve(&context) => result,
        };
        if resolved.is_ok() {
            self.orchestrator.set_state(AuthState::Authenticating);
        }
        resolved
    }
}
