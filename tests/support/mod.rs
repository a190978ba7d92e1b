#![allow(dead_code)]

use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Semaphore;

use hubauth::cache::IdentityCache;
use hubauth::challenge::{
    ChallengeCancelled, ChallengeContext, ChallengeHandler, ChallengeReason, ChallengeResolver,
    ChallengeResult, OtpDelivery,
};
use hubauth::client::{ApplicationAuthorization, AuthClientFactory, RemoteAuthClient};
use hubauth::error::AuthError;
use hubauth::host::HostAddress;
use hubauth::identity::IdentityRecord;
use hubauth::store::{Credential, CredentialStore};

#[derive(Default)]
pub struct InMemoryCredentialStore {
    entries: Mutex<HashMap<HostAddress, Credential>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, host: &HostAddress) -> Option<Credential> {
        self.entries.lock().expect("store lock poisoned").get(host).cloned()
    }
}

impl CredentialStore for InMemoryCredentialStore {
    fn load(&self, host: &HostAddress) -> Result<Option<Credential>, AuthError> {
        Ok(self.get(host))
    }

    fn save(&self, host: &HostAddress, credential: &Credential) -> Result<(), AuthError> {
        self.entries
            .lock()
            .expect("store lock poisoned")
            .insert(host.clone(), credential.clone());
        Ok(())
    }

    fn clear(&self, host: &HostAddress) -> Result<(), AuthError> {
        self.entries.lock().expect("store lock poisoned").remove(host);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryIdentityCache {
    entries: Mutex<HashMap<HostAddress, IdentityRecord>>,
    fail_saves: AtomicBool,
}

impl InMemoryIdentityCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `save` fail with a storage error.
    pub fn fail_saves(&self) {
        self.fail_saves.store(true, Ordering::SeqCst);
    }

    pub fn get(&self, host: &HostAddress) -> Option<IdentityRecord> {
        self.entries.lock().expect("cache lock poisoned").get(host).cloned()
    }
}

impl IdentityCache for InMemoryIdentityCache {
    fn load(&self, host: &HostAddress) -> Result<Option<IdentityRecord>, AuthError> {
        Ok(self.get(host))
    }

    fn save(&self, host: &HostAddress, identity: &IdentityRecord) -> Result<(), AuthError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(AuthError::Storage("disk full".to_string()));
        }
        self.entries
            .lock()
            .expect("cache lock poisoned")
            .insert(host.clone(), identity.clone());
        Ok(())
    }

    fn clear(&self, host: &HostAddress) -> Result<(), AuthError> {
        self.entries.lock().expect("cache lock poisoned").remove(host);
        Ok(())
    }
}

/// What the mock exchange does before (eventually) yielding a token.
pub enum MockExchange {
    /// Token returned immediately, no challenge.
    Immediate,
    /// Demands a one-time code; every code other than `accepted` is rejected.
    TwoFactor { accepted: String },
    InvalidCredentials,
    NetworkFailure,
}

pub struct MockAuthClient {
    pub exchange: MockExchange,
    pub token: String,
    pub login: String,
    pub exchange_calls: AtomicU32,
}

impl MockAuthClient {
    pub fn immediate(token: &str, login: &str) -> Self {
        Self::with_exchange(MockExchange::Immediate, token, login)
    }

    pub fn two_factor(accepted: &str, token: &str, login: &str) -> Self {
        Self::with_exchange(
            MockExchange::TwoFactor {
                accepted: accepted.to_string(),
            },
            token,
            login,
        )
    }

    pub fn with_exchange(exchange: MockExchange, token: &str, login: &str) -> Self {
        Self {
            exchange,
            token: token.to_string(),
            login: login.to_string(),
            exchange_calls: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl RemoteAuthClient for MockAuthClient {
    async fn exchange_credentials(
        &self,
        _username: &str,
        _secret: &str,
        resolver: &dyn ChallengeResolver,
    ) -> Result<ApplicationAuthorization, AuthError> {
        self.exchange_calls.fetch_add(1, Ordering::SeqCst);
        match &self.exchange {
            MockExchange::Immediate => Ok(ApplicationAuthorization::new(&self.token)),
            MockExchange::InvalidCredentials => Err(AuthError::InvalidCredentials),
            MockExchange::NetworkFailure => {
                Err(AuthError::Network("connection reset".to_string()))
            }
            MockExchange::TwoFactor { accepted } => {
                let mut reason = ChallengeReason::CodeRequired {
                    delivery: OtpDelivery::App,
                };
                loop {
                    let result = resolver
                        .resolve(reason)
                        .await
                        .map_err(|_| AuthError::Cancelled)?;
                    if &result.code == accepted {
                        return Ok(ApplicationAuthorization::new(&self.token));
                    }
                    reason = ChallengeReason::CodeRejected;
                }
            }
        }
    }

    async fn fetch_identity(
        &self,
        _authorization: &ApplicationAuthorization,
    ) -> Result<IdentityRecord, AuthError> {
        Ok(IdentityRecord::new(&self.login))
    }
}

/// Factory handing out pre-built clients keyed by host.
#[derive(Default)]
pub struct MockClientFactory {
    clients: Mutex<HashMap<HostAddress, Arc<MockAuthClient>>>,
}

impl MockClientFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, host: &HostAddress, client: Arc<MockAuthClient>) {
        self.clients
            .lock()
            .expect("factory lock poisoned")
            .insert(host.clone(), client);
    }
}

impl AuthClientFactory for MockClientFactory {
    fn create(&self, host: &HostAddress) -> Arc<dyn RemoteAuthClient> {
        self.clients
            .lock()
            .expect("factory lock poisoned")
            .get(host)
            .cloned()
            .unwrap_or_else(|| Arc::new(MockAuthClient::immediate("1234", "someone")))
    }
}

/// Replays a fixed script of codes/cancellations and records every context it
/// was handed. An exhausted script cancels.
#[derive(Default)]
pub struct ScriptedChallengeHandler {
    script: Mutex<VecDeque<Result<ChallengeResult, ChallengeCancelled>>>,
    pub contexts: Mutex<Vec<ChallengeContext>>,
    pub calls: AtomicU32,
}

impl ScriptedChallengeHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn codes(codes: &[&str]) -> Self {
        let handler = Self::new();
        for code in codes {
            handler.push(Ok(ChallengeResult::code(*code)));
        }
        handler
    }

    pub fn cancelling() -> Self {
        let handler = Self::new();
        handler.push(Err(ChallengeCancelled));
        handler
    }

    pub fn push(&self, entry: Result<ChallengeResult, ChallengeCancelled>) {
        self.script
            .lock()
            .expect("script lock poisoned")
            .push_back(entry);
    }

    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn recorded_contexts(&self) -> Vec<ChallengeContext> {
        self.contexts.lock().expect("contexts lock poisoned").clone()
    }
}

#[async_trait]
impl ChallengeHandler for ScriptedChallengeHandler {
    async fn resolve(
        &self,
        context: &ChallengeContext,
    ) -> Result<ChallengeResult, ChallengeCancelled> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.contexts
            .lock()
            .expect("contexts lock poisoned")
            .push(context.clone());
        self.script
            .lock()
            .expect("script lock poisoned")
            .pop_front()
            .unwrap_or(Err(ChallengeCancelled))
    }
}

/// Parks inside `resolve` until the test releases it, signalling entry via a
/// semaphore so the test can synchronize with the pending challenge.
pub struct BlockingChallengeHandler {
    pub entered: Semaphore,
    release: Semaphore,
}

impl BlockingChallengeHandler {
    pub fn new() -> Self {
        Self {
            entered: Semaphore::new(0),
            release: Semaphore::new(0),
        }
    }

    /// Wait until a login is parked in the challenge wait.
    pub async fn wait_entered(&self) {
        self.entered.acquire().await.expect("semaphore closed").forget();
    }

    /// Unblock the parked handler; it cancels once released.
    pub fn release(&self) {
        self.release.add_permits(1);
    }
}

impl Default for BlockingChallengeHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChallengeHandler for BlockingChallengeHandler {
    async fn resolve(
        &self,
        _context: &ChallengeContext,
    ) -> Result<ChallengeResult, ChallengeCancelled> {
        self.entered.add_permits(1);
        self.release
            .acquire()
            .await
            .expect("semaphore closed")
            .forget();
        Err(ChallengeCancelled)
    }
}
