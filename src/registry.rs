//! Composition root routing login/logout requests to per-host orchestrators.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::debug;

use crate::cache::{FileIdentityCache, IdentityCache};
use crate::challenge::ChallengeHandler;
use crate::client::AuthClientFactory;
use crate::config::{HubAuthConfig, LoginPolicy};
use crate::error::AuthError;
use crate::host::HostAddress;
use crate::orchestrator::{AuthOrchestrator, LoginOutcome};
use crate::store::{CredentialStore, FileCredentialStore};

/// Owns one [`AuthOrchestrator`] per distinct host address.
///
/// The stores and the challenge handler are shared across hosts but
/// partitioned by [`HostAddress`] key, so two hosts never see each other's
/// entries.
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
/// use hubauth::challenge::NonInteractiveHandler;
/// use hubauth::config::HubAuthConfig;
/// use hubauth::http::HttpAuthClientFactory;
/// use hubauth::registry::HostRegistry;
///
/// let registry = HostRegistry::with_config(
///     &HubAuthConfig::default(),
///     Arc::new(HttpAuthClientFactory),
///     Arc::new(NonInteractiveHandler),
/// );
/// ```
pub struct HostRegistry {
    factory: Arc<dyn AuthClientFactory>,
    handler: Arc<dyn ChallengeHandler>,
    credentials: Arc<dyn CredentialStore>,
    identities: Arc<dyn IdentityCache>,
    policy: LoginPolicy,
    hosts: RwLock<HashMap<HostAddress, Arc<AuthOrchestrator>>>,
}

impl HostRegistry {
    pub fn new(
        factory: Arc<dyn AuthClientFactory>,
        handler: Arc<dyn ChallengeHandler>,
        credentials: Arc<dyn CredentialStore>,
        identities: Arc<dyn IdentityCache>,
        policy: LoginPolicy,
    ) -> Self {
        Self {
            factory,
            handler,
            credentials,
            identities,
            policy,
            hosts: RwLock::new(HashMap::new()),
        }
    }

    /// Registry backed by the file stores under `config.storage_dir`.
    pub fn with_config(
        config: &HubAuthConfig,
        factory: Arc<dyn AuthClientFactory>,
        handler: Arc<dyn ChallengeHandler>,
    ) -> Self {
        Self::new(
            factory,
            handler,
            Arc::new(FileCredentialStore::new(
                config.storage_dir.clone(),
            )),
            Arc::new(FileIdentityCache::new(
                config.storage_dir.clone(),
            )),
            config.policy,
        )
    }

    /// Return the orchestrator for `host`, creating and registering it on
    /// first use. Concurrent calls for the same address observe a single
    /// orchestrator.
    pub fn get_or_create(&self, host: &HostAddress) -> Arc<AuthOrchestrator> {
        if let Some(existing) = self.read_hosts().get(host) {
            return existing.clone();
        }
        let mut hosts = self.write_hosts();
        hosts
            .entry(host.clone())
            .or_insert_with(|| {
                debug!(host = %host, "creating orchestrator");
                Arc::new(AuthOrchestrator::new(
                    host.clone(),
                    self.factory.create(host),
                    self.handler.clone(),
                    self.credentials.clone(),
                    self.identities.clone(),
                    self.policy,
                ))
            })
            .clone()
    }

    /// Route a login request to the host's orchestrator.
    pub async fn login(
        &self,
        host: &HostAddress,
        username: &str,
        secret: &str,
    ) -> Result<LoginOutcome, AuthError> {
        self.get_or_create(host).login(username, secret).await
    }

    /// True if at least one managed host is logged in.
    pub fn is_any_logged_in(&self) -> bool {
        self.read_hosts()
            .values()
            .any(|orchestrator| orchestrator.is_logged_in())
    }

    /// Hosts with an orchestrator, in no particular order.
    pub fn hosts(&self) -> Vec<HostAddress> {
        self.read_hosts().keys().cloned().collect()
    }

    /// Log the host out (if needed) and discard its orchestrator.
    pub fn remove_host(&self, host: &HostAddress) -> Result<(), AuthError> {
        let removed = self.write_hosts().remove(host);
        match removed {
            Some(orchestrator) => orchestrator.logout(),
            None => Ok(()),
        }
    }

    fn read_hosts(
        &self,
    ) -> std::sync::RwLockReadGuard<'_, HashMap<HostAddress, Arc<AuthOrchestrator>>> {
        self.hosts
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_hosts(
        &self,
    ) -> std::sync::RwLockWriteGuard<'_, HashMap<HostAddress, Arc<AuthOrchestrator>>> {
        self.hosts
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl std::fmt::Debug for HostRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostRegistry")
            .field("hosts", &self.hosts())
            .finish()
    }
}
