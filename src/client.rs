//! Remote credential-exchange contract consumed by the orchestrator.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::challenge::ChallengeResolver;
use crate::error::AuthError;
use crate::host::HostAddress;
use crate::identity::IdentityRecord;

/// Opaque application token returned by a successful credential exchange.
///
/// Never written to the identity cache; whether it is persisted at all is a
/// [`TokenPersistence`](crate::config::TokenPersistence) policy decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationAuthorization {
    pub token: String,
    pub scopes: Option<Vec<String>>,
}

impl ApplicationAuthorization {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            scopes: None,
        }
    }
}

/// Client performing the actual credential exchange against one remote host.
///
/// `exchange_credentials` receives a [`ChallengeResolver`] rather than the
/// interactive handler itself, and may call back into it zero or more times:
/// once when the host first demands a one-time code, and again for every code
/// the host rejects. A resolver cancellation must abort the exchange with
/// [`AuthError::Cancelled`].
#[async_trait]
pub trait RemoteAuthClient: Send + Sync {
    async fn exchange_credentials(
        &self,
        username: &str,
        secret: &str,
        resolver: &dyn ChallengeResolver,
    ) -> Result<ApplicationAuthorization, AuthError>;

    /// Fetch the authenticated user's profile with the exchanged token.
    async fn fetch_identity(
        &self,
        authorization: &ApplicationAuthorization,
    ) -> Result<IdentityRecord, AuthError>;
}

/// Mints a [`RemoteAuthClient`] for a host the registry has not seen before.
pub trait AuthClientFactory: Send + Sync {
    fn create(&self, host: &HostAddress) -> Arc<dyn RemoteAuthClient>;
}
