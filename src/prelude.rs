//! Convenience re-exports for the common entry points.

pub use crate::cache::{FileIdentityCache, IdentityCache};
pub use crate::challenge::{
    ChallengeCancelled, ChallengeContext, ChallengeHandler, ChallengeReason, ChallengeResult,
    NonInteractiveHandler, OtpDelivery,
};
pub use crate::client::{ApplicationAuthorization, AuthClientFactory, RemoteAuthClient};
pub use crate::config::{HubAuthConfig, LoginPolicy, TokenPersistence};
pub use crate::error::AuthError;
pub use crate::host::HostAddress;
pub use crate::http::{HttpAuthClient, HttpAuthClientFactory};
pub use crate::identity::IdentityRecord;
pub use crate::orchestrator::{AuthOrchestrator, AuthState, LoginOutcome};
pub use crate::registry::HostRegistry;
pub use crate::store::{Credential, CredentialStore, FileCredentialStore};
