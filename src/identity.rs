use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Cached representation of the authenticated user's profile.
///
/// Produced by [`RemoteAuthClient::fetch_identity`](crate::client::RemoteAuthClient::fetch_identity)
/// and owned by the [`IdentityCache`](crate::cache::IdentityCache) once
/// persisted. `raw` keeps the attributes the remote returned that the typed
/// fields do not cover.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityRecord {
    pub login: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub is_enterprise: bool,
    #[serde(default)]
    pub raw: Map<String, Value>,
}

impl IdentityRecord {
    /// Minimal record with just a login, for hosts that return nothing else.
    pub fn new(login: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            display_name: None,
            avatar_url: None,
            is_enterprise: false,
            raw: Map::new(),
        }
    }
}
