use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::AuthError;

/// Canonical host name for the public service.
pub const PUBLIC_HOST: &str = "github.com";

/// Canonical identifier for a remote host a user can authenticate against.
///
/// Equality and hashing are value-based on the canonical lowercase host name,
/// so `HostAddress` is used as the routing and storage key everywhere.
///
/// # Example
/// ```
/// use hubauth::host::HostAddress;
///
/// let public = HostAddress::parse("https://GitHub.com/owner/repo")?;
/// assert_eq!(public, HostAddress::public());
///
/// let enterprise = HostAddress::parse("ghe.example.corp")?;
/// assert!(enterprise.is_enterprise());
/// # Ok::<(), hubauth::error::AuthError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HostAddress(String);

impl HostAddress {
    /// The public service host.
    pub fn public() -> Self {
        Self(PUBLIC_HOST.to_string())
    }

    /// Canonicalize a URL or bare host name into a `HostAddress`.
    ///
    /// Accepts `https://host/path`, `host:port`, or a bare name; the scheme,
    /// path, port, and a leading `www.` are stripped and the rest lowercased.
    pub fn parse(input: &str) -> Result<Self, AuthError> {
        let trimmed = input.trim();
        let without_scheme = trimmed
            .split_once("://")
            .map(|(_, rest)| rest)
            .unwrap_or(trimmed);
        let without_path = without_scheme
            .split(['/', '?', '#'])
            .next()
            .unwrap_or_default();
        let without_port = without_path.split(':').next().unwrap_or_default();
        let host = without_port
            .trim_start_matches("www.")
            .trim_matches('.')
            .to_ascii_lowercase();
        if host.is_empty() || !host.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.') {
            return Err(AuthError::InvalidHost(input.to_string()));
        }
        Ok(Self(host))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_public(&self) -> bool {
        self.0 == PUBLIC_HOST
    }

    /// Enterprise instances are everything that is not the public host.
    pub fn is_enterprise(&self) -> bool {
        !self.is_public()
    }

    /// Base URL of the host's REST API.
    ///
    /// The public host serves its API from a dedicated subdomain; enterprise
    /// instances serve it under `/api/v3` on the host itself.
    pub fn api_base(&self) -> String {
        if self.is_public() {
            "https://api.github.com".to_string()
        } else {
            format!("https://{}/api/v3", self.0)
        }
    }

    /// File-system safe key used by the on-disk stores.
    pub fn storage_key(&self) -> String {
        self.0
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '.' {
                    c
                } else {
                    '-'
                }
            })
            .collect()
    }
}

impl fmt::Display for HostAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
