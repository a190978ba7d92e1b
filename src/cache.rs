use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AuthError;
use crate::host::HostAddress;
use crate::identity::IdentityRecord;
use crate::store::write_atomic;

/// Logical key under which the authenticated user's record is cached. A new
/// login overwrites the entry, never appends.
pub const USER_CACHE_KEY: &str = "user";

/// Durable per-host cache of the authenticated user's identity.
pub trait IdentityCache: Send + Sync {
    fn load(&self, host: &HostAddress) -> Result<Option<IdentityRecord>, AuthError>;
    fn save(&self, host: &HostAddress, identity: &IdentityRecord) -> Result<(), AuthError>;
    fn clear(&self, host: &HostAddress) -> Result<(), AuthError>;
}

/// File-backed identity cache keeping one JSON document per host.
///
/// Identity records carry arbitrary remote attributes in their `raw` map, so
/// they are stored as JSON rather than TOML.
#[derive(Debug, Clone)]
pub struct FileIdentityCache {
    base_dir: PathBuf,
}

impl FileIdentityCache {
    pub fn new(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    pub fn new_default() -> Self {
        Self {
            base_dir: crate::config::default_storage_dir(),
        }
    }

    fn entry_path(&self, host: &HostAddress) -> PathBuf {
        self.base_dir
            .join(host.storage_key())
            .join(format!("{USER_CACHE_KEY}.json"))
    }
}

impl IdentityCache for FileIdentityCache {
    fn load(&self, host: &HostAddress) -> Result<Option<IdentityRecord>, AuthError> {
        let path = self.entry_path(host);
        let raw = match fs::read_to_string(&path) {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(AuthError::Storage(err.to_string())),
        };
        let entry: IdentityEntry = serde_json::from_str(&raw)?;
        Ok(Some(entry.identity))
    }

    fn save(&self, host: &HostAddress, identity: &IdentityRecord) -> Result<(), AuthError> {
        let path = self.entry_path(host);
        let entry = IdentityEntry {
            version: 1,
            host: host.clone(),
            identity: identity.clone(),
            saved_at: Utc::now(),
        };
        let serialized = serde_json::to_string_pretty(&entry)?;
        write_atomic(&path, serialized.as_bytes())?;
        Ok(())
    }

    fn clear(&self, host: &HostAddress) -> Result<(), AuthError> {
        let path = self.entry_path(host);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(AuthError::Storage(err.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct IdentityEntry {
    version: u32,
    host: HostAddress,
    identity: IdentityRecord,
    saved_at: DateTime<Utc>,
}
