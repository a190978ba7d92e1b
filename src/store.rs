use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AuthError;
use crate::host::HostAddress;

/// Username/secret pair for one host, with the exchanged token when the
/// persistence policy keeps it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credential {
    pub username: String,
    pub secret: String,
    pub token: Option<String>,
}

impl Credential {
    pub fn new(username: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            secret: secret.into(),
            token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }
}

/// Durable storage for per-host credentials. Survives process restarts.
///
/// Failures surface as [`AuthError::Storage`]; the orchestrator never
/// swallows them.
pub trait CredentialStore: Send + Sync {
    fn load(&self, host: &HostAddress) -> Result<Option<Credential>, AuthError>;
    fn save(&self, host: &HostAddress, credential: &Credential) -> Result<(), AuthError>;
    fn clear(&self, host: &HostAddress) -> Result<(), AuthError>;
}

/// File-backed credential store using one TOML file per host.
///
/// # Example
/// ```no_run
/// use hubauth::host::HostAddress;
/// use hubauth::store::{Credential, CredentialStore, FileCredentialStore};
///
/// let store = FileCredentialStore::new_default();
/// let host = HostAddress::public();
/// store.save(&host, &Credential::new("aUsername", "aPassword"))?;
/// # Ok::<(), hubauth::error::AuthError>(())
/// ```
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    base_dir: PathBuf,
}

impl FileCredentialStore {
    pub fn new(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    pub fn new_default() -> Self {
        Self {
            base_dir: crate::config::default_storage_dir(),
        }
    }

    fn credential_path(&self, host: &HostAddress) -> PathBuf {
        self.base_dir
            .join(format!("{}.credential.toml", host.storage_key()))
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self, host: &HostAddress) -> Result<Option<Credential>, AuthError> {
        let path = self.credential_path(host);
        let raw = match fs::read_to_string(&path) {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(AuthError::Storage(err.to_string())),
        };
        let file: CredentialFile = toml::from_str(&raw)?;
        Ok(Some(file.credential))
    }

    fn save(&self, host: &HostAddress, credential: &Credential) -> Result<(), AuthError> {
        let path = self.credential_path(host);
        let file = CredentialFile {
            version: 1,
            host: host.clone(),
            credential: credential.clone(),
            saved_at: Utc::now(),
        };
        let serialized = toml::to_string(&file)?;
        write_atomic(&path, serialized.as_bytes())?;
        Ok(())
    }

    fn clear(&self, host: &HostAddress) -> Result<(), AuthError> {
        let path = self.credential_path(host);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(AuthError::Storage(err.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CredentialFile {
    version: u32,
    host: HostAddress,
    credential: Credential,
    saved_at: DateTime<Utc>,
}

/// Write via a sibling temp file plus rename so a concurrent reader never
/// observes a half-written record.
pub(crate) fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), AuthError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, contents)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&tmp, fs::Permissions::from_mode(0o600))?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_store() -> (TempDir, FileCredentialStore) {
        let dir = TempDir::new().unwrap();
        let store = FileCredentialStore::new(dir.path().to_path_buf());
        (dir, store)
    }

    #[test]
    fn credential_round_trip_works() {
        let (_dir, store) = temp_store();
        let host = HostAddress::public();
        let credential = Credential::new("aUsername", "aPassword").with_token("S3CR3TS");
        store.save(&host, &credential).unwrap();
        let loaded = store.load(&host).unwrap().unwrap();
        assert_eq!(loaded.username, "aUsername");
        assert_eq!(loaded.secret, "aPassword");
        assert_eq!(loaded.token.as_deref(), Some("S3CR3TS"));
    }

    #[test]
    fn load_missing_returns_none() {
        let (_dir, store) = temp_store();
        let loaded = store.load(&HostAddress::public()).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn clear_removes_credential() {
        let (_dir, store) = temp_store();
        let host = HostAddress::parse("ghe.example.corp").unwrap();
        store.save(&host, &Credential::new("user", "pass")).unwrap();
        store.clear(&host).unwrap();
        assert!(store.load(&host).unwrap().is_none());
    }

    #[test]
    fn clear_is_idempotent() {
        let (_dir, store) = temp_store();
        store.clear(&HostAddress::public()).unwrap();
        store.clear(&HostAddress::public()).unwrap();
    }

    #[test]
    fn hosts_are_stored_independently() {
        let (_dir, store) = temp_store();
        let public = HostAddress::public();
        let enterprise = HostAddress::parse("ghe.example.corp").unwrap();
        store.save(&public, &Credential::new("a", "1")).unwrap();
        store.save(&enterprise, &Credential::new("b", "2")).unwrap();
        store.clear(&public).unwrap();
        assert!(store.load(&public).unwrap().is_none());
        assert_eq!(store.load(&enterprise).unwrap().unwrap().username, "b");
    }

    #[cfg(unix)]
    #[test]
    fn credential_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;
        let (dir, store) = temp_store();
        let host = HostAddress::public();
        store.save(&host, &Credential::new("user", "pass")).unwrap();
        let path = dir.path().join("github.com.credential.toml");
        let mode = std::fs::metadata(path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
