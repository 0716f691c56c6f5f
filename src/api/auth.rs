//! Credential storage for the access/refresh token pair.
//!
//! The pair is always written as a single unit so a reader never sees a new
//! access token next to a stale refresh token. Backends:
//! - `FileStore`: JSON document in the user config directory (default)
//! - `KeychainStore`: one OS keychain entry holding the serialized pair

use std::fs;
use std::io::Write;
use std::path::PathBuf;

use keyring::Entry;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Keychain service name for the stored session.
const SERVICE_NAME: &str = "pharma-inventory";

/// Keychain username under which the serialized pair is kept.
const CREDENTIALS_KEY: &str = "credentials";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Credential file I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("Stored credentials are corrupt: {0}")]
    Corrupt(String),
    #[error("Keychain operation failed: {0}")]
    Keychain(String),
}

impl From<keyring::Error> for StoreError {
    fn from(err: keyring::Error) -> Self {
        StoreError::Keychain(err.to_string())
    }
}

/// Access and refresh token as persisted under `accessToken` / `refreshToken`.
///
/// Both strings are zeroed when the pair is dropped.
#[derive(Clone, PartialEq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(rename_all = "camelCase")]
pub struct CredentialPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl CredentialPair {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
        }
    }

    /// A pair missing either half counts as no session at all.
    pub fn is_complete(&self) -> bool {
        !self.access_token.is_empty() && !self.refresh_token.is_empty()
    }
}

impl std::fmt::Debug for CredentialPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialPair")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .finish()
    }
}

/// Durable storage for the current session's token pair.
pub trait CredentialStore: Send + Sync {
    /// Current pair, or `None` when unauthenticated.
    fn load(&self) -> Result<Option<CredentialPair>, StoreError>;

    /// Replace the stored pair. Either both tokens are written or neither.
    fn save(&self, pair: &CredentialPair) -> Result<(), StoreError>;

    /// Remove the stored pair. Idempotent.
    fn clear(&self) -> Result<(), StoreError>;
}

fn decode_pair(raw: &str) -> Result<Option<CredentialPair>, StoreError> {
    let pair: CredentialPair =
        serde_json::from_str(raw).map_err(|e| StoreError::Corrupt(e.to_string()))?;
    Ok(Some(pair).filter(CredentialPair::is_complete))
}

fn encode_pair(pair: &CredentialPair) -> Result<String, StoreError> {
    serde_json::to_string(pair).map_err(|e| StoreError::Corrupt(e.to_string()))
}

// ── File Store ────────────────────────────────────────────────────────────────

/// JSON file backend. Writes go to a sibling temp file that is renamed over
/// the target, so the pair is replaced atomically.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "credentials.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl CredentialStore for FileStore {
    fn load(&self) -> Result<Option<CredentialPair>, StoreError> {
        let mut raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let pair = decode_pair(&raw);
        raw.zeroize();
        pair
    }

    fn save(&self, pair: &CredentialPair) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut encoded = encode_pair(pair)?;
        let tmp = self.temp_path();
        let written = (|| -> std::io::Result<()> {
            let mut file = fs::File::create(&tmp)?;
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                file.set_permissions(fs::Permissions::from_mode(0o600))?;
            }
            file.write_all(encoded.as_bytes())?;
            file.sync_all()?;
            fs::rename(&tmp, &self.path)
        })();
        encoded.zeroize();

        if let Err(e) = written {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }
        log::debug!("Credentials written to {}", self.path.display());
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

// ── Keychain Store ────────────────────────────────────────────────────────────

/// OS keychain backend. The pair lives in a single entry, so one
/// `set_password` call replaces both tokens.
pub struct KeychainStore {
    service: String,
}

impl KeychainStore {
    pub fn new() -> Self {
        Self {
            service: SERVICE_NAME.to_string(),
        }
    }

    fn entry(&self) -> Result<Entry, StoreError> {
        Ok(Entry::new(&self.service, CREDENTIALS_KEY)?)
    }
}

impl Default for KeychainStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialStore for KeychainStore {
    fn load(&self) -> Result<Option<CredentialPair>, StoreError> {
        match self.entry()?.get_password() {
            Ok(mut raw) => {
                let pair = decode_pair(&raw);
                raw.zeroize();
                pair
            }
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(StoreError::from(e)),
        }
    }

    fn save(&self, pair: &CredentialPair) -> Result<(), StoreError> {
        let mut encoded = encode_pair(pair)?;
        let result = self.entry()?.set_password(&encoded);
        encoded.zeroize();
        result.map_err(StoreError::from)
    }

    fn clear(&self) -> Result<(), StoreError> {
        match self.entry()?.delete_credential() {
            Ok(()) => Ok(()),
            Err(keyring::Error::NoEntry) => Ok(()), // Already deleted, idempotent
            Err(e) => Err(StoreError::from(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::MemoryStore;

    #[test]
    fn test_file_store_roundtrip_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("nested").join("credentials.json"));

        assert!(store.load().unwrap().is_none());

        store.save(&CredentialPair::new("access-1", "refresh-1")).unwrap();
        let pair = store.load().unwrap().unwrap();
        assert_eq!(pair.access_token, "access-1");
        assert_eq!(pair.refresh_token, "refresh-1");

        // Overwrite replaces both halves
        store.save(&CredentialPair::new("access-2", "refresh-2")).unwrap();
        assert_eq!(store.load().unwrap().unwrap(), CredentialPair::new("access-2", "refresh-2"));
        assert!(!store.temp_path().exists());

        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
        // Idempotent
        store.clear().unwrap();
    }

    #[test]
    fn test_file_store_uses_camel_case_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        let store = FileStore::new(&path);
        store.save(&CredentialPair::new("a", "r")).unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"accessToken\":\"a\""));
        assert!(raw.contains("\"refreshToken\":\"r\""));
    }

    #[test]
    fn test_file_store_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        fs::write(&path, "{not json").unwrap();

        let store = FileStore::new(&path);
        assert!(matches!(store.load(), Err(StoreError::Corrupt(_))));
    }

    #[test]
    fn test_incomplete_pair_is_unauthenticated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        fs::write(&path, r#"{"accessToken":"a","refreshToken":""}"#).unwrap();

        assert!(FileStore::new(&path).load().unwrap().is_none());
        assert!(MemoryStore::with_pair(CredentialPair::new("a", "")).load().unwrap().is_none());
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryStore::new();
        assert!(store.load().unwrap().is_none());
        store.save(&CredentialPair::new("a", "r")).unwrap();
        assert_eq!(store.load().unwrap().unwrap().access_token, "a");
        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_debug_redacts_tokens() {
        let rendered = format!("{:?}", CredentialPair::new("secret-access", "secret-refresh"));
        assert!(!rendered.contains("secret"));
    }
}
