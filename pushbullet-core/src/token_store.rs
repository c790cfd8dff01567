//! Credential persistence.
//!
//! The credential file holds the JSON form of [`PersistedCredential`],
//! base64-encoded. Reading and writing never fail loudly: a missing or broken
//! file just means "not logged in".

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD, Engine};

use crate::auth::AuthorizedHook;
use crate::session::PersistedCredential;

/// File name used when no explicit path is configured.
pub const DEFAULT_FILE_NAME: &str = "pbdata";

/// Loads and saves the credential file at a fixed path.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Store located next to the running executable.
    pub fn beside_executable() -> Self {
        let dir = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
            .unwrap_or_else(|| PathBuf::from("."));
        Self::new(dir.join(DEFAULT_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Reads the stored credential.
    ///
    /// Returns `None` if the file is absent, unreadable or malformed.
    pub fn load(&self) -> Option<PersistedCredential> {
        match self.try_load() {
            Ok(credential) => credential,
            Err(e) => {
                tracing::debug!("Ignoring credential file {}: {}", self.path.display(), e);
                None
            }
        }
    }

    /// Writes the credential, replacing any previous one.
    ///
    /// Errors are logged and otherwise ignored.
    pub fn save(&self, credential: &PersistedCredential) {
        match self.try_save(credential) {
            Ok(()) => tracing::debug!("Saved credential to {}", self.path.display()),
            Err(e) => {
                tracing::warn!("Failed to save credential to {}: {}", self.path.display(), e)
            }
        }
    }

    /// Removes the credential file if there is one.
    pub fn clear(&self) -> io::Result<()> {
        match fs::remove_file(&self.path) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }

    fn try_load(&self) -> Result<Option<PersistedCredential>, StoreError> {
        let raw = match fs::read(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::Io(e)),
        };

        let trimmed: Vec<u8> = raw
            .into_iter()
            .filter(|b| !b.is_ascii_whitespace())
            .collect();
        let json = STANDARD
            .decode(trimmed)
            .map_err(|e| StoreError::Encoding(e.to_string()))?;
        let credential: PersistedCredential =
            serde_json::from_slice(&json).map_err(|e| StoreError::Encoding(e.to_string()))?;

        Ok(Some(credential))
    }

    fn try_save(&self, credential: &PersistedCredential) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(StoreError::Io)?;
            }
        }

        let json =
            serde_json::to_vec(credential).map_err(|e| StoreError::Encoding(e.to_string()))?;
        let encoded = STANDARD.encode(json);

        // Write beside the target and rename so a crash never leaves half a file.
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, encoded).map_err(StoreError::Io)?;
        fs::rename(&tmp, &self.path).map_err(StoreError::Io)?;

        Ok(())
    }
}

impl AuthorizedHook for TokenStore {
    fn on_authorized(&self, credential: &PersistedCredential) {
        self.save(credential);
    }
}

#[derive(Debug)]
enum StoreError {
    Io(io::Error),
    Encoding(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Io(e) => write!(f, "I/O error: {}", e),
            StoreError::Encoding(e) => write!(f, "invalid contents: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Device;
    use tempfile::TempDir;

    fn test_store() -> (TokenStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = TokenStore::new(temp_dir.path().join(DEFAULT_FILE_NAME));
        (store, temp_dir)
    }

    fn sample_credential() -> PersistedCredential {
        PersistedCredential {
            access_token: "o.0AGv7V5h1yrVo8p5yC3GdkBeOfY".to_string(),
            iden: "ujpah72o0".to_string(),
            name: "Ada Lovelace".to_string(),
            devices: vec![
                Device {
                    iden: "d1".to_string(),
                    nickname: "Phone".to_string(),
                    active: true,
                    has_sms: true,
                    pushable: true,
                    ..Default::default()
                },
                Device {
                    iden: "d2".to_string(),
                    nickname: "Laptop".to_string(),
                    active: true,
                    ..Default::default()
                },
            ],
        }
    }

    #[test]
    fn test_load_missing_file_returns_none() {
        let (store, _temp) = test_store();
        assert!(!store.exists());
        assert!(store.load().is_none());
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let (store, _temp) = test_store();
        let credential = sample_credential();

        store.save(&credential);
        assert!(store.exists());

        let loaded = store.load().unwrap();
        assert_eq!(loaded, credential);
    }

    #[test]
    fn test_file_contents_are_base64_json() {
        let (store, _temp) = test_store();
        store.save(&sample_credential());

        let raw = fs::read_to_string(store.path()).unwrap();
        let json = STANDARD.decode(raw.trim()).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&json).unwrap();

        assert_eq!(value["access_token"], "o.0AGv7V5h1yrVo8p5yC3GdkBeOfY");
        assert_eq!(value["iden"], "ujpah72o0");
        assert_eq!(value["name"], "Ada Lovelace");
        assert_eq!(value["devices"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_save_overwrites_previous() {
        let (store, _temp) = test_store();
        store.save(&sample_credential());

        let replacement = PersistedCredential {
            access_token: "o.other".to_string(),
            ..Default::default()
        };
        store.save(&replacement);

        assert_eq!(store.load().unwrap(), replacement);
        assert!(!store.path().with_extension("tmp").exists());
    }

    #[test]
    fn test_malformed_base64_is_ignored() {
        let (store, _temp) = test_store();
        fs::write(store.path(), "not base64 at all!!").unwrap();
        assert!(store.load().is_none());
    }

    #[test]
    fn test_malformed_json_is_ignored() {
        let (store, _temp) = test_store();
        fs::write(store.path(), STANDARD.encode("{\"access_token\": ")).unwrap();
        assert!(store.load().is_none());
    }

    #[test]
    fn test_missing_fields_default_to_empty() {
        let (store, _temp) = test_store();
        fs::write(store.path(), STANDARD.encode("{\"access_token\": \"tok\"}")).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.access_token, "tok");
        assert_eq!(loaded.iden, "");
        assert!(loaded.devices.is_empty());
    }

    #[test]
    fn test_save_creates_directory() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("dir").join("pbdata");
        let store = TokenStore::new(path.clone());

        store.save(&sample_credential());
        assert!(path.exists());
    }

    #[test]
    fn test_clear_removes_file() {
        let (store, _temp) = test_store();
        store.save(&sample_credential());

        store.clear().unwrap();
        assert!(!store.exists());

        // Clearing twice is fine
        store.clear().unwrap();
    }

    #[test]
    fn test_hook_persists_credential() {
        let (store, _temp) = test_store();
        store.on_authorized(&sample_credential());
        assert_eq!(store.load().unwrap().iden, "ujpah72o0");
    }
}
