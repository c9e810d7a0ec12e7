//! Local auth store
//!
//! Persists the token + user pair outside the session framework, the way a
//! browser keeps them in local storage. Backends are plain key/value maps;
//! the store always writes and clears both keys together.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};
use tracing::{debug, warn};

use crate::error::Result;
use crate::models::{LocalAuthRecord, UserProfile};

/// Key holding the bearer token
pub const TOKEN_KEY: &str = "token";
/// Key holding the JSON-encoded user profile
pub const USER_KEY: &str = "user";

/// Key/value persistence backend
pub trait AuthStorage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write all entries in one step.
    fn set_many(&self, entries: &[(&str, &str)]) -> Result<()>;

    /// Remove all keys in one step.
    fn remove_many(&self, keys: &[&str]) -> Result<()>;
}

/// In-process storage
#[derive(Default)]
pub struct MemoryStorage {
    entries: RwLock<BTreeMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AuthStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        Ok(entries.get(key).cloned())
    }

    fn set_many(&self, items: &[(&str, &str)]) -> Result<()> {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        for (key, value) in items {
            entries.insert((*key).to_string(), (*value).to_string());
        }
        Ok(())
    }

    fn remove_many(&self, keys: &[&str]) -> Result<()> {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        for key in keys {
            entries.remove(*key);
        }
        Ok(())
    }
}

/// JSON map on disk, replaced atomically (temp file + rename) on every write
pub struct FileStorage {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> Result<BTreeMap<String, String>> {
        match fs::read(&self.path) {
            Ok(bytes) if bytes.is_empty() => Ok(BTreeMap::new()),
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(map) => Ok(map),
                Err(e) => {
                    warn!(
                        "Auth storage at {} is corrupt, starting empty: {}",
                        self.path.display(),
                        e
                    );
                    Ok(BTreeMap::new())
                }
            },
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_map(&self, map: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(map)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl AuthStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        Ok(self.read_map()?.remove(key))
    }

    fn set_many(&self, entries: &[(&str, &str)]) -> Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut map = self.read_map()?;
        for (key, value) in entries {
            map.insert((*key).to_string(), (*value).to_string());
        }
        self.write_map(&map)
    }

    fn remove_many(&self, keys: &[&str]) -> Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut map = self.read_map()?;
        let before = map.len();
        for key in keys {
            map.remove(*key);
        }
        if map.len() == before {
            return Ok(());
        }
        self.write_map(&map)
    }
}

/// Token + user pair on top of an [`AuthStorage`] backend.
#[derive(Clone)]
pub struct LocalAuthStore {
    storage: Arc<dyn AuthStorage>,
}

impl LocalAuthStore {
    pub fn new(storage: Arc<dyn AuthStorage>) -> Self {
        Self { storage }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::new()))
    }

    /// Read the persisted record.
    ///
    /// Half-written or unparsable records are purged and reported as absent.
    pub fn load(&self) -> Result<Option<LocalAuthRecord>> {
        let token = self.storage.get(TOKEN_KEY)?;
        let user = self.storage.get(USER_KEY)?;

        let (token, user) = match (token, user) {
            (None, None) => return Ok(None),
            (Some(token), Some(user)) => (token, user),
            _ => {
                warn!("Partial auth record in storage, discarding");
                self.clear()?;
                return Ok(None);
            }
        };

        let profile = match serde_json::from_str::<UserProfile>(&user) {
            Ok(profile) => profile,
            Err(e) => {
                warn!("Stored user profile is unreadable, discarding: {}", e);
                self.clear()?;
                return Ok(None);
            }
        };

        match LocalAuthRecord::new(&token, Some(profile)) {
            Some(record) => Ok(Some(record)),
            None => {
                self.clear()?;
                Ok(None)
            }
        }
    }

    /// Persist both halves of `record` together.
    pub fn save(&self, record: &LocalAuthRecord) -> Result<()> {
        let user = serde_json::to_string(&record.user)?;
        self.storage
            .set_many(&[(TOKEN_KEY, record.token.as_str()), (USER_KEY, user.as_str())])?;
        debug!(user_id = %record.user.id, "Persisted local auth record");
        Ok(())
    }

    /// Remove both halves unconditionally.
    pub fn clear(&self) -> Result<()> {
        self.storage.remove_many(&[TOKEN_KEY, USER_KEY])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserType;

    fn record() -> LocalAuthRecord {
        LocalAuthRecord {
            token: "jwt-abc".to_string(),
            user: UserProfile {
                id: "5".to_string(),
                email: None,
                mobile_no: Some("+4791234567".to_string()),
                kind: UserType::Employee,
                user_type: None,
                company_id: None,
            },
        }
    }

    #[test]
    fn test_memory_roundtrip_and_clear() {
        let store = LocalAuthStore::in_memory();
        assert!(store.load().unwrap().is_none());

        store.save(&record()).unwrap();
        assert_eq!(store.load().unwrap(), Some(record()));

        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_partial_record_is_purged() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set_many(&[(TOKEN_KEY, "jwt-abc")]).unwrap();

        let store = LocalAuthStore::new(storage.clone());
        assert!(store.load().unwrap().is_none());
        assert!(storage.get(TOKEN_KEY).unwrap().is_none());
    }

    #[test]
    fn test_unreadable_user_is_purged() {
        let storage = Arc::new(MemoryStorage::new());
        storage
            .set_many(&[(TOKEN_KEY, "jwt-abc"), (USER_KEY, "{not json")])
            .unwrap();

        let store = LocalAuthStore::new(storage.clone());
        assert!(store.load().unwrap().is_none());
        assert!(storage.get(USER_KEY).unwrap().is_none());
    }

    #[test]
    fn test_file_storage_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("auth.json");

        LocalAuthStore::new(Arc::new(FileStorage::new(&path)))
            .save(&record())
            .unwrap();
        assert!(path.exists());

        let reopened = LocalAuthStore::new(Arc::new(FileStorage::new(&path)));
        assert_eq!(reopened.load().unwrap(), Some(record()));

        reopened.clear().unwrap();
        let again = LocalAuthStore::new(Arc::new(FileStorage::new(&path)));
        assert!(again.load().unwrap().is_none());
    }

    #[test]
    fn test_file_storage_keeps_unrelated_keys() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(FileStorage::new(dir.path().join("auth.json")));
        storage.set_many(&[("crewdeck.session-token", "cookie")]).unwrap();

        let store = LocalAuthStore::new(storage.clone());
        store.save(&record()).unwrap();
        store.clear().unwrap();

        assert_eq!(
            storage.get("crewdeck.session-token").unwrap().as_deref(),
            Some("cookie")
        );
    }

    #[test]
    fn test_corrupt_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("auth.json");
        std::fs::write(&path, b"garbage").unwrap();

        let store = LocalAuthStore::new(Arc::new(FileStorage::new(&path)));
        assert!(store.load().unwrap().is_none());
    }
}
