use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use keyring::{Entry, Error as KeyringError};

pub const KEY_AUTH_TOKEN: &str = "auth_token";
pub const KEY_USER_EMAIL: &str = "user_email";
pub const KEY_REFRESH_TOKEN: &str = "refresh_token";

const SESSION_KEYS: [&str; 3] = [KEY_AUTH_TOKEN, KEY_USER_EMAIL, KEY_REFRESH_TOKEN];

/// Session storage backed by the system keyring
#[derive(Clone)]
pub struct KeyringStore {
    service: String,
}

impl KeyringStore {
    pub fn new() -> Self {
        Self {
            service: "mailcaster-session".to_string(),
        }
    }

    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        let entry = Entry::new(&self.service, key)
            .context("Failed to create keyring entry")?;
        entry
            .set_password(value)
            .context("Failed to store session value in keyring")?;

        log::debug!("Session value stored in keyring ({})", key);
        Ok(())
    }

    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let entry = Entry::new(&self.service, key)
            .context("Failed to create keyring entry")?;

        match entry.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(KeyringError::NoEntry) => Ok(None),
            Err(e) => Err(anyhow::anyhow!("Failed to read session value: {}", e)),
        }
    }

    pub fn delete(&self, key: &str) -> Result<()> {
        let entry = Entry::new(&self.service, key)
            .context("Failed to create keyring entry")?;

        match entry.delete_password() {
            Ok(()) => Ok(()),
            // Value doesn't exist, that's fine
            Err(KeyringError::NoEntry) => Ok(()),
            Err(e) => Err(anyhow::anyhow!("Failed to delete session value: {}", e)),
        }
    }

    /// Check if the system keyring is usable on this machine
    pub fn is_available() -> bool {
        if let Ok(entry) = Entry::new("mailcaster-session-test", "probe") {
            if entry.set_password("probe").is_ok() {
                let _ = entry.delete_password();
                return true;
            }
        }
        false
    }
}

/// Fallback session storage for systems without keyring support: a single
/// JSON document in the config directory, rewritten whole on every change
/// so logout clears all keys in one write.
#[derive(Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new() -> Result<Self> {
        let dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("mailcaster");

        std::fs::create_dir_all(&dir).context("Failed to create session directory")?;

        Ok(Self {
            path: dir.join("session.json"),
        })
    }

    pub fn at(path: PathBuf) -> Self {
        Self { path }
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }

        let content =
            std::fs::read_to_string(&self.path).context("Failed to read session file")?;
        let map = serde_json::from_str(&content).context("Failed to parse session file")?;
        Ok(map)
    }

    fn write_all(&self, map: &BTreeMap<String, String>) -> Result<()> {
        let content = serde_json::to_string_pretty(map)?;
        std::fs::write(&self.path, content).context("Failed to write session file")?;
        Ok(())
    }

    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut map = self.read_all()?;
        map.insert(key.to_string(), value.to_string());
        self.write_all(&map)?;

        log::warn!("Session value stored in plain file ({})", key);
        log::warn!("Note: for better security, install GNOME Keyring or similar");
        Ok(())
    }

    pub fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.read_all()?.get(key).cloned())
    }

    pub fn delete(&self, key: &str) -> Result<()> {
        let mut map = self.read_all()?;
        if map.remove(key).is_some() {
            self.write_all(&map)?;
        }
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        self.write_all(&BTreeMap::new())
    }
}

/// Unified session store that tries the system keyring first, then falls
/// back to the file store.
#[derive(Clone)]
pub enum SessionStore {
    SystemKeyring(KeyringStore),
    Fallback(FileStore),
}

impl SessionStore {
    pub fn new() -> Result<Self> {
        if KeyringStore::is_available() {
            Ok(Self::SystemKeyring(KeyringStore::new()))
        } else {
            Ok(Self::Fallback(FileStore::new()?))
        }
    }

    /// A store rooted at an explicit file, for tests and scripting.
    pub fn file_at(path: PathBuf) -> Self {
        Self::Fallback(FileStore::at(path))
    }

    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        match self {
            Self::SystemKeyring(store) => store.set(key, value),
            Self::Fallback(store) => store.set(key, value),
        }
    }

    pub fn get(&self, key: &str) -> Result<Option<String>> {
        match self {
            Self::SystemKeyring(store) => store.get(key),
            Self::Fallback(store) => store.get(key),
        }
    }

    /// Remove all session keys. The token goes first so access is revoked
    /// even if a later delete fails.
    pub fn clear(&self) -> Result<()> {
        match self {
            Self::SystemKeyring(store) => {
                for key in SESSION_KEYS {
                    store.delete(key)?;
                }
                Ok(())
            }
            Self::Fallback(store) => store.clear(),
        }
    }

    pub fn set_token(&self, token: &str) -> Result<()> {
        self.set(KEY_AUTH_TOKEN, token)
    }

    pub fn token(&self) -> Option<String> {
        self.get(KEY_AUTH_TOKEN).ok().flatten()
    }

    pub fn set_user_email(&self, email: &str) -> Result<()> {
        self.set(KEY_USER_EMAIL, email)
    }

    pub fn user_email(&self) -> Option<String> {
        self.get(KEY_USER_EMAIL).ok().flatten()
    }

    pub fn set_refresh_token(&self, token: &str) -> Result<()> {
        self.set(KEY_REFRESH_TOKEN, token)
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.get(KEY_REFRESH_TOKEN).ok().flatten()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token().is_some()
    }

    /// `Authorization` header value, present only when a token is stored.
    pub fn auth_header(&self) -> Option<String> {
        self.token().map(|t| format!("Bearer {}", t))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store(dir: &tempfile::TempDir) -> SessionStore {
        SessionStore::file_at(dir.path().join("session.json"))
    }

    #[test]
    fn empty_store_has_no_session() {
        let dir = tempfile::tempdir().unwrap();
        let store = temp_store(&dir);

        assert!(!store.is_authenticated());
        assert_eq!(store.token(), None);
        assert_eq!(store.auth_header(), None);
    }

    #[test]
    fn login_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = temp_store(&dir);

        store.set_token("tok-123").unwrap();
        store.set_user_email("user@example.com").unwrap();
        store.set_refresh_token("refresh-456").unwrap();

        assert!(store.is_authenticated());
        assert_eq!(store.token().as_deref(), Some("tok-123"));
        assert_eq!(store.user_email().as_deref(), Some("user@example.com"));
        assert_eq!(store.refresh_token().as_deref(), Some("refresh-456"));
        assert_eq!(store.auth_header().as_deref(), Some("Bearer tok-123"));
    }

    #[test]
    fn clear_removes_every_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = temp_store(&dir);

        store.set_token("tok").unwrap();
        store.set_user_email("user@example.com").unwrap();
        store.clear().unwrap();

        assert!(!store.is_authenticated());
        assert_eq!(store.user_email(), None);
        assert_eq!(store.refresh_token(), None);
    }

    #[test]
    fn values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        SessionStore::file_at(path.clone())
            .set_token("persisted")
            .unwrap();

        let reopened = SessionStore::file_at(path);
        assert_eq!(reopened.token().as_deref(), Some("persisted"));
    }
}
