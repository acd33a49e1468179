//! Persisted session state.
//!
//! The access token is the only piece of client state that survives a
//! restart. It lives behind the `SessionStore` trait so the HTTP layer and
//! the auth manager receive it by injection rather than reaching for a
//! process-wide global, and so tests can substitute an in-memory fake.
//! Invariant: a store holding a non-empty token means "authenticated";
//! anything else means "unauthenticated".

use crate::errors::ClientError;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

pub trait SessionStore: Send + Sync {
    /// Current access token, if any. Whitespace-only values count as absent.
    fn token(&self) -> Option<String>;
    fn set_token(&self, token: &str) -> Result<(), ClientError>;
    fn clear(&self) -> Result<(), ClientError>;
}

/// Token persisted as a single-line file under the user config directory,
/// surviving restarts the way browser local storage survives reloads.
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn default_path() -> Result<PathBuf, ClientError> {
        let config_dir = dirs::config_dir()
            .or_else(|| dirs::home_dir().map(|h| h.join(".config")))
            .ok_or_else(|| {
                ClientError::ConfigError("Could not determine a config directory".to_string())
            })?;
        Ok(config_dir.join("tarea").join("token"))
    }
}

impl SessionStore for FileSessionStore {
    fn token(&self) -> Option<String> {
        fs::read_to_string(&self.path)
            .ok()
            .map(|raw| raw.trim().to_string())
            .filter(|token| !token.is_empty())
    }

    fn set_token(&self, token: &str) -> Result<(), ClientError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, token)?;
        log::debug!("Stored access token at {}", self.path.display());
        Ok(())
    }

    fn clear(&self) -> Result<(), ClientError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

/// In-memory store for tests and ephemeral sessions.
#[derive(Default)]
pub struct MemorySessionStore {
    token: Mutex<Option<String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: &str) -> Self {
        Self {
            token: Mutex::new(Some(token.to_string())),
        }
    }
}

impl SessionStore for MemorySessionStore {
    fn token(&self) -> Option<String> {
        self.token
            .lock()
            .unwrap()
            .as_ref()
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty())
    }

    fn set_token(&self, token: &str) -> Result<(), ClientError> {
        *self.token.lock().unwrap() = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<(), ClientError> {
        *self.token.lock().unwrap() = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_store_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = FileSessionStore::new(dir.path().join("token"));

        assert_eq!(store.token(), None);
        store.set_token("T1").unwrap();
        assert_eq!(store.token(), Some("T1".to_string()));
        store.clear().unwrap();
        assert_eq!(store.token(), None);
    }

    #[test]
    fn test_file_store_creates_parent_dirs() {
        let dir = TempDir::new().unwrap();
        let store = FileSessionStore::new(dir.path().join("nested/deeper/token"));
        store.set_token("T1").unwrap();
        assert_eq!(store.token(), Some("T1".to_string()));
    }

    #[test]
    fn test_file_store_clear_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = FileSessionStore::new(dir.path().join("token"));
        store.clear().unwrap();
        store.clear().unwrap();
    }

    #[test]
    fn test_whitespace_token_counts_as_absent() {
        let store = MemorySessionStore::new();
        store.set_token("   ").unwrap();
        assert_eq!(store.token(), None);
    }

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemorySessionStore::with_token("T1");
        assert_eq!(store.token(), Some("T1".to_string()));
        store.clear().unwrap();
        assert_eq!(store.token(), None);
    }
}
