//! Session persistence backends.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::{Session, SessionError, SessionResult};

/// Storage for the persisted session.
#[async_trait]
pub trait SessionBackend: Send + Sync {
    /// Load the stored session, if a complete one exists.
    async fn load(&self) -> SessionResult<Option<Session>>;

    /// Replace the stored session.
    async fn store(&self, session: &Session) -> SessionResult<()>;

    /// Remove the stored session. Must succeed when nothing is stored.
    async fn clear(&self) -> SessionResult<()>;
}

#[derive(Default)]
pub struct MemorySessionBackend {
    session: RwLock<Option<Session>>,
}

impl MemorySessionBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionBackend for MemorySessionBackend {
    async fn load(&self) -> SessionResult<Option<Session>> {
        Ok(self.session.read().await.clone())
    }

    async fn store(&self, session: &Session) -> SessionResult<()> {
        *self.session.write().await = Some(session.clone());
        Ok(())
    }

    async fn clear(&self) -> SessionResult<()> {
        self.session.write().await.take();
        Ok(())
    }
}

/// On-disk layout. The key names are fixed so that older session files
/// keep loading.
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredSession {
    #[serde(default)]
    jwt_token: Option<String>,
    #[serde(default)]
    user_id: Option<String>,
}

/// JSON file holding the token and user id.
pub struct FileSessionBackend {
    path: PathBuf,
}

impl FileSessionBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<config dir>/taskdeck/session.json`
    pub fn default_path() -> SessionResult<PathBuf> {
        let dir = dirs::config_dir().ok_or(SessionError::NoConfigDir)?;
        Ok(dir.join("taskdeck").join("session.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> SessionError {
        SessionError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

#[async_trait]
impl SessionBackend for FileSessionBackend {
    async fn load(&self) -> SessionResult<Option<Session>> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No session file");
                return Ok(None);
            }
            Err(e) => return Err(self.io_error(e)),
        };

        let stored: StoredSession = match serde_json::from_str(&contents) {
            Ok(stored) => stored,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Ignoring unreadable session file");
                return Ok(None);
            }
        };

        match (stored.user_id, stored.jwt_token) {
            (Some(user_id), Some(token)) => match Session::new(user_id, token) {
                Ok(session) => Ok(Some(session)),
                Err(_) => {
                    warn!(path = %self.path.display(), "Ignoring incomplete session file");
                    Ok(None)
                }
            },
            _ => {
                warn!(path = %self.path.display(), "Ignoring incomplete session file");
                Ok(None)
            }
        }
    }

    async fn store(&self, session: &Session) -> SessionResult<()> {
        if let Some(dir) = self.path.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| self.io_error(e))?;
        }

        let stored = StoredSession {
            jwt_token: Some(session.token.clone()),
            user_id: Some(session.user_id.clone()),
        };
        let contents = serde_json::to_string_pretty(&stored)?;

        let mut options = tokio::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(0o600);
        let mut file = options
            .open(&self.path)
            .await
            .map_err(|e| self.io_error(e))?;

        // The mode above only applies to new files
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(std::fs::Permissions::from_mode(0o600))
                .await
                .map_err(|e| self.io_error(e))?;
        }

        file.write_all(contents.as_bytes())
            .await
            .map_err(|e| self.io_error(e))?;
        file.flush().await.map_err(|e| self.io_error(e))?;

        debug!(path = %self.path.display(), "Session file written");
        Ok(())
    }

    async fn clear(&self) -> SessionResult<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.io_error(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_file_round_trip_uses_fixed_keys() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileSessionBackend::new(dir.path().join("nested").join("session.json"));

        assert_eq!(backend.load().await.unwrap(), None);

        let session = Session::new("u-1", "tok-1").unwrap();
        backend.store(&session).await.unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(backend.path()).unwrap()).unwrap();
        assert_eq!(raw["jwt_token"], "tok-1");
        assert_eq!(raw["user_id"], "u-1");

        assert_eq!(backend.load().await.unwrap(), Some(session));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_session_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let backend = FileSessionBackend::new(&path);
        let mode = || std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;

        backend.store(&Session::new("u-1", "tok-1").unwrap()).await.unwrap();
        assert_eq!(mode(), 0o600);

        // A file left readable by an older version is tightened on rewrite
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();
        backend.store(&Session::new("u-1", "tok-2").unwrap()).await.unwrap();
        assert_eq!(mode(), 0o600);
        assert_eq!(backend.load().await.unwrap().unwrap().token, "tok-2");
    }

    #[tokio::test]
    async fn test_clear_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileSessionBackend::new(dir.path().join("session.json"));

        backend.clear().await.unwrap();
        backend.store(&Session::new("u-1", "tok").unwrap()).await.unwrap();
        backend.clear().await.unwrap();
        backend.clear().await.unwrap();

        assert!(!backend.path().exists());
    }

    #[tokio::test]
    async fn test_partial_or_corrupt_file_is_not_a_session() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let backend = FileSessionBackend::new(&path);

        std::fs::write(&path, r#"{"jwt_token": "tok"}"#).unwrap();
        assert_eq!(backend.load().await.unwrap(), None);

        std::fs::write(&path, r#"{"jwt_token": "tok", "user_id": ""}"#).unwrap();
        assert_eq!(backend.load().await.unwrap(), None);

        std::fs::write(&path, "not json").unwrap();
        assert_eq!(backend.load().await.unwrap(), None);
    }
}
