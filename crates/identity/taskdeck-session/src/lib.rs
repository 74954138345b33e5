//! Session context for the taskdeck client.
//!
//! A session pairs a bearer token with the user identifier it was issued for.
//! The [`SessionContext`] is created explicitly with a persistence backend and
//! handed to whatever needs it (the API client, the views). Expiry is never
//! tracked locally; the server reports it with a 401 and the API client then
//! calls [`SessionContext::logout`].

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info};

mod backend;

pub use backend::{FileSessionBackend, MemorySessionBackend, SessionBackend};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session requires both a token and a user id")]
    Incomplete,

    #[error("Could not determine a config directory for the session file")]
    NoConfigDir,

    #[error("Session file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize session: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type SessionResult<T> = Result<T, SessionError>;

/// A token together with the user it authorizes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub user_id: String,
}

impl Session {
    /// Both parts must be non-empty.
    pub fn new(user_id: impl Into<String>, token: impl Into<String>) -> SessionResult<Self> {
        let session = Self {
            token: token.into(),
            user_id: user_id.into(),
        };
        if session.is_valid() {
            Ok(session)
        } else {
            Err(SessionError::Incomplete)
        }
    }

    pub fn is_valid(&self) -> bool {
        !self.token.trim().is_empty() && !self.user_id.trim().is_empty()
    }
}

/// Current session plus the backend that persists it.
pub struct SessionContext {
    backend: Arc<dyn SessionBackend>,
    current: RwLock<Option<Session>>,
}

impl SessionContext {
    /// Load whatever the backend has persisted and start from it.
    pub async fn init(backend: Arc<dyn SessionBackend>) -> SessionResult<Self> {
        let current = backend.load().await?.filter(Session::is_valid);
        debug!(authenticated = current.is_some(), "Session context initialized");
        Ok(Self {
            backend,
            current: RwLock::new(current),
        })
    }

    /// An empty context backed by memory only.
    pub fn in_memory() -> Self {
        Self {
            backend: Arc::new(MemorySessionBackend::new()),
            current: RwLock::new(None),
        }
    }

    pub async fn token(&self) -> Option<String> {
        self.current.read().await.as_ref().map(|s| s.token.clone())
    }

    pub async fn user_id(&self) -> Option<String> {
        self.current.read().await.as_ref().map(|s| s.user_id.clone())
    }

    pub async fn session(&self) -> Option<Session> {
        self.current.read().await.clone()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.current.read().await.is_some()
    }

    /// Persist a new session, replacing any previous one.
    pub async fn login(
        &self,
        user_id: impl Into<String>,
        token: impl Into<String>,
    ) -> SessionResult<()> {
        let session = Session::new(user_id, token)?;
        self.backend.store(&session).await?;
        info!(user_id = %session.user_id, "Session stored");
        *self.current.write().await = Some(session);
        Ok(())
    }

    /// Forget the session. Calling this without a session is fine.
    pub async fn logout(&self) -> SessionResult<()> {
        let previous = self.current.write().await.take();
        self.backend.clear().await?;
        if let Some(session) = previous {
            info!(user_id = %session.user_id, "Session cleared");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_requires_both_parts() {
        assert!(Session::new("u-1", "tok").is_ok());
        assert!(matches!(Session::new("", "tok"), Err(SessionError::Incomplete)));
        assert!(matches!(Session::new("u-1", "  "), Err(SessionError::Incomplete)));
    }

    #[tokio::test]
    async fn test_login_logout_lifecycle() {
        let context = SessionContext::in_memory();
        assert!(!context.is_authenticated().await);
        assert_eq!(context.token().await, None);

        context.login("u-1", "tok-1").await.unwrap();
        assert!(context.is_authenticated().await);
        assert_eq!(context.token().await.as_deref(), Some("tok-1"));
        assert_eq!(context.user_id().await.as_deref(), Some("u-1"));

        context.logout().await.unwrap();
        assert!(!context.is_authenticated().await);
        assert_eq!(context.user_id().await, None);

        // idempotent
        context.logout().await.unwrap();
        assert!(!context.is_authenticated().await);
    }

    #[tokio::test]
    async fn test_incomplete_login_keeps_previous_session() {
        let context = SessionContext::in_memory();
        context.login("u-1", "tok-1").await.unwrap();

        assert!(context.login("u-2", "").await.is_err());
        assert_eq!(context.user_id().await.as_deref(), Some("u-1"));
    }

    #[tokio::test]
    async fn test_init_restores_persisted_session() {
        let backend = Arc::new(MemorySessionBackend::new());
        backend.store(&Session::new("u-9", "tok-9").unwrap()).await.unwrap();

        let context = SessionContext::init(backend.clone()).await.unwrap();
        assert_eq!(context.token().await.as_deref(), Some("tok-9"));

        context.logout().await.unwrap();
        assert_eq!(backend.load().await.unwrap(), None);
    }
}
