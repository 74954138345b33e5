//! Error type shared by every client operation.

use taskdeck_core::ValidationError;
use taskdeck_session::SessionError;
use thiserror::Error;

pub type ApiResult<T> = Result<T, ApiError>;

/// The operation a request belonged to. Supplies the fallback message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Register,
    Login,
    Profile,
    ListTasks,
    CreateTask,
    FetchTask,
    UpdateTask,
    SetCompletion,
    DeleteTask,
}

impl Operation {
    pub fn default_message(self) -> &'static str {
        match self {
            Self::Register => "Registration failed",
            Self::Login => "Login failed",
            Self::Profile => "Failed to get user profile",
            Self::ListTasks => "Failed to fetch tasks",
            Self::CreateTask => "Failed to create task",
            Self::FetchTask => "Failed to fetch task",
            Self::UpdateTask => "Failed to update task",
            Self::SetCompletion => "Failed to update task completion",
            Self::DeleteTask => "Failed to delete task",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// 401. The session has already been cleared when this is returned.
    Unauthorized,
    /// 403. The session is left alone.
    Forbidden,
    /// 404.
    NotFound,
    /// Any other non-success status.
    Status,
    /// No response was received.
    Transport,
    /// A success response whose body could not be read.
    Decode,
    /// Input rejected before any request was made.
    Validation,
    /// No user id in the session; nothing was sent.
    NotAuthenticated,
    /// The session could not be persisted.
    Session,
}

/// A failed client operation, reduced to one printable message.
///
/// The message prefers the server's `detail`, then the transport-level
/// message, then the operation default. The status and kind stay available
/// so callers can branch on 401/404 without parsing text.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ApiError {
    operation: Operation,
    kind: ErrorKind,
    status: Option<u16>,
    detail: Option<String>,
    message: String,
    #[source]
    source: Option<reqwest::Error>,
}

impl ApiError {
    fn build(
        operation: Operation,
        kind: ErrorKind,
        status: Option<u16>,
        detail: Option<String>,
        transport_message: Option<String>,
        source: Option<reqwest::Error>,
    ) -> Self {
        let message = detail
            .clone()
            .filter(|d| !d.trim().is_empty())
            .or(transport_message.filter(|m| !m.trim().is_empty()))
            .unwrap_or_else(|| operation.default_message().to_string());

        Self {
            operation,
            kind,
            status,
            detail,
            message,
            source,
        }
    }

    pub(crate) fn from_status(operation: Operation, status: u16, detail: Option<String>) -> Self {
        let kind = match status {
            401 => ErrorKind::Unauthorized,
            403 => ErrorKind::Forbidden,
            404 => ErrorKind::NotFound,
            _ => ErrorKind::Status,
        };
        Self::build(
            operation,
            kind,
            Some(status),
            detail,
            Some(format!("Request failed with status code {status}")),
            None,
        )
    }

    pub(crate) fn transport(operation: Operation, source: reqwest::Error) -> Self {
        let message = source.to_string();
        let status = source.status().map(|s| s.as_u16());
        Self::build(operation, ErrorKind::Transport, status, None, Some(message), Some(source))
    }

    pub(crate) fn decode(operation: Operation, source: reqwest::Error) -> Self {
        let message = source.to_string();
        Self::build(operation, ErrorKind::Decode, None, None, Some(message), Some(source))
    }

    pub(crate) fn validation(operation: Operation, error: ValidationError) -> Self {
        Self::build(operation, ErrorKind::Validation, None, Some(error.to_string()), None, None)
    }

    pub(crate) fn not_authenticated(operation: Operation) -> Self {
        Self::build(
            operation,
            ErrorKind::NotAuthenticated,
            None,
            Some("User not authenticated".to_string()),
            None,
            None,
        )
    }

    pub(crate) fn session(operation: Operation, error: SessionError) -> Self {
        Self::build(operation, ErrorKind::Session, None, None, Some(error.to_string()), None)
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn status(&self) -> Option<u16> {
        self.status
    }

    /// Detail reported by the server, or the local rejection reason.
    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_unauthorized(&self) -> bool {
        self.kind == ErrorKind::Unauthorized
    }

    pub fn is_forbidden(&self) -> bool {
        self.kind == ErrorKind::Forbidden
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == ErrorKind::NotFound
    }
}

/// Failure to construct an [`ApiClient`](crate::ApiClient).
#[derive(Debug, Error)]
pub enum ClientBuildError {
    #[error("Invalid base URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Base URL must be an absolute http(s) URL: {0}")]
    UnsupportedUrl(String),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Pull a human-readable message out of an error body.
///
/// Understands `{"detail": "..."}`, validation lists of the form
/// `{"detail": [{"msg": "..."}, ...]}`, and `{"message": "..."}`.
pub(crate) fn extract_detail(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;

    match value.get("detail") {
        Some(serde_json::Value::String(detail)) if !detail.trim().is_empty() => {
            return Some(detail.clone());
        }
        Some(serde_json::Value::Array(items)) => {
            let messages: Vec<&str> = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(|m| m.as_str()))
                .collect();
            if !messages.is_empty() {
                return Some(messages.join("; "));
            }
        }
        _ => {}
    }

    value
        .get("message")
        .and_then(|m| m.as_str())
        .filter(|m| !m.trim().is_empty())
        .map(str::to_string)
}
