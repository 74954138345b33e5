//! Wire model exchanged with the task backend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::draft::ValidationError;

/// Opaque task identifier assigned by the server.
pub type TaskId = String;

/// A titled, optionally described, completable unit of work owned by one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub is_completed: bool,
    pub user_id: String,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Whether the server has recorded a mutation since creation.
    pub fn was_edited(&self) -> bool {
        self.updated_at != self.created_at
    }

    /// Description with blank values treated as absent.
    pub fn description_text(&self) -> Option<&str> {
        self.description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(default, with = "timestamp::option")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, with = "timestamp::option")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Email/password pair used by both register and login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    /// Both fields are required by the login and register forms.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.email.trim().is_empty() || self.password.is_empty() {
            return Err(ValidationError::MissingCredentials);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub user: User,
    pub token: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTask {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Full replacement body for `PUT /{user}/tasks/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskUpdate {
    pub title: String,
    pub description: String,
    pub is_completed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionPatch {
    pub is_completed: bool,
}

/// Serde helpers for server timestamps.
///
/// The backend emits RFC 3339 strings, but naive ISO-8601 values without an
/// offset show up as well; those are read as UTC.
pub mod timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
            .ok()
            .map(|naive| naive.and_utc())
    }

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| D::Error::custom(format!("invalid timestamp: {raw}")))
    }

    pub mod option {
        use chrono::{DateTime, Utc};
        use serde::{Deserialize, Deserializer, Serializer, de::Error};

        pub fn serialize<S: Serializer>(
            value: &Option<DateTime<Utc>>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(dt) => serializer.serialize_str(&dt.to_rfc3339()),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            match Option::<String>::deserialize(deserializer)? {
                Some(raw) => super::parse(&raw)
                    .map(Some)
                    .ok_or_else(|| D::Error::custom(format!("invalid timestamp: {raw}"))),
                None => Ok(None),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_task_accepts_naive_timestamps() {
        let task: Task = serde_json::from_value(json!({
            "id": "t-1",
            "title": "Buy milk",
            "description": null,
            "is_completed": false,
            "user_id": "u-1",
            "created_at": "2024-05-01T10:00:00.123456",
            "updated_at": "2024-05-01T10:00:00.123456"
        }))
        .unwrap();

        assert_eq!(task.description, None);
        assert!(!task.was_edited());
        assert_eq!(task.created_at.to_rfc3339(), "2024-05-01T10:00:00.123456+00:00");
    }

    #[test]
    fn test_task_edit_detection() {
        let task: Task = serde_json::from_value(json!({
            "id": "t-1",
            "title": "Buy milk",
            "is_completed": true,
            "user_id": "u-1",
            "created_at": "2024-05-01T10:00:00Z",
            "updated_at": "2024-05-02T08:30:00+02:00"
        }))
        .unwrap();

        assert!(task.was_edited());
        assert_eq!(task.updated_at.to_rfc3339(), "2024-05-02T06:30:00+00:00");
    }

    #[test]
    fn test_invalid_timestamp_is_rejected() {
        let result: Result<Task, _> = serde_json::from_value(json!({
            "id": "t-1",
            "title": "x",
            "is_completed": false,
            "user_id": "u-1",
            "created_at": "yesterday",
            "updated_at": "yesterday"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_user_without_timestamps() {
        let user: User =
            serde_json::from_value(json!({"id": "u-1", "email": "a@b.c"})).unwrap();
        assert_eq!(user.created_at, None);
    }

    #[test]
    fn test_new_task_omits_missing_description() {
        let body = serde_json::to_value(NewTask {
            title: "Call dentist".to_string(),
            description: None,
        })
        .unwrap();
        assert_eq!(body, json!({"title": "Call dentist"}));
    }

    #[test]
    fn test_credentials_validation() {
        assert!(Credentials::new("a@b.c", "pw").validate().is_ok());
        assert_eq!(
            Credentials::new("  ", "pw").validate(),
            Err(ValidationError::MissingCredentials)
        );
        assert_eq!(
            Credentials::new("a@b.c", "").validate(),
            Err(ValidationError::MissingCredentials)
        );
    }
}
