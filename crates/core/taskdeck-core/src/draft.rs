//! Local input validation. This is the only validation the client performs;
//! everything else is left to the server.

use thiserror::Error;

use crate::model::{NewTask, TaskUpdate};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Title is required")]
    EmptyTitle,

    #[error("Email and password are required")]
    MissingCredentials,
}

/// Raw contents of a task form before submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskDraft {
    pub title: String,
    pub description: String,
}

impl TaskDraft {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
        }
    }

    fn trimmed_title(&self) -> Result<String, ValidationError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(ValidationError::EmptyTitle);
        }
        Ok(title.to_string())
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        self.trimmed_title().map(|_| ())
    }

    /// Body for task creation. A blank description is omitted.
    pub fn to_new_task(&self) -> Result<NewTask, ValidationError> {
        let title = self.trimmed_title()?;
        let description = self.description.trim();
        Ok(NewTask {
            title,
            description: (!description.is_empty()).then(|| description.to_string()),
        })
    }

    /// Body for a full replacement. A blank description is sent as an empty
    /// string so that editing can clear it.
    pub fn to_update(&self, is_completed: bool) -> Result<TaskUpdate, ValidationError> {
        Ok(TaskUpdate {
            title: self.trimmed_title()?,
            description: self.description.trim().to_string(),
            is_completed,
        })
    }

    pub fn clear(&mut self) {
        self.title.clear();
        self.description.clear();
    }
}
