//! Task operations shared by every view.
//!
//! Each operation validates locally, sends exactly one request and, on
//! success, returns the change to apply built from the server's response.
//! Nothing is applied before the server confirms it, so a failure never
//! needs a rollback.

use taskdeck_core::{Task, TaskBoard, TaskDraft, TaskMutation};
use tracing::{debug, warn};

use crate::client::ApiClient;
use crate::error::{ApiError, ApiResult, Operation};

pub const TASK_NOT_FOUND: &str = "Task not found";

/// Outcome of a full list fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadTransition {
    /// The board now holds this many tasks.
    Ready(usize),
    /// The session is gone; leave the page for the login view.
    Redirect,
    /// The board is in its failed state with this message.
    Failed(String),
}

/// Settle a list fetch onto the board.
pub fn settle_load(board: &mut TaskBoard, result: ApiResult<Vec<Task>>) -> LoadTransition {
    match result {
        Ok(tasks) => {
            board.finish_loading(tasks);
            LoadTransition::Ready(board.len())
        }
        Err(e) if e.is_unauthorized() => LoadTransition::Redirect,
        Err(e) => {
            let message = e.message().to_string();
            board.fail_loading(message.clone());
            LoadTransition::Failed(message)
        }
    }
}

/// State of a single-task view.
#[derive(Debug, Clone, PartialEq)]
pub enum DetailState {
    Loading,
    Ready(Task),
    NotFound,
    Redirect,
    Failed(String),
}

impl DetailState {
    pub fn settle(result: ApiResult<Task>) -> Self {
        match result {
            Ok(task) => Self::Ready(task),
            Err(e) if e.is_unauthorized() => Self::Redirect,
            Err(e) if e.is_not_found() => Self::NotFound,
            Err(e) => Self::Failed(e.message().to_string()),
        }
    }

    pub fn task(&self) -> Option<&Task> {
        match self {
            Self::Ready(task) => Some(task),
            _ => None,
        }
    }

    /// Inline message for the non-ready states.
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::NotFound => Some(TASK_NOT_FOUND),
            Self::Failed(message) => Some(message),
            _ => None,
        }
    }

    /// Fold a confirmed mutation into the detail view. A delete leaves the
    /// view with nothing to show, which the caller treats as "go back".
    pub fn apply(&mut self, mutation: &TaskMutation) {
        let current_id = match self {
            Self::Ready(current) => current.id.clone(),
            _ => return,
        };
        match mutation {
            TaskMutation::Updated(task) if task.id == current_id => *self = Self::Ready(task.clone()),
            TaskMutation::Deleted(id) if *id == current_id => *self = Self::NotFound,
            _ => {}
        }
    }
}

#[derive(Clone)]
pub struct TaskService {
    client: ApiClient,
}

impl TaskService {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    async fn user_id(&self, operation: Operation) -> ApiResult<String> {
        self.client
            .session()
            .user_id()
            .await
            .ok_or_else(|| ApiError::not_authenticated(operation))
    }

    pub async fn list(&self) -> ApiResult<Vec<Task>> {
        let user_id = self.user_id(Operation::ListTasks).await?;
        let tasks = self.client.list_tasks(&user_id).await?;
        debug!(count = tasks.len(), "Fetched task list");
        Ok(tasks)
    }

    /// Fetch the list and settle it onto the board.
    pub async fn load_into(&self, board: &mut TaskBoard) -> LoadTransition {
        board.begin_loading();
        let transition = settle_load(board, self.list().await);
        if let LoadTransition::Failed(message) = &transition {
            warn!("Task list failed to load: {}", message);
        }
        transition
    }

    pub async fn fetch(&self, task_id: &str) -> ApiResult<Task> {
        let user_id = self.user_id(Operation::FetchTask).await?;
        self.client.get_task(&user_id, task_id).await
    }

    pub async fn fetch_detail(&self, task_id: &str) -> DetailState {
        DetailState::settle(self.fetch(task_id).await)
    }

    pub async fn create(&self, draft: &TaskDraft) -> ApiResult<TaskMutation> {
        let new_task = draft
            .to_new_task()
            .map_err(|e| ApiError::validation(Operation::CreateTask, e))?;
        let user_id = self.user_id(Operation::CreateTask).await?;

        let task = self.client.create_task(&user_id, &new_task).await?;
        debug!(task_id = %task.id, "Task created");
        Ok(TaskMutation::Created(task))
    }

    /// Replace title and description, keeping the completion flag the task
    /// currently has.
    pub async fn edit(&self, task: &Task, draft: &TaskDraft) -> ApiResult<TaskMutation> {
        let update = draft
            .to_update(task.is_completed)
            .map_err(|e| ApiError::validation(Operation::UpdateTask, e))?;
        let user_id = self.user_id(Operation::UpdateTask).await?;

        let task = self.client.update_task(&user_id, &task.id, &update).await?;
        debug!(task_id = %task.id, "Task updated");
        Ok(TaskMutation::Updated(task))
    }

    pub async fn set_completed(&self, task_id: &str, is_completed: bool) -> ApiResult<TaskMutation> {
        let user_id = self.user_id(Operation::SetCompletion).await?;
        let task = self
            .client
            .set_completion(&user_id, task_id, is_completed)
            .await?;
        debug!(task_id = %task.id, is_completed = task.is_completed, "Task completion set");
        Ok(TaskMutation::Updated(task))
    }

    /// Flip the completion flag of a task as currently shown.
    pub async fn toggle(&self, task: &Task) -> ApiResult<TaskMutation> {
        self.set_completed(&task.id, !task.is_completed).await
    }

    pub async fn delete(&self, task_id: &str) -> ApiResult<TaskMutation> {
        let user_id = self.user_id(Operation::DeleteTask).await?;
        self.client.delete_task(&user_id, task_id).await?;
        debug!(task_id, "Task deleted");
        Ok(TaskMutation::Deleted(task_id.to_string()))
    }
}
