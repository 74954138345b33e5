//! Task endpoints. Every path is scoped under the owner's user id.

use reqwest::Method;
use taskdeck_core::{CompletionPatch, NewTask, Task, TaskUpdate};

use crate::client::ApiClient;
use crate::error::{ApiResult, Operation};

impl ApiClient {
    pub async fn list_tasks(&self, user_id: &str) -> ApiResult<Vec<Task>> {
        self.get_json(Operation::ListTasks, &[user_id, "tasks"]).await
    }

    pub async fn create_task(&self, user_id: &str, task: &NewTask) -> ApiResult<Task> {
        self.send_json(Operation::CreateTask, Method::POST, &[user_id, "tasks"], task)
            .await
    }

    pub async fn get_task(&self, user_id: &str, task_id: &str) -> ApiResult<Task> {
        self.get_json(Operation::FetchTask, &[user_id, "tasks", task_id])
            .await
    }

    pub async fn update_task(
        &self,
        user_id: &str,
        task_id: &str,
        update: &TaskUpdate,
    ) -> ApiResult<Task> {
        self.send_json(
            Operation::UpdateTask,
            Method::PUT,
            &[user_id, "tasks", task_id],
            update,
        )
        .await
    }

    pub async fn set_completion(
        &self,
        user_id: &str,
        task_id: &str,
        is_completed: bool,
    ) -> ApiResult<Task> {
        self.send_json(
            Operation::SetCompletion,
            Method::PATCH,
            &[user_id, "tasks", task_id, "complete"],
            &CompletionPatch { is_completed },
        )
        .await
    }

    pub async fn delete_task(&self, user_id: &str, task_id: &str) -> ApiResult<()> {
        self.send_empty(Operation::DeleteTask, Method::DELETE, &[user_id, "tasks", task_id])
            .await
    }
}
