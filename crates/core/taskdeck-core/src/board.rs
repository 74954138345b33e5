//! In-memory task list held by the task views.
//!
//! The board is filled by one full fetch and afterwards kept in step with the
//! server by applying [`TaskMutation`]s built from server responses. It never
//! re-fetches on its own and never applies a change the server has not
//! confirmed.

use crate::model::{Task, TaskId};
use crate::query::{TaskQuery, TaskStats};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    Loading,
    Ready,
    Failed(String),
}

/// A server-confirmed change to apply to the board.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskMutation {
    Created(Task),
    Updated(Task),
    Deleted(TaskId),
}

impl TaskMutation {
    pub fn task_id(&self) -> &str {
        match self {
            Self::Created(task) | Self::Updated(task) => &task.id,
            Self::Deleted(id) => id,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TaskBoard {
    tasks: Vec<Task>,
    state: LoadState,
}

impl Default for TaskBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskBoard {
    pub fn new() -> Self {
        Self {
            tasks: Vec::new(),
            state: LoadState::Loading,
        }
    }

    pub fn state(&self) -> &LoadState {
        &self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == LoadState::Ready
    }

    /// Enter `Loading` ahead of a full fetch. The current tasks stay visible
    /// until the fetch settles.
    pub fn begin_loading(&mut self) {
        self.state = LoadState::Loading;
    }

    /// Replace the whole collection with a fresh fetch.
    pub fn finish_loading(&mut self, tasks: Vec<Task>) {
        self.tasks = tasks;
        self.state = LoadState::Ready;
    }

    pub fn fail_loading(&mut self, message: impl Into<String>) {
        self.state = LoadState::Failed(message.into());
    }

    /// Apply a confirmed change. Returns false when an update or delete
    /// targets an id that is no longer on the board; the board is unchanged
    /// in that case.
    pub fn apply(&mut self, mutation: TaskMutation) -> bool {
        match mutation {
            TaskMutation::Created(task) => {
                self.tasks.insert(0, task);
                true
            }
            TaskMutation::Updated(task) => match self.position(&task.id) {
                Some(index) => {
                    self.tasks[index] = task;
                    true
                }
                None => false,
            },
            TaskMutation::Deleted(id) => {
                let before = self.tasks.len();
                self.tasks.retain(|t| t.id != id);
                self.tasks.len() != before
            }
        }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Tasks matching the query, in board order.
    pub fn visible<'a>(&'a self, query: &'a TaskQuery) -> impl Iterator<Item = &'a Task> + 'a {
        self.tasks.iter().filter(move |t| query.matches(t))
    }

    pub fn stats(&self) -> TaskStats {
        TaskStats::of(&self.tasks)
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.tasks.iter().position(|t| t.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::StatusFilter;
    use chrono::{Duration, Utc};

    fn task(id: &str, title: &str, done: bool) -> Task {
        let now = Utc::now();
        Task {
            id: id.to_string(),
            title: title.to_string(),
            description: None,
            is_completed: done,
            user_id: "u-1".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    fn ready_board() -> TaskBoard {
        let mut board = TaskBoard::new();
        board.finish_loading(vec![
            task("a", "Buy milk", false),
            task("b", "Call dentist", true),
            task("c", "Pay rent", false),
        ]);
        board
    }

    #[test]
    fn test_load_state_transitions() {
        let mut board = TaskBoard::new();
        assert_eq!(board.state(), &LoadState::Loading);

        board.fail_loading("Failed to fetch tasks");
        assert_eq!(board.state(), &LoadState::Failed("Failed to fetch tasks".to_string()));

        board.begin_loading();
        board.finish_loading(vec![task("a", "Buy milk", false)]);
        assert!(board.is_ready());
        assert_eq!(board.len(), 1);
    }

    #[test]
    fn test_created_task_is_prepended() {
        let mut board = ready_board();
        assert!(board.apply(TaskMutation::Created(task("d", "Water plants", false))));

        assert_eq!(board.len(), 4);
        assert_eq!(board.tasks()[0].id, "d");
        assert_eq!(board.tasks()[1].id, "a");
    }

    #[test]
    fn test_update_keeps_position() {
        let mut board = ready_board();
        let mut updated = board.get("b").cloned().unwrap();
        updated.is_completed = false;
        updated.updated_at = updated.created_at + Duration::seconds(5);

        assert!(board.apply(TaskMutation::Updated(updated.clone())));
        assert_eq!(board.tasks()[1], updated);
        assert_eq!(board.len(), 3);
    }

    #[test]
    fn test_update_of_unknown_id_is_ignored() {
        let mut board = ready_board();
        let before = board.tasks().to_vec();
        assert!(!board.apply(TaskMutation::Updated(task("zzz", "Ghost", false))));
        assert_eq!(board.tasks(), before.as_slice());
    }

    #[test]
    fn test_delete_removes_in_place() {
        let mut board = ready_board();
        assert!(board.apply(TaskMutation::Deleted("b".to_string())));

        assert_eq!(board.len(), 2);
        assert!(board.get("b").is_none());
        let ids: Vec<_> = board.tasks().iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);

        assert!(!board.apply(TaskMutation::Deleted("b".to_string())));
        assert_eq!(board.len(), 2);
    }

    #[test]
    fn test_visible_respects_query() {
        let board = ready_board();
        let query = TaskQuery::new(StatusFilter::Active, "");
        let ids: Vec<_> = board.visible(&query).map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);

        assert_eq!(board.stats().completed, 1);
    }
}
