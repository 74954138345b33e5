//! Status filtering and free-text search over a task list.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::model::Task;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    #[default]
    All,
    Active,
    Completed,
}

impl StatusFilter {
    pub const ALL: [StatusFilter; 3] = [Self::All, Self::Active, Self::Completed];

    pub fn matches(self, task: &Task) -> bool {
        match self {
            Self::All => true,
            Self::Active => !task.is_completed,
            Self::Completed => task.is_completed,
        }
    }

    pub fn next(self) -> Self {
        match self {
            Self::All => Self::Active,
            Self::Active => Self::Completed,
            Self::Completed => Self::All,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::All => "All",
            Self::Active => "Active",
            Self::Completed => "Completed",
        }
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for StatusFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "active" => Ok(Self::Active),
            "completed" | "done" => Ok(Self::Completed),
            other => Err(format!(
                "unknown status filter '{other}', expected all, active or completed"
            )),
        }
    }
}

/// Active status filter combined with a search term.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskQuery {
    pub status: StatusFilter,
    pub search: String,
}

impl TaskQuery {
    pub fn new(status: StatusFilter, search: impl Into<String>) -> Self {
        Self {
            status,
            search: search.into(),
        }
    }

    /// Case-insensitive substring match over title and description, in
    /// conjunction with the status filter. An empty term matches everything.
    pub fn matches(&self, task: &Task) -> bool {
        if !self.status.matches(task) {
            return false;
        }
        if self.search.is_empty() {
            return true;
        }

        let needle = self.search.to_lowercase();
        task.title.to_lowercase().contains(&needle)
            || task
                .description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(&needle))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskStats {
    pub total: usize,
    pub active: usize,
    pub completed: usize,
}

impl TaskStats {
    pub fn of<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> Self {
        tasks.into_iter().fold(Self::default(), |mut stats, task| {
            stats.total += 1;
            if task.is_completed {
                stats.completed += 1;
            } else {
                stats.active += 1;
            }
            stats
        })
    }

    pub fn count(&self, filter: StatusFilter) -> usize {
        match filter {
            StatusFilter::All => self.total,
            StatusFilter::Active => self.active,
            StatusFilter::Completed => self.completed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn task(id: &str, title: &str, description: Option<&str>, done: bool) -> Task {
        let now = Utc::now();
        Task {
            id: id.to_string(),
            title: title.to_string(),
            description: description.map(str::to_string),
            is_completed: done,
            user_id: "u-1".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    fn sample() -> Vec<Task> {
        vec![
            task("1", "Buy milk", None, false),
            task("2", "Call dentist", Some("Ask about cleaning"), true),
            task("3", "Write report", Some("quarterly numbers"), false),
            task("4", "Pay rent", None, true),
            task("5", "Water plants", Some("MILKweed too"), false),
        ]
    }

    #[test]
    fn test_status_filter_counts() {
        let tasks = sample();
        let count = |status| {
            tasks
                .iter()
                .filter(|t| TaskQuery::new(status, "").matches(t))
                .count()
        };
        assert_eq!(count(StatusFilter::Active), 3);
        assert_eq!(count(StatusFilter::Completed), 2);
        assert_eq!(count(StatusFilter::All), 5);
    }

    #[test]
    fn test_search_is_case_insensitive() {
        let tasks = vec![
            task("1", "Buy milk", None, false),
            task("2", "Call dentist", None, false),
        ];
        for term in ["mil", "MIL", "Mil"] {
            let query = TaskQuery::new(StatusFilter::All, term);
            let hits: Vec<_> = tasks.iter().filter(|t| query.matches(t)).collect();
            assert_eq!(hits.len(), 1);
            assert_eq!(hits[0].title, "Buy milk");
        }
    }

    #[test]
    fn test_search_covers_description_and_status() {
        let tasks = sample();
        let query = TaskQuery::new(StatusFilter::All, "milk");
        let ids: Vec<_> = tasks.iter().filter(|t| query.matches(t)).map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "5"]);

        let query = TaskQuery::new(StatusFilter::Completed, "milk");
        assert_eq!(tasks.iter().filter(|t| query.matches(t)).count(), 0);
    }

    #[test]
    fn test_stats() {
        let stats = TaskStats::of(&sample());
        assert_eq!(stats, TaskStats { total: 5, active: 3, completed: 2 });
        assert_eq!(stats.count(StatusFilter::Completed), 2);
    }

    #[test]
    fn test_parse_filter() {
        assert_eq!("Active".parse::<StatusFilter>(), Ok(StatusFilter::Active));
        assert_eq!("done".parse::<StatusFilter>(), Ok(StatusFilter::Completed));
        assert!("later".parse::<StatusFilter>().is_err());
        assert_eq!(StatusFilter::Completed.next(), StatusFilter::All);
    }
}
