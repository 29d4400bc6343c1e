//! Task, Project and Category records

use burststore::now_ms;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::id::generate_id;
use super::keys;
use super::priority::Priority;
use super::record::{impl_ordered, impl_record};

/// A to-do item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,

    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    pub completed: bool,

    /// When the task was last completed (Unix milliseconds)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due: Option<NaiveDate>,

    #[serde(default)]
    pub priority: Priority,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,

    /// Manual sort position
    #[serde(default)]
    pub order: i64,

    pub created_at: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archived_at: Option<i64>,
}

impl Task {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: generate_id(),
            title: title.into(),
            description: None,
            completed: false,
            completed_at: None,
            due: None,
            priority: Priority::default(),
            project_id: None,
            category_id: None,
            order: 0,
            created_at: now_ms(),
            deleted_at: None,
            archived_at: None,
        }
    }

    /// Whether the task is past due on `today` and still open
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        !self.completed && self.due.is_some_and(|due| due < today)
    }
}

impl_record!(Task, keys::TASKS, "task", ordered);
impl_ordered!(Task);

/// A named group of tasks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,

    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,

    #[serde(default)]
    pub order: i64,

    pub created_at: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archived_at: Option<i64>,
}

impl Project {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: generate_id(),
            name: name.into(),
            description: None,
            color: None,
            order: 0,
            created_at: now_ms(),
            archived_at: None,
        }
    }
}

impl_record!(Project, keys::PROJECTS, "project", ordered);
impl_ordered!(Project);

/// A label tasks can be filed under
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,

    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,

    pub created_at: i64,
}

impl Category {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: generate_id(),
            name: name.into(),
            color: None,
            created_at: now_ms(),
        }
    }
}

impl_record!(Category, keys::CATEGORIES, "category");

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Record;

    #[test]
    fn test_task_serializes_camel_case() {
        let mut task = Task::new("Write report");
        task.project_id = Some("p1".into());
        task.due = NaiveDate::from_ymd_opt(2026, 3, 1);

        let json = serde_json::to_value(&task).unwrap();
        assert_eq!(json["projectId"], "p1");
        assert_eq!(json["due"], "2026-03-01");
        assert_eq!(json["priority"], "medium");
        assert!(json.get("createdAt").is_some());
        assert!(json.get("deletedAt").is_none());
        assert!(json.get("description").is_none());
    }

    #[test]
    fn test_task_minimal_json() {
        let task: Task = serde_json::from_str(r#"{"id":"t1","title":"x","createdAt":5}"#).unwrap();
        assert!(!task.completed);
        assert_eq!(task.priority, Priority::Medium);
        assert_eq!(task.order, 0);
        assert_eq!(task.id(), "t1");
        assert_eq!(task.created_at(), 5);
    }

    #[test]
    fn test_task_overdue() {
        let today = NaiveDate::from_ymd_opt(2026, 5, 10).unwrap();
        let mut task = Task::new("x");
        assert!(!task.is_overdue(today));

        task.due = NaiveDate::from_ymd_opt(2026, 5, 9);
        assert!(task.is_overdue(today));

        task.completed = true;
        assert!(!task.is_overdue(today));
    }

    #[test]
    fn test_record_keys() {
        assert_eq!(Task::KEY, "taskburst-tasks");
        assert_eq!(Project::KEY, "taskburst-projects");
        assert_eq!(Category::KIND, "category");
    }
}
