use crate::model::date_key;
use crate::model::weekday::Weekday;
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurringTask {
    pub id: String,
    pub text: String,
    pub weekday: Weekday,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OneOffTask {
    pub id: String,
    pub text: String,
    #[serde(with = "date_key")]
    pub due_date: Date,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Task {
    Recurring(RecurringTask),
    OneOff(OneOffTask),
}

impl Task {
    pub fn id(&self) -> &str {
        match self {
            Task::Recurring(task) => &task.id,
            Task::OneOff(task) => &task.id,
        }
    }

    pub fn text(&self) -> &str {
        match self {
            Task::Recurring(task) => &task.text,
            Task::OneOff(task) => &task.text,
        }
    }

    pub fn created_at(&self) -> OffsetDateTime {
        match self {
            Task::Recurring(task) => task.created_at,
            Task::OneOff(task) => task.created_at,
        }
    }

    pub fn is_recurring(&self) -> bool {
        matches!(self, Task::Recurring(_))
    }
}

/// Append-only record that a task was done on a given calendar day.
/// `completed_on_date` is always the local date of `completed_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Completion {
    pub task_id: String,
    pub source_task_snapshot: Task,
    #[serde(with = "time::serde::rfc3339")]
    pub completed_at: OffsetDateTime,
    #[serde(with = "date_key")]
    pub completed_on_date: Date,
}

impl Completion {
    pub fn matches(&self, task_id: &str, date: Date) -> bool {
        self.task_id == task_id && self.completed_on_date == date
    }
}

/// Suppresses one occurrence of a recurring task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exclusion {
    pub task_id: String,
    #[serde(with = "date_key")]
    pub date: Date,
}

impl Exclusion {
    pub fn matches(&self, task_id: &str, date: Date) -> bool {
        self.task_id == task_id && self.date == date
    }
}

/// Partial update for `edit`. Fields that do not apply to the target
/// variant are rejected rather than ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub text: Option<String>,
    pub weekday: Option<Weekday>,
    pub due_date: Option<Date>,
}

impl TaskPatch {
    pub fn text<T: Into<String>>(text: T) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_none() && self.weekday.is_none() && self.due_date.is_none()
    }
}
