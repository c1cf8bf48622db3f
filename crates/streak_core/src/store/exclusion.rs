use super::{TaskStore, require_id};
use crate::error::AppError;
use crate::model::{Completion, Exclusion, Weekday};
use crate::observe::ChangeScope;
use crate::storage::Collection;
use time::Date;
use tracing::{debug, warn};

/// Result of "remove from this day".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemovedOccurrence {
    Uncompleted(Vec<Completion>),
    Excluded(Exclusion),
}

impl TaskStore {
    /// Suppresses one occurrence of a recurring task without touching the
    /// rule. Repeating the call for the same pair is a no-op.
    ///
    /// A completed occurrence cannot be excluded; un-complete it instead.
    pub fn exclude_occurrence(&mut self, task_id: &str, date: Date) -> Result<Exclusion, AppError> {
        let task_id = require_id(task_id)?;
        let Some(task) = self.recurring.iter().find(|task| task.id == task_id) else {
            if self.one_off.iter().any(|task| task.id == task_id) {
                return Err(AppError::validation(
                    "only recurring tasks can have occurrences excluded",
                ));
            }
            return Err(AppError::not_found(format!("task not found: {task_id}")));
        };

        if Weekday::of(date) != task.weekday {
            return Err(AppError::validation(format!(
                "{task_id} does not occur on {date} (runs on {})",
                task.weekday
            )));
        }
        if self.completion_for(task_id, date).is_some() {
            return Err(AppError::validation(format!(
                "{task_id} is completed on {date}; un-complete it instead"
            )));
        }

        if let Some(existing) = self.exclusions.iter().find(|e| e.matches(task_id, date)) {
            debug!(%task_id, %date, "occurrence already excluded");
            return Ok(existing.clone());
        }

        let exclusion = Exclusion {
            task_id: task_id.to_string(),
            date,
        };
        self.exclusions.push(exclusion.clone());
        self.touch(Collection::Exclusions, ChangeScope::Day(date));
        Ok(exclusion)
    }

    pub fn is_excluded(&self, task_id: &str, date: Date) -> bool {
        self.exclusions.iter().any(|e| e.matches(task_id, date))
    }

    /// Takes a task off one day: un-completes it when it was done that
    /// day, otherwise excludes the occurrence.
    pub fn remove_occurrence(&mut self, task_id: &str, date: Date) -> Result<RemovedOccurrence, AppError> {
        let task_id = require_id(task_id)?;
        if self.completion_for(task_id, date).is_some() {
            return self
                .uncomplete(task_id, date)
                .map(RemovedOccurrence::Uncompleted);
        }
        self.exclude_occurrence(task_id, date)
            .map(RemovedOccurrence::Excluded)
    }

    /// Drops exclusions that reference no recurring task, that collide
    /// with a completion, or that repeat an earlier row.
    pub(super) fn repair_exclusions(&mut self) {
        let recurring = &self.recurring;
        let completions = &self.completions;
        let before = self.exclusions.len();

        let mut kept: Vec<Exclusion> = Vec::with_capacity(before);
        for exclusion in self.exclusions.drain(..) {
            let referenced = recurring.iter().any(|task| task.id == exclusion.task_id);
            let completed = completions
                .iter()
                .any(|completion| completion.matches(&exclusion.task_id, exclusion.date));
            let duplicate = kept
                .iter()
                .any(|existing| existing.matches(&exclusion.task_id, exclusion.date));
            if referenced && !completed && !duplicate {
                kept.push(exclusion);
            }
        }
        self.exclusions = kept;

        let dropped = before - self.exclusions.len();
        if dropped > 0 {
            warn!(dropped, "dropped stale exclusions");
            self.dirty.insert(Collection::Exclusions);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::RemovedOccurrence;
    use crate::clock::ManualClock;
    use crate::model::Weekday;
    use crate::storage::{Collection, MemoryStore};
    use crate::store::TaskStore;
    use std::rc::Rc;
    use time::macros::{date, datetime};

    const MONDAY: time::Date = date!(2025 - 12 - 22);

    fn store() -> TaskStore {
        TaskStore::new(Rc::new(ManualClock::new(datetime!(2025-12-22 09:00 UTC))))
    }

    #[test]
    fn excluding_twice_keeps_one_row() {
        let mut store = store();
        let task = store.add_recurring("Meditate", Weekday::Monday).unwrap();

        let first = store.exclude_occurrence(&task.id, MONDAY).unwrap();
        let second = store.exclude_occurrence(&task.id, MONDAY).unwrap();

        assert_eq!(first, second);
        assert_eq!(store.exclusions().len(), 1);
        assert!(store.is_excluded(&task.id, MONDAY));
    }

    #[test]
    fn excluding_completed_occurrence_is_rejected() {
        let mut store = store();
        let task = store.add_recurring("Meditate", Weekday::Monday).unwrap();
        store.complete(&task.id, MONDAY).unwrap();

        let err = store.exclude_occurrence(&task.id, MONDAY).unwrap_err();

        assert_eq!(err.code(), "validation_error");
        assert!(store.exclusions().is_empty());
    }

    #[test]
    fn excluding_one_off_or_wrong_weekday_is_rejected() {
        let mut store = store();
        let one_off = store.add_one_off("Dentist", MONDAY).unwrap();
        let recurring = store.add_recurring("Meditate", Weekday::Monday).unwrap();

        assert_eq!(
            store.exclude_occurrence(&one_off.id, MONDAY).unwrap_err().code(),
            "validation_error"
        );
        assert_eq!(
            store
                .exclude_occurrence(&recurring.id, date!(2025 - 12 - 23))
                .unwrap_err()
                .code(),
            "validation_error"
        );
        assert!(store.exclude_occurrence("task-missing", MONDAY).unwrap_err().is_not_found());
    }

    #[test]
    fn completing_excluded_occurrence_replaces_exclusion() {
        let mut store = store();
        let task = store.add_recurring("Meditate", Weekday::Monday).unwrap();
        store.exclude_occurrence(&task.id, MONDAY).unwrap();

        store.complete(&task.id, MONDAY).unwrap();

        assert!(!store.is_excluded(&task.id, MONDAY));
        assert!(store.completion_for(&task.id, MONDAY).is_some());
    }

    #[test]
    fn remove_occurrence_uncompletes_or_excludes() {
        let mut store = store();
        let task = store.add_recurring("Meditate", Weekday::Monday).unwrap();
        store.complete(&task.id, MONDAY).unwrap();

        let removed = store.remove_occurrence(&task.id, MONDAY).unwrap();
        assert!(matches!(removed, RemovedOccurrence::Uncompleted(ref list) if list.len() == 1));
        assert!(store.completions().is_empty());

        let removed = store.remove_occurrence(&task.id, MONDAY).unwrap();
        assert!(matches!(removed, RemovedOccurrence::Excluded(_)));
        assert!(store.is_excluded(&task.id, MONDAY));
    }

    #[test]
    fn load_drops_orphaned_and_conflicting_exclusions() {
        let kv = MemoryStore::new();
        kv.insert(
            "recurringTasks",
            serde_json::json!([{
                "id": "task-1",
                "text": "Meditate",
                "weekday": "Monday",
                "createdAt": "2025-12-01T08:00:00Z"
            }]),
        );
        kv.insert(
            "completions",
            serde_json::json!([{
                "taskId": "task-1",
                "sourceTaskSnapshot": {
                    "kind": "recurring",
                    "id": "task-1",
                    "text": "Meditate",
                    "weekday": "Monday",
                    "createdAt": "2025-12-01T08:00:00Z"
                },
                "completedAt": "2025-12-15T08:00:00Z",
                "completedOnDate": "2025-12-15"
            }]),
        );
        kv.insert(
            "exclusions",
            serde_json::json!([
                { "taskId": "task-1", "date": "2025-12-15" },
                { "taskId": "task-1", "date": "2025-12-22" },
                { "taskId": "task-1", "date": "2025-12-22" },
                { "taskId": "task-deleted", "date": "2025-12-22" }
            ]),
        );

        let store = TaskStore::load(&kv, Rc::new(ManualClock::new(datetime!(2025-12-22 09:00 UTC))));

        assert_eq!(store.exclusions().len(), 1);
        assert_eq!(store.exclusions()[0].date, MONDAY);
        assert_eq!(store.dirty_collections(), vec![Collection::Exclusions]);
    }
}
