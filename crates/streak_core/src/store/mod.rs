//! In-memory task model: recurring tasks, one-off tasks, the completion log
//! and per-occurrence exclusions.
//!
//! Every mutation marks the touched collections dirty and notifies
//! subscribers; writing dirty collections out is the caller's call
//! (see [`TaskStore::persist_dirty`]).

mod exclusion;

pub use exclusion::RemovedOccurrence;

use crate::clock::Clock;
use crate::error::AppError;
use crate::model::{Completion, Exclusion, OneOffTask, RecurringTask, Task, TaskPatch, Weekday};
use crate::observe::{ChangeEvent, ChangeScope, Observer, ObserverSet, SubscriptionId};
use crate::storage::{self, Collection, KeyValueStore, PersistFailure};
use serde::Serialize;
use std::collections::BTreeSet;
use std::rc::Rc;
use time::Date;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// What a cascading delete removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletedTask {
    /// `None` when the task record itself was already gone (a completed
    /// one-off) and only its completions were removed.
    pub task: Option<Task>,
    pub completions_removed: usize,
    pub exclusions_removed: usize,
}

pub struct TaskStore {
    clock: Rc<dyn Clock>,
    recurring: Vec<RecurringTask>,
    one_off: Vec<OneOffTask>,
    completions: Vec<Completion>,
    exclusions: Vec<Exclusion>,
    dirty: BTreeSet<Collection>,
    observers: ObserverSet,
}

impl TaskStore {
    pub fn new(clock: Rc<dyn Clock>) -> Self {
        Self {
            clock,
            recurring: Vec::new(),
            one_off: Vec::new(),
            completions: Vec::new(),
            exclusions: Vec::new(),
            dirty: BTreeSet::new(),
            observers: ObserverSet::default(),
        }
    }

    /// Loads every collection, falling back to empty for any collection
    /// that is absent, unreadable or malformed.
    pub fn load(kv: &dyn KeyValueStore, clock: Rc<dyn Clock>) -> Self {
        let mut store = Self::new(clock);
        let recurring = storage::load_or_default(kv, Collection::RecurringTasks);
        store.recurring = recurring.value;
        store.one_off = storage::load_or_default(kv, Collection::OneOffTasks).value;
        store.completions = storage::load_or_default(kv, Collection::Completions).value;
        store.exclusions = storage::load_or_default(kv, Collection::Exclusions).value;

        // Without the recurring rules every reference would look orphaned.
        if recurring.intact {
            store.repair_references();
        } else {
            warn!("recurring tasks unreadable, skipping reference repair");
        }

        info!(
            recurring = store.recurring.len(),
            one_off = store.one_off.len(),
            completions = store.completions.len(),
            exclusions = store.exclusions.len(),
            "task store loaded"
        );
        store
    }

    pub fn recurring_tasks(&self) -> &[RecurringTask] {
        &self.recurring
    }

    pub fn one_off_tasks(&self) -> &[OneOffTask] {
        &self.one_off
    }

    pub fn completions(&self) -> &[Completion] {
        &self.completions
    }

    pub fn exclusions(&self) -> &[Exclusion] {
        &self.exclusions
    }

    pub fn find_task(&self, id: &str) -> Option<Task> {
        if let Some(task) = self.recurring.iter().find(|task| task.id == id) {
            return Some(Task::Recurring(task.clone()));
        }
        self.one_off
            .iter()
            .find(|task| task.id == id)
            .map(|task| Task::OneOff(task.clone()))
    }

    pub fn completion_for(&self, task_id: &str, date: Date) -> Option<&Completion> {
        self.completions
            .iter()
            .find(|completion| completion.matches(task_id, date))
    }

    pub fn is_dirty(&self) -> bool {
        !self.dirty.is_empty()
    }

    pub fn dirty_collections(&self) -> Vec<Collection> {
        self.dirty.iter().copied().collect()
    }

    pub fn subscribe(&mut self, observer: Rc<dyn Observer>) -> SubscriptionId {
        self.observers.subscribe(observer)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.observers.unsubscribe(id)
    }

    pub fn add_recurring(&mut self, text: &str, weekday: Weekday) -> Result<RecurringTask, AppError> {
        let text = require_text(text)?;
        let task = RecurringTask {
            id: new_task_id(),
            text,
            weekday,
            created_at: self.clock.now(),
        };
        debug!(id = %task.id, %weekday, "adding recurring task");

        self.recurring.push(task.clone());
        self.touch(Collection::RecurringTasks, ChangeScope::Weekday(weekday));
        Ok(task)
    }

    pub fn add_one_off(&mut self, text: &str, due_date: Date) -> Result<OneOffTask, AppError> {
        let text = require_text(text)?;
        let task = OneOffTask {
            id: new_task_id(),
            text,
            due_date,
            created_at: self.clock.now(),
        };
        debug!(id = %task.id, due_date = %due_date, "adding one-off task");

        self.one_off.push(task.clone());
        self.touch(Collection::OneOffTasks, ChangeScope::Day(due_date));
        Ok(task)
    }

    /// Records that `task_id` was done on `on_date`.
    ///
    /// Completing a pair that already has a completion returns that record
    /// unchanged. A one-off task is consumed by its completion. Any
    /// exclusion for the same pair is dropped so the two never coexist.
    pub fn complete(&mut self, task_id: &str, on_date: Date) -> Result<Completion, AppError> {
        let task_id = require_id(task_id)?;
        if let Some(existing) = self.completion_for(task_id, on_date) {
            debug!(%task_id, on_date = %on_date, "completion already recorded");
            return Ok(existing.clone());
        }

        let snapshot = self
            .find_task(task_id)
            .ok_or_else(|| AppError::not_found(format!("task not found: {task_id}")))?;

        let now = self.clock.now();
        let completion = Completion {
            task_id: task_id.to_string(),
            source_task_snapshot: snapshot.clone(),
            completed_at: on_date.with_time(now.time()).assume_offset(now.offset()),
            completed_on_date: on_date,
        };

        if let Task::OneOff(task) = &snapshot {
            self.one_off.retain(|candidate| candidate.id != task.id);
            self.touch(Collection::OneOffTasks, ChangeScope::Day(task.due_date));
        }

        let before = self.exclusions.len();
        self.exclusions
            .retain(|exclusion| !exclusion.matches(task_id, on_date));
        if self.exclusions.len() != before {
            self.touch(Collection::Exclusions, ChangeScope::Day(on_date));
        }

        self.completions.push(completion.clone());
        self.touch(Collection::Completions, ChangeScope::Day(on_date));
        Ok(completion)
    }

    /// Deletes the completion(s) for `(task_id, date)`. A one-off task that
    /// was consumed by the completion is restored from its snapshot.
    pub fn uncomplete(&mut self, task_id: &str, date: Date) -> Result<Vec<Completion>, AppError> {
        let task_id = require_id(task_id)?;
        let (removed, kept): (Vec<Completion>, Vec<Completion>) = std::mem::take(&mut self.completions)
            .into_iter()
            .partition(|completion| completion.matches(task_id, date));
        self.completions = kept;

        let Some(first) = removed.first() else {
            return Err(AppError::not_found(format!(
                "no completion for {task_id} on {date}"
            )));
        };

        if let Task::OneOff(snapshot) = &first.source_task_snapshot
            && self.find_task(task_id).is_none()
        {
            let position = self
                .one_off
                .iter()
                .position(|task| task.created_at > snapshot.created_at)
                .unwrap_or(self.one_off.len());
            self.one_off.insert(position, snapshot.clone());
            self.touch(Collection::OneOffTasks, ChangeScope::Day(snapshot.due_date));
        }

        self.touch(Collection::Completions, ChangeScope::Day(date));
        Ok(removed)
    }

    /// Removes a task and everything that references it.
    pub fn delete_task(&mut self, task_id: &str) -> Result<DeletedTask, AppError> {
        let task_id = require_id(task_id)?;

        let task = if let Some(index) = self.recurring.iter().position(|task| task.id == task_id) {
            let removed = self.recurring.remove(index);
            self.touch(Collection::RecurringTasks, ChangeScope::Weekday(removed.weekday));
            Some(Task::Recurring(removed))
        } else if let Some(index) = self.one_off.iter().position(|task| task.id == task_id) {
            let removed = self.one_off.remove(index);
            self.touch(Collection::OneOffTasks, ChangeScope::Day(removed.due_date));
            Some(Task::OneOff(removed))
        } else {
            None
        };

        let completions_before = self.completions.len();
        self.completions
            .retain(|completion| completion.task_id != task_id);
        let completions_removed = completions_before - self.completions.len();

        let exclusions_before = self.exclusions.len();
        self.exclusions.retain(|exclusion| exclusion.task_id != task_id);
        let exclusions_removed = exclusions_before - self.exclusions.len();

        if task.is_none() && completions_removed == 0 && exclusions_removed == 0 {
            return Err(AppError::not_found(format!("task not found: {task_id}")));
        }
        if completions_removed > 0 {
            self.touch(Collection::Completions, ChangeScope::All);
        }
        if exclusions_removed > 0 {
            self.touch(Collection::Exclusions, ChangeScope::All);
        }

        info!(%task_id, completions_removed, exclusions_removed, "task deleted");
        Ok(DeletedTask {
            task,
            completions_removed,
            exclusions_removed,
        })
    }

    pub fn edit(&mut self, task_id: &str, patch: TaskPatch) -> Result<Task, AppError> {
        let task_id = require_id(task_id)?;
        if patch.is_empty() {
            return Err(AppError::validation("nothing to change"));
        }
        let text = patch.text.as_deref().map(require_text).transpose()?;

        if let Some(task) = self.recurring.iter_mut().find(|task| task.id == task_id) {
            if patch.due_date.is_some() {
                return Err(AppError::validation("recurring tasks have no due date"));
            }
            let previous_weekday = task.weekday;
            if let Some(text) = text {
                task.text = text;
            }
            if let Some(weekday) = patch.weekday {
                task.weekday = weekday;
            }
            let updated = task.clone();

            if updated.weekday == previous_weekday {
                self.touch(Collection::RecurringTasks, ChangeScope::Weekday(updated.weekday));
            } else {
                self.touch(Collection::RecurringTasks, ChangeScope::All);
                let before = self.exclusions.len();
                self.exclusions.retain(|exclusion| {
                    exclusion.task_id != task_id || Weekday::of(exclusion.date) == updated.weekday
                });
                if self.exclusions.len() != before {
                    self.touch(Collection::Exclusions, ChangeScope::Weekday(previous_weekday));
                }
            }
            return Ok(Task::Recurring(updated));
        }

        if let Some(task) = self.one_off.iter_mut().find(|task| task.id == task_id) {
            if patch.weekday.is_some() {
                return Err(AppError::validation("one-off tasks have no weekday"));
            }
            let previous_due = task.due_date;
            if let Some(text) = text {
                task.text = text;
            }
            if let Some(due_date) = patch.due_date {
                task.due_date = due_date;
            }
            let updated = task.clone();

            let scope = if updated.due_date == previous_due {
                ChangeScope::Day(updated.due_date)
            } else {
                ChangeScope::All
            };
            self.touch(Collection::OneOffTasks, scope);
            return Ok(Task::OneOff(updated));
        }

        Err(AppError::not_found(format!("task not found: {task_id}")))
    }

    /// Empties the completion log.
    pub fn clear_completions(&mut self) -> usize {
        let removed = self.completions.len();
        if removed > 0 {
            self.completions.clear();
            self.touch(Collection::Completions, ChangeScope::All);
        }
        removed
    }

    /// Writes every dirty collection. Failed collections stay dirty so the
    /// next call retries them; in-memory state is never rolled back.
    pub fn persist_dirty(&mut self, kv: &dyn KeyValueStore) -> Vec<PersistFailure> {
        let mut failures = Vec::new();
        for collection in self.dirty_collections() {
            let result = self
                .collection_value(collection)
                .and_then(|value| kv.save(collection.key(), &value));
            match result {
                Ok(()) => {
                    self.dirty.remove(&collection);
                }
                Err(error) => {
                    warn!(%collection, %error, "failed to persist collection");
                    failures.push(PersistFailure { collection, error });
                }
            }
        }
        failures
    }

    fn collection_value(&self, collection: Collection) -> Result<serde_json::Value, AppError> {
        match collection {
            Collection::RecurringTasks => to_value(&self.recurring),
            Collection::OneOffTasks => to_value(&self.one_off),
            Collection::Completions => to_value(&self.completions),
            Collection::Exclusions => to_value(&self.exclusions),
            Collection::StreakState => Err(AppError::persistence(
                "streak state is owned by the validator",
            )),
        }
    }

    /// Drops completions of recurring tasks that no longer exist; older
    /// data could leave these behind after a delete.
    fn repair_references(&mut self) {
        let recurring = &self.recurring;
        let before = self.completions.len();
        self.completions.retain(|completion| match &completion.source_task_snapshot {
            Task::Recurring(_) => recurring.iter().any(|task| task.id == completion.task_id),
            Task::OneOff(_) => true,
        });
        let dropped = before - self.completions.len();
        if dropped > 0 {
            warn!(dropped, "dropped completions of deleted recurring tasks");
            self.dirty.insert(Collection::Completions);
        }

        self.repair_exclusions();
    }

    fn touch(&mut self, collection: Collection, scope: ChangeScope) {
        self.dirty.insert(collection);
        self.observers
            .emit(&ChangeEvent::Tasks { collection, scope });
    }
}

impl std::fmt::Debug for TaskStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskStore")
            .field("recurring", &self.recurring)
            .field("one_off", &self.one_off)
            .field("completions", &self.completions)
            .field("exclusions", &self.exclusions)
            .field("dirty", &self.dirty)
            .finish()
    }
}

fn new_task_id() -> String {
    format!("task-{}", Uuid::now_v7())
}

fn require_id(id: &str) -> Result<&str, AppError> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        return Err(AppError::validation("id is required"));
    }
    Ok(trimmed)
}

fn require_text(text: &str) -> Result<String, AppError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(AppError::validation("text is required"));
    }
    Ok(trimmed.to_string())
}

fn to_value<T: Serialize>(items: &T) -> Result<serde_json::Value, AppError> {
    serde_json::to_value(items).map_err(|err| AppError::persistence(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::TaskStore;
    use crate::clock::ManualClock;
    use crate::model::{Task, TaskPatch, Weekday};
    use crate::observe::{ChangeEvent, ChangeScope};
    use crate::storage::{Collection, KeyValueStore, MemoryStore};
    use std::cell::RefCell;
    use std::rc::Rc;
    use time::macros::{date, datetime};

    fn store() -> TaskStore {
        TaskStore::new(Rc::new(ManualClock::new(datetime!(2025-12-22 09:00 UTC))))
    }

    #[test]
    fn add_recurring_rejects_blank_text() {
        let mut store = store();
        let err = store.add_recurring("   ", Weekday::Monday).unwrap_err();

        assert_eq!(err.code(), "validation_error");
        assert!(store.recurring_tasks().is_empty());
        assert!(!store.is_dirty());
    }

    #[test]
    fn add_tasks_trim_text_and_mark_dirty() {
        let mut store = store();
        let recurring = store.add_recurring("  Meditate ", Weekday::Monday).unwrap();
        let one_off = store.add_one_off("Dentist", date!(2025 - 12 - 24)).unwrap();

        assert_eq!(recurring.text, "Meditate");
        assert_eq!(recurring.created_at, datetime!(2025-12-22 09:00 UTC));
        assert_ne!(recurring.id, one_off.id);
        assert_eq!(
            store.dirty_collections(),
            vec![Collection::RecurringTasks, Collection::OneOffTasks]
        );
    }

    #[test]
    fn complete_one_off_consumes_task() {
        let mut store = store();
        let task = store.add_one_off("Dentist", date!(2025 - 12 - 24)).unwrap();

        let completion = store.complete(&task.id, date!(2025 - 12 - 22)).unwrap();

        assert!(store.one_off_tasks().is_empty());
        assert_eq!(completion.completed_on_date, date!(2025 - 12 - 22));
        assert_eq!(completion.completed_at.date(), completion.completed_on_date);
        assert_eq!(completion.source_task_snapshot, Task::OneOff(task.clone()));

        let err = store.complete(&task.id, date!(2025 - 12 - 23)).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn complete_recurring_keeps_rule_and_is_idempotent_per_day() {
        let mut store = store();
        let task = store.add_recurring("Meditate", Weekday::Monday).unwrap();

        let first = store.complete(&task.id, date!(2025 - 12 - 22)).unwrap();
        let second = store.complete(&task.id, date!(2025 - 12 - 22)).unwrap();

        assert_eq!(first, second);
        assert_eq!(store.completions().len(), 1);
        assert_eq!(store.recurring_tasks().len(), 1);
    }

    #[test]
    fn complete_unknown_task_reports_not_found_without_changes() {
        let mut store = store();
        let err = store.complete("task-missing", date!(2025 - 12 - 22)).unwrap_err();

        assert!(err.is_not_found());
        assert!(store.completions().is_empty());
        assert!(!store.is_dirty());
    }

    #[test]
    fn uncomplete_restores_consumed_one_off_in_creation_order() {
        let clock = Rc::new(ManualClock::new(datetime!(2025-12-22 09:00 UTC)));
        let mut store = TaskStore::new(clock.clone());
        let first = store.add_one_off("First", date!(2025 - 12 - 24)).unwrap();
        clock.advance(time::Duration::minutes(1));
        let second = store.add_one_off("Second", date!(2025 - 12 - 24)).unwrap();

        store.complete(&first.id, date!(2025 - 12 - 22)).unwrap();
        let removed = store.uncomplete(&first.id, date!(2025 - 12 - 22)).unwrap();

        assert_eq!(removed.len(), 1);
        assert!(store.completions().is_empty());
        let ids: Vec<&str> = store.one_off_tasks().iter().map(|task| task.id.as_str()).collect();
        assert_eq!(ids, vec![first.id.as_str(), second.id.as_str()]);
    }

    #[test]
    fn uncomplete_without_completion_is_not_found() {
        let mut store = store();
        let task = store.add_recurring("Meditate", Weekday::Monday).unwrap();

        let err = store.uncomplete(&task.id, date!(2025 - 12 - 22)).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn delete_cascades_completions_and_exclusions() {
        let mut store = store();
        let task = store.add_recurring("Meditate", Weekday::Monday).unwrap();
        let other = store.add_recurring("Stretch", Weekday::Monday).unwrap();
        store.complete(&task.id, date!(2025 - 12 - 22)).unwrap();
        store.exclude_occurrence(&task.id, date!(2025 - 12 - 29)).unwrap();
        store.complete(&other.id, date!(2025 - 12 - 22)).unwrap();

        let deleted = store.delete_task(&task.id).unwrap();

        assert_eq!(deleted.completions_removed, 1);
        assert_eq!(deleted.exclusions_removed, 1);
        assert!(store.completions().iter().all(|c| c.task_id != task.id));
        assert!(store.exclusions().is_empty());
        assert_eq!(store.completions().len(), 1);
    }

    #[test]
    fn delete_consumed_one_off_removes_its_completions() {
        let mut store = store();
        let task = store.add_one_off("Dentist", date!(2025 - 12 - 24)).unwrap();
        store.complete(&task.id, date!(2025 - 12 - 24)).unwrap();

        let deleted = store.delete_task(&task.id).unwrap();

        assert_eq!(deleted.task, None);
        assert_eq!(deleted.completions_removed, 1);
        assert!(store.delete_task(&task.id).unwrap_err().is_not_found());
    }

    #[test]
    fn edit_updates_text_and_rejects_mismatched_fields() {
        let mut store = store();
        let recurring = store.add_recurring("Meditate", Weekday::Monday).unwrap();
        let one_off = store.add_one_off("Dentist", date!(2025 - 12 - 24)).unwrap();

        let updated = store.edit(&recurring.id, TaskPatch::text("Meditate 20m")).unwrap();
        assert_eq!(updated.text(), "Meditate 20m");

        let patch = TaskPatch {
            due_date: Some(date!(2025 - 12 - 25)),
            ..TaskPatch::default()
        };
        assert_eq!(store.edit(&recurring.id, patch).unwrap_err().code(), "validation_error");

        let patch = TaskPatch {
            weekday: Some(Weekday::Friday),
            ..TaskPatch::default()
        };
        assert_eq!(store.edit(&one_off.id, patch).unwrap_err().code(), "validation_error");

        assert_eq!(
            store.edit(&one_off.id, TaskPatch::text(" ")).unwrap_err().code(),
            "validation_error"
        );
        assert!(store.edit("task-missing", TaskPatch::text("x")).unwrap_err().is_not_found());
    }

    #[test]
    fn moving_recurring_weekday_drops_stale_exclusions() {
        let mut store = store();
        let task = store.add_recurring("Meditate", Weekday::Monday).unwrap();
        store.exclude_occurrence(&task.id, date!(2025 - 12 - 22)).unwrap();

        let patch = TaskPatch {
            weekday: Some(Weekday::Tuesday),
            ..TaskPatch::default()
        };
        store.edit(&task.id, patch).unwrap();

        assert!(store.exclusions().is_empty());
    }

    #[test]
    fn mutations_notify_subscribers() {
        let mut store = store();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        store.subscribe(Rc::new(move |event: &ChangeEvent| sink.borrow_mut().push(event.clone())));

        store.add_recurring("Meditate", Weekday::Monday).unwrap();

        assert_eq!(
            seen.borrow().as_slice(),
            &[ChangeEvent::Tasks {
                collection: Collection::RecurringTasks,
                scope: ChangeScope::Weekday(Weekday::Monday),
            }]
        );
    }

    #[test]
    fn persist_dirty_writes_and_clears_flags() {
        let mut store = store();
        let kv = MemoryStore::new();
        store.add_recurring("Meditate", Weekday::Monday).unwrap();

        let failures = store.persist_dirty(&kv);

        assert!(failures.is_empty());
        assert!(!store.is_dirty());
        let saved = kv.get("recurringTasks").unwrap();
        assert_eq!(saved[0]["text"], "Meditate");
        assert_eq!(saved[0]["weekday"], "Monday");
    }

    struct FailingStore;

    impl KeyValueStore for FailingStore {
        fn load(&self, _key: &str) -> Result<Option<serde_json::Value>, crate::error::AppError> {
            Err(crate::error::AppError::persistence("disk unavailable"))
        }

        fn save(&self, _key: &str, _value: &serde_json::Value) -> Result<(), crate::error::AppError> {
            Err(crate::error::AppError::persistence("disk unavailable"))
        }
    }

    #[test]
    fn failed_persist_keeps_state_and_dirty_flag() {
        let mut store = store();
        store.add_recurring("Meditate", Weekday::Monday).unwrap();

        let failures = store.persist_dirty(&FailingStore);

        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].collection, Collection::RecurringTasks);
        assert_eq!(store.recurring_tasks().len(), 1);
        assert_eq!(store.dirty_collections(), vec![Collection::RecurringTasks]);
    }

    #[test]
    fn load_falls_back_to_empty_collections() {
        let kv = MemoryStore::new();
        kv.insert("recurringTasks", serde_json::json!({ "not": "a list" }));
        kv.insert(
            "oneOffTasks",
            serde_json::json!([{
                "id": "task-1",
                "text": "Dentist",
                "dueDate": "2025-12-24",
                "createdAt": "2025-12-20T08:00:00Z"
            }]),
        );

        let store = TaskStore::load(&kv, Rc::new(ManualClock::new(datetime!(2025-12-22 09:00 UTC))));
        assert!(store.recurring_tasks().is_empty());
        assert_eq!(store.one_off_tasks().len(), 1);

        let unavailable =
            TaskStore::load(&FailingStore, Rc::new(ManualClock::new(datetime!(2025-12-22 09:00 UTC))));
        assert!(unavailable.one_off_tasks().is_empty());
    }

    #[test]
    fn load_drops_orphaned_recurring_completions() {
        let kv = MemoryStore::new();
        kv.insert(
            "completions",
            serde_json::json!([
                {
                    "taskId": "task-gone",
                    "sourceTaskSnapshot": {
                        "kind": "recurring",
                        "id": "task-gone",
                        "text": "Old habit",
                        "weekday": "Monday",
                        "createdAt": "2025-12-01T08:00:00Z"
                    },
                    "completedAt": "2025-12-15T08:00:00Z",
                    "completedOnDate": "2025-12-15"
                },
                {
                    "taskId": "task-once",
                    "sourceTaskSnapshot": {
                        "kind": "oneOff",
                        "id": "task-once",
                        "text": "Dentist",
                        "dueDate": "2025-12-15",
                        "createdAt": "2025-12-01T08:00:00Z"
                    },
                    "completedAt": "2025-12-15T08:00:00Z",
                    "completedOnDate": "2025-12-15"
                }
            ]),
        );

        let store = TaskStore::load(&kv, Rc::new(ManualClock::new(datetime!(2025-12-22 09:00 UTC))));

        assert_eq!(store.completions().len(), 1);
        assert_eq!(store.completions()[0].task_id, "task-once");
        assert_eq!(store.dirty_collections(), vec![Collection::Completions]);
    }

    #[test]
    fn unreadable_recurring_tasks_leave_references_alone() {
        let kv = MemoryStore::new();
        kv.insert("recurringTasks", serde_json::json!("{ not json"));
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
            serde_json::json!([{ "taskId": "task-1", "date": "2025-12-22" }]),
        );

        let store = TaskStore::load(&kv, Rc::new(ManualClock::new(datetime!(2025-12-22 09:00 UTC))));

        assert!(store.recurring_tasks().is_empty());
        assert_eq!(store.completions().len(), 1);
        assert_eq!(store.exclusions().len(), 1);
        assert!(!store.is_dirty());
    }
}
