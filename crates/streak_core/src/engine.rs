//! Entry point for UI collaborators: wires the task store, the streak
//! validator, persistence and the clock together.
//!
//! Every mutating call writes the collections it touched before returning.
//! A failed write is logged and retried on the next flush; the in-memory
//! state is never rolled back.

use crate::clock::{self, Clock, SystemClock};
use crate::config::EngineConfig;
use crate::error::AppError;
use crate::model::{Completion, Exclusion, OneOffTask, RecurringTask, StreakState, Task, TaskPatch, Weekday};
use crate::observe::{Observer, SubscriptionId};
use crate::projector::{self, CalendarDay, DayStatus, Occurrence};
use crate::storage::json_store::{self, JsonDirStore};
use crate::storage::{KeyValueStore, PersistFailure};
use crate::store::{DeletedTask, RemovedOccurrence, TaskStore};
use crate::streak::{Phase, StreakValidator, Verdict};
use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;
use time::{Date, Month};
use tracing::info;

/// Handle shared by every driver in the process.
pub type SharedEngine = Rc<RefCell<Engine>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineSubscription {
    store: SubscriptionId,
    streak: SubscriptionId,
}

pub struct Engine {
    config: EngineConfig,
    clock: Rc<dyn Clock>,
    kv: Box<dyn KeyValueStore>,
    store: TaskStore,
    validator: StreakValidator,
}

impl Engine {
    pub fn load(config: EngineConfig, kv: Box<dyn KeyValueStore>, clock: Rc<dyn Clock>) -> Self {
        let store = TaskStore::load(kv.as_ref(), Rc::clone(&clock));
        let validator = StreakValidator::load(kv.as_ref());
        let mut engine = Self {
            config,
            clock,
            kv,
            store,
            validator,
        };
        // Persist whatever the load had to repair.
        engine.flush();
        engine
    }

    /// Opens the on-disk store with the system clock.
    pub fn open(config: EngineConfig) -> Result<Self, AppError> {
        config.validate()?;
        let dir = resolve_store_dir(&config)?;
        info!(dir = %dir.display(), "opening streak store");
        Ok(Self::load(
            config,
            Box::new(JsonDirStore::new(dir)),
            Rc::new(SystemClock),
        ))
    }

    pub fn into_shared(self) -> SharedEngine {
        Rc::new(RefCell::new(self))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn clock(&self) -> Rc<dyn Clock> {
        Rc::clone(&self.clock)
    }

    pub fn today(&self) -> Date {
        self.clock.today()
    }

    pub fn seconds_until_next_midnight(&self) -> i64 {
        clock::seconds_until_next_midnight(self.clock.now())
    }

    pub fn store(&self) -> &TaskStore {
        &self.store
    }

    pub fn streak(&self) -> StreakState {
        self.validator.state()
    }

    pub fn phase(&self) -> Phase {
        self.validator.phase()
    }

    pub fn subscribe(&mut self, observer: Rc<dyn Observer>) -> EngineSubscription {
        EngineSubscription {
            store: self.store.subscribe(Rc::clone(&observer)),
            streak: self.validator.subscribe(observer),
        }
    }

    pub fn unsubscribe(&mut self, subscription: EngineSubscription) -> bool {
        let store = self.store.unsubscribe(subscription.store);
        let streak = self.validator.unsubscribe(subscription.streak);
        store || streak
    }

    pub fn add_recurring(&mut self, text: &str, weekday: Weekday) -> Result<RecurringTask, AppError> {
        self.mutate(|store| store.add_recurring(text, weekday))
    }

    pub fn add_one_off(&mut self, text: &str, due_date: Date) -> Result<OneOffTask, AppError> {
        self.mutate(|store| store.add_one_off(text, due_date))
    }

    pub fn complete(&mut self, task_id: &str, on_date: Date) -> Result<Completion, AppError> {
        self.mutate(|store| store.complete(task_id, on_date))
    }

    /// Completes on the clock's current date.
    pub fn complete_today(&mut self, task_id: &str) -> Result<Completion, AppError> {
        let today = self.today();
        self.complete(task_id, today)
    }

    pub fn uncomplete(&mut self, task_id: &str, date: Date) -> Result<Vec<Completion>, AppError> {
        self.mutate(|store| store.uncomplete(task_id, date))
    }

    pub fn exclude_occurrence(&mut self, task_id: &str, date: Date) -> Result<Exclusion, AppError> {
        self.mutate(|store| store.exclude_occurrence(task_id, date))
    }

    pub fn remove_occurrence(&mut self, task_id: &str, date: Date) -> Result<RemovedOccurrence, AppError> {
        self.mutate(|store| store.remove_occurrence(task_id, date))
    }

    pub fn delete_task(&mut self, task_id: &str) -> Result<DeletedTask, AppError> {
        self.mutate(|store| store.delete_task(task_id))
    }

    pub fn edit(&mut self, task_id: &str, patch: TaskPatch) -> Result<Task, AppError> {
        self.mutate(|store| store.edit(task_id, patch))
    }

    pub fn clear_completions(&mut self) -> usize {
        let removed = self.store.clear_completions();
        self.flush();
        removed
    }

    pub fn set_streak(&mut self, count: u32) -> StreakState {
        let state = self.validator.set_streak(count);
        self.flush();
        state
    }

    pub fn reset_streak(&mut self) -> StreakState {
        let state = self.validator.reset_streak();
        self.flush();
        state
    }

    pub fn occurrences_on(&self, date: Date) -> Vec<Occurrence> {
        projector::occurrences_on(&self.store, date)
    }

    pub fn day_status(&self, date: Date) -> DayStatus {
        projector::day_status(&self.store, date)
    }

    pub fn month_overview(&self, year: i32, month: Month) -> Vec<CalendarDay> {
        projector::month_overview(&self.store, year, month, self.config.week_starts_on)
    }

    /// `DayBoundaryCrossed(today)`. Safe to call any number of times.
    pub fn day_boundary_crossed(&mut self, today: Date) -> Verdict {
        let verdict = self
            .validator
            .on_day_boundary(today, &self.store, self.config.obligation_scope);
        if verdict.recorded() {
            self.flush();
        }
        verdict
    }

    /// Writes every dirty collection and the streak state if it changed.
    pub fn flush(&mut self) -> Vec<PersistFailure> {
        let mut failures = self.store.persist_dirty(self.kv.as_ref());
        failures.extend(self.validator.persist(self.kv.as_ref()));
        failures
    }

    fn mutate<T>(
        &mut self,
        op: impl FnOnce(&mut TaskStore) -> Result<T, AppError>,
    ) -> Result<T, AppError> {
        let result = op(&mut self.store);
        if self.store.is_dirty() {
            self.flush();
        }
        result
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("store", &self.store)
            .field("validator", &self.validator)
            .finish_non_exhaustive()
    }
}

/// `STREAK_STORE_DIR` wins, then the configured directory, then the
/// platform default.
fn resolve_store_dir(config: &EngineConfig) -> Result<PathBuf, AppError> {
    let env_set = std::env::var("STREAK_STORE_DIR").is_ok_and(|value| !value.trim().is_empty());
    match (&config.store_dir, env_set) {
        (Some(dir), false) => Ok(dir.clone()),
        _ => json_store::store_dir(),
    }
}
