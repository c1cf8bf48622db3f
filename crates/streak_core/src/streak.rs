//! Day-boundary streak validation.
//!
//! The validator renders at most one verdict per calendar day. The day it
//! last ruled on is persisted alongside the count, so any number of
//! drivers may report the same boundary and only the first one counts.

use crate::config::ObligationScope;
use crate::error::AppError;
use crate::model::{RecurringTask, StreakState, Weekday};
use crate::observe::{ChangeEvent, Observer, ObserverSet, SubscriptionId};
use crate::storage::{self, Collection, KeyValueStore, PersistFailure};
use crate::store::TaskStore;
use std::rc::Rc;
use time::Date;
use tracing::{debug, info, warn};

/// Outcome of one `DayBoundaryCrossed(today)` event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// A verdict for this day already exists.
    AlreadyValidated,
    /// No recurring obligations existed yesterday; nothing was recorded and
    /// the boundary may be retried.
    NoObligations,
    /// Yesterday was complete and continued the previous streak day.
    Extended { count: u32 },
    /// Yesterday was complete but followed a gap; the streak starts at 1.
    Restarted,
    /// Yesterday was incomplete.
    Broken,
    /// Set directly by the user.
    Overridden { count: u32 },
}

impl Verdict {
    /// Whether the streak state was written.
    pub fn recorded(self) -> bool {
        !matches!(self, Verdict::AlreadyValidated | Verdict::NoObligations)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Validated(Date),
}

#[derive(Debug, Default)]
pub struct StreakValidator {
    state: StreakState,
    dirty: bool,
    observers: ObserverSet,
}

impl StreakValidator {
    pub fn new(state: StreakState) -> Self {
        Self {
            state,
            dirty: false,
            observers: ObserverSet::default(),
        }
    }

    pub fn load(kv: &dyn KeyValueStore) -> Self {
        let state: StreakState = storage::load_or_default(kv, Collection::StreakState).value;
        debug!(count = state.count, last_validated = ?state.last_validated_date, "streak state loaded");
        Self::new(state)
    }

    pub fn state(&self) -> StreakState {
        self.state
    }

    pub fn phase(&self) -> Phase {
        match self.state.last_validated_date {
            Some(date) => Phase::Validated(date),
            None => Phase::Idle,
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn subscribe(&mut self, observer: Rc<dyn Observer>) -> SubscriptionId {
        self.observers.subscribe(observer)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.observers.unsubscribe(id)
    }

    /// Handles `DayBoundaryCrossed(today)`, judging the day before `today`.
    pub fn on_day_boundary(&mut self, today: Date, store: &TaskStore, scope: ObligationScope) -> Verdict {
        // A guard later than `today` means the clock moved backwards; the
        // later verdict stands.
        if self
            .state
            .last_validated_date
            .is_some_and(|validated| validated >= today)
        {
            debug!(today = %today, "boundary already validated");
            return Verdict::AlreadyValidated;
        }

        let Some(yesterday) = today.previous_day() else {
            return Verdict::NoObligations;
        };

        let obligations = obligations_for(store, yesterday, scope);
        if obligations.is_empty() {
            debug!(yesterday = %yesterday, "no recurring obligations, validation deferred");
            return Verdict::NoObligations;
        }

        let all_completed = obligations
            .iter()
            .all(|task| store.completion_for(&task.id, yesterday).is_some());

        let verdict = if all_completed {
            let contiguous = self.state.last_validated_date.is_some()
                && self.state.last_validated_date == continuing_guard(store, yesterday, scope);
            if contiguous {
                self.state.count = self.state.count.saturating_add(1);
                Verdict::Extended {
                    count: self.state.count,
                }
            } else {
                self.state.count = 1;
                Verdict::Restarted
            }
        } else {
            self.state.count = 0;
            Verdict::Broken
        };
        self.state.last_validated_date = Some(today);

        info!(
            today = %today,
            obligations = obligations.len(),
            count = self.state.count,
            ?verdict,
            "streak validated"
        );
        self.record(verdict);
        verdict
    }

    /// Writes the count directly. The validation guard is left alone so a
    /// pending boundary still gets judged.
    pub fn set_streak(&mut self, count: u32) -> StreakState {
        info!(count, "streak set manually");
        self.state.count = count;
        self.record(Verdict::Overridden { count });
        self.state
    }

    pub fn reset_streak(&mut self) -> StreakState {
        self.set_streak(0)
    }

    pub fn persist(&mut self, kv: &dyn KeyValueStore) -> Option<PersistFailure> {
        if !self.dirty {
            return None;
        }
        let collection = Collection::StreakState;
        let result = serde_json::to_value(self.state)
            .map_err(|err| AppError::persistence(err.to_string()))
            .and_then(|value| kv.save(collection.key(), &value));
        match result {
            Ok(()) => {
                self.dirty = false;
                None
            }
            Err(error) => {
                warn!(%collection, %error, "failed to persist streak state");
                Some(PersistFailure { collection, error })
            }
        }
    }

    fn record(&mut self, verdict: Verdict) {
        self.dirty = true;
        self.observers.emit(&ChangeEvent::Streak {
            state: self.state,
            verdict,
        });
    }
}

/// Recurring tasks that bound the streak for `day`: every recurring task
/// created on or before it, optionally narrowed to the ones actually
/// scheduled (and not excluded) that day.
pub fn obligations_for(store: &TaskStore, day: Date, scope: ObligationScope) -> Vec<&RecurringTask> {
    store
        .recurring_tasks()
        .iter()
        .filter(|task| task.created_at.date() <= day)
        .filter(|task| match scope {
            ObligationScope::AllRecurring => true,
            ObligationScope::ScheduledForDay => {
                task.weekday == Weekday::of(day) && !store.is_excluded(&task.id, day)
            }
        })
        .collect()
}

/// The guard a streak still running into `day` would carry: the boundary
/// right after the previous day that had obligations. Days with nothing
/// scheduled neither extend nor break a streak.
fn continuing_guard(store: &TaskStore, day: Date, scope: ObligationScope) -> Option<Date> {
    match scope {
        ObligationScope::AllRecurring => Some(day),
        ObligationScope::ScheduledForDay => {
            let earliest = store
                .recurring_tasks()
                .iter()
                .map(|task| task.created_at.date())
                .min()?;
            let mut cursor = day.previous_day()?;
            while cursor >= earliest {
                if !obligations_for(store, cursor, scope).is_empty() {
                    return cursor.next_day();
                }
                cursor = cursor.previous_day()?;
            }
            None
        }
    }
}
