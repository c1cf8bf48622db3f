//! Change notifications from the task store and the streak validator.
//!
//! Subscriptions are scoped to the owning component; there is no
//! process-wide channel. Observers are called synchronously after the
//! mutation has been applied and must not call back into the engine.

use crate::model::{StreakState, Weekday};
use crate::storage::Collection;
use crate::streak::Verdict;
use std::rc::Rc;
use time::Date;

/// Which days a task-collection change can have affected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeScope {
    Day(Date),
    /// Every date falling on this weekday.
    Weekday(Weekday),
    All,
}

impl ChangeScope {
    pub fn covers(&self, date: Date) -> bool {
        match self {
            ChangeScope::Day(day) => *day == date,
            ChangeScope::Weekday(weekday) => Weekday::of(date) == *weekday,
            ChangeScope::All => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    Tasks {
        collection: Collection,
        scope: ChangeScope,
    },
    Streak {
        state: StreakState,
        verdict: Verdict,
    },
}

pub trait Observer {
    fn on_change(&self, event: &ChangeEvent);
}

impl<F: Fn(&ChangeEvent)> Observer for F {
    fn on_change(&self, event: &ChangeEvent) {
        self(event)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

#[derive(Default)]
pub struct ObserverSet {
    next_id: u64,
    entries: Vec<(SubscriptionId, Rc<dyn Observer>)>,
}

impl ObserverSet {
    pub fn subscribe(&mut self, observer: Rc<dyn Observer>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, observer));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry_id, _)| *entry_id != id);
        self.entries.len() != before
    }

    pub fn emit(&self, event: &ChangeEvent) {
        for (_, observer) in &self.entries {
            observer.on_change(event);
        }
    }
}

impl std::fmt::Debug for ObserverSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverSet")
            .field("subscribers", &self.entries.len())
            .finish()
    }
}
