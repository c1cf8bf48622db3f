//! Per-day projection of the task store.
//!
//! A day's view is derived on demand and never cached: recurring tasks
//! scheduled for the weekday (minus exclusions and completions), then
//! one-off tasks due that day, then that day's completions. Each group
//! keeps insertion order so callers can rely on stable positions.

use crate::model::{Completion, Task, Weekday};
use crate::store::TaskStore;
use time::{Date, Duration, Month};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Occurrence {
    Pending(Task),
    Completed(Completion),
}

impl Occurrence {
    pub fn task_id(&self) -> &str {
        match self {
            Occurrence::Pending(task) => task.id(),
            Occurrence::Completed(completion) => &completion.task_id,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Occurrence::Completed(_))
    }
}

pub fn occurrences_on(store: &TaskStore, date: Date) -> Vec<Occurrence> {
    let weekday = Weekday::of(date);
    let mut occurrences = Vec::new();

    for task in store.recurring_tasks() {
        if task.weekday != weekday
            || store.is_excluded(&task.id, date)
            || store.completion_for(&task.id, date).is_some()
        {
            continue;
        }
        occurrences.push(Occurrence::Pending(Task::Recurring(task.clone())));
    }

    for task in store.one_off_tasks() {
        if task.due_date == date {
            occurrences.push(Occurrence::Pending(Task::OneOff(task.clone())));
        }
    }

    // (task_id, date) is the display identity; later duplicates are hidden.
    let mut surfaced: Vec<&str> = Vec::new();
    for completion in store.completions() {
        if completion.completed_on_date != date || surfaced.contains(&completion.task_id.as_str()) {
            continue;
        }
        surfaced.push(&completion.task_id);
        occurrences.push(Occurrence::Completed(completion.clone()));
    }

    occurrences
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayStatus {
    Empty,
    AllDone,
    SomeDone,
    NoneDone,
}

/// How a caller labels a [`DayStatus`] relative to today. Only the
/// "nothing done" case reads differently for past and upcoming days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayVerdict {
    Empty,
    Complete,
    Partial,
    Missed,
    Upcoming,
}

impl DayStatus {
    pub fn verdict(self, date: Date, today: Date) -> DayVerdict {
        match self {
            DayStatus::Empty => DayVerdict::Empty,
            DayStatus::AllDone => DayVerdict::Complete,
            DayStatus::SomeDone => DayVerdict::Partial,
            DayStatus::NoneDone if date < today => DayVerdict::Missed,
            DayStatus::NoneDone => DayVerdict::Upcoming,
        }
    }
}

pub fn status_of(occurrences: &[Occurrence]) -> DayStatus {
    if occurrences.is_empty() {
        return DayStatus::Empty;
    }
    let done = occurrences.iter().filter(|o| o.is_completed()).count();
    if done == occurrences.len() {
        DayStatus::AllDone
    } else if done > 0 {
        DayStatus::SomeDone
    } else {
        DayStatus::NoneDone
    }
}

pub fn day_status(store: &TaskStore, date: Date) -> DayStatus {
    status_of(&occurrences_on(store, date))
}

/// Dates shown for a month: from the start of the week holding the 1st
/// through the end of the week holding the last day.
pub fn month_grid(year: i32, month: Month, week_starts_on: Weekday) -> Vec<Date> {
    let Ok(first) = Date::from_calendar_date(year, month, 1) else {
        return Vec::new();
    };
    let days_in_month = time::util::days_in_year_month(year, month);
    let last = first + Duration::days(i64::from(days_in_month) - 1);

    let start_offset = days_since(week_starts_on, Weekday::of(first));
    let week_ends_on = Weekday::ALL[(index_of(week_starts_on) + 6) % 7];
    let end_offset = days_since(Weekday::of(last), week_ends_on);

    let start = first - Duration::days(start_offset);
    let end = last + Duration::days(end_offset);

    let mut dates = Vec::new();
    let mut cursor = start;
    while cursor <= end {
        dates.push(cursor);
        match cursor.next_day() {
            Some(next) => cursor = next,
            None => break,
        }
    }
    dates
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarDay {
    pub date: Date,
    pub status: DayStatus,
    pub in_month: bool,
}

pub fn month_overview(
    store: &TaskStore,
    year: i32,
    month: Month,
    week_starts_on: Weekday,
) -> Vec<CalendarDay> {
    month_grid(year, month, week_starts_on)
        .into_iter()
        .map(|date| CalendarDay {
            date,
            status: day_status(store, date),
            in_month: date.month() == month && date.year() == year,
        })
        .collect()
}

fn index_of(weekday: Weekday) -> usize {
    Weekday::ALL
        .iter()
        .position(|day| *day == weekday)
        .unwrap_or(0)
}

/// Days to walk forward from `from` to reach `to`.
fn days_since(from: Weekday, to: Weekday) -> i64 {
    ((index_of(to) + 7 - index_of(from)) % 7) as i64
}
