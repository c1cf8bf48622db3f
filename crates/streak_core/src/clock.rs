//! Wall-clock access. Everything in the engine reads local time through
//! [`Clock`] so hosts and tests can drive days deterministically.

use std::cell::Cell;
use std::fmt;
use std::sync::Once;
use time::{Date, Duration, OffsetDateTime, UtcOffset};
use tracing::warn;

pub trait Clock {
    /// Current instant in the local offset.
    fn now(&self) -> OffsetDateTime;

    fn today(&self) -> Date {
        self.now().date()
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc().to_offset(local_offset())
    }
}

/// Local offset, or UTC when the platform cannot report it (on unix this
/// happens once the process has more than one thread).
pub fn local_offset() -> UtcOffset {
    offset_or_utc(UtcOffset::current_local_offset())
}

static UTC_FALLBACK_WARNED: Once = Once::new();

fn offset_or_utc<E: fmt::Display>(offset: Result<UtcOffset, E>) -> UtcOffset {
    offset.unwrap_or_else(|error| {
        UTC_FALLBACK_WARNED.call_once(|| {
            warn!(%error, "local offset unavailable, day boundaries follow UTC midnight");
        });
        UtcOffset::UTC
    })
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Cell<OffsetDateTime>,
}

impl ManualClock {
    pub fn new(now: OffsetDateTime) -> Self {
        Self {
            now: Cell::new(now),
        }
    }

    pub fn set(&self, now: OffsetDateTime) {
        self.now.set(now);
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> OffsetDateTime {
        self.now.get()
    }
}

pub fn next_local_midnight(now: OffsetDateTime) -> OffsetDateTime {
    midnight_after(now.date(), now.offset())
}

/// Start of the day following `day`, in `offset`.
pub fn midnight_after(day: Date, offset: UtcOffset) -> OffsetDateTime {
    let next = day.next_day().unwrap_or(day);
    next.midnight().assume_offset(offset)
}

pub fn seconds_until_next_midnight(now: OffsetDateTime) -> i64 {
    (next_local_midnight(now) - now).whole_seconds()
}

/// Renders a countdown as `HH:MM:SS`; negative input clamps to zero.
pub fn format_countdown(seconds: i64) -> String {
    let seconds = seconds.max(0);
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    format!("{hours:02}:{minutes:02}:{secs:02}")
}
