//! Local-midnight detection.
//!
//! A [`Driver`] samples the clock on a fixed period and reports
//! `DayBoundaryCrossed(today)` to the shared engine whenever the local date
//! moves forward. Several drivers may share one engine; the validator's
//! guard makes the repeated reports harmless.

use crate::clock::{self, Clock};
use crate::engine::SharedEngine;
use crate::streak::Verdict;
use std::rc::Rc;
use std::time::Duration;
use time::Date;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

/// Result of one clock sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    /// Seconds left until the next local midnight.
    pub remaining_secs: i64,
    /// Set when this sample reported a boundary to the engine.
    pub verdict: Option<Verdict>,
}

impl Tick {
    pub fn countdown(&self) -> String {
        clock::format_countdown(self.remaining_secs)
    }
}

pub struct Driver {
    engine: SharedEngine,
    clock: Rc<dyn Clock>,
    period: Duration,
    current_day: Date,
    /// Boundary still owed to the engine. Stays set while the engine
    /// answers `NoObligations` so the day is judged once tasks exist.
    pending: Option<Date>,
}

impl Driver {
    pub fn new(engine: SharedEngine) -> Self {
        let (clock, period, validate_on_start) = {
            let engine = engine.borrow();
            (
                engine.clock(),
                engine.config().tick_interval(),
                engine.config().validate_on_start,
            )
        };
        let current_day = clock.today();
        Self {
            engine,
            clock,
            period,
            current_day,
            pending: validate_on_start.then_some(current_day),
        }
    }

    pub fn current_day(&self) -> Date {
        self.current_day
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn tick(&mut self) -> Tick {
        let now = self.clock.now();
        let today = now.date();

        if today > self.current_day {
            info!(from = %self.current_day, to = %today, "local day boundary crossed");
            self.pending = Some(today);
        } else if today < self.current_day {
            debug!(from = %self.current_day, to = %today, "clock moved backwards");
        }
        self.current_day = today;

        let mut verdict = None;
        if let Some(day) = self.pending {
            let outcome = self.engine.borrow_mut().day_boundary_crossed(day);
            if outcome != Verdict::NoObligations {
                self.pending = None;
            }
            verdict = Some(outcome);
        }

        Tick {
            remaining_secs: clock::seconds_until_next_midnight(now),
            verdict,
        }
    }

    /// Samples the clock every period until `shutdown` flips to `true` or
    /// its sender is dropped. `on_tick` sees every sample.
    ///
    /// The future is not `Send`; run it on a current-thread runtime or a
    /// `LocalSet`.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>, mut on_tick: impl FnMut(Tick)) {
        let mut interval = tokio::time::interval(self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(period_ms = self.period.as_millis() as u64, day = %self.current_day, "day driver started");

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("day driver stopped");
                        break;
                    }
                }
                _ = interval.tick() => {
                    let tick = self.tick();
                    on_tick(tick);
                }
            }
        }
    }
}

impl std::fmt::Debug for Driver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Driver")
            .field("period", &self.period)
            .field("current_day", &self.current_day)
            .field("pending", &self.pending)
            .finish_non_exhaustive()
    }
}
