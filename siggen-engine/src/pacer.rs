//! Real-time pacing.
//!
//! Deadlines are computed from a fixed anchor plus the sum of the buffer
//! periods emitted so far, so rounding in any single wait never accumulates
//! into long-run rate error. The pacer only computes *when*; the runner does
//! the actual (cancellable) waiting on its control channel.

use std::time::{Duration, Instant};

#[derive(Debug, Default)]
pub struct Pacer {
    anchor: Option<Instant>,
    scheduled: f64, // seconds after anchor for the next emission
    reanchors: u64,
}

impl Pacer {
    pub fn new() -> Self { Self::default() }

    /// Drop the schedule; the next throttled buffer goes out immediately.
    pub fn reset(&mut self) {
        self.anchor = None;
        self.scheduled = 0.0;
    }

    /// How many times the pacer gave up on catching up.
    pub fn reanchors(&self) -> u64 { self.reanchors }

    /// Emission deadline for a buffer covering `period_secs`, or `None` when
    /// `throttle` is off.
    pub fn schedule(&mut self, throttle: bool, period_secs: f64) -> Option<Instant> {
        self.schedule_at(Instant::now(), throttle, period_secs)
    }

    /// [`schedule`](Self::schedule) with an explicit "now".
    pub fn schedule_at(&mut self, now: Instant, throttle: bool, period_secs: f64) -> Option<Instant> {
        if !throttle || !period_secs.is_finite() || period_secs <= 0.0 {
            self.reset();
            return None;
        }
        let anchor = match self.anchor {
            Some(a) => a,
            None => {
                self.anchor = Some(now);
                self.scheduled = 0.0;
                now
            }
        };
        let Some(mut deadline) = offset(anchor, self.scheduled) else {
            // beyond what `Instant` can express: park until stopped
            return Some(far_future(now));
        };
        // More than a period late: a consumer stalled us. Catching up would
        // burst, so restart the schedule from now.
        let late = offset(deadline, period_secs).is_some_and(|limit| now > limit);
        if late {
            tracing::warn!(late_ms = (now - deadline).as_millis() as u64, "pacer fell behind; re-anchoring");
            self.anchor = Some(now);
            self.scheduled = 0.0;
            self.reanchors += 1;
            deadline = now;
        }
        self.scheduled += period_secs;
        Some(deadline)
    }
}

/// `at + secs`, or `None` when either the duration or the sum overflows.
fn offset(at: Instant, secs: f64) -> Option<Instant> {
    Duration::try_from_secs_f64(secs).ok().and_then(|d| at.checked_add(d))
}

/// A deadline no stream will reach; the runner's wait still ends on stop.
fn far_future(now: Instant) -> Instant {
    const YEAR: Duration = Duration::from_secs(365 * 24 * 3600);
    now.checked_add(YEAR).unwrap_or(now)
}
