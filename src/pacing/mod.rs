//! Fixed-rate pacing with slice-sleep drift correction.
//!
//! After each message the sender hands its start instant to
//! `Pacer::wait_for_deadline`. If time is left in the period, the pacer
//! sleeps in slices of a tenth of the remaining time, re-reading the clock
//! after every slice, until the period has elapsed. A message whose own work
//! already took longer than the period is an overrun: it is logged and the
//! next message starts immediately.

use std::time::Duration;

use tokio::time::Instant;
use tracing::warn;

/// Lower bound on a sleep slice so a nearly-met deadline cannot spin.
const MIN_SLICE: Duration = Duration::from_micros(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaceOutcome {
    /// The period elapsed after sleeping; `elapsed` is the final reading.
    OnTime { elapsed: Duration },
    /// The work alone exceeded the period.
    Overrun { elapsed: Duration },
}

impl PaceOutcome {
    pub fn is_overrun(&self) -> bool {
        matches!(self, PaceOutcome::Overrun { .. })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Pacer {
    period: Duration,
}

impl Pacer {
    pub fn new(period: Duration) -> Self {
        Self { period }
    }

    /// Waits until one period has passed since `start`.
    pub async fn wait_for_deadline(&self, start: Instant) -> PaceOutcome {
        let mut elapsed = start.elapsed();
        if elapsed >= self.period {
            warn!(
                "Can't keep up with {:.6} seconds per frame: Took {:.6}",
                self.period.as_secs_f64(),
                elapsed.as_secs_f64()
            );
            return PaceOutcome::Overrun { elapsed };
        }

        // slice is fixed from the first reading
        let slice = ((self.period - elapsed) / 10).max(MIN_SLICE);
        while elapsed < self.period {
            tokio::time::sleep(slice).await;
            elapsed = start.elapsed();
        }
        PaceOutcome::OnTime { elapsed }
    }
}
