use std::time::Duration;

use tokio::time::Instant;

/// Shutdown phases of a subscriber. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Endpoints are still sending.
    Running,
    /// Every endpoint sent its sentinel; the queue still holds work.
    Draining,
    /// Queue drained; waiting out the grace period for in-flight acks.
    Grace,
    Stopped,
}

#[derive(Debug)]
pub struct Lifecycle {
    phase: Phase,
    grace: Duration,
    grace_started: Option<Instant>,
}

impl Lifecycle {
    pub fn new(grace: Duration) -> Self {
        Self {
            phase: Phase::Running,
            grace,
            grace_started: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Advances the machine from one observation of the endpoint counter and
    /// the queue, taken at `now`.
    pub fn observe(&mut self, endpoints_left: usize, queue_empty: bool, now: Instant) -> Phase {
        if self.phase == Phase::Running && endpoints_left == 0 {
            self.phase = Phase::Draining;
        }
        if self.phase == Phase::Draining && queue_empty {
            self.phase = Phase::Grace;
            self.grace_started = Some(now);
        }
        if self.phase == Phase::Grace
            && self
                .grace_started
                .is_some_and(|started| now.duration_since(started) >= self.grace)
        {
            self.phase = Phase::Stopped;
        }
        self.phase
    }
}
