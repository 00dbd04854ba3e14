//! Per-process counters and the stdout records read by the plotting tools.
//!
//! Counters only ever increase. They are shared between tasks as
//! `Arc<Metrics>` and read through `snapshot`.

pub mod report;

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct Metrics {
    published: AtomicU64,
    acked: AtomicU64,
    dequeued: AtomicU64,
    processed: AtomicU64,
    acks_sent: AtomicU64,
    sentinels: AtomicU64,
    decode_errors: AtomicU64,
    classify_errors: AtomicU64,
    overruns: AtomicU64,
}

/// Point-in-time copy of `Metrics`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub published: u64,
    pub acked: u64,
    pub dequeued: u64,
    pub processed: u64,
    pub acks_sent: u64,
    pub sentinels: u64,
    pub decode_errors: u64,
    pub classify_errors: u64,
    pub overruns: u64,
}

fn bump(counter: &AtomicU64) -> u64 {
    counter.fetch_add(1, Ordering::Relaxed) + 1
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_published(&self) -> u64 {
        bump(&self.published)
    }

    pub fn record_acked(&self) -> u64 {
        bump(&self.acked)
    }

    pub fn record_dequeued(&self) -> u64 {
        bump(&self.dequeued)
    }

    pub fn record_processed(&self) -> u64 {
        bump(&self.processed)
    }

    pub fn record_ack_sent(&self) -> u64 {
        bump(&self.acks_sent)
    }

    pub fn record_sentinel(&self) -> u64 {
        bump(&self.sentinels)
    }

    pub fn record_decode_error(&self) -> u64 {
        bump(&self.decode_errors)
    }

    pub fn record_classify_error(&self) -> u64 {
        bump(&self.classify_errors)
    }

    pub fn record_overrun(&self) -> u64 {
        bump(&self.overruns)
    }

    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            published: self.published.load(Ordering::Relaxed),
            acked: self.acked.load(Ordering::Relaxed),
            dequeued: self.dequeued.load(Ordering::Relaxed),
            processed: self.processed.load(Ordering::Relaxed),
            acks_sent: self.acks_sent.load(Ordering::Relaxed),
            sentinels: self.sentinels.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
            classify_errors: self.classify_errors.load(Ordering::Relaxed),
            overruns: self.overruns.load(Ordering::Relaxed),
        }
    }
}
