use std::sync::atomic::{AtomicUsize, Ordering};

/// Number of endpoints that have not yet sent their sentinel.
///
/// Only ever decreases and never goes below zero.
#[derive(Debug)]
pub struct EndpointCounter {
    remaining: AtomicUsize,
}

impl EndpointCounter {
    pub fn new(expected: usize) -> Self {
        Self {
            remaining: AtomicUsize::new(expected),
        }
    }

    pub fn remaining(&self) -> usize {
        self.remaining.load(Ordering::SeqCst)
    }

    /// Counts one sentinel. Returns the endpoints left, or `None` if every
    /// expected endpoint had already finished.
    pub fn sentinel_received(&self) -> Option<usize> {
        self.remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .ok()
            .map(|previous| previous - 1)
    }
}
