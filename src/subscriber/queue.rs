use std::collections::VecDeque;
use std::sync::Mutex;

use bytes::Bytes;
use tokio::sync::Notify;

/// A received work message and when it arrived, in nanoseconds since epoch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    pub arrival_ns: u64,
    pub bytes: Bytes,
}

#[derive(Debug, Default)]
struct QueueState {
    items: VecDeque<WorkItem>,
    closed: bool,
}

/// FIFO shared by the intake task and the worker pool.
///
/// Each item is handed to exactly one consumer. `pop` waits for an item and
/// returns `None` once the queue is closed and drained.
#[derive(Debug, Default)]
pub struct WorkQueue {
    state: Mutex<QueueState>,
    available: Notify,
}

impl WorkQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an item. Returns `false` if the queue is already closed.
    pub fn push(&self, item: WorkItem) -> bool {
        {
            let mut state = self.state.lock().expect("work queue lock poisoned");
            if state.closed {
                return false;
            }
            state.items.push_back(item);
        }
        self.available.notify_one();
        true
    }

    pub async fn pop(&self) -> Option<WorkItem> {
        loop {
            let notified = self.available.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut state = self.state.lock().expect("work queue lock poisoned");
                if let Some(item) = state.items.pop_front() {
                    return Some(item);
                }
                if state.closed {
                    return None;
                }
            }

            notified.await;
        }
    }

    /// Stops accepting items and wakes every waiting consumer. Items already
    /// queued are still handed out.
    pub fn close(&self) {
        self.state.lock().expect("work queue lock poisoned").closed = true;
        self.available.notify_waiters();
    }

    pub fn is_empty(&self) -> bool {
        self.state
            .lock()
            .expect("work queue lock poisoned")
            .items
            .is_empty()
    }

    pub fn len(&self) -> usize {
        self.state.lock().expect("work queue lock poisoned").items.len()
    }
}
