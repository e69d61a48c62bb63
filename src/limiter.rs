use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::oneshot;

use crate::config::RateLimit;

/// FIFO token-bucket admission gate.
///
/// The bucket starts full. Each grant schedules exactly one replenishment
/// `interval` later, so at most `capacity` admissions start within any
/// rolling window of length `interval`. Waiters are granted strictly in
/// arrival order; a waiter that is dropped before its grant is skipped
/// without consuming a slot.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    capacity: u32,
    interval: Duration,
    state: Mutex<State>,
}

#[derive(Debug)]
struct State {
    available: u32,
    waiters: VecDeque<oneshot::Sender<()>>,
}

impl RateLimiter {
    pub fn new(capacity: u32, interval: Duration) -> Self {
        assert!(capacity > 0, "rate limiter capacity must be positive");
        Self {
            inner: Arc::new(Inner {
                capacity,
                interval,
                state: Mutex::new(State {
                    available: capacity,
                    waiters: VecDeque::new(),
                }),
            }),
        }
    }

    pub fn from_limit(limit: RateLimit) -> Self {
        Self::new(limit.capacity, limit.interval)
    }

    /// Wait for admission, then consume one slot.
    ///
    /// Resolves immediately while the bucket has capacity; otherwise the
    /// caller joins the tail of the wait queue. Cancellation-safe: dropping
    /// the returned future before it resolves removes the waiter from
    /// consideration without consuming a slot.
    pub async fn acquire(&self) {
        let rx = {
            let mut state = self.inner.state.lock().expect("limiter state poisoned");
            if state.waiters.is_empty() && state.available > 0 {
                state.available -= 1;
                Inner::schedule_replenish(&self.inner);
                None
            } else {
                let (tx, rx) = oneshot::channel();
                state.waiters.push_back(tx);
                Some(rx)
            }
        };
        if let Some(rx) = rx {
            // The sender is only dropped after a successful grant, so an
            // Err here is unreachable in practice; treat it as a grant.
            let _ = rx.await;
        }
    }

    /// Slots currently available without waiting.
    pub fn available(&self) -> u32 {
        self.inner.state.lock().expect("limiter state poisoned").available
    }
}

impl Inner {
    /// Arrange for one slot to return `interval` after a grant.
    fn schedule_replenish(inner: &Arc<Inner>) {
        let inner = Arc::clone(inner);
        tokio::spawn(async move {
            tokio::time::sleep(inner.interval).await;
            Inner::replenish(&inner);
        });
    }

    /// Return one slot. If anyone is waiting, hand the slot straight to the
    /// head of the queue (which starts the next replenishment cycle);
    /// abandoned waiters are discarded without consuming it.
    fn replenish(inner: &Arc<Inner>) {
        let mut state = inner.state.lock().expect("limiter state poisoned");
        while let Some(tx) = state.waiters.pop_front() {
            if tx.send(()).is_ok() {
                Inner::schedule_replenish(inner);
                return;
            }
        }
        state.available = (state.available + 1).min(inner.capacity);
    }
}
