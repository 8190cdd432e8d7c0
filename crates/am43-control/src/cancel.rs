//! Cooperative cancellation for fleet actions.
//!
//! A [`CancelToken`] is cloned into everything that may block: the retry
//! delay, each session step and the fleet loop. Cancelling one clone, or
//! passing the optional deadline, is seen by all of them.

use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
struct Shared {
    cancelled: Mutex<bool>,
    wakeup: Condvar,
}

/// Shared cancellation flag with an optional deadline.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    shared: Arc<Shared>,
    deadline: Option<Instant>,
}

impl CancelToken {
    /// A token that is only cancelled explicitly.
    pub fn new() -> Self {
        Self::default()
    }

    /// A token that also counts as cancelled once `deadline` has passed.
    pub fn with_deadline(deadline: Instant) -> Self {
        CancelToken {
            shared: Arc::default(),
            deadline: Some(deadline),
        }
    }

    /// A token that expires `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    /// A clone sharing this token's flag, with `deadline` applied as well.
    /// The earlier of the two deadlines wins.
    pub fn child_with_deadline(&self, deadline: Instant) -> Self {
        let deadline = match self.deadline {
            Some(existing) => existing.min(deadline),
            None => deadline,
        };
        CancelToken {
            shared: Arc::clone(&self.shared),
            deadline: Some(deadline),
        }
    }

    /// The deadline, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Cancel this token and every clone of it.
    pub fn cancel(&self) {
        let mut cancelled = self.shared.cancelled.lock();
        if !*cancelled {
            *cancelled = true;
            tracing::debug!("cancellation requested");
        }
        self.shared.wakeup.notify_all();
    }

    /// Whether the token was cancelled or its deadline has passed.
    pub fn is_cancelled(&self) -> bool {
        *self.shared.cancelled.lock() || self.deadline_passed()
    }

    fn deadline_passed(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Shorten `timeout` so it does not run past the deadline.
    pub fn clamp(&self, timeout: Duration) -> Duration {
        match self.deadline {
            Some(deadline) => timeout.min(deadline.saturating_duration_since(Instant::now())),
            None => timeout,
        }
    }

    /// Sleep for `duration` unless cancelled first.
    ///
    /// Returns `true` if the full duration elapsed, `false` if the token was
    /// cancelled (or its deadline passed) before that.
    pub fn sleep(&self, duration: Duration) -> bool {
        let wake_at = Instant::now() + duration;
        let mut cancelled = self.shared.cancelled.lock();
        loop {
            if *cancelled {
                return false;
            }
            let now = Instant::now();
            if let Some(deadline) = self.deadline {
                if now >= deadline && deadline <= wake_at {
                    return false;
                }
            }
            if now >= wake_at {
                return true;
            }
            let until = match self.deadline {
                Some(deadline) => wake_at.min(deadline),
                None => wake_at,
            };
            self.shared.wakeup.wait_until(&mut cancelled, until);
        }
    }
}
