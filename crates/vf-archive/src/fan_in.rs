//! Fan-in barrier for independently completing jobs.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

type Callback = Box<dyn FnOnce() + Send + 'static>;

/// Releases a callback exactly once after `expected` terminal signals.
///
/// Each barrier belongs to one operation. Signals from success and failure
/// paths are counted the same way; the signal that brings `completed` up to
/// `expected` runs the callback on the signalling thread.
pub struct FanIn {
    expected: usize,
    completed: AtomicUsize,
    on_complete: Mutex<Option<Callback>>,
}

impl fmt::Debug for FanIn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FanIn")
            .field("expected", &self.expected)
            .field("completed", &self.completed())
            .field("released", &self.is_released())
            .finish()
    }
}

impl FanIn {
    /// Create a barrier waiting for `expected` signals.
    pub fn new(expected: usize, on_complete: impl FnOnce() + Send + 'static) -> Arc<Self> {
        Arc::new(Self {
            expected,
            completed: AtomicUsize::new(0),
            on_complete: Mutex::new(Some(Box::new(on_complete))),
        })
    }

    /// Number of signals the barrier waits for.
    pub fn expected(&self) -> usize {
        self.expected
    }

    /// Number of signals observed so far.
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::Acquire)
    }

    /// Returns true once the callback has run.
    pub fn is_released(&self) -> bool {
        self.on_complete
            .lock()
            .map(|slot| slot.is_none())
            .unwrap_or(true)
    }

    /// Record one terminal signal. Returns true if this call released the barrier.
    pub fn signal(&self) -> bool {
        let now = self.completed.fetch_add(1, Ordering::AcqRel) + 1;

        if now > self.expected {
            warn!(now, expected = self.expected, "Unexpected extra completion signal");
            return false;
        }

        debug!(completed = now, expected = self.expected, "Job reported completion");

        if now == self.expected {
            self.release()
        } else {
            false
        }
    }

    /// Release immediately when nothing was expected.
    pub fn release_if_idle(&self) -> bool {
        if self.expected == 0 {
            self.release()
        } else {
            false
        }
    }

    fn release(&self) -> bool {
        let callback = match self.on_complete.lock() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };

        match callback {
            Some(callback) => {
                callback();
                true
            }
            None => false,
        }
    }
}

/// Signals a [`FanIn`] when dropped, so a job that panics is still counted.
#[derive(Debug)]
pub struct CompletionGuard {
    barrier: Arc<FanIn>,
}

impl CompletionGuard {
    pub fn new(barrier: Arc<FanIn>) -> Self {
        Self { barrier }
    }
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        self.barrier.signal();
    }
}
