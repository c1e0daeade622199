//! Progress reporting and cancellation
//!
//! Worker threads only ever increment counters and read snapshots; the
//! throttler decides which progress values reach the caller.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// Progress snapshot handed to the caller's callback
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisProgress {
    /// Overall completion in [0, 1], never decreasing within a run
    pub overall_progress: f32,
    /// Human-readable stage label
    pub stage: String,
    pub total_photos: usize,
    pub processed_photos: usize,
    pub failed_photos: usize,
    pub cached_photos: usize,
    /// Palette size, once known
    pub current_k: Option<usize>,
}

/// Shared cancellation flag
///
/// Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Per-photo counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressCounts {
    pub processed: usize,
    pub failed: usize,
    pub cached: usize,
}

impl ProgressCounts {
    /// Photos that no longer need work
    pub fn finished(&self) -> usize {
        self.processed + self.failed + self.cached
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Mutex-guarded counters shared by extraction workers
#[derive(Debug, Default)]
pub struct ProgressTracker {
    counts: Mutex<ProgressCounts>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one freshly analyzed photo and return the updated counts
    pub fn increment_processed(&self) -> ProgressCounts {
        let mut counts = lock(&self.counts);
        counts.processed += 1;
        *counts
    }

    pub fn increment_failed(&self) -> ProgressCounts {
        let mut counts = lock(&self.counts);
        counts.failed += 1;
        *counts
    }

    pub fn increment_cached(&self) -> ProgressCounts {
        let mut counts = lock(&self.counts);
        counts.cached += 1;
        *counts
    }

    pub fn snapshot(&self) -> ProgressCounts {
        *lock(&self.counts)
    }
}

#[derive(Debug)]
struct ThrottleState {
    last_emit: Option<Instant>,
    last_progress: f32,
    completed: bool,
}

/// Rate limiter for progress callbacks
///
/// Values are made monotonic and emitted at most once per interval, except
/// that completion (1.0) is always emitted exactly once.
#[derive(Debug)]
pub struct ProgressThrottler {
    interval: Duration,
    state: Mutex<ThrottleState>,
}

impl ProgressThrottler {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            state: Mutex::new(ThrottleState {
                last_emit: None,
                last_progress: 0.0,
                completed: false,
            }),
        }
    }

    /// Decide whether `progress` should be emitted
    ///
    /// # Returns
    ///
    /// The value to report (never below a previously seen value), or `None`
    /// if this update is dropped
    pub fn admit(&self, progress: f32) -> Option<f32> {
        let mut state = lock(&self.state);
        self.decide(&mut state, progress)
    }

    /// Like [`ProgressThrottler::admit`], but runs `emit` with the admitted
    /// value while still holding the lock, so concurrent callers deliver
    /// values in order
    pub fn emit_with<F: FnOnce(f32)>(&self, progress: f32, emit: F) {
        let mut state = lock(&self.state);
        if let Some(value) = self.decide(&mut state, progress) {
            emit(value);
        }
    }

    fn decide(&self, state: &mut ThrottleState, progress: f32) -> Option<f32> {
        if state.completed {
            return None;
        }

        let value = progress.clamp(0.0, 1.0).max(state.last_progress);
        state.last_progress = value;

        let now = Instant::now();
        let due = match state.last_emit {
            Some(last) => now.duration_since(last) >= self.interval,
            None => true,
        };
        if value >= 1.0 {
            state.completed = true;
        } else if !due {
            return None;
        }
        state.last_emit = Some(now);
        Some(value)
    }
}
