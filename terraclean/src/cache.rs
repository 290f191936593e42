//! Memoized column elevation ranges.
//!
//! Sampling a column is expensive and every section stacked in that column
//! needs the same answer. [`ElevationCache`] makes sure each column is
//! computed at most once: the first request installs a pending slot and
//! launches the computation on the compute pool, later requests for the same
//! column wait on that slot.
//!
//! ```text
//! get_range(c) ──lock──> slot for c? ──yes──────────────────> wait(slot)
//!                              │
//!                              no: insert pending slot,
//!                                  spawn compute(c) on pool ─> wait(slot)
//! ```
//!
//! Entries are never evicted. A column whose computation failed stays
//! [`ElevationRange::Unavailable`] and is not retried.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::error::{Error, Result};
use crate::position::Column;
use crate::sampler::{ElevationRange, RangeSampler};

/// Statistics about cache usage.
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    /// Number of entries currently in the cache.
    pub entry_count: u64,
    /// Number of requests served by an existing entry.
    pub hit_count: u64,
    /// Number of requests that had to create an entry.
    pub miss_count: u64,
}

impl CacheStats {
    /// Calculate the cache hit rate (0.0 to 1.0).
    ///
    /// Returns 0.0 if no requests have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hit_count + self.miss_count;
        if total == 0 {
            0.0
        } else {
            self.hit_count as f64 / total as f64
        }
    }
}

/// Computes the elevation range of a column.
pub trait RangeCompute: Send + Sync + 'static {
    fn compute(&self, column: Column) -> Result<ElevationRange>;
}

impl RangeCompute for RangeSampler {
    fn compute(&self, column: Column) -> Result<ElevationRange> {
        self.sample(column)
    }
}

impl<F> RangeCompute for F
where
    F: Fn(Column) -> Result<ElevationRange> + Send + Sync + 'static,
{
    fn compute(&self, column: Column) -> Result<ElevationRange> {
        self(column)
    }
}

enum SlotState {
    Pending,
    Ready(ElevationRange),
    Cancelled,
}

/// A single-assignment result shared by every requester of a column.
struct Slot {
    state: Mutex<SlotState>,
    ready: Condvar,
}

impl Slot {
    fn new() -> Self {
        Self {
            state: Mutex::new(SlotState::Pending),
            ready: Condvar::new(),
        }
    }

    /// Set the outcome. Only the first call has an effect.
    fn resolve(&self, outcome: SlotState) {
        let mut state = self.state.lock();
        if matches!(*state, SlotState::Pending) {
            *state = outcome;
            self.ready.notify_all();
        }
    }

    fn wait(&self) -> Result<ElevationRange> {
        let mut state = self.state.lock();
        loop {
            match &*state {
                SlotState::Pending => self.ready.wait(&mut state),
                SlotState::Ready(range) => return Ok(*range),
                SlotState::Cancelled => return Err(Error::Terminated),
            }
        }
    }
}

/// Concurrent, deduplicating store of column elevation ranges.
pub struct ElevationCache {
    entries: Mutex<HashMap<Column, Arc<Slot>>>,
    compute: Arc<dyn RangeCompute>,
    pool: ThreadPool,
    closed: AtomicBool,
    hit_count: AtomicU64,
    miss_count: AtomicU64,
}

impl ElevationCache {
    /// Create a cache computing missing ranges on a pool of `workers` threads.
    ///
    /// # Errors
    ///
    /// Returns an error if `workers` is 0 or the pool cannot be started.
    pub fn new(compute: Arc<dyn RangeCompute>, workers: usize) -> Result<Self> {
        if workers == 0 {
            return Err(Error::InvalidSettings(
                "compute pool needs at least one worker".into(),
            ));
        }
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("terraclean-compute-{}", i))
            .build()?;

        Ok(Self {
            entries: Mutex::new(HashMap::new()),
            compute,
            pool,
            closed: AtomicBool::new(false),
            hit_count: AtomicU64::new(0),
            miss_count: AtomicU64::new(0),
        })
    }

    /// Get the elevation range of `column`, computing it if nobody has yet.
    ///
    /// Blocks the calling thread until the range is available.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Terminated`] if the cache is closed before the range
    /// is known.
    pub fn get_range(&self, column: Column) -> Result<ElevationRange> {
        let slot = {
            let mut entries = self.entries.lock();
            if self.closed.load(Ordering::Acquire) {
                return Err(Error::Terminated);
            }
            match entries.get(&column) {
                Some(slot) => {
                    self.hit_count.fetch_add(1, Ordering::Relaxed);
                    slot.clone()
                }
                None => {
                    self.miss_count.fetch_add(1, Ordering::Relaxed);
                    let slot = Arc::new(Slot::new());
                    entries.insert(column, slot.clone());
                    self.launch(column, slot.clone());
                    slot
                }
            }
        };
        slot.wait()
    }

    /// Compute `column` on the pool and resolve `slot` with the outcome.
    fn launch(&self, column: Column, slot: Arc<Slot>) {
        let compute = self.compute.clone();
        self.pool.spawn(move || {
            tracing::debug!(column = %column, "Computing elevation range");
            let result = panic::catch_unwind(AssertUnwindSafe(|| compute.compute(column)));
            let outcome = match result {
                Ok(Ok(range)) => {
                    tracing::debug!(column = %column, range = %range, "Elevation range computed");
                    SlotState::Ready(range)
                }
                Ok(Err(Error::Terminated)) => SlotState::Cancelled,
                Ok(Err(e)) => {
                    tracing::warn!(
                        column = %column,
                        error = %e,
                        "Elevation range computation failed"
                    );
                    SlotState::Ready(ElevationRange::Unavailable)
                }
                Err(_) => {
                    tracing::warn!(column = %column, "Elevation range computation panicked");
                    SlotState::Ready(ElevationRange::Unavailable)
                }
            };
            slot.resolve(outcome);
        });
    }

    /// Number of columns in the cache, computed or pending.
    pub fn count(&self) -> usize {
        self.entries.lock().len()
    }

    /// Drop every entry.
    ///
    /// Computations already running still deliver their range to the
    /// requesters waiting on them. The next request for a cleared column
    /// computes it again.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Drop every entry and refuse any further request.
    ///
    /// Requesters still waiting on a pending entry are released with
    /// [`Error::Terminated`].
    pub fn close(&self) {
        let drained: Vec<Arc<Slot>> = {
            let mut entries = self.entries.lock();
            self.closed.store(true, Ordering::Release);
            entries.drain().map(|(_, slot)| slot).collect()
        };
        for slot in drained {
            slot.resolve(SlotState::Cancelled);
        }
    }

    /// Get cache statistics.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entry_count: self.count() as u64,
            hit_count: self.hit_count.load(Ordering::Relaxed),
            miss_count: self.miss_count.load(Ordering::Relaxed),
        }
    }
}
