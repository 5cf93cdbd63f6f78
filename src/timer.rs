//! Pipeline stage timers
//!
//! Start/stop latency timers for the consensus pipeline stages that sit in
//! front of storage. Each keyspace has its own lock, so stages never contend
//! with each other.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::trace;

/// Start instants keyed by request id, sequence number or digest
pub struct StageTimer<K> {
    stage: &'static str,
    started: Mutex<HashMap<K, Instant>>,
}

impl<K: Hash + Eq + Debug> StageTimer<K> {
    pub fn new(stage: &'static str) -> Self {
        Self {
            stage,
            started: Mutex::new(HashMap::new()),
        }
    }

    pub fn stage(&self) -> &'static str {
        self.stage
    }

    /// Record now as the start of `key`; restarting a key overwrites it
    pub fn start(&self, key: K) {
        trace!(stage = self.stage, ?key, "timer started");
        self.started.lock().insert(key, Instant::now());
    }

    /// Elapsed time since `start(key)`, removing the entry
    ///
    /// `None` if `key` was never started or was already stopped.
    pub fn stop<Q>(&self, key: &Q) -> Option<Duration>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + Debug + ?Sized,
    {
        let started = self.started.lock().remove(key)?;
        let elapsed = started.elapsed();
        trace!(stage = self.stage, ?key, ?elapsed, "timer stopped");
        Some(elapsed)
    }

    /// Timers started and not yet stopped
    pub fn pending(&self) -> usize {
        self.started.lock().len()
    }
}

/// Decides which requests get timed
///
/// `mask` must be a power of two minus one; a request is sampled when its
/// running count ANDed with the mask is zero. Mask 0 samples everything.
pub struct RequestSampler {
    counter: AtomicU64,
    mask: u64,
}

impl RequestSampler {
    pub fn new(mask: u64) -> Self {
        Self {
            counter: AtomicU64::new(0),
            mask,
        }
    }

    pub fn sample(&self) -> bool {
        self.counter.fetch_add(1, Ordering::Relaxed) & self.mask == 0
    }

    pub fn mask(&self) -> u64 {
        self.mask
    }
}

impl Default for RequestSampler {
    fn default() -> Self {
        Self::new(0)
    }
}

/// Timers for every pipeline stage
///
/// Build one and share it (e.g. behind an `Arc`) with every stage that
/// records latency.
pub struct PipelineTimers {
    /// Transaction id → enqueue time
    pub tx_queue: StageTimer<String>,
    /// Batch digest → consensus start
    pub batch_consensus: StageTimer<String>,
    /// Sequence number → wait in the execute queue
    pub execute_queue: StageTimer<u64>,
    pub batch_execute: StageTimer<u64>,
    /// Sequence number → wait in the commit queue
    pub commit_queue: StageTimer<u64>,
    pub batch_commit: StageTimer<u64>,
    pub sampler: RequestSampler,
}

impl PipelineTimers {
    pub fn new() -> Self {
        Self::with_sample_mask(0)
    }

    pub fn with_sample_mask(mask: u64) -> Self {
        Self {
            tx_queue: StageTimer::new("tx_queue"),
            batch_consensus: StageTimer::new("batch_consensus"),
            execute_queue: StageTimer::new("execute_queue"),
            batch_execute: StageTimer::new("batch_execute"),
            commit_queue: StageTimer::new("commit_queue"),
            batch_commit: StageTimer::new("batch_commit"),
            sampler: RequestSampler::new(mask),
        }
    }
}

impl Default for PipelineTimers {
    fn default() -> Self {
        Self::new()
    }
}
