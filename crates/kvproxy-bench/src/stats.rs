//! Atomic per-operation counters.
//!
//! Every worker thread records into the same counters. All atomics use
//! `Relaxed` ordering: they are monotonic totals read once at the end.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

/// Store operations the workload issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Read,
    Update,
    Insert,
    Delete,
}

impl Operation {
    pub const ALL: [Operation; 4] = [
        Operation::Read,
        Operation::Update,
        Operation::Insert,
        Operation::Delete,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Read => "read",
            Operation::Update => "update",
            Operation::Insert => "insert",
            Operation::Delete => "delete",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

#[derive(Default)]
struct OpCounters {
    ok: AtomicU64,
    errors: AtomicU64,
    latency_us: AtomicU64,
    max_latency_us: AtomicU64,
}

/// Thread-safe operation statistics. Cheap to clone (Arc).
#[derive(Clone, Default)]
pub struct WorkloadStats {
    inner: Arc<[OpCounters; 4]>,
}

/// Snapshot of one operation's counters, serializable to JSON.
#[derive(Debug, Serialize)]
pub struct OpSnapshot {
    pub operation: Operation,
    pub ok: u64,
    pub errors: u64,
    pub avg_latency_us: u64,
    pub max_latency_us: u64,
}

impl WorkloadStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, op: Operation, latency: Duration, succeeded: bool) {
        let counters = &self.inner[op.index()];
        if succeeded {
            counters.ok.fetch_add(1, Ordering::Relaxed);
        } else {
            counters.errors.fetch_add(1, Ordering::Relaxed);
        }
        let micros = latency.as_micros() as u64;
        counters.latency_us.fetch_add(micros, Ordering::Relaxed);
        counters.max_latency_us.fetch_max(micros, Ordering::Relaxed);
    }

    pub fn total_errors(&self) -> u64 {
        self.inner
            .iter()
            .map(|c| c.errors.load(Ordering::Relaxed))
            .sum()
    }

    /// Counters of every operation that was issued at least once.
    pub fn snapshot(&self) -> Vec<OpSnapshot> {
        Operation::ALL
            .into_iter()
            .filter_map(|op| {
                let counters = &self.inner[op.index()];
                let ok = counters.ok.load(Ordering::Relaxed);
                let errors = counters.errors.load(Ordering::Relaxed);
                let total = ok + errors;
                if total == 0 {
                    return None;
                }
                Some(OpSnapshot {
                    operation: op,
                    ok,
                    errors,
                    avg_latency_us: counters.latency_us.load(Ordering::Relaxed) / total,
                    max_latency_us: counters.max_latency_us.load(Ordering::Relaxed),
                })
            })
            .collect()
    }
}
