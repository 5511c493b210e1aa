//! Load and run phases over a shared record store.
//!
//! The load phase inserts `record_count` records; the run phase issues
//! `operation_count` operations drawn from the configured mix. Work is split
//! across `thread_count` scoped threads that all call the same store.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use kvproxy_store::{Record, RecordStore, StoreError};
use serde::Serialize;

use crate::config::WorkloadConfig;
use crate::stats::{OpSnapshot, Operation, WorkloadStats};

/// Summary of one finished phase.
#[derive(Debug, Serialize)]
pub struct PhaseReport {
    pub phase: &'static str,
    pub operations: u64,
    pub errors: u64,
    pub elapsed_ms: u64,
    pub throughput_ops_sec: f64,
    pub per_operation: Vec<OpSnapshot>,
}

pub struct Workload {
    config: WorkloadConfig,
    store: Arc<dyn RecordStore>,
    /// Next key index handed to an insert during the run phase.
    next_insert: AtomicU64,
}

impl Workload {
    pub fn new(config: WorkloadConfig, store: Arc<dyn RecordStore>) -> Self {
        let next_insert = AtomicU64::new(config.record_count);
        Self {
            config,
            store,
            next_insert,
        }
    }

    pub fn load(&self) -> PhaseReport {
        self.execute("load", self.config.record_count, |_, index, _| {
            (Operation::Insert, self.insert(index))
        })
    }

    pub fn run(&self) -> PhaseReport {
        self.execute("run", self.config.operation_count, |rng, _, _| {
            let op = self.choose(rng);
            let result = match op {
                Operation::Read => self.read(rng),
                Operation::Update => self.update(rng),
                Operation::Insert => {
                    let index = self.next_insert.fetch_add(1, Ordering::Relaxed);
                    self.insert(index)
                }
                Operation::Delete => self.delete(rng),
            };
            (op, result)
        })
    }

    /// Split `total` operations across the worker threads and time them.
    fn execute<F>(&self, phase: &'static str, total: u64, op: F) -> PhaseReport
    where
        F: Fn(&mut fastrand::Rng, u64, usize) -> (Operation, Result<(), StoreError>) + Sync,
    {
        let stats = WorkloadStats::new();
        let threads = self.config.thread_count.max(1);
        let start = Instant::now();

        std::thread::scope(|scope| {
            for thread_id in 0..threads {
                let stats = stats.clone();
                let op = &op;
                scope.spawn(move || {
                    let span = kvproxy_tracing::workload_phase_span!(phase, thread_id);
                    let _entered = span.enter();
                    self.store.init_thread(thread_id, threads);

                    let mut rng = fastrand::Rng::new();
                    let mut done = 0_u64;
                    let mut failed = 0_u64;
                    let mut index = thread_id as u64;
                    while index < total {
                        let op_start = Instant::now();
                        let (kind, result) = op(&mut rng, index, thread_id);
                        let latency = op_start.elapsed();
                        if let Err(e) = &result {
                            failed += 1;
                            tracing::warn!(op = kind.as_str(), error = %e, "Operation failed");
                        }
                        stats.record(kind, latency, result.is_ok());
                        done += 1;
                        index += threads as u64;
                    }

                    self.store.cleanup_thread();
                    span.record("operations", done);
                    span.record("errors", failed);
                });
            }
        });

        report(phase, start.elapsed(), &stats)
    }

    fn choose(&self, rng: &mut fastrand::Rng) -> Operation {
        let weights = [
            (Operation::Read, self.config.read_proportion),
            (Operation::Update, self.config.update_proportion),
            (Operation::Insert, self.config.insert_proportion),
            (Operation::Delete, self.config.delete_proportion),
        ];
        let total: f64 = weights.iter().map(|(_, w)| w).sum();
        let mut point = rng.f64() * total;
        for (op, weight) in weights {
            if point < weight {
                return op;
            }
            point -= weight;
        }
        // Float rounding can leave `point` just past the last bucket.
        weights
            .iter()
            .rev()
            .find(|(_, w)| *w > 0.0)
            .map(|(op, _)| *op)
            .unwrap_or(Operation::Read)
    }

    fn random_existing_key(&self, rng: &mut fastrand::Rng) -> String {
        let upper = self.next_insert.load(Ordering::Relaxed).max(1);
        record_key(rng.u64(0..upper))
    }

    fn random_field(&self, rng: &mut fastrand::Rng) -> String {
        format!("field{}", rng.usize(0..self.config.field_count.max(1)))
    }

    fn random_value(&self, rng: &mut fastrand::Rng) -> Bytes {
        std::iter::repeat_with(|| rng.alphanumeric())
            .take(self.config.field_length)
            .collect::<String>()
            .into()
    }

    fn build_record(&self) -> Record {
        let mut rng = fastrand::Rng::new();
        (0..self.config.field_count)
            .map(|i| (format!("field{i}"), self.random_value(&mut rng)))
            .collect()
    }

    fn insert(&self, index: u64) -> Result<(), StoreError> {
        self.store
            .insert(&self.config.table, &record_key(index), self.build_record())
    }

    fn read(&self, rng: &mut fastrand::Rng) -> Result<(), StoreError> {
        let key = self.random_existing_key(rng);
        self.store.read(&self.config.table, &key, None).map(|_| ())
    }

    /// Rewrites a single field, exercising the store's merge.
    fn update(&self, rng: &mut fastrand::Rng) -> Result<(), StoreError> {
        let key = self.random_existing_key(rng);
        let mut values = Record::new();
        values.insert(self.random_field(rng), self.random_value(rng));
        self.store.update(&self.config.table, &key, values)
    }

    fn delete(&self, rng: &mut fastrand::Rng) -> Result<(), StoreError> {
        let key = self.random_existing_key(rng);
        self.store.delete(&self.config.table, &key)
    }
}

pub fn record_key(index: u64) -> String {
    format!("user{index}")
}

fn report(phase: &'static str, elapsed: Duration, stats: &WorkloadStats) -> PhaseReport {
    let per_operation = stats.snapshot();
    let operations: u64 = per_operation.iter().map(|s| s.ok + s.errors).sum();
    let secs = elapsed.as_secs_f64();
    PhaseReport {
        phase,
        operations,
        errors: stats.total_errors(),
        elapsed_ms: elapsed.as_millis() as u64,
        throughput_ops_sec: if secs > 0.0 { operations as f64 / secs } else { 0.0 },
        per_operation,
    }
}
