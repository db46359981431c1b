//! Bounded worker-pool workload driver.
//!
//! External callers of the transaction layer in miniature: a fixed pool
//! of worker threads, each opening transactions, doing reads and writes,
//! and committing in a loop. Used by the end-to-end tests and the
//! contention bench; no transaction logic lives here.

use std::sync::atomic::{AtomicUsize, Ordering};
use tessera_core::{Result, TxnStatus};

/// Outcome counts from one workload run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WorkloadReport {
    /// Transactions that returned `CompletedWithSuccess`.
    pub committed: usize,
    /// Transactions that returned `CompletedWithFailure`.
    pub aborted: usize,
    /// Jobs that returned an error instead of a status.
    pub errors: usize,
}

impl WorkloadReport {
    /// Total jobs executed.
    pub fn total(&self) -> usize {
        self.committed + self.aborted + self.errors
    }
}

/// Fixed-size worker pool running transaction jobs.
///
/// Workers are plain threads; the pool size bounds concurrency no matter
/// how many iterations run.
pub struct WorkloadRunner {
    workers: usize,
    iterations_per_worker: usize,
}

impl WorkloadRunner {
    /// A pool of `workers` threads, each running
    /// `iterations_per_worker` jobs.
    pub fn new(workers: usize, iterations_per_worker: usize) -> Self {
        assert!(workers > 0, "worker pool needs at least one worker");
        WorkloadRunner {
            workers,
            iterations_per_worker,
        }
    }

    /// Run `job` across the pool and tally the outcomes.
    ///
    /// Each invocation receives a job index unique across the whole run.
    /// Errors are counted, not propagated: one failed job does not stop
    /// the workload.
    pub fn run<F>(&self, job: F) -> WorkloadReport
    where
        F: Fn(usize) -> Result<TxnStatus> + Send + Sync,
    {
        let committed = AtomicUsize::new(0);
        let aborted = AtomicUsize::new(0);
        let errors = AtomicUsize::new(0);

        std::thread::scope(|scope| {
            for worker in 0..self.workers {
                let job = &job;
                let (committed, aborted, errors) = (&committed, &aborted, &errors);
                let iterations = self.iterations_per_worker;
                scope.spawn(move || {
                    for i in 0..iterations {
                        let index = worker * iterations + i;
                        match job(index) {
                            Ok(TxnStatus::CompletedWithSuccess) => {
                                committed.fetch_add(1, Ordering::Relaxed);
                            }
                            Ok(TxnStatus::CompletedWithFailure) => {
                                aborted.fetch_add(1, Ordering::Relaxed);
                            }
                            Ok(TxnStatus::Running) => {
                                // A job that never decided is a driver bug;
                                // count it with the errors.
                                errors.fetch_add(1, Ordering::Relaxed);
                            }
                            Err(e) => {
                                tracing::debug!(index, error = %e, "workload job failed");
                                errors.fetch_add(1, Ordering::Relaxed);
                            }
                        }
                    }
                });
            }
        });

        WorkloadReport {
            committed: committed.into_inner(),
            aborted: aborted.into_inner(),
            errors: errors.into_inner(),
        }
    }
}
