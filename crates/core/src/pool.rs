//! Bounded worker pool
//!
//! A fixed number of workers drain a shared task queue. Every task runs to
//! completion regardless of how its siblings fare; outcomes flow back to the
//! caller over a channel and are folded into a [`RunReport`].

use std::collections::VecDeque;
use std::fmt::Display;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use futures::FutureExt as _;
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::error::{TransferError, TransferErrorKind};
use crate::outcome::{RunReport, TransferOutcome};

/// Fixed-size pool of transfer workers
#[derive(Debug, Clone, Copy)]
pub struct WorkerPool {
    workers: usize,
}

impl WorkerPool {
    /// Pool with `workers` concurrent workers (at least one)
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
        }
    }

    /// Pool sized to the number of available CPUs
    pub fn with_available_parallelism() -> Self {
        Self::new(available_parallelism())
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run every task through `transfer` and aggregate the outcomes
    ///
    /// `on_outcome` is called once per finished task, in completion order.
    pub async fn run<T, F, Fut>(
        &self,
        tasks: Vec<T>,
        transfer: F,
        mut on_outcome: impl FnMut(&TransferOutcome),
    ) -> RunReport
    where
        T: Display + Send + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = TransferOutcome> + Send + 'static,
    {
        let started = Instant::now();
        let worker_count = self.workers.min(tasks.len());
        let queue = Arc::new(Mutex::new(VecDeque::from(tasks)));
        let transfer = Arc::new(transfer);
        let (tx, mut rx) = mpsc::unbounded_channel();

        let mut workers = JoinSet::new();
        for worker in 0..worker_count {
            let queue = Arc::clone(&queue);
            let transfer = Arc::clone(&transfer);
            let tx = tx.clone();
            workers.spawn(async move {
                while let Some(task) = next_task(&queue) {
                    let label = task.to_string();
                    let task_started = Instant::now();
                    let outcome = match AssertUnwindSafe((*transfer)(task)).catch_unwind().await {
                        Ok(outcome) => outcome,
                        Err(_) => {
                            tracing::error!(worker, "Worker panicked while transferring {label}");
                            TransferOutcome::failure(
                                label,
                                task_started.elapsed(),
                                TransferError::new(TransferErrorKind::OsFailure, "worker panicked"),
                            )
                        }
                    };
                    if tx.send(outcome).is_err() {
                        break;
                    }
                }
            });
        }
        drop(tx);

        let mut report = RunReport::new();
        while let Some(outcome) = rx.recv().await {
            on_outcome(&outcome);
            report.record(outcome);
        }
        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                tracing::error!("Worker task failed: {e}");
            }
        }

        report.elapsed = started.elapsed();
        report
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::with_available_parallelism()
    }
}

/// Number of CPUs available to this process, at least one
pub fn available_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

fn next_task<T>(queue: &Mutex<VecDeque<T>>) -> Option<T> {
    queue
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .pop_front()
}
