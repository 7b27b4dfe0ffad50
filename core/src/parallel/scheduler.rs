//! Generic work unit scheduler

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

/// A job split into independent work units.
pub trait ParallelProcess: Sync {
    /// Result of one work unit.
    type Output: Send;

    /// Returns the number of work units.
    fn work_units(&self) -> usize;

    /// Processes one work unit.
    ///
    /// * `unit`   - Work unit index.
    /// * `worker` - Worker id in `[0, worker_count)`.
    fn process(&self, unit: usize, worker: usize) -> Self::Output;
}

/// Runs `ParallelProcess` jobs on local threads.
#[derive(Copy, Clone, Debug)]
pub struct LocalScheduler {
    worker_count: usize,
}

impl LocalScheduler {
    /// Returns a new `LocalScheduler`.
    ///
    /// * `worker_count` - Number of worker threads (at least 1).
    pub fn new(worker_count: usize) -> Self {
        Self {
            worker_count: worker_count.max(1),
        }
    }

    /// Returns the number of worker threads.
    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Runs all work units and returns their outputs in work unit order.
    /// Units that had not started when `cancel` was raised are skipped and
    /// reported as `None`.
    ///
    /// * `process` - The job.
    /// * `cancel`  - Cancellation flag.
    pub fn execute<P: ParallelProcess>(&self, process: &P, cancel: &AtomicBool) -> Vec<Option<P::Output>> {
        let n_units = process.work_units();
        let mut results: Vec<Option<P::Output>> = (0..n_units).map(|_| None).collect();
        if n_units == 0 {
            return results;
        }

        thread::scope(|scope| {
            let (tx_collector, rx_collector) = crossbeam_channel::bounded::<(usize, P::Output)>(self.worker_count);
            let (tx_worker, rx_worker) = crossbeam_channel::bounded::<usize>(self.worker_count);

            // Spawn collector thread.
            let results = &mut results;
            scope.spawn(move || {
                for (unit, output) in rx_collector.iter() {
                    results[unit] = Some(output);
                }
            });

            // Spawn worker threads.
            for worker in 0..self.worker_count {
                let rx_worker = rx_worker.clone();
                let tx_collector = tx_collector.clone();
                scope.spawn(move || {
                    for unit in rx_worker.iter() {
                        if cancel.load(Ordering::Acquire) {
                            continue;
                        }
                        tx_collector.send((unit, process.process(unit, worker))).unwrap();
                    }
                });
            }
            drop(rx_worker); // Drop extra since we've cloned one for each worker.
            drop(tx_collector);

            // Send work.
            for unit in 0..n_units {
                tx_worker.send(unit).unwrap();
            }
        });

        results
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
