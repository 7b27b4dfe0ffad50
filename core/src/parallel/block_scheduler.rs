//! Block Scheduler

use crate::error::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::thread;

/// Runs per-tile work over a fixed pool of workers. Each worker owns one
/// scratch slot for the duration of a run.
pub struct BlockScheduler;

impl BlockScheduler {
    /// Dispatches every tile exactly once to one of `scratch.len()` workers
    /// and blocks until all tiles are done. The closure receives the tile
    /// index, the tile, the worker id and the worker's scratch. After the
    /// first error the remaining tiles are drained without work and that
    /// error is returned.
    ///
    /// * `tiles`   - The tiles.
    /// * `scratch` - One scratch slot per worker.
    /// * `f`       - Per tile work.
    pub fn run<T, S, F>(tiles: &mut [T], scratch: &mut [S], f: F) -> Result<(), GVPMError>
    where
        T: Send,
        S: Send,
        F: Fn(usize, &mut T, usize, &mut S) -> Result<(), GVPMError> + Sync,
    {
        if scratch.is_empty() {
            return Err(GVPMError::Config("block scheduler needs at least one worker".to_string()));
        }

        let n_workers = scratch.len();
        let failed = AtomicBool::new(false);
        let first_error: Mutex<Option<GVPMError>> = Mutex::new(None);

        let f = &f;
        let failed = &failed;
        let first_error = &first_error;

        thread::scope(|scope| {
            let (tx_worker, rx_worker) = crossbeam_channel::bounded::<(usize, &mut T)>(n_workers);

            // Spawn worker threads.
            for (worker_id, s) in scratch.iter_mut().enumerate() {
                let rx_worker = rx_worker.clone();
                scope.spawn(move || {
                    for (tile_idx, tile) in rx_worker.iter() {
                        if failed.load(Ordering::Acquire) {
                            continue;
                        }
                        if let Err(err) = f(tile_idx, tile, worker_id, s) {
                            failed.store(true, Ordering::Release);
                            let mut slot = first_error.lock().unwrap_or_else(|p| p.into_inner());
                            if slot.is_none() {
                                *slot = Some(err);
                            }
                        }
                    }
                });
            }
            drop(rx_worker); // Drop extra since we've cloned one for each worker.

            // Send work.
            for (tile_idx, tile) in tiles.iter_mut().enumerate() {
                tx_worker.send((tile_idx, tile)).unwrap();
            }
        });

        let err = first_error.lock().unwrap_or_else(|p| p.into_inner()).take();
        match err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_tile_runs_once() {
        let mut tiles = vec![0usize; 37];
        let mut scratch = vec![0usize; 4];
        BlockScheduler::run(&mut tiles, &mut scratch, |idx, tile, _, count| {
            *tile += idx + 1;
            *count += 1;
            Ok(())
        })
        .unwrap();
        for (i, t) in tiles.iter().enumerate() {
            assert_eq!(*t, i + 1);
        }
        assert_eq!(scratch.iter().sum::<usize>(), 37);
    }

    #[test]
    fn worker_ids_index_scratch() {
        let mut tiles = vec![(); 16];
        let mut scratch: Vec<Vec<usize>> = vec![vec![]; 3];
        BlockScheduler::run(&mut tiles, &mut scratch, |_, _, worker, s| {
            s.push(worker);
            Ok(())
        })
        .unwrap();
        for (worker, s) in scratch.iter().enumerate() {
            assert!(s.iter().all(|w| *w == worker));
        }
    }

    #[test]
    fn first_error_aborts() {
        let mut tiles = vec![0usize; 8];
        let mut scratch = vec![(); 2];
        let result = BlockScheduler::run(&mut tiles, &mut scratch, |idx, _, _, _| {
            if idx == 3 {
                Err(GVPMError::PoolLeak { worker: 0, used: 1 })
            } else {
                Ok(())
            }
        });
        assert!(matches!(result, Err(GVPMError::PoolLeak { .. })));
    }

    #[test]
    fn no_workers_is_an_error() {
        let mut tiles = vec![0usize; 2];
        let mut scratch: Vec<()> = vec![];
        assert!(BlockScheduler::run(&mut tiles, &mut scratch, |_, _, _, _| Ok(())).is_err());
    }
}
