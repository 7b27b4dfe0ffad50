//! Worker scratch

use super::shift::*;
use gvpm_core::error::*;
use gvpm_core::rng::*;
use gvpm_core::sampler::*;
use shared_arena::SharedArena;

/// State owned by one worker for the whole render.
pub struct WorkerScratch {
    /// Worker id.
    pub id: usize,

    /// Pool of shifted gather points.
    pub arena: SharedArena<ShiftGatherPoint>,

    /// Sampler prototype.
    pub sampler: Box<dyn Sampler>,

    /// Shift outcome counters of the current pass.
    pub stats: ShiftStats,
}

impl WorkerScratch {
    /// Returns a new `WorkerScratch`.
    ///
    /// * `id` - Worker id.
    pub fn new(id: usize) -> Self {
        Self {
            id,
            arena: SharedArena::new(),
            sampler: Box::new(IndependentSampler::new(id as u64)),
            stats: ShiftStats::default(),
        }
    }

    /// Returns the sampler for a tile in a pass. The sequence only depends
    /// on the pass and tile, not on which worker processes the tile.
    ///
    /// * `pass` - 1-based pass number.
    /// * `tile` - Tile index.
    pub fn tile_sampler(&self, pass: usize, tile: usize) -> Box<dyn Sampler> {
        self.sampler.clone_sampler(mix_seed(pass as u64, tile as u64))
    }

    /// Returns an error if shifted gather points are still alive.
    pub fn check_leaks(&self) -> Result<(), GVPMError> {
        let (used, free) = self.arena.stats();
        debug!("Worker {} arena: {} used, {} free", self.id, used, free);
        if used == 0 {
            Ok(())
        } else {
            Err(GVPMError::PoolLeak { worker: self.id, used })
        }
    }

    /// Returns and resets the shift counters.
    pub fn take_stats(&mut self) -> ShiftStats {
        std::mem::take(&mut self.stats)
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use gvpm_core::geometry::*;

    #[test]
    fn tile_samplers_ignore_worker() {
        let a = WorkerScratch::new(0);
        let b = WorkerScratch::new(5);
        let mut sa = a.tile_sampler(2, 9);
        let mut sb = b.tile_sampler(2, 9);
        for _ in 0..8 {
            assert_eq!(sa.get_1d(), sb.get_1d());
        }
        let mut sc = a.tile_sampler(3, 9);
        assert_ne!(a.tile_sampler(2, 9).get_2d(), sc.get_2d());
    }

    #[test]
    fn live_shift_points_are_reported() {
        let w = WorkerScratch::new(3);
        assert!(w.check_leaks().is_ok());
        let held = w.arena.alloc(ShiftGatherPoint::invalid(ShiftDirection::Left, Point2i::new(0, 0)));
        match w.check_leaks() {
            Err(GVPMError::PoolLeak { worker, used }) => {
                assert_eq!(worker, 3);
                assert_eq!(used, 1);
            }
            _ => panic!("expected a leak"),
        }
        drop(held);
        assert!(w.check_leaks().is_ok());
    }

    #[test]
    fn stats_are_reset_when_taken() {
        let mut w = WorkerScratch::new(0);
        w.stats.reconnections = 4;
        assert_eq!(w.take_stats().reconnections, 4);
        assert_eq!(w.stats, ShiftStats::default());
    }
}
