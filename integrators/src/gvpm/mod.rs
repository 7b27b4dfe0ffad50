//! Gradient-domain Volumetric Photon Mapping

use gvpm_core::app::create_progress_bar;
use gvpm_core::base::*;
use gvpm_core::error::*;
use gvpm_core::film::*;
use gvpm_core::parallel::*;
use gvpm_core::paramset::*;
use gvpm_core::scene::*;
use indicatif::ProgressDrawTarget;
use std::fs::File;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

mod camera_path;
mod compositor;
mod config;
mod gather_point;
mod photon;
mod poisson;
mod radius;
mod shift;
mod shooting;
mod surface;
mod volume;
mod worker;

// Re-export.
pub use camera_path::*;
pub use compositor::*;
pub use config::*;
pub use gather_point::*;
pub use photon::*;
pub use poisson::*;
pub use radius::*;
pub use shift::*;
pub use shooting::*;
pub use surface::*;
pub use volume::*;
pub use worker::*;

/// Particle totals of a render.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct RenderTotals {
    /// Completed passes.
    pub passes: Int,

    /// Surface particles traced over all passes.
    pub surface: u64,

    /// Volume particles traced over all passes.
    pub volume: u64,
}

/// Implements gradient-domain photon density estimation with volumetric
/// photons, beams and planes, followed by a screened Poisson reconstruction.
pub struct GVPMIntegrator {
    /// Integrator settings.
    config: GVPMConfig,

    /// The scene.
    scene: Arc<dyn Scene>,

    /// Film receiving the exported images.
    film: Box<dyn Film>,

    /// Output path prefix.
    destination: String,

    /// Number of worker threads.
    n_threads: usize,

    /// Hide the progress bar.
    quiet: bool,

    /// Set to stop rendering.
    cancel: Arc<AtomicBool>,

    /// Global volume kernel radius, set by `preprocess()` when the scene
    /// has a medium.
    volume_radius: Option<VolumeRadius>,

    /// True if the sensor is inside the medium.
    camera_in_medium: bool,

    /// True once `preprocess()` succeeded.
    prepared: bool,

    /// Gather points of the last render.
    blocks: Vec<GatherBlock>,

    /// Totals of the last render.
    totals: RenderTotals,
}

impl GVPMIntegrator {
    /// Create a new `GVPMIntegrator`.
    ///
    /// * `config`      - Integrator settings.
    /// * `scene`       - The scene.
    /// * `film`        - Film receiving the exported images.
    /// * `destination` - Output path prefix.
    /// * `n_threads`   - Number of worker threads.
    pub fn new(config: GVPMConfig, scene: Arc<dyn Scene>, film: Box<dyn Film>, destination: &str, n_threads: usize) -> Self {
        Self {
            config,
            scene,
            film,
            destination: destination.to_string(),
            n_threads,
            quiet: false,
            cancel: Arc::new(AtomicBool::new(false)),
            volume_radius: None,
            camera_in_medium: false,
            prepared: false,
            blocks: vec![],
            totals: RenderTotals::default(),
        }
    }

    /// Create a `GVPMIntegrator` from a parameter set.
    ///
    /// * `params`      - The parameter set.
    /// * `scene`       - The scene.
    /// * `film`        - Film receiving the exported images.
    /// * `destination` - Output path prefix.
    /// * `n_threads`   - Number of worker threads.
    pub fn from_params(
        params: &ParamSet,
        scene: Arc<dyn Scene>,
        film: Box<dyn Film>,
        destination: &str,
        n_threads: usize,
    ) -> Result<Self, GVPMError> {
        let config = GVPMConfig::try_from(params)?;
        Ok(Self::new(config, scene, film, destination, n_threads))
    }

    /// Hides or shows the progress bar.
    ///
    /// * `quiet` - Hide the progress bar.
    pub fn set_quiet(&mut self, quiet: bool) {
        self.quiet = quiet;
    }

    /// Returns the integrator settings.
    pub fn config(&self) -> &GVPMConfig {
        &self.config
    }

    /// Returns the gather points of the last render.
    pub fn gather_blocks(&self) -> &[GatherBlock] {
        &self.blocks
    }

    /// Returns the particle totals of the last render.
    pub fn totals(&self) -> RenderTotals {
        self.totals
    }

    /// Returns the flag that stops rendering when set.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Requests the render to stop at the next pass boundary or shooting
    /// work unit.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Release);
    }

    /// Validates the settings against the scene and derives the medium
    /// dependent state.
    pub fn preprocess(&mut self) -> Result<(), GVPMError> {
        self.config.validate_scene(self.scene.as_ref())?;

        let scene = self.scene.as_ref();
        self.volume_radius = scene
            .medium()
            .map(|medium| VolumeRadius::new(&medium.bounds(), self.config.initial_scale_volume));
        self.camera_in_medium = scene
            .medium()
            .is_some_and(|medium| medium.bounds().contains(&scene.sensor().position()));

        info!("{}", self.config);
        if let Some(vr) = self.volume_radius {
            debug!(
                "Volume radius {} (camera in medium: {})",
                vr.radius(),
                self.camera_in_medium
            );
        }
        self.prepared = true;
        Ok(())
    }

    /// Runs the pass loop until `maxPasses` passes are done or the render is
    /// cancelled. Returns `false` when cancelled.
    pub fn render(&mut self) -> Result<bool, GVPMError> {
        if !self.prepared {
            self.preprocess()?;
        }

        let scene = Arc::clone(&self.scene);
        let scene: &dyn Scene = scene.as_ref();
        let config = self.config.clone();
        let config = &config;
        let cancel = Arc::clone(&self.cancel);

        let resolution = scene.sensor().resolution();
        let mut blocks = GatherBlock::tiles(resolution, max(config.block_size, 1) as usize, config.initial_scale_volume);
        let index = PixelIndex::new(&blocks, resolution)?;

        let scheduler = LocalScheduler::new(self.n_threads);
        let mut scratch: Vec<WorkerScratch> = (0..scheduler.worker_count()).map(WorkerScratch::new).collect();
        let estimator = VolumeEstimator::from_technique(config.vol_technique).filter(|_| config.needs_volume_rendering());
        let mut volume_radius = self.volume_radius;
        let mut totals = RenderTotals::default();

        let mut time_file = File::create(format!("{}_time.csv", self.destination))?;
        let progress = create_progress_bar(max(config.max_passes, 0) as u64);
        if self.quiet {
            progress.set_draw_target(ProgressDrawTarget::hidden());
        }
        progress.set_message("Rendering passes");

        let mut it: Int = 0;
        let completed = loop {
            if cancel.load(Ordering::Acquire) {
                break false;
            }
            if config.max_passes >= 0 && it >= config.max_passes {
                break true;
            }
            it += 1;
            let pass = it as usize;
            let start = Instant::now();

            // Trace new camera paths.
            BlockScheduler::run(&mut blocks, &mut scratch, |tile, block, _, s| {
                let mut sampler = s.tile_sampler(pass, tile);
                for gp in block.gather_points.iter_mut() {
                    gp.regenerate(scene, config, sampler.as_mut());
                }
                Ok(())
            })?;

            let shot = shoot(scene, config, &scheduler, pass, volume_radius, &cancel);
            if cancel.load(Ordering::Acquire) {
                break false;
            }
            totals.surface += shot.shot_surface as u64;
            totals.volume += shot.shot_volume as u64;

            let ctx = match (scene.medium(), estimator, volume_radius) {
                (Some(medium), Some(estimator), Some(radius)) => Some(VolumeContext {
                    scene,
                    config,
                    medium,
                    map: &shot.volume_map,
                    radius,
                    estimator,
                    pass,
                    shot_volume: shot.shot_volume,
                }),
                _ => None,
            };

            // Surface density estimation, then volume density estimation
            // once every tile has finished.
            gather_surface_phase(scene, config, &shot.surface_map, &mut blocks, &mut scratch)?;
            if let Some(ctx) = ctx.as_ref() {
                gather_volume_phase(ctx, &mut blocks, &mut scratch)?;
            }

            if estimator.is_some_and(|e| e.is_apa()) {
                volume_radius = volume_radius.map(|vr| vr.reduced(it, config.alpha, config.volume_kernel_dimension()));
            }

            let mut stats = ShiftStats::default();
            for s in scratch.iter_mut() {
                s.check_leaks()?;
                stats.merge(&s.take_stats());
            }
            debug!("Pass {}: {}", it, stats);

            let images = composite(config, &blocks, &index, it, totals.surface, totals.volume);
            let elapsed = start.elapsed().as_secs_f64();
            writeln!(time_file, "{},", elapsed)?;
            totals.passes = it;

            if config.is_dump_pass(it) {
                export(config, &images, self.film.as_mut(), &self.destination, it)?;
            }

            info!("Pass {} done in {:.3} s", it, elapsed);
            progress.inc(1);
        };

        if completed {
            progress.finish_with_message("Done");
        } else {
            progress.abandon_with_message("Cancelled");
            info!("Render cancelled after {} passes", totals.passes);
        }
        self.blocks = blocks;
        self.totals = totals;
        Ok(completed)
    }
}

/// Gathers surface photons and emitter gradients for every gather point.
/// Shifts are built per gather point and released before the next one.
///
/// * `scene`   - The scene.
/// * `config`  - Integrator settings.
/// * `map`     - Surface photons of the pass.
/// * `blocks`  - Gather blocks.
/// * `scratch` - One scratch slot per worker.
fn gather_surface_phase(
    scene: &dyn Scene,
    config: &GVPMConfig,
    map: &SurfacePhotonMap,
    blocks: &mut [GatherBlock],
    scratch: &mut [WorkerScratch],
) -> Result<(), GVPMError> {
    let surface = config.needs_surface_rendering();
    if !surface && !config.direct_tracing {
        return Ok(());
    }
    BlockScheduler::run(blocks, scratch, |_, block, _, s| {
        for gp in block.gather_points.iter_mut() {
            let shifts = create_shifts(scene, config, &gp.path, &gp.pixel, &s.arena, &mut s.stats);
            if surface {
                gather_surface(scene, config, map, gp, &shifts, &mut s.stats);
            }
            if config.direct_tracing {
                accumulate_emitter_shifts(gp, &shifts, config.use_mis);
            }
        }
        Ok(())
    })
}

/// Gathers the volume photons, beams or planes for every gather point.
///
/// * `ctx`     - Volume context of the pass.
/// * `blocks`  - Gather blocks.
/// * `scratch` - One scratch slot per worker.
fn gather_volume_phase(
    ctx: &VolumeContext,
    blocks: &mut [GatherBlock],
    scratch: &mut [WorkerScratch],
) -> Result<(), GVPMError> {
    let n_blocks = blocks.len();
    BlockScheduler::run(blocks, scratch, |tile, block, _, s| {
        let mut sampler = s.tile_sampler(ctx.pass, n_blocks + tile);
        for gp in block.gather_points.iter_mut() {
            let shifts = create_shifts(ctx.scene, ctx.config, &gp.path, &gp.pixel, &s.arena, &mut s.stats);
            gather_volume(ctx, gp, &shifts, &mut s.stats, sampler.as_mut());
        }
        Ok(())
    })
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
