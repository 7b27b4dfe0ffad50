//! Gradient domain reconstruction

use super::compositor::*;
use super::config::*;
use gvpm_core::base::*;
use gvpm_core::error::*;
use gvpm_core::film::*;
use gvpm_core::spectrum::*;
use std::fmt;

mod solver;

// Re-export.
pub use solver::*;

/// Number of colour channels packed for the solver.
const CHANNELS: usize = 3;

/// Interface for solvers recovering an image from a primal estimate and its
/// finite differences. Buffers are channel-major: all pixels of the first
/// channel, then the second, and so on.
pub trait PoissonSolver {
    /// Returns the reconstructed image in the same layout as `throughput`.
    ///
    /// * `throughput` - Primal estimate.
    /// * `dx`         - Horizontal forward differences.
    /// * `dy`         - Vertical forward differences.
    /// * `width`      - Image width.
    /// * `height`     - Image height.
    /// * `channels`   - Number of channels.
    /// * `alpha`      - Weight of the primal estimate.
    #[allow(clippy::too_many_arguments)]
    fn solve(
        &self,
        throughput: &[Float],
        dx: &[Float],
        dy: &[Float],
        width: usize,
        height: usize,
        channels: usize,
        alpha: Float,
    ) -> Vec<Float>;
}

/// Packs a bitmap into a channel-major buffer.
///
/// * `bitmap` - The image.
pub fn pack(bitmap: &Bitmap) -> Vec<Float> {
    (0..CHANNELS)
        .flat_map(|c| bitmap.pixels.iter().map(move |p| p[c]))
        .collect()
}

/// Unpacks a channel-major buffer into a bitmap.
///
/// * `data`   - Channel-major values.
/// * `width`  - Image width.
/// * `height` - Image height.
pub fn unpack(data: &[Float], width: usize, height: usize) -> Bitmap {
    let n = width * height;
    let mut bitmap = Bitmap::new(width, height);
    for (i, p) in bitmap.pixels.iter_mut().enumerate() {
        *p = Spectrum::rgb(data[i], data[n + i], data[2 * n + i]);
    }
    bitmap
}

/// Zeroes non-finite entries and returns how many there were.
///
/// * `data` - Values to sanitise.
fn sanitize(data: &mut [Float]) -> usize {
    let mut count = 0;
    for v in data.iter_mut().filter(|v| !v.is_finite()) {
        *v = 0.0;
        count += 1;
    }
    count
}

/// Returns the solvers to run with the name suffix of their output.
///
/// * `config` - Integrator settings.
pub fn solvers(config: &GVPMConfig) -> Vec<(&'static str, ScreenedPoissonSolver)> {
    match (config.reconstruct_l2, config.reconstruct_l1) {
        (true, true) => vec![
            ("_L2_", ScreenedPoissonSolver::new(ReconstructionNorm::L2)),
            ("_L1_", ScreenedPoissonSolver::new(ReconstructionNorm::L1)),
        ],
        (true, false) => vec![("_recons_", ScreenedPoissonSolver::new(ReconstructionNorm::L2))],
        (false, true) => vec![("_recons_", ScreenedPoissonSolver::new(ReconstructionNorm::L1))],
        (false, false) => vec![],
    }
}

/// Reconstructs an image from the composited pass.
///
/// * `config` - Integrator settings.
/// * `images` - Composited images.
/// * `solver` - The solver.
pub fn reconstruct(config: &GVPMConfig, images: &CompositeImages, solver: &dyn PoissonSolver) -> Bitmap {
    let (width, height) = (images.throughput.width, images.throughput.height);
    let mut throughput = pack(&images.throughput);
    let mut dx = pack(&images.dx);
    let mut dy = pack(&images.dy);
    if config.nan_check {
        let count = sanitize(&mut throughput) + sanitize(&mut dx) + sanitize(&mut dy);
        if count > 0 {
            warn!("Zeroed {count} non-finite values before reconstruction");
        }
    }

    let solved = solver.solve(&throughput, &dx, &dy, width, height, CHANNELS, config.reconstruct_alpha);
    let mut bitmap = unpack(&solved, width, height);
    for (i, p) in bitmap.pixels.iter_mut().enumerate() {
        if config.force_black_pixels && images.mask[i] {
            *p = images.emission.pixels[i];
        }
        *p = p.clamp_negative() + images.direct.pixels[i];
    }
    bitmap
}

/// Reconstructs and writes the images of a pass.
///
/// * `config`      - Integrator settings.
/// * `images`      - Composited images.
/// * `film`        - Film receiving the images.
/// * `destination` - Output path prefix.
/// * `it`          - 1-based pass number.
pub fn export(
    config: &GVPMConfig,
    images: &CompositeImages,
    film: &mut dyn Film,
    destination: &str,
    it: Int,
) -> Result<(), GVPMError> {
    for (suffix, solver) in solvers(config) {
        info!("Reconstructing pass {} ({})", it, solver.norm);
        let bitmap = reconstruct(config, images, &solver);
        film.set_bitmap(&bitmap);
        film.develop(&format!("{destination}{suffix}{it}"))?;
    }

    film.set_bitmap(&images.dx.abs());
    film.develop(&format!("{destination}_dxAbs_{it}"))?;
    film.set_bitmap(&images.dy.abs());
    film.develop(&format!("{destination}_dyAbs_{it}"))?;

    let mut primal = images.throughput.clone();
    for (p, d) in primal.pixels.iter_mut().zip(images.direct.pixels.iter()) {
        *p += *d;
    }
    film.set_bitmap(&primal);
    film.develop(&format!("{destination}_{it}"))
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
