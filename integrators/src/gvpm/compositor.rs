//! Compositing of the accumulated estimates into images

use super::config::*;
use super::gather_point::*;
use super::shift::ShiftDirection;
use gvpm_core::base::*;
use gvpm_core::film::*;
use gvpm_core::spectrum::*;

/// Images of one pass.
#[derive(Clone, Debug)]
pub struct CompositeImages {
    /// Primal estimate.
    pub throughput: Bitmap,

    /// Horizontal finite differences.
    pub dx: Bitmap,

    /// Vertical finite differences.
    pub dy: Bitmap,

    /// Next event estimation, kept out of the reconstruction.
    pub direct: Bitmap,

    /// Emission reached by camera paths.
    pub emission: Bitmap,

    /// Pixels that had nothing to reconstruct.
    pub mask: Vec<bool>,
}

/// Factors applied to the accumulators of a pass.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Normalisation {
    /// Factor of the surface accumulators.
    pub surface: Float,

    /// Factor of the medium accumulators.
    pub volume: Float,

    /// Factor of the emission.
    pub emission: Float,

    /// Factor of the emitter gradients.
    pub emitter: Float,
}

impl Normalisation {
    /// Returns the factors for pass `it`. Zero totals drop their terms.
    ///
    /// * `config`        - Integrator settings.
    /// * `it`            - 1-based pass number.
    /// * `total_surface` - Surface particles traced over all passes.
    /// * `total_volume`  - Volume particles traced over all passes.
    pub fn new(config: &GVPMConfig, it: Int, total_surface: u64, total_volume: u64) -> Self {
        let inv_it = 1.0 / max(it, 1) as Float;
        let inverse = |total: u64| if total > 0 { 1.0 / total as Float } else { 0.0 };
        let volume = if config.vol_technique.is_apa() {
            1.0
        } else {
            inverse(total_volume)
        };
        Self {
            surface: inverse(total_surface),
            volume,
            emission: inv_it,
            emitter: if config.direct_tracing { inv_it } else { 0.0 },
        }
    }

    /// Returns the normalised difference between the shifted and the
    /// weighted base contributions of a gather point in a direction.
    ///
    /// * `gp`        - The gather point.
    /// * `direction` - Shift direction.
    pub fn shift_difference(&self, gp: &GatherPoint, direction: ShiftDirection) -> Spectrum {
        let k = direction.index();
        (gp.shifted_flux[k] - gp.weighted_base_flux[k]) * self.surface
            + (gp.shifted_medium_flux[k] - gp.weighted_medium_flux[k]) * self.volume
            + (gp.shifted_emitter_flux[k] - gp.weighted_emitter_flux[k]) * self.emitter
    }
}

/// Returns the medium part of the primal estimate of a pixel. With primal
/// reuse it is the mean over the four directions of the weighted own
/// contribution and the neighbour's shift towards this pixel.
fn medium_primal(
    config: &GVPMConfig,
    blocks: &[GatherBlock],
    index: &PixelIndex,
    x: usize,
    y: usize,
    norm: &Normalisation,
) -> Spectrum {
    let gp = index.get(blocks, x, y);
    if !config.reuse_primal || config.vol_technique == VolTechnique::None {
        return gp.medium_flux * norm.volume;
    }
    let mut sum = Spectrum::ZERO;
    for direction in ShiftDirection::ALL {
        sum += gp.weighted_medium_flux[direction.index()];
        if let Some(nb) = index.neighbour(blocks, x, y, direction) {
            sum += nb.shifted_medium_flux[direction.opposite().index()];
        }
    }
    sum * (0.25 * norm.volume)
}

/// Builds the primal, gradient, direct and emission images of a pass.
///
/// * `config`        - Integrator settings.
/// * `blocks`        - Gather points.
/// * `index`         - Pixel index of the blocks.
/// * `it`            - 1-based pass number.
/// * `total_surface` - Surface particles traced over all passes.
/// * `total_volume`  - Volume particles traced over all passes.
pub fn composite(
    config: &GVPMConfig,
    blocks: &[GatherBlock],
    index: &PixelIndex,
    it: Int,
    total_surface: u64,
    total_volume: u64,
) -> CompositeImages {
    let (width, height) = (index.width(), index.height());
    let norm = Normalisation::new(config, it, total_surface, total_volume);

    let mut images = CompositeImages {
        throughput: Bitmap::new(width, height),
        dx: Bitmap::new(width, height),
        dy: Bitmap::new(width, height),
        direct: Bitmap::new(width, height),
        emission: Bitmap::new(width, height),
        mask: vec![false; width * height],
    };

    for y in 0..height {
        for x in 0..width {
            let gp = index.get(blocks, x, y);
            let emission = gp.emission * norm.emission;
            let throughput = medium_primal(config, blocks, index, x, y, &norm) + gp.base_flux * norm.surface + emission;

            let mut dx = norm.shift_difference(gp, ShiftDirection::Right);
            if let Some(nb) = index.neighbour(blocks, x, y, ShiftDirection::Right) {
                dx -= norm.shift_difference(nb, ShiftDirection::Left);
            }
            let mut dy = norm.shift_difference(gp, ShiftDirection::Bottom);
            if let Some(nb) = index.neighbour(blocks, x, y, ShiftDirection::Bottom) {
                dy -= norm.shift_difference(nb, ShiftDirection::Top);
            }

            images.throughput[(x, y)] = throughput;
            images.dx[(x, y)] = dx;
            images.dy[(x, y)] = dy;
            images.direct[(x, y)] = gp.direct_emission * norm.emission;
            images.emission[(x, y)] = emission;
            images.mask[y * width + x] = throughput.is_black() && !gp.have_smoke;
        }
    }
    images
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::approx_eq;
    use gvpm_core::geometry::*;

    fn grid(width: Int, height: Int) -> (Vec<GatherBlock>, PixelIndex) {
        let res = Point2i::new(width, height);
        let blocks = GatherBlock::tiles(res, 2, 1.0);
        let index = PixelIndex::new(&blocks, res).unwrap();
        (blocks, index)
    }

    fn gp_mut<'a>(blocks: &'a mut [GatherBlock], index: &PixelIndex, x: usize, y: usize) -> &'a mut GatherPoint {
        let pixel = index.get(blocks, x, y).pixel;
        blocks
            .iter_mut()
            .flat_map(|b| b.gather_points.iter_mut())
            .find(|gp| gp.pixel == pixel)
            .unwrap()
    }

    fn config() -> GVPMConfig {
        GVPMConfig {
            vol_technique: VolTechnique::None,
            ..Default::default()
        }
    }

    #[test]
    fn emission_only_gives_flat_gradients() {
        let (mut blocks, index) = grid(3, 3);
        for b in blocks.iter_mut() {
            for gp in b.gather_points.iter_mut() {
                gp.emission = Spectrum::new(4.0);
            }
        }
        let images = composite(&config(), &blocks, &index, 2, 0, 0);
        assert!(images.throughput.pixels.iter().all(|p| *p == Spectrum::new(2.0)));
        assert!(images.dx.pixels.iter().all(|p| p.is_black()));
        assert!(images.dy.pixels.iter().all(|p| p.is_black()));
        assert!(images.mask.iter().all(|m| !m));
    }

    #[test]
    fn gradients_combine_both_sides() {
        let (mut blocks, index) = grid(3, 2);
        let right = ShiftDirection::Right.index();
        let left = ShiftDirection::Left.index();
        {
            let gp = gp_mut(&mut blocks, &index, 0, 0);
            gp.shifted_flux[right] = Spectrum::new(6.0);
            gp.weighted_base_flux[right] = Spectrum::new(2.0);
        }
        {
            let gp = gp_mut(&mut blocks, &index, 1, 0);
            gp.shifted_flux[left] = Spectrum::new(1.0);
            gp.weighted_base_flux[left] = Spectrum::new(3.0);
        }
        {
            let gp = gp_mut(&mut blocks, &index, 2, 0);
            gp.shifted_flux[right] = Spectrum::new(100.0);
        }
        let images = composite(&config(), &blocks, &index, 1, 2, 0);
        // ((6 - 2) + (3 - 1)) / 2
        assert!(approx_eq!(f32, images.dx[(0, 0)].y(), 3.0, epsilon = 1e-5));
        // Last column only keeps its own term.
        assert!(approx_eq!(f32, images.dx[(2, 0)].y(), 50.0, epsilon = 1e-4));
        assert!(images.dy[(0, 0)].is_black());
    }

    #[test]
    fn zero_totals_drop_their_terms() {
        let (mut blocks, index) = grid(2, 2);
        gp_mut(&mut blocks, &index, 0, 0).base_flux = Spectrum::new(5.0);
        gp_mut(&mut blocks, &index, 1, 1).medium_flux = Spectrum::new(5.0);
        let config = GVPMConfig {
            vol_technique: VolTechnique::Distance,
            ..Default::default()
        };
        let images = composite(&config, &blocks, &index, 1, 0, 0);
        assert!(images.throughput.pixels.iter().all(|p| p.is_black()));
        assert!(images.mask.iter().all(|m| *m));

        let images = composite(&config, &blocks, &index, 1, 10, 5);
        assert!(approx_eq!(f32, images.throughput[(0, 0)].y(), 0.5, epsilon = 1e-6));
        assert!(approx_eq!(f32, images.throughput[(1, 1)].y(), 1.0, epsilon = 1e-6));
    }

    #[test]
    fn apa_media_are_not_divided_by_totals() {
        let (mut blocks, index) = grid(1, 1);
        gp_mut(&mut blocks, &index, 0, 0).medium_flux = Spectrum::new(0.25);
        let config = GVPMConfig {
            vol_technique: VolTechnique::Beam3D,
            ..Default::default()
        };
        let images = composite(&config, &blocks, &index, 3, 0, 1000);
        assert!(approx_eq!(f32, images.throughput[(0, 0)].y(), 0.25, epsilon = 1e-6));
    }

    #[test]
    fn reused_primal_averages_neighbour_shifts() {
        let (mut blocks, index) = grid(2, 1);
        let left = ShiftDirection::Left.index();
        {
            let gp = gp_mut(&mut blocks, &index, 0, 0);
            gp.medium_flux = Spectrum::new(8.0);
            gp.weighted_medium_flux = [Spectrum::new(8.0), Spectrum::new(4.0), Spectrum::new(8.0), Spectrum::new(8.0)];
        }
        gp_mut(&mut blocks, &index, 1, 0).shifted_medium_flux[left] = Spectrum::new(2.0);
        let config = GVPMConfig {
            vol_technique: VolTechnique::Beam3D,
            reuse_primal: true,
            ..Default::default()
        };
        let images = composite(&config, &blocks, &index, 1, 0, 0);
        // (8 + (4 + 2) + 8 + 8) / 4
        assert!(approx_eq!(f32, images.throughput[(0, 0)].y(), 7.5, epsilon = 1e-5));
    }

    #[test]
    fn emitter_gradients_need_direct_tracing() {
        let (mut blocks, index) = grid(2, 1);
        gp_mut(&mut blocks, &index, 0, 0).shifted_emitter_flux[ShiftDirection::Right.index()] = Spectrum::new(2.0);
        let images = composite(&config(), &blocks, &index, 1, 0, 0);
        assert!(images.dx[(0, 0)].is_black());

        let config = GVPMConfig {
            direct_tracing: true,
            ..config()
        };
        let images = composite(&config, &blocks, &index, 2, 0, 0);
        assert!(approx_eq!(f32, images.dx[(0, 0)].y(), 1.0, epsilon = 1e-6));
    }
}
