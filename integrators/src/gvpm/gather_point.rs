//! Gather points

use super::camera_path::*;
use super::config::*;
use super::shift::ShiftDirection;
use gvpm_core::base::*;
use gvpm_core::error::*;
use gvpm_core::geometry::*;
use gvpm_core::sampler::*;
use gvpm_core::scene::*;
use gvpm_core::spectrum::*;

/// Per pixel state of the progressive estimator.
#[derive(Clone, Debug)]
pub struct GatherPoint {
    /// Pixel coordinates.
    pub pixel: Point2i,

    /// Camera path of the current pass.
    pub path: CameraPath,

    /// Surface kernel radius. 0 until the first gather vertex is found.
    pub radius: Float,

    /// Per pixel multiplier of the volume kernel radius.
    pub scale_vol: Float,

    /// Accumulated surface photon count.
    pub n: Float,

    /// Accumulated volume photon count.
    pub n_vol: Float,

    /// Kernel normalised surface flux.
    pub base_flux: Spectrum,

    /// Kernel normalised medium flux.
    pub medium_flux: Spectrum,

    /// Emission reached by camera paths, summed over passes.
    pub emission: Spectrum,

    /// Next event estimation, summed over passes.
    pub direct_emission: Spectrum,

    /// Shifted surface contributions per neighbour.
    pub shifted_flux: [Spectrum; 4],

    /// MIS weighted base surface contributions per neighbour.
    pub weighted_base_flux: [Spectrum; 4],

    /// Shifted medium contributions per neighbour.
    pub shifted_medium_flux: [Spectrum; 4],

    /// MIS weighted base medium contributions per neighbour.
    pub weighted_medium_flux: [Spectrum; 4],

    /// Shifted emission per neighbour.
    pub shifted_emitter_flux: [Spectrum; 4],

    /// Weighted base emission per neighbour.
    pub weighted_emitter_flux: [Spectrum; 4],

    /// True if a camera path crossed a scattering medium.
    pub have_smoke: bool,
}

impl GatherPoint {
    /// Returns a new `GatherPoint`.
    ///
    /// * `pixel`     - Pixel coordinates.
    /// * `scale_vol` - Initial volume kernel multiplier.
    pub fn new(pixel: Point2i, scale_vol: Float) -> Self {
        Self {
            pixel,
            path: CameraPath::default(),
            radius: 0.0,
            scale_vol,
            n: 0.0,
            n_vol: 0.0,
            base_flux: Spectrum::ZERO,
            medium_flux: Spectrum::ZERO,
            emission: Spectrum::ZERO,
            direct_emission: Spectrum::ZERO,
            shifted_flux: [Spectrum::ZERO; 4],
            weighted_base_flux: [Spectrum::ZERO; 4],
            shifted_medium_flux: [Spectrum::ZERO; 4],
            weighted_medium_flux: [Spectrum::ZERO; 4],
            shifted_emitter_flux: [Spectrum::ZERO; 4],
            weighted_emitter_flux: [Spectrum::ZERO; 4],
            have_smoke: false,
        }
    }

    /// Returns the gather vertex of the current pass.
    #[inline]
    pub fn gather(&self) -> Option<&SurfaceGather> {
        self.path.gather.as_ref()
    }

    /// Traces a new camera path for this pass and accumulates the emission
    /// it reached. The surface radius is initialised on the first gather
    /// vertex.
    ///
    /// * `scene`   - The scene.
    /// * `config`  - Integrator settings.
    /// * `sampler` - Sampler of the tile.
    pub fn regenerate(&mut self, scene: &dyn Scene, config: &GVPMConfig, sampler: &mut dyn Sampler) {
        self.path = trace_camera_path(scene, config, &self.pixel, sampler);
        self.emission += self.path.emission;
        self.direct_emission += self.path.direct;
        self.have_smoke |= self.path.crosses_medium(scene.medium());

        if self.radius == 0.0 && self.path.gather.is_some() {
            self.radius = if config.initial_radius > 0.0 {
                config.initial_radius
            } else {
                let footprint = scene.sensor().footprint(self.path.gather_distance());
                config.initial_scale * footprint
            };
        }
    }
}

/// Gather points of one image tile.
#[derive(Clone, Debug)]
pub struct GatherBlock {
    /// Top-left pixel of the tile.
    pub origin: Point2i,

    /// Tile size in pixels.
    pub size: Point2i,

    /// Gather points in row-major order.
    pub gather_points: Vec<GatherPoint>,
}

impl GatherBlock {
    /// Splits an image into tiles of gather points.
    ///
    /// * `resolution` - Image resolution.
    /// * `block_size` - Tile edge in pixels.
    /// * `scale_vol`  - Initial volume kernel multiplier.
    pub fn tiles(resolution: Point2i, block_size: usize, scale_vol: Float) -> Vec<Self> {
        let width = max(resolution.x, 0) as usize;
        let height = max(resolution.y, 0) as usize;
        let block_size = max(block_size, 1);
        let n_x = tile_count(width, block_size);
        let n_y = tile_count(height, block_size);

        let mut blocks = Vec::with_capacity(n_x * n_y);
        for ty in 0..n_y {
            for tx in 0..n_x {
                let x0 = tx * block_size;
                let y0 = ty * block_size;
                let w = min(block_size, width - x0);
                let h = min(block_size, height - y0);
                let gather_points = (0..h)
                    .flat_map(|y| (0..w).map(move |x| Point2i::new((x0 + x) as Int, (y0 + y) as Int)))
                    .map(|pixel| GatherPoint::new(pixel, scale_vol))
                    .collect();
                blocks.push(Self {
                    origin: Point2i::new(x0 as Int, y0 as Int),
                    size: Point2i::new(w as Int, h as Int),
                    gather_points,
                });
            }
        }
        blocks
    }
}

/// Maps pixel coordinates to the block and slot of their gather point.
#[derive(Clone, Debug)]
pub struct PixelIndex {
    width: usize,
    height: usize,
    slots: Vec<(usize, usize)>,
}

impl PixelIndex {
    /// Builds the index of a set of blocks covering an image.
    ///
    /// * `blocks`     - The blocks.
    /// * `resolution` - Image resolution.
    pub fn new(blocks: &[GatherBlock], resolution: Point2i) -> Result<Self, GVPMError> {
        let width = max(resolution.x, 0) as usize;
        let height = max(resolution.y, 0) as usize;
        let mut slots = vec![(usize::MAX, usize::MAX); width * height];
        for (b, block) in blocks.iter().enumerate() {
            for (s, gp) in block.gather_points.iter().enumerate() {
                let (x, y) = (gp.pixel.x as usize, gp.pixel.y as usize);
                if x >= width || y >= height {
                    return Err(GVPMError::Config(format!("pixel ({x}, {y}) outside {width}x{height}")));
                }
                slots[y * width + x] = (b, s);
            }
        }
        if slots.iter().any(|s| s.0 == usize::MAX) {
            return Err(GVPMError::Config("gather blocks do not cover the image".to_string()));
        }
        Ok(Self { width, height, slots })
    }

    /// Returns the image width.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the image height.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the gather point of a pixel.
    ///
    /// * `blocks` - The blocks the index was built from.
    /// * `x`      - Column.
    /// * `y`      - Row.
    #[inline]
    pub fn get<'a>(&self, blocks: &'a [GatherBlock], x: usize, y: usize) -> &'a GatherPoint {
        let (b, s) = self.slots[y * self.width + x];
        &blocks[b].gather_points[s]
    }

    /// Returns the gather point of the neighbour in a direction, or `None`
    /// outside the image.
    ///
    /// * `blocks`    - The blocks the index was built from.
    /// * `x`         - Column.
    /// * `y`         - Row.
    /// * `direction` - Neighbour direction.
    pub fn neighbour<'a>(
        &self,
        blocks: &'a [GatherBlock],
        x: usize,
        y: usize,
        direction: ShiftDirection,
    ) -> Option<&'a GatherPoint> {
        let offset = direction.offset();
        let nx = x as Int + offset.x;
        let ny = y as Int + offset.y;
        if nx < 0 || ny < 0 || nx >= self.width as Int || ny >= self.height as Int {
            None
        } else {
            Some(self.get(blocks, nx as usize, ny as usize))
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
