//! Shift mapping

use super::camera_path::*;
use super::config::*;
use super::photon::*;
use gvpm_core::base::*;
use gvpm_core::geometry::*;
use gvpm_core::scene::*;
use gvpm_core::spectrum::*;
use shared_arena::{ArenaBox, SharedArena};
use std::fmt;

mod camera;
mod manifold;
mod reconnect;

// Re-export
pub use camera::*;
pub use manifold::*;
pub use reconnect::*;

/// Direction of a neighbouring pixel.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ShiftDirection {
    Left,
    Right,
    Top,
    Bottom,
}

impl ShiftDirection {
    /// All directions in storage order.
    pub const ALL: [Self; 4] = [Self::Left, Self::Right, Self::Top, Self::Bottom];

    /// Returns the pixel offset.
    pub fn offset(&self) -> Point2i {
        match self {
            Self::Left => Point2i::new(-1, 0),
            Self::Right => Point2i::new(1, 0),
            Self::Top => Point2i::new(0, -1),
            Self::Bottom => Point2i::new(0, 1),
        }
    }

    /// Returns the storage index.
    #[inline]
    pub fn index(&self) -> usize {
        match self {
            Self::Left => 0,
            Self::Right => 1,
            Self::Top => 2,
            Self::Bottom => 3,
        }
    }

    /// Returns the opposite direction.
    pub fn opposite(&self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
            Self::Top => Self::Bottom,
            Self::Bottom => Self::Top,
        }
    }
}

/// A camera path replayed through a neighbouring pixel.
#[derive(Clone, Debug)]
pub struct ShiftGatherPoint {
    /// Shift direction.
    pub direction: ShiftDirection,

    /// Neighbour pixel.
    pub pixel: Point2i,

    /// Shifted camera path. `path.gather` is set when the base path gathers.
    pub path: CameraPath,

    /// Jacobian of the camera shift.
    pub jacobian: Float,

    /// Density of the shifted path over the density of the base path.
    pub pdf_ratio: Float,

    /// False when the shift failed.
    pub valid: bool,
}

impl ShiftGatherPoint {
    /// Returns a failed shift.
    ///
    /// * `direction` - Shift direction.
    /// * `pixel`     - Neighbour pixel.
    pub fn invalid(direction: ShiftDirection, pixel: Point2i) -> Self {
        Self {
            direction,
            pixel,
            path: CameraPath::default(),
            jacobian: 0.0,
            pdf_ratio: 0.0,
            valid: false,
        }
    }

    /// Returns the shifted gather vertex of a valid shift.
    pub fn gather(&self) -> Option<&SurfaceGather> {
        if self.valid {
            self.path.gather.as_ref()
        } else {
            None
        }
    }

    /// Returns the shifted edge with the same index as a base edge.
    ///
    /// * `index` - Edge index.
    pub fn edge(&self, index: usize) -> Option<&CameraEdge> {
        if self.valid {
            self.path.edges.get(index)
        } else {
            None
        }
    }
}

/// The shifted camera paths of one gather point.
pub type ShiftSet = [ArenaBox<ShiftGatherPoint>; 4];

/// Shifts the camera path of a gather point in every direction, allocating
/// the results from a worker arena. The slots return to the arena when the
/// set is dropped.
///
/// * `scene`  - The scene.
/// * `config` - Integrator settings.
/// * `path`   - Base camera path.
/// * `pixel`  - Base pixel.
/// * `arena`  - Worker arena.
/// * `stats`  - Worker statistics.
pub fn create_shifts(
    scene: &dyn Scene,
    config: &GVPMConfig,
    path: &CameraPath,
    pixel: &Point2i,
    arena: &SharedArena<ShiftGatherPoint>,
    stats: &mut ShiftStats,
) -> ShiftSet {
    ShiftDirection::ALL.map(|direction| {
        let sgp = shift_camera_path(scene, config, path, pixel, direction);
        if !sgp.valid {
            stats.camera_failures += 1;
        }
        arena.alloc(sgp)
    })
}

/// How the light side of a photon is shifted.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ShiftOperation {
    /// Reconnect the shifted photon to the parent vertex.
    Reconnect,

    /// Walk the mirror manifold between the grandparent and the shifted
    /// photon.
    Manifold,

    /// No shift exists.
    Null,
}

impl ShiftOperation {
    /// Selects the operation for a photon.
    ///
    /// * `parent`      - Parent vertex.
    /// * `grandparent` - Vertex before the parent.
    pub fn select(parent: &LightVertex, grandparent: Option<&LightVertex>) -> Self {
        if !parent.is_delta() {
            Self::Reconnect
        } else {
            match grandparent {
                Some(g) if !g.is_delta() && matches!(parent.normal, Some(_)) => Self::Manifold,
                _ => Self::Null,
            }
        }
    }
}

/// A shifted light sub-path ending at a shifted photon.
#[derive(Copy, Clone, Debug)]
pub struct LightShift {
    /// Direction from the shifted photon towards the previous vertex.
    pub wi: Vector3f,

    /// Shifted flux over base flux.
    pub flux_ratio: Spectrum,

    /// Jacobian of the light side shift.
    pub jacobian: Float,

    /// Shifted density over base density.
    pub pdf_ratio: Float,
}

/// Shifts the light side of a photon onto a new position.
///
/// * `scene`      - The scene.
/// * `config`     - Integrator settings.
/// * `photon`     - Base photon.
/// * `position`   - Shifted photon position.
/// * `normal`     - Surface normal at the shifted position. `None` in media.
/// * `stats`      - Worker statistics.
pub fn shift_photon(
    scene: &dyn Scene,
    config: &GVPMConfig,
    photon: &Photon,
    position: &Point3f,
    normal: Option<Normal3f>,
    stats: &mut ShiftStats,
) -> Option<LightShift> {
    match ShiftOperation::select(&photon.parent, photon.grandparent.as_ref()) {
        ShiftOperation::Reconnect => {
            stats.reconnections += 1;
            let ls = reconnect(scene, &photon.parent, &photon.position, photon.normal, position, normal);
            if ls.is_none() {
                stats.reconnection_failures += 1;
            }
            ls
        }
        ShiftOperation::Manifold => {
            stats.manifold_walks += 1;
            let ls = photon
                .grandparent
                .and_then(|g| manifold_walk(scene, config, &g, &photon.parent, &photon.position, photon.normal, position, normal));
            if ls.is_none() {
                stats.manifold_failures += 1;
            }
            ls
        }
        ShiftOperation::Null => {
            stats.null_shifts += 1;
            None
        }
    }
}

/// Returns the MIS weight of a successful shift.
///
/// * `use_mis` - Balance heuristic, else 1/2.
/// * `ratio`   - Shifted over base density, Jacobians included.
#[inline]
pub fn mis_weight(use_mis: bool, ratio: Float) -> Float {
    if use_mis {
        1.0 / (1.0 + ratio)
    } else {
        0.5
    }
}

/// Base and shifted contributions of one gather, per direction.
#[derive(Copy, Clone, Debug, Default)]
pub struct GradientRecord {
    /// Base contribution.
    pub base: Spectrum,

    /// MIS weighted shifted contributions.
    pub shifted: [Spectrum; 4],

    /// MIS weighted base contributions.
    pub weighted: [Spectrum; 4],

    /// Number of photons found.
    pub m: Float,
}

impl GradientRecord {
    /// Adds a base contribution and its shift in one direction. A failed
    /// shift keeps the whole base contribution.
    ///
    /// * `index`   - Direction index.
    /// * `base`    - Base contribution.
    /// * `shifted` - Shifted contribution and density ratio.
    /// * `use_mis` - Balance heuristic, else 1/2.
    pub fn add_shift(&mut self, index: usize, base: Spectrum, shifted: Option<(Spectrum, Float)>, use_mis: bool) {
        match shifted {
            Some((c, ratio)) if ratio.is_finite() && ratio >= 0.0 && c.is_finite() => {
                let w = mis_weight(use_mis, ratio);
                self.weighted[index] += base * w;
                self.shifted[index] += c * w;
            }
            _ => self.weighted[index] += base,
        }
    }

    /// Scales every contribution.
    ///
    /// * `s` - Factor.
    pub fn scaled(&self, s: Float) -> Self {
        Self {
            base: self.base * s,
            shifted: self.shifted.map(|c| c * s),
            weighted: self.weighted.map(|c| c * s),
            m: self.m,
        }
    }
}

/// Shift outcome counters of one worker.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ShiftStats {
    /// Camera shifts that failed.
    pub camera_failures: u64,

    /// Reconnections attempted.
    pub reconnections: u64,

    /// Reconnections that failed.
    pub reconnection_failures: u64,

    /// Manifold walks attempted.
    pub manifold_walks: u64,

    /// Manifold walks that failed.
    pub manifold_failures: u64,

    /// Photons without a shift.
    pub null_shifts: u64,
}

impl ShiftStats {
    /// Adds the counters of another worker.
    ///
    /// * `other` - The other counters.
    pub fn merge(&mut self, other: &Self) {
        self.camera_failures += other.camera_failures;
        self.reconnections += other.reconnections;
        self.reconnection_failures += other.reconnection_failures;
        self.manifold_walks += other.manifold_walks;
        self.manifold_failures += other.manifold_failures;
        self.null_shifts += other.null_shifts;
    }
}

impl fmt::Display for ShiftStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "camera failures {}, reconnections {} ({} failed), manifold walks {} ({} failed), null shifts {}",
            self.camera_failures,
            self.reconnections,
            self.reconnection_failures,
            self.manifold_walks,
            self.manifold_failures,
            self.null_shifts
        )
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use gvpm_core::reflection::*;
    use gvpm_core::sampler::*;

    #[test]
    fn opposite_offsets_cancel() {
        for dir in ShiftDirection::ALL {
            assert_eq!(dir.offset() + dir.opposite().offset(), Point2i::new(0, 0));
            assert_eq!(ShiftDirection::ALL[dir.index()], dir);
        }
    }

    #[test]
    fn operation_follows_parent_kind() {
        let n = Vector3f::new(0.0, 1.0, 0.0);
        let mirror = LightVertex::surface(
            Point3f::zero(),
            n,
            n,
            BSDF::Mirror {
                reflectance: Spectrum::ONE,
            },
        );
        let emitter = LightVertex::emitter(Point3f::zero(), Some(n));
        assert_eq!(ShiftOperation::select(&emitter, None), ShiftOperation::Reconnect);
        assert_eq!(ShiftOperation::select(&mirror, Some(&emitter)), ShiftOperation::Manifold);
        assert_eq!(ShiftOperation::select(&mirror, Some(&mirror)), ShiftOperation::Null);
        assert_eq!(ShiftOperation::select(&mirror, None), ShiftOperation::Null);
    }

    #[test]
    fn failed_shift_keeps_base_contribution() {
        let mut rec = GradientRecord::default();
        rec.add_shift(0, Spectrum::ONE, None, true);
        rec.add_shift(1, Spectrum::ONE, Some((Spectrum::new(3.0), 1.0)), true);
        rec.add_shift(2, Spectrum::ONE, Some((Spectrum::new(3.0), 5.0)), false);
        rec.add_shift(3, Spectrum::ONE, Some((Spectrum::new(3.0), Float::NAN)), true);
        assert_eq!(rec.weighted[0], Spectrum::ONE);
        assert_eq!(rec.shifted[0], Spectrum::ZERO);
        assert_eq!(rec.weighted[1], Spectrum::new(0.5));
        assert_eq!(rec.shifted[1], Spectrum::new(1.5));
        assert_eq!(rec.weighted[2], Spectrum::new(0.5));
        assert_eq!(rec.weighted[3], Spectrum::ONE);
    }

    #[test]
    fn shifts_return_to_arena() {
        let scene = cornell_box(Point2i::new(8, 8), DemoScene::Cornell);
        let config = GVPMConfig {
            vol_technique: VolTechnique::None,
            ..Default::default()
        };
        let mut sampler = IndependentSampler::new(7);
        let pixel = Point2i::new(0, 3);
        let path = trace_camera_path(&scene, &config, &pixel, &mut sampler);
        let arena = SharedArena::new();
        let mut stats = ShiftStats::default();
        {
            let shifts = create_shifts(&scene, &config, &path, &pixel, &arena, &mut stats);
            assert!(!shifts[ShiftDirection::Left.index()].valid);
            assert!(shifts[ShiftDirection::Right.index()].valid);
            assert_eq!(arena.stats().0, 4);
        }
        assert_eq!(arena.stats().0, 0);
        assert_eq!(stats.camera_failures, 1);
    }
}
