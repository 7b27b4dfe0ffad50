//! GVPM configuration

use gvpm_core::base::*;
use gvpm_core::error::*;
use gvpm_core::light::*;
use gvpm_core::paramset::*;
use gvpm_core::scene::*;
use std::fmt;

/// Volume density estimation technique.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum VolTechnique {
    /// No volume rendering.
    None,

    /// Point queries at distances sampled along camera edges.
    Distance,

    /// Beam radiance estimate with a 2D kernel.
    Bre,

    /// Beam radiance estimate with a 3D kernel.
    Bre3D,

    /// Beam-beam with a 1D kernel.
    Beam1D,

    /// Beam-beam with a 3D kernel, brute force over all beams.
    Beam3D,

    /// Beam-beam with a 3D kernel, beams looked up in a BVH.
    Beam3DAcc,

    /// Photon planes, no kernel.
    Plane0D,
}

impl VolTechnique {
    /// Parse a technique name.
    ///
    /// * `name` - Technique name.
    pub fn from_name(name: &str) -> Result<Self, GVPMError> {
        match name {
            "none" => Ok(Self::None),
            "distance" => Ok(Self::Distance),
            "bre" => Ok(Self::Bre),
            "bre3d" => Ok(Self::Bre3D),
            "beam" | "beam1d" => Ok(Self::Beam1D),
            "beam3d" => Ok(Self::Beam3D),
            "beam3dacc" => Ok(Self::Beam3DAcc),
            "plane0d" => Ok(Self::Plane0D),
            _ => Err(GVPMError::Config(format!("unknown volume technique '{}'", name))),
        }
    }

    /// Returns true for estimators that keep a running mean over passes
    /// with a global radius.
    pub fn is_apa(&self) -> bool {
        !matches!(self, Self::None | Self::Distance)
    }

    /// Returns true if the technique records beams.
    pub fn needs_beams(&self) -> bool {
        matches!(self, Self::Beam1D | Self::Beam3D | Self::Beam3DAcc | Self::Plane0D)
    }

    /// Returns true if the technique records point photons in the medium.
    pub fn needs_points(&self) -> bool {
        matches!(self, Self::Distance | Self::Bre | Self::Bre3D)
    }

    /// Returns the kernel dimension the global radius reduction follows.
    pub fn kernel_dimension(&self) -> KernelDimension {
        match self {
            Self::Bre => KernelDimension::Two,
            Self::Beam1D => KernelDimension::One,
            Self::Plane0D => KernelDimension::Zero,
            _ => KernelDimension::Three,
        }
    }
}

impl fmt::Display for VolTechnique {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::None => "none",
            Self::Distance => "distance",
            Self::Bre => "bre",
            Self::Bre3D => "bre3d",
            Self::Beam1D => "beam1d",
            Self::Beam3D => "beam3d",
            Self::Beam3DAcc => "beam3dacc",
            Self::Plane0D => "plane0d",
        };
        write!(f, "{}", name)
    }
}

/// Dimension of a volume kernel. Selects how the global radius shrinks.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum KernelDimension {
    Zero,
    One,
    Two,
    Three,
}

impl KernelDimension {
    /// Parse a `forceAPA` value. The empty string means no override.
    ///
    /// * `name` - `1D`, `2D`, `3D` or empty.
    pub fn from_force_apa(name: &str) -> Result<Option<Self>, GVPMError> {
        match name {
            "" => Ok(None),
            "1D" => Ok(Some(Self::One)),
            "2D" => Ok(Some(Self::Two)),
            "3D" => Ok(Some(Self::Three)),
            _ => Err(GVPMError::Config(format!("unknown forceAPA value '{}'", name))),
        }
    }

    /// Reduces a radius ratio according to the kernel dimension.
    ///
    /// * `ratio` - Ratio of accumulated counts.
    pub fn reduce(&self, ratio: Float) -> Float {
        match self {
            Self::Zero => 1.0,
            Self::One => ratio,
            Self::Two => ratio.sqrt(),
            Self::Three => ratio.cbrt(),
        }
    }
}

/// Immutable per render settings of the GVPM integrator.
#[derive(Clone, Debug)]
pub struct GVPMConfig {
    /// Maximum path length in segments. -1 means no limit.
    pub max_depth: Int,

    /// Minimum path length in segments.
    pub min_depth: Int,

    /// Photon depth at which Russian roulette starts.
    pub rr_depth: Int,

    /// Surface photon paths per pass.
    pub photon_count: Int,

    /// Volume photon paths per pass.
    pub volume_photon_count: Int,

    /// Initial surface radius. 0 derives it from the pixel footprint.
    pub initial_radius: Float,

    /// Multiplier of the automatic surface radius.
    pub initial_scale: Float,

    /// Initial volume kernel scale.
    pub initial_scale_volume: Float,

    /// Progressive reduction parameter.
    pub alpha: Float,

    /// Particles per shooting work unit. 0 picks a value.
    pub granularity: Int,

    /// Number of passes. -1 renders until cancelled.
    pub max_passes: Int,

    /// Reconstruction period in passes.
    pub dump_iteration: Int,

    /// Volume technique.
    pub vol_technique: VolTechnique,

    /// Kernel dimension override for the global radius reduction.
    pub force_apa: Option<KernelDimension>,

    /// Use the cube root reduction for every volume technique.
    pub use_3d_kernel_reduction: bool,

    /// Distance samples per camera edge.
    pub nb_camera_samples: Int,

    /// Stratify distance samples.
    pub stratified: bool,

    /// Run the L1 solver.
    pub reconstruct_l1: bool,

    /// Run the L2 solver.
    pub reconstruct_l2: bool,

    /// Screened Poisson data term weight.
    pub reconstruct_alpha: Float,

    /// Zero reconstructed pixels that had nothing to reconstruct.
    pub force_black_pixels: bool,

    /// Next event estimation at gather points.
    pub direct_tracing: bool,

    /// Build the volume primal from the neighbours' shifted contributions.
    pub reuse_primal: bool,

    /// Fixed work split per worker.
    pub deterministic: bool,

    /// Sanitize non-finite values before reconstruction.
    pub nan_check: bool,

    /// Balance heuristic between base and shifted paths.
    pub use_mis: bool,

    /// Glossy lobes smoother than this are followed by camera paths.
    pub bounce_roughness: Float,

    /// Manifold walk iteration cap.
    pub max_manifold_iterations: Int,

    /// Render surface photons.
    pub surface_rendering: bool,

    /// Render the participating medium.
    pub volume_rendering: bool,

    /// Tile edge in pixels.
    pub block_size: Int,
}

impl GVPMConfig {
    /// Returns true if a path of the given length is accounted for.
    ///
    /// * `length` - Path length in segments.
    #[inline]
    pub fn accepts_length(&self, length: Int) -> bool {
        length >= self.min_depth && (self.max_depth < 0 || length <= self.max_depth)
    }

    /// Returns the minimum path length used by volume contributions.
    /// Photon planes carry one extra implicit scattering vertex.
    pub fn volume_min_depth(&self) -> Int {
        match self.vol_technique {
            VolTechnique::Plane0D => self.min_depth - 1,
            _ => self.min_depth,
        }
    }

    /// Returns the maximum path length used by volume contributions, lowered
    /// with the minimum for photon planes. Negative means unbounded.
    pub fn volume_max_depth(&self) -> Int {
        match self.vol_technique {
            VolTechnique::Plane0D if self.max_depth > 0 => self.max_depth - 1,
            _ => self.max_depth,
        }
    }

    /// Returns true if a volume path of the given length is accounted for.
    ///
    /// * `length` - Path length in segments.
    #[inline]
    pub fn accepts_volume_length(&self, length: Int) -> bool {
        let max_depth = self.volume_max_depth();
        length >= self.volume_min_depth() && (max_depth < 0 || length <= max_depth)
    }

    /// Returns true if a particle at `depth` may keep scattering.
    ///
    /// * `depth` - Number of segments traced so far.
    #[inline]
    pub fn can_extend(&self, depth: Int) -> bool {
        self.max_depth < 0 || depth < self.max_depth
    }

    /// Returns true when surface photons are gathered.
    pub fn needs_surface_rendering(&self) -> bool {
        self.surface_rendering && self.photon_count > 0
    }

    /// Returns true when the participating medium is rendered.
    pub fn needs_volume_rendering(&self) -> bool {
        self.volume_rendering && self.vol_technique != VolTechnique::None
    }

    /// Returns the kernel dimension that drives the global volume radius.
    pub fn volume_kernel_dimension(&self) -> KernelDimension {
        if let Some(dim) = self.force_apa {
            dim
        } else if self.use_3d_kernel_reduction {
            KernelDimension::Three
        } else {
            self.vol_technique.kernel_dimension()
        }
    }

    /// Returns true if the pass is the last one.
    ///
    /// * `it` - 1-based pass number.
    pub fn is_last_pass(&self, it: Int) -> bool {
        self.max_passes >= 0 && it >= self.max_passes
    }

    /// Returns true if the pass reconstructs and exports images.
    ///
    /// * `it` - 1-based pass number.
    pub fn is_dump_pass(&self, it: Int) -> bool {
        it % self.dump_iteration == 0 || self.is_last_pass(it)
    }

    /// Checks settings that do not depend on the scene.
    pub fn validate(&self) -> Result<(), GVPMError> {
        if !(self.alpha > 0.0 && self.alpha <= 1.0) {
            return Err(GVPMError::Config(format!("alpha must be in (0, 1], got {}", self.alpha)));
        }
        if self.dump_iteration < 1 {
            return Err(GVPMError::Config(format!(
                "dumpIteration must be at least 1, got {}",
                self.dump_iteration
            )));
        }
        if self.photon_count < 0 || self.volume_photon_count < 0 {
            return Err(GVPMError::Config("photon counts must not be negative".to_string()));
        }
        if self.block_size < 1 {
            return Err(GVPMError::Config(format!("blockSize must be positive, got {}", self.block_size)));
        }
        if self.nb_camera_samples < 1 {
            return Err(GVPMError::Config(format!(
                "nbCameraSamples must be positive, got {}",
                self.nb_camera_samples
            )));
        }
        Ok(())
    }

    /// Checks the settings against a scene.
    ///
    /// * `scene` - The scene.
    pub fn validate_scene(&self, scene: &dyn Scene) -> Result<(), GVPMError> {
        self.validate()?;

        if self.min_depth < 2 && scene.lights().iter().any(|l| !l.light_type().matches(LightType::AREA_LIGHT)) {
            return Err(GVPMError::UnsupportedEmitter {
                min_depth: self.min_depth,
            });
        }

        if self.vol_technique != VolTechnique::None {
            let medium = scene.medium().ok_or(GVPMError::MissingMedium)?;
            if self.vol_technique == VolTechnique::Plane0D {
                if self.min_depth < 2 {
                    return Err(GVPMError::Config(format!(
                        "photon planes need minDepth of at least 2, got {}",
                        self.min_depth
                    )));
                }
                if !medium.bounds().contains(&scene.sensor().position()) {
                    return Err(GVPMError::CameraOutsideMedium);
                }
            }
        }
        Ok(())
    }
}

impl Default for GVPMConfig {
    fn default() -> Self {
        Self {
            max_depth: 12,
            min_depth: 0,
            rr_depth: 1,
            photon_count: 250000,
            volume_photon_count: 250000,
            initial_radius: 0.0,
            initial_scale: 1.0,
            initial_scale_volume: 0.1,
            alpha: 0.7,
            granularity: 0,
            max_passes: 10,
            dump_iteration: 1,
            vol_technique: VolTechnique::Distance,
            force_apa: None,
            use_3d_kernel_reduction: false,
            nb_camera_samples: 1,
            stratified: true,
            reconstruct_l1: true,
            reconstruct_l2: true,
            reconstruct_alpha: 0.2,
            force_black_pixels: false,
            direct_tracing: false,
            reuse_primal: false,
            deterministic: false,
            nan_check: true,
            use_mis: true,
            bounce_roughness: 0.05,
            max_manifold_iterations: 5,
            surface_rendering: true,
            volume_rendering: true,
            block_size: 32,
        }
    }
}

impl TryFrom<&ParamSet> for GVPMConfig {
    type Error = GVPMError;

    /// Create a `GVPMConfig` from a parameter set. Unknown technique names
    /// are rejected.
    ///
    /// * `params` - The parameter set.
    fn try_from(params: &ParamSet) -> Result<Self, Self::Error> {
        let d = Self::default();
        let vol_technique = VolTechnique::from_name(&params.find_one_string("volTechnique", d.vol_technique.to_string()))?;
        let force_apa = KernelDimension::from_force_apa(&params.find_one_string("forceAPA", String::new()))?;

        Ok(Self {
            max_depth: params.find_one_int("maxDepth", d.max_depth),
            min_depth: params.find_one_int("minDepth", d.min_depth),
            rr_depth: params.find_one_int("rrDepth", d.rr_depth),
            photon_count: params.find_one_int("photonCount", d.photon_count),
            volume_photon_count: params.find_one_int("volumePhotonCount", d.volume_photon_count),
            initial_radius: params.find_one_float("initialRadius", d.initial_radius),
            initial_scale: params.find_one_float("initialScale", d.initial_scale),
            initial_scale_volume: params.find_one_float("initialScaleVolume", d.initial_scale_volume),
            alpha: params.find_one_float("alpha", d.alpha),
            granularity: params.find_one_int("granularity", d.granularity),
            max_passes: params.find_one_int("maxPasses", d.max_passes),
            dump_iteration: params.find_one_int("dumpIteration", d.dump_iteration),
            vol_technique,
            force_apa,
            use_3d_kernel_reduction: params.find_one_bool("use3DKernelReduction", d.use_3d_kernel_reduction),
            nb_camera_samples: params.find_one_int("nbCameraSamples", d.nb_camera_samples),
            stratified: params.find_one_bool("stratified", d.stratified),
            reconstruct_l1: params.find_one_bool("reconstructL1", d.reconstruct_l1),
            reconstruct_l2: params.find_one_bool("reconstructL2", d.reconstruct_l2),
            reconstruct_alpha: params.find_one_float("reconstructAlpha", d.reconstruct_alpha),
            force_black_pixels: params.find_one_bool("forceBlackPixels", d.force_black_pixels),
            direct_tracing: params.find_one_bool("directTracing", d.direct_tracing),
            reuse_primal: params.find_one_bool("reusePrimal", d.reuse_primal),
            deterministic: params.find_one_bool("deterministic", d.deterministic),
            nan_check: params.find_one_bool("nanCheck", d.nan_check),
            use_mis: params.find_one_bool("useMIS", d.use_mis),
            bounce_roughness: params.find_one_float("bounceRoughness", d.bounce_roughness),
            max_manifold_iterations: params.find_one_int("maxManifoldIterations", d.max_manifold_iterations),
            surface_rendering: params.find_one_bool("surfaceRendering", d.surface_rendering),
            volume_rendering: params.find_one_bool("volumeRendering", d.volume_rendering),
            block_size: params.find_one_int("blockSize", d.block_size),
        })
    }
}

impl fmt::Display for GVPMConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "GVPM configuration:")?;
        writeln!(f, "  depth [{}, {}], rr from {}", self.min_depth, self.max_depth, self.rr_depth)?;
        writeln!(
            f,
            "  photons {} surface / {} volume, alpha {}",
            self.photon_count, self.volume_photon_count, self.alpha
        )?;
        writeln!(
            f,
            "  radius {} (scale {}), volume scale {}, technique {}",
            self.initial_radius, self.initial_scale, self.initial_scale_volume, self.vol_technique
        )?;
        writeln!(
            f,
            "  passes {}, dump every {}, L1 {}, L2 {}, alpha {}",
            self.max_passes, self.dump_iteration, self.reconstruct_l1, self.reconstruct_l2, self.reconstruct_alpha
        )?;
        write!(
            f,
            "  direct {}, MIS {}, reuse primal {}, deterministic {}",
            self.direct_tracing, self.use_mis, self.reuse_primal, self.deterministic
        )
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use gvpm_core::geometry::*;
    use gvpm_core::medium::*;
    use gvpm_core::spectrum::*;

    #[test]
    fn defaults_from_empty_params() {
        let config = GVPMConfig::try_from(&ParamSet::new()).unwrap();
        assert_eq!(config.max_depth, 12);
        assert_eq!(config.photon_count, 250000);
        assert_eq!(config.vol_technique, VolTechnique::Distance);
        assert_eq!(config.force_apa, None);
        assert!(config.reconstruct_l1 && config.reconstruct_l2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn technique_names() {
        assert_eq!(VolTechnique::from_name("beam").unwrap(), VolTechnique::Beam1D);
        assert_eq!(VolTechnique::from_name("beam1d").unwrap(), VolTechnique::Beam1D);
        assert!(VolTechnique::from_name("bogus").is_err());

        let mut ps = ParamSet::new();
        ps.add_one_string("forceAPA", "4D");
        assert!(matches!(GVPMConfig::try_from(&ps), Err(GVPMError::Config(_))));
    }

    #[test]
    fn invalid_scalars_are_rejected() {
        let mut config = GVPMConfig::default();
        config.alpha = 0.0;
        assert!(config.validate().is_err());
        config.alpha = 1.0;
        assert!(config.validate().is_ok());
        config.dump_iteration = 0;
        assert!(config.validate().is_err());
        config.dump_iteration = 1;
        config.photon_count = -1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn kernel_dimension_overrides() {
        let mut config = GVPMConfig {
            vol_technique: VolTechnique::Bre,
            ..Default::default()
        };
        assert_eq!(config.volume_kernel_dimension(), KernelDimension::Two);
        config.use_3d_kernel_reduction = true;
        assert_eq!(config.volume_kernel_dimension(), KernelDimension::Three);
        config.force_apa = Some(KernelDimension::One);
        assert_eq!(config.volume_kernel_dimension(), KernelDimension::One);
        assert_eq!(KernelDimension::Zero.reduce(0.5), 1.0);
    }

    #[test]
    fn path_length_filter() {
        let config = GVPMConfig {
            min_depth: 2,
            max_depth: 4,
            ..Default::default()
        };
        assert!(!config.accepts_length(1));
        assert!(config.accepts_length(2));
        assert!(config.accepts_length(4));
        assert!(!config.accepts_length(5));

        let unbounded = GVPMConfig {
            max_depth: -1,
            ..Default::default()
        };
        assert!(unbounded.accepts_length(1000));
        assert!(unbounded.can_extend(1000));
    }

    #[test]
    fn plane_volume_lengths_drop_one_vertex() {
        let planes = GVPMConfig {
            vol_technique: VolTechnique::Plane0D,
            min_depth: 2,
            max_depth: 4,
            ..Default::default()
        };
        assert_eq!(planes.volume_min_depth(), 1);
        assert_eq!(planes.volume_max_depth(), 3);
        assert!(planes.accepts_volume_length(1));
        assert!(planes.accepts_volume_length(3));
        assert!(!planes.accepts_volume_length(4));

        let unbounded = GVPMConfig {
            max_depth: -1,
            ..planes.clone()
        };
        assert_eq!(unbounded.volume_max_depth(), -1);
        assert!(unbounded.accepts_volume_length(1000));

        let points = GVPMConfig {
            vol_technique: VolTechnique::Distance,
            ..planes
        };
        assert_eq!(points.volume_max_depth(), 4);
        assert!(points.accepts_volume_length(4));
        assert!(!points.accepts_volume_length(1));
    }

    #[test]
    fn scene_validation() {
        let res = Point2i::new(8, 8);
        let config = GVPMConfig::default();
        assert!(matches!(
            config.validate_scene(&cornell_box(res, DemoScene::Cornell)),
            Err(GVPMError::MissingMedium)
        ));

        let no_volume = GVPMConfig {
            vol_technique: VolTechnique::None,
            ..Default::default()
        };
        assert!(no_volume.validate_scene(&cornell_box(res, DemoScene::Cornell)).is_ok());
        assert!(matches!(
            no_volume.validate_scene(&cornell_box(res, DemoScene::PointLight)),
            Err(GVPMError::UnsupportedEmitter { min_depth: 0 })
        ));

        let planes = GVPMConfig {
            vol_technique: VolTechnique::Plane0D,
            min_depth: 2,
            ..Default::default()
        };
        assert!(planes.validate_scene(&cornell_box(res, DemoScene::Smoke)).is_ok());

        let mut outside = cornell_box(res, DemoScene::Cornell);
        outside.set_medium(HomogeneousMedium::new(
            Spectrum::new(0.1),
            Spectrum::new(0.1),
            PhaseFunction::Isotropic,
            Bounds3f::new(Point3f::new(-1.0, -1.0, -1.0), Point3f::new(1.0, 1.0, 1.0)),
        ));
        assert!(matches!(
            planes.validate_scene(&outside),
            Err(GVPMError::CameraOutsideMedium)
        ));
    }
}
