//! Camera sub-paths

use super::config::*;
use gvpm_core::base::*;
use gvpm_core::geometry::*;
use gvpm_core::medium::*;
use gvpm_core::reflection::*;
use gvpm_core::sampler::*;
use gvpm_core::scene::*;
use gvpm_core::spectrum::*;

/// A vertex of a camera sub-path.
#[derive(Copy, Clone, Debug)]
pub struct CameraVertex {
    /// Position.
    pub p: Point3f,

    /// Normal facing `wo`. Zero at the sensor.
    pub n: Normal3f,

    /// Direction towards the previous vertex. Zero at the sensor.
    pub wo: Vector3f,

    /// Reflection model. `None` at the sensor.
    pub bsdf: Option<BSDF>,

    /// Throughput arriving at the vertex, transmittance included.
    pub throughput: Spectrum,
}

impl CameraVertex {
    /// Returns the vertex at the sensor.
    ///
    /// * `p` - Sensor position.
    pub fn sensor(p: Point3f) -> Self {
        Self {
            p,
            n: Normal3f::zero(),
            wo: Vector3f::zero(),
            bsdf: None,
            throughput: Spectrum::ONE,
        }
    }
}

/// A segment of a camera sub-path.
#[derive(Copy, Clone, Debug)]
pub struct CameraEdge {
    /// Start of the segment.
    pub origin: Point3f,

    /// Unit direction.
    pub d: Vector3f,

    /// Length of the segment. Infinite when the ray left the scene.
    pub length: Float,

    /// Parametric range inside the medium.
    pub medium: Option<(Float, Float)>,

    /// Throughput at the origin.
    pub throughput: Spectrum,
}

impl CameraEdge {
    /// Returns the point at distance `t` from the origin.
    ///
    /// * `t` - Distance along the edge.
    #[inline]
    pub fn at(&self, t: Float) -> Point3f {
        self.origin + self.d * t
    }

    /// Returns true if distance `t` lies inside the medium part of the edge.
    ///
    /// * `t` - Distance along the edge.
    pub fn in_medium(&self, t: Float) -> bool {
        match self.medium {
            Some((t0, t1)) => t >= t0 && t <= t1,
            None => false,
        }
    }

    /// Returns the medium transmittance from the origin to distance `t`.
    ///
    /// * `medium` - The medium.
    /// * `t`      - Distance along the edge.
    pub fn transmittance_to(&self, medium: &dyn Medium, t: Float) -> Spectrum {
        match self.medium {
            Some((t0, t1)) => medium.transmittance(min(t, t1) - t0),
            None => Spectrum::ONE,
        }
    }
}

/// The terminal non-specular vertex of a camera path where photons are
/// gathered.
#[derive(Copy, Clone, Debug)]
pub struct SurfaceGather {
    /// Position.
    pub p: Point3f,

    /// Normal facing `wo`.
    pub n: Normal3f,

    /// Direction towards the camera.
    pub wo: Vector3f,

    /// Reflection model.
    pub bsdf: BSDF,

    /// Throughput arriving at the vertex.
    pub throughput: Spectrum,

    /// Number of camera segments up to the vertex.
    pub depth: Int,
}

/// A traced camera sub-path.
#[derive(Clone, Debug, Default)]
pub struct CameraPath {
    /// Sub-pixel position used for the primary ray.
    pub sample: Point2f,

    /// Vertices starting at the sensor.
    pub vertices: Vec<CameraVertex>,

    /// Edges. Edge `i` joins vertex `i` and vertex `i + 1` when the latter
    /// exists.
    pub edges: Vec<CameraEdge>,

    /// Where photons are gathered.
    pub gather: Option<SurfaceGather>,

    /// Emission reached along the path.
    pub emission: Spectrum,

    /// Direct lighting estimated at the gather vertex.
    pub direct: Spectrum,
}

impl CameraPath {
    /// Returns an empty path.
    ///
    /// * `sample` - Sub-pixel position.
    pub fn new(sample: Point2f) -> Self {
        Self {
            sample,
            ..Default::default()
        }
    }

    /// Returns the distance travelled from the sensor to the gather vertex.
    pub fn gather_distance(&self) -> Float {
        match self.gather {
            Some(g) => self.edges.iter().take(g.depth as usize).map(|e| e.length).sum(),
            None => 0.0,
        }
    }

    /// Returns true if any edge crosses a scattering medium.
    ///
    /// * `medium` - Medium of the scene.
    pub fn crosses_medium(&self, medium: Option<&dyn Medium>) -> bool {
        match medium {
            Some(m) if !m.sigma_s().is_black() => self.edges.iter().any(|e| e.medium.is_some()),
            _ => false,
        }
    }
}

/// Returns true if camera paths continue through a surface with this
/// reflection model instead of gathering photons there.
///
/// * `bsdf`             - Reflection model.
/// * `bounce_roughness` - Roughness threshold.
#[inline]
pub fn is_bounce(bsdf: &BSDF, bounce_roughness: Float) -> bool {
    bsdf.is_delta() || bsdf.roughness() < bounce_roughness
}

/// Traces a camera path through a pixel. Specular and smooth glossy
/// surfaces are followed; the first rough surface becomes the gather vertex.
/// Camera paths do not scatter inside the medium; volume estimators
/// integrate along the edges instead.
///
/// * `scene`   - The scene.
/// * `config`  - Integrator settings.
/// * `pixel`   - Pixel coordinates.
/// * `sampler` - Sampler.
pub fn trace_camera_path(scene: &dyn Scene, config: &GVPMConfig, pixel: &Point2i, sampler: &mut dyn Sampler) -> CameraPath {
    let sensor = scene.sensor();
    let sample = sampler.get_2d();
    let mut path = CameraPath::new(sample);
    let mut ray = match sensor.generate_ray(pixel, &sample) {
        Some(ray) => ray,
        None => return path,
    };
    path.vertices.push(CameraVertex::sensor(ray.o));

    let medium = scene.medium();
    let mut beta = Spectrum::ONE;
    let mut depth: Int = 0;
    loop {
        let its = scene.intersect(&ray);
        let length = its.map_or(INFINITY, |si| si.t);
        let range = medium.and_then(|m| m.overlap(&Ray::new(ray.o, ray.d, length)));
        path.edges.push(CameraEdge {
            origin: ray.o,
            d: ray.d,
            length,
            medium: range,
            throughput: beta,
        });
        depth += 1;

        let si = match its {
            Some(si) => si,
            None => break,
        };
        if let (Some(m), Some((t0, t1))) = (medium, range) {
            beta *= m.transmittance(t1 - t0);
        }

        let wo = -ray.d;
        let n = si.facing_normal(&wo);
        let le = si.le(&wo);
        if !le.is_black() && config.accepts_length(depth) {
            path.emission += beta * le;
        }
        path.vertices.push(CameraVertex {
            p: si.p,
            n,
            wo,
            bsdf: Some(si.bsdf),
            throughput: beta,
        });
        if beta.is_black() {
            break;
        }

        if is_bounce(&si.bsdf, config.bounce_roughness) {
            if !config.can_extend(depth) {
                break;
            }
            let bs = match si.bsdf.sample_f(&n, &wo, &sampler.get_2d()) {
                Some(bs) => bs,
                None => break,
            };
            beta *= bs.weight(&n);
            if beta.is_black() {
                break;
            }
            ray = si.spawn_ray(&bs.wi);
        } else {
            let gather = SurfaceGather {
                p: si.p,
                n,
                wo,
                bsdf: si.bsdf,
                throughput: beta,
                depth,
            };
            if config.direct_tracing {
                path.direct = estimate_direct(scene, config, &gather, sampler);
            }
            path.gather = Some(gather);
            break;
        }
    }
    path
}

/// Next event estimation at a gather vertex.
///
/// * `scene`   - The scene.
/// * `config`  - Integrator settings.
/// * `gather`  - The gather vertex.
/// * `sampler` - Sampler.
fn estimate_direct(scene: &dyn Scene, config: &GVPMConfig, gather: &SurfaceGather, sampler: &mut dyn Sampler) -> Spectrum {
    let u_light = sampler.get_1d();
    let u = sampler.get_2d();
    if !config.accepts_length(gather.depth + 1) {
        return Spectrum::ZERO;
    }
    let (_, es) = match scene.sample_emitter_position(&gather.p, u_light, &u) {
        Some(s) => s,
        None => return Spectrum::ZERO,
    };
    let f = gather.bsdf.f(&gather.n, &gather.wo, &es.wi);
    if f.is_black() || !scene.visible(&gather.p, &es.position) {
        return Spectrum::ZERO;
    }
    gather.throughput * f * es.wi.abs_dot(&gather.n) * es.weight * scene.transmittance(&gather.p, &es.position)
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
