//! Photons, beams and planes

use super::config::*;
use accelerators::*;
use gvpm_core::base::*;
use gvpm_core::geometry::*;
use gvpm_core::medium::*;
use gvpm_core::reflection::*;
use gvpm_core::shape::*;
use gvpm_core::spectrum::*;

/// Scattering behaviour of a light path vertex.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum LightVertexKind {
    /// Point on an emitter.
    Emitter,

    /// Surface scattering.
    Surface { bsdf: BSDF },

    /// Medium scattering.
    Medium { phase: PhaseFunction },
}

/// A vertex of a light path, kept so shifted light paths can be rebuilt.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct LightVertex {
    /// Position.
    pub position: Point3f,

    /// Surface normal facing `wi`. `None` in media and for point emitters.
    pub normal: Option<Normal3f>,

    /// Direction towards the previous vertex. Zero at emitters.
    pub wi: Vector3f,

    /// Scattering behaviour.
    pub kind: LightVertexKind,
}

impl LightVertex {
    /// Returns an emitter vertex.
    ///
    /// * `position` - Point on the emitter.
    /// * `normal`   - Emitter normal. `None` for point emitters.
    pub fn emitter(position: Point3f, normal: Option<Normal3f>) -> Self {
        Self {
            position,
            normal,
            wi: Vector3f::zero(),
            kind: LightVertexKind::Emitter,
        }
    }

    /// Returns a surface vertex.
    ///
    /// * `position` - Hit point.
    /// * `normal`   - Normal facing `wi`.
    /// * `wi`       - Direction towards the previous vertex.
    /// * `bsdf`     - Reflection model.
    pub fn surface(position: Point3f, normal: Normal3f, wi: Vector3f, bsdf: BSDF) -> Self {
        Self {
            position,
            normal: Some(normal),
            wi,
            kind: LightVertexKind::Surface { bsdf },
        }
    }

    /// Returns a medium vertex.
    ///
    /// * `position` - Scattering point.
    /// * `wi`       - Direction towards the previous vertex.
    /// * `phase`    - Phase function.
    pub fn medium(position: Point3f, wi: Vector3f, phase: PhaseFunction) -> Self {
        Self {
            position,
            normal: None,
            wi,
            kind: LightVertexKind::Medium { phase },
        }
    }

    /// Returns true if the vertex scatters through a delta lobe.
    pub fn is_delta(&self) -> bool {
        matches!(self.kind, LightVertexKind::Surface { bsdf } if bsdf.is_delta())
    }

    /// Returns the value of scattering towards a direction: emitted cosine
    /// for area emitters, `f |cos|` on surfaces and the phase function in
    /// media.
    ///
    /// * `dir` - Unit direction leaving the vertex.
    pub fn scatter(&self, dir: &Vector3f) -> Spectrum {
        match (self.kind, self.normal) {
            (LightVertexKind::Emitter, Some(n)) => Spectrum::new(max(0.0, dir.dot(&n))),
            (LightVertexKind::Emitter, None) => Spectrum::ONE,
            (LightVertexKind::Surface { bsdf }, Some(n)) => bsdf.f(&n, &self.wi, dir) * dir.abs_dot(&n),
            (LightVertexKind::Surface { .. }, None) => Spectrum::ZERO,
            (LightVertexKind::Medium { phase }, _) => Spectrum::new(phase.p(&self.wi, dir)),
        }
    }

    /// Returns the solid angle density of sampling a direction.
    ///
    /// * `dir` - Unit direction leaving the vertex.
    pub fn pdf(&self, dir: &Vector3f) -> Float {
        match (self.kind, self.normal) {
            (LightVertexKind::Emitter, Some(n)) => max(0.0, dir.dot(&n)) * INV_PI,
            (LightVertexKind::Emitter, None) => INV_FOUR_PI,
            (LightVertexKind::Surface { bsdf }, Some(n)) => bsdf.pdf(&n, &self.wi, dir),
            (LightVertexKind::Surface { .. }, None) => 0.0,
            (LightVertexKind::Medium { phase }, _) => phase.p(&self.wi, dir),
        }
    }
}

/// A photon stored on a surface or at a medium scattering event.
#[derive(Copy, Clone, Debug)]
pub struct Photon {
    /// Position.
    pub position: Point3f,

    /// Normal facing `wi`. `None` in media.
    pub normal: Option<Normal3f>,

    /// Direction towards the previous vertex.
    pub wi: Vector3f,

    /// Flux.
    pub flux: Spectrum,

    /// Number of light segments up to the photon.
    pub depth: Int,

    /// Previous vertex.
    pub parent: LightVertex,

    /// Vertex before the parent.
    pub grandparent: Option<LightVertex>,
}

impl BVHPrimitive for Photon {
    fn bounds(&self) -> Bounds3f {
        Bounds3f::from(self.position)
    }
}

/// A point photon seen as a sphere of fixed radius.
#[derive(Copy, Clone, Debug)]
pub struct PhotonSphere {
    /// The photon.
    pub photon: Photon,

    /// Sphere radius.
    pub radius: Float,
}

impl BVHPrimitive for PhotonSphere {
    fn bounds(&self) -> Bounds3f {
        Bounds3f::from(self.photon.position).expand(self.radius)
    }
}

/// A segment of a light path inside the medium.
#[derive(Copy, Clone, Debug)]
pub struct PhotonBeam {
    /// Start of the segment.
    pub origin: Point3f,

    /// Unit direction of propagation.
    pub direction: Vector3f,

    /// Length of the segment.
    pub length: Float,

    /// Flux at the origin.
    pub flux: Spectrum,

    /// Number of light segments up to and including the beam.
    pub depth: Int,

    /// Vertex the beam leaves from.
    pub parent: LightVertex,

    /// Kernel radius.
    pub radius: Float,
}

impl PhotonBeam {
    /// Returns the point at distance `v` along the beam.
    ///
    /// * `v` - Distance from the origin.
    #[inline]
    pub fn at(&self, v: Float) -> Point3f {
        self.origin + self.direction * v
    }
}

impl BVHPrimitive for PhotonBeam {
    fn bounds(&self) -> Bounds3f {
        Bounds3f::from(self.origin)
            .union(&self.at(self.length))
            .expand(self.radius)
    }
}

/// A beam extruded along a second direction.
#[derive(Copy, Clone, Debug)]
pub struct PhotonPlane {
    /// Start of the generating beam.
    pub origin: Point3f,

    /// Beam direction.
    pub d0: Vector3f,

    /// Extrusion direction.
    pub d1: Vector3f,

    /// Beam length.
    pub length0: Float,

    /// Extrusion length.
    pub length1: Float,

    /// Flux of the generating beam.
    pub flux: Spectrum,

    /// Number of light segments, the extrusion included.
    pub depth: Int,

    /// Vertex the generating beam leaves from.
    pub parent: LightVertex,
}

impl PhotonPlane {
    /// Intersects a ray with the plane. Returns the ray parameter and the
    /// distances along `d0` and `d1` of the hit.
    ///
    /// * `ray` - The ray.
    pub fn intersect(&self, ray: &Ray) -> Option<(Float, Float, Float)> {
        let e0 = self.d0 * self.length0;
        let e1 = self.d1 * self.length1;
        intersect_parallelogram(ray, &self.origin, &e0, &e1).map(|(t, a, b)| (t, a * self.length0, b * self.length1))
    }
}

impl BVHPrimitive for PhotonPlane {
    fn bounds(&self) -> Bounds3f {
        let e0 = self.d0 * self.length0;
        let e1 = self.d1 * self.length1;
        Bounds3f::from(self.origin)
            .union(&(self.origin + e0))
            .union(&(self.origin + e1))
            .union(&(self.origin + e0 + e1))
    }
}

/// Surface photons of one pass.
pub type SurfacePhotonMap = BVHAccel<Photon>;

/// Volume photons, beams or planes of one pass.
pub enum VolumePhotonMap {
    /// Nothing was recorded.
    Empty,

    /// Point photons queried with spheres.
    Points(BVHAccel<Photon>),

    /// Point photons seen as spheres, queried with rays.
    Spheres(BVHAccel<PhotonSphere>),

    /// Beams.
    Beams(BVHAccel<PhotonBeam>),

    /// Planes.
    Planes(BVHAccel<PhotonPlane>),
}

impl VolumePhotonMap {
    /// Builds the map used by a volume technique.
    ///
    /// * `technique` - Volume technique.
    /// * `photons`   - Medium photons.
    /// * `beams`     - Beams.
    /// * `planes`    - Planes.
    /// * `radius`    - Global volume kernel radius.
    pub fn build(
        technique: VolTechnique,
        photons: Vec<Photon>,
        beams: Vec<PhotonBeam>,
        planes: Vec<PhotonPlane>,
        radius: Float,
    ) -> Self {
        let split = SplitMethod::SAH;
        match technique {
            VolTechnique::None => Self::Empty,
            VolTechnique::Distance => Self::Points(BVHAccel::new(photons, 4, split)),
            VolTechnique::Bre | VolTechnique::Bre3D => {
                let spheres = photons.into_iter().map(|photon| PhotonSphere { photon, radius }).collect();
                Self::Spheres(BVHAccel::new(spheres, 4, split))
            }
            VolTechnique::Beam1D | VolTechnique::Beam3D | VolTechnique::Beam3DAcc => {
                let beams = beams.into_iter().map(|b| PhotonBeam { radius, ..b }).collect();
                Self::Beams(BVHAccel::new(beams, 4, split))
            }
            VolTechnique::Plane0D => Self::Planes(BVHAccel::new(planes, 4, split)),
        }
    }

    /// Returns the number of stored primitives.
    pub fn len(&self) -> usize {
        match self {
            Self::Empty => 0,
            Self::Points(m) => m.len(),
            Self::Spheres(m) => m.len(),
            Self::Beams(m) => m.len(),
            Self::Planes(m) => m.len(),
        }
    }

    /// Returns true if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn beam() -> PhotonBeam {
        PhotonBeam {
            origin: Point3f::zero(),
            direction: Vector3f::new(1.0, 0.0, 0.0),
            length: 2.0,
            flux: Spectrum::ONE,
            depth: 1,
            parent: LightVertex::emitter(Point3f::new(-1.0, 0.0, 0.0), None),
            radius: 0.0,
        }
    }

    #[test]
    fn area_emitter_scatters_in_front_only() {
        let v = LightVertex::emitter(Point3f::zero(), Some(Vector3f::new(0.0, 0.0, 1.0)));
        assert_eq!(v.scatter(&Vector3f::new(0.0, 0.0, 1.0)), Spectrum::ONE);
        assert!(v.scatter(&Vector3f::new(0.0, 0.0, -1.0)).is_black());
        assert!((v.pdf(&Vector3f::new(0.0, 0.0, 1.0)) - INV_PI).abs() < 1e-6);
    }

    #[test]
    fn mirror_vertex_is_delta() {
        let n = Vector3f::new(0.0, 1.0, 0.0);
        let mirror = LightVertex::surface(
            Point3f::zero(),
            n,
            n,
            BSDF::Mirror {
                reflectance: Spectrum::ONE,
            },
        );
        let diffuse = LightVertex::surface(
            Point3f::zero(),
            n,
            n,
            BSDF::Lambertian {
                reflectance: Spectrum::ONE,
            },
        );
        assert!(mirror.is_delta());
        assert!(!diffuse.is_delta());
        assert!((diffuse.scatter(&n).y() - INV_PI).abs() < 1e-6);
        assert!(!LightVertex::medium(Point3f::zero(), n, PhaseFunction::Isotropic).is_delta());
    }

    #[test]
    fn beam_bounds_include_radius() {
        let b = PhotonBeam { radius: 0.5, ..beam() };
        let bounds = b.bounds();
        assert_eq!(bounds.p_min, Point3f::new(-0.5, -0.5, -0.5));
        assert_eq!(bounds.p_max, Point3f::new(2.5, 0.5, 0.5));
    }

    #[test]
    fn plane_hit_reports_distances() {
        let plane = PhotonPlane {
            origin: Point3f::zero(),
            d0: Vector3f::new(1.0, 0.0, 0.0),
            d1: Vector3f::new(0.0, 1.0, 0.0),
            length0: 2.0,
            length1: 4.0,
            flux: Spectrum::ONE,
            depth: 2,
            parent: beam().parent,
        };
        let ray = Ray::unbounded(Point3f::new(1.0, 1.0, -3.0), Vector3f::new(0.0, 0.0, 1.0));
        let (t, a, b) = plane.intersect(&ray).unwrap();
        assert!((t - 3.0).abs() < 1e-5);
        assert!((a - 1.0).abs() < 1e-5);
        assert!((b - 1.0).abs() < 1e-5);

        let miss = Ray::unbounded(Point3f::new(3.0, 1.0, -3.0), Vector3f::new(0.0, 0.0, 1.0));
        assert!(plane.intersect(&miss).is_none());
    }

    #[test]
    fn volume_map_follows_technique() {
        let photons = vec![Photon {
            position: Point3f::zero(),
            normal: None,
            wi: Vector3f::new(0.0, 1.0, 0.0),
            flux: Spectrum::ONE,
            depth: 1,
            parent: beam().parent,
            grandparent: None,
        }];
        let map = VolumePhotonMap::build(VolTechnique::Bre3D, photons.clone(), vec![], vec![], 0.1);
        assert!(matches!(map, VolumePhotonMap::Spheres(_)));
        assert_eq!(map.len(), 1);
        let map = VolumePhotonMap::build(VolTechnique::Beam1D, photons.clone(), vec![beam()], vec![], 0.1);
        match map {
            VolumePhotonMap::Beams(m) => assert_eq!(m.primitives()[0].radius, 0.1),
            _ => panic!("expected beams"),
        }
        assert!(VolumePhotonMap::build(VolTechnique::None, photons, vec![], vec![], 0.1).is_empty());
    }
}
