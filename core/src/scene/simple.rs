//! Simple Scene

use super::*;
use crate::reflection::*;
use crate::shape::*;

/// A surface in `SimpleScene`.
#[derive(Copy, Clone, Debug)]
pub struct SceneObject {
    /// Geometry.
    pub shape: Shape,

    /// Reflection model.
    pub bsdf: BSDF,

    /// Emitted radiance for area emitters.
    pub emission: Option<Spectrum>,
}

/// A small scene of quads and spheres, area and point emitters, and an
/// optional homogeneous medium. Intersection tests every object.
#[derive(Clone, Debug)]
pub struct SimpleScene {
    objects: Vec<SceneObject>,
    lights: Vec<Light>,
    light_distrib: Distribution1D,
    medium: Option<HomogeneousMedium>,
    camera: PinholeCamera,
}

impl SimpleScene {
    /// Returns an empty scene seen through a camera.
    ///
    /// * `camera` - The camera.
    pub fn new(camera: PinholeCamera) -> Self {
        Self {
            objects: vec![],
            lights: vec![],
            light_distrib: Distribution1D::new(vec![]),
            medium: None,
            camera,
        }
    }

    /// Adds a non-emitting surface and returns its index.
    ///
    /// * `shape` - Geometry.
    /// * `bsdf`  - Reflection model.
    pub fn add_object(&mut self, shape: Shape, bsdf: BSDF) -> usize {
        self.objects.push(SceneObject {
            shape,
            bsdf,
            emission: None,
        });
        self.objects.len() - 1
    }

    /// Adds an area emitter and returns its object index.
    ///
    /// * `shape`    - Geometry.
    /// * `bsdf`     - Reflection model.
    /// * `radiance` - Emitted radiance.
    pub fn add_area_light(&mut self, shape: Shape, bsdf: BSDF, radiance: Spectrum) -> usize {
        self.objects.push(SceneObject {
            shape,
            bsdf,
            emission: Some(radiance),
        });
        let object = self.objects.len() - 1;
        self.lights.push(Light::Area { object, shape, radiance });
        self.update_light_distribution();
        object
    }

    /// Adds a point emitter.
    ///
    /// * `position`  - Position.
    /// * `intensity` - Radiant intensity.
    pub fn add_point_light(&mut self, position: Point3f, intensity: Spectrum) {
        self.lights.push(Light::Point { position, intensity });
        self.update_light_distribution();
    }

    /// Sets the participating medium.
    ///
    /// * `medium` - The medium.
    pub fn set_medium(&mut self, medium: HomogeneousMedium) {
        self.medium = Some(medium);
    }

    /// Returns the scene objects.
    pub fn objects(&self) -> &[SceneObject] {
        &self.objects
    }

    fn update_light_distribution(&mut self) {
        let power: Vec<Float> = self.lights.iter().map(|l| l.power().y()).collect();
        self.light_distrib = Distribution1D::new(power);
    }
}

impl Scene for SimpleScene {
    fn intersect(&self, ray: &Ray) -> Option<SurfaceInteraction> {
        let mut closest: Option<(usize, Float, Normal3f)> = None;
        let mut r = *ray;
        for (i, object) in self.objects.iter().enumerate() {
            if let Some((t, n)) = object.shape.intersect(&r) {
                r.t_max = t;
                closest = Some((i, t, n));
            }
        }
        closest.map(|(i, t, n)| SurfaceInteraction {
            p: ray.at(t),
            n,
            t,
            object: i,
            bsdf: self.objects[i].bsdf,
            emission: self.objects[i].emission,
        })
    }

    fn intersect_p(&self, ray: &Ray) -> bool {
        self.objects.iter().any(|o| o.shape.intersect(ray).is_some())
    }

    fn lights(&self) -> &[Light] {
        &self.lights
    }

    fn light_distribution(&self) -> &Distribution1D {
        &self.light_distrib
    }

    fn medium(&self) -> Option<&dyn Medium> {
        self.medium.as_ref().map(|m| m as &dyn Medium)
    }

    fn sensor(&self) -> &dyn Sensor {
        &self.camera
    }

    fn bounds(&self) -> Bounds3f {
        let mut b = Bounds3f::from(self.camera.position());
        for o in self.objects.iter() {
            b = b.union(&o.shape.bounds());
        }
        if let Some(m) = self.medium.as_ref() {
            b = b.union(&m.bounds);
        }
        for l in self.lights.iter() {
            if let Light::Point { position, .. } = l {
                b = b.union(position);
            }
        }
        b
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn scene() -> SimpleScene {
        cornell_box(Point2i::new(8, 8), DemoScene::Cornell)
    }

    #[test]
    fn closest_hit_wins() {
        let s = scene();
        let r = Ray::unbounded(Point3f::new(0.0, 0.0, 0.0), Vector3f::new(0.0, -1.0, 0.0));
        let si = s.intersect(&r).unwrap();
        assert!((si.p.y + 1.0).abs() < 1e-5);
        assert!(si.emission.is_none());
    }

    #[test]
    fn light_is_seen_from_below() {
        let s = scene();
        let r = Ray::unbounded(Point3f::new(0.0, 0.0, 0.0), Vector3f::new(0.0, 1.0, 0.0));
        let si = s.intersect(&r).unwrap();
        assert!(!si.le(&-r.d).is_black());
    }

    #[test]
    fn walls_block_visibility() {
        let s = scene();
        assert!(s.visible(&Point3f::new(-0.5, 0.0, 0.0), &Point3f::new(0.5, 0.0, 0.0)));
        assert!(!s.visible(&Point3f::new(0.0, 0.0, 0.0), &Point3f::new(0.0, -2.0, 0.0)));
    }

    #[test]
    fn emitter_flux_accounts_for_selection() {
        let s = scene();
        let (i, er) = s
            .sample_emitter_ray(0.5, &Point2f::new(0.5, 0.5), &Point2f::new(0.5, 0.5))
            .unwrap();
        assert_eq!(i, 0);
        assert!((er.flux.y() - s.lights()[0].power().y()).abs() < 1e-3);
    }

    #[test]
    fn no_medium_means_full_transmittance() {
        let s = scene();
        assert!(s.medium().is_none());
        assert_eq!(s.transmittance(&Point3f::zero(), &Point3f::new(0.0, 0.5, 0.0)), Spectrum::ONE);
    }

    #[test]
    fn empty_scene_has_no_emitters() {
        let s = SimpleScene::new(PinholeCamera::new(
            Point3f::zero(),
            Point3f::new(0.0, 0.0, 1.0),
            Vector3f::new(0.0, 1.0, 0.0),
            45.0,
            Point2i::new(4, 4),
        ));
        assert!(s
            .sample_emitter_ray(0.3, &Point2f::new(0.5, 0.5), &Point2f::new(0.5, 0.5))
            .is_none());
    }
}
