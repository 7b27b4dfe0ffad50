//! Camera

use crate::base::*;
use crate::geometry::*;

/// Sensor interface used by the integrators.
pub trait Sensor: Send + Sync {
    /// Returns the image resolution in pixels.
    fn resolution(&self) -> Point2i;

    /// Returns the sensor position.
    fn position(&self) -> Point3f;

    /// Returns a primary ray through a pixel or `None` when the pixel is
    /// outside the image.
    ///
    /// * `pixel`  - Pixel coordinates.
    /// * `sample` - Sub-pixel position in [0, 1)^2.
    fn generate_ray(&self, pixel: &Point2i, sample: &Point2f) -> Option<Ray>;

    /// Returns the continuous raster position of a world point, or `None`
    /// when it is behind the sensor or outside the image.
    ///
    /// * `p` - World space point.
    fn raster_position(&self, p: &Point3f) -> Option<Point2f>;

    /// Returns the world space size of one pixel at a given distance from
    /// the sensor.
    ///
    /// * `distance` - Distance from the sensor.
    fn footprint(&self, distance: Float) -> Float;

    /// Returns true if a pixel lies inside the image.
    ///
    /// * `pixel` - Pixel coordinates.
    fn contains(&self, pixel: &Point2i) -> bool {
        let r = self.resolution();
        pixel.x >= 0 && pixel.y >= 0 && pixel.x < r.x && pixel.y < r.y
    }
}

/// A pinhole perspective camera.
#[derive(Clone, Debug)]
pub struct PinholeCamera {
    /// Position.
    position: Point3f,

    /// Camera frame: `s` right, `t` up, `n` forward.
    frame: Frame,

    /// Tangent of half the vertical field of view.
    tan_half_fov: Float,

    /// Image resolution.
    resolution: Point2i,
}

impl PinholeCamera {
    /// Returns a new `PinholeCamera`.
    ///
    /// * `position`   - Camera position.
    /// * `look_at`    - Point the camera looks at.
    /// * `up`         - Approximate up direction.
    /// * `fov`        - Vertical field of view in degrees.
    /// * `resolution` - Image resolution.
    pub fn new(position: Point3f, look_at: Point3f, up: Vector3f, fov: Float, resolution: Point2i) -> Self {
        let n = (look_at - position).normalize();
        let s = n.cross(&up).normalize();
        let t = s.cross(&n);
        Self {
            position,
            frame: Frame { s, t, n },
            tan_half_fov: (0.5 * fov).to_radians().tan(),
            resolution,
        }
    }

    fn aspect(&self) -> Float {
        self.resolution.x as Float / self.resolution.y as Float
    }
}

impl Sensor for PinholeCamera {
    fn resolution(&self) -> Point2i {
        self.resolution
    }

    fn position(&self) -> Point3f {
        self.position
    }

    fn generate_ray(&self, pixel: &Point2i, sample: &Point2f) -> Option<Ray> {
        if !self.contains(pixel) {
            return None;
        }
        let x = 2.0 * (pixel.x as Float + sample.x) / self.resolution.x as Float - 1.0;
        let y = 1.0 - 2.0 * (pixel.y as Float + sample.y) / self.resolution.y as Float;
        let local = Vector3f::new(x * self.tan_half_fov * self.aspect(), y * self.tan_half_fov, 1.0);
        Some(Ray::unbounded(self.position, self.frame.to_world(&local).normalize()))
    }

    fn raster_position(&self, p: &Point3f) -> Option<Point2f> {
        let local = self.frame.to_local(&(*p - self.position));
        if local.z <= 0.0 {
            return None;
        }
        let x = local.x / (local.z * self.tan_half_fov * self.aspect());
        let y = local.y / (local.z * self.tan_half_fov);
        let raster = Point2f::new(
            0.5 * (x + 1.0) * self.resolution.x as Float,
            0.5 * (1.0 - y) * self.resolution.y as Float,
        );
        if raster.x < 0.0
            || raster.y < 0.0
            || raster.x >= self.resolution.x as Float
            || raster.y >= self.resolution.y as Float
        {
            None
        } else {
            Some(raster)
        }
    }

    fn footprint(&self, distance: Float) -> Float {
        2.0 * distance * self.tan_half_fov / self.resolution.y as Float
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
