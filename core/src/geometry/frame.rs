//! Orthonormal Frames

use super::{abs, Dot, Vector3f};

/// Create a new coordinate system from a single unit vector and return
/// the two remaining vectors.
///
/// * `v1` - The first unit vector to form part of the coordinate system.
pub fn coordinate_system(v1: &Vector3f) -> (Vector3f, Vector3f) {
    let v2 = if abs(v1.x) > abs(v1.y) {
        Vector3f::new(-v1.z, 0.0, v1.x) / (v1.x * v1.x + v1.z * v1.z).sqrt()
    } else {
        Vector3f::new(0.0, v1.z, -v1.y) / (v1.y * v1.y + v1.z * v1.z).sqrt()
    };
    let v3 = v1.cross(&v2);
    (v2, v3)
}

/// A local shading frame with `n` as the z-axis.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Frame {
    /// First tangent.
    pub s: Vector3f,

    /// Second tangent.
    pub t: Vector3f,

    /// Normal.
    pub n: Vector3f,
}

impl Frame {
    /// Builds a frame around a unit normal.
    ///
    /// * `n` - The normal.
    pub fn new(n: &Vector3f) -> Self {
        let (s, t) = coordinate_system(n);
        Self { s, t, n: *n }
    }

    /// Converts a world direction to local coordinates.
    ///
    /// * `v` - World space direction.
    pub fn to_local(&self, v: &Vector3f) -> Vector3f {
        Vector3f::new(v.dot(&self.s), v.dot(&self.t), v.dot(&self.n))
    }

    /// Converts a local direction to world coordinates.
    ///
    /// * `v` - Local direction.
    pub fn to_world(&self, v: &Vector3f) -> Vector3f {
        self.s * v.x + self.t * v.y + self.n * v.z
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn from_unit_x_axis() {
        let (v2, v3) = coordinate_system(&Vector3f::new(1.0, 0.0, 0.0));
        assert!(v2 == Vector3f::new(0.0, 0.0, 1.0));
        assert!(v3 == Vector3f::new(0.0, -1.0, 0.0));
    }

    prop_unit_vector3!(unit_vector);

    proptest! {
        #[test]
        fn frame_is_orthonormal(n in unit_vector()) {
            let f = Frame::new(&n);
            prop_assert!(f.s.dot(&f.t).abs() < 1e-4);
            prop_assert!(f.s.dot(&f.n).abs() < 1e-4);
            prop_assert!((f.s.length() - 1.0).abs() < 1e-4);
        }

        #[test]
        fn local_world_round_trip(n in unit_vector(), v in unit_vector()) {
            let f = Frame::new(&n);
            let back = f.to_world(&f.to_local(&v));
            prop_assert!((back - v).length() < 1e-4);
        }
    }
}
