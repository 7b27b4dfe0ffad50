//! Geometry
use crate::base::*;

// Define macros for property based testing.
#[cfg(test)]
#[macro_export]
macro_rules! prop_range {
    ($name: ident, $t: ty, $r: expr) => {
        prop_compose! {
            fn $name()(f in $r) -> $t {
                f
            }
        }
    };
}

#[cfg(test)]
#[macro_export]
macro_rules! prop_vector3 {
    ($name: ident, $t: ty, $xr: expr, $yr: expr, $zr: expr) => {
        prop_compose! {
            fn $name()(x in $xr, y in $yr, z in $zr) -> Vector3<$t> {
                Vector3 { x, y, z }
            }
        }
    };
}

#[cfg(test)]
#[macro_export]
macro_rules! prop_unit_vector3 {
    ($name: ident) => {
        prop_compose! {
            fn $name()(v in (-1.0..1.0f32, -1.0..1.0f32, -1.0..1.0f32)
                .prop_filter("non-degenerate", |(x, y, z)| x * x + y * y + z * z > 1e-4)) -> Vector3f {
                Vector3f::new(v.0, v.1, v.2).normalize()
            }
        }
    };
}

mod bounds3;
mod common;
mod frame;
mod point2;
mod ray;
mod vector3;

// Re-export
pub use bounds3::*;
pub use common::*;
pub use frame::*;
pub use point2::*;
pub use ray::*;
pub use vector3::*;
