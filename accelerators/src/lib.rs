//! Spatial acceleration structures used to look up photons, beams and
//! planes.

#[macro_use]
extern crate log;

mod bvh;

// Re-export
pub use bvh::*;
