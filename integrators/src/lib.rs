//! Integrators

#[macro_use]
extern crate log;

mod gvpm;

// Re-export.
pub use gvpm::*;
