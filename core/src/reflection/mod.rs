//! Reflection and surface scattering models

use crate::base::*;
use crate::geometry::*;
use crate::sampling::*;
use crate::spectrum::*;

mod bsdf;
mod bxdf_type;

// Re-export
pub use bsdf::*;
pub use bxdf_type::*;
