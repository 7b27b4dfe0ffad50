//! Errors

use thiserror::Error;

/// Errors reported by the renderer.
#[derive(Debug, Error)]
pub enum GVPMError {
    /// Invalid or inconsistent configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// A non-area emitter was found while direct paths are requested.
    #[error("only area emitters are supported with minDepth {min_depth} (needs at least 2)")]
    UnsupportedEmitter { min_depth: i32 },

    /// Photon planes need the sensor inside the medium.
    #[error("photon planes require the camera to be inside the medium")]
    CameraOutsideMedium,

    /// A volume technique was requested for a scene without a medium.
    #[error("the selected volume technique requires a participating medium")]
    MissingMedium,

    /// A worker arena still holds shifted gather points at pass end.
    #[error("worker {worker} leaked {used} shifted gather points")]
    PoolLeak { worker: usize, used: usize },

    /// I/O failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Image encoding failure.
    #[error("image error: {0}")]
    Image(String),
}
