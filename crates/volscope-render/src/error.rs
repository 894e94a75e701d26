//! GPU rendering error types.

use thiserror::Error;

/// Errors raised while setting up or drawing with the GPU backend.
#[derive(Error, Debug)]
pub enum RenderError {
    /// No graphics adapter could be found.
    #[error("failed to create graphics adapter")]
    AdapterCreationFailed,

    /// The adapter refused to create a device.
    #[error("failed to create graphics device: {0}")]
    DeviceCreationFailed(#[from] wgpu::RequestDeviceError),

    /// The volume does not fit the device's 3D texture limit.
    #[error("volume of {dims} voxels exceeds the 3D texture limit of {limit}")]
    VolumeTooLarge {
        /// Grid dimensions.
        dims: glam::UVec3,
        /// Largest extent the device accepts.
        limit: u32,
    },

    /// Mapping the readback buffer failed.
    #[error("failed to map readback buffer")]
    BufferMapFailed,

    /// Timeout waiting for the GPU.
    #[error("timeout waiting for GPU")]
    Timeout,
}

/// A specialized Result type for GPU rendering.
pub type RenderResult<T> = std::result::Result<T, RenderError>;
