//! Error types for volscope.

use thiserror::Error;

use crate::volume::VolumeIndex;

/// The main error type for volscope operations.
#[derive(Error, Debug)]
pub enum VolscopeError {
    /// A grid does not have the dimensions of the template geometry.
    #[error("shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: [u32; 3],
        actual: [u32; 3],
    },

    /// Data size mismatch.
    #[error("data size mismatch: expected {expected}, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    /// A label index outside the label table.
    #[error("label {label} out of range (table has {count} labels)")]
    LabelOutOfRange { label: usize, count: usize },

    /// The data source has no volume at this index.
    #[error("volume {0} not found")]
    VolumeNotFound(VolumeIndex),

    /// The surface has no rendering resources.
    #[error("surface {0} is not active")]
    SurfaceInactive(VolumeIndex),

    /// The surface does not maintain an off-screen buffer.
    #[error("surface {0} is not rendering off-screen")]
    NotOffScreen(VolumeIndex),

    /// The surface already contributes to the composite view.
    #[error("surface {0} is already a composite member")]
    AlreadyMember(VolumeIndex),

    /// The composite view still has members.
    #[error("composite view still has {0} member(s)")]
    CompositeNotEmpty(usize),

    /// The composite view has already released its pipeline.
    #[error("composite view already finalized")]
    CompositeFinalized,

    /// A numeric or textual value that names no variant of an enumeration.
    #[error("unknown {kind} '{value}'")]
    UnknownVariant { kind: &'static str, value: String },

    /// I/O error.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl VolscopeError {
    /// Builds an [`VolscopeError::UnknownVariant`] error.
    pub fn unknown(kind: &'static str, value: impl ToString) -> Self {
        Self::UnknownVariant {
            kind,
            value: value.to_string(),
        }
    }

    /// Returns true for caller errors that leave all state untouched.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::SurfaceInactive(_)
                | Self::NotOffScreen(_)
                | Self::AlreadyMember(_)
                | Self::CompositeNotEmpty(_)
                | Self::CompositeFinalized
        )
    }
}

/// A specialized Result type for volscope operations.
pub type Result<T> = std::result::Result<T, VolscopeError>;
