//! Core data model for volscope.
//!
//! This crate holds everything that does not touch pixels:
//! - [`ScalarGrid`] volumes, their shared [`GridGeometry`] and the [`VolumeSource`] trait
//! - label tables and per-label [`TransferFunctionTable`]s
//! - page blend weights ([`SmoothingLaw`], [`BlendMode`])
//! - label volume operators and [`marching_cubes`]
//! - the [`Delegate`] subscriber list and session [`Settings`]

// Documentation lints - internal functions don't need exhaustive panic/error docs
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
// Settings legitimately have several boolean flags
#![allow(clippy::struct_excessive_bools)]
// Accessors return values which don't need must_use
#![allow(clippy::must_use_candidate)]
// Grid and label indices are small
#![allow(clippy::cast_possible_truncation)]

pub mod blend;
pub mod delegate;
pub mod error;
pub mod labels;
pub mod marching_cubes;
pub mod options;
pub mod transfer_function;
pub mod volume;
pub mod volume_ops;

pub use blend::{clamp_page, page_weights, BlendMode, SmoothingLaw};
pub use delegate::{Delegate, SubscriptionId};
pub use error::{Result, VolscopeError};
pub use labels::{brainweb_labels, rgb8, to_rgb8, LabelSetting};
pub use marching_cubes::{marching_cubes, IsoMesh};
pub use options::{InteractorStyle, Settings};
pub use transfer_function::{Interpolate, PiecewiseFunction, PiecewiseNode, TransferFunctionTable};
pub use volume::{
    GridGeometry, InMemorySource, ScalarGrid, VolumeIndex, VolumeSource, VoxelFormat,
};
pub use volume_ops::{combine_label, produce_surfaces, LabelSurface, VolumeOperator};

// Re-export glam types for convenience
pub use glam::{Mat4, Quat, UVec2, UVec3, Vec2, Vec3, Vec4};
