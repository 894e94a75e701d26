//! Rendering side of volscope.
//!
//! This crate provides everything between volume data and pixels:
//! - the shared [`CameraHub`] and [`ViewScope`] of a view mode
//! - [`SceneSurface`] lifecycle, off-screen mirroring and GPU/CPU switching
//! - input handling ([`Interactor`]) and routing ([`InputRouter`])
//! - the [`ChangeBroadcaster`] that keeps surfaces in sync
//! - the paging [`CompositeView`]
//! - the [`RenderBackend`] seam with wgpu ray marching and CPU ray casting

// Documentation lints - internal functions don't need exhaustive panic/error docs
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
// Accessors return values which don't need must_use
#![allow(clippy::must_use_candidate)]
// Handles are cheap to clone and passed by reference for symmetry
#![allow(clippy::module_name_repetitions)]

pub mod backend;
pub mod broadcaster;
pub mod camera;
pub mod composite;
pub mod compositor;
pub mod error;
pub mod gpu;
pub mod input;
pub mod mesh_raster;
pub mod raycast;
pub mod scope;
pub mod screenshot;
pub mod surface;
pub mod target;

pub use backend::{
    BackendFactory, DefaultBackends, RayCastBackend, RenderBackend, RenderMode, RenderParams,
};
pub use broadcaster::{ChangeBroadcaster, ChangeEvent, ChangeKind};
pub use camera::{Camera, CameraHub, ProjectionMode};
pub use composite::{CompositeState, CompositeView};
pub use compositor::Compositor;
pub use error::{RenderError, RenderResult};
pub use gpu::{gpu_available, GpuBackend, GpuContext, RaymarchUniforms};
pub use input::{
    Delivery, InputEvent, InputRouter, InteractionContext, Interactor, Response, Route,
};
pub use mesh_raster::{rasterize, MeshLayer};
pub use raycast::RayCaster;
pub use scope::{ViewScope, ViewScopeBuilder};
pub use screenshot::{encode_png, save_image, ScreenshotError};
pub use surface::{SceneSurface, WeakSurface};
pub use target::{DisplayHost, DisplayTarget, HeadlessDisplayHost, TargetId, TargetInfo};

// Re-export the input vocabulary used by InputEvent
pub use winit::event::{ElementState, MouseButton};
pub use winit::keyboard::KeyCode;
