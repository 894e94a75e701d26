//! volscope: synchronized multi-view rendering of labeled brain volumes.
//!
//! Several volumes are shown at once, either side by side with one shared
//! camera or paged through a single composite that crossfades between them.
//! A second view mode extracts per-label isosurfaces of the combined volumes.
//!
//! # Quick Start
//!
//! ```no_run
//! use volscope::*;
//!
//! fn main() -> Result<()> {
//!     init_logging();
//!
//!     let source = PhantomSpec::default().source(3)?;
//!     let mut workspace = Workspace::new(source, Settings::default());
//!     workspace.select(0)?;
//!     workspace.select(1)?;
//!
//!     let Some(view) = workspace.view_as_mut::<JuxtapositionView>() else {
//!         return Ok(());
//!     };
//!     view.set_interchangeable(true)?;
//!     view.set_page(0.5)?;
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - [`Workspace`] owns the volume selection and one instance of every [`DataView`]
//! - [`JuxtapositionView`] renders one [`SceneSurface`] per volume and pages
//!   them through a [`CompositeView`] in interchangeable mode
//! - [`ExplicitEncodingView`] combines volumes with a [`VolumeOperator`] and
//!   draws label isosurfaces
//! - [`GpuMemoryBudget`] decides which surfaces render on the GPU

// Documentation lints - internal functions don't need exhaustive panic/error docs
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
// Accessors return values which don't need must_use
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]

pub mod budget;
pub mod layout;
pub mod phantom;
pub mod views;
pub mod workspace;

// Re-export core types
pub use volscope_core::{
    brainweb_labels, BlendMode, GridGeometry, InMemorySource, InteractorStyle, LabelSetting,
    LabelSurface, Result, ScalarGrid, Settings, SmoothingLaw, TransferFunctionTable,
    VolscopeError, VolumeIndex, VolumeOperator, VolumeSource, VoxelFormat,
};
pub use volscope_core::{Mat4, Quat, UVec2, UVec3, Vec2, Vec3, Vec4};

// Re-export render types
pub use volscope_render::{
    gpu_available, CameraHub, CompositeState, CompositeView, Delivery, DisplayHost, ElementState,
    HeadlessDisplayHost, InputEvent, KeyCode, MouseButton, RenderMode, Response, SceneSurface,
    ViewScope,
};

pub use budget::{assign_render_modes, GpuMemoryBudget};
pub use layout::{arrange, next_square, Arrangement, Rect};
pub use phantom::PhantomSpec;
pub use views::{create_view, DataView, ExplicitEncodingView, JuxtapositionView, ViewKind};
pub use workspace::Workspace;

/// Initializes `env_logger` with a default filter of `info`.
///
/// `RUST_LOG` overrides the default. Calling this more than once is harmless.
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();
}
