//! Rendering backend seam.
//!
//! A [`SceneSurface`](crate::SceneSurface) renders through a boxed
//! [`RenderBackend`] created by the view's [`BackendFactory`]. GPU-mode
//! surfaces ray march a 3D texture through wgpu ([`GpuBackend`]); ray-cast
//! surfaces, and GPU-mode surfaces on a machine without an adapter, use the
//! CPU [`RayCaster`].

use glam::{Mat4, Vec3};
use image::RgbaImage;
use volscope_core::{GridGeometry, ScalarGrid, TransferFunctionTable};

use crate::camera::Camera;
use crate::gpu::{GpuBackend, GpuContext};
use crate::raycast::RayCaster;

/// Which kind of backend renders a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderMode {
    /// GPU-accelerated volume rendering.
    Gpu,
    /// CPU ray casting.
    RayCast,
}

impl RenderMode {
    /// Returns the mode for a GPU flag.
    pub fn from_gpu(gpu: bool) -> Self {
        if gpu {
            RenderMode::Gpu
        } else {
            RenderMode::RayCast
        }
    }
}

/// Everything a backend needs to draw one frame.
#[derive(Debug, Clone, Copy)]
pub struct RenderParams<'a> {
    /// Scalar data.
    pub grid: &'a ScalarGrid,
    /// Placement of the grid in world space.
    pub geometry: &'a GridGeometry,
    /// Label colors and opacities.
    pub transfer: &'a TransferFunctionTable,
    /// Viewpoint.
    pub camera: &'a Camera,
    /// Transform of the volume prop.
    pub model: Mat4,
    /// Gradient shading.
    pub shaded: bool,
    /// Multiplier of the sample distance (1 = full quality).
    pub sample_scale: f32,
    /// Background color.
    pub background: Vec3,
}

/// A volume renderer bound to one surface.
pub trait RenderBackend {
    /// Returns the mode this backend implements.
    fn mode(&self) -> RenderMode;

    /// Renders a frame into `target`.
    fn render(&mut self, params: &RenderParams<'_>, target: &mut RgbaImage);

    /// Marks uploaded volume data out of date after the scalar buffer changed.
    fn volume_changed(&mut self) {}

    /// Frees graphics memory held by this backend.
    fn release_graphics_resources(&mut self);

    /// Returns the bytes of graphics memory currently held.
    fn resident_bytes(&self) -> usize;
}

/// Creates backends for surfaces.
pub trait BackendFactory {
    /// Creates a backend of the given mode.
    fn create(&self, mode: RenderMode) -> Box<dyn RenderBackend>;
}

/// Factory for the built-in backends.
///
/// GPU mode renders on the shared wgpu device when an adapter is available and
/// falls back to ray casting otherwise.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultBackends;

impl BackendFactory for DefaultBackends {
    fn create(&self, mode: RenderMode) -> Box<dyn RenderBackend> {
        if mode == RenderMode::Gpu {
            if let Some(context) = GpuContext::shared() {
                return Box::new(GpuBackend::new(context));
            }
            log::debug!("no GPU adapter, GPU-mode surface ray casts");
        }
        Box::new(RayCastBackend::default())
    }
}

/// CPU ray-cast backend. Holds no graphics memory.
#[derive(Debug, Clone, Default)]
pub struct RayCastBackend {
    caster: RayCaster,
}

impl RenderBackend for RayCastBackend {
    fn mode(&self) -> RenderMode {
        RenderMode::RayCast
    }

    fn render(&mut self, params: &RenderParams<'_>, target: &mut RgbaImage) {
        self.caster.render(params, target);
    }

    fn release_graphics_resources(&mut self) {}

    fn resident_bytes(&self) -> usize {
        0
    }
}
