//! One volume rendered into its own display target.
//!
//! A [`SceneSurface`] is a cheap handle; clones share the same surface. All
//! rendering resources exist only while the surface is active. While active,
//! the surface listens to its view's [`ChangeBroadcaster`] and redraws for
//! every change that did not originate from itself.
//!
//! [`ChangeBroadcaster`]: crate::ChangeBroadcaster

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use glam::{Mat4, Quat, UVec2};
use image::RgbaImage;
use volscope_core::{Result, ScalarGrid, SubscriptionId, VolscopeError, VolumeIndex};

use crate::backend::{RenderBackend, RenderMode, RenderParams};
use crate::broadcaster::{ChangeEvent, ChangeKind};
use crate::input::{InputEvent, InteractionContext, Interactor, Response};
use crate::scope::ViewScope;
use crate::target::DisplayTarget;

/// Handle to a rendered volume.
#[derive(Clone)]
pub struct SceneSurface {
    index: VolumeIndex,
    scope: Rc<ViewScope>,
    inner: Rc<RefCell<SurfaceState>>,
}

/// Non-owning handle to a [`SceneSurface`].
#[derive(Clone)]
pub struct WeakSurface {
    index: VolumeIndex,
    scope: Rc<ViewScope>,
    inner: Weak<RefCell<SurfaceState>>,
}

impl WeakSurface {
    /// Returns the surface if it still exists.
    pub fn upgrade(&self) -> Option<SceneSurface> {
        self.inner.upgrade().map(|inner| SceneSurface {
            index: self.index,
            scope: Rc::clone(&self.scope),
            inner,
        })
    }
}

struct SurfaceState {
    scope: Rc<ViewScope>,
    grid: ScalarGrid,
    gpu_mode: bool,
    shaded: bool,
    progressive: bool,
    off_screen: bool,
    size: UVec2,
    fixed_size: Option<UVec2>,
    prop_rotation: Quat,
    interactor: Interactor,
    resources: Option<Resources>,
    frames: u64,
}

/// Everything allocated while a surface is active.
struct Resources {
    target: DisplayTarget,
    backend: Box<dyn RenderBackend>,
    subscription: SubscriptionId,
    capture: Option<RgbaImage>,
    rendered_revision: Option<u64>,
}

impl SurfaceState {
    fn render_size(&self) -> UVec2 {
        self.fixed_size.unwrap_or(self.size)
    }

    fn release(&mut self) -> bool {
        let Some(mut resources) = self.resources.take() else {
            return false;
        };
        self.scope
            .broadcaster()
            .unsubscribe_surface(resources.subscription);
        resources.backend.release_graphics_resources();
        resources.target.release(self.scope.host());
        self.interactor = Interactor::new();
        true
    }
}

impl Drop for SurfaceState {
    fn drop(&mut self) {
        if self.release() {
            log::debug!("released resources of a dropped active surface");
        }
    }
}

impl fmt::Debug for SceneSurface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SceneSurface")
            .field("index", &self.index)
            .field(
                "active",
                &self.inner.try_borrow().map(|s| s.resources.is_some()).ok(),
            )
            .finish()
    }
}

impl SceneSurface {
    /// Creates an inactive surface showing `grid` as volume `index`.
    ///
    /// The grid must match the scope's template geometry.
    pub fn new(index: VolumeIndex, grid: ScalarGrid, scope: Rc<ViewScope>) -> Result<Self> {
        grid.ensure_dims(scope.geometry().dims)?;
        let state = SurfaceState {
            scope: Rc::clone(&scope),
            grid,
            gpu_mode: true,
            shaded: false,
            progressive: true,
            off_screen: false,
            size: scope.viewport(),
            fixed_size: None,
            prop_rotation: Quat::IDENTITY,
            interactor: Interactor::new(),
            resources: None,
            frames: 0,
        };
        Ok(Self {
            index,
            scope,
            inner: Rc::new(RefCell::new(state)),
        })
    }

    /// Returns the volume index.
    pub fn index(&self) -> VolumeIndex {
        self.index
    }

    /// Returns the view scope.
    pub fn scope(&self) -> &Rc<ViewScope> {
        &self.scope
    }

    /// Returns true if both handles refer to the same surface.
    pub fn ptr_eq(&self, other: &SceneSurface) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Returns a non-owning handle.
    pub fn downgrade(&self) -> WeakSurface {
        WeakSurface {
            index: self.index,
            scope: Rc::clone(&self.scope),
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// Returns true while rendering resources are allocated.
    pub fn is_active(&self) -> bool {
        self.inner.borrow().resources.is_some()
    }

    /// Returns true if the surface prefers GPU rendering.
    pub fn is_gpu_mode(&self) -> bool {
        self.inner.borrow().gpu_mode
    }

    /// Returns the mode of the live backend, if active.
    pub fn render_mode(&self) -> Option<RenderMode> {
        self.inner
            .borrow()
            .resources
            .as_ref()
            .map(|r| r.backend.mode())
    }

    /// Returns true if gradient shading is enabled.
    pub fn is_shaded(&self) -> bool {
        self.inner.borrow().shaded
    }

    /// Returns true if interactive renders use coarser sampling.
    pub fn is_progressive(&self) -> bool {
        self.inner.borrow().progressive
    }

    /// Returns true if an off-screen mirror is requested.
    pub fn is_off_screen(&self) -> bool {
        self.inner.borrow().off_screen
    }

    /// Returns the byte size of the scalar buffer.
    pub fn memory_footprint(&self) -> usize {
        self.inner.borrow().grid.memory_footprint()
    }

    /// Returns the graphics memory held by the backend.
    pub fn resident_gpu_bytes(&self) -> usize {
        self.inner
            .borrow()
            .resources
            .as_ref()
            .map_or(0, |r| r.backend.resident_bytes())
    }

    /// Returns the size frames are rendered at.
    pub fn size(&self) -> UVec2 {
        self.inner.borrow().render_size()
    }

    /// Returns the number of frames rendered so far.
    pub fn frames_rendered(&self) -> u64 {
        self.inner.borrow().frames
    }

    /// Returns the rotation of the volume prop.
    pub fn prop_rotation(&self) -> Quat {
        self.inner.borrow().prop_rotation
    }

    /// Returns true if the last frame predates a transfer function edit.
    pub fn is_dirty(&self) -> bool {
        let revision = self.scope.transfer_revision();
        self.inner
            .borrow()
            .resources
            .as_ref()
            .is_some_and(|r| r.rendered_revision != Some(revision))
    }

    /// Activates or deactivates the surface. Repeated calls are no-ops.
    ///
    /// Activation acquires a display target, applies the default camera the
    /// first time any surface of the view activates, creates the backend and
    /// subscribes to the broadcaster. Deactivation releases all of it.
    pub fn set_active(&self, active: bool) {
        if active == self.is_active() {
            return;
        }
        if active {
            self.activate();
        } else if self.inner.borrow_mut().release() {
            log::debug!("surface {} deactivated", self.index);
        }
    }

    fn activate(&self) {
        {
            let mut state = self.inner.borrow_mut();
            let scope = &self.scope;
            scope.camera().ensure_default(scope.geometry().bounds());

            let size = state.render_size();
            let target = DisplayTarget::acquire(scope.host(), size);
            scope.host().set_visible(target.id(), !state.off_screen);
            let mode = RenderMode::from_gpu(state.gpu_mode);
            let backend = scope.backends().create(mode);

            let weak = self.downgrade();
            let subscription = scope.broadcaster().subscribe_surface(move |event| {
                if let Some(surface) = weak.upgrade() {
                    surface.on_broadcast(event);
                }
            });
            let capture = state
                .off_screen
                .then(|| RgbaImage::new(target.size().x, target.size().y));

            state.resources = Some(Resources {
                target,
                backend,
                subscription,
                capture,
                rendered_revision: None,
            });
            log::debug!("surface {} activated ({mode:?})", self.index);
        }
        self.render_local(false);
    }

    /// Switches between GPU and CPU ray-cast rendering.
    ///
    /// An active surface releases its current backend's graphics memory
    /// before the new backend is created.
    pub fn set_gpu_mode(&self, gpu: bool) {
        {
            let mut state = self.inner.borrow_mut();
            if state.gpu_mode == gpu {
                return;
            }
            state.gpu_mode = gpu;
            let Some(resources) = state.resources.as_mut() else {
                return;
            };
            resources.backend.release_graphics_resources();
            resources.backend = self.scope.backends().create(RenderMode::from_gpu(gpu));
            log::debug!(
                "surface {} switched to {:?}",
                self.index,
                RenderMode::from_gpu(gpu)
            );
        }
        self.render_local(false);
    }

    /// Enables or disables gradient shading.
    pub fn set_shaded(&self, shaded: bool) {
        let changed = {
            let mut state = self.inner.borrow_mut();
            let changed = state.shaded != shaded;
            state.shaded = shaded;
            changed
        };
        if changed {
            self.render();
        }
    }

    /// Enables or disables coarse sampling during interaction.
    pub fn set_progressive(&self, progressive: bool) {
        self.inner.borrow_mut().progressive = progressive;
    }

    /// Enables or disables the off-screen mirror.
    ///
    /// Enabling hides the display target and freezes its size; disabling
    /// shows it again at the interactive size.
    pub fn set_off_screen(&self, off_screen: bool) {
        {
            let mut guard = self.inner.borrow_mut();
            let state = &mut *guard;
            if state.off_screen == off_screen {
                return;
            }
            state.off_screen = off_screen;
            state.fixed_size = off_screen.then_some(state.size);
            let Some(resources) = state.resources.as_mut() else {
                return;
            };
            let host = self.scope.host();
            host.set_visible(resources.target.id(), !off_screen);
            if off_screen {
                resources.capture = Some(resources.target.framebuffer().clone());
            } else {
                resources.capture = None;
                resources.target.resize(host, state.size);
            }
        }
        self.render_local(false);
    }

    /// Resizes the interactive display. Ignored while the size is fixed.
    pub fn resize(&self, size: UVec2) -> bool {
        {
            let mut guard = self.inner.borrow_mut();
            let state = &mut *guard;
            if state.fixed_size.is_some() {
                log::trace!("surface {} has a fixed size", self.index);
                return false;
            }
            state.size = size;
            let Some(resources) = state.resources.as_mut() else {
                return true;
            };
            if !resources.target.resize(self.scope.host(), size) {
                return true;
            }
        }
        self.render_local(false);
        true
    }

    /// Fixes the render size, e.g. to match a composite display.
    pub fn set_fixed_size(&self, size: UVec2) {
        {
            let mut guard = self.inner.borrow_mut();
            let state = &mut *guard;
            state.fixed_size = Some(size);
            let Some(resources) = state.resources.as_mut() else {
                return;
            };
            if !resources.target.resize(self.scope.host(), size) {
                return;
            }
            if let Some(capture) = resources.capture.as_mut() {
                let size = resources.target.size();
                *capture = RgbaImage::new(size.x, size.y);
            }
        }
        self.render_local(false);
    }

    /// Drops a size fixed by [`set_fixed_size`](Self::set_fixed_size).
    ///
    /// An off-screen surface goes back to the size frozen when its mirror was
    /// enabled; an on-screen surface follows its display again.
    pub fn clear_fixed_size(&self) {
        {
            let mut guard = self.inner.borrow_mut();
            let state = &mut *guard;
            let restored = state.off_screen.then_some(state.size);
            if state.fixed_size == restored {
                return;
            }
            state.fixed_size = restored;
            let size = state.render_size();
            let Some(resources) = state.resources.as_mut() else {
                return;
            };
            if !resources.target.resize(self.scope.host(), size) {
                return;
            }
            if let Some(capture) = resources.capture.as_mut() {
                let size = resources.target.size();
                *capture = RgbaImage::new(size.x, size.y);
            }
        }
        self.render_local(false);
    }

    /// Ends the drag in progress on this surface and returns its state.
    pub fn take_gesture(&self) -> Interactor {
        std::mem::take(&mut self.inner.borrow_mut().interactor)
    }

    /// Continues a drag taken from another surface.
    pub fn resume_gesture(&self, gesture: Interactor) {
        self.inner.borrow_mut().interactor = gesture;
    }

    /// Replaces the scalar buffer. Fails without mutation on a shape mismatch.
    pub fn set_volume(&self, grid: ScalarGrid) -> Result<()> {
        grid.ensure_dims(self.scope.geometry().dims)?;
        {
            let mut state = self.inner.borrow_mut();
            state.grid = grid;
            if let Some(resources) = state.resources.as_mut() {
                resources.backend.volume_changed();
            }
        }
        if self.render_local(false) {
            self.post(ChangeKind::ContentChanged);
        }
        Ok(())
    }

    /// Renders and tells every other surface to redraw.
    pub fn render(&self) {
        if self.render_local(false) {
            self.post(ChangeKind::Render);
        }
    }

    /// Applies an input event received on this surface's display.
    pub fn handle_input(&self, event: &InputEvent) -> Response {
        let response = {
            let Ok(mut guard) = self.inner.try_borrow_mut() else {
                log::warn!("surface {} busy, dropping {event:?}", self.index);
                return Response::Ignored;
            };
            let state = &mut *guard;
            if state.resources.is_none() {
                log::trace!("inactive surface {} ignores input", self.index);
                return Response::Ignored;
            }
            let mut ctx = InteractionContext {
                camera: self.scope.camera(),
                viewport: state.render_size(),
                prop: &mut state.prop_rotation,
                style: self.scope.interactor_style(),
            };
            state.interactor.handle(event, &mut ctx)
        };

        match response {
            Response::Ignored => {}
            Response::CameraMoved | Response::PropMoved => {
                self.render_local(event.is_interactive());
                self.post(match event {
                    InputEvent::PointerMove { .. } => ChangeKind::PointerMove,
                    InputEvent::Wheel { .. } => ChangeKind::Wheel,
                    InputEvent::Timer => ChangeKind::Timer,
                    _ => ChangeKind::Render,
                });
            }
            Response::Released => {
                self.scope.broadcaster().flush();
                self.render();
            }
            Response::StyleChanged(style) => self.scope.set_interactor_style(style),
            Response::Refit => {
                self.scope.camera().fit(self.scope.geometry().bounds());
                self.render();
            }
            Response::Resized(size) => {
                self.resize(size);
            }
        }
        response
    }

    /// Runs `f` on the off-screen buffer.
    ///
    /// Fails if the surface is inactive or not rendering off-screen.
    pub fn with_off_screen_output<R>(&self, f: impl FnOnce(&RgbaImage) -> R) -> Result<R> {
        let state = self.inner.borrow();
        let resources = state
            .resources
            .as_ref()
            .ok_or(VolscopeError::SurfaceInactive(self.index))?;
        let capture = resources
            .capture
            .as_ref()
            .ok_or(VolscopeError::NotOffScreen(self.index))?;
        Ok(f(capture))
    }

    /// Returns a copy of the off-screen buffer.
    pub fn off_screen_output(&self) -> Result<RgbaImage> {
        self.with_off_screen_output(Clone::clone)
    }

    /// Returns a copy of the last frame of the display target.
    pub fn display_image(&self) -> Result<RgbaImage> {
        self.inner
            .borrow()
            .resources
            .as_ref()
            .map(|r| r.target.framebuffer().clone())
            .ok_or(VolscopeError::SurfaceInactive(self.index))
    }

    fn post(&self, kind: ChangeKind) {
        self.scope
            .broadcaster()
            .post(ChangeEvent::from_surface(self.index, kind));
    }

    fn on_broadcast(&self, event: &ChangeEvent) {
        // A surface never redraws for its own changes.
        if event.origin == Some(self.index) {
            return;
        }
        self.render_local(event.kind.is_interactive());
    }

    /// Draws one frame without notifying anyone. Returns false if inactive.
    fn render_local(&self, interactive: bool) -> bool {
        let Ok(mut guard) = self.inner.try_borrow_mut() else {
            log::trace!("surface {} busy, skipping render", self.index);
            return false;
        };
        let state = &mut *guard;
        let Some(resources) = state.resources.as_mut() else {
            return false;
        };

        let scope = &self.scope;
        let camera = scope.camera().camera();
        let transfer = scope.transfer();
        let center = scope.geometry().center();
        let model = Mat4::from_translation(center)
            * Mat4::from_quat(state.prop_rotation)
            * Mat4::from_translation(-center);
        let params = RenderParams {
            grid: &state.grid,
            geometry: scope.geometry(),
            transfer: &transfer,
            camera: &camera,
            model,
            shaded: state.shaded,
            sample_scale: if interactive && state.progressive {
                2.0
            } else {
                1.0
            },
            background: scope.background(),
        };
        resources
            .backend
            .render(&params, resources.target.framebuffer_mut());

        if let Some(capture) = resources.capture.as_mut() {
            capture.clone_from(resources.target.framebuffer());
        }
        if !state.off_screen {
            resources.target.present(scope.host());
        }
        resources.rendered_revision = Some(transfer.revision());
        state.frames += 1;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::gpu_available;
    use crate::target::HeadlessDisplayHost;
    use glam::{UVec3, Vec2, Vec3};
    use volscope_core::{brainweb_labels, GridGeometry, Settings, TransferFunctionTable};
    use winit::event::{ElementState, MouseButton};

    struct Fixture {
        host: Rc<HeadlessDisplayHost>,
        scope: Rc<ViewScope>,
    }

    fn fixture() -> Fixture {
        let host = Rc::new(HeadlessDisplayHost::new());
        let mut transfer = TransferFunctionTable::from_labels(&brainweb_labels(), 0.6);
        transfer.set_label_opacity(0, 0.0).unwrap();
        let settings = Settings {
            viewport: UVec2::new(12, 12),
            pointer_debounce_ms: 0,
            ..Settings::default()
        };
        let scope = ViewScope::builder(GridGeometry::with_dims(UVec3::splat(6)), transfer)
            .host(host.clone())
            .settings(&settings)
            .build();
        Fixture { host, scope }
    }

    fn cube(label: f32) -> ScalarGrid {
        let mut grid = ScalarGrid::filled(UVec3::splat(6), 0.0);
        for z in 1..5 {
            for y in 1..5 {
                for x in 1..5 {
                    grid.set(x, y, z, label);
                }
            }
        }
        grid
    }

    fn surface(f: &Fixture, index: VolumeIndex, label: f32) -> SceneSurface {
        SceneSurface::new(index, cube(label), Rc::clone(&f.scope)).unwrap()
    }

    #[test]
    fn test_new_rejects_wrong_shape() {
        let f = fixture();
        let grid = ScalarGrid::filled(UVec3::new(6, 6, 5), 0.0);
        assert!(matches!(
            SceneSurface::new(0, grid, Rc::clone(&f.scope)),
            Err(VolscopeError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_activation_is_idempotent() {
        let f = fixture();
        let s = surface(&f, 0, 3.0);
        assert!(!f.scope.camera().is_initialized());

        s.set_active(true);
        s.set_active(true);
        assert!(s.is_active());
        assert!(f.scope.camera().is_initialized());
        assert_eq!(f.host.acquired(), 1);
        assert_eq!(f.scope.broadcaster().surface_count(), 1);
        assert_eq!(s.frames_rendered(), 1);
        assert!(s.is_gpu_mode());
        if gpu_available() {
            assert_eq!(s.render_mode(), Some(RenderMode::Gpu));
            assert_eq!(s.resident_gpu_bytes(), s.memory_footprint());
        } else {
            assert_eq!(s.render_mode(), Some(RenderMode::RayCast));
        }

        s.set_active(false);
        s.set_active(false);
        assert!(!s.is_active());
        assert_eq!(f.host.live_targets(), 0);
        assert_eq!(f.host.released(), 1);
        assert_eq!(f.scope.broadcaster().surface_count(), 0);
        assert_eq!(s.resident_gpu_bytes(), 0);
    }

    #[test]
    fn test_reactivation_reproduces_output() {
        let f = fixture();
        let s = surface(&f, 0, 3.0);
        let footprint = s.memory_footprint();
        s.set_active(true);
        let first = s.display_image().unwrap();

        s.set_active(false);
        assert!(matches!(
            s.display_image(),
            Err(VolscopeError::SurfaceInactive(0))
        ));
        s.set_active(true);
        assert_eq!(s.display_image().unwrap(), first);
        assert_eq!(s.memory_footprint(), footprint);
        assert_eq!(f.scope.camera().reset_count(), 1);
    }

    #[test]
    fn test_off_screen_output_preconditions() {
        let f = fixture();
        let s = surface(&f, 4, 3.0);
        assert!(matches!(
            s.off_screen_output(),
            Err(VolscopeError::SurfaceInactive(4))
        ));
        s.set_active(true);
        assert!(matches!(
            s.off_screen_output(),
            Err(VolscopeError::NotOffScreen(4))
        ));
        s.set_off_screen(true);
        let output = s.off_screen_output().unwrap();
        assert_eq!(output, s.display_image().unwrap());
        assert!(!f.host.info(0).unwrap().visible);

        s.set_off_screen(false);
        assert!(s.off_screen_output().is_err());
        assert!(f.host.info(0).unwrap().visible);
    }

    #[test]
    fn test_off_screen_before_activation() {
        let f = fixture();
        let s = surface(&f, 0, 3.0);
        s.set_off_screen(true);
        s.set_active(true);
        assert_eq!(s.off_screen_output().unwrap(), s.display_image().unwrap());
    }

    #[test]
    fn test_fixed_size_ignores_resize() {
        let f = fixture();
        let s = surface(&f, 0, 3.0);
        s.set_active(true);
        assert!(s.resize(UVec2::new(20, 10)));
        assert_eq!(s.size(), UVec2::new(20, 10));

        s.set_off_screen(true);
        assert!(!s.resize(UVec2::new(5, 5)));
        assert_eq!(s.size(), UVec2::new(20, 10));

        s.set_fixed_size(UVec2::new(8, 8));
        assert_eq!(s.off_screen_output().unwrap().dimensions(), (8, 8));

        s.set_off_screen(false);
        assert_eq!(s.display_image().unwrap().dimensions(), (20, 10));
    }

    #[test]
    fn test_gpu_mode_switch_releases_memory() {
        if !gpu_available() {
            eprintln!("Skipping GPU memory test: no GPU adapter available");
            return;
        }
        let f = fixture();
        let s = surface(&f, 0, 3.0);
        s.set_active(true);
        assert!(s.resident_gpu_bytes() > 0);
        s.set_gpu_mode(false);
        assert_eq!(s.resident_gpu_bytes(), 0);
        assert_eq!(s.render_mode(), Some(RenderMode::RayCast));
        s.set_gpu_mode(true);
        assert_eq!(s.resident_gpu_bytes(), s.memory_footprint());
    }

    #[test]
    fn test_set_volume_shape_mismatch() {
        let f = fixture();
        let s = surface(&f, 0, 3.0);
        s.set_active(true);
        let before = s.display_image().unwrap();
        let frames = s.frames_rendered();
        assert!(s.set_volume(ScalarGrid::filled(UVec3::splat(5), 1.0)).is_err());
        assert_eq!(s.frames_rendered(), frames);
        assert_eq!(s.display_image().unwrap(), before);

        s.set_volume(cube(5.0)).unwrap();
        assert_ne!(s.display_image().unwrap(), before);
    }

    #[test]
    fn test_broadcast_skips_origin() {
        let f = fixture();
        let a = surface(&f, 0, 3.0);
        let b = surface(&f, 1, 5.0);
        let dormant = surface(&f, 2, 5.0);
        a.set_active(true);
        b.set_active(true);
        let (fa, fb) = (a.frames_rendered(), b.frames_rendered());

        a.render();
        assert_eq!(a.frames_rendered(), fa + 1);
        assert_eq!(b.frames_rendered(), fb + 1);
        assert_eq!(dormant.frames_rendered(), 0);
    }

    #[test]
    fn test_label_edit_redraws_everyone() {
        let f = fixture();
        let a = surface(&f, 0, 3.0);
        let b = surface(&f, 1, 3.0);
        a.set_active(true);
        b.set_active(true);
        let before = b.display_image().unwrap();

        f.scope.set_label_color(3, Vec3::new(1.0, 0.0, 0.0)).unwrap();
        assert!(!a.is_dirty());
        assert!(!b.is_dirty());
        assert_ne!(b.display_image().unwrap(), before);
        assert_eq!(a.display_image().unwrap(), b.display_image().unwrap());
    }

    #[test]
    fn test_drag_moves_shared_camera() {
        let f = fixture();
        let a = surface(&f, 0, 3.0);
        let b = surface(&f, 1, 3.0);
        a.set_active(true);
        b.set_active(true);
        let camera = f.scope.camera().camera();
        let fb = b.frames_rendered();

        a.handle_input(&InputEvent::Button {
            button: MouseButton::Left,
            state: ElementState::Pressed,
            pos: Vec2::new(6.0, 6.0),
        });
        let response = a.handle_input(&InputEvent::PointerMove {
            pos: Vec2::new(10.0, 6.0),
        });
        assert_eq!(response, Response::CameraMoved);
        assert_ne!(f.scope.camera().camera(), camera);
        assert_eq!(b.frames_rendered(), fb + 1);
        assert_eq!(a.display_image().unwrap(), b.display_image().unwrap());
    }

    #[test]
    fn test_dropping_active_surface_releases() {
        let f = fixture();
        let s = surface(&f, 0, 3.0);
        s.set_active(true);
        drop(s);
        assert_eq!(f.host.live_targets(), 0);
        assert_eq!(f.scope.broadcaster().surface_count(), 0);
    }
}
