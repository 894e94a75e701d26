//! State shared by every surface of one view mode.

use std::cell::{Cell, Ref, RefCell};
use std::rc::Rc;
use std::time::Duration;

use glam::{UVec2, Vec3};
use volscope_core::{GridGeometry, InteractorStyle, Result, Settings, TransferFunctionTable};

use crate::backend::{BackendFactory, DefaultBackends};
use crate::broadcaster::{ChangeBroadcaster, ChangeEvent, ChangeKind};
use crate::camera::CameraHub;
use crate::target::{DisplayHost, HeadlessDisplayHost};

/// Camera, transfer functions, broadcaster and resource providers of a view mode.
///
/// A scope lives exactly as long as its view mode and is handed to every
/// [`SceneSurface`](crate::SceneSurface) it creates.
pub struct ViewScope {
    geometry: GridGeometry,
    camera: CameraHub,
    transfer: RefCell<TransferFunctionTable>,
    broadcaster: ChangeBroadcaster,
    host: Rc<dyn DisplayHost>,
    backends: Rc<dyn BackendFactory>,
    style: Cell<InteractorStyle>,
    viewport: UVec2,
    background: Vec3,
}

impl std::fmt::Debug for ViewScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewScope")
            .field("geometry", &self.geometry)
            .field("style", &self.style.get())
            .field("surfaces", &self.broadcaster.surface_count())
            .finish_non_exhaustive()
    }
}

/// Builder for [`ViewScope`].
pub struct ViewScopeBuilder {
    geometry: GridGeometry,
    transfer: TransferFunctionTable,
    camera: CameraHub,
    host: Rc<dyn DisplayHost>,
    backends: Rc<dyn BackendFactory>,
    settings: Settings,
}

impl ViewScopeBuilder {
    /// Uses a custom camera hub.
    #[must_use]
    pub fn camera(mut self, camera: CameraHub) -> Self {
        self.camera = camera;
        self
    }

    /// Uses a display host.
    #[must_use]
    pub fn host(mut self, host: Rc<dyn DisplayHost>) -> Self {
        self.host = host;
        self
    }

    /// Uses a backend factory.
    #[must_use]
    pub fn backends(mut self, backends: Rc<dyn BackendFactory>) -> Self {
        self.backends = backends;
        self
    }

    /// Takes style, debounce, viewport and background from `settings`.
    #[must_use]
    pub fn settings(mut self, settings: &Settings) -> Self {
        self.settings = settings.clone();
        self
    }

    /// Builds the scope.
    pub fn build(self) -> Rc<ViewScope> {
        let broadcaster =
            ChangeBroadcaster::with_debounce(Duration::from_millis(self.settings.pointer_debounce_ms));
        Rc::new(ViewScope {
            geometry: self.geometry,
            camera: self.camera,
            transfer: RefCell::new(self.transfer),
            broadcaster,
            host: self.host,
            backends: self.backends,
            style: Cell::new(self.settings.interactor_style),
            viewport: self.settings.viewport,
            background: self.settings.background,
        })
    }
}

impl ViewScope {
    /// Starts a scope for data with `geometry`, rendered through `transfer`.
    ///
    /// Defaults to a headless host, software backends and default settings.
    pub fn builder(geometry: GridGeometry, transfer: TransferFunctionTable) -> ViewScopeBuilder {
        ViewScopeBuilder {
            geometry,
            transfer,
            camera: CameraHub::new(),
            host: Rc::new(HeadlessDisplayHost::new()),
            backends: Rc::new(DefaultBackends),
            settings: Settings::default(),
        }
    }

    /// Returns the template geometry.
    pub fn geometry(&self) -> &GridGeometry {
        &self.geometry
    }

    /// Returns the shared camera.
    pub fn camera(&self) -> &CameraHub {
        &self.camera
    }

    /// Borrows the shared transfer functions.
    pub fn transfer(&self) -> Ref<'_, TransferFunctionTable> {
        self.transfer.borrow()
    }

    /// Returns the revision of the transfer functions.
    pub fn transfer_revision(&self) -> u64 {
        self.transfer.borrow().revision()
    }

    /// Returns the broadcaster.
    pub fn broadcaster(&self) -> &ChangeBroadcaster {
        &self.broadcaster
    }

    /// Returns the display host.
    pub fn host(&self) -> &dyn DisplayHost {
        self.host.as_ref()
    }

    /// Returns the backend factory.
    pub fn backends(&self) -> &dyn BackendFactory {
        self.backends.as_ref()
    }

    /// Returns the default target size.
    pub fn viewport(&self) -> UVec2 {
        self.viewport
    }

    /// Returns the background color.
    pub fn background(&self) -> Vec3 {
        self.background
    }

    /// Returns the current interaction style.
    pub fn interactor_style(&self) -> InteractorStyle {
        self.style.get()
    }

    /// Changes the interaction style of every surface and redraws them.
    pub fn set_interactor_style(&self, style: InteractorStyle) {
        if self.style.replace(style) != style {
            log::info!("interaction style: {style}");
            self.broadcaster
                .post(ChangeEvent::external(ChangeKind::StyleChanged(style)));
        }
    }

    /// Sets a label color and redraws every surface.
    pub fn set_label_color(&self, label: usize, color: Vec3) -> Result<()> {
        self.transfer.borrow_mut().set_label_color(label, color)?;
        self.broadcaster
            .post(ChangeEvent::external(ChangeKind::ContentChanged));
        Ok(())
    }

    /// Sets a label opacity and redraws every surface.
    pub fn set_label_opacity(&self, label: usize, opacity: f32) -> Result<()> {
        self.transfer.borrow_mut().set_label_opacity(label, opacity)?;
        self.broadcaster
            .post(ChangeEvent::external(ChangeKind::ContentChanged));
        Ok(())
    }

    /// Returns the color of a label.
    pub fn label_color(&self, label: usize) -> Result<Vec3> {
        self.transfer.borrow().label_color(label)
    }

    /// Returns the opacity of a label.
    pub fn label_opacity(&self, label: usize) -> Result<f32> {
        self.transfer.borrow().label_opacity(label)
    }
}
