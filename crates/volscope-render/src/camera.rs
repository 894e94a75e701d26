//! Camera and the per-view-mode camera hub.

use std::cell::{Cell, Ref, RefCell};

use glam::{Mat4, Quat, Vec3};

/// Camera projection mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProjectionMode {
    /// Perspective projection.
    #[default]
    Perspective,
    /// Orthographic projection.
    Orthographic,
}

/// A 3D camera looking at a target point.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    /// Camera position in world space.
    pub position: Vec3,
    /// Point the camera is looking at.
    pub target: Vec3,
    /// Up vector, kept orthogonal to the view direction.
    pub up: Vec3,
    /// Vertical field of view in radians.
    pub fov: f32,
    /// Near clipping plane.
    pub near: f32,
    /// Far clipping plane.
    pub far: f32,
    /// Projection mode.
    pub projection_mode: ProjectionMode,
    /// Half height of the orthographic view volume.
    pub ortho_scale: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 3.0),
            target: Vec3::ZERO,
            up: Vec3::Y,
            fov: std::f32::consts::FRAC_PI_6, // 30 degrees
            near: 0.01,
            far: 1000.0,
            projection_mode: ProjectionMode::Perspective,
            ortho_scale: 1.0,
        }
    }
}

impl Camera {
    /// Returns the view matrix.
    #[must_use]
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    /// Returns the projection matrix for a viewport aspect ratio (width / height).
    #[must_use]
    pub fn projection_matrix(&self, aspect_ratio: f32) -> Mat4 {
        let aspect_ratio = aspect_ratio.max(1e-3);
        match self.projection_mode {
            ProjectionMode::Perspective => {
                Mat4::perspective_rh(self.fov, aspect_ratio, self.near, self.far)
            }
            ProjectionMode::Orthographic => {
                let half_height = self.ortho_scale;
                let half_width = half_height * aspect_ratio;
                Mat4::orthographic_rh(
                    -half_width,
                    half_width,
                    -half_height,
                    half_height,
                    self.near,
                    self.far,
                )
            }
        }
    }

    /// Returns the combined view-projection matrix.
    #[must_use]
    pub fn view_projection_matrix(&self, aspect_ratio: f32) -> Mat4 {
        self.projection_matrix(aspect_ratio) * self.view_matrix()
    }

    /// Returns the distance from the camera to its target.
    #[must_use]
    pub fn distance(&self) -> f32 {
        (self.position - self.target).length()
    }

    /// Returns the camera's forward direction.
    #[must_use]
    pub fn forward(&self) -> Vec3 {
        (self.target - self.position).normalize_or_zero()
    }

    /// Returns the camera's right direction.
    #[must_use]
    pub fn right(&self) -> Vec3 {
        self.forward().cross(self.up).normalize_or_zero()
    }

    /// Rotates the camera about the view-up vector centered at the target.
    pub fn azimuth(&mut self, degrees: f32) {
        let rotation = Quat::from_axis_angle(self.up.normalize_or_zero(), degrees.to_radians());
        self.position = self.target + rotation * (self.position - self.target);
    }

    /// Rotates the camera over the target so positive angles move it upward.
    ///
    /// The view-up vector is re-orthogonalized afterwards.
    pub fn elevation(&mut self, degrees: f32) {
        let right = self.right();
        if right == Vec3::ZERO {
            return;
        }
        let rotation = Quat::from_axis_angle(-right, degrees.to_radians());
        self.position = self.target + rotation * (self.position - self.target);
        self.orthogonalize_up();
    }

    /// Pans the camera and its target.
    pub fn pan(&mut self, delta_x: f32, delta_y: f32) {
        let offset = self.right() * delta_x + self.up * delta_y;
        self.position += offset;
        self.target += offset;
    }

    /// Moves toward the target by `factor` (>1 moves closer).
    pub fn dolly(&mut self, factor: f32) {
        if factor <= 0.0 {
            return;
        }
        match self.projection_mode {
            ProjectionMode::Perspective => {
                let distance = (self.distance() / factor).max(self.near * 2.0);
                self.position = self.target - self.forward() * distance;
            }
            ProjectionMode::Orthographic => {
                self.ortho_scale = (self.ortho_scale / factor).clamp(0.01, 1000.0);
            }
        }
    }

    /// Places the camera in front of the box (looking down -Z) so it fits the view.
    pub fn look_at_box(&mut self, min: Vec3, max: Vec3) {
        let center = (min + max) * 0.5;
        let radius = ((max - min).length() * 0.5).max(1e-3);

        self.target = center;
        self.up = Vec3::Y;
        self.position = center + Vec3::Z * self.fit_distance(radius);
        self.update_clipping(radius);
        self.ortho_scale = radius;
    }

    /// Re-centers on the box keeping the current view direction.
    pub fn fit_box(&mut self, min: Vec3, max: Vec3) {
        let center = (min + max) * 0.5;
        let radius = ((max - min).length() * 0.5).max(1e-3);
        let mut forward = self.forward();
        if forward == Vec3::ZERO {
            forward = Vec3::NEG_Z;
        }
        self.target = center;
        self.position = center - forward * self.fit_distance(radius);
        self.update_clipping(radius);
        self.ortho_scale = radius;
    }

    fn fit_distance(&self, radius: f32) -> f32 {
        radius / (self.fov * 0.5).sin()
    }

    fn update_clipping(&mut self, radius: f32) {
        let distance = self.fit_distance(radius);
        self.near = (distance - radius * 2.0).max(radius * 0.001);
        self.far = distance + radius * 4.0;
    }

    fn orthogonalize_up(&mut self) {
        let forward = self.forward();
        let right = forward.cross(self.up);
        if right.length_squared() > 1e-12 {
            self.up = right.cross(forward).normalize();
        }
    }
}

/// The single camera shared by every surface of a view mode.
///
/// The canonical orientation is applied once, by the first surface that
/// becomes active.
#[derive(Debug)]
pub struct CameraHub {
    camera: RefCell<Camera>,
    azimuth: f32,
    elevation: f32,
    initialized: Cell<bool>,
    resets: Cell<u32>,
}

impl Default for CameraHub {
    fn default() -> Self {
        Self::with_orientation(45.0, 30.0)
    }
}

impl CameraHub {
    /// Creates a hub with azimuth 45° and elevation 30°.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a hub with a custom canonical orientation, in degrees.
    pub fn with_orientation(azimuth: f32, elevation: f32) -> Self {
        Self {
            camera: RefCell::new(Camera::default()),
            azimuth,
            elevation,
            initialized: Cell::new(false),
            resets: Cell::new(0),
        }
    }

    /// Returns a copy of the camera.
    pub fn camera(&self) -> Camera {
        self.camera.borrow().clone()
    }

    /// Borrows the camera.
    pub fn borrow(&self) -> Ref<'_, Camera> {
        self.camera.borrow()
    }

    /// Mutates the camera in place.
    pub fn update<R>(&self, f: impl FnOnce(&mut Camera) -> R) -> R {
        f(&mut self.camera.borrow_mut())
    }

    /// Applies the canonical orientation fitted to `bounds` unless that
    /// already happened. Returns true if the reset ran now.
    pub fn ensure_default(&self, bounds: (Vec3, Vec3)) -> bool {
        if self.initialized.get() {
            return false;
        }
        self.reset_default(bounds);
        true
    }

    /// Sets the canonical orientation and fits `bounds`.
    pub fn reset_default(&self, (min, max): (Vec3, Vec3)) {
        let mut camera = self.camera.borrow_mut();
        camera.look_at_box(min, max);
        camera.azimuth(self.azimuth);
        camera.elevation(self.elevation);
        self.initialized.set(true);
        self.resets.set(self.resets.get() + 1);
        log::debug!(
            "camera reset (azimuth {}, elevation {})",
            self.azimuth,
            self.elevation
        );
    }

    /// Re-fits `bounds` keeping the current orientation.
    pub fn fit(&self, (min, max): (Vec3, Vec3)) {
        self.camera.borrow_mut().fit_box(min, max);
    }

    /// Returns true once the canonical orientation has been applied.
    pub fn is_initialized(&self) -> bool {
        self.initialized.get()
    }

    /// Returns how many times the canonical orientation was applied.
    pub fn reset_count(&self) -> u32 {
        self.resets.get()
    }
}
