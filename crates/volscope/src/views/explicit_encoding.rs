//! Label isosurfaces of several volumes combined by a boolean or counting
//! operator.

use std::any::Any;
use std::collections::BTreeSet;
use std::rc::Rc;

use glam::{Quat, UVec2, Vec3};
use image::RgbaImage;
use volscope_core::{
    brainweb_labels, produce_surfaces, GridGeometry, LabelSurface, Result, ScalarGrid, Settings,
    TransferFunctionTable, VolscopeError, VolumeIndex, VolumeOperator,
};
use volscope_render::{
    rasterize, Camera, CameraHub, DisplayTarget, InputEvent, InteractionContext, Interactor,
    MeshLayer, Response, ViewScope,
};

use super::{DataView, ViewKind};
use crate::budget::GpuMemoryBudget;

/// Opacity of every label when the view is created.
const INITIAL_OPACITY: u8 = 127;

/// Label shown when the view is created (white matter).
const INITIAL_LABEL: u8 = 3;

/// One mesh per toggled label, extracted from all selected volumes at once.
pub struct ExplicitEncodingView {
    scope: Rc<ViewScope>,
    volumes: Vec<(VolumeIndex, ScalarGrid)>,
    labels: BTreeSet<u8>,
    operator: VolumeOperator,
    iso_value: f32,
    surfaces: Vec<LabelSurface>,
    display: Option<DisplayTarget>,
    interactor: Interactor,
    prop_rotation: Quat,
    frames: u64,
    active: bool,
}

impl ExplicitEncodingView {
    /// Creates an empty, inactive view.
    pub fn new(geometry: GridGeometry, settings: &Settings) -> Self {
        let transfer = TransferFunctionTable::from_labels(
            &brainweb_labels(),
            f32::from(INITIAL_OPACITY) / 255.0,
        );
        let scope = ViewScope::builder(geometry, transfer)
            .camera(CameraHub::with_orientation(60.0, 30.0))
            .settings(settings)
            .build();
        Self {
            scope,
            volumes: Vec::new(),
            labels: BTreeSet::from([INITIAL_LABEL]),
            operator: VolumeOperator::default(),
            iso_value: 0.0,
            surfaces: Vec::new(),
            display: None,
            interactor: Interactor::new(),
            prop_rotation: Quat::IDENTITY,
            frames: 0,
            active: false,
        }
    }

    /// Returns the scope holding the camera and label colors.
    pub fn scope(&self) -> &Rc<ViewScope> {
        &self.scope
    }

    /// Returns the toggled labels in ascending order.
    pub fn labels(&self) -> Vec<u8> {
        self.labels.iter().copied().collect()
    }

    /// Returns true if `label` is shown.
    pub fn is_label_shown(&self, label: u8) -> bool {
        self.labels.contains(&label)
    }

    /// Shows or hides the isosurface of `label`.
    pub fn toggle_label(&mut self, label: u8, shown: bool) -> Result<()> {
        let count = self.scope.transfer().num_labels();
        if usize::from(label) >= count {
            return Err(VolscopeError::LabelOutOfRange {
                label: usize::from(label),
                count,
            });
        }
        let changed = if shown {
            self.labels.insert(label)
        } else {
            self.labels.remove(&label)
        };
        if changed {
            self.rebuild()?;
        }
        Ok(())
    }

    /// Returns the operator combining the volumes.
    pub fn operator(&self) -> VolumeOperator {
        self.operator
    }

    /// Selects the operator combining the volumes.
    pub fn set_operator(&mut self, operator: VolumeOperator) -> Result<()> {
        if self.operator == operator {
            return Ok(());
        }
        self.operator = operator;
        log::info!("volume operator: {operator}");
        self.rebuild()
    }

    /// Returns the isovalue used by [`VolumeOperator::Addition`].
    pub fn iso_value(&self) -> f32 {
        self.iso_value
    }

    /// Returns the range the isovalue is clamped to.
    #[allow(clippy::cast_precision_loss)]
    pub fn iso_range(&self) -> (f32, f32) {
        (0.0, self.volumes.len() as f32)
    }

    /// Sets the isovalue, clamped to [`iso_range`](Self::iso_range).
    #[allow(clippy::float_cmp)]
    pub fn set_iso_value(&mut self, value: f32) -> Result<()> {
        let (min, max) = self.iso_range();
        let value = if value.is_nan() { min } else { value.clamp(min, max) };
        if value == self.iso_value {
            return Ok(());
        }
        self.iso_value = value;
        if self.operator.uses_iso_value() {
            self.rebuild()?;
        }
        Ok(())
    }

    /// Returns the extracted surfaces, one per toggled label.
    pub fn surfaces(&self) -> &[LabelSurface] {
        &self.surfaces
    }

    /// Sets the color of a label.
    pub fn set_label_color(&mut self, label: usize, color: Vec3) -> Result<()> {
        self.scope.set_label_color(label, color)?;
        self.render();
        Ok(())
    }

    /// Sets the opacity of a label.
    pub fn set_label_opacity(&mut self, label: usize, opacity: f32) -> Result<()> {
        self.scope.set_label_opacity(label, opacity)?;
        self.render();
        Ok(())
    }

    /// Returns the number of frames drawn.
    pub fn frames_rendered(&self) -> u64 {
        self.frames
    }

    /// Returns a copy of the last frame, if active.
    pub fn image(&self) -> Option<RgbaImage> {
        self.display.as_ref().map(|d| d.framebuffer().clone())
    }

    /// Applies an input event received on the display.
    pub fn handle_input(&mut self, event: &InputEvent) -> Response {
        let Some(display) = self.display.as_ref() else {
            return Response::Ignored;
        };
        let mut ctx = InteractionContext {
            camera: self.scope.camera(),
            prop: &mut self.prop_rotation,
            style: self.scope.interactor_style(),
            viewport: display.size(),
        };
        let response = self.interactor.handle(event, &mut ctx);
        match response {
            Response::Ignored | Response::Released => {}
            Response::CameraMoved | Response::PropMoved => self.render(),
            Response::StyleChanged(style) => self.scope.set_interactor_style(style),
            Response::Refit => {
                self.scope.camera().fit(self.scope.geometry().bounds());
                self.render();
            }
            Response::Resized(size) => self.resize(size),
        }
        response
    }

    /// Resizes the display.
    pub fn resize(&mut self, size: UVec2) {
        let resized = match self.display.as_mut() {
            Some(display) => display.resize(self.scope.host(), size),
            None => false,
        };
        if resized {
            self.render();
        }
    }

    /// Re-extracts the isosurfaces and redraws.
    fn rebuild(&mut self) -> Result<()> {
        let grids: Vec<&ScalarGrid> = self.volumes.iter().map(|(_, grid)| grid).collect();
        let labels = self.labels();
        self.surfaces = produce_surfaces(
            &grids,
            &labels,
            self.operator,
            self.iso_value,
            self.scope.geometry(),
        )?;
        log::debug!(
            "rebuilt {} label surface(s) from {} volume(s)",
            self.surfaces.len(),
            grids.len()
        );
        if !self.labels.is_empty() {
            self.scope
                .camera()
                .ensure_default(self.scope.geometry().bounds());
        }
        self.render();
        Ok(())
    }

    /// Draws the current surfaces into the display, if any.
    fn render(&mut self) {
        let camera = self.view_camera();
        let Some(display) = self.display.as_mut() else {
            return;
        };
        let transfer = self.scope.transfer();
        let layers: Vec<MeshLayer<'_>> = self
            .surfaces
            .iter()
            .filter(|s| !s.mesh.is_empty())
            .map(|s| MeshLayer {
                mesh: &s.mesh,
                color: transfer.label_color(usize::from(s.label)).unwrap_or(Vec3::ONE),
                opacity: transfer.label_opacity(usize::from(s.label)).unwrap_or(1.0),
            })
            .collect();
        rasterize(
            &layers,
            &camera,
            self.scope.background(),
            display.framebuffer_mut(),
        );
        display.present(self.scope.host());
        self.frames += 1;
    }

    /// The shared camera, orbited against the prop rotation so that actor
    /// styles appear to turn the meshes.
    fn view_camera(&self) -> Camera {
        let mut camera = self.scope.camera().camera();
        if self.prop_rotation != Quat::IDENTITY {
            let center = self.scope.geometry().center();
            let inverse = self.prop_rotation.inverse();
            camera.position = center + inverse * (camera.position - center);
            camera.target = center + inverse * (camera.target - center);
            camera.up = inverse * camera.up;
        }
        camera
    }

    fn clamp_iso_value(&mut self) {
        let (min, max) = self.iso_range();
        self.iso_value = self.iso_value.clamp(min, max);
    }
}

impl DataView for ExplicitEncodingView {
    fn name(&self) -> &'static str {
        ViewKind::ExplicitEncoding.name()
    }

    fn kind(&self) -> ViewKind {
        ViewKind::ExplicitEncoding
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn activate(&mut self) {
        if self.display.is_none() {
            self.display = Some(DisplayTarget::acquire(
                self.scope.host(),
                self.scope.viewport(),
            ));
            log::debug!("explicit encoding display acquired");
        }
        self.active = true;
        self.render();
    }

    fn deactivate(&mut self) {
        if let Some(display) = self.display.take() {
            display.release(self.scope.host());
            log::debug!("explicit encoding display released");
        }
        self.interactor = Interactor::new();
        self.active = false;
    }

    fn add_volume(&mut self, index: VolumeIndex, grid: ScalarGrid) -> Result<()> {
        grid.ensure_dims(self.scope.geometry().dims)?;
        match self.volumes.iter_mut().find(|(i, _)| *i == index) {
            Some((_, existing)) => *existing = grid,
            None => self.volumes.push((index, grid)),
        }
        log::info!("volume {index} added to {}", self.name());
        self.clamp_iso_value();
        self.rebuild()
    }

    fn remove_volume(&mut self, index: VolumeIndex) -> bool {
        let before = self.volumes.len();
        self.volumes.retain(|(i, _)| *i != index);
        if self.volumes.len() == before {
            log::warn!("no volume {index} to remove from {}", self.name());
            return false;
        }
        log::info!("volume {index} removed from {}", self.name());
        self.clamp_iso_value();
        if let Err(err) = self.rebuild() {
            log::warn!("rebuilding label surfaces failed: {err}");
        }
        true
    }

    fn volumes(&self) -> Vec<VolumeIndex> {
        self.volumes.iter().map(|(i, _)| *i).collect()
    }

    fn gpu_mem_limit_changed(&mut self, budget: GpuMemoryBudget) {
        // Meshes are rasterized on the CPU; nothing to rebalance.
        log::debug!("{} ignores GPU limit {budget}", self.name());
    }

    fn close(&mut self) {
        self.deactivate();
        self.volumes.clear();
        self.surfaces.clear();
        log::debug!("{} closed", ViewKind::ExplicitEncoding);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::UVec3;

    fn settings() -> Settings {
        Settings {
            viewport: UVec2::new(32, 32),
            ..Settings::default()
        }
    }

    /// A cube of `label` spanning `lo..hi` on every axis.
    fn cube(label: u8, lo: u32, hi: u32) -> ScalarGrid {
        let mut grid = ScalarGrid::filled(UVec3::splat(8), 0.0);
        for z in lo..hi {
            for y in lo..hi {
                for x in lo..hi {
                    grid.set(x, y, z, f32::from(label));
                }
            }
        }
        grid
    }

    fn view() -> ExplicitEncodingView {
        let mut view = ExplicitEncodingView::new(GridGeometry::with_dims(UVec3::splat(8)), &settings());
        view.set_active(true);
        view
    }

    #[test]
    fn test_defaults() {
        let view = view();
        assert_eq!(view.labels(), vec![3]);
        assert_eq!(view.operator(), VolumeOperator::Union);
        assert!((view.scope().label_opacity(5).unwrap() - 127.0 / 255.0).abs() < 1e-6);
        assert!(view.surfaces().is_empty());
        assert!(!view.scope().camera().is_initialized());
    }

    #[test]
    fn test_add_volume_builds_surfaces() {
        let mut view = view();
        view.add_volume(0, cube(3, 2, 6)).unwrap();
        assert_eq!(view.surfaces().len(), 1);
        assert_eq!(view.surfaces()[0].label, 3);
        assert!(!view.surfaces()[0].mesh.is_empty());
        assert!(view.scope().camera().is_initialized());

        let image = view.image().unwrap();
        assert!(image.pixels().any(|p| p.0[..3] != [0, 0, 0]));
    }

    #[test]
    fn test_toggle_labels() {
        let mut view = view();
        view.add_volume(0, cube(3, 2, 6)).unwrap();
        view.toggle_label(5, true).unwrap();
        assert_eq!(view.labels(), vec![3, 5]);
        assert_eq!(view.surfaces().len(), 2);
        // No voxel carries label 5.
        assert!(view.surfaces()[1].mesh.is_empty());

        view.toggle_label(3, false).unwrap();
        assert_eq!(view.labels(), vec![5]);
        assert!(view.toggle_label(12, true).is_err());
    }

    #[test]
    fn test_iso_value_clamped_to_volume_count() {
        let mut view = view();
        view.set_operator(VolumeOperator::Addition).unwrap();
        view.set_iso_value(5.0).unwrap();
        assert_eq!(view.iso_value(), 0.0);

        view.add_volume(0, cube(3, 2, 6)).unwrap();
        view.add_volume(1, cube(3, 3, 7)).unwrap();
        assert_eq!(view.iso_range(), (0.0, 2.0));
        view.set_iso_value(5.0).unwrap();
        assert_eq!(view.iso_value(), 2.0);

        view.remove_volume(1);
        assert_eq!(view.iso_value(), 1.0);
    }

    #[test]
    fn test_intersection_is_smaller_than_union() {
        let mut view = view();
        view.add_volume(0, cube(3, 1, 5)).unwrap();
        view.add_volume(1, cube(3, 3, 7)).unwrap();
        let union = view.surfaces()[0].mesh.bounds().unwrap();
        view.set_operator(VolumeOperator::Intersection).unwrap();
        let intersection = view.surfaces()[0].mesh.bounds().unwrap();
        assert!(union.1.x - union.0.x > intersection.1.x - intersection.0.x);
    }

    #[test]
    fn test_inactive_view_keeps_data() {
        let mut view = view();
        view.add_volume(4, cube(3, 2, 6)).unwrap();
        view.set_active(false);
        assert!(view.image().is_none());
        assert_eq!(view.volumes(), vec![4]);
        view.set_active(true);
        assert!(view.image().is_some());
    }

    #[test]
    fn test_label_edit_redraws() {
        let mut view = view();
        view.add_volume(0, cube(3, 2, 6)).unwrap();
        let frames = view.frames_rendered();
        view.set_label_color(3, Vec3::new(1.0, 0.0, 0.0)).unwrap();
        view.set_label_opacity(3, 1.0).unwrap();
        assert_eq!(view.frames_rendered(), frames + 2);
    }

    #[test]
    fn test_remove_unknown_volume() {
        let mut view = view();
        assert!(!view.remove_volume(9));
        assert!(view
            .add_volume(0, ScalarGrid::filled(UVec3::splat(2), 0.0))
            .is_err());
    }
}
