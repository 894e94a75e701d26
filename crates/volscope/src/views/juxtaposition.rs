//! Side-by-side volume renderings with an optional paging composite.

use std::any::Any;
use std::rc::Rc;

use glam::{UVec2, Vec3};
use volscope_core::{
    brainweb_labels, BlendMode, GridGeometry, Result, ScalarGrid, Settings, SmoothingLaw,
    TransferFunctionTable, VolscopeError, VolumeIndex,
};
use volscope_render::{
    CompositeView, Delivery, InputEvent, RenderMode, Response, SceneSurface, ViewScope,
};

use super::{DataView, ViewKind};
use crate::budget::GpuMemoryBudget;
use crate::layout::{arrange, Arrangement, Rect};

/// Label opacities a fresh juxtaposition view starts with. Every other label
/// is fully transparent.
const INITIAL_OPACITIES: [(usize, u8); 2] = [(2, 25), (8, 50)];

/// One volume rendering per selected volume, all sharing one camera.
///
/// In interchangeable mode the surfaces render off-screen and are paged
/// through a single [`CompositeView`] instead of being shown in a grid.
pub struct JuxtapositionView {
    scope: Rc<ViewScope>,
    surfaces: Vec<SceneSurface>,
    composite: Option<CompositeView>,
    budget: GpuMemoryBudget,
    shaded: bool,
    progressive: bool,
    law: SmoothingLaw,
    blend_mode: BlendMode,
    container: UVec2,
    active: bool,
}

impl JuxtapositionView {
    /// Creates an empty, inactive view.
    pub fn new(geometry: GridGeometry, settings: &Settings) -> Self {
        let scope = ViewScope::builder(geometry, initial_transfer())
            .settings(settings)
            .build();
        Self::with_scope(scope, settings)
    }

    /// Creates an empty, inactive view rendering through `scope`.
    pub fn with_scope(scope: Rc<ViewScope>, settings: &Settings) -> Self {
        let container = scope.viewport();
        Self {
            scope,
            surfaces: Vec::new(),
            composite: None,
            budget: GpuMemoryBudget::from_megabytes(settings.gpu_mem_limit_mb),
            shaded: settings.shaded,
            progressive: settings.progressive,
            law: settings.smoothing_law,
            blend_mode: settings.blend_mode,
            container,
            active: false,
        }
    }

    /// Returns the scope shared by the surfaces of this view.
    pub fn scope(&self) -> &Rc<ViewScope> {
        &self.scope
    }

    /// Returns the surface of a volume, active or dormant.
    pub fn surface(&self, index: VolumeIndex) -> Option<&SceneSurface> {
        self.surfaces.iter().find(|s| s.index() == index)
    }

    /// Returns the active surfaces in insertion order.
    pub fn active_surfaces(&self) -> impl Iterator<Item = &SceneSurface> {
        self.surfaces.iter().filter(|s| s.is_active())
    }

    /// Returns the render mode the budget assigned to every active surface,
    /// in insertion order.
    pub fn render_modes(&self) -> Vec<(VolumeIndex, RenderMode)> {
        self.active_surfaces()
            .map(|s| (s.index(), RenderMode::from_gpu(s.is_gpu_mode())))
            .collect()
    }

    /// Returns the current GPU memory budget.
    pub fn budget(&self) -> GpuMemoryBudget {
        self.budget
    }

    /// Returns true in interchangeable mode.
    pub fn is_interchangeable(&self) -> bool {
        self.composite.is_some()
    }

    /// Returns the paging composite of interchangeable mode.
    pub fn composite(&self) -> Option<&CompositeView> {
        self.composite.as_ref()
    }

    /// Switches between the grid and the paging composite.
    ///
    /// Enabling renders every surface off-screen and pages the active ones;
    /// disabling puts them back on screen and finalizes the composite.
    pub fn set_interchangeable(&mut self, interchangeable: bool) -> Result<()> {
        if interchangeable == self.is_interchangeable() {
            return Ok(());
        }
        if interchangeable {
            for surface in &self.surfaces {
                surface.set_off_screen(true);
            }
            let composite = CompositeView::new(
                Rc::clone(&self.scope),
                self.container,
                self.law,
                self.blend_mode,
            );
            for surface in self.surfaces.iter().filter(|s| s.is_active()) {
                composite.add(surface)?;
            }
            self.composite = Some(composite);
            log::info!("interchangeable view enabled");
        } else if let Some(composite) = self.composite.take() {
            for surface in self.surfaces.iter().filter(|s| s.is_active()) {
                composite.remove(surface)?;
            }
            for surface in &self.surfaces {
                surface.set_off_screen(false);
            }
            composite.finalize()?;
            log::info!("interchangeable view disabled");
        }
        self.relayout();
        Ok(())
    }

    /// Returns true if surfaces use gradient shading.
    pub fn is_shaded(&self) -> bool {
        self.shaded
    }

    /// Enables or disables gradient shading on every surface.
    pub fn set_shaded(&mut self, shaded: bool) {
        self.shaded = shaded;
        for surface in &self.surfaces {
            surface.set_shaded(shaded);
        }
    }

    /// Returns true if surfaces sample coarser while interacting.
    pub fn is_progressive(&self) -> bool {
        self.progressive
    }

    /// Enables or disables progressive rendering on every surface.
    pub fn set_progressive(&mut self, progressive: bool) {
        self.progressive = progressive;
        for surface in &self.surfaces {
            surface.set_progressive(progressive);
        }
    }

    /// Sets the color of a label on every surface.
    pub fn set_label_color(&self, label: usize, color: Vec3) -> Result<()> {
        self.scope.set_label_color(label, color)
    }

    /// Sets the opacity of a label on every surface.
    pub fn set_label_opacity(&self, label: usize, opacity: f32) -> Result<()> {
        self.scope.set_label_opacity(label, opacity)
    }

    /// Moves the composite to page `t`.
    pub fn set_page(&self, t: f32) -> Result<()> {
        match &self.composite {
            Some(composite) => composite.set_page(t),
            None => Ok(()),
        }
    }

    /// Selects the smoothing law, now and for later composites.
    pub fn set_smoothing_law(&mut self, law: SmoothingLaw) -> Result<()> {
        self.law = law;
        match &self.composite {
            Some(composite) => composite.set_smoothing_law(law),
            None => Ok(()),
        }
    }

    /// Selects the blend mode, now and for later composites.
    pub fn set_blend_mode(&mut self, mode: BlendMode) -> Result<()> {
        self.blend_mode = mode;
        match &self.composite {
            Some(composite) => composite.set_blend_mode(mode),
            None => Ok(()),
        }
    }

    /// Returns the container size.
    pub fn container(&self) -> UVec2 {
        self.container
    }

    /// Resizes the container and lays the surfaces out again.
    pub fn resize(&mut self, container: UVec2) {
        self.container = container.max(UVec2::ONE);
        self.relayout();
    }

    /// Returns where each active surface is placed.
    pub fn layout(&self) -> Vec<(VolumeIndex, Rect)> {
        let active: Vec<&SceneSurface> = self.active_surfaces().collect();
        arrange(active.len(), self.container, self.arrangement())
            .into_iter()
            .zip(active)
            .map(|(rect, surface)| (surface.index(), rect))
            .collect()
    }

    /// Delivers an event received on the display of volume `index`.
    pub fn handle_surface_input(&self, index: VolumeIndex, event: &InputEvent) -> Result<Response> {
        let surface = self
            .surface(index)
            .ok_or(VolscopeError::VolumeNotFound(index))?;
        Ok(surface.handle_input(event))
    }

    /// Delivers an event received on the composite display.
    ///
    /// Outside interchangeable mode there is no composite display and the
    /// event is dropped.
    pub fn handle_composite_input(&self, event: &InputEvent) -> Result<Delivery> {
        match &self.composite {
            Some(composite) => composite.handle_input(event),
            None => Ok(Delivery::Dropped),
        }
    }

    fn arrangement(&self) -> Arrangement {
        if self.is_interchangeable() {
            Arrangement::Stacked
        } else {
            Arrangement::Grid
        }
    }

    fn relayout(&self) {
        if let Some(composite) = &self.composite {
            if let Err(err) = composite.resize(self.container) {
                log::warn!("composite resize failed: {err}");
            }
            return;
        }
        for (index, rect) in self.layout() {
            if let Some(surface) = self.surface(index) {
                surface.resize(rect.size);
            }
        }
    }

    /// Re-assigns GPU and CPU rendering over the active surfaces.
    fn rebalance(&self) {
        let active: Vec<&SceneSurface> = self.active_surfaces().collect();
        let modes = self
            .budget
            .assign(active.iter().map(|s| s.memory_footprint()));
        for (surface, mode) in active.into_iter().zip(modes) {
            if mode == RenderMode::RayCast && surface.is_gpu_mode() {
                log::debug!(
                    "volume {} exceeds the {} GPU budget, ray casting on the CPU",
                    surface.index(),
                    self.budget
                );
            }
            surface.set_gpu_mode(mode == RenderMode::Gpu);
        }
    }

    fn used_gpu_candidates(&self) -> u64 {
        self.active_surfaces()
            .map(|s| s.memory_footprint() as u64)
            .sum()
    }
}

impl DataView for JuxtapositionView {
    fn name(&self) -> &'static str {
        ViewKind::Juxtaposition.name()
    }

    fn kind(&self) -> ViewKind {
        ViewKind::Juxtaposition
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn activate(&mut self) {
        self.active = true;
        for surface in self.active_surfaces() {
            surface.render();
        }
    }

    fn deactivate(&mut self) {
        self.active = false;
    }

    fn add_volume(&mut self, index: VolumeIndex, grid: ScalarGrid) -> Result<()> {
        let gpu = self
            .budget
            .fits(self.used_gpu_candidates() + grid.memory_footprint() as u64);
        let surface = match self.surface(index).cloned() {
            Some(surface) => {
                surface.set_volume(grid)?;
                surface
            }
            None => {
                let surface = SceneSurface::new(index, grid, Rc::clone(&self.scope))?;
                surface.set_shaded(self.shaded);
                surface.set_progressive(self.progressive);
                surface.set_off_screen(self.is_interchangeable());
                self.surfaces.push(surface.clone());
                surface
            }
        };
        if !surface.is_active() {
            surface.set_gpu_mode(gpu);
            surface.set_active(true);
        }
        log::info!("volume {index} added to {}", self.name());

        self.rebalance();
        self.relayout();
        if let Some(composite) = &self.composite {
            if !composite.contains(&surface) {
                composite.add(&surface)?;
            }
        }
        Ok(())
    }

    fn remove_volume(&mut self, index: VolumeIndex) -> bool {
        let Some(surface) = self.surface(index).cloned() else {
            log::warn!("no volume {index} to remove from {}", self.name());
            return false;
        };
        if let Some(composite) = &self.composite {
            if let Err(err) = composite.remove(&surface) {
                log::warn!("volume {index} could not leave the composite: {err}");
            }
        }
        surface.set_active(false);
        log::info!("volume {index} removed from {}", self.name());

        self.rebalance();
        self.relayout();
        true
    }

    fn volumes(&self) -> Vec<VolumeIndex> {
        self.active_surfaces().map(SceneSurface::index).collect()
    }

    fn gpu_mem_limit_changed(&mut self, budget: GpuMemoryBudget) {
        log::info!("GPU memory limit of {} changed to {budget}", self.name());
        self.budget = budget;
        self.rebalance();
    }

    fn close(&mut self) {
        if let Some(composite) = self.composite.take() {
            for surface in &self.surfaces {
                if let Err(err) = composite.remove(surface) {
                    log::warn!("closing composite: {err}");
                }
            }
            if let Err(err) = composite.finalize() {
                log::warn!("closing composite: {err}");
            }
        }
        for surface in self.surfaces.drain(..) {
            surface.set_active(false);
        }
        self.active = false;
        log::debug!("{} closed", ViewKind::Juxtaposition);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

fn initial_transfer() -> TransferFunctionTable {
    let mut transfer = TransferFunctionTable::from_labels(&brainweb_labels(), 0.0);
    for (label, opacity) in INITIAL_OPACITIES {
        // The BrainWeb table always has these labels.
        if let Err(err) = transfer.set_label_opacity(label, f32::from(opacity) / 255.0) {
            log::warn!("initial opacity: {err}");
        }
    }
    transfer
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::UVec3;

    fn geometry() -> GridGeometry {
        GridGeometry::with_dims(UVec3::new(6, 6, 6))
    }

    fn settings() -> Settings {
        Settings {
            viewport: UVec2::new(24, 24),
            ..Settings::default()
        }
    }

    fn volume(label: u8) -> ScalarGrid {
        let mut grid = ScalarGrid::filled(UVec3::new(6, 6, 6), 0.0);
        for z in 1..5 {
            for y in 1..5 {
                for x in 1..5 {
                    grid.set(x, y, z, f32::from(label));
                }
            }
        }
        grid
    }

    fn view() -> JuxtapositionView {
        let mut view = JuxtapositionView::new(geometry(), &settings());
        view.set_active(true);
        view
    }

    #[test]
    fn test_initial_opacities() {
        let view = view();
        assert_eq!(view.scope().label_opacity(0).unwrap(), 0.0);
        assert!((view.scope().label_opacity(2).unwrap() - 25.0 / 255.0).abs() < 1e-6);
        assert!((view.scope().label_opacity(8).unwrap() - 50.0 / 255.0).abs() < 1e-6);
    }

    #[test]
    fn test_add_and_remove_volume() {
        let mut view = view();
        view.add_volume(3, volume(2)).unwrap();
        view.add_volume(1, volume(8)).unwrap();
        assert_eq!(view.volumes(), vec![3, 1]);
        assert_eq!(view.scope().camera().reset_count(), 1);

        assert!(view.remove_volume(3));
        assert_eq!(view.volumes(), vec![1]);
        assert!(!view.surface(3).unwrap().is_active());
        assert!(!view.remove_volume(7));
    }

    #[test]
    fn test_readd_keeps_position() {
        let mut view = view();
        view.add_volume(0, volume(2)).unwrap();
        view.add_volume(1, volume(2)).unwrap();
        view.remove_volume(0);
        view.add_volume(0, volume(8)).unwrap();
        assert_eq!(view.volumes(), vec![0, 1]);
    }

    #[test]
    fn test_wrong_shape_is_rejected() {
        let mut view = view();
        let err = view
            .add_volume(0, ScalarGrid::filled(UVec3::new(2, 2, 2), 0.0))
            .unwrap_err();
        assert!(matches!(err, VolscopeError::ShapeMismatch { .. }));
        assert!(view.volumes().is_empty());
    }

    #[test]
    fn test_grid_layout() {
        let mut view = view();
        for i in 0..3 {
            view.add_volume(i, volume(2)).unwrap();
        }
        let layout = view.layout();
        assert_eq!(layout.len(), 3);
        assert_eq!(layout[2].1.origin, UVec2::new(0, 12));
        assert_eq!(view.surface(0).unwrap().size(), UVec2::new(12, 12));
    }

    #[test]
    fn test_budget_rebalance() {
        let mut view = view();
        let footprint = volume(2).memory_footprint() as u64;
        view.gpu_mem_limit_changed(GpuMemoryBudget::from_bytes(footprint + 1));
        view.add_volume(0, volume(2)).unwrap();
        view.add_volume(1, volume(2)).unwrap();
        assert_eq!(
            view.render_modes(),
            vec![(0, RenderMode::Gpu), (1, RenderMode::RayCast)]
        );

        view.gpu_mem_limit_changed(GpuMemoryBudget::from_bytes(2 * footprint + 1));
        assert_eq!(
            view.render_modes(),
            vec![(0, RenderMode::Gpu), (1, RenderMode::Gpu)]
        );

        // A single volume exactly at the limit no longer fits.
        view.gpu_mem_limit_changed(GpuMemoryBudget::from_bytes(footprint));
        view.remove_volume(0);
        assert_eq!(view.render_modes(), vec![(1, RenderMode::RayCast)]);
    }

    #[test]
    fn test_interchangeable_toggle() {
        let mut view = view();
        view.add_volume(0, volume(2)).unwrap();
        view.add_volume(1, volume(8)).unwrap();

        view.set_interchangeable(true).unwrap();
        let composite = view.composite().unwrap().clone();
        assert_eq!(composite.members(), vec![0, 1]);
        assert!(view.active_surfaces().all(SceneSurface::is_off_screen));
        assert_eq!(composite.linked(), Some(0));

        view.add_volume(2, volume(2)).unwrap();
        assert_eq!(composite.members(), vec![0, 1, 2]);

        view.set_interchangeable(false).unwrap();
        assert!(composite.is_finalized());
        assert!(view.composite().is_none());
        assert!(view.active_surfaces().all(|s| !s.is_off_screen()));
    }

    #[test]
    fn test_page_and_law() {
        let mut view = view();
        for i in 0..3 {
            view.add_volume(i, volume(2)).unwrap();
        }
        view.set_smoothing_law(SmoothingLaw::Discrete).unwrap();
        view.set_interchangeable(true).unwrap();
        view.set_page(1.2).unwrap();
        assert_eq!(view.composite().unwrap().weights(), vec![0.0, 1.0, 0.0]);
        view.set_smoothing_law(SmoothingLaw::All).unwrap();
        assert_eq!(view.composite().unwrap().weights(), vec![1.0; 3]);
    }

    #[test]
    fn test_label_edit_redraws() {
        let mut view = view();
        view.add_volume(0, volume(3)).unwrap();
        let surface = view.surface(0).unwrap().clone();
        let frames = surface.frames_rendered();
        view.set_label_opacity(3, 1.0).unwrap();
        assert!(surface.frames_rendered() > frames);
        assert!(!surface.is_dirty());
        assert!(view.set_label_color(40, Vec3::ONE).is_err());
    }

    #[test]
    fn test_shaded_and_progressive_apply_to_new_surfaces() {
        let mut view = view();
        view.set_shaded(true);
        view.set_progressive(false);
        view.add_volume(0, volume(2)).unwrap();
        let surface = view.surface(0).unwrap();
        assert!(surface.is_shaded());
        assert!(!surface.is_progressive());
    }

    #[test]
    fn test_input_dispatch() {
        let mut view = view();
        view.add_volume(0, volume(2)).unwrap();
        let response = view
            .handle_surface_input(0, &InputEvent::Resize { size: UVec2::new(10, 10) })
            .unwrap();
        assert_eq!(response, Response::Resized(UVec2::new(10, 10)));
        assert!(view.handle_surface_input(5, &InputEvent::Timer).is_err());
        assert_eq!(
            view.handle_composite_input(&InputEvent::Timer).unwrap(),
            Delivery::Dropped
        );
    }

    #[test]
    fn test_close_releases_everything() {
        let mut view = view();
        view.add_volume(0, volume(2)).unwrap();
        view.set_interchangeable(true).unwrap();
        view.close();
        assert!(view.volumes().is_empty());
        assert!(!view.is_active());
        assert_eq!(view.scope().broadcaster().surface_count(), 0);
        assert_eq!(view.scope().broadcaster().listener_count(), 0);
    }
}
