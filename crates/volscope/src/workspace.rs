//! A session: one data source, its selected volumes and every view mode.

use volscope_core::{Result, Settings, VolscopeError, VolumeIndex, VolumeSource};

use crate::budget::GpuMemoryBudget;
use crate::views::{create_view, DataView, ViewKind};

/// Selected volumes shown through one current view mode.
///
/// Selection changes go to the current view only. Switching views brings
/// the new view in sync with the selection before it becomes active.
pub struct Workspace<S: VolumeSource> {
    source: S,
    settings: Settings,
    views: Vec<Box<dyn DataView>>,
    current: usize,
    selection: Vec<VolumeIndex>,
}

impl<S: VolumeSource> Workspace<S> {
    /// Creates every view mode and activates the first one.
    pub fn new(source: S, settings: Settings) -> Self {
        let geometry = *source.geometry();
        let views: Vec<Box<dyn DataView>> = ViewKind::ALL
            .into_iter()
            .map(|kind| create_view(kind, geometry, &settings))
            .collect();
        let mut workspace = Self {
            source,
            settings,
            views,
            current: 0,
            selection: Vec::new(),
        };
        workspace.views[0].set_active(true);
        log::info!(
            "workspace opened with {} volume(s), view '{}'",
            workspace.source.count(),
            workspace.views[0].name()
        );
        workspace
    }

    /// Returns the data source.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Returns the session settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Returns the selected volumes in selection order.
    pub fn selection(&self) -> &[VolumeIndex] {
        &self.selection
    }

    /// Returns true if volume `index` is selected.
    pub fn is_selected(&self, index: VolumeIndex) -> bool {
        self.selection.contains(&index)
    }

    /// Selects a volume and shows it in the current view.
    ///
    /// Returns false if it was already selected.
    pub fn select(&mut self, index: VolumeIndex) -> Result<bool> {
        if self.is_selected(index) {
            return Ok(false);
        }
        let grid = self.source.get(index)?;
        self.views[self.current].add_volume(index, grid)?;
        self.selection.push(index);
        log::info!("volume {index} selected");
        Ok(true)
    }

    /// Deselects a volume. Returns false if it was not selected.
    pub fn deselect(&mut self, index: VolumeIndex) -> bool {
        let Some(position) = self.selection.iter().position(|&i| i == index) else {
            return false;
        };
        self.selection.remove(position);
        self.views[self.current].remove_volume(index);
        log::info!("volume {index} deselected");
        true
    }

    /// Returns the kind of the current view.
    pub fn current_kind(&self) -> ViewKind {
        self.views[self.current].kind()
    }

    /// Returns the current view.
    pub fn current_view(&self) -> &dyn DataView {
        self.views[self.current].as_ref()
    }

    /// Returns the current view mutably.
    pub fn current_view_mut(&mut self) -> &mut dyn DataView {
        self.views[self.current].as_mut()
    }

    /// Returns the view of `kind`.
    pub fn view(&self, kind: ViewKind) -> &dyn DataView {
        self.views[position(kind)].as_ref()
    }

    /// Returns the view of `kind` mutably.
    pub fn view_mut(&mut self, kind: ViewKind) -> &mut dyn DataView {
        self.views[position(kind)].as_mut()
    }

    /// Returns the view of concrete type `V`, if there is one.
    pub fn view_as<V: DataView>(&self) -> Option<&V> {
        self.views.iter().find_map(|v| v.as_any().downcast_ref::<V>())
    }

    /// Returns the view of concrete type `V` mutably, if there is one.
    pub fn view_as_mut<V: DataView>(&mut self) -> Option<&mut V> {
        self.views
            .iter_mut()
            .find_map(|v| v.as_any_mut().downcast_mut::<V>())
    }

    /// Makes `kind` the current view.
    ///
    /// The previous view is deactivated; the new one receives the current
    /// selection and is activated.
    pub fn set_current_view(&mut self, kind: ViewKind) -> Result<()> {
        let next = position(kind);
        if next == self.current {
            return Ok(());
        }
        self.views[self.current].set_active(false);
        self.current = next;

        let view = &mut self.views[next];
        for index in view.volumes() {
            if !self.selection.contains(&index) {
                view.remove_volume(index);
            }
        }
        let shown = view.volumes();
        for &index in &self.selection {
            if !shown.contains(&index) {
                view.add_volume(index, self.source.get(index)?)?;
            }
        }
        view.set_active(true);
        log::info!("switched to view '{}'", view.name());
        Ok(())
    }

    /// Changes the GPU memory limit of every view.
    pub fn set_gpu_mem_limit_mb(&mut self, megabytes: u64) {
        self.settings.gpu_mem_limit_mb = megabytes;
        let budget = GpuMemoryBudget::from_megabytes(megabytes);
        for view in &mut self.views {
            view.gpu_mem_limit_changed(budget);
        }
    }

    /// Closes every view. The workspace shows nothing afterwards.
    pub fn close(&mut self) {
        for view in &mut self.views {
            view.close();
        }
        self.selection.clear();
        log::info!("workspace closed");
    }

    /// Checks that `index` names a volume of the source.
    pub fn ensure_volume(&self, index: VolumeIndex) -> Result<()> {
        if index < self.source.count() {
            Ok(())
        } else {
            Err(VolscopeError::VolumeNotFound(index))
        }
    }
}

fn position(kind: ViewKind) -> usize {
    ViewKind::ALL.iter().position(|&k| k == kind).unwrap_or(0)
}
