//! View modes.
//!
//! A [`DataView`] presents the selected volumes one way. Only one view of a
//! [`Workspace`](crate::Workspace) is active at a time; inactive views keep
//! their volumes but release nothing they would need to show them again.

mod explicit_encoding;
mod juxtaposition;

use std::any::Any;
use std::fmt;
use std::str::FromStr;

use volscope_core::{GridGeometry, Result, ScalarGrid, Settings, VolscopeError, VolumeIndex};

use crate::budget::GpuMemoryBudget;

pub use explicit_encoding::ExplicitEncodingView;
pub use juxtaposition::JuxtapositionView;

/// A way of presenting the selected volumes.
pub trait DataView: Any {
    /// Returns the display name.
    fn name(&self) -> &'static str;

    /// Returns the kind of this view.
    fn kind(&self) -> ViewKind;

    /// Returns true while this is the current view.
    fn is_active(&self) -> bool;

    /// Called when the view becomes current.
    fn activate(&mut self);

    /// Called when another view becomes current.
    fn deactivate(&mut self);

    /// Activates or deactivates the view. Repeated calls are no-ops.
    fn set_active(&mut self, active: bool) {
        if active == self.is_active() {
            return;
        }
        if active {
            self.activate();
        } else {
            self.deactivate();
        }
    }

    /// Shows a volume, replacing the data if `index` is already known.
    fn add_volume(&mut self, index: VolumeIndex, grid: ScalarGrid) -> Result<()>;

    /// Stops showing a volume. Returns false if it was not shown.
    fn remove_volume(&mut self, index: VolumeIndex) -> bool;

    /// Returns the shown volumes in insertion order.
    fn volumes(&self) -> Vec<VolumeIndex>;

    /// Applies a new GPU memory budget.
    fn gpu_mem_limit_changed(&mut self, budget: GpuMemoryBudget);

    /// Releases every resource of the view.
    fn close(&mut self);

    /// Returns self as `Any` for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Returns self as mutable `Any` for downcasting.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// The available view modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewKind {
    /// Side by side volume renderings, optionally paged in one composite.
    Juxtaposition,
    /// Label isosurfaces of the combined volumes.
    ExplicitEncoding,
}

impl ViewKind {
    /// All view kinds, in tab order.
    pub const ALL: [ViewKind; 2] = [ViewKind::Juxtaposition, ViewKind::ExplicitEncoding];

    /// Returns the display name.
    pub fn name(self) -> &'static str {
        match self {
            ViewKind::Juxtaposition => "Juxtaposition/Interchangeable",
            ViewKind::ExplicitEncoding => "Explicit Encoding",
        }
    }
}

impl fmt::Display for ViewKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ViewKind {
    type Err = VolscopeError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "juxtaposition" | "interchangeable" | "juxtaposition/interchangeable" => {
                Ok(ViewKind::Juxtaposition)
            }
            "explicit" | "explicit encoding" | "explicit_encoding" => {
                Ok(ViewKind::ExplicitEncoding)
            }
            _ => Err(VolscopeError::unknown("view", s)),
        }
    }
}

/// Creates an inactive view of `kind` for data with `geometry`.
pub fn create_view(kind: ViewKind, geometry: GridGeometry, settings: &Settings) -> Box<dyn DataView> {
    match kind {
        ViewKind::Juxtaposition => Box::new(JuxtapositionView::new(geometry, settings)),
        ViewKind::ExplicitEncoding => Box::new(ExplicitEncodingView::new(geometry, settings)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::UVec3;

    #[test]
    fn test_create_view() {
        let geometry = GridGeometry::with_dims(UVec3::new(4, 4, 4));
        for kind in ViewKind::ALL {
            let view = create_view(kind, geometry, &Settings::default());
            assert_eq!(view.kind(), kind);
            assert_eq!(view.name(), kind.name());
            assert!(!view.is_active());
            assert!(view.volumes().is_empty());
        }
    }

    #[test]
    fn test_parse_kind() {
        assert_eq!("Explicit".parse::<ViewKind>().unwrap(), ViewKind::ExplicitEncoding);
        assert_eq!(
            "juxtaposition".parse::<ViewKind>().unwrap(),
            ViewKind::Juxtaposition
        );
        assert!("tabs".parse::<ViewKind>().is_err());
    }

    #[test]
    fn test_downcast() {
        let geometry = GridGeometry::with_dims(UVec3::new(2, 2, 2));
        let mut view = create_view(ViewKind::Juxtaposition, geometry, &Settings::default());
        assert!(view.as_any().downcast_ref::<JuxtapositionView>().is_some());
        assert!(view
            .as_any_mut()
            .downcast_mut::<ExplicitEncodingView>()
            .is_none());
    }
}
