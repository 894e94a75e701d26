//! Label-wise combination of several volumes into one scalar field.
//!
//! Every operator reduces the per-volume masks of one label into a single
//! grid, from which an isosurface is extracted.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, VolscopeError};
use crate::marching_cubes::{marching_cubes, IsoMesh};
use crate::volume::{GridGeometry, ScalarGrid};

/// How the masks of one label are combined across volumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum VolumeOperator {
    /// Voxels carrying the label in at least one volume.
    #[default]
    Union,
    /// Voxels carrying the label in every volume.
    Intersection,
    /// Number of volumes carrying the label at each voxel.
    Addition,
}

impl VolumeOperator {
    /// All operators, in index order.
    pub const ALL: [VolumeOperator; 3] = [
        VolumeOperator::Union,
        VolumeOperator::Intersection,
        VolumeOperator::Addition,
    ];

    /// Returns display name.
    pub fn name(self) -> &'static str {
        match self {
            VolumeOperator::Union => "union",
            VolumeOperator::Intersection => "intersection",
            VolumeOperator::Addition => "addition",
        }
    }

    /// Returns true if the isovalue is chosen by the caller.
    ///
    /// Union and intersection produce binary masks and always use 1.
    pub fn uses_iso_value(self) -> bool {
        matches!(self, VolumeOperator::Addition)
    }

    /// Returns the isovalue to extract for this operator.
    pub fn effective_iso_value(self, iso_value: f32) -> f32 {
        if self.uses_iso_value() {
            iso_value
        } else {
            1.0
        }
    }
}

impl fmt::Display for VolumeOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<u32> for VolumeOperator {
    type Error = VolscopeError;

    fn try_from(value: u32) -> Result<Self> {
        Self::ALL
            .get(value as usize)
            .copied()
            .ok_or_else(|| VolscopeError::unknown("volume operator", value))
    }
}

impl FromStr for VolumeOperator {
    type Err = VolscopeError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|op| op.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| VolscopeError::unknown("volume operator", s))
    }
}

/// Isosurface of one label.
#[derive(Debug, Clone)]
pub struct LabelSurface {
    /// The label the surface encloses.
    pub label: u8,
    /// Extracted mesh in world coordinates.
    pub mesh: IsoMesh,
}

/// Combines the masks of `label` over `volumes`.
///
/// Union and intersection yield a 0/1 mask; addition yields the per-voxel
/// count of volumes holding the label. All volumes must share dimensions.
pub fn combine_label(volumes: &[&ScalarGrid], label: u8, op: VolumeOperator) -> Result<ScalarGrid> {
    let Some(first) = volumes.first() else {
        return Err(VolscopeError::SizeMismatch {
            expected: 1,
            actual: 0,
        });
    };
    let dims = first.dims();
    for grid in &volumes[1..] {
        grid.ensure_dims(dims)?;
    }

    let target = f32::from(label);
    let mut combined = match op {
        VolumeOperator::Intersection => ScalarGrid::filled(dims, 1.0),
        VolumeOperator::Union | VolumeOperator::Addition => ScalarGrid::filled(dims, 0.0),
    };
    for grid in volumes {
        for (out, &v) in combined.values_mut().iter_mut().zip(grid.values()) {
            // Labels are stored as integral floats.
            #[allow(clippy::float_cmp)]
            let hit = v == target;
            match op {
                VolumeOperator::Union => {
                    if hit {
                        *out = 1.0;
                    }
                }
                VolumeOperator::Intersection => {
                    if !hit {
                        *out = 0.0;
                    }
                }
                VolumeOperator::Addition => {
                    if hit {
                        *out += 1.0;
                    }
                }
            }
        }
    }
    Ok(combined)
}

/// Extracts one isosurface per label from the combination of `volumes`.
///
/// Returns no surfaces when either `volumes` or `labels` is empty.
pub fn produce_surfaces(
    volumes: &[&ScalarGrid],
    labels: &[u8],
    op: VolumeOperator,
    iso_value: f32,
    geometry: &GridGeometry,
) -> Result<Vec<LabelSurface>> {
    if volumes.is_empty() || labels.is_empty() {
        return Ok(Vec::new());
    }
    for grid in volumes {
        grid.ensure_dims(geometry.dims)?;
    }

    let iso = op.effective_iso_value(iso_value);
    labels
        .iter()
        .map(|&label| {
            let combined = combine_label(volumes, label, op)?;
            let mesh = marching_cubes(&combined, iso, geometry);
            log::debug!(
                "label {label} ({op}, iso {iso}): {} triangles",
                mesh.num_triangles()
            );
            Ok(LabelSurface { label, mesh })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::UVec3;

    /// 4x4x4 grid of label 0 with a 2x2x2 block of `label` starting at `at`.
    fn block(label: u8, at: UVec3) -> ScalarGrid {
        let mut grid = ScalarGrid::filled(UVec3::splat(4), 0.0);
        for z in at.z..at.z + 2 {
            for y in at.y..at.y + 2 {
                for x in at.x..at.x + 2 {
                    grid.set(x, y, z, f32::from(label));
                }
            }
        }
        grid
    }

    fn count_ones(grid: &ScalarGrid) -> usize {
        grid.values().iter().filter(|&&v| v >= 1.0).count()
    }

    #[test]
    fn test_union_and_intersection() {
        let a = block(3, UVec3::ZERO);
        let b = block(3, UVec3::new(1, 0, 0));
        let union = combine_label(&[&a, &b], 3, VolumeOperator::Union).unwrap();
        let inter = combine_label(&[&a, &b], 3, VolumeOperator::Intersection).unwrap();
        assert_eq!(count_ones(&union), 12);
        assert_eq!(count_ones(&inter), 4);
        assert!(union.values().iter().all(|&v| v == 0.0 || v == 1.0));
    }

    #[test]
    fn test_addition_counts() {
        let a = block(2, UVec3::ZERO);
        let b = block(2, UVec3::ZERO);
        let c = block(2, UVec3::splat(2));
        let sum = combine_label(&[&a, &b, &c], 2, VolumeOperator::Addition).unwrap();
        assert_eq!(sum.get(0, 0, 0), 2.0);
        assert_eq!(sum.get(3, 3, 3), 1.0);
        assert_eq!(sum.get(3, 0, 0), 0.0);
    }

    #[test]
    fn test_shape_mismatch() {
        let a = block(1, UVec3::ZERO);
        let b = ScalarGrid::filled(UVec3::new(4, 4, 5), 1.0);
        assert!(matches!(
            combine_label(&[&a, &b], 1, VolumeOperator::Union),
            Err(VolscopeError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_empty_inputs_produce_nothing() {
        let geometry = GridGeometry::with_dims(UVec3::splat(4));
        let a = block(1, UVec3::ZERO);
        assert!(produce_surfaces(&[], &[1], VolumeOperator::Union, 1.0, &geometry)
            .unwrap()
            .is_empty());
        assert!(produce_surfaces(&[&a], &[], VolumeOperator::Union, 1.0, &geometry)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_addition_threshold() {
        let geometry = GridGeometry::with_dims(UVec3::splat(4));
        let a = block(5, UVec3::new(1, 1, 1));
        let b = block(5, UVec3::new(1, 1, 1));
        let low = produce_surfaces(&[&a, &b], &[5], VolumeOperator::Addition, 1.0, &geometry)
            .unwrap();
        let above = produce_surfaces(&[&a, &b], &[5], VolumeOperator::Addition, 2.5, &geometry)
            .unwrap();
        assert_eq!(low.len(), 1);
        assert!(!low[0].mesh.is_empty());
        assert!(above[0].mesh.is_empty());
    }

    #[test]
    fn test_union_ignores_iso_value() {
        assert_eq!(VolumeOperator::Union.effective_iso_value(7.0), 1.0);
        assert_eq!(VolumeOperator::Addition.effective_iso_value(7.0), 7.0);
    }

    #[test]
    fn test_operator_parsing() {
        assert_eq!(VolumeOperator::try_from(2).unwrap(), VolumeOperator::Addition);
        assert_eq!(
            "Intersection".parse::<VolumeOperator>().unwrap(),
            VolumeOperator::Intersection
        );
        assert!(VolumeOperator::try_from(3).is_err());
    }
}
