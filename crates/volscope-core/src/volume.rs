//! Volume data model.
//!
//! A dataset is a list of [`ScalarGrid`]s that all share one [`GridGeometry`].
//! Grids are supplied by a [`VolumeSource`]; decoding files is left to the
//! application.

use std::borrow::Cow;

use glam::{UVec3, Vec3};
use serde::{Deserialize, Serialize};

use crate::error::{Result, VolscopeError};

/// Stable integer identity of a volume within its data source.
pub type VolumeIndex = usize;

/// Template geometry shared by every grid of a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridGeometry {
    /// Number of grid points along x, y and z.
    pub dims: UVec3,
    /// World position of grid point (0, 0, 0).
    pub origin: Vec3,
    /// Distance between neighboring grid points.
    pub spacing: Vec3,
}

impl GridGeometry {
    /// Creates a geometry.
    pub fn new(dims: UVec3, origin: Vec3, spacing: Vec3) -> Self {
        Self {
            dims,
            origin,
            spacing,
        }
    }

    /// Creates a geometry with unit spacing at the origin.
    pub fn with_dims(dims: UVec3) -> Self {
        Self::new(dims, Vec3::ZERO, Vec3::ONE)
    }

    /// Returns the number of grid points.
    pub fn num_points(&self) -> usize {
        self.dims.x as usize * self.dims.y as usize * self.dims.z as usize
    }

    /// Returns the world-space bounding box of the grid points.
    pub fn bounds(&self) -> (Vec3, Vec3) {
        let extent = (self.dims.max(UVec3::ONE) - UVec3::ONE).as_vec3() * self.spacing;
        (self.origin, self.origin + extent)
    }

    /// Returns the center of the bounding box.
    pub fn center(&self) -> Vec3 {
        let (min, max) = self.bounds();
        (min + max) * 0.5
    }

    /// Returns the smallest spacing component.
    pub fn min_spacing(&self) -> f32 {
        self.spacing.min_element()
    }

    /// Converts grid coordinates to a linear index (x varies fastest).
    #[inline]
    pub fn linear_index(&self, x: u32, y: u32, z: u32) -> usize {
        linear_index(self.dims, x, y, z)
    }
}

#[inline]
pub(crate) fn linear_index(dims: UVec3, x: u32, y: u32, z: u32) -> usize {
    (z as usize * dims.y as usize + y as usize) * dims.x as usize + x as usize
}

/// Width of one voxel in the volume's native encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum VoxelFormat {
    /// One byte per voxel, labels 0 to 255.
    U8,
    /// One 32-bit float per voxel.
    #[default]
    F32,
}

impl VoxelFormat {
    /// Returns the bytes per voxel.
    pub fn bytes_per_voxel(self) -> usize {
        match self {
            VoxelFormat::U8 => 1,
            VoxelFormat::F32 => 4,
        }
    }
}

/// A 3D grid of scalars, stored x-fastest.
///
/// Values are held as floats so that the same grid can feed interpolating
/// transfer functions. The [`VoxelFormat`] records how the volume is encoded
/// natively; it decides the footprint and the texel layout uploaded to the GPU.
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarGrid {
    dims: UVec3,
    values: Vec<f32>,
    format: VoxelFormat,
}

impl ScalarGrid {
    /// Creates a grid from raw values.
    pub fn new(dims: UVec3, values: Vec<f32>) -> Result<Self> {
        let expected = dims.x as usize * dims.y as usize * dims.z as usize;
        if values.len() != expected {
            return Err(VolscopeError::SizeMismatch {
                expected,
                actual: values.len(),
            });
        }
        Ok(Self {
            dims,
            values,
            format: VoxelFormat::F32,
        })
    }

    /// Creates a grid from one byte label per voxel.
    pub fn from_labels(dims: UVec3, labels: &[u8]) -> Result<Self> {
        let grid = Self::new(dims, labels.iter().map(|&l| f32::from(l)).collect())?;
        Ok(grid.with_format(VoxelFormat::U8))
    }

    /// Creates a grid with every voxel set to `value`.
    pub fn filled(dims: UVec3, value: f32) -> Self {
        let len = dims.x as usize * dims.y as usize * dims.z as usize;
        Self {
            dims,
            values: vec![value; len],
            format: VoxelFormat::F32,
        }
    }

    /// Returns the grid with its native encoding set to `format`.
    #[must_use]
    pub fn with_format(mut self, format: VoxelFormat) -> Self {
        self.format = format;
        self
    }

    /// Returns the native voxel encoding.
    pub fn format(&self) -> VoxelFormat {
        self.format
    }

    /// Returns the grid dimensions.
    pub fn dims(&self) -> UVec3 {
        self.dims
    }

    /// Returns the scalar values.
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Returns the scalar values mutably.
    pub fn values_mut(&mut self) -> &mut [f32] {
        &mut self.values
    }

    /// Returns the number of voxels.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if the grid has no voxels.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns the value at grid coordinates.
    #[inline]
    pub fn get(&self, x: u32, y: u32, z: u32) -> f32 {
        self.values[linear_index(self.dims, x, y, z)]
    }

    /// Returns the value at signed coordinates clamped into the grid.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn get_clamped(&self, x: i64, y: i64, z: i64) -> f32 {
        let max = self.dims.max(UVec3::ONE) - UVec3::ONE;
        let cx = x.clamp(0, i64::from(max.x)) as u32;
        let cy = y.clamp(0, i64::from(max.y)) as u32;
        let cz = z.clamp(0, i64::from(max.z)) as u32;
        self.get(cx, cy, cz)
    }

    /// Sets the value at grid coordinates.
    pub fn set(&mut self, x: u32, y: u32, z: u32, value: f32) {
        let idx = linear_index(self.dims, x, y, z);
        self.values[idx] = value;
    }

    /// Returns the voxels encoded in the native format, x-fastest.
    ///
    /// Byte volumes clamp each value to 0..=255.
    #[allow(clippy::cast_sign_loss)]
    pub fn texel_bytes(&self) -> Cow<'_, [u8]> {
        match self.format {
            VoxelFormat::F32 => Cow::Borrowed(bytemuck::cast_slice(&self.values)),
            VoxelFormat::U8 => Cow::Owned(
                self.values
                    .iter()
                    .map(|v| v.round().clamp(0.0, 255.0) as u8)
                    .collect(),
            ),
        }
    }

    /// Returns the byte size of the volume in its native format.
    pub fn memory_footprint(&self) -> usize {
        self.values.len() * self.format.bytes_per_voxel()
    }

    /// Checks that this grid matches the given dimensions.
    pub fn ensure_dims(&self, dims: UVec3) -> Result<()> {
        if self.dims == dims {
            Ok(())
        } else {
            Err(VolscopeError::ShapeMismatch {
                expected: dims.to_array(),
                actual: self.dims.to_array(),
            })
        }
    }
}

/// Supplier of the volumes a session can display.
pub trait VolumeSource {
    /// Returns the number of available volumes.
    fn count(&self) -> usize;

    /// Returns a copy of the grid at `index`.
    fn get(&self, index: VolumeIndex) -> Result<ScalarGrid>;

    /// Returns the geometry shared by all grids.
    fn geometry(&self) -> &GridGeometry;
}

/// A [`VolumeSource`] backed by grids already in memory.
#[derive(Debug, Clone)]
pub struct InMemorySource {
    geometry: GridGeometry,
    grids: Vec<ScalarGrid>,
}

impl InMemorySource {
    /// Creates a source, checking every grid against the geometry.
    pub fn new(geometry: GridGeometry, grids: Vec<ScalarGrid>) -> Result<Self> {
        for grid in &grids {
            grid.ensure_dims(geometry.dims)?;
        }
        Ok(Self { geometry, grids })
    }
}

impl VolumeSource for InMemorySource {
    fn count(&self) -> usize {
        self.grids.len()
    }

    fn get(&self, index: VolumeIndex) -> Result<ScalarGrid> {
        self.grids
            .get(index)
            .cloned()
            .ok_or(VolscopeError::VolumeNotFound(index))
    }

    fn geometry(&self) -> &GridGeometry {
        &self.geometry
    }
}
