//! Synthetic labeled head phantoms.
//!
//! Each phantom is a stack of nested ellipsoidal tissue shells in BrainWeb
//! label values. Shell radii are jittered per volume so that a series of
//! phantoms differs the way scans of different subjects do.

use glam::{UVec3, Vec3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use volscope_core::{GridGeometry, InMemorySource, Result, ScalarGrid, VoxelFormat};

/// Tissue shells from the outside in, as (label, radius relative to the head).
const SHELLS: [(u8, f32); 6] = [
    (6, 1.0),  // muscle/skin
    (7, 0.9),  // skull
    (1, 0.8),  // cerebrospinal fluid
    (2, 0.72), // gray matter
    (3, 0.55), // white matter
    (1, 0.12), // ventricles
];

/// Label of the small vessel blob placed off-center.
const VESSEL_LABEL: u8 = 8;

/// Parameters of a phantom series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhantomSpec {
    /// Grid points per axis.
    pub dims: UVec3,
    /// Maximum relative change of each shell radius.
    pub jitter: f32,
    /// Seed of the series; the same seed yields the same volumes.
    pub seed: u64,
}

impl Default for PhantomSpec {
    fn default() -> Self {
        Self {
            dims: UVec3::splat(32),
            jitter: 0.06,
            seed: 0x5EED,
        }
    }
}

impl PhantomSpec {
    /// Returns the unit-spaced geometry of the phantoms.
    pub fn geometry(&self) -> GridGeometry {
        GridGeometry::with_dims(self.dims)
    }

    /// Generates `count` phantoms.
    pub fn generate(&self, count: usize) -> Vec<ScalarGrid> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        (0..count).map(|_| self.phantom(&mut rng)).collect()
    }

    /// Generates `count` phantoms wrapped in a volume source.
    pub fn source(&self, count: usize) -> Result<InMemorySource> {
        InMemorySource::new(self.geometry(), self.generate(count))
    }

    fn phantom<R: Rng + ?Sized>(&self, rng: &mut R) -> ScalarGrid {
        let extent = (self.dims.max(UVec3::ONE) - UVec3::ONE).as_vec3();
        let center = extent * 0.5;
        // Heads are taller than wide, and slightly longer front to back.
        let head = extent * 0.5 * Vec3::new(0.8, 0.9, 0.85);

        let jitter = self.jitter.abs();
        let mut shells: Vec<(u8, Vec3)> = SHELLS
            .iter()
            .map(|&(label, scale)| {
                let wobble = Vec3::new(
                    1.0 + rng.gen_range(-jitter..=jitter),
                    1.0 + rng.gen_range(-jitter..=jitter),
                    1.0 + rng.gen_range(-jitter..=jitter),
                );
                (label, head * scale * wobble)
            })
            .collect();
        let vessel_center = center
            + head
                * Vec3::new(
                    rng.gen_range(-0.3..=0.3),
                    rng.gen_range(-0.3..=0.3),
                    rng.gen_range(0.4..=0.6),
                );
        shells.push((VESSEL_LABEL, head * 0.08));

        let mut grid = ScalarGrid::filled(self.dims, 0.0).with_format(VoxelFormat::U8);
        for z in 0..self.dims.z {
            for y in 0..self.dims.y {
                for x in 0..self.dims.x {
                    let p = UVec3::new(x, y, z).as_vec3();
                    let label = shells
                        .iter()
                        .rev()
                        .find(|(label, radii)| {
                            let c = if *label == VESSEL_LABEL {
                                vessel_center
                            } else {
                                center
                            };
                            inside(p - c, *radii)
                        })
                        .map_or(0, |(label, _)| *label);
                    grid.set(x, y, z, f32::from(label));
                }
            }
        }
        grid
    }
}

fn inside(offset: Vec3, radii: Vec3) -> bool {
    if radii.min_element() <= 0.0 {
        return false;
    }
    (offset / radii).length_squared() <= 1.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use volscope_core::VolumeSource;

    fn spec() -> PhantomSpec {
        PhantomSpec {
            dims: UVec3::splat(24),
            ..PhantomSpec::default()
        }
    }

    #[test]
    fn test_same_seed_same_volumes() {
        assert_eq!(spec().generate(2), spec().generate(2));
    }

    #[test]
    fn test_volumes_differ() {
        let volumes = spec().generate(2);
        assert_ne!(volumes[0], volumes[1]);
    }

    #[test]
    fn test_labels_present() {
        let grid = &spec().generate(1)[0];
        let center = grid.get(12, 12, 12);
        // The ventricles sit in the middle.
        assert_eq!(center, 1.0);
        assert_eq!(grid.get(0, 0, 0), 0.0);
        for label in [2.0, 3.0, 6.0, 7.0] {
            assert!(grid.values().contains(&label), "label {label} missing");
        }
    }

    #[test]
    fn test_phantoms_are_byte_labels() {
        let grid = &spec().generate(1)[0];
        assert_eq!(grid.format(), VoxelFormat::U8);
        assert_eq!(grid.memory_footprint(), 24 * 24 * 24);
    }

    #[test]
    fn test_source() {
        let source = spec().source(3).unwrap();
        assert_eq!(source.count(), 3);
        assert_eq!(source.geometry().dims, UVec3::splat(24));
    }
}
