//! Soft GPU memory budget.
//!
//! Active surfaces are walked in insertion order; a surface renders on the
//! GPU while the running total of footprints stays below the limit and is
//! ray cast on the CPU after that. Exceeding the budget is never an error.

use std::fmt;

use volscope_render::RenderMode;

const BYTES_PER_MEGABYTE: u64 = 1 << 20;

/// Upper bound on the scalar bytes uploaded to the GPU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GpuMemoryBudget {
    limit: u64,
}

impl GpuMemoryBudget {
    /// Creates a budget of `megabytes` MiB.
    pub fn from_megabytes(megabytes: u64) -> Self {
        Self::from_bytes(megabytes.saturating_mul(BYTES_PER_MEGABYTE))
    }

    /// Creates a budget of `bytes` bytes.
    pub fn from_bytes(bytes: u64) -> Self {
        Self { limit: bytes }
    }

    /// Returns the limit in bytes.
    pub fn limit_bytes(self) -> u64 {
        self.limit
    }

    /// Returns true if `used` bytes stay below the limit.
    pub fn fits(self, used: u64) -> bool {
        used < self.limit
    }

    /// Assigns a render mode to each footprint, in order.
    pub fn assign(self, footprints: impl IntoIterator<Item = usize>) -> Vec<RenderMode> {
        let mut used = 0u64;
        footprints
            .into_iter()
            .map(|bytes| {
                used = used.saturating_add(bytes as u64);
                RenderMode::from_gpu(self.fits(used))
            })
            .collect()
    }
}

impl Default for GpuMemoryBudget {
    fn default() -> Self {
        Self::from_megabytes(1024)
    }
}

impl fmt::Display for GpuMemoryBudget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} MiB", self.limit / BYTES_PER_MEGABYTE)
    }
}

/// Assigns render modes to `footprints` (bytes, in insertion order).
pub fn assign_render_modes(footprints: &[usize], budget: GpuMemoryBudget) -> Vec<RenderMode> {
    budget.assign(footprints.iter().copied())
}
