//! Blend weights for paging between composited volumes.
//!
//! Members of a composite are indexed by insertion position `x`. For a page
//! position `t`, a [`SmoothingLaw`] assigns each member an independent weight
//! in `[0, 1]`.

use std::f32::consts::PI;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::VolscopeError;

/// How weights fall off with distance from the page position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SmoothingLaw {
    /// Hard cut: exactly the member nearest to the page position.
    Discrete,
    /// Triangular crossfade between adjacent members.
    #[default]
    Linear,
    /// Cosine-eased crossfade between adjacent members.
    Ease,
    /// Every member at full weight, regardless of page position.
    All,
}

impl SmoothingLaw {
    /// All laws, in index order.
    pub const ALL: [SmoothingLaw; 4] = [
        SmoothingLaw::Discrete,
        SmoothingLaw::Linear,
        SmoothingLaw::Ease,
        SmoothingLaw::All,
    ];

    /// Returns the weight of the member at position `x` for page `t`.
    pub fn weight(self, x: f32, t: f32) -> f32 {
        let d = x - t;
        match self {
            SmoothingLaw::Discrete => {
                if (-0.5..0.5).contains(&d) {
                    1.0
                } else {
                    0.0
                }
            }
            SmoothingLaw::Linear => (1.0 - d.abs()).clamp(0.0, 1.0),
            SmoothingLaw::Ease => {
                if d.abs() <= 1.0 {
                    0.5 * (1.0 + (d * PI).cos())
                } else {
                    0.0
                }
            }
            SmoothingLaw::All => 1.0,
        }
    }

    /// Returns display name.
    pub fn name(self) -> &'static str {
        match self {
            SmoothingLaw::Discrete => "discrete",
            SmoothingLaw::Linear => "linear",
            SmoothingLaw::Ease => "ease",
            SmoothingLaw::All => "all",
        }
    }
}

impl fmt::Display for SmoothingLaw {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<u32> for SmoothingLaw {
    type Error = VolscopeError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::ALL
            .get(value as usize)
            .copied()
            .ok_or_else(|| VolscopeError::unknown("smoothing law", value))
    }
}

impl FromStr for SmoothingLaw {
    type Err = VolscopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|law| law.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| VolscopeError::unknown("smoothing law", s))
    }
}

/// Clamps a page position to `[0, count - 1]` (0 for an empty composite).
#[allow(clippy::cast_precision_loss)]
pub fn clamp_page(t: f32, count: usize) -> f32 {
    if count == 0 || t.is_nan() {
        return 0.0;
    }
    t.clamp(0.0, (count - 1) as f32)
}

/// Returns the weights of `count` members at page `t` (already clamped).
#[allow(clippy::cast_precision_loss)]
pub fn page_weights(count: usize, t: f32, law: SmoothingLaw) -> Vec<f32> {
    (0..count).map(|x| law.weight(x as f32, t)).collect()
}

/// How weighted layers are combined into one image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum BlendMode {
    /// Back-to-front over-blending in insertion order; each layer covers the
    /// accumulated result with its weight as opacity.
    #[default]
    Over,
    /// Order-independent weighted average normalized by the total weight.
    Compound,
}

impl TryFrom<u32> for BlendMode {
    type Error = VolscopeError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(BlendMode::Over),
            1 => Ok(BlendMode::Compound),
            _ => Err(VolscopeError::unknown("blend mode", value)),
        }
    }
}
