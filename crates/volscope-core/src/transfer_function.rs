//! Per-label transfer functions.
//!
//! Every label `i` owns two nodes in each function, at `i - 0.5` and `i + 0.5`
//! (clamped to `[0, N]`), carrying the same value. Scalars within half a unit
//! of an integer label therefore map to a flat band instead of a gradient
//! between neighboring labels.

use glam::Vec3;

use crate::error::{Result, VolscopeError};
use crate::labels::LabelSetting;

/// Values that can be linearly interpolated between two nodes.
pub trait Interpolate: Copy + Default {
    /// Returns `self + (other - self) * t`.
    fn interpolate(self, other: Self, t: f32) -> Self;
}

impl Interpolate for f32 {
    fn interpolate(self, other: Self, t: f32) -> Self {
        self + (other - self) * t
    }
}

impl Interpolate for Vec3 {
    fn interpolate(self, other: Self, t: f32) -> Self {
        self.lerp(other, t)
    }
}

/// One node of a [`PiecewiseFunction`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PiecewiseNode<T> {
    /// Scalar position.
    pub x: f32,
    /// Value at `x`.
    pub value: T,
}

/// A piecewise-linear function over sorted nodes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PiecewiseFunction<T> {
    nodes: Vec<PiecewiseNode<T>>,
}

impl<T: Interpolate> PiecewiseFunction<T> {
    /// Creates a function from nodes sorted by `x`.
    pub fn from_nodes(nodes: Vec<PiecewiseNode<T>>) -> Self {
        debug_assert!(nodes.windows(2).all(|w| w[0].x <= w[1].x));
        Self { nodes }
    }

    /// Returns the nodes.
    pub fn nodes(&self) -> &[PiecewiseNode<T>] {
        &self.nodes
    }

    /// Overwrites the value of the node at `index`.
    pub fn set_value(&mut self, index: usize, value: T) {
        self.nodes[index].value = value;
    }

    /// Evaluates the function, holding the end values outside the node range.
    pub fn evaluate(&self, x: f32) -> T {
        let (Some(first), Some(last)) = (self.nodes.first(), self.nodes.last()) else {
            return T::default();
        };
        if x <= first.x {
            return first.value;
        }
        if x >= last.x {
            return last.value;
        }
        // First node strictly right of x; the segment is [upper - 1, upper].
        let upper = self.nodes.partition_point(|n| n.x <= x);
        let a = self.nodes[upper - 1];
        let b = self.nodes[upper];
        let span = b.x - a.x;
        if span <= f32::EPSILON {
            return a.value;
        }
        a.value.interpolate(b.value, (x - a.x) / span)
    }
}

/// Flat-banded color and opacity functions for `N` labels.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferFunctionTable {
    colors: PiecewiseFunction<Vec3>,
    opacities: PiecewiseFunction<f32>,
    num_labels: usize,
    revision: u64,
}

impl TransferFunctionTable {
    /// Creates a table from one color and one opacity per label.
    pub fn new(colors: &[Vec3], opacities: &[f32]) -> Result<Self> {
        if colors.len() != opacities.len() {
            return Err(VolscopeError::SizeMismatch {
                expected: colors.len(),
                actual: opacities.len(),
            });
        }
        let num_labels = colors.len();
        Ok(Self {
            colors: banded(colors, num_labels),
            opacities: banded(
                &opacities.iter().map(|o| o.clamp(0.0, 1.0)).collect::<Vec<_>>(),
                num_labels,
            ),
            num_labels,
            revision: 0,
        })
    }

    /// Creates a table from label defaults with one opacity for every label.
    pub fn from_labels(labels: &[LabelSetting], opacity: f32) -> Self {
        let colors: Vec<Vec3> = labels.iter().map(|l| l.default_color).collect();
        let opacities = vec![opacity.clamp(0.0, 1.0); labels.len()];
        Self {
            colors: banded(&colors, labels.len()),
            opacities: banded(&opacities, labels.len()),
            num_labels: labels.len(),
            revision: 0,
        }
    }

    /// Returns the number of labels.
    pub fn num_labels(&self) -> usize {
        self.num_labels
    }

    /// Returns a counter bumped by every edit.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Sets the color of a label.
    pub fn set_label_color(&mut self, label: usize, color: Vec3) -> Result<()> {
        self.check_label(label)?;
        self.colors.set_value(2 * label, color);
        self.colors.set_value(2 * label + 1, color);
        self.revision += 1;
        Ok(())
    }

    /// Sets the opacity of a label, clamped to `[0, 1]`.
    pub fn set_label_opacity(&mut self, label: usize, opacity: f32) -> Result<()> {
        self.check_label(label)?;
        let opacity = opacity.clamp(0.0, 1.0);
        self.opacities.set_value(2 * label, opacity);
        self.opacities.set_value(2 * label + 1, opacity);
        self.revision += 1;
        Ok(())
    }

    /// Returns the color of a label.
    pub fn label_color(&self, label: usize) -> Result<Vec3> {
        self.check_label(label)?;
        Ok(self.colors.nodes()[2 * label].value)
    }

    /// Returns the opacity of a label.
    pub fn label_opacity(&self, label: usize) -> Result<f32> {
        self.check_label(label)?;
        Ok(self.opacities.nodes()[2 * label].value)
    }

    /// Evaluates the color function at a scalar value.
    pub fn color_at(&self, scalar: f32) -> Vec3 {
        self.colors.evaluate(scalar)
    }

    /// Evaluates the opacity function at a scalar value.
    pub fn opacity_at(&self, scalar: f32) -> f32 {
        self.opacities.evaluate(scalar)
    }

    /// Returns the color function.
    pub fn colors(&self) -> &PiecewiseFunction<Vec3> {
        &self.colors
    }

    /// Returns the opacity function.
    pub fn opacities(&self) -> &PiecewiseFunction<f32> {
        &self.opacities
    }

    fn check_label(&self, label: usize) -> Result<()> {
        if label < self.num_labels {
            Ok(())
        } else {
            Err(VolscopeError::LabelOutOfRange {
                label,
                count: self.num_labels,
            })
        }
    }
}

#[allow(clippy::cast_precision_loss)]
fn banded<T: Interpolate>(values: &[T], num_labels: usize) -> PiecewiseFunction<T> {
    let n = num_labels as f32;
    let nodes = values
        .iter()
        .enumerate()
        .flat_map(|(i, &value)| {
            let center = i as f32;
            [
                PiecewiseNode {
                    x: (center - 0.5).clamp(0.0, n),
                    value,
                },
                PiecewiseNode {
                    x: (center + 0.5).clamp(0.0, n),
                    value,
                },
            ]
        })
        .collect();
    PiecewiseFunction::from_nodes(nodes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labels::brainweb_labels;
    use proptest::prelude::*;

    fn table() -> TransferFunctionTable {
        TransferFunctionTable::from_labels(&brainweb_labels(), 0.5)
    }

    #[test]
    fn test_node_layout() {
        let t = table();
        let nodes = t.opacities().nodes();
        assert_eq!(nodes.len(), 24);
        assert_eq!(nodes[0].x, 0.0);
        assert_eq!(nodes[1].x, 0.5);
        assert_eq!(nodes[6].x, 2.5);
        assert_eq!(nodes[7].x, 3.5);
        assert_eq!(nodes[23].x, 11.5);
    }

    #[test]
    fn test_flat_bands() {
        let mut t = table();
        t.set_label_opacity(4, 0.9).unwrap();
        t.set_label_opacity(5, 0.1).unwrap();
        assert_eq!(t.opacity_at(4.0), 0.9);
        assert_eq!(t.opacity_at(4.3), 0.9);
        assert_eq!(t.opacity_at(3.8), 0.9);
        assert_eq!(t.opacity_at(5.0), 0.1);
        assert_eq!(t.opacity_at(5.45), 0.1);
    }

    #[test]
    fn test_edit_bumps_revision() {
        let mut t = table();
        assert_eq!(t.revision(), 0);
        t.set_label_color(1, Vec3::X).unwrap();
        t.set_label_opacity(1, 1.0).unwrap();
        assert_eq!(t.revision(), 2);
    }

    #[test]
    fn test_label_out_of_range() {
        let mut t = table();
        assert!(matches!(
            t.set_label_opacity(12, 1.0),
            Err(VolscopeError::LabelOutOfRange {
                label: 12,
                count: 12
            })
        ));
        assert_eq!(t.revision(), 0);
    }

    #[test]
    fn test_opacity_is_clamped() {
        let mut t = table();
        t.set_label_opacity(2, 4.0).unwrap();
        assert_eq!(t.label_opacity(2).unwrap(), 1.0);
    }

    #[test]
    fn test_mismatched_lengths() {
        assert!(TransferFunctionTable::new(&[Vec3::ONE], &[]).is_err());
    }

    #[test]
    fn test_empty_function_evaluates_default() {
        let f = PiecewiseFunction::<f32>::default();
        assert_eq!(f.evaluate(3.0), 0.0);
    }

    proptest! {
        #[test]
        fn prop_color_round_trip(label in 0usize..12, r in 0.0f32..=1.0, g in 0.0f32..=1.0, b in 0.0f32..=1.0) {
            let mut t = table();
            let color = Vec3::new(r, g, b);
            t.set_label_color(label, color).unwrap();
            prop_assert_eq!(t.label_color(label).unwrap(), color);
            prop_assert_eq!(t.color_at(label as f32), color);
        }

        #[test]
        fn prop_opacity_round_trip(label in 0usize..12, v in 0.0f32..=1.0) {
            let mut t = table();
            t.set_label_opacity(label, v).unwrap();
            prop_assert_eq!(t.label_opacity(label).unwrap(), v);
            prop_assert_eq!(t.opacity_at(label as f32), v);
        }
    }
}
