//! Anatomical label tables.

use glam::Vec3;

/// Name and default color of one integer label.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelSetting {
    /// The label value stored in the voxels.
    pub label: u8,
    /// Human-readable tissue name.
    pub name: &'static str,
    /// Default display color (linear RGB in `[0, 1]`).
    pub default_color: Vec3,
}

/// Converts an 8-bit RGB triple to a color in `[0, 1]`.
pub fn rgb8(r: u8, g: u8, b: u8) -> Vec3 {
    Vec3::new(f32::from(r), f32::from(g), f32::from(b)) / 255.0
}

/// Converts a color in `[0, 1]` to an 8-bit RGB triple.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn to_rgb8(color: Vec3) -> [u8; 3] {
    let c = (color.clamp(Vec3::ZERO, Vec3::ONE) * 255.0).round();
    [c.x as u8, c.y as u8, c.z as u8]
}

/// The 12 tissue classes of the BrainWeb anatomical phantom.
pub fn brainweb_labels() -> Vec<LabelSetting> {
    let table = [
        ("Background", rgb8(0, 0, 0)),
        ("Cerebrospinal Fluid", rgb8(227, 207, 87)),
        ("Gray Matter", rgb8(192, 192, 192)),
        ("White Matter", rgb8(255, 255, 255)),
        ("Fat", rgb8(135, 38, 87)),
        ("Muscle", rgb8(255, 99, 71)),
        ("Muscle/Skin", rgb8(255, 125, 64)),
        ("Skull", rgb8(245, 222, 179)),
        ("Vessels", rgb8(0, 0, 255)),
        ("Around Fat", rgb8(189, 252, 201)),
        ("Dura Matter", rgb8(51, 161, 201)),
        ("Bone Marrow", rgb8(250, 128, 114)),
    ];
    table
        .into_iter()
        .zip(0u8..)
        .map(|((name, default_color), label)| LabelSetting {
            label,
            name,
            default_color,
        })
        .collect()
}
