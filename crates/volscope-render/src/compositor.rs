//! Weighted blending of off-screen buffers.

#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]

use glam::{UVec2, Vec3};
use image::{Rgba, RgbaImage};
use volscope_core::BlendMode;

/// Accumulates weighted layers into one image.
///
/// Layers are added in insertion order. With [`BlendMode::Over`] every layer
/// covers the accumulated result with its weight (times its own alpha) as
/// opacity, starting from the background. With [`BlendMode::Compound`] the
/// result is the weight-normalized average of all layers. Layers of another
/// size are resampled with nearest-neighbor lookup.
#[derive(Debug, Clone)]
pub struct Compositor {
    mode: BlendMode,
    size: UVec2,
    background: Vec3,
    color: Vec<Vec3>,
    total_weight: Vec<f32>,
    layers: usize,
}

impl Compositor {
    /// Starts a composite of `size` pixels.
    pub fn new(size: UVec2, mode: BlendMode, background: Vec3) -> Self {
        let len = size.x as usize * size.y as usize;
        let start = match mode {
            BlendMode::Over => background,
            BlendMode::Compound => Vec3::ZERO,
        };
        Self {
            mode,
            size,
            background,
            color: vec![start; len],
            total_weight: vec![0.0; len],
            layers: 0,
        }
    }

    /// Returns the number of layers added, including weight-0 layers.
    pub fn layers(&self) -> usize {
        self.layers
    }

    /// Adds one layer with a weight in `[0, 1]`.
    pub fn add_layer(&mut self, layer: &RgbaImage, weight: f32) {
        self.layers += 1;
        let weight = weight.clamp(0.0, 1.0);
        if weight == 0.0 || layer.width() == 0 || layer.height() == 0 {
            return;
        }
        let (lw, lh) = layer.dimensions();
        for y in 0..self.size.y {
            let sy = (u64::from(y) * u64::from(lh) / u64::from(self.size.y)) as u32;
            for x in 0..self.size.x {
                let sx = (u64::from(x) * u64::from(lw) / u64::from(self.size.x)) as u32;
                let Rgba([r, g, b, a]) = *layer.get_pixel(sx, sy);
                let src = Vec3::new(f32::from(r), f32::from(g), f32::from(b)) / 255.0;
                let alpha = weight * f32::from(a) / 255.0;
                let i = (y * self.size.x + x) as usize;
                match self.mode {
                    BlendMode::Over => {
                        self.color[i] = src * alpha + self.color[i] * (1.0 - alpha);
                    }
                    BlendMode::Compound => {
                        self.color[i] += src * alpha;
                        self.total_weight[i] += alpha;
                    }
                }
            }
        }
    }

    /// Writes the composite into `target`, reallocating it if the size differs.
    pub fn finish_into(&self, target: &mut RgbaImage) {
        if target.dimensions() != (self.size.x, self.size.y) {
            *target = RgbaImage::new(self.size.x, self.size.y);
        }
        for (i, pixel) in target.pixels_mut().enumerate() {
            let color = match self.mode {
                BlendMode::Over => self.color[i],
                BlendMode::Compound => {
                    let w = self.total_weight[i];
                    if w > 0.0 {
                        self.color[i] / w
                    } else {
                        self.background
                    }
                }
            };
            let c = (color.clamp(Vec3::ZERO, Vec3::ONE) * 255.0).round();
            *pixel = Rgba([c.x as u8, c.y as u8, c.z as u8, 255]);
        }
    }

    /// Returns the composite as a new image.
    pub fn finish(&self) -> RgbaImage {
        let mut image = RgbaImage::new(self.size.x, self.size.y);
        self.finish_into(&mut image);
        image
    }
}
