//! Software rasterization of isosurface meshes.

#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]

use glam::{Vec2, Vec3};
use image::{Rgba, RgbaImage};
use volscope_core::IsoMesh;

use crate::camera::Camera;

/// One colored mesh to draw.
#[derive(Debug, Clone, Copy)]
pub struct MeshLayer<'a> {
    /// Triangles in world space.
    pub mesh: &'a IsoMesh,
    /// Base color.
    pub color: Vec3,
    /// Opacity in `[0, 1]`. Only opaque layers write depth.
    pub opacity: f32,
}

struct Projected {
    screen: Vec2,
    depth: f32,
    normal: Vec3,
}

/// Draws `layers` in order with a depth test and headlight shading.
pub fn rasterize(layers: &[MeshLayer<'_>], camera: &Camera, background: Vec3, target: &mut RgbaImage) {
    let (width, height) = target.dimensions();
    if width == 0 || height == 0 {
        return;
    }
    let size = Vec2::new(width as f32, height as f32);
    let view_projection = camera.view_projection_matrix(size.x / size.y);
    let light = -camera.forward();
    let len = width as usize * height as usize;
    let mut depth = vec![f32::INFINITY; len];
    let mut color = vec![background; len];

    let project = |mesh: &IsoMesh, i: u32| -> Option<Projected> {
        let i = i as usize;
        let clip = view_projection * mesh.vertices[i].extend(1.0);
        if clip.w <= f32::EPSILON {
            return None;
        }
        let ndc = clip.truncate() / clip.w;
        Some(Projected {
            screen: Vec2::new((ndc.x + 1.0) * 0.5 * size.x, (1.0 - ndc.y) * 0.5 * size.y),
            depth: ndc.z,
            normal: mesh.normals.get(i).copied().unwrap_or(Vec3::ZERO),
        })
    };

    for layer in layers {
        let opacity = layer.opacity.clamp(0.0, 1.0);
        if opacity == 0.0 {
            continue;
        }
        for tri in layer.mesh.indices.chunks_exact(3) {
            let (Some(a), Some(b), Some(c)) = (
                project(layer.mesh, tri[0]),
                project(layer.mesh, tri[1]),
                project(layer.mesh, tri[2]),
            ) else {
                continue;
            };
            let area = edge(a.screen, b.screen, c.screen);
            if area.abs() <= f32::EPSILON {
                continue;
            }
            let min = a.screen.min(b.screen).min(c.screen).floor().max(Vec2::ZERO);
            let max = a.screen.max(b.screen).max(c.screen).ceil().min(size);

            for y in min.y as u32..max.y as u32 {
                for x in min.x as u32..max.x as u32 {
                    let p = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
                    let wa = edge(b.screen, c.screen, p) / area;
                    let wb = edge(c.screen, a.screen, p) / area;
                    let wc = edge(a.screen, b.screen, p) / area;
                    if wa < 0.0 || wb < 0.0 || wc < 0.0 {
                        continue;
                    }
                    let z = wa * a.depth + wb * b.depth + wc * c.depth;
                    let i = (y * width + x) as usize;
                    if z >= depth[i] {
                        continue;
                    }
                    let normal = (wa * a.normal + wb * b.normal + wc * c.normal).normalize_or_zero();
                    let shade = 0.3 + 0.7 * normal.dot(light).abs();
                    color[i] = layer.color * shade * opacity + color[i] * (1.0 - opacity);
                    if opacity >= 1.0 {
                        depth[i] = z;
                    }
                }
            }
        }
    }

    for (pixel, c) in target.pixels_mut().zip(color) {
        let c = (c.clamp(Vec3::ZERO, Vec3::ONE) * 255.0).round();
        *pixel = Rgba([c.x as u8, c.y as u8, c.z as u8, 255]);
    }
}

fn edge(a: Vec2, b: Vec2, p: Vec2) -> f32 {
    (b - a).perp_dot(p - a)
}
