//! CPU ray casting of label volumes.

#![allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]

use glam::{Vec2, Vec3};
use image::{Rgba, RgbaImage};
use volscope_core::{GridGeometry, ScalarGrid};

use crate::backend::RenderParams;

/// Front-to-back compositing ray caster with nearest-neighbor sampling.
#[derive(Debug, Clone)]
pub struct RayCaster {
    /// Samples per voxel along a ray at full quality.
    pub samples_per_voxel: f32,
    /// Accumulated opacity at which a ray stops.
    pub termination: f32,
}

impl Default for RayCaster {
    fn default() -> Self {
        Self {
            samples_per_voxel: 2.0,
            termination: 0.99,
        }
    }
}

impl RayCaster {
    /// Renders `params` into every pixel of `target`.
    pub fn render(&self, params: &RenderParams<'_>, target: &mut RgbaImage) {
        let (width, height) = target.dimensions();
        if width == 0 || height == 0 {
            return;
        }
        let background = rgba8(params.background);
        if params.grid.is_empty() {
            for pixel in target.pixels_mut() {
                *pixel = background;
            }
            return;
        }

        let size = Vec2::new(width as f32, height as f32);
        let clip_to_local =
            (params.camera.view_projection_matrix(size.x / size.y) * params.model).inverse();
        let (box_min, box_max) = params.geometry.bounds();
        let (step, unit) = self.step_length(params);

        for (x, y, pixel) in target.enumerate_pixels_mut() {
            let ndc = Vec2::new(
                (x as f32 + 0.5) / size.x * 2.0 - 1.0,
                1.0 - (y as f32 + 0.5) / size.y * 2.0,
            );
            let near = clip_to_local.project_point3(ndc.extend(0.0));
            let far = clip_to_local.project_point3(ndc.extend(1.0));
            let dir = (far - near).normalize_or_zero();

            *pixel = match intersect_box(near, dir, box_min, box_max) {
                Some((t_enter, t_exit)) => {
                    let ray = Ray {
                        origin: near,
                        dir,
                        t_enter,
                        t_exit,
                    };
                    let (color, alpha) = self.march(params, &ray, step, unit);
                    rgba8(color + (1.0 - alpha) * params.background)
                }
                None => background,
            };
        }
    }

    /// Returns the sample distance and the opacity unit length for a frame.
    pub fn step_length(&self, params: &RenderParams<'_>) -> (f32, f32) {
        let unit = params.geometry.min_spacing().max(f32::EPSILON);
        let step = unit / self.samples_per_voxel * params.sample_scale.max(1.0);
        (step, unit)
    }

    fn march(&self, params: &RenderParams<'_>, ray: &Ray, step: f32, unit: f32) -> (Vec3, f32) {
        let geometry = params.geometry;
        let mut color = Vec3::ZERO;
        let mut alpha = 0.0_f32;
        let mut t = ray.t_enter + step * 0.5;
        while t <= ray.t_exit {
            let p = (ray.origin + ray.dir * t - geometry.origin) / geometry.spacing;
            let voxel = p.round().as_i64vec3();
            let scalar = params.grid.get_clamped(voxel.x, voxel.y, voxel.z);
            let opacity = params.transfer.opacity_at(scalar);
            if opacity > 0.0 {
                // Opacities are defined per unit of the smallest spacing.
                let opacity = 1.0 - (1.0 - opacity).powf(step / unit);
                let mut sample = params.transfer.color_at(scalar);
                if params.shaded {
                    sample *= shade(params.grid, geometry, voxel, ray.dir);
                }
                color += (1.0 - alpha) * opacity * sample;
                alpha += (1.0 - alpha) * opacity;
                if alpha >= self.termination {
                    break;
                }
            }
            t += step;
        }
        (color, alpha)
    }
}

struct Ray {
    origin: Vec3,
    dir: Vec3,
    t_enter: f32,
    t_exit: f32,
}

/// Returns the parametric entry and exit of a ray through a box.
fn intersect_box(origin: Vec3, dir: Vec3, min: Vec3, max: Vec3) -> Option<(f32, f32)> {
    if dir == Vec3::ZERO {
        return None;
    }
    let inv = dir.recip();
    let t0 = (min - origin) * inv;
    let t1 = (max - origin) * inv;
    let t_enter = t0.min(t1).max_element().max(0.0);
    let t_exit = t0.max(t1).min_element();
    (t_exit >= t_enter).then_some((t_enter, t_exit))
}

/// Headlight diffuse term from the central-difference gradient.
fn shade(grid: &ScalarGrid, geometry: &GridGeometry, v: glam::I64Vec3, dir: Vec3) -> f32 {
    let g = Vec3::new(
        grid.get_clamped(v.x + 1, v.y, v.z) - grid.get_clamped(v.x - 1, v.y, v.z),
        grid.get_clamped(v.x, v.y + 1, v.z) - grid.get_clamped(v.x, v.y - 1, v.z),
        grid.get_clamped(v.x, v.y, v.z + 1) - grid.get_clamped(v.x, v.y, v.z - 1),
    ) / geometry.spacing;
    let n = g.normalize_or_zero();
    if n == Vec3::ZERO {
        return 1.0;
    }
    0.3 + 0.7 * n.dot(dir).abs()
}

#[allow(clippy::cast_sign_loss)]
fn rgba8(color: Vec3) -> Rgba<u8> {
    let c = (color.clamp(Vec3::ZERO, Vec3::ONE) * 255.0).round();
    Rgba([c.x as u8, c.y as u8, c.z as u8, 255])
}
