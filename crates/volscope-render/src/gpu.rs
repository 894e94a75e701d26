//! Volume rendering on the GPU through wgpu.
//!
//! Every GPU-mode surface shares one headless device. Each [`GpuBackend`] owns
//! its volume texture, label table and off-screen target. They are created on
//! the first frame and dropped again by
//! [`RenderBackend::release_graphics_resources`], so the bytes a backend
//! reports as resident are the bytes it actually holds on the device.
//!
//! The fragment shader marches the same rays as [`RayCaster`], which also
//! serves as the fallback when a frame cannot be drawn on the device.

#![allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]

use std::sync::{Arc, OnceLock};

use glam::UVec3;
use image::RgbaImage;
use pollster::FutureExt;
use volscope_core::{ScalarGrid, VoxelFormat};

use crate::backend::{RenderBackend, RenderMode, RenderParams};
use crate::error::{RenderError, RenderResult};
use crate::raycast::RayCaster;

const OUTPUT_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// GPU representation of the ray-marching uniforms.
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct RaymarchUniforms {
    pub clip_to_local: [[f32; 4]; 4],
    pub box_min: [f32; 4],
    pub box_max: [f32; 4],
    pub origin: [f32; 4],
    pub spacing: [f32; 4],
    pub background: [f32; 4],
    pub viewport: [f32; 2],
    pub step: f32,
    pub unit: f32,
    pub termination: f32,
    pub value_scale: f32,
    pub shaded: u32, // 0 = flat, 1 = gradient shading
    pub label_count: u32,
}

impl RaymarchUniforms {
    /// Builds the uniforms for one frame of `width` x `height` pixels.
    pub fn new(params: &RenderParams<'_>, caster: &RayCaster, width: u32, height: u32) -> Self {
        let aspect = width as f32 / height as f32;
        let clip_to_local = (params.camera.view_projection_matrix(aspect) * params.model).inverse();
        let (box_min, box_max) = params.geometry.bounds();
        let (step, unit) = caster.step_length(params);
        Self {
            clip_to_local: clip_to_local.to_cols_array_2d(),
            box_min: box_min.extend(1.0).to_array(),
            box_max: box_max.extend(1.0).to_array(),
            origin: params.geometry.origin.extend(1.0).to_array(),
            spacing: params.geometry.spacing.extend(1.0).to_array(),
            background: params.background.extend(1.0).to_array(),
            viewport: [width as f32, height as f32],
            step,
            unit,
            termination: caster.termination,
            value_scale: match params.grid.format() {
                VoxelFormat::U8 => 255.0,
                VoxelFormat::F32 => 1.0,
            },
            shaded: u32::from(params.shaded),
            label_count: params.transfer.num_labels() as u32,
        }
    }
}

/// Device, queue and ray-marching pipeline shared by every GPU backend.
#[derive(Debug)]
pub struct GpuContext {
    device: wgpu::Device,
    queue: wgpu::Queue,
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
}

impl GpuContext {
    /// Creates a headless context on the best available adapter.
    pub async fn new_headless() -> RenderResult<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..wgpu::InstanceDescriptor::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .map_err(|_| RenderError::AdapterCreationFailed)?;
        let info = adapter.get_info();
        log::info!("volume rendering on {} ({:?})", info.name, info.backend);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("volscope device (headless)"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: wgpu::MemoryHints::default(),
                trace: wgpu::Trace::default(),
                experimental_features: wgpu::ExperimentalFeatures::default(),
            })
            .await?;

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Raymarch Bind Group Layout"),
            entries: &[
                // Uniforms
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                // Volume
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: false },
                        view_dimension: wgpu::TextureViewDimension::D3,
                        multisampled: false,
                    },
                    count: None,
                },
                // Label colors and opacities
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: true },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Raymarch Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/volume_raymarch.wgsl").into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Raymarch Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Raymarch Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: OUTPUT_FORMAT,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        Ok(Self {
            device,
            queue,
            pipeline,
            bind_group_layout,
        })
    }

    /// Returns the process-wide context, or `None` without a usable adapter.
    ///
    /// The adapter is requested once. A failure is logged once and remembered.
    pub fn shared() -> Option<Arc<GpuContext>> {
        static CONTEXT: OnceLock<Option<Arc<GpuContext>>> = OnceLock::new();
        CONTEXT
            .get_or_init(|| match Self::new_headless().block_on() {
                Ok(context) => Some(Arc::new(context)),
                Err(e) => {
                    log::warn!("GPU volume rendering unavailable, ray casting instead: {e}");
                    None
                }
            })
            .clone()
    }

    /// Returns the device.
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }
}

/// Returns true if GPU-mode surfaces render on an actual device.
pub fn gpu_available() -> bool {
    GpuContext::shared().is_some()
}

/// Volume texture, label table and bind group of one scalar grid.
#[derive(Debug)]
struct SceneResources {
    dims: UVec3,
    format: VoxelFormat,
    label_capacity: usize,
    volume_bytes: usize,
    uniform_buffer: wgpu::Buffer,
    label_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    // Kept alive for the bind group.
    _volume: wgpu::Texture,
}

impl SceneResources {
    fn new(context: &GpuContext, grid: &ScalarGrid, label_count: usize) -> RenderResult<Self> {
        let device = &context.device;
        let dims = grid.dims();
        let limit = device.limits().max_texture_dimension_3d;
        if dims.max_element() > limit {
            return Err(RenderError::VolumeTooLarge { dims, limit });
        }

        let format = grid.format();
        let texture_format = match format {
            VoxelFormat::U8 => wgpu::TextureFormat::R8Unorm,
            VoxelFormat::F32 => wgpu::TextureFormat::R32Float,
        };
        let extent = wgpu::Extent3d {
            width: dims.x,
            height: dims.y,
            depth_or_array_layers: dims.z,
        };
        let volume = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Volume Texture"),
            size: extent,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D3,
            format: texture_format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let texels = grid.texel_bytes();
        context.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &volume,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &texels,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(dims.x * format.bytes_per_voxel() as u32),
                rows_per_image: Some(dims.y),
            },
            extent,
        );
        log::debug!("uploaded {} bytes of volume data", texels.len());
        let view = volume.create_view(&wgpu::TextureViewDescriptor::default());

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Raymarch Uniform Buffer"),
            size: std::mem::size_of::<RaymarchUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        // A storage binding may not be empty.
        let label_capacity = label_count.max(1);
        let label_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Label Table Buffer"),
            size: (label_capacity * std::mem::size_of::<[f32; 4]>()) as u64,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Raymarch Bind Group"),
            layout: &context.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: label_buffer.as_entire_binding(),
                },
            ],
        });

        Ok(Self {
            dims,
            format,
            label_capacity,
            volume_bytes: grid.memory_footprint(),
            uniform_buffer,
            label_buffer,
            bind_group,
            _volume: volume,
        })
    }

    fn fits(&self, grid: &ScalarGrid, label_count: usize) -> bool {
        self.dims == grid.dims()
            && self.format == grid.format()
            && self.label_capacity == label_count.max(1)
    }
}

/// Off-screen color target and its readback buffer.
#[derive(Debug)]
struct OutputTarget {
    width: u32,
    height: u32,
    bytes_per_row: u32,
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    readback: wgpu::Buffer,
}

impl OutputTarget {
    fn new(device: &wgpu::Device, width: u32, height: u32) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Raymarch Output Texture"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: OUTPUT_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let bytes_per_row = aligned_bytes_per_row(width);
        let readback = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Raymarch Readback Buffer"),
            size: u64::from(bytes_per_row) * u64::from(height),
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });
        Self {
            width,
            height,
            bytes_per_row,
            texture,
            view,
            readback,
        }
    }

    fn bytes(&self) -> usize {
        self.width as usize * self.height as usize * 4 + self.readback.size() as usize
    }
}

/// Calculates bytes per row with proper alignment for wgpu buffer copies.
fn aligned_bytes_per_row(width: u32) -> u32 {
    let unaligned = width * 4; // RGBA8
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    unaligned.div_ceil(align) * align
}

/// GPU-mode backend ray marching a 3D texture on the shared device.
#[derive(Debug)]
pub struct GpuBackend {
    context: Arc<GpuContext>,
    caster: RayCaster,
    scene: Option<SceneResources>,
    output: Option<OutputTarget>,
    volume_stale: bool,
}

impl GpuBackend {
    /// Creates a backend on `context`. Nothing is allocated until the first frame.
    pub fn new(context: Arc<GpuContext>) -> Self {
        Self {
            context,
            caster: RayCaster::default(),
            scene: None,
            output: None,
            volume_stale: false,
        }
    }

    /// Returns the bytes held by the off-screen target and readback buffer.
    pub fn target_bytes(&self) -> usize {
        self.output.as_ref().map_or(0, OutputTarget::bytes)
    }

    fn draw(&mut self, params: &RenderParams<'_>, target: &mut RgbaImage) -> RenderResult<()> {
        let context = Arc::clone(&self.context);
        let (width, height) = target.dimensions();
        let label_count = params.transfer.num_labels();

        let reuse = !self.volume_stale
            && self
                .scene
                .as_ref()
                .is_some_and(|s| s.fits(params.grid, label_count));
        if !reuse {
            // Drop the old texture before allocating its replacement.
            self.scene = None;
            self.scene = Some(SceneResources::new(&context, params.grid, label_count)?);
            self.volume_stale = false;
        }
        if self
            .output
            .as_ref()
            .is_some_and(|o| o.width != width || o.height != height)
        {
            self.output = None;
        }
        let output = self
            .output
            .get_or_insert_with(|| OutputTarget::new(&context.device, width, height));
        let Some(scene) = self.scene.as_ref() else {
            return Ok(());
        };

        let table: Vec<[f32; 4]> = (0..scene.label_capacity)
            .map(|i| {
                if i < label_count {
                    let color = params.transfer.color_at(i as f32);
                    color.extend(params.transfer.opacity_at(i as f32)).to_array()
                } else {
                    [0.0; 4]
                }
            })
            .collect();
        let uniforms = RaymarchUniforms::new(params, &self.caster, width, height);
        context
            .queue
            .write_buffer(&scene.label_buffer, 0, bytemuck::cast_slice(&table));
        context
            .queue
            .write_buffer(&scene.uniform_buffer, 0, bytemuck::cast_slice(&[uniforms]));

        let mut encoder = context
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("raymarch encoder"),
            });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Raymarch Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &output.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                ..Default::default()
            });
            render_pass.set_pipeline(&context.pipeline);
            render_pass.set_bind_group(0, &scene.bind_group, &[]);
            render_pass.draw(0..3, 0..1); // Fullscreen triangle
        }
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &output.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &output.readback,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(output.bytes_per_row),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        context.queue.submit(std::iter::once(encoder.finish()));

        let buffer_slice = output.readback.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        context
            .device
            .poll(wgpu::PollType::wait_indefinitely())
            .map_err(|_| RenderError::Timeout)?;
        rx.recv()
            .map_err(|_| RenderError::BufferMapFailed)?
            .map_err(|_| RenderError::BufferMapFailed)?;

        // Copy data, removing row padding
        {
            let data = buffer_slice.get_mapped_range();
            let row_bytes = width as usize * 4;
            for (row, pixels) in target.chunks_exact_mut(row_bytes).enumerate() {
                let start = row * output.bytes_per_row as usize;
                pixels.copy_from_slice(&data[start..start + row_bytes]);
            }
        }
        output.readback.unmap();
        Ok(())
    }
}

impl RenderBackend for GpuBackend {
    fn mode(&self) -> RenderMode {
        RenderMode::Gpu
    }

    fn render(&mut self, params: &RenderParams<'_>, target: &mut RgbaImage) {
        let (width, height) = target.dimensions();
        if width == 0 || height == 0 || params.grid.is_empty() {
            self.caster.render(params, target);
            return;
        }
        if let Err(e) = self.draw(params, target) {
            log::warn!("GPU frame failed, ray casting instead: {e}");
            self.caster.render(params, target);
        }
    }

    fn volume_changed(&mut self) {
        self.volume_stale = true;
    }

    fn release_graphics_resources(&mut self) {
        if let Some(scene) = self.scene.take() {
            log::debug!("released {} bytes of volume texture", scene.volume_bytes);
        }
        self.output = None;
    }

    fn resident_bytes(&self) -> usize {
        self.scene.as_ref().map_or(0, |s| s.volume_bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::RayCastBackend;
    use crate::camera::Camera;
    use glam::{Mat4, Vec3};
    use volscope_core::{brainweb_labels, GridGeometry, TransferFunctionTable};

    fn labeled_cube(format: VoxelFormat) -> (GridGeometry, ScalarGrid) {
        let geometry = GridGeometry::with_dims(UVec3::splat(8));
        let mut grid = ScalarGrid::filled(geometry.dims, 0.0).with_format(format);
        for z in 2..6 {
            for y in 2..6 {
                for x in 2..6 {
                    grid.set(x, y, z, if x < 4 { 5.0 } else { 3.0 });
                }
            }
        }
        (geometry, grid)
    }

    fn context_or_skip() -> Option<Arc<GpuContext>> {
        let context = GpuContext::shared();
        if context.is_none() {
            eprintln!("Skipping GPU backend test: no GPU adapter available");
        }
        context
    }

    #[test]
    fn test_uniform_layout() {
        // Matches the WGSL struct, which rounds to 16-byte alignment.
        assert_eq!(std::mem::size_of::<RaymarchUniforms>(), 176);
        assert_eq!(std::mem::size_of::<RaymarchUniforms>() % 16, 0);
    }

    #[test]
    fn test_aligned_bytes_per_row() {
        assert_eq!(aligned_bytes_per_row(1), 256);
        assert_eq!(aligned_bytes_per_row(64), 256);
        assert_eq!(aligned_bytes_per_row(65), 512);
    }

    #[test]
    fn test_byte_volumes_are_rescaled() {
        let (geometry, grid) = labeled_cube(VoxelFormat::U8);
        let transfer = TransferFunctionTable::from_labels(&brainweb_labels(), 0.5);
        let camera = Camera::default();
        let params = RenderParams {
            grid: &grid,
            geometry: &geometry,
            transfer: &transfer,
            camera: &camera,
            model: Mat4::IDENTITY,
            shaded: true,
            sample_scale: 2.0,
            background: Vec3::ONE,
        };
        let uniforms = RaymarchUniforms::new(&params, &RayCaster::default(), 20, 10);
        assert_eq!(uniforms.value_scale, 255.0);
        assert_eq!(uniforms.shaded, 1);
        assert_eq!(uniforms.viewport, [20.0, 10.0]);
        assert_eq!(uniforms.label_count, brainweb_labels().len() as u32);
        assert!((uniforms.step - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_residency_follows_the_texture() {
        let Some(context) = context_or_skip() else {
            return;
        };
        let (geometry, grid) = labeled_cube(VoxelFormat::U8);
        let transfer = TransferFunctionTable::from_labels(&brainweb_labels(), 0.5);
        let camera = Camera::default();
        let params = RenderParams {
            grid: &grid,
            geometry: &geometry,
            transfer: &transfer,
            camera: &camera,
            model: Mat4::IDENTITY,
            shaded: false,
            sample_scale: 1.0,
            background: Vec3::ZERO,
        };
        let mut target = RgbaImage::new(8, 8);
        let mut backend = GpuBackend::new(context);
        assert_eq!(backend.resident_bytes(), 0);

        backend.render(&params, &mut target);
        assert_eq!(backend.resident_bytes(), 8 * 8 * 8);
        assert!(backend.target_bytes() > 0);

        backend.release_graphics_resources();
        assert_eq!(backend.resident_bytes(), 0);
        assert_eq!(backend.target_bytes(), 0);
    }

    #[test]
    fn test_matches_ray_casting() {
        let Some(context) = context_or_skip() else {
            return;
        };
        for (format, shaded) in [(VoxelFormat::U8, false), (VoxelFormat::F32, true)] {
            let (geometry, grid) = labeled_cube(format);
            let mut transfer = TransferFunctionTable::from_labels(&brainweb_labels(), 0.0);
            transfer.set_label_opacity(5, 1.0).unwrap();
            transfer.set_label_opacity(3, 0.4).unwrap();
            let mut camera = Camera::default();
            let (min, max) = geometry.bounds();
            camera.look_at_box(min, max);
            let params = RenderParams {
                grid: &grid,
                geometry: &geometry,
                transfer: &transfer,
                camera: &camera,
                model: Mat4::from_rotation_y(0.4),
                shaded,
                sample_scale: 1.0,
                background: Vec3::new(0.0, 0.0, 1.0),
            };

            let mut expected = RgbaImage::new(24, 16);
            RayCastBackend::default().render(&params, &mut expected);
            let mut actual = RgbaImage::new(24, 16);
            GpuBackend::new(Arc::clone(&context)).render(&params, &mut actual);

            let mismatched = expected
                .pixels()
                .zip(actual.pixels())
                .filter(|(a, b)| a.0.iter().zip(b.0).any(|(&x, y)| x.abs_diff(y) > 3))
                .count();
            // Rays grazing a voxel boundary may round to the neighbor.
            assert!(
                mismatched <= expected.len() / 4 / 50,
                "{mismatched} pixels differ for {format:?}"
            );
        }
    }

    #[test]
    fn test_volume_change_is_uploaded() {
        let Some(context) = context_or_skip() else {
            return;
        };
        let (geometry, grid) = labeled_cube(VoxelFormat::F32);
        let mut transfer = TransferFunctionTable::from_labels(&brainweb_labels(), 0.0);
        transfer.set_label_opacity(5, 1.0).unwrap();
        let mut camera = Camera::default();
        let (min, max) = geometry.bounds();
        camera.look_at_box(min, max);
        let empty = ScalarGrid::filled(geometry.dims, 0.0);
        let mut params = RenderParams {
            grid: &grid,
            geometry: &geometry,
            transfer: &transfer,
            camera: &camera,
            model: Mat4::IDENTITY,
            shaded: false,
            sample_scale: 1.0,
            background: Vec3::ZERO,
        };
        let mut backend = GpuBackend::new(context);
        let mut before = RgbaImage::new(16, 16);
        backend.render(&params, &mut before);

        params.grid = &empty;
        backend.volume_changed();
        let mut after = RgbaImage::new(16, 16);
        backend.render(&params, &mut after);
        assert_ne!(before, after);
        assert!(after.pixels().all(|p| p.0 == [0, 0, 0, 255]));
    }
}
