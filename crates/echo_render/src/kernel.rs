//! Ray kernel compute pipeline and its binding layout.
//!
//! | binding | resource                          |
//! |---------|-----------------------------------|
//! | 0       | `FrameUniforms` (uniform)         |
//! | 1       | `boxes` (read-only storage)       |
//! | 2       | `sources` (read-only storage)     |
//! | 3       | `Camera` input texture            |
//! | 4       | result storage texture (rgba8)    |

use std::num::NonZeroU64;

use wgpu::{BindGroup, BindGroupLayout, ComputePipeline, Device, TextureView};

use crate::error::{RenderError, RenderResult};
use crate::gpu_types::FrameUniforms;

pub const FRAME_BINDING: u32 = 0;
pub const BOXES_BINDING: u32 = 1;
pub const SOURCES_BINDING: u32 = 2;
pub const CAMERA_BINDING: u32 = 3;
pub const RESULT_BINDING: u32 = 4;

/// Format of both the camera input and the result texture.
pub const FRAME_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// Built-in ray-marching kernel source.
pub const RAYMARCH_WGSL: &str = include_str!("shaders/raymarch.wgsl");

/// Compiled kernel plus the layout every frame's bind group is built against.
pub struct RayKernel {
    pub pipeline: ComputePipeline,
    pub bind_group_layout: BindGroupLayout,
}

impl RayKernel {
    /// Compile the built-in kernel.
    pub fn new(device: &Device) -> RenderResult<Self> {
        Self::from_wgsl(device, RAYMARCH_WGSL)
    }

    /// Compile a kernel from WGSL source. The entry point must be `main`.
    pub fn from_wgsl(device: &Device, source: &str) -> RenderResult<Self> {
        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Ray Kernel Shader"),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Ray Kernel Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: FRAME_BINDING,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: NonZeroU64::new(std::mem::size_of::<FrameUniforms>() as u64),
                    },
                    count: None,
                },
                storage_entry(BOXES_BINDING),
                storage_entry(SOURCES_BINDING),
                wgpu::BindGroupLayoutEntry {
                    binding: CAMERA_BINDING,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: false },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: RESULT_BINDING,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::StorageTexture {
                        access: wgpu::StorageTextureAccess::WriteOnly,
                        format: FRAME_FORMAT,
                        view_dimension: wgpu::TextureViewDimension::D2,
                    },
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Ray Kernel Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("Ray Kernel Pipeline"),
            layout: Some(&pipeline_layout),
            module: &shader,
            entry_point: "main",
            compilation_options: Default::default(),
            cache: None,
        });

        if let Some(error) = pollster::block_on(device.pop_error_scope()) {
            return Err(RenderError::ShaderCompilation(error.to_string()));
        }

        log::info!("Ray kernel compiled");
        Ok(Self {
            pipeline,
            bind_group_layout,
        })
    }

    /// Bind one frame's resources.
    pub fn bind_group(
        &self,
        device: &Device,
        uniforms: &wgpu::Buffer,
        boxes: &wgpu::Buffer,
        sources: &wgpu::Buffer,
        camera: &TextureView,
        result: &TextureView,
    ) -> BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Ray Kernel Bind Group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: FRAME_BINDING,
                    resource: uniforms.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: BOXES_BINDING,
                    resource: boxes.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: SOURCES_BINDING,
                    resource: sources.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: CAMERA_BINDING,
                    resource: wgpu::BindingResource::TextureView(camera),
                },
                wgpu::BindGroupEntry {
                    binding: RESULT_BINDING,
                    resource: wgpu::BindingResource::TextureView(result),
                },
            ],
        })
    }
}

fn storage_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only: true },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}
