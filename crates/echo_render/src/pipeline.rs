//! Per-frame ray tracing over a registered scene.

use echo_core::{Collection, SceneRegistry};
use echo_math::Camera;
use image::RgbaImage;

use crate::buffers::SceneBuffers;
use crate::context::GpuContext;
use crate::dispatch::DispatchGroups;
use crate::error::{RenderError, RenderResult};
use crate::gpu_types::FrameUniforms;
use crate::kernel::{RayKernel, FRAME_FORMAT};
use crate::view::ViewParameters;

const BYTES_PER_PIXEL: u32 = 4;

/// Row pitch for texture to buffer copies (wgpu requires 256-byte alignment).
pub fn padded_bytes_per_row(width: u32) -> u32 {
    let unpadded = width * BYTES_PER_PIXEL;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    unpadded.div_ceil(align) * align
}

/// Texture dimension limit of a device created by [`GpuContext::new_headless`],
/// which requests the default texture limits.
pub fn default_max_frame_dimension() -> u32 {
    wgpu::Limits::default().max_texture_dimension_2d
}

/// Reject frames whose textures the device cannot create.
pub fn check_frame_size(width: u32, height: u32, max_dimension: u32) -> RenderResult<()> {
    if width > max_dimension || height > max_dimension {
        return Err(RenderError::InvalidFrame(format!(
            "{}x{} exceeds the device texture limit of {}",
            width, height, max_dimension
        )));
    }
    Ok(())
}

/// Size-dependent textures and the readback buffer.
struct FrameResources {
    width: u32,
    height: u32,
    padded_bytes_per_row: u32,
    camera_texture: wgpu::Texture,
    camera_view: wgpu::TextureView,
    output_texture: wgpu::Texture,
    output_view: wgpu::TextureView,
    readback: wgpu::Buffer,
}

/// GPU pipeline state: kernel, scene buffers and per-size frame resources.
///
/// The scene is collected once at [`enable`](Self::enable) and again on
/// [`reload`](Self::reload) or when the registry composition changes.
pub struct RaytracingPipeline {
    context: GpuContext,
    kernel: RayKernel,
    buffers: SceneBuffers<wgpu::Buffer>,
    collection: Collection,
    uniform_buffer: wgpu::Buffer,
    frame_resources: Option<FrameResources>,
}

impl RaytracingPipeline {
    /// Compile the kernel, collect the scene and allocate its buffers.
    pub fn enable(context: GpuContext, registry: &SceneRegistry) -> RenderResult<Self> {
        let kernel = RayKernel::new(&context.device)?;
        Self::with_kernel(context, kernel, registry)
    }

    /// Same as [`enable`](Self::enable) with an already compiled kernel.
    pub fn with_kernel(context: GpuContext, kernel: RayKernel, registry: &SceneRegistry) -> RenderResult<Self> {
        let collection = registry.collect();

        let mut buffers = SceneBuffers::new();
        buffers.allocate(&context, collection.box_count(), collection.source_count())?;

        let uniform_buffer = context.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Frame Uniforms"),
            size: std::mem::size_of::<FrameUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        log::info!(
            "Ray tracing enabled: {} boxes, {} sources",
            collection.box_count(),
            collection.source_count()
        );

        Ok(Self {
            context,
            kernel,
            buffers,
            collection,
            uniform_buffer,
            frame_resources: None,
        })
    }

    /// Re-collect the scene and reallocate buffers for the new counts.
    pub fn reload(&mut self, registry: &SceneRegistry) -> RenderResult<()> {
        let collection = registry.collect();
        self.buffers
            .allocate(&self.context, collection.box_count(), collection.source_count())?;
        self.collection = collection;
        log::info!("Scene reloaded at revision {}", self.collection.revision);
        Ok(())
    }

    pub fn context(&self) -> &GpuContext {
        &self.context
    }

    /// Box and source counts the scene buffers currently hold.
    pub fn allocated_counts(&self) -> (usize, usize) {
        (self.buffers.box_count(), self.buffers.source_count())
    }

    /// Trace one frame over `frame` as seen from `camera`.
    ///
    /// The returned image has the same dimensions as `frame`.
    pub fn trace(&mut self, registry: &SceneRegistry, camera: &Camera, frame: &RgbaImage) -> RenderResult<RgbaImage> {
        if !registry.is_current(&self.collection) {
            log::info!(
                "Scene composition changed (revision {} -> {}), re-collecting",
                self.collection.revision,
                registry.revision()
            );
            self.collection = registry.collect();
        }

        let snapshot = registry.snapshot(&self.collection)?;
        self.buffers.sync(&self.context, &snapshot)?;

        let (width, height) = frame.dimensions();
        let groups = DispatchGroups::for_resolution(width, height);
        if groups.is_empty() {
            log::debug!("Zero-sized frame, skipping dispatch");
            return Ok(frame.clone());
        }

        check_frame_size(width, height, self.context.max_frame_dimension())?;

        let view = ViewParameters::from_camera(camera);
        let uniforms = FrameUniforms::new(
            &view,
            snapshot.boxes.len() as u32,
            snapshot.sources.len() as u32,
            width,
            height,
        );

        self.ensure_frame_resources(width, height)?;
        let resources = self
            .frame_resources
            .as_ref()
            .ok_or_else(|| RenderError::InvalidFrame("frame resources missing".to_string()))?;
        let boxes = self.buffers.box_buffer().ok_or(RenderError::NotAllocated)?;
        let sources = self.buffers.source_buffer().ok_or(RenderError::NotAllocated)?;

        let device = &self.context.device;
        let queue = &self.context.queue;

        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&uniforms));
        queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &resources.camera_texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            frame.as_raw(),
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(width * BYTES_PER_PIXEL),
                rows_per_image: Some(height),
            },
            frame_extent(width, height),
        );

        let bind_group = self.kernel.bind_group(
            device,
            &self.uniform_buffer,
            boxes,
            sources,
            &resources.camera_view,
            &resources.output_view,
        );

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Ray Trace Encoder"),
        });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("Ray Trace Pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.kernel.pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.dispatch_workgroups(groups.x, groups.y, 1);
        }

        encoder.copy_texture_to_buffer(
            wgpu::ImageCopyTexture {
                texture: &resources.output_texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::ImageCopyBuffer {
                buffer: &resources.readback,
                layout: wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(resources.padded_bytes_per_row),
                    rows_per_image: Some(height),
                },
            },
            frame_extent(width, height),
        );

        let submission = queue.submit(Some(encoder.finish()));

        // Fence: the dispatch and copy must be complete before the result is read
        device.poll(wgpu::Maintain::WaitForSubmissionIndex(submission));

        log::debug!(
            "Traced {}x{} frame ({}x{} groups, {} boxes, {} sources)",
            width,
            height,
            groups.x,
            groups.y,
            uniforms.box_count,
            uniforms.source_count
        );

        read_back(device, resources)
    }

    fn ensure_frame_resources(&mut self, width: u32, height: u32) -> RenderResult<()> {
        let needs_rebuild = match &self.frame_resources {
            Some(resources) => resources.width != width || resources.height != height,
            None => true,
        };
        if !needs_rebuild {
            return Ok(());
        }

        let device = &self.context.device;
        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let camera_texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Camera Texture"),
            size: frame_extent(width, height),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: FRAME_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let camera_view = camera_texture.create_view(&wgpu::TextureViewDescriptor::default());

        let output_texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Ray Trace Output"),
            size: frame_extent(width, height),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: FRAME_FORMAT,
            usage: wgpu::TextureUsages::STORAGE_BINDING | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let output_view = output_texture.create_view(&wgpu::TextureViewDescriptor::default());

        let padded_bytes_per_row = padded_bytes_per_row(width);
        let readback = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Ray Trace Readback"),
            size: padded_bytes_per_row as u64 * height as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        if let Some(error) = pollster::block_on(device.pop_error_scope()) {
            self.frame_resources = None;
            return Err(RenderError::DeviceValidation(format!(
                "frame resources for {}x{}: {}",
                width, height, error
            )));
        }

        log::debug!("Created frame resources for {}x{}", width, height);

        self.frame_resources = Some(FrameResources {
            width,
            height,
            padded_bytes_per_row,
            camera_texture,
            camera_view,
            output_texture,
            output_view,
            readback,
        });
        Ok(())
    }
}

impl Drop for RaytracingPipeline {
    fn drop(&mut self) {
        self.buffers.release(&self.context);
    }
}

fn frame_extent(width: u32, height: u32) -> wgpu::Extent3d {
    wgpu::Extent3d {
        width,
        height,
        depth_or_array_layers: 1,
    }
}

/// Map the readback buffer and strip the row padding.
fn read_back(device: &wgpu::Device, resources: &FrameResources) -> RenderResult<RgbaImage> {
    let slice = resources.readback.slice(..);
    let (sender, receiver) = std::sync::mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = sender.send(result);
    });
    device.poll(wgpu::Maintain::Wait);
    receiver
        .recv()
        .map_err(|_| RenderError::Readback("map callback never ran".to_string()))?
        .map_err(|error| RenderError::Readback(error.to_string()))?;

    let row_bytes = (resources.width * BYTES_PER_PIXEL) as usize;
    let mut pixels = Vec::with_capacity(row_bytes * resources.height as usize);
    {
        let data = slice.get_mapped_range();
        for row in data
            .chunks(resources.padded_bytes_per_row as usize)
            .take(resources.height as usize)
        {
            pixels.extend_from_slice(&row[..row_bytes]);
        }
    }
    resources.readback.unmap();

    RgbaImage::from_raw(resources.width, resources.height, pixels)
        .ok_or_else(|| RenderError::Readback("readback size does not match frame".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use echo_core::{Material, SceneBox, SceneSource};
    use echo_math::{Aabb, Vec3};

    #[test]
    fn test_padded_row_pitch() {
        assert_eq!(padded_bytes_per_row(64), 256);
        assert_eq!(padded_bytes_per_row(65), 512);
        assert_eq!(padded_bytes_per_row(1920), 7680);
    }

    #[test]
    fn test_frame_size_against_texture_limit() {
        let limit = default_max_frame_dimension();

        assert!(check_frame_size(1920, 1080, limit).is_ok());
        assert!(check_frame_size(limit, limit, limit).is_ok());

        let error = check_frame_size(10_000, 100, 8192).unwrap_err();
        assert!(matches!(error, RenderError::InvalidFrame(_)));
        assert!(!error.is_fatal());
        assert!(check_frame_size(100, 8193, 8192).is_err());
    }

    #[test]
    #[ignore = "requires a GPU adapter"]
    fn test_trace_follows_scene_changes() {
        let Ok(context) = pollster::block_on(GpuContext::new_headless()) else {
            return;
        };

        let mut registry = SceneRegistry::new();
        registry.register_box(SceneBox::from_world_bounds(
            Aabb::new(Vec3::new(-1.0, -1.0, 4.0), Vec3::new(1.0, 1.0, 6.0)),
            Material::default(),
        ));
        let mut pipeline = RaytracingPipeline::enable(context, &registry).unwrap();
        assert_eq!(pipeline.allocated_counts(), (1, 0));

        let camera = Camera::new(Vec3::ZERO, 1.5);
        let frame = RgbaImage::from_pixel(30, 20, image::Rgba([10, 20, 30, 255]));
        let traced = pipeline.trace(&registry, &camera, &frame).unwrap();
        assert_eq!(traced.dimensions(), (30, 20));

        // A source registered mid-run is picked up on the next frame
        registry.register_source(SceneSource::at(Vec3::new(0.0, 0.0, 2.0)));
        pipeline.trace(&registry, &camera, &frame).unwrap();
        assert_eq!(pipeline.allocated_counts(), (1, 1));

        let empty = SceneRegistry::new();
        pipeline.reload(&empty).unwrap();
        let traced = pipeline.trace(&empty, &camera, &frame).unwrap();
        // No boxes, no sources: the camera image comes straight through
        assert_eq!(traced.get_pixel(15, 10), frame.get_pixel(15, 10));
    }
}
