//! Headless wgpu device and queue.

use wgpu::{Device, Instance, Queue};

use crate::buffers::BufferDevice;
use crate::error::{RenderError, RenderResult};

/// GPU device state shared by the kernel and the buffer manager
pub struct GpuContext {
    pub device: Device,
    pub queue: Queue,
    pub adapter_info: wgpu::AdapterInfo,
}

impl GpuContext {
    /// Create a device without a surface; frames are read back to the CPU.
    pub async fn new_headless() -> RenderResult<Self> {
        let instance = Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| RenderError::GpuInit("No suitable GPU adapter found".to_string()))?;

        let adapter_info = adapter.get_info();
        log::info!(
            "Using adapter '{}' ({:?}, {:?})",
            adapter_info.name,
            adapter_info.backend,
            adapter_info.device_type
        );

        // Keep the adapter's buffer limits so large scenes are not capped
        // at the conservative default
        let adapter_limits = adapter.limits();
        let required_limits = wgpu::Limits {
            max_storage_buffer_binding_size: adapter_limits.max_storage_buffer_binding_size,
            max_buffer_size: adapter_limits.max_buffer_size,
            ..wgpu::Limits::default()
        };

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Echo Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits,
                    memory_hints: Default::default(),
                },
                None,
            )
            .await?;

        Ok(Self {
            device,
            queue,
            adapter_info,
        })
    }

    /// Largest storage buffer the device can both create and bind, in bytes.
    pub fn max_storage_buffer_size(&self) -> u64 {
        storage_buffer_limit(&self.device.limits())
    }

    /// Largest frame width or height the device can hold in a texture.
    pub fn max_frame_dimension(&self) -> u32 {
        self.device.limits().max_texture_dimension_2d
    }
}

/// A storage buffer must fit both the creation and the binding limit.
pub fn storage_buffer_limit(limits: &wgpu::Limits) -> u64 {
    limits
        .max_buffer_size
        .min(limits.max_storage_buffer_binding_size as u64)
}

impl BufferDevice for GpuContext {
    type Buffer = wgpu::Buffer;

    fn create_storage_buffer(&self, label: &str, size: u64) -> RenderResult<wgpu::Buffer> {
        let limit = self.max_storage_buffer_size();
        if size > limit {
            return Err(RenderError::BufferTooLarge {
                label: label.to_string(),
                size,
                limit,
            });
        }

        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        // Scopes pop innermost first
        let out_of_memory = pollster::block_on(self.device.pop_error_scope());
        let invalid = pollster::block_on(self.device.pop_error_scope());

        if let Some(error) = out_of_memory {
            log::error!("Allocating '{}' ({} bytes) failed: {}", label, size, error);
            buffer.destroy();
            return Err(RenderError::OutOfMemory {
                label: label.to_string(),
                size,
            });
        }
        if let Some(error) = invalid {
            buffer.destroy();
            return Err(RenderError::DeviceValidation(format!(
                "buffer '{}' ({} bytes): {}",
                label, size, error
            )));
        }

        Ok(buffer)
    }

    fn write_buffer(&self, buffer: &wgpu::Buffer, data: &[u8]) {
        self.queue.write_buffer(buffer, 0, data);
    }

    fn destroy_buffer(&self, buffer: wgpu::Buffer) {
        buffer.destroy();
    }
}
