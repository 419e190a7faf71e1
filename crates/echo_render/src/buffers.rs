//! Device buffers holding the packed scene records.
//!
//! [`SceneBuffers`] is the only writer of the box and source buffers. Its
//! allocation always matches one collection's counts; a repack with
//! different counts is rejected rather than truncated, and [`SceneBuffers::sync`]
//! reallocates first when the scene has drifted.

use echo_core::FrameSnapshot;

use crate::error::{RecordKind, RenderError, RenderResult};
use crate::gpu_types::{pack_boxes, pack_sources, RtBox, RtSource};

/// Minimal device interface the buffer manager needs.
///
/// Implemented by [`crate::GpuContext`] for wgpu and by a host-memory
/// device in tests.
pub trait BufferDevice {
    type Buffer;

    /// Create a storage buffer of `size` bytes that can be written from the CPU.
    fn create_storage_buffer(&self, label: &str, size: u64) -> RenderResult<Self::Buffer>;

    /// Write `data` at offset 0.
    fn write_buffer(&self, buffer: &Self::Buffer, data: &[u8]);

    /// Free device memory now instead of waiting for the handle to drop.
    fn destroy_buffer(&self, buffer: Self::Buffer);
}

/// Byte size for `count` records; an empty scene still gets one zeroed record
/// since zero-sized storage bindings are invalid.
pub fn buffer_size(count: usize, stride: usize) -> u64 {
    (count.max(1) * stride) as u64
}

struct Allocation<B> {
    boxes: B,
    sources: B,
    box_count: usize,
    source_count: usize,
}

/// Box and source storage buffers sized to one scene collection.
pub struct SceneBuffers<B> {
    allocation: Option<Allocation<B>>,
}

impl<B> Default for SceneBuffers<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B> SceneBuffers<B> {
    pub fn new() -> Self {
        Self { allocation: None }
    }

    pub fn is_allocated(&self) -> bool {
        self.allocation.is_some()
    }

    /// Box count the buffers were allocated for (0 when unallocated).
    pub fn box_count(&self) -> usize {
        self.allocation.as_ref().map_or(0, |a| a.box_count)
    }

    /// Source count the buffers were allocated for (0 when unallocated).
    pub fn source_count(&self) -> usize {
        self.allocation.as_ref().map_or(0, |a| a.source_count)
    }

    pub fn box_buffer(&self) -> Option<&B> {
        self.allocation.as_ref().map(|a| &a.boxes)
    }

    pub fn source_buffer(&self) -> Option<&B> {
        self.allocation.as_ref().map(|a| &a.sources)
    }

    /// True when the allocation fits `snapshot` exactly.
    pub fn matches(&self, snapshot: &FrameSnapshot) -> bool {
        self.allocation.as_ref().is_some_and(|a| {
            a.box_count == snapshot.boxes.len() && a.source_count == snapshot.sources.len()
        })
    }

    /// Reserve buffers for exactly `box_count` boxes and `source_count` sources.
    ///
    /// Both buffers are created before the previous allocation is released,
    /// so on failure the manager is left exactly as it was.
    pub fn allocate<D>(&mut self, device: &D, box_count: usize, source_count: usize) -> RenderResult<()>
    where
        D: BufferDevice<Buffer = B>,
    {
        let boxes = device.create_storage_buffer("echo-boxes", buffer_size(box_count, RtBox::SIZE))?;
        let sources = match device
            .create_storage_buffer("echo-sources", buffer_size(source_count, RtSource::SIZE))
        {
            Ok(buffer) => buffer,
            Err(error) => {
                device.destroy_buffer(boxes);
                return Err(error);
            }
        };

        let previous = self.allocation.replace(Allocation {
            boxes,
            sources,
            box_count,
            source_count,
        });
        if let Some(old) = previous {
            device.destroy_buffer(old.boxes);
            device.destroy_buffer(old.sources);
        }

        log::info!(
            "Allocated scene buffers: {} boxes, {} sources",
            box_count,
            source_count
        );
        Ok(())
    }

    /// Serialize the snapshot into the existing buffers.
    ///
    /// Fails with `CountMismatch` if the snapshot does not have the counts the
    /// buffers were allocated for.
    pub fn repack<D>(&mut self, device: &D, snapshot: &FrameSnapshot) -> RenderResult<()>
    where
        D: BufferDevice<Buffer = B>,
    {
        let allocation = self.allocation.as_ref().ok_or(RenderError::NotAllocated)?;

        if allocation.box_count != snapshot.boxes.len() {
            return Err(RenderError::CountMismatch {
                kind: RecordKind::Boxes,
                allocated: allocation.box_count,
                current: snapshot.boxes.len(),
            });
        }
        if allocation.source_count != snapshot.sources.len() {
            return Err(RenderError::CountMismatch {
                kind: RecordKind::Sources,
                allocated: allocation.source_count,
                current: snapshot.sources.len(),
            });
        }

        // Empty buffers keep their zeroed placeholder record
        if !snapshot.boxes.is_empty() {
            let boxes = pack_boxes(&snapshot.boxes);
            device.write_buffer(&allocation.boxes, bytemuck::cast_slice(&boxes));
        }
        if !snapshot.sources.is_empty() {
            let sources = pack_sources(&snapshot.sources);
            device.write_buffer(&allocation.sources, bytemuck::cast_slice(&sources));
        }

        Ok(())
    }

    /// Reallocate if the counts drifted, then repack.
    ///
    /// Returns `true` when a reallocation happened.
    pub fn sync<D>(&mut self, device: &D, snapshot: &FrameSnapshot) -> RenderResult<bool>
    where
        D: BufferDevice<Buffer = B>,
    {
        let reallocated = if self.matches(snapshot) {
            false
        } else {
            if self.is_allocated() {
                log::info!(
                    "Scene counts changed ({} -> {} boxes, {} -> {} sources), reallocating",
                    self.box_count(),
                    snapshot.boxes.len(),
                    self.source_count(),
                    snapshot.sources.len()
                );
            }
            self.allocate(device, snapshot.boxes.len(), snapshot.sources.len())?;
            true
        };

        self.repack(device, snapshot)?;
        Ok(reallocated)
    }

    /// Free both buffers. Safe to call repeatedly or before any allocation.
    pub fn release<D>(&mut self, device: &D)
    where
        D: BufferDevice<Buffer = B>,
    {
        if let Some(allocation) = self.allocation.take() {
            device.destroy_buffer(allocation.boxes);
            device.destroy_buffer(allocation.sources);
            log::info!("Released scene buffers");
        }
    }
}

impl<B> Drop for SceneBuffers<B> {
    fn drop(&mut self) {
        if self.allocation.take().is_some() {
            log::debug!("Scene buffers dropped without explicit release");
        }
    }
}
