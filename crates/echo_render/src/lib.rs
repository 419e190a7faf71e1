//! Echotrace Render - GPU ray tracing of boxes and sound sources over a camera image.
//!
//! This crate provides:
//!
//! - **Record layouts**: `RtBox`/`RtSource` and the per-frame `FrameUniforms`
//! - **Scene buffers**: count-checked device storage for the packed records
//! - **View parameters**: near-plane rectangle derived from the camera
//! - **Ray kernel**: WGSL compute pipeline dispatched in 8x8 groups
//! - **Frame compositor**: ray-traced output, or passthrough of the input frame
//!
//! # Example
//!
//! ```ignore
//! use echo_render::{CompositorSettings, FrameCompositor, GpuContext, RaytracingPipeline};
//!
//! let context = pollster::block_on(GpuContext::new_headless())?;
//! let pipeline = RaytracingPipeline::enable(context, &registry)?;
//! let mut compositor = FrameCompositor::new(CompositorSettings::default(), Some(pipeline));
//!
//! let output = compositor.render_frame(&registry, Some(&camera), &frame)?;
//! ```

pub mod buffers;
pub mod compositor;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod gpu_types;
pub mod kernel;
pub mod pipeline;
pub mod view;

// Re-export commonly used types
pub use buffers::{BufferDevice, SceneBuffers};
pub use compositor::{CompositorSettings, FrameCompositor, FrameMode, FrameTracer, PassthroughReason};
pub use context::GpuContext;
pub use dispatch::{DispatchGroups, WORKGROUP_SIZE};
pub use error::{RecordKind, RenderError, RenderResult};
pub use gpu_types::{pack_boxes, pack_sources, FrameUniforms, RtBox, RtMaterial, RtSource};
pub use kernel::RayKernel;
pub use pipeline::{default_max_frame_dimension, RaytracingPipeline};
pub use view::ViewParameters;
