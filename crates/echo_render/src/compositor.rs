//! Frame compositor: ray-traced output or an unmodified copy of the input.

use echo_core::SceneRegistry;
use echo_math::Camera;
use image::RgbaImage;

use crate::error::RenderResult;
use crate::pipeline::RaytracingPipeline;

/// Something that can turn a camera frame into a ray-traced frame.
///
/// Implemented by [`RaytracingPipeline`]; the compositor only depends on this.
pub trait FrameTracer {
    fn trace(&mut self, registry: &SceneRegistry, camera: &Camera, frame: &RgbaImage) -> RenderResult<RgbaImage>;
}

impl FrameTracer for RaytracingPipeline {
    fn trace(&mut self, registry: &SceneRegistry, camera: &Camera, frame: &RgbaImage) -> RenderResult<RgbaImage> {
        RaytracingPipeline::trace(self, registry, camera, frame)
    }
}

/// Why a frame was passed through unmodified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassthroughReason {
    /// The shader switch is off
    Disabled,
    /// No pipeline/kernel is available
    MissingKernel,
    /// No camera to trace from
    MissingCamera,
}

/// Per-frame compositor state. Re-evaluated every frame, never latched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameMode {
    ShaderEnabled,
    Passthrough(PassthroughReason),
}

impl FrameMode {
    pub fn select(use_shader: bool, has_kernel: bool, has_camera: bool) -> Self {
        if !use_shader {
            FrameMode::Passthrough(PassthroughReason::Disabled)
        } else if !has_kernel {
            FrameMode::Passthrough(PassthroughReason::MissingKernel)
        } else if !has_camera {
            FrameMode::Passthrough(PassthroughReason::MissingCamera)
        } else {
            FrameMode::ShaderEnabled
        }
    }
}

/// Compositor configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompositorSettings {
    pub use_shader: bool,
}

impl Default for CompositorSettings {
    fn default() -> Self {
        Self { use_shader: true }
    }
}

pub struct FrameCompositor<T = RaytracingPipeline> {
    pub settings: CompositorSettings,
    pipeline: Option<T>,
    last_mode: Option<FrameMode>,
}

impl<T: FrameTracer> FrameCompositor<T> {
    pub fn new(settings: CompositorSettings, pipeline: Option<T>) -> Self {
        Self {
            settings,
            pipeline,
            last_mode: None,
        }
    }

    pub fn has_pipeline(&self) -> bool {
        self.pipeline.is_some()
    }

    pub fn pipeline_mut(&mut self) -> Option<&mut T> {
        self.pipeline.as_mut()
    }

    /// Mode the next frame would render in.
    pub fn mode(&self, camera: Option<&Camera>) -> FrameMode {
        FrameMode::select(self.settings.use_shader, self.pipeline.is_some(), camera.is_some())
    }

    /// Produce the output frame for `frame`.
    ///
    /// Passthrough returns an exact copy. A failed trace degrades to a copy
    /// for this frame only, except for fatal errors, which tear the pipeline
    /// down and are returned to the caller.
    pub fn render_frame(
        &mut self,
        registry: &SceneRegistry,
        camera: Option<&Camera>,
        frame: &RgbaImage,
    ) -> RenderResult<RgbaImage> {
        let mode = self.mode(camera);
        if self.last_mode != Some(mode) {
            log::info!("Frame mode: {:?}", mode);
            self.last_mode = Some(mode);
        }

        let result = match (mode, self.pipeline.as_mut(), camera) {
            (FrameMode::ShaderEnabled, Some(pipeline), Some(camera)) => {
                pipeline.trace(registry, camera, frame)
            }
            _ => return Ok(frame.clone()),
        };

        match result {
            Ok(image) => Ok(image),
            Err(error) if error.is_fatal() => {
                log::error!("Ray tracing pipeline torn down: {}", error);
                self.pipeline = None;
                Err(error)
            }
            Err(error) => {
                log::warn!("Frame degraded to passthrough: {}", error);
                Ok(frame.clone())
            }
        }
    }
}
