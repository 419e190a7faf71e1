//! Echotrace headless driver.
//!
//! Usage: `echotrace [run-config.json]`. Without an argument a built-in demo
//! scene is rendered. Frames are written as PNG files to the configured
//! output directory.

mod config;
mod signal;

use anyhow::{Context, Result};
use echo_core::SceneRegistry;
use echo_math::FlyController;
use echo_render::{CompositorSettings, FrameCompositor, GpuContext, RaytracingPipeline};

use config::RunConfig;
use signal::SourceDriver;

/// Create the GPU pipeline, or `None` when the device or kernel is unavailable.
fn create_pipeline(registry: &SceneRegistry) -> Option<RaytracingPipeline> {
    let context = match pollster::block_on(GpuContext::new_headless()) {
        Ok(context) => context,
        Err(e) => {
            log::warn!("GPU unavailable, frames will pass through: {}", e);
            return None;
        }
    };

    match RaytracingPipeline::enable(context, registry) {
        Ok(pipeline) => {
            log::info!("Ray tracing on '{}'", pipeline.context().adapter_info.name);
            Some(pipeline)
        }
        Err(e) => {
            log::warn!("Failed to enable ray tracing, frames will pass through: {}", e);
            None
        }
    }
}

fn run(config: &RunConfig) -> Result<()> {
    let mut registry = SceneRegistry::new();
    let (_, source_handles) = config.scene.populate(&mut registry);
    let mut drivers = SourceDriver::for_scene(&config.scene, &source_handles, config.sample_rate);

    log::info!(
        "Scene: {} boxes, {} sources ({} audio-driven)",
        registry.box_count(),
        registry.source_count(),
        drivers.len()
    );

    let mut camera = config.camera.to_camera(config.aspect());
    let controller = FlyController::default();
    let background = config.background_image()?;

    let pipeline = if config.use_shader {
        create_pipeline(&registry)
    } else {
        None
    };
    let mut compositor = FrameCompositor::new(
        CompositorSettings {
            use_shader: config.use_shader,
        },
        pipeline,
    );

    if config.use_shader && !compositor.has_pipeline() {
        log::warn!("Shader requested but unavailable, writing camera frames unmodified");
    }

    std::fs::create_dir_all(&config.output_dir)
        .with_context(|| format!("Failed to create output directory {:?}", config.output_dir))?;

    for index in 0..config.frames {
        let time = index as f32 * config.delta_time;

        for driver in &mut drivers {
            driver.update(&mut registry, config.sample_rate, time, config.delta_time);
        }
        if let Some(motion) = &config.motion {
            motion.apply(&controller, &mut camera, config.delta_time);
        }

        let frame = match compositor.render_frame(&registry, Some(&camera), &background) {
            Ok(frame) => frame,
            Err(e) => {
                // The compositor has dropped its pipeline; later frames pass through
                log::error!("Frame {} failed: {}", index, e);
                background.clone()
            }
        };

        let path = config.frame_path(index);
        frame
            .save(&path)
            .with_context(|| format!("Failed to write {:?}", path))?;
        log::debug!("Wrote {:?}", path);
    }

    if let Some(pipeline) = compositor.pipeline_mut() {
        let (boxes, sources) = pipeline.allocated_counts();
        log::info!("Final scene buffers: {} boxes, {} sources", boxes, sources);
    }
    log::info!("Rendered {} frames to {:?}", config.frames, config.output_dir);
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    log::info!("Starting Echotrace");

    let config = match std::env::args().nth(1) {
        Some(path) => RunConfig::load(&path)?,
        None => {
            log::info!("No run config given, rendering the built-in demo");
            RunConfig::demo()
        }
    };

    run(&config)
}
