//! Run configuration for the headless driver.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use echo_core::config::{ColorModeDescription, ToneDescription};
use echo_core::{BoxDescription, MaterialDescription, SceneDescription, SourceDescription};
use echo_math::{Camera, FlyController, MoveInput, Vec3};
use image::{Rgba, RgbaImage};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraDescription {
    pub position: [f32; 3],
    pub target: [f32; 3],
    pub fov_y_degrees: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for CameraDescription {
    fn default() -> Self {
        Self {
            position: [0.0, 1.5, -6.0],
            target: [0.0, 1.0, 0.0],
            fov_y_degrees: 60.0,
            near: 0.3,
            far: 1000.0,
        }
    }
}

impl CameraDescription {
    pub fn to_camera(&self, aspect: f32) -> Camera {
        Camera::new(Vec3::from_array(self.position), aspect)
            .with_lens(self.fov_y_degrees, self.near, self.far)
            .looking_at(Vec3::from_array(self.target))
    }
}

/// Scripted fly-camera input applied every frame.
///
/// Movement axes are in [-1, 1]; look deltas are in pixels per frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionDescription {
    pub forward: f32,
    pub right: f32,
    pub up: f32,
    pub look_dx: f32,
    pub look_dy: f32,
}

impl MotionDescription {
    pub fn apply(&self, controller: &FlyController, camera: &mut Camera, delta_time: f32) {
        if self.look_dx != 0.0 || self.look_dy != 0.0 {
            controller.look(camera, self.look_dx, self.look_dy);
        }
        let input = MoveInput {
            forward: self.forward.clamp(-1.0, 1.0),
            right: self.right.clamp(-1.0, 1.0),
            up: self.up.clamp(-1.0, 1.0),
        };
        controller.translate(camera, input, delta_time);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub width: u32,
    pub height: u32,
    pub frames: u32,
    /// Seconds between frames
    pub delta_time: f32,
    pub output_dir: PathBuf,
    pub use_shader: bool,
    /// Sample rate the synthetic spectra are generated for
    pub sample_rate: u32,
    pub camera: CameraDescription,
    /// PNG used as the camera image; a gradient is generated when absent
    pub background: Option<PathBuf>,
    pub motion: Option<MotionDescription>,
    /// Scene JSON loaded in place of `scene`, relative to the run config
    pub scene_file: Option<PathBuf>,
    pub scene: SceneDescription,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            frames: 1,
            delta_time: 1.0 / 30.0,
            output_dir: PathBuf::from("frames"),
            use_shader: true,
            sample_rate: 48_000,
            camera: CameraDescription::default(),
            background: None,
            motion: None,
            scene_file: None,
            scene: SceneDescription::default(),
        }
    }
}

impl RunConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read run config {:?}", path))?;
        let mut config: Self = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse run config {:?}", path))?;

        if let Some(scene_file) = &config.scene_file {
            let scene_path = path.parent().unwrap_or(Path::new(".")).join(scene_file);
            config.scene = SceneDescription::load(&scene_path)
                .with_context(|| format!("Failed to load scene {:?}", scene_path))?;
        }

        config.validate()?;
        log::info!("Loaded run config from {:?}", path);
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            bail!("Resolution must be non-zero, got {}x{}", self.width, self.height);
        }
        let max_dimension = echo_render::default_max_frame_dimension();
        if self.width > max_dimension || self.height > max_dimension {
            bail!(
                "Resolution {}x{} exceeds the {} pixel texture limit",
                self.width,
                self.height,
                max_dimension
            );
        }
        if !(self.camera.near > 0.0 && self.camera.far > self.camera.near) {
            bail!(
                "Camera clip range must satisfy 0 < near < far, got {}..{}",
                self.camera.near,
                self.camera.far
            );
        }
        if !(self.delta_time > 0.0) {
            bail!("delta_time must be positive, got {}", self.delta_time);
        }
        if self.sample_rate == 0 {
            bail!("sample_rate must be non-zero");
        }
        self.scene.validate().context("Invalid scene")?;
        Ok(())
    }

    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height as f32
    }

    pub fn frame_path(&self, index: u32) -> PathBuf {
        self.output_dir.join(format!("frame_{:04}.png", index))
    }

    /// Camera image for every frame, at the configured resolution.
    pub fn background_image(&self) -> Result<RgbaImage> {
        let Some(path) = &self.background else {
            return Ok(gradient(self.width, self.height));
        };

        let image = image::open(path)
            .with_context(|| format!("Failed to open background {:?}", path))?
            .to_rgba8();
        if image.dimensions() == (self.width, self.height) {
            return Ok(image);
        }

        log::info!(
            "Resizing background from {:?} to {}x{}",
            image.dimensions(),
            self.width,
            self.height
        );
        Ok(image::imageops::resize(
            &image,
            self.width,
            self.height,
            image::imageops::FilterType::Triangle,
        ))
    }

    /// Small scene with a floor, two pillars and two singing sources.
    pub fn demo() -> Self {
        let wall = MaterialDescription {
            absorption: 0.3,
            transmission: 0.1,
            roughness: 0.6,
            scatter: 0.4,
        };

        let boxes = vec![
            BoxDescription {
                name: "floor".into(),
                center: [0.0, -0.05, 0.0],
                size: [12.0, 0.1, 12.0],
                rotation_degrees: [0.0, 0.0, 0.0],
                material: MaterialDescription::default(),
            },
            BoxDescription {
                name: "pillar_left".into(),
                center: [-1.5, 1.0, 1.5],
                size: [0.6, 2.0, 0.6],
                rotation_degrees: [0.0, 30.0, 0.0],
                material: wall,
            },
            BoxDescription {
                name: "pillar_right".into(),
                center: [1.5, 1.0, 1.5],
                size: [0.6, 2.0, 0.6],
                rotation_degrees: [0.0, -30.0, 0.0],
                material: wall,
            },
        ];

        let sources = vec![
            SourceDescription {
                name: "low".into(),
                position: [-0.5, 1.0, 0.0],
                color: [1.0, 1.0, 1.0],
                intensity: 40.0,
                color_mode: ColorModeDescription::Procedural,
                tone: Some(ToneDescription {
                    frequency_hz: 110.0,
                    amplitude: 1.0,
                    pulse_hz: 0.5,
                }),
            },
            SourceDescription {
                name: "high".into(),
                position: [0.5, 1.5, 0.5],
                color: [0.2, 0.6, 1.0],
                intensity: 40.0,
                color_mode: ColorModeDescription::Fixed,
                tone: Some(ToneDescription {
                    frequency_hz: 4_000.0,
                    amplitude: 0.8,
                    pulse_hz: 2.0,
                }),
            },
        ];

        Self {
            width: 640,
            height: 360,
            frames: 30,
            motion: Some(MotionDescription {
                forward: 0.5,
                look_dx: 4.0,
                ..Default::default()
            }),
            scene: SceneDescription { boxes, sources },
            ..Default::default()
        }
    }
}

/// Dark vertical gradient standing in for a camera feed.
fn gradient(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |_, y| {
        let t = y as f32 / height.max(1) as f32;
        let shade = |top: f32, bottom: f32| ((top + (bottom - top) * t) * 255.0) as u8;
        Rgba([shade(0.10, 0.02), shade(0.12, 0.03), shade(0.20, 0.05), 255])
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_document() {
        let config: RunConfig = serde_json::from_str("{}").unwrap();
        assert_eq!((config.width, config.height), (1920, 1080));
        assert!(config.use_shader);
        assert!(config.background.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_document() {
        let text = r#"{
            "width": 320,
            "height": 240,
            "use_shader": false,
            "camera": { "fov_y_degrees": 45 },
            "scene": { "sources": [ { "position": [0, 1, 0] } ] }
        }"#;
        let config: RunConfig = serde_json::from_str(text).unwrap();

        assert_eq!(config.frames, 1);
        assert!(!config.use_shader);
        assert_eq!(config.camera.fov_y_degrees, 45.0);
        assert_eq!(config.camera.near, 0.3);
        assert_eq!(config.scene.sources.len(), 1);
        assert!((config.aspect() - 4.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_zero_resolution_rejected() {
        let config = RunConfig {
            width: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_oversized_resolution_rejected() {
        let config = RunConfig {
            width: 10_000,
            height: 360,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = RunConfig {
            width: 8192,
            height: 64,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_inverted_clip_range_rejected() {
        let mut config = RunConfig::default();
        config.camera.far = 0.1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_scene_file_resolved_next_to_config() {
        let dir = std::env::temp_dir().join(format!("echotrace-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("room.json"),
            r#"{ "boxes": [ { "center": [0, 0, 0], "size": [1, 1, 1] } ] }"#,
        )
        .unwrap();
        std::fs::write(
            dir.join("run.json"),
            r#"{ "width": 64, "height": 32, "scene_file": "room.json" }"#,
        )
        .unwrap();

        let config = RunConfig::load(dir.join("run.json")).unwrap();
        assert_eq!(config.scene.boxes.len(), 1);

        std::fs::write(dir.join("broken.json"), r#"{ "scene_file": "missing.json" }"#).unwrap();
        assert!(RunConfig::load(dir.join("broken.json")).is_err());

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_frame_path() {
        let config = RunConfig::default();
        assert_eq!(config.frame_path(7), PathBuf::from("frames/frame_0007.png"));
    }

    #[test]
    fn test_demo_is_valid() {
        let config = RunConfig::demo();
        assert!(config.validate().is_ok());
        assert_eq!(config.scene.boxes.len(), 3);
        assert_eq!(config.scene.sources.len(), 2);
    }

    #[test]
    fn test_generated_background_matches_resolution() {
        let config = RunConfig {
            width: 32,
            height: 16,
            ..Default::default()
        };
        let background = config.background_image().unwrap();
        assert_eq!(background.dimensions(), (32, 16));
    }

    #[test]
    fn test_camera_looks_at_target() {
        let camera = CameraDescription::default().to_camera(16.0 / 9.0);
        let expected = (Vec3::new(0.0, 1.0, 0.0) - Vec3::new(0.0, 1.5, -6.0)).normalize();
        assert!((camera.forward() - expected).length() < 1e-4);
    }

    #[test]
    fn test_motion_moves_forward() {
        let controller = FlyController::default();
        let mut camera = Camera::new(Vec3::ZERO, 1.0);
        let motion = MotionDescription {
            forward: 1.0,
            ..Default::default()
        };
        motion.apply(&controller, &mut camera, 0.5);
        assert!((camera.position - Vec3::new(0.0, 0.0, 1.0)).length() < 1e-4);
    }
}
