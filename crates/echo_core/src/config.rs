//! JSON scene descriptions.
//!
//! A description lists boxes and sources; [`SceneDescription::populate`]
//! registers them with a [`SceneRegistry`] in file order.

use std::path::Path;

use echo_math::{Aabb, EulerRot, Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::error::{SceneError, SceneResult};
use crate::primitive::Material;
use crate::registry::{BoxHandle, SceneBox, SceneRegistry, SceneSource, SourceHandle};
use crate::spectrum::ColorMode;

/// Material factors as written in a scene file.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterialDescription {
    pub absorption: f32,
    pub transmission: f32,
    pub roughness: f32,
    pub scatter: f32,
}

impl Default for MaterialDescription {
    fn default() -> Self {
        let material = Material::default();
        Self {
            absorption: material.absorption,
            transmission: material.transmission,
            roughness: material.roughness,
            scatter: material.scatter,
        }
    }
}

impl From<MaterialDescription> for Material {
    fn from(desc: MaterialDescription) -> Self {
        Material::new(desc.absorption, desc.transmission, desc.roughness, desc.scatter)
    }
}

/// A box renderable: a `size` cube-ish volume centered at `center`,
/// optionally rotated (Euler YXZ, degrees) before its world bounds are taken.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxDescription {
    #[serde(default)]
    pub name: String,
    pub center: [f32; 3],
    pub size: [f32; 3],
    #[serde(default)]
    pub rotation_degrees: [f32; 3],
    #[serde(default)]
    pub material: MaterialDescription,
}

impl BoxDescription {
    pub fn local_to_world(&self) -> Mat4 {
        let [x, y, z] = self.rotation_degrees;
        let rotation = Quat::from_euler(
            EulerRot::YXZ,
            y.to_radians(),
            x.to_radians(),
            z.to_radians(),
        );
        Mat4::from_rotation_translation(rotation, Vec3::from_array(self.center))
    }

    pub fn to_scene_box(&self) -> SceneBox {
        let local = Aabb::from_center_size(Vec3::ZERO, Vec3::from_array(self.size));
        SceneBox::from_local_bounds(local, self.local_to_world(), self.material.into())
            .with_name(self.name.clone())
    }
}

/// How a source's color is driven at runtime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorModeDescription {
    /// Color and intensity stay as declared.
    #[default]
    Static,
    /// Declared color scaled by spectrum energy.
    Fixed,
    /// Color derived from the spectrum's frequency content.
    Procedural,
}

/// Synthetic audio content for a source: a single tone, optionally pulsing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ToneDescription {
    pub frequency_hz: f32,
    #[serde(default = "default_amplitude")]
    pub amplitude: f32,
    #[serde(default)]
    pub pulse_hz: f32,
}

fn default_amplitude() -> f32 {
    1.0
}

fn default_color() -> [f32; 3] {
    [1.0, 1.0, 1.0]
}

fn default_intensity() -> f32 {
    100.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceDescription {
    #[serde(default)]
    pub name: String,
    pub position: [f32; 3],
    #[serde(default = "default_color")]
    pub color: [f32; 3],
    #[serde(default = "default_intensity")]
    pub intensity: f32,
    #[serde(default)]
    pub color_mode: ColorModeDescription,
    #[serde(default)]
    pub tone: Option<ToneDescription>,
}

impl SourceDescription {
    /// Runtime color mode, or `None` for static sources.
    pub fn color_mode(&self) -> Option<ColorMode> {
        match self.color_mode {
            ColorModeDescription::Static => None,
            ColorModeDescription::Fixed => Some(ColorMode::Fixed(Vec3::from_array(self.color))),
            ColorModeDescription::Procedural => Some(ColorMode::Procedural),
        }
    }

    pub fn to_scene_source(&self) -> SceneSource {
        let mut source = SceneSource::at(Vec3::from_array(self.position)).with_name(self.name.clone());
        source.color = Vec3::from_array(self.color);
        source.intensity = self.intensity;
        source
    }
}

/// Complete scene file contents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneDescription {
    pub boxes: Vec<BoxDescription>,
    pub sources: Vec<SourceDescription>,
}

impl SceneDescription {
    /// Parse and validate a description from JSON text.
    pub fn from_json_str(text: &str) -> SceneResult<Self> {
        let description: Self = serde_json::from_str(text)?;
        description.validate()?;
        Ok(description)
    }

    /// Load and validate a description from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> SceneResult<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        log::info!("Loading scene description from {:?}", path.as_ref());
        Self::from_json_str(&text)
    }

    /// Reject non-finite values and negative intensities.
    ///
    /// Zero-size boxes are accepted; they render as empty. Material factors
    /// outside [0, 1] only produce a warning.
    pub fn validate(&self) -> SceneResult<()> {
        for (index, desc) in self.boxes.iter().enumerate() {
            let values = desc
                .center
                .iter()
                .chain(&desc.size)
                .chain(&desc.rotation_degrees);
            if values.into_iter().any(|v| !v.is_finite()) {
                return Err(SceneError::InvalidDescription(format!(
                    "box {} '{}' has non-finite geometry",
                    index, desc.name
                )));
            }
            if !Material::from(desc.material).is_normalized() {
                log::warn!(
                    "box {} '{}' has material factors outside [0, 1]: {:?}",
                    index,
                    desc.name,
                    desc.material
                );
            }
        }

        for (index, desc) in self.sources.iter().enumerate() {
            if desc.position.iter().chain(&desc.color).any(|v| !v.is_finite()) {
                return Err(SceneError::InvalidDescription(format!(
                    "source {} '{}' has non-finite position or color",
                    index, desc.name
                )));
            }
            if !(desc.intensity >= 0.0) {
                return Err(SceneError::InvalidDescription(format!(
                    "source {} '{}' has negative intensity {}",
                    index, desc.name, desc.intensity
                )));
            }
            if let Some(tone) = desc.tone {
                if !(tone.frequency_hz >= 0.0) || !tone.amplitude.is_finite() {
                    return Err(SceneError::InvalidDescription(format!(
                        "source {} '{}' has an invalid tone",
                        index, desc.name
                    )));
                }
            }
        }

        Ok(())
    }

    /// Register every box and source, returning their handles in file order.
    pub fn populate(&self, registry: &mut SceneRegistry) -> (Vec<BoxHandle>, Vec<SourceHandle>) {
        let boxes = self
            .boxes
            .iter()
            .map(|desc| {
                let scene_box = desc.to_scene_box();
                if scene_box.bounds().is_degenerate() {
                    log::warn!(
                        "box '{}' has zero extent {:?} and will never be hit",
                        desc.name,
                        scene_box.bounds().size()
                    );
                }
                registry.register_box(scene_box)
            })
            .collect();
        let sources = self
            .sources
            .iter()
            .map(|desc| registry.register_source(desc.to_scene_source()))
            .collect();
        (boxes, sources)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCENE: &str = r#"{
        "boxes": [
            { "name": "floor", "center": [0, -0.5, 0], "size": [10, 1, 10] },
            {
                "name": "wall",
                "center": [0, 1, 4],
                "size": [4, 2, 0.2],
                "rotation_degrees": [0, 90, 0],
                "material": { "absorption": 0.9 }
            }
        ],
        "sources": [
            { "name": "speaker", "position": [0, 1, 0], "color_mode": "procedural",
              "tone": { "frequency_hz": 440 } }
        ]
    }"#;

    #[test]
    fn test_parse_with_defaults() {
        let scene = SceneDescription::from_json_str(SCENE).unwrap();

        assert_eq!(scene.boxes.len(), 2);
        assert_eq!(scene.boxes[0].material, MaterialDescription::default());
        assert_eq!(scene.boxes[1].material.absorption, 0.9);
        assert_eq!(scene.boxes[1].material.transmission, 0.2);

        let source = &scene.sources[0];
        assert_eq!(source.intensity, 100.0);
        assert_eq!(source.color, [1.0, 1.0, 1.0]);
        assert_eq!(source.color_mode(), Some(ColorMode::Procedural));
        assert_eq!(source.tone.unwrap().amplitude, 1.0);
    }

    #[test]
    fn test_empty_document_is_empty_scene() {
        let scene = SceneDescription::from_json_str("{}").unwrap();
        assert!(scene.boxes.is_empty());
        assert!(scene.sources.is_empty());
    }

    #[test]
    fn test_populate_registers_in_order() {
        let scene = SceneDescription::from_json_str(SCENE).unwrap();
        let mut registry = SceneRegistry::new();
        let (boxes, sources) = scene.populate(&mut registry);

        assert_eq!(boxes.len(), 2);
        assert_eq!(sources.len(), 1);
        assert_eq!(registry.get_box(boxes[0]).unwrap().name, "floor");

        // Rotated 90 degrees about Y, the thin wall spans X instead of Z
        let wall = registry.get_box(boxes[1]).unwrap().bounds();
        assert!((wall.size().x - 0.2).abs() < 1e-4);
        assert!((wall.size().z - 4.0).abs() < 1e-4);
    }

    #[test]
    fn test_negative_intensity_rejected() {
        let text = r#"{ "sources": [ { "position": [0, 0, 0], "intensity": -1 } ] }"#;
        match SceneDescription::from_json_str(text) {
            Err(SceneError::InvalidDescription(message)) => assert!(message.contains("negative")),
            other => panic!("expected invalid description, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_json_is_parse_error() {
        assert!(matches!(
            SceneDescription::from_json_str("{ boxes: ["),
            Err(SceneError::Parse(_))
        ));
    }

    #[test]
    fn test_zero_size_box_accepted() {
        let text = r#"{ "boxes": [ { "center": [0, 0, 0], "size": [0, 1, 1] } ] }"#;
        let scene = SceneDescription::from_json_str(text).unwrap();
        let mut registry = SceneRegistry::new();
        let (boxes, _) = scene.populate(&mut registry);
        assert!(registry.get_box(boxes[0]).unwrap().bounds().is_degenerate());
    }

    #[test]
    fn test_negative_size_is_mirrored_not_inverted() {
        let text = r#"{ "boxes": [ { "center": [0, 0, 0], "size": [-2, 1, 1] } ] }"#;
        let scene = SceneDescription::from_json_str(text).unwrap();
        let bounds = scene.boxes[0].to_scene_box().bounds();
        assert_eq!(bounds.min.x, -1.0);
        assert_eq!(bounds.max.x, 1.0);
    }

    #[test]
    fn test_out_of_range_material_only_warns() {
        let text = r#"{ "boxes": [ { "center": [0, 0, 0], "size": [1, 1, 1],
                                     "material": { "absorption": 1.5 } } ] }"#;
        let scene = SceneDescription::from_json_str(text).unwrap();
        assert!(!Material::from(scene.boxes[0].material).is_normalized());
    }
}
