//! GPU record layouts shared with the kernel.
//!
//! Every field is a 4-byte scalar, so the records pack without padding:
//!
//! | record        | floats | bytes | fields                                          |
//! |---------------|--------|-------|-------------------------------------------------|
//! | `RtMaterial`  | 4      | 16    | absorption, transmission, roughness, scatter    |
//! | `RtBox`       | 10     | 40    | min.xyz, max.xyz, material                      |
//! | `RtSource`    | 7      | 28    | position.xyz, color.xyz, intensity              |
//!
//! The WGSL side declares the same structs field by field (no `vec3`
//! members, which would force 16-byte alignment).

use bytemuck::{Pod, Zeroable};
use echo_core::{BoxPrimitive, Material, SourcePrimitive};

use crate::view::ViewParameters;

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct RtMaterial {
    pub absorption: f32,
    pub transmission: f32,
    pub roughness: f32,
    pub scatter: f32,
}

impl RtMaterial {
    pub const SIZE: usize = std::mem::size_of::<f32>() * 4;
}

impl From<Material> for RtMaterial {
    fn from(material: Material) -> Self {
        Self {
            absorption: material.absorption,
            transmission: material.transmission,
            roughness: material.roughness,
            scatter: material.scatter,
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct RtBox {
    pub min: [f32; 3],
    pub max: [f32; 3],
    pub material: RtMaterial,
}

impl RtBox {
    pub const SIZE: usize = std::mem::size_of::<f32>() * 6 + RtMaterial::SIZE;
}

impl From<&BoxPrimitive> for RtBox {
    fn from(primitive: &BoxPrimitive) -> Self {
        Self {
            min: primitive.min.to_array(),
            max: primitive.max.to_array(),
            material: primitive.material.into(),
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct RtSource {
    pub position: [f32; 3],
    pub color: [f32; 3],
    pub intensity: f32,
}

impl RtSource {
    pub const SIZE: usize = std::mem::size_of::<f32>() * 7;
}

impl From<&SourcePrimitive> for RtSource {
    fn from(primitive: &SourcePrimitive) -> Self {
        Self {
            position: primitive.position.to_array(),
            color: primitive.color.to_array(),
            intensity: primitive.intensity,
        }
    }
}

const _: () = assert!(std::mem::size_of::<RtMaterial>() == RtMaterial::SIZE);
const _: () = assert!(std::mem::size_of::<RtBox>() == RtBox::SIZE);
const _: () = assert!(std::mem::size_of::<RtSource>() == RtSource::SIZE);
const _: () = assert!(RtBox::SIZE == 40 && RtSource::SIZE == 28);

/// Pack boxes in order. Degenerate bounds are copied unchanged.
pub fn pack_boxes(boxes: &[BoxPrimitive]) -> Vec<RtBox> {
    boxes.iter().map(RtBox::from).collect()
}

/// Pack sources in order.
pub fn pack_sources(sources: &[SourcePrimitive]) -> Vec<RtSource> {
    sources.iter().map(RtSource::from).collect()
}

/// Per-frame uniform block (binding 0).
///
/// Matches the WGSL `Frame` struct: a mat4 at offset 0, the view
/// parameters vec4 at 64, then four u32 (box count, source count,
/// output width, output height). 96 bytes total.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct FrameUniforms {
    pub camera_local_to_world: [[f32; 4]; 4],
    /// (plane width, plane height, near clip distance, far clip distance)
    pub view_parameters: [f32; 4],
    pub box_count: u32,
    pub source_count: u32,
    pub resolution: [u32; 2],
}

const _: () = assert!(std::mem::size_of::<FrameUniforms>() == 96);

impl FrameUniforms {
    pub fn new(view: &ViewParameters, box_count: u32, source_count: u32, width: u32, height: u32) -> Self {
        Self {
            camera_local_to_world: view.camera_local_to_world.to_cols_array_2d(),
            view_parameters: view.as_vec4(),
            box_count,
            source_count,
            resolution: [width, height],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use echo_math::{Aabb, Camera, Vec3};

    fn read_f32s(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect()
    }

    fn sample_boxes() -> Vec<BoxPrimitive> {
        vec![
            BoxPrimitive::new(
                Aabb::new(Vec3::new(-1.0, 0.0, 2.5), Vec3::new(1.0, 3.25, 4.0)),
                Material::new(0.1, 0.2, 0.3, 0.4),
            ),
            BoxPrimitive::new(
                Aabb::new(Vec3::splat(f32::MIN_POSITIVE), Vec3::splat(1.0e7)),
                Material::new(1.0, 0.0, 0.75, 0.125),
            ),
            // Inverted on purpose; must pass through as-is
            BoxPrimitive::new(
                Aabb::new(Vec3::ONE, Vec3::ZERO),
                Material::default(),
            ),
        ]
    }

    #[test]
    fn test_record_sizes() {
        assert_eq!(RtMaterial::SIZE, 16);
        assert_eq!(RtBox::SIZE, 40);
        assert_eq!(RtSource::SIZE, 28);
    }

    #[test]
    fn test_box_packing_layout() {
        let boxes = sample_boxes();
        let packed = pack_boxes(&boxes);
        let bytes: &[u8] = bytemuck::cast_slice(&packed);

        assert_eq!(bytes.len(), boxes.len() * RtBox::SIZE);

        for (record, expected) in bytes.chunks_exact(RtBox::SIZE).zip(&boxes) {
            let floats = read_f32s(record);
            assert_eq!(floats[0..3], expected.min.to_array());
            assert_eq!(floats[3..6], expected.max.to_array());
            assert_eq!(floats[6], expected.material.absorption);
            assert_eq!(floats[7], expected.material.transmission);
            assert_eq!(floats[8], expected.material.roughness);
            assert_eq!(floats[9], expected.material.scatter);
        }
    }

    #[test]
    fn test_box_packing_bit_exact() {
        let boxes = sample_boxes();
        let packed = pack_boxes(&boxes);
        let bytes: &[u8] = bytemuck::cast_slice(&packed);
        let floats = read_f32s(bytes);

        assert_eq!(floats[10].to_bits(), f32::MIN_POSITIVE.to_bits());
        assert_eq!(floats[13].to_bits(), 1.0e7f32.to_bits());
    }

    #[test]
    fn test_source_packing_layout() {
        let sources = vec![
            SourcePrimitive {
                position: Vec3::new(1.0, 2.0, 3.0),
                color: Vec3::new(0.25, 0.5, 0.75),
                intensity: 100.0,
            },
            SourcePrimitive {
                position: Vec3::new(-4.0, 0.0, 9.5),
                color: Vec3::ZERO,
                intensity: 0.0,
            },
        ];
        let packed = pack_sources(&sources);
        let bytes: &[u8] = bytemuck::cast_slice(&packed);

        assert_eq!(bytes.len(), 2 * RtSource::SIZE);
        for (record, expected) in bytes.chunks_exact(RtSource::SIZE).zip(&sources) {
            let floats = read_f32s(record);
            assert_eq!(floats[0..3], expected.position.to_array());
            assert_eq!(floats[3..6], expected.color.to_array());
            assert_eq!(floats[6], expected.intensity);
        }
    }

    #[test]
    fn test_empty_packing() {
        assert!(pack_boxes(&[]).is_empty());
        assert!(pack_sources(&[]).is_empty());
    }

    #[test]
    fn test_frame_uniform_layout() {
        let camera = Camera::new(Vec3::new(1.0, 2.0, 3.0), 2.0).with_lens(90.0, 0.5, 100.0);
        let view = ViewParameters::from_camera(&camera);
        let uniforms = FrameUniforms::new(&view, 3, 4, 640, 480);
        let bytes = bytemuck::bytes_of(&uniforms);

        let floats = read_f32s(&bytes[0..80]);
        // Column-major: translation lives in the fourth column
        assert_eq!(floats[12..15], [1.0, 2.0, 3.0]);
        assert!((floats[16] - 2.0).abs() < 1e-5);
        assert!((floats[17] - 1.0).abs() < 1e-5);
        assert_eq!(floats[18], 0.5);
        assert_eq!(floats[19], 100.0);

        let ints: Vec<u32> = bytes[80..96]
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        assert_eq!(ints, vec![3, 4, 640, 480]);
    }
}
