//! Per-frame view parameters for primary ray generation.

use echo_math::{Camera, Mat4};

/// Near-plane rectangle and camera transform consumed by the kernel.
///
/// The kernel maps a pixel's normalized coordinate `uv` to the local point
/// `((uv - 0.5) * (plane_width, plane_height), near_clip_distance)` and
/// transforms it by `camera_local_to_world` to get the ray direction.
/// Hits farther than `far_clip_distance` along the ray are discarded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewParameters {
    pub plane_width: f32,
    pub plane_height: f32,
    pub near_clip_distance: f32,
    pub far_clip_distance: f32,
    pub camera_local_to_world: Mat4,
}

impl ViewParameters {
    /// Derive the frustum rectangle at the near plane from a vertical FOV.
    pub fn from_camera(camera: &Camera) -> Self {
        let plane_height = 2.0 * camera.near * (camera.fov_y_degrees * 0.5).to_radians().tan();
        let plane_width = plane_height * camera.aspect;

        Self {
            plane_width,
            plane_height,
            near_clip_distance: camera.near,
            far_clip_distance: camera.far,
            camera_local_to_world: camera.local_to_world(),
        }
    }

    /// Packed as `(plane_width, plane_height, near_clip_distance, far_clip_distance)`.
    pub fn as_vec4(&self) -> [f32; 4] {
        [
            self.plane_width,
            self.plane_height,
            self.near_clip_distance,
            self.far_clip_distance,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use echo_math::Vec3;

    #[test]
    fn test_sixty_degree_widescreen() {
        let camera = Camera::new(Vec3::ZERO, 16.0 / 9.0).with_lens(60.0, 0.1, 100.0);
        let view = ViewParameters::from_camera(&camera);

        assert!((view.plane_height - 0.1155).abs() < 1e-3);
        assert!((view.plane_width - 0.2053).abs() < 1e-3);
        assert_eq!(view.near_clip_distance, 0.1);
    }

    #[test]
    fn test_ninety_degree_square() {
        let camera = Camera::new(Vec3::ZERO, 1.0).with_lens(90.0, 1.0, 10.0);
        let view = ViewParameters::from_camera(&camera);

        // tan(45 deg) = 1, so the plane spans [-1, 1] at distance 1
        assert!((view.plane_height - 2.0).abs() < 1e-5);
        assert!((view.plane_width - 2.0).abs() < 1e-5);
    }

    #[test]
    fn test_transform_follows_camera() {
        let camera = Camera::new(Vec3::new(3.0, 1.0, -2.0), 1.0).looking_at(Vec3::new(3.0, 1.0, 5.0));
        let view = ViewParameters::from_camera(&camera);

        let corner = view
            .camera_local_to_world
            .transform_point3(Vec3::new(0.0, 0.0, view.near_clip_distance));
        assert!((corner - Vec3::new(3.0, 1.0, -2.0 + camera.near)).length() < 1e-5);
    }

    #[test]
    fn test_as_vec4() {
        let camera = Camera::new(Vec3::ZERO, 2.0).with_lens(90.0, 0.5, 10.0);
        let packed = ViewParameters::from_camera(&camera).as_vec4();
        assert_eq!(packed[2], 0.5);
        assert_eq!(packed[3], 10.0);
    }
}
