use glam::{Mat3, Mat4, Quat, Vec3};

/// Perspective camera used for primary ray generation.
///
/// Local axes follow the kernel convention: +X right, +Y up, +Z forward.
/// The field of view is vertical and stored in degrees.
#[derive(Debug, Clone, Copy)]
pub struct Camera {
    pub position: Vec3,
    pub rotation: Quat,
    pub fov_y_degrees: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Camera {
    /// Create a new camera at `position` looking down +Z
    pub fn new(position: Vec3, aspect: f32) -> Self {
        Self {
            position,
            rotation: Quat::IDENTITY,
            fov_y_degrees: 60.0,
            aspect,
            near: 0.3,
            far: 1000.0,
        }
    }

    /// Set lens settings.
    pub fn with_lens(mut self, fov_y_degrees: f32, near: f32, far: f32) -> Self {
        self.fov_y_degrees = fov_y_degrees;
        self.near = near;
        self.far = far;
        self
    }

    /// Orient the camera so +Z points at `target`, keeping world +Y up.
    ///
    /// Leaves the rotation untouched when the target coincides with the
    /// camera position or lies straight above/below it.
    pub fn looking_at(mut self, target: Vec3) -> Self {
        let forward = target - self.position;
        if forward.length_squared() <= f32::EPSILON {
            return self;
        }
        let forward = forward.normalize();
        let right = Vec3::Y.cross(forward);
        if right.length_squared() <= f32::EPSILON {
            return self;
        }
        let right = right.normalize();
        let up = forward.cross(right);
        self.rotation = Quat::from_mat3(&Mat3::from_cols(right, up, forward)).normalize();
        self
    }

    /// Local-to-world transform (rotation then translation, no scale).
    pub fn local_to_world(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.rotation, self.position)
    }

    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::Z
    }

    pub fn right(&self) -> Vec3 {
        self.rotation * Vec3::X
    }
}

/// Per-frame movement intent, each axis in [-1, 1].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MoveInput {
    pub forward: f32,
    pub right: f32,
    pub up: f32,
}

/// Free-fly controls: mouse look plus WASD/QE style translation.
#[derive(Debug, Clone, Copy)]
pub struct FlyController {
    /// Units per second
    pub move_speed: f32,
    /// Radians per pixel of mouse travel
    pub look_sensitivity: f32,
}

impl Default for FlyController {
    fn default() -> Self {
        Self {
            move_speed: 2.0,
            look_sensitivity: 0.001,
        }
    }
}

impl FlyController {
    /// Yaw about world up by `dx`, then pitch about the camera's right axis by `-dy`.
    pub fn look(&self, camera: &mut Camera, dx: f32, dy: f32) {
        let yaw = Quat::from_axis_angle(Vec3::Y, dx * self.look_sensitivity);
        camera.rotation = (yaw * camera.rotation).normalize();

        let pitch = Quat::from_axis_angle(camera.right(), -dy * self.look_sensitivity);
        camera.rotation = (pitch * camera.rotation).normalize();
    }

    /// Translate along camera forward/right and world up, scaled by `delta_time`.
    pub fn translate(&self, camera: &mut Camera, input: MoveInput, delta_time: f32) {
        let step = self.move_speed * delta_time;
        camera.position += camera.forward() * input.forward * step
            + camera.right() * input.right * step
            + Vec3::Y * input.up * step;
    }
}
