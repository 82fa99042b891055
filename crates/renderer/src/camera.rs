//! Orbiting perspective camera.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec2, Vec3};

/// Smallest polar angle, keeps the view from flipping over the poles.
const MIN_POLAR: f32 = 1.0e-4;

/// Perspective camera orbiting a target, with damped controls.
///
/// Rotation and pan input accumulate into pending deltas that `update`
/// bleeds off by `damping` each frame, so motion eases out after the
/// pointer stops.
#[derive(Debug, Clone)]
pub struct OrbitCamera {
    /// Point the camera orbits and looks at.
    pub target: Vec3,
    /// Distance from target.
    radius: f32,
    /// Azimuth around +Y in radians (0 = towards +Z).
    theta: f32,
    /// Polar angle from +Y in radians.
    phi: f32,
    /// Vertical field of view in degrees.
    pub fov_degrees: f32,
    /// Near clipping plane.
    pub near: f32,
    /// Far clipping plane.
    pub far: f32,
    /// Aspect ratio (width / height).
    pub aspect: f32,
    /// Fraction of pending motion applied per update (0 disables damping).
    pub damping: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    pending_theta: f32,
    pending_phi: f32,
    pending_pan: Vec3,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self::looking_at(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO)
    }
}

impl OrbitCamera {
    /// Place the camera at `position` looking at `target`.
    pub fn looking_at(position: Vec3, target: Vec3) -> Self {
        let mut camera = Self {
            target,
            radius: 1.0,
            theta: 0.0,
            phi: std::f32::consts::FRAC_PI_2,
            fov_degrees: 45.0,
            near: 0.1,
            far: 100.0,
            aspect: 16.0 / 9.0,
            damping: 0.05,
            rotate_speed: 1.0,
            zoom_speed: 1.0,
            min_distance: 0.5,
            max_distance: 90.0,
            pending_theta: 0.0,
            pending_phi: 0.0,
            pending_pan: Vec3::ZERO,
        };
        camera.set_position(position);
        camera
    }

    /// Move the eye, keeping the current target.
    pub fn set_position(&mut self, position: Vec3) {
        let offset = position - self.target;
        self.radius = offset.length().max(MIN_POLAR);
        self.theta = offset.x.atan2(offset.z);
        self.phi = (offset.y / self.radius).clamp(-1.0, 1.0).acos();
    }

    /// Update aspect ratio (call on window resize).
    pub fn set_aspect(&mut self, width: u32, height: u32) {
        self.aspect = width as f32 / height.max(1) as f32;
    }

    /// Queue a rotation from a pointer drag of `delta` pixels.
    pub fn rotate(&mut self, delta: Vec2, viewport_height: f32) {
        let h = viewport_height.max(1.0);
        self.pending_theta -= std::f32::consts::TAU * delta.x / h * self.rotate_speed;
        self.pending_phi -= std::f32::consts::TAU * delta.y / h * self.rotate_speed;
    }

    /// Queue a pan from a pointer drag of `delta` pixels.
    pub fn pan(&mut self, delta: Vec2, viewport_height: f32) {
        let h = viewport_height.max(1.0);
        // Scale so the point under the cursor at target depth follows it.
        let target_distance = self.radius * (self.fov_degrees.to_radians() * 0.5).tan();
        let view = self.view_matrix();
        let right = Vec3::new(view.x_axis.x, view.y_axis.x, view.z_axis.x);
        let up = Vec3::new(view.x_axis.y, view.y_axis.y, view.z_axis.y);
        self.pending_pan += right * (-2.0 * delta.x * target_distance / h);
        self.pending_pan += up * (2.0 * delta.y * target_distance / h);
    }

    /// Dolly towards (positive `lines`) or away from the target.
    pub fn zoom(&mut self, lines: f32) {
        if lines == 0.0 {
            return;
        }
        let scale = 0.95_f32.powf(lines * self.zoom_speed);
        self.radius = (self.radius * scale).clamp(self.min_distance, self.max_distance);
    }

    /// Apply pending motion, easing it out when damping is enabled.
    pub fn update(&mut self) {
        let factor = if self.damping > 0.0 { self.damping } else { 1.0 };

        self.theta += self.pending_theta * factor;
        self.phi = (self.phi + self.pending_phi * factor)
            .clamp(MIN_POLAR, std::f32::consts::PI - MIN_POLAR);
        self.target += self.pending_pan * factor;

        if self.damping > 0.0 {
            self.pending_theta *= 1.0 - self.damping;
            self.pending_phi *= 1.0 - self.damping;
            self.pending_pan *= 1.0 - self.damping;
        } else {
            self.pending_theta = 0.0;
            self.pending_phi = 0.0;
            self.pending_pan = Vec3::ZERO;
        }
    }

    /// Eye position in world space.
    pub fn position(&self) -> Vec3 {
        let sin_phi = self.phi.sin();
        self.target
            + Vec3::new(
                self.radius * sin_phi * self.theta.sin(),
                self.radius * self.phi.cos(),
                self.radius * sin_phi * self.theta.cos(),
            )
    }

    /// Get the view matrix.
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position(), self.target, Vec3::Y)
    }

    /// Get the projection matrix.
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_degrees.to_radians(), self.aspect, self.near, self.far)
    }

    /// Get the combined view-projection matrix.
    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Map a normalized device coordinate back into world space.
    /// `depth` is in the 0..1 clip range.
    pub fn unproject(&self, ndc: Vec2, depth: f32) -> Vec3 {
        self.view_projection_matrix()
            .inverse()
            .project_point3(Vec3::new(ndc.x, ndc.y, depth))
    }

    /// World-space ray through a pointer position: (origin, unit direction).
    pub fn screen_ray(&self, ndc: Vec2) -> (Vec3, Vec3) {
        let origin = self.position();
        let direction = (self.unproject(ndc, 0.5) - origin).normalize_or_zero();
        (origin, direction)
    }
}

/// Lighting and fog shared by every draw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Atmosphere {
    /// Clear colour behind the scene.
    pub background: [f32; 3],
    pub fog_color: [f32; 3],
    /// Exponential-squared fog density.
    pub fog_density: f32,
    pub ambient_color: [f32; 3],
    pub ambient_intensity: f32,
}

impl Default for Atmosphere {
    fn default() -> Self {
        Self {
            background: srgb_hex(0xcccccc),
            fog_color: srgb_hex(0xcccccc),
            fog_density: 0.05,
            ambient_color: [1.0, 1.0, 1.0],
            ambient_intensity: 0.5,
        }
    }
}

/// Convert an sRGB hex colour (`0xcccccc`) to linear RGB.
pub fn srgb_hex(hex: u32) -> [f32; 3] {
    let channel = |shift: u32| {
        let c = ((hex >> shift) & 0xff) as f32 / 255.0;
        if c <= 0.04045 {
            c / 12.92
        } else {
            ((c + 0.055) / 1.055).powf(2.4)
        }
    };
    [channel(16), channel(8), channel(0)]
}

/// Camera uniform data for GPU.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    pub position: [f32; 4], // w unused, padding
    /// rgb = fog colour, a = density.
    pub fog: [f32; 4],
    /// rgb = ambient colour * intensity. The only light in the scene.
    pub ambient: [f32; 4],
}

impl CameraUniform {
    pub fn new() -> Self {
        Self {
            view_proj: Mat4::IDENTITY.to_cols_array_2d(),
            view: Mat4::IDENTITY.to_cols_array_2d(),
            position: [0.0; 4],
            fog: [0.0; 4],
            ambient: [1.0, 1.0, 1.0, 0.0],
        }
    }

    pub fn update(&mut self, camera: &OrbitCamera, atmosphere: &Atmosphere) {
        self.view = camera.view_matrix().to_cols_array_2d();
        self.view_proj = camera.view_projection_matrix().to_cols_array_2d();
        let pos = camera.position();
        self.position = [pos.x, pos.y, pos.z, 1.0];
        let [r, g, b] = atmosphere.fog_color;
        self.fog = [r, g, b, atmosphere.fog_density];
        let [r, g, b] = atmosphere.ambient_color;
        let i = atmosphere.ambient_intensity;
        self.ambient = [r * i, g * i, b * i, 0.0];
    }
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start_camera() -> OrbitCamera {
        OrbitCamera::looking_at(Vec3::new(10.0, 10.0, -10.0), Vec3::ZERO)
    }

    #[test]
    fn position_round_trips_through_spherical() {
        let camera = start_camera();
        assert!((camera.position() - Vec3::new(10.0, 10.0, -10.0)).length() < 1e-4);
    }

    #[test]
    fn centre_ray_points_at_target() {
        let camera = start_camera();
        let (origin, dir) = camera.screen_ray(Vec2::ZERO);
        let expected = (Vec3::ZERO - origin).normalize();
        assert!((dir - expected).length() < 1e-4);
    }

    #[test]
    fn unproject_is_inverse_of_projection() {
        let camera = start_camera();
        let world = Vec3::new(1.0, 2.0, 0.5);
        let clip = camera.view_projection_matrix().project_point3(world);
        let back = camera.unproject(Vec2::new(clip.x, clip.y), clip.z);
        assert!((back - world).length() < 1e-3);
    }

    #[test]
    fn damped_rotation_eases_out() {
        let mut camera = start_camera();
        let before = camera.position();
        camera.rotate(Vec2::new(100.0, 0.0), 720.0);
        camera.update();
        let first_step = (camera.position() - before).length();
        let mid = camera.position();
        camera.update();
        let second_step = (camera.position() - mid).length();
        assert!(first_step > 0.0);
        assert!(second_step < first_step);
        // Orbiting keeps the distance to the target.
        assert!((camera.position().length() - camera.radius).abs() < 1e-3);
    }

    #[test]
    fn polar_angle_is_clamped() {
        let mut camera = start_camera();
        camera.damping = 0.0;
        camera.rotate(Vec2::new(0.0, -100_000.0), 100.0);
        camera.update();
        assert!(camera.position().y <= camera.radius);
        assert!(camera.view_matrix().is_finite());
    }

    #[test]
    fn zoom_respects_limits() {
        let mut camera = start_camera();
        camera.zoom(1000.0);
        assert_eq!(camera.radius, camera.min_distance);
        camera.zoom(-10_000.0);
        assert_eq!(camera.radius, camera.max_distance);
    }

    #[test]
    fn hex_colour_converts_to_linear() {
        let [r, g, b] = srgb_hex(0xffffff);
        assert!((r - 1.0).abs() < 1e-6 && (g - 1.0).abs() < 1e-6 && (b - 1.0).abs() < 1e-6);
        let [r, _, _] = srgb_hex(0xcccccc);
        assert!((r - 0.6038).abs() < 1e-3);
    }

    #[test]
    fn uniform_matches_shader_layout() {
        // view_proj, view, position, fog, ambient
        assert_eq!(std::mem::size_of::<CameraUniform>(), (16 + 16 + 4 + 4 + 4) * 4);
        let mut uniform = CameraUniform::new();
        uniform.update(&start_camera(), &Atmosphere::default());
        assert_eq!(uniform.ambient, [0.5, 0.5, 0.5, 0.0]);
        assert_eq!(uniform.fog[3], 0.05);
    }
}
