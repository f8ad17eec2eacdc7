//! Camera utilities for 3D visualization

use isoviz_core::Point3f;
use nalgebra::{Matrix4, Perspective3, Point3, Rotation3, Unit, Vector3};

/// Maps OpenGL clip depth `[-1, 1]` to the `[0, 1]` range wgpu expects
#[rustfmt::skip]
fn opengl_to_wgpu() -> Matrix4<f32> {
    Matrix4::new(
        1.0, 0.0, 0.0, 0.0,
        0.0, 1.0, 0.0, 0.0,
        0.0, 0.0, 0.5, 0.5,
        0.0, 0.0, 0.0, 1.0,
    )
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Pose {
    position: Point3<f32>,
    target: Point3<f32>,
    up: Vector3<f32>,
}

/// A perspective camera orbiting a focal point
#[derive(Debug, Clone)]
pub struct Camera {
    pub position: Point3<f32>,
    pub target: Point3<f32>,
    pub up: Vector3<f32>,
    /// Vertical field of view in radians
    pub fov: f32,
    pub aspect_ratio: f32,
    pub near: f32,
    pub far: f32,
    pub(crate) scene_radius: f32,
    pub(crate) home: Option<Pose>,
}

impl Camera {
    /// Create a new camera
    pub fn new(
        position: Point3<f32>,
        target: Point3<f32>,
        up: Vector3<f32>,
        fov: f32,
        aspect_ratio: f32,
        near: f32,
        far: f32,
    ) -> Self {
        Self {
            position,
            target,
            up,
            fov,
            aspect_ratio,
            near,
            far,
            scene_radius: 1.0,
            home: None,
        }
    }

    /// Get the view matrix
    pub fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(&self.position, &self.target, &self.up)
    }

    /// Get the projection matrix, with depth in `[0, 1]`
    pub fn projection_matrix(&self) -> Matrix4<f32> {
        let perspective = Perspective3::new(self.aspect_ratio, self.fov, self.near, self.far);
        opengl_to_wgpu() * perspective.into_inner()
    }

    pub fn distance(&self) -> f32 {
        (self.position - self.target).norm()
    }

    /// Place the camera on the +Z side of the box, looking down -Z with +Y up,
    /// close enough for the bounding sphere to fill the view.
    pub fn fit_bounds(&mut self, min: &Point3f, max: &Point3f) {
        let center = nalgebra::center(min, max);
        let mut radius = (max - min).norm() * 0.5;
        if radius <= f32::EPSILON {
            radius = 0.5;
        }

        let distance = radius / (self.fov * 0.5).sin();
        self.target = center;
        self.position = center + Vector3::z() * distance;
        self.up = Vector3::y();
        self.scene_radius = radius;
        self.reset_clipping_range();
    }

    /// Fit near and far planes around the bounding sphere
    pub fn reset_clipping_range(&mut self) {
        let distance = self.distance();
        let reach = self.scene_radius * 1.05;
        self.far = distance + reach;
        self.near = (distance - reach).max(self.far * 1e-3);
    }

    /// Rotate the camera about the focal point around the view-up axis
    pub fn azimuth(&mut self, degrees: f32) {
        if let Some(axis) = Unit::try_new(self.up, 1e-6) {
            self.rotate_about_target(axis, degrees);
        }
    }

    /// Rotate the camera about the focal point around the axis that is
    /// perpendicular to the view direction and the view-up vector.
    ///
    /// Positive angles move the camera toward the view-up direction. The
    /// view-up vector rotates with the camera, so it stays orthogonal to the
    /// view direction.
    pub fn elevation(&mut self, degrees: f32) {
        let to_camera = self.position - self.target;
        if let Some(axis) = Unit::try_new(to_camera.cross(&self.up), 1e-6) {
            self.rotate_about_target(axis, degrees);
        }
    }

    fn rotate_about_target(&mut self, axis: Unit<Vector3<f32>>, degrees: f32) {
        let rotation = Rotation3::from_axis_angle(&axis, degrees.to_radians());
        self.position = self.target + rotation * (self.position - self.target);
        self.up = (rotation * self.up).normalize();
    }

    /// Rotate the view by mouse drag amounts, in degrees
    pub fn orbit(&mut self, horizontal: f32, vertical: f32) {
        self.azimuth(horizontal);
        self.elevation(vertical);
    }

    /// World-space size of one pixel at the focal point for a viewport `height` pixels tall
    pub fn world_per_pixel(&self, height: f32) -> f32 {
        2.0 * self.distance() * (self.fov * 0.5).tan() / height.max(1.0)
    }

    /// Translate camera and focal point within the view plane
    pub fn pan(&mut self, right: f32, up: f32) {
        let forward = (self.target - self.position).normalize();
        let right_axis = forward.cross(&self.up).normalize();
        let up_axis = right_axis.cross(&forward);
        let offset = right_axis * right + up_axis * up;
        self.position += offset;
        self.target += offset;
    }

    /// Move toward the focal point; `factor > 1` moves closer
    pub fn zoom(&mut self, factor: f32) {
        if factor <= 0.0 || !factor.is_finite() {
            return;
        }
        let offset = (self.position - self.target) / factor;
        self.position = self.target + offset;
        self.reset_clipping_range();
    }

    /// Remember the current pose for [`reset`](Self::reset)
    pub fn set_home(&mut self) {
        self.home = Some(Pose {
            position: self.position,
            target: self.target,
            up: self.up,
        });
    }

    /// Return to the pose stored by [`set_home`](Self::set_home)
    pub fn reset(&mut self) {
        if let Some(home) = self.home {
            self.position = home.position;
            self.target = home.target;
            self.up = home.up;
            self.reset_clipping_range();
        }
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(
            Point3::new(0.0, 0.0, 5.0),
            Point3::new(0.0, 0.0, 0.0),
            Vector3::new(0.0, 1.0, 0.0),
            30f32.to_radians(),
            4.0 / 3.0,
            0.1,
            100.0,
        )
    }
}
