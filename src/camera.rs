use std::f32::consts::PI;

use glam::{Mat4, Vec2, Vec3};

use crate::config::DemoConfig;

const BETA_EPSILON: f32 = 1e-4;

/// Arc-rotate camera orbiting `target`.
///
/// `alpha` is the longitudinal angle around the Y axis, `beta` the angle from
/// the +Y axis.
#[derive(Debug, Clone, PartialEq)]
pub struct OrbitCamera {
    pub alpha: f32,
    pub beta: f32,
    pub radius: f32,
    pub target: Vec3,
    pub fovy: f32,
    pub znear: f32,
    pub zfar: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub min_radius: f32,
    pub max_radius: f32,
}

impl OrbitCamera {
    pub fn new(alpha: f32, beta: f32, radius: f32, target: Vec3) -> Self {
        Self {
            alpha,
            beta: beta.clamp(BETA_EPSILON, PI - BETA_EPSILON),
            radius,
            target,
            fovy: 0.8,
            znear: 0.1,
            zfar: 1000.0,
            rotate_speed: 1.0,
            zoom_speed: 0.05,
            min_radius: 1.0,
            max_radius: 500.0,
        }
    }

    pub fn from_config(config: &DemoConfig) -> Self {
        Self::new(
            config.camera_alpha,
            config.camera_beta,
            config.camera_radius,
            Vec3::from(config.camera_target),
        )
    }

    pub fn position(&self) -> Vec3 {
        let (sin_a, cos_a) = self.alpha.sin_cos();
        let (sin_b, cos_b) = self.beta.sin_cos();
        self.target + self.radius * Vec3::new(cos_a * sin_b, cos_b, sin_a * sin_b)
    }

    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.position(), self.target, Vec3::Y)
    }

    pub fn projection(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(self.fovy, aspect.max(f32::EPSILON), self.znear, self.zfar)
    }

    pub fn view_proj(&self, aspect: f32) -> Mat4 {
        self.projection(aspect) * self.view()
    }

    /// Mouse drag in physical pixels. A drag across the full window height
    /// turns the camera once around.
    pub fn rotate(&mut self, delta: Vec2, screen_height: f32) {
        let per_pixel = 2.0 * PI / screen_height.max(1.0) * self.rotate_speed;
        self.alpha -= delta.x * per_pixel;
        self.beta = (self.beta - delta.y * per_pixel).clamp(BETA_EPSILON, PI - BETA_EPSILON);
    }

    /// Positive `lines` zooms in.
    pub fn zoom(&mut self, lines: f32) {
        if lines == 0.0 {
            return;
        }
        let scale = (1.0 - self.zoom_speed).powf(lines.abs());
        self.radius = if lines > 0.0 {
            self.radius * scale
        } else {
            self.radius / scale
        };
        self.radius = self.radius.clamp(self.min_radius, self.max_radius);
    }
}
