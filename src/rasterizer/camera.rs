//! Camera for 3D rendering
//!
//! Holds the view parameters the clipper and pipeline need. The camera owns
//! no pixel or depth storage; that lives in the caller's [`Framebuffer`].
//!
//! [`Framebuffer`]: super::render::Framebuffer

use serde::{Deserialize, Serialize};

use super::math::{mat4_axis_rotation, mat4_mul, Axis, Mat4, Vec3};
use crate::config::RenderConfig;

/// Far clip distance used when none is configured
pub const DEFAULT_CLIP_BACK: f32 = 8.0e30;

/// Order in which collected faces are handed to the rasterizers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortOrder {
    /// Painter's algorithm: farthest first
    #[default]
    BackToFront,
    /// Nearest first, for depth-buffered scenes that want early rejects
    FrontToBack,
    /// Insertion order
    None,
}

/// Camera state for 3D rendering
#[derive(Clone, Debug)]
pub struct Camera {
    /// Horizontal field of view in degrees (clamped to 1..179 when used)
    pub fov: f32,
    /// Pixel aspect ratio (width / height of one pixel times screen ratio)
    pub aspect: f32,
    pub sort: SortOrder,
    pub clip_left: i32,
    pub clip_top: i32,
    pub clip_right: i32,
    pub clip_bottom: i32,
    /// Far clip distance; zero or negative disables far clipping
    pub clip_back: f32,
    pub screen_width: i32,
    pub screen_height: i32,
    pub center_x: i32,
    pub center_y: i32,
    pub position: Vec3,
    pub pitch: f32,
    pub pan: f32,
    pub roll: f32,
}

impl Camera {
    /// Camera covering the whole screen, centered, looking down +Z.
    ///
    /// Depth-buffered cameras default to no sorting, others to back-to-front.
    pub fn new(screen_width: i32, screen_height: i32, aspect: f32, fov: f32, depth_buffered: bool) -> Self {
        Self {
            fov,
            aspect,
            sort: if depth_buffered { SortOrder::None } else { SortOrder::BackToFront },
            clip_left: 0,
            clip_top: 0,
            clip_right: screen_width,
            clip_bottom: screen_height,
            clip_back: DEFAULT_CLIP_BACK,
            screen_width,
            screen_height,
            center_x: screen_width >> 1,
            center_y: screen_height >> 1,
            position: Vec3::ZERO,
            pitch: 0.0,
            pan: 0.0,
            roll: 0.0,
        }
    }

    pub fn from_config(config: &RenderConfig) -> Self {
        let mut cam = Self::new(
            config.screen_width as i32,
            config.screen_height as i32,
            config.aspect,
            config.fov,
            config.depth_buffer,
        );
        if let Some(sort) = config.sort {
            cam.sort = sort;
        }
        cam.clip_back = config.clip_back;
        cam
    }

    /// Point the camera at a world position by setting pan and pitch.
    /// Roll is reset to zero.
    pub fn set_target(&mut self, target: Vec3) {
        let dx = target.x - self.position.x;
        let dy = target.y - self.position.y;
        let mut dz = target.z - self.position.z;
        self.roll = 0.0;
        if dz > 0.0001 {
            self.pan = -(dx / dz).atan().to_degrees();
            dz /= self.pan.to_radians().cos();
            self.pitch = (dy / dz).atan().to_degrees();
        } else if dz < -0.0001 {
            self.pan = 180.0 - (dx / dz).atan().to_degrees();
            dz /= (self.pan - 180.0).to_radians().cos();
            self.pitch = -(dy / dz).atan().to_degrees();
        } else {
            self.pan = 0.0;
            self.pitch = -90.0;
        }
    }

    /// World-to-view rotation: pan about Y, then pitch about X, then roll about Z
    pub fn view_rotation(&self) -> Mat4 {
        let pan = mat4_axis_rotation(Axis::Y, -self.pan);
        let pitch = mat4_axis_rotation(Axis::X, -self.pitch);
        let roll = mat4_axis_rotation(Axis::Z, -self.roll);
        mat4_mul(&roll, &mat4_mul(&pitch, &pan))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rasterizer::math::mat4_transform_vector;

    fn view_dir(cam: &Camera, target: Vec3) -> Vec3 {
        mat4_transform_vector(&cam.view_rotation(), target - cam.position)
    }

    #[test]
    fn test_defaults() {
        let cam = Camera::new(320, 200, 1.0, 90.0, false);
        assert_eq!(cam.center_x, 160);
        assert_eq!(cam.center_y, 100);
        assert_eq!(cam.clip_right, 320);
        assert_eq!(cam.sort, SortOrder::BackToFront);
        assert!(cam.clip_back > 1.0e30);

        let zcam = Camera::new(320, 200, 1.0, 90.0, true);
        assert_eq!(zcam.sort, SortOrder::None);
    }

    #[test]
    fn test_set_target_centers_point() {
        let mut cam = Camera::new(64, 64, 1.0, 90.0, false);
        cam.position = Vec3::new(1.0, -2.0, 0.5);

        for target in [
            Vec3::new(4.0, 1.0, 6.0),
            Vec3::new(-3.0, 2.0, -5.0),
            Vec3::new(0.0, -4.0, 9.0),
        ] {
            cam.set_target(target);
            let d = view_dir(&cam, target);
            assert!(d.x.abs() < 1e-3, "x off center: {:?}", d);
            assert!(d.y.abs() < 1e-3, "y off center: {:?}", d);
            assert!(d.z > 0.0);
            assert_eq!(cam.roll, 0.0);
        }
    }

    #[test]
    fn test_set_target_straight_down() {
        let mut cam = Camera::new(64, 64, 1.0, 90.0, false);
        cam.set_target(Vec3::new(0.0, -5.0, 0.0));
        assert_eq!(cam.pan, 0.0);
        assert_eq!(cam.pitch, -90.0);
    }
}
