//! Core types: colors, palettes, indexed textures and lights

use std::ops::{Index, IndexMut};
use serde::{Deserialize, Serialize};

use super::math::{mat4_from_euler, mat4_transform_point, Vec3};
use crate::error::SceneError;

/// Number of entries in an output palette
pub const PALETTE_SIZE: usize = 256;

// =============================================================================
// Colors and palettes
// =============================================================================

/// 24-bit RGB color
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb { r: 0, g: 0, b: 0 };
    pub const WHITE: Rgb = Rgb { r: 255, g: 255, b: 255 };

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Build from integer channels, clamping each to 0..=255
    pub fn clamped(r: i32, g: i32, b: i32) -> Self {
        Self {
            r: r.clamp(0, 255) as u8,
            g: g.clamp(0, 255) as u8,
            b: b.clamp(0, 255) as u8,
        }
    }

    /// Squared euclidean distance in RGB space
    #[inline]
    pub fn dist_sq(self, other: Rgb) -> i32 {
        let dr = self.r as i32 - other.r as i32;
        let dg = self.g as i32 - other.g as i32;
        let db = self.b as i32 - other.b as i32;
        dr * dr + dg * dg + db * db
    }

    /// Channel average, rounding down
    pub fn average(self, other: Rgb) -> Rgb {
        Rgb {
            r: ((self.r as u16 + other.r as u16) >> 1) as u8,
            g: ((self.g as u16 + other.g as u16) >> 1) as u8,
            b: ((self.b as u16 + other.b as u16) >> 1) as u8,
        }
    }

    /// Sum of the three channels (0..=765)
    pub fn intensity(self) -> u32 {
        self.r as u32 + self.g as u32 + self.b as u32
    }
}

/// 256-entry output palette shared by every material drawn into one framebuffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    colors: Vec<Rgb>,
}

impl Palette {
    /// All-black palette
    pub fn new() -> Self {
        Self {
            colors: vec![Rgb::BLACK; PALETTE_SIZE],
        }
    }

    pub fn colors(&self) -> &[Rgb] {
        &self.colors
    }

    pub fn colors_mut(&mut self) -> &mut [Rgb] {
        &mut self.colors
    }

    /// Expand indexed pixels to RGBA bytes (alpha = 255)
    pub fn expand_rgba(&self, indices: &[u8], out: &mut Vec<u8>) {
        out.clear();
        out.reserve(indices.len() * 4);
        for &i in indices {
            let c = self.colors[i as usize];
            out.extend_from_slice(&[c.r, c.g, c.b, 255]);
        }
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::new()
    }
}

impl Index<usize> for Palette {
    type Output = Rgb;
    fn index(&self, i: usize) -> &Rgb {
        &self.colors[i]
    }
}

impl IndexMut<usize> for Palette {
    fn index_mut(&mut self, i: usize) -> &mut Rgb {
        &mut self.colors[i]
    }
}

// =============================================================================
// Indexed textures
// =============================================================================

/// Indexed-color texture with power-of-two dimensions and its own exact palette
#[derive(Debug, Clone)]
pub struct Texture {
    pub name: String,
    width: usize,
    height: usize,
    width_log2: u32,
    /// Palette indices, row-major
    data: Vec<u8>,
    /// Exact colors referenced by `data`
    palette: Vec<Rgb>,
    /// Texels per mapping unit along U (defaults to the width)
    pub u_scale: f32,
    /// Texels per mapping unit along V (defaults to the height)
    pub v_scale: f32,
}

impl Texture {
    /// Create a texture, validating size, data length and palette indices
    pub fn new(
        name: &str,
        width: usize,
        height: usize,
        data: Vec<u8>,
        palette: Vec<Rgb>,
    ) -> Result<Self, SceneError> {
        if !width.is_power_of_two() || !height.is_power_of_two() {
            return Err(SceneError::TextureSize { width, height });
        }
        if data.len() != width * height {
            return Err(SceneError::TextureData {
                expected: width * height,
                actual: data.len(),
            });
        }
        if palette.is_empty() || palette.len() > PALETTE_SIZE {
            return Err(SceneError::TexturePalette(palette.len()));
        }
        if let Some(&index) = data.iter().find(|&&i| i as usize >= palette.len()) {
            return Err(SceneError::TexelOutOfRange {
                index,
                colors: palette.len(),
            });
        }

        Ok(Self {
            name: name.to_string(),
            width,
            height,
            width_log2: width.trailing_zeros(),
            data,
            palette,
            u_scale: width as f32,
            v_scale: height as f32,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Palette indices, row-major
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn palette(&self) -> &[Rgb] {
        &self.palette
    }

    /// Number of palette entries the texture uses
    pub fn num_colors(&self) -> usize {
        self.palette.len()
    }

    #[inline]
    pub fn u_mask(&self) -> i32 {
        (self.width - 1) as i32
    }

    #[inline]
    pub fn v_mask(&self) -> i32 {
        (self.height - 1) as i32
    }

    /// Texel at wrapped integer coordinates
    #[inline]
    pub fn texel(&self, u: usize, v: usize) -> u8 {
        self.data[(v << self.width_log2) + u]
    }
}

// =============================================================================
// Lights
// =============================================================================

/// How a light contributes to shading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LightMode {
    /// Contributes nothing and is skipped by the pipeline
    #[default]
    None,
    /// Parallel light along a direction
    Vector,
    /// Point light using the angle to the surface, no falloff
    PointAngle,
    /// Point light with falloff by squared distance, no angle term
    PointDistance,
    /// Point light with both angle and distance terms
    Point,
}

impl LightMode {
    pub fn uses_angle(self) -> bool {
        matches!(self, LightMode::PointAngle | LightMode::Point)
    }

    pub fn uses_distance(self) -> bool {
        matches!(self, LightMode::PointDistance | LightMode::Point)
    }

    pub fn is_point(self) -> bool {
        self.uses_angle() || self.uses_distance()
    }
}

/// A light source. Vector lights store the direction toward the light,
/// point lights store a world position.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Light {
    pub mode: LightMode,
    pub position: Vec3,
    /// 0.0-1.0 typical, larger values over-brighten
    pub intensity: f32,
    /// Squared distance at which distance falloff reaches 50%
    pub half_dist_squared: f32,
}

impl Light {
    /// Configure the light in place.
    ///
    /// For [`LightMode::Vector`] `(x, y, z)` are rotation angles in degrees
    /// applied to the default direction (0, 0, -1); for point modes they are
    /// the world position.
    pub fn set(&mut self, mode: LightMode, x: f32, y: f32, z: f32, intensity: f32, half_dist: f32) -> &mut Self {
        self.mode = mode;
        self.intensity = intensity;
        self.half_dist_squared = half_dist * half_dist;
        match mode {
            LightMode::Vector => {
                let m = mat4_from_euler(Vec3::new(x, y, z));
                self.position = mat4_transform_point(&m, Vec3::new(0.0, 0.0, -1.0));
            }
            LightMode::PointAngle | LightMode::PointDistance | LightMode::Point => {
                self.position = Vec3::new(x, y, z);
            }
            LightMode::None => {}
        }
        self
    }

    /// Directional light rotated from (0, 0, -1) by euler angles in degrees
    pub fn vector(angles: Vec3, intensity: f32) -> Self {
        let mut light = Self::default();
        light.set(LightMode::Vector, angles.x, angles.y, angles.z, intensity, 0.0);
        light
    }

    /// Point light with angle and distance terms
    pub fn point(position: Vec3, intensity: f32, half_dist: f32) -> Self {
        let mut light = Self::default();
        light.set(LightMode::Point, position.x, position.y, position.z, intensity, half_dist);
        light
    }

    /// Point light using only the angle to the surface
    pub fn point_angle(position: Vec3, intensity: f32) -> Self {
        let mut light = Self::default();
        light.set(LightMode::PointAngle, position.x, position.y, position.z, intensity, 0.0);
        light
    }

    /// Point light using only distance falloff
    pub fn point_distance(position: Vec3, intensity: f32, half_dist: f32) -> Self {
        let mut light = Self::default();
        light.set(LightMode::PointDistance, position.x, position.y, position.z, intensity, half_dist);
        light
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgb_distance_and_average() {
        let a = Rgb::new(10, 20, 30);
        let b = Rgb::new(13, 16, 30);
        assert_eq!(a.dist_sq(b), 9 + 16);
        assert_eq!(a.average(Rgb::new(11, 20, 255)), Rgb::new(10, 20, 142));
        assert_eq!(Rgb::clamped(-5, 300, 7), Rgb::new(0, 255, 7));
    }

    #[test]
    fn test_texture_validation() {
        let pal = vec![Rgb::BLACK, Rgb::WHITE];
        assert!(Texture::new("ok", 4, 2, vec![0; 8], pal.clone()).is_ok());
        assert!(matches!(
            Texture::new("npot", 3, 2, vec![0; 6], pal.clone()),
            Err(SceneError::TextureSize { .. })
        ));
        assert!(matches!(
            Texture::new("short", 4, 2, vec![0; 7], pal.clone()),
            Err(SceneError::TextureData { .. })
        ));
        assert!(matches!(
            Texture::new("range", 2, 1, vec![0, 2], pal),
            Err(SceneError::TexelOutOfRange { index: 2, .. })
        ));
    }

    #[test]
    fn test_texture_texel_layout() {
        let data: Vec<u8> = (0..8).map(|i| (i % 2) as u8).collect();
        let tex = Texture::new("t", 4, 2, data, vec![Rgb::BLACK, Rgb::WHITE]).unwrap();
        assert_eq!((tex.width(), tex.height()), (4, 2));
        assert_eq!(tex.data(), &[0, 1, 0, 1, 0, 1, 0, 1]);
        assert_eq!(tex.palette(), &[Rgb::BLACK, Rgb::WHITE]);
        assert_eq!(tex.texel(1, 1), 1);
        assert_eq!(tex.texel(2, 1), 0);
        assert_eq!(tex.u_mask(), 3);
        assert!((tex.u_scale - 4.0).abs() < 1e-6);
    }

    #[test]
    fn test_vector_light_default_direction() {
        let light = Light::vector(Vec3::ZERO, 0.8);
        assert_eq!(light.mode, LightMode::Vector);
        assert!((light.position.z + 1.0).abs() < 1e-6);

        // Pan by 90 degrees around Y swings -Z to +X
        let turned = Light::vector(Vec3::new(0.0, 90.0, 0.0), 1.0);
        assert!((turned.position.x - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_point_light_half_distance() {
        let light = Light::point(Vec3::new(1.0, 2.0, 3.0), 1.0, 4.0);
        assert!(light.mode.uses_angle() && light.mode.uses_distance());
        assert!((light.half_dist_squared - 16.0).abs() < 1e-6);
        assert_eq!(light.position, Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_palette_expand() {
        let mut pal = Palette::new();
        pal[3] = Rgb::new(1, 2, 3);
        let mut out = Vec::new();
        pal.expand_rgba(&[3, 0], &mut out);
        assert_eq!(out, vec![1, 2, 3, 255, 0, 0, 0, 255]);
    }
}
