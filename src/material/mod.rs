//! Materials and palette generation
//!
//! A material describes how a face is lit and filled. Because output is 8-bit
//! indexed, every material first produces the list of colors it would like to
//! have (`requested_colors`), then gets mapped onto a shared 256-entry palette
//! which yields its remap table. Rasterizers only ever index through that table.
//!
//! # Module Organization
//!
//! - `mod.rs` - Material parameters, initialization and color ramp generation
//! - `palette` - nearest-color mapping and shared palette construction

pub mod palette;

use std::f64::consts::FRAC_PI_2;
use std::rc::Rc;

use bitflags::bitflags;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::rasterizer::scan::Rasterizer;
use crate::rasterizer::types::{Rgb, Texture};

pub use palette::{build_shared_palette, nearest_index};

bitflags! {
    /// Lighting model. The distance variants combine with their base mode.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct ShadeMode: u8 {
        /// Unlit
        const NONE = 1 << 0;
        /// One intensity per face
        const FLAT = 1 << 1;
        /// Flat intensity plus fade with face depth
        const FLAT_DISTANCE = 1 << 2;
        /// Intensity per vertex, interpolated
        const GOURAUD = 1 << 3;
        /// Per-vertex fade with depth
        const GOURAUD_DISTANCE = 1 << 4;
    }
}

impl Default for ShadeMode {
    fn default() -> Self {
        ShadeMode::NONE
    }
}

impl ShadeMode {
    /// Modes drawn with a single shade per face
    pub fn is_flat_group(self) -> bool {
        self == ShadeMode::NONE
            || self == ShadeMode::FLAT
            || self == ShadeMode::FLAT_DISTANCE
            || self == ShadeMode::FLAT | ShadeMode::FLAT_DISTANCE
    }

    /// Modes drawn with interpolated per-vertex shades
    pub fn is_gouraud_group(self) -> bool {
        self == ShadeMode::GOURAUD
            || self == ShadeMode::GOURAUD_DISTANCE
            || self == ShadeMode::GOURAUD | ShadeMode::GOURAUD_DISTANCE
    }

    pub fn computes_flat(self) -> bool {
        self.intersects(ShadeMode::FLAT | ShadeMode::FLAT_DISTANCE)
    }

    pub fn computes_gouraud(self) -> bool {
        self.intersects(ShadeMode::GOURAUD | ShadeMode::GOURAUD_DISTANCE)
    }
}

/// Effective fill after initialization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FillMode {
    #[default]
    Solid,
    Texture,
    Environment,
    /// Texture combined with an environment map
    TextureEnvironment,
    /// See-through, blended with the framebuffer contents
    Transparent,
}

impl FillMode {
    pub fn uses_environment(self) -> bool {
        matches!(self, FillMode::Environment | FillMode::TextureEnvironment)
    }
}

/// How texture and environment colors combine for [`FillMode::TextureEnvironment`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TexEnvMode {
    #[default]
    Add,
    /// `t * e >> 8`
    Mul,
    Avg,
    TexMinusEnv,
    EnvMinusTex,
    Min,
    Max,
}

impl TexEnvMode {
    /// Combine one channel, clamped to 0..=255
    pub fn combine(self, t: i32, e: i32) -> u8 {
        let c = match self {
            TexEnvMode::Add => t + e,
            TexEnvMode::Mul => (t * e) >> 8,
            TexEnvMode::Avg => (t + e) >> 1,
            TexEnvMode::TexMinusEnv => t - e,
            TexEnvMode::EnvMinusTex => e - t,
            TexEnvMode::Min => t.min(e),
            TexEnvMode::Max => t.max(e),
        };
        c.clamp(0, 255) as u8
    }
}

/// Tables rebuilt by [`Material::init`] and [`Material::map_to_palette`]
#[derive(Debug, Clone, Default)]
struct Derived {
    fill: FillMode,
    shade: ShadeMode,
    colors_used: usize,
    requested: Vec<Rgb>,
    remap: Vec<u8>,
    add_table: Vec<u32>,
    tsfact: i32,
    rasterizer: Option<Rasterizer>,
}

/// Surface description shared by any number of faces
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Material {
    pub name: String,
    /// Added to every color; may be negative
    pub ambient: [i32; 3],
    pub diffuse: [i32; 3],
    pub specular: [i32; 3],
    /// Phong exponent (at least 1)
    pub shininess: u32,
    pub shade: ShadeMode,
    /// 0 = opaque, higher values are more see-through
    pub transparency: u32,
    /// 0 = affine, otherwise exact UVs every 2^k pixels with k = min(6, bit length)
    pub perspective_correct: u32,
    /// Distance at which distance shading reaches zero
    pub fade_dist: f32,
    /// Number of shades requested for lit materials
    pub num_gradients: u32,
    #[serde(skip)]
    pub texture: Option<Rc<Texture>>,
    #[serde(skip)]
    pub environment: Option<Rc<Texture>>,
    pub tex_scaling: f32,
    pub env_scaling: f32,
    pub tex_env_mode: TexEnvMode,
    /// Depth-test faces with this material when a depth buffer is present
    pub z_bufferable: bool,
    #[serde(skip)]
    derived: Derived,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: String::new(),
            ambient: [0; 3],
            diffuse: [128; 3],
            specular: [128; 3],
            shininess: 4,
            shade: ShadeMode::NONE,
            transparency: 0,
            perspective_correct: 0,
            fade_dist: 1000.0,
            num_gradients: 32,
            texture: None,
            environment: None,
            tex_scaling: 1.0,
            env_scaling: 1.0,
            tex_env_mode: TexEnvMode::Add,
            z_bufferable: true,
            derived: Derived::default(),
        }
    }
}

impl Material {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Rebuild the effective fill, requested colors and rasterizer selection.
    ///
    /// Clears any previous palette mapping; call [`Material::map_to_palette`]
    /// (or [`build_shared_palette`] then `map_to_palette`) before drawing.
    pub fn init(&mut self) {
        self.shininess = self.shininess.max(1);

        let mut fill = match (&self.texture, &self.environment) {
            (Some(_), Some(_)) => FillMode::TextureEnvironment,
            (Some(_), None) => FillMode::Texture,
            (None, Some(_)) => FillMode::Environment,
            (None, None) => FillMode::Solid,
        };
        if self.transparency > 0 {
            fill = FillMode::Transparent;
        }
        let shade = if fill == FillMode::TextureEnvironment {
            ShadeMode::NONE
        } else {
            self.shade
        };

        let mut derived = Derived {
            fill,
            shade,
            ..Default::default()
        };

        match fill {
            FillMode::Solid => {
                if shade == ShadeMode::NONE {
                    derived.requested = vec![Rgb::clamped(self.ambient[0], self.ambient[1], self.ambient[2])];
                } else {
                    derived.requested = self.phong_ramp(self.num_gradients.max(1) as usize);
                }
            }
            FillMode::Texture | FillMode::Environment => {
                let tex = if fill == FillMode::Texture { &self.texture } else { &self.environment };
                if let Some(tex) = tex {
                    if shade == ShadeMode::NONE {
                        derived.requested = tex
                            .palette()
                            .iter()
                            .map(|c| self.with_ambient(*c))
                            .collect();
                    } else {
                        self.phong_texture_ramp(tex, &mut derived);
                    }
                }
            }
            FillMode::TextureEnvironment => {
                if let (Some(tex), Some(env)) = (&self.texture, &self.environment) {
                    self.texenv_palette(tex, env, &mut derived);
                }
            }
            FillMode::Transparent => {
                let n = self.num_gradients.max(1) as usize;
                derived.requested = self.phong_ramp(n);
                derived.tsfact = if shade == ShadeMode::NONE {
                    0
                } else {
                    (n as u32 / (1 + self.transparency)) as i32
                };
            }
        }

        derived.colors_used = derived.requested.len();
        derived.rasterizer = Rasterizer::select(fill, shade, self.perspective_correct);
        debug!(
            "material '{}' init: fill {:?}, shade {:?}, {} colors, rasterizer {:?}",
            self.name, fill, shade, derived.colors_used, derived.rasterizer
        );
        self.derived = derived;
    }

    pub fn fill(&self) -> FillMode {
        self.derived.fill
    }

    /// Shade mode after initialization overrides
    pub fn effective_shade(&self) -> ShadeMode {
        self.derived.shade
    }

    pub fn colors_used(&self) -> usize {
        self.derived.colors_used
    }

    pub fn requested_colors(&self) -> &[Rgb] {
        &self.derived.requested
    }

    /// Requested color index to output palette index
    pub fn remap(&self) -> &[u8] {
        &self.derived.remap
    }

    pub fn add_table(&self) -> Option<&[u32]> {
        if self.derived.add_table.is_empty() {
            None
        } else {
            Some(&self.derived.add_table)
        }
    }

    /// Number of shade steps available to transparent fills
    pub fn tsfact(&self) -> i32 {
        self.derived.tsfact
    }

    pub fn rasterizer(&self) -> Option<Rasterizer> {
        self.derived.rasterizer
    }

    /// Mapped onto a palette and drawable
    pub fn is_mapped(&self) -> bool {
        self.derived.colors_used > 0 && self.derived.remap.len() >= self.derived.colors_used
    }

    /// Texture sampled by the single-texture fillers
    pub(crate) fn primary_texture(&self) -> Option<&Texture> {
        self.environment.as_deref().or(self.texture.as_deref())
    }

    fn with_ambient(&self, c: Rgb) -> Rgb {
        Rgb::clamped(
            c.r as i32 + self.ambient[0],
            c.g as i32 + self.ambient[1],
            c.b as i32 + self.ambient[2],
        )
    }

    fn phong_color(&self, ca: f64, base: [i32; 3]) -> Rgb {
        let cb = ca.powi(self.shininess as i32);
        let ch = |i: usize| {
            (cb * self.specular[i] as f64
                + ca * self.diffuse[i] as f64
                + self.ambient[i] as f64
                + base[i] as f64) as i32
        };
        Rgb::clamped(ch(0), ch(1), ch(2))
    }

    /// `n` samples from dark (angle pi/2) to fully lit (angle 0)
    fn phong_ramp(&self, n: usize) -> Vec<Rgb> {
        let da = if n > 1 { -FRAC_PI_2 / (n - 1) as f64 } else { 0.0 };
        (0..n)
            .map(|i| {
                let ca = if n == 1 { 1.0 } else { (FRAC_PI_2 + da * i as f64).cos() };
                self.phong_color(ca, [0; 3])
            })
            .collect()
    }

    fn phong_texture_ramp(&self, tex: &Texture, derived: &mut Derived) {
        let colors = tex.num_colors();
        let shades = (self.num_gradients as usize / colors).max(1);
        let da = if shades > 1 { -FRAC_PI_2 / (shades - 1) as f64 } else { 0.0 };

        let mut requested = Vec::with_capacity(shades * colors);
        for s in 0..shades {
            let ca = (FRAC_PI_2 + da * s as f64).cos();
            for c in tex.palette() {
                requested.push(self.phong_color(ca, [c.r as i32, c.g as i32, c.b as i32]));
            }
        }
        derived.requested = requested;

        derived.add_table = (0..256)
            .map(|i| {
                let level = ((i as f64 * std::f64::consts::PI / 512.0).sin() * shades as f64) as u32;
                level * colors as u32
            })
            .collect();
    }

    fn texenv_palette(&self, tex: &Texture, env: &Texture, derived: &mut Derived) {
        let tex_colors = tex.num_colors();
        let mut requested = Vec::with_capacity(tex_colors * env.num_colors());
        for e in env.palette() {
            for t in tex.palette() {
                requested.push(Rgb::new(
                    self.tex_env_mode.combine(t.r as i32, e.r as i32),
                    self.tex_env_mode.combine(t.g as i32, e.g as i32),
                    self.tex_env_mode.combine(t.b as i32, e.b as i32),
                ));
            }
        }
        derived.requested = requested;

        let mut add_table = vec![0u32; 256];
        for (level, entry) in add_table.iter_mut().enumerate().take(env.num_colors()) {
            *entry = (level * tex_colors) as u32;
        }
        derived.add_table = add_table;
    }

    pub(crate) fn set_mapping(&mut self, remap: Vec<u8>, add_table: Option<Vec<u32>>) {
        self.derived.remap = remap;
        if let Some(add) = add_table {
            self.derived.add_table = add;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_color_texture() -> Rc<Texture> {
        Rc::new(Texture::new("t", 2, 2, vec![0, 1, 1, 0], vec![Rgb::new(10, 20, 30), Rgb::new(200, 100, 50)]).unwrap())
    }

    #[test]
    fn test_defaults() {
        let m = Material::default();
        assert_eq!(m.diffuse, [128; 3]);
        assert_eq!(m.shininess, 4);
        assert_eq!(m.num_gradients, 32);
        assert!(m.z_bufferable);
        assert!((m.fade_dist - 1000.0).abs() < 1e-6);
    }

    #[test]
    fn test_solid_unlit_single_color() {
        let mut m = Material::new("flat");
        m.ambient = [300, 40, -5];
        m.init();
        assert_eq!(m.requested_colors(), &[Rgb::new(255, 40, 0)]);
        assert_eq!(m.rasterizer(), Some(Rasterizer::SolidFlat));
        assert!(!m.is_mapped());
    }

    #[test]
    fn test_phong_ramp_dark_to_bright() {
        let mut m = Material::new("ramp");
        m.shade = ShadeMode::GOURAUD;
        m.num_gradients = 16;
        m.diffuse = [100, 100, 100];
        m.specular = [0, 0, 0];
        m.init();
        let ramp = m.requested_colors();
        assert_eq!(ramp.len(), 16);
        assert_eq!(ramp[0], Rgb::new(0, 0, 0));
        assert_eq!(ramp[15], Rgb::new(100, 100, 100));
        assert!(ramp.windows(2).all(|w| w[0].r <= w[1].r));
        assert_eq!(m.rasterizer(), Some(Rasterizer::SolidGouraud));
    }

    #[test]
    fn test_single_gradient_is_fully_lit() {
        let mut m = Material::new("one");
        m.shade = ShadeMode::FLAT;
        m.num_gradients = 1;
        m.diffuse = [50, 60, 70];
        m.specular = [10, 10, 10];
        m.init();
        assert_eq!(m.requested_colors(), &[Rgb::new(60, 70, 80)]);
    }

    #[test]
    fn test_texture_shaded_add_table() {
        let mut m = Material::new("tex");
        m.texture = Some(two_color_texture());
        m.shade = ShadeMode::FLAT;
        m.num_gradients = 8;
        m.init();
        // 8 gradients over 2 colors = 4 shades
        assert_eq!(m.colors_used(), 8);
        let add = m.add_table().unwrap();
        assert_eq!(add.len(), 256);
        assert_eq!(add[0], 0);
        assert_eq!(add[255], 3 * 2);
        assert!(add.iter().all(|&a| (a as usize) < m.colors_used()));
        assert_eq!(m.rasterizer(), Some(Rasterizer::TexFlat));
    }

    #[test]
    fn test_texture_single_shade_is_texel_plus_ambient() {
        let palette: Vec<Rgb> = (0..32).map(|i| Rgb::new(i * 4, i * 2, 100 + i)).collect();
        let data: Vec<u8> = (0..32).collect();
        let tex = Rc::new(Texture::new("wide", 8, 4, data, palette.clone()).unwrap());
        let mut m = Material::new("wide");
        m.texture = Some(tex);
        m.shade = ShadeMode::FLAT;
        m.ambient = [5, 6, 7];
        m.init();
        // 32 gradients over 32 colors leaves one shade, taken at the dark end
        assert_eq!(m.colors_used(), 32);
        for (got, texel) in m.requested_colors().iter().zip(&palette) {
            assert_eq!(*got, Rgb::new(texel.r + 5, texel.g + 6, texel.b + 7));
        }
        assert!(m.add_table().unwrap().iter().all(|&a| a == 0));
    }

    #[test]
    fn test_phong_sum_truncates_once() {
        let mut m = Material::new("neg");
        m.shade = ShadeMode::GOURAUD;
        m.num_gradients = 3;
        m.diffuse = [-3; 3];
        m.specular = [0; 3];
        m.ambient = [10; 3];
        m.init();
        // middle shade: 10 - 3 * cos(pi/4) = 7.88, not 10 + trunc(-2.12) = 8
        assert_eq!(m.requested_colors(), &[Rgb::new(10, 10, 10), Rgb::new(7, 7, 7), Rgb::new(7, 7, 7)]);
    }

    #[test]
    fn test_texture_unlit_adds_ambient() {
        let mut m = Material::new("tex");
        m.texture = Some(two_color_texture());
        m.ambient = [10, 0, 0];
        m.init();
        assert_eq!(m.requested_colors(), &[Rgb::new(20, 20, 30), Rgb::new(210, 100, 50)]);
        assert!(m.add_table().is_none());
    }

    #[test]
    fn test_texenv_forces_unlit_and_orders_by_env_level() {
        let tex = two_color_texture();
        let env = Rc::new(Texture::new("e", 1, 1, vec![0], vec![Rgb::new(100, 100, 100)]).unwrap());
        let mut m = Material::new("texenv");
        m.texture = Some(tex);
        m.environment = Some(env);
        m.shade = ShadeMode::GOURAUD;
        m.tex_env_mode = TexEnvMode::Max;
        m.init();
        assert_eq!(m.effective_shade(), ShadeMode::NONE);
        assert_eq!(m.fill(), FillMode::TextureEnvironment);
        assert_eq!(m.requested_colors(), &[Rgb::new(100, 100, 100), Rgb::new(200, 100, 100)]);
        assert_eq!(m.rasterizer(), Some(Rasterizer::TexEnv));
    }

    #[test]
    fn test_texenv_combine_modes() {
        assert_eq!(TexEnvMode::Add.combine(200, 100), 255);
        assert_eq!(TexEnvMode::Mul.combine(128, 128), 64);
        assert_eq!(TexEnvMode::Avg.combine(10, 21), 15);
        assert_eq!(TexEnvMode::TexMinusEnv.combine(10, 30), 0);
        assert_eq!(TexEnvMode::EnvMinusTex.combine(10, 30), 20);
        assert_eq!(TexEnvMode::Min.combine(10, 30), 10);
        assert_eq!(TexEnvMode::Max.combine(10, 30), 30);
    }

    #[test]
    fn test_transparency_factor() {
        let mut m = Material::new("glass");
        m.transparency = 3;
        m.num_gradients = 32;
        m.shade = ShadeMode::FLAT;
        m.init();
        assert_eq!(m.fill(), FillMode::Transparent);
        assert_eq!(m.tsfact(), 8);
        assert_eq!(m.rasterizer(), Some(Rasterizer::TransFlat));

        m.shade = ShadeMode::NONE;
        m.init();
        assert_eq!(m.tsfact(), 0);
    }

    #[test]
    fn test_perspective_selection_and_unsupported() {
        let mut m = Material::new("p");
        m.texture = Some(two_color_texture());
        m.shade = ShadeMode::GOURAUD | ShadeMode::GOURAUD_DISTANCE;
        m.perspective_correct = 16;
        m.init();
        assert_eq!(m.rasterizer(), Some(Rasterizer::PerspTexGouraud));

        m.shade = ShadeMode::FLAT | ShadeMode::GOURAUD;
        m.init();
        assert_eq!(m.rasterizer(), None);
    }

    #[test]
    fn test_shininess_clamped() {
        let mut m = Material::new("s");
        m.shininess = 0;
        m.init();
        assert_eq!(m.shininess, 1);
    }

    #[test]
    fn test_serde_skips_derived() {
        let mut m = Material::new("saved");
        m.shade = ShadeMode::FLAT | ShadeMode::FLAT_DISTANCE;
        m.init();
        let text = ron::to_string(&m).unwrap();
        let back: Material = ron::from_str(&text).unwrap();
        assert_eq!(back.name, "saved");
        assert_eq!(back.shade, m.shade);
        assert_eq!(back.colors_used(), 0);
    }
}
