//! Render configuration stored as RON
//!
//! ```ron
//! (
//!   screen_width: 320,
//!   screen_height: 200,
//!   fov: 90.0,
//!   depth_buffer: true,
//! )
//! ```
//!
//! Missing fields take their defaults.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::rasterizer::camera::{SortOrder, DEFAULT_CLIP_BACK};
use crate::rasterizer::render::RenderLimits;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub screen_width: u32,
    pub screen_height: u32,
    /// Horizontal field of view in degrees
    pub fov: f32,
    pub aspect: f32,
    /// Face ordering; `None` picks the camera default for the depth mode
    pub sort: Option<SortOrder>,
    /// Far clip distance, zero or negative disables it
    pub clip_back: f32,
    pub depth_buffer: bool,
    /// First palette entry given to materials (inclusive)
    pub palette_start: usize,
    /// Last palette entry given to materials (inclusive)
    pub palette_end: usize,
    pub limits: RenderLimits,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            screen_width: 320,
            screen_height: 200,
            fov: 90.0,
            aspect: 1.0,
            sort: None,
            clip_back: DEFAULT_CLIP_BACK,
            depth_buffer: false,
            palette_start: 1,
            palette_end: 255,
            limits: RenderLimits::default(),
        }
    }
}

impl RenderConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_ron(&contents)
    }

    pub fn from_ron(s: &str) -> Result<Self, ConfigError> {
        Ok(ron::from_str(s)?)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let config = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .indentor("  ".to_string());
        let text = ron::ser::to_string_pretty(self, config)?;
        fs::write(path, text)?;
        Ok(())
    }

    /// Palette range handed to materials
    pub fn palette_range(&self) -> std::ops::RangeInclusive<usize> {
        self.palette_start..=self.palette_end
    }
}
