//! 8-bit palette software rasterizer
//!
//! Features:
//! - Sutherland-Hodgman clipping against the far plane and the clip rectangle
//! - Flat and Gouraud shading through per-material color ramps
//! - Affine or segment-wise perspective-correct texture mapping
//! - Environment mapping, texture+environment blends and table transparency
//! - Reciprocal-depth buffer or painter's sorting
//!
//! # Module Organization
//!
//! - `types` - Rgb, Palette, Texture, Light
//! - `math` - Vec3, 4x4 matrices, Euler rotations
//! - `fixed` - 12.20 screen coordinates and 16.16 texture coordinates
//! - `camera` - Camera struct and sort order
//! - `clip` - Frustum clipping and projection
//! - `scan` - The nine scanline fillers
//! - `render` - Framebuffer and the per-frame render session

pub mod camera;
pub mod clip;
pub mod fixed;
pub mod math;
pub mod render;
pub mod scan;
pub mod types;

// =============================================================================
// Convenience re-exports for commonly used items
// =============================================================================

pub use types::{Light, LightMode, Palette, Rgb, Texture, PALETTE_SIZE};

pub use math::{
    Axis, Mat4, Vec3,
    mat4_identity, mat4_translation, mat4_axis_rotation, mat4_from_euler,
    mat4_mul, mat4_transform_point, mat4_transform_vector,
};

pub use camera::{Camera, SortOrder, DEFAULT_CLIP_BACK};

pub use clip::{ClipVertex, Clipper, TriStats};

pub use scan::{Rasterizer, ScreenTriangle, ScreenVertex};

pub use render::{Framebuffer, RenderLimits, RenderSession, SessionState};
