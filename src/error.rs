//! Error types
//!
//! Only entity construction and file I/O can fail. Per-frame work degrades
//! silently instead of returning errors.

use thiserror::Error;

/// Failure to create or link a scene entity
#[derive(Error, Debug)]
pub enum SceneError {
    #[error("allocation of {count} {what} failed")]
    Allocation { what: &'static str, count: usize },
    #[error("texture size {width}x{height} is not a power of two")]
    TextureSize { width: usize, height: usize },
    #[error("texture data has {actual} texels, expected {expected}")]
    TextureData { expected: usize, actual: usize },
    #[error("texture palette must hold 1..=256 colors, got {0}")]
    TexturePalette(usize),
    #[error("texel value {index} exceeds palette of {colors} colors")]
    TexelOutOfRange { index: u8, colors: usize },
    #[error("face {face} references vertex {index}, mesh has {vertex_count}")]
    VertexIndex { face: usize, index: usize, vertex_count: usize },
    #[error("mesh already has the maximum of {0} children")]
    TooManyChildren(usize),
    #[error("attaching the mesh would create a cycle")]
    Cycle,
    #[error("unknown mesh handle")]
    UnknownMesh,
    #[error("spline needs at least one key of width {width}, got {len} values")]
    SplineKeys { len: usize, width: usize },
}

/// Failure to load a texture from an image file
#[derive(Error, Debug)]
pub enum TextureError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("image decode error: {0}")]
    Image(#[from] image::ImageError),
    #[error("image is empty")]
    Empty,
    #[error(transparent)]
    Scene(#[from] SceneError),
}

/// Failure to load or save a RON configuration file
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),
    #[error("serialize error: {0}")]
    Serialize(#[from] ron::Error),
}

/// Allocate a vector of `count` copies of `value`, reporting allocation
/// failure instead of aborting
pub(crate) fn try_filled_vec<T: Clone>(
    what: &'static str,
    count: usize,
    value: T,
) -> Result<Vec<T>, SceneError> {
    let mut v = Vec::new();
    v.try_reserve_exact(count)
        .map_err(|_| SceneError::Allocation { what, count })?;
    v.resize(count, value);
    Ok(v)
}
