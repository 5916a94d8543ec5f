//! Loading indexed textures from ordinary image files
//!
//! - `import` - decode, rescale to powers of two, build a [`Texture`]
//! - `quantize` - median-cut reduction to at most 256 colors
//!
//! [`Texture`]: crate::rasterizer::types::Texture

mod import;
mod quantize;

pub use import::{decode_texture, load_texture, texture_from_rgba, ImportOptions};
pub use quantize::{count_unique_colors, median_cut, quantize_rgba, Quantized};
