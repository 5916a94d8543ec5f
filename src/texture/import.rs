//! Image import and conversion to indexed textures
//!
//! Decodes PNG, JPEG or BMP data, optionally rescales it to power-of-two
//! dimensions, quantizes it and optionally drops unused palette entries.

use std::fs;
use std::path::Path;

use log::debug;

use super::quantize::quantize_rgba;
use crate::error::TextureError;
use crate::rasterizer::types::{Rgb, Texture, PALETTE_SIZE};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportOptions {
    /// Resample to the next power of two in each dimension (nearest neighbour)
    pub rescale: bool,
    /// Drop palette entries no texel refers to
    pub optimize: bool,
    /// Upper bound on palette size (1..=256)
    pub max_colors: usize,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            rescale: true,
            optimize: true,
            max_colors: PALETTE_SIZE,
        }
    }
}

/// Load a texture from an image file, named after the file stem
pub fn load_texture<P: AsRef<Path>>(path: P, options: ImportOptions) -> Result<Texture, TextureError> {
    let path = path.as_ref();
    let bytes = fs::read(path)?;
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    decode_texture(&name, &bytes, options)
}

/// Decode an in-memory image
pub fn decode_texture(name: &str, bytes: &[u8], options: ImportOptions) -> Result<Texture, TextureError> {
    let img = image::load_from_memory(bytes)?.to_rgba8();
    let (width, height) = (img.width() as usize, img.height() as usize);
    texture_from_rgba(name, img.as_raw(), width, height, options)
}

/// Build a texture from raw RGBA pixels
pub fn texture_from_rgba(
    name: &str,
    rgba: &[u8],
    width: usize,
    height: usize,
    options: ImportOptions,
) -> Result<Texture, TextureError> {
    if width == 0 || height == 0 || rgba.len() < width * height * 4 {
        return Err(TextureError::Empty);
    }
    let rgba = &rgba[..width * height * 4];

    let (data, w, h) = if options.rescale && (!width.is_power_of_two() || !height.is_power_of_two()) {
        let (w, h) = (width.next_power_of_two(), height.next_power_of_two());
        debug!("texture '{}': rescaling {}x{} to {}x{}", name, width, height, w, h);
        (rescale_nearest(rgba, width, height, w, h), w, h)
    } else {
        (rgba.to_vec(), width, height)
    };

    let quantized = quantize_rgba(&data, options.max_colors);
    let mut indices = quantized.indices;
    let mut palette = quantized.palette;
    if options.optimize {
        compact_palette(&mut indices, &mut palette);
    }
    debug!("texture '{}': {}x{}, {} colors", name, w, h, palette.len());

    Ok(Texture::new(name, w, h, indices, palette)?)
}

/// Nearest-neighbour resample of RGBA pixels using 16.16 stepping
fn rescale_nearest(src: &[u8], in_w: usize, in_h: usize, out_w: usize, out_h: usize) -> Vec<u8> {
    let dx = ((in_w as u64) << 16) / out_w as u64;
    let dy = ((in_h as u64) << 16) / out_h as u64;
    let mut out = Vec::with_capacity(out_w * out_h * 4);
    for y in 0..out_h {
        let sy = ((y as u64 * dy) >> 16) as usize;
        let row = &src[sy * in_w * 4..(sy + 1) * in_w * 4];
        for x in 0..out_w {
            let sx = ((x as u64 * dx) >> 16) as usize;
            out.extend_from_slice(&row[sx * 4..sx * 4 + 4]);
        }
    }
    out
}

/// Move the highest used entries into unused slots and truncate the
/// palette to the entries that remain in use
fn compact_palette(indices: &mut [u8], palette: &mut Vec<Rgb>) {
    let mut used = vec![false; palette.len()];
    for &i in indices.iter() {
        if let Some(u) = used.get_mut(i as usize) {
            *u = true;
        }
    }

    let mut remap: Vec<u8> = (0..palette.len()).map(|i| i as u8).collect();
    let mut first_unused = 0;
    let mut last_used = palette.len();
    loop {
        while first_unused < used.len() && used[first_unused] {
            first_unused += 1;
        }
        while last_used > 0 && !used[last_used - 1] {
            last_used -= 1;
        }
        if first_unused >= used.len() || last_used == 0 || last_used - 1 <= first_unused {
            break;
        }
        let from = last_used - 1;
        palette[first_unused] = palette[from];
        used[from] = false;
        used[first_unused] = true;
        remap[from] = first_unused as u8;
    }

    for i in indices.iter_mut() {
        *i = remap[*i as usize];
    }
    palette.truncate(last_used.max(1));
}
