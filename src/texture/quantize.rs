//! Median-cut color quantization
//!
//! Reduces true-color pixels to at most 256 palette entries plus one index
//! per pixel, the form [`Texture`](crate::rasterizer::types::Texture) stores.

use std::collections::HashMap;

use crate::rasterizer::types::{Rgb, PALETTE_SIZE};

/// Indexed pixels and the palette they refer to
#[derive(Debug, Clone, PartialEq)]
pub struct Quantized {
    pub indices: Vec<u8>,
    pub palette: Vec<Rgb>,
}

/// Quantize RGBA pixels (alpha ignored) to at most `max_colors` colors
pub fn quantize_rgba(rgba: &[u8], max_colors: usize) -> Quantized {
    let max_colors = max_colors.clamp(1, PALETTE_SIZE);
    let colors: Vec<Rgb> = rgba.chunks_exact(4).map(|p| Rgb::new(p[0], p[1], p[2])).collect();
    let palette = median_cut(&colors, max_colors);

    let mut cache: HashMap<Rgb, u8> = HashMap::new();
    let indices = colors
        .iter()
        .map(|c| *cache.entry(*c).or_insert_with(|| find_nearest_color(*c, &palette)))
        .collect();

    Quantized { indices, palette }
}

/// Median cut color quantization
///
/// Repeatedly splits the bucket with the largest color volume along its
/// widest channel until there are `max_colors` buckets, then averages each.
pub fn median_cut(colors: &[Rgb], max_colors: usize) -> Vec<Rgb> {
    if colors.is_empty() {
        return vec![Rgb::BLACK];
    }

    let mut unique: Vec<Rgb> = colors.to_vec();
    unique.sort_by_key(|c| (c.r, c.g, c.b));
    unique.dedup();
    if unique.len() <= max_colors {
        return unique;
    }

    let mut buckets: Vec<Vec<Rgb>> = vec![colors.to_vec()];
    while buckets.len() < max_colors {
        let (split_idx, max_volume) = buckets
            .iter()
            .enumerate()
            .map(|(i, b)| (i, bucket_volume(b)))
            .max_by_key(|(_, v)| *v)
            .unwrap_or((0, 0));

        if max_volume == 0 {
            break;
        }

        let mut bucket = buckets.swap_remove(split_idx);
        let (r_range, g_range, b_range) = bucket_ranges(&bucket);
        if r_range >= g_range && r_range >= b_range {
            bucket.sort_by_key(|c| c.r);
        } else if g_range >= b_range {
            bucket.sort_by_key(|c| c.g);
        } else {
            bucket.sort_by_key(|c| c.b);
        }

        let right = bucket.split_off(bucket.len() / 2);
        buckets.push(bucket);
        buckets.push(right);
    }

    let mut palette: Vec<Rgb> = buckets.iter().map(|b| average_color(b)).collect();
    palette.sort_by_key(|c| (c.r, c.g, c.b));
    palette.dedup();
    palette
}

/// Volume of the bounding box of a bucket, with each side at least 1 when
/// the bucket holds more than one distinct color
fn bucket_volume(colors: &[Rgb]) -> u32 {
    if colors.len() < 2 {
        return 0;
    }
    let (r, g, b) = bucket_ranges(colors);
    if r == 0 && g == 0 && b == 0 {
        return 0;
    }
    (r as u32 + 1) * (g as u32 + 1) * (b as u32 + 1)
}

fn bucket_ranges(colors: &[Rgb]) -> (u8, u8, u8) {
    let (mut r_min, mut r_max) = (255u8, 0u8);
    let (mut g_min, mut g_max) = (255u8, 0u8);
    let (mut b_min, mut b_max) = (255u8, 0u8);

    for c in colors {
        r_min = r_min.min(c.r);
        r_max = r_max.max(c.r);
        g_min = g_min.min(c.g);
        g_max = g_max.max(c.g);
        b_min = b_min.min(c.b);
        b_max = b_max.max(c.b);
    }

    (
        r_max.saturating_sub(r_min),
        g_max.saturating_sub(g_min),
        b_max.saturating_sub(b_min),
    )
}

fn average_color(colors: &[Rgb]) -> Rgb {
    if colors.is_empty() {
        return Rgb::BLACK;
    }
    let (mut r, mut g, mut b) = (0u64, 0u64, 0u64);
    for c in colors {
        r += c.r as u64;
        g += c.g as u64;
        b += c.b as u64;
    }
    let n = colors.len() as u64;
    Rgb::new((r / n) as u8, (g / n) as u8, (b / n) as u8)
}

/// Index of the nearest palette color; the lowest index wins ties
fn find_nearest_color(target: Rgb, palette: &[Rgb]) -> u8 {
    let mut best_idx = 0u8;
    let mut best_dist = i32::MAX;
    for (i, color) in palette.iter().enumerate() {
        let dist = target.dist_sq(*color);
        if dist < best_dist {
            best_dist = dist;
            best_idx = i as u8;
            if dist == 0 {
                break;
            }
        }
    }
    best_idx
}

/// Count distinct RGB colors in RGBA pixel data
pub fn count_unique_colors(rgba: &[u8]) -> usize {
    use std::collections::HashSet;

    rgba.chunks_exact(4)
        .map(|p| (p[0], p[1], p[2]))
        .collect::<HashSet<_>>()
        .len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantize_exact_when_few_colors() {
        let rgba = vec![
            255, 0, 0, 255,
            0, 255, 0, 255,
            0, 0, 255, 255,
            255, 0, 0, 255,
        ];
        let q = quantize_rgba(&rgba, 16);
        assert_eq!(q.palette.len(), 3);
        assert_eq!(q.indices.len(), 4);
        assert_eq!(q.indices[0], q.indices[3]);
        for (i, px) in rgba.chunks(4).enumerate() {
            assert_eq!(q.palette[q.indices[i] as usize], Rgb::new(px[0], px[1], px[2]));
        }
    }

    #[test]
    fn test_quantize_reduces_colors() {
        let mut rgba = Vec::new();
        for i in 0..=255u8 {
            rgba.extend_from_slice(&[i, 255 - i, i / 2, 255]);
        }
        assert_eq!(count_unique_colors(&rgba), 256);
        let q = quantize_rgba(&rgba, 8);
        assert!(q.palette.len() <= 8);
        assert!(q.palette.len() > 1);
        assert!(q.indices.iter().all(|&i| (i as usize) < q.palette.len()));
        // Dark and bright ends land in different buckets
        assert_ne!(q.indices[0], q.indices[255]);
    }

    #[test]
    fn test_find_nearest_color() {
        let palette = vec![
            Rgb::new(0, 0, 0),
            Rgb::new(255, 0, 0),
            Rgb::new(0, 255, 0),
            Rgb::new(0, 0, 255),
        ];
        assert_eq!(find_nearest_color(Rgb::new(255, 0, 0), &palette), 1);
        assert_eq!(find_nearest_color(Rgb::new(220, 20, 20), &palette), 1);
        assert_eq!(find_nearest_color(Rgb::new(20, 220, 20), &palette), 2);
    }

    #[test]
    fn test_empty_input() {
        let q = quantize_rgba(&[], 256);
        assert!(q.indices.is_empty());
        assert_eq!(q.palette, vec![Rgb::BLACK]);
    }
}
