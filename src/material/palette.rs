//! Palette mapping and shared palette construction
//!
//! `build_shared_palette` merges the colors every material asks for into a
//! slice of the output palette; `Material::map_to_palette` then points each
//! requested color at its nearest palette entry.

use std::ops::RangeInclusive;

use log::{debug, warn};

use super::{FillMode, Material};
use crate::rasterizer::types::{Palette, Rgb, PALETTE_SIZE};

/// Clamp an inclusive palette range to the 256 entries; `None` when empty
fn clamp_range(range: &RangeInclusive<usize>) -> Option<(usize, usize)> {
    let start = *range.start();
    let end = (*range.end()).min(PALETTE_SIZE - 1);
    if start > end {
        None
    } else {
        Some((start, end))
    }
}

/// Index in `start..=end` of the palette entry closest to `color`.
/// Ties resolve to the lowest index.
pub fn nearest_index(palette: &Palette, range: RangeInclusive<usize>, color: Rgb) -> u8 {
    let Some((start, end)) = clamp_range(&range) else {
        return 0;
    };
    let mut best = start;
    let mut best_dist = i32::MAX;
    for i in start..=end {
        let dist = palette[i].dist_sq(color);
        if dist < best_dist {
            best_dist = dist;
            best = i;
            if dist == 0 {
                break;
            }
        }
    }
    best as u8
}

impl Material {
    /// Build the remap table against `palette[range]`.
    ///
    /// Initializes the material first if it has no requested colors yet.
    /// Transparent materials also get a 256-entry table converting the
    /// brightness of whatever is already in the framebuffer to a ramp offset.
    pub fn map_to_palette(&mut self, palette: &Palette, range: RangeInclusive<usize>) {
        if self.requested_colors().is_empty() {
            self.init();
        }
        if clamp_range(&range).is_none() {
            warn!("material '{}': empty palette range {:?}", self.name, range);
            return;
        }

        let remap: Vec<u8> = self
            .requested_colors()
            .iter()
            .map(|&c| nearest_index(palette, range.clone(), c))
            .collect();

        let add_table = if self.fill() == FillMode::Transparent {
            let span = (self.colors_used() as i64 - self.tsfact() as i64).max(0);
            Some(
                palette
                    .colors()
                    .iter()
                    .map(|c| (c.intensity() as i64 * span / 768) as u32)
                    .collect(),
            )
        } else {
            None
        };

        debug!("material '{}' mapped {} colors into {:?}", self.name, remap.len(), range);
        self.set_mapping(remap, add_table);
    }
}

/// Fill `palette[range]` with the colors requested by `materials`.
///
/// If everything fits it is copied as is; otherwise exact duplicates are
/// dropped, and if that is still too many the colors are chained by nearest
/// neighbour and the closest adjacent pairs averaged until they fit.
/// Entries outside the range are untouched. Returns the number written.
pub fn build_shared_palette<'a, I>(materials: I, palette: &mut Palette, range: RangeInclusive<usize>) -> usize
where
    I: IntoIterator<Item = &'a mut Material>,
{
    let Some((start, end)) = clamp_range(&range) else {
        return 0;
    };
    let budget = end + 1 - start;

    let mut all: Vec<Rgb> = Vec::new();
    for mat in materials {
        if mat.requested_colors().is_empty() {
            mat.init();
        }
        all.extend_from_slice(mat.requested_colors());
    }
    if all.is_empty() {
        return 0;
    }

    let colors = if all.len() <= budget {
        all
    } else {
        let distinct = dedup_keep_first(&all);
        if distinct.len() <= budget {
            distinct
        } else {
            let merged = merge_chain(nearest_chain(&distinct), budget);
            debug!("shared palette: merged {} colors down to {}", distinct.len(), merged.len());
            merged
        }
    };

    palette.colors_mut()[start..start + colors.len()].copy_from_slice(&colors);
    colors.len()
}

fn dedup_keep_first(colors: &[Rgb]) -> Vec<Rgb> {
    let mut seen = std::collections::HashSet::with_capacity(colors.len());
    colors.iter().copied().filter(|c| seen.insert(*c)).collect()
}

/// Order colors so each is followed by its nearest unvisited neighbour,
/// starting from the first
fn nearest_chain(colors: &[Rgb]) -> Vec<Rgb> {
    let mut remaining: Vec<Rgb> = colors.to_vec();
    let mut chain = Vec::with_capacity(colors.len());
    let mut current = remaining.remove(0);
    chain.push(current);
    while !remaining.is_empty() {
        let mut best = 0;
        let mut best_dist = i32::MAX;
        for (i, c) in remaining.iter().enumerate() {
            let d = current.dist_sq(*c);
            if d < best_dist {
                best_dist = d;
                best = i;
            }
        }
        current = remaining.remove(best);
        chain.push(current);
    }
    chain
}

/// Average the closest adjacent pair until `chain.len() == budget`
fn merge_chain(mut chain: Vec<Rgb>, budget: usize) -> Vec<Rgb> {
    while chain.len() > budget.max(1) {
        let mut best = 0;
        let mut best_dist = i32::MAX;
        for i in 0..chain.len() - 1 {
            let d = chain[i].dist_sq(chain[i + 1]);
            if d < best_dist {
                best_dist = d;
                best = i;
            }
        }
        chain[best] = chain[best].average(chain[best + 1]);
        chain.remove(best + 1);
    }
    chain
}
