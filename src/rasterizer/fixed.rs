//! Fixed-point formats used between the clipper and the span fillers
//!
//! - 12.20 for projected screen x/y (sub-pixel precision, rounded per scanline)
//! - 16.16 for texture coordinates, where one full texture repeat is `1 << 16`
//!   before the texture's own scale is applied

use std::ops::{Add, Neg, Sub};

// =============================================================================
// 12.20 screen coordinates
// =============================================================================

pub const SCREEN_FRAC_BITS: u32 = 20;
pub const SCREEN_ONE: i32 = 1 << SCREEN_FRAC_BITS;
const SCREEN_HALF: i32 = 1 << (SCREEN_FRAC_BITS - 1);

/// Screen coordinate in 12.20 fixed point
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct ScreenFixed(pub i32);

impl ScreenFixed {
    pub const ZERO: ScreenFixed = ScreenFixed(0);

    /// Whole pixel position
    #[inline]
    pub fn from_int(v: i32) -> Self {
        ScreenFixed(v << SCREEN_FRAC_BITS)
    }

    #[inline]
    pub fn from_f32(f: f32) -> Self {
        ScreenFixed((f * SCREEN_ONE as f32) as i32)
    }

    #[inline]
    pub fn to_f32(self) -> f32 {
        self.0 as f32 / SCREEN_ONE as f32
    }

    /// Round to the nearest pixel (half rounds up)
    #[inline]
    pub fn round(self) -> i32 {
        (self.0 + SCREEN_HALF) >> SCREEN_FRAC_BITS
    }
}

impl Add for ScreenFixed {
    type Output = Self;
    #[inline]
    fn add(self, other: Self) -> Self {
        ScreenFixed(self.0.wrapping_add(other.0))
    }
}

impl Sub for ScreenFixed {
    type Output = Self;
    #[inline]
    fn sub(self, other: Self) -> Self {
        ScreenFixed(self.0.wrapping_sub(other.0))
    }
}

impl Neg for ScreenFixed {
    type Output = Self;
    #[inline]
    fn neg(self) -> Self {
        ScreenFixed(self.0.wrapping_neg())
    }
}

// =============================================================================
// 16.16 texture coordinates
// =============================================================================

pub const UV_FRAC_BITS: u32 = 16;
pub const UV_ONE: i32 = 1 << UV_FRAC_BITS;

/// Texel index along one axis for a 16.16 coordinate already in texel units,
/// wrapped to a power-of-two size
#[inline]
pub fn uv_texel(coord: i32, mask: i32) -> usize {
    ((coord >> UV_FRAC_BITS) & mask) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_screen_round_half_up() {
        assert_eq!(ScreenFixed::from_f32(10.49).round(), 10);
        assert_eq!(ScreenFixed::from_f32(10.5).round(), 11);
        assert_eq!(ScreenFixed::from_int(7).round(), 7);
        assert_eq!(ScreenFixed::from_f32(-0.25).round(), 0);
    }

    #[test]
    fn test_screen_arithmetic() {
        let a = ScreenFixed::from_int(3);
        let b = ScreenFixed::from_f32(0.5);
        assert!(((a + b).to_f32() - 3.5).abs() < 1e-5);
        assert!(((a - b).to_f32() - 2.5).abs() < 1e-5);
        assert_eq!((-a).round(), -3);
    }

    #[test]
    fn test_uv_wraps_negative() {
        // -0.5 texel wraps to the last texel of a 16 wide texture
        let coord = -(UV_ONE / 2);
        assert_eq!(uv_texel(coord, 15), 15);
        assert_eq!(uv_texel(17 * UV_ONE + UV_ONE / 2, 15), 1);
    }
}
