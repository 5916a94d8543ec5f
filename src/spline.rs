//! Kochanek-Bartels splines for animating positions and other values
//!
//! A spline holds `num_keys` keys of `key_width` floats each and passes
//! through every key. Frame 0.0 is the first key, 1.0 the second and so
//! on; the curve wraps around after the last key, so a spline is always a
//! closed loop.

use serde::{Deserialize, Serialize};

use crate::error::SceneError;
use crate::rasterizer::math::Vec3;

/// Closed TCB spline over fixed-width keys
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Spline {
    keys: Vec<f32>,
    key_width: usize,
    /// -1.0 (loose) to 1.0 (tight); 1.0 stops at every key
    pub tension: f32,
    /// -1.0 to 1.0; nonzero values put corners at the keys
    pub continuity: f32,
    /// -1.0 to 1.0; shifts overshoot before or after each key
    pub bias: f32,
}

/// Hermite basis weights for the four keys around a segment
#[derive(Debug, Clone, Copy)]
struct Basis {
    cubic: [f32; 4],
    square: [f32; 4],
    linear: [f32; 3],
}

impl Spline {
    /// Build from a flat list of `key_width`-sized keys
    pub fn new(key_width: usize, keys: Vec<f32>) -> Result<Self, SceneError> {
        if key_width == 0 || keys.is_empty() || keys.len() % key_width != 0 {
            return Err(SceneError::SplineKeys { len: keys.len(), width: key_width });
        }
        Ok(Self {
            keys,
            key_width,
            tension: 0.0,
            continuity: 0.0,
            bias: 0.0,
        })
    }

    /// Spline through 3D points
    pub fn from_points(points: &[Vec3]) -> Result<Self, SceneError> {
        let keys = points.iter().flat_map(|p| [p.x, p.y, p.z]).collect();
        Self::new(3, keys)
    }

    pub fn with_params(mut self, tension: f32, continuity: f32, bias: f32) -> Self {
        self.tension = tension;
        self.continuity = continuity;
        self.bias = bias;
        self
    }

    pub fn key_width(&self) -> usize {
        self.key_width
    }

    pub fn num_keys(&self) -> usize {
        self.keys.len() / self.key_width
    }

    /// Values of key `index`, wrapping past the end
    pub fn key(&self, index: usize) -> &[f32] {
        let start = (index % self.num_keys()) * self.key_width;
        &self.keys[start..start + self.key_width]
    }

    fn basis(&self) -> Basis {
        let t = 1.0 - self.tension;
        let (c, b) = (self.continuity, self.bias);
        let a = t * (1.0 + c) * (1.0 + b);
        let bb = t * (1.0 - c) * (1.0 - b);
        let cc = t * (1.0 - c) * (1.0 + b);
        let d = t * (1.0 + c) * (1.0 - b);

        Basis {
            cubic: [-a / 2.0, (4.0 + a - bb - cc) / 2.0, (-4.0 + bb + cc - d) / 2.0, d / 2.0],
            square: [a, (-6.0 - 2.0 * a + 2.0 * bb + cc) / 2.0, (6.0 - 2.0 * bb - cc + d) / 2.0, -d / 2.0],
            linear: [-a / 2.0, (a - bb) / 2.0, bb / 2.0],
        }
    }

    /// Write the point at `frame` into `out` (up to `key_width` values)
    pub fn sample_into(&self, frame: f32, out: &mut [f32]) {
        let n = self.num_keys() as i64;
        let whole = frame.floor();
        let time = frame - whole;
        let (t2, t3) = (time * time, time * time * time);

        let i0 = (whole as i64).rem_euclid(n) as usize;
        let n = n as usize;
        let prev = self.key(i0 + n - 1);
        let cur = self.key(i0);
        let next = self.key(i0 + 1);
        let after = self.key(i0 + 2);

        let w = self.basis();
        for (i, o) in out.iter_mut().take(self.key_width).enumerate() {
            let k = [prev[i], cur[i], next[i], after[i]];
            let cubic: f32 = w.cubic.iter().zip(&k).map(|(w, k)| w * k).sum();
            let square: f32 = w.square.iter().zip(&k).map(|(w, k)| w * k).sum();
            let linear: f32 = w.linear.iter().zip(&k).map(|(w, k)| w * k).sum();
            *o = cubic * t3 + square * t2 + linear * time + cur[i];
        }
    }

    pub fn sample(&self, frame: f32) -> Vec<f32> {
        let mut out = vec![0.0; self.key_width];
        self.sample_into(frame, &mut out);
        out
    }

    /// First three components at `frame`; missing ones are zero
    pub fn point(&self, frame: f32) -> Vec3 {
        let mut out = [0.0; 3];
        self.sample_into(frame, &mut out);
        Vec3::new(out[0], out[1], out[2])
    }
}
