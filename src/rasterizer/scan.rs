//! Scanline fillers for 8-bit indexed output
//!
//! Every filler walks the same spans: vertices sorted by y, rows from
//! round(y0) up to (not including) round(y2), pixels from round(xl) up to
//! round(xr). Attributes (depth, shade, texture coordinates) are planes in
//! screen space, so their per-pixel step is constant across the triangle.
//! All output goes through the material's remap table.

use crate::material::{FillMode, Material, ShadeMode};
use super::fixed::{uv_texel, ScreenFixed, SCREEN_FRAC_BITS};
use super::render::Framebuffer;
use super::types::Texture;

/// Largest perspective step exponent (exact UVs at least every 64 pixels)
const MAX_PERSPECTIVE_SHIFT: u32 = 6;

/// A projected, clipped vertex ready for scan conversion
#[derive(Debug, Clone, Copy, Default)]
pub struct ScreenVertex {
    pub x: ScreenFixed,
    pub y: ScreenFixed,
    /// Reciprocal camera-space depth
    pub z: f32,
    /// Gouraud intensity, nominally 0..1
    pub shade: f32,
    /// Texture coordinates, 16.16 in texels
    pub u: i32,
    pub v: i32,
    /// Environment coordinates, 16.16 in texels
    pub eu: i32,
    pub ev: i32,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ScreenTriangle {
    pub vertices: [ScreenVertex; 3],
    /// Face intensity, 0..1
    pub flat_shade: f32,
}

/// The nine span fillers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rasterizer {
    SolidFlat,
    SolidGouraud,
    TexFlat,
    TexGouraud,
    TexEnv,
    PerspTexFlat,
    PerspTexGouraud,
    TransFlat,
    TransGouraud,
}

impl Rasterizer {
    /// Filler for a fill/shade combination, `None` if unsupported
    pub fn select(fill: FillMode, shade: ShadeMode, perspective_correct: u32) -> Option<Rasterizer> {
        let flat = shade.is_flat_group();
        let gouraud = shade.is_gouraud_group();
        let persp = perspective_correct != 0;
        match fill {
            FillMode::Solid if flat => Some(Rasterizer::SolidFlat),
            FillMode::Solid if gouraud => Some(Rasterizer::SolidGouraud),
            FillMode::Texture | FillMode::Environment if flat => {
                Some(if persp { Rasterizer::PerspTexFlat } else { Rasterizer::TexFlat })
            }
            FillMode::Texture | FillMode::Environment if gouraud => {
                Some(if persp { Rasterizer::PerspTexGouraud } else { Rasterizer::TexGouraud })
            }
            FillMode::TextureEnvironment => Some(Rasterizer::TexEnv),
            FillMode::Transparent if flat => Some(Rasterizer::TransFlat),
            FillMode::Transparent if gouraud => Some(Rasterizer::TransGouraud),
            _ => None,
        }
    }

    /// Scan-convert one triangle into the framebuffer.
    ///
    /// Draws nothing if the material is not mapped to a palette or lacks the
    /// texture the filler needs.
    pub fn draw(self, tri: &ScreenTriangle, mat: &Material, fb: &mut Framebuffer) {
        if !mat.is_mapped() {
            return;
        }
        let Some(setup) = Setup::new(tri) else {
            return;
        };
        let zbuf = if mat.z_bufferable { fb.zbuffer.as_deref_mut() } else { None };
        let mut target = Target {
            pixels: fb.pixels.as_mut_slice(),
            zbuf,
            width: fb.width,
            height: fb.height,
        };

        match self {
            Rasterizer::SolidFlat => solid_flat(tri, &setup, mat, &mut target),
            Rasterizer::SolidGouraud => solid_gouraud(tri, &setup, mat, &mut target),
            Rasterizer::TexFlat | Rasterizer::TexGouraud => {
                if let Some(tex) = mat.primary_texture() {
                    textured(tri, &setup, mat, tex, self == Rasterizer::TexGouraud, &mut target);
                }
            }
            Rasterizer::TexEnv => {
                if let (Some(tex), Some(env)) = (mat.texture.as_deref(), mat.environment.as_deref()) {
                    tex_env(tri, &setup, mat, tex, env, &mut target);
                }
            }
            Rasterizer::PerspTexFlat | Rasterizer::PerspTexGouraud => {
                if let Some(tex) = mat.primary_texture() {
                    let gouraud = self == Rasterizer::PerspTexGouraud;
                    perspective_textured(tri, &setup, mat, tex, gouraud, &mut target);
                }
            }
            Rasterizer::TransFlat => transparent(tri, &setup, mat, false, &mut target),
            Rasterizer::TransGouraud => transparent(tri, &setup, mat, true, &mut target),
        }
    }
}

// =============================================================================
// Shared setup
// =============================================================================

struct Target<'a> {
    pixels: &'a mut [u8],
    zbuf: Option<&'a mut [f32]>,
    width: usize,
    height: usize,
}

impl Target<'_> {
    /// Depth test and store; always passes without a depth buffer
    #[inline]
    fn depth_pass(&mut self, i: usize, z: f32) -> bool {
        match self.zbuf.as_deref_mut() {
            Some(zb) => {
                if zb[i] < z {
                    zb[i] = z;
                    true
                } else {
                    false
                }
            }
            None => true,
        }
    }
}

/// Linear attribute `a*x + b*y + c` over the screen
#[derive(Debug, Clone, Copy)]
struct Plane {
    a: f64,
    b: f64,
    c: f64,
}

impl Plane {
    #[inline]
    fn at(&self, x: i32, y: i32) -> f64 {
        self.a * x as f64 + self.b * y as f64 + self.c
    }
}

/// Screen positions of the triangle, for building attribute planes
struct Setup {
    x0: f64,
    y0: f64,
    d1x: f64,
    d1y: f64,
    d2x: f64,
    d2y: f64,
    det: f64,
}

impl Setup {
    fn new(tri: &ScreenTriangle) -> Option<Self> {
        let [p0, p1, p2] = tri.vertices;
        let x0 = p0.x.to_f32() as f64;
        let y0 = p0.y.to_f32() as f64;
        let d1x = p1.x.to_f32() as f64 - x0;
        let d1y = p1.y.to_f32() as f64 - y0;
        let d2x = p2.x.to_f32() as f64 - x0;
        let d2y = p2.y.to_f32() as f64 - y0;
        let det = d1x * d2y - d2x * d1y;
        if det.abs() < 1e-9 {
            return None;
        }
        Some(Self { x0, y0, d1x, d1y, d2x, d2y, det })
    }

    fn plane(&self, values: [f64; 3]) -> Plane {
        let dv1 = values[1] - values[0];
        let dv2 = values[2] - values[0];
        let a = (dv1 * self.d2y - dv2 * self.d1y) / self.det;
        let b = (dv2 * self.d1x - dv1 * self.d2x) / self.det;
        Plane {
            a,
            b,
            c: values[0] - a * self.x0 - b * self.y0,
        }
    }

    fn plane_of(&self, tri: &ScreenTriangle, f: impl Fn(&ScreenVertex) -> f64) -> Plane {
        let [p0, p1, p2] = &tri.vertices;
        self.plane([f(p0), f(p1), f(p2)])
    }
}

/// Triangle edge in 12.20 fixed point
struct Edge {
    x0: i64,
    y0: i64,
    dx: i64,
    dy: i64,
}

impl Edge {
    fn new(a: &ScreenVertex, b: &ScreenVertex) -> Self {
        Self {
            x0: a.x.0 as i64,
            y0: a.y.0 as i64,
            dx: b.x.0 as i64 - a.x.0 as i64,
            dy: b.y.0 as i64 - a.y.0 as i64,
        }
    }

    #[inline]
    fn x_at(&self, row: i32) -> ScreenFixed {
        if self.dy == 0 {
            return ScreenFixed(self.x0 as i32);
        }
        let dy = ((row as i64) << SCREEN_FRAC_BITS) - self.y0;
        ScreenFixed((self.x0 + self.dx * dy / self.dy) as i32)
    }
}

/// Call `f(row, x_start, x_end)` for every visible span, clipped to the target
fn for_each_span(tri: &ScreenTriangle, width: usize, height: usize, mut f: impl FnMut(i32, i32, i32)) {
    let mut v = tri.vertices;
    v.sort_by_key(|p| p.y.0);

    let y0 = v[0].y.round();
    let y1 = v[1].y.round();
    let y2 = v[2].y.round();

    let long = Edge::new(&v[0], &v[2]);
    let upper = Edge::new(&v[0], &v[1]);
    let lower = Edge::new(&v[1], &v[2]);

    for row in y0.max(0)..y2.min(height as i32) {
        let short = if row < y1 { &upper } else { &lower };
        let a = long.x_at(row).round();
        let b = short.x_at(row).round();
        let (xl, xr) = if a <= b { (a, b) } else { (b, a) };
        let xl = xl.max(0);
        let xr = xr.min(width as i32);
        if xl < xr {
            f(row, xl, xr);
        }
    }
}

/// Remap lookup; indices past the ramp saturate to its last entry
#[inline]
fn remap_index(remap: &[u8], i: usize) -> u8 {
    remap[i.min(remap.len() - 1)]
}

#[inline]
fn add_entry(add: Option<&[u32]>, i: i32) -> usize {
    match add {
        Some(table) => table[i.clamp(0, 255) as usize] as usize,
        None => 0,
    }
}

#[inline]
fn sample(tex: &Texture, u: i32, v: i32) -> usize {
    tex.texel(uv_texel(u, tex.u_mask()), uv_texel(v, tex.v_mask())) as usize
}

/// Texture coordinate planes for the single-texture fillers: environment
/// coordinates when the material carries an environment map
fn uv_planes(tri: &ScreenTriangle, setup: &Setup, mat: &Material) -> (Plane, Plane) {
    if mat.environment.is_some() {
        (
            setup.plane_of(tri, |p| p.eu as f64),
            setup.plane_of(tri, |p| p.ev as f64),
        )
    } else {
        (
            setup.plane_of(tri, |p| p.u as f64),
            setup.plane_of(tri, |p| p.v as f64),
        )
    }
}

// =============================================================================
// Solid fills
// =============================================================================

fn solid_flat(tri: &ScreenTriangle, setup: &Setup, mat: &Material, t: &mut Target) {
    let remap = mat.remap();
    let top = mat.colors_used() as i32 - 1;
    let color = remap_index(remap, ((tri.flat_shade * top as f32) as i32).clamp(0, top) as usize);
    let zp = setup.plane_of(tri, |p| p.z as f64);

    let (width, height) = (t.width, t.height);
    for_each_span(tri, width, height, |row, xl, xr| {
        let base = row as usize * width;
        let mut z = zp.at(xl, row);
        for x in xl..xr {
            let i = base + x as usize;
            if t.depth_pass(i, z as f32) {
                t.pixels[i] = color;
            }
            z += zp.a;
        }
    });
}

fn solid_gouraud(tri: &ScreenTriangle, setup: &Setup, mat: &Material, t: &mut Target) {
    let remap = mat.remap();
    let top = mat.colors_used() as i32 - 1;
    let zp = setup.plane_of(tri, |p| p.z as f64);
    let sp = setup.plane_of(tri, |p| p.shade as f64 * top as f64);

    let (width, height) = (t.width, t.height);
    for_each_span(tri, width, height, |row, xl, xr| {
        let base = row as usize * width;
        let mut z = zp.at(xl, row);
        let mut c = sp.at(xl, row);
        for x in xl..xr {
            let i = base + x as usize;
            if t.depth_pass(i, z as f32) {
                t.pixels[i] = remap_index(remap, (c as i32).clamp(0, top) as usize);
            }
            z += zp.a;
            c += sp.a;
        }
    });
}

// =============================================================================
// Affine textured fills
// =============================================================================

fn textured(tri: &ScreenTriangle, setup: &Setup, mat: &Material, tex: &Texture, gouraud: bool, t: &mut Target) {
    let remap = mat.remap();
    let add = mat.add_table();
    let flat_add = add_entry(add, (tri.flat_shade * 255.0) as i32);
    let zp = setup.plane_of(tri, |p| p.z as f64);
    let sp = setup.plane_of(tri, |p| p.shade as f64 * 65535.0);
    let (up, vp) = uv_planes(tri, setup, mat);
    let (du, dv) = (up.a as i32, vp.a as i32);

    let (width, height) = (t.width, t.height);
    for_each_span(tri, width, height, |row, xl, xr| {
        let base = row as usize * width;
        let mut z = zp.at(xl, row);
        let mut s = sp.at(xl, row);
        let mut u = up.at(xl, row) as i32;
        let mut v = vp.at(xl, row) as i32;
        for x in xl..xr {
            let i = base + x as usize;
            if t.depth_pass(i, z as f32) {
                let offset = if gouraud { add_entry(add, (s as i32) >> 8) } else { flat_add };
                t.pixels[i] = remap_index(remap, offset + sample(tex, u, v));
            }
            z += zp.a;
            s += sp.a;
            u = u.wrapping_add(du);
            v = v.wrapping_add(dv);
        }
    });
}

fn tex_env(tri: &ScreenTriangle, setup: &Setup, mat: &Material, tex: &Texture, env: &Texture, t: &mut Target) {
    let remap = mat.remap();
    let add = mat.add_table();
    let zp = setup.plane_of(tri, |p| p.z as f64);
    let up = setup.plane_of(tri, |p| p.u as f64);
    let vp = setup.plane_of(tri, |p| p.v as f64);
    let eup = setup.plane_of(tri, |p| p.eu as f64);
    let evp = setup.plane_of(tri, |p| p.ev as f64);
    let (du, dv, deu, dev) = (up.a as i32, vp.a as i32, eup.a as i32, evp.a as i32);

    let (width, height) = (t.width, t.height);
    for_each_span(tri, width, height, |row, xl, xr| {
        let base = row as usize * width;
        let mut z = zp.at(xl, row);
        let mut u = up.at(xl, row) as i32;
        let mut v = vp.at(xl, row) as i32;
        let mut eu = eup.at(xl, row) as i32;
        let mut ev = evp.at(xl, row) as i32;
        for x in xl..xr {
            let i = base + x as usize;
            if t.depth_pass(i, z as f32) {
                let level = add_entry(add, sample(env, eu, ev) as i32);
                t.pixels[i] = remap_index(remap, level + sample(tex, u, v));
            }
            z += zp.a;
            u = u.wrapping_add(du);
            v = v.wrapping_add(dv);
            eu = eu.wrapping_add(deu);
            ev = ev.wrapping_add(dev);
        }
    });
}

// =============================================================================
// Perspective-corrected textured fills
// =============================================================================

#[inline]
fn divide_uv(uz: f64, vz: f64, z: f64) -> (i32, i32) {
    if z <= f64::EPSILON {
        (0, 0)
    } else {
        ((uz / z) as i32, (vz / z) as i32)
    }
}

fn perspective_textured(
    tri: &ScreenTriangle,
    setup: &Setup,
    mat: &Material,
    tex: &Texture,
    gouraud: bool,
    t: &mut Target,
) {
    let remap = mat.remap();
    let add = mat.add_table();
    // perspective fills scale by 256, affine ones by 255
    let flat_add = add_entry(add, (tri.flat_shade * 256.0) as i32);
    let shift = (u32::BITS - mat.perspective_correct.leading_zeros()).min(MAX_PERSPECTIVE_SHIFT);
    let seg = 1i32 << shift;

    let zp = setup.plane_of(tri, |p| p.z as f64);
    let sp = setup.plane_of(tri, |p| p.shade as f64 * 65535.0);
    let use_env = mat.environment.is_some();
    let uzp = setup.plane_of(tri, |p| (if use_env { p.eu } else { p.u }) as f64 * p.z as f64);
    let vzp = setup.plane_of(tri, |p| (if use_env { p.ev } else { p.v }) as f64 * p.z as f64);

    let (width, height) = (t.width, t.height);
    for_each_span(tri, width, height, |row, xl, xr| {
        let base = row as usize * width;
        let mut z = zp.at(xl, row);
        let mut s = sp.at(xl, row);
        let mut uz = uzp.at(xl, row);
        let mut vz = vzp.at(xl, row);
        let (mut u, mut v) = divide_uv(uz, vz, z);

        let mut x = xl;
        while x < xr {
            let n = seg.min(xr - x);
            let uz_end = uz + uzp.a * n as f64;
            let vz_end = vz + vzp.a * n as f64;
            let z_end = z + zp.a * n as f64;
            let (u_end, v_end) = divide_uv(uz_end, vz_end, z_end);
            let du = (u_end.wrapping_sub(u)) / n;
            let dv = (v_end.wrapping_sub(v)) / n;

            let mut zz = z;
            for _ in 0..n {
                let i = base + x as usize;
                if t.depth_pass(i, zz as f32) {
                    let offset = if gouraud { add_entry(add, (s as i32) >> 8) } else { flat_add };
                    t.pixels[i] = remap_index(remap, offset + sample(tex, u, v));
                }
                zz += zp.a;
                s += sp.a;
                u = u.wrapping_add(du);
                v = v.wrapping_add(dv);
                x += 1;
            }

            z = z_end;
            uz = uz_end;
            vz = vz_end;
            u = u_end;
            v = v_end;
        }
    });
}

// =============================================================================
// Transparent fills
// =============================================================================

fn transparent(tri: &ScreenTriangle, setup: &Setup, mat: &Material, gouraud: bool, t: &mut Target) {
    let remap = mat.remap();
    let Some(add) = mat.add_table() else {
        return;
    };
    let tsfact = mat.tsfact();
    let top = (tsfact - 1).max(0);
    let flat_offset = ((tri.flat_shade * tsfact as f32) as i32).clamp(0, top) as usize;
    let zp = setup.plane_of(tri, |p| p.z as f64);
    let sp = setup.plane_of(tri, |p| p.shade as f64 * tsfact as f64);

    let (width, height) = (t.width, t.height);
    for_each_span(tri, width, height, |row, xl, xr| {
        let base = row as usize * width;
        let mut z = zp.at(xl, row);
        let mut s = sp.at(xl, row);
        for x in xl..xr {
            let i = base + x as usize;
            if t.depth_pass(i, z as f32) {
                let offset = if gouraud { (s as i32).clamp(0, top) as usize } else { flat_offset };
                let behind = add[t.pixels[i] as usize] as usize;
                t.pixels[i] = remap_index(remap, offset + behind);
            }
            z += zp.a;
            s += sp.a;
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;
    use crate::rasterizer::fixed::UV_ONE;
    use crate::rasterizer::types::{Palette, Rgb};

    /// Palette where entry i is gray level i
    fn gray_palette() -> Palette {
        let mut pal = Palette::new();
        for i in 0..256 {
            pal[i] = Rgb::new(i as u8, i as u8, i as u8);
        }
        pal
    }

    fn solid_material(level: i32) -> Material {
        let mut m = Material::new("solid");
        m.ambient = [level; 3];
        m.map_to_palette(&gray_palette(), 0..=255);
        m
    }

    fn vertex(x: f32, y: f32, z: f32) -> ScreenVertex {
        ScreenVertex {
            x: ScreenFixed::from_f32(x),
            y: ScreenFixed::from_f32(y),
            z,
            ..Default::default()
        }
    }

    /// Two triangles covering [x0, x1) x [y0, y1)
    fn quad(x0: f32, y0: f32, x1: f32, y1: f32, z: f32) -> [ScreenTriangle; 2] {
        let a = vertex(x0, y0, z);
        let b = vertex(x1, y0, z);
        let c = vertex(x1, y1, z);
        let d = vertex(x0, y1, z);
        [
            ScreenTriangle { vertices: [a, b, c], flat_shade: 0.0 },
            ScreenTriangle { vertices: [a, c, d], flat_shade: 0.0 },
        ]
    }

    /// Apply a texture mapping u = x * 16384 + 8192 (same for v)
    fn with_uv(mut tri: ScreenTriangle) -> ScreenTriangle {
        for p in &mut tri.vertices {
            p.u = (p.x.to_f32() * (UV_ONE / 4) as f32) as i32 + UV_ONE / 8;
            p.v = (p.y.to_f32() * (UV_ONE / 4) as f32) as i32 + UV_ONE / 8;
        }
        tri
    }

    #[test]
    fn test_select() {
        assert_eq!(Rasterizer::select(FillMode::Solid, ShadeMode::NONE, 0), Some(Rasterizer::SolidFlat));
        assert_eq!(
            Rasterizer::select(FillMode::Solid, ShadeMode::FLAT | ShadeMode::FLAT_DISTANCE, 0),
            Some(Rasterizer::SolidFlat)
        );
        assert_eq!(Rasterizer::select(FillMode::Environment, ShadeMode::GOURAUD, 0), Some(Rasterizer::TexGouraud));
        assert_eq!(Rasterizer::select(FillMode::Texture, ShadeMode::FLAT, 3), Some(Rasterizer::PerspTexFlat));
        assert_eq!(Rasterizer::select(FillMode::Transparent, ShadeMode::GOURAUD_DISTANCE, 0), Some(Rasterizer::TransGouraud));
        assert_eq!(Rasterizer::select(FillMode::Solid, ShadeMode::FLAT | ShadeMode::GOURAUD, 0), None);
    }

    #[test]
    fn test_shared_edge_covers_each_pixel_once() {
        let mut fb = Framebuffer::new(16, 16, false);
        let first = solid_material(10);
        let second = solid_material(20);
        let [a, b] = quad(0.0, 0.0, 8.0, 8.0, 1.0);
        Rasterizer::SolidFlat.draw(&a, &first, &mut fb);
        Rasterizer::SolidFlat.draw(&b, &second, &mut fb);

        for y in 0..16 {
            for x in 0..16 {
                let p = fb.pixels[y * 16 + x];
                if x < 8 && y < 8 {
                    let expected = if x >= y { 10 } else { 20 };
                    assert_eq!(p, expected, "pixel {},{}", x, y);
                } else {
                    assert_eq!(p, 0, "pixel {},{} outside", x, y);
                }
            }
        }
    }

    #[test]
    fn test_offscreen_triangle_is_clamped() {
        let mut fb = Framebuffer::new(16, 16, false);
        let m = solid_material(7);
        let tri = ScreenTriangle {
            vertices: [vertex(-10.0, -10.0, 1.0), vertex(40.0, -10.0, 1.0), vertex(-10.0, 40.0, 1.0)],
            flat_shade: 0.0,
        };
        Rasterizer::SolidFlat.draw(&tri, &m, &mut fb);
        assert_eq!(fb.pixels[0], 7);
        assert_eq!(fb.pixels[15 * 16 + 4], 7);
        assert_eq!(fb.pixels[15 * 16 + 15], 0);
    }

    #[test]
    fn test_depth_keeps_nearer() {
        let mut fb = Framebuffer::new(8, 8, true);
        fb.clear_depth();
        let near = solid_material(50);
        let far = solid_material(90);
        let [n0, n1] = quad(0.0, 0.0, 8.0, 8.0, 0.5);
        let [f0, f1] = quad(0.0, 0.0, 8.0, 8.0, 0.25);

        Rasterizer::SolidFlat.draw(&n0, &near, &mut fb);
        Rasterizer::SolidFlat.draw(&n1, &near, &mut fb);
        Rasterizer::SolidFlat.draw(&f0, &far, &mut fb);
        Rasterizer::SolidFlat.draw(&f1, &far, &mut fb);
        assert!(fb.pixels.iter().all(|&p| p == 50));

        // Redrawing at equal depth is rejected
        let again = solid_material(90);
        Rasterizer::SolidFlat.draw(&n0, &again, &mut fb);
        assert!(fb.pixels.iter().all(|&p| p == 50));
    }

    #[test]
    fn test_not_z_bufferable_ignores_depth() {
        let mut fb = Framebuffer::new(8, 8, true);
        fb.clear_depth();
        let near = solid_material(50);
        let mut far = solid_material(90);
        far.z_bufferable = false;
        let [n0, _] = quad(0.0, 0.0, 8.0, 8.0, 0.5);
        let [f0, _] = quad(0.0, 0.0, 8.0, 8.0, 0.25);
        Rasterizer::SolidFlat.draw(&n0, &near, &mut fb);
        Rasterizer::SolidFlat.draw(&f0, &far, &mut fb);
        assert_eq!(fb.pixels[7], 90);
    }

    #[test]
    fn test_solid_gouraud_full_intensity() {
        let mut m = Material::new("lit");
        m.shade = ShadeMode::GOURAUD;
        m.num_gradients = 8;
        m.specular = [0; 3];
        m.diffuse = [200; 3];
        m.map_to_palette(&gray_palette(), 0..=255);

        let mut fb = Framebuffer::new(8, 8, false);
        for mut tri in quad(0.0, 0.0, 8.0, 8.0, 1.0) {
            for p in &mut tri.vertices {
                p.shade = 1.0;
            }
            Rasterizer::SolidGouraud.draw(&tri, &m, &mut fb);
        }
        assert!(fb.pixels.iter().all(|&p| p == 200));
    }

    fn checker_material(perspective_correct: u32) -> Material {
        let tex = Texture::new("checker", 2, 2, vec![0, 1, 1, 0], vec![Rgb::new(10, 10, 10), Rgb::new(20, 20, 20)]).unwrap();
        let mut m = Material::new("checker");
        m.texture = Some(Rc::new(tex));
        m.perspective_correct = perspective_correct;
        m.map_to_palette(&gray_palette(), 0..=255);
        m
    }

    #[test]
    fn test_affine_texture_lookup() {
        let m = checker_material(0);
        assert_eq!(m.rasterizer(), Some(Rasterizer::TexFlat));
        let mut fb = Framebuffer::new(8, 8, false);
        for tri in quad(0.0, 0.0, 8.0, 8.0, 1.0) {
            Rasterizer::TexFlat.draw(&with_uv(tri), &m, &mut fb);
        }
        assert_eq!(fb.pixels[1 * 8 + 1], 10);
        assert_eq!(fb.pixels[1 * 8 + 5], 20);
        assert_eq!(fb.pixels[5 * 8 + 1], 20);
        assert_eq!(fb.pixels[6 * 8 + 6], 10);
    }

    #[test]
    fn test_perspective_matches_affine_at_constant_depth() {
        let affine = checker_material(0);
        let persp = checker_material(4);
        assert_eq!(persp.rasterizer(), Some(Rasterizer::PerspTexFlat));

        let mut fa = Framebuffer::new(8, 8, false);
        let mut fp = Framebuffer::new(8, 8, false);
        for tri in quad(0.0, 0.0, 8.0, 8.0, 1.0) {
            let tri = with_uv(tri);
            Rasterizer::TexFlat.draw(&tri, &affine, &mut fa);
            Rasterizer::PerspTexFlat.draw(&tri, &persp, &mut fp);
        }
        assert_eq!(fa.pixels, fp.pixels);
    }

    #[test]
    fn test_flat_shade_scaling_differs_between_affine_and_perspective() {
        let mut add = vec![0u32; 256];
        add[128] = 1;
        let mut affine = checker_material(0);
        affine.set_mapping(vec![10, 20, 30], Some(add.clone()));
        let mut persp = checker_material(4);
        persp.set_mapping(vec![10, 20, 30], Some(add));

        let mut fa = Framebuffer::new(8, 8, false);
        let mut fp = Framebuffer::new(8, 8, false);
        for mut tri in quad(0.0, 0.0, 8.0, 8.0, 1.0) {
            tri.flat_shade = 0.5;
            let tri = with_uv(tri);
            Rasterizer::TexFlat.draw(&tri, &affine, &mut fa);
            Rasterizer::PerspTexFlat.draw(&tri, &persp, &mut fp);
        }
        // 0.5 * 255 lands on entry 127, 0.5 * 256 on entry 128
        assert_eq!(fa.pixels[1 * 8 + 1], 10);
        assert_eq!(fa.pixels[1 * 8 + 5], 20);
        assert_eq!(fp.pixels[1 * 8 + 1], 20);
        assert_eq!(fp.pixels[1 * 8 + 5], 30);
    }

    #[test]
    fn test_transparent_blends_with_destination() {
        let mut m = Material::new("glass");
        m.transparency = 1;
        m.shade = ShadeMode::FLAT;
        m.num_gradients = 8;
        m.map_to_palette(&gray_palette(), 0..=255);
        assert_eq!(m.tsfact(), 4);

        let mut fb = Framebuffer::new(4, 4, false);
        fb.clear(200);
        let mut tri = quad(0.0, 0.0, 4.0, 4.0, 1.0)[0];
        tri.flat_shade = 0.5;
        Rasterizer::TransFlat.draw(&tri, &m, &mut fb);

        // offset 2 from the shade, 3 from the gray-200 background
        assert_eq!(fb.pixels[3], m.remap()[5]);
        assert_eq!(fb.pixels[3 * 4], 200);
    }

    #[test]
    fn test_unmapped_material_draws_nothing() {
        let mut m = Material::new("raw");
        m.init();
        let mut fb = Framebuffer::new(4, 4, false);
        for tri in quad(0.0, 0.0, 4.0, 4.0, 1.0) {
            Rasterizer::SolidFlat.draw(&tri, &m, &mut fb);
        }
        assert!(fb.pixels.iter().all(|&p| p == 0));
    }
}
