//! Frustum clipping and projection
//!
//! Faces arrive in camera space (x right, y up, z forward). They are clipped
//! against up to five planes `n . p >= d` (far plane plus the four sides of
//! the clip rectangle), fan-triangulated, projected to 12.20 screen
//! coordinates and handed to the material's rasterizer.

use crate::material::Material;
use super::camera::Camera;
use super::fixed::{ScreenFixed, SCREEN_ONE};
use super::math::Vec3;
use super::render::Framebuffer;
use super::scan::{ScreenTriangle, ScreenVertex};

/// Offset of the four side planes, keeping the eye point itself outside
const SIDE_PLANE_OFFSET: f32 = 1e-8;
const MIN_FOV: f32 = 1.0;
const MAX_FOV: f32 = 179.0;
const NUM_PLANES: usize = 5;

/// A camera-space vertex with the attributes carried through clipping.
/// Texture coordinates are in mapping units (65536 = one repeat).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ClipVertex {
    pub position: Vec3,
    pub shade: f32,
    pub u: f32,
    pub v: f32,
    pub eu: f32,
    pub ev: f32,
}

impl ClipVertex {
    fn lerp(&self, other: &ClipVertex, t: f32) -> ClipVertex {
        let mix = |a: f32, b: f32| a + (b - a) * t;
        ClipVertex {
            position: self.position + (other.position - self.position) * t,
            shade: mix(self.shade, other.shade),
            u: mix(self.u, other.u),
            v: mix(self.v, other.v),
            eu: mix(self.eu, other.eu),
            ev: mix(self.ev, other.ev),
        }
    }
}

/// Per-frame triangle counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TriStats {
    /// Faces submitted by meshes
    pub considered: u32,
    /// Faces that passed culling and the coarse visibility test
    pub visible: u32,
    /// Polygons left after clipping
    pub polygons: u32,
    /// Triangles drawn after fan triangulation
    pub triangles: u32,
}

#[derive(Debug, Clone, Copy, Default)]
struct ClipPlane {
    normal: Vec3,
    dist: f32,
}

/// Clip planes and projection constants for one camera
pub struct Clipper {
    planes: [ClipPlane; NUM_PLANES],
    /// Screen units per unit of x/z
    fov_scale: f32,
    inv_aspect: f32,
    center_x: ScreenFixed,
    center_y: ScreenFixed,
    clip_back: f32,
    /// Clip rectangle relative to the screen center
    dl: f32,
    dr: f32,
    dt: f32,
    db: f32,
    stats: TriStats,
    buffers: [Vec<ClipVertex>; 2],
    screen: Vec<ScreenVertex>,
}

/// Unnormalized plane normal through the eye and two edge points
fn find_normal(x2: f32, x3: f32, y2: f32, y3: f32, zv: f32) -> Vec3 {
    Vec3::new(zv * (y2 - y3), zv * (x3 - x2), x2 * y3 - y2 * x3)
}

/// Side plane through the eye; `fallback` when the clip edge sits on the
/// screen center, negated when the edge lies past the center
fn side_plane(on_center: bool, fallback: Vec3, flip: bool, normal: impl FnOnce() -> Vec3) -> ClipPlane {
    let normal = if on_center {
        fallback
    } else if flip {
        -normal()
    } else {
        normal()
    };
    ClipPlane { normal, dist: SIDE_PLANE_OFFSET }
}

impl Clipper {
    pub fn new(cam: &Camera) -> Self {
        let mut clipper = Self {
            planes: [ClipPlane::default(); NUM_PLANES],
            fov_scale: 0.0,
            inv_aspect: 1.0,
            center_x: ScreenFixed::ZERO,
            center_y: ScreenFixed::ZERO,
            clip_back: 0.0,
            dl: 0.0,
            dr: 0.0,
            dt: 0.0,
            db: 0.0,
            stats: TriStats::default(),
            buffers: [Vec::with_capacity(16), Vec::with_capacity(16)],
            screen: Vec::with_capacity(16),
        };
        clipper.set_frustum(cam);
        clipper
    }

    /// Rebuild the planes for `cam` and reset the statistics
    pub fn set_frustum(&mut self, cam: &Camera) {
        self.inv_aspect = if cam.aspect != 0.0 { 1.0 / cam.aspect } else { 1.0 };
        let fov = cam.fov.clamp(MIN_FOV, MAX_FOV);
        self.fov_scale = (1.0 / (fov.to_radians() * 0.5).tan()) * (cam.clip_right - cam.clip_left) as f32;
        self.center_x = ScreenFixed::from_int(cam.center_x);
        self.center_y = ScreenFixed::from_int(cam.center_y);
        self.clip_back = cam.clip_back;
        self.dl = (cam.clip_left - cam.center_x) as f32;
        self.dr = (cam.clip_right - cam.center_x) as f32;
        self.dt = (cam.clip_top - cam.center_y) as f32;
        self.db = (cam.clip_bottom - cam.center_y) as f32;
        self.stats = TriStats::default();

        let f = self.fov_scale;
        let fa = self.fov_scale * self.inv_aspect;

        self.planes[0] = ClipPlane {
            normal: Vec3::new(0.0, 0.0, -1.0),
            dist: -cam.clip_back,
        };

        let (dl, dr, dt, db) = (self.dl, self.dr, self.dt, self.db);
        self.planes[1] = side_plane(cam.clip_left == cam.center_x, Vec3::new(1.0, 0.0, 0.0), cam.clip_left > cam.center_x, || {
            find_normal(-100.0, -100.0, 100.0, -100.0, f * -100.0 / dl)
        });
        self.planes[2] = side_plane(cam.clip_right == cam.center_x, Vec3::new(-1.0, 0.0, 0.0), cam.clip_right < cam.center_x, || {
            find_normal(100.0, 100.0, -100.0, 100.0, f * 100.0 / dr)
        });
        self.planes[3] = side_plane(cam.clip_top == cam.center_y, Vec3::new(0.0, -1.0, 0.0), cam.clip_top > cam.center_y, || {
            find_normal(100.0, -100.0, 100.0, 100.0, fa * 100.0 / -dt)
        });
        self.planes[4] = side_plane(cam.clip_bottom == cam.center_y, Vec3::new(0.0, 1.0, 0.0), cam.clip_bottom < cam.center_y, || {
            find_normal(-100.0, 100.0, -100.0, -100.0, fa * -100.0 / -db)
        });
    }

    pub fn stats(&self) -> TriStats {
        self.stats
    }

    pub(crate) fn stats_mut(&mut self) -> &mut TriStats {
        &mut self.stats
    }

    /// Coarse visibility: true unless all three vertices lie outside one of
    /// the far plane, the eye plane or a side of the clip rectangle
    pub fn is_visible(&self, v: &[Vec3; 3]) -> bool {
        let f = self.fov_scale;
        let fa = self.fov_scale * self.inv_aspect;
        let any = |test: &dyn Fn(&Vec3) -> bool| v.iter().any(test);

        (self.clip_back <= 0.0 || any(&|p| p.z <= self.clip_back))
            && any(&|p| p.z >= 0.0)
            && any(&|p| p.x * f <= self.dr * p.z)
            && any(&|p| p.x * f >= self.dl * p.z)
            && any(&|p| -p.y * fa <= self.db * p.z)
            && any(&|p| -p.y * fa >= self.dt * p.z)
    }

    /// Clip a triangle against the frustum. Returns the index of the scratch
    /// buffer holding the result, which may have fewer than 3 vertices.
    fn clip(&mut self, input: &[ClipVertex; 3]) -> usize {
        let mut cur = 0;
        self.buffers[cur].clear();
        self.buffers[cur].extend_from_slice(input);

        let first = if self.clip_back > 0.0 { 0 } else { 1 };
        for plane in first..NUM_PLANES {
            let p = self.planes[plane];
            let [a, b] = &mut self.buffers;
            let (src, dst) = if cur == 0 { (&*a, b) } else { (&*b, a) };
            clip_to_plane(src, dst, p);
            cur ^= 1;
            if self.buffers[cur].len() < 3 {
                break;
            }
        }
        cur
    }

    /// Clip, triangulate, project and draw one face.
    ///
    /// `flat_shade` is clamped to 0..1. Faces whose material has no
    /// rasterizer are skipped.
    pub fn render_face(&mut self, input: &[ClipVertex; 3], flat_shade: f32, mat: &Material, fb: &mut Framebuffer) {
        let Some(rasterizer) = mat.rasterizer() else {
            return;
        };
        let idx = self.clip(input);
        if self.buffers[idx].len() < 3 {
            return;
        }
        self.stats.polygons += 1;

        let (tu, tv) = mat
            .texture
            .as_deref()
            .map(|t| (t.u_scale * mat.tex_scaling, t.v_scale * mat.tex_scaling))
            .unwrap_or((0.0, 0.0));
        let (eu, ev) = mat
            .environment
            .as_deref()
            .map(|t| (t.u_scale * mat.env_scaling, t.v_scale * mat.env_scaling))
            .unwrap_or((0.0, 0.0));

        self.screen.clear();
        for cv in &self.buffers[idx] {
            let iz = 1.0 / cv.position.z;
            let sx = self.fov_scale * iz * cv.position.x;
            let sy = self.fov_scale * iz * cv.position.y * self.inv_aspect;
            self.screen.push(ScreenVertex {
                x: self.center_x + ScreenFixed((sx * SCREEN_ONE as f32) as i32),
                y: self.center_y - ScreenFixed((sy * SCREEN_ONE as f32) as i32),
                z: iz,
                shade: cv.shade,
                u: (cv.u * tu) as i32,
                v: (cv.v * tv) as i32,
                eu: (cv.eu * eu) as i32,
                ev: (cv.ev * ev) as i32,
            });
        }

        let flat_shade = flat_shade.clamp(0.0, 1.0);
        for k in 2..self.screen.len() {
            let tri = ScreenTriangle {
                vertices: [self.screen[0], self.screen[k - 1], self.screen[k]],
                flat_shade,
            };
            rasterizer.draw(&tri, mat, fb);
            self.stats.triangles += 1;
        }
    }
}

/// Sutherland-Hodgman step: keep the part of `src` on the inside of `plane`
fn clip_to_plane(src: &[ClipVertex], dst: &mut Vec<ClipVertex>, plane: ClipPlane) {
    dst.clear();
    let n = src.len();
    for i in 0..n {
        let cur = &src[i];
        let next = &src[(i + 1) % n];
        let cur_dot = cur.position.dot(plane.normal);
        let next_dot = next.position.dot(plane.normal);
        let cur_in = cur_dot >= plane.dist;
        let next_in = next_dot >= plane.dist;
        if cur_in {
            dst.push(*cur);
        }
        if cur_in != next_in {
            let t = (plane.dist - cur_dot) / (next_dot - cur_dot);
            dst.push(cur.lerp(next, t));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rasterizer::types::Rgb;
    use crate::rasterizer::types::Palette;

    fn camera() -> Camera {
        let mut cam = Camera::new(64, 48, 1.0, 90.0, false);
        cam.clip_back = 50.0;
        cam
    }

    fn cv(x: f32, y: f32, z: f32) -> ClipVertex {
        ClipVertex {
            position: Vec3::new(x, y, z),
            ..Default::default()
        }
    }

    fn test_triangles() -> Vec<[ClipVertex; 3]> {
        vec![
            // Fully inside
            [cv(-0.2, -0.2, 5.0), cv(0.2, -0.2, 5.0), cv(0.0, 0.2, 5.0)],
            // Crosses the left and right sides
            [cv(-30.0, 0.0, 10.0), cv(30.0, 1.0, 10.0), cv(0.0, -1.0, 12.0)],
            // Crosses the eye plane and the top
            [cv(0.0, 0.0, -5.0), cv(1.0, 20.0, 8.0), cv(-1.0, 0.0, 8.0)],
            // Crosses the far plane and every side
            [cv(-200.0, -150.0, 80.0), cv(200.0, -150.0, 80.0), cv(0.0, 300.0, 20.0)],
            // Entirely behind the eye
            [cv(0.0, 0.0, -5.0), cv(1.0, 0.0, -5.0), cv(0.0, 1.0, -5.0)],
        ]
    }

    #[test]
    fn test_clip_output_inside_every_plane() {
        let mut clipper = Clipper::new(&camera());
        for tri in test_triangles() {
            let idx = clipper.clip(&tri);
            for p in &clipper.buffers[idx] {
                for plane in &clipper.planes {
                    let slack = 1e-4 * plane.normal.len() * (p.position.len() + 1.0);
                    assert!(
                        p.position.dot(plane.normal) >= plane.dist - slack,
                        "vertex {:?} outside plane {:?}",
                        p.position,
                        plane
                    );
                }
            }
        }
    }

    #[test]
    fn test_clip_output_is_convex() {
        let mut clipper = Clipper::new(&camera());
        for tri in test_triangles() {
            let n = (tri[1].position - tri[0].position).cross(tri[2].position - tri[0].position);
            let idx = clipper.clip(&tri);
            let poly = &clipper.buffers[idx];
            if poly.len() < 3 {
                continue;
            }
            for i in 0..poly.len() {
                let a = poly[i].position;
                let b = poly[(i + 1) % poly.len()].position;
                let c = poly[(i + 2) % poly.len()].position;
                let turn = (b - a).cross(c - b).dot(n);
                assert!(turn >= -1e-3 * n.len(), "reflex corner at {}", i);
            }
        }
    }

    #[test]
    fn test_fan_triangle_count() {
        let cam = camera();
        let mut clipper = Clipper::new(&cam);
        let mut pal = Palette::new();
        pal[1] = Rgb::new(200, 200, 200);
        let mut mat = Material::new("m");
        mat.ambient = [200; 3];
        mat.map_to_palette(&pal, 0..=255);
        let mut fb = Framebuffer::new(64, 48, false);

        for tri in test_triangles() {
            let idx = clipper.clip(&tri);
            let verts = clipper.buffers[idx].len();
            let before = clipper.stats();
            clipper.render_face(&tri, 1.0, &mat, &mut fb);
            let after = clipper.stats();
            if verts >= 3 {
                assert_eq!(after.polygons, before.polygons + 1);
                assert_eq!(after.triangles, before.triangles + verts as u32 - 2);
            } else {
                assert_eq!(after, before);
            }
        }
        assert!(fb.pixels.iter().any(|&p| p == 1));
    }

    #[test]
    fn test_coarse_visibility() {
        let clipper = Clipper::new(&camera());
        let inside = [Vec3::new(0.0, 0.0, 5.0), Vec3::new(1.0, 0.0, 5.0), Vec3::new(0.0, 1.0, 5.0)];
        assert!(clipper.is_visible(&inside));

        let behind = [Vec3::new(0.0, 0.0, -5.0), Vec3::new(1.0, 0.0, -5.0), Vec3::new(0.0, 1.0, -5.0)];
        assert!(!clipper.is_visible(&behind));

        let too_far = [Vec3::new(0.0, 0.0, 60.0), Vec3::new(1.0, 0.0, 60.0), Vec3::new(0.0, 1.0, 60.0)];
        assert!(!clipper.is_visible(&too_far));

        // Far off to the right: x * fov > dr * z for every vertex
        let right = [Vec3::new(50.0, 0.0, 5.0), Vec3::new(51.0, 0.0, 5.0), Vec3::new(50.0, 1.0, 5.0)];
        assert!(!clipper.is_visible(&right));

        // Far above the top edge
        let above = [Vec3::new(0.0, 50.0, 5.0), Vec3::new(1.0, 50.0, 5.0), Vec3::new(0.0, 51.0, 5.0)];
        assert!(!clipper.is_visible(&above));
    }

    #[test]
    fn test_far_clip_disabled() {
        let mut cam = camera();
        cam.clip_back = 0.0;
        let clipper = Clipper::new(&cam);
        let far = [Vec3::new(0.0, 0.0, 1e6), Vec3::new(1.0, 0.0, 1e6), Vec3::new(0.0, 1.0, 1e6)];
        assert!(clipper.is_visible(&far));
    }

    #[test]
    fn test_projection_center_and_scale() {
        let cam = Camera::new(64, 64, 1.0, 90.0, false);
        let mut clipper = Clipper::new(&cam);
        // fov 90 over a 64 pixel wide clip rect: 64 pixels per unit of x/z
        assert!((clipper.fov_scale - 64.0).abs() < 1e-3);

        let tri = [cv(0.0, 0.0, 4.0), cv(1.0, 0.0, 4.0), cv(0.0, 1.0, 4.0)];
        let idx = clipper.clip(&tri);
        assert_eq!(clipper.buffers[idx].len(), 3);
        let p = clipper.buffers[idx][1];
        let sx = clipper.center_x.to_f32() + clipper.fov_scale * p.position.x / p.position.z;
        assert!((sx - 48.0).abs() < 1e-3);
    }
}
