//! Frame rendering
//!
//! A [`RenderSession`] collects lit, camera-space faces between `begin` and
//! `end`, then sorts them and hands each one to the clipper, which draws
//! into a caller-owned [`Framebuffer`].
//!
//! ```text
//! begin(camera) -> add_light* -> add_object* -> end(scene, framebuffer)
//! ```

use log::{debug, trace, warn};
use serde::{Deserialize, Serialize};

use super::camera::{Camera, SortOrder};
use super::clip::{ClipVertex, Clipper, TriStats};
use super::math::{mat4_from_euler, mat4_identity, mat4_mul, mat4_transform_point, mat4_transform_vector, mat4_translation, Mat4, Vec3};
use super::types::{Light, LightMode, Palette};
use crate::config::RenderConfig;
use crate::material::ShadeMode;
use crate::scene::{MaterialId, Mesh, MeshId, Placement, Scene};

/// Faces whose camera-space normal points this far away from the eye are culled
const BACKFACE_EPSILON: f32 = 1e-7;

/// 8-bit indexed framebuffer with an optional reciprocal-depth buffer
pub struct Framebuffer {
    /// Palette indices, one byte per pixel
    pub pixels: Vec<u8>,
    /// 1/z per pixel; larger is nearer, 0.0 is infinitely far
    pub zbuffer: Option<Vec<f32>>,
    pub width: usize,
    pub height: usize,
}

impl Framebuffer {
    pub fn new(width: usize, height: usize, depth: bool) -> Self {
        Self {
            pixels: vec![0; width * height],
            zbuffer: depth.then(|| vec![0.0; width * height]),
            width,
            height,
        }
    }

    pub fn from_config(config: &RenderConfig) -> Self {
        Self::new(config.screen_width as usize, config.screen_height as usize, config.depth_buffer)
    }

    pub fn has_depth(&self) -> bool {
        self.zbuffer.is_some()
    }

    /// Add or drop the depth buffer
    pub fn set_depth(&mut self, depth: bool) {
        if depth != self.has_depth() {
            self.zbuffer = depth.then(|| vec![0.0; self.width * self.height]);
        }
    }

    pub fn resize(&mut self, width: usize, height: usize) {
        if self.width != width || self.height != height {
            self.width = width;
            self.height = height;
            self.pixels = vec![0; width * height];
            if self.zbuffer.is_some() {
                self.zbuffer = Some(vec![0.0; width * height]);
            }
        }
    }

    /// Fill every pixel with one palette index
    pub fn clear(&mut self, index: u8) {
        self.pixels.fill(index);
    }

    /// Reset the depth buffer to "infinitely far"
    pub fn clear_depth(&mut self) {
        if let Some(zb) = self.zbuffer.as_mut() {
            zb.fill(0.0);
        }
    }

    /// Expand the indexed pixels through `palette` into `out` as RGBA
    pub fn expand_into(&self, palette: &Palette, out: &mut Vec<u8>) {
        palette.expand_rgba(&self.pixels, out);
    }

    pub fn to_rgba(&self, palette: &Palette) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.pixels.len() * 4);
        self.expand_into(palette, &mut out);
        out
    }
}

/// Per-session caps on collected faces and lights
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderLimits {
    pub max_faces: usize,
    pub max_lights: usize,
}

impl Default for RenderLimits {
    fn default() -> Self {
        Self {
            max_faces: 16384,
            max_lights: 32,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Collecting,
    Finalizing,
}

/// A face waiting for `end`: camera-space vertices with their shading
#[derive(Debug, Clone, Copy)]
struct PendingFace {
    material: MaterialId,
    vertices: [ClipVertex; 3],
    flat_shade: f32,
    /// Sum of the three camera-space depths
    key: f32,
}

/// Collects faces for one frame at a time and draws them on `end`
pub struct RenderSession {
    limits: RenderLimits,
    state: SessionState,
    sort: SortOrder,
    clipper: Option<Clipper>,
    /// World-to-camera rotation
    view: Mat4,
    /// World-to-camera rotation and translation
    world_to_camera: Mat4,
    camera_position: Vec3,
    /// Lights with positions and directions in camera space
    lights: Vec<Light>,
    faces: Vec<PendingFace>,
    positions: Vec<Vec3>,
    normals: Vec<Vec3>,
}

impl Default for RenderSession {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderSession {
    pub fn new() -> Self {
        Self::with_limits(RenderLimits::default())
    }

    pub fn with_limits(limits: RenderLimits) -> Self {
        Self {
            limits,
            state: SessionState::Idle,
            sort: SortOrder::default(),
            clipper: None,
            view: mat4_identity(),
            world_to_camera: mat4_identity(),
            camera_position: Vec3::ZERO,
            lights: Vec::new(),
            faces: Vec::new(),
            positions: Vec::new(),
            normals: Vec::new(),
        }
    }

    pub fn limits(&self) -> RenderLimits {
        self.limits
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Counters of the current (or last finished) frame
    pub fn stats(&self) -> TriStats {
        self.clipper.as_ref().map(Clipper::stats).unwrap_or_default()
    }

    /// Faces collected so far
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    pub fn light_count(&self) -> usize {
        self.lights.len()
    }

    /// Start a frame for `camera`
    pub fn begin(&mut self, camera: &Camera) {
        if self.state != SessionState::Idle {
            warn!("begin called while {:?}, ignored", self.state);
            return;
        }
        self.faces.clear();
        self.lights.clear();
        self.sort = camera.sort;
        self.camera_position = camera.position;
        self.view = camera.view_rotation();
        self.world_to_camera = mat4_mul(&self.view, &mat4_translation(-camera.position));
        match self.clipper.as_mut() {
            Some(clipper) => clipper.set_frustum(camera),
            None => self.clipper = Some(Clipper::new(camera)),
        }
        self.state = SessionState::Collecting;
        debug!("begin frame: {}x{}, fov {}, sort {:?}", camera.screen_width, camera.screen_height, camera.fov, self.sort);
    }

    pub fn add_light(&mut self, light: &Light) {
        if self.state != SessionState::Collecting {
            warn!("add_light called while {:?}, ignored", self.state);
            return;
        }
        if light.mode == LightMode::None {
            return;
        }
        if self.lights.len() >= self.limits.max_lights {
            trace!("light cap of {} reached, light dropped", self.limits.max_lights);
            return;
        }
        let position = if light.mode.is_point() {
            mat4_transform_vector(&self.view, light.position - self.camera_position)
        } else {
            mat4_transform_vector(&self.view, light.position)
        };
        self.lights.push(Light { position, ..*light });
    }

    /// Transform, cull and light a mesh and its descendants
    pub fn add_object(&mut self, scene: &Scene, id: MeshId) {
        if self.state != SessionState::Collecting {
            warn!("add_object called while {:?}, ignored", self.state);
            return;
        }
        if scene.mesh(id).is_none() {
            warn!("add_object: unknown mesh");
            return;
        }
        self.add_node(scene, id, &mat4_identity(), &mat4_identity());
    }

    fn add_node(&mut self, scene: &Scene, id: MeshId, parent_transform: &Mat4, parent_rotation: &Mat4) {
        let Some(mesh) = scene.mesh(id) else {
            return;
        };
        let (transform, rotation) = match mesh.placement {
            Placement::Euler { position, rotation } => {
                let rot = mat4_from_euler(rotation);
                (mat4_mul(&mat4_translation(position), &rot), rot)
            }
            Placement::Matrix { transform, rotation } => (transform, rotation),
        };
        let transform = mat4_mul(parent_transform, &transform);
        let rotation = mat4_mul(parent_rotation, &rotation);

        for &child in mesh.children() {
            self.add_node(scene, child, &transform, &rotation);
        }
        if mesh.faces().is_empty() || mesh.vertices().is_empty() {
            return;
        }
        if self.faces.len() + mesh.faces().len() >= self.limits.max_faces {
            trace!("face cap of {} reached, '{}' dropped", self.limits.max_faces, mesh.name);
            return;
        }

        let object_to_camera = mat4_mul(&self.world_to_camera, &transform);
        let normal_to_camera = mat4_mul(&self.view, &rotation);
        self.positions.clear();
        self.normals.clear();
        for v in mesh.vertices() {
            self.positions.push(mat4_transform_point(&object_to_camera, v.position));
            self.normals.push(mat4_transform_vector(&normal_to_camera, v.normal));
        }

        self.collect_faces(scene, mesh, &normal_to_camera);
    }

    fn collect_faces(&mut self, scene: &Scene, mesh: &Mesh, normal_to_camera: &Mat4) {
        let Some(clipper) = self.clipper.as_mut() else {
            return;
        };
        clipper.stats_mut().considered += mesh.faces().len() as u32;

        for face in mesh.faces() {
            let Some((material_id, mat)) = face.material.and_then(|id| scene.material(id).map(|m| (id, m))) else {
                continue;
            };
            let [a, b, c] = face.vertices();
            let p = [self.positions[a], self.positions[b], self.positions[c]];
            let n = [self.normals[a], self.normals[b], self.normals[c]];

            let face_normal = mat4_transform_vector(normal_to_camera, face.normal);
            if mesh.backface_cull && face_normal.dot(p[0]) >= BACKFACE_EPSILON {
                continue;
            }
            if !clipper.is_visible(&p) {
                continue;
            }

            let shade = mat.effective_shade();
            let mut flat_shade = 0.0;
            if shade.computes_flat() {
                flat_shade = face.static_shade;
                if shade.contains(ShadeMode::FLAT) {
                    flat_shade += illuminate(&self.lights, face_normal, p[0], mesh.backface_illumination);
                }
                if shade.contains(ShadeMode::FLAT_DISTANCE) {
                    flat_shade += 1.0 - (p[0].z + p[1].z + p[2].z) / (mat.fade_dist * 3.0);
                }
            }

            let environment = mat.fill().uses_environment();
            let mut vertices = [ClipVertex::default(); 3];
            for k in 0..3 {
                let cv = &mut vertices[k];
                cv.position = p[k];
                cv.u = face.mapping_u[k] as f32;
                cv.v = face.mapping_v[k] as f32;
                if environment {
                    cv.eu = 32768.0 + n[k].x * 32768.0;
                    cv.ev = 32768.0 - n[k].y * 32768.0;
                }
                if shade.computes_gouraud() {
                    let mut s = face.static_vertex_shades[k];
                    if shade.contains(ShadeMode::GOURAUD) {
                        s += illuminate(&self.lights, n[k], p[k], mesh.backface_illumination);
                    }
                    if shade.contains(ShadeMode::GOURAUD_DISTANCE) {
                        s += 1.0 - p[k].z / mat.fade_dist;
                    }
                    cv.shade = s;
                }
            }

            self.faces.push(PendingFace {
                material: material_id,
                vertices,
                flat_shade,
                key: p[0].z + p[1].z + p[2].z,
            });
            clipper.stats_mut().visible += 1;
        }
    }

    /// Sort the collected faces, draw them into `fb` and return to idle
    pub fn end(&mut self, scene: &Scene, fb: &mut Framebuffer) {
        if self.state != SessionState::Collecting {
            warn!("end called while {:?}, ignored", self.state);
            return;
        }
        self.state = SessionState::Finalizing;

        let mut faces = std::mem::take(&mut self.faces);
        match self.sort {
            SortOrder::BackToFront => faces.sort_by(|a, b| b.key.total_cmp(&a.key)),
            SortOrder::FrontToBack => faces.sort_by(|a, b| a.key.total_cmp(&b.key)),
            SortOrder::None => {}
        }

        if let Some(clipper) = self.clipper.as_mut() {
            for face in &faces {
                let Some(mat) = scene.material(face.material) else {
                    continue;
                };
                clipper.render_face(&face.vertices, face.flat_shade, mat, fb);
            }
        }

        let stats = self.stats();
        debug!(
            "end frame: {} considered, {} visible, {} polygons, {} triangles, {} lights",
            stats.considered,
            stats.visible,
            stats.polygons,
            stats.triangles,
            self.lights.len()
        );

        faces.clear();
        self.faces = faces;
        self.lights.clear();
        self.state = SessionState::Idle;
    }
}

/// Summed light reaching `point` with surface normal `normal`, all in
/// camera space. Light from behind the surface counts only with
/// `backface_illumination`, and then brightens it as well.
fn illuminate(lights: &[Light], normal: Vec3, point: Vec3, backface_illumination: bool) -> f32 {
    let mut total = 0.0;
    for light in lights {
        let contribution = match light.mode {
            LightMode::None => 0.0,
            LightMode::Vector => normal.dot(light.position) * light.intensity,
            mode => {
                let to_light = light.position - point;
                let angle = if mode.uses_angle() {
                    normal.dot(to_light.normalize()) * light.intensity
                } else {
                    0.0
                };
                if mode.uses_distance() {
                    let falloff = (1.0 - 0.5 * to_light.len_sq() / light.half_dist_squared).clamp(0.0, 1.0);
                    if mode.uses_angle() {
                        angle * falloff
                    } else {
                        falloff * light.intensity
                    }
                } else {
                    angle
                }
            }
        };
        if contribution > 0.0 {
            total += contribution;
        } else if backface_illumination {
            total -= contribution;
        }
    }
    total
}
