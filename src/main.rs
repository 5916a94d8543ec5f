//! pal8 viewer: spins a lit, textured cube with a child moving along a
//! spline orbit through the 8-bit renderer and shows the result scaled up.
//!
//! Keys: G flat/gouraud, Z depth buffer, R rotation, Esc quit.
//! Reads `pal8.ron` from the working directory when present.

use std::rc::Rc;

use log::{info, warn};
use macroquad::prelude::*;

use pal8::config::RenderConfig;
use pal8::error::SceneError;
use pal8::material::{build_shared_palette, Material, ShadeMode};
use pal8::rasterizer::{Camera, Framebuffer, Light, Palette, RenderSession, Rgb, SortOrder, Texture, Vec3};
use pal8::scene::{Face, MeshId, Mesh, Placement, Scene, Vertex};
use pal8::spline::Spline;

/// Version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

const CONFIG_FILE: &str = "pal8.ron";

fn window_conf() -> Conf {
    Conf {
        window_title: format!("pal8 viewer v{}", VERSION),
        window_width: 960,
        window_height: 600,
        window_resizable: true,
        ..Default::default()
    }
}

/// Cube with outward normals and one texture repeat per side
fn cube(name: &str, half: f32) -> Result<Mesh, SceneError> {
    let sides = [
        (Vec3::new(0.0, 0.0, 1.0), Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 1.0, 0.0)),
        (Vec3::new(0.0, 0.0, -1.0), Vec3::new(0.0, 1.0, 0.0), Vec3::new(1.0, 0.0, 0.0)),
        (Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 1.0, 0.0), Vec3::new(0.0, 0.0, 1.0)),
        (Vec3::new(-1.0, 0.0, 0.0), Vec3::new(0.0, 0.0, 1.0), Vec3::new(0.0, 1.0, 0.0)),
        (Vec3::new(0.0, 1.0, 0.0), Vec3::new(0.0, 0.0, 1.0), Vec3::new(1.0, 0.0, 0.0)),
        (Vec3::new(0.0, -1.0, 0.0), Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 0.0, 1.0)),
    ];
    let corners = [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)];
    let mapping = [(0, 0), (65535, 0), (65535, 65535), (0, 65535)];

    let mut verts = Vec::with_capacity(24);
    let mut faces = Vec::with_capacity(12);
    for (n, u, v) in sides {
        let base = verts.len();
        for (su, sv) in corners {
            verts.push(Vertex::new(n * half + u * (su * half) + v * (sv * half)));
        }
        for tri in [[0, 1, 2], [0, 2, 3]] {
            let mut face = Face::new([base + tri[0], base + tri[1], base + tri[2]]);
            for k in 0..3 {
                face.mapping_u[k] = mapping[tri[k]].0;
                face.mapping_v[k] = mapping[tri[k]].1;
            }
            faces.push(face);
        }
    }
    Mesh::new(name, verts, faces)
}

/// Two-tone 16x16 checkerboard
fn checker_texture() -> Result<Texture, SceneError> {
    let mut data = Vec::with_capacity(256);
    for y in 0..16 {
        for x in 0..16 {
            data.push((((x >> 2) + (y >> 2)) & 1) as u8);
        }
    }
    Texture::new("checker", 16, 16, data, vec![Rgb::new(200, 90, 40), Rgb::new(240, 220, 160)])
}

struct Viewer {
    config: RenderConfig,
    scene: Scene,
    root: MeshId,
    child: MeshId,
    orbit: Spline,
    palette: Palette,
    gouraud: bool,
    rotating: bool,
    angle: f32,
}

impl Viewer {
    fn new(config: RenderConfig) -> Result<Self, SceneError> {
        let mut scene = Scene::new();

        let mut boxed = Material::new("checker");
        boxed.texture = Some(Rc::new(checker_texture()?));
        boxed.ambient = [16; 3];
        let boxed = scene.add_material(boxed);

        let mut plain = Material::new("plain");
        plain.ambient = [10, 20, 60];
        plain.diffuse = [60, 120, 240];
        let plain = scene.add_material(plain);

        let root = scene.add_mesh(cube("body", 1.0)?);
        let child = scene.add_mesh(cube("moon", 0.3)?);
        scene.attach(root, child)?;
        scene.recompute_normals(root)?;
        scene.set_mesh_material(root, Some(boxed), false)?;
        scene.set_mesh_material(child, Some(plain), false)?;

        let orbit = Spline::from_points(&[
            Vec3::new(1.8, 0.0, 0.0),
            Vec3::new(0.0, 0.6, 1.4),
            Vec3::new(-1.8, 0.0, 0.0),
            Vec3::new(0.0, -0.6, -1.4),
        ])?
        .with_params(0.0, 0.0, 0.2);

        let mut viewer = Self {
            config,
            scene,
            root,
            child,
            orbit,
            palette: Palette::new(),
            gouraud: false,
            rotating: true,
            angle: 0.0,
        };
        viewer.rebuild_palette();
        Ok(viewer)
    }

    /// Re-initialize every material and map them onto one shared palette
    fn rebuild_palette(&mut self) {
        let shade = if self.gouraud { ShadeMode::GOURAUD } else { ShadeMode::FLAT };
        for mat in self.scene.materials_mut() {
            mat.shade = shade;
            mat.init();
        }
        let range = self.config.palette_range();
        self.palette = Palette::new();
        let used = build_shared_palette(self.scene.materials_mut(), &mut self.palette, range.clone());
        for mat in self.scene.materials_mut() {
            mat.map_to_palette(&self.palette, range.clone());
        }
        info!("palette rebuilt: {} entries, shade {:?}", used, shade);
    }

    fn animate(&mut self, dt: f32) {
        if self.rotating {
            self.angle = (self.angle + dt * 40.0) % 360.0;
        }
        let a = self.angle;
        if let Some(mesh) = self.scene.mesh_mut(self.root) {
            mesh.placement = Placement::Euler {
                position: Vec3::new(0.0, 0.0, 4.0),
                rotation: Vec3::new(a * 0.7, a, 0.0),
            };
        }
        let orbit = self.orbit.point(a / 90.0);
        if let Some(mesh) = self.scene.mesh_mut(self.child) {
            mesh.placement = Placement::Euler {
                position: orbit,
                rotation: Vec3::new(0.0, 0.0, a * 2.0),
            };
        }
    }

    fn render(&self, session: &mut RenderSession, fb: &mut Framebuffer) {
        let mut cam = Camera::from_config(&self.config);
        if self.config.sort.is_none() {
            cam.sort = if fb.has_depth() { SortOrder::None } else { SortOrder::BackToFront };
        }
        cam.position = Vec3::new(0.0, 1.0, 0.0);
        cam.set_target(Vec3::new(0.0, 0.0, 4.0));

        fb.clear(0);
        fb.clear_depth();
        session.begin(&cam);
        session.add_light(&Light::vector(Vec3::new(-30.0, 20.0, 0.0), 0.9));
        session.add_light(&Light::point(Vec3::new(-3.0, 2.0, 1.0), 0.6, 6.0));
        session.add_object(&self.scene, self.root);
        session.end(&self.scene, fb);
    }
}

#[macroquad::main(window_conf)]
async fn main() {
    env_logger::init();

    let config = match RenderConfig::load(CONFIG_FILE) {
        Ok(config) => config,
        Err(e) => {
            info!("using default config ({})", e);
            RenderConfig::default()
        }
    };

    let mut viewer = match Viewer::new(config.clone()) {
        Ok(viewer) => viewer,
        Err(e) => {
            warn!("failed to build scene: {}", e);
            return;
        }
    };
    let mut fb = Framebuffer::from_config(&config);
    let mut session = RenderSession::with_limits(config.limits);
    let mut rgba = Vec::new();

    loop {
        if is_key_pressed(KeyCode::Escape) {
            break;
        }
        if is_key_pressed(KeyCode::G) {
            viewer.gouraud = !viewer.gouraud;
            viewer.rebuild_palette();
        }
        if is_key_pressed(KeyCode::Z) {
            fb.set_depth(!fb.has_depth());
            info!("depth buffer {}", if fb.has_depth() { "on" } else { "off" });
        }
        if is_key_pressed(KeyCode::R) {
            viewer.rotating = !viewer.rotating;
        }

        viewer.animate(get_frame_time());
        viewer.render(&mut session, &mut fb);
        fb.expand_into(&viewer.palette, &mut rgba);

        clear_background(Color::from_rgba(10, 10, 12, 255));
        let texture = Texture2D::from_rgba8(fb.width as u16, fb.height as u16, &rgba);
        texture.set_filter(FilterMode::Nearest);

        let (sw, sh) = (screen_width(), screen_height());
        let fb_aspect = fb.width as f32 / fb.height as f32;
        let (draw_w, draw_h) = if fb_aspect > sw / sh {
            (sw, sw / fb_aspect)
        } else {
            (sh * fb_aspect, sh)
        };
        draw_texture_ex(
            &texture,
            (sw - draw_w) * 0.5,
            (sh - draw_h) * 0.5,
            WHITE,
            DrawTextureParams {
                dest_size: Some(vec2(draw_w, draw_h)),
                ..Default::default()
            },
        );

        let stats = session.stats();
        let hud = format!(
            "{} | depth {} | {}/{} faces, {} tris | G shade  Z depth  R rotate",
            if viewer.gouraud { "gouraud" } else { "flat" },
            if fb.has_depth() { "on" } else { "off" },
            stats.visible,
            stats.considered,
            stats.triangles,
        );
        draw_text(&hud, 8.0, 20.0, 20.0, Color::from_rgba(220, 220, 220, 255));

        next_frame().await;
    }
}
