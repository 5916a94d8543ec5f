//! pal8: a palette-based software 3D renderer
//!
//! Everything is drawn into an 8-bit indexed framebuffer. Materials build
//! color ramps from their lighting parameters and textures; those ramps are
//! merged into one shared 256-entry palette and every material keeps a
//! remap table into it.
//!
//! ```ignore
//! let mut session = RenderSession::new();
//! session.begin(&camera);
//! session.add_light(&light);
//! session.add_object(&scene, mesh);
//! session.end(&scene, &mut framebuffer);
//! ```

pub mod config;
pub mod error;
pub mod material;
pub mod rasterizer;
pub mod scene;
pub mod spline;
pub mod texture;

pub use config::RenderConfig;
pub use error::{ConfigError, SceneError, TextureError};
pub use material::{build_shared_palette, FillMode, Material, ShadeMode, TexEnvMode};
pub use rasterizer::{Camera, Framebuffer, Light, LightMode, Palette, RenderSession, Rgb, SortOrder, Texture, Vec3};
pub use scene::{Face, MaterialId, Mesh, MeshId, Placement, Scene, Vertex};
pub use spline::Spline;
