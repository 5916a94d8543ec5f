//! Scene entities
//!
//! Meshes and materials live in slot maps owned by [`Scene`]; faces and
//! parents refer to them by key. A mesh may carry up to [`MAX_CHILDREN`]
//! child meshes which are transformed relative to it, so the meshes form
//! a forest. Removing or cloning a mesh acts on its whole subtree.

mod ops;

use slotmap::{new_key_type, SlotMap};

use crate::error::{try_filled_vec, SceneError};
use crate::material::Material;
use crate::rasterizer::math::{Mat4, Vec3};

new_key_type! {
    /// Handle to a mesh in a [`Scene`]
    pub struct MeshId;
    /// Handle to a material in a [`Scene`]
    pub struct MaterialId;
}

/// Maximum number of direct children per mesh
pub const MAX_CHILDREN: usize = 16;

/// Object-space vertex
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vertex {
    pub position: Vec3,
    /// Unit normal, used for gouraud and environment shading
    pub normal: Vec3,
}

impl Vertex {
    pub fn new(position: Vec3) -> Self {
        Self {
            position,
            normal: Vec3::ZERO,
        }
    }
}

/// Triangle referencing three vertices of its mesh
#[derive(Debug, Clone, PartialEq)]
pub struct Face {
    vertices: [usize; 3],
    pub material: Option<MaterialId>,
    /// Unit face normal, used for culling and flat shading
    pub normal: Vec3,
    /// Texture coordinates per vertex, 16.16 with 65536 = one texture repeat
    pub mapping_u: [i32; 3],
    pub mapping_v: [i32; 3],
    /// Added to the computed flat intensity
    pub static_shade: f32,
    /// Added to the computed per-vertex intensities
    pub static_vertex_shades: [f32; 3],
}

impl Face {
    pub fn new(vertices: [usize; 3]) -> Self {
        Self {
            vertices,
            material: None,
            normal: Vec3::ZERO,
            mapping_u: [0; 3],
            mapping_v: [0; 3],
            static_shade: 0.0,
            static_vertex_shades: [0.0; 3],
        }
    }

    pub fn with_material(mut self, material: MaterialId) -> Self {
        self.material = Some(material);
        self
    }

    pub fn vertices(&self) -> [usize; 3] {
        self.vertices
    }
}

/// How a mesh is placed relative to its parent (or the world)
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Placement {
    /// Rotate by Euler angles in degrees (X, then Y, then Z), then translate
    Euler { position: Vec3, rotation: Vec3 },
    /// Externally supplied transform and its rotation-only part
    Matrix { transform: Mat4, rotation: Mat4 },
}

impl Default for Placement {
    fn default() -> Self {
        Placement::Euler {
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
        }
    }
}

/// Triangle mesh
#[derive(Debug, Clone)]
pub struct Mesh {
    pub name: String,
    vertices: Vec<Vertex>,
    faces: Vec<Face>,
    children: Vec<MeshId>,
    parent: Option<MeshId>,
    pub placement: Placement,
    /// Skip faces pointing away from the camera
    pub backface_cull: bool,
    /// Let lights behind a face brighten it instead of being ignored
    pub backface_illumination: bool,
}

fn check_faces(faces: &[Face], vertex_count: usize) -> Result<(), SceneError> {
    for (face, f) in faces.iter().enumerate() {
        if let Some(&index) = f.vertices.iter().find(|&&i| i >= vertex_count) {
            return Err(SceneError::VertexIndex { face, index, vertex_count });
        }
    }
    Ok(())
}

impl Mesh {
    /// Build a mesh, checking every face index against the vertex list
    pub fn new(name: &str, vertices: Vec<Vertex>, faces: Vec<Face>) -> Result<Self, SceneError> {
        check_faces(&faces, vertices.len())?;
        Ok(Self {
            name: name.to_string(),
            vertices,
            faces,
            children: Vec::new(),
            parent: None,
            placement: Placement::default(),
            backface_cull: true,
            backface_illumination: false,
        })
    }

    /// Mesh with zeroed vertices and faces all pointing at vertex 0
    pub fn with_capacity(name: &str, num_vertices: usize, num_faces: usize) -> Result<Self, SceneError> {
        let vertices = try_filled_vec("vertices", num_vertices, Vertex::default())?;
        let faces = try_filled_vec("faces", num_faces, Face::new([0; 3]))?;
        Self::new(name, vertices, faces)
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn vertices_mut(&mut self) -> &mut [Vertex] {
        &mut self.vertices
    }

    pub fn faces(&self) -> &[Face] {
        &self.faces
    }

    /// Mutable faces; vertex indices stay fixed, use [`Mesh::set_face_vertices`]
    pub fn faces_mut(&mut self) -> &mut [Face] {
        &mut self.faces
    }

    pub fn set_face_vertices(&mut self, face: usize, vertices: [usize; 3]) -> Result<(), SceneError> {
        let vertex_count = self.vertices.len();
        if let Some(&index) = vertices.iter().find(|&&i| i >= vertex_count) {
            return Err(SceneError::VertexIndex { face, index, vertex_count });
        }
        if let Some(f) = self.faces.get_mut(face) {
            f.vertices = vertices;
        }
        Ok(())
    }

    pub fn children(&self) -> &[MeshId] {
        &self.children
    }

    pub fn parent(&self) -> Option<MeshId> {
        self.parent
    }
}

/// Owner of every mesh and material
#[derive(Debug, Default)]
pub struct Scene {
    meshes: SlotMap<MeshId, Mesh>,
    materials: SlotMap<MaterialId, Material>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_material(&mut self, material: Material) -> MaterialId {
        self.materials.insert(material)
    }

    pub fn material(&self, id: MaterialId) -> Option<&Material> {
        self.materials.get(id)
    }

    pub fn material_mut(&mut self, id: MaterialId) -> Option<&mut Material> {
        self.materials.get_mut(id)
    }

    pub fn materials_mut(&mut self) -> impl Iterator<Item = &mut Material> {
        self.materials.values_mut()
    }

    /// Faces still referring to the material are skipped when drawn
    pub fn remove_material(&mut self, id: MaterialId) -> Option<Material> {
        self.materials.remove(id)
    }

    /// Insert a mesh as a new root. Any child or parent links it carries
    /// from another scene are dropped.
    pub fn add_mesh(&mut self, mut mesh: Mesh) -> MeshId {
        mesh.children.clear();
        mesh.parent = None;
        self.meshes.insert(mesh)
    }

    pub fn mesh(&self, id: MeshId) -> Option<&Mesh> {
        self.meshes.get(id)
    }

    pub fn mesh_mut(&mut self, id: MeshId) -> Option<&mut Mesh> {
        self.meshes.get_mut(id)
    }

    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    /// Ids of meshes without a parent
    pub fn roots(&self) -> impl Iterator<Item = MeshId> + '_ {
        self.meshes.iter().filter(|(_, m)| m.parent.is_none()).map(|(id, _)| id)
    }

    /// Make `child` a child of `parent`, moving it from any previous parent
    pub fn attach(&mut self, parent: MeshId, child: MeshId) -> Result<(), SceneError> {
        let parent_mesh = self.meshes.get(parent).ok_or(SceneError::UnknownMesh)?;
        if !self.meshes.contains_key(child) {
            return Err(SceneError::UnknownMesh);
        }
        if parent_mesh.children.contains(&child) {
            return Ok(());
        }
        if parent_mesh.children.len() >= MAX_CHILDREN {
            return Err(SceneError::TooManyChildren(MAX_CHILDREN));
        }
        if self.is_in_subtree(child, parent) {
            return Err(SceneError::Cycle);
        }

        self.detach(child)?;
        if let Some(p) = self.meshes.get_mut(parent) {
            p.children.push(child);
        }
        if let Some(c) = self.meshes.get_mut(child) {
            c.parent = Some(parent);
        }
        Ok(())
    }

    /// Turn `child` back into a root
    pub fn detach(&mut self, child: MeshId) -> Result<(), SceneError> {
        let old = self.meshes.get_mut(child).ok_or(SceneError::UnknownMesh)?.parent.take();
        if let Some(p) = old.and_then(|p| self.meshes.get_mut(p)) {
            p.children.retain(|&c| c != child);
        }
        Ok(())
    }

    /// Whether `node` is `root` or one of its descendants
    fn is_in_subtree(&self, root: MeshId, node: MeshId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == root {
                return true;
            }
            current = self.meshes.get(id).and_then(|m| m.parent);
        }
        false
    }

    /// All ids in the subtree rooted at `id`, parents before children
    pub(crate) fn subtree(&self, id: MeshId) -> Vec<MeshId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            if let Some(mesh) = self.meshes.get(next) {
                out.push(next);
                stack.extend(mesh.children.iter().rev().copied());
            }
        }
        out
    }

    /// Remove a mesh together with all of its descendants
    pub fn remove_mesh(&mut self, id: MeshId) -> Result<(), SceneError> {
        self.detach(id)?;
        for m in self.subtree(id) {
            self.meshes.remove(m);
        }
        Ok(())
    }

    /// Deep copy of a mesh and its descendants. The copy is a new root and
    /// shares materials with the source mesh.
    pub fn clone_mesh(&mut self, id: MeshId) -> Result<MeshId, SceneError> {
        let source = self.meshes.get(id).ok_or(SceneError::UnknownMesh)?;
        let mut copy = source.clone();
        let children = std::mem::take(&mut copy.children);
        copy.parent = None;
        let new_id = self.meshes.insert(copy);

        for child in children {
            let new_child = self.clone_mesh(child)?;
            if let Some(c) = self.meshes.get_mut(new_child) {
                c.parent = Some(new_id);
            }
            if let Some(m) = self.meshes.get_mut(new_id) {
                m.children.push(new_child);
            }
        }
        Ok(new_id)
    }
}
