//! Mesh editing helpers
//!
//! Scaling, stretching, normal flips/recomputation and material assignment
//! walk the whole subtree; translation only moves the mesh itself.

use super::{MaterialId, MeshId, Scene};
use crate::error::SceneError;
use crate::rasterizer::math::Vec3;

impl Scene {
    fn for_subtree(&mut self, id: MeshId, mut f: impl FnMut(&mut super::Mesh)) -> Result<(), SceneError> {
        if self.mesh(id).is_none() {
            return Err(SceneError::UnknownMesh);
        }
        for m in self.subtree(id) {
            if let Some(mesh) = self.mesh_mut(m) {
                f(mesh);
            }
        }
        Ok(())
    }

    /// Uniformly scale vertex positions
    pub fn scale_mesh(&mut self, id: MeshId, s: f32) -> Result<(), SceneError> {
        self.for_subtree(id, |mesh| {
            for v in mesh.vertices_mut() {
                v.position = v.position * s;
            }
        })
    }

    /// Scale vertex positions per axis. Normals are left as they are; call
    /// [`Scene::recompute_normals`] after a non-uniform stretch.
    pub fn stretch_mesh(&mut self, id: MeshId, factors: Vec3) -> Result<(), SceneError> {
        self.for_subtree(id, |mesh| {
            for v in mesh.vertices_mut() {
                v.position = v.position.mul_elem(factors);
            }
        })
    }

    /// Offset the vertices of this mesh only (children keep their positions)
    pub fn translate_mesh(&mut self, id: MeshId, offset: Vec3) -> Result<(), SceneError> {
        let mesh = self.mesh_mut(id).ok_or(SceneError::UnknownMesh)?;
        for v in mesh.vertices_mut() {
            v.position = v.position + offset;
        }
        Ok(())
    }

    /// Negate vertex and face normals
    pub fn flip_normals(&mut self, id: MeshId) -> Result<(), SceneError> {
        self.for_subtree(id, |mesh| {
            for v in mesh.vertices_mut() {
                v.normal = -v.normal;
            }
            for f in mesh.faces_mut() {
                f.normal = -f.normal;
            }
        })
    }

    /// Assign a material to every face, optionally including descendants
    pub fn set_mesh_material(&mut self, id: MeshId, material: Option<MaterialId>, recursive: bool) -> Result<(), SceneError> {
        if recursive {
            self.for_subtree(id, |mesh| {
                for f in mesh.faces_mut() {
                    f.material = material;
                }
            })
        } else {
            let mesh = self.mesh_mut(id).ok_or(SceneError::UnknownMesh)?;
            for f in mesh.faces_mut() {
                f.material = material;
            }
            Ok(())
        }
    }

    /// Face normals from the winding `(v0 - v1) x (v0 - v2)`; vertex normals
    /// as the normalized sum of the normals of the faces using them
    pub fn recompute_normals(&mut self, id: MeshId) -> Result<(), SceneError> {
        self.for_subtree(id, |mesh| {
            let mut sums = vec![Vec3::ZERO; mesh.vertices().len()];
            let positions: Vec<Vec3> = mesh.vertices().iter().map(|v| v.position).collect();
            for f in mesh.faces_mut() {
                let [a, b, c] = f.vertices();
                let (p0, p1, p2) = (positions[a], positions[b], positions[c]);
                f.normal = (p0 - p1).cross(p0 - p2).normalize();
                for i in [a, b, c] {
                    sums[i] = sums[i] + f.normal;
                }
            }
            for (v, sum) in mesh.vertices_mut().iter_mut().zip(sums) {
                v.normal = sum.normalize();
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::material::Material;
    use crate::rasterizer::math::Vec3;
    use crate::scene::{Face, Mesh, Scene, Vertex};

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).len() < 1e-5
    }

    /// Two triangles sharing an edge, folded along x = 0
    fn folded(name: &str) -> Mesh {
        let verts = vec![
            Vertex::new(Vec3::new(0.0, 0.0, 0.0)),
            Vertex::new(Vec3::new(0.0, 1.0, 0.0)),
            Vertex::new(Vec3::new(1.0, 0.0, 0.0)),
            Vertex::new(Vec3::new(0.0, 0.0, 1.0)),
        ];
        let faces = vec![Face::new([0, 1, 2]), Face::new([0, 3, 1])];
        Mesh::new(name, verts, faces).unwrap()
    }

    fn tree() -> (Scene, crate::scene::MeshId, crate::scene::MeshId) {
        let mut scene = Scene::new();
        let root = scene.add_mesh(folded("root"));
        let child = scene.add_mesh(folded("child"));
        scene.attach(root, child).unwrap();
        (scene, root, child)
    }

    #[test]
    fn test_recompute_normals() {
        let (mut scene, root, child) = tree();
        scene.recompute_normals(root).unwrap();
        for id in [root, child] {
            let mesh = scene.mesh(id).unwrap();
            // (v0 - v1) x (v0 - v2) = (0,-1,0) x (-1,0,0) = (0,0,-1)
            assert!(approx(mesh.faces()[0].normal, Vec3::new(0.0, 0.0, -1.0)));
            assert!(approx(mesh.faces()[1].normal, Vec3::new(-1.0, 0.0, 0.0)));
            let shared = Vec3::new(-1.0, 0.0, -1.0).normalize();
            assert!(approx(mesh.vertices()[0].normal, shared));
            assert!(approx(mesh.vertices()[2].normal, Vec3::new(0.0, 0.0, -1.0)));
        }
    }

    #[test]
    fn test_flip_normals_recursive() {
        let (mut scene, root, child) = tree();
        scene.recompute_normals(root).unwrap();
        scene.flip_normals(root).unwrap();
        assert!(approx(scene.mesh(child).unwrap().faces()[0].normal, Vec3::new(0.0, 0.0, 1.0)));
        assert!(approx(scene.mesh(root).unwrap().vertices()[2].normal, Vec3::new(0.0, 0.0, 1.0)));
    }

    #[test]
    fn test_scale_and_stretch_recursive() {
        let (mut scene, root, child) = tree();
        scene.scale_mesh(root, 2.0).unwrap();
        scene.stretch_mesh(root, Vec3::new(1.0, 3.0, -1.0)).unwrap();
        for id in [root, child] {
            let v = scene.mesh(id).unwrap().vertices();
            assert!(approx(v[1].position, Vec3::new(0.0, 6.0, 0.0)));
            assert!(approx(v[3].position, Vec3::new(0.0, 0.0, -2.0)));
        }
    }

    #[test]
    fn test_translate_is_not_recursive() {
        let (mut scene, root, child) = tree();
        scene.translate_mesh(root, Vec3::new(1.0, 2.0, 3.0)).unwrap();
        assert!(approx(scene.mesh(root).unwrap().vertices()[0].position, Vec3::new(1.0, 2.0, 3.0)));
        assert!(approx(scene.mesh(child).unwrap().vertices()[0].position, Vec3::ZERO));
    }

    #[test]
    fn test_set_material() {
        let (mut scene, root, child) = tree();
        let red = scene.add_material(Material::new("red"));
        let blue = scene.add_material(Material::new("blue"));

        scene.set_mesh_material(root, Some(red), true).unwrap();
        scene.set_mesh_material(root, Some(blue), false).unwrap();
        assert!(scene.mesh(root).unwrap().faces().iter().all(|f| f.material == Some(blue)));
        assert!(scene.mesh(child).unwrap().faces().iter().all(|f| f.material == Some(red)));
    }
}
