//! Loads a `.glb` into CPU meshes for the scene.
//!
//! Every node with a mesh becomes one [`MeshData`]. The primitives of a mesh
//! are concatenated in document order so that vertex ids stay stable across
//! the whole node, which is what `boneWeights` keys refer to.

use std::path::Path;

use glam::{Mat4, Quat, Vec3};
use log::{info, warn};

use crate::{
    errors::Result,
    renderer::buffers::vertex::Vertex,
    rig::{self, RigExtras},
};

const WHITE: [f32; 4] = [1.0, 1.0, 1.0, 1.0];

#[derive(Debug, Clone)]
pub struct MeshData {
    pub name: String,
    pub node_index: usize,
    /// World transform of the node.
    pub transform: Mat4,
    pub base_color: [f32; 4],
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

#[derive(Debug, Clone, Default)]
pub struct ModelData {
    pub meshes: Vec<MeshData>,
    /// Rig extras of the node named by the caller, if present.
    pub rig: Option<RigExtras>,
}

impl ModelData {
    pub fn mesh(&self, name: &str) -> Option<&MeshData> {
        self.meshes.iter().find(|mesh| mesh.name == name)
    }
}

pub fn load_model(path: &Path, mesh_name: &str) -> Result<ModelData> {
    let (document, buffers, _images) = gltf::import(path)?;
    let model = model_from_document(&document, &buffers, mesh_name);
    info!(
        "loaded {}: {} mesh(es), rig data on `{mesh_name}`: {}",
        path.display(),
        model.meshes.len(),
        model.rig.is_some()
    );
    Ok(model)
}

pub fn load_model_from_slice(bytes: &[u8], mesh_name: &str) -> Result<ModelData> {
    let (document, buffers, _images) = gltf::import_slice(bytes)?;
    Ok(model_from_document(&document, &buffers, mesh_name))
}

pub fn model_from_document(
    document: &gltf::Document,
    buffers: &[gltf::buffer::Data],
    mesh_name: &str,
) -> ModelData {
    let mut meshes = vec![];
    match document.default_scene().or_else(|| document.scenes().next()) {
        Some(scene) => {
            for node in scene.nodes() {
                accumulate_meshes(&node, &Mat4::IDENTITY, buffers, &mut meshes);
            }
        }
        None => warn!("asset has no scene, nothing to draw"),
    }
    ModelData {
        meshes,
        rig: rig::find_rig_extras(document, mesh_name),
    }
}

pub fn transform_to_mat4(transform: gltf::scene::Transform) -> Mat4 {
    match transform {
        gltf::scene::Transform::Matrix { matrix } => Mat4::from_cols_array_2d(&matrix),
        gltf::scene::Transform::Decomposed {
            translation,
            rotation,
            scale,
        } => Mat4::from_scale_rotation_translation(
            Vec3::from(scale),
            Quat::from_array(rotation),
            Vec3::from(translation),
        ),
    }
}

fn accumulate_meshes(
    node: &gltf::Node,
    parent: &Mat4,
    buffers: &[gltf::buffer::Data],
    meshes: &mut Vec<MeshData>,
) {
    let transform = *parent * transform_to_mat4(node.transform());
    if let Some(mesh) = node.mesh() {
        let (vertices, indices) = read_mesh(&mesh, buffers);
        if indices.is_empty() {
            warn!("mesh of node {} has no drawable triangles", node.index());
        } else {
            let base_color = mesh
                .primitives()
                .next()
                .map(|p| p.material().pbr_metallic_roughness().base_color_factor())
                .unwrap_or(WHITE);
            meshes.push(MeshData {
                name: node
                    .name()
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("node{}", node.index())),
                node_index: node.index(),
                transform,
                base_color,
                vertices,
                indices,
            });
        }
    }
    for child in node.children() {
        accumulate_meshes(&child, &transform, buffers, meshes);
    }
}

/// Triangle lists with positions. Everything else is left out of both the
/// vertex stream and the baked weights.
pub fn is_renderable(primitive: &gltf::Primitive) -> bool {
    if primitive.mode() != gltf::mesh::Mode::Triangles {
        return false;
    }
    let Some(positions) = primitive.get(&gltf::Semantic::Positions) else {
        return false;
    };
    let index_count = primitive
        .indices()
        .map_or(positions.count(), |accessor| accessor.count());
    index_count % 3 == 0
}

pub fn read_mesh(mesh: &gltf::Mesh, buffers: &[gltf::buffer::Data]) -> (Vec<Vertex>, Vec<u32>) {
    let mut vertices: Vec<Vertex> = vec![];
    let mut indices: Vec<u32> = vec![];

    for primitive in mesh.primitives() {
        if !is_renderable(&primitive) {
            warn!(
                "skipping primitive {} of mesh {}: not a triangle list with positions",
                primitive.index(),
                mesh.index()
            );
            continue;
        }
        let reader = primitive.reader(|b| buffers.get(b.index()).map(|data| data.0.as_slice()));
        let positions: Vec<[f32; 3]> = reader
            .read_positions()
            .map(|iter| iter.collect())
            .unwrap_or_default();
        let local_indices: Vec<u32> = reader
            .read_indices()
            .map(|r| r.into_u32().collect())
            .unwrap_or_else(|| (0..positions.len() as u32).collect());
        let normals: Vec<[f32; 3]> = match reader.read_normals() {
            Some(iter) => iter.collect(),
            None => generate_vertex_normals(&positions, &local_indices),
        };
        let colors: Vec<[f32; 4]> = reader
            .read_colors(0)
            .map(|r| r.into_rgba_f32().collect())
            .unwrap_or_default();

        let base = vertices.len() as u32;
        vertices.extend(positions.iter().enumerate().map(|(i, position)| Vertex {
            position: *position,
            normal: normals.get(i).copied().unwrap_or([0.0, 1.0, 0.0]),
            color: colors.get(i).copied().unwrap_or(WHITE),
        }));
        indices.extend(local_indices.iter().map(|i| i + base));
    }

    (vertices, indices)
}

/// Smooth normals from area-weighted face normals. Degenerate results point
/// up.
pub fn generate_vertex_normals(positions: &[[f32; 3]], indices: &[u32]) -> Vec<[f32; 3]> {
    let mut sums = vec![Vec3::ZERO; positions.len()];
    for triangle in indices.chunks_exact(3) {
        let [i0, i1, i2] = [
            triangle[0] as usize,
            triangle[1] as usize,
            triangle[2] as usize,
        ];
        if i0 >= positions.len() || i1 >= positions.len() || i2 >= positions.len() {
            continue;
        }
        let p0 = Vec3::from(positions[i0]);
        let face = (Vec3::from(positions[i1]) - p0).cross(Vec3::from(positions[i2]) - p0);
        sums[i0] += face;
        sums[i1] += face;
        sums[i2] += face;
    }
    sums.into_iter()
        .map(|n| {
            if n.length_squared() < f32::EPSILON {
                [0.0, 1.0, 0.0]
            } else {
                n.normalize().to_array()
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normals_of_a_flat_quad_point_up() {
        let positions = [
            [-1.0, 0.0, -1.0],
            [-1.0, 0.0, 1.0],
            [1.0, 0.0, 1.0],
            [1.0, 0.0, -1.0],
        ];
        let normals = generate_vertex_normals(&positions, &[0, 1, 2, 0, 2, 3]);
        for n in normals {
            assert!((Vec3::from(n) - Vec3::Y).length() < 1e-6);
        }
    }

    #[test]
    fn shared_vertices_average_adjacent_faces() {
        // two faces meeting at a right angle along the x axis
        let positions = [
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [0.0, 0.0, -1.0],
            [0.0, 1.0, 0.0],
        ];
        let normals = generate_vertex_normals(&positions, &[0, 1, 2, 0, 1, 3]);
        let shared = Vec3::from(normals[0]);
        let expected = Vec3::new(0.0, 1.0, 1.0).normalize();
        assert!((shared - expected).length() < 1e-5, "{shared:?}");
    }

    #[test]
    fn unreferenced_and_out_of_range_vertices_fall_back_to_up() {
        let positions = [[0.0; 3], [1.0, 0.0, 0.0]];
        let normals = generate_vertex_normals(&positions, &[0, 1, 5]);
        assert_eq!(normals, vec![[0.0, 1.0, 0.0]; 2]);
    }

    #[test]
    fn decomposed_transform_matches_glam() {
        let m = transform_to_mat4(gltf::scene::Transform::Decomposed {
            translation: [1.0, 2.0, 3.0],
            rotation: [0.0, 0.0, 0.0, 1.0],
            scale: [2.0, 2.0, 2.0],
        });
        assert_eq!(m.transform_point3(Vec3::ONE), Vec3::new(3.0, 4.0, 5.0));
    }
}
