use glam::{Mat4, Vec3};
use log::{debug, info, warn};

use crate::{
    camera::OrbitCamera,
    config::DemoConfig,
    glb::ModelData,
    renderer::buffers::vertex::Vertex,
    rig::{RigExtras, SkinningData},
};

pub const GROUND_NAME: &str = "ground";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkinningId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Material {
    Standard { color: [f32; 4] },
    Skinning { skinning: SkinningId, color: [f32; 4] },
}

impl Material {
    pub fn color(&self) -> [f32; 4] {
        match self {
            Material::Standard { color } | Material::Skinning { color, .. } => *color,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CpuMesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

#[derive(Debug, Clone)]
pub struct SceneNode {
    pub name: String,
    pub mesh: MeshId,
    pub transform: Mat4,
    pub material: Material,
    pub casts_shadow: bool,
    pub receives_shadow: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sun {
    /// Normalized direction the light travels in.
    pub direction: Vec3,
    pub color: Vec3,
    /// Height of the light above the scene target, used to place the shadow
    /// camera.
    pub height: f32,
}

impl Sun {
    pub fn from_config(config: &DemoConfig) -> Self {
        let direction = Vec3::from(config.light_direction).try_normalize().unwrap_or_else(|| {
            warn!("light direction is zero, pointing the sun straight down");
            Vec3::NEG_Y
        });
        Self {
            direction,
            color: Vec3::splat(config.light_intensity),
            height: config.light_height,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShadowSettings {
    pub map_size: u32,
    pub darkness: f32,
    /// PCF radius in texels.
    pub blur_scale: u32,
    /// Half width of the light's orthographic frustum.
    pub extent: f32,
}

pub struct Scene {
    pub nodes: Vec<SceneNode>,
    pub meshes: Vec<CpuMesh>,
    pub skinnings: Vec<SkinningData>,
    pub sun: Sun,
    pub camera: OrbitCamera,
    pub shadows: ShadowSettings,
    pub ambient: f32,
}

pub fn ground_mesh(size: f32) -> CpuMesh {
    let h = size * 0.5;
    let corner = |x: f32, z: f32| Vertex {
        position: [x, 0.0, z],
        normal: [0.0, 1.0, 0.0],
        color: [1.0, 1.0, 1.0, 1.0],
    };
    CpuMesh {
        vertices: vec![corner(-h, -h), corner(-h, h), corner(h, h), corner(h, -h)],
        indices: vec![0, 1, 2, 0, 2, 3],
    }
}

impl Scene {
    /// Ground, sun, shadow generator and camera. The asset is appended later.
    pub fn build(config: &DemoConfig) -> Self {
        let mut scene = Self {
            nodes: vec![],
            meshes: vec![],
            skinnings: vec![],
            sun: Sun::from_config(config),
            camera: OrbitCamera::from_config(config),
            shadows: ShadowSettings {
                map_size: config.shadow_map_size,
                darkness: config.shadow_darkness,
                blur_scale: config.shadow_blur_scale,
                extent: config.ground_size * 0.5 * std::f32::consts::SQRT_2,
            },
            ambient: config.ambient,
        };
        let ground = scene.add_mesh(ground_mesh(config.ground_size));
        scene.nodes.push(SceneNode {
            name: GROUND_NAME.to_string(),
            mesh: ground,
            transform: Mat4::IDENTITY,
            material: Material::Standard {
                color: [1.0, 1.0, 1.0, 1.0],
            },
            casts_shadow: false,
            receives_shadow: true,
        });
        scene
    }

    pub fn add_mesh(&mut self, mesh: CpuMesh) -> MeshId {
        self.meshes.push(mesh);
        MeshId(self.meshes.len() - 1)
    }

    /// Adds every loaded mesh with a standard material.
    pub fn append_model(&mut self, model: &ModelData) {
        for mesh in &model.meshes {
            let id = self.add_mesh(CpuMesh {
                vertices: mesh.vertices.clone(),
                indices: mesh.indices.clone(),
            });
            self.nodes.push(SceneNode {
                name: mesh.name.clone(),
                mesh: id,
                transform: mesh.transform,
                material: Material::Standard {
                    color: mesh.base_color,
                },
                casts_shadow: false,
                receives_shadow: false,
            });
        }
    }

    pub fn node(&self, name: &str) -> Option<&SceneNode> {
        self.nodes.iter().find(|node| node.name == name)
    }

    fn node_mut(&mut self, name: &str) -> Option<&mut SceneNode> {
        self.nodes.iter_mut().find(|node| node.name == name)
    }

    /// Returns false and changes nothing if no node has that name.
    pub fn attach_material(&mut self, name: &str, material: Material) -> bool {
        match self.node_mut(name) {
            Some(node) => {
                node.material = material;
                true
            }
            None => false,
        }
    }

    pub fn add_shadow_caster(&mut self, name: &str) -> bool {
        match self.node_mut(name) {
            Some(node) => {
                node.casts_shadow = true;
                true
            }
            None => false,
        }
    }

    /// Binds the skinning material to `mesh_name` when that node exists and
    /// usable rig data was extracted. Otherwise the node keeps its standard
    /// material.
    pub fn bind_skinning(&mut self, mesh_name: &str, extras: Option<&RigExtras>) -> bool {
        let Some(node) = self.node(mesh_name) else {
            debug!("no node named `{mesh_name}`, skinning not bound");
            return false;
        };
        let Some(extras) = extras else {
            info!("`{mesh_name}` has no rig data, keeping its standard material");
            return false;
        };
        let vertex_count = self.meshes[node.mesh.0].vertices.len();
        let color = node.material.color();
        let Some(skinning) = SkinningData::from_extras(extras, vertex_count) else {
            warn!("rig data on `{mesh_name}` is incomplete, keeping its standard material");
            return false;
        };
        info!(
            "skinning `{mesh_name}`: {} bones, {} frames, {} vertices",
            skinning.bone_count, skinning.frame_count, skinning.vertex_count
        );

        self.skinnings.push(skinning);
        let id = SkinningId(self.skinnings.len() - 1);
        self.attach_material(mesh_name, Material::Skinning { skinning: id, color });
        self.add_shadow_caster(mesh_name)
    }

    /// Reverts every skinned node whose bone or weight buffer is larger than
    /// `max_binding_size` to its standard material. Returns how many nodes
    /// were reverted.
    pub fn drop_oversized_skinnings(&mut self, max_binding_size: u64) -> usize {
        let mut dropped = 0;
        for node in &mut self.nodes {
            let Material::Skinning { skinning, color } = node.material else {
                continue;
            };
            let Some(data) = self.skinnings.get(skinning.0) else {
                continue;
            };
            if data.fits_storage_binding(max_binding_size) {
                continue;
            }
            let (bones, weights) = data.storage_sizes();
            warn!(
                "skinning on `{}` needs {bones} + {weights} bytes of storage, over the \
                 {max_binding_size} byte binding limit; keeping its standard material",
                node.name
            );
            node.material = Material::Standard { color };
            node.casts_shadow = false;
            dropped += 1;
        }
        dropped
    }
}
