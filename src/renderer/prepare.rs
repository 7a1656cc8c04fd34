use log::warn;

use crate::{
    renderer::bindgroups::object::ObjectUniform,
    scene_tree::{Material, MeshId, Scene, SkinningId},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Draw {
    pub mesh: MeshId,
    /// Slot in the object uniform buffer.
    pub object: usize,
    pub skinning: Option<SkinningId>,
}

#[derive(Debug, Default)]
pub struct DrawList {
    pub objects: Vec<ObjectUniform>,
    pub static_draws: Vec<Draw>,
    pub skinned_draws: Vec<Draw>,
    pub shadow_casters: Vec<Draw>,
}

/// Splits the scene into per-pipeline draw lists. Every node gets exactly one
/// object slot, shared by its main and shadow draws.
pub fn prepare_draws(scene: &Scene) -> DrawList {
    let mut list = DrawList::default();
    for node in &scene.nodes {
        if scene.meshes.get(node.mesh.0).is_none() {
            warn!("node `{}` points at a missing mesh", node.name);
            continue;
        }
        let skinning = match node.material {
            Material::Skinning { skinning, .. } if skinning.0 < scene.skinnings.len() => {
                Some(skinning)
            }
            Material::Skinning { .. } => {
                warn!("node `{}` has a dangling skinning material", node.name);
                None
            }
            Material::Standard { .. } => None,
        };
        let draw = Draw {
            mesh: node.mesh,
            object: list.objects.len(),
            skinning,
        };
        list.objects.push(ObjectUniform::new(
            node.transform,
            node.material.color(),
            node.receives_shadow,
        ));
        if skinning.is_some() {
            list.skinned_draws.push(draw);
        } else {
            list.static_draws.push(draw);
        }
        if node.casts_shadow {
            list.shadow_casters.push(draw);
        }
    }
    list
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use glam::Mat4;

    use super::*;
    use crate::{
        config::DemoConfig,
        glb::{MeshData, ModelData},
        renderer::buffers::vertex::Vertex,
        rig::RigExtras,
    };

    fn scene_with_rig(bind: bool) -> Scene {
        let mut scene = Scene::build(&DemoConfig::default());
        scene.append_model(&ModelData {
            meshes: vec![
                MeshData {
                    name: "skinMesh".into(),
                    node_index: 0,
                    transform: Mat4::IDENTITY,
                    base_color: [1.0; 4],
                    vertices: vec![Vertex::default(); 3],
                    indices: vec![0, 1, 2],
                },
                MeshData {
                    name: "prop".into(),
                    node_index: 1,
                    transform: Mat4::IDENTITY,
                    base_color: [1.0; 4],
                    vertices: vec![Vertex::default(); 3],
                    indices: vec![0, 1, 2],
                },
            ],
            rig: None,
        });
        if bind {
            let extras = RigExtras {
                bone_mats: Some(BTreeMap::from([(
                    "1".to_string(),
                    vec![Mat4::IDENTITY.to_cols_array()],
                )])),
                bone_weights: Some(BTreeMap::from([("0".to_string(), vec![1.0])])),
            };
            assert!(scene.bind_skinning("skinMesh", Some(&extras)));
        }
        scene
    }

    #[test]
    fn skinned_node_goes_to_skinned_pipeline_and_shadow_pass() {
        let list = prepare_draws(&scene_with_rig(true));
        assert_eq!(list.objects.len(), 3);
        assert_eq!(list.static_draws.len(), 2);
        assert_eq!(list.skinned_draws.len(), 1);
        assert_eq!(list.skinned_draws[0].skinning, Some(SkinningId(0)));
        assert_eq!(list.shadow_casters, list.skinned_draws);
    }

    #[test]
    fn without_rig_nothing_casts_shadows() {
        let list = prepare_draws(&scene_with_rig(false));
        assert!(list.skinned_draws.is_empty());
        assert!(list.shadow_casters.is_empty());
        assert_eq!(list.static_draws.len(), 3);
    }

    #[test]
    fn only_the_ground_receives_shadows() {
        let list = prepare_draws(&scene_with_rig(true));
        let receivers: Vec<f32> = list.objects.iter().map(|o| o.flags[0]).collect();
        assert_eq!(receivers, vec![1.0, 0.0, 0.0]);
    }

    #[test]
    fn dangling_skinning_falls_back_to_static() {
        let mut scene = scene_with_rig(false);
        scene.attach_material(
            "prop",
            Material::Skinning {
                skinning: SkinningId(4),
                color: [1.0; 4],
            },
        );
        let list = prepare_draws(&scene);
        assert!(list.skinned_draws.is_empty());
        assert_eq!(list.static_draws.len(), 3);
    }
}
