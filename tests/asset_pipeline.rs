mod common;

use std::{fs, path::PathBuf};

use baked_skin::{
    config::DemoConfig,
    glb,
    renderer::prepare::prepare_draws,
    scene_tree::{Material, Scene, GROUND_NAME},
};
use common::two_mesh_glb;
use serde_json::json;

fn rig_extras() -> serde_json::Value {
    let moved = [1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 3.0, 0.0, 1.0];
    json!({
        "boneMats": {
            "1": [[1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0]],
            "2": [moved]
        },
        "boneWeights": { "0": [1.0], "1": [1.0], "2": [0.5] }
    })
}

fn scene_from(bytes: &[u8], mesh_name: &str) -> (Scene, bool) {
    let model = glb::load_model_from_slice(bytes, mesh_name).unwrap();
    let mut scene = Scene::build(&DemoConfig::default());
    scene.append_model(&model);
    let bound = scene.bind_skinning(mesh_name, model.rig.as_ref());
    (scene, bound)
}

#[test]
fn loads_every_mesh_with_its_transform_and_color() {
    let model = glb::load_model_from_slice(&two_mesh_glb(None), "skinMesh").unwrap();
    assert_eq!(model.meshes.len(), 2);
    assert!(model.rig.is_none());

    let skin_mesh = model.mesh("skinMesh").unwrap();
    assert_eq!(skin_mesh.vertices.len(), 3);
    assert_eq!(skin_mesh.indices, vec![0, 1, 2]);
    assert_eq!(skin_mesh.transform.w_axis.y, 1.0);
    assert_eq!(skin_mesh.vertices[0].normal, [0.0, 1.0, 0.0]);
    assert_eq!(model.mesh("body").unwrap().base_color, [1.0, 0.0, 0.0, 1.0]);
}

#[test]
fn rig_extras_bind_the_skinning_material() {
    let (scene, bound) = scene_from(&two_mesh_glb(Some(rig_extras())), "skinMesh");
    assert!(bound);

    let node = scene.node("skinMesh").unwrap();
    assert!(matches!(node.material, Material::Skinning { .. }));
    assert!(node.casts_shadow);
    assert!(!node.receives_shadow);

    let data = &scene.skinnings[0];
    assert_eq!((data.bone_count, data.frame_count, data.vertex_count), (1, 2, 3));
    assert_eq!(data.frame_palette(1).unwrap()[0].w_axis.y, 3.0);
    assert_eq!(data.vertex_weights(2).unwrap(), &[0.5]);

    assert!(matches!(
        scene.node("body").unwrap().material,
        Material::Standard { .. }
    ));
}

#[test]
fn asset_without_rig_data_renders_statically() {
    let (scene, bound) = scene_from(&two_mesh_glb(Some(json!({ "note": "hi" }))), "skinMesh");
    assert!(!bound);
    assert!(scene.skinnings.is_empty());
    let draws = prepare_draws(&scene);
    assert!(draws.skinned_draws.is_empty());
    assert!(draws.shadow_casters.is_empty());
    assert_eq!(draws.static_draws.len(), 3);
}

#[test]
fn missing_mesh_name_leaves_the_scene_alone() {
    let (scene, bound) = scene_from(&two_mesh_glb(Some(rig_extras())), "hero");
    assert!(!bound);
    assert!(scene.skinnings.is_empty());
    assert_eq!(scene.nodes.len(), 3);
}

#[test]
fn skinned_mesh_casts_onto_the_ground() {
    let (scene, _) = scene_from(&two_mesh_glb(Some(rig_extras())), "skinMesh");
    let draws = prepare_draws(&scene);
    assert_eq!(draws.skinned_draws.len(), 1);
    assert_eq!(draws.shadow_casters, draws.skinned_draws);
    assert_eq!(draws.objects.len(), scene.nodes.len());

    let ground = scene
        .nodes
        .iter()
        .position(|node| node.name == GROUND_NAME)
        .unwrap();
    assert_eq!(draws.objects[ground].flags[0], 1.0);
}

#[test]
fn load_scene_reads_the_configured_asset() {
    let dir = std::env::temp_dir().join(format!("baked-skin-{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    let path = dir.join("rig.glb");
    fs::write(&path, two_mesh_glb(Some(rig_extras()))).unwrap();

    let config = DemoConfig {
        asset_path: path,
        ..Default::default()
    };
    let scene = baked_skin::load_scene(&config).unwrap();
    assert_eq!(scene.skinnings.len(), 1);
    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn load_scene_fails_on_a_missing_asset() {
    let config = DemoConfig {
        asset_path: PathBuf::from("does/not/exist.glb"),
        ..Default::default()
    };
    assert!(baked_skin::load_scene(&config).is_err());
}
