mod common;

use baked_skin::{
    glb,
    rig::{
        bake::{bake_rig, write_baked_glb, BakeOptions},
        SkinningData,
    },
};
use common::{rigged_glb, translation_y};

fn bake(frames: u32) -> baked_skin::rig::RigExtras {
    let bytes = rigged_glb();
    let (document, buffers, _) = gltf::import_slice(&bytes).unwrap();
    bake_rig(
        &document,
        &buffers,
        &BakeOptions {
            frames,
            ..Default::default()
        },
    )
    .unwrap()
}

#[test]
fn bone_matrices_follow_the_animation() {
    let extras = bake(3);
    let mats = extras.bone_mats.unwrap();
    assert_eq!(mats.len(), 3);
    for (frame, y) in [("1", 0.0), ("2", 0.5), ("3", 1.0)] {
        let bones = &mats[frame];
        assert_eq!(bones.len(), 2);
        for bone in bones {
            assert_eq!(translation_y(bone), y, "frame {frame}");
            assert_eq!(bone[0], 1.0);
            assert_eq!(bone[15], 1.0);
        }
    }
}

#[test]
fn weights_are_dense_and_normalized() {
    let extras = bake(2);
    let weights = extras.bone_weights.unwrap();
    assert_eq!(weights["0"], vec![0.5, 0.5]);
    assert_eq!(weights["1"], vec![1.0, 0.0]);
    assert_eq!(weights["2"], vec![0.0, 1.0]);
}

#[test]
fn single_frame_holds_the_first_pose() {
    let extras = bake(1);
    let mats = extras.bone_mats.unwrap();
    assert_eq!(mats.len(), 1);
    assert_eq!(translation_y(&mats["1"][0]), 0.0);
}

#[test]
fn unknown_mesh_and_zero_frames_fail() {
    let bytes = rigged_glb();
    let (document, buffers, _) = gltf::import_slice(&bytes).unwrap();
    let missing = BakeOptions {
        mesh_name: "nope".into(),
        ..Default::default()
    };
    assert!(bake_rig(&document, &buffers, &missing).is_err());
    let empty = BakeOptions {
        frames: 0,
        ..Default::default()
    };
    assert!(bake_rig(&document, &buffers, &empty).is_err());
}

#[test]
fn baked_file_loads_back_as_skinning() {
    let bytes = rigged_glb();
    let extras = bake(4);
    let baked = write_baked_glb(&bytes, &extras, "skinMesh").unwrap();

    let model = glb::load_model_from_slice(&baked, "skinMesh").unwrap();
    let rig = model.rig.clone().unwrap();
    assert_eq!(rig, extras);

    let mesh = model.mesh("skinMesh").unwrap();
    let data = SkinningData::from_extras(&rig, mesh.vertices.len()).unwrap();
    assert_eq!((data.bone_count, data.frame_count, data.vertex_count), (2, 4, 3));
    assert_eq!(data.vertex_weights(2).unwrap(), &[0.0, 1.0]);
    assert_eq!(data.frame_palette(3).unwrap()[1].w_axis.y, 1.0);
}

#[test]
fn existing_extras_keys_survive_the_rewrite() {
    let bytes = rigged_glb();
    let baked = write_baked_glb(&bytes, &bake(2), "skinMesh").unwrap();
    let (document, _, _) = gltf::import_slice(&baked).unwrap();
    let node = document
        .nodes()
        .find(|node| node.name() == Some("skinMesh"))
        .unwrap();
    let extras: serde_json::Value =
        serde_json::from_str(node.extras().as_ref().unwrap().get()).unwrap();
    assert_eq!(extras["author"], "fixture");
    assert!(extras["boneMats"].is_object());
    assert!(extras["boneWeights"].is_object());
}

#[test]
fn node_extensions_survive_the_rewrite() {
    let bytes = rigged_glb();
    let baked = write_baked_glb(&bytes, &bake(2), "skinMesh").unwrap();
    let glb = gltf::binary::Glb::from_slice(&baked).unwrap();
    let json: serde_json::Value = serde_json::from_slice(&glb.json).unwrap();
    assert_eq!(json["nodes"][1]["extensions"]["EXT_custom"]["keep"], true);
    assert_eq!(json["nodes"][0]["extras"]["author"], "fixture");
    assert!(glb.bin.is_some());
}

#[test]
fn rewriting_an_unknown_node_fails() {
    let bytes = rigged_glb();
    assert!(write_baked_glb(&bytes, &bake(2), "nope").is_err());
}
