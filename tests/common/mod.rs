#![allow(dead_code)]

use std::borrow::Cow;

use serde_json::{json, Value};

const FLOAT: u32 = 5126;
const UNSIGNED_SHORT: u32 = 5123;

/// Packs accessor data into a single GLB binary chunk, one buffer view per
/// accessor.
#[derive(Default)]
pub struct GlbBuilder {
    bin: Vec<u8>,
    buffer_views: Vec<Value>,
    accessors: Vec<Value>,
}

impl GlbBuilder {
    fn push_view(&mut self, bytes: &[u8]) -> usize {
        while self.bin.len() % 4 != 0 {
            self.bin.push(0);
        }
        self.buffer_views.push(json!({
            "buffer": 0,
            "byteOffset": self.bin.len(),
            "byteLength": bytes.len(),
        }));
        self.bin.extend_from_slice(bytes);
        self.buffer_views.len() - 1
    }

    fn push_accessor(&mut self, accessor: Value) -> usize {
        self.accessors.push(accessor);
        self.accessors.len() - 1
    }

    pub fn floats(&mut self, data: &[f32], kind: &str, width: usize) -> usize {
        let view = self.push_view(bytemuck::cast_slice(data));
        let mut accessor = json!({
            "bufferView": view,
            "componentType": FLOAT,
            "count": data.len() / width,
            "type": kind,
        });
        if matches!(kind, "SCALAR" | "VEC3") {
            let (min, max) = bounds(data, width);
            accessor["min"] = json!(min);
            accessor["max"] = json!(max);
        }
        self.push_accessor(accessor)
    }

    pub fn shorts(&mut self, data: &[u16], kind: &str, width: usize) -> usize {
        let view = self.push_view(bytemuck::cast_slice(data));
        self.push_accessor(json!({
            "bufferView": view,
            "componentType": UNSIGNED_SHORT,
            "count": data.len() / width,
            "type": kind,
        }))
    }

    /// Adds the buffer tables to `document` and serializes it as a GLB.
    pub fn finish(self, mut document: Value) -> Vec<u8> {
        document["asset"] = json!({ "version": "2.0" });
        document["buffers"] = json!([{ "byteLength": self.bin.len() }]);
        document["bufferViews"] = Value::Array(self.buffer_views);
        document["accessors"] = Value::Array(self.accessors);
        let json = serde_json::to_vec(&document).unwrap();
        gltf::binary::Glb {
            header: gltf::binary::Header {
                magic: *b"glTF",
                version: 2,
                length: 0,
            },
            json: Cow::Owned(json),
            bin: Some(Cow::Owned(self.bin)),
        }
        .to_vec()
        .unwrap()
    }
}

fn bounds(data: &[f32], width: usize) -> (Vec<f32>, Vec<f32>) {
    let mut min = vec![f32::MAX; width];
    let mut max = vec![f32::MIN; width];
    for element in data.chunks_exact(width) {
        for (i, &v) in element.iter().enumerate() {
            min[i] = min[i].min(v);
            max[i] = max[i].max(v);
        }
    }
    (min, max)
}

pub const TRIANGLE: [f32; 9] = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, -1.0];

/// A triangle under `skinMesh` and a second one under `body`. `extras` goes
/// on `skinMesh` when given.
pub fn two_mesh_glb(extras: Option<Value>) -> Vec<u8> {
    let mut builder = GlbBuilder::default();
    let positions = builder.floats(&TRIANGLE, "VEC3", 3);
    let mut skin_mesh = json!({ "name": "skinMesh", "mesh": 0, "translation": [0.0, 1.0, 0.0] });
    if let Some(extras) = extras {
        skin_mesh["extras"] = extras;
    }
    builder.finish(json!({
        "scene": 0,
        "scenes": [{ "nodes": [0, 1] }],
        "nodes": [skin_mesh, { "name": "body", "mesh": 1 }],
        "meshes": [
            { "primitives": [{ "attributes": { "POSITION": positions } }] },
            {
                "primitives": [{
                    "attributes": { "POSITION": positions },
                    "material": 0
                }]
            }
        ],
        "materials": [{ "pbrMetallicRoughness": { "baseColorFactor": [1.0, 0.0, 0.0, 1.0] } }],
    }))
}

/// Two joints stacked along +Y. The root moves from y=1 to y=2 over one
/// second; vertex influences exercise merging and normalization.
pub fn rigged_glb() -> Vec<u8> {
    let mut builder = GlbBuilder::default();
    let positions = builder.floats(&TRIANGLE, "VEC3", 3);
    let joints = builder.shorts(&[0, 1, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0], "VEC4", 4);
    let weights = builder.floats(
        &[0.25, 0.25, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.5, 0.0, 0.0, 0.0],
        "VEC4",
        4,
    );
    let mut inverse_binds = vec![];
    for y in [-1.0f32, -2.0] {
        inverse_binds.extend_from_slice(&[
            1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, y, 0.0, 1.0,
        ]);
    }
    let inverse_binds = builder.floats(&inverse_binds, "MAT4", 16);
    let times = builder.floats(&[0.0, 1.0], "SCALAR", 1);
    let translations = builder.floats(&[0.0, 1.0, 0.0, 0.0, 2.0, 0.0], "VEC3", 3);

    builder.finish(json!({
        "scene": 0,
        "scenes": [{ "nodes": [0, 1] }],
        "nodes": [
            { "name": "skinMesh", "mesh": 0, "skin": 0, "extras": { "author": "fixture" } },
            {
                "name": "root",
                "translation": [0.0, 1.0, 0.0],
                "children": [2],
                "extensions": { "EXT_custom": { "keep": true } }
            },
            { "name": "tip", "translation": [0.0, 1.0, 0.0] }
        ],
        "meshes": [{
            "primitives": [{
                "attributes": {
                    "POSITION": positions,
                    "JOINTS_0": joints,
                    "WEIGHTS_0": weights
                }
            }]
        }],
        "skins": [{ "joints": [1, 2], "inverseBindMatrices": inverse_binds }],
        "animations": [{
            "samplers": [{ "input": times, "output": translations, "interpolation": "LINEAR" }],
            "channels": [{ "sampler": 0, "target": { "node": 1, "path": "translation" } }]
        }],
    }))
}

pub fn translation_y(matrix: &[f32; 16]) -> f32 {
    matrix[13]
}
