//! Bakes a skinned glTF (skin + animation) into the `boneMats`/`boneWeights`
//! extras the demo reads.

use std::{borrow::Cow, cmp::Ordering, collections::BTreeMap};

use glam::{Mat4, Quat, Vec3};
use gltf::animation::{util::ReadOutputs, Interpolation};
use log::{debug, info, warn};
use serde_json::{Map, Value};

use crate::{
    errors::{DemoError, Result},
    glb::is_renderable,
    rig::RigExtras,
};

pub const DEFAULT_FRAMES: u32 = 100;
const MAX_INFLUENCES: usize = 4;

#[derive(Debug, Clone)]
pub struct BakeOptions {
    pub mesh_name: String,
    pub frames: u32,
}

impl Default for BakeOptions {
    fn default() -> Self {
        Self {
            mesh_name: String::from("skinMesh"),
            frames: DEFAULT_FRAMES,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Trs {
    translation: Vec3,
    rotation: Quat,
    scale: Vec3,
}

impl Trs {
    fn from_node(node: &gltf::Node) -> Self {
        let (translation, rotation, scale) = node.transform().decomposed();
        Self {
            translation: Vec3::from(translation),
            rotation: Quat::from_array(rotation),
            scale: Vec3::from(scale),
        }
    }

    fn to_mat4(self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

/// Local transforms and hierarchy of every node in the document.
struct RestPose {
    locals: Vec<Trs>,
    children: Vec<Vec<usize>>,
    roots: Vec<usize>,
}

impl RestPose {
    fn new(document: &gltf::Document) -> Self {
        let count = document.nodes().len();
        let mut locals = Vec::with_capacity(count);
        let mut children = vec![vec![]; count];
        let mut has_parent = vec![false; count];
        for node in document.nodes() {
            locals.push(Trs::from_node(&node));
            for child in node.children() {
                children[node.index()].push(child.index());
                has_parent[child.index()] = true;
            }
        }
        let roots = (0..count).filter(|&i| !has_parent[i]).collect();
        Self {
            locals,
            children,
            roots,
        }
    }

    fn world_transforms(&self, locals: &[Trs]) -> Vec<Mat4> {
        let mut worlds = vec![Mat4::IDENTITY; locals.len()];
        let mut stack: Vec<(usize, Mat4)> =
            self.roots.iter().map(|&i| (i, Mat4::IDENTITY)).collect();
        while let Some((idx, parent)) = stack.pop() {
            let world = parent * locals[idx].to_mat4();
            worlds[idx] = world;
            stack.extend(self.children[idx].iter().map(|&child| (child, world)));
        }
        worlds
    }
}

enum Values {
    Translation(Vec<Vec3>),
    Rotation(Vec<Quat>),
    Scale(Vec<Vec3>),
}

struct Channel {
    node: usize,
    times: Vec<f32>,
    interpolation: Interpolation,
    values: Values,
}

fn bin_search_keys(times: &[f32], t: f32) -> (usize, usize) {
    let n = times.len();
    if n < 2 {
        return (0, 0);
    }
    match times.binary_search_by(|x| x.partial_cmp(&t).unwrap_or(Ordering::Greater)) {
        Ok(i) => (i, i),
        Err(0) => (0, 0),
        Err(i) if i >= n => (n - 1, n - 1),
        Err(i) => (i - 1, i),
    }
}

fn key_blend(times: &[f32], t: f32, interpolation: Interpolation) -> (usize, usize, f32) {
    let (i0, i1) = bin_search_keys(times, t);
    let (t0, t1) = (times[i0], times[i1]);
    let alpha = if i0 == i1 || (t1 - t0).abs() < f32::EPSILON {
        0.0
    } else {
        (t - t0) / (t1 - t0)
    };
    match interpolation {
        Interpolation::Step => (i0, i0, 0.0),
        _ => (i0, i1, alpha),
    }
}

impl Channel {
    fn apply(&self, t: f32, trs: &mut Trs) {
        if self.times.is_empty() {
            return;
        }
        let (i0, i1, alpha) = key_blend(&self.times, t, self.interpolation);
        match &self.values {
            Values::Translation(v) => trs.translation = v[i0].lerp(v[i1], alpha),
            Values::Rotation(v) => trs.rotation = v[i0].lerp(v[i1], alpha),
            Values::Scale(v) => trs.scale = v[i0].lerp(v[i1], alpha),
        }
    }
}

/// Cubic spline outputs come as (in-tangent, value, out-tangent) triplets.
fn keyframe_values<T: Copy>(raw: Vec<T>, interpolation: Interpolation) -> Vec<T> {
    match interpolation {
        Interpolation::CubicSpline => raw.chunks_exact(3).map(|c| c[1]).collect(),
        _ => raw,
    }
}

struct AnimationClip {
    duration: f32,
    channels: Vec<Channel>,
}

impl AnimationClip {
    fn read(animation: &gltf::Animation, buffers: &[gltf::buffer::Data]) -> Self {
        let mut channels = vec![];
        for channel in animation.channels() {
            let reader = channel.reader(|b| buffers.get(b.index()).map(|data| data.0.as_slice()));
            let interpolation = channel.sampler().interpolation();
            let Some(times) = reader.read_inputs().map(|iter| iter.collect::<Vec<f32>>()) else {
                continue;
            };
            let values = match reader.read_outputs() {
                Some(ReadOutputs::Translations(iter)) => Values::Translation(
                    keyframe_values(iter.map(Vec3::from).collect(), interpolation),
                ),
                Some(ReadOutputs::Rotations(rotations)) => Values::Rotation(keyframe_values(
                    rotations.into_f32().map(Quat::from_array).collect(),
                    interpolation,
                )),
                Some(ReadOutputs::Scales(iter)) => Values::Scale(keyframe_values(
                    iter.map(Vec3::from).collect(),
                    interpolation,
                )),
                Some(ReadOutputs::MorphTargetWeights(_)) => {
                    debug!("ignoring morph target channel");
                    continue;
                }
                None => continue,
            };
            let value_count = match &values {
                Values::Translation(v) | Values::Scale(v) => v.len(),
                Values::Rotation(v) => v.len(),
            };
            if value_count != times.len() {
                warn!(
                    "animation channel on node {} has {} keys but {} values, skipping",
                    channel.target().node().index(),
                    times.len(),
                    value_count
                );
                continue;
            }
            channels.push(Channel {
                node: channel.target().node().index(),
                times,
                interpolation,
                values,
            });
        }
        let duration = channels
            .iter()
            .filter_map(|c| c.times.last().copied())
            .fold(0f32, f32::max);
        Self { duration, channels }
    }

    fn pose(&self, rest: &[Trs], t: f32) -> Vec<Trs> {
        let mut locals = rest.to_vec();
        for channel in &self.channels {
            if let Some(trs) = locals.get_mut(channel.node) {
                channel.apply(t, trs);
            }
        }
        locals
    }
}

/// Sample time of 1-based frame `frame`.
pub fn frame_time(duration: f32, frame: u32, frames: u32) -> f32 {
    if frames <= 1 {
        0.0
    } else {
        duration * (frame - 1) as f32 / (frames - 1) as f32
    }
}

fn round4(value: f32) -> f32 {
    let rounded = (value * 10_000.0).round() / 10_000.0;
    // keep -0.0 out of the json
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

fn round_matrix(m: Mat4) -> [f32; 16] {
    m.to_cols_array().map(round4)
}

/// Picks the strongest influences and rescales them to sum to one. The result
/// is a dense list with one slot per joint.
pub fn normalize_influences(influences: &[(usize, f32)], joint_count: usize) -> Vec<f32> {
    let mut merged = vec![0f32; joint_count];
    for &(joint, weight) in influences {
        if let Some(slot) = merged.get_mut(joint) {
            *slot += weight;
        }
    }
    let mut ranked: Vec<(usize, f32)> = merged
        .iter()
        .copied()
        .enumerate()
        .filter(|(_, w)| *w > 0.0)
        .collect();
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    ranked.truncate(MAX_INFLUENCES);

    let sum: f32 = ranked.iter().map(|(_, w)| w).sum();
    let scale = if sum > 0.0 { sum } else { 1.0 };
    let mut dense = vec![0f32; joint_count];
    for (joint, weight) in ranked {
        dense[joint] = weight / scale;
    }
    dense
}

fn bake_weights(
    mesh: &gltf::Mesh,
    buffers: &[gltf::buffer::Data],
    joint_count: usize,
) -> Result<BTreeMap<String, Vec<f32>>> {
    let mut weights = BTreeMap::new();
    let mut vertex_offset = 0usize;
    for primitive in mesh.primitives().filter(is_renderable) {
        let reader = primitive.reader(|b| buffers.get(b.index()).map(|data| data.0.as_slice()));
        let position_count = reader.read_positions().map_or(0, |iter| iter.count());
        let (Some(joints), Some(vertex_weights)) = (reader.read_joints(0), reader.read_weights(0))
        else {
            return Err(DemoError::Bake(format!(
                "primitive {} of mesh {} has no JOINTS_0/WEIGHTS_0",
                primitive.index(),
                mesh.index()
            )));
        };
        for (i, (j, w)) in joints.into_u16().zip(vertex_weights.into_f32()).enumerate() {
            let influences: Vec<(usize, f32)> =
                j.iter().zip(w.iter()).map(|(&j, &w)| (j as usize, w)).collect();
            weights.insert(
                (vertex_offset + i).to_string(),
                normalize_influences(&influences, joint_count),
            );
        }
        vertex_offset += position_count;
    }
    if weights.is_empty() {
        return Err(DemoError::Bake(format!(
            "mesh {} has no skinned triangles",
            mesh.index()
        )));
    }
    Ok(weights)
}

pub fn bake_rig(
    document: &gltf::Document,
    buffers: &[gltf::buffer::Data],
    options: &BakeOptions,
) -> Result<RigExtras> {
    if options.frames == 0 {
        return Err(DemoError::Bake("frame count must be at least 1".into()));
    }
    let node = document
        .nodes()
        .find(|node| node.name() == Some(options.mesh_name.as_str()))
        .ok_or_else(|| DemoError::Bake(format!("no node named `{}`", options.mesh_name)))?;
    let mesh = node
        .mesh()
        .ok_or_else(|| DemoError::Bake(format!("node `{}` has no mesh", options.mesh_name)))?;
    let skin = node
        .skin()
        .ok_or_else(|| DemoError::Bake(format!("node `{}` has no skin", options.mesh_name)))?;

    let joints: Vec<usize> = skin.joints().map(|joint| joint.index()).collect();
    let inverse_binds: Vec<Mat4> = skin
        .reader(|b| buffers.get(b.index()).map(|data| data.0.as_slice()))
        .read_inverse_bind_matrices()
        .map(|iter| iter.map(|m| Mat4::from_cols_array_2d(&m)).collect())
        .unwrap_or_else(|| vec![Mat4::IDENTITY; joints.len()]);
    if inverse_binds.len() != joints.len() {
        return Err(DemoError::Bake(format!(
            "skin has {} joints but {} inverse bind matrices",
            joints.len(),
            inverse_binds.len()
        )));
    }

    let rest = RestPose::new(document);
    let clip = match document.animations().next() {
        Some(animation) => AnimationClip::read(&animation, buffers),
        None => {
            warn!("no animation found, every frame holds the rest pose");
            AnimationClip {
                duration: 0.0,
                channels: vec![],
            }
        }
    };

    let mut bone_mats = BTreeMap::new();
    for frame in 1..=options.frames {
        let t = frame_time(clip.duration, frame, options.frames);
        let worlds = rest.world_transforms(&clip.pose(&rest.locals, t));
        let mesh_inverse = worlds[node.index()].inverse();
        let matrices = joints
            .iter()
            .zip(&inverse_binds)
            .map(|(&joint, inverse_bind)| round_matrix(mesh_inverse * worlds[joint] * *inverse_bind))
            .collect();
        bone_mats.insert(frame.to_string(), matrices);
    }

    let bone_weights = bake_weights(&mesh, buffers, joints.len())?;
    info!(
        "baked {} frame(s) of {} bone(s), {} weighted vertices over {:.3}s",
        options.frames,
        joints.len(),
        bone_weights.len(),
        clip.duration
    );
    Ok(RigExtras {
        bone_mats: Some(bone_mats),
        bone_weights: Some(bone_weights),
    })
}

/// Rewrites a `.glb` with `extras` stored on the node named `mesh_name`.
/// Other keys already present in that node's extras are kept, and the rest
/// of the JSON chunk is carried over untouched.
pub fn write_baked_glb(bytes: &[u8], extras: &RigExtras, mesh_name: &str) -> Result<Vec<u8>> {
    let glb = gltf::binary::Glb::from_slice(bytes)?;
    let mut root: Value = serde_json::from_slice(&glb.json)?;

    let node = root
        .get_mut("nodes")
        .and_then(Value::as_array_mut)
        .and_then(|nodes| {
            nodes
                .iter_mut()
                .find(|node| node.get("name").and_then(Value::as_str) == Some(mesh_name))
        })
        .and_then(Value::as_object_mut)
        .ok_or_else(|| DemoError::Bake(format!("no node named `{mesh_name}`")))?;

    let mut merged = match node.remove("extras") {
        Some(Value::Object(map)) => map,
        Some(_) => {
            warn!("replacing non-object extras on node `{mesh_name}`");
            Map::new()
        }
        None => Map::new(),
    };
    if let Value::Object(rig) = serde_json::to_value(extras)? {
        merged.extend(rig);
    }
    node.insert("extras".to_owned(), Value::Object(merged));

    let json = serde_json::to_vec(&root)?;
    let out = gltf::binary::Glb {
        header: gltf::binary::Header {
            magic: *b"glTF",
            version: 2,
            // recomputed by to_vec
            length: 0,
        },
        json: Cow::Owned(json),
        bin: glb.bin,
    };
    Ok(out.to_vec()?)
}
