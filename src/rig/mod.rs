//! Baked skinning metadata.
//!
//! A rigged asset carries two maps in the `extras` of its mesh node:
//! `boneMats` (1-based frame number -> column-major 4x4 bone matrices) and
//! `boneWeights` (vertex id -> one weight per bone). [`SkinningData`] turns
//! them into the dense layout the skinning shader reads.

use std::collections::BTreeMap;

use glam::Mat4;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

pub mod bake;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RigExtras {
    #[serde(rename = "boneMats", default, skip_serializing_if = "Option::is_none")]
    pub bone_mats: Option<BTreeMap<String, Vec<[f32; 16]>>>,
    #[serde(rename = "boneWeights", default, skip_serializing_if = "Option::is_none")]
    pub bone_weights: Option<BTreeMap<String, Vec<f32>>>,
}

impl RigExtras {
    /// Reads the rig maps out of a node's extras. Absent or unreadable
    /// extras yield `None`.
    pub fn from_node(node: &gltf::Node) -> Option<Self> {
        let raw = node.extras().as_ref()?;
        Self::from_json(raw.get(), node.name().unwrap_or("<unnamed>"))
    }

    pub fn from_json(json: &str, node_name: &str) -> Option<Self> {
        match serde_json::from_str::<RigExtras>(json) {
            Ok(extras) if extras.bone_mats.is_some() || extras.bone_weights.is_some() => {
                Some(extras)
            }
            Ok(_) => {
                debug!("node `{node_name}` has extras but no rig data");
                None
            }
            Err(e) => {
                warn!("ignoring malformed rig extras on node `{node_name}`: {e}");
                None
            }
        }
    }
}

/// Finds the node called `mesh_name` and reads its rig extras.
pub fn find_rig_extras(document: &gltf::Document, mesh_name: &str) -> Option<RigExtras> {
    let node = document
        .nodes()
        .find(|node| node.name() == Some(mesh_name))?;
    RigExtras::from_node(&node)
}

/// Largest frame number, as a multiple of the frames actually present, that
/// still gets a palette slot.
pub const MAX_FRAME_SPREAD: usize = 4;

fn parse_key(key: &str) -> Option<u32> {
    key.trim().parse::<u32>().ok()
}

/// GPU-ready skinning data for one mesh.
///
/// `bones` is frame-major (`frame * bone_count + bone`), `weights` is
/// vertex-major (`vertex * bone_count + bone`).
#[derive(Debug, Clone, PartialEq)]
pub struct SkinningData {
    pub bone_count: usize,
    pub frame_count: usize,
    pub vertex_count: usize,
    pub bones: Vec<Mat4>,
    pub weights: Vec<f32>,
}

impl SkinningData {
    /// Returns `None` when either map is missing or holds nothing usable.
    ///
    /// Frame `n` lands in palette slot `n - 1`. The bone count comes from the
    /// lowest-numbered frame; other frames are padded with identity or cut.
    /// Frames missing from the map repeat the closest earlier frame. Frame
    /// numbers past [`MAX_FRAME_SPREAD`] times the number of present frames
    /// are skipped.
    pub fn from_extras(extras: &RigExtras, vertex_count: usize) -> Option<Self> {
        let mats = extras.bone_mats.as_ref().filter(|m| !m.is_empty())?;
        let weights = extras.bone_weights.as_ref().filter(|w| !w.is_empty())?;
        if vertex_count == 0 {
            return None;
        }

        let mut frames = BTreeMap::<u32, &Vec<[f32; 16]>>::new();
        for (key, matrices) in mats {
            match parse_key(key) {
                Some(frame) if frame > 0 => {
                    frames.insert(frame, matrices);
                }
                _ => warn!("skipping bone matrices with frame key `{key}`"),
            }
        }
        let max_frame = frames.len().saturating_mul(MAX_FRAME_SPREAD);
        let first_skipped = u32::try_from(max_frame)
            .unwrap_or(u32::MAX)
            .saturating_add(1);
        let out_of_range = frames.split_off(&first_skipped);
        if !out_of_range.is_empty() {
            warn!(
                "skipping {} frame(s) numbered past {max_frame}",
                out_of_range.len()
            );
        }

        let (_, first) = frames.first_key_value()?;
        let bone_count = first.len();
        if bone_count == 0 {
            return None;
        }
        let frame_count = *frames.last_key_value()?.0 as usize;
        let palette_len = frame_count.checked_mul(bone_count)?;
        let weights_len = vertex_count.checked_mul(bone_count)?;

        let mut bones = Vec::with_capacity(palette_len);
        let mut mismatched = 0usize;
        let mut previous = *first;
        for frame in 1..=frame_count as u32 {
            let source = frames.get(&frame).copied().unwrap_or(previous);
            if source.len() != bone_count {
                mismatched += 1;
            }
            bones.extend(
                (0..bone_count).map(|bone| {
                    source
                        .get(bone)
                        .map_or(Mat4::IDENTITY, Mat4::from_cols_array)
                }),
            );
            previous = source;
        }
        if mismatched > 0 {
            warn!("{mismatched} frame(s) don't have {bone_count} bone matrices");
        }

        let mut dense = vec![0f32; weights_len];
        let mut dropped = 0usize;
        for (key, list) in weights {
            let vertex = match parse_key(key) {
                Some(v) if (v as usize) < vertex_count => v as usize,
                _ => {
                    dropped += 1;
                    continue;
                }
            };
            let n = list.len().min(bone_count);
            let start = vertex * bone_count;
            dense[start..start + n].copy_from_slice(&list[..n]);
        }
        if dropped > 0 {
            warn!("dropped {dropped} bone weight entries outside of {vertex_count} vertices");
        }

        Some(Self {
            bone_count,
            frame_count,
            vertex_count,
            bones,
            weights: dense,
        })
    }

    /// The `bone_count` matrices of palette slot `frame`.
    pub fn frame_palette(&self, frame: usize) -> Option<&[Mat4]> {
        let start = frame.checked_mul(self.bone_count)?;
        self.bones.get(start..start.checked_add(self.bone_count)?)
    }

    pub fn vertex_weights(&self, vertex: usize) -> Option<&[f32]> {
        let start = vertex.checked_mul(self.bone_count)?;
        self.weights.get(start..start.checked_add(self.bone_count)?)
    }

    /// Byte sizes of the bone palette and weight storage buffers.
    pub fn storage_sizes(&self) -> (u64, u64) {
        (
            (self.bones.len() * std::mem::size_of::<Mat4>()) as u64,
            (self.weights.len() * std::mem::size_of::<f32>()) as u64,
        )
    }

    /// Whether both storage buffers can be bound whole under
    /// `max_binding_size`.
    pub fn fits_storage_binding(&self, max_binding_size: u64) -> bool {
        let (bones, weights) = self.storage_sizes();
        bones <= max_binding_size && weights <= max_binding_size
    }
}
