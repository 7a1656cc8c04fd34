use std::{collections::HashMap, sync::Arc};

use log::debug;

use super::utils;
use crate::errors::{DemoError, Result};

pub const STATIC_SLOT: &str = "static";
pub const SKINNING_SLOT: &str = "skinning";
pub const SHADOW_SLOT: &str = "shadow";

const OBJECT_WGSL: &str = include_str!("shaders/object.wgsl");
const SKIN_WGSL: &str = include_str!("shaders/skin.wgsl");
const LIGHTING_WGSL: &str = include_str!("shaders/lighting.wgsl");
const STATIC_WGSL: &str = include_str!("shaders/static.wgsl");
const SKINNING_WGSL: &str = include_str!("shaders/skinning.wgsl");
const SHADOW_WGSL: &str = include_str!("shaders/shadow.wgsl");

fn compose(chunks: &[&str]) -> String {
    chunks.join("\n")
}

/// WGSL sources stored under named slots and compiled on first use.
pub struct ShaderCache {
    sources: HashMap<String, String>,
    cache: HashMap<String, Arc<wgpu::ShaderModule>>,
}

impl ShaderCache {
    pub fn new() -> Self {
        let mut shader_cache = Self {
            sources: HashMap::new(),
            cache: HashMap::new(),
        };
        shader_cache.register(STATIC_SLOT, compose(&[OBJECT_WGSL, LIGHTING_WGSL, STATIC_WGSL]));
        shader_cache.register(
            SKINNING_SLOT,
            compose(&[OBJECT_WGSL, SKIN_WGSL, LIGHTING_WGSL, SKINNING_WGSL]),
        );
        shader_cache.register(SHADOW_SLOT, compose(&[OBJECT_WGSL, SKIN_WGSL, SHADOW_WGSL]));
        shader_cache
    }

    /// Stores `source` under `slot`, dropping any module compiled from the
    /// previous source.
    pub fn register(&mut self, slot: &str, source: String) {
        self.cache.remove(slot);
        self.sources.insert(slot.to_string(), source);
    }

    pub fn source(&self, slot: &str) -> Option<&str> {
        self.sources.get(slot).map(String::as_str)
    }

    pub fn get(&mut self, slot: &str, device: &wgpu::Device) -> Result<Arc<wgpu::ShaderModule>> {
        if let Some(module) = self.cache.get(slot) {
            return Ok(module.clone());
        }
        let source = self.sources.get(slot).ok_or_else(|| DemoError::Shader {
            slot: slot.to_string(),
            message: "no source registered".to_string(),
        })?;
        debug!("compiling shader slot `{slot}`");
        let module = Arc::new(utils::create_shader_module(device, slot, source)?);
        self.cache.insert(slot.to_string(), module.clone());
        Ok(module)
    }
}

impl Default for ShaderCache {
    fn default() -> Self {
        Self::new()
    }
}
