use pollster::FutureExt as _;

use crate::errors::{DemoError, Result};

/// Compiles WGSL under a validation error scope so a broken shader surfaces
/// as an error instead of a panic at pipeline creation.
pub fn create_shader_module(
    device: &wgpu::Device,
    slot: &str,
    source: &str,
) -> Result<wgpu::ShaderModule> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(slot),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    });
    match device.pop_error_scope().block_on() {
        Some(e) => Err(DemoError::Shader {
            slot: slot.to_string(),
            message: e.to_string(),
        }),
        None => Ok(module),
    }
}
