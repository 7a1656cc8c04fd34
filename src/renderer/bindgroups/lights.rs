use glam::Mat4;
use wgpu::util::DeviceExt as _;

use crate::{renderer::attachments::shadow_map::ShadowMap, scene_tree::Scene};

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SunUniform {
    pub direction: [f32; 4],
    pub color: [f32; 4],
    pub view_proj: [[f32; 4]; 4],
    /// x: darkness, y: shadow map texel size, z: pcf radius, w: ambient
    pub shadow: [f32; 4],
}

impl SunUniform {
    pub fn new(scene: &Scene, light_view_proj: Mat4, texel_size: f32) -> Self {
        Self {
            direction: scene.sun.direction.extend(0.0).to_array(),
            color: scene.sun.color.extend(1.0).to_array(),
            view_proj: light_view_proj.to_cols_array_2d(),
            shadow: [
                scene.shadows.darkness.clamp(0.0, 1.0),
                texel_size,
                scene.shadows.blur_scale as f32,
                scene.ambient,
            ],
        }
    }

    fn placeholder() -> Self {
        Self {
            direction: [0.0, -1.0, 0.0, 0.0],
            color: [1.0; 4],
            view_proj: Mat4::IDENTITY.to_cols_array_2d(),
            shadow: [1.0, 0.0, 0.0, 0.0],
        }
    }
}

pub struct LightsBinding {
    buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
}

impl LightsBinding {
    pub fn desc() -> wgpu::BindGroupLayoutDescriptor<'static> {
        wgpu::BindGroupLayoutDescriptor {
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Depth,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Comparison),
                    count: None,
                },
            ],
            label: Some("Lights Bind Group Layout"),
        }
    }

    pub fn new(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        shadow_map: &ShadowMap,
    ) -> Self {
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Sun Buffer"),
            contents: bytemuck::bytes_of(&SunUniform::placeholder()),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Lights Bind Group"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&shadow_map.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&shadow_map.sampler),
                },
            ],
        });
        Self { buffer, bind_group }
    }

    pub fn update(&self, queue: &wgpu::Queue, sun: &SunUniform) {
        queue.write_buffer(&self.buffer, 0, bytemuck::bytes_of(sun));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DemoConfig;

    #[test]
    fn layout_matches_wgsl_struct() {
        assert_eq!(size_of::<SunUniform>(), 112);
    }

    #[test]
    fn packs_shadow_settings() {
        let scene = Scene::build(&DemoConfig::default());
        let sun = SunUniform::new(&scene, Mat4::IDENTITY, 1.0 / 512.0);
        assert_eq!(sun.shadow, [0.2, 1.0 / 512.0, 2.0, 0.25]);
        assert_eq!(sun.direction[3], 0.0);
        assert!((sun.color[0] - 0.7).abs() < 1e-6);
    }
}
