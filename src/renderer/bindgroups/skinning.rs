use wgpu::util::DeviceExt as _;

use crate::{clock::FrameSample, rig::SkinningData};

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SkinningGlobals {
    /// Milliseconds since start.
    pub time: f32,
    pub blend: f32,
    pub frame_a: u32,
    pub frame_b: u32,
    pub bone_count: u32,
    pub frame_count: u32,
    pub vertex_count: u32,
    pub _pad: u32,
}

impl SkinningGlobals {
    pub fn new(data: &SkinningData, time_ms: f64, sample: FrameSample) -> Self {
        let last = data.frame_count.saturating_sub(1) as u32;
        Self {
            time: time_ms as f32,
            blend: sample.blend.clamp(0.0, 1.0),
            frame_a: sample.frame_a.min(last),
            frame_b: sample.frame_b.min(last),
            bone_count: data.bone_count as u32,
            frame_count: data.frame_count as u32,
            vertex_count: data.vertex_count as u32,
            _pad: 0,
        }
    }
}

/// Bone palette and weights of one skinned mesh. Both storage buffers are
/// written once; only the globals change per frame.
pub struct SkinningBinding {
    globals_buffer: wgpu::Buffer,
    _bones_buffer: wgpu::Buffer,
    _weights_buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
}

impl SkinningBinding {
    pub fn desc() -> wgpu::BindGroupLayoutDescriptor<'static> {
        wgpu::BindGroupLayoutDescriptor {
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: true },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: true },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
            label: Some("Skinning Bind Group Layout"),
        }
    }

    pub fn new(device: &wgpu::Device, layout: &wgpu::BindGroupLayout, data: &SkinningData) -> Self {
        let globals = SkinningGlobals::new(data, 0.0, FrameSample::FIRST);
        let globals_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Skinning Globals Buffer"),
            contents: bytemuck::bytes_of(&globals),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bones_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Bones SSBO"),
            contents: bytemuck::cast_slice(&data.bones),
            usage: wgpu::BufferUsages::STORAGE,
        });
        let weights_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Bone Weights SSBO"),
            contents: bytemuck::cast_slice(&data.weights),
            usage: wgpu::BufferUsages::STORAGE,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Skinning Bind Group"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: globals_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: bones_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: weights_buffer.as_entire_binding(),
                },
            ],
        });
        Self {
            globals_buffer,
            _bones_buffer: bones_buffer,
            _weights_buffer: weights_buffer,
            bind_group,
        }
    }

    pub fn update(&self, queue: &wgpu::Queue, globals: &SkinningGlobals) {
        queue.write_buffer(&self.globals_buffer, 0, bytemuck::bytes_of(globals));
    }
}

#[cfg(test)]
mod tests {
    use glam::Mat4;

    use super::*;

    fn data(frame_count: usize) -> SkinningData {
        SkinningData {
            bone_count: 2,
            frame_count,
            vertex_count: 5,
            bones: vec![Mat4::IDENTITY; 2 * frame_count],
            weights: vec![0.0; 10],
        }
    }

    #[test]
    fn layout_matches_wgsl_struct() {
        assert_eq!(size_of::<SkinningGlobals>(), 32);
    }

    #[test]
    fn globals_carry_time_and_counts() {
        let sample = FrameSample {
            frame_a: 1,
            frame_b: 2,
            blend: 0.25,
        };
        let globals = SkinningGlobals::new(&data(3), 1500.0, sample);
        assert_eq!(globals.time, 1500.0);
        assert_eq!((globals.frame_a, globals.frame_b), (1, 2));
        assert_eq!(globals.blend, 0.25);
        assert_eq!(
            (globals.bone_count, globals.frame_count, globals.vertex_count),
            (2, 3, 5)
        );
    }

    #[test]
    fn frames_are_clamped_to_the_palette() {
        let sample = FrameSample {
            frame_a: 7,
            frame_b: 8,
            blend: 2.0,
        };
        let globals = SkinningGlobals::new(&data(3), 0.0, sample);
        assert_eq!((globals.frame_a, globals.frame_b), (2, 2));
        assert_eq!(globals.blend, 1.0);
    }
}
