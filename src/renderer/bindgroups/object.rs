use std::num::NonZeroU64;

use glam::Mat4;

use crate::align_to_256;

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ObjectUniform {
    pub model: [[f32; 4]; 4],
    pub normal_matrix: [[f32; 4]; 4],
    pub color: [f32; 4],
    /// x: receives shadows
    pub flags: [f32; 4],
}

impl ObjectUniform {
    pub fn new(model: Mat4, color: [f32; 4], receives_shadow: bool) -> Self {
        let normal_matrix = if model.determinant().abs() > f32::EPSILON {
            model.inverse().transpose()
        } else {
            Mat4::IDENTITY
        };
        Self {
            model: model.to_cols_array_2d(),
            normal_matrix: normal_matrix.to_cols_array_2d(),
            color,
            flags: [if receives_shadow { 1.0 } else { 0.0 }, 0.0, 0.0, 0.0],
        }
    }
}

/// One uniform slot per drawn node, addressed with a dynamic offset.
pub struct ObjectsBinding {
    buffer: wgpu::Buffer,
    capacity: usize,
    pub bind_group: wgpu::BindGroup,
}

impl ObjectsBinding {
    pub const STRIDE: usize = align_to_256(size_of::<ObjectUniform>());
    const BINDING_SIZE: Option<NonZeroU64> = NonZeroU64::new(size_of::<ObjectUniform>() as u64);

    pub fn desc() -> wgpu::BindGroupLayoutDescriptor<'static> {
        wgpu::BindGroupLayoutDescriptor {
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: Self::BINDING_SIZE,
                },
                count: None,
            }],
            label: Some("Object Bind Group Layout"),
        }
    }

    pub fn new(device: &wgpu::Device, layout: &wgpu::BindGroupLayout, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Object Buffer"),
            size: (capacity * Self::STRIDE) as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Object Bind Group"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &buffer,
                    offset: 0,
                    size: Self::BINDING_SIZE,
                }),
            }],
        });
        Self {
            buffer,
            capacity,
            bind_group,
        }
    }

    /// Writes all objects, growing the buffer first if needed.
    pub fn update(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layout: &wgpu::BindGroupLayout,
        objects: &[ObjectUniform],
    ) {
        if objects.len() > self.capacity {
            *self = Self::new(device, layout, objects.len().next_power_of_two());
        }
        for (i, object) in objects.iter().enumerate() {
            queue.write_buffer(
                &self.buffer,
                (i * Self::STRIDE) as wgpu::BufferAddress,
                bytemuck::bytes_of(object),
            );
        }
    }

    pub fn offset(index: usize) -> wgpu::DynamicOffset {
        (index * Self::STRIDE) as wgpu::DynamicOffset
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn layout_matches_wgsl_struct() {
        assert_eq!(size_of::<ObjectUniform>(), 160);
        assert_eq!(ObjectsBinding::STRIDE, 256);
        assert_eq!(ObjectsBinding::offset(3), 768);
    }

    #[test]
    fn normal_matrix_undoes_non_uniform_scale() {
        let model = Mat4::from_scale(Vec3::new(2.0, 1.0, 1.0));
        let object = ObjectUniform::new(model, [1.0; 4], true);
        let normal = Mat4::from_cols_array_2d(&object.normal_matrix);
        assert_eq!(normal.x_axis.x, 0.5);
        assert_eq!(object.flags[0], 1.0);
    }

    #[test]
    fn singular_model_falls_back_to_identity_normals() {
        let object = ObjectUniform::new(Mat4::ZERO, [1.0; 4], false);
        assert_eq!(object.normal_matrix, Mat4::IDENTITY.to_cols_array_2d());
        assert_eq!(object.flags[0], 0.0);
    }
}
