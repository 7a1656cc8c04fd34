use crate::{
    errors::Result,
    renderer::{
        attachments::shadow_map::ShadowMap,
        buffers::vertex::Vertex,
        shader_cache::{ShaderCache, SHADOW_SLOT},
        wgpu_context::WgpuContext,
        Layouts,
    },
};

/// Depth-only pipelines rendering shadow casters from the light.
pub struct ShadowPipelines {
    pub static_pipeline: wgpu::RenderPipeline,
    pub skinned_pipeline: wgpu::RenderPipeline,
}

impl ShadowPipelines {
    pub fn new(
        wgpu_context: &WgpuContext,
        shader_cache: &mut ShaderCache,
        layouts: &Layouts,
    ) -> Result<Self> {
        let shader_module = shader_cache.get(SHADOW_SLOT, &wgpu_context.device)?;
        let device = &wgpu_context.device;

        let static_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Static Shadow Pipeline Layout"),
            bind_group_layouts: &[&layouts.shadow_view, &layouts.empty, &layouts.object],
            push_constant_ranges: &[],
        });
        let skinned_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Skinned Shadow Pipeline Layout"),
            bind_group_layouts: &[
                &layouts.shadow_view,
                &layouts.empty,
                &layouts.object,
                &layouts.skinning,
            ],
            push_constant_ranges: &[],
        });

        Ok(Self {
            static_pipeline: Self::build_pipeline(
                device,
                "Static Shadow Pipeline",
                &static_layout,
                &shader_module,
                "vs_static",
            ),
            skinned_pipeline: Self::build_pipeline(
                device,
                "Skinned Shadow Pipeline",
                &skinned_layout,
                &shader_module,
                "vs_skinned",
            ),
        })
    }

    fn build_pipeline(
        device: &wgpu::Device,
        label: &str,
        layout: &wgpu::PipelineLayout,
        shader_module: &wgpu::ShaderModule,
        entry_point: &str,
    ) -> wgpu::RenderPipeline {
        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(label),
            layout: Some(layout),
            vertex: wgpu::VertexState {
                module: shader_module,
                entry_point: Some(entry_point),
                buffers: &[Vertex::desc()],
                compilation_options: Default::default(),
            },
            fragment: None,
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                front_face: wgpu::FrontFace::Ccw,
                // both faces, thin meshes would otherwise leak light
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: ShadowMap::FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::LessEqual,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState {
                    constant: 2,
                    slope_scale: 2.0,
                    clamp: 0.0,
                },
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        })
    }
}
