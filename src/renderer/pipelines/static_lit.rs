use crate::{
    errors::Result,
    renderer::{
        shader_cache::{ShaderCache, STATIC_SLOT},
        wgpu_context::WgpuContext,
        Layouts,
    },
};

pub struct StaticLitPipeline {
    pub render_pipeline: wgpu::RenderPipeline,
}

impl StaticLitPipeline {
    pub fn new(
        wgpu_context: &WgpuContext,
        shader_cache: &mut ShaderCache,
        layouts: &Layouts,
        sample_count: u32,
    ) -> Result<Self> {
        let shader_module = shader_cache.get(STATIC_SLOT, &wgpu_context.device)?;
        let render_pipeline = super::build_lit_pipeline(
            &wgpu_context.device,
            "Static Lit Pipeline",
            &shader_module,
            &[&layouts.camera, &layouts.lights, &layouts.object],
            wgpu_context.surface_config.format,
            sample_count,
        );
        Ok(Self { render_pipeline })
    }
}
