use crate::{
    errors::Result,
    renderer::{
        shader_cache::{ShaderCache, SKINNING_SLOT},
        wgpu_context::WgpuContext,
        Layouts,
    },
};

/// Lit pipeline whose vertex stage blends two baked bone palettes.
pub struct SkinnedPipeline {
    pub render_pipeline: wgpu::RenderPipeline,
}

impl SkinnedPipeline {
    pub fn new(
        wgpu_context: &WgpuContext,
        shader_cache: &mut ShaderCache,
        layouts: &Layouts,
        sample_count: u32,
    ) -> Result<Self> {
        let shader_module = shader_cache.get(SKINNING_SLOT, &wgpu_context.device)?;
        let render_pipeline = super::build_lit_pipeline(
            &wgpu_context.device,
            "Skinned Lit Pipeline",
            &shader_module,
            &[
                &layouts.camera,
                &layouts.lights,
                &layouts.object,
                &layouts.skinning,
            ],
            wgpu_context.surface_config.format,
            sample_count,
        );
        Ok(Self { render_pipeline })
    }
}
