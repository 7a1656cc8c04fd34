use log::info;

use super::attachments::{depth::DepthTexture, msaa::MsaaTexture, shadow_map::ShadowMap};
use super::bindgroups::{
    camera::CameraBinding,
    lights::{LightsBinding, SunUniform},
    object::ObjectsBinding,
    shadow_view::ShadowViewBinding,
    skinning::{SkinningBinding, SkinningGlobals},
};
use super::buffers::mesh::GpuMesh;
use super::pipelines::{
    shadow::ShadowPipelines, skinned::SkinnedPipeline, static_lit::StaticLitPipeline,
};
use super::prepare::{prepare_draws, Draw};
use super::shader_cache::ShaderCache;
use super::shadow::light_view_proj;
use super::wgpu_context::WgpuContext;

use crate::{clock::AnimationClock, errors::Result, scene_tree::Scene};

pub const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.2,
    g: 0.2,
    b: 0.3,
    a: 1.0,
};

pub struct Layouts {
    pub camera: wgpu::BindGroupLayout,
    pub lights: wgpu::BindGroupLayout,
    pub object: wgpu::BindGroupLayout,
    pub skinning: wgpu::BindGroupLayout,
    pub shadow_view: wgpu::BindGroupLayout,
    pub empty: wgpu::BindGroupLayout,
}

impl Layouts {
    pub fn new(device: &wgpu::Device) -> Self {
        Self {
            camera: device.create_bind_group_layout(&CameraBinding::desc()),
            lights: device.create_bind_group_layout(&LightsBinding::desc()),
            object: device.create_bind_group_layout(&ObjectsBinding::desc()),
            skinning: device.create_bind_group_layout(&SkinningBinding::desc()),
            shadow_view: device.create_bind_group_layout(&ShadowViewBinding::desc()),
            empty: device.create_bind_group_layout(&ShadowViewBinding::empty_desc()),
        }
    }
}

pub struct Renderer {
    pub layouts: Layouts,
    static_pipeline: StaticLitPipeline,
    skinned_pipeline: SkinnedPipeline,
    shadow_pipelines: ShadowPipelines,
    sample_count: u32,
    depth_texture: DepthTexture,
    msaa_texture: Option<MsaaTexture>,
    shadow_map: ShadowMap,
    camera: CameraBinding,
    lights: LightsBinding,
    shadow_view: ShadowViewBinding,
    empty_bind_group: wgpu::BindGroup,
    objects: ObjectsBinding,
    meshes: Vec<GpuMesh>,
    /// `None` where the data exceeds the device's storage binding limit.
    skinnings: Vec<Option<SkinningBinding>>,
}

impl Renderer {
    /// Uploads every scene mesh and skinning palette and builds the
    /// pipelines. Fails if a shader doesn't compile.
    pub fn new(wgpu_context: &WgpuContext, scene: &Scene, msaa_samples: u32) -> Result<Self> {
        let device = &wgpu_context.device;
        let sample_count = supported_sample_count(wgpu_context, msaa_samples);
        let layouts = Layouts::new(device);
        let mut shader_cache = ShaderCache::new();

        let static_pipeline =
            StaticLitPipeline::new(wgpu_context, &mut shader_cache, &layouts, sample_count)?;
        let skinned_pipeline =
            SkinnedPipeline::new(wgpu_context, &mut shader_cache, &layouts, sample_count)?;
        let shadow_pipelines = ShadowPipelines::new(wgpu_context, &mut shader_cache, &layouts)?;

        let depth_texture = DepthTexture::new(device, &wgpu_context.surface_config, sample_count);
        let msaa_texture =
            MsaaTexture::for_samples(device, &wgpu_context.surface_config, sample_count);
        let shadow_map = ShadowMap::new(device, scene.shadows.map_size);

        let camera = CameraBinding::new(device, &layouts.camera);
        let lights = LightsBinding::new(device, &layouts.lights, &shadow_map);
        let shadow_view = ShadowViewBinding::new(device, &layouts.shadow_view);
        let empty_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Empty Bind Group"),
            layout: &layouts.empty,
            entries: &[],
        });
        let objects = ObjectsBinding::new(device, &layouts.object, scene.nodes.len());

        let meshes = scene
            .meshes
            .iter()
            .enumerate()
            .map(|(i, mesh)| GpuMesh::upload(device, mesh, &format!("Mesh {i}")))
            .collect();
        let max_binding_size = u64::from(device.limits().max_storage_buffer_binding_size);
        let skinnings: Vec<_> = scene
            .skinnings
            .iter()
            .map(|data| {
                data.fits_storage_binding(max_binding_size)
                    .then(|| SkinningBinding::new(device, &layouts.skinning, data))
            })
            .collect();
        info!(
            "renderer ready: {} mesh(es), {} skinned, {}x msaa, {}px shadow map",
            scene.meshes.len(),
            skinnings.iter().flatten().count(),
            sample_count,
            shadow_map.size,
        );

        Ok(Self {
            layouts,
            static_pipeline,
            skinned_pipeline,
            shadow_pipelines,
            sample_count,
            depth_texture,
            msaa_texture,
            shadow_map,
            camera,
            lights,
            shadow_view,
            empty_bind_group,
            objects,
            meshes,
            skinnings,
        })
    }

    pub fn resize(&mut self, wgpu_context: &WgpuContext) {
        self.depth_texture = DepthTexture::new(
            &wgpu_context.device,
            &wgpu_context.surface_config,
            self.sample_count,
        );
        self.msaa_texture = MsaaTexture::for_samples(
            &wgpu_context.device,
            &wgpu_context.surface_config,
            self.sample_count,
        );
    }

    /// Draws one frame: shadow casters into the shadow map, then the lit
    /// scene into the surface.
    pub fn render(
        &mut self,
        wgpu_context: &WgpuContext,
        scene: &Scene,
        clock: &AnimationClock,
    ) -> std::result::Result<(), wgpu::SurfaceError> {
        let device = &wgpu_context.device;
        let queue = &wgpu_context.queue;

        self.camera.update(
            queue,
            scene.camera.view_proj(wgpu_context.aspect()),
            scene.camera.position(),
        );
        let light_view_proj = light_view_proj(
            scene.sun.direction,
            scene.camera.target,
            scene.sun.height,
            scene.shadows.extent,
        );
        self.shadow_view.update(queue, light_view_proj);
        self.lights.update(
            queue,
            &SunUniform::new(scene, light_view_proj, self.shadow_map.texel_size()),
        );

        let draws = prepare_draws(scene);
        self.objects
            .update(device, queue, &self.layouts.object, &draws.objects);
        for (binding, data) in self.skinnings.iter().zip(&scene.skinnings) {
            let Some(binding) = binding else {
                continue;
            };
            let sample = clock.sample(data.frame_count);
            binding.update(
                queue,
                &SkinningGlobals::new(data, clock.elapsed_ms(), sample),
            );
        }

        let output_surface_texture = wgpu_context.surface.get_current_texture()?;
        let output_view = output_surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Render Encoder"),
        });

        {
            let mut shadow_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Shadow Pass"),
                color_attachments: &[],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.shadow_map.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            shadow_pass.set_bind_group(0, &self.shadow_view.bind_group, &[]);
            shadow_pass.set_bind_group(1, &self.empty_bind_group, &[]);
            for draw in &draws.shadow_casters {
                let pipeline = match draw.skinning {
                    Some(_) => &self.shadow_pipelines.skinned_pipeline,
                    None => &self.shadow_pipelines.static_pipeline,
                };
                shadow_pass.set_pipeline(pipeline);
                self.draw(&mut shadow_pass, draw);
            }
        }

        {
            let (view, resolve_target) = match &self.msaa_texture {
                Some(msaa) => (&msaa.view, Some(&output_view)),
                None => (&output_view, None),
            };
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Main Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Discard,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            render_pass.set_bind_group(0, &self.camera.bind_group, &[]);
            render_pass.set_bind_group(1, &self.lights.bind_group, &[]);

            render_pass.set_pipeline(&self.static_pipeline.render_pipeline);
            for draw in &draws.static_draws {
                self.draw(&mut render_pass, draw);
            }
            render_pass.set_pipeline(&self.skinned_pipeline.render_pipeline);
            for draw in &draws.skinned_draws {
                self.draw(&mut render_pass, draw);
            }
        }

        queue.submit(Some(encoder.finish()));
        output_surface_texture.present();
        Ok(())
    }

    /// Binds the object slot (group 2) and, for skinned draws, the skinning
    /// group (3), then issues the indexed draw.
    fn draw(&self, render_pass: &mut wgpu::RenderPass<'_>, draw: &Draw) {
        let Some(mesh) = self.meshes.get(draw.mesh.0) else {
            return;
        };
        render_pass.set_bind_group(
            2,
            &self.objects.bind_group,
            &[ObjectsBinding::offset(draw.object)],
        );
        if let Some(skinning) = draw.skinning {
            let Some(Some(binding)) = self.skinnings.get(skinning.0) else {
                return;
            };
            render_pass.set_bind_group(3, &binding.bind_group, &[]);
        }
        mesh.draw(render_pass);
    }
}

/// Falls back to the highest count the surface format supports that doesn't
/// exceed the request.
fn supported_sample_count(wgpu_context: &WgpuContext, requested: u32) -> u32 {
    let flags = wgpu_context
        .adapter
        .get_texture_format_features(wgpu_context.surface_config.format)
        .flags;
    let chosen = [16, 8, 4, 2]
        .into_iter()
        .filter(|&count| count <= requested)
        .find(|&count| flags.sample_count_supported(count))
        .unwrap_or(1);
    if chosen != requested.max(1) {
        info!("msaa {requested}x not supported, using {chosen}x");
    }
    chosen
}
