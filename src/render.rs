//! The lit scene and its frame: models, light markers, then the skybox.

use anyhow::Context as _;

use crate::{
    config::{Config, ModelConfig},
    data_structures::texture::HdrImage,
    gui::UiSettings,
    ibl::{IblSettings, Skybox},
    pipelines::{
        light::{LightMarkers, Lights, LightsUniform},
        pbr::PbrPipeline,
    },
    resources::{ModelResources, ResourceManager, SceneModel},
    shader::{ShaderLibrary, UniformBuffer},
};

pub const CLEAR_COLOR: wgpu::Color = wgpu::Color::BLACK;

/// Everything drawn before the UI overlay.
#[derive(Debug)]
pub struct PbrScene {
    pub skybox: Skybox,
    pub models: Vec<SceneModel>,
    pub lights: Lights,
    pbr: PbrPipeline,
    markers: LightMarkers,
    model_resources: ModelResources,
    lights_uniform: UniformBuffer<LightsUniform>,
    environment_group: wgpu::BindGroup,
}

impl PbrScene {
    /// Bakes the environment and builds the pipelines. The scene starts
    /// without models.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        library: &ShaderLibrary,
        camera_layout: &wgpu::BindGroupLayout,
        color_format: wgpu::TextureFormat,
        hdr: &HdrImage,
        ibl: IblSettings,
        lights: Lights,
    ) -> anyhow::Result<Self> {
        let skybox = Skybox::new(device, queue, library, hdr, ibl, camera_layout, color_format)
            .context("failed to bake the environment")?;
        let (pbr, model_resources) =
            PbrPipeline::new(device, queue, library, camera_layout, color_format)?;
        let mut markers = LightMarkers::new(device, library, camera_layout, color_format)?;
        markers.update(queue, &lights);

        let lights_uniform = UniformBuffer::new(
            device,
            "Lights Uniform",
            lights.to_uniform(skybox.prefilter_max_lod()),
        );
        let environment_group = pbr.environment_layout.bind(device, &skybox, &lights_uniform);

        Ok(Self {
            skybox,
            models: Vec::new(),
            lights,
            pbr,
            markers,
            model_resources,
            lights_uniform,
            environment_group,
        })
    }

    /// Loads the environment and every model named by `config`. Any
    /// missing file fails the whole load.
    pub async fn load(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        camera_layout: &wgpu::BindGroupLayout,
        color_format: wgpu::TextureFormat,
        config: &Config,
    ) -> anyhow::Result<Self> {
        let manager = ResourceManager::new(&config.assets.root);
        let library = ShaderLibrary::builtin();
        let hdr = manager.load_hdr(&config.environment.hdr).await?;
        let mut scene = Self::new(
            device,
            queue,
            &library,
            camera_layout,
            color_format,
            &hdr,
            config.environment.ibl,
            config.lights(),
        )?;
        for model in config.models.iter() {
            scene.load_model(&manager, model, device, queue).await?;
        }
        log::info!("Scene ready with {} models", scene.models.len());
        Ok(scene)
    }

    pub async fn load_model(
        &mut self,
        manager: &ResourceManager,
        model: &ModelConfig,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
    ) -> anyhow::Result<()> {
        let kind = model.kind()?;
        let mut loaded = SceneModel::load(
            manager,
            &model.path,
            kind,
            model.obj_options(),
            device,
            queue,
            &self.model_resources,
        )
        .await?;
        loaded.set_transform(model.transform());
        loaded.update(queue);
        self.models.push(loaded);
        Ok(())
    }

    pub fn supports_wireframe(&self) -> bool {
        self.pbr.supports_wireframe()
    }

    /// Uploads whatever `settings` changed since the last frame.
    pub fn update(&mut self, queue: &wgpu::Queue, settings: &UiSettings) {
        self.lights.exposure = settings.exposure;
        let uniform = self.lights.to_uniform(self.skybox.prefilter_max_lod());
        if *self.lights_uniform.get() != uniform {
            self.lights_uniform.set(uniform);
            self.lights_uniform.write(queue);
        }
        self.skybox
            .update_background(queue, settings.background, settings.exposure);
        for model in &mut self.models {
            model.update(queue);
        }
    }

    /// Records the scene pass: clear, models, light markers, skybox.
    pub fn render(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        color: &wgpu::TextureView,
        depth: &wgpu::TextureView,
        camera_bind_group: &wgpu::BindGroup,
        settings: &UiSettings,
    ) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Scene Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: color,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: depth,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        if !self.models.is_empty() {
            self.pbr.bind(
                &mut pass,
                camera_bind_group,
                &self.environment_group,
                settings.wireframe,
            );
            for model in &self.models {
                model.draw(&mut pass);
            }
        }
        self.markers.draw(&mut pass, camera_bind_group);
        self.skybox
            .draw(&mut pass, camera_bind_group, settings.background);
    }
}
