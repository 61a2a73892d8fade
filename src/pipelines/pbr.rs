//! The lit pipeline: Cook-Torrance direct lighting from up to four point
//! lights plus image based ambient lighting.

use crate::{
    camera::{CAMERA_GROUP, check_camera_binding},
    data_structures::{
        material::{MaterialDefaults, MaterialLayout},
        model::{ModelVertex, Vertex},
        texture::{Texture, create_clamped_sampler},
        transform::ModelLayout,
    },
    ibl::Skybox,
    pipelines::{
        basic::{PipelineOptions, mk_render_pipeline},
        light::LightsUniform,
    },
    resources::ModelResources,
    shader::{ShaderError, ShaderLibrary, ShaderProgram, ShaderStageInfo, UniformBuffer},
};

pub const ENVIRONMENT_GROUP: u32 = 1;

fn cube_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            multisampled: false,
            view_dimension: wgpu::TextureViewDimension::Cube,
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
        },
        count: None,
    }
}

/// Group 1 of the PBR program: the baked maps, their sampler and the lights.
#[derive(Debug)]
pub struct EnvironmentLayout {
    pub layout: wgpu::BindGroupLayout,
    irradiance_slot: u32,
    prefilter_slot: u32,
    brdf_lut_slot: u32,
    sampler_slot: u32,
    lights_slot: u32,
}

impl EnvironmentLayout {
    pub fn new(device: &wgpu::Device, program: &ShaderProgram) -> Result<Self, ShaderError> {
        let irradiance_slot = program.slot("irradiance_map", ENVIRONMENT_GROUP)?;
        let prefilter_slot = program.slot("prefilter_map", ENVIRONMENT_GROUP)?;
        let brdf_lut_slot = program.slot("brdf_lut", ENVIRONMENT_GROUP)?;
        let sampler_slot = program.slot("environment_sampler", ENVIRONMENT_GROUP)?;
        let lights_slot = program.slot("lights", ENVIRONMENT_GROUP)?;

        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("environment_bind_group_layout"),
            entries: &[
                cube_entry(irradiance_slot),
                cube_entry(prefilter_slot),
                wgpu::BindGroupLayoutEntry {
                    binding: brdf_lut_slot,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        multisampled: false,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: sampler_slot,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: lights_slot,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: wgpu::BufferSize::new(
                            std::mem::size_of::<LightsUniform>() as u64,
                        ),
                    },
                    count: None,
                },
            ],
        });
        Ok(Self {
            layout,
            irradiance_slot,
            prefilter_slot,
            brdf_lut_slot,
            sampler_slot,
            lights_slot,
        })
    }

    pub fn bind(
        &self,
        device: &wgpu::Device,
        skybox: &Skybox,
        lights: &UniformBuffer<LightsUniform>,
    ) -> wgpu::BindGroup {
        let sampler = create_clamped_sampler(device, "environment sampler");
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("environment_bind_group"),
            layout: &self.layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: self.irradiance_slot,
                    resource: wgpu::BindingResource::TextureView(&skybox.irradiance.view),
                },
                wgpu::BindGroupEntry {
                    binding: self.prefilter_slot,
                    resource: wgpu::BindingResource::TextureView(&skybox.prefilter.view),
                },
                wgpu::BindGroupEntry {
                    binding: self.brdf_lut_slot,
                    resource: wgpu::BindingResource::TextureView(&skybox.brdf_lut.view),
                },
                wgpu::BindGroupEntry {
                    binding: self.sampler_slot,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
                wgpu::BindGroupEntry {
                    binding: self.lights_slot,
                    resource: lights.binding_resource(),
                },
            ],
        })
    }
}

/// Filled and, where the adapter allows it, wireframe variants of the PBR
/// pipeline, plus the layouts every model upload needs.
#[derive(Debug)]
pub struct PbrPipeline {
    pub environment_layout: EnvironmentLayout,
    fill: wgpu::RenderPipeline,
    wireframe: Option<wgpu::RenderPipeline>,
}

impl PbrPipeline {
    /// Also returns the material and model layouts, which are reflected
    /// from the same program.
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        library: &ShaderLibrary,
        camera_layout: &wgpu::BindGroupLayout,
        color_format: wgpu::TextureFormat,
    ) -> Result<(Self, ModelResources), ShaderError> {
        let program = ShaderProgram::new(
            device,
            "pbr.wgsl",
            library,
            &ShaderStageInfo::render("pbr.wgsl"),
        )?;
        check_camera_binding(&program)?;
        let environment_layout = EnvironmentLayout::new(device, &program)?;
        let material_layout = MaterialLayout::new(device, &program)?;
        let model_layout = ModelLayout::new(device, &program)?;

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("PBR Pipeline Layout"),
            // Index order has to match CAMERA_GROUP, ENVIRONMENT_GROUP,
            // MATERIAL_GROUP and MODEL_GROUP.
            bind_group_layouts: &[
                camera_layout,
                &environment_layout.layout,
                &material_layout.layout,
                &model_layout.layout,
            ],
            push_constant_ranges: &[],
        });

        let options = PipelineOptions::opaque(Texture::DEPTH_FORMAT);
        let fill = mk_render_pipeline(
            device,
            "PBR Pipeline",
            &layout,
            &program,
            color_format,
            &[ModelVertex::desc()],
            &options,
        )?;
        let wireframe = if device.features().contains(wgpu::Features::POLYGON_MODE_LINE) {
            Some(mk_render_pipeline(
                device,
                "PBR Wireframe Pipeline",
                &layout,
                &program,
                color_format,
                &[ModelVertex::desc()],
                &PipelineOptions {
                    polygon_mode: wgpu::PolygonMode::Line,
                    cull_mode: None,
                    ..options
                },
            )?)
        } else {
            log::info!("POLYGON_MODE_LINE unavailable, wireframe mode disabled");
            None
        };

        let resources = ModelResources {
            material_layout,
            model_layout,
            defaults: MaterialDefaults::new(device, queue),
        };
        Ok((
            Self {
                environment_layout,
                fill,
                wireframe,
            },
            resources,
        ))
    }

    pub fn supports_wireframe(&self) -> bool {
        self.wireframe.is_some()
    }

    /// Binds the pipeline plus the camera and environment groups. Models set
    /// the material and model groups themselves.
    pub fn bind(
        &self,
        pass: &mut wgpu::RenderPass<'_>,
        camera_bind_group: &wgpu::BindGroup,
        environment_bind_group: &wgpu::BindGroup,
        wireframe: bool,
    ) {
        let pipeline = match (&self.wireframe, wireframe) {
            (Some(line), true) => line,
            _ => &self.fill,
        };
        pass.set_pipeline(pipeline);
        pass.set_bind_group(CAMERA_GROUP, camera_bind_group, &[]);
        pass.set_bind_group(ENVIRONMENT_GROUP, environment_bind_group, &[]);
    }
}
