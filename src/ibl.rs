//! Image based lighting: the skybox and the lighting maps baked from an
//! equirectangular HDR environment.
//!
//! [`Skybox::new`] runs the whole bake in a single command encoder:
//!
//! 1. the HDR image is projected onto the faces of the environment cubemap,
//! 2. the environment's mip chain is filled by successive 2x downsamples,
//! 3. the diffuse irradiance map is convolved from the environment,
//! 4. the specular prefilter map is convolved once per roughness mip,
//! 5. the split-sum BRDF lookup table is integrated on a fullscreen quad.
//!
//! Afterwards the skybox draws one of the cubemaps as the scene background.

use cgmath::{Deg, EuclideanSpace, Matrix4, Point3, Vector3};
use serde::{Deserialize, Serialize};

use crate::{
    camera::OPENGL_TO_WGPU_MATRIX,
    data_structures::{
        model::{SimpleVertex, Vertex},
        primitives::{self, PrimitiveMesh},
        texture::{self, HdrImage, Texture},
    },
    pipelines::basic::{DepthOptions, PipelineOptions, mk_render_pipeline},
    shader::{ShaderError, ShaderLibrary, ShaderProgram, ShaderStageInfo, UniformBuffer},
};

pub const BRDF_LUT_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rg16Float;

const CAPTURE_GROUP: u32 = 0;
const SOURCE_GROUP: u32 = 1;
const BACKGROUND_GROUP: u32 = 1;

/// Sizes of the baked maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IblSettings {
    /// Edge length of the environment cubemap.
    pub resolution: u32,
    pub irradiance_divisor: u32,
    pub prefilter_divisor: u32,
    pub prefilter_mips: u32,
    pub brdf_lut_size: u32,
}

impl Default for IblSettings {
    fn default() -> Self {
        Self {
            resolution: 512,
            irradiance_divisor: 16,
            prefilter_divisor: 4,
            prefilter_mips: 5,
            brdf_lut_size: 512,
        }
    }
}

impl IblSettings {
    pub fn irradiance_size(&self) -> u32 {
        (self.resolution / self.irradiance_divisor.max(1)).max(1)
    }

    pub fn prefilter_size(&self) -> u32 {
        (self.resolution / self.prefilter_divisor.max(1)).max(1)
    }

    /// Checks the map sizes against the device. The irradiance and prefilter
    /// maps are never larger than the environment.
    pub fn validate(&self, limits: &wgpu::Limits) -> anyhow::Result<()> {
        texture::check_texture_size(limits, self.resolution, self.resolution, "environment cubemap")?;
        texture::check_texture_size(limits, self.brdf_lut_size, self.brdf_lut_size, "BRDF LUT")?;
        Ok(())
    }

    /// Prefilter mips, limited to what the prefilter size allows.
    pub fn prefilter_mip_count(&self) -> u32 {
        self.prefilter_mips.clamp(1, mip_count(self.prefilter_size()))
    }
}

/// View matrices looking from the origin through the six cube faces, in
/// layer order +X, -X, +Y, -Y, +Z, -Z.
pub fn capture_views() -> [Matrix4<f32>; 6] {
    let eye = Point3::origin();
    let faces = [
        (Point3::new(1.0, 0.0, 0.0), Vector3::new(0.0, -1.0, 0.0)),
        (Point3::new(-1.0, 0.0, 0.0), Vector3::new(0.0, -1.0, 0.0)),
        (Point3::new(0.0, 1.0, 0.0), Vector3::new(0.0, 0.0, 1.0)),
        (Point3::new(0.0, -1.0, 0.0), Vector3::new(0.0, 0.0, -1.0)),
        (Point3::new(0.0, 0.0, 1.0), Vector3::new(0.0, -1.0, 0.0)),
        (Point3::new(0.0, 0.0, -1.0), Vector3::new(0.0, -1.0, 0.0)),
    ];
    faces.map(|(target, up)| Matrix4::look_at_rh(eye, target, up))
}

/// 90° square projection covering exactly one cube face.
///
/// Y is flipped: wgpu's framebuffer rows start at the top, and cube faces
/// are laid out with the first row at the bottom of the view.
pub fn capture_projection() -> Matrix4<f32> {
    let mut projection = OPENGL_TO_WGPU_MATRIX * cgmath::perspective(Deg(90.0), 1.0, 0.1, 10.0);
    projection.y.y = -projection.y.y;
    projection
}

/// Edge length of mip `level` of a texture `base` texels wide.
pub fn mip_size(base: u32, level: u32) -> u32 {
    base.checked_shr(level).unwrap_or(0).max(1)
}

/// Roughness the prefilter map stores at `level`, spread evenly over 0..=1.
pub fn prefilter_roughness(level: u32, mips: u32) -> f32 {
    if mips <= 1 {
        0.0
    } else {
        level.min(mips - 1) as f32 / (mips - 1) as f32
    }
}

/// Length of a full mip chain for a `size` texel wide texture.
pub fn mip_count(size: u32) -> u32 {
    u32::BITS - size.max(1).leading_zeros()
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CaptureUniform {
    pub view_proj: [[f32; 4]; 4],
    pub roughness: f32,
    /// Edge length of the environment's top mip, for source mip selection.
    pub source_resolution: f32,
    pub _padding: [f32; 2],
}

/// Which cubemap the background shows.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Background {
    #[default]
    Environment,
    Irradiance,
    Prefilter { lod: f32 },
}

impl Background {
    fn index(self) -> usize {
        match self {
            Background::Environment => 0,
            Background::Irradiance => 1,
            Background::Prefilter { .. } => 2,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Background::Environment => "Environment",
            Background::Irradiance => "Irradiance",
            Background::Prefilter { .. } => "Prefilter",
        }
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct BackgroundSettings {
    pub lod: f32,
    pub exposure: f32,
    pub _padding: [f32; 2],
}

/// Layout of a bake program's source texture and sampler (group 1).
fn source_layout(
    device: &wgpu::Device,
    program: &ShaderProgram,
    texture_name: &str,
    sampler_name: &str,
    view_dimension: wgpu::TextureViewDimension,
) -> Result<(wgpu::BindGroupLayout, [u32; 2]), ShaderError> {
    let slots = [
        program.slot(texture_name, SOURCE_GROUP)?,
        program.slot(sampler_name, SOURCE_GROUP)?,
    ];
    let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(&format!("{} source layout", program.name())),
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: slots[0],
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension,
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: slots[1],
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ],
    });
    Ok((layout, slots))
}

/// One cubemap convolution: a program, its pipeline and the layouts needed
/// to bind a source texture to it.
struct CapturePass {
    pipeline: wgpu::RenderPipeline,
    capture_group: wgpu::BindGroup,
    source_layout: wgpu::BindGroupLayout,
    source_slots: [u32; 2],
}

impl CapturePass {
    fn new(
        device: &wgpu::Device,
        library: &ShaderLibrary,
        file: &str,
        source_names: [&str; 2],
        view_dimension: wgpu::TextureViewDimension,
        captures: &CaptureBuffer,
        color_format: wgpu::TextureFormat,
    ) -> Result<Self, ShaderError> {
        let program = ShaderProgram::new(device, file, library, &ShaderStageInfo::render(file))?;
        let capture_slot = program.slot("capture", CAPTURE_GROUP)?;
        let capture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(&format!("{file} capture layout")),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: capture_slot,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: wgpu::BufferSize::new(
                        std::mem::size_of::<CaptureUniform>() as u64
                    ),
                },
                count: None,
            }],
        });
        let capture_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&format!("{file} capture group")),
            layout: &capture_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: capture_slot,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &captures.buffer,
                    offset: 0,
                    size: wgpu::BufferSize::new(std::mem::size_of::<CaptureUniform>() as u64),
                }),
            }],
        });
        let (source_layout, source_slots) = source_layout(
            device,
            &program,
            source_names[0],
            source_names[1],
            view_dimension,
        )?;
        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(&format!("{file} pipeline layout")),
            bind_group_layouts: &[&capture_layout, &source_layout],
            push_constant_ranges: &[],
        });
        let pipeline = mk_render_pipeline(
            device,
            file,
            &layout,
            &program,
            color_format,
            &[SimpleVertex::desc()],
            &PipelineOptions::capture(wgpu::PrimitiveTopology::TriangleList),
        )?;
        Ok(Self {
            pipeline,
            capture_group,
            source_layout,
            source_slots,
        })
    }

    fn source_group(
        &self,
        device: &wgpu::Device,
        view: &wgpu::TextureView,
        sampler: &wgpu::Sampler,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("capture source group"),
            layout: &self.source_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: self.source_slots[0],
                    resource: wgpu::BindingResource::TextureView(view),
                },
                wgpu::BindGroupEntry {
                    binding: self.source_slots[1],
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        })
    }

    /// Renders the six faces of `target` at `mip_level`. Capture uniforms
    /// are read from `first_capture` onwards.
    fn render_faces(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        captures: &CaptureBuffer,
        first_capture: u32,
        source: &wgpu::BindGroup,
        cube: &PrimitiveMesh,
        target: &Texture,
        mip_level: u32,
    ) {
        for face in 0..6 {
            let view = target.face_view(face, mip_level);
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Capture Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(
                CAPTURE_GROUP,
                &self.capture_group,
                &[captures.offset(first_capture + face)],
            );
            pass.set_bind_group(SOURCE_GROUP, source, &[]);
            cube.draw(&mut pass, 0..1);
        }
    }
}

/// Every capture uniform of the bake in one buffer, addressed by dynamic
/// offsets. Entry `mip * 6 + face` holds the prefilter roughness of `mip`;
/// the first six entries double as the plain face captures.
struct CaptureBuffer {
    buffer: wgpu::Buffer,
    stride: u32,
}

impl CaptureBuffer {
    fn new(device: &wgpu::Device, mips: u32, source_resolution: u32) -> Self {
        use wgpu::util::DeviceExt;

        let alignment = device.limits().min_uniform_buffer_offset_alignment;
        let size = std::mem::size_of::<CaptureUniform>() as u32;
        let stride = size.div_ceil(alignment) * alignment;

        let projection = capture_projection();
        let views = capture_views();
        let mut contents = vec![0u8; (stride * mips * 6) as usize];
        for mip in 0..mips {
            for (face, view) in views.iter().enumerate() {
                let uniform = CaptureUniform {
                    view_proj: (projection * view).into(),
                    roughness: prefilter_roughness(mip, mips),
                    source_resolution: source_resolution as f32,
                    _padding: [0.0; 2],
                };
                let start = ((mip * 6 + face as u32) * stride) as usize;
                contents[start..start + size as usize].copy_from_slice(bytemuck::bytes_of(&uniform));
            }
        }
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Capture Uniforms"),
            contents: &contents,
            usage: wgpu::BufferUsages::UNIFORM,
        });
        Self { buffer, stride }
    }

    fn offset(&self, index: u32) -> u32 {
        index * self.stride
    }
}

fn brdf_lut(
    device: &wgpu::Device,
    library: &ShaderLibrary,
    encoder: &mut wgpu::CommandEncoder,
    size: u32,
) -> Result<Texture, ShaderError> {
    let program = ShaderProgram::new(
        device,
        "brdf.wgsl",
        library,
        &ShaderStageInfo::render("brdf.wgsl"),
    )?;
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("brdf pipeline layout"),
        bind_group_layouts: &[],
        push_constant_ranges: &[],
    });
    let pipeline = mk_render_pipeline(
        device,
        "brdf.wgsl",
        &layout,
        &program,
        BRDF_LUT_FORMAT,
        &[SimpleVertex::desc()],
        &PipelineOptions::capture(wgpu::PrimitiveTopology::TriangleStrip),
    )?;
    let quad = PrimitiveMesh::new(device, "BRDF Quad", &primitives::quad());
    let lut = Texture::create_render_target(device, [size, size], BRDF_LUT_FORMAT, "BRDF LUT");

    let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some("BRDF Pass"),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view: &lut.view,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                store: wgpu::StoreOp::Store,
            },
        })],
        depth_stencil_attachment: None,
        occlusion_query_set: None,
        timestamp_writes: None,
    });
    pass.set_pipeline(&pipeline);
    quad.draw(&mut pass, 0..1);
    drop(pass);
    Ok(lut)
}

/// The baked lighting maps plus everything needed to draw the background.
#[derive(Debug)]
pub struct Skybox {
    pub environment: Texture,
    pub irradiance: Texture,
    pub prefilter: Texture,
    pub brdf_lut: Texture,
    pub settings: IblSettings,
    cube: PrimitiveMesh,
    pipeline: wgpu::RenderPipeline,
    /// Environment, irradiance and prefilter, in [`Background`] order.
    background_groups: [wgpu::BindGroup; 3],
    background: UniformBuffer<BackgroundSettings>,
}

impl Skybox {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        library: &ShaderLibrary,
        hdr: &HdrImage,
        settings: IblSettings,
        camera_layout: &wgpu::BindGroupLayout,
        color_format: wgpu::TextureFormat,
    ) -> anyhow::Result<Self> {
        settings.validate(&device.limits())?;
        let resolution = settings.resolution;
        let prefilter_mips = settings.prefilter_mip_count();
        log::info!(
            "Baking IBL maps: environment {}², irradiance {}², prefilter {}² x {} mips, BRDF LUT {}²",
            resolution,
            settings.irradiance_size(),
            settings.prefilter_size(),
            prefilter_mips,
            settings.brdf_lut_size
        );

        let equirect = Texture::from_hdr(device, queue, hdr, "equirect environment")?;
        let sampler = texture::create_clamped_sampler(device, "capture sampler");
        let cube = PrimitiveMesh::new(device, "Skybox Cube", &primitives::cube());
        let captures = CaptureBuffer::new(device, prefilter_mips, resolution);

        let cube_dim = wgpu::TextureViewDimension::Cube;
        let equirect_pass = CapturePass::new(
            device,
            library,
            "equirect_to_cubemap.wgsl",
            ["equirect_map", "equirect_sampler"],
            wgpu::TextureViewDimension::D2,
            &captures,
            Texture::CUBE_FORMAT,
        )?;
        let mipmap_pass = CapturePass::new(
            device,
            library,
            "mipmap.wgsl",
            ["source_map", "source_sampler"],
            cube_dim,
            &captures,
            Texture::CUBE_FORMAT,
        )?;
        let irradiance_pass = CapturePass::new(
            device,
            library,
            "irradiance_convolution.wgsl",
            ["environment_map", "environment_sampler"],
            cube_dim,
            &captures,
            Texture::CUBE_FORMAT,
        )?;
        let prefilter_pass = CapturePass::new(
            device,
            library,
            "prefilter.wgsl",
            ["environment_map", "environment_sampler"],
            cube_dim,
            &captures,
            Texture::CUBE_FORMAT,
        )?;

        let environment_mips = mip_count(resolution);
        let environment = Texture::create_cube(device, resolution, environment_mips, "Environment Map");
        let irradiance = Texture::create_cube(device, settings.irradiance_size(), 1, "Irradiance Map");
        let prefilter = Texture::create_cube(
            device,
            settings.prefilter_size(),
            prefilter_mips,
            "Prefilter Map",
        );

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("IBL Bake Encoder"),
        });

        let source = equirect_pass.source_group(device, &equirect.view, &sampler);
        equirect_pass.render_faces(&mut encoder, &captures, 0, &source, &cube, &environment, 0);

        for mip in 1..environment_mips {
            let previous = environment.cube_mip_view(mip - 1);
            let source = mipmap_pass.source_group(device, &previous, &sampler);
            mipmap_pass.render_faces(&mut encoder, &captures, 0, &source, &cube, &environment, mip);
        }

        let source = irradiance_pass.source_group(device, &environment.view, &sampler);
        irradiance_pass.render_faces(&mut encoder, &captures, 0, &source, &cube, &irradiance, 0);

        let source = prefilter_pass.source_group(device, &environment.view, &sampler);
        for mip in 0..prefilter_mips {
            prefilter_pass.render_faces(&mut encoder, &captures, mip * 6, &source, &cube, &prefilter, mip);
        }

        let brdf_lut = brdf_lut(device, library, &mut encoder, settings.brdf_lut_size)?;
        queue.submit(std::iter::once(encoder.finish()));
        log::info!("IBL bake submitted");

        let (pipeline, background_layout, slots) =
            background_pipeline(device, library, camera_layout, color_format)?;
        let background = UniformBuffer::new(
            device,
            "Background Settings",
            BackgroundSettings {
                lod: 0.0,
                exposure: 1.0,
                _padding: [0.0; 2],
            },
        );
        let background_groups = [&environment, &irradiance, &prefilter].map(|map| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("background group"),
                layout: &background_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: slots[0],
                        resource: wgpu::BindingResource::TextureView(&map.view),
                    },
                    wgpu::BindGroupEntry {
                        binding: slots[1],
                        resource: wgpu::BindingResource::Sampler(&sampler),
                    },
                    wgpu::BindGroupEntry {
                        binding: slots[2],
                        resource: background.binding_resource(),
                    },
                ],
            })
        });

        Ok(Self {
            environment,
            irradiance,
            prefilter,
            brdf_lut,
            settings: IblSettings {
                prefilter_mips,
                ..settings
            },
            cube,
            pipeline,
            background_groups,
            background,
        })
    }

    /// Highest mip of the prefilter map, the LOD of roughness one.
    pub fn prefilter_max_lod(&self) -> f32 {
        (self.settings.prefilter_mips - 1) as f32
    }

    /// Uploads the background LOD and exposure.
    pub fn update_background(&mut self, queue: &wgpu::Queue, background: Background, exposure: f32) {
        let lod = match background {
            Background::Prefilter { lod } => lod.clamp(0.0, self.prefilter_max_lod()),
            Background::Environment | Background::Irradiance => 0.0,
        };
        let settings = BackgroundSettings {
            lod,
            exposure,
            _padding: [0.0; 2],
        };
        if *self.background.get() != settings {
            self.background.set(settings);
            self.background.write(queue);
        }
    }

    /// Draws the background cube. It lands on the far plane, so it is drawn
    /// after the opaque geometry and only fills the uncovered pixels.
    pub fn draw(
        &self,
        pass: &mut wgpu::RenderPass<'_>,
        camera_bind_group: &wgpu::BindGroup,
        background: Background,
    ) {
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(crate::camera::CAMERA_GROUP, camera_bind_group, &[]);
        pass.set_bind_group(BACKGROUND_GROUP, &self.background_groups[background.index()], &[]);
        self.cube.draw(pass, 0..1);
    }
}

fn background_pipeline(
    device: &wgpu::Device,
    library: &ShaderLibrary,
    camera_layout: &wgpu::BindGroupLayout,
    color_format: wgpu::TextureFormat,
) -> Result<(wgpu::RenderPipeline, wgpu::BindGroupLayout, [u32; 3]), ShaderError> {
    let program = ShaderProgram::new(
        device,
        "background.wgsl",
        library,
        &ShaderStageInfo::render("background.wgsl"),
    )?;
    crate::camera::check_camera_binding(&program)?;
    let slots = [
        program.slot("background_map", BACKGROUND_GROUP)?,
        program.slot("background_sampler", BACKGROUND_GROUP)?,
        program.slot("background", BACKGROUND_GROUP)?,
    ];
    let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("background layout"),
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: slots[0],
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension: wgpu::TextureViewDimension::Cube,
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: slots[1],
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: slots[2],
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
        ],
    });
    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Skybox Pipeline Layout"),
        bind_group_layouts: &[camera_layout, &layout],
        push_constant_ranges: &[],
    });
    let pipeline = mk_render_pipeline(
        device,
        "Skybox Pipeline",
        &pipeline_layout,
        &program,
        color_format,
        &[SimpleVertex::desc()],
        &PipelineOptions {
            cull_mode: None,
            depth: Some(DepthOptions {
                format: Texture::DEPTH_FORMAT,
                write: false,
                compare: wgpu::CompareFunction::LessEqual,
            }),
            ..Default::default()
        },
    )?;
    Ok((pipeline, layout, slots))
}
