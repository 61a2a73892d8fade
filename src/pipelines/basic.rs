use crate::shader::{ShaderError, ShaderProgram, ShaderStage};

/// Depth test settings of a pipeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthOptions {
    pub format: wgpu::TextureFormat,
    pub write: bool,
    pub compare: wgpu::CompareFunction,
}

/// Fixed-function state that differs between the renderer's pipelines.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineOptions {
    pub topology: wgpu::PrimitiveTopology,
    pub cull_mode: Option<wgpu::Face>,
    pub polygon_mode: wgpu::PolygonMode,
    pub depth: Option<DepthOptions>,
    pub blend: Option<wgpu::BlendState>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            topology: wgpu::PrimitiveTopology::TriangleList,
            cull_mode: Some(wgpu::Face::Back),
            polygon_mode: wgpu::PolygonMode::Fill,
            depth: None,
            blend: Some(wgpu::BlendState::REPLACE),
        }
    }
}

impl PipelineOptions {
    /// Opaque geometry with depth test and write.
    pub fn opaque(depth_format: wgpu::TextureFormat) -> Self {
        Self {
            depth: Some(DepthOptions {
                format: depth_format,
                write: true,
                compare: wgpu::CompareFunction::Less,
            }),
            ..Default::default()
        }
    }

    /// Offscreen passes without depth or culling, as used by the bakes.
    pub fn capture(topology: wgpu::PrimitiveTopology) -> Self {
        Self {
            topology,
            cull_mode: None,
            ..Default::default()
        }
    }
}

/// Index format of strip topologies. Every index buffer here is u32.
fn strip_index_format(topology: wgpu::PrimitiveTopology) -> Option<wgpu::IndexFormat> {
    topology.is_strip().then_some(wgpu::IndexFormat::Uint32)
}

/// Builds a render pipeline from the vertex and fragment stages of `program`.
pub fn mk_render_pipeline(
    device: &wgpu::Device,
    label: &str,
    layout: &wgpu::PipelineLayout,
    program: &ShaderProgram,
    color_format: wgpu::TextureFormat,
    vertex_layouts: &[wgpu::VertexBufferLayout],
    options: &PipelineOptions,
) -> Result<wgpu::RenderPipeline, ShaderError> {
    let vertex = program.module(ShaderStage::Vertex)?;
    let fragment = program.module(ShaderStage::Fragment)?;

    Ok(device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        cache: None,
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: vertex,
            entry_point: Some(program.entry_point(ShaderStage::Vertex)),
            buffers: vertex_layouts,
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: fragment,
            entry_point: Some(program.entry_point(ShaderStage::Fragment)),
            targets: &[Some(wgpu::ColorTargetState {
                format: color_format,
                blend: options.blend,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: options.topology,
            strip_index_format: strip_index_format(options.topology),
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: options.cull_mode,
            polygon_mode: options.polygon_mode,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: options.depth.map(|depth| wgpu::DepthStencilState {
            format: depth.format,
            depth_write_enabled: depth.write,
            depth_compare: depth.compare,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview: None,
    }))
}
