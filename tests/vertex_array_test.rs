#[cfg(feature = "integration-tests")]
mod common;

#[cfg(feature = "integration-tests")]
const FLAT_SHADER: &str = r#"
@vertex
fn vs_main(@location(0) position: vec3<f32>) -> @builtin(position) vec4<f32> {
    return vec4<f32>(position, 1.0);
}

@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return vec4<f32>(1.0, 0.0, 0.0, 1.0);
}
"#;

/// Draws `vao` in solid red onto a black 8x8 target and returns its RGBA8 bytes.
#[cfg(feature = "integration-tests")]
fn draw_red(
    gpu: &common::Gpu,
    vao: &ibl_ngin::data_structures::vertex_array::VertexArray,
    topology: wgpu::PrimitiveTopology,
) -> Vec<u8> {
    use ibl_ngin::{
        data_structures::model::{SimpleVertex, Vertex},
        pipelines::basic::{PipelineOptions, mk_render_pipeline},
        shader::{ShaderLibrary, ShaderProgram, ShaderStageInfo},
    };

    let format = wgpu::TextureFormat::Rgba8Unorm;
    let mut library = ShaderLibrary::builtin();
    library.insert("flat.wgsl", FLAT_SHADER);
    let program = ShaderProgram::new(
        &gpu.device,
        "flat.wgsl",
        &library,
        &ShaderStageInfo::render("flat.wgsl"),
    )
    .expect("flat program");
    let layout = gpu
        .device
        .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: None,
            bind_group_layouts: &[],
            push_constant_ranges: &[],
        });
    let pipeline = mk_render_pipeline(
        &gpu.device,
        "flat",
        &layout,
        &program,
        format,
        &[SimpleVertex::desc()],
        &PipelineOptions::capture(topology),
    )
    .expect("flat pipeline");

    let target = gpu.target(8, format);
    let mut encoder = gpu
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });
    {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: None,
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &target.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        pass.set_pipeline(&pipeline);
        vao.draw(&mut pass, 0..1);
    }
    gpu.queue.submit(std::iter::once(encoder.finish()));
    gpu.read(&target.texture, 0, 0).bytes
}

#[test]
#[cfg(feature = "integration-tests")]
fn quad_strip_covers_the_target() {
    use ibl_ngin::data_structures::{primitives, vertex_array::VertexArray};

    let gpu = common::Gpu::new();
    let quad = primitives::quad();
    let vao = VertexArray::from_data(&gpu.device, "quad", &quad.vertices, None);
    assert_eq!(vao.count(), 4);

    let bytes = draw_red(&gpu, &vao, quad.topology);
    for texel in bytes.chunks_exact(4) {
        assert_eq!(texel, [255, 0, 0, 255]);
    }
}

#[test]
#[cfg(feature = "integration-tests")]
fn dynamic_buffers_take_updates() {
    use ibl_ngin::data_structures::{
        model::SimpleVertex,
        primitives,
        vertex_array::{BufferType, DrawMode, VertexArray},
    };

    let gpu = common::Gpu::new();
    let quad = primitives::quad();
    let mut vao = VertexArray::new("moving quad");
    vao.attach_buffer(
        &gpu.device,
        BufferType::Array,
        bytemuck::cast_slice(&quad.vertices),
        DrawMode::Dynamic,
    );
    vao.set_count(quad.vertices.len() as u32);

    // Shift the quad fully off screen.
    let moved: Vec<SimpleVertex> = quad
        .vertices
        .iter()
        .map(|v| SimpleVertex {
            position: [v.position[0] + 3.0, v.position[1], v.position[2]],
            ..*v
        })
        .collect();
    vao.update(&gpu.queue, BufferType::Array, bytemuck::cast_slice(&moved));

    let bytes = draw_red(&gpu, &vao, quad.topology);
    assert!(bytes.chunks_exact(4).all(|texel| texel == [0, 0, 0, 255]));
}

#[test]
#[cfg(feature = "integration-tests")]
fn sixteen_bit_indices_draw_with_matching_format() {
    use ibl_ngin::data_structures::{
        model::SimpleVertex,
        vertex_array::{BufferType, DrawMode, VertexArray},
    };

    let gpu = common::Gpu::new();
    let corner = |x: f32, y: f32| SimpleVertex {
        position: [x, y, 0.0],
        ..Default::default()
    };
    let vertices = [corner(-1.0, -1.0), corner(3.0, -1.0), corner(-1.0, 3.0)];
    let mut vao = VertexArray::from_data(&gpu.device, "u16 triangle", &vertices, None);
    // Padded to four bytes for the copy alignment.
    let indices: [u16; 4] = [0, 1, 2, 0];
    vao.attach_buffer(
        &gpu.device,
        BufferType::Element,
        bytemuck::cast_slice(&indices),
        DrawMode::Static,
    );
    vao.set_index_format(wgpu::IndexFormat::Uint16);
    vao.set_count(3);

    let bytes = draw_red(&gpu, &vao, wgpu::PrimitiveTopology::TriangleList);
    assert!(bytes.chunks_exact(4).all(|texel| texel == [255, 0, 0, 255]));
}

#[test]
#[cfg(feature = "integration-tests")]
fn indexed_draw_uses_the_index_count() {
    use ibl_ngin::data_structures::{model::SimpleVertex, vertex_array::VertexArray};

    let gpu = common::Gpu::new();
    let corner = |x: f32, y: f32| SimpleVertex {
        position: [x, y, 0.0],
        ..Default::default()
    };
    // One triangle over the lower left half, the fourth vertex unused.
    let vertices = [
        corner(-1.0, -1.0),
        corner(1.0, -1.0),
        corner(-1.0, 1.0),
        corner(1.0, 1.0),
    ];
    let vao = VertexArray::from_data(&gpu.device, "triangle", &vertices, Some(&[0, 1, 2]));
    assert!(vao.is_indexed());
    assert_eq!(vao.count(), 3);

    let bytes = draw_red(&gpu, &vao, wgpu::PrimitiveTopology::TriangleList);
    let texel = |x: usize, y: usize| &bytes[(y * 8 + x) * 4..(y * 8 + x) * 4 + 4];
    // Row 0 is the top of clip space.
    assert_eq!(texel(0, 7), [255, 0, 0, 255]);
    assert_eq!(texel(7, 0), [0, 0, 0, 255]);
}
