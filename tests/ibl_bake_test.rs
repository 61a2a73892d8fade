#[cfg(feature = "integration-tests")]
mod common;

#[cfg(feature = "integration-tests")]
use common::{Gpu, assert_close, rgba_texels};

#[cfg(feature = "integration-tests")]
fn bake_constant(gpu: &Gpu, radiance: f32) -> ibl_ngin::ibl::Skybox {
    use ibl_ngin::{
        data_structures::texture::HdrImage,
        ibl::{IblSettings, Skybox},
        shader::ShaderLibrary,
    };

    let camera = gpu.camera();
    let hdr = HdrImage::constant(64, 32, [radiance; 3]);
    let settings = IblSettings {
        resolution: 64,
        irradiance_divisor: 8,
        prefilter_divisor: 2,
        prefilter_mips: 5,
        brdf_lut_size: 32,
    };
    Skybox::new(
        &gpu.device,
        &gpu.queue,
        &ShaderLibrary::builtin(),
        &hdr,
        settings,
        &camera.bind_group_layout,
        wgpu::TextureFormat::Rgba8UnormSrgb,
    )
    .expect("bake")
}

#[test]
#[cfg(feature = "integration-tests")]
fn constant_environment_bakes_to_constant_maps() {
    let gpu = Gpu::new();
    let skybox = bake_constant(&gpu, 0.5);

    for face in 0..6 {
        let environment = gpu.read(&skybox.environment.texture, 0, face);
        for texel in rgba_texels(&environment) {
            assert_close(texel[0], 0.5, 0.01, "environment");
        }
        let irradiance = gpu.read(&skybox.irradiance.texture, 0, face);
        for texel in rgba_texels(&irradiance) {
            assert_close(texel[1], 0.5, 0.03, "irradiance");
        }
    }

    let mips = skybox.prefilter.texture.mip_level_count();
    assert_eq!(mips, 5);
    for mip in [0, mips - 1] {
        let prefilter = gpu.read(&skybox.prefilter.texture, mip, 2);
        for texel in rgba_texels(&prefilter) {
            assert_close(texel[2], 0.5, 0.03, "prefilter");
        }
    }
}

#[test]
#[cfg(feature = "integration-tests")]
fn brdf_lut_stays_in_unit_range() {
    let gpu = Gpu::new();
    let skybox = bake_constant(&gpu, 1.0);
    let lut = gpu.read(&skybox.brdf_lut.texture, 0, 0);
    assert_eq!((lut.width, lut.height), (32, 32));

    let values = lut.f16_values();
    assert!(values.iter().all(|v| (0.0..=1.0).contains(v)));
    // Smooth surfaces seen head-on reflect nearly everything through the
    // scale term: last column, first row.
    let row0_last = &values[(31 * 2)..(31 * 2 + 2)];
    assert!(row0_last[0] + row0_last[1] > 0.9, "got {row0_last:?}");
}

#[test]
#[cfg(feature = "integration-tests")]
fn skybox_background_is_drawn_where_nothing_else_is() {
    use ibl_ngin::{data_structures::texture::Texture, ibl::Background};

    let gpu = Gpu::new();
    let mut skybox = bake_constant(&gpu, 1.0);
    let camera = gpu.camera();
    skybox.update_background(&gpu.queue, Background::Environment, 1.0);

    let target = gpu.target(16, wgpu::TextureFormat::Rgba8UnormSrgb);
    let depth = Texture::create_depth_texture(&gpu.device, [16, 16], "test depth");
    let mut encoder = gpu
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });
    {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("test pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &target.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &depth.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        skybox.draw(&mut pass, &camera.bind_group, Background::Environment);
    }
    gpu.queue.submit(std::iter::once(encoder.finish()));

    let pixels = gpu.read(&target.texture, 0, 0);
    // Radiance one tonemaps to one half, which is about 188 in sRGB.
    for texel in pixels.bytes.chunks_exact(4) {
        assert!((180..=196).contains(&texel[0]), "got {texel:?}");
        assert_eq!(texel[3], 255);
    }
}
