#[cfg(feature = "integration-tests")]
mod common;

/// A 2x2 quad in the z = 0 plane facing +Z, painted pure red.
#[cfg(feature = "integration-tests")]
const RED_QUAD_OBJ: &str = "\
mtllib quad.mtl
v -1.0 -1.0 0.0
v 1.0 -1.0 0.0
v 1.0 1.0 0.0
v -1.0 1.0 0.0
vt 0.0 0.0
vt 1.0 0.0
vt 1.0 1.0
vt 0.0 1.0
vn 0.0 0.0 1.0
usemtl Red
f 1/1/1 2/2/1 3/3/1
f 1/1/1 3/3/1 4/4/1
";

#[cfg(feature = "integration-tests")]
const RED_MTL: &str = "\
newmtl Red
Kd 1.0 0.0 0.0
";

#[cfg(feature = "integration-tests")]
const SIZE: u32 = 32;

/// The red quad in front of a constant, unit radiance environment, seen by
/// the default camera five units away.
#[cfg(feature = "integration-tests")]
struct QuadScene {
    gpu: common::Gpu,
    camera: ibl_ngin::camera::CameraResources,
    scene: ibl_ngin::render::PbrScene,
    _assets: common::TempAssets,
}

#[cfg(feature = "integration-tests")]
impl QuadScene {
    fn new() -> Self {
        use ibl_ngin::{
            camera::CameraResources,
            config::{CameraConfig, ModelConfig},
            data_structures::texture::HdrImage,
            ibl::IblSettings,
            pipelines::light::{Lights, PointLight},
            render::PbrScene,
            shader::ShaderLibrary,
        };

        let gpu = common::Gpu::new();
        let camera = CameraResources::new(&gpu.device, CameraConfig::default().build(1.0));
        let settings = IblSettings {
            resolution: 64,
            irradiance_divisor: 8,
            prefilter_divisor: 2,
            prefilter_mips: 5,
            brdf_lut_size: 32,
        };
        let mut scene = PbrScene::new(
            &gpu.device,
            &gpu.queue,
            &ShaderLibrary::builtin(),
            &camera.bind_group_layout,
            wgpu::TextureFormat::Rgba8UnormSrgb,
            &HdrImage::constant(64, 32, [1.0; 3]),
            settings,
            Lights::new(vec![PointLight::default()], 1.0),
        )
        .expect("scene");

        let assets = common::TempAssets::new("pbr-scene");
        assets.write("quad.obj", RED_QUAD_OBJ);
        assets.write("quad.mtl", RED_MTL);
        let model = ModelConfig {
            path: "quad.obj".to_string(),
            ..Default::default()
        };
        gpu.runtime
            .block_on(scene.load_model(&assets.manager(), &model, &gpu.device, &gpu.queue))
            .expect("quad loads");

        Self {
            gpu,
            camera,
            scene,
            _assets: assets,
        }
    }

    /// Renders one frame at `exposure` and returns the RGBA8 texels.
    fn frame(&mut self, exposure: f32) -> Vec<u8> {
        use ibl_ngin::{
            camera::CameraType, config::RenderConfig, data_structures::texture::Texture,
            gui::UiSettings,
        };

        let mut settings = UiSettings::new(&RenderConfig::default(), CameraType::LookAt);
        settings.exposure = exposure;
        self.scene.update(&self.gpu.queue, &settings);

        let target = self.gpu.target(SIZE, wgpu::TextureFormat::Rgba8UnormSrgb);
        let depth = Texture::create_depth_texture(&self.gpu.device, [SIZE, SIZE], "test depth");
        let mut encoder = self
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });
        self.scene.render(
            &mut encoder,
            &target.view,
            &depth.view,
            &self.camera.bind_group,
            &settings,
        );
        self.gpu.queue.submit(std::iter::once(encoder.finish()));
        self.gpu.read(&target.texture, 0, 0).bytes
    }
}

#[cfg(feature = "integration-tests")]
fn texel(bytes: &[u8], x: u32, y: u32) -> [u8; 4] {
    let i = ((y * SIZE + x) * 4) as usize;
    [bytes[i], bytes[i + 1], bytes[i + 2], bytes[i + 3]]
}

#[test]
#[cfg(feature = "integration-tests")]
fn lit_model_is_drawn_in_front_of_the_environment() {
    let mut quad = QuadScene::new();
    let bytes = quad.frame(1.0);

    let center = texel(&bytes, SIZE / 2, SIZE / 2);
    // Diffuse irradiance plus the point light on a red albedo: clearly red,
    // with only the grey specular in the other channels.
    assert!(center[0] > 120, "center {center:?}");
    assert!(center[0] > center[1] + 40, "center {center:?}");
    assert!(center[1].abs_diff(center[2]) <= 1, "center {center:?}");

    // The background fills what the quad leaves uncovered. Unit radiance
    // tonemaps to one half, about 188 in sRGB.
    for (x, y) in [(0, 0), (SIZE - 1, 0), (0, SIZE - 1), (SIZE - 1, SIZE - 1)] {
        let corner = texel(&bytes, x, y);
        for channel in &corner[..3] {
            assert!((180..=196).contains(channel), "corner {corner:?}");
        }
    }
}

#[test]
#[cfg(feature = "integration-tests")]
fn exposure_brightens_model_and_background() {
    let mut quad = QuadScene::new();
    let dim = quad.frame(1.0);
    let bright = quad.frame(3.0);

    let (center, corner) = ((SIZE / 2, SIZE / 2), (0, 0));
    for (x, y) in [center, corner] {
        let before = texel(&dim, x, y);
        let after = texel(&bright, x, y);
        assert!(after[0] > before[0], "({x}, {y}): {before:?} -> {after:?}");
    }
    // Three times unit radiance tonemaps to 0.75, about 225 in sRGB.
    let corner = texel(&bright, 0, 0);
    assert!((218..=232).contains(&corner[0]), "corner {corner:?}");
}
