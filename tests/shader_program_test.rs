#[cfg(feature = "integration-tests")]
mod common;

#[test]
#[cfg(feature = "integration-tests")]
fn pbr_program_reflects_every_group() {
    use ibl_ngin::shader::{BindingSlot, ShaderLibrary, ShaderProgram, ShaderStage, ShaderStageInfo};

    let gpu = common::Gpu::new();
    let program = ShaderProgram::new(
        &gpu.device,
        "pbr.wgsl",
        &ShaderLibrary::builtin(),
        &ShaderStageInfo::render("pbr.wgsl"),
    )
    .expect("pbr program");

    assert!(program.module(ShaderStage::Vertex).is_ok());
    assert!(program.module(ShaderStage::Fragment).is_ok());
    assert_eq!(
        program.binding("camera"),
        Some(BindingSlot { group: 0, binding: 0 })
    );
    assert_eq!(program.slot("lights", 1).ok(), Some(4));
    assert_eq!(program.slot("material", 2).ok(), Some(7));
    assert_eq!(program.slot("model", 3).ok(), Some(0));
    // Wrong group for a known name.
    assert!(program.slot("camera", 1).is_err());
    assert_eq!(program.bindings().count(), 15);
}

#[test]
#[cfg(feature = "integration-tests")]
fn every_pipeline_builds_on_a_real_device() {
    use ibl_ngin::{
        pipelines::{light::LightMarkers, pbr::PbrPipeline},
        shader::ShaderLibrary,
    };

    let gpu = common::Gpu::new();
    let camera = gpu.camera();
    let library = ShaderLibrary::builtin();
    let format = wgpu::TextureFormat::Rgba8UnormSrgb;

    let (pbr, _resources) = PbrPipeline::new(
        &gpu.device,
        &gpu.queue,
        &library,
        &camera.bind_group_layout,
        format,
    )
    .expect("pbr pipeline");
    assert_eq!(
        pbr.supports_wireframe(),
        gpu.device
            .features()
            .contains(wgpu::Features::POLYGON_MODE_LINE)
    );
    LightMarkers::new(&gpu.device, &library, &camera.bind_group_layout, format)
        .expect("light pipeline");
}

#[test]
#[cfg(feature = "integration-tests")]
fn shader_overrides_are_compiled_in_place_of_builtins() {
    use ibl_ngin::shader::{ShaderError, ShaderLibrary, ShaderProgram, ShaderStageInfo};

    let gpu = common::Gpu::new();
    let mut library = ShaderLibrary::builtin();
    library.insert("light.wgsl", "@vertex fn vs_main() -> @builtin(position) vec4<f32> { return vec4<f32>(0.0); }");

    let err = ShaderProgram::new(
        &gpu.device,
        "light.wgsl",
        &library,
        &ShaderStageInfo::render("light.wgsl"),
    )
    .unwrap_err();
    assert!(matches!(err, ShaderError::MissingEntryPoint { .. }), "got {err}");
}
