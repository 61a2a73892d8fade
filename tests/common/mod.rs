#![allow(dead_code)]

use std::path::{Path, PathBuf};

use ibl_ngin::{
    camera::{Camera, CameraResources},
    context,
    data_structures::texture::Texture,
    pipelines::pbr::PbrPipeline,
    readback::{self, TextureData},
    resources::{ModelResources, ResourceManager},
    shader::ShaderLibrary,
};
use tokio::runtime::Runtime;

/// A headless device plus the runtime used to drive readbacks.
pub struct Gpu {
    pub runtime: Runtime,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
}

impl Gpu {
    pub fn new() -> Self {
        let runtime = Runtime::new().expect("tokio runtime");
        let (device, queue) = runtime
            .block_on(context::headless_device())
            .expect("a GPU adapter is required for integration tests");
        Self {
            runtime,
            device,
            queue,
        }
    }

    pub fn camera(&self) -> CameraResources {
        CameraResources::new(&self.device, Camera::default())
    }

    pub fn target(&self, size: u32, format: wgpu::TextureFormat) -> Texture {
        Texture::create_render_target(&self.device, [size, size], format, "test target")
    }

    /// Material and model layouts as the PBR pipeline reflects them.
    pub fn model_resources(&self) -> ModelResources {
        let camera = self.camera();
        let (_, resources) = PbrPipeline::new(
            &self.device,
            &self.queue,
            &ShaderLibrary::builtin(),
            &camera.bind_group_layout,
            wgpu::TextureFormat::Rgba8UnormSrgb,
        )
        .expect("pbr pipeline");
        resources
    }

    pub fn read(&self, texture: &wgpu::Texture, mip_level: u32, layer: u32) -> TextureData {
        self.runtime
            .block_on(readback::read_texture(
                &self.device,
                &self.queue,
                texture,
                mip_level,
                layer,
            ))
            .expect("readback")
    }
}

/// RGBA texels of an `Rgba16Float` readback.
pub fn rgba_texels(data: &TextureData) -> Vec<[f32; 4]> {
    data.f16_values()
        .chunks_exact(4)
        .map(|c| [c[0], c[1], c[2], c[3]])
        .collect()
}

pub fn assert_close(actual: f32, expected: f32, tolerance: f32, what: &str) {
    assert!(
        (actual - expected).abs() <= tolerance,
        "{what}: expected {expected} ± {tolerance}, got {actual}"
    );
}

/// A scratch asset root, removed on drop.
pub struct TempAssets {
    root: PathBuf,
}

impl TempAssets {
    pub fn new(name: &str) -> Self {
        let root = std::env::temp_dir().join(format!("ibl-ngin-{name}-{}", std::process::id()));
        std::fs::create_dir_all(&root).expect("temp asset dir");
        Self { root }
    }

    pub fn write(&self, relative: impl AsRef<Path>, contents: impl AsRef<[u8]>) {
        let path = self.root.join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("asset subdir");
        }
        std::fs::write(path, contents).expect("write asset");
    }

    pub fn manager(&self) -> ResourceManager {
        ResourceManager::new(&self.root)
    }
}

impl Drop for TempAssets {
    fn drop(&mut self) {
        std::fs::remove_dir_all(&self.root).ok();
    }
}
