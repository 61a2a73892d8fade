//! Loading of meshes, textures and environments from the asset directory.
//!
//! Every path handed to a [`ResourceManager`] is relative to its asset root.
//! Model loaders resolve the files a model references (MTL libraries,
//! textures, glTF buffers) relative to the model's own directory.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use image::ImageFormat;

use crate::data_structures::{
    material::{MaterialDefaults, MaterialLayout},
    texture::{ColorSpace, HdrImage, Texture},
    transform::{ModelLayout, Transform},
};

pub mod gltf_model;
pub mod mesh;
pub mod obj;
pub mod texture;

pub use gltf_model::{GltfModel, load_model_gltf};
pub use obj::{Model, ObjLoadOptions, load_model_obj};

pub const DEFAULT_ASSET_ROOT: &str = "./assets";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceManager {
    asset_root: PathBuf,
}

impl Default for ResourceManager {
    fn default() -> Self {
        Self::new(DEFAULT_ASSET_ROOT)
    }
}

impl ResourceManager {
    pub fn new(asset_root: impl Into<PathBuf>) -> Self {
        Self {
            asset_root: asset_root.into(),
        }
    }

    pub fn asset_root(&self) -> &Path {
        &self.asset_root
    }

    /// Absolute paths are returned unchanged.
    pub fn path(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.asset_root.join(relative)
    }

    pub async fn load_text_file(&self, relative: impl AsRef<Path>) -> anyhow::Result<String> {
        let path = self.path(relative);
        tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))
    }

    pub async fn load_binary(&self, relative: impl AsRef<Path>) -> anyhow::Result<Vec<u8>> {
        let path = self.path(relative);
        tokio::fs::read(&path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))
    }

    pub async fn load_texture(
        &self,
        relative: impl AsRef<Path>,
        color_space: ColorSpace,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
    ) -> anyhow::Result<Texture> {
        let relative = relative.as_ref();
        let bytes = self.load_binary(relative).await?;
        let extension = relative.extension().and_then(|ext| ext.to_str());
        let label = relative.to_string_lossy();
        Texture::from_bytes(device, queue, &bytes, &label, extension, color_space)
            .with_context(|| format!("failed to decode {}", self.path(relative).display()))
    }

    /// Decodes an equirectangular HDR image (Radiance `.hdr`, or anything
    /// else `image` can read) into linear RGBA floats.
    pub async fn load_hdr(&self, relative: impl AsRef<Path>) -> anyhow::Result<HdrImage> {
        let relative = relative.as_ref();
        let bytes = self.load_binary(relative).await?;
        let img = match ImageFormat::from_path(relative) {
            Ok(format) => image::load_from_memory_with_format(&bytes, format),
            Err(_) => image::load_from_memory(&bytes),
        }
        .with_context(|| format!("failed to decode {}", self.path(relative).display()))?;
        let hdr = HdrImage::from_dynamic(&img);
        log::info!(
            "Loaded environment {} ({}x{})",
            relative.display(),
            hdr.width,
            hdr.height
        );
        Ok(hdr)
    }
}

/// Layouts and fallbacks shared by every model upload.
#[derive(Debug)]
pub struct ModelResources {
    pub material_layout: MaterialLayout,
    pub model_layout: ModelLayout,
    pub defaults: MaterialDefaults,
}

/// Which importer reads a model file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    Obj,
    Gltf,
}

impl ModelKind {
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        let extension = path.as_ref().extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "obj" => Some(ModelKind::Obj),
            "gltf" | "glb" => Some(ModelKind::Gltf),
            _ => None,
        }
    }
}

/// A loaded model of either kind.
#[derive(Debug)]
pub enum SceneModel {
    Obj(Model),
    Gltf(GltfModel),
}

impl SceneModel {
    pub async fn load(
        manager: &ResourceManager,
        path: &str,
        kind: ModelKind,
        options: ObjLoadOptions,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        resources: &ModelResources,
    ) -> anyhow::Result<Self> {
        Ok(match kind {
            ModelKind::Obj => {
                SceneModel::Obj(load_model_obj(manager, path, options, device, queue, resources).await?)
            }
            ModelKind::Gltf => {
                SceneModel::Gltf(load_model_gltf(manager, path, device, queue, resources).await?)
            }
        })
    }

    pub fn set_transform(&mut self, transform: Transform) {
        match self {
            SceneModel::Obj(model) => model.transform = transform,
            SceneModel::Gltf(model) => model.transform = transform,
        }
    }

    /// Writes changed transforms to the GPU.
    pub fn update(&mut self, queue: &wgpu::Queue) {
        match self {
            SceneModel::Obj(model) => model.update(queue),
            SceneModel::Gltf(model) => model.update(queue),
        }
    }

    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>) {
        match self {
            SceneModel::Obj(model) => model.draw(pass),
            SceneModel::Gltf(model) => model.draw(pass),
        }
    }
}
