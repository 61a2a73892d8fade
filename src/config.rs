//! Start-up configuration read from TOML.
//!
//! Every section is `#[serde(default)]`, so a file that only overrides
//! `[render]` or adds a `[[models]]` entry is enough.

use std::path::{Path, PathBuf};

use cgmath::Vector3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    camera::{Camera, CameraType},
    data_structures::transform::Transform,
    ibl::IblSettings,
    pipelines::light::{Lights, PointLight},
    resources::{DEFAULT_ASSET_ROOT, ModelKind, ObjLoadOptions},
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("can't tell the format of model {0}, set `kind` to obj or gltf")]
    UnknownModelKind(String),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub window: WindowConfig,
    pub assets: AssetsConfig,
    pub environment: EnvironmentConfig,
    pub camera: CameraConfig,
    pub models: ModelList,
    pub lights: LightList,
    pub render: RenderConfig,
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&content)?;
        log::info!("Loaded config {}", path.display());
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        for model in config.models.iter() {
            model.kind()?;
        }
        Ok(config)
    }

    /// Lights as the renderer uses them, extras dropped.
    pub fn lights(&self) -> Lights {
        Lights::new(self.lights.0.clone(), self.render.exposure)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "IBL Renderer".to_string(),
            width: 1280,
            height: 720,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetsConfig {
    pub root: PathBuf,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from(DEFAULT_ASSET_ROOT),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentConfig {
    /// Equirectangular `.hdr` image, relative to the asset root.
    pub hdr: String,
    #[serde(flatten)]
    pub ibl: IblSettings,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            hdr: "textures/hdr/LA_Downtown_Afternoon_Fishing_3k.hdr".to_string(),
            ibl: IblSettings::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    #[serde(rename = "type")]
    pub camera_type: CameraType,
    /// Vertical field of view in degrees.
    pub fov: f32,
    pub near: f32,
    pub far: f32,
    pub position: [f32; 3],
    /// Euler angles in degrees.
    pub rotation: [f32; 3],
    pub rotation_speed: f32,
    pub movement_speed: f32,
    pub flip_y: bool,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            camera_type: CameraType::LookAt,
            fov: 45.0,
            near: 0.1,
            far: 256.0,
            position: [0.0, 0.0, -5.0],
            rotation: [0.0, 0.0, 0.0],
            rotation_speed: 0.1,
            movement_speed: 0.1,
            flip_y: false,
        }
    }
}

impl CameraConfig {
    pub fn build(&self, aspect: f32) -> Camera {
        let mut camera = Camera::new(self.camera_type);
        camera.set_flip_y(self.flip_y);
        camera.rotation_speed = self.rotation_speed;
        camera.movement_speed = self.movement_speed;
        camera.set_perspective(self.fov, aspect, self.near, self.far);
        camera.set_position(Vector3::from(self.position));
        camera.set_rotation(Vector3::from(self.rotation));
        camera
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Path relative to the asset root.
    pub path: String,
    /// Inferred from the extension when omitted.
    pub kind: Option<ModelKind>,
    pub translation: [f32; 3],
    pub rotation_deg: f32,
    pub rotation_axis: [f32; 3],
    pub scale: [f32; 3],
    /// Only read by the OBJ importer.
    pub flip_uvs: bool,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: String::new(),
            kind: None,
            translation: [0.0; 3],
            rotation_deg: 0.0,
            rotation_axis: [0.0, 1.0, 0.0],
            scale: [1.0; 3],
            flip_uvs: ObjLoadOptions::default().flip_uvs,
        }
    }
}

impl ModelConfig {
    pub fn kind(&self) -> Result<ModelKind, ConfigError> {
        self.kind
            .or_else(|| ModelKind::from_path(&self.path))
            .ok_or_else(|| ConfigError::UnknownModelKind(self.path.clone()))
    }

    pub fn transform(&self) -> Transform {
        let mut transform = Transform::new();
        transform
            .translate(Vector3::from(self.translation))
            .rotate(self.rotation_deg, Vector3::from(self.rotation_axis))
            .scale(Vector3::from(self.scale));
        transform
    }

    pub fn obj_options(&self) -> ObjLoadOptions {
        ObjLoadOptions {
            flip_uvs: self.flip_uvs,
            ..Default::default()
        }
    }
}

/// The `[[models]]` array. A newtype so an absent key means the demo
/// scene, while an explicit empty array means no models.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelList(pub Vec<ModelConfig>);

impl Default for ModelList {
    fn default() -> Self {
        Self(vec![ModelConfig {
            path: "models/nanosuit/nanosuit.obj".to_string(),
            translation: [-3.0, 0.0, 2.0],
            ..Default::default()
        }])
    }
}

impl ModelList {
    pub fn iter(&self) -> std::slice::Iter<'_, ModelConfig> {
        self.0.iter()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LightList(pub Vec<PointLight>);

impl Default for LightList {
    fn default() -> Self {
        Self(vec![PointLight::default()])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub exposure: f32,
    pub wireframe: bool,
    pub vsync: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            exposure: 1.0,
            wireframe: false,
            vsync: true,
        }
    }
}
