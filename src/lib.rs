//! ibl-ngin
//!
//! A physically based renderer lit by image based lighting. An
//! equirectangular HDR environment is baked once into an environment
//! cubemap, a diffuse irradiance map, a specular prefilter map and a BRDF
//! lookup table. OBJ and glTF models are then shaded with Cook-Torrance
//! against those maps plus a handful of point lights.
//!
//! High-level modules
//! - `app`: window, event loop and the per-frame sequence
//! - `camera`: look-at and first person cameras with their uniform
//! - `config`: TOML start-up configuration
//! - `context`: surface, device and per-window resources
//! - `data_structures`: vertices, meshes, materials, transforms, textures
//! - `gui`: the egui debug overlay
//! - `ibl`: the environment bake and the skybox
//! - `pipelines`: render pipeline construction (PBR, light markers)
//! - `readback`: copying textures back to the CPU
//! - `render`: the scene and its frame
//! - `resources`: asset loading (OBJ, glTF, textures, HDR images)
//! - `shader`: WGSL sources, includes and reflected bindings

pub mod app;
pub mod camera;
pub mod config;
pub mod context;
pub mod data_structures;
pub mod gui;
pub mod ibl;
pub mod pipelines;
pub mod readback;
pub mod render;
pub mod resources;
pub mod shader;

pub use app::run;
pub use config::Config;
