//! Engine data structures: geometry, materials, textures and transforms.
//!
//! - `model` holds the vertex formats and mesh helpers
//! - `vertex_array` wraps vertex and index buffers with their draw call
//! - `material` holds PBR materials and their bind groups
//! - `texture` contains the GPU texture wrapper and creation utilities
//! - `transform` holds model transforms and the model uniform
//! - `primitives` generates the cube, quad and sphere
//! - `scene_graph` is the node hierarchy of glTF scenes

pub mod material;
pub mod model;
pub mod primitives;
pub mod scene_graph;
pub mod texture;
pub mod transform;
pub mod vertex_array;
