//! Wavefront OBJ models.

use std::{
    io::{BufReader, Cursor},
    path::Path,
};

use anyhow::Context as _;

use crate::{
    data_structures::{
        material::{MATERIAL_GROUP, MaterialBinding, PbrMaterial},
        model::Mesh,
        transform::{MODEL_GROUP, Transform, TransformBinding},
    },
    resources::{ModelResources, ResourceManager, mesh, texture::load_mtl_materials},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjLoadOptions {
    /// OBJ puts the uv origin at the bottom left, wgpu at the top left.
    pub flip_uvs: bool,
    pub flip_winding: bool,
}

impl Default for ObjLoadOptions {
    fn default() -> Self {
        Self {
            flip_uvs: true,
            flip_winding: false,
        }
    }
}

/// A flattened OBJ model: every mesh shares the model's transform.
#[derive(Debug)]
pub struct Model {
    pub name: String,
    pub meshes: Vec<Mesh>,
    pub materials: Vec<PbrMaterial>,
    bindings: Vec<MaterialBinding>,
    pub transform: Transform,
    transform_binding: TransformBinding,
}

impl Model {
    pub fn update(&mut self, queue: &wgpu::Queue) {
        self.transform_binding.set(queue, self.transform.to_uniform());
    }

    /// Draws every mesh with its material. Expects the camera and
    /// environment groups to be bound already.
    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>) {
        pass.set_bind_group(MODEL_GROUP, &self.transform_binding.bind_group, &[]);
        for mesh in &self.meshes {
            // Material ids were resolved against `bindings` at load time.
            if let Some(binding) = self.bindings.get(mesh.material) {
                pass.set_bind_group(MATERIAL_GROUP, &binding.bind_group, &[]);
                mesh.vertex_array.draw(pass, 0..1);
            }
        }
    }
}

pub async fn load_model_obj(
    manager: &ResourceManager,
    file_name: &str,
    options: ObjLoadOptions,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    resources: &ModelResources,
) -> anyhow::Result<Model> {
    let model_dir = Path::new(file_name).parent().unwrap_or(Path::new("")).to_path_buf();
    let obj_text = manager
        .load_text_file(file_name)
        .await
        .with_context(|| format!("failed to load model {file_name}"))?;
    let mut obj_reader = BufReader::new(Cursor::new(obj_text));

    let (models, obj_materials) = tobj::load_obj_buf_async(
        &mut obj_reader,
        &tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        },
        |p| {
            let mtl_path = model_dir.join(p);
            async move {
                match manager.load_text_file(&mtl_path).await {
                    Ok(mtl_text) => tobj::load_mtl_buf(&mut BufReader::new(Cursor::new(mtl_text))),
                    Err(e) => {
                        log::warn!("{:#}", e);
                        Err(tobj::LoadError::OpenFileFailed)
                    }
                }
            }
        },
    )
    .await
    .with_context(|| format!("failed to parse {file_name}"))?;

    let obj_materials = obj_materials.unwrap_or_else(|e| {
        log::warn!("{file_name}: no materials loaded ({e})");
        Vec::new()
    });
    let mut materials =
        load_mtl_materials(manager, &model_dir, &obj_materials, device, queue).await;
    let fallback_material = materials.len();
    materials.push(PbrMaterial::new("default"));

    let meshes = mesh::load_meshes(
        &models,
        file_name,
        options.flip_uvs,
        options.flip_winding,
        fallback_material,
        device,
    );
    let bindings = materials
        .iter()
        .map(|material| material.upload(device, &resources.defaults, &resources.material_layout))
        .collect();

    let transform = Transform::new();
    let transform_binding = TransformBinding::new(
        device,
        &resources.model_layout,
        &format!("{file_name} transform"),
        transform.to_uniform(),
    );
    log::info!(
        "Loaded {} with {} meshes and {} materials",
        file_name,
        meshes.len(),
        obj_materials.len()
    );

    Ok(Model {
        name: file_name.to_string(),
        meshes,
        materials,
        bindings,
        transform,
        transform_binding,
    })
}
