//! glTF 2.0 models (`.gltf` with external buffers, or `.glb`).

use std::{collections::HashMap, path::Path};

use anyhow::{Context as _, bail};
use cgmath::Vector3;

use crate::{
    data_structures::{
        material::{MATERIAL_GROUP, MaterialBinding, PbrMaterial, PbrParameter},
        model::{self, ModelVertex},
        scene_graph::SceneGraph,
        texture::{ColorSpace, Texture},
        transform::{MODEL_GROUP, ModelUniform, Transform, TransformBinding},
        vertex_array::VertexArray,
    },
    resources::{ModelResources, ResourceManager},
};

#[derive(Debug)]
pub struct GltfPrimitive {
    pub vertex_array: VertexArray,
    pub material: usize,
}

#[derive(Debug)]
pub struct GltfMesh {
    pub name: String,
    pub primitives: Vec<GltfPrimitive>,
}

/// A glTF scene. Each mesh node is drawn with `transform · parent chain · local`.
#[derive(Debug)]
pub struct GltfModel {
    pub name: String,
    pub graph: SceneGraph,
    pub meshes: Vec<GltfMesh>,
    pub materials: Vec<PbrMaterial>,
    bindings: Vec<MaterialBinding>,
    pub transform: Transform,
    /// One uniform per node that carries a mesh, indexed like `graph.nodes`.
    node_bindings: Vec<Option<TransformBinding>>,
}

impl GltfModel {
    /// Transform uniform of `node`, present for nodes that carry a mesh.
    pub fn node_binding(&self, node: usize) -> Option<&TransformBinding> {
        self.node_bindings.get(node)?.as_ref()
    }

    pub fn update(&mut self, queue: &wgpu::Queue) {
        let world = self.graph.node_world_matrices(self.transform.matrix());
        for (binding, matrix) in self.node_bindings.iter_mut().zip(world) {
            if let (Some(binding), Some(matrix)) = (binding, matrix) {
                binding.set(queue, ModelUniform::from_matrix(matrix));
            }
        }
    }

    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>) {
        for (node, binding) in self.graph.nodes.iter().zip(&self.node_bindings) {
            let (Some(mesh), Some(binding)) = (node.mesh, binding) else {
                continue;
            };
            let Some(mesh) = self.meshes.get(mesh) else {
                continue;
            };
            pass.set_bind_group(MODEL_GROUP, &binding.bind_group, &[]);
            for primitive in &mesh.primitives {
                if let Some(material) = self.bindings.get(primitive.material) {
                    pass.set_bind_group(MATERIAL_GROUP, &material.bind_group, &[]);
                    primitive.vertex_array.draw(pass, 0..1);
                }
            }
        }
    }
}

/// Vertices of a primitive from its accessors. Missing normals and uvs are
/// zero; tangents are computed when the file has none.
fn primitive_vertices<'a, 's, F>(
    reader: &gltf::mesh::Reader<'a, 's, F>,
) -> Option<(Vec<ModelVertex>, bool)>
where
    F: Clone + Fn(gltf::Buffer<'a>) -> Option<&'s [u8]>,
{
    let mut vertices: Vec<ModelVertex> = reader
        .read_positions()?
        .map(|position| ModelVertex {
            position,
            ..Default::default()
        })
        .collect();
    if let Some(normals) = reader.read_normals() {
        vertices.iter_mut().zip(normals).for_each(|(v, n)| v.normal = n);
    }
    if let Some(tex_coords) = reader.read_tex_coords(0) {
        vertices
            .iter_mut()
            .zip(tex_coords.into_f32())
            .for_each(|(v, uv)| v.tex_coords = uv);
    }
    let has_tangents = match reader.read_tangents() {
        Some(tangents) => {
            vertices.iter_mut().zip(tangents).for_each(|(v, t)| {
                // The fourth component carries the bitangent sign.
                let tangent = Vector3::new(t[0], t[1], t[2]);
                let normal: Vector3<f32> = v.normal.into();
                v.tangent = tangent.into();
                v.bitangent = (normal.cross(tangent) * t[3]).into();
            });
            true
        }
        None => false,
    };
    Some((vertices, has_tangents))
}

/// Vertices and indices of a triangle primitive. Non-indexed primitives
/// get a sequential index list.
fn primitive_geometry(
    primitive: &gltf::Primitive,
    buffer_data: &[Vec<u8>],
) -> Option<(Vec<ModelVertex>, Vec<u32>)> {
    let reader = primitive.reader(|buffer| buffer_data.get(buffer.index()).map(Vec::as_slice));
    let (mut vertices, has_tangents) = primitive_vertices(&reader)?;
    let indices: Vec<u32> = match reader.read_indices() {
        Some(indices) => indices.into_u32().collect(),
        None => (0..vertices.len() as u32).collect(),
    };
    if !has_tangents {
        model::compute_tangents(&mut vertices, &indices);
    }
    Some((vertices, indices))
}

fn mime_extension(mime_type: &str) -> Option<&str> {
    mime_type.split('/').last()
}

/// Raw bytes of every buffer, from the GLB blob or from files next to the model.
async fn load_buffers(
    manager: &ResourceManager,
    model_dir: &Path,
    gltf: &gltf::Gltf,
) -> anyhow::Result<Vec<Vec<u8>>> {
    let mut buffer_data = Vec::new();
    for buffer in gltf.buffers() {
        match buffer.source() {
            gltf::buffer::Source::Bin => match gltf.blob.as_deref() {
                Some(blob) => buffer_data.push(blob.to_vec()),
                None => bail!("buffer {} refers to a missing GLB blob", buffer.index()),
            },
            gltf::buffer::Source::Uri(uri) if uri.starts_with("data:") => {
                bail!("buffer {} is an embedded data uri, which is not supported", buffer.index())
            }
            gltf::buffer::Source::Uri(uri) => {
                buffer_data.push(manager.load_binary(model_dir.join(uri)).await?);
            }
        }
    }
    Ok(buffer_data)
}

/// Decodes every image of the document. Undecodable images are logged and
/// left empty so the materials using them fall back to their factors.
async fn load_images(
    manager: &ResourceManager,
    model_dir: &Path,
    gltf: &gltf::Gltf,
    buffer_data: &[Vec<u8>],
) -> Vec<Option<image::DynamicImage>> {
    let mut images = Vec::new();
    for image in gltf.images() {
        let decoded = match image.source() {
            gltf::image::Source::View { view, mime_type } => {
                let start = view.offset();
                let end = start + view.length();
                match buffer_data.get(view.buffer().index()).and_then(|b| b.get(start..end)) {
                    Some(bytes) => decode_image(bytes, mime_extension(mime_type)),
                    None => Err(anyhow::anyhow!("buffer view out of range")),
                }
            }
            gltf::image::Source::Uri { uri, mime_type } => {
                match manager.load_binary(model_dir.join(uri)).await {
                    Ok(bytes) => decode_image(
                        &bytes,
                        mime_type
                            .and_then(mime_extension)
                            .or_else(|| Path::new(uri).extension().and_then(|e| e.to_str())),
                    ),
                    Err(e) => Err(e),
                }
            }
        };
        images.push(
            decoded
                .inspect_err(|e| log::warn!("image {} not loaded: {:#}", image.index(), e))
                .ok(),
        );
    }
    images
}

fn decode_image(bytes: &[u8], extension: Option<&str>) -> anyhow::Result<image::DynamicImage> {
    Ok(match extension.and_then(image::ImageFormat::from_extension) {
        Some(format) => image::load_from_memory_with_format(bytes, format)?,
        None => image::load_from_memory(bytes)?,
    })
}

/// Uploads images on first use, once per colour space.
struct TextureCache<'a> {
    images: &'a [Option<image::DynamicImage>],
    uploaded: HashMap<(usize, ColorSpace), Texture>,
}

impl TextureCache<'_> {
    fn get(
        &mut self,
        texture: gltf::Texture,
        color_space: ColorSpace,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
    ) -> Option<Texture> {
        let index = texture.source().index();
        if let Some(texture) = self.uploaded.get(&(index, color_space)) {
            return Some(texture.clone());
        }
        let img = self.images.get(index)?.as_ref()?;
        let label = format!("gltf image {index}");
        let uploaded = Texture::from_image(device, queue, img, Some(&label), color_space)
            .inspect_err(|e| log::warn!("{label} not uploaded: {e:#}"))
            .ok()?;
        self.uploaded.insert((index, color_space), uploaded.clone());
        Some(uploaded)
    }
}

fn convert_material(
    material: &gltf::Material,
    cache: &mut TextureCache,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
) -> PbrMaterial {
    let mut pbr = PbrMaterial::new(material.name().unwrap_or("gltf material"));
    let metallic_roughness = material.pbr_metallic_roughness();
    let [r, g, b, a] = metallic_roughness.base_color_factor();
    pbr.set_color(PbrParameter::Albedo, [r, g, b]);
    pbr.alpha = a;
    pbr.set_color(PbrParameter::Metallic, [metallic_roughness.metallic_factor(); 3]);
    pbr.set_color(PbrParameter::Roughness, [metallic_roughness.roughness_factor(); 3]);

    if let Some(info) = metallic_roughness.base_color_texture() {
        if let Some(texture) = cache.get(info.texture(), ColorSpace::Srgb, device, queue) {
            pbr.set_texture(PbrParameter::Albedo, texture);
        }
    }
    if let Some(info) = metallic_roughness.metallic_roughness_texture() {
        if let Some(texture) = cache.get(info.texture(), ColorSpace::Linear, device, queue) {
            pbr.set_texture(PbrParameter::Metallic, texture.clone());
            pbr.set_texture(PbrParameter::Roughness, texture);
            pbr.packed_metallic_roughness = true;
        }
    }
    if let Some(normal) = material.normal_texture() {
        if let Some(texture) = cache.get(normal.texture(), ColorSpace::Linear, device, queue) {
            pbr.set_texture(PbrParameter::Normal, texture);
        }
    }
    if let Some(occlusion) = material.occlusion_texture() {
        if let Some(texture) = cache.get(occlusion.texture(), ColorSpace::Linear, device, queue) {
            pbr.set_texture(PbrParameter::Ao, texture);
        }
    }
    pbr
}

pub async fn load_model_gltf(
    manager: &ResourceManager,
    file_name: &str,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    resources: &ModelResources,
) -> anyhow::Result<GltfModel> {
    let model_dir = Path::new(file_name).parent().unwrap_or(Path::new("")).to_path_buf();
    let bytes = manager
        .load_binary(file_name)
        .await
        .with_context(|| format!("failed to load model {file_name}"))?;
    let gltf = gltf::Gltf::from_slice(&bytes).with_context(|| format!("failed to parse {file_name}"))?;

    let buffer_data = load_buffers(manager, &model_dir, &gltf)
        .await
        .with_context(|| format!("failed to load buffers of {file_name}"))?;
    let images = load_images(manager, &model_dir, &gltf, &buffer_data).await;

    let mut cache = TextureCache {
        images: &images,
        uploaded: HashMap::new(),
    };
    let mut materials: Vec<PbrMaterial> = gltf
        .materials()
        .map(|material| convert_material(&material, &mut cache, device, queue))
        .collect();
    let fallback_material = materials.len();
    materials.push(PbrMaterial::new("default"));

    let mut meshes = Vec::new();
    for mesh in gltf.meshes() {
        let name = mesh.name().unwrap_or("unnamed mesh").to_string();
        let mut primitives = Vec::new();
        for primitive in mesh.primitives() {
            if primitive.mode() != gltf::mesh::Mode::Triangles {
                log::warn!("{}: skipping {:?} primitive", name, primitive.mode());
                continue;
            }
            let Some((vertices, indices)) = primitive_geometry(&primitive, &buffer_data) else {
                log::warn!("{}: primitive {} has no positions", name, primitive.index());
                continue;
            };
            let label = format!("{file_name}:{name}:{}", primitive.index());
            primitives.push(GltfPrimitive {
                vertex_array: VertexArray::from_data(device, &label, &vertices, Some(&indices)),
                material: primitive.material().index().unwrap_or(fallback_material),
            });
        }
        meshes.push(GltfMesh { name, primitives });
    }

    let graph = match gltf.default_scene().or_else(|| gltf.scenes().next()) {
        Some(scene) => SceneGraph::from_gltf(&gltf, &scene),
        None => bail!("{file_name} contains no scene"),
    };

    let bindings = materials
        .iter()
        .map(|material| material.upload(device, &resources.defaults, &resources.material_layout))
        .collect();

    let transform = Transform::new();
    let world = graph.node_world_matrices(transform.matrix());
    let node_bindings = graph
        .nodes
        .iter()
        .zip(world)
        .map(|(node, matrix)| match (node.mesh, matrix) {
            (Some(_), Some(matrix)) => Some(TransformBinding::new(
                device,
                &resources.model_layout,
                &format!("{} transform", node.name),
                ModelUniform::from_matrix(matrix),
            )),
            _ => None,
        })
        .collect();

    log::info!(
        "Loaded {} with {} nodes, {} meshes and {} materials",
        file_name,
        graph.nodes.len(),
        meshes.len(),
        materials.len() - 1
    );

    Ok(GltfModel {
        name: file_name.to_string(),
        graph,
        meshes,
        materials,
        bindings,
        transform,
        node_bindings,
    })
}
