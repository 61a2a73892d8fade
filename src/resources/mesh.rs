use crate::data_structures::{
    model::{self, ModelVertex},
    vertex_array::VertexArray,
};

/// Vertex and index data of one OBJ mesh, before upload.
///
/// OBJ files don't carry tangents, so they are computed here for normal
/// mapping. Indices outside the vertex range are dropped with a warning
/// together with the rest of their triangle.
pub fn obj_geometry(mesh: &tobj::Mesh, flip_uvs: bool, flip_winding: bool) -> (Vec<ModelVertex>, Vec<u32>) {
    let mut vertices = (0..mesh.positions.len() / 3)
        .map(|i| {
            let v = mesh.texcoords.get(i * 2 + 1).map_or(0.0, |f| *f);
            ModelVertex {
                position: [
                    mesh.positions[i * 3],
                    mesh.positions[i * 3 + 1],
                    mesh.positions[i * 3 + 2],
                ],
                tex_coords: [
                    mesh.texcoords.get(i * 2).map_or(0.0, |f| *f),
                    if flip_uvs { 1.0 - v } else { v },
                ],
                normal: [
                    mesh.normals.get(i * 3).map_or(0.0, |f| *f),
                    mesh.normals.get(i * 3 + 1).map_or(0.0, |f| *f),
                    mesh.normals.get(i * 3 + 2).map_or(0.0, |f| *f),
                ],
                tangent: [0.0; 3],
                bitangent: [0.0; 3],
            }
        })
        .collect::<Vec<_>>();

    let count = vertices.len() as u32;
    let mut indices: Vec<u32> = mesh
        .indices
        .chunks_exact(3)
        .filter(|triangle| triangle.iter().all(|i| *i < count))
        .flatten()
        .copied()
        .collect();
    if indices.len() != mesh.indices.len() / 3 * 3 {
        log::warn!(
            "dropped {} out of range triangle(s)",
            (mesh.indices.len() / 3) - indices.len() / 3
        );
    }

    if flip_winding {
        model::flip_winding(&mut indices);
    }
    model::compute_tangents(&mut vertices, &indices);
    (vertices, indices)
}

/// Material index of a mesh. Missing or out of range ids use `fallback`,
/// the default material appended after the MTL ones.
pub fn resolve_material(mesh_name: &str, material_id: Option<usize>, fallback: usize) -> usize {
    match material_id {
        Some(id) if id < fallback => id,
        Some(id) => {
            log::warn!("Mesh {mesh_name} refers to missing material {id}, using the default");
            fallback
        }
        None => fallback,
    }
}

/// Uploads every OBJ mesh. Meshes without a material use `fallback_material`.
pub fn load_meshes(
    models: &[tobj::Model],
    file_name: &str,
    flip_uvs: bool,
    flip_winding: bool,
    fallback_material: usize,
    device: &wgpu::Device,
) -> Vec<model::Mesh> {
    models
        .iter()
        .filter_map(|m| {
            let (vertices, indices) = obj_geometry(&m.mesh, flip_uvs, flip_winding);
            if indices.is_empty() {
                log::warn!("Mesh {} in file {} has no triangles", m.name, file_name);
                return None;
            }
            let label = format!("{file_name}:{}", m.name);
            Some(model::Mesh {
                name: m.name.clone(),
                vertex_array: VertexArray::from_data(device, &label, &vertices, Some(&indices)),
                material: resolve_material(&m.name, m.mesh.material_id, fallback_material),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> tobj::Mesh {
        tobj::Mesh {
            positions: vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
            normals: vec![0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0],
            texcoords: vec![0.0, 0.0, 1.0, 0.0, 0.0, 1.0],
            indices: vec![0, 1, 2],
            ..Default::default()
        }
    }

    #[test]
    fn uvs_flip_by_default_option() {
        let (flipped, _) = obj_geometry(&triangle(), true, false);
        assert_eq!(flipped[2].tex_coords, [0.0, 0.0]);
        assert_eq!(flipped[0].tex_coords, [0.0, 1.0]);
        let (kept, _) = obj_geometry(&triangle(), false, false);
        assert_eq!(kept[2].tex_coords, [0.0, 1.0]);
    }

    #[test]
    fn winding_flip_swaps_triangle_order() {
        let (_, indices) = obj_geometry(&triangle(), false, true);
        assert_eq!(indices, vec![0, 2, 1]);
    }

    #[test]
    fn tangents_are_computed() {
        let (vertices, _) = obj_geometry(&triangle(), false, false);
        for vertex in vertices {
            assert!((vertex.tangent[0] - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn missing_attributes_default_to_zero() {
        let mesh = tobj::Mesh {
            positions: vec![0.0; 9],
            indices: vec![0, 1, 2],
            ..Default::default()
        };
        let (vertices, _) = obj_geometry(&mesh, false, false);
        assert_eq!(vertices.len(), 3);
        assert!(vertices.iter().all(|v| v.normal == [0.0; 3] && v.tex_coords == [0.0; 2]));
    }

    #[test]
    fn material_ids_resolve_to_loaded_or_default() {
        assert_eq!(resolve_material("a", Some(1), 2), 1);
        assert_eq!(resolve_material("b", None, 2), 2);
        assert_eq!(resolve_material("c", Some(2), 2), 2);
        assert_eq!(resolve_material("d", Some(9), 2), 2);
    }

    #[test]
    fn out_of_range_triangles_are_dropped() {
        let mut mesh = triangle();
        mesh.indices.extend([0, 1, 7]);
        let (_, indices) = obj_geometry(&mesh, false, false);
        assert_eq!(indices, vec![0, 1, 2]);
    }
}
