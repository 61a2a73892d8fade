#[cfg(feature = "integration-tests")]
mod common;

#[cfg(feature = "integration-tests")]
const TWO_OBJECTS_OBJ: &str = "\
mtllib box.mtl
v -1.0 -1.0 0.0
v 1.0 -1.0 0.0
v 1.0 1.0 0.0
v -1.0 1.0 0.0
vt 0.0 0.0
vt 1.0 0.0
vt 1.0 1.0
vt 0.0 1.0
vn 0.0 0.0 1.0
o plain
f 1/1/1 2/2/1 3/3/1
o painted
usemtl Painted
f 1/1/1 3/3/1 4/4/1
";

#[cfg(feature = "integration-tests")]
const PAINTED_MTL: &str = "\
newmtl Painted
Kd 0.2 0.4 0.6
Ns 32.0
map_Kd textures/missing_diffuse.png
";

#[test]
#[cfg(feature = "integration-tests")]
fn obj_materials_resolve_next_to_the_model() {
    use ibl_ngin::{
        data_structures::material::PbrParameter,
        resources::{ObjLoadOptions, load_model_obj},
    };

    let gpu = common::Gpu::new();
    let resources = gpu.model_resources();
    let assets = common::TempAssets::new("obj");
    assets.write("models/box.obj", TWO_OBJECTS_OBJ);
    assets.write("models/box.mtl", PAINTED_MTL);
    let manager = assets.manager();

    let model = gpu
        .runtime
        .block_on(load_model_obj(
            &manager,
            "models/box.obj",
            ObjLoadOptions::default(),
            &gpu.device,
            &gpu.queue,
            &resources,
        ))
        .expect("obj loads");

    assert_eq!(model.meshes.len(), 2);
    // The MTL material plus the appended default.
    assert_eq!(model.materials.len(), 2);
    assert_eq!(model.materials[1].name, "default");

    let painted = &model.materials[0];
    assert_eq!(painted.name, "Painted");
    // The diffuse map doesn't exist, so the Kd colour stays.
    assert!(!painted.has_texture(PbrParameter::Albedo));
    let albedo = painted.color(PbrParameter::Albedo);
    for (actual, expected) in albedo.iter().zip([0.2, 0.4, 0.6]) {
        common::assert_close(*actual, expected, 1e-6, "albedo");
    }

    let plain = model.meshes.iter().find(|m| m.name == "plain").expect("plain mesh");
    let painted_mesh = model.meshes.iter().find(|m| m.name == "painted").expect("painted mesh");
    assert_eq!(plain.material, 1);
    assert_eq!(painted_mesh.material, 0);
    assert!(painted_mesh.vertex_array.is_indexed());
    assert_eq!(painted_mesh.vertex_array.count(), 3);
}

#[test]
#[cfg(feature = "integration-tests")]
fn missing_obj_is_an_error() {
    use ibl_ngin::resources::{ObjLoadOptions, load_model_obj};

    let gpu = common::Gpu::new();
    let resources = gpu.model_resources();
    let assets = common::TempAssets::new("obj-missing");

    let err = gpu
        .runtime
        .block_on(load_model_obj(
            &assets.manager(),
            "models/nope.obj",
            ObjLoadOptions::default(),
            &gpu.device,
            &gpu.queue,
            &resources,
        ))
        .unwrap_err();
    assert!(format!("{err:#}").contains("nope.obj"), "got {err:#}");
}

/// One triangle with normals, uvs and tangents of negative handedness,
/// followed by u16 indices.
#[cfg(feature = "integration-tests")]
fn triangle_buffer() -> Vec<u8> {
    let mut data: Vec<f32> = Vec::new();
    data.extend([0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0]);
    data.extend([0.0, 0.0, 1.0].repeat(3));
    data.extend([0.0, 0.0, 1.0, 0.0, 0.0, 1.0]);
    data.extend([1.0, 0.0, 0.0, -1.0].repeat(3));
    let mut bytes = bytemuck::cast_slice::<f32, u8>(&data).to_vec();
    bytes.extend_from_slice(bytemuck::cast_slice::<u16, u8>(&[0, 1, 2, 0]));
    bytes
}

/// A mesh node under a translated root, with one material.
#[cfg(feature = "integration-tests")]
const NESTED_GLTF: &str = r#"{
    "asset": { "version": "2.0" },
    "buffers": [ { "byteLength": 152, "uri": "triangle.bin" } ],
    "bufferViews": [
        { "buffer": 0, "byteOffset": 0, "byteLength": 36 },
        { "buffer": 0, "byteOffset": 36, "byteLength": 36 },
        { "buffer": 0, "byteOffset": 72, "byteLength": 24 },
        { "buffer": 0, "byteOffset": 96, "byteLength": 48 },
        { "buffer": 0, "byteOffset": 144, "byteLength": 6 }
    ],
    "accessors": [
        { "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
          "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0] },
        { "bufferView": 1, "componentType": 5126, "count": 3, "type": "VEC3" },
        { "bufferView": 2, "componentType": 5126, "count": 3, "type": "VEC2" },
        { "bufferView": 3, "componentType": 5126, "count": 3, "type": "VEC4" },
        { "bufferView": 4, "componentType": 5123, "count": 3, "type": "SCALAR" }
    ],
    "materials": [ {
        "name": "red",
        "pbrMetallicRoughness": {
            "baseColorFactor": [0.8, 0.2, 0.2, 1.0],
            "metallicFactor": 0.0,
            "roughnessFactor": 0.7
        }
    } ],
    "meshes": [ { "name": "triangle", "primitives": [ {
        "attributes": { "POSITION": 0, "NORMAL": 1, "TEXCOORD_0": 2, "TANGENT": 3 },
        "indices": 4,
        "material": 0
    } ] } ],
    "nodes": [
        { "name": "root", "translation": [0.0, 0.0, -2.0], "children": [1] },
        { "name": "leaf", "translation": [1.0, 0.0, 0.0], "scale": [2.0, 2.0, 2.0], "mesh": 0 }
    ],
    "scene": 0,
    "scenes": [ { "nodes": [0] } ]
}"#;

#[test]
#[cfg(feature = "integration-tests")]
fn gltf_nodes_get_their_world_matrices() {
    use cgmath::Vector3;
    use ibl_ngin::{data_structures::material::PbrParameter, resources::load_model_gltf};

    let gpu = common::Gpu::new();
    let resources = gpu.model_resources();
    let assets = common::TempAssets::new("gltf");
    assets.write("scene/nested.gltf", NESTED_GLTF);
    assets.write("scene/triangle.bin", triangle_buffer());

    let mut model = gpu
        .runtime
        .block_on(load_model_gltf(
            &assets.manager(),
            "scene/nested.gltf",
            &gpu.device,
            &gpu.queue,
            &resources,
        ))
        .expect("gltf loads");

    assert_eq!(model.meshes.len(), 1);
    let primitive = &model.meshes[0].primitives[0];
    assert_eq!(primitive.material, 0);
    assert_eq!(primitive.vertex_array.count(), 3);
    assert_eq!(model.materials.len(), 2);
    let red = &model.materials[0];
    common::assert_close(red.color(PbrParameter::Albedo)[0], 0.8, 1e-6, "base colour");
    common::assert_close(red.color(PbrParameter::Roughness)[0], 0.7, 1e-6, "roughness");

    // Only the node carrying a mesh gets a uniform.
    assert!(model.node_binding(0).is_none());
    let leaf = model.node_binding(1).expect("leaf binding").uniform.get().model;
    assert_eq!(leaf[3], [1.0, 0.0, -2.0, 1.0]);
    assert_eq!(leaf[0][0], 2.0);

    model.transform.translate(Vector3::new(0.0, 5.0, 0.0));
    model.update(&gpu.queue);
    let moved = model.node_binding(1).expect("leaf binding").uniform.get().model;
    assert_eq!(moved[3], [1.0, 5.0, -2.0, 1.0]);
}

#[test]
#[cfg(feature = "integration-tests")]
fn gltf_without_its_buffer_fails_to_load() {
    use ibl_ngin::resources::load_model_gltf;

    let gpu = common::Gpu::new();
    let resources = gpu.model_resources();
    let assets = common::TempAssets::new("gltf-missing-bin");
    assets.write("scene/nested.gltf", NESTED_GLTF);

    let err = gpu
        .runtime
        .block_on(load_model_gltf(
            &assets.manager(),
            "scene/nested.gltf",
            &gpu.device,
            &gpu.queue,
            &resources,
        ))
        .unwrap_err();
    assert!(format!("{err:#}").contains("triangle.bin"), "got {err:#}");
}
