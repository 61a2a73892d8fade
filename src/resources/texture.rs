use std::path::Path;

use crate::{
    data_structures::{
        material::{PbrMaterial, PbrParameter, roughness_from_shininess},
        texture::{ColorSpace, Texture},
    },
    resources::ResourceManager,
};

/// Where an MTL texture ends up on a PBR material.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MtlSlot {
    Parameter(PbrParameter),
    AlphaMask,
}

/// Texture maps of an MTL material and the slot each one fills.
///
/// MTL has no PBR maps, so the classic slots are repurposed: the ambient map
/// carries metallic, the shininess map carries roughness and the bump map
/// carries the normal map.
pub fn mtl_texture_slots(material: &tobj::Material) -> Vec<(MtlSlot, String)> {
    [
        (MtlSlot::Parameter(PbrParameter::Albedo), &material.diffuse_texture),
        (MtlSlot::Parameter(PbrParameter::Metallic), &material.ambient_texture),
        (MtlSlot::Parameter(PbrParameter::Normal), &material.normal_texture),
        (MtlSlot::Parameter(PbrParameter::Roughness), &material.shininess_texture),
        (MtlSlot::AlphaMask, &material.dissolve_texture),
    ]
    .into_iter()
    .filter_map(|(slot, path)| {
        let path = path.as_deref()?.trim();
        (!path.is_empty()).then(|| (slot, path.replace('\\', "/")))
    })
    .collect()
}

/// A PBR material with the MTL colours applied and no textures yet.
pub fn mtl_base_material(material: &tobj::Material) -> PbrMaterial {
    let mut pbr = PbrMaterial::new(&material.name);
    if let Some(diffuse) = material.diffuse {
        pbr.set_color(PbrParameter::Albedo, diffuse);
    }
    if let Some(shininess) = material.shininess {
        pbr.set_color(PbrParameter::Roughness, [roughness_from_shininess(shininess); 3]);
    }
    pbr.set_color(PbrParameter::Metallic, [0.0; 3]);
    if let Some(dissolve) = material.dissolve {
        pbr.alpha = dissolve.clamp(0.0, 1.0);
    }
    pbr
}

/// Builds the PBR materials of an OBJ file.
///
/// Texture paths are relative to `model_dir`. A texture that can't be loaded
/// is logged and the slot keeps its colour. The albedo colour is reset to
/// white once a diffuse map is bound, since the shader multiplies the two.
pub async fn load_mtl_materials(
    manager: &ResourceManager,
    model_dir: &Path,
    materials: &[tobj::Material],
    device: &wgpu::Device,
    queue: &wgpu::Queue,
) -> Vec<PbrMaterial> {
    let mut loaded = Vec::with_capacity(materials.len());
    for material in materials {
        let mut pbr = mtl_base_material(material);
        for (slot, relative) in mtl_texture_slots(material) {
            let color_space = match slot {
                MtlSlot::Parameter(parameter) => parameter.color_space(),
                MtlSlot::AlphaMask => ColorSpace::Linear,
            };
            let path = model_dir.join(&relative);
            let texture: Texture = match manager.load_texture(&path, color_space, device, queue).await {
                Ok(texture) => texture,
                Err(e) => {
                    log::warn!(
                        "Material {}: texture {} not loaded, using its colour instead: {:#}",
                        material.name,
                        relative,
                        e
                    );
                    continue;
                }
            };
            match slot {
                MtlSlot::Parameter(PbrParameter::Albedo) => {
                    pbr.set_color(PbrParameter::Albedo, [1.0; 3]);
                    pbr.set_texture(PbrParameter::Albedo, texture);
                }
                MtlSlot::Parameter(parameter) => pbr.set_texture(parameter, texture),
                MtlSlot::AlphaMask => pbr.alpha_mask = Some(texture),
            }
        }
        loaded.push(pbr);
    }
    loaded
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nanosuit_like() -> tobj::Material {
        tobj::Material {
            name: "Glass".to_string(),
            diffuse: Some([0.6, 0.6, 0.6]),
            shininess: Some(98.0),
            dissolve: Some(0.5),
            diffuse_texture: Some("glass_dif.png".to_string()),
            ambient_texture: Some("glass_metal.png".to_string()),
            normal_texture: Some("textures\\glass_ddn.png".to_string()),
            shininess_texture: Some("  ".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn mtl_maps_fill_pbr_slots() {
        let slots = mtl_texture_slots(&nanosuit_like());
        assert_eq!(
            slots,
            vec![
                (MtlSlot::Parameter(PbrParameter::Albedo), "glass_dif.png".to_string()),
                (MtlSlot::Parameter(PbrParameter::Metallic), "glass_metal.png".to_string()),
                (
                    MtlSlot::Parameter(PbrParameter::Normal),
                    "textures/glass_ddn.png".to_string()
                ),
            ]
        );
    }

    #[test]
    fn mtl_colours_become_fallbacks() {
        let pbr = mtl_base_material(&nanosuit_like());
        assert_eq!(pbr.name, "Glass");
        assert_eq!(pbr.color(PbrParameter::Albedo), [0.6; 3]);
        assert!((pbr.color(PbrParameter::Roughness)[0] - 0.1414).abs() < 1e-3);
        assert_eq!(pbr.color(PbrParameter::Metallic), [0.0; 3]);
        assert_eq!(pbr.alpha, 0.5);
    }

    #[test]
    fn dissolve_map_becomes_alpha_mask() {
        let material = tobj::Material {
            dissolve_texture: Some("mask.png".to_string()),
            ..Default::default()
        };
        assert_eq!(
            mtl_texture_slots(&material),
            vec![(MtlSlot::AlphaMask, "mask.png".to_string())]
        );
    }
}
