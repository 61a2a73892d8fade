//! Physically based materials.
//!
//! A [`PbrMaterial`] has five parameter slots (albedo, ambient occlusion,
//! metallic, normal and roughness). Each slot is either a texture or a flat
//! colour. An optional alpha mask cuts out texels below one half.

use wgpu::util::DeviceExt;

use crate::data_structures::texture::{self, ColorSpace, Texture};
use crate::shader::{ShaderError, ShaderProgram};

/// Bind group of the material textures, as the PBR program reflects it.
pub const MATERIAL_GROUP: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PbrParameter {
    Albedo,
    Ao,
    Metallic,
    Normal,
    Roughness,
}

impl PbrParameter {
    pub const ALL: [PbrParameter; 5] = [
        PbrParameter::Albedo,
        PbrParameter::Ao,
        PbrParameter::Metallic,
        PbrParameter::Normal,
        PbrParameter::Roughness,
    ];

    fn index(self) -> usize {
        self as usize
    }

    /// Albedo is the only colour-authored slot.
    pub fn color_space(self) -> ColorSpace {
        match self {
            PbrParameter::Albedo => ColorSpace::Srgb,
            _ => ColorSpace::Linear,
        }
    }

    fn default_color(self) -> [f32; 3] {
        match self {
            PbrParameter::Albedo | PbrParameter::Ao => [1.0; 3],
            PbrParameter::Metallic => [0.0; 3],
            PbrParameter::Normal => [0.5, 0.5, 1.0],
            PbrParameter::Roughness => [0.5; 3],
        }
    }
}

/// Material parameters as laid out in the `MaterialParams` WGSL struct.
///
/// The `*_set` flags are 1 when the matching texture is bound and -1 when
/// the shader should use the factor instead.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MaterialParams {
    pub base_color: [f32; 4],
    pub metallic_factor: f32,
    pub roughness_factor: f32,
    pub ao_factor: f32,
    pub alpha: f32,
    pub albedo_texture_set: i32,
    pub normal_texture_set: i32,
    pub metallic_texture_set: i32,
    pub roughness_texture_set: i32,
    pub ao_texture_set: i32,
    pub alpha_mask_set: i32,
    pub packed_metallic_roughness: i32,
    pub _padding: i32,
}

fn texture_flag(set: bool) -> i32 {
    if set { 1 } else { -1 }
}

#[derive(Debug, Clone)]
pub struct PbrMaterial {
    pub name: String,
    textures: [Option<Texture>; 5],
    colors: [[f32; 3]; 5],
    pub alpha_mask: Option<Texture>,
    pub alpha: f32,
    /// glTF style metallic-roughness texture: roughness in G, metallic in B.
    pub packed_metallic_roughness: bool,
}

impl PbrMaterial {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            textures: Default::default(),
            colors: PbrParameter::ALL.map(PbrParameter::default_color),
            alpha_mask: None,
            alpha: 1.0,
            packed_metallic_roughness: false,
        }
    }

    pub fn set_texture(&mut self, parameter: PbrParameter, texture: Texture) {
        self.textures[parameter.index()] = Some(texture);
    }

    pub fn set_color(&mut self, parameter: PbrParameter, color: [f32; 3]) {
        self.colors[parameter.index()] = color;
    }

    pub fn texture(&self, parameter: PbrParameter) -> Option<&Texture> {
        self.textures[parameter.index()].as_ref()
    }

    pub fn color(&self, parameter: PbrParameter) -> [f32; 3] {
        self.colors[parameter.index()]
    }

    pub fn has_texture(&self, parameter: PbrParameter) -> bool {
        self.textures[parameter.index()].is_some()
    }

    pub fn params(&self) -> MaterialParams {
        let albedo = self.color(PbrParameter::Albedo);
        MaterialParams {
            base_color: [albedo[0], albedo[1], albedo[2], self.alpha],
            metallic_factor: self.color(PbrParameter::Metallic)[0],
            roughness_factor: self.color(PbrParameter::Roughness)[0],
            ao_factor: self.color(PbrParameter::Ao)[0],
            alpha: self.alpha,
            albedo_texture_set: texture_flag(self.has_texture(PbrParameter::Albedo)),
            normal_texture_set: texture_flag(self.has_texture(PbrParameter::Normal)),
            metallic_texture_set: texture_flag(self.has_texture(PbrParameter::Metallic)),
            roughness_texture_set: texture_flag(self.has_texture(PbrParameter::Roughness)),
            ao_texture_set: texture_flag(self.has_texture(PbrParameter::Ao)),
            alpha_mask_set: texture_flag(self.alpha_mask.is_some()),
            packed_metallic_roughness: self.packed_metallic_roughness as i32,
            _padding: 0,
        }
    }
}

/// Bind group layout of a material, with binding indices taken from the
/// program's reflection instead of hard-coded.
#[derive(Debug)]
pub struct MaterialLayout {
    pub layout: wgpu::BindGroupLayout,
    texture_slots: [u32; 5],
    alpha_mask_slot: u32,
    sampler_slot: u32,
    params_slot: u32,
}

fn slot_name(parameter: PbrParameter) -> &'static str {
    match parameter {
        PbrParameter::Albedo => "albedo_map",
        PbrParameter::Ao => "ao_map",
        PbrParameter::Metallic => "metallic_map",
        PbrParameter::Normal => "normal_map",
        PbrParameter::Roughness => "roughness_map",
    }
}

fn texture_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            multisampled: false,
            view_dimension: wgpu::TextureViewDimension::D2,
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
        },
        count: None,
    }
}

impl MaterialLayout {
    pub fn new(device: &wgpu::Device, program: &ShaderProgram) -> Result<Self, ShaderError> {
        let mut texture_slots = [0; 5];
        for parameter in PbrParameter::ALL {
            texture_slots[parameter.index()] = program.slot(slot_name(parameter), MATERIAL_GROUP)?;
        }
        let alpha_mask_slot = program.slot("alpha_mask", MATERIAL_GROUP)?;
        let sampler_slot = program.slot("material_sampler", MATERIAL_GROUP)?;
        let params_slot = program.slot("material", MATERIAL_GROUP)?;

        let mut entries: Vec<_> = texture_slots.iter().map(|slot| texture_entry(*slot)).collect();
        entries.push(texture_entry(alpha_mask_slot));
        entries.push(wgpu::BindGroupLayoutEntry {
            binding: sampler_slot,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
            count: None,
        });
        entries.push(wgpu::BindGroupLayoutEntry {
            binding: params_slot,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: wgpu::BufferSize::new(
                    std::mem::size_of::<MaterialParams>() as u64
                ),
            },
            count: None,
        });

        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("material_bind_group_layout"),
            entries: &entries,
        });
        Ok(Self {
            layout,
            texture_slots,
            alpha_mask_slot,
            sampler_slot,
            params_slot,
        })
    }
}

/// Fallback textures bound in place of missing material maps.
#[derive(Debug)]
pub struct MaterialDefaults {
    pub white_srgb: Texture,
    pub white_linear: Texture,
    pub normal: Texture,
    pub sampler: wgpu::Sampler,
}

impl MaterialDefaults {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        Self {
            white_srgb: Texture::solid_color(
                device,
                queue,
                [255; 4],
                ColorSpace::Srgb,
                "default albedo",
            ),
            white_linear: Texture::solid_color(
                device,
                queue,
                [255; 4],
                ColorSpace::Linear,
                "default data map",
            ),
            normal: Texture::create_default_normal_map(device, queue),
            sampler: texture::create_default_sampler(device),
        }
    }

    fn fallback(&self, parameter: PbrParameter) -> &Texture {
        match parameter {
            PbrParameter::Albedo => &self.white_srgb,
            PbrParameter::Normal => &self.normal,
            _ => &self.white_linear,
        }
    }
}

/// GPU side of an uploaded material.
#[derive(Debug)]
pub struct MaterialBinding {
    pub params: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
}

impl PbrMaterial {
    pub fn upload(
        &self,
        device: &wgpu::Device,
        defaults: &MaterialDefaults,
        layout: &MaterialLayout,
    ) -> MaterialBinding {
        let params = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} params", self.name)),
            contents: bytemuck::bytes_of(&self.params()),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let mut entries: Vec<_> = PbrParameter::ALL
            .iter()
            .map(|parameter| wgpu::BindGroupEntry {
                binding: layout.texture_slots[parameter.index()],
                resource: wgpu::BindingResource::TextureView(
                    &self
                        .texture(*parameter)
                        .unwrap_or_else(|| defaults.fallback(*parameter))
                        .view,
                ),
            })
            .collect();
        entries.push(wgpu::BindGroupEntry {
            binding: layout.alpha_mask_slot,
            resource: wgpu::BindingResource::TextureView(
                &self.alpha_mask.as_ref().unwrap_or(&defaults.white_linear).view,
            ),
        });
        entries.push(wgpu::BindGroupEntry {
            binding: layout.sampler_slot,
            resource: wgpu::BindingResource::Sampler(&defaults.sampler),
        });
        entries.push(wgpu::BindGroupEntry {
            binding: layout.params_slot,
            resource: params.as_entire_binding(),
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&format!("{} bind group", self.name)),
            layout: &layout.layout,
            entries: &entries,
        });
        MaterialBinding { params, bind_group }
    }
}

/// Roughness equivalent of a Blinn-Phong specular exponent.
pub fn roughness_from_shininess(shininess: f32) -> f32 {
    (2.0 / (shininess.max(0.0) + 2.0)).sqrt().clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn untextured_material_uses_factors() {
        let mut material = PbrMaterial::new("plain");
        material.set_color(PbrParameter::Albedo, [0.2, 0.4, 0.6]);
        material.set_color(PbrParameter::Roughness, [0.8; 3]);
        material.alpha = 0.5;
        let params = material.params();
        assert_eq!(params.base_color, [0.2, 0.4, 0.6, 0.5]);
        assert_eq!(params.roughness_factor, 0.8);
        assert_eq!(params.metallic_factor, 0.0);
        assert_eq!(params.albedo_texture_set, -1);
        assert_eq!(params.normal_texture_set, -1);
        assert_eq!(params.alpha_mask_set, -1);
        assert_eq!(params.packed_metallic_roughness, 0);
    }

    #[test]
    fn default_colors_follow_parameter() {
        let material = PbrMaterial::new("defaults");
        assert_eq!(material.color(PbrParameter::Albedo), [1.0; 3]);
        assert_eq!(material.color(PbrParameter::Metallic), [0.0; 3]);
        assert_eq!(material.color(PbrParameter::Roughness), [0.5; 3]);
        assert!(PbrParameter::ALL.iter().all(|p| !material.has_texture(*p)));
    }

    #[test]
    fn params_match_wgsl_layout() {
        assert_eq!(std::mem::size_of::<MaterialParams>(), 64);
    }

    #[test]
    fn shininess_maps_into_unit_roughness() {
        assert_eq!(roughness_from_shininess(0.0), 1.0);
        assert!((roughness_from_shininess(98.0) - 0.1414).abs() < 1e-3);
        assert!(roughness_from_shininess(10_000.0) < 0.02);
    }

    #[test]
    fn only_albedo_is_srgb() {
        for parameter in PbrParameter::ALL {
            let expected = if parameter == PbrParameter::Albedo {
                ColorSpace::Srgb
            } else {
                ColorSpace::Linear
            };
            assert_eq!(parameter.color_space(), expected);
        }
    }
}
