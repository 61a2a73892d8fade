use cgmath::{Matrix4, Vector3};
use serde::{Deserialize, Serialize};

use crate::{
    camera::{CAMERA_GROUP, check_camera_binding},
    data_structures::{
        model::{SimpleVertex, Vertex},
        primitives::{self, PrimitiveMesh, SPHERE_SEGMENTS},
        texture::Texture,
    },
    pipelines::basic::{DepthOptions, PipelineOptions, mk_render_pipeline},
    shader::{ShaderError, ShaderLibrary, ShaderProgram, ShaderStageInfo},
};

/// Lights beyond this count are ignored by the PBR shader.
pub const MAX_LIGHTS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointLight {
    pub position: [f32; 3],
    /// Radiant intensity; values far above one are normal.
    pub color: [f32; 3],
}

impl Default for PointLight {
    fn default() -> Self {
        Self {
            position: [-10.0, 10.0, 10.0],
            color: [300.0, 300.0, 300.0],
        }
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightRaw {
    pub position: [f32; 4],
    pub color: [f32; 4],
}

/// The `LightsUniform` WGSL struct. The exposure and prefilter LOD ride
/// along since every fragment needs them.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightsUniform {
    pub lights: [LightRaw; MAX_LIGHTS],
    pub count: u32,
    pub exposure: f32,
    pub prefilter_max_lod: f32,
    pub _padding: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Lights {
    lights: Vec<PointLight>,
    pub exposure: f32,
}

impl Lights {
    pub fn new(mut lights: Vec<PointLight>, exposure: f32) -> Self {
        if lights.len() > MAX_LIGHTS {
            log::warn!(
                "{} lights configured, only the first {} are used",
                lights.len(),
                MAX_LIGHTS
            );
            lights.truncate(MAX_LIGHTS);
        }
        Self { lights, exposure }
    }

    pub fn lights(&self) -> &[PointLight] {
        &self.lights
    }

    pub fn to_uniform(&self, prefilter_max_lod: f32) -> LightsUniform {
        let mut raw = [LightRaw::default(); MAX_LIGHTS];
        for (slot, light) in raw.iter_mut().zip(&self.lights) {
            let [x, y, z] = light.position;
            let [r, g, b] = light.color;
            *slot = LightRaw {
                position: [x, y, z, 1.0],
                color: [r, g, b, 1.0],
            };
        }
        LightsUniform {
            lights: raw,
            count: self.lights.len() as u32,
            exposure: self.exposure,
            prefilter_max_lod,
            _padding: 0.0,
        }
    }
}

/// Per-instance data of a light marker sphere.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightInstance {
    pub model: [[f32; 4]; 4],
    pub color: [f32; 4],
}

impl LightInstance {
    pub fn new(light: &PointLight, scale: f32) -> Self {
        let model = Matrix4::from_translation(Vector3::from(light.position)) * Matrix4::from_scale(scale);
        let [r, g, b] = light.color;
        Self {
            model: model.into(),
            color: [r, g, b, 1.0],
        }
    }
}

impl Vertex for LightInstance {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        const ATTRIBUTES: [wgpu::VertexAttribute; 5] = wgpu::vertex_attr_array![
            5 => Float32x4,
            6 => Float32x4,
            7 => Float32x4,
            8 => Float32x4,
            9 => Float32x4,
        ];
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<LightInstance>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &ATTRIBUTES,
        }
    }
}

/// A small sphere at each light, drawn in the light's tonemapped colour.
#[derive(Debug)]
pub struct LightMarkers {
    pipeline: wgpu::RenderPipeline,
    sphere: PrimitiveMesh,
    instances: wgpu::Buffer,
    count: u32,
    pub scale: f32,
}

impl LightMarkers {
    pub fn new(
        device: &wgpu::Device,
        library: &ShaderLibrary,
        camera_layout: &wgpu::BindGroupLayout,
        color_format: wgpu::TextureFormat,
    ) -> Result<Self, ShaderError> {
        let program = ShaderProgram::new(
            device,
            "light.wgsl",
            library,
            &ShaderStageInfo::render("light.wgsl"),
        )?;
        check_camera_binding(&program)?;
        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Light Pipeline Layout"),
            bind_group_layouts: &[camera_layout],
            push_constant_ranges: &[],
        });
        let pipeline = mk_render_pipeline(
            device,
            "Light Pipeline",
            &layout,
            &program,
            color_format,
            &[SimpleVertex::desc(), LightInstance::desc()],
            &PipelineOptions {
                topology: wgpu::PrimitiveTopology::TriangleStrip,
                // Alternating strip rows flip the winding, so no culling.
                cull_mode: None,
                depth: Some(DepthOptions {
                    format: Texture::DEPTH_FORMAT,
                    write: true,
                    compare: wgpu::CompareFunction::Less,
                }),
                ..Default::default()
            },
        )?;
        let sphere = PrimitiveMesh::new(
            device,
            "Light Sphere",
            &primitives::sphere(SPHERE_SEGMENTS, SPHERE_SEGMENTS),
        );
        let instances = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Light Instance Buffer"),
            size: (std::mem::size_of::<LightInstance>() * MAX_LIGHTS) as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        Ok(Self {
            pipeline,
            sphere,
            instances,
            count: 0,
            scale: 0.5,
        })
    }

    pub fn update(&mut self, queue: &wgpu::Queue, lights: &Lights) {
        let instances: Vec<LightInstance> = lights
            .lights()
            .iter()
            .map(|light| LightInstance::new(light, self.scale))
            .collect();
        queue.write_buffer(&self.instances, 0, bytemuck::cast_slice(&instances));
        self.count = instances.len() as u32;
    }

    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>, camera_bind_group: &wgpu::BindGroup) {
        if self.count == 0 {
            return;
        }
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(CAMERA_GROUP, camera_bind_group, &[]);
        pass.set_vertex_buffer(1, self.instances.slice(..));
        self.sphere.draw(pass, 0..self.count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_matches_wgsl_layout() {
        assert_eq!(std::mem::size_of::<LightsUniform>(), 144);
        assert_eq!(LightInstance::desc().array_stride, 80);
    }

    #[test]
    fn extra_lights_are_dropped() {
        let lights = Lights::new(vec![PointLight::default(); 6], 1.0);
        assert_eq!(lights.lights().len(), MAX_LIGHTS);
        assert_eq!(lights.to_uniform(4.0).count, 4);
    }

    #[test]
    fn uniform_packs_positions_and_colors() {
        let lights = Lights::new(
            vec![PointLight {
                position: [1.0, 2.0, 3.0],
                color: [10.0, 20.0, 30.0],
            }],
            2.0,
        );
        let uniform = lights.to_uniform(4.0);
        assert_eq!(uniform.count, 1);
        assert_eq!(uniform.exposure, 2.0);
        assert_eq!(uniform.prefilter_max_lod, 4.0);
        assert_eq!(uniform.lights[0].position, [1.0, 2.0, 3.0, 1.0]);
        assert_eq!(uniform.lights[0].color, [10.0, 20.0, 30.0, 1.0]);
        assert_eq!(uniform.lights[1], LightRaw::default());
    }

    #[test]
    fn marker_instance_places_scaled_sphere() {
        let instance = LightInstance::new(&PointLight::default(), 0.5);
        assert_eq!(instance.model[3], [-10.0, 10.0, 10.0, 1.0]);
        assert_eq!(instance.model[0][0], 0.5);
        assert_eq!(instance.color, [300.0, 300.0, 300.0, 1.0]);
    }
}
