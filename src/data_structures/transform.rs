//! Model transforms and their GPU uniform.

use cgmath::{Deg, InnerSpace, Matrix, Matrix4, One, Quaternion, Rotation3, SquareMatrix, Vector3};

use crate::shader::{ShaderError, ShaderProgram, UniformBuffer};

/// Bind group of the per-model uniform.
pub const MODEL_GROUP: u32 = 3;

/// Translation, rotation and scale of a model.
///
/// Calls accumulate: two `translate` calls add up, two `rotate` calls
/// compose, two `scale` calls multiply.
#[derive(Clone, Debug, PartialEq)]
pub struct Transform {
    pub translation: Vector3<f32>,
    pub rotation: Quaternion<f32>,
    pub scale: Vector3<f32>,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            translation: Vector3::new(0.0, 0.0, 0.0),
            rotation: Quaternion::one(),
            scale: Vector3::new(1.0, 1.0, 1.0),
        }
    }
}

impl Transform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scale(&mut self, factor: Vector3<f32>) -> &mut Self {
        self.scale = Vector3::new(
            self.scale.x * factor.x,
            self.scale.y * factor.y,
            self.scale.z * factor.z,
        );
        self
    }

    /// Rotates by `degrees` around `axis`. A zero axis is ignored.
    pub fn rotate(&mut self, degrees: f32, axis: Vector3<f32>) -> &mut Self {
        if axis.magnitude2() > f32::EPSILON {
            self.rotation = self.rotation * Quaternion::from_axis_angle(axis.normalize(), Deg(degrees));
        }
        self
    }

    pub fn translate(&mut self, offset: Vector3<f32>) -> &mut Self {
        self.translation += offset;
        self
    }

    /// `translate · rotate · scale`
    pub fn matrix(&self) -> Matrix4<f32> {
        Matrix4::from_translation(self.translation)
            * Matrix4::from(self.rotation)
            * Matrix4::from_nonuniform_scale(self.scale.x, self.scale.y, self.scale.z)
    }

    pub fn to_uniform(&self) -> ModelUniform {
        ModelUniform::from_matrix(self.matrix())
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ModelUniform {
    pub model: [[f32; 4]; 4],
    /// Inverse transpose of `model`, for transforming normals.
    pub normal: [[f32; 4]; 4],
}

impl Default for ModelUniform {
    fn default() -> Self {
        Self::from_matrix(Matrix4::identity())
    }
}

impl ModelUniform {
    pub fn from_matrix(model: Matrix4<f32>) -> Self {
        let normal = model
            .invert()
            .map(|inverse| inverse.transpose())
            .unwrap_or_else(Matrix4::identity);
        Self {
            model: model.into(),
            normal: normal.into(),
        }
    }
}

/// Layout of the model transform group, with the binding index reflected
/// from the program.
#[derive(Debug)]
pub struct ModelLayout {
    pub layout: wgpu::BindGroupLayout,
    slot: u32,
}

impl ModelLayout {
    pub fn new(device: &wgpu::Device, program: &ShaderProgram) -> Result<Self, ShaderError> {
        let slot = program.slot("model", MODEL_GROUP)?;
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("model_bind_group_layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: slot,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: wgpu::BufferSize::new(
                        std::mem::size_of::<ModelUniform>() as u64
                    ),
                },
                count: None,
            }],
        });
        Ok(Self { layout, slot })
    }
}

/// A model uniform buffer with its bind group.
#[derive(Debug)]
pub struct TransformBinding {
    pub uniform: UniformBuffer<ModelUniform>,
    pub bind_group: wgpu::BindGroup,
}

impl TransformBinding {
    pub fn new(device: &wgpu::Device, layout: &ModelLayout, label: &str, value: ModelUniform) -> Self {
        let uniform = UniformBuffer::new(device, label, value);
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout: &layout.layout,
            entries: &[wgpu::BindGroupEntry {
                binding: layout.slot,
                resource: uniform.binding_resource(),
            }],
        });
        Self { uniform, bind_group }
    }

    pub fn set(&mut self, queue: &wgpu::Queue, value: ModelUniform) {
        if *self.uniform.get() != value {
            self.uniform.set(value);
            self.uniform.write(queue);
        }
    }
}
