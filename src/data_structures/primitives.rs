//! Procedural shapes: the unit cube used for cubemap captures and the skybox,
//! the fullscreen quad of the BRDF bake and the UV sphere drawn for lights.

use std::f32::consts::PI;

use crate::data_structures::{model::SimpleVertex, vertex_array::VertexArray};

/// Default segment count of [`sphere`] along both axes.
pub const SPHERE_SEGMENTS: u32 = 64;

/// Geometry generated on the CPU: vertices, optional indices and the
/// primitive topology they are meant to be drawn with.
#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
    pub vertices: Vec<SimpleVertex>,
    pub indices: Option<Vec<u32>>,
    pub topology: wgpu::PrimitiveTopology,
}

/// Unit cube spanning -1..1, 36 vertices, counter-clockwise from outside.
pub fn cube() -> Shape {
    // (normal, u axis, v axis) of each face; u × v points along the normal.
    let faces: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
        ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
        ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
        ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
        ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
        ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
    ];
    let corner = |n: [f32; 3], u: [f32; 3], v: [f32; 3], s: f32, t: f32| {
        let position = [
            n[0] + u[0] * (2.0 * s - 1.0) + v[0] * (2.0 * t - 1.0),
            n[1] + u[1] * (2.0 * s - 1.0) + v[1] * (2.0 * t - 1.0),
            n[2] + u[2] * (2.0 * s - 1.0) + v[2] * (2.0 * t - 1.0),
        ];
        SimpleVertex {
            position,
            normal: n,
            uv: [s, t],
        }
    };

    let mut vertices = Vec::with_capacity(36);
    for (n, u, v) in faces {
        for (s, t) in [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (1.0, 1.0), (0.0, 1.0), (0.0, 0.0)] {
            vertices.push(corner(n, u, v, s, t));
        }
    }
    Shape {
        vertices,
        indices: None,
        topology: wgpu::PrimitiveTopology::TriangleList,
    }
}

/// Fullscreen quad in clip space as a four vertex strip.
pub fn quad() -> Shape {
    let vertex = |x: f32, y: f32, u: f32, v: f32| SimpleVertex {
        position: [x, y, 0.0],
        normal: [0.0, 0.0, 1.0],
        uv: [u, v],
    };
    Shape {
        vertices: vec![
            vertex(-1.0, 1.0, 0.0, 1.0),
            vertex(-1.0, -1.0, 0.0, 0.0),
            vertex(1.0, 1.0, 1.0, 1.0),
            vertex(1.0, -1.0, 1.0, 0.0),
        ],
        indices: None,
        topology: wgpu::PrimitiveTopology::TriangleStrip,
    }
}

/// Unit UV sphere as one indexed triangle strip.
///
/// Rows are walked in alternating directions so consecutive rows share
/// their turning vertex and the strip never needs a restart.
pub fn sphere(x_segments: u32, y_segments: u32) -> Shape {
    let x_segments = x_segments.max(3);
    let y_segments = y_segments.max(2);

    let mut vertices = Vec::with_capacity(((x_segments + 1) * (y_segments + 1)) as usize);
    for y in 0..=y_segments {
        for x in 0..=x_segments {
            let u = x as f32 / x_segments as f32;
            let v = y as f32 / y_segments as f32;
            let position = [
                (u * 2.0 * PI).cos() * (v * PI).sin(),
                (v * PI).cos(),
                (u * 2.0 * PI).sin() * (v * PI).sin(),
            ];
            vertices.push(SimpleVertex {
                position,
                normal: position,
                uv: [u, v],
            });
        }
    }

    let row = x_segments + 1;
    let mut indices = Vec::with_capacity((y_segments * row * 2) as usize);
    for y in 0..y_segments {
        if y % 2 == 0 {
            for x in 0..=x_segments {
                indices.push(y * row + x);
                indices.push((y + 1) * row + x);
            }
        } else {
            for x in (0..=x_segments).rev() {
                indices.push((y + 1) * row + x);
                indices.push(y * row + x);
            }
        }
    }

    Shape {
        vertices,
        indices: Some(indices),
        topology: wgpu::PrimitiveTopology::TriangleStrip,
    }
}

/// A [`Shape`] uploaded to the GPU.
#[derive(Debug)]
pub struct PrimitiveMesh {
    pub vertex_array: VertexArray,
    pub topology: wgpu::PrimitiveTopology,
}

impl PrimitiveMesh {
    pub fn new(device: &wgpu::Device, label: &str, shape: &Shape) -> Self {
        Self {
            vertex_array: VertexArray::from_data(
                device,
                label,
                &shape.vertices,
                shape.indices.as_deref(),
            ),
            topology: shape.topology,
        }
    }

    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>, instances: std::ops::Range<u32>) {
        self.vertex_array.draw(pass, instances);
    }
}
