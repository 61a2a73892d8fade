//! A vertex/index buffer pair with the draw call that goes with it.
//!
//! [`VertexArray`] owns the GPU buffers of one piece of geometry. Buffers are
//! attached by type ([`BufferType::Array`] for vertices, [`BufferType::Element`]
//! for indices) and usage hint ([`DrawMode`]). Vertex attribute layouts are not
//! stored here: pipelines take them from [`Vertex::desc`](super::model::Vertex).

use wgpu::util::DeviceExt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferType {
    /// Per-vertex attribute data.
    Array,
    /// Indices into the vertex data.
    Element,
}

/// How often the buffer contents are expected to change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DrawMode {
    #[default]
    Static,
    Dynamic,
    Stream,
}

impl DrawMode {
    fn usage(self, ty: BufferType) -> wgpu::BufferUsages {
        let base = match ty {
            BufferType::Array => wgpu::BufferUsages::VERTEX,
            BufferType::Element => wgpu::BufferUsages::INDEX,
        };
        match self {
            DrawMode::Static => base,
            DrawMode::Dynamic | DrawMode::Stream => base | wgpu::BufferUsages::COPY_DST,
        }
    }
}

#[derive(Debug)]
struct AttachedBuffer {
    buffer: wgpu::Buffer,
    mode: DrawMode,
}

#[derive(Debug)]
pub struct VertexArray {
    label: String,
    vertices: Option<AttachedBuffer>,
    indices: Option<AttachedBuffer>,
    index_format: wgpu::IndexFormat,
    count: u32,
}

impl VertexArray {
    pub fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            vertices: None,
            indices: None,
            index_format: wgpu::IndexFormat::Uint32,
            count: 0,
        }
    }

    /// Creates a vertex array from vertices and optional u32 indices.
    ///
    /// The draw count is the index count when indices are given and the vertex
    /// count otherwise.
    pub fn from_data<V: bytemuck::Pod>(
        device: &wgpu::Device,
        label: &str,
        vertices: &[V],
        indices: Option<&[u32]>,
    ) -> Self {
        let mut vao = Self::new(label);
        vao.attach_buffer(
            device,
            BufferType::Array,
            bytemuck::cast_slice(vertices),
            DrawMode::Static,
        );
        match indices {
            Some(indices) => {
                vao.attach_buffer(
                    device,
                    BufferType::Element,
                    bytemuck::cast_slice(indices),
                    DrawMode::Static,
                );
                vao.set_count(indices.len() as u32);
            }
            None => vao.set_count(vertices.len() as u32),
        }
        vao
    }

    /// Uploads `contents` into a new buffer, replacing any buffer of the same type.
    pub fn attach_buffer(
        &mut self,
        device: &wgpu::Device,
        ty: BufferType,
        contents: &[u8],
        mode: DrawMode,
    ) {
        let kind = match ty {
            BufferType::Array => "Vertex",
            BufferType::Element => "Index",
        };
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} {} Buffer", self.label, kind)),
            contents,
            usage: mode.usage(ty),
        });
        let attached = Some(AttachedBuffer { buffer, mode });
        match ty {
            BufferType::Array => self.vertices = attached,
            BufferType::Element => self.indices = attached,
        }
    }

    /// Overwrites the start of a dynamic buffer.
    pub fn update(&self, queue: &wgpu::Queue, ty: BufferType, contents: &[u8]) {
        let attached = match ty {
            BufferType::Array => self.vertices.as_ref(),
            BufferType::Element => self.indices.as_ref(),
        };
        match attached {
            Some(AttachedBuffer { mode: DrawMode::Static, .. }) => {
                log::error!("{}: cannot update a static {:?} buffer", self.label, ty);
            }
            Some(AttachedBuffer { buffer, .. }) => {
                if contents.len() as u64 > buffer.size() {
                    log::error!(
                        "{}: update of {} bytes exceeds the {} byte buffer",
                        self.label,
                        contents.len(),
                        buffer.size()
                    );
                    return;
                }
                queue.write_buffer(buffer, 0, contents);
            }
            None => log::error!("{}: no {:?} buffer attached", self.label, ty),
        }
    }

    pub fn set_index_format(&mut self, format: wgpu::IndexFormat) {
        self.index_format = format;
    }

    pub fn set_count(&mut self, count: u32) {
        self.count = count;
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn is_indexed(&self) -> bool {
        self.indices.is_some()
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>, instances: std::ops::Range<u32>) {
        let Some(vertices) = &self.vertices else {
            log::warn!("{}: draw without a vertex buffer", self.label);
            return;
        };
        pass.set_vertex_buffer(0, vertices.buffer.slice(..));
        match &self.indices {
            Some(indices) => {
                pass.set_index_buffer(indices.buffer.slice(..), self.index_format);
                pass.draw_indexed(0..self.count, 0, instances);
            }
            None => pass.draw(0..self.count, instances),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_buffers_are_not_writable() {
        assert!(!DrawMode::Static
            .usage(BufferType::Array)
            .contains(wgpu::BufferUsages::COPY_DST));
        assert!(DrawMode::Dynamic
            .usage(BufferType::Element)
            .contains(wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST));
        assert!(DrawMode::Stream
            .usage(BufferType::Array)
            .contains(wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST));
    }

    #[test]
    fn new_vertex_array_is_empty() {
        let vao = VertexArray::new("empty");
        assert_eq!(vao.count(), 0);
        assert!(!vao.is_indexed());
        assert_eq!(vao.label(), "empty");
    }
}
