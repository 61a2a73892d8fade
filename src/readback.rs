//! Copying texture contents back to the CPU.

use std::iter;

use anyhow::{Context as _, ensure};

/// Tightly packed texels of one mip level of one array layer.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureData {
    pub width: u32,
    pub height: u32,
    pub bytes: Vec<u8>,
}

impl TextureData {
    /// Interprets the bytes as half floats, e.g. of `Rgba16Float` or `Rg16Float`.
    pub fn f16_values(&self) -> Vec<f32> {
        self.bytes
            .chunks_exact(2)
            .map(|pair| half::f16::from_le_bytes([pair[0], pair[1]]).to_f32())
            .collect()
    }
}

fn padded_bytes_per_row(unpadded: u32) -> u32 {
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    unpadded.div_ceil(align) * align
}

/// Reads one subresource of a colour texture with `COPY_SRC` usage.
pub async fn read_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    texture: &wgpu::Texture,
    mip_level: u32,
    layer: u32,
) -> anyhow::Result<TextureData> {
    ensure!(mip_level < texture.mip_level_count(), "mip level {mip_level} out of range");
    ensure!(
        layer < texture.depth_or_array_layers(),
        "array layer {layer} out of range"
    );
    let bytes_per_texel = texture
        .format()
        .block_copy_size(None)
        .with_context(|| format!("{:?} can't be copied as a whole", texture.format()))?;
    let width = (texture.width() >> mip_level).max(1);
    let height = (texture.height() >> mip_level).max(1);
    let unpadded = width * bytes_per_texel;
    let padded = padded_bytes_per_row(unpadded);

    let output_buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Readback Buffer"),
        size: (padded * height) as wgpu::BufferAddress,
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });
    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("Readback Encoder"),
    });
    encoder.copy_texture_to_buffer(
        wgpu::TexelCopyTextureInfo {
            aspect: wgpu::TextureAspect::All,
            texture,
            mip_level,
            origin: wgpu::Origin3d {
                x: 0,
                y: 0,
                z: layer,
            },
        },
        wgpu::TexelCopyBufferInfo {
            buffer: &output_buffer,
            layout: wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(padded),
                rows_per_image: Some(height),
            },
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );
    queue.submit(iter::once(encoder.finish()));

    // The mapping has to be requested before polling, otherwise the wait
    // below never finishes.
    let buffer_slice = output_buffer.slice(..);
    let (tx, rx) = futures_intrusive::channel::shared::oneshot_channel();
    buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
        // The receiver only goes away if the caller stopped waiting.
        let _ = tx.send(result);
    });
    device.poll(wgpu::Maintain::Wait);
    rx.receive()
        .await
        .context("readback channel closed")?
        .context("failed to map readback buffer")?;

    let mut bytes = Vec::with_capacity((unpadded * height) as usize);
    {
        let data = buffer_slice.get_mapped_range();
        for row in data.chunks_exact(padded as usize) {
            bytes.extend_from_slice(&row[..unpadded as usize]);
        }
    }
    output_buffer.unmap();

    Ok(TextureData {
        width,
        height,
        bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_are_padded_to_copy_alignment() {
        assert_eq!(padded_bytes_per_row(4), 256);
        assert_eq!(padded_bytes_per_row(256), 256);
        assert_eq!(padded_bytes_per_row(8 * 33), 512);
    }

    #[test]
    fn half_floats_decode() {
        let data = TextureData {
            width: 1,
            height: 1,
            bytes: [1.0f32, 0.5]
                .iter()
                .flat_map(|v| half::f16::from_f32(*v).to_le_bytes())
                .collect(),
        };
        assert_eq!(data.f16_values(), vec![1.0, 0.5]);
    }
}
