//! GPU textures and texture creation utilities.
//!
//! This module provides [`Texture`], a wrapper around WGPU texture resources,
//! and helpers for the textures the renderer needs: material maps decoded from
//! image files, 1x1 fallback colours, the depth buffer, equirectangular HDR
//! environments and the cubemaps baked from them.

use anyhow::*;
use image::{GenericImageView, ImageFormat, load_from_memory_with_format};

/// How the texels of a colour texture should be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorSpace {
    /// Colour data authored in sRGB (albedo maps).
    Srgb,
    /// Data maps: normals, metallic, roughness, occlusion, masks.
    Linear,
}

impl ColorSpace {
    pub fn rgba8_format(self) -> wgpu::TextureFormat {
        match self {
            ColorSpace::Srgb => wgpu::TextureFormat::Rgba8UnormSrgb,
            ColorSpace::Linear => wgpu::TextureFormat::Rgba8Unorm,
        }
    }
}

/// A GPU texture with a view and optional sampler.
///
/// Typically created via [`from_bytes`](Self::from_bytes) or one of the
/// dedicated constructors such as [`create_depth_texture`](Self::create_depth_texture)
/// or [`create_cube`](Self::create_cube).
#[derive(Clone, Debug)]
pub struct Texture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: Option<wgpu::Sampler>,
}

/// Decoded equirectangular HDR image, RGBA with alpha forced to one.
#[derive(Debug, Clone, PartialEq)]
pub struct HdrImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<f32>,
}

impl HdrImage {
    /// Builds an image where every texel has the same radiance.
    pub fn constant(width: u32, height: u32, radiance: [f32; 3]) -> Self {
        let rgba = [radiance[0], radiance[1], radiance[2], 1.0]
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * 4)
            .collect();
        Self {
            width,
            height,
            rgba,
        }
    }

    pub fn from_dynamic(img: &image::DynamicImage) -> Self {
        let rgba = img.to_rgba32f();
        Self {
            width: rgba.width(),
            height: rgba.height(),
            rgba: rgba.into_raw(),
        }
    }

    /// Texel data converted to half floats for an `Rgba16Float` upload.
    pub fn to_f16_bits(&self) -> Vec<u16> {
        self.rgba
            .iter()
            .map(|v| half::f16::from_f32(*v).to_bits())
            .collect()
    }
}

impl Texture {
    /// Standard depth buffer texture format (32-bit float).
    pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
    /// Format of every baked lighting cubemap.
    pub const CUBE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;

    /// Create a depth texture for depth-testing during rendering.
    ///
    /// # Arguments
    ///
    /// * `size` is [width, height] of the texture in pixels
    /// * `label` is used as a debug label for the GPU resource
    pub fn create_depth_texture(device: &wgpu::Device, size: [u32; 2], label: &str) -> Self {
        let size = wgpu::Extent3d {
            width: size[0].max(1),
            height: size[1].max(1),
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        Self {
            texture,
            view,
            sampler: None,
        }
    }

    /// Create a 1x1 texture of a single colour.
    ///
    /// Materials bind these when a parameter has no texture so the pipeline
    /// layout never changes.
    pub fn solid_color(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        rgba: [u8; 4],
        color_space: ColorSpace,
        label: &str,
    ) -> Texture {
        let img = image::DynamicImage::ImageRgba8(image::RgbaImage::from_pixel(
            1,
            1,
            image::Rgba(rgba),
        ));
        Self::upload_rgba8(device, queue, &img, Some(label), color_space)
    }

    /// Create a default normal map (neutral blue, representing no deformation).
    pub fn create_default_normal_map(device: &wgpu::Device, queue: &wgpu::Queue) -> Texture {
        Self::solid_color(
            device,
            queue,
            [127, 127, 255, 255],
            ColorSpace::Linear,
            "default normal map",
        )
    }

    /// Load a texture from raw byte data (image file contents).
    ///
    /// # Arguments
    ///
    /// * `bytes` represent raw image file data (PNG, JPEG, etc.)
    /// * `label` is used as a debug name for the GPU resource
    /// * `format` is an optional file extension hint (e.g. "png"). If None, auto-detect.
    /// * `color_space` selects between an sRGB and a linear texture format
    pub fn from_bytes(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        bytes: &[u8],
        label: &str,
        format: Option<&str>,
        color_space: ColorSpace,
    ) -> Result<Self> {
        let img = match format.and_then(ImageFormat::from_extension) {
            None => image::load_from_memory(bytes)?,
            Some(fmt) => load_from_memory_with_format(bytes, fmt)?,
        };
        Self::from_image(device, queue, &img, Some(label), color_space)
    }

    /// Upload a decoded image. RGB and grey images are expanded to RGBA.
    ///
    /// Fails if the image is larger than the device allows.
    pub fn from_image(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        img: &image::DynamicImage,
        label: Option<&str>,
        color_space: ColorSpace,
    ) -> Result<Self> {
        let (width, height) = img.dimensions();
        check_texture_size(&device.limits(), width, height, label.unwrap_or("image"))?;
        Ok(Self::upload_rgba8(device, queue, img, label, color_space))
    }

    fn upload_rgba8(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        img: &image::DynamicImage,
        label: Option<&str>,
        color_space: ColorSpace,
    ) -> Self {
        let dimensions = img.dimensions();
        let rgba = img.to_rgba8();

        let size = wgpu::Extent3d {
            width: dimensions.0,
            height: dimensions.1,
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label,
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: color_space.rgba8_format(),
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                aspect: wgpu::TextureAspect::All,
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
            },
            &rgba,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * dimensions.0),
                rows_per_image: Some(dimensions.1),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = Some(create_default_sampler(device));

        Self {
            texture,
            view,
            sampler,
        }
    }

    /// Upload an equirectangular HDR environment as `Rgba16Float`.
    pub fn from_hdr(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        hdr: &HdrImage,
        label: &str,
    ) -> Result<Self> {
        check_texture_size(&device.limits(), hdr.width, hdr.height, label)?;
        ensure!(
            hdr.rgba.len() == hdr.width as usize * hdr.height as usize * 4,
            "HDR image {label} has {} floats, expected {}x{}x4",
            hdr.rgba.len(),
            hdr.width,
            hdr.height
        );
        let size = wgpu::Extent3d {
            width: hdr.width,
            height: hdr.height,
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba16Float,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let texels = hdr.to_f16_bits();
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                aspect: wgpu::TextureAspect::All,
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
            },
            bytemuck::cast_slice(&texels),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(8 * hdr.width),
                rows_per_image: Some(hdr.height),
            },
            size,
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Ok(Self {
            texture,
            view,
            sampler: Some(create_clamped_sampler(device, "hdr sampler")),
        })
    }

    /// Create a six layer cubemap that can be rendered into face by face.
    ///
    /// `view` is a cube view over every mip level.
    pub fn create_cube(
        device: &wgpu::Device,
        size: u32,
        mip_level_count: u32,
        label: &str,
    ) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: size.max(1),
                height: size.max(1),
                depth_or_array_layers: 6,
            },
            mip_level_count: mip_level_count.max(1),
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::CUBE_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some(&format!("{label} cube view")),
            dimension: Some(wgpu::TextureViewDimension::Cube),
            array_layer_count: Some(6),
            ..Default::default()
        });
        Self {
            texture,
            view,
            sampler: Some(create_clamped_sampler(device, label)),
        }
    }

    /// Single face, single mip 2D view for use as a render attachment.
    pub fn face_view(&self, face: u32, mip_level: u32) -> wgpu::TextureView {
        self.texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some("cube face view"),
            dimension: Some(wgpu::TextureViewDimension::D2),
            base_mip_level: mip_level,
            mip_level_count: Some(1),
            base_array_layer: face,
            array_layer_count: Some(1),
            ..Default::default()
        })
    }

    /// Cube view restricted to one mip level.
    pub fn cube_mip_view(&self, mip_level: u32) -> wgpu::TextureView {
        self.texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some("cube mip view"),
            dimension: Some(wgpu::TextureViewDimension::Cube),
            base_mip_level: mip_level,
            mip_level_count: Some(1),
            array_layer_count: Some(6),
            ..Default::default()
        })
    }

    /// Create a 2D texture usable both as a render target and as a shader input.
    pub fn create_render_target(
        device: &wgpu::Device,
        size: [u32; 2],
        format: wgpu::TextureFormat,
        label: &str,
    ) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: size[0].max(1),
                height: size[1].max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            texture,
            view,
            sampler: Some(create_clamped_sampler(device, label)),
        }
    }
}

/// Fails for empty textures and for edges above the device's 2D limit.
pub fn check_texture_size(limits: &wgpu::Limits, width: u32, height: u32, label: &str) -> Result<()> {
    ensure!(width > 0 && height > 0, "texture {label} has no texels");
    let max = limits.max_texture_dimension_2d;
    ensure!(
        width <= max && height <= max,
        "texture {label} is {width}x{height}, the device allows at most {max}x{max}"
    );
    Ok(())
}

pub fn create_default_sampler(device: &wgpu::Device) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        address_mode_u: wgpu::AddressMode::Repeat,
        address_mode_v: wgpu::AddressMode::Repeat,
        address_mode_w: wgpu::AddressMode::Repeat,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: wgpu::FilterMode::Linear,
        ..Default::default()
    })
}

/// Trilinear, clamp-to-edge sampler for environment and LUT lookups.
pub fn create_clamped_sampler(device: &wgpu::Device, label: &str) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some(label),
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: wgpu::FilterMode::Linear,
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_hdr_has_opaque_texels() {
        let hdr = HdrImage::constant(4, 2, [1.0, 2.0, 3.0]);
        assert_eq!(hdr.rgba.len(), 4 * 2 * 4);
        for texel in hdr.rgba.chunks_exact(4) {
            assert_eq!(texel, [1.0, 2.0, 3.0, 1.0]);
        }
    }

    #[test]
    fn hdr_halves_round_trip_exact_values() {
        let hdr = HdrImage::constant(1, 1, [0.5, 300.0, 0.0]);
        let bits = hdr.to_f16_bits();
        let back: Vec<f32> = bits
            .iter()
            .map(|b| half::f16::from_bits(*b).to_f32())
            .collect();
        assert_eq!(back, vec![0.5, 300.0, 0.0, 1.0]);
    }

    #[test]
    fn rgb_images_are_read_as_rgba() {
        let img = image::DynamicImage::ImageRgb32F(image::Rgb32FImage::from_pixel(
            2,
            1,
            image::Rgb([0.25, 0.5, 4.0]),
        ));
        let hdr = HdrImage::from_dynamic(&img);
        assert_eq!((hdr.width, hdr.height), (2, 1));
        assert_eq!(&hdr.rgba[..4], &[0.25, 0.5, 4.0, 1.0]);
    }

    #[test]
    fn texture_sizes_respect_device_limits() {
        let limits = wgpu::Limits::downlevel_defaults();
        assert_eq!(limits.max_texture_dimension_2d, 2048);
        assert!(check_texture_size(&limits, 2048, 1024, "sky").is_ok());
        assert!(check_texture_size(&limits, 1, 1, "solid").is_ok());

        let err = check_texture_size(&limits, 4096, 2048, "sky").unwrap_err();
        assert!(err.to_string().contains("4096x2048"), "got {err}");
        assert!(check_texture_size(&limits, 16, 4096, "tall").is_err());
        assert!(check_texture_size(&limits, 0, 16, "empty").is_err());
        // A 16k x 8k environment is too large even for the default limits.
        assert!(check_texture_size(&wgpu::Limits::default(), 16384, 8192, "sky").is_err());
    }

    #[test]
    fn colour_space_picks_format() {
        assert!(ColorSpace::Srgb.rgba8_format().is_srgb());
        assert!(!ColorSpace::Linear.rgba8_format().is_srgb());
    }
}
