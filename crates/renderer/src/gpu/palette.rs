use wgpu::util::{DeviceExt, TextureDataOrder};

use crate::palette::Palette;

/// The 1×N lookup texture and its filtering sampler.
pub(crate) struct PaletteTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
    len: u32,
}

impl PaletteTexture {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue, palette: &Palette) -> Self {
        let len = palette.len() as u32;
        let texture = device.create_texture_with_data(
            queue,
            &wgpu::TextureDescriptor {
                label: Some("palette lookup"),
                size: wgpu::Extent3d {
                    width: len,
                    height: 1,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8Unorm,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            TextureDataOrder::LayerMajor,
            &palette.texels(),
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("palette sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });
        Self {
            texture,
            view,
            sampler,
            len,
        }
    }

    /// Rewrites the texels in place. Returns `false` when the stop count
    /// changed and the texture has to be rebuilt instead.
    pub fn rewrite(&self, queue: &wgpu::Queue, palette: &Palette) -> bool {
        if palette.len() as u32 != self.len {
            return false;
        }
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &palette.texels(),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * self.len),
                rows_per_image: Some(1),
            },
            wgpu::Extent3d {
                width: self.len,
                height: 1,
                depth_or_array_layers: 1,
            },
        );
        true
    }
}
