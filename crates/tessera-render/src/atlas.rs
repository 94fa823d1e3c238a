//! Texture atlas regions and the GPU-side atlas texture.

use glam::Vec2;

use crate::context::GraphicsContext;

/// Side length of one tile cell in atlas pixels.
pub const TILE_SIZE: f32 = 16.0;

/// A named rectangle within the atlas, in pixel coordinates.
///
/// `offset` shifts the quad relative to the owning entity's position and is
/// scaled by the entity's scale before translation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AtlasRegion {
    /// Top-left corner of the region within the atlas.
    pub position: Vec2,
    /// Region dimensions in pixels.
    pub size: Vec2,
    /// Draw offset relative to the entity position.
    pub offset: Vec2,
}

impl AtlasRegion {
    pub const fn new(position: Vec2, size: Vec2) -> Self {
        Self {
            position,
            size,
            offset: Vec2::ZERO,
        }
    }

    pub const fn with_offset(position: Vec2, size: Vec2, offset: Vec2) -> Self {
        Self {
            position,
            size,
            offset,
        }
    }

    /// The synthetic region used for tile quads: one `TILE_SIZE` cell with no
    /// offset, positioned later from the tile's lattice coordinates.
    pub const fn tile_cell() -> Self {
        Self::new(Vec2::ZERO, Vec2::splat(TILE_SIZE))
    }
}

/// The scene's atlas texture, uploaded once at startup.
///
/// All sprite and tile regions index into this single texture, which is what
/// lets the whole scene draw as a handful of instanced batches.
pub struct Atlas {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    size: Vec2,
}

impl Atlas {
    /// Create the atlas from raw RGBA pixel data.
    pub fn from_data(context: &GraphicsContext, data: &[u8], width: u32, height: u32) -> Self {
        let extent = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };

        let texture = context.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Atlas Texture"),
            size: extent,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        context.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(width * 4),
                rows_per_image: Some(height),
            },
            extent,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        Self {
            texture,
            view,
            size: Vec2::new(width as f32, height as f32),
        }
    }

    pub fn texture(&self) -> &wgpu::Texture {
        &self.texture
    }

    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    /// Atlas dimensions in pixels, as uploaded to the globals uniform so the
    /// shaders can normalize pixel-space regions into UVs.
    pub fn size(&self) -> Vec2 {
        self.size
    }
}
