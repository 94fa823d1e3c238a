//! Offscreen render target for the scene.

use crate::context::GraphicsContext;

/// A color-only offscreen target.
///
/// The whole frame draws into this texture; a post-process pass then samples
/// it onto the surface.
#[derive(Debug)]
pub struct Framebuffer {
    color_texture: wgpu::Texture,
    color_view: wgpu::TextureView,
    width: u32,
    height: u32,
    format: wgpu::TextureFormat,
}

impl Framebuffer {
    pub fn new(
        context: &GraphicsContext,
        width: u32,
        height: u32,
        format: wgpu::TextureFormat,
    ) -> Self {
        let color_texture = context.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Scene Framebuffer Color"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });

        let color_view = color_texture.create_view(&wgpu::TextureViewDescriptor::default());

        Self {
            color_texture,
            color_view,
            width,
            height,
            format,
        }
    }

    pub fn color_texture(&self) -> &wgpu::Texture {
        &self.color_texture
    }

    pub fn color_view(&self) -> &wgpu::TextureView {
        &self.color_view
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        self.format
    }

    /// Recreate the texture at a new size. A no-op when unchanged.
    pub fn resize(&mut self, context: &GraphicsContext, width: u32, height: u32) {
        if self.width == width && self.height == height {
            return;
        }
        *self = Self::new(context, width, height, self.format);
    }
}
