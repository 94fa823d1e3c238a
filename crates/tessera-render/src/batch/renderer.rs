//! GPU flushing of batched instances.

use glam::{Mat4, Vec2};
use tessera_core::profiling::profile_function;

use crate::{
    atlas::Atlas,
    batch::{pipeline, BatchQueue, RegionData},
    context::GraphicsContext,
    error::RenderResult,
    framebuffer::Framebuffer,
    material::Materials,
};

const SCENE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;
const INITIAL_CAPACITY: usize = 256;

/// Which flush of the frame is being encoded.
///
/// Each flush owns its instance buffers, so uploads for a later flush can
/// never clobber data a recorded pass still reads. Debug draws with the
/// world camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushPass {
    World,
    Ui,
    Debug,
}

impl FlushPass {
    fn index(self) -> usize {
        match self {
            FlushPass::World => 0,
            FlushPass::Ui => 1,
            FlushPass::Debug => 2,
        }
    }
}

/// Per-frame draw statistics.
#[derive(Debug, Default, Clone, Copy)]
pub struct RenderStats {
    pub draw_calls: u32,
    pub instances: u32,
}

/// Instance buffers for one material within one flush.
struct GroupBuffers {
    regions: wgpu::Buffer,
    models: wgpu::Buffer,
    capacity: usize,
}

impl GroupBuffers {
    fn new(device: &wgpu::Device, capacity: usize) -> Self {
        Self {
            regions: pipeline::create_instance_buffer(
                device,
                "Batch Region Buffer",
                (capacity * std::mem::size_of::<RegionData>()) as u64,
            ),
            models: pipeline::create_instance_buffer(
                device,
                "Batch Model Buffer",
                (capacity * std::mem::size_of::<[[f32; 4]; 4]>()) as u64,
            ),
            capacity,
        }
    }

    /// Grow to hold `needed` instances. Capacity never shrinks.
    fn ensure_capacity(&mut self, device: &wgpu::Device, needed: usize) {
        if needed <= self.capacity {
            return;
        }
        let capacity = needed.next_power_of_two();
        tracing::debug!(from = self.capacity, to = capacity, "growing instance buffers");
        *self = Self::new(device, capacity);
    }
}

struct PassBuffers {
    groups: [GroupBuffers; 3],
}

impl PassBuffers {
    fn new(device: &wgpu::Device) -> Self {
        Self {
            groups: [
                GroupBuffers::new(device, INITIAL_CAPACITY),
                GroupBuffers::new(device, INITIAL_CAPACITY),
                GroupBuffers::new(device, INITIAL_CAPACITY),
            ],
        }
    }
}

/// Draws batched quads into the offscreen scene target and presents it.
pub struct BatchRenderer {
    context: &'static GraphicsContext,
    materials: Materials,
    quad_vbo: wgpu::Buffer,
    world_globals: wgpu::Buffer,
    world_bind_group: wgpu::BindGroup,
    ui_globals: wgpu::Buffer,
    ui_bind_group: wgpu::BindGroup,
    atlas_bind_group: wgpu::BindGroup,
    screen_layout: wgpu::BindGroupLayout,
    screen_bind_group: wgpu::BindGroup,
    sampler: wgpu::Sampler,
    passes: [PassBuffers; 3],
    framebuffer: Framebuffer,
    atlas_size: Vec2,
    stats: RenderStats,
}

impl BatchRenderer {
    pub fn new(
        context: &'static GraphicsContext,
        atlas: &Atlas,
        surface_format: wgpu::TextureFormat,
        width: u32,
        height: u32,
    ) -> Self {
        let device = &context.device;

        let globals_layout = pipeline::create_globals_layout(device);
        let atlas_layout = pipeline::create_texture_layout(device, "Atlas Layout");
        let screen_layout = pipeline::create_texture_layout(device, "Screen Layout");

        let materials = Materials::new(
            device,
            &globals_layout,
            &atlas_layout,
            &screen_layout,
            SCENE_FORMAT,
            surface_format,
        );

        let quad_vbo = pipeline::create_quad_vertex_buffer(device);
        let sampler = pipeline::create_pixel_sampler(device);

        let world_globals = pipeline::create_globals_buffer(device, "World Globals");
        let ui_globals = pipeline::create_globals_buffer(device, "UI Globals");

        let make_globals_group = |buffer: &wgpu::Buffer, label| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(label),
                layout: &globals_layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: buffer.as_entire_binding(),
                }],
            })
        };
        let world_bind_group = make_globals_group(&world_globals, "World Globals Group");
        let ui_bind_group = make_globals_group(&ui_globals, "UI Globals Group");

        let atlas_bind_group = pipeline::create_texture_bind_group(
            device,
            &atlas_layout,
            atlas.view(),
            &sampler,
            "Atlas Bind Group",
        );

        let framebuffer = Framebuffer::new(context, width, height, SCENE_FORMAT);
        let screen_bind_group = pipeline::create_texture_bind_group(
            device,
            &screen_layout,
            framebuffer.color_view(),
            &sampler,
            "Screen Bind Group",
        );

        Self {
            context,
            materials,
            quad_vbo,
            world_globals,
            world_bind_group,
            ui_globals,
            ui_bind_group,
            atlas_bind_group,
            screen_layout,
            screen_bind_group,
            sampler,
            passes: [
                PassBuffers::new(device),
                PassBuffers::new(device),
                PassBuffers::new(device),
            ],
            framebuffer,
            atlas_size: atlas.size(),
            stats: RenderStats::default(),
        }
    }

    pub fn set_world_globals(&self, view: Mat4, projection: Mat4, time: f32) {
        self.write_globals(&self.world_globals, view, projection, time);
    }

    pub fn set_ui_globals(&self, view: Mat4, projection: Mat4, time: f32) {
        self.write_globals(&self.ui_globals, view, projection, time);
    }

    fn write_globals(&self, buffer: &wgpu::Buffer, view: Mat4, projection: Mat4, time: f32) {
        let globals = pipeline::Globals {
            view: view.to_cols_array_2d(),
            projection: projection.to_cols_array_2d(),
            atlas_size: self.atlas_size.to_array(),
            time,
            _pad: 0.0,
        };
        self.context
            .queue
            .write_buffer(buffer, 0, bytemuck::bytes_of(&globals));
    }

    pub fn begin_frame(&mut self) {
        self.stats = RenderStats::default();
    }

    pub fn stats(&self) -> RenderStats {
        self.stats
    }

    /// The scene texture the post-process pass reads.
    pub fn screen_texture(&self) -> &wgpu::Texture {
        self.framebuffer.color_texture()
    }

    /// Upload every non-empty batch and encode one render pass drawing them
    /// in material order. Drains the queue.
    pub fn flush(
        &mut self,
        encoder: &mut wgpu::CommandEncoder,
        batches: &mut BatchQueue,
        pass: FlushPass,
        clear: bool,
    ) -> RenderResult<()> {
        profile_function!();

        for (kind, batch) in batches.iter() {
            if batch.is_empty() {
                continue;
            }
            let group = &mut self.passes[pass.index()].groups[kind.index()];
            group.ensure_capacity(&self.context.device, batch.len());
            self.context
                .queue
                .write_buffer(&group.regions, 0, bytemuck::cast_slice(batch.regions()));
            self.context
                .queue
                .write_buffer(&group.models, 0, bytemuck::cast_slice(batch.models()));
        }

        let globals_bind_group = match pass {
            FlushPass::World | FlushPass::Debug => &self.world_bind_group,
            FlushPass::Ui => &self.ui_bind_group,
        };

        let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Batch Flush"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: self.framebuffer.color_view(),
                resolve_target: None,
                ops: wgpu::Operations {
                    load: if clear {
                        wgpu::LoadOp::Clear(wgpu::Color::BLACK)
                    } else {
                        wgpu::LoadOp::Load
                    },
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        for (kind, batch) in batches.iter() {
            if batch.is_empty() {
                continue;
            }
            let group = &self.passes[pass.index()].groups[kind.index()];
            rpass.set_pipeline(self.materials.get(kind)?);
            rpass.set_bind_group(0, globals_bind_group, &[]);
            rpass.set_bind_group(1, &self.atlas_bind_group, &[]);
            rpass.set_vertex_buffer(0, self.quad_vbo.slice(..));
            rpass.set_vertex_buffer(1, group.regions.slice(..));
            rpass.set_vertex_buffer(2, group.models.slice(..));
            rpass.draw(0..4, 0..batch.len() as u32);

            self.stats.draw_calls += 1;
            self.stats.instances += batch.len() as u32;
        }
        drop(rpass);

        batches.clear();
        Ok(())
    }

    /// Post-process pass: sample the scene texture onto the surface.
    pub fn present(&self, encoder: &mut wgpu::CommandEncoder, surface_view: &wgpu::TextureView) {
        profile_function!();

        let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Present"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: surface_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        rpass.set_pipeline(self.materials.screen());
        rpass.set_bind_group(0, &self.screen_bind_group, &[]);
        rpass.set_vertex_buffer(0, self.quad_vbo.slice(..));
        rpass.draw(0..4, 0..1);
    }

    /// Resize the offscreen target and rebind it for the present pass.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.framebuffer.resize(self.context, width, height);
        self.screen_bind_group = pipeline::create_texture_bind_group(
            &self.context.device,
            &self.screen_layout,
            self.framebuffer.color_view(),
            &self.sampler,
            "Screen Bind Group",
        );
    }
}
