//! The per-frame render driver.
//!
//! Frame order: drain component events, sync the spatial grid, cull against
//! the world camera, fold dirty transforms into models, patch and re-sort the
//! draw order, then enqueue and flush the passes: tiles and sorted sprites
//! with the world camera, UI with the UI camera, the debug overlay in debug
//! builds, and finally the post-process present.

use glam::{Mat4, Vec2, Vec3};
use tessera_core::{
    ecs::{Entity, Registry},
    profiling::profile_function,
};

use crate::{
    atlas::Atlas,
    batch::{
        renderer::{BatchRenderer, FlushPass, RenderStats},
        BatchQueue, MaterialKind, RegionData,
    },
    camera::Cameras,
    components::{
        Collision, DebugCollision, GuiElement, Model, Outline, Spatial, SpriteFrame, Text, Tile,
        ToRender, ToRenderTile,
    },
    context::GraphicsContext,
    cull::Culler,
    error::{RenderError, RenderResult},
    grid::SpatialGrid,
    model::{ModelUpdater, SceneEvents},
    sort::DepthSorter,
};

/// Grid cell size in world pixels. A few tiles per cell keeps buckets small
/// without inflating the cell walk for camera-sized queries.
const GRID_CELL_SIZE: f32 = 64.0;

pub struct RenderSystem {
    context: &'static GraphicsContext,
    grid: SpatialGrid,
    culler: Culler,
    updater: ModelUpdater,
    sorter: DepthSorter,
    batches: BatchQueue,
    renderer: BatchRenderer,
    cameras: Cameras,
}

impl RenderSystem {
    pub fn new(
        context: &'static GraphicsContext,
        atlas: &Atlas,
        surface_format: wgpu::TextureFormat,
        width: u32,
        height: u32,
    ) -> Self {
        Self {
            context,
            grid: SpatialGrid::new(GRID_CELL_SIZE),
            culler: Culler::default(),
            updater: ModelUpdater::new(),
            sorter: DepthSorter::new(),
            batches: BatchQueue::new(),
            renderer: BatchRenderer::new(context, atlas, surface_format, width, height),
            cameras: Cameras::new(width as f32, height as f32),
        }
    }

    pub fn cameras(&self) -> &Cameras {
        &self.cameras
    }

    pub fn cameras_mut(&mut self) -> &mut Cameras {
        &mut self.cameras
    }

    pub fn stats(&self) -> RenderStats {
        self.renderer.stats()
    }

    /// The offscreen scene texture, for readbacks and capture.
    pub fn screen_texture(&self) -> &wgpu::Texture {
        self.renderer.screen_texture()
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.renderer.resize(width, height);
        self.cameras.resize(width as f32, height as f32);
    }

    /// Run one frame against `surface_view`.
    ///
    /// A failed frame logs, drops its queued batches, and leaves the scene
    /// state intact for the next attempt. Component event logs are cleared
    /// either way.
    pub fn update(&mut self, reg: &mut Registry, surface_view: &wgpu::TextureView, time: f32) {
        profile_function!();
        self.renderer.begin_frame();
        if let Err(err) = self.render_frame(reg, surface_view, time) {
            tracing::error!(%err, "aborting frame");
            self.batches.clear();
        }
        reg.clear_events();
    }

    fn render_frame(
        &mut self,
        reg: &mut Registry,
        surface_view: &wgpu::TextureView,
        time: f32,
    ) -> RenderResult<()> {
        let events = SceneEvents::drain(reg);
        sync_grid(&mut self.grid, reg, &events);

        let view = self.cameras.world().view_rect();
        let delta = self.culler.update(reg, &self.grid, view);

        self.updater.run(reg, &events);
        self.sorter.apply_delta(reg, &delta);
        self.sorter.sort(reg);

        enqueue_tiles(reg, &mut self.batches);
        enqueue_sprites(reg, self.sorter.order(), &mut self.batches)?;
        enqueue_outlines(reg, &mut self.batches);

        let world = self.cameras.world_mut();
        let (world_view, world_proj) = (world.view_matrix(), world.projection_matrix());
        self.renderer.set_world_globals(world_view, world_proj, time);
        let ui = self.cameras.ui_mut();
        let (ui_view, ui_proj) = (ui.view_matrix(), ui.projection_matrix());
        self.renderer.set_ui_globals(ui_view, ui_proj, time);

        let mut encoder =
            self.context
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("Frame Encoder"),
                });

        self.renderer
            .flush(&mut encoder, &mut self.batches, FlushPass::World, true)?;

        enqueue_gui(reg, &mut self.batches);
        self.renderer
            .flush(&mut encoder, &mut self.batches, FlushPass::Ui, false)?;

        #[cfg(debug_assertions)]
        {
            enqueue_debug(reg, &mut self.batches);
            self.renderer
                .flush(&mut encoder, &mut self.batches, FlushPass::Debug, false)?;
        }

        self.renderer.present(&mut encoder, surface_view);
        self.context.queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }
}

/// Whether the entity has anything the render passes can draw. Only these
/// enter the grid, so the culler can never tag an entity the passes would
/// reject.
fn is_renderable(reg: &Registry, ent: Entity) -> bool {
    reg.has_component::<SpriteFrame>(ent)
        || reg.has_component::<Tile>(ent)
        || reg.has_component::<Text>(ent)
}

/// Apply the frame's spatial and render-component events to the grid.
fn sync_grid(grid: &mut SpatialGrid, reg: &Registry, events: &SceneEvents) {
    profile_function!();
    for &ent in events.spatial_added.iter().chain(&events.spatial_changed) {
        if !is_renderable(reg, ent) {
            continue;
        }
        if let Some(spatial) = reg.get_component::<Spatial>(ent) {
            grid.update(ent, &spatial.bounds());
        }
    }
    // Entities that became renderable this frame, with a spatial already in
    // place.
    for &ent in events.frame_added.iter().chain(&events.tile_added) {
        if let Some(spatial) = reg.get_component::<Spatial>(ent) {
            grid.update(ent, &spatial.bounds());
        }
    }
    // Entities that stopped being renderable leave the grid so the culler
    // never tags them again.
    for &ent in events.frame_removed.iter().chain(&events.tile_removed) {
        if !is_renderable(reg, ent) {
            grid.remove(ent);
        }
    }
    for &ent in &events.spatial_removed {
        grid.remove(ent);
    }
}

/// Tiles draw unsorted, before (so beneath) the sorted sprites.
fn enqueue_tiles(reg: &Registry, batches: &mut BatchQueue) {
    profile_function!();
    for (_, tile, model, _) in reg.query::<(Tile, Model, ToRenderTile)>() {
        batches.enqueue(MaterialKind::Instanced, RegionData::from_tile(tile), model.0);
    }
}

/// Sprites in paint order. Text entities draw through their own path and
/// are skipped here.
fn enqueue_sprites(
    reg: &Registry,
    order: &[Entity],
    batches: &mut BatchQueue,
) -> RenderResult<()> {
    profile_function!();
    for &ent in order {
        if reg.has_component::<Text>(ent) || reg.has_component::<Tile>(ent) {
            continue;
        }
        let frame =
            reg.get_component::<SpriteFrame>(ent)
                .ok_or(RenderError::MissingComponent {
                    entity: ent,
                    component: "SpriteFrame",
                })?;
        let model = reg
            .get_component::<Model>(ent)
            .ok_or(RenderError::MissingComponent {
                entity: ent,
                component: "Model",
            })?;
        batches.enqueue(
            MaterialKind::Instanced,
            RegionData::from_region(&frame.region),
            model.0,
        );
    }
    Ok(())
}

fn enqueue_outlines(reg: &Registry, batches: &mut BatchQueue) {
    profile_function!();
    for (_, frame, model, _, _) in reg.query::<(SpriteFrame, Model, ToRender, Outline)>() {
        batches.enqueue(
            MaterialKind::InstancedOutline,
            RegionData::from_region(&frame.region),
            model.0,
        );
    }
}

/// UI quads draw with the UI camera, over the world flush.
fn enqueue_gui(reg: &Registry, batches: &mut BatchQueue) {
    profile_function!();
    for (_, frame, model, _) in reg.query::<(SpriteFrame, Model, GuiElement)>() {
        batches.enqueue(
            MaterialKind::Instanced,
            RegionData::from_region(&frame.region),
            model.0,
        );
    }
}

/// Collision boxes as debug quads, one instance per box.
#[cfg_attr(not(debug_assertions), allow(dead_code))]
fn enqueue_debug(reg: &Registry, batches: &mut BatchQueue) {
    profile_function!();
    for (_, collision, spatial, _) in reg.query::<(Collision, Spatial, DebugCollision)>() {
        for bbox in &collision.boxes {
            let size = Vec2::new(bbox.x, bbox.y);
            let offset = Vec3::new(bbox.z, bbox.w, 0.0) * spatial.scale;
            let model = Mat4::from_translation(spatial.pos + offset)
                * Mat4::from_scale(spatial.scale * Vec3::new(size.x, size.y, 1.0));
            batches.enqueue(
                MaterialKind::InstancedDebug,
                RegionData::new(Vec2::ZERO, size),
                model,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atlas::AtlasRegion;
    use glam::Vec4;
    use tessera_core::geometry::Rect;

    fn frame_for(region_x: f32) -> SpriteFrame {
        SpriteFrame::new(AtlasRegion::new(
            Vec2::new(region_x, 0.0),
            Vec2::new(16.0, 16.0),
        ))
    }

    /// Run the CPU half of a frame: events, grid, cull, models, sort.
    fn prepare(
        reg: &mut Registry,
        grid: &mut SpatialGrid,
        culler: &mut Culler,
        updater: &mut ModelUpdater,
        sorter: &mut DepthSorter,
        view: Rect<f32>,
    ) {
        let events = SceneEvents::drain(reg);
        sync_grid(grid, reg, &events);
        let delta = culler.update(reg, grid, view);
        updater.run(reg, &events);
        sorter.apply_delta(reg, &delta);
        sorter.sort(reg);
        reg.clear_events();
    }

    #[test]
    fn test_full_cpu_frame_enqueues_sorted_sprites() {
        let mut reg = Registry::new();
        let mut grid = SpatialGrid::new(GRID_CELL_SIZE);
        let mut culler = Culler::default();
        let mut updater = ModelUpdater::new();
        let mut sorter = DepthSorter::new();

        // Lower sprite should paint after the higher one.
        let low = reg.spawn((
            Spatial::new(Vec3::new(10.0, 80.0, 0.0), Vec2::new(16.0, 16.0)),
            frame_for(0.0),
        ));
        let high = reg.spawn((
            Spatial::new(Vec3::new(10.0, 20.0, 0.0), Vec2::new(16.0, 16.0)),
            frame_for(16.0),
        ));

        let view = Rect::new(0.0, 0.0, 320.0, 240.0);
        prepare(
            &mut reg,
            &mut grid,
            &mut culler,
            &mut updater,
            &mut sorter,
            view,
        );

        assert_eq!(sorter.order(), &[high, low]);

        let mut batches = BatchQueue::new();
        enqueue_tiles(&reg, &mut batches);
        enqueue_sprites(&reg, sorter.order(), &mut batches).unwrap();

        let batch = batches.batch(MaterialKind::Instanced);
        assert_eq!(batch.len(), 2);
        // `high` enqueued first: its region starts at x=16.
        assert_eq!(batch.regions()[0].position, [16.0, 0.0]);
        assert_eq!(batch.regions()[1].position, [0.0, 0.0]);
    }

    #[test]
    fn test_offscreen_entities_are_not_enqueued() {
        let mut reg = Registry::new();
        let mut grid = SpatialGrid::new(GRID_CELL_SIZE);
        let mut culler = Culler::default();
        let mut updater = ModelUpdater::new();
        let mut sorter = DepthSorter::new();

        reg.spawn((
            Spatial::new(Vec3::new(5000.0, 5000.0, 0.0), Vec2::new(16.0, 16.0)),
            frame_for(0.0),
        ));

        prepare(
            &mut reg,
            &mut grid,
            &mut culler,
            &mut updater,
            &mut sorter,
            Rect::new(0.0, 0.0, 320.0, 240.0),
        );

        assert!(sorter.is_empty());
    }

    #[test]
    fn test_tiles_go_to_tile_path_not_sprite_path() {
        let mut reg = Registry::new();
        let mut grid = SpatialGrid::new(GRID_CELL_SIZE);
        let mut culler = Culler::default();
        let mut updater = ModelUpdater::new();
        let mut sorter = DepthSorter::new();

        reg.spawn((
            Spatial::new(Vec3::new(32.0, 32.0, 0.0), Vec2::new(16.0, 16.0)),
            Tile {
                lattice: Vec2::new(16.0, 16.0),
                tileset: AtlasRegion::new(Vec2::new(64.0, 0.0), Vec2::new(128.0, 128.0)),
            },
        ));

        prepare(
            &mut reg,
            &mut grid,
            &mut culler,
            &mut updater,
            &mut sorter,
            Rect::new(0.0, 0.0, 320.0, 240.0),
        );

        assert!(sorter.is_empty());

        let mut batches = BatchQueue::new();
        enqueue_tiles(&reg, &mut batches);
        let batch = batches.batch(MaterialKind::Instanced);
        assert_eq!(batch.len(), 1);
        assert_eq!(batch.regions()[0].position, [80.0, 16.0]);
        assert_eq!(batch.regions()[0].size, [16.0, 16.0]);
    }

    #[test]
    fn test_spatial_only_entity_is_never_tagged_or_drawn() {
        let mut reg = Registry::new();
        let mut grid = SpatialGrid::new(GRID_CELL_SIZE);
        let mut culler = Culler::default();
        let mut updater = ModelUpdater::new();
        let mut sorter = DepthSorter::new();

        // A trigger-style entity: spatial footprint, nothing to draw.
        let ent = reg.spawn((
            Spatial::new(Vec3::new(10.0, 10.0, 0.0), Vec2::new(16.0, 16.0)),
            Collision {
                boxes: vec![Vec4::new(16.0, 16.0, 0.0, 0.0)],
            },
        ));

        let view = Rect::new(0.0, 0.0, 320.0, 240.0);
        for _ in 0..3 {
            prepare(&mut reg, &mut grid, &mut culler, &mut updater, &mut sorter, view);
            let mut batches = BatchQueue::new();
            enqueue_tiles(&reg, &mut batches);
            enqueue_sprites(&reg, sorter.order(), &mut batches).unwrap();
        }

        assert!(!reg.has_component::<ToRender>(ent));
        assert!(!reg.has_component::<ToRenderTile>(ent));
        assert!(sorter.is_empty());
    }

    #[test]
    fn test_entity_starts_drawing_when_frame_arrives() {
        let mut reg = Registry::new();
        let mut grid = SpatialGrid::new(GRID_CELL_SIZE);
        let mut culler = Culler::default();
        let mut updater = ModelUpdater::new();
        let mut sorter = DepthSorter::new();

        let ent = reg.spawn(Spatial::new(Vec3::new(10.0, 10.0, 0.0), Vec2::new(16.0, 16.0)));

        let view = Rect::new(0.0, 0.0, 320.0, 240.0);
        prepare(&mut reg, &mut grid, &mut culler, &mut updater, &mut sorter, view);
        assert!(!reg.has_component::<ToRender>(ent));

        reg.add_component(ent, frame_for(0.0));
        prepare(&mut reg, &mut grid, &mut culler, &mut updater, &mut sorter, view);

        assert!(reg.has_component::<ToRender>(ent));
        assert!(reg.has_component::<Model>(ent));
        assert_eq!(sorter.order(), &[ent]);

        let mut batches = BatchQueue::new();
        enqueue_sprites(&reg, sorter.order(), &mut batches).unwrap();
        assert_eq!(batches.batch(MaterialKind::Instanced).len(), 1);
    }

    #[test]
    fn test_entity_stops_drawing_when_frame_is_removed() {
        let mut reg = Registry::new();
        let mut grid = SpatialGrid::new(GRID_CELL_SIZE);
        let mut culler = Culler::default();
        let mut updater = ModelUpdater::new();
        let mut sorter = DepthSorter::new();

        let ent = reg.spawn((
            Spatial::new(Vec3::new(10.0, 10.0, 0.0), Vec2::new(16.0, 16.0)),
            frame_for(0.0),
        ));

        let view = Rect::new(0.0, 0.0, 320.0, 240.0);
        prepare(&mut reg, &mut grid, &mut culler, &mut updater, &mut sorter, view);
        assert!(reg.has_component::<ToRender>(ent));

        reg.remove_component::<SpriteFrame>(ent);
        prepare(&mut reg, &mut grid, &mut culler, &mut updater, &mut sorter, view);

        assert!(!reg.has_component::<ToRender>(ent));
        assert!(sorter.is_empty());

        let mut batches = BatchQueue::new();
        enqueue_sprites(&reg, sorter.order(), &mut batches).unwrap();
        assert!(batches.batch(MaterialKind::Instanced).is_empty());
    }

    #[test]
    fn test_outline_and_gui_take_their_own_materials() {
        let mut reg = Registry::new();
        reg.spawn((
            Spatial::new(Vec3::ZERO, Vec2::new(16.0, 16.0)),
            frame_for(0.0),
            Model(Mat4::IDENTITY),
            ToRender,
            Outline,
        ));
        reg.spawn((
            Spatial::new(Vec3::ZERO, Vec2::new(64.0, 16.0)),
            frame_for(32.0),
            Model(Mat4::IDENTITY),
            GuiElement,
        ));

        let mut batches = BatchQueue::new();
        enqueue_outlines(&reg, &mut batches);
        assert_eq!(batches.batch(MaterialKind::InstancedOutline).len(), 1);

        enqueue_gui(&reg, &mut batches);
        assert_eq!(batches.batch(MaterialKind::Instanced).len(), 1);
    }

    #[test]
    fn test_debug_overlay_emits_one_instance_per_box() {
        let mut reg = Registry::new();
        reg.spawn((
            Spatial::new(Vec3::new(10.0, 10.0, 0.0), Vec2::new(16.0, 16.0)),
            Collision {
                boxes: vec![
                    Vec4::new(16.0, 8.0, 0.0, 8.0),
                    Vec4::new(4.0, 4.0, 6.0, 0.0),
                ],
            },
            DebugCollision,
        ));

        let mut batches = BatchQueue::new();
        enqueue_debug(&reg, &mut batches);

        let batch = batches.batch(MaterialKind::InstancedDebug);
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.regions()[0].size, [16.0, 8.0]);
        assert_eq!(batch.regions()[1].size, [4.0, 4.0]);
    }

    #[test]
    fn test_moved_entity_resorts_next_frame() {
        let mut reg = Registry::new();
        let mut grid = SpatialGrid::new(GRID_CELL_SIZE);
        let mut culler = Culler::default();
        let mut updater = ModelUpdater::new();
        let mut sorter = DepthSorter::new();

        let a = reg.spawn((
            Spatial::new(Vec3::new(10.0, 20.0, 0.0), Vec2::new(16.0, 16.0)),
            frame_for(0.0),
        ));
        let b = reg.spawn((
            Spatial::new(Vec3::new(40.0, 60.0, 0.0), Vec2::new(16.0, 16.0)),
            frame_for(16.0),
        ));

        let view = Rect::new(0.0, 0.0, 320.0, 240.0);
        prepare(&mut reg, &mut grid, &mut culler, &mut updater, &mut sorter, view);
        assert_eq!(sorter.order(), &[a, b]);

        // `a` drops below `b`.
        reg.get_component_mut::<Spatial>(a).unwrap().pos.y = 120.0;
        prepare(&mut reg, &mut grid, &mut culler, &mut updater, &mut sorter, view);
        assert_eq!(sorter.order(), &[b, a]);
    }
}
