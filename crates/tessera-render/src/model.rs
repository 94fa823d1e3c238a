//! Dirty-tracked model matrix maintenance.
//!
//! Model matrices are cached in the [`Model`] component and recomputed only
//! for entities whose spatial data or sprite frame changed this frame. The
//! recompute is idempotent, so an entity dirtied through several paths at
//! once just writes the same matrix more than once.

use glam::{Mat4, Vec3};
use tessera_core::{
    ecs::{Entity, Registry},
    profiling::profile_function,
};

use crate::{
    atlas::AtlasRegion,
    components::{Model, Spatial, SpriteFrame, Tile},
};

/// The per-frame component event sets the pipeline consumes.
///
/// Drained once at the top of the frame; both the grid sync and the model
/// updater read from the same snapshot.
#[derive(Debug, Default)]
pub struct SceneEvents {
    pub spatial_added: Vec<Entity>,
    pub spatial_changed: Vec<Entity>,
    pub spatial_removed: Vec<Entity>,
    pub frame_added: Vec<Entity>,
    pub frame_changed: Vec<Entity>,
    pub frame_removed: Vec<Entity>,
    pub tile_added: Vec<Entity>,
    pub tile_removed: Vec<Entity>,
}

impl SceneEvents {
    pub fn drain(reg: &mut Registry) -> Self {
        profile_function!();
        Self {
            spatial_added: reg.take_added::<Spatial>(),
            spatial_changed: reg.take_changed::<Spatial>(),
            spatial_removed: reg.take_removed::<Spatial>(),
            frame_added: reg.take_added::<SpriteFrame>(),
            frame_changed: reg.take_changed::<SpriteFrame>(),
            frame_removed: reg.take_removed::<SpriteFrame>(),
            tile_added: reg.take_added::<Tile>(),
            tile_removed: reg.take_removed::<Tile>(),
        }
    }
}

/// Model matrix for a sprite quad.
///
/// The quad is a unit square, so the region size (scaled by the entity
/// scale) lands in the scale term. The region offset is scaled the same way
/// before it shifts the translation.
pub fn sprite_model(spatial: &Spatial, region: &AtlasRegion) -> Mat4 {
    let scale = spatial.scale * Vec3::new(region.size.x, region.size.y, 1.0);
    let offset = Vec3::new(region.offset.x, region.offset.y, 0.0) * spatial.scale;
    Mat4::from_translation(spatial.pos + offset)
        * Mat4::from_scale(scale)
        * Mat4::from_rotation_z(spatial.rot.z)
        * Mat4::from_rotation_y(spatial.rot.y)
        * Mat4::from_rotation_x(spatial.rot.x)
}

/// Model matrix for a tile quad: a fixed tile-sized cell with no offset.
pub fn tile_model(spatial: &Spatial) -> Mat4 {
    sprite_model(spatial, &AtlasRegion::tile_cell())
}

/// Folds the frame's change events into cached [`Model`] components.
pub struct ModelUpdater {
    recomputed: u64,
}

impl Default for ModelUpdater {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelUpdater {
    pub fn new() -> Self {
        Self { recomputed: 0 }
    }

    /// Recompute models for every entity dirtied this frame.
    ///
    /// Dirty paths:
    /// - spatial added or changed on a tile entity: tile model
    /// - spatial added or changed on a sprite entity: sprite model
    /// - sprite frame added or changed while a spatial exists: sprite model
    /// - tile added while a spatial exists: tile model
    ///
    /// An entity dirtied through several paths at once recomputes more than
    /// once; the write is idempotent.
    pub fn run(&mut self, reg: &mut Registry, events: &SceneEvents) {
        profile_function!();
        for &ent in events.spatial_added.iter().chain(&events.spatial_changed) {
            if reg.has_component::<Tile>(ent) {
                self.refresh_tile(reg, ent);
            } else if reg.has_component::<SpriteFrame>(ent) {
                self.refresh_sprite(reg, ent);
            }
        }
        for &ent in events.frame_added.iter().chain(&events.frame_changed) {
            if reg.has_component::<Spatial>(ent) {
                self.refresh_sprite(reg, ent);
            }
        }
        for &ent in &events.tile_added {
            if reg.has_component::<Spatial>(ent) {
                self.refresh_tile(reg, ent);
            }
        }
    }

    fn refresh_sprite(&mut self, reg: &mut Registry, ent: Entity) {
        let Some(&spatial) = reg.get_component::<Spatial>(ent) else {
            return;
        };
        let Some(frame) = reg.get_component::<SpriteFrame>(ent) else {
            return;
        };
        let model = sprite_model(&spatial, &frame.region);
        reg.add_component(ent, Model(model));
        self.recomputed += 1;
    }

    fn refresh_tile(&mut self, reg: &mut Registry, ent: Entity) {
        let Some(&spatial) = reg.get_component::<Spatial>(ent) else {
            return;
        };
        reg.add_component(ent, Model(tile_model(&spatial)));
        self.recomputed += 1;
    }

    /// Running count of model writes, for instrumentation and tests.
    pub fn recomputed(&self) -> u64 {
        self.recomputed
    }
}
