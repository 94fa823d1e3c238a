//! Components the render pipeline reads and maintains.

use glam::{Mat4, Vec2, Vec3, Vec4};
use tessera_core::{ecs::Component, geometry::Rect};

use crate::atlas::AtlasRegion;

/// Cardinal facing direction, used by gameplay systems and sprite flipping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    Up,
    #[default]
    Down,
    Left,
    Right,
}

/// Placement of an entity in the scene.
///
/// `dim` is the footprint in world pixels and feeds both the spatial grid
/// and the paint-order key; it is independent of the sprite region's size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Spatial {
    pub pos: Vec3,
    pub rot: Vec3,
    pub scale: Vec3,
    pub dim: Vec2,
    pub direction: Direction,
}

impl Spatial {
    pub fn new(pos: Vec3, dim: Vec2) -> Self {
        Self {
            pos,
            rot: Vec3::ZERO,
            scale: Vec3::ONE,
            dim,
            direction: Direction::default(),
        }
    }

    /// Axis-aligned footprint used for spatial indexing and culling.
    pub fn bounds(&self) -> Rect<f32> {
        Rect::new(self.pos.x, self.pos.y, self.dim.x, self.dim.y)
    }
}

impl Component for Spatial {}

/// The atlas region an entity currently displays.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpriteFrame {
    pub region: AtlasRegion,
}

impl SpriteFrame {
    pub fn new(region: AtlasRegion) -> Self {
        Self { region }
    }
}

impl Component for SpriteFrame {}

/// Marks an entity as a map tile.
///
/// `lattice` is the pixel offset of the tile's cell within the tileset
/// region; the cell itself is always `TILE_SIZE` square.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tile {
    pub lattice: Vec2,
    pub tileset: AtlasRegion,
}

impl Component for Tile {}

/// Cached model matrix, recomputed only when the source data changed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Model(pub Mat4);

impl Component for Model {}

/// Tag: visible sprite, included in the depth-sorted pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToRender;

impl Component for ToRender {}

/// Tag: visible tile, drawn unsorted beneath the sprites.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToRenderTile;

impl Component for ToRenderTile {}

/// Tag: draw a silhouette outline around the sprite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outline;

impl Component for Outline {}

/// Tag: entity is drawn by the text path, not the sprite pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Text;

impl Component for Text {}

/// Tag: drawn in the UI pass with the UI camera, after the world flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuiElement;

impl Component for GuiElement {}

/// Collision volumes attached to an entity.
///
/// Each box packs `(width, height, offset_x, offset_y)`; offsets are relative
/// to the entity position and scaled by the entity's scale.
#[derive(Debug, Clone, PartialEq)]
pub struct Collision {
    pub boxes: Vec<Vec4>,
}

impl Component for Collision {}

/// Tag: overlay this entity's collision boxes in debug builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebugCollision;

impl Component for DebugCollision {}
