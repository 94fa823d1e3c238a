//! CPU-side instance batching.
//!
//! Each visible quad contributes one entry to two parallel buffers: a region
//! descriptor locating its pixels in the atlas, and a model matrix placing
//! the unit quad in the world. Batches are grouped per material and flushed
//! in a fixed order.

pub mod pipeline;
pub mod renderer;

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec2};

use crate::atlas::{AtlasRegion, TILE_SIZE};
use crate::components::Tile;

/// Per-instance atlas rectangle, `(x, y, width, height)` in atlas pixels.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct RegionData {
    pub position: [f32; 2],
    pub size: [f32; 2],
}

impl RegionData {
    pub fn new(position: Vec2, size: Vec2) -> Self {
        Self {
            position: position.to_array(),
            size: size.to_array(),
        }
    }

    pub fn from_region(region: &AtlasRegion) -> Self {
        Self::new(region.position, region.size)
    }

    /// The cell a tile displays: its lattice offset within the tileset.
    pub fn from_tile(tile: &Tile) -> Self {
        Self::new(tile.tileset.position + tile.lattice, Vec2::splat(TILE_SIZE))
    }
}

/// Parallel instance buffers for one material.
///
/// `regions` and `models` are index-aligned; entry `i` of each describes the
/// same quad.
#[derive(Debug, Default)]
pub struct InstanceBatch {
    regions: Vec<RegionData>,
    models: Vec<[[f32; 4]; 4]>,
}

impl InstanceBatch {
    pub fn push(&mut self, region: RegionData, model: Mat4) {
        self.regions.push(region);
        self.models.push(model.to_cols_array_2d());
        debug_assert_eq!(self.regions.len(), self.models.len());
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn clear(&mut self) {
        self.regions.clear();
        self.models.clear();
    }

    pub fn regions(&self) -> &[RegionData] {
        &self.regions
    }

    pub fn models(&self) -> &[[[f32; 4]; 4]] {
        &self.models
    }
}

/// The materials a frame can draw with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaterialKind {
    /// Atlas-sampled quads: tiles, sprites, UI.
    Instanced,
    /// Silhouette outline around a sprite's opaque pixels.
    InstancedOutline,
    /// Collision box overlay for debug builds.
    InstancedDebug,
}

impl MaterialKind {
    /// Flush order within a pass. Outlines draw over sprites, debug overlays
    /// draw over everything.
    pub const ALL: [MaterialKind; 3] = [
        MaterialKind::Instanced,
        MaterialKind::InstancedOutline,
        MaterialKind::InstancedDebug,
    ];

    pub(crate) fn index(self) -> usize {
        match self {
            MaterialKind::Instanced => 0,
            MaterialKind::InstancedOutline => 1,
            MaterialKind::InstancedDebug => 2,
        }
    }
}

/// Per-material batches for the frame being built.
#[derive(Debug, Default)]
pub struct BatchQueue {
    batches: [InstanceBatch; 3],
}

impl BatchQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&mut self, kind: MaterialKind, region: RegionData, model: Mat4) {
        self.batches[kind.index()].push(region, model);
    }

    pub fn batch(&self, kind: MaterialKind) -> &InstanceBatch {
        &self.batches[kind.index()]
    }

    /// Batches in flush order.
    pub fn iter(&self) -> impl Iterator<Item = (MaterialKind, &InstanceBatch)> {
        MaterialKind::ALL
            .into_iter()
            .map(|kind| (kind, &self.batches[kind.index()]))
    }

    pub fn clear(&mut self) {
        for batch in &mut self.batches {
            batch.clear();
        }
    }

    pub fn total_instances(&self) -> usize {
        self.batches.iter().map(InstanceBatch::len).sum()
    }

    /// The largest single batch, which bounds the GPU buffer capacity a
    /// flush needs.
    pub fn max_batch_len(&self) -> usize {
        self.batches.iter().map(InstanceBatch::len).max().unwrap_or(0)
    }
}
