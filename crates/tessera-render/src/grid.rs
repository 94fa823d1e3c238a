//! Uniform spatial hash grid over entity footprints.

use ahash::{HashMap, HashMapExt};
use tessera_core::{ecs::Entity, geometry::Rect, profiling::profile_function};

/// The inclusive range of grid cells a rectangle overlaps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CellSpan {
    min_x: i32,
    min_y: i32,
    max_x: i32,
    max_y: i32,
}

impl CellSpan {
    fn cells(self) -> impl Iterator<Item = (i32, i32)> {
        (self.min_x..=self.max_x)
            .flat_map(move |x| (self.min_y..=self.max_y).map(move |y| (x, y)))
    }
}

/// Buckets entities into fixed-size cells so visibility queries touch only
/// the camera's neighborhood instead of the whole scene.
///
/// Query results are always sorted by entity id and deduplicated, so callers
/// can diff consecutive queries with a plain merge walk.
pub struct SpatialGrid {
    cell_size: f32,
    cells: HashMap<(i32, i32), Vec<Entity>>,
    spans: HashMap<Entity, CellSpan>,
}

impl SpatialGrid {
    pub fn new(cell_size: f32) -> Self {
        assert!(cell_size > 0.0, "cell size must be positive");
        Self {
            cell_size,
            cells: HashMap::new(),
            spans: HashMap::new(),
        }
    }

    fn span(&self, rect: &Rect<f32>) -> CellSpan {
        CellSpan {
            min_x: (rect.x / self.cell_size).floor() as i32,
            min_y: (rect.y / self.cell_size).floor() as i32,
            max_x: ((rect.x + rect.width) / self.cell_size).floor() as i32,
            max_y: ((rect.y + rect.height) / self.cell_size).floor() as i32,
        }
    }

    /// Insert or move an entity. A no-op when the footprint stays within the
    /// same cells.
    pub fn update(&mut self, ent: Entity, bounds: &Rect<f32>) {
        let span = self.span(bounds);
        if self.spans.get(&ent) == Some(&span) {
            return;
        }
        self.remove(ent);
        for cell in span.cells() {
            self.cells.entry(cell).or_default().push(ent);
        }
        self.spans.insert(ent, span);
    }

    /// Remove an entity. A no-op when absent.
    pub fn remove(&mut self, ent: Entity) {
        let Some(span) = self.spans.remove(&ent) else {
            return;
        };
        for cell in span.cells() {
            if let Some(bucket) = self.cells.get_mut(&cell) {
                bucket.retain(|&e| e != ent);
                if bucket.is_empty() {
                    self.cells.remove(&cell);
                }
            }
        }
    }

    pub fn contains(&self, ent: Entity) -> bool {
        self.spans.contains_key(&ent)
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// Collect every entity whose footprint touches a cell overlapping
    /// `rect`, sorted by entity id with duplicates removed.
    pub fn query(&self, rect: &Rect<f32>) -> Vec<Entity> {
        let mut out = Vec::new();
        self.query_into(rect, &mut out);
        out
    }

    /// Like [`SpatialGrid::query`] but reuses the caller's buffer.
    pub fn query_into(&self, rect: &Rect<f32>, out: &mut Vec<Entity>) {
        profile_function!();
        out.clear();
        for cell in self.span(rect).cells() {
            if let Some(bucket) = self.cells.get(&cell) {
                out.extend_from_slice(bucket);
            }
        }
        out.sort_unstable();
        out.dedup();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_core::ecs::Registry;

    fn grid() -> SpatialGrid {
        SpatialGrid::new(64.0)
    }

    #[test]
    fn test_query_returns_nearby_entities() {
        let mut reg = Registry::new();
        let near = reg.new_entity();
        let far = reg.new_entity();
        let mut grid = grid();
        grid.update(near, &Rect::new(10.0, 10.0, 16.0, 16.0));
        grid.update(far, &Rect::new(1000.0, 1000.0, 16.0, 16.0));

        let hits = grid.query(&Rect::new(0.0, 0.0, 100.0, 100.0));
        assert_eq!(hits, vec![near]);
    }

    #[test]
    fn test_spanning_entity_reported_once_and_sorted() {
        let mut reg = Registry::new();
        let a = reg.new_entity();
        let wide = reg.new_entity();
        let mut grid = grid();
        // `wide` straddles several cells inside the query rect.
        grid.update(wide, &Rect::new(30.0, 30.0, 200.0, 200.0));
        grid.update(a, &Rect::new(5.0, 5.0, 8.0, 8.0));

        let hits = grid.query(&Rect::new(0.0, 0.0, 256.0, 256.0));
        assert_eq!(hits, vec![a, wide]);
    }

    #[test]
    fn test_update_moves_entity_between_cells() {
        let mut reg = Registry::new();
        let ent = reg.new_entity();
        let mut grid = grid();
        grid.update(ent, &Rect::new(0.0, 0.0, 16.0, 16.0));
        grid.update(ent, &Rect::new(500.0, 500.0, 16.0, 16.0));

        assert!(grid.query(&Rect::new(0.0, 0.0, 64.0, 64.0)).is_empty());
        assert_eq!(
            grid.query(&Rect::new(480.0, 480.0, 64.0, 64.0)),
            vec![ent]
        );
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut reg = Registry::new();
        let ent = reg.new_entity();
        let mut grid = grid();
        grid.update(ent, &Rect::new(0.0, 0.0, 16.0, 16.0));
        grid.remove(ent);
        grid.remove(ent);
        assert!(grid.is_empty());
        assert!(grid.query(&Rect::new(0.0, 0.0, 64.0, 64.0)).is_empty());
    }

    #[test]
    fn test_negative_coordinates_bucket_correctly() {
        let mut reg = Registry::new();
        let ent = reg.new_entity();
        let mut grid = grid();
        grid.update(ent, &Rect::new(-40.0, -40.0, 16.0, 16.0));

        assert_eq!(
            grid.query(&Rect::new(-64.0, -64.0, 64.0, 64.0)),
            vec![ent]
        );
        assert!(grid.query(&Rect::new(64.0, 64.0, 64.0, 64.0)).is_empty());
    }
}
