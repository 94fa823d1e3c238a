//! Visible-set culling with frame-to-frame diffing.

use tessera_core::{
    ecs::{Entity, Registry},
    geometry::Rect,
    profiling::profile_function,
};

use crate::components::{Tile, ToRender, ToRenderTile};

/// Extra world pixels queried around the camera so entities sliding into
/// view are tagged before their first visible pixel.
pub const DEFAULT_MARGIN: f32 = 16.0;

/// Entities that entered or left the visible set this frame.
///
/// Both lists are sorted by entity id.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct CullDelta {
    pub entered: Vec<Entity>,
    pub exited: Vec<Entity>,
}

/// Diffs the camera's spatial query against the previous frame's visible
/// set, tagging entering entities and untagging exiting ones.
///
/// Only the delta is touched each frame; entities that stay visible keep
/// their tags and are never re-examined.
pub struct Culler {
    /// Previous frame's visible set, sorted by entity id.
    visible: Vec<Entity>,
    /// Scratch buffer for the current query, swapped into `visible`.
    scratch: Vec<Entity>,
    margin: f32,
}

impl Default for Culler {
    fn default() -> Self {
        Self::new(DEFAULT_MARGIN)
    }
}

impl Culler {
    pub fn new(margin: f32) -> Self {
        Self {
            visible: Vec::new(),
            scratch: Vec::new(),
            margin,
        }
    }

    /// Query the grid around `view`, diff against the previous frame, and
    /// update the `ToRender` / `ToRenderTile` tags.
    pub fn update(
        &mut self,
        reg: &mut Registry,
        grid: &crate::grid::SpatialGrid,
        view: Rect<f32>,
    ) -> CullDelta {
        profile_function!();
        let query_rect = view.expand(self.margin);
        grid.query_into(&query_rect, &mut self.scratch);

        let entered = sorted_difference(&self.scratch, &self.visible);
        let exited = sorted_difference(&self.visible, &self.scratch);

        for &ent in &entered {
            if reg.has_component::<Tile>(ent) {
                reg.add_component(ent, ToRenderTile);
            } else {
                reg.add_component(ent, ToRender);
            }
        }
        for &ent in &exited {
            reg.remove_component::<ToRender>(ent);
            reg.remove_component::<ToRenderTile>(ent);
        }

        std::mem::swap(&mut self.visible, &mut self.scratch);
        self.scratch.clear();

        CullDelta { entered, exited }
    }

    /// The current visible set, sorted by entity id.
    pub fn visible(&self) -> &[Entity] {
        &self.visible
    }
}

/// Elements of `a` not present in `b`. Both inputs must be sorted.
fn sorted_difference(a: &[Entity], b: &[Entity]) -> Vec<Entity> {
    let mut out = Vec::new();
    let mut bi = 0;
    for &ent in a {
        while bi < b.len() && b[bi] < ent {
            bi += 1;
        }
        if bi >= b.len() || b[bi] != ent {
            out.push(ent);
        }
    }
    out
}
