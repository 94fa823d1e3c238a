//! Paint-order sorting for the sprite pass.

use tessera_core::{
    ecs::{Entity, Registry},
    profiling::profile_function,
};

use crate::{
    components::{Spatial, ToRender},
    cull::CullDelta,
};

/// Depth key: an entity paints later the lower its bottom edge sits, with
/// the z layer as a coarse multiplier. Negative z clamps to layer zero so
/// the key cannot flip sign and invert the y ordering.
pub fn paint_key(spatial: &Spatial) -> f32 {
    (spatial.pos.y + spatial.dim.y) * ((spatial.pos.z.max(0.0) + 1.0) * 10.0)
}

/// Maintains the sprite draw order across frames.
///
/// The order list persists between frames and is patched from the cull delta,
/// then re-sorted with an insertion sort. Frame-to-frame movement barely
/// perturbs the keys, so the sort is usually a single linear scan.
pub struct DepthSorter {
    order: Vec<Entity>,
    keyed: Vec<(Entity, f32)>,
}

impl Default for DepthSorter {
    fn default() -> Self {
        Self::new()
    }
}

impl DepthSorter {
    pub fn new() -> Self {
        Self {
            order: Vec::new(),
            keyed: Vec::new(),
        }
    }

    /// Drop exited entities and append entered sprites at the back.
    pub fn apply_delta(&mut self, reg: &Registry, delta: &CullDelta) {
        profile_function!();
        if !delta.exited.is_empty() {
            // Exited lists are sorted, so membership is a binary search.
            self.order
                .retain(|ent| delta.exited.binary_search(ent).is_err());
        }
        for &ent in &delta.entered {
            if reg.has_component::<ToRender>(ent) {
                self.order.push(ent);
            }
        }
    }

    /// Re-sort by paint key. Insertion sort keeps equal keys in their
    /// previous relative order.
    pub fn sort(&mut self, reg: &Registry) {
        profile_function!();
        self.keyed.clear();
        self.keyed.extend(self.order.iter().map(|&ent| {
            let key = reg
                .get_component::<Spatial>(ent)
                .map(paint_key)
                .unwrap_or_else(|| {
                    tracing::error!(?ent, "sorted entity has no spatial data");
                    0.0
                });
            (ent, key)
        }));

        insertion_sort(&mut self.keyed);

        self.order.clear();
        self.order.extend(self.keyed.iter().map(|&(ent, _)| ent));
    }

    /// The current draw order, back-to-front.
    pub fn order(&self) -> &[Entity] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

fn insertion_sort(items: &mut [(Entity, f32)]) {
    for i in 1..items.len() {
        let mut j = i;
        // Strict comparison: equal keys never swap, so the sort is stable.
        while j > 0 && items[j - 1].1 > items[j].1 {
            items.swap(j - 1, j);
            j -= 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Vec2, Vec3};

    fn sprite_at(reg: &mut Registry, y: f32, z: f32) -> Entity {
        let spatial = Spatial::new(Vec3::new(0.0, y, z), Vec2::new(16.0, 16.0));
        reg.spawn((spatial, ToRender))
    }

    fn delta_entered(ents: &[Entity]) -> CullDelta {
        CullDelta {
            entered: ents.to_vec(),
            exited: Vec::new(),
        }
    }

    #[test]
    fn test_paint_key_orders_by_bottom_edge() {
        let low = Spatial::new(Vec3::new(0.0, 50.0, 0.0), Vec2::new(16.0, 16.0));
        let high = Spatial::new(Vec3::new(0.0, 10.0, 0.0), Vec2::new(16.0, 16.0));
        assert!(paint_key(&high) < paint_key(&low));
    }

    #[test]
    fn test_negative_z_clamps_to_ground_layer() {
        let mut sunken = Spatial::new(Vec3::new(0.0, 10.0, 0.0), Vec2::new(16.0, 16.0));
        sunken.pos.z = -3.0;
        let grounded = Spatial::new(Vec3::new(0.0, 10.0, 0.0), Vec2::new(16.0, 16.0));
        assert_eq!(paint_key(&sunken), paint_key(&grounded));
    }

    #[test]
    fn test_sort_moves_small_key_to_front() {
        let mut reg = Registry::new();
        let a = sprite_at(&mut reg, 10.0, 0.0);
        let b = sprite_at(&mut reg, 10.0, 0.0);
        let c = sprite_at(&mut reg, 5.0, 0.0);

        let mut sorter = DepthSorter::new();
        sorter.apply_delta(&reg, &delta_entered(&[a, b, c]));
        sorter.sort(&reg);

        // Keys [10,10,5] -> [5,10,10] with the equal pair keeping its order.
        assert_eq!(sorter.order(), &[c, a, b]);
    }

    #[test]
    fn test_equal_keys_stay_stable_across_sorts() {
        let mut reg = Registry::new();
        let a = sprite_at(&mut reg, 20.0, 0.0);
        let b = sprite_at(&mut reg, 20.0, 0.0);

        let mut sorter = DepthSorter::new();
        sorter.apply_delta(&reg, &delta_entered(&[a, b]));
        sorter.sort(&reg);
        sorter.sort(&reg);
        sorter.sort(&reg);

        assert_eq!(sorter.order(), &[a, b]);
    }

    #[test]
    fn test_exited_entities_leave_the_order() {
        let mut reg = Registry::new();
        let a = sprite_at(&mut reg, 10.0, 0.0);
        let b = sprite_at(&mut reg, 20.0, 0.0);

        let mut sorter = DepthSorter::new();
        sorter.apply_delta(&reg, &delta_entered(&[a, b]));
        sorter.sort(&reg);

        let exit = CullDelta {
            entered: Vec::new(),
            exited: vec![a],
        };
        sorter.apply_delta(&reg, &exit);

        assert_eq!(sorter.order(), &[b]);
    }

    #[test]
    fn test_higher_z_paints_later() {
        let mut reg = Registry::new();
        let ground = sprite_at(&mut reg, 30.0, 0.0);
        let above = sprite_at(&mut reg, 10.0, 2.0);

        let mut sorter = DepthSorter::new();
        sorter.apply_delta(&reg, &delta_entered(&[ground, above]));
        sorter.sort(&reg);

        // (30+16)*10 = 460 < (10+16)*30 = 780
        assert_eq!(sorter.order(), &[ground, above]);
    }
}
