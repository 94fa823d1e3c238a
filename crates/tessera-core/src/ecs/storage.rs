use std::any::Any;

use super::{Component, ComponentStorage, Entity};

/// Sparse-set storage for one component type.
///
/// `sparse` maps entity index to a slot in the dense arrays; `entities` and
/// `comps` stay parallel. Removal swap-removes, so dense order is insertion
/// order disturbed only by removals.
pub struct Storage<T> {
    sparse: Vec<Option<u32>>,
    pub(super) entities: Vec<Entity>,
    pub(super) comps: Vec<T>,
    added: Vec<Entity>,
    changed: Vec<Entity>,
    removed: Vec<Entity>,
}

impl<T> Storage<T> {
    pub const fn new() -> Self {
        Self {
            sparse: Vec::new(),
            entities: Vec::new(),
            comps: Vec::new(),
            added: Vec::new(),
            changed: Vec::new(),
            removed: Vec::new(),
        }
    }

    fn slot(&self, ent: Entity) -> Option<usize> {
        self.sparse
            .get(ent.index())
            .copied()
            .flatten()
            .map(|s| s as usize)
    }

    pub fn contains(&self, ent: Entity) -> bool {
        self.slot(ent).is_some()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Insert or replace. Logs *added* on insert, *changed* on replace.
    pub fn insert(&mut self, ent: Entity, comp: T) {
        if let Some(slot) = self.slot(ent) {
            self.comps[slot] = comp;
            push_unique(&mut self.changed, ent);
            return;
        }

        let idx = ent.index();
        if idx >= self.sparse.len() {
            self.sparse.resize(idx + 1, None);
        }
        self.sparse[idx] = Some(self.entities.len() as u32);
        self.entities.push(ent);
        self.comps.push(comp);
        push_unique(&mut self.added, ent);
    }

    pub fn get(&self, ent: Entity) -> Option<&T> {
        self.slot(ent).map(|s| &self.comps[s])
    }

    /// Mutable access. Logs a *changed* event.
    pub fn get_mut(&mut self, ent: Entity) -> Option<&mut T> {
        let slot = self.slot(ent)?;
        push_unique(&mut self.changed, ent);
        Some(&mut self.comps[slot])
    }

    /// Remove the component, if present. Logs a *removed* event.
    pub fn remove(&mut self, ent: Entity) -> Option<T> {
        let slot = self.slot(ent)?;
        self.sparse[ent.index()] = None;

        self.entities.swap_remove(slot);
        let comp = self.comps.swap_remove(slot);
        // Patch the sparse entry of the entity that got swapped into `slot`.
        if let Some(&moved) = self.entities.get(slot) {
            self.sparse[moved.index()] = Some(slot as u32);
        }
        push_unique(&mut self.removed, ent);
        Some(comp)
    }

    /// Iterate over `(entity, component)` pairs in dense order.
    pub fn iter(&self) -> impl Iterator<Item = (Entity, &T)> {
        self.entities.iter().copied().zip(self.comps.iter())
    }

    pub fn take_added(&mut self) -> Vec<Entity> {
        std::mem::take(&mut self.added)
    }

    pub fn take_changed(&mut self) -> Vec<Entity> {
        std::mem::take(&mut self.changed)
    }

    pub fn take_removed(&mut self) -> Vec<Entity> {
        std::mem::take(&mut self.removed)
    }
}

impl<T> Default for Storage<T> {
    fn default() -> Self {
        Self::new()
    }
}

fn push_unique(log: &mut Vec<Entity>, ent: Entity) {
    if !log.contains(&ent) {
        log.push(ent);
    }
}

impl<T: Component> ComponentStorage for Storage<T> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn clear_events(&mut self) {
        self.added.clear();
        self.changed.clear();
        self.removed.clear();
    }

    fn evict(&mut self, ent: Entity) {
        let _ = self.remove(ent);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::Registry;

    impl Component for u8 {}

    fn entity(reg: &mut Registry) -> Entity {
        reg.new_entity()
    }

    #[test]
    fn test_insert_and_get() {
        let mut reg = Registry::new();
        let a = entity(&mut reg);
        let b = entity(&mut reg);
        let mut storage = Storage::<u8>::new();
        storage.insert(a, 42);
        storage.insert(b, 59);
        assert_eq!(storage.get(a), Some(&42));
        assert_eq!(storage.get(b), Some(&59));
        assert_eq!(storage.len(), 2);
    }

    #[test]
    fn test_remove_patches_swapped_slot() {
        let mut reg = Registry::new();
        let a = entity(&mut reg);
        let b = entity(&mut reg);
        let c = entity(&mut reg);
        let mut storage = Storage::<u8>::new();
        storage.insert(a, 1);
        storage.insert(b, 2);
        storage.insert(c, 3);

        assert_eq!(storage.remove(a), Some(1));
        // c was swapped into a's dense slot and must still resolve.
        assert_eq!(storage.get(c), Some(&3));
        assert_eq!(storage.get(b), Some(&2));
        assert_eq!(storage.get(a), None);
    }

    #[test]
    fn test_iter_dense_order() {
        let mut reg = Registry::new();
        let a = entity(&mut reg);
        let b = entity(&mut reg);
        let mut storage = Storage::<u8>::new();
        storage.insert(b, 2);
        storage.insert(a, 1);
        let collected: Vec<_> = storage.iter().collect();
        assert_eq!(collected, vec![(b, &2), (a, &1)]);
    }
}
