//! Entity-component registry with per-storage change tracking.
//!
//! Each component type lives in its own sparse-set [`Storage`]. Storages keep
//! one-shot event logs (added / changed / removed) that systems drain once per
//! frame; [`Registry::clear_events`] wipes whatever was not drained so no
//! stale entries survive into the next frame.

use crate::profiling::profile_function;
use std::{
    any::{Any, TypeId},
    collections::HashMap,
    num::NonZeroU64,
};

mod component;
mod query;
mod storage;
pub use component::*;
pub use query::*;
pub use storage::*;

/// An opaque entity identifier.
///
/// Ordering is by identifier value; this is the canonical total order used
/// wherever a deterministic entity sequence is required (spatial queries,
/// visible-set diffing).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Entity(NonZeroU64);

impl Entity {
    pub(crate) fn index(self) -> usize {
        (self.0.get() - 1) as usize
    }
}

static_assertions::assert_eq_size!(Entity, Option<Entity>);

pub struct Registry {
    next: u64,
    comps: HashMap<TypeId, Box<dyn ComponentStorage>>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self {
            next: 1,
            comps: HashMap::new(),
        }
    }

    /// Create an entity and attach the given component tuple.
    pub fn spawn<C: ComponentSet>(&mut self, comps: C) -> Entity {
        let ent = self.new_entity();
        comps.attach(ent, self);
        ent
    }

    pub fn new_entity(&mut self) -> Entity {
        profile_function!();
        let id = NonZeroU64::new(self.next).expect("entity id overflow");
        self.next += 1;
        Entity(id)
    }

    /// Remove the entity from every storage it appears in.
    pub fn despawn(&mut self, ent: Entity) {
        profile_function!();
        for storage in self.comps.values_mut() {
            storage.evict(ent);
        }
    }

    pub fn query<'a, Q>(&'a self) -> <Q as QueryDef<'a>>::Query
    where
        Q: QueryDef<'a>,
    {
        profile_function!();
        Q::make(self)
    }

    fn get_or_create_storage<T: Component>(&mut self) -> &mut Storage<T> {
        let storage = self
            .comps
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(Storage::<T>::new()));
        storage
            .as_any_mut()
            .downcast_mut()
            .expect("storage type mismatch")
    }

    /// Attach a component, replacing any existing one.
    ///
    /// Logs an *added* event on first insert, a *changed* event on replace.
    pub fn add_component<T: Component>(&mut self, ent: Entity, comp: T) {
        profile_function!();
        self.get_or_create_storage::<T>().insert(ent, comp);
    }

    pub fn get_component<T: Component>(&self, ent: Entity) -> Option<&T> {
        self.storage::<T>()?.get(ent)
    }

    /// Mutable component access. Logs a *changed* event for the entity.
    pub fn get_component_mut<T: Component>(&mut self, ent: Entity) -> Option<&mut T> {
        self.storage_mut::<T>()?.get_mut(ent)
    }

    /// Detach a component. A no-op returning `None` when absent.
    pub fn remove_component<T: Component>(&mut self, ent: Entity) -> Option<T> {
        profile_function!();
        self.storage_mut::<T>()?.remove(ent)
    }

    pub fn has_component<T: Component>(&self, ent: Entity) -> bool {
        self.storage::<T>().is_some_and(|s| s.contains(ent))
    }

    pub fn storage<T: Component>(&self) -> Option<&Storage<T>> {
        let storage = self.comps.get(&TypeId::of::<T>())?;
        Some(
            storage
                .as_any()
                .downcast_ref::<Storage<T>>()
                .expect("storage type mismatch"),
        )
    }

    pub fn storage_mut<T: Component>(&mut self) -> Option<&mut Storage<T>> {
        let storage = self.comps.get_mut(&TypeId::of::<T>())?;
        Some(
            storage
                .as_any_mut()
                .downcast_mut::<Storage<T>>()
                .expect("storage type mismatch"),
        )
    }

    /// Drain the one-shot set of entities that gained a `T` since the last drain.
    pub fn take_added<T: Component>(&mut self) -> Vec<Entity> {
        self.storage_mut::<T>()
            .map(Storage::take_added)
            .unwrap_or_default()
    }

    /// Drain the one-shot set of entities whose `T` was mutated since the last drain.
    pub fn take_changed<T: Component>(&mut self) -> Vec<Entity> {
        self.storage_mut::<T>()
            .map(Storage::take_changed)
            .unwrap_or_default()
    }

    /// Drain the one-shot set of entities that lost their `T` since the last drain.
    pub fn take_removed<T: Component>(&mut self) -> Vec<Entity> {
        self.storage_mut::<T>()
            .map(Storage::take_removed)
            .unwrap_or_default()
    }

    /// Clear every event log of every storage.
    ///
    /// Called once per frame after the systems have run, so undrained events
    /// never leak into the next frame.
    pub fn clear_events(&mut self) {
        profile_function!();
        for storage in self.comps.values_mut() {
            storage.clear_events();
        }
    }
}

/// Type-erased storage interface held by the registry.
pub(crate) trait ComponentStorage: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn clear_events(&mut self);
    fn evict(&mut self, ent: Entity);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Eq)]
    struct Health(u32);
    impl Component for Health {}

    #[derive(Debug, PartialEq, Eq)]
    struct Name(&'static str);
    impl Component for Name {}

    #[test]
    fn test_spawn_and_get() {
        let mut reg = Registry::new();
        let ent = reg.spawn((Health(10), Name("goblin")));
        assert_eq!(reg.get_component::<Health>(ent), Some(&Health(10)));
        assert_eq!(reg.get_component::<Name>(ent), Some(&Name("goblin")));
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut reg = Registry::new();
        let ent = reg.spawn(Health(1));
        assert_eq!(reg.remove_component::<Health>(ent), Some(Health(1)));
        assert_eq!(reg.remove_component::<Health>(ent), None);
        assert_eq!(reg.remove_component::<Name>(ent), None);
    }

    #[test]
    fn test_entity_order_is_by_id() {
        let mut reg = Registry::new();
        let a = reg.new_entity();
        let b = reg.new_entity();
        assert!(a < b);
    }

    #[test]
    fn test_added_events_drain_once() {
        let mut reg = Registry::new();
        let ent = reg.spawn(Health(5));
        assert_eq!(reg.take_added::<Health>(), vec![ent]);
        assert!(reg.take_added::<Health>().is_empty());
    }

    #[test]
    fn test_changed_events_deduplicate() {
        let mut reg = Registry::new();
        let ent = reg.spawn(Health(5));
        reg.clear_events();
        reg.get_component_mut::<Health>(ent).unwrap().0 = 6;
        reg.get_component_mut::<Health>(ent).unwrap().0 = 7;
        assert_eq!(reg.take_changed::<Health>(), vec![ent]);
    }

    #[test]
    fn test_replace_logs_changed_not_added() {
        let mut reg = Registry::new();
        let ent = reg.spawn(Health(5));
        reg.clear_events();
        reg.add_component(ent, Health(6));
        assert!(reg.take_added::<Health>().is_empty());
        assert_eq!(reg.take_changed::<Health>(), vec![ent]);
        assert_eq!(reg.get_component::<Health>(ent), Some(&Health(6)));
    }

    #[test]
    fn test_clear_events_wipes_undrained_logs() {
        let mut reg = Registry::new();
        let ent = reg.spawn(Health(5));
        reg.get_component_mut::<Health>(ent).unwrap().0 = 6;
        reg.clear_events();
        assert!(reg.take_added::<Health>().is_empty());
        assert!(reg.take_changed::<Health>().is_empty());
    }

    #[test]
    fn test_despawn_removes_all_components() {
        let mut reg = Registry::new();
        let ent = reg.spawn((Health(1), Name("slime")));
        reg.despawn(ent);
        assert!(!reg.has_component::<Health>(ent));
        assert!(!reg.has_component::<Name>(ent));
    }

    #[test]
    fn test_query_pair() {
        let mut reg = Registry::new();
        let a = reg.spawn((Health(1), Name("a")));
        let _b = reg.spawn(Health(2));
        let c = reg.spawn((Health(3), Name("c")));

        let results: Vec<_> = reg.query::<(Health, Name)>().collect();
        assert_eq!(
            results,
            vec![(a, &Health(1), &Name("a")), (c, &Health(3), &Name("c"))]
        );
    }
}
