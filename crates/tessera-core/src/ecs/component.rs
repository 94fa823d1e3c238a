use std::any::Any;

use super::{Entity, Registry};

/// Marker trait for component types.
pub trait Component: Any {}

/// A value, or tuple of values, that can be attached to an entity at spawn.
pub trait ComponentSet {
    fn attach(self, ent: Entity, reg: &mut Registry);
}

impl<T> ComponentSet for T
where
    T: Component,
{
    fn attach(self, ent: Entity, reg: &mut Registry) {
        reg.add_component(ent, self);
    }
}

macro_rules! component_set_impl {
    ($($ty:ident : $idx:tt),+) => {
        impl<$($ty),+> ComponentSet for ($($ty,)+)
        where
            $( $ty: Component ),+
        {
            fn attach(self, ent: Entity, reg: &mut Registry) {
                $( reg.add_component(ent, self.$idx); )+
            }
        }
    };
}

component_set_impl!(T0: 0);
component_set_impl!(T0: 0, T1: 1);
component_set_impl!(T0: 0, T1: 1, T2: 2);
component_set_impl!(T0: 0, T1: 1, T2: 2, T3: 3);
component_set_impl!(T0: 0, T1: 1, T2: 2, T3: 3, T4: 4);
component_set_impl!(T0: 0, T1: 1, T2: 2, T3: 3, T4: 4, T5: 5);
