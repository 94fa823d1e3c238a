use super::{Component, Entity, Registry, Storage};

pub trait Query<'a>: Sized + Iterator {
    fn fetch(reg: &'a Registry) -> Self;
}

/// Iterates the dense arrays of a single storage.
pub struct Query1<'a, T> {
    store: Option<&'a Storage<T>>,
    pos: usize,
}

impl<'a, T> Iterator for Query1<'a, T>
where
    T: Component,
{
    type Item = (Entity, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        let store = self.store?;
        if self.pos >= store.entities.len() {
            return None;
        }
        let item = (store.entities[self.pos], &store.comps[self.pos]);
        self.pos += 1;
        Some(item)
    }
}

impl<'a, T> Query<'a> for Query1<'a, T>
where
    T: Component,
{
    fn fetch(reg: &'a Registry) -> Self {
        Self {
            store: reg.storage::<T>(),
            pos: 0,
        }
    }
}

macro_rules! query_impl {
    ($name:ident, $inner:ident, $new:ident, $($ty:ident),+) => {
        /// Wraps the next-smaller query, filtering on membership in one more storage.
        pub struct $name<'a, $($ty),+, $new>
        where
            $new: Component,
            $( $ty: Component ),+
        {
            inner: $inner<'a, $($ty),+>,
            store: Option<&'a Storage<$new>>,
        }

        impl<'a, $($ty),+, $new> Iterator for $name<'a, $($ty),+, $new>
        where
            $new: Component,
            $( $ty: Component ),+
        {
            type Item = (Entity, $(&'a $ty,)+ &'a $new);

            fn next(&mut self) -> Option<Self::Item> {
                let store = self.store?;
                #[allow(non_snake_case)]
                while let Some((ent, $($ty),+)) = self.inner.next() {
                    if let Some(comp) = store.get(ent) {
                        return Some((ent, $($ty,)+ comp));
                    }
                }
                None
            }
        }

        impl<'a, $($ty),+, $new> Query<'a> for $name<'a, $($ty),+, $new>
        where
            $new: Component,
            $( $ty: Component ),+
        {
            fn fetch(reg: &'a Registry) -> Self {
                Self {
                    inner: $inner::fetch(reg),
                    store: reg.storage::<$new>(),
                }
            }
        }
    }
}

query_impl!(Query2, Query1, B, A);
query_impl!(Query3, Query2, C, A, B);
query_impl!(Query4, Query3, D, A, B, C);

pub trait QueryDef<'a> {
    type Query: Query<'a>;
    fn make(reg: &'a Registry) -> Self::Query;
}

macro_rules! querydef_impl {
    ($name:ident, $($ty:ident),+) => {
        impl<'a, $($ty),+> QueryDef<'a> for ($($ty),+,)
            where $( $ty: Component ),+
        {
            type Query = $name<'a, $($ty),+>;
            fn make(reg: &'a Registry) -> Self::Query {
                $name::fetch(reg)
            }
        }
    };
}

querydef_impl!(Query1, A);
querydef_impl!(Query2, A, B);
querydef_impl!(Query3, A, B, C);
querydef_impl!(Query4, A, B, C, D);

// Bare component type as a single-element query.
impl<'a, T> QueryDef<'a> for T
where
    T: Component,
{
    type Query = Query1<'a, T>;

    fn make(reg: &'a Registry) -> Self::Query {
        Query1::fetch(reg)
    }
}
