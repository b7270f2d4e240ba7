//! Generational slot storage for registered tasks and constraints.
//!
//! The solver owns every registered object and hands out typed handles.
//! A handle goes stale when its object is removed; stale handles resolve to
//! nothing instead of to whatever reuses the slot.

use std::any::Any;
use std::fmt;
use std::marker::PhantomData;

/// Object-safe access to `Any` for trait objects stored in the registry.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

/// Untyped slot key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct Key {
    index: usize,
    generation: u64,
}

macro_rules! typed_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        pub struct $name<T> {
            pub(crate) key: Key,
            _marker: PhantomData<fn() -> T>,
        }

        impl<T> $name<T> {
            pub(crate) const fn new(key: Key) -> Self {
                Self {
                    key,
                    _marker: PhantomData,
                }
            }
        }

        impl<T> Clone for $name<T> {
            fn clone(&self) -> Self {
                *self
            }
        }

        impl<T> Copy for $name<T> {}

        impl<T> PartialEq for $name<T> {
            fn eq(&self, other: &Self) -> bool {
                self.key == other.key
            }
        }

        impl<T> Eq for $name<T> {}

        impl<T> fmt::Debug for $name<T> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(
                    f,
                    "{}({}v{})",
                    stringify!($name),
                    self.key.index,
                    self.key.generation
                )
            }
        }
    };
}

typed_handle!(
    /// Handle to a task registered in a [`QpSolver`](crate::QpSolver).
    TaskId
);

typed_handle!(
    /// Handle to a constraint registered in a [`QpSolver`](crate::QpSolver).
    ConstraintId
);

/// A registered object and the layout revision it was last sized for.
pub(crate) struct Entry<B: ?Sized> {
    pub value: Box<B>,
    pub revision: Option<u64>,
}

struct Slot<B: ?Sized> {
    generation: u64,
    entry: Option<Entry<B>>,
}

/// Slot store with insertion-ordered iteration.
pub(crate) struct Registry<B: ?Sized> {
    slots: Vec<Slot<B>>,
    free: Vec<usize>,
    order: Vec<usize>,
}

impl<B: ?Sized> Default for Registry<B> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            order: Vec::new(),
        }
    }
}

impl<B: ?Sized> Registry<B> {
    pub fn insert(&mut self, value: Box<B>) -> Key {
        let entry = Some(Entry {
            value,
            revision: None,
        });
        let index = if let Some(index) = self.free.pop() {
            self.slots[index].entry = entry;
            index
        } else {
            self.slots.push(Slot { generation: 0, entry });
            self.slots.len() - 1
        };
        self.order.push(index);
        Key {
            index,
            generation: self.slots[index].generation,
        }
    }

    pub fn get(&self, key: Key) -> Option<&B> {
        self.slot(key).map(|e| &*e.value)
    }

    pub fn get_mut(&mut self, key: Key) -> Option<&mut B> {
        let slot = self.slots.get_mut(key.index)?;
        if slot.generation != key.generation {
            return None;
        }
        slot.entry.as_mut().map(|e| &mut *e.value)
    }

    pub fn remove(&mut self, key: Key) -> Option<Box<B>> {
        let slot = self.slots.get_mut(key.index)?;
        if slot.generation != key.generation {
            return None;
        }
        let entry = slot.entry.take()?;
        slot.generation += 1;
        self.free.push(key.index);
        self.order.retain(|&i| i != key.index);
        Some(entry.value)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Registered entries in insertion order.
    pub fn entries_mut(&mut self) -> impl Iterator<Item = &mut Entry<B>> {
        let mut by_index: Vec<Option<&mut Entry<B>>> =
            self.slots.iter_mut().map(|s| s.entry.as_mut()).collect();
        self.order
            .iter()
            .filter_map(move |&i| by_index.get_mut(i).and_then(Option::take))
    }

    /// Registered values in insertion order.
    pub fn values(&self) -> impl Iterator<Item = &B> {
        self.order
            .iter()
            .filter_map(|&i| self.slots[i].entry.as_ref().map(|e| &*e.value))
    }

    /// Remove everything, returning the values in insertion order.
    pub fn drain(&mut self) -> Vec<Box<B>> {
        let order = std::mem::take(&mut self.order);
        order
            .into_iter()
            .filter_map(|i| {
                let slot = &mut self.slots[i];
                let entry = slot.entry.take()?;
                slot.generation += 1;
                self.free.push(i);
                Some(entry.value)
            })
            .collect()
    }

    fn slot(&self, key: Key) -> Option<&Entry<B>> {
        let slot = self.slots.get(key.index)?;
        if slot.generation == key.generation {
            slot.entry.as_ref()
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Named: AsAny {
        fn name(&self) -> &str;
    }

    struct Item(&'static str);

    impl Named for Item {
        fn name(&self) -> &str {
            self.0
        }
    }

    #[test]
    fn insertion_order_is_kept() {
        let mut reg: Registry<dyn Named> = Registry::default();
        reg.insert(Box::new(Item("a")));
        let b = reg.insert(Box::new(Item("b")));
        reg.insert(Box::new(Item("c")));
        reg.remove(b);
        reg.insert(Box::new(Item("d")));
        let names: Vec<&str> = reg.values().map(Named::name).collect();
        assert_eq!(names, ["a", "c", "d"]);
        assert_eq!(reg.len(), 3);
    }

    #[test]
    fn stale_key_does_not_reach_reused_slot() {
        let mut reg: Registry<dyn Named> = Registry::default();
        let a = reg.insert(Box::new(Item("a")));
        assert!(reg.remove(a).is_some());
        let b = reg.insert(Box::new(Item("b")));
        assert_eq!(a.index, b.index);
        assert!(reg.get(a).is_none());
        assert!(reg.remove(a).is_none());
        assert_eq!(reg.get(b).map(Named::name), Some("b"));
    }

    #[test]
    fn drain_empties_and_invalidates() {
        let mut reg: Registry<dyn Named> = Registry::default();
        let a = reg.insert(Box::new(Item("a")));
        reg.insert(Box::new(Item("b")));
        let drained = reg.drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(reg.len(), 0);
        assert!(reg.get(a).is_none());
    }

    #[test]
    fn entries_mut_visits_in_order() {
        let mut reg: Registry<dyn Named> = Registry::default();
        reg.insert(Box::new(Item("x")));
        reg.insert(Box::new(Item("y")));
        for entry in reg.entries_mut() {
            entry.revision = Some(7);
        }
        assert!(reg.entries_mut().all(|e| e.revision == Some(7)));
    }

    #[test]
    fn downcast_through_as_any() {
        let mut reg: Registry<dyn Named> = Registry::default();
        let a = reg.insert(Box::new(Item("a")));
        let item = reg.get(a).and_then(|v| v.as_any().downcast_ref::<Item>());
        assert_eq!(item.map(|i| i.0), Some("a"));
        let boxed = reg.remove(a).unwrap();
        assert!(boxed.into_any().downcast::<Item>().is_ok());
    }

    #[test]
    fn handle_debug_names_type() {
        let id: TaskId<u8> = TaskId::new(Key {
            index: 3,
            generation: 1,
        });
        assert_eq!(format!("{id:?}"), "TaskId(3v1)");
    }
}
