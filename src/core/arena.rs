//! Generational slot storage for menus and entries.
//!
//! Every key carries the generation of the slot it was issued for. Once the
//! value is removed the slot's generation moves on, so a key held across a
//! callback can be checked for liveness instead of dangling.

use std::fmt;
use std::marker::PhantomData;

/// A typed handle into an [`Arena`].
pub trait ArenaKey: Copy + Eq {
    fn from_parts(index: u32, generation: u32) -> Self;
    fn index(&self) -> u32;
    fn generation(&self) -> u32;
}

/// Declares a `Copy` key type for an [`Arena`].
macro_rules! arena_key {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name {
            index: u32,
            generation: u32,
        }

        impl $crate::core::arena::ArenaKey for $name {
            fn from_parts(index: u32, generation: u32) -> Self {
                Self { index, generation }
            }
            fn index(&self) -> u32 {
                self.index
            }
            fn generation(&self) -> u32 {
                self.generation
            }
        }

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}{}v{}", $prefix, self.index, self.generation)
            }
        }
    };
}

pub(crate) use arena_key;

struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// Slot storage addressed by generational keys.
pub struct Arena<K, T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    len: usize,
    _key: PhantomData<K>,
}

impl<K: ArenaKey, T> Default for Arena<K, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: ArenaKey, T> Arena<K, T> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            len: 0,
            _key: PhantomData,
        }
    }

    /// Inserts a value built from its own key, for self-referencing records.
    pub fn insert_with(&mut self, build: impl FnOnce(K) -> T) -> K {
        let key = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                K::from_parts(index, slot.generation)
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: 0,
                    value: None,
                });
                K::from_parts(index, 0)
            }
        };
        self.slots[key.index() as usize].value = Some(build(key));
        self.len += 1;
        key
    }

    pub fn insert(&mut self, value: T) -> K {
        self.insert_with(|_| value)
    }

    pub fn get(&self, key: K) -> Option<&T> {
        self.slots
            .get(key.index() as usize)
            .filter(|slot| slot.generation == key.generation())
            .and_then(|slot| slot.value.as_ref())
    }

    pub fn get_mut(&mut self, key: K) -> Option<&mut T> {
        self.slots
            .get_mut(key.index() as usize)
            .filter(|slot| slot.generation == key.generation())
            .and_then(|slot| slot.value.as_mut())
    }

    pub fn contains(&self, key: K) -> bool {
        self.get(key).is_some()
    }

    /// Removes the value and retires the key's generation.
    pub fn remove(&mut self, key: K) -> Option<T> {
        let slot = self.slots.get_mut(key.index() as usize)?;
        if slot.generation != key.generation() {
            return None;
        }
        let value = slot.value.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(key.index());
        self.len -= 1;
        Some(value)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Iterates live values in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (K, &T)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.value
                .as_ref()
                .map(|value| (K::from_parts(index as u32, slot.generation), value))
        })
    }

    pub fn keys(&self) -> impl Iterator<Item = K> + '_ {
        self.iter().map(|(key, _)| key)
    }
}

impl<K: ArenaKey + fmt::Debug, T: fmt::Debug> fmt::Debug for Arena<K, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}
