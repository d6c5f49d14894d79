//! # Arena — Stable Generational Handles
//!
//! Every registry in the engine (transforms, entities, worlds, components,
//! input controllers) stores its records in an [`Arena`] and hands out small
//! `Copy` keys instead of references. A key is an index paired with a
//! **generation** counter:
//!
//! ```text
//! TransformId { index: 5, generation: 0 }  ← original
//! TransformId { index: 5, generation: 1 }  ← after the slot is recycled
//! ```
//!
//! A stale key still says `generation: 0`, so lookups fail safely instead of
//! aliasing whatever now lives in the recycled slot. Existence checks are O(1).
//!
//! ## Memory Layout
//!
//! ```text
//! slots:     [{g0, Some}, {g1, None}, {g0, Some}]
//! free_list: [1]              ← slots available for reuse
//! ```
//!
//! Inserting pops from `free_list` if available, otherwise grows `slots`.
//! Removing bumps the slot's generation and pushes its index onto `free_list`.

use std::fmt;
use std::marker::PhantomData;

/// Untyped index + generation pair shared by every typed key.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RawHandle {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl RawHandle {
    /// Returns the raw slot index. Useful for diagnostics, not for general use.
    pub fn index(self) -> u32 {
        self.index
    }

    /// Returns the generation. Useful for diagnostics.
    pub fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for RawHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

/// A typed key into an [`Arena`]. Implemented by [`define_handle!`].
pub trait ArenaKey: Copy + Eq + std::hash::Hash {
    fn from_raw(raw: RawHandle) -> Self;
    fn raw(self) -> RawHandle;
}

/// Declare a typed generational key.
///
/// ```ignore
/// define_handle!(
///     /// Key of a transform record.
///     pub struct TransformId;
/// );
/// ```
#[macro_export]
macro_rules! define_handle {
    ($(#[$meta:meta])* $vis:vis struct $name:ident;) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        $vis struct $name($crate::arena::RawHandle);

        impl $crate::arena::ArenaKey for $name {
            fn from_raw(raw: $crate::arena::RawHandle) -> Self {
                Self(raw)
            }

            fn raw(self) -> $crate::arena::RawHandle {
                self.0
            }
        }

        impl $name {
            /// Returns the raw slot index. Useful for diagnostics.
            pub fn index(self) -> u32 {
                self.0.index()
            }

            /// Returns the generation. Useful for diagnostics.
            pub fn generation(self) -> u32 {
                self.0.generation()
            }
        }

        impl ::std::fmt::Debug for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                write!(f, "{}({:?})", stringify!($name), self.0)
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                write!(f, "{:?}", self.0)
            }
        }
    };
}

struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// Generational slot storage keyed by `K`.
pub struct Arena<K: ArenaKey, T> {
    slots: Vec<Slot<T>>,
    /// Indices of removed values, available for reuse.
    free_list: Vec<u32>,
    _key: PhantomData<K>,
}

impl<K: ArenaKey, T> Arena<K, T> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_list: Vec::new(),
            _key: PhantomData,
        }
    }

    /// Store a value and return its key. Reuses a freed slot if one is
    /// available, otherwise grows.
    pub fn insert(&mut self, value: T) -> K {
        if let Some(index) = self.free_list.pop() {
            // Generation was already bumped on removal.
            let slot = &mut self.slots[index as usize];
            slot.value = Some(value);
            K::from_raw(RawHandle {
                index,
                generation: slot.generation,
            })
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                value: Some(value),
            });
            K::from_raw(RawHandle {
                index,
                generation: 0,
            })
        }
    }

    /// Remove and return the value behind `key`, making its slot available for
    /// reuse. Returns `None` if the key is stale.
    pub fn remove(&mut self, key: K) -> Option<T> {
        let raw = key.raw();
        let slot = self.slots.get_mut(raw.index as usize)?;
        if slot.generation != raw.generation || slot.value.is_none() {
            return None;
        }
        // Bump generation so any existing keys become stale.
        slot.generation = slot.generation.wrapping_add(1);
        self.free_list.push(raw.index);
        slot.value.take()
    }

    /// Check if a key still refers to a live value.
    pub fn contains(&self, key: K) -> bool {
        self.get(key).is_some()
    }

    pub fn get(&self, key: K) -> Option<&T> {
        let raw = key.raw();
        let slot = self.slots.get(raw.index as usize)?;
        if slot.generation != raw.generation {
            return None;
        }
        slot.value.as_ref()
    }

    pub fn get_mut(&mut self, key: K) -> Option<&mut T> {
        let raw = key.raw();
        let slot = self.slots.get_mut(raw.index as usize)?;
        if slot.generation != raw.generation {
            return None;
        }
        slot.value.as_mut()
    }

    /// Number of live values.
    pub fn len(&self) -> usize {
        self.slots.len() - self.free_list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate live `(key, value)` pairs in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (K, &T)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.value.as_ref().map(|value| {
                (
                    K::from_raw(RawHandle {
                        index: index as u32,
                        generation: slot.generation,
                    }),
                    value,
                )
            })
        })
    }
}

/// A key for slot `index`, generation 0, without an arena.
#[cfg(test)]
pub(crate) fn test_key<K: ArenaKey>(index: u32) -> K {
    K::from_raw(RawHandle {
        index,
        generation: 0,
    })
}

impl<K: ArenaKey, T> Default for Arena<K, T> {
    fn default() -> Self {
        Self::new()
    }
}
