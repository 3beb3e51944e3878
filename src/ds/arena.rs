//! Value arena for the KV engine's trie terminals.
//!
//! Terminal trie nodes refer to their values by [`SlotId`] instead of owning
//! them, so trie nodes stay small and re-setting a key never moves other
//! values. Deleting a key must drop its value immediately and make the slot
//! available to later inserts.
//!
//! Freed slots are chained in place: a vacant slot stores the index of the
//! next vacant slot, so the arena is a single `Vec` with no side table.
//!
//! ## Architecture
//!
//! ```text
//!   slots: [ Occupied(a) | Vacant(→3) | Occupied(c) | Vacant(end) ]
//!                               ▲
//!   free_head ──────────────────┘
//!
//!   insert: pop the chain head if there is one, else push a new slot
//!   remove: drop the value, slot becomes the new chain head
//! ```
//!
//! Insert, remove, and lookup are O(1). `debug_validate_invariants()` is
//! available in debug/test builds and checks the chain covers exactly the
//! vacant slots.

/// Handle to a stored value.
///
/// Valid until the slot is removed; the index behind it may be handed out
/// again by a later `insert`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotId(usize);

impl SlotId {
    /// Returns the underlying slot index.
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug)]
enum Slot<V> {
    Occupied(V),
    /// Freed slot; carries the next link of the reuse chain.
    Vacant { next_free: Option<usize> },
}

/// Slab of values with in-place free-slot chaining.
#[derive(Debug)]
pub struct ValueArena<V> {
    slots: Vec<Slot<V>>,
    /// Most recently freed slot; the head of the reuse chain.
    free_head: Option<usize>,
    live: usize,
}

impl<V> ValueArena<V> {
    /// Creates an empty arena.
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_head: None,
            live: 0,
        }
    }

    /// Stores `value`, reusing the most recently freed slot before growing
    /// the arena.
    pub fn insert(&mut self, value: V) -> SlotId {
        self.live += 1;
        if let Some(idx) = self.free_head {
            if let Slot::Vacant { next_free } = &self.slots[idx] {
                self.free_head = *next_free;
                self.slots[idx] = Slot::Occupied(value);
                return SlotId(idx);
            }
        }
        self.slots.push(Slot::Occupied(value));
        SlotId(self.slots.len() - 1)
    }

    /// Drops the value at `id` and threads the slot onto the reuse chain.
    ///
    /// Returns the removed value, or `None` if the slot was already vacant.
    pub fn remove(&mut self, id: SlotId) -> Option<V> {
        let slot = self.slots.get_mut(id.0)?;
        if matches!(slot, Slot::Vacant { .. }) {
            return None;
        }
        let freed = std::mem::replace(
            slot,
            Slot::Vacant {
                next_free: self.free_head,
            },
        );
        self.free_head = Some(id.0);
        self.live -= 1;
        match freed {
            Slot::Occupied(value) => Some(value),
            // Checked occupied above.
            Slot::Vacant { .. } => None,
        }
    }

    /// Returns the value at `id`, if the slot is occupied.
    pub fn get(&self, id: SlotId) -> Option<&V> {
        match self.slots.get(id.0)? {
            Slot::Occupied(value) => Some(value),
            Slot::Vacant { .. } => None,
        }
    }

    /// Returns a mutable reference to the value at `id`, if occupied.
    pub fn get_mut(&mut self, id: SlotId) -> Option<&mut V> {
        match self.slots.get_mut(id.0)? {
            Slot::Occupied(value) => Some(value),
            Slot::Vacant { .. } => None,
        }
    }

    /// Returns the number of stored values.
    pub fn len(&self) -> usize {
        self.live
    }

    /// Returns `true` if no values are stored.
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    #[cfg(any(test, debug_assertions))]
    pub fn debug_validate_invariants(&self) {
        let occupied = self
            .slots
            .iter()
            .filter(|slot| matches!(slot, Slot::Occupied(_)))
            .count();
        assert_eq!(occupied, self.live, "live count must match occupied slots");

        // The chain visits every vacant slot exactly once and nothing else.
        let mut chained = 0;
        let mut cursor = self.free_head;
        while let Some(idx) = cursor {
            assert!(chained < self.slots.len(), "free chain must be acyclic");
            match &self.slots[idx] {
                Slot::Vacant { next_free } => cursor = *next_free,
                Slot::Occupied(_) => panic!("free chain points at an occupied slot"),
            }
            chained += 1;
        }
        assert_eq!(
            chained + self.live,
            self.slots.len(),
            "every slot must be either live or on the chain"
        );
    }
}

impl<V> Default for ValueArena<V> {
    fn default() -> Self {
        Self::new()
    }
}
