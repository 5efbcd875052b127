//! Entity handles and allocation utilities.
//!
//! An [`Entity`] is a lightweight `u64` handle with no inherent data. Whether
//! an entity "exists" is decided entirely by the storages: it exists while at
//! least one of them holds a value under its handle.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// An opaque entity handle.
///
/// Handles are strictly positive; `0` is reserved for [`Entity::INVALID`],
/// which components such as a tree relation use to mean "no entity".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Entity(pub u64);

impl Entity {
    /// "No entity", e.g. a root's parent.
    pub const INVALID: Entity = Entity(0);

    /// Wrap a raw handle value.
    #[must_use]
    pub const fn from_raw(id: u64) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn id(self) -> u64 {
        self.0
    }

    /// `false` only for [`Entity::INVALID`].
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl Default for Entity {
    fn default() -> Self {
        Self::INVALID
    }
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Entity({})", self.0)
    }
}

impl FromStr for Entity {
    type Err = std::num::ParseIntError;

    /// Parses the bare decimal form used as a scene document key.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<u64>().map(Entity)
    }
}

/// Allocates monotonically increasing entity handles.
///
/// Handles are never recycled: once issued, a value is never handed out again
/// by the same allocator.
#[derive(Debug, Clone)]
pub struct EntityAllocator {
    next_id: u64,
}

impl EntityAllocator {
    /// The first handle issued is 1.
    #[must_use]
    pub fn new() -> Self {
        Self { next_id: 1 }
    }

    /// Allocates a fresh entity handle.
    pub fn allocate(&mut self) -> Entity {
        let id = self.next_id;
        self.next_id += 1;
        Entity(id)
    }

    /// Returns the handle the next call to [`allocate`](Self::allocate) will produce.
    #[must_use]
    pub fn peek(&self) -> Entity {
        Entity(self.next_id)
    }

    /// Makes sure `entity` is never handed out in the future.
    ///
    /// Used when handles arrive from outside the allocator, e.g. when a scene
    /// document is loaded with its literal handles.
    pub fn reserve(&mut self, entity: Entity) {
        if entity.0 >= self.next_id {
            self.next_id = entity.0 + 1;
        }
    }

    /// Highest handle issued or reserved so far.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.next_id - 1
    }
}

impl Default for EntityAllocator {
    fn default() -> Self {
        Self::new()
    }
}
