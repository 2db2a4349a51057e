//! Shared value types: identifiers, grid positions and the resource ledger.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};

/// Raw numeric id shared by every entity kind.
pub type EntityId = u64;

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        pub struct $name(pub EntityId);

        impl $name {
            #[doc = concat!("Create a new `", stringify!($name), "`.")]
            #[must_use]
            pub const fn new(id: EntityId) -> Self {
                Self(id)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "#{}"), self.0)
            }
        }
    };
}

entity_id!(
    /// Identifier of a player account that owns planets.
    OwnerId,
    "owner"
);
entity_id!(
    /// Identifier of a planet.
    PlanetId,
    "planet"
);
entity_id!(
    /// Identifier of a settlement on a planet.
    SettlementId,
    "settlement"
);
entity_id!(
    /// Identifier of a building.
    BuildingId,
    "building"
);
entity_id!(
    /// Identifier of an attack unit.
    UnitId,
    "unit"
);
entity_id!(
    /// Identifier of a spaceship.
    ShipId,
    "ship"
);
entity_id!(
    /// Identifier of a warp link between planets.
    LinkId,
    "link"
);
entity_id!(
    /// Identifier of an ongoing attack.
    AttackId,
    "attack"
);

/// Monotonic id source for every entity kind.
///
/// A single counter keeps ids unique across kinds, which makes log lines
/// unambiguous.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdAllocator {
    next: EntityId,
}

impl IdAllocator {
    /// Create an allocator starting at 1.
    #[must_use]
    pub const fn new() -> Self {
        Self { next: 1 }
    }

    /// Hand out the next raw id.
    pub fn next_raw(&mut self) -> EntityId {
        let id = self.next;
        self.next += 1;
        id
    }

    /// Hand out the next id of a specific kind.
    pub fn next<T: From<EntityId>>(&mut self) -> T {
        T::from(self.next_raw())
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

macro_rules! id_from_raw {
    ($($name:ident),*) => {
        $(impl From<EntityId> for $name {
            fn from(id: EntityId) -> Self {
                Self(id)
            }
        })*
    };
}

id_from_raw!(OwnerId, PlanetId, SettlementId, BuildingId, UnitId, ShipId, LinkId, AttackId);

// ============================================================================
// Settlement grid
// ============================================================================

/// Width and height of a settlement grid.
pub const GRID_SIZE: u8 = 5;

/// Slot on a settlement's building grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridPos {
    /// Column.
    pub x: u8,
    /// Row.
    pub y: u8,
}

impl GridPos {
    /// Create a grid position.
    #[must_use]
    pub const fn new(x: u8, y: u8) -> Self {
        Self { x, y }
    }

    /// Whether the position lies inside the grid.
    #[must_use]
    pub const fn in_bounds(self) -> bool {
        self.x < GRID_SIZE && self.y < GRID_SIZE
    }
}

impl fmt::Display for GridPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.x, self.y)
    }
}

// ============================================================================
// Resources
// ============================================================================

/// The two planetary resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResourceKind {
    /// Food; pays for training and upkeep.
    Rations,
    /// Building materials; pays for construction and upgrades.
    Materials,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rations => f.write_str("rations"),
            Self::Materials => f.write_str("building materials"),
        }
    }
}

/// A planet's resource ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Stockpile {
    /// Stored rations.
    pub rations: u64,
    /// Stored building materials.
    pub materials: u64,
}

impl Stockpile {
    /// Create a stockpile with the given amounts.
    #[must_use]
    pub const fn new(rations: u64, materials: u64) -> Self {
        Self { rations, materials }
    }

    /// Amount held of one resource.
    #[must_use]
    pub const fn get(&self, kind: ResourceKind) -> u64 {
        match kind {
            ResourceKind::Rations => self.rations,
            ResourceKind::Materials => self.materials,
        }
    }

    fn slot_mut(&mut self, kind: ResourceKind) -> &mut u64 {
        match kind {
            ResourceKind::Rations => &mut self.rations,
            ResourceKind::Materials => &mut self.materials,
        }
    }

    /// Whether at least `amount` of `kind` is held.
    #[must_use]
    pub const fn can_afford(&self, kind: ResourceKind, amount: u64) -> bool {
        self.get(kind) >= amount
    }

    /// Fail unless at least `amount` of `kind` is held.
    pub fn ensure(&self, kind: ResourceKind, amount: u64) -> Result<()> {
        let available = self.get(kind);
        if available < amount {
            return Err(GameError::InsufficientResources {
                resource: kind,
                required: amount,
                available,
            });
        }
        Ok(())
    }

    /// Remove `amount` of `kind`, or fail leaving the stockpile unchanged.
    pub fn spend(&mut self, kind: ResourceKind, amount: u64) -> Result<()> {
        self.ensure(kind, amount)?;
        *self.slot_mut(kind) -= amount;
        Ok(())
    }

    /// Add `amount` of `kind`.
    pub fn credit(&mut self, kind: ResourceKind, amount: u64) {
        let slot = self.slot_mut(kind);
        *slot = slot.saturating_add(amount);
    }

    /// Set one resource to an exact amount.
    pub fn set(&mut self, kind: ResourceKind, amount: u64) {
        *self.slot_mut(kind) = amount;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spend_insufficient_leaves_state() {
        let mut stock = Stockpile::new(50, 10);
        let err = stock.spend(ResourceKind::Materials, 11).unwrap_err();
        assert_eq!(
            err,
            GameError::InsufficientResources {
                resource: ResourceKind::Materials,
                required: 11,
                available: 10,
            }
        );
        assert_eq!(stock, Stockpile::new(50, 10));
    }

    #[test]
    fn test_spend_and_credit() {
        let mut stock = Stockpile::new(50, 10);
        stock.spend(ResourceKind::Rations, 50).unwrap();
        stock.credit(ResourceKind::Materials, 5);
        assert_eq!(stock, Stockpile::new(0, 15));
    }

    #[test]
    fn test_id_allocator_unique() {
        let mut ids = IdAllocator::new();
        let a: PlanetId = ids.next();
        let b: UnitId = ids.next();
        assert_eq!(a, PlanetId::new(1));
        assert_eq!(b, UnitId::new(2));
    }

    #[test]
    fn test_grid_bounds() {
        assert!(GridPos::new(4, 4).in_bounds());
        assert!(!GridPos::new(5, 0).in_bounds());
        assert!(!GridPos::new(0, 5).in_bounds());
    }

    #[test]
    fn test_id_display() {
        assert_eq!(PlanetId::new(7).to_string(), "planet#7");
    }
}
