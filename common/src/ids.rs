//! Typed entity identifiers.
//!
//! Every entity kind gets its own opaque id wrapping a `u32`, so the store
//! cannot hand a fleet id to a colony lookup. Ids are minted by a single
//! per-game monotonic counter and are never reused; on the wire each id is
//! a plain unsigned 32-bit integer.

use serde::{Deserialize, Serialize};

macro_rules! entity_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Debug, Clone, Copy, Serialize, Deserialize,
            PartialEq, Eq, PartialOrd, Ord, Hash, Default,
        )]
        #[serde(transparent)]
        pub struct $name(pub u32);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}#{}", stringify!($name), self.0)
            }
        }

        impl From<$name> for u32 {
            fn from(id: $name) -> u32 {
                id.0
            }
        }
    };
}

entity_id!(
    /// Unique identifier for a house (player dynasty)
    HouseId
);
entity_id!(
    /// Unique identifier for a star system (one hex)
    SystemId
);
entity_id!(
    /// Unique identifier for a colony
    ColonyId
);
entity_id!(
    /// Unique identifier for a fleet
    FleetId
);
entity_id!(
    /// Unique identifier for a ship
    ShipId
);
entity_id!(
    /// Unique identifier for a ground unit (army, marine, battery)
    GroundUnitId
);
entity_id!(
    /// Unique identifier for a construction project
    ConstructionProjectId
);
entity_id!(
    /// Unique identifier for a repair project
    RepairProjectId
);
entity_id!(
    /// Unique identifier for a starbase
    StarbaseId
);
entity_id!(
    /// Unique identifier for a spaceport
    SpaceportId
);
entity_id!(
    /// Unique identifier for a shipyard
    ShipyardId
);
entity_id!(
    /// Unique identifier for a drydock
    DrydockId
);

/// Per-game monotonic id generator. One counter for every entity kind, so
/// an id value identifies at most one entity over the whole game history.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct IdMint {
    next_id: u32,
}

impl IdMint {
    pub fn new() -> Self {
        Self { next_id: 1 }
    }

    /// Mint the next raw id value.
    pub fn next(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// The number of ids minted so far.
    pub fn minted(&self) -> u32 {
        self.next_id.saturating_sub(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mint_is_monotonic_and_never_reuses() {
        let mut mint = IdMint::new();
        let a = mint.next();
        let b = mint.next();
        let c = mint.next();
        assert!(a < b && b < c);
        assert_eq!(mint.minted(), 3);
    }

    #[test]
    fn ids_serialize_as_bare_integers() {
        let id = FleetId(42);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "42");
    }
}
