//! Ground forces and colony facilities.

use serde::{Deserialize, Serialize};

use crate::ids::{ColonyId, DrydockId, GroundUnitId, HouseId, ShipyardId, SpaceportId, StarbaseId};
use crate::types::HullState;

/// Ground unit kinds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum GroundUnitKind {
    Army = 0,
    Marine = 1,
    GroundBattery = 2,
}

impl GroundUnitKind {
    /// (attack, defense, production cost).
    pub fn stats(&self) -> (u32, u32, u32) {
        match self {
            GroundUnitKind::Army => (4, 8, 20),
            GroundUnitKind::Marine => (6, 6, 30),
            GroundUnitKind::GroundBattery => (6, 8, 25),
        }
    }

    pub fn attack(&self) -> u32 {
        self.stats().0
    }

    pub fn defense(&self) -> u32 {
        self.stats().1
    }

    pub fn production_cost(&self) -> u32 {
        self.stats().2
    }
}

/// A ground unit garrisoned at a colony (or, for marines, loaded on a
/// transport — the transport's cargo tracks the count; the entity here is
/// the garrisoned form).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GroundUnit {
    pub id: GroundUnitId,
    pub colony: ColonyId,
    pub owner: HouseId,
    pub kind: GroundUnitKind,
    pub crippled: bool,
}

impl GroundUnit {
    pub fn new(id: GroundUnitId, colony: ColonyId, owner: HouseId, kind: GroundUnitKind) -> Self {
        Self {
            id,
            colony,
            owner,
            kind,
            crippled: false,
        }
    }

    /// Effective attack; crippled units fight at half strength.
    pub fn effective_attack(&self) -> u32 {
        if self.crippled {
            self.kind.attack() / 2
        } else {
            self.kind.attack()
        }
    }
}

/// Orbital facility kinds buildable at a colony.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FacilityKind {
    Starbase = 0,
    Spaceport = 1,
    Shipyard = 2,
    Drydock = 3,
}

impl FacilityKind {
    pub fn production_cost(&self) -> u32 {
        match self {
            FacilityKind::Starbase => 200,
            FacilityKind::Spaceport => 120,
            FacilityKind::Shipyard => 150,
            FacilityKind::Drydock => 100,
        }
    }

    pub fn build_turns(&self) -> u8 {
        match self {
            FacilityKind::Starbase => 3,
            FacilityKind::Spaceport => 2,
            FacilityKind::Shipyard => 2,
            FacilityKind::Drydock => 1,
        }
    }
}

/// Orbital fortress. Fights in the orbital theater and contributes +2 ELI
/// to raider and scout detection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Starbase {
    pub id: StarbaseId,
    pub colony: ColonyId,
    pub hull: HullState,
    pub tier: u8,
}

impl Starbase {
    /// Detection bonus a starbase adds to the defender's ELI.
    pub const ELI_BONUS: u8 = 2;

    pub fn attack(&self) -> u32 {
        20 + 4 * u32::from(self.tier)
    }

    pub fn defense(&self) -> u32 {
        24 + 4 * u32::from(self.tier)
    }

    pub fn is_operational(&self) -> bool {
        self.hull.is_operational()
    }
}

/// Planet-side ship construction. Builds at double cost.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Spaceport {
    pub id: SpaceportId,
    pub colony: ColonyId,
    pub hull: HullState,
    pub tier: u8,
}

/// Orbital ship construction at list price.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Shipyard {
    pub id: ShipyardId,
    pub colony: ColonyId,
    pub hull: HullState,
    pub tier: u8,
}

/// Ship repair dock.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Drydock {
    pub id: DrydockId,
    pub colony: ColonyId,
    pub hull: HullState,
    pub tier: u8,
}
