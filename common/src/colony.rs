//! Colony state and construction/repair projects.

use serde::{Deserialize, Serialize};

use crate::ids::{
    ColonyId, ConstructionProjectId, DrydockId, GroundUnitId, HouseId, RepairProjectId, ShipId,
    ShipyardId, SpaceportId, StarbaseId, SystemId,
};
use crate::ground::{FacilityKind, GroundUnitKind};
use crate::types::{PlanetClass, ResourceRating};
use crate::units::{ShipClass, Squadron};

/// Capacity rule a colony is currently violating.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[repr(u8)]
pub enum CapacityKind {
    FighterSquadrons = 0,
    CapitalSquadrons = 1,
}

/// A standing capacity violation with its grace countdown.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CapacityViolation {
    pub kind: CapacityKind,
    pub grace_turns_left: u8,
    pub excess: u32,
}

/// An in-progress terraform. At most one per colony.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Terraform {
    pub target: PlanetClass,
    pub turns_remaining: u8,
}

/// A colony. Exactly one per colonized system.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Colony {
    pub id: ColonyId,
    pub system: SystemId,
    pub owner: HouseId,
    /// Raw head-count; PTU derive from PU, and PU from souls.
    pub souls: u64,
    /// Population units.
    pub pu: u32,
    /// Industrial units.
    pub iu: u32,
    /// Infrastructure level (colony "Level I" starts at 1).
    pub infrastructure: u8,
    /// Accumulated infrastructure damage, percent.
    pub infrastructure_damage: u8,
    /// Per-colony override of the house tax rate.
    pub tax_override: Option<u8>,
    pub planet_class: PlanetClass,
    pub resources: ResourceRating,
    pub terraform: Option<Terraform>,
    pub construction_queue: Vec<ConstructionProjectId>,
    pub repair_queue: Vec<RepairProjectId>,
    pub spaceports: Vec<SpaceportId>,
    pub shipyards: Vec<ShipyardId>,
    pub drydocks: Vec<DrydockId>,
    pub starbases: Vec<StarbaseId>,
    /// Planetary shield level, 0..=6. At most one shield.
    pub shield_level: u8,
    pub ground_units: Vec<GroundUnitId>,
    /// Newly built hulls awaiting fleet assignment.
    pub unassigned_squadrons: Vec<Squadron>,
    /// Colony-owned fighter squadrons. These defend in the orbital
    /// theater and never retreat.
    pub fighters: Vec<Squadron>,
    pub capacity_violation: Option<CapacityViolation>,
    pub blockaded: bool,
}

impl Colony {
    pub fn new(
        id: ColonyId,
        system: SystemId,
        owner: HouseId,
        planet_class: PlanetClass,
        resources: ResourceRating,
        souls: u64,
    ) -> Self {
        Self {
            id,
            system,
            owner,
            souls,
            pu: pu_from_souls(souls),
            iu: 0,
            infrastructure: 1,
            infrastructure_damage: 0,
            tax_override: None,
            planet_class,
            resources,
            terraform: None,
            construction_queue: Vec::new(),
            repair_queue: Vec::new(),
            spaceports: Vec::new(),
            shipyards: Vec::new(),
            drydocks: Vec::new(),
            starbases: Vec::new(),
            shield_level: 0,
            ground_units: Vec::new(),
            unassigned_squadrons: Vec::new(),
            fighters: Vec::new(),
            capacity_violation: None,
            blockaded: false,
        }
    }

    /// Population transfer units available for lift this turn.
    pub fn ptu(&self) -> u32 {
        self.pu / 10
    }

    /// The tax rate in force here.
    pub fn effective_tax(&self, house_rate: u8) -> u8 {
        self.tax_override.unwrap_or(house_rate)
    }
}

/// One PU per thousand souls, minimum one while anyone is alive.
pub fn pu_from_souls(souls: u64) -> u32 {
    if souls == 0 {
        0
    } else {
        ((souls / 1_000).max(1)).min(u64::from(u32::MAX)) as u32
    }
}

// ========== Projects ==========

/// Which dock a project occupies.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum DockRef {
    Spaceport(SpaceportId),
    Shipyard(ShipyardId),
    Drydock(DrydockId),
    Starbase(StarbaseId),
}

/// What a construction project produces.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum BuildSubject {
    Ship(ShipClass),
    Facility(FacilityKind),
    Ground(GroundUnitKind),
    /// Direct PP → IU investment, applied same-turn.
    IndustrialInvestment(u32),
    /// Planetary shield upgrade to the given level.
    Shield(u8),
    /// Planet-class improvement; gated on TER.
    Terraform(PlanetClass),
}

/// A queued construction project. Paid in full at queue time; the PP are
/// lost if the host facility dies before completion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConstructionProject {
    pub id: ConstructionProjectId,
    pub colony: ColonyId,
    pub subject: BuildSubject,
    pub cost: u32,
    pub turns_remaining: u8,
    pub dock: Option<DockRef>,
}

/// What a repair project restores.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RepairSubject {
    Ship(ShipId),
    Starbase(StarbaseId),
}

/// A queued repair. One turn; 25% of production cost.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RepairProject {
    pub id: RepairProjectId,
    pub colony: ColonyId,
    pub subject: RepairSubject,
    pub cost: u32,
    pub turns_remaining: u8,
    pub dock: Option<DockRef>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pu_derivation_floors_at_one() {
        assert_eq!(pu_from_souls(0), 0);
        assert_eq!(pu_from_souls(500), 1);
        assert_eq!(pu_from_souls(250_000), 250);
    }

    #[test]
    fn tax_override_wins() {
        let mut colony = Colony::new(
            ColonyId(1),
            SystemId(2),
            HouseId(3),
            PlanetClass::Terran,
            ResourceRating::Normal,
            100_000,
        );
        assert_eq!(colony.effective_tax(40), 40);
        colony.tax_override = Some(10);
        assert_eq!(colony.effective_tax(40), 10);
    }
}
