//! Typed mutations returned by the conflict resolvers.
//!
//! Resolvers read a snapshot and return effects; the engine owns the
//! entity store and applies them in order. Prestige never mutates here —
//! it rides along as events for the prestige engine.

use serde::{Deserialize, Serialize};

use ec4x_common::{
    ColonyId, CombatReport, EventKind, FleetId, GroundUnitId, HouseId, HullState, IntelReport,
    PrestigeEvent, ShipId, StarbaseId,
};

/// A single state mutation produced by combat.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum CombatEffect {
    /// A squadron's hull state changed; applies to all its ships.
    SquadronState { flagship: ShipId, state: HullState },
    StarbaseState {
        starbase: StarbaseId,
        state: HullState,
    },
    GroundUnitCrippled { unit: GroundUnitId },
    GroundUnitDestroyed { unit: GroundUnitId },
    IndustrialDamage { colony: ColonyId, amount: u32 },
    PopulationLoss { colony: ColonyId, pu: u32 },
    /// Colony changes hands. `facilities_intact` is true for a blitz.
    ColonyCaptured {
        colony: ColonyId,
        by: HouseId,
        facilities_intact: bool,
    },
    /// Fleet leaves the system; the engine routes it home.
    FleetRetreats { fleet: FleetId },
    /// A screened hull lost with its collapsed escort.
    ShipDestroyed { ship: ShipId },
}

/// Everything a resolved battle hands back to the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct CombatOutcome {
    pub effects: Vec<CombatEffect>,
    pub prestige: Vec<PrestigeEvent>,
    pub events: Vec<EventKind>,
    pub report: Option<CombatReport>,
}

/// A single state mutation produced by espionage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum EspionageEffect {
    /// Scouts are consumed by their mission regardless of outcome.
    ScoutConsumed { ship: ShipId, fleet: FleetId },
    SrpStolen {
        from: HouseId,
        to: HouseId,
        amount: u32,
    },
    /// Research pools disrupted by an assassination, percent lost.
    PoolsDisrupted { house: HouseId, percent: u32 },
    IndustrialSabotage { colony: ColonyId, amount: u32 },
    TreasurySkimmed {
        from: HouseId,
        to: HouseId,
        amount: u32,
    },
    /// Counter-intelligence halved by a cyber attack.
    CipHalved { house: HouseId },
    /// Counter-intelligence hardened by a sweep.
    CipHardened { house: HouseId, bonus: u32 },
    /// Ongoing disinformation: the victim's future intel is corrupted.
    DisinformationPlanted {
        against: HouseId,
        by: HouseId,
        turns: u8,
    },
    /// The attacker copies the newest reports from the victim's files.
    IntelStolen {
        from: HouseId,
        to: HouseId,
        reports: u32,
    },
}

/// Everything espionage resolution hands back.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct EspionageOutcome {
    pub effects: Vec<EspionageEffect>,
    pub prestige: Vec<PrestigeEvent>,
    pub events: Vec<EventKind>,
    /// Reports earned by successful missions, addressed per house.
    pub intel: Vec<(HouseId, IntelReport)>,
}
