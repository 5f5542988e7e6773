//! Read-only combat snapshots.
//!
//! The engine assembles one snapshot per contested system; the resolvers
//! never touch the entity store. Everything a theater needs — squadron
//! strengths at current tech, postures, stances, morale inputs — is
//! captured here, and the resolvers hand back typed effects.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use ec4x_common::{
    ColonyId, DiplomaticStance, FleetId, GroundUnitId, GroundUnitKind, HouseId, HullState,
    ShipClass, ShipId, SquadronBucket, StarbaseId, SystemId,
};

/// Tech tiers that matter in combat, sampled at snapshot time.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct TechSnapshot {
    pub wep: u8,
    pub eli: u8,
    pub clk: u8,
    pub cmd: u8,
    pub sld: u8,
}

/// A fleet's combat posture, derived from its standing order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum FleetPosture {
    /// Free-maneuver fleet; fights in the space theater.
    Mobile,
    /// Guarding the starbase or colony; orbital theater only.
    Guard,
    /// Orbital reserve at half strength.
    Reserve,
    /// Screened: no fire, lost if the screen collapses.
    Mothball,
}

/// One squadron as the combat engine sees it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CombatSquadron {
    /// Squadron identity: its flagship's ship id.
    pub flagship: ShipId,
    pub house: HouseId,
    pub flagship_class: ShipClass,
    pub bucket: SquadronBucket,
    /// Hull count, for targeting weights.
    pub ships: u32,
    /// Summed attack strength at current WEP, full hull.
    pub attack: u32,
    /// Summed defense strength at current WEP, full hull.
    pub defense: u32,
    /// Flagship command rating including CMD, for initiative ordering.
    pub command_rating: u32,
    pub state: HullState,
}

impl CombatSquadron {
    /// Attack at the current hull state; crippled squadrons fight at
    /// half strength.
    pub fn effective_attack(&self) -> u32 {
        match self.state {
            HullState::Undamaged => self.attack,
            HullState::Crippled => self.attack / 2,
            HullState::Destroyed => 0,
        }
    }
}

/// One fleet in the snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CombatFleet {
    pub id: FleetId,
    pub house: HouseId,
    pub posture: FleetPosture,
    /// True while the standing order is Blockade/Bombard/Invade/Blitz.
    pub provocative: bool,
    /// True for orders that threaten a neutral host system.
    pub threatening: bool,
    /// Offensive ground mission carried by this fleet, if any.
    pub mission: Option<GroundMission>,
    pub roe: u8,
    pub squadrons: Vec<CombatSquadron>,
    /// Spacelift hulls (screened; no fire).
    pub spacelift: Vec<ShipId>,
    /// Marine divisions loaded on the fleet's transports.
    pub loaded_marines: u32,
    /// Whether the fleet contains a scout (CER bonus, capped at one).
    pub has_scout: bool,
}

/// Planetary-theater mission.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum GroundMission {
    Bombard,
    Invade,
    Blitz,
}

/// One ground unit defending the colony.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GroundDefender {
    pub id: GroundUnitId,
    pub kind: GroundUnitKind,
    pub crippled: bool,
}

/// One starbase defending the colony.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StarbaseDefender {
    pub id: StarbaseId,
    pub attack: u32,
    pub defense: u32,
    pub state: HullState,
}

/// The colony under the battle, if the system is colonized.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ColonyDefense {
    pub id: ColonyId,
    pub owner: HouseId,
    pub shield_level: u8,
    pub iu: u32,
    pub pu: u32,
    pub batteries: Vec<GroundDefender>,
    pub armies: Vec<GroundDefender>,
    pub marines: Vec<GroundDefender>,
    pub starbases: Vec<StarbaseDefender>,
    /// Colony-owned fighter squadrons; orbital theater, never retreat.
    pub fighters: Vec<CombatSquadron>,
    /// Unassigned squadrons defending in orbit.
    pub unassigned: Vec<CombatSquadron>,
}

/// One house's side of the battle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HouseForce {
    pub house: HouseId,
    pub prestige: i64,
    pub tech: TechSnapshot,
    /// Stance toward every other present house.
    pub stances: BTreeMap<HouseId, DiplomaticStance>,
    pub fleets: Vec<CombatFleet>,
    /// Whether this system is the house's homeworld (its defenders never
    /// retreat).
    pub defends_homeworld: bool,
}

/// Everything the combat resolver needs for one system.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SystemCombat {
    pub system: SystemId,
    pub turn: u32,
    pub colony: Option<ColonyDefense>,
    pub houses: Vec<HouseForce>,
}

impl SystemCombat {
    pub fn force(&self, house: HouseId) -> Option<&HouseForce> {
        self.houses.iter().find(|f| f.house == house)
    }
}
