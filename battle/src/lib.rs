//! # EC4X Battle
//!
//! Conflict-phase resolvers: the three-theater combat state machine and
//! the simultaneous espionage pass. Everything here is a pure function
//! over read-only snapshots — the engine assembles inputs from the
//! entity store, the resolvers hand back typed effects and events, and
//! all randomness flows through the shared event-keyed RNG.

pub mod effects;
pub mod espionage;
pub mod hostility;
pub mod planetary;
pub mod resolve;
pub mod snapshot;
pub mod space;
pub mod taskforce;

pub use effects::{CombatEffect, CombatOutcome, EspionageEffect, EspionageOutcome};
pub use espionage::{
    resolve_espionage, CounterIntel, CovertIntent, ScoutMission, ScoutObjective, SystemWatch,
};
pub use hostility::{any_hostility, hostile_pairs, targets, Territory};
pub use resolve::resolve_system_combat;
pub use snapshot::{
    ColonyDefense, CombatFleet, CombatSquadron, FleetPosture, GroundDefender, GroundMission,
    HouseForce, StarbaseDefender, SystemCombat, TechSnapshot,
};
