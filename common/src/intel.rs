//! Intelligence reports.
//!
//! Reports are snapshots with a quality tier and a snapshot turn; clients
//! render staleness from the turn. Per-field corruption flags let the
//! fog-of-war projector fuzz individual fields while a disinformation
//! campaign is active against the report's owner.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::ids::{ColonyId, FleetId, HouseId, StarbaseId, SystemId};
use crate::types::PlanetClass;
use crate::units::ShipClass;

/// What a report is about.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IntelSubject {
    Colony(ColonyId),
    System(SystemId),
    Starbase(StarbaseId),
    Fleet(FleetId),
}

/// Report quality, worst to best.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum IntelQuality {
    /// Line-of-sight observation: composition and orders only.
    Visual = 0,
    /// Successful espionage: internals included.
    Spy = 1,
    /// Pre-combat sensor lock: everything.
    Perfect = 2,
}

/// Per-field corruption markers set while disinformation is active.
/// A set flag means the field may have been fuzzed and must be rendered
/// as unreliable.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct CorruptionFlags {
    pub population: bool,
    pub industry: bool,
    pub defenses: bool,
    pub tech: bool,
    pub composition: bool,
}

impl CorruptionFlags {
    pub fn clean() -> Self {
        Self::default()
    }

    pub fn any(&self) -> bool {
        self.population || self.industry || self.defenses || self.tech || self.composition
    }
}

/// Observed colony internals.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ColonyIntel {
    pub owner: Option<HouseId>,
    pub population_units: u32,
    pub industrial_units: u32,
    pub shield_level: u8,
    pub ground_batteries: u32,
    pub armies: u32,
    pub starbases: u32,
    pub planet_class: Option<PlanetClass>,
    /// Only present at Spy quality or better.
    pub tech_sl: Option<u8>,
}

/// Observed fleet composition.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct FleetIntel {
    pub owner: Option<HouseId>,
    pub system: Option<SystemId>,
    /// Hull counts by class.
    pub composition: BTreeMap<ShipClass, u32>,
    pub transports: u32,
    /// Observed order, as far as the watcher can tell.
    pub observed_order: Option<String>,
}

/// Observed system survey.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct SystemIntel {
    pub colonized_by: Option<HouseId>,
    pub fleet_count: u32,
    pub starbases: u32,
}

/// Observed starbase state.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct StarbaseIntel {
    pub owner: Option<HouseId>,
    pub tier: u8,
    pub crippled: bool,
}

/// The payload variants carried by a report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum IntelPayload {
    Colony(ColonyIntel),
    Fleet(FleetIntel),
    System(SystemIntel),
    Starbase(StarbaseIntel),
}

/// A dated intelligence report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IntelReport {
    pub subject: IntelSubject,
    pub quality: IntelQuality,
    pub snapshot_turn: u32,
    pub corruption: CorruptionFlags,
    pub payload: IntelPayload,
}

impl IntelReport {
    pub fn new(
        subject: IntelSubject,
        quality: IntelQuality,
        snapshot_turn: u32,
        payload: IntelPayload,
    ) -> Self {
        Self {
            subject,
            quality,
            snapshot_turn,
            corruption: CorruptionFlags::clean(),
            payload,
        }
    }
}
