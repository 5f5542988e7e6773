//! Core type definitions shared across the EC4X engine.
//!
//! These enums define the fundamental vocabulary of the simulation: planet
//! and lane classes, hull states, diplomatic stances, combat buckets, and
//! the phase names used in events and error reports.

use serde::{Deserialize, Serialize};

/// Star spectral class. Purely descriptive; the economy reads the planet
/// class and resource rating, not the star.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum StarClass {
    O = 0,
    B = 1,
    A = 2,
    F = 3,
    G = 4,
    K = 5,
    M = 6,
}

/// Planet habitability class, from worst to best.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum PlanetClass {
    Extreme = 0,
    Desolate = 1,
    Hostile = 2,
    Harsh = 3,
    Benign = 4,
    Terran = 5,
    Eden = 6,
}

impl PlanetClass {
    pub fn all() -> &'static [PlanetClass] {
        &[
            PlanetClass::Extreme,
            PlanetClass::Desolate,
            PlanetClass::Hostile,
            PlanetClass::Harsh,
            PlanetClass::Benign,
            PlanetClass::Terran,
            PlanetClass::Eden,
        ]
    }

    /// The next class up, if any. Terraforming moves one step at a time.
    pub fn improved(&self) -> Option<PlanetClass> {
        match self {
            PlanetClass::Extreme => Some(PlanetClass::Desolate),
            PlanetClass::Desolate => Some(PlanetClass::Hostile),
            PlanetClass::Hostile => Some(PlanetClass::Harsh),
            PlanetClass::Harsh => Some(PlanetClass::Benign),
            PlanetClass::Benign => Some(PlanetClass::Terran),
            PlanetClass::Terran => Some(PlanetClass::Eden),
            PlanetClass::Eden => None,
        }
    }
}

/// Resource rating of a system's primary world.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum ResourceRating {
    VeryPoor = 0,
    Poor = 1,
    Normal = 2,
    Rich = 3,
    VeryRich = 4,
}

/// Jump lane class. Traversal rules depend on the moving fleet's
/// composition; see the pathfinder.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum LaneClass {
    Major = 0,
    Minor = 1,
    Restricted = 2,
}

/// Hull state of a ship, squadron, facility, or starbase.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum HullState {
    #[default]
    Undamaged = 0,
    Crippled = 1,
    Destroyed = 2,
}

impl HullState {
    pub fn is_operational(&self) -> bool {
        matches!(self, HullState::Undamaged | HullState::Crippled)
    }

    /// One step of battle damage. Fighters skip `Crippled`; the combat
    /// resolver handles that case itself.
    pub fn reduced(&self) -> HullState {
        match self {
            HullState::Undamaged => HullState::Crippled,
            HullState::Crippled | HullState::Destroyed => HullState::Destroyed,
        }
    }
}

/// Diplomatic posture of one house toward another.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum DiplomaticStance {
    #[default]
    Neutral = 0,
    Hostile = 1,
    Enemy = 2,
}

/// What a transport is carrying.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CargoKind {
    Colonists = 0,
    Marines = 1,
    Fighters = 2,
}

/// A loaded cargo hold.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Cargo {
    pub kind: CargoKind,
    pub quantity: u32,
}

/// Combat target bucket, in targeting priority order (lower = picked
/// first when non-empty).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum SquadronBucket {
    Raider = 1,
    Capital = 2,
    Escort = 3,
    Fighter = 4,
    Starbase = 5,
}

impl SquadronBucket {
    /// Base weight used for the weighted random draw inside a bucket.
    pub fn base_weight(&self) -> u64 {
        match self {
            SquadronBucket::Raider => 4,
            SquadronBucket::Capital => 3,
            SquadronBucket::Escort => 2,
            SquadronBucket::Fighter => 1,
            SquadronBucket::Starbase => 1,
        }
    }
}

/// The four phases of a turn, in execution order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TurnPhase {
    Command = 0,
    Production = 1,
    Conflict = 2,
    Income = 3,
}

impl std::fmt::Display for TurnPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TurnPhase::Command => "Command",
            TurnPhase::Production => "Production",
            TurnPhase::Conflict => "Conflict",
            TurnPhase::Income => "Income",
        };
        write!(f, "{name}")
    }
}
