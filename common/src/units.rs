//! Ship, squadron, and fleet definitions.
//!
//! Defines all ship classes with their base stats, the squadron grouping
//! (flagship + escorts under a command rating), and the fleet aggregate
//! with its standing order, ROE, and movement trail.

use serde::{Deserialize, Serialize};

use crate::ids::{FleetId, HouseId, ShipId, SystemId};
use crate::types::{Cargo, HullState, SquadronBucket};

/// Ship class defining base stats.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum ShipClass {
    /// Electronic-intelligence picket; the only hull that can fly spy
    /// missions.
    Scout = 0,
    Corvette = 1,
    Frigate = 2,
    Destroyer = 3,
    LightCruiser = 4,
    HeavyCruiser = 5,
    Battlecruiser = 6,
    Battleship = 7,
    Dreadnought = 8,
    /// Cloak-capable commerce raider.
    Raider = 9,
    /// Fighter mothership; hangar scales with ACO.
    Carrier = 10,
    /// Colonization transport; lift capacity scales with STL.
    Etac = 11,
    /// Marine lift; capacity scales with STL.
    TroopTransport = 12,
    /// Siege hull whose fire bypasses planetary shields.
    PlanetBreaker = 13,
    /// Colony-owned fighter squadron. Never crippled, only destroyed.
    FighterSquadron = 14,
}

/// Base stats for a ship class. AS/DS are pre-tech values; WEP tiers are
/// applied when a combat snapshot is taken.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ShipStats {
    /// Production cost in PP.
    pub production_cost: u32,
    /// Maintenance, percent of production cost per turn.
    pub maintenance_percent: u32,
    /// Attack strength.
    pub attack: u32,
    /// Defense strength.
    pub defense: u32,
    /// Command cost when serving as an escort.
    pub command_cost: u32,
    /// Command rating when serving as a flagship.
    pub command_rating: u32,
    /// Base lift capacity (ETAC/transport) or hangar slots (carrier).
    pub capacity: u32,
}

impl ShipClass {
    pub fn all() -> &'static [ShipClass] {
        &[
            ShipClass::Scout,
            ShipClass::Corvette,
            ShipClass::Frigate,
            ShipClass::Destroyer,
            ShipClass::LightCruiser,
            ShipClass::HeavyCruiser,
            ShipClass::Battlecruiser,
            ShipClass::Battleship,
            ShipClass::Dreadnought,
            ShipClass::Raider,
            ShipClass::Carrier,
            ShipClass::Etac,
            ShipClass::TroopTransport,
            ShipClass::PlanetBreaker,
            ShipClass::FighterSquadron,
        ]
    }

    /// Get base stats for this ship class.
    pub fn base_stats(&self) -> ShipStats {
        match self {
            ShipClass::Scout => ShipStats {
                production_cost: 15,
                maintenance_percent: 10,
                attack: 1,
                defense: 2,
                command_cost: 1,
                command_rating: 2,
                capacity: 0,
            },
            ShipClass::Corvette => ShipStats {
                production_cost: 20,
                maintenance_percent: 8,
                attack: 2,
                defense: 2,
                command_cost: 1,
                command_rating: 3,
                capacity: 0,
            },
            ShipClass::Frigate => ShipStats {
                production_cost: 30,
                maintenance_percent: 8,
                attack: 3,
                defense: 3,
                command_cost: 1,
                command_rating: 4,
                capacity: 0,
            },
            ShipClass::Destroyer => ShipStats {
                production_cost: 40,
                maintenance_percent: 8,
                attack: 5,
                defense: 4,
                command_cost: 2,
                command_rating: 5,
                capacity: 0,
            },
            ShipClass::LightCruiser => ShipStats {
                production_cost: 60,
                maintenance_percent: 8,
                attack: 7,
                defense: 6,
                command_cost: 2,
                command_rating: 6,
                capacity: 0,
            },
            ShipClass::HeavyCruiser => ShipStats {
                production_cost: 90,
                maintenance_percent: 8,
                attack: 10,
                defense: 8,
                command_cost: 3,
                command_rating: 7,
                capacity: 0,
            },
            ShipClass::Battlecruiser => ShipStats {
                production_cost: 120,
                maintenance_percent: 9,
                attack: 14,
                defense: 10,
                command_cost: 3,
                command_rating: 8,
                capacity: 0,
            },
            ShipClass::Battleship => ShipStats {
                production_cost: 160,
                maintenance_percent: 9,
                attack: 18,
                defense: 14,
                command_cost: 4,
                command_rating: 9,
                capacity: 0,
            },
            ShipClass::Dreadnought => ShipStats {
                production_cost: 220,
                maintenance_percent: 10,
                attack: 24,
                defense: 18,
                command_cost: 5,
                command_rating: 10,
                capacity: 0,
            },
            ShipClass::Raider => ShipStats {
                production_cost: 70,
                maintenance_percent: 10,
                attack: 8,
                defense: 5,
                command_cost: 2,
                command_rating: 6,
                capacity: 0,
            },
            ShipClass::Carrier => ShipStats {
                production_cost: 110,
                maintenance_percent: 9,
                attack: 4,
                defense: 10,
                command_cost: 3,
                command_rating: 7,
                capacity: 2,
            },
            ShipClass::Etac => ShipStats {
                production_cost: 50,
                maintenance_percent: 6,
                attack: 0,
                defense: 3,
                command_cost: 2,
                command_rating: 0,
                capacity: 1,
            },
            ShipClass::TroopTransport => ShipStats {
                production_cost: 45,
                maintenance_percent: 6,
                attack: 0,
                defense: 4,
                command_cost: 2,
                command_rating: 0,
                capacity: 2,
            },
            ShipClass::PlanetBreaker => ShipStats {
                production_cost: 400,
                maintenance_percent: 12,
                attack: 40,
                defense: 20,
                command_cost: 8,
                command_rating: 10,
                capacity: 0,
            },
            ShipClass::FighterSquadron => ShipStats {
                production_cost: 25,
                maintenance_percent: 5,
                attack: 4,
                defense: 2,
                command_cost: 1,
                command_rating: 0,
                capacity: 0,
            },
        }
    }

    /// Attack strength at a given WEP tier.
    pub fn attack_at(&self, wep: u8) -> u32 {
        let base = self.base_stats().attack;
        base + base * u32::from(wep) / 10
    }

    /// Defense strength at a given WEP tier.
    pub fn defense_at(&self, wep: u8) -> u32 {
        let base = self.base_stats().defense;
        base + base * u32::from(wep) / 10
    }

    /// Lift capacity (ETAC/transport, scaled by STL) or hangar slots
    /// (carrier, scaled by ACO).
    pub fn capacity_at(&self, tier: u8) -> u32 {
        self.base_stats().capacity * (1 + u32::from(tier))
    }

    /// Spacelift hulls carry cargo and cannot fight.
    pub fn is_spacelift(&self) -> bool {
        matches!(self, ShipClass::Etac | ShipClass::TroopTransport)
    }

    /// Combat bucket when serving as a squadron flagship.
    pub fn bucket(&self) -> SquadronBucket {
        match self {
            ShipClass::Raider => SquadronBucket::Raider,
            ShipClass::FighterSquadron => SquadronBucket::Fighter,
            _ => {
                if self.base_stats().command_rating >= CAPITAL_COMMAND_RATING {
                    SquadronBucket::Capital
                } else {
                    SquadronBucket::Escort
                }
            }
        }
    }
}

/// Flagship command rating at or above which a squadron counts as capital.
pub const CAPITAL_COMMAND_RATING: u32 = 7;

/// An individual ship instance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Ship {
    pub id: ShipId,
    pub class: ShipClass,
    pub owner: HouseId,
    /// Fleet membership; `None` for colony-held hulls.
    pub fleet: Option<FleetId>,
    pub hull: HullState,
    pub cargo: Option<Cargo>,
}

impl Ship {
    pub fn new(id: ShipId, class: ShipClass, owner: HouseId) -> Self {
        Self {
            id,
            class,
            owner,
            fleet: None,
            hull: HullState::Undamaged,
            cargo: None,
        }
    }

    pub fn is_destroyed(&self) -> bool {
        self.hull == HullState::Destroyed
    }

    pub fn is_crippled(&self) -> bool {
        self.hull == HullState::Crippled
    }
}

/// A squadron: one flagship and the escorts flying under its command
/// rating. Squadrons are value objects owned by their fleet (or colony)
/// and are identified by the flagship's ship id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Squadron {
    pub flagship: ShipId,
    pub escorts: Vec<ShipId>,
}

impl Squadron {
    pub fn solo(flagship: ShipId) -> Self {
        Self {
            flagship,
            escorts: Vec::new(),
        }
    }

    /// Every ship in the squadron, flagship first.
    pub fn ships(&self) -> impl Iterator<Item = ShipId> + '_ {
        std::iter::once(self.flagship).chain(self.escorts.iter().copied())
    }

    pub fn ship_count(&self) -> usize {
        1 + self.escorts.len()
    }
}

/// Standing order a fleet persists between turns.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum StandingOrder {
    #[default]
    Hold,
    /// Remaining waypoints toward a destination.
    Move { path: Vec<SystemId> },
    /// Withdrawing toward the nearest owned colony.
    SeekHome { path: Vec<SystemId> },
    Patrol,
    GuardStarbase,
    GuardColony,
    Blockade,
    /// Half-strength orbital reserve.
    Reserve,
    /// Mothballed: screened in combat, no fire, reduced maintenance.
    Mothball,
    /// Offensive missions held until the Conflict Phase.
    Bombard,
    Invade,
    Blitz,
    /// Espionage missions carried by a single-scout fleet.
    SpyColony { target: SystemId },
    SpySystem { target: SystemId },
    HackStarbase { target: SystemId },
}

impl StandingOrder {
    /// Orders that make a Hostile-stance fleet a valid combat target in
    /// foreign territory.
    pub fn is_provocative(&self) -> bool {
        matches!(
            self,
            StandingOrder::Blockade
                | StandingOrder::Bombard
                | StandingOrder::Invade
                | StandingOrder::Blitz
        )
    }

    /// Orders that make a Neutral-stance fleet a valid combat target in
    /// the controlling house's systems.
    pub fn is_threatening(&self) -> bool {
        self.is_provocative() || matches!(self, StandingOrder::SpyColony { .. })
    }
}

/// A fleet: squadrons under one owner in one system.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Fleet {
    pub id: FleetId,
    pub owner: HouseId,
    pub system: SystemId,
    pub squadrons: Vec<Squadron>,
    pub order: StandingOrder,
    /// Rules of engagement, 0 (fight to the death) to 10 (avoid combat).
    pub roe: u8,
    /// Systems entered this turn, in order.
    pub trail: Vec<SystemId>,
}

impl Fleet {
    pub fn new(id: FleetId, owner: HouseId, system: SystemId) -> Self {
        Self {
            id,
            owner,
            system,
            squadrons: Vec::new(),
            order: StandingOrder::Hold,
            roe: 4,
            trail: Vec::new(),
        }
    }

    /// Every ship id in the fleet.
    pub fn ship_ids(&self) -> impl Iterator<Item = ShipId> + '_ {
        self.squadrons.iter().flat_map(|s| s.ships())
    }

    pub fn is_empty(&self) -> bool {
        self.squadrons.is_empty()
    }

    /// Remove a squadron by flagship id, returning it if present.
    pub fn take_squadron(&mut self, flagship: ShipId) -> Option<Squadron> {
        let idx = self.squadrons.iter().position(|s| s.flagship == flagship)?;
        Some(self.squadrons.remove(idx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capital_threshold_splits_buckets() {
        assert_eq!(ShipClass::Destroyer.bucket(), SquadronBucket::Escort);
        assert_eq!(ShipClass::HeavyCruiser.bucket(), SquadronBucket::Capital);
        assert_eq!(ShipClass::Raider.bucket(), SquadronBucket::Raider);
        assert_eq!(
            ShipClass::FighterSquadron.bucket(),
            SquadronBucket::Fighter
        );
    }

    #[test]
    fn wep_scales_attack() {
        let base = ShipClass::Battleship.base_stats().attack;
        assert_eq!(ShipClass::Battleship.attack_at(0), base);
        assert!(ShipClass::Battleship.attack_at(5) > base);
    }

    #[test]
    fn transports_scale_lift_with_stl() {
        assert_eq!(ShipClass::TroopTransport.capacity_at(0), 2);
        assert_eq!(ShipClass::TroopTransport.capacity_at(2), 6);
    }

    #[test]
    fn squadron_iterates_flagship_first() {
        let sq = Squadron {
            flagship: ShipId(7),
            escorts: vec![ShipId(8), ShipId(9)],
        };
        let ids: Vec<_> = sq.ships().collect();
        assert_eq!(ids, vec![ShipId(7), ShipId(8), ShipId(9)]);
    }
}
