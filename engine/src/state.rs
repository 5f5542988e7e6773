//! The authoritative game state.
//!
//! One `GameState` per game instance, owned by the orchestrator.
//! Resolvers get snapshots and return diffs; the only global mutable
//! pieces are the RNG seed and the immutable config, both carried here.
//! The canonical digest (SHA3-256 over the bcs encoding) underpins the
//! replay-determinism guarantee: same seed, same commands, same digest.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use ec4x_common::{EngineError, GameConfig, GameRng, HouseId, HullState, ShipId};
use ec4x_galaxy::{Starmap, TransitProfile};
use sha3::{Digest, Sha3_256};

use crate::store::EntityStore;

/// Authoritative state for one game.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GameState {
    pub game_id: u64,
    pub turn: u32,
    pub seed: u64,
    pub config: GameConfig,
    pub map: Starmap,
    pub store: EntityStore,
    /// Winner, once a victory condition fires.
    pub victor: Option<HouseId>,
    /// Active disinformation campaigns: victim → turns remaining.
    pub disinformation: BTreeMap<HouseId, u8>,
}

impl GameState {
    pub fn rng(&self) -> GameRng {
        GameRng::new(self.seed)
    }

    /// Canonical digest of the full state, hex-encoded.
    pub fn digest(&self) -> Result<String, EngineError> {
        let bytes =
            bcs::to_bytes(self).map_err(|e| EngineError::Serialization(e.to_string()))?;
        let mut hasher = Sha3_256::new();
        hasher.update(&bytes);
        Ok(hex::encode(hasher.finalize()))
    }

    /// Whether `house` controls `system` (owns a colony there).
    pub fn controls(&self, house: HouseId, system: ec4x_common::SystemId) -> bool {
        self.store
            .colony_by_system(system)
            .and_then(|id| self.store.colony(id))
            .is_some_and(|c| c.owner == house)
    }

    /// Traversal profile of a fleet, from its current ship states.
    pub fn transit_profile(&self, fleet: ec4x_common::FleetId) -> TransitProfile {
        let mut profile = TransitProfile::default();
        if let Some(fleet) = self.store.fleet(fleet) {
            for ship_id in fleet.ship_ids() {
                if let Some(ship) = self.store.ship(ship_id) {
                    if ship.hull == HullState::Crippled {
                        profile.has_crippled = true;
                    }
                    if ship.class.is_spacelift() {
                        profile.has_spacelift = true;
                    }
                }
            }
        }
        profile
    }

    /// Sum of a fleet's attack strength at its owner's WEP tier,
    /// counting crippled hulls at half.
    pub fn fleet_attack(&self, fleet: ec4x_common::FleetId) -> u32 {
        let Some(fleet) = self.store.fleet(fleet) else {
            return 0;
        };
        let wep = self
            .store
            .house(fleet.owner)
            .map(|h| h.tech.level(ec4x_common::TechField::WEP))
            .unwrap_or(0);
        fleet
            .ship_ids()
            .filter_map(|id| self.store.ship(id))
            .map(|ship| match ship.hull {
                HullState::Undamaged => ship.class.attack_at(wep),
                HullState::Crippled => ship.class.attack_at(wep) / 2,
                HullState::Destroyed => 0,
            })
            .sum()
    }

    /// Marines loaded on a fleet's transports.
    pub fn fleet_loaded_marines(&self, fleet: ec4x_common::FleetId) -> u32 {
        let Some(fleet) = self.store.fleet(fleet) else {
            return 0;
        };
        fleet
            .ship_ids()
            .filter_map(|id| self.store.ship(id))
            .filter_map(|ship| ship.cargo)
            .filter(|cargo| cargo.kind == ec4x_common::CargoKind::Marines)
            .map(|cargo| cargo.quantity)
            .sum()
    }

    /// Ship ids of a fleet's spacelift hulls.
    pub fn fleet_spacelift(&self, fleet: ec4x_common::FleetId) -> Vec<ShipId> {
        let Some(fleet) = self.store.fleet(fleet) else {
            return Vec::new();
        };
        fleet
            .ship_ids()
            .filter(|id| {
                self.store
                    .ship(*id)
                    .is_some_and(|s| s.class.is_spacelift())
            })
            .collect()
    }
}
