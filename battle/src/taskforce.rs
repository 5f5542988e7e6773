//! Task-force formation, raider detection, and morale.
//!
//! Each theater, every participating house forms one task force from its
//! eligible units. Units are working copies of snapshot squadrons with
//! the per-combat bookkeeping (who crippled what, detection state,
//! morale holds) the round engine needs.

use std::collections::{BTreeMap, BTreeSet};

use ec4x_common::{
    constants, FleetId, GameRng, HouseId, HullState, ShipId, SquadronBucket, SystemId,
};

use crate::snapshot::{CombatSquadron, FleetPosture, HouseForce, SystemCombat};

/// A squadron inside a task force.
#[derive(Debug, Clone)]
pub struct TfUnit {
    pub squadron: CombatSquadron,
    /// Owning fleet; `None` for colony-owned and starbase units.
    pub fleet: Option<FleetId>,
    /// Colony-owned units (fighters, unassigned, starbases) never
    /// retreat.
    pub colony_owned: bool,
    /// Raiders start combat undetected unless a defender's ELI roll
    /// found them at theater entry.
    pub detected: bool,
    /// Round in which the squadron was crippled, for destruction
    /// protection.
    pub crippled_round: Option<u8>,
    pub crippled_by: Option<HouseId>,
    /// Houses that have dealt reducing damage to this squadron.
    pub damaged_by: BTreeSet<HouseId>,
}

impl TfUnit {
    pub fn new(squadron: CombatSquadron, fleet: Option<FleetId>, colony_owned: bool) -> Self {
        let detected = squadron.bucket != SquadronBucket::Raider;
        Self {
            squadron,
            fleet,
            colony_owned,
            detected,
            crippled_round: None,
            crippled_by: None,
            damaged_by: BTreeSet::new(),
        }
    }

    pub fn is_operational(&self) -> bool {
        self.squadron.state != HullState::Destroyed
    }
}

/// Morale state for a house, rolled once per combat.
#[derive(Debug, Clone, Copy, Default)]
pub struct MoraleState {
    pub cer_mod: i32,
    /// One guaranteed critical, consumed by the first qualifying shot.
    pub guaranteed_critical: bool,
    /// A fleet forced to hold fire in the first round.
    pub holding_fleet: Option<FleetId>,
}

/// One house's force in one theater.
#[derive(Debug, Clone)]
pub struct TaskForce {
    pub house: HouseId,
    pub units: Vec<TfUnit>,
    /// ROE per contributing fleet.
    pub fleet_roe: BTreeMap<FleetId, u8>,
    /// Homeworld defenders never retreat.
    pub never_retreat: bool,
    pub has_scout: bool,
    pub morale: MoraleState,
    /// Screened spacelift hulls by fleet; lost if the fleet's fighting
    /// squadrons are wiped out.
    pub spacelift: Vec<(FleetId, ShipId)>,
    /// Screened mothballed squadrons by fleet; same fate.
    pub mothballed: Vec<(FleetId, ShipId)>,
}

impl TaskForce {
    pub fn total_effective_attack(&self) -> u32 {
        self.units
            .iter()
            .filter(|u| u.is_operational())
            .map(|u| u.squadron.effective_attack())
            .sum()
    }

    pub fn has_operational_units(&self) -> bool {
        self.units.iter().any(|u| u.is_operational())
    }
}

/// Roll morale for one house: d20 against the prestige-tier threshold.
/// Non-positive prestige always fails and forces one random fleet to
/// hold fire in the first round.
pub fn roll_morale(
    system: SystemId,
    turn: u32,
    force: &HouseForce,
    eligible_fleets: &[FleetId],
    rng: &GameRng,
) -> MoraleState {
    let tier = constants::morale_tier(force.prestige);
    let mut stream = rng.stream(turn, &format!("morale:{}:{}", system.0, force.house.0));
    if force.prestige <= 0 {
        let holding_fleet = if eligible_fleets.is_empty() {
            None
        } else {
            Some(eligible_fleets[stream.index(eligible_fleets.len())])
        };
        return MoraleState {
            cer_mod: tier.failure_malus,
            guaranteed_critical: false,
            holding_fleet,
        };
    }
    let roll = stream.d20();
    if roll >= tier.threshold {
        MoraleState {
            cer_mod: tier.success_bonus,
            guaranteed_critical: tier.guaranteed_critical,
            holding_fleet: None,
        }
    } else {
        MoraleState {
            cer_mod: tier.failure_malus,
            guaranteed_critical: false,
            holding_fleet: None,
        }
    }
}

/// Which theater a task force is being formed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TheaterSlot {
    Space,
    Orbital,
}

/// Form one house's task force for a theater. Returns `None` when the
/// house contributes nothing there.
pub fn form_task_force(
    snapshot: &SystemCombat,
    force: &HouseForce,
    slot: TheaterSlot,
    rng: &GameRng,
) -> Option<TaskForce> {
    let mut units: Vec<TfUnit> = Vec::new();
    let mut fleet_roe = BTreeMap::new();
    let mut spacelift = Vec::new();
    let mut mothballed = Vec::new();
    let mut has_scout = false;
    let mut eligible_fleets: Vec<FleetId> = Vec::new();

    for fleet in &force.fleets {
        let eligible = match (slot, fleet.posture) {
            (TheaterSlot::Space, FleetPosture::Mobile) => true,
            (TheaterSlot::Orbital, FleetPosture::Guard)
            | (TheaterSlot::Orbital, FleetPosture::Reserve) => true,
            // Attackers carry their surviving mobile fleets into orbit.
            (TheaterSlot::Orbital, FleetPosture::Mobile) => {
                snapshot
                    .colony
                    .as_ref()
                    .is_some_and(|c| c.owner != force.house)
            }
            _ => {
                // Mothballed fleets are screened in the orbital theater.
                if slot == TheaterSlot::Orbital && fleet.posture == FleetPosture::Mothball {
                    for sq in &fleet.squadrons {
                        mothballed.push((fleet.id, sq.flagship));
                    }
                    for &ship in &fleet.spacelift {
                        spacelift.push((fleet.id, ship));
                    }
                }
                false
            }
        };
        if !eligible {
            continue;
        }
        eligible_fleets.push(fleet.id);
        fleet_roe.insert(fleet.id, fleet.roe);
        has_scout |= fleet.has_scout;
        for &ship in &fleet.spacelift {
            spacelift.push((fleet.id, ship));
        }
        for sq in &fleet.squadrons {
            if sq.state == HullState::Destroyed {
                continue;
            }
            let mut sq = sq.clone();
            if fleet.posture == FleetPosture::Reserve {
                sq.attack = sq.attack * constants::RESERVE_STRENGTH_PERCENT / 100;
                sq.defense = sq.defense * constants::RESERVE_STRENGTH_PERCENT / 100;
            }
            units.push(TfUnit::new(sq, Some(fleet.id), false));
        }
    }

    // Colony-owned defenders join the orbital theater.
    if slot == TheaterSlot::Orbital {
        if let Some(colony) = &snapshot.colony {
            if colony.owner == force.house {
                for sq in colony.fighters.iter().chain(colony.unassigned.iter()) {
                    if sq.state != HullState::Destroyed {
                        units.push(TfUnit::new(sq.clone(), None, true));
                    }
                }
                for sb in &colony.starbases {
                    if sb.state == HullState::Destroyed {
                        continue;
                    }
                    let squadron = CombatSquadron {
                        flagship: ShipId(sb.id.0),
                        house: force.house,
                        flagship_class: ec4x_common::ShipClass::Dreadnought,
                        bucket: SquadronBucket::Starbase,
                        ships: 1,
                        attack: sb.attack,
                        defense: sb.defense,
                        command_rating: 10,
                        state: sb.state,
                    };
                    units.push(TfUnit::new(squadron, None, true));
                }
            }
        }
    }

    if units.is_empty() && spacelift.is_empty() && mothballed.is_empty() {
        return None;
    }

    let never_retreat = force.defends_homeworld;
    let morale = roll_morale(snapshot.system, snapshot.turn, force, &eligible_fleets, rng);

    Some(TaskForce {
        house: force.house,
        units,
        fleet_roe,
        never_retreat,
        has_scout,
        morale,
        spacelift,
        mothballed,
    })
}

/// Per-theater raider detection.
///
/// Every cloaked raider squadron is rolled against by each hostile
/// house's ELI assets: one roll per scouting fleet at the house's ELI
/// tier, plus one per operational starbase at ELI + 2. Any success
/// strips the raider's surprise.
pub fn detect_raiders(
    snapshot: &SystemCombat,
    forces: &mut [TaskForce],
    hostile: &BTreeSet<(HouseId, HouseId)>,
    rng: &GameRng,
) {
    // Collect each house's detector tiers up front.
    let mut detectors: BTreeMap<HouseId, Vec<u8>> = BTreeMap::new();
    for force in &snapshot.houses {
        let mut tiers = Vec::new();
        for fleet in &force.fleets {
            if fleet.has_scout {
                tiers.push(force.tech.eli);
            }
        }
        if let Some(colony) = &snapshot.colony {
            if colony.owner == force.house {
                for sb in &colony.starbases {
                    if sb.state.is_operational() {
                        tiers.push(force.tech.eli + ec4x_common::Starbase::ELI_BONUS);
                    }
                }
            }
        }
        detectors.insert(force.house, tiers);
    }

    for tf in forces.iter_mut() {
        let clk = snapshot
            .force(tf.house)
            .map(|f| f.tech.clk)
            .unwrap_or(0);
        for unit in &mut tf.units {
            if unit.squadron.bucket != SquadronBucket::Raider || unit.detected {
                continue;
            }
            'hunt: for (watcher, tiers) in &detectors {
                if !hostile.contains(&(*watcher, tf.house)) {
                    continue;
                }
                for (i, &eli) in tiers.iter().enumerate() {
                    let tag = format!(
                        "detect:{}:{}:{}:{}",
                        snapshot.system.0, unit.squadron.flagship.0, watcher.0, i
                    );
                    let roll = rng.stream(snapshot.turn, &tag).d20();
                    if roll >= constants::detection_threshold(eli, clk) {
                        unit.detected = true;
                        break 'hunt;
                    }
                }
            }
        }
    }
}
