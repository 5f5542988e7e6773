//! The planetary theater: bombardment, invasion, and blitz.
//!
//! Bombardment flows hits through fixed layers: the shield roll absorbs
//! part of the conventional fire, ground batteries soak up to their
//! defense sum per round, then ground forces, then industry, then
//! population. Planet-Breaker fire bypasses the shield entirely but is
//! tabulated with the same per-squadron CER roll.

use std::collections::BTreeMap;

use ec4x_common::{
    constants, EventKind, GameRng, GroundUnitId, HouseId, HullState, PrestigeEvent,
    PrestigeReason, ShipClass, ShipId, SystemId,
};

use crate::effects::CombatEffect;
use crate::snapshot::{ColonyDefense, CombatFleet, GroundDefender, GroundMission};

/// Hits needed to destroy one IU or one PU once the military layers are
/// gone.
pub const HITS_PER_IU: u32 = 2;
pub const HITS_PER_PU: u32 = 2;

/// What the planetary theater produced.
#[derive(Debug, Clone, Default)]
pub struct PlanetaryRun {
    pub effects: Vec<CombatEffect>,
    pub prestige: Vec<PrestigeEvent>,
    pub events: Vec<EventKind>,
    /// True when the colony fell to an invasion or blitz.
    pub captured: bool,
}

/// Working state of the defender's ground layers.
struct GroundState {
    batteries: Vec<GroundDefender>,
    troops: Vec<GroundDefender>,
    iu_lost: u32,
    pu_lost: u32,
}

impl GroundState {
    fn from_colony(colony: &ColonyDefense) -> Self {
        let mut troops = colony.armies.clone();
        troops.extend(colony.marines.iter().cloned());
        Self {
            batteries: colony.batteries.clone(),
            troops,
            iu_lost: 0,
            pu_lost: 0,
        }
    }

    fn operational_batteries(&self) -> impl Iterator<Item = &GroundDefender> {
        self.batteries.iter()
    }

    fn batteries_alive(&self) -> bool {
        !self.batteries.is_empty()
    }

    fn troops_alive(&self) -> bool {
        !self.troops.is_empty()
    }
}

/// Resolve the planetary missions of every attacking fleet against the
/// colony. Fleets are processed in deterministic (house, fleet) order.
pub fn run_planetary(
    system: SystemId,
    turn: u32,
    colony: &ColonyDefense,
    attackers: &[(HouseId, &CombatFleet)],
    rng: &GameRng,
) -> PlanetaryRun {
    let mut run = PlanetaryRun::default();
    let mut ground = GroundState::from_colony(colony);
    // (scaled strength, landed-by-blitz) per assaulting house.
    let mut marines_landed: BTreeMap<HouseId, (u32, bool)> = BTreeMap::new();

    for &(house, fleet) in attackers {
        let Some(mission) = fleet.mission else {
            continue;
        };
        let rounds = match mission {
            GroundMission::Bombard => constants::MAX_BOMBARDMENT_ROUNDS,
            // Invasion and blitz get one softening round before landing.
            GroundMission::Invade | GroundMission::Blitz => 1,
        };
        for round in 1..=rounds {
            if !bombardment_round(
                system, turn, colony, fleet, house, round, mission, &mut ground, rng, &mut run,
            ) {
                break;
            }
        }

        match mission {
            GroundMission::Bombard => {}
            GroundMission::Invade => {
                if ground.batteries_alive() {
                    // Batteries still firing: no landing this turn.
                    run.events.push(EventKind::InvasionRepelled {
                        colony: colony.id,
                        attacker: house,
                    });
                } else {
                    let marines = fleet.loaded_marines;
                    if marines > 0 {
                        marines_landed.insert(house, (marines * 100, false));
                    }
                }
            }
            GroundMission::Blitz => {
                // Blitz lands whatever survived the battery fire at half
                // strength; transport losses already shrank the count.
                let marines = surviving_marines(fleet, &run);
                if marines > 0 {
                    marines_landed
                        .insert(house, (marines * constants::BLITZ_LANDING_AS_PERCENT, true));
                }
            }
        }
    }

    // Ground combat: landed marines against the remaining garrison.
    for (house, (strength_scaled, blitz)) in marines_landed {
        if run.captured {
            break;
        }
        resolve_ground_assault(
            system,
            turn,
            colony,
            house,
            strength_scaled,
            blitz,
            &mut ground,
            rng,
            &mut run,
        );
    }

    if ground.iu_lost > 0 || ground.pu_lost > 0 {
        run.effects.push(CombatEffect::IndustrialDamage {
            colony: colony.id,
            amount: ground.iu_lost,
        });
        run.effects.push(CombatEffect::PopulationLoss {
            colony: colony.id,
            pu: ground.pu_lost,
        });
        run.events.push(EventKind::ColonyBombarded {
            colony: colony.id,
            iu_destroyed: ground.iu_lost,
            pu_killed: ground.pu_lost,
        });
    }
    run
}

/// One bombardment round for one fleet. Returns false when there is
/// nothing left worth shelling.
#[allow(clippy::too_many_arguments)]
fn bombardment_round(
    system: SystemId,
    turn: u32,
    colony: &ColonyDefense,
    fleet: &CombatFleet,
    house: HouseId,
    round: u8,
    mission: GroundMission,
    ground: &mut GroundState,
    rng: &GameRng,
    run: &mut PlanetaryRun,
) -> bool {
    // One CER roll per squadron; Planet-Breaker and conventional AS are
    // tabulated separately so the shield only applies to the latter.
    let mut pb_hits: u32 = 0;
    let mut conventional_hits: u32 = 0;
    for sq in &fleet.squadrons {
        if sq.state == HullState::Destroyed || sq.effective_attack() == 0 {
            continue;
        }
        let tag = format!("bombard:{}:{}:{}", system.0, round, sq.flagship.0);
        let roll = rng.stream(turn, &tag).d10();
        let cer = constants::space_cer_percent(roll);
        let hits = (sq.effective_attack() * cer).div_ceil(100);
        if sq.flagship_class == ShipClass::PlanetBreaker {
            pb_hits += hits;
        } else {
            conventional_hits += hits;
        }
    }
    if pb_hits == 0 && conventional_hits == 0 {
        return false;
    }

    // Shield roll against the conventional share only.
    if colony.shield_level > 0 && conventional_hits > 0 {
        let tag = format!("shield:{}:{}", system.0, round);
        let roll = rng.stream(turn, &tag).d20();
        if roll >= constants::shield_threshold(colony.shield_level) {
            let blocked =
                conventional_hits * constants::shield_block_percent(colony.shield_level) / 100;
            conventional_hits -= blocked;
        }
    }

    flow_hits_through_layers(system, house, colony, ground, pb_hits + conventional_hits, run);

    // Battery return fire against the orbiting fleet.
    if ground.batteries_alive() {
        battery_return_fire(system, turn, colony, fleet, round, mission, ground, rng, run);
    }
    true
}

/// Flow one round's worth of hits through the colony's defenses:
/// batteries soak at most their defense sum, the spill hits the ground
/// forces, and industry and population burn only once the garrison is
/// gone.
fn flow_hits_through_layers(
    system: SystemId,
    attacker: HouseId,
    colony: &ColonyDefense,
    ground: &mut GroundState,
    mut hits: u32,
    run: &mut PlanetaryRun,
) {
    // Battery layer soaks at most its defense sum per round.
    if ground.batteries_alive() {
        let cap: u32 = ground
            .operational_batteries()
            .map(|b| b.kind.defense())
            .sum();
        let mut budget = hits.min(cap);
        hits -= budget;
        let mut destroyed: Vec<GroundUnitId> = Vec::new();
        for battery in &mut ground.batteries {
            let cripple_cost = battery.kind.defense();
            let destroy_cost = 2 * battery.kind.defense();
            if !battery.crippled {
                if budget < cripple_cost {
                    break;
                }
                budget -= cripple_cost;
                battery.crippled = true;
                run.effects
                    .push(CombatEffect::GroundUnitCrippled { unit: battery.id });
            }
            if budget < destroy_cost {
                break;
            }
            budget -= destroy_cost;
            destroyed.push(battery.id);
        }
        for id in destroyed {
            ground.batteries.retain(|b| b.id != id);
            run.effects.push(CombatEffect::GroundUnitDestroyed { unit: id });
            award_ground_kill(system, attacker, colony.owner, run);
        }
    }

    // Ground forces next.
    hits = flow_into_troops(system, attacker, colony.owner, ground, hits, run);

    // Industry, then population, once the garrison is gone.
    if !ground.troops_alive() && !ground.batteries_alive() {
        let iu_destroyable = (colony.iu - ground.iu_lost).min(hits / HITS_PER_IU);
        ground.iu_lost += iu_destroyable;
        hits -= iu_destroyable * HITS_PER_IU;
        let pu_destroyable = (colony.pu - ground.pu_lost).min(hits / HITS_PER_PU);
        ground.pu_lost += pu_destroyable;
    }
}

/// Damage spills from batteries into armies and marines.
fn flow_into_troops(
    system: SystemId,
    attacker: HouseId,
    defender: HouseId,
    ground: &mut GroundState,
    mut hits: u32,
    run: &mut PlanetaryRun,
) -> u32 {
    let mut destroyed: Vec<GroundUnitId> = Vec::new();
    for troop in &mut ground.troops {
        if hits == 0 {
            break;
        }
        let cripple_cost = troop.kind.defense();
        let destroy_cost = 2 * troop.kind.defense();
        if !troop.crippled {
            if hits < cripple_cost {
                break;
            }
            hits -= cripple_cost;
            troop.crippled = true;
            run.effects
                .push(CombatEffect::GroundUnitCrippled { unit: troop.id });
        }
        if hits < destroy_cost {
            break;
        }
        hits -= destroy_cost;
        destroyed.push(troop.id);
    }
    for id in destroyed {
        ground.troops.retain(|t| t.id != id);
        run.effects.push(CombatEffect::GroundUnitDestroyed { unit: id });
        award_ground_kill(system, attacker, defender, run);
    }
    hits
}

/// Batteries answer with the bombardment table; a critical bypasses
/// destruction protection on the targeted squadron. During a blitz the
/// attacker's transports are valid targets.
#[allow(clippy::too_many_arguments)]
fn battery_return_fire(
    system: SystemId,
    turn: u32,
    colony: &ColonyDefense,
    fleet: &CombatFleet,
    round: u8,
    mission: GroundMission,
    ground: &GroundState,
    rng: &GameRng,
    run: &mut PlanetaryRun,
) {
    let attack: u32 = ground
        .operational_batteries()
        .map(|b| {
            if b.crippled {
                b.kind.attack() / 2
            } else {
                b.kind.attack()
            }
        })
        .sum();
    if attack == 0 {
        return;
    }
    let tag = format!("battery:{}:{}", system.0, round);
    let mut stream = rng.stream(turn, &tag);
    let natural = stream.d10();
    let cer = constants::space_cer_percent(natural);
    let critical = natural == constants::CRITICAL_ROLL;
    let hits = (attack * cer).div_ceil(100);

    // Weighted pick among the bombarding squadrons (and, in a blitz,
    // the loaded transports).
    let mut candidates: Vec<(ShipId, u32, Option<HullState>)> = fleet
        .squadrons
        .iter()
        .filter(|sq| sq.state != HullState::Destroyed)
        .map(|sq| (sq.flagship, sq.defense, Some(sq.state)))
        .collect();
    if mission == GroundMission::Blitz {
        for &ship in &fleet.spacelift {
            candidates.push((ship, ShipClass::TroopTransport.base_stats().defense, None));
        }
    }
    if candidates.is_empty() {
        return;
    }
    let weights: Vec<u64> = candidates.iter().map(|_| 1u64).collect();
    let Some(picked) = stream.pick_weighted(&weights) else {
        return;
    };
    let (target, defense, squadron_state) = candidates[picked];
    if hits < defense && !critical {
        return;
    }
    let Some(current) = squadron_state else {
        run.effects.push(CombatEffect::ShipDestroyed { ship: target });
        return;
    };
    {
        // One reduction step; criticals bypass destruction protection.
        let state = if critical || current == HullState::Crippled {
            HullState::Destroyed
        } else {
            HullState::Crippled
        };
        run.effects.push(CombatEffect::SquadronState {
            flagship: target,
            state,
        });
        if state == HullState::Destroyed {
            run.prestige.push(PrestigeEvent {
                house: colony.owner,
                amount: constants::kill_prestige(ec4x_common::SquadronBucket::Escort),
                reason: PrestigeReason::CombatKill,
                source: Some(system),
            });
            run.prestige.push(PrestigeEvent {
                house: fleet.house,
                amount: -constants::kill_prestige(ec4x_common::SquadronBucket::Escort),
                reason: PrestigeReason::CombatLoss,
                source: Some(system),
            });
        }
    }
}

/// Marines against the garrison with the ground CER table.
#[allow(clippy::too_many_arguments)]
fn resolve_ground_assault(
    system: SystemId,
    turn: u32,
    colony: &ColonyDefense,
    attacker: HouseId,
    attacker_strength_scaled: u32,
    blitz: bool,
    ground: &mut GroundState,
    rng: &GameRng,
    run: &mut PlanetaryRun,
) {
    // `attacker_strength_scaled` is marines × percent (full landings use
    // 100, blitz landings 50).
    let marine_as = ec4x_common::GroundUnitKind::Marine.attack();
    let mut attacker_as = attacker_strength_scaled * marine_as / 100;
    let mut round = 0u8;

    while attacker_as > 0 && ground.troops_alive() && round < constants::MAX_COMBAT_ROUNDS {
        round += 1;
        let atk_roll = rng
            .stream(turn, &format!("ground:{}:{}:atk:{}", system.0, round, attacker.0))
            .d10();
        let atk_hits =
            (attacker_as * constants::ground_cer_percent(atk_roll)).div_ceil(100);
        flow_into_troops(system, attacker, colony.owner, ground, atk_hits, run);

        if !ground.troops_alive() {
            break;
        }
        let def_as: u32 = ground
            .troops
            .iter()
            .map(|t| {
                if t.crippled {
                    t.kind.attack() / 2
                } else {
                    t.kind.attack()
                }
            })
            .sum();
        let def_roll = rng
            .stream(turn, &format!("ground:{}:{}:def", system.0, round))
            .d10();
        let def_hits = (def_as * constants::ground_cer_percent(def_roll)).div_ceil(100);
        // Attacker losses come straight off the landed strength.
        attacker_as = attacker_as.saturating_sub(def_hits);
    }

    if attacker_as > 0 && !ground.troops_alive() {
        run.captured = true;
        run.effects.push(CombatEffect::ColonyCaptured {
            colony: colony.id,
            by: attacker,
            // A blitz takes the ground infrastructure intact; a regular
            // invasion lets the loyalists wreck half the industry.
            facilities_intact: blitz,
        });
        run.prestige.push(PrestigeEvent {
            house: attacker,
            amount: constants::COLONY_CAPTURE_PRESTIGE,
            reason: PrestigeReason::ColonyCaptured,
            source: Some(system),
        });
        run.prestige.push(PrestigeEvent {
            house: colony.owner,
            amount: -constants::COLONY_CAPTURE_PRESTIGE,
            reason: PrestigeReason::ColonyLost,
            source: Some(system),
        });
        run.events.push(EventKind::ColonyCaptured {
            colony: colony.id,
            from: colony.owner,
            to: attacker,
        });
    } else if attacker_as == 0 {
        run.events.push(EventKind::InvasionRepelled {
            colony: colony.id,
            attacker,
        });
    }
}

fn surviving_marines(fleet: &CombatFleet, run: &PlanetaryRun) -> u32 {
    let lost_transports = run
        .effects
        .iter()
        .filter(|e| match e {
            CombatEffect::ShipDestroyed { ship } => fleet.spacelift.contains(ship),
            _ => false,
        })
        .count() as u32;
    let capacity_lost =
        lost_transports * ShipClass::TroopTransport.base_stats().capacity;
    fleet.loaded_marines.saturating_sub(capacity_lost)
}

fn award_ground_kill(
    system: SystemId,
    attacker: HouseId,
    defender: HouseId,
    run: &mut PlanetaryRun,
) {
    run.prestige.push(PrestigeEvent {
        house: attacker,
        amount: 1,
        reason: PrestigeReason::CombatKill,
        source: Some(system),
    });
    run.prestige.push(PrestigeEvent {
        house: defender,
        amount: -1,
        reason: PrestigeReason::CombatLoss,
        source: Some(system),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::{CombatSquadron, FleetPosture};
    use ec4x_common::{ColonyId, FleetId, GroundUnitKind, SquadronBucket};

    fn battery(id: u32) -> GroundDefender {
        GroundDefender {
            id: GroundUnitId(id),
            kind: GroundUnitKind::GroundBattery,
            crippled: false,
        }
    }

    fn army(id: u32) -> GroundDefender {
        GroundDefender {
            id: GroundUnitId(id),
            kind: GroundUnitKind::Army,
            crippled: false,
        }
    }

    /// The published worked example: a CER-6 barrage from AS 100
    /// through an SLD3 shield leaves 49 hits, which destroy one battery
    /// (the layer's 24 DS absorbed), cripple then kill the lone army,
    /// and never reach industry or population.
    #[test]
    fn bombardment_stops_at_the_garrison() {
        let colony = ColonyDefense {
            id: ColonyId(1),
            owner: HouseId(2),
            shield_level: 3,
            iu: 40,
            pu: 100,
            batteries: vec![battery(10), battery(11), battery(12)],
            armies: vec![army(20)],
            marines: Vec::new(),
            starbases: Vec::new(),
            fighters: Vec::new(),
            unassigned: Vec::new(),
        };

        // The table rows the example quotes, through the production
        // arithmetic: 100 AS at CER 6 → 75 hits; the SLD3 shield roll
        // absorbs 35% → 49 conventional hits.
        let cer = constants::space_cer_percent(6);
        assert_eq!(cer, 75);
        let raw = (100u32 * cer).div_ceil(100);
        let blocked = raw * constants::shield_block_percent(colony.shield_level) / 100;
        let hits = raw - blocked;
        assert_eq!(hits, 49);

        let mut ground = GroundState::from_colony(&colony);
        let mut run = PlanetaryRun::default();
        flow_hits_through_layers(
            SystemId(9),
            HouseId(1),
            &colony,
            &mut ground,
            hits,
            &mut run,
        );

        // One battery destroyed at the layer's 24-DS cap, two untouched.
        assert_eq!(ground.batteries.len(), 2);
        assert!(ground.batteries.iter().all(|b| !b.crippled));
        // The spill crippled then killed the army, and nothing flowed
        // past the garrison.
        assert!(!ground.troops_alive());
        assert_eq!(ground.iu_lost, 0, "no industry damage");
        assert_eq!(ground.pu_lost, 0);
        let destroyed = run
            .effects
            .iter()
            .filter(|e| matches!(e, CombatEffect::GroundUnitDestroyed { .. }))
            .count();
        assert_eq!(destroyed, 2, "one battery and the army");
    }

    /// Full pipeline: once the garrison is gone, three rounds from a
    /// heavy squadron level the industry and empty the colony even at
    /// the worst CER rolls.
    #[test]
    fn undefended_colony_burns_under_sustained_bombardment() {
        let colony = ColonyDefense {
            id: ColonyId(1),
            owner: HouseId(2),
            shield_level: 0,
            iu: 40,
            pu: 100,
            batteries: Vec::new(),
            armies: Vec::new(),
            marines: Vec::new(),
            starbases: Vec::new(),
            fighters: Vec::new(),
            unassigned: Vec::new(),
        };
        let fleet = CombatFleet {
            id: FleetId(3),
            house: HouseId(1),
            posture: FleetPosture::Mobile,
            provocative: true,
            threatening: true,
            mission: Some(GroundMission::Bombard),
            roe: 0,
            squadrons: vec![CombatSquadron {
                flagship: ShipId(30),
                house: HouseId(1),
                flagship_class: ShipClass::Battleship,
                bucket: SquadronBucket::Capital,
                ships: 1,
                attack: 400,
                defense: 14,
                command_rating: 9,
                state: HullState::Undamaged,
            }],
            spacelift: Vec::new(),
            loaded_marines: 0,
            has_scout: false,
        };
        let run = run_planetary(
            SystemId(9),
            2,
            &colony,
            &[(HouseId(1), &fleet)],
            &GameRng::new(77),
        );
        // Even at the 25% CER floor each round lands 100 hits, so three
        // rounds always clear 40 IU and 100 PU.
        assert!(run
            .effects
            .iter()
            .any(|e| matches!(e, CombatEffect::IndustrialDamage { amount: 40, .. })));
        assert!(run
            .effects
            .iter()
            .any(|e| matches!(e, CombatEffect::PopulationLoss { pu: 100, .. })));
        assert!(run.events.iter().any(|e| matches!(
            e,
            EventKind::ColonyBombarded {
                iu_destroyed: 40,
                pu_killed: 100,
                ..
            }
        )));
        assert!(!run.captured);
    }

    #[test]
    fn invasion_waits_for_batteries() {
        let colony = ColonyDefense {
            id: ColonyId(1),
            owner: HouseId(2),
            shield_level: 0,
            iu: 10,
            pu: 50,
            batteries: vec![battery(10)],
            armies: Vec::new(),
            marines: Vec::new(),
            starbases: Vec::new(),
            fighters: Vec::new(),
            unassigned: Vec::new(),
        };
        let fleet = CombatFleet {
            id: FleetId(3),
            house: HouseId(1),
            posture: FleetPosture::Mobile,
            provocative: true,
            threatening: true,
            mission: Some(GroundMission::Invade),
            roe: 0,
            squadrons: vec![CombatSquadron {
                flagship: ShipId(30),
                house: HouseId(1),
                flagship_class: ShipClass::Corvette,
                bucket: SquadronBucket::Escort,
                ships: 1,
                attack: 2,
                defense: 2,
                command_rating: 3,
                state: HullState::Undamaged,
            }],
            spacelift: vec![ShipId(31)],
            loaded_marines: 2,
            has_scout: false,
        };
        let run = run_planetary(
            SystemId(9),
            1,
            &colony,
            &[(HouseId(1), &fleet)],
            &GameRng::new(5),
        );
        // A single corvette cannot clear a DS-8 battery in one round, so
        // the landing must be refused.
        assert!(!run.captured);
        assert!(run
            .events
            .iter()
            .any(|e| matches!(e, EventKind::InvasionRepelled { .. })));
    }
}
