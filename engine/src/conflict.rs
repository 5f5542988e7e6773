//! Conflict Phase: espionage first, then combat per system.
//!
//! This module is the bridge between the entity store and the pure
//! resolvers in `ec4x-battle`: it assembles read-only snapshots, runs
//! the resolvers in ascending system order (keeping the RNG stream
//! usage reproducible), and applies the typed effects they return.

use std::collections::{BTreeMap, BTreeSet};

use ec4x_battle::{
    effects::{CombatEffect, EspionageEffect},
    espionage::{CovertIntent, ScoutMission, ScoutObjective, SystemWatch},
    resolve_system_combat,
    snapshot::{
        ColonyDefense, CombatFleet, CombatSquadron, FleetPosture, GroundDefender, GroundMission,
        HouseForce, StarbaseDefender, SystemCombat, TechSnapshot,
    },
    CounterIntel,
};
use ec4x_common::{
    constants, ColonyIntel, EventKind, FleetId, GroundUnitKind, HouseId, HullState, IntelPayload,
    IntelQuality, IntelReport, IntelSubject, ShipClass, StandingOrder, StarbaseIntel, SystemId,
    SystemIntel, TechField,
};
use ec4x_galaxy::nearest_matching;

use crate::economy::prune_empty_fleets;
use crate::state::GameState;
use crate::turn::TurnContext;

/// Run the full Conflict Phase.
pub fn run_conflict(state: &mut GameState, ctx: &mut TurnContext) {
    run_espionage(state, ctx);
    run_combat(state, ctx);
}

// ========== Espionage ==========

fn run_espionage(state: &mut GameState, ctx: &mut TurnContext) {
    let missions = collect_scout_missions(state);
    let covert = std::mem::take(&mut ctx.covert_intents);
    if missions.is_empty() && covert.is_empty() {
        return;
    }
    let watches = build_watches(state, &missions);
    let counter_intel = build_counter_intel(state);
    let rng = state.rng();
    let outcome = ec4x_battle::resolve_espionage(
        ctx.turn,
        missions,
        &watches,
        covert,
        &counter_intel,
        &rng,
    );

    for effect in outcome.effects {
        apply_espionage_effect(state, effect);
    }
    for (house, mut report) in outcome.intel {
        // An active disinformation campaign against the recipient fuzzes
        // what its analysts write down.
        if state.disinformation.get(&house).copied().unwrap_or(0) > 0 {
            report.corruption.population = true;
            report.corruption.industry = true;
            report.corruption.defenses = true;
        }
        if let Some(house) = state.store.house_mut(house) {
            house.record_intel(report);
        }
    }
    for kind in outcome.events {
        route_espionage_event(state, ctx, kind);
    }
    ctx.prestige.extend(outcome.prestige);
}

/// Single-scout fleets on station over their mission target.
fn collect_scout_missions(state: &GameState) -> Vec<ScoutMission> {
    let mut missions = Vec::new();
    for fleet_id in state.store.fleet_ids() {
        let Some(fleet) = state.store.fleet(fleet_id) else {
            continue;
        };
        let (objective, target) = match fleet.order {
            StandingOrder::SpyColony { target } => (ScoutObjective::SpyColony, target),
            StandingOrder::SpySystem { target } => (ScoutObjective::SpySystem, target),
            StandingOrder::HackStarbase { target } => (ScoutObjective::HackStarbase, target),
            _ => continue,
        };
        if fleet.system != target {
            continue; // still in transit
        }
        let ships: Vec<_> = fleet.ship_ids().collect();
        let Some(&scout) = ships.first() else {
            continue;
        };
        let scout_eli = state
            .store
            .house(fleet.owner)
            .map(|h| h.tech.level(TechField::ELI))
            .unwrap_or(0);
        missions.push(ScoutMission {
            house: fleet.owner,
            fleet: fleet_id,
            scout,
            objective,
            target_system: target,
            scout_eli,
        });
    }
    missions
}

/// Defender postures and pre-built success reports per targeted system.
fn build_watches(
    state: &GameState,
    missions: &[ScoutMission],
) -> BTreeMap<SystemId, SystemWatch> {
    let targets: BTreeSet<SystemId> = missions.iter().map(|m| m.target_system).collect();
    let mut watches = BTreeMap::new();
    for system in targets {
        let colony = state
            .store
            .colony_by_system(system)
            .and_then(|id| state.store.colony(id));
        let owner = colony.map(|c| c.owner);
        let mut eli_assets = Vec::new();
        let mut cip = 0;
        if let Some(owner_id) = owner {
            let owner_house = state.store.house(owner_id);
            let eli = owner_house
                .map(|h| h.tech.level(TechField::ELI))
                .unwrap_or(0);
            cip = owner_house.map(|h| h.espionage.cip).unwrap_or(0);
            for fleet_id in state.store.fleets_in_system(system) {
                let Some(fleet) = state.store.fleet(fleet_id) else {
                    continue;
                };
                if fleet.owner == owner_id
                    && fleet.ship_ids().any(|id| {
                        state
                            .store
                            .ship(id)
                            .is_some_and(|s| s.class == ShipClass::Scout)
                    })
                {
                    eli_assets.push(eli);
                }
            }
            if let Some(colony) = colony {
                for sb_id in &colony.starbases {
                    if state
                        .store
                        .starbase(*sb_id)
                        .is_some_and(|sb| sb.is_operational())
                    {
                        eli_assets.push(eli + ec4x_common::Starbase::ELI_BONUS);
                    }
                }
            }
        }

        let colony_report = colony.map(|c| build_colony_report(state, c, IntelQuality::Spy));
        let system_report = Some(build_system_report(state, system));
        let starbase_report = colony.and_then(|c| {
            c.starbases.first().and_then(|id| {
                state.store.starbase(*id).map(|sb| {
                    IntelReport::new(
                        IntelSubject::Starbase(sb.id),
                        IntelQuality::Spy,
                        state.turn,
                        IntelPayload::Starbase(StarbaseIntel {
                            owner,
                            tier: sb.tier,
                            crippled: sb.hull == HullState::Crippled,
                        }),
                    )
                })
            })
        });
        watches.insert(
            system,
            SystemWatch {
                owner,
                eli_assets,
                cip,
                colony_report,
                system_report,
                starbase_report,
            },
        );
    }
    watches
}

pub(crate) fn build_colony_report(
    state: &GameState,
    colony: &ec4x_common::Colony,
    quality: IntelQuality,
) -> IntelReport {
    let owner_house = state.store.house(colony.owner);
    let batteries = colony
        .ground_units
        .iter()
        .filter(|id| {
            state
                .store
                .ground_unit(**id)
                .is_some_and(|g| g.kind == GroundUnitKind::GroundBattery)
        })
        .count() as u32;
    let armies = colony
        .ground_units
        .iter()
        .filter(|id| {
            state
                .store
                .ground_unit(**id)
                .is_some_and(|g| g.kind == GroundUnitKind::Army)
        })
        .count() as u32;
    IntelReport::new(
        IntelSubject::Colony(colony.id),
        quality,
        state.turn,
        IntelPayload::Colony(ColonyIntel {
            owner: Some(colony.owner),
            population_units: colony.pu,
            industrial_units: colony.iu,
            shield_level: colony.shield_level,
            ground_batteries: batteries,
            armies,
            starbases: colony.starbases.len() as u32,
            planet_class: Some(colony.planet_class),
            tech_sl: if quality >= IntelQuality::Spy {
                owner_house.map(|h| h.tech.sl)
            } else {
                None
            },
        }),
    )
}

fn build_system_report(state: &GameState, system: SystemId) -> IntelReport {
    let colony = state
        .store
        .colony_by_system(system)
        .and_then(|id| state.store.colony(id));
    let starbases = colony.map(|c| c.starbases.len() as u32).unwrap_or(0);
    IntelReport::new(
        IntelSubject::System(system),
        IntelQuality::Spy,
        state.turn,
        IntelPayload::System(SystemIntel {
            colonized_by: colony.map(|c| c.owner),
            fleet_count: state.store.fleets_in_system(system).len() as u32,
            starbases,
        }),
    )
}

fn build_counter_intel(state: &GameState) -> BTreeMap<HouseId, CounterIntel> {
    state
        .store
        .houses()
        .map(|h| {
            (
                h.id,
                CounterIntel {
                    cic: h.tech.level(TechField::CIC),
                    cip: h.espionage.cip,
                },
            )
        })
        .collect()
}

fn apply_espionage_effect(state: &mut GameState, effect: EspionageEffect) {
    match effect {
        EspionageEffect::ScoutConsumed { ship, fleet } => {
            let owner = state.store.ship(ship).map(|s| s.owner);
            state.store.destroy_ship(ship);
            if state
                .store
                .fleet(fleet)
                .is_some_and(|f| f.ship_ids().next().is_none())
            {
                state.store.destroy_fleet(fleet);
            }
            if let Some(owner) = owner {
                prune_empty_fleets(state, owner);
            }
        }
        EspionageEffect::SrpStolen { from, to, amount } => {
            let stolen = state
                .store
                .house_mut(from)
                .map(|h| {
                    let stolen = h.tech.pools.srp.min(amount);
                    h.tech.pools.srp -= stolen;
                    stolen
                })
                .unwrap_or(0);
            if let Some(house) = state.store.house_mut(to) {
                house.tech.pools.srp += stolen;
            }
        }
        EspionageEffect::PoolsDisrupted { house, percent } => {
            if let Some(h) = state.store.house_mut(house) {
                h.tech.pools.erp -= h.tech.pools.erp * percent / 100;
                h.tech.pools.srp -= h.tech.pools.srp * percent / 100;
                h.tech.pools.trp -= h.tech.pools.trp * percent / 100;
            }
        }
        EspionageEffect::IndustrialSabotage { colony, amount } => {
            if let Some(c) = state.store.colony_mut(colony) {
                c.iu = c.iu.saturating_sub(amount);
            }
        }
        EspionageEffect::TreasurySkimmed { from, to, amount } => {
            let taken = state
                .store
                .house_mut(from)
                .map(|h| {
                    let taken = h.treasury.min(amount);
                    h.treasury -= taken;
                    taken
                })
                .unwrap_or(0);
            if let Some(house) = state.store.house_mut(to) {
                house.treasury = house.treasury.saturating_add(taken);
            }
        }
        EspionageEffect::CipHalved { house } => {
            if let Some(h) = state.store.house_mut(house) {
                h.espionage.cip /= 2;
            }
        }
        EspionageEffect::CipHardened { house, bonus } => {
            if let Some(h) = state.store.house_mut(house) {
                h.espionage.cip = h.espionage.cip.saturating_add(bonus);
            }
        }
        EspionageEffect::DisinformationPlanted { against, turns, .. } => {
            let entry = state.disinformation.entry(against).or_insert(0);
            *entry = (*entry).max(turns);
        }
        EspionageEffect::IntelStolen { from, to, reports } => {
            let stolen: Vec<IntelReport> = state
                .store
                .house(from)
                .map(|h| {
                    let mut all: Vec<_> = h.intel.values().cloned().collect();
                    all.sort_by_key(|r| std::cmp::Reverse(r.snapshot_turn));
                    all.into_iter().take(reports as usize).collect()
                })
                .unwrap_or_default();
            if let Some(house) = state.store.house_mut(to) {
                for report in stolen {
                    house.record_intel(report);
                }
            }
        }
    }
}

/// Give espionage events their audience.
fn route_espionage_event(state: &GameState, ctx: &mut TurnContext, kind: EventKind) {
    match kind {
        EventKind::EspionageSucceeded { attacker, .. } => ctx.push_house_event(attacker, kind),
        EventKind::EspionageDetected { target, .. } => ctx.push_house_event(target, kind),
        EventKind::ScoutLost { house, .. } => ctx.push_house_event(house, kind),
        EventKind::UnusualActivity { system } => {
            let owner = state
                .store
                .colony_by_system(system)
                .and_then(|id| state.store.colony(id))
                .map(|c| c.owner);
            if let Some(owner) = owner {
                ctx.push_house_event(owner, kind);
            }
        }
        other => ctx.push_public_event(other),
    }
}

// ========== Combat ==========

fn run_combat(state: &mut GameState, ctx: &mut TurnContext) {
    // Stable iteration by system id keeps RNG usage reproducible.
    let mut contested: Vec<SystemId> = Vec::new();
    for system in state.map.systems().map(|s| s.id) {
        let mut houses: BTreeSet<HouseId> = state
            .store
            .fleets_in_system(system)
            .iter()
            .filter_map(|f| state.store.fleet(*f))
            .map(|f| f.owner)
            .collect();
        if let Some(colony) = state
            .store
            .colony_by_system(system)
            .and_then(|id| state.store.colony(id))
        {
            if !houses.is_empty() {
                houses.insert(colony.owner);
            }
        }
        if houses.len() >= 2 {
            contested.push(system);
        }
    }

    for system in contested {
        let snapshot = build_system_combat(state, system, ctx.turn);
        if !ec4x_battle::any_hostility(&snapshot) {
            continue;
        }
        // Combatants get perfect pre-battle intel on each other.
        record_precombat_intel(state, &snapshot);
        let rng = state.rng();
        let outcome = resolve_system_combat(&snapshot, &rng);
        apply_combat_outcome(state, ctx, system, outcome);
    }
}

fn tech_snapshot(state: &GameState, house: HouseId) -> TechSnapshot {
    state
        .store
        .house(house)
        .map(|h| TechSnapshot {
            wep: h.tech.level(TechField::WEP),
            eli: h.tech.level(TechField::ELI),
            clk: h.tech.level(TechField::CLK),
            cmd: h.tech.level(TechField::CMD),
            sld: h.tech.level(TechField::SLD),
        })
        .unwrap_or_default()
}

fn combat_squadron(
    state: &GameState,
    house: HouseId,
    squadron: &ec4x_common::Squadron,
) -> Option<CombatSquadron> {
    let tech = tech_snapshot(state, house);
    let flagship = state.store.ship(squadron.flagship)?;
    let mut attack = 0u32;
    let mut defense = 0u32;
    let mut ships = 0u32;
    let mut state_worst = flagship.hull;
    for ship_id in squadron.ships() {
        let Some(ship) = state.store.ship(ship_id) else {
            continue;
        };
        if ship.hull == HullState::Destroyed {
            continue;
        }
        ships += 1;
        attack += ship.class.attack_at(tech.wep);
        defense += ship.class.defense_at(tech.wep);
        if ship_id == squadron.flagship {
            state_worst = ship.hull;
        }
    }
    if ships == 0 {
        return None;
    }
    Some(CombatSquadron {
        flagship: squadron.flagship,
        house,
        flagship_class: flagship.class,
        bucket: flagship.class.bucket(),
        ships,
        attack,
        defense,
        command_rating: flagship.class.base_stats().command_rating + u32::from(tech.cmd),
        state: state_worst,
    })
}

fn build_system_combat(state: &GameState, system: SystemId, turn: u32) -> SystemCombat {
    let colony_entity = state
        .store
        .colony_by_system(system)
        .and_then(|id| state.store.colony(id));

    // Colony defense block.
    let colony = colony_entity.map(|colony| {
        let mut batteries = Vec::new();
        let mut armies = Vec::new();
        let mut marines = Vec::new();
        for &gid in &colony.ground_units {
            let Some(unit) = state.store.ground_unit(gid) else {
                continue;
            };
            let defender = GroundDefender {
                id: gid,
                kind: unit.kind,
                crippled: unit.crippled,
            };
            match unit.kind {
                GroundUnitKind::GroundBattery => batteries.push(defender),
                GroundUnitKind::Army => armies.push(defender),
                GroundUnitKind::Marine => marines.push(defender),
            }
        }
        let starbases = colony
            .starbases
            .iter()
            .filter_map(|id| state.store.starbase(*id))
            .filter(|sb| sb.hull != HullState::Destroyed)
            .map(|sb| StarbaseDefender {
                id: sb.id,
                attack: sb.attack(),
                defense: sb.defense(),
                state: sb.hull,
            })
            .collect();
        let fighters = colony
            .fighters
            .iter()
            .filter_map(|sq| combat_squadron(state, colony.owner, sq))
            .collect();
        let unassigned = colony
            .unassigned_squadrons
            .iter()
            .filter_map(|sq| combat_squadron(state, colony.owner, sq))
            .collect();
        ColonyDefense {
            id: colony.id,
            owner: colony.owner,
            shield_level: colony.shield_level,
            iu: colony.iu,
            pu: colony.pu,
            batteries,
            armies,
            marines,
            starbases,
            fighters,
            unassigned,
        }
    });

    // Present houses: anyone with fleets, plus the colony owner.
    let mut house_ids: BTreeSet<HouseId> = state
        .store
        .fleets_in_system(system)
        .iter()
        .filter_map(|f| state.store.fleet(*f))
        .map(|f| f.owner)
        .collect();
    if let Some(colony) = &colony {
        house_ids.insert(colony.owner);
    }

    let mut houses = Vec::new();
    for house_id in house_ids.iter().copied() {
        let Some(house) = state.store.house(house_id) else {
            continue;
        };
        let stances = house_ids
            .iter()
            .filter(|other| **other != house_id)
            .map(|other| (*other, house.stance_toward(*other)))
            .collect();
        let mut fleets = Vec::new();
        for fleet_id in state.store.fleets_in_system(system) {
            let Some(fleet) = state.store.fleet(fleet_id) else {
                continue;
            };
            if fleet.owner != house_id {
                continue;
            }
            let posture = match fleet.order {
                StandingOrder::GuardStarbase | StandingOrder::GuardColony => FleetPosture::Guard,
                StandingOrder::Reserve => FleetPosture::Reserve,
                StandingOrder::Mothball => FleetPosture::Mothball,
                _ => FleetPosture::Mobile,
            };
            let mission = match fleet.order {
                StandingOrder::Bombard => Some(GroundMission::Bombard),
                StandingOrder::Invade => Some(GroundMission::Invade),
                StandingOrder::Blitz => Some(GroundMission::Blitz),
                _ => None,
            };
            let squadrons = fleet
                .squadrons
                .iter()
                .filter_map(|sq| combat_squadron(state, house_id, sq))
                .filter(|sq| {
                    !state
                        .store
                        .ship(sq.flagship)
                        .is_some_and(|s| s.class.is_spacelift())
                })
                .collect();
            let has_scout = fleet.ship_ids().any(|id| {
                state
                    .store
                    .ship(id)
                    .is_some_and(|s| s.class == ShipClass::Scout)
            });
            fleets.push(CombatFleet {
                id: fleet_id,
                house: house_id,
                posture,
                provocative: fleet.order.is_provocative(),
                threatening: fleet.order.is_threatening(),
                mission,
                roe: fleet.roe,
                squadrons,
                spacelift: state.fleet_spacelift(fleet_id),
                loaded_marines: state.fleet_loaded_marines(fleet_id),
                has_scout,
            });
        }
        houses.push(HouseForce {
            house: house_id,
            prestige: house.prestige,
            tech: tech_snapshot(state, house_id),
            stances,
            fleets,
            defends_homeworld: house.home_system == system,
        });
    }

    SystemCombat {
        system,
        turn,
        colony,
        houses,
    }
}

/// Perfect pre-combat intel for every combatant about every other.
fn record_precombat_intel(state: &mut GameState, snapshot: &SystemCombat) {
    let mut reports: Vec<(HouseId, IntelReport)> = Vec::new();
    for watcher in &snapshot.houses {
        for watched in &snapshot.houses {
            if watcher.house == watched.house {
                continue;
            }
            for fleet in &watched.fleets {
                let mut composition: BTreeMap<ShipClass, u32> = BTreeMap::new();
                for sq in &fleet.squadrons {
                    *composition.entry(sq.flagship_class).or_default() += sq.ships;
                }
                reports.push((
                    watcher.house,
                    IntelReport::new(
                        IntelSubject::Fleet(fleet.id),
                        IntelQuality::Perfect,
                        snapshot.turn,
                        IntelPayload::Fleet(ec4x_common::FleetIntel {
                            owner: Some(watched.house),
                            system: Some(snapshot.system),
                            composition,
                            transports: fleet.spacelift.len() as u32,
                            observed_order: None,
                        }),
                    ),
                ));
            }
        }
    }
    for (house, report) in reports {
        if let Some(house) = state.store.house_mut(house) {
            house.record_intel(report);
        }
    }
}

fn apply_combat_outcome(
    state: &mut GameState,
    ctx: &mut TurnContext,
    system: SystemId,
    outcome: ec4x_battle::CombatOutcome,
) {
    let mut owners_touched: BTreeSet<HouseId> = BTreeSet::new();

    for effect in &outcome.effects {
        match *effect {
            CombatEffect::SquadronState { flagship, state: new_state } => {
                apply_squadron_state(state, flagship, new_state, &mut owners_touched);
            }
            CombatEffect::StarbaseState { starbase, state: new_state } => {
                if new_state == HullState::Destroyed {
                    let colony = state.store.starbase(starbase).map(|sb| sb.colony);
                    state.store.destroy_starbase(starbase);
                    if let Some(colony) = colony {
                        ctx.push_public_event(EventKind::FacilityDestroyed {
                            colony,
                            kind: ec4x_common::FacilityKind::Starbase,
                        });
                    }
                } else if let Some(sb) = state.store.starbase_mut(starbase) {
                    sb.hull = new_state;
                }
            }
            CombatEffect::GroundUnitCrippled { unit } => {
                if let Some(g) = state.store.ground_unit_mut(unit) {
                    g.crippled = true;
                }
            }
            CombatEffect::GroundUnitDestroyed { unit } => {
                state.store.destroy_ground_unit(unit);
            }
            CombatEffect::IndustrialDamage { colony, amount } => {
                if let Some(c) = state.store.colony_mut(colony) {
                    c.iu = c.iu.saturating_sub(amount);
                }
            }
            CombatEffect::PopulationLoss { colony, pu } => {
                let mut depopulated = false;
                if let Some(c) = state.store.colony_mut(colony) {
                    c.souls = c.souls.saturating_sub(u64::from(pu) * 1_000);
                    c.pu = ec4x_common::pu_from_souls(c.souls);
                    depopulated = c.souls == 0;
                }
                if depopulated {
                    state.store.destroy_colony(colony);
                }
            }
            CombatEffect::ColonyCaptured { colony, by, facilities_intact } => {
                capture_colony(state, colony, by, facilities_intact);
            }
            CombatEffect::FleetRetreats { fleet } => {
                retreat_fleet(state, ctx, fleet, system);
            }
            CombatEffect::ShipDestroyed { ship } => {
                if let Some(s) = state.store.ship(ship) {
                    owners_touched.insert(s.owner);
                }
                state.store.destroy_ship(ship);
            }
        }
    }
    for owner in owners_touched {
        prune_empty_fleets(state, owner);
    }

    ctx.prestige.extend(outcome.prestige.iter().copied());
    let participants: Vec<HouseId> = outcome
        .report
        .as_ref()
        .map(|r| r.participants.clone())
        .unwrap_or_default();
    for kind in outcome.events {
        ctx.push_participant_event(&participants, kind);
    }
    if let Some(report) = outcome.report {
        ctx.combat_reports.push(report);
    }
}

/// Apply a squadron hull transition to every member ship.
fn apply_squadron_state(
    state: &mut GameState,
    flagship: ec4x_common::ShipId,
    new_state: HullState,
    owners_touched: &mut BTreeSet<HouseId>,
) {
    // The squadron may live in a fleet or on a colony (fighters or
    // unassigned hulls).
    let members: Vec<ec4x_common::ShipId> = {
        if let Some(ship) = state.store.ship(flagship) {
            owners_touched.insert(ship.owner);
            if let Some(fleet_id) = ship.fleet {
                state
                    .store
                    .fleet(fleet_id)
                    .and_then(|f| {
                        f.squadrons
                            .iter()
                            .find(|sq| sq.flagship == flagship)
                            .map(|sq| sq.ships().collect())
                    })
                    .unwrap_or_else(|| vec![flagship])
            } else {
                // Colony-held squadron.
                let colony = state
                    .store
                    .colonies()
                    .find(|c| {
                        c.fighters
                            .iter()
                            .chain(c.unassigned_squadrons.iter())
                            .any(|sq| sq.flagship == flagship)
                    })
                    .map(|c| c.id);
                colony
                    .and_then(|cid| state.store.colony(cid))
                    .and_then(|c| {
                        c.fighters
                            .iter()
                            .chain(c.unassigned_squadrons.iter())
                            .find(|sq| sq.flagship == flagship)
                            .map(|sq| sq.ships().collect())
                    })
                    .unwrap_or_else(|| vec![flagship])
            }
        } else {
            return;
        }
    };

    match new_state {
        HullState::Destroyed => {
            // Remove colony-held squadron entries first.
            let colony_ids: Vec<_> = state.store.colonies().map(|c| c.id).collect();
            for cid in colony_ids {
                if let Some(c) = state.store.colony_mut(cid) {
                    c.fighters.retain(|sq| sq.flagship != flagship);
                    c.unassigned_squadrons.retain(|sq| sq.flagship != flagship);
                }
            }
            for ship in members {
                state.store.destroy_ship(ship);
            }
        }
        state_change => {
            for ship in members {
                if let Some(s) = state.store.ship_mut(ship) {
                    s.hull = state_change;
                }
            }
        }
    }
}

fn capture_colony(
    state: &mut GameState,
    colony_id: ec4x_common::ColonyId,
    by: HouseId,
    facilities_intact: bool,
) {
    let Some(colony) = state.store.colony(colony_id) else {
        return;
    };
    let system = colony.system;
    state.store.transfer_colony(colony_id, by);

    if let Some(colony) = state.store.colony_mut(colony_id) {
        if !facilities_intact {
            // Loyalists torch half the industry on the way out, and the
            // shield generators do not survive the landings.
            colony.iu -= colony.iu * constants::INVASION_IU_LOSS_PERCENT / 100;
            colony.shield_level = 0;
        }
        colony.fighters.clear();
        colony.unassigned_squadrons.clear();
        colony.tax_override = None;
        colony.capacity_violation = None;
    }
    // Whatever garrison survived changes allegiance with the ground.
    let unit_ids: Vec<_> = state
        .store
        .colony(colony_id)
        .map(|c| c.ground_units.clone())
        .unwrap_or_default();
    for gid in unit_ids {
        if let Some(unit) = state.store.ground_unit_mut(gid) {
            unit.owner = by;
        }
    }
    land_marines(state, by, system, colony_id);
}

/// The conqueror's marines disembark and become the new garrison.
fn land_marines(
    state: &mut GameState,
    house: HouseId,
    system: SystemId,
    colony_id: ec4x_common::ColonyId,
) {
    let transports: Vec<ec4x_common::ShipId> = state
        .store
        .fleets_in_system(system)
        .iter()
        .filter_map(|f| state.store.fleet(*f))
        .filter(|f| f.owner == house)
        .flat_map(|f| f.ship_ids().collect::<Vec<_>>())
        .filter(|id| {
            state.store.ship(*id).is_some_and(|s| {
                s.cargo
                    .is_some_and(|c| c.kind == ec4x_common::CargoKind::Marines && c.quantity > 0)
            })
        })
        .collect();
    for transport in transports {
        let quantity = state
            .store
            .ship(transport)
            .and_then(|s| s.cargo)
            .map(|c| c.quantity)
            .unwrap_or(0);
        if let Some(ship) = state.store.ship_mut(transport) {
            ship.cargo = None;
        }
        for _ in 0..quantity {
            let gid = ec4x_common::GroundUnitId(state.store.mint.next());
            state.store.add_ground_unit(ec4x_common::GroundUnit::new(
                gid,
                colony_id,
                house,
                GroundUnitKind::Marine,
            ));
            if let Some(colony) = state.store.colony_mut(colony_id) {
                colony.ground_units.push(gid);
            }
        }
    }
}

/// Route a beaten fleet toward the nearest owned system.
fn retreat_fleet(state: &mut GameState, ctx: &mut TurnContext, fleet_id: FleetId, from: SystemId) {
    let Some(fleet) = state.store.fleet(fleet_id) else {
        return;
    };
    let owner = fleet.owner;
    let profile = state.transit_profile(fleet_id);
    let fallback = nearest_matching(&state.map, from, profile, |sys| state.controls(owner, sys));
    match fallback {
        Some((destination, path)) => {
            // One emergency jump toward home; the rest is next turn's
            // problem.
            let first_hop = path.first().copied().unwrap_or(destination);
            state.store.move_fleet(fleet_id, first_hop);
            if let Some(fleet) = state.store.fleet_mut(fleet_id) {
                fleet.order = StandingOrder::SeekHome { path: Vec::new() };
            }
            ctx.push_house_event(
                owner,
                EventKind::FleetRetreated {
                    fleet: fleet_id,
                    from,
                    to: first_hop,
                },
            );
        }
        None => {
            if let Some(fleet) = state.store.fleet_mut(fleet_id) {
                fleet.order = StandingOrder::Hold;
            }
        }
    }
}
