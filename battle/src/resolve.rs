//! Three-theater battle orchestration for one system.
//!
//! Space → Orbital → Planetary; a later theater runs only if the
//! attacking coalition won the previous one. Damage carries forward
//! between theaters through a hull-state override map, and the final
//! effects are diffed against the snapshot so the engine applies each
//! transition exactly once.

use std::collections::{BTreeMap, BTreeSet};

use ec4x_common::{
    CombatReport, EventKind, FleetId, GameRng, HouseId, HullState, ShipId, StarbaseId,
    Theater, TheaterOutcome, TheaterReport,
};

use crate::effects::{CombatEffect, CombatOutcome};
use crate::hostility::hostile_pairs;
use crate::planetary::run_planetary;
use crate::snapshot::{CombatFleet, SystemCombat};
use crate::space::run_theater;
use crate::taskforce::{detect_raiders, form_task_force, TaskForce, TheaterSlot};

/// Resolve all combat in one system. Returns an empty outcome when no
/// hostile pair is present.
pub fn resolve_system_combat(snapshot: &SystemCombat, rng: &GameRng) -> CombatOutcome {
    let hostile = hostile_pairs(snapshot);
    if hostile.is_empty() {
        return CombatOutcome::default();
    }
    log::info!(
        "combat at system {} with {} houses",
        snapshot.system.0,
        snapshot.houses.len()
    );

    let mut outcome = CombatOutcome::default();
    let mut overrides: BTreeMap<ShipId, (HullState, bool)> = BTreeMap::new();
    let mut retreated: BTreeSet<FleetId> = BTreeSet::new();
    let mut theaters: Vec<TheaterReport> = Vec::new();

    let defender = snapshot.colony.as_ref().map(|c| c.owner);
    let initial_states = initial_states(snapshot);

    // ========== Space ==========

    let mut space_forces = form_forces(snapshot, TheaterSlot::Space, &overrides, &retreated, rng);
    let mut attacker_won = true;
    if !space_forces.is_empty() {
        detect_raiders(snapshot, &mut space_forces, &hostile, rng);
        let run = run_theater(
            snapshot.system,
            snapshot.turn,
            Theater::Space,
            &mut space_forces,
            &hostile,
            rng,
        );
        attacker_won = coalition_won(defender, &run.houses_standing, &hostile);
        absorb_run(
            run,
            Theater::Space,
            attacker_won,
            &mut outcome,
            &mut overrides,
            &mut retreated,
            &mut theaters,
        );
    }

    // ========== Orbital ==========

    if snapshot.colony.is_some() && attacker_won {
        let mut orbital_forces =
            form_forces(snapshot, TheaterSlot::Orbital, &overrides, &retreated, rng);
        if !orbital_forces.is_empty() {
            detect_raiders(snapshot, &mut orbital_forces, &hostile, rng);
            let run = run_theater(
                snapshot.system,
                snapshot.turn,
                Theater::Orbital,
                &mut orbital_forces,
                &hostile,
                rng,
            );
            attacker_won = coalition_won(defender, &run.houses_standing, &hostile);
            absorb_run(
                run,
                Theater::Orbital,
                attacker_won,
                &mut outcome,
                &mut overrides,
                &mut retreated,
                &mut theaters,
            );
        }
    }

    // ========== Planetary ==========

    if let Some(colony) = &snapshot.colony {
        if attacker_won {
            let mut attackers: Vec<(HouseId, CombatFleet)> = Vec::new();
            for force in &snapshot.houses {
                if !hostile.contains(&(force.house, colony.owner)) {
                    continue;
                }
                for fleet in &force.fleets {
                    if fleet.mission.is_none() || retreated.contains(&fleet.id) {
                        continue;
                    }
                    let patched = patch_fleet(fleet, &overrides);
                    let alive = patched
                        .squadrons
                        .iter()
                        .any(|sq| sq.state != HullState::Destroyed)
                        || !patched.spacelift.is_empty();
                    if alive {
                        attackers.push((force.house, patched));
                    }
                }
            }
            if !attackers.is_empty() {
                let borrowed: Vec<(HouseId, &CombatFleet)> =
                    attackers.iter().map(|(h, f)| (*h, f)).collect();
                let run = run_planetary(snapshot.system, snapshot.turn, colony, &borrowed, rng);
                let captured = run.captured;
                let squadrons_hit = run
                    .effects
                    .iter()
                    .filter(|e| matches!(e, CombatEffect::SquadronState { .. }))
                    .count();
                outcome.effects.extend(run.effects);
                outcome.prestige.extend(run.prestige);
                outcome.events.extend(run.events);
                theaters.push(TheaterReport {
                    theater: Theater::Planetary,
                    rounds: 1,
                    outcome: if captured {
                        TheaterOutcome::AttackerVictory
                    } else if squadrons_hit > 0 {
                        TheaterOutcome::DefenderVictory
                    } else {
                        TheaterOutcome::Stalemate
                    },
                    squadrons: Vec::new(),
                    starbases_destroyed: Vec::new(),
                });
            }
        }
    }

    // Diff hull states against the snapshot into apply-once effects.
    for (ship, (state, is_starbase)) in &overrides {
        if initial_states.get(ship) == Some(state) {
            continue;
        }
        if *is_starbase {
            outcome.effects.push(CombatEffect::StarbaseState {
                starbase: StarbaseId(ship.0),
                state: *state,
            });
        } else {
            outcome.effects.push(CombatEffect::SquadronState {
                flagship: *ship,
                state: *state,
            });
        }
    }
    for fleet in &retreated {
        outcome.effects.push(CombatEffect::FleetRetreats { fleet: *fleet });
    }

    let participants: Vec<HouseId> = snapshot.houses.iter().map(|f| f.house).collect();
    outcome.events.push(EventKind::CombatResolved {
        system: snapshot.system,
        participants: participants.clone(),
    });
    outcome.report = Some(CombatReport {
        system: snapshot.system,
        participants,
        theaters,
    });
    outcome
}

/// Snapshot hull state of every squadron and starbase, keyed by id.
fn initial_states(snapshot: &SystemCombat) -> BTreeMap<ShipId, HullState> {
    let mut map = BTreeMap::new();
    for force in &snapshot.houses {
        for fleet in &force.fleets {
            for sq in &fleet.squadrons {
                map.insert(sq.flagship, sq.state);
            }
        }
    }
    if let Some(colony) = &snapshot.colony {
        for sq in colony.fighters.iter().chain(colony.unassigned.iter()) {
            map.insert(sq.flagship, sq.state);
        }
        for sb in &colony.starbases {
            map.insert(ShipId(sb.id.0), sb.state);
        }
    }
    map
}

/// Form the task forces for one theater, with earlier damage applied
/// and retreated fleets excluded.
fn form_forces(
    snapshot: &SystemCombat,
    slot: TheaterSlot,
    overrides: &BTreeMap<ShipId, (HullState, bool)>,
    retreated: &BTreeSet<FleetId>,
    rng: &GameRng,
) -> Vec<TaskForce> {
    let mut forces = Vec::new();
    for house in &snapshot.houses {
        let Some(mut tf) = form_task_force(snapshot, house, slot, rng) else {
            continue;
        };
        for unit in &mut tf.units {
            if let Some((state, _)) = overrides.get(&unit.squadron.flagship) {
                unit.squadron.state = *state;
            }
        }
        tf.units.retain(|u| {
            u.squadron.state != HullState::Destroyed
                && u.fleet.map_or(true, |f| !retreated.contains(&f))
        });
        tf.spacelift.retain(|(f, _)| !retreated.contains(f));
        tf.mothballed.retain(|(f, _)| !retreated.contains(f));
        if tf.units.is_empty() && tf.spacelift.is_empty() && tf.mothballed.is_empty() {
            continue;
        }
        forces.push(tf);
    }
    forces
}

/// A fleet with squadron states patched to their current values.
fn patch_fleet(fleet: &CombatFleet, overrides: &BTreeMap<ShipId, (HullState, bool)>) -> CombatFleet {
    let mut patched = fleet.clone();
    for sq in &mut patched.squadrons {
        if let Some((state, _)) = overrides.get(&sq.flagship) {
            sq.state = *state;
        }
    }
    patched
}

/// Whether the coalition hostile to the defender holds the field.
/// With no colony there is no later theater, so the answer is moot but
/// still well-defined: someone hostile to someone is still standing.
fn coalition_won(
    defender: Option<HouseId>,
    standing: &[HouseId],
    hostile: &BTreeSet<(HouseId, HouseId)>,
) -> bool {
    match defender {
        Some(owner) => standing
            .iter()
            .any(|h| *h != owner && hostile.contains(&(*h, owner))),
        None => !standing.is_empty(),
    }
}

/// Merge a theater run into the accumulated outcome.
#[allow(clippy::too_many_arguments)]
fn absorb_run(
    run: crate::space::TheaterRun,
    theater: Theater,
    attacker_won: bool,
    outcome: &mut CombatOutcome,
    overrides: &mut BTreeMap<ShipId, (HullState, bool)>,
    retreated: &mut BTreeSet<FleetId>,
    theaters: &mut Vec<TheaterReport>,
) {
    for (ship, entry) in &run.final_states {
        overrides.insert(*ship, *entry);
    }
    for ship in &run.screened_losses {
        outcome.effects.push(CombatEffect::ShipDestroyed { ship: *ship });
    }
    retreated.extend(run.retreated_fleets.iter().copied());
    outcome.prestige.extend(run.prestige.iter().copied());
    outcome.events.extend(run.events.iter().cloned());

    let starbases_destroyed: Vec<StarbaseId> = run
        .squadron_results
        .iter()
        .filter(|r| {
            r.bucket == ec4x_common::SquadronBucket::Starbase
                && r.state_after == HullState::Destroyed
        })
        .map(|r| StarbaseId(r.flagship.0))
        .collect();
    let outcome_kind = if run.rounds >= ec4x_common::constants::MAX_COMBAT_ROUNDS {
        TheaterOutcome::Stalemate
    } else if attacker_won {
        TheaterOutcome::AttackerVictory
    } else if run.houses_standing.is_empty() {
        TheaterOutcome::MutualDisengagement
    } else {
        TheaterOutcome::DefenderVictory
    };
    theaters.push(TheaterReport {
        theater,
        rounds: run.rounds,
        outcome: outcome_kind,
        squadrons: run.squadron_results,
        starbases_destroyed,
    });
}
