//! The space/orbital round engine.
//!
//! Both orbital-capable theaters share one round loop: initiative
//! phases, CER rolls, bucket targeting with weighted draws, squadron
//! reduction with destruction protection, zero-sum prestige attribution,
//! and ROE-driven retreats between rounds.

use std::collections::{BTreeMap, BTreeSet};

use ec4x_common::{
    constants, EventKind, FleetId, GameRng, HouseId, HullState, PrestigeEvent, PrestigeReason,
    ShipId, SquadronBucket, SquadronResult, SystemId, Theater,
};

use crate::taskforce::{TaskForce, TfUnit};

/// Prestige split among engagers when a task force quits the field.
pub const RETREAT_PRESTIGE: i64 = 2;

/// What one theater resolution produced.
#[derive(Debug, Clone, Default)]
pub struct TheaterRun {
    pub rounds: u8,
    /// Final hull state per squadron id (flagship / starbase id).
    pub final_states: BTreeMap<ShipId, (HullState, bool)>,
    pub prestige: Vec<PrestigeEvent>,
    pub events: Vec<EventKind>,
    pub retreated_fleets: Vec<FleetId>,
    /// Screened hulls destroyed when their escort collapsed.
    pub screened_losses: Vec<ShipId>,
    pub squadron_results: Vec<SquadronResult>,
    /// Houses with operational units when the theater ended.
    pub houses_standing: Vec<HouseId>,
}

/// Address of a unit inside the force list.
type Addr = (usize, usize);

struct Shot {
    firer_house: HouseId,
    target: Addr,
    hits: u32,
    critical: bool,
}

/// Run one theater to completion.
pub fn run_theater(
    system: SystemId,
    turn: u32,
    theater: Theater,
    forces: &mut Vec<TaskForce>,
    hostile: &BTreeSet<(HouseId, HouseId)>,
    rng: &GameRng,
) -> TheaterRun {
    let mut run = TheaterRun::default();
    // Keyed by flagship id: retreats remove units mid-battle, so
    // positional snapshots would drift.
    let initial: BTreeMap<ShipId, HullState> = forces
        .iter()
        .flat_map(|tf| {
            tf.units
                .iter()
                .map(|u| (u.squadron.flagship, u.squadron.state))
        })
        .collect();
    let started_with_units: Vec<BTreeSet<FleetId>> = forces
        .iter()
        .map(|tf| tf.units.iter().filter_map(|u| u.fleet).collect())
        .collect();

    let mut round: u8 = 0;
    loop {
        if !any_hostile_sides(forces, hostile) {
            break;
        }
        if round >= constants::MAX_COMBAT_ROUNDS {
            log::debug!("theater {theater:?} at {system} stalemated after {round} rounds");
            break;
        }
        round += 1;

        fire_round(system, turn, theater, round, forces, hostile, rng, &mut run);

        // Surprise is spent: everyone is detected after the first round.
        for tf in forces.iter_mut() {
            for unit in &mut tf.units {
                unit.detected = true;
            }
        }

        evaluate_retreats(system, forces, hostile, &mut run);
    }
    run.rounds = round;

    // Screened spacelift and mothballed hulls are lost when the fleet
    // that carried them is wiped out (retreating fleets took theirs
    // along).
    for (fi, tf) in forces.iter().enumerate() {
        let tf_defeated = !tf.has_operational_units();
        let mut doomed_fleets: BTreeSet<FleetId> = BTreeSet::new();
        for &fleet in &started_with_units[fi] {
            let wiped = tf
                .units
                .iter()
                .filter(|u| u.fleet == Some(fleet))
                .all(|u| !u.is_operational());
            if wiped && !run.retreated_fleets.contains(&fleet) {
                doomed_fleets.insert(fleet);
            }
        }
        for &(fleet, ship) in tf.spacelift.iter().chain(tf.mothballed.iter()) {
            let escortless = !started_with_units[fi].contains(&fleet);
            if (doomed_fleets.contains(&fleet) || (escortless && tf_defeated))
                && !run.retreated_fleets.contains(&fleet)
            {
                run.screened_losses.push(ship);
            }
        }
    }

    // Report rows and final states.
    for tf in forces.iter() {
        if tf.has_operational_units() {
            run.houses_standing.push(tf.house);
        }
        for unit in &tf.units {
            let starbase = unit.colony_owned && unit.squadron.bucket == SquadronBucket::Starbase;
            run.final_states
                .insert(unit.squadron.flagship, (unit.squadron.state, starbase));
            let changed = initial.get(&unit.squadron.flagship) != Some(&unit.squadron.state);
            if changed {
                run.squadron_results.push(SquadronResult {
                    flagship: unit.squadron.flagship,
                    house: tf.house,
                    bucket: unit.squadron.bucket,
                    state_after: unit.squadron.state,
                });
            }
        }
    }
    run
}

/// One full round of fire in initiative order.
#[allow(clippy::too_many_arguments)]
fn fire_round(
    system: SystemId,
    turn: u32,
    theater: Theater,
    round: u8,
    forces: &mut Vec<TaskForce>,
    hostile: &BTreeSet<(HouseId, HouseId)>,
    rng: &GameRng,
    run: &mut TheaterRun,
) {
    // Initiative groups: undetected raiders, fighters, detected raiders,
    // then everyone else by descending command rating (ties fire
    // simultaneously within a group).
    let mut groups: Vec<Vec<Addr>> = Vec::new();
    groups.push(collect_units(forces, |u| {
        u.squadron.bucket == SquadronBucket::Raider && !u.detected
    }));
    groups.push(collect_units(forces, |u| {
        u.squadron.bucket == SquadronBucket::Fighter
    }));
    groups.push(collect_units(forces, |u| {
        u.squadron.bucket == SquadronBucket::Raider && u.detected
    }));
    let mut ratings: Vec<u32> = Vec::new();
    for tf in forces.iter() {
        for unit in &tf.units {
            if matches!(
                unit.squadron.bucket,
                SquadronBucket::Capital | SquadronBucket::Escort | SquadronBucket::Starbase
            ) {
                ratings.push(unit.squadron.command_rating);
            }
        }
    }
    ratings.sort_unstable_by(|a, b| b.cmp(a));
    ratings.dedup();
    for cr in ratings {
        groups.push(collect_units(forces, move |u| {
            u.squadron.command_rating == cr
                && matches!(
                    u.squadron.bucket,
                    SquadronBucket::Capital | SquadronBucket::Escort | SquadronBucket::Starbase
                )
        }));
    }

    for group in groups {
        let mut shots: Vec<Shot> = Vec::new();
        for (fi, ui) in group {
            let Some(shot) = aim(system, turn, theater, round, forces, hostile, rng, (fi, ui))
            else {
                continue;
            };
            shots.push(shot);
        }
        for shot in shots {
            resolve_shot(system, forces, hostile, shot, round, run);
        }
    }
}

fn collect_units(forces: &[TaskForce], pred: impl Fn(&TfUnit) -> bool) -> Vec<Addr> {
    let mut out = Vec::new();
    for (fi, tf) in forces.iter().enumerate() {
        for (ui, unit) in tf.units.iter().enumerate() {
            if unit.is_operational() && pred(unit) {
                out.push((fi, ui));
            }
        }
    }
    out
}

/// Roll CER and pick a target for one firing squadron.
#[allow(clippy::too_many_arguments)]
fn aim(
    system: SystemId,
    turn: u32,
    theater: Theater,
    round: u8,
    forces: &mut Vec<TaskForce>,
    hostile: &BTreeSet<(HouseId, HouseId)>,
    rng: &GameRng,
    addr: Addr,
) -> Option<Shot> {
    let (fi, ui) = addr;
    let firer_house = forces[fi].house;
    let holding = round == 1 && forces[fi].morale.holding_fleet.is_some_and(|held| {
        forces[fi].units[ui].fleet == Some(held)
    });
    if holding {
        return None;
    }
    let attack = forces[fi].units[ui].squadron.effective_attack();
    if attack == 0 {
        return None;
    }

    let flagship = forces[fi].units[ui].squadron.flagship;
    let bucket = forces[fi].units[ui].squadron.bucket;
    let tag = format!(
        "combat:{}:{}:{}:{}",
        system.0, theater as u8, round, flagship.0
    );
    let mut stream = rng.stream(turn, &tag);

    let (cer_percent, mut critical) = if bucket == SquadronBucket::Fighter {
        // Fighters apply full attack with no roll.
        (100, false)
    } else {
        let natural = stream.d10();
        let mut modifier = forces[fi].morale.cer_mod;
        if forces[fi].has_scout {
            modifier += constants::SCOUT_CER_BONUS;
        }
        if round == 1 && bucket == SquadronBucket::Raider && !forces[fi].units[ui].detected {
            modifier += constants::RAIDER_SURPRISE_BONUS;
        }
        let shifted = (i32::from(natural) + modifier).clamp(0, 9) as u8;
        (constants::space_cer_percent(shifted), natural == constants::CRITICAL_ROLL)
    };
    if !critical && bucket != SquadronBucket::Fighter && forces[fi].morale.guaranteed_critical {
        forces[fi].morale.guaranteed_critical = false;
        critical = true;
    }

    // Targeting: first non-empty bucket by priority; fighters prefer
    // enemy fighters before anything else.
    let mut order = vec![
        SquadronBucket::Raider,
        SquadronBucket::Capital,
        SquadronBucket::Escort,
        SquadronBucket::Fighter,
        SquadronBucket::Starbase,
    ];
    if bucket == SquadronBucket::Fighter {
        order.retain(|b| *b != SquadronBucket::Fighter);
        order.insert(0, SquadronBucket::Fighter);
    }

    let mut candidates: Vec<Addr> = Vec::new();
    for wanted in order {
        for (ti, tf) in forces.iter().enumerate() {
            if !hostile.contains(&(firer_house, tf.house)) {
                continue;
            }
            for (tu, unit) in tf.units.iter().enumerate() {
                let hidden = unit.squadron.bucket == SquadronBucket::Raider && !unit.detected;
                if unit.is_operational() && !hidden && unit.squadron.bucket == wanted {
                    candidates.push((ti, tu));
                }
            }
        }
        if !candidates.is_empty() {
            break;
        }
    }
    if candidates.is_empty() {
        return None;
    }

    let weights: Vec<u64> = candidates
        .iter()
        .map(|&(ti, tu)| {
            let unit = &forces[ti].units[tu];
            let crippled = if unit.squadron.state == HullState::Crippled {
                2
            } else {
                1
            };
            unit.squadron.bucket.base_weight() * u64::from(unit.squadron.ships) * crippled
        })
        .collect();
    let picked = stream.pick_weighted(&weights)?;
    let target = candidates[picked];

    let hits = (attack * cer_percent).div_ceil(100);
    Some(Shot {
        firer_house,
        target,
        hits,
        critical,
    })
}

/// Apply one shot, honoring destruction protection and the critical-hit
/// fallback onto the lowest-DS hostile squadron.
fn resolve_shot(
    system: SystemId,
    forces: &mut Vec<TaskForce>,
    hostile: &BTreeSet<(HouseId, HouseId)>,
    shot: Shot,
    round: u8,
    run: &mut TheaterRun,
) {
    let mut target = shot.target;
    let reduced = reduce_unit(forces, target, &shot, round, run, system);
    if !reduced && shot.critical {
        // Critical that failed to reduce its pick reduces the weakest
        // hostile squadron instead.
        let mut weakest: Option<(Addr, u32)> = None;
        for (ti, tf) in forces.iter().enumerate() {
            if !hostile.contains(&(shot.firer_house, tf.house)) {
                continue;
            }
            for (tu, unit) in tf.units.iter().enumerate() {
                let hidden = unit.squadron.bucket == SquadronBucket::Raider && !unit.detected;
                if !unit.is_operational() || hidden {
                    continue;
                }
                let ds = unit.squadron.defense;
                if weakest.map_or(true, |(_, best)| ds < best) {
                    weakest = Some(((ti, tu), ds));
                }
            }
        }
        if let Some((addr, _)) = weakest {
            target = addr;
            let forced = Shot {
                hits: u32::MAX,
                ..shot
            };
            reduce_unit(forces, target, &forced, round, run, system);
        }
    }
}

/// One reduction step against a unit. Returns whether the unit's state
/// changed.
fn reduce_unit(
    forces: &mut Vec<TaskForce>,
    addr: Addr,
    shot: &Shot,
    round: u8,
    run: &mut TheaterRun,
    system: SystemId,
) -> bool {
    let (ti, ui) = addr;
    let victim_house = forces[ti].house;
    let unit = &mut forces[ti].units[ui];
    if !unit.is_operational() {
        return false;
    }
    if shot.hits < unit.squadron.defense {
        return false;
    }

    match unit.squadron.state {
        HullState::Undamaged => {
            if unit.squadron.bucket == SquadronBucket::Fighter {
                // Fighters skip Crippled.
                unit.squadron.state = HullState::Destroyed;
                unit.damaged_by.insert(shot.firer_house);
                finish_kill(forces, addr, shot.firer_house, victim_house, run, system);
            } else {
                unit.squadron.state = HullState::Crippled;
                unit.crippled_round = Some(round);
                unit.crippled_by = Some(shot.firer_house);
                unit.damaged_by.insert(shot.firer_house);
            }
            true
        }
        HullState::Crippled => {
            let protected = unit.crippled_round == Some(round) && !shot.critical;
            if protected {
                // Overkill beyond crippling is lost this round.
                return false;
            }
            unit.squadron.state = HullState::Destroyed;
            unit.damaged_by.insert(shot.firer_house);
            finish_kill(forces, addr, shot.firer_house, victim_house, run, system);
            true
        }
        HullState::Destroyed => false,
    }
}

/// Attribute zero-sum prestige for a destroyed squadron.
fn finish_kill(
    forces: &mut Vec<TaskForce>,
    addr: Addr,
    killer: HouseId,
    victim: HouseId,
    run: &mut TheaterRun,
    system: SystemId,
) {
    let (ti, ui) = addr;
    let unit = &forces[ti].units[ui];
    let bucket = unit.squadron.bucket;
    let flagship = unit.squadron.flagship;
    let base = constants::kill_prestige(bucket);

    // Sole credit for the house that crippled and finished the target;
    // otherwise split evenly among everyone who damaged it, minimum one
    // point each. The victim mirrors the total, keeping combat prestige
    // zero-sum.
    let creditors: Vec<HouseId> = if unit.crippled_by == Some(killer) || unit.damaged_by.len() <= 1
    {
        vec![killer]
    } else {
        unit.damaged_by.iter().copied().collect()
    };
    let share = (base / creditors.len() as i64).max(1);
    // One mirrored debit per credit so the zero sum survives the
    // engine's rounding prestige scale.
    for &house in &creditors {
        run.prestige.push(PrestigeEvent {
            house,
            amount: share,
            reason: PrestigeReason::CombatKill,
            source: Some(system),
        });
        run.prestige.push(PrestigeEvent {
            house: victim,
            amount: -share,
            reason: PrestigeReason::CombatLoss,
            source: Some(system),
        });
    }
    run.events.push(EventKind::SquadronDestroyed {
        system,
        flagship,
        house: victim,
        by: killer,
    });
}

/// Check whether any hostile pair still has operational units on both
/// sides.
fn any_hostile_sides(forces: &[TaskForce], hostile: &BTreeSet<(HouseId, HouseId)>) -> bool {
    for a in forces {
        if !a.has_operational_units() {
            continue;
        }
        for b in forces {
            if a.house != b.house
                && b.has_operational_units()
                && hostile.contains(&(a.house, b.house))
            {
                return true;
            }
        }
    }
    false
}

/// ROE check between rounds: fleets whose strength ratio fell below
/// their threshold leave the field. Homeworld defenders and colony-owned
/// units never retreat.
fn evaluate_retreats(
    system: SystemId,
    forces: &mut Vec<TaskForce>,
    hostile: &BTreeSet<(HouseId, HouseId)>,
    run: &mut TheaterRun,
) {
    let strengths: Vec<u32> = forces.iter().map(|tf| tf.total_effective_attack()).collect();
    let houses: Vec<HouseId> = forces.iter().map(|tf| tf.house).collect();

    let mut retreats: Vec<(usize, FleetId)> = Vec::new();
    for (fi, tf) in forces.iter().enumerate() {
        if tf.never_retreat || !tf.has_operational_units() {
            continue;
        }
        let own = strengths[fi];
        let hostile_as: u32 = forces
            .iter()
            .enumerate()
            .filter(|(oi, other)| {
                *oi != fi
                    && hostile.contains(&(tf.house, other.house))
                    && other.has_operational_units()
            })
            .map(|(oi, _)| strengths[oi])
            .sum();
        if hostile_as == 0 {
            continue;
        }
        let ratio_percent = u64::from(own) * 100 / u64::from(hostile_as);
        for (&fleet, &roe) in &tf.fleet_roe {
            let threshold = constants::roe_threshold_percent(roe);
            let must_go =
                threshold == u32::MAX || ratio_percent < u64::from(threshold);
            if must_go && tf.units.iter().any(|u| u.fleet == Some(fleet) && u.is_operational()) {
                retreats.push((fi, fleet));
            }
        }
    }

    for (fi, fleet) in retreats {
        let engagers: Vec<HouseId> = forces
            .iter()
            .filter(|other| {
                other.house != houses[fi]
                    && hostile.contains(&(houses[fi], other.house))
                    && other.has_operational_units()
            })
            .map(|other| other.house)
            .collect();
        let tf = &mut forces[fi];
        tf.units.retain(|u| u.fleet != Some(fleet));
        tf.spacelift.retain(|(f, _)| *f != fleet);
        tf.mothballed.retain(|(f, _)| *f != fleet);
        tf.fleet_roe.remove(&fleet);
        run.retreated_fleets.push(fleet);

        if !engagers.is_empty() {
            let share = (RETREAT_PRESTIGE / engagers.len() as i64).max(1);
            for &house in &engagers {
                run.prestige.push(PrestigeEvent {
                    house,
                    amount: share,
                    reason: PrestigeReason::RetreatForced,
                    source: Some(system),
                });
                run.prestige.push(PrestigeEvent {
                    house: houses[fi],
                    amount: -share,
                    reason: PrestigeReason::RetreatForced,
                    source: Some(system),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::CombatSquadron;
    use crate::taskforce::{MoraleState, TaskForce};
    use ec4x_common::ShipClass;

    fn squadron(id: u32, house: u32, attack: u32, defense: u32) -> CombatSquadron {
        CombatSquadron {
            flagship: ShipId(id),
            house: HouseId(house),
            flagship_class: ShipClass::Destroyer,
            bucket: SquadronBucket::Escort,
            ships: 1,
            attack,
            defense,
            command_rating: 5,
            state: HullState::Undamaged,
        }
    }

    fn task_force(house: u32, fleet: u32, roe: u8, squadrons: Vec<CombatSquadron>) -> TaskForce {
        let mut fleet_roe = BTreeMap::new();
        fleet_roe.insert(FleetId(fleet), roe);
        TaskForce {
            house: HouseId(house),
            units: squadrons
                .into_iter()
                .map(|sq| crate::taskforce::TfUnit::new(sq, Some(FleetId(fleet)), false))
                .collect(),
            fleet_roe,
            never_retreat: false,
            has_scout: false,
            morale: MoraleState::default(),
            spacelift: Vec::new(),
            mothballed: Vec::new(),
        }
    }

    fn mutual_hostility(a: u32, b: u32) -> BTreeSet<(HouseId, HouseId)> {
        let mut set = BTreeSet::new();
        set.insert((HouseId(a), HouseId(b)));
        set.insert((HouseId(b), HouseId(a)));
        set
    }

    #[test]
    fn harmless_forces_stalemate_at_the_round_cap() {
        // Toothless pickets: nobody can fire, so nobody can win, and a
        // critical can never force a reduction either.
        let mut forces = vec![
            task_force(1, 11, 0, vec![squadron(100, 1, 0, 10)]),
            task_force(2, 12, 0, vec![squadron(200, 2, 0, 10)]),
        ];
        let run = run_theater(
            SystemId(5),
            3,
            Theater::Space,
            &mut forces,
            &mutual_hostility(1, 2),
            &GameRng::new(17),
        );
        assert_eq!(run.rounds, constants::MAX_COMBAT_ROUNDS);
        assert!(run.squadron_results.is_empty());
        assert!(run.prestige.is_empty());
        assert_eq!(run.houses_standing.len(), 2);
    }

    #[test]
    fn overwhelming_force_destroys_a_helpless_defender_zero_sum() {
        // Attack 100 connects even at the 25% CER floor; the defender
        // cannot answer.
        let mut forces = vec![
            task_force(1, 11, 0, vec![squadron(100, 1, 100, 10)]),
            task_force(2, 12, 0, vec![squadron(200, 2, 0, 4)]),
        ];
        let run = run_theater(
            SystemId(5),
            3,
            Theater::Space,
            &mut forces,
            &mutual_hostility(1, 2),
            &GameRng::new(17),
        );
        assert_eq!(
            run.final_states.get(&ShipId(200)),
            Some(&(HullState::Destroyed, false))
        );
        // Crippled first, destroyed in a later round: at least two.
        assert!(run.rounds >= 2);
        assert_eq!(run.houses_standing, vec![HouseId(1)]);
        let sum: i64 = run.prestige.iter().map(|p| p.amount).sum();
        assert_eq!(sum, 0);
    }

    #[test]
    fn theater_runs_are_reproducible() {
        let build = || {
            vec![
                task_force(1, 11, 2, vec![squadron(100, 1, 8, 6), squadron(101, 1, 6, 5)]),
                task_force(2, 12, 2, vec![squadron(200, 2, 7, 6), squadron(201, 2, 5, 4)]),
            ]
        };
        let run_once = || {
            let mut forces = build();
            run_theater(
                SystemId(9),
                4,
                Theater::Space,
                &mut forces,
                &mutual_hostility(1, 2),
                &GameRng::new(42),
            )
        };
        let a = run_once();
        let b = run_once();
        assert_eq!(a.final_states, b.final_states);
        assert_eq!(a.rounds, b.rounds);
        assert_eq!(a.retreated_fleets, b.retreated_fleets);
    }
}
