//! Movement and fleet operations.
//!
//! Fleet orders are recorded in the Command Phase; the Production Phase
//! executes them: pathing and jumps, merges, salvage, commissioning,
//! and colonization (with simultaneous-claim contests decided by total
//! fleet attack strength).

use std::collections::BTreeMap;

use ec4x_common::{
    constants, CargoKind, ColonyId, EventKind, Fleet, FleetCommandKind, FleetId,
    FleetOrderRequest, HoldReason, HouseId, PrestigeEvent, PrestigeReason, ShipClass,
    StandingOrder, SystemId, ValidationCode, ValidationError,
};
use ec4x_galaxy::{jumps_this_turn, nearest_matching, shortest_path};

use crate::economy::prune_empty_fleets;
use crate::state::GameState;
use crate::turn::TurnContext;

/// A one-shot structural operation recorded at Command time and
/// executed in the Production Phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingOp {
    Join { source: FleetId, target: FleetId },
    Salvage(FleetId),
    Colonize(FleetId),
}

/// Record one fleet order during the Command Phase. Structural commands
/// come back as a [`PendingOp`] for the Production Phase.
pub fn apply_fleet_order(
    state: &mut GameState,
    house_id: HouseId,
    request: &FleetOrderRequest,
) -> Result<Option<PendingOp>, ValidationError> {
    let fleet = state
        .store
        .fleet(request.fleet)
        .ok_or_else(|| ValidationError::new(ValidationCode::UnknownEntity, "no such fleet"))?;
    if fleet.owner != house_id {
        return Err(
            ValidationError::new(ValidationCode::NotOwner, "fleet is not yours")
                .with_refs([request.fleet.0]),
        );
    }
    if let Some(roe) = request.roe {
        if roe > 10 {
            return Err(ValidationError::new(ValidationCode::InvalidRoe, "ROE is 0..=10"));
        }
    }
    let collapse = state
        .store
        .house(house_id)
        .is_some_and(|h| h.flags.defensive_collapse);
    if collapse && is_offensive(request.command) {
        return Err(ValidationError::new(
            ValidationCode::HouseInactive,
            "defensive collapse forbids offensive orders",
        ));
    }

    let fleet_system = fleet.system;
    if request.command == FleetCommandKind::View {
        // A status request; the standing order is untouched.
        if let Some(roe) = request.roe {
            let fleet = state.store.fleet_mut(request.fleet).expect("validated");
            fleet.roe = roe;
        }
        return Ok(None);
    }
    let mut pending = None;
    let order = match request.command {
        FleetCommandKind::Hold | FleetCommandKind::View => StandingOrder::Hold,
        FleetCommandKind::Move => {
            let target = request.target_system.ok_or_else(|| {
                ValidationError::new(ValidationCode::InvalidTarget, "move needs a target system")
            })?;
            if state.map.system(target).is_none() {
                return Err(ValidationError::new(
                    ValidationCode::UnknownEntity,
                    "no such system",
                ));
            }
            let profile = state.transit_profile(request.fleet);
            let path = shortest_path(&state.map, fleet_system, target, profile).ok_or_else(|| {
                ValidationError::new(ValidationCode::PathNotFound, "no traversable route")
                    .with_refs([request.fleet.0, target.0])
            })?;
            StandingOrder::Move { path }
        }
        FleetCommandKind::SeekHome => StandingOrder::SeekHome { path: Vec::new() },
        FleetCommandKind::Patrol => StandingOrder::Patrol,
        FleetCommandKind::GuardStarbase => StandingOrder::GuardStarbase,
        FleetCommandKind::GuardColony => StandingOrder::GuardColony,
        FleetCommandKind::Blockade => StandingOrder::Blockade,
        FleetCommandKind::Bombard => StandingOrder::Bombard,
        FleetCommandKind::Invade | FleetCommandKind::Blitz => {
            let marines = state.fleet_loaded_marines(request.fleet);
            if marines == 0 {
                return Err(ValidationError::new(
                    ValidationCode::WrongShipKind,
                    "no marines loaded",
                ));
            }
            if request.command == FleetCommandKind::Invade {
                StandingOrder::Invade
            } else {
                StandingOrder::Blitz
            }
        }
        FleetCommandKind::SpyColony | FleetCommandKind::SpySystem | FleetCommandKind::HackStarbase => {
            let target = request.target_system.ok_or_else(|| {
                ValidationError::new(ValidationCode::InvalidTarget, "spy missions need a target")
            })?;
            if !fleet_is_single_scout(state, request.fleet) {
                return Err(ValidationError::new(
                    ValidationCode::WrongShipKind,
                    "espionage needs a lone scout",
                ));
            }
            match request.command {
                FleetCommandKind::SpyColony => StandingOrder::SpyColony { target },
                FleetCommandKind::SpySystem => StandingOrder::SpySystem { target },
                _ => StandingOrder::HackStarbase { target },
            }
        }
        FleetCommandKind::Colonize => {
            if !fleet_has_loaded_etac(state, request.fleet) {
                return Err(ValidationError::new(
                    ValidationCode::WrongShipKind,
                    "colonization needs a loaded ETAC",
                ));
            }
            // The fleet must already be on station; getting there is a
            // Move order.
            pending = Some(PendingOp::Colonize(request.fleet));
            StandingOrder::Hold
        }
        FleetCommandKind::JoinFleet | FleetCommandKind::Rendezvous => {
            let target = request.target_fleet.ok_or_else(|| {
                ValidationError::new(ValidationCode::InvalidTarget, "join needs a target fleet")
            })?;
            let other = state.store.fleet(target).ok_or_else(|| {
                ValidationError::new(ValidationCode::UnknownEntity, "no such fleet")
            })?;
            if other.owner != house_id {
                return Err(ValidationError::new(
                    ValidationCode::NotOwner,
                    "cannot merge into a foreign fleet",
                ));
            }
            pending = Some(PendingOp::Join {
                source: request.fleet,
                target,
            });
            StandingOrder::Hold
        }
        FleetCommandKind::Salvage => {
            let at_own_colony = state
                .store
                .colony_by_system(fleet_system)
                .and_then(|c| state.store.colony(c))
                .is_some_and(|c| c.owner == house_id);
            if !at_own_colony {
                return Err(ValidationError::new(
                    ValidationCode::InvalidTarget,
                    "salvage requires an owned colony",
                ));
            }
            pending = Some(PendingOp::Salvage(request.fleet));
            StandingOrder::Hold
        }
        FleetCommandKind::Reserve => StandingOrder::Reserve,
        FleetCommandKind::Mothball => StandingOrder::Mothball,
    };

    let fleet = state.store.fleet_mut(request.fleet).expect("validated");
    fleet.order = order;
    if let Some(roe) = request.roe {
        fleet.roe = roe;
    }
    Ok(pending)
}

/// One-shot structural commands (join, salvage, colonize) are resolved
/// during the Production Phase against the orders recorded above.
#[derive(Debug, Clone, Default)]
pub struct PendingOps {
    pub joins: Vec<(FleetId, FleetId)>,
    pub salvages: Vec<FleetId>,
    pub colonizations: Vec<FleetId>,
}

fn is_offensive(kind: FleetCommandKind) -> bool {
    matches!(
        kind,
        FleetCommandKind::Blockade
            | FleetCommandKind::Bombard
            | FleetCommandKind::Invade
            | FleetCommandKind::Blitz
    )
}

fn fleet_is_single_scout(state: &GameState, fleet: FleetId) -> bool {
    let Some(fleet) = state.store.fleet(fleet) else {
        return false;
    };
    let ships: Vec<_> = fleet.ship_ids().collect();
    ships.len() == 1
        && state
            .store
            .ship(ships[0])
            .is_some_and(|s| s.class == ShipClass::Scout)
}

fn fleet_has_loaded_etac(state: &GameState, fleet: FleetId) -> bool {
    let Some(fleet) = state.store.fleet(fleet) else {
        return false;
    };
    fleet.ship_ids().any(|id| {
        state.store.ship(id).is_some_and(|s| {
            s.class == ShipClass::Etac
                && s.cargo.is_some_and(|c| c.kind == CargoKind::Colonists)
        })
    })
}

/// Production Phase: execute movement and structural fleet operations.
pub fn run_movement(state: &mut GameState, pending: &PendingOps, ctx: &mut TurnContext) {
    // Clear last turn's trails before anyone moves.
    for fleet_id in state.store.fleet_ids() {
        if let Some(fleet) = state.store.fleet_mut(fleet_id) {
            fleet.trail.clear();
        }
    }

    // Structural ops first, in deterministic id order.
    for &(source, target) in &pending.joins {
        merge_fleets(state, source, target, ctx);
    }
    for &fleet_id in &pending.salvages {
        salvage_fleet(state, fleet_id, ctx);
    }

    // Movement proper.
    for fleet_id in state.store.fleet_ids() {
        step_fleet(state, fleet_id, ctx);
    }

    // Colonization contests after everyone has moved.
    resolve_colonization(state, &pending.colonizations, ctx);
}

/// Advance one fleet along its standing order.
fn step_fleet(state: &mut GameState, fleet_id: FleetId, ctx: &mut TurnContext) {
    let Some(fleet) = state.store.fleet(fleet_id) else {
        return;
    };
    let owner = fleet.owner;
    let from = fleet.system;
    let collapse = state
        .store
        .house(owner)
        .is_some_and(|h| h.flags.defensive_collapse);

    let order = fleet.order.clone();
    // Defensive collapse overrides every standing order — Hold, Patrol,
    // guard duty, whatever the fleet was doing: the whole navy heads
    // for friendly territory.
    let path = if collapse {
        if state.controls(owner, from) {
            let fleet = state.store.fleet_mut(fleet_id).expect("exists");
            fleet.order = StandingOrder::Hold;
            return;
        }
        let profile = state.transit_profile(fleet_id);
        match nearest_matching(&state.map, from, profile, |sys| state.controls(owner, sys)) {
            Some((_, path)) => {
                let fleet = state.store.fleet_mut(fleet_id).expect("exists");
                fleet.order = StandingOrder::SeekHome { path: Vec::new() };
                path
            }
            None => {
                ctx.push_house_event(
                    owner,
                    EventKind::FleetHeld {
                        fleet: fleet_id,
                        reason: HoldReason::DefensiveCollapse,
                    },
                );
                return;
            }
        }
    } else {
        match order {
            StandingOrder::Move { path } => path,
            StandingOrder::SeekHome { .. } => {
                // SeekHome recomputes each turn as colonies come and go.
                if state.controls(owner, from) {
                    let fleet = state.store.fleet_mut(fleet_id).expect("exists");
                    fleet.order = StandingOrder::Hold;
                    return;
                }
                let profile = state.transit_profile(fleet_id);
                match nearest_matching(&state.map, from, profile, |sys| {
                    state.controls(owner, sys)
                }) {
                    Some((_, path)) => path,
                    None => {
                        ctx.push_house_event(
                            owner,
                            EventKind::FleetHeld {
                                fleet: fleet_id,
                                reason: HoldReason::NoPath,
                            },
                        );
                        return;
                    }
                }
            }
            StandingOrder::SpyColony { target }
            | StandingOrder::SpySystem { target }
            | StandingOrder::HackStarbase { target } => {
                // Scouts route themselves to their target.
                if from == target {
                    return;
                }
                let profile = state.transit_profile(fleet_id);
                match shortest_path(&state.map, from, target, profile) {
                    Some(path) => path,
                    None => {
                        ctx.push_house_event(
                            owner,
                            EventKind::FleetHeld {
                                fleet: fleet_id,
                                reason: HoldReason::NoPath,
                            },
                        );
                        return;
                    }
                }
            }
            _ => return,
        }
    };
    if path.is_empty() {
        return;
    }

    let jumps = jumps_this_turn(&state.map, from, &path, |sys| state.controls(owner, sys));
    let mut destination = from;
    for &hop in path.iter().take(jumps) {
        destination = hop;
    }
    if destination == from {
        return;
    }
    state.store.move_fleet(fleet_id, destination);
    ctx.push_house_event(
        owner,
        EventKind::FleetMoved {
            fleet: fleet_id,
            from,
            to: destination,
        },
    );

    // Persist the remaining route.
    let remaining: Vec<SystemId> = path.into_iter().skip(jumps).collect();
    let fleet = state.store.fleet_mut(fleet_id).expect("exists");
    if let StandingOrder::Move { .. } = fleet.order {
        fleet.order = if remaining.is_empty() {
            StandingOrder::Hold
        } else {
            StandingOrder::Move { path: remaining }
        };
    }
}

/// Merge `source` into `target`: same owner, same system.
fn merge_fleets(state: &mut GameState, source: FleetId, target: FleetId, ctx: &mut TurnContext) {
    let Some(src) = state.store.fleet(source) else {
        return;
    };
    let Some(dst) = state.store.fleet(target) else {
        // Resolution anomaly: the rendezvous partner died this turn.
        ctx.push_house_event(
            src.owner,
            EventKind::FleetHeld {
                fleet: source,
                reason: HoldReason::DestinationLost,
            },
        );
        return;
    };
    if src.owner != dst.owner || src.system != dst.system {
        return;
    }
    let owner = src.owner;
    let squadrons = std::mem::take(&mut state.store.fleet_mut(source).expect("exists").squadrons);
    for squadron in &squadrons {
        for ship_id in squadron.ships() {
            if let Some(ship) = state.store.ship_mut(ship_id) {
                ship.fleet = Some(target);
            }
        }
    }
    state
        .store
        .fleet_mut(target)
        .expect("exists")
        .squadrons
        .extend(squadrons);
    state.store.destroy_fleet(source);
    ctx.push_house_event(
        owner,
        EventKind::FleetsJoined {
            into: target,
            absorbed: source,
        },
    );
}

/// Disband a fleet at an owned colony for half its production cost.
fn salvage_fleet(state: &mut GameState, fleet_id: FleetId, ctx: &mut TurnContext) {
    let Some(fleet) = state.store.fleet(fleet_id) else {
        return;
    };
    let owner = fleet.owner;
    let ships: Vec<_> = fleet.ship_ids().collect();
    let mut refund = 0u32;
    for ship_id in ships {
        if let Some(ship) = state.store.ship(ship_id) {
            refund += ship.class.base_stats().production_cost * constants::SALVAGE_REFUND_PERCENT
                / 100;
        }
        state.store.destroy_ship(ship_id);
    }
    state.store.destroy_fleet(fleet_id);
    if let Some(house) = state.store.house_mut(owner) {
        house.treasury = house.treasury.saturating_add(refund);
    }
    ctx.push_house_event(
        owner,
        EventKind::FleetSalvaged {
            fleet: fleet_id,
            refund,
        },
    );
}

/// Resolve colonization claims. Multiple houses claiming the same empty
/// system the same turn contest it: highest total fleet attack wins,
/// ties to the lowest house id; losers keep their ETAC loaded.
fn resolve_colonization(state: &mut GameState, claims: &[FleetId], ctx: &mut TurnContext) {
    let mut by_system: BTreeMap<SystemId, Vec<FleetId>> = BTreeMap::new();
    for &fleet_id in claims {
        let Some(fleet) = state.store.fleet(fleet_id) else {
            continue;
        };
        if !fleet_has_loaded_etac(state, fleet_id) {
            continue;
        }
        by_system.entry(fleet.system).or_default().push(fleet_id);
    }

    for (system, mut claimants) in by_system {
        // Already colonized: every claim fails, nothing is refunded.
        if state.store.colony_by_system(system).is_some() {
            for fleet_id in claimants {
                let owner = state.store.fleet(fleet_id).map(|f| f.owner);
                if let Some(owner) = owner {
                    ctx.push_house_event(
                        owner,
                        EventKind::ColonizationFailed {
                            house: owner,
                            system,
                        },
                    );
                }
            }
            continue;
        }

        claimants.sort_by_key(|&fleet_id| {
            let attack = state.fleet_attack(fleet_id);
            let owner = state.store.fleet(fleet_id).map(|f| f.owner).unwrap_or_default();
            // Highest attack first; ties go to the lowest house id.
            (std::cmp::Reverse(attack), owner, fleet_id)
        });
        let winner_fleet = claimants[0];
        let winner = state
            .store
            .fleet(winner_fleet)
            .map(|f| f.owner)
            .expect("claimant exists");
        found_colony(state, winner, winner_fleet, system, ctx);

        let losers: Vec<HouseId> = claimants[1..]
            .iter()
            .filter_map(|&f| state.store.fleet(f).map(|fl| fl.owner))
            .collect();
        if !losers.is_empty() {
            ctx.push_public_event(EventKind::ColonizationContested {
                system,
                winner,
                losers: losers.clone(),
            });
            for loser in losers {
                ctx.push_house_event(
                    loser,
                    EventKind::ColonizationFailed {
                        house: loser,
                        system,
                    },
                );
            }
        }
    }
}

/// Consume the winner's ETAC and plant the colony.
fn found_colony(
    state: &mut GameState,
    owner: HouseId,
    fleet_id: FleetId,
    system: SystemId,
    ctx: &mut TurnContext,
) {
    let etac = state
        .store
        .fleet(fleet_id)
        .and_then(|fleet| {
            fleet.ship_ids().find(|id| {
                state.store.ship(*id).is_some_and(|s| {
                    s.class == ShipClass::Etac
                        && s.cargo.is_some_and(|c| c.kind == CargoKind::Colonists)
                })
            })
        });
    let Some(etac) = etac else {
        return;
    };
    let colonists = state
        .store
        .ship(etac)
        .and_then(|s| s.cargo)
        .map(|c| c.quantity)
        .unwrap_or(0);
    state.store.destroy_ship(etac);
    prune_empty_fleets(state, owner);

    let (class, resources) = state
        .map
        .system(system)
        .map(|s| (s.planet_class, s.resources))
        .unwrap_or((ec4x_common::PlanetClass::Harsh, ec4x_common::ResourceRating::Normal));
    let colony_id = ColonyId(state.store.mint.next());
    let souls = u64::from(colonists) * crate::construction::SOULS_PER_COLONIST_UNIT;
    state.store.create_colony(ec4x_common::Colony::new(
        colony_id, system, owner, class, resources, souls,
    ));
    ctx.push_public_event(EventKind::ColonyFounded {
        house: owner,
        colony: colony_id,
        system,
    });
    ctx.prestige.push(PrestigeEvent {
        house: owner,
        amount: constants::COLONIZATION_PRESTIGE,
        reason: PrestigeReason::Colonization,
        source: Some(system),
    });
    log::info!("house {} colonized system {}", owner.0, system.0);
}

/// Commission unassigned squadrons at a colony into a fleet.
pub fn commission_squadrons(
    state: &mut GameState,
    house_id: HouseId,
    order: &ec4x_common::CommissionOrder,
) -> Result<(), ValidationError> {
    let colony = state
        .store
        .colony(order.colony)
        .ok_or_else(|| ValidationError::new(ValidationCode::UnknownEntity, "no such colony"))?;
    if colony.owner != house_id {
        return Err(ValidationError::new(ValidationCode::NotOwner, "colony is not yours"));
    }
    let system = colony.system;
    let colony_id = colony.id;

    let target_fleet = match order.into_fleet {
        Some(fleet_id) => {
            let fleet = state.store.fleet(fleet_id).ok_or_else(|| {
                ValidationError::new(ValidationCode::UnknownEntity, "no such fleet")
            })?;
            if fleet.owner != house_id || fleet.system != system {
                return Err(ValidationError::new(
                    ValidationCode::InvalidTarget,
                    "fleet must be yours and on station",
                ));
            }
            fleet_id
        }
        None => {
            let id = FleetId(state.store.mint.next());
            state.store.create_fleet(Fleet::new(id, house_id, system));
            id
        }
    };

    for &flagship in &order.squadrons {
        let squadron = {
            let colony = state.store.colony_mut(colony_id).expect("exists");
            let idx = colony
                .unassigned_squadrons
                .iter()
                .position(|sq| sq.flagship == flagship);
            idx.map(|i| colony.unassigned_squadrons.remove(i))
        };
        let Some(squadron) = squadron else {
            return Err(ValidationError::new(
                ValidationCode::UnknownEntity,
                "squadron is not awaiting assignment",
            )
            .with_refs([flagship.0]));
        };
        for ship_id in squadron.ships() {
            if let Some(ship) = state.store.ship_mut(ship_id) {
                ship.fleet = Some(target_fleet);
            }
        }
        state
            .store
            .fleet_mut(target_fleet)
            .expect("exists")
            .squadrons
            .push(squadron);
    }
    Ok(())
}
