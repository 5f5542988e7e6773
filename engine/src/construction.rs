//! Construction and repair: project queues, completions, and the
//! capacity rules on fighters and capital squadrons.
//!
//! Projects are paid in full when queued; cancelling refunds half, and a
//! project whose host dock is crippled or destroyed before completion
//! forfeits its PP.

use ec4x_common::{
    constants, BuildOrder, BuildSubject, Cargo, CargoKind, CapacityKind, CapacityViolation,
    ColonyId, ConstructionProject, ConstructionProjectId, DockRef, Drydock, EventKind,
    FacilityKind, GroundUnit, GroundUnitKind, HouseId, HullState, RepairOrder, RepairProject,
    RepairSubject, Ship, ShipClass, ShipId, Shipyard, Spaceport, Squadron, Starbase, TechField,
    Terraform, ValidationCode, ValidationError,
};

use crate::economy::prune_empty_fleets;
use crate::state::GameState;
use crate::turn::TurnContext;

/// Souls carried per ETAC colonist unit.
pub const SOULS_PER_COLONIST_UNIT: u64 = 25_000;

/// Queue one build order, debiting the treasury in full.
pub fn queue_build(
    state: &mut GameState,
    house_id: HouseId,
    order: &BuildOrder,
) -> Result<Option<ConstructionProjectId>, ValidationError> {
    let colony = state
        .store
        .colony(order.colony)
        .ok_or_else(|| ValidationError::new(ValidationCode::UnknownEntity, "no such colony"))?;
    if colony.owner != house_id {
        return Err(
            ValidationError::new(ValidationCode::NotOwner, "colony is not yours")
                .with_refs([order.colony.0]),
        );
    }
    let colony_id = colony.id;

    let (cost, turns) = price_subject(state, house_id, order)?;
    let house = state.store.house_mut(house_id).expect("house exists");
    if house.treasury < cost {
        return Err(ValidationError::new(
            ValidationCode::InsufficientTreasury,
            format!("project costs {cost}, treasury {}", house.treasury),
        ));
    }
    house.treasury -= cost;

    // Direct industrial investment converts the same turn with no queue.
    if let BuildSubject::IndustrialInvestment(pp) = order.subject {
        let colony = state.store.colony_mut(colony_id).expect("colony exists");
        colony.iu = colony.iu.saturating_add(pp);
        return Ok(None);
    }
    if let BuildSubject::Terraform(target) = order.subject {
        let colony = state.store.colony_mut(colony_id).expect("colony exists");
        colony.terraform = Some(Terraform {
            target,
            turns_remaining: turns,
        });
    }

    let id = ConstructionProjectId(state.store.mint.next());
    state.store.add_construction(ConstructionProject {
        id,
        colony: colony_id,
        subject: order.subject,
        cost,
        turns_remaining: turns,
        dock: order.dock,
    });
    Ok(Some(id))
}

/// Price and duration for a build order.
fn price_subject(
    state: &GameState,
    house_id: HouseId,
    order: &BuildOrder,
) -> Result<(u32, u8), ValidationError> {
    let colony = state.store.colony(order.colony).expect("validated");
    match order.subject {
        BuildSubject::Ship(class) => {
            let base = class.base_stats().production_cost;
            let cost = match order.dock {
                Some(DockRef::Spaceport(id)) => {
                    if !colony.spaceports.contains(&id) {
                        return Err(ValidationError::new(
                            ValidationCode::InvalidTarget,
                            "spaceport is not at this colony",
                        ));
                    }
                    base * constants::SPACEPORT_COST_MULTIPLIER
                }
                Some(DockRef::Shipyard(id)) => {
                    if !colony.shipyards.contains(&id) {
                        return Err(ValidationError::new(
                            ValidationCode::InvalidTarget,
                            "shipyard is not at this colony",
                        ));
                    }
                    base
                }
                _ => {
                    return Err(ValidationError::new(
                        ValidationCode::InvalidTarget,
                        "ships need a spaceport or shipyard",
                    ))
                }
            };
            Ok((cost, constants::ship_build_turns(base)))
        }
        BuildSubject::Facility(kind) => Ok((kind.production_cost(), kind.build_turns())),
        BuildSubject::Ground(kind) => Ok((kind.production_cost(), 1)),
        BuildSubject::IndustrialInvestment(pp) => Ok((pp, 0)),
        BuildSubject::Shield(level) => {
            if level == 0 || level > constants::MAX_SHIELD_LEVEL || level <= colony.shield_level {
                return Err(ValidationError::new(
                    ValidationCode::InvalidTarget,
                    "invalid shield level",
                ));
            }
            let sld = state
                .store
                .house(house_id)
                .map(|h| h.tech.level(TechField::SLD))
                .unwrap_or(0);
            if level > sld {
                return Err(ValidationError::new(
                    ValidationCode::SlGated,
                    format!("shield level {level} requires SLD {level}"),
                ));
            }
            let steps = u32::from(level - colony.shield_level);
            Ok((steps * constants::SHIELD_COST_PER_LEVEL, 2))
        }
        BuildSubject::Terraform(target) => {
            if colony.terraform.is_some() {
                return Err(ValidationError::new(
                    ValidationCode::DuplicateOrder,
                    "terraform already in progress",
                ));
            }
            if colony.planet_class.improved() != Some(target) {
                return Err(ValidationError::new(
                    ValidationCode::InvalidTarget,
                    "terraform must step one class",
                ));
            }
            let ter = state
                .store
                .house(house_id)
                .map(|h| h.tech.level(TechField::TER))
                .unwrap_or(0);
            if ter == 0 {
                return Err(ValidationError::new(
                    ValidationCode::SlGated,
                    "terraforming requires TER",
                ));
            }
            Ok((constants::TERRAFORM_COST, constants::TERRAFORM_TURNS))
        }
    }
}

/// Cancel a queued project for a half refund.
pub fn cancel_project(
    state: &mut GameState,
    house_id: HouseId,
    project_id: ConstructionProjectId,
    ctx: &mut TurnContext,
) -> Result<(), ValidationError> {
    let project = state
        .store
        .construction(project_id)
        .ok_or_else(|| ValidationError::new(ValidationCode::UnknownEntity, "no such project"))?;
    let colony_id = project.colony;
    let colony = state.store.colony(colony_id).expect("project colony");
    if colony.owner != house_id {
        return Err(ValidationError::new(ValidationCode::NotOwner, "not your project"));
    }
    let refund = project.cost * constants::CANCEL_REFUND_PERCENT / 100;
    if let BuildSubject::Terraform(_) = project.subject {
        let colony = state.store.colony_mut(colony_id).expect("colony exists");
        colony.terraform = None;
    }
    state.store.remove_construction(project_id);
    let house = state.store.house_mut(house_id).expect("house exists");
    house.treasury = house.treasury.saturating_add(refund);
    ctx.push_house_event(
        house_id,
        EventKind::ConstructionCancelled {
            colony: colony_id,
            project: project_id,
            refund,
        },
    );
    Ok(())
}

/// Queue one repair order.
pub fn queue_repair(
    state: &mut GameState,
    house_id: HouseId,
    order: &RepairOrder,
) -> Result<(), ValidationError> {
    let colony = state
        .store
        .colony(order.colony)
        .ok_or_else(|| ValidationError::new(ValidationCode::UnknownEntity, "no such colony"))?;
    if colony.owner != house_id {
        return Err(ValidationError::new(ValidationCode::NotOwner, "colony is not yours"));
    }
    let colony_id = colony.id;
    let (cost, dock) = match order.subject {
        RepairSubject::Ship(ship_id) => {
            let ship = state
                .store
                .ship(ship_id)
                .ok_or_else(|| ValidationError::new(ValidationCode::UnknownEntity, "no such ship"))?;
            if ship.owner != house_id {
                return Err(ValidationError::new(ValidationCode::NotOwner, "not your ship"));
            }
            if ship.hull != HullState::Crippled {
                return Err(ValidationError::new(
                    ValidationCode::InvalidTarget,
                    "ship is not crippled",
                ));
            }
            let dock = colony.drydocks.iter().copied().next().ok_or_else(|| {
                ValidationError::new(ValidationCode::InvalidTarget, "ship repair needs a drydock")
            })?;
            (
                ship.class.base_stats().production_cost * constants::REPAIR_COST_PERCENT / 100,
                Some(DockRef::Drydock(dock)),
            )
        }
        RepairSubject::Starbase(sb_id) => {
            let sb = state.store.starbase(sb_id).ok_or_else(|| {
                ValidationError::new(ValidationCode::UnknownEntity, "no such starbase")
            })?;
            if sb.colony != colony_id {
                return Err(ValidationError::new(
                    ValidationCode::InvalidTarget,
                    "starbase is not at this colony",
                ));
            }
            if colony.spaceports.is_empty() {
                return Err(ValidationError::new(
                    ValidationCode::InvalidTarget,
                    "starbase repair needs a spaceport",
                ));
            }
            // Starbase repair rides the spaceport without a dock slot.
            (
                FacilityKind::Starbase.production_cost() * constants::REPAIR_COST_PERCENT / 100,
                None,
            )
        }
    };
    let house = state.store.house_mut(house_id).expect("house exists");
    if house.treasury < cost {
        return Err(ValidationError::new(
            ValidationCode::InsufficientTreasury,
            format!("repair costs {cost}"),
        ));
    }
    house.treasury -= cost;
    let id = ec4x_common::RepairProjectId(state.store.mint.next());
    state.store.add_repair(RepairProject {
        id,
        colony: colony_id,
        subject: order.subject,
        cost,
        turns_remaining: 1,
        dock,
    });
    Ok(())
}

/// Production Phase tick: advance projects, apply completions, drop
/// projects whose dock died.
pub fn run_construction_tick(state: &mut GameState, ctx: &mut TurnContext) {
    for project_id in state.store.construction_ids() {
        let Some(project) = state.store.construction(project_id) else {
            continue;
        };
        let colony_id = project.colony;
        let dock = project.dock;
        let owner = match state.store.colony(colony_id) {
            Some(colony) => colony.owner,
            None => {
                // Colony destroyed mid-build: PP lost.
                state.store.remove_construction(project_id);
                continue;
            }
        };
        if !dock_is_operational(state, dock) {
            state.store.remove_construction(project_id);
            ctx.push_house_event(
                owner,
                EventKind::ConstructionLost {
                    colony: colony_id,
                    project: project_id,
                },
            );
            continue;
        }
        if !dock_slot_available(state, colony_id, project_id) {
            // Over dock capacity: this project waits its turn.
            continue;
        }

        let project = state.store.construction_mut(project_id).expect("exists");
        project.turns_remaining = project.turns_remaining.saturating_sub(1);
        if project.turns_remaining > 0 {
            continue;
        }
        let subject = project.subject;
        state.store.remove_construction(project_id);
        complete_project(state, owner, colony_id, subject);
        ctx.push_house_event(
            owner,
            EventKind::ConstructionCompleted {
                colony: colony_id,
                project: project_id,
                subject,
            },
        );
    }

    // Repairs: one turn, then the hull comes back clean.
    for repair_id in state.store.repair_ids() {
        let Some(repair) = state.store.repair(repair_id) else {
            continue;
        };
        let colony_id = repair.colony;
        let subject = repair.subject;
        let owner = match state.store.colony(colony_id) {
            Some(colony) => colony.owner,
            None => {
                state.store.remove_repair(repair_id);
                continue;
            }
        };
        state.store.remove_repair(repair_id);
        match subject {
            RepairSubject::Ship(ship_id) => {
                if let Some(ship) = state.store.ship_mut(ship_id) {
                    ship.hull = HullState::Undamaged;
                }
            }
            RepairSubject::Starbase(sb_id) => {
                if let Some(sb) = state.store.starbase_mut(sb_id) {
                    sb.hull = HullState::Undamaged;
                }
            }
        }
        ctx.push_house_event(owner, EventKind::RepairCompleted { colony: colony_id });
    }

    // Terraform countdowns live on the colony itself.
    let colony_ids: Vec<_> = state.store.colonies().map(|c| c.id).collect();
    for colony_id in colony_ids {
        let Some(colony) = state.store.colony_mut(colony_id) else {
            continue;
        };
        let Some(mut terraform) = colony.terraform else {
            continue;
        };
        terraform.turns_remaining = terraform.turns_remaining.saturating_sub(1);
        if terraform.turns_remaining == 0 {
            colony.planet_class = terraform.target;
            colony.terraform = None;
            let owner = colony.owner;
            ctx.push_house_event(owner, EventKind::TerraformCompleted { colony: colony_id });
        } else {
            colony.terraform = Some(terraform);
        }
    }
}

fn dock_is_operational(state: &GameState, dock: Option<DockRef>) -> bool {
    match dock {
        None => true,
        Some(DockRef::Spaceport(id)) => state
            .store
            .spaceport(id)
            .is_some_and(|f| f.hull == HullState::Undamaged),
        Some(DockRef::Shipyard(id)) => state
            .store
            .shipyard(id)
            .is_some_and(|f| f.hull == HullState::Undamaged),
        Some(DockRef::Drydock(id)) => state
            .store
            .drydock(id)
            .is_some_and(|f| f.hull == HullState::Undamaged),
        Some(DockRef::Starbase(id)) => state
            .store
            .starbase(id)
            .is_some_and(|f| f.hull == HullState::Undamaged),
    }
}

/// Whether this project is within its dock's concurrent capacity.
/// Queued projects beyond the cap defer in queue order.
fn dock_slot_available(
    state: &GameState,
    colony_id: ColonyId,
    project_id: ConstructionProjectId,
) -> bool {
    let Some(colony) = state.store.colony(colony_id) else {
        return false;
    };
    let Some(project) = state.store.construction(project_id) else {
        return false;
    };
    let Some(dock) = project.dock else {
        return true;
    };
    let cst = state
        .store
        .house(colony.owner)
        .map(|h| h.tech.level(TechField::CST))
        .unwrap_or(0);
    let capacity = constants::dock_capacity(cst) as usize;
    let mut slot = 0usize;
    for &queued in &colony.construction_queue {
        let Some(other) = state.store.construction(queued) else {
            continue;
        };
        if other.dock != Some(dock) {
            continue;
        }
        if queued == project_id {
            return slot < capacity;
        }
        slot += 1;
    }
    false
}

/// Materialize a finished project.
fn complete_project(state: &mut GameState, owner: HouseId, colony_id: ColonyId, subject: BuildSubject) {
    match subject {
        BuildSubject::Ship(class) => {
            let ship_id = ShipId(state.store.mint.next());
            let mut ship = Ship::new(ship_id, class, owner);
            load_default_cargo(state, colony_id, &mut ship);
            state.store.add_ship(ship);
            let colony = state.store.colony_mut(colony_id).expect("colony exists");
            if class == ShipClass::FighterSquadron {
                colony.fighters.push(Squadron::solo(ship_id));
            } else {
                colony.unassigned_squadrons.push(Squadron::solo(ship_id));
            }
        }
        BuildSubject::Facility(kind) => {
            let raw = state.store.mint.next();
            let colony = state.store.colony_mut(colony_id).expect("colony exists");
            match kind {
                FacilityKind::Starbase => {
                    let id = ec4x_common::StarbaseId(raw);
                    colony.starbases.push(id);
                    state.store.add_starbase(Starbase {
                        id,
                        colony: colony_id,
                        hull: HullState::Undamaged,
                        tier: 0,
                    });
                }
                FacilityKind::Spaceport => {
                    let id = ec4x_common::SpaceportId(raw);
                    colony.spaceports.push(id);
                    state.store.add_spaceport(Spaceport {
                        id,
                        colony: colony_id,
                        hull: HullState::Undamaged,
                        tier: 0,
                    });
                }
                FacilityKind::Shipyard => {
                    let id = ec4x_common::ShipyardId(raw);
                    colony.shipyards.push(id);
                    state.store.add_shipyard(Shipyard {
                        id,
                        colony: colony_id,
                        hull: HullState::Undamaged,
                        tier: 0,
                    });
                }
                FacilityKind::Drydock => {
                    let id = ec4x_common::DrydockId(raw);
                    colony.drydocks.push(id);
                    state.store.add_drydock(Drydock {
                        id,
                        colony: colony_id,
                        hull: HullState::Undamaged,
                        tier: 0,
                    });
                }
            }
        }
        BuildSubject::Ground(kind) => {
            let id = ec4x_common::GroundUnitId(state.store.mint.next());
            state
                .store
                .add_ground_unit(GroundUnit::new(id, colony_id, owner, kind));
            let colony = state.store.colony_mut(colony_id).expect("colony exists");
            colony.ground_units.push(id);
        }
        BuildSubject::Shield(level) => {
            let colony = state.store.colony_mut(colony_id).expect("colony exists");
            colony.shield_level = level.min(constants::MAX_SHIELD_LEVEL);
        }
        // Terraform completion is tracked on the colony; investment is
        // applied at queue time.
        BuildSubject::Terraform(_) | BuildSubject::IndustrialInvestment(_) => {}
    }
}

/// ETACs leave the yard loaded with colonists; troop transports lift
/// whatever marines the garrison can spare.
fn load_default_cargo(state: &mut GameState, colony_id: ColonyId, ship: &mut Ship) {
    let stl = state
        .store
        .house(ship.owner)
        .map(|h| h.tech.level(TechField::STL))
        .unwrap_or(0);
    match ship.class {
        ShipClass::Etac => {
            let units = ship.class.capacity_at(stl);
            let colony = state.store.colony_mut(colony_id).expect("colony exists");
            let lift_souls = u64::from(units) * SOULS_PER_COLONIST_UNIT;
            if colony.souls > lift_souls + 1_000 {
                colony.souls -= lift_souls;
                colony.pu = ec4x_common::pu_from_souls(colony.souls);
                ship.cargo = Some(Cargo {
                    kind: CargoKind::Colonists,
                    quantity: units,
                });
            }
        }
        ShipClass::TroopTransport => {
            let capacity = ship.class.capacity_at(stl);
            let marine_ids: Vec<_> = {
                let colony = state.store.colony(colony_id).expect("colony exists");
                colony
                    .ground_units
                    .iter()
                    .copied()
                    .filter(|id| {
                        state
                            .store
                            .ground_unit(*id)
                            .is_some_and(|g| g.kind == GroundUnitKind::Marine && !g.crippled)
                    })
                    .take(capacity as usize)
                    .collect()
            };
            if !marine_ids.is_empty() {
                for id in &marine_ids {
                    state.store.destroy_ground_unit(*id);
                }
                ship.cargo = Some(Cargo {
                    kind: CargoKind::Marines,
                    quantity: marine_ids.len() as u32,
                });
            }
        }
        _ => {}
    }
}

/// Capacity enforcement: fighter caps per colony, capital caps per
/// house, each with a two-turn grace before the hammer falls.
pub fn enforce_capacity(state: &mut GameState, ctx: &mut TurnContext) {
    enforce_fighter_caps(state, ctx);
    enforce_capital_caps(state, ctx);
}

fn enforce_fighter_caps(state: &mut GameState, ctx: &mut TurnContext) {
    let colony_ids: Vec<_> = state.store.colonies().map(|c| c.id).collect();
    for colony_id in colony_ids {
        let Some(colony) = state.store.colony(colony_id) else {
            continue;
        };
        let owner = colony.owner;
        let fd = state
            .store
            .house(owner)
            .map(|h| h.tech.level(TechField::FD))
            .unwrap_or(0);
        let operational_starbases = colony
            .starbases
            .iter()
            .filter(|id| {
                state
                    .store
                    .starbase(**id)
                    .is_some_and(|sb| sb.is_operational())
            })
            .count() as u32;
        let current = colony.fighters.len() as u32;
        let cap = (colony.pu / constants::FIGHTER_CAP_PU_DIVISOR) * constants::fd_mult(fd);
        let bases_needed = current.div_ceil(constants::FIGHTERS_PER_STARBASE);
        let in_violation = current > cap || operational_starbases < bases_needed;

        let colony = state.store.colony_mut(colony_id).expect("colony exists");
        if !in_violation {
            if colony
                .capacity_violation
                .is_some_and(|v| v.kind == CapacityKind::FighterSquadrons)
            {
                colony.capacity_violation = None;
            }
            continue;
        }
        let excess = current.saturating_sub(cap).max(1);
        match colony.capacity_violation {
            Some(mut violation) if violation.kind == CapacityKind::FighterSquadrons => {
                violation.grace_turns_left = violation.grace_turns_left.saturating_sub(1);
                if violation.grace_turns_left == 0 {
                    // Grace expired: oldest squadrons disband first.
                    let over = current.saturating_sub(cap).max(1) as usize;
                    let disbanded: Vec<Squadron> =
                        colony.fighters.drain(..over.min(colony.fighters.len())).collect();
                    colony.capacity_violation = None;
                    let count = disbanded.len() as u32;
                    for squadron in disbanded {
                        for ship in squadron.ships() {
                            state.store.destroy_ship(ship);
                        }
                    }
                    ctx.push_house_event(
                        owner,
                        EventKind::CapacityEnforced {
                            house: owner,
                            colony: Some(colony_id),
                            disbanded: count,
                        },
                    );
                } else {
                    violation.excess = excess;
                    colony.capacity_violation = Some(violation);
                }
            }
            _ => {
                colony.capacity_violation = Some(CapacityViolation {
                    kind: CapacityKind::FighterSquadrons,
                    grace_turns_left: constants::CAPACITY_GRACE_TURNS,
                    excess,
                });
            }
        }
    }
}

fn enforce_capital_caps(state: &mut GameState, ctx: &mut TurnContext) {
    for house_id in state.store.house_ids() {
        let Some(house) = state.store.house(house_id) else {
            continue;
        };
        if !house.is_active() {
            continue;
        }
        let total_iu: u32 = state
            .store
            .colonies_by_owner(house_id)
            .iter()
            .filter_map(|id| state.store.colony(*id))
            .map(|c| c.iu)
            .sum();
        let cap = constants::capital_cap(total_iu);
        let capitals = capital_squadrons(state, house_id);
        let count = capitals.len() as u32;

        if count <= cap {
            let house = state.store.house_mut(house_id).expect("house exists");
            house.flags.capital_excess_turns = 0;
            continue;
        }
        let streak = {
            let house = state.store.house_mut(house_id).expect("house exists");
            house.flags.capital_excess_turns =
                house.flags.capital_excess_turns.saturating_add(1);
            house.flags.capital_excess_turns
        };
        if streak <= constants::CAPACITY_GRACE_TURNS {
            continue;
        }
        // Forced Guild claim: crippled first, then lowest AS.
        let mut victims = capitals;
        victims.sort_by_key(|&(crippled, attack, flagship)| (!crippled, attack, flagship));
        let over = (count - cap) as usize;
        let mut claimed = 0u32;
        for &(_, _, flagship) in victims.iter().take(over) {
            let refund = state
                .store
                .ship(flagship)
                .map(|s| {
                    s.class.base_stats().production_cost * constants::SALVAGE_REFUND_PERCENT / 100
                })
                .unwrap_or(0);
            state.store.destroy_ship(flagship);
            claimed += 1;
            let house = state.store.house_mut(house_id).expect("house exists");
            house.treasury = house.treasury.saturating_add(refund);
            ctx.push_house_event(
                house_id,
                EventKind::GuildClaim {
                    house: house_id,
                    ship: flagship,
                    refund,
                },
            );
        }
        prune_empty_fleets(state, house_id);
        let house = state.store.house_mut(house_id).expect("house exists");
        house.flags.capital_excess_turns = 0;
        ctx.push_house_event(
            house_id,
            EventKind::CapacityEnforced {
                house: house_id,
                colony: None,
                disbanded: claimed,
            },
        );
    }
}

/// (crippled, attack, flagship) for every capital squadron of a house.
fn capital_squadrons(state: &GameState, house: HouseId) -> Vec<(bool, u32, ShipId)> {
    let mut out = Vec::new();
    for fleet_id in state.store.fleets_by_owner(house) {
        let Some(fleet) = state.store.fleet(fleet_id) else {
            continue;
        };
        for squadron in &fleet.squadrons {
            let Some(flagship) = state.store.ship(squadron.flagship) else {
                continue;
            };
            if flagship.class.base_stats().command_rating
                >= ec4x_common::CAPITAL_COMMAND_RATING
            {
                out.push((
                    flagship.hull == HullState::Crippled,
                    flagship.class.base_stats().attack,
                    squadron.flagship,
                ));
            }
        }
    }
    out
}
