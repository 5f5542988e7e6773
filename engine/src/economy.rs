//! Economy: colony output, growth, maintenance, and the Space Guild.
//!
//! All arithmetic is integer percent composition so the persisted state
//! stays float-free. Growth runs in the Production Phase; GCO/NCV and
//! the tax ledger run in the Income Phase, after conflict resolution.

use ec4x_common::{
    constants, Colony, EventKind, HouseId, HullState, PrestigeEvent, PrestigeReason, ShipId,
    StandingOrder, TechField,
};

use crate::state::GameState;
use crate::turn::TurnContext;

/// Gross colony output in PP for one colony at the given tax rate.
pub fn gross_colony_output(state: &GameState, colony: &Colony, tax: u8) -> u32 {
    let house = state.store.house(colony.owner);
    let (el, cst) = house
        .map(|h| (h.tech.level(TechField::EL), h.tech.level(TechField::CST)))
        .unwrap_or((0, 0));
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

    let raw = u64::from(colony.pu) * u64::from(constants::raw_index(colony.planet_class, colony.resources));

    let bonus = 100
        + constants::prod_growth_percent(tax)
        + constants::starbase_bonus_percent(operational_starbases);
    let industrial = u64::from(colony.iu)
        * u64::from(constants::el_mod_percent(el))
        * u64::from(constants::cst_mod_percent(cst))
        * u64::from(bonus)
        / 1_000_000;

    let mut gco = raw + industrial;
    if colony.blockaded {
        gco = gco * u64::from(constants::BLOCKADE_OUTPUT_PERCENT) / 100;
    }
    gco.min(u64::from(u32::MAX)) as u32
}

/// Income Phase: collect NCV, run the tax ledger, and mark blockades.
pub fn run_income(state: &mut GameState, ctx: &mut TurnContext) {
    refresh_blockades(state, ctx);

    for house_id in state.store.house_ids() {
        let Some(house) = state.store.house(house_id) else {
            continue;
        };
        if !house.is_active() {
            continue;
        }
        // Collapsed houses draw no income but still pay the ledger.
        let collapsed = house.flags.defensive_collapse;
        let house_tax = house.tax_rate;

        let mut gain: u64 = 0;
        let mut colony_count: i64 = 0;
        for colony_id in state.store.colonies_by_owner(house_id) {
            let Some(colony) = state.store.colony(colony_id) else {
                continue;
            };
            let tax = colony.effective_tax(house_tax);
            let gco = gross_colony_output(state, colony, tax);
            gain += u64::from(gco) * u64::from(tax) / 100;
            colony_count += 1;
        }
        if !collapsed {
            let house = state.store.house_mut(house_id).expect("house exists");
            house.treasury = house
                .treasury
                .saturating_add(gain.min(u64::from(u32::MAX)) as u32);
        }

        // Tax ledger: rolling-average penalty, current-rate incentive.
        let house = state.store.house_mut(house_id).expect("house exists");
        let average = house.push_tax_history(house_tax);
        let penalty = constants::tax_penalty(average);
        if penalty != 0 {
            ctx.prestige.push(PrestigeEvent {
                house: house_id,
                amount: penalty,
                reason: PrestigeReason::TaxPolicy,
                source: None,
            });
        }
        let (per_colony, _) = constants::tax_incentive(house_tax);
        if per_colony > 0 && colony_count > 0 {
            ctx.prestige.push(PrestigeEvent {
                house: house_id,
                amount: per_colony * colony_count,
                reason: PrestigeReason::TaxPolicy,
                source: None,
            });
        }
    }
}

/// Production Phase: passive IU growth and population growth.
pub fn run_growth(state: &mut GameState) {
    let colony_ids: Vec<_> = state.store.colonies().map(|c| c.id).collect();
    for colony_id in colony_ids {
        let Some(colony) = state.store.colony(colony_id) else {
            continue;
        };
        let Some(house) = state.store.house(colony.owner) else {
            continue;
        };
        let tax = colony.effective_tax(house.tax_rate);
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
        let sb_bonus = constants::starbase_bonus_percent(operational_starbases);
        let (_, growth_mult) = constants::tax_incentive(tax);

        // Passive industry: idle hands build factories when taxes leave
        // them anything to build with.
        let base = (colony.pu / constants::IU_GROWTH_PU_DIVISOR).max(1);
        let iu_growth = u64::from(base) * u64::from(100 - u32::from(tax.min(100))) * u64::from(100 + sb_bonus)
            / 10_000;

        // Population growth compounds on souls so PU stays derived.
        let pu = colony.pu;
        let pop_growth = {
            let g = u64::from(pu) * u64::from(constants::POP_GROWTH_PERCENT) * u64::from(growth_mult)
                * u64::from(100 + sb_bonus)
                / 1_000_000;
            g.max(1)
        };

        let colony = state.store.colony_mut(colony_id).expect("colony exists");
        colony.iu = colony.iu.saturating_add(iu_growth as u32);
        colony.souls = colony.souls.saturating_add(pop_growth * 1_000);
        colony.pu = ec4x_common::pu_from_souls(colony.souls);
    }
}

/// Production Phase: fleet maintenance, with the Space Guild claiming
/// hulls from houses that cannot pay.
pub fn run_maintenance(state: &mut GameState, ctx: &mut TurnContext) {
    for house_id in state.store.house_ids() {
        let Some(house) = state.store.house(house_id) else {
            continue;
        };
        if !house.is_active() {
            continue;
        }

        let mut due = maintenance_due(state, house_id);
        let treasury = state.store.house(house_id).expect("house exists").treasury;
        if due <= treasury {
            let house = state.store.house_mut(house_id).expect("house exists");
            house.treasury -= due;
            house.flags.maintenance_shortfall_turns = 0;
            continue;
        }

        // Shortfall: escalating prestige penalty, then the Guild takes
        // its pick until the books balance.
        let streak = {
            let house = state.store.house_mut(house_id).expect("house exists");
            house.flags.maintenance_shortfall_turns =
                house.flags.maintenance_shortfall_turns.saturating_add(1);
            house.flags.maintenance_shortfall_turns
        };
        let penalty = constants::SHORTFALL_BASE_PENALTY
            + constants::SHORTFALL_ESCALATION * i64::from(streak.saturating_sub(1));
        ctx.prestige.push(PrestigeEvent {
            house: house_id,
            amount: penalty,
            reason: PrestigeReason::MaintenanceShortfall,
            source: None,
        });
        ctx.push_house_event(
            house_id,
            EventKind::MaintenanceShortfall {
                house: house_id,
                deficit: due - treasury,
            },
        );
        log::warn!(
            "house {} short {} PP on maintenance (streak {})",
            house_id.0,
            due - treasury,
            streak
        );

        while due > state.store.house(house_id).expect("house exists").treasury {
            let Some(victim) = guild_claim_candidate(state, house_id) else {
                break;
            };
            let refund = {
                let ship = state.store.ship(victim).expect("candidate exists");
                ship.class.base_stats().production_cost * constants::SALVAGE_REFUND_PERCENT / 100
            };
            state.store.destroy_ship(victim);
            prune_empty_fleets(state, house_id);
            let house = state.store.house_mut(house_id).expect("house exists");
            house.treasury = house.treasury.saturating_add(refund);
            ctx.push_house_event(
                house_id,
                EventKind::GuildClaim {
                    house: house_id,
                    ship: victim,
                    refund,
                },
            );
            due = maintenance_due(state, house_id);
        }
        let house = state.store.house_mut(house_id).expect("house exists");
        house.treasury = house.treasury.saturating_sub(due);
    }
}

/// Total maintenance owed by a house this turn. Crippled hulls cost
/// half; mothballed fleets cost half again.
pub fn maintenance_due(state: &GameState, house: HouseId) -> u32 {
    let mut due: u32 = 0;
    for fleet_id in state.store.fleets_by_owner(house) {
        let Some(fleet) = state.store.fleet(fleet_id) else {
            continue;
        };
        let mothballed = fleet.order == StandingOrder::Mothball;
        for ship_id in fleet.ship_ids() {
            let Some(ship) = state.store.ship(ship_id) else {
                continue;
            };
            let stats = ship.class.base_stats();
            let mut cost =
                (stats.production_cost * stats.maintenance_percent).div_ceil(100);
            if ship.hull == HullState::Crippled {
                cost = cost.div_ceil(2);
            }
            if mothballed {
                cost = cost.div_ceil(2);
            }
            due = due.saturating_add(cost);
        }
    }
    due
}

/// The Guild claims crippled hulls first, then the lowest attack
/// strength, ties to the lowest id.
fn guild_claim_candidate(state: &GameState, house: HouseId) -> Option<ShipId> {
    let mut best: Option<(bool, u32, ShipId)> = None;
    for fleet_id in state.store.fleets_by_owner(house) {
        let Some(fleet) = state.store.fleet(fleet_id) else {
            continue;
        };
        for ship_id in fleet.ship_ids() {
            let Some(ship) = state.store.ship(ship_id) else {
                continue;
            };
            let key = (
                ship.hull != HullState::Crippled, // crippled sorts first
                ship.class.base_stats().attack,
                ship_id,
            );
            if best.map_or(true, |b| key < b) {
                best = Some(key);
            }
        }
    }
    best.map(|(_, _, id)| id)
}

/// Drop fleets that lost their last ship.
pub fn prune_empty_fleets(state: &mut GameState, house: HouseId) {
    let fleet_ids = state.store.fleets_by_owner(house);
    for fleet_id in fleet_ids {
        let empty = state
            .store
            .fleet(fleet_id)
            .map(|f| f.ship_ids().all(|s| state.store.ship(s).is_none()))
            .unwrap_or(false);
        if empty {
            state.store.destroy_fleet(fleet_id);
        }
    }
}

/// Recompute blockade flags from hostile fleets on station.
fn refresh_blockades(state: &mut GameState, ctx: &mut TurnContext) {
    let colony_ids: Vec<_> = state.store.colonies().map(|c| c.id).collect();
    for colony_id in colony_ids {
        let Some(colony) = state.store.colony(colony_id) else {
            continue;
        };
        let owner = colony.owner;
        let system = colony.system;
        let was = colony.blockaded;

        let mut blockading: Option<HouseId> = None;
        for fleet_id in state.store.fleets_in_system(system) {
            let Some(fleet) = state.store.fleet(fleet_id) else {
                continue;
            };
            if fleet.owner != owner
                && fleet.order == StandingOrder::Blockade
                && state.fleet_attack(fleet_id) > 0
            {
                blockading = Some(fleet.owner);
                break;
            }
        }

        let colony = state.store.colony_mut(colony_id).expect("colony exists");
        colony.blockaded = blockading.is_some();
        match (was, blockading) {
            (false, Some(by)) => ctx.push_public_event(EventKind::BlockadeEstablished {
                colony: colony_id,
                by,
            }),
            (true, None) => {
                ctx.push_public_event(EventKind::BlockadeLifted { colony: colony_id })
            }
            _ => {}
        }
    }
}
