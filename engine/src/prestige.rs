//! Prestige accounting and house lifecycle.
//!
//! Prestige events are the only way prestige moves: every resolver emits
//! `{house, amount, reason}` and this module applies them after dynamic
//! scaling. Lifecycle evaluation (collapse, elimination, autopilot
//! handling, victory) closes the Income Phase.

use ec4x_common::{
    constants, CargoKind, DiplomaticStance, Event, EventAudience, EventKind, HouseId,
    StandingOrder, VictoryCondition,
};

use crate::state::GameState;
use crate::turn::TurnContext;

/// Apply accumulated prestige events with the map-size scaling.
pub fn apply_prestige(state: &mut GameState, ctx: &mut TurnContext) {
    let events = std::mem::take(&mut ctx.prestige);
    for event in events {
        let scaled = state.config.scale_prestige(event.amount);
        if let Some(house) = state.store.house_mut(event.house) {
            house.prestige += scaled;
        }
        ctx.events.push(Event {
            turn: ctx.turn,
            phase: ctx.phase,
            audience: EventAudience::House(event.house),
            kind: EventKind::PrestigeChanged {
                house: event.house,
                amount: scaled,
                reason: event.reason,
            },
        });
    }
}

/// Income Phase closing: collapse, elimination, and victory checks.
pub fn run_lifecycle(state: &mut GameState, ctx: &mut TurnContext) {
    evaluate_collapse(state, ctx);
    evaluate_elimination(state, ctx);
    evaluate_victory(state, ctx);
}

/// Three consecutive Income Phases in the red lock a house into
/// defensive collapse; climbing back out clears it.
fn evaluate_collapse(state: &mut GameState, ctx: &mut TurnContext) {
    for house_id in state.store.house_ids() {
        let Some(house) = state.store.house_mut(house_id) else {
            continue;
        };
        if !house.is_active() {
            continue;
        }
        let mut collapsed_now = false;
        if house.prestige < 0 {
            house.flags.negative_prestige_turns =
                house.flags.negative_prestige_turns.saturating_add(1);
            if house.flags.negative_prestige_turns >= constants::COLLAPSE_TURNS
                && !house.flags.defensive_collapse
            {
                house.flags.defensive_collapse = true;
                collapsed_now = true;
                ctx.push_public_event(EventKind::HouseCollapsed { house: house_id });
                log::warn!("house {} entered defensive collapse", house_id.0);
            }
        } else {
            house.flags.negative_prestige_turns = 0;
            if house.flags.defensive_collapse {
                house.flags.defensive_collapse = false;
                ctx.push_public_event(EventKind::HouseRecovered { house: house_id });
            }
        }
        if collapsed_now {
            recall_offensive_fleets(state, house_id);
        }
    }
}

/// Collapse revokes offensive standing orders on the spot; blockades
/// and invasion runs turn for home.
fn recall_offensive_fleets(state: &mut GameState, house: HouseId) {
    for fleet_id in state.store.fleets_by_owner(house) {
        let offensive = state
            .store
            .fleet(fleet_id)
            .is_some_and(|f| f.order.is_provocative());
        if offensive {
            if let Some(fleet) = state.store.fleet_mut(fleet_id) {
                fleet.order = StandingOrder::SeekHome { path: Vec::new() };
            }
        }
    }
}

/// A house with no colonies and no loaded marines aboard surviving
/// transports is out of the game.
fn evaluate_elimination(state: &mut GameState, ctx: &mut TurnContext) {
    for house_id in state.store.house_ids() {
        let Some(house) = state.store.house(house_id) else {
            continue;
        };
        if !house.is_active() {
            continue;
        }
        if !state.store.colonies_by_owner(house_id).is_empty() {
            continue;
        }
        let has_invasion_force = state
            .store
            .fleets_by_owner(house_id)
            .iter()
            .filter_map(|f| state.store.fleet(*f))
            .flat_map(|f| f.ship_ids().collect::<Vec<_>>())
            .filter_map(|id| state.store.ship(id))
            .any(|ship| {
                ship.cargo
                    .is_some_and(|c| c.kind == CargoKind::Marines && c.quantity > 0)
            });
        if has_invasion_force {
            // Last stand: a loaded invasion force keeps the house alive.
            continue;
        }
        let house = state.store.house_mut(house_id).expect("house exists");
        house.flags.eliminated = true;
        ctx.push_public_event(EventKind::HouseEliminated { house: house_id });
        log::info!("house {} eliminated", house_id.0);
    }
}

/// Victory: prestige threshold, last house standing, or turn limit.
/// With exactly two active houses left, the gloves come off for good.
fn evaluate_victory(state: &mut GameState, ctx: &mut TurnContext) {
    if state.victor.is_some() {
        return;
    }
    let active: Vec<HouseId> = state
        .store
        .houses()
        .filter(|h| h.is_active())
        .map(|h| h.id)
        .collect();

    if active.len() == 2 {
        force_final_war(state, active[0], active[1]);
    }

    if active.len() == 1 {
        declare_victory(state, ctx, active[0], VictoryCondition::LastHouseStanding);
        return;
    }
    if let Some(threshold) = state.config.prestige_victory_threshold {
        let leader = state
            .store
            .houses()
            .filter(|h| h.is_active() && h.prestige >= threshold)
            .max_by_key(|h| (h.prestige, std::cmp::Reverse(h.id)));
        if let Some(leader) = leader {
            let id = leader.id;
            declare_victory(state, ctx, id, VictoryCondition::PrestigeThreshold);
            return;
        }
    }
    if let Some(limit) = state.config.turn_limit {
        if state.turn >= limit {
            let leader = state
                .store
                .houses()
                .filter(|h| h.is_active())
                .max_by_key(|h| (h.prestige, std::cmp::Reverse(h.id)));
            if let Some(leader) = leader {
                let id = leader.id;
                declare_victory(state, ctx, id, VictoryCondition::TurnLimit);
            }
        }
    }
}

fn declare_victory(
    state: &mut GameState,
    ctx: &mut TurnContext,
    house: HouseId,
    condition: VictoryCondition,
) {
    state.victor = Some(house);
    ctx.push_public_event(EventKind::VictoryAchieved { house, condition });
    log::info!("house {} wins ({condition:?})", house.0);
}

/// Endgame lock: the last two houses are Enemies, permanently.
fn force_final_war(state: &mut GameState, a: HouseId, b: HouseId) {
    if let Some(house) = state.store.house_mut(a) {
        house.set_stance(b, DiplomaticStance::Enemy);
    }
    if let Some(house) = state.store.house_mut(b) {
        house.set_stance(a, DiplomaticStance::Enemy);
    }
}

/// Expire disinformation campaigns at the end of the turn.
pub fn tick_disinformation(state: &mut GameState) {
    state.disinformation.retain(|_, turns| {
        *turns = turns.saturating_sub(1);
        *turns > 0
    });
}
