//! The turn orchestrator: Command → Production → Conflict → Income.
//!
//! Everything submitted before the deadline is simultaneous; intra-phase
//! ordering comes from sorted ids, never from arrival order. Each phase
//! mutates a working copy owned by the caller, so a fatal invariant
//! breach leaves the last persisted state untouched.

use std::collections::BTreeMap;

use ec4x_battle::espionage::CovertIntent;
use ec4x_common::{
    constants, CombatReport, CommandPacket, EngineResult, Event, EventAudience, EventKind,
    HouseId, PrestigeEvent, TurnPhase,
};

use crate::movement::{PendingOp, PendingOps};
use crate::state::GameState;
use crate::{conflict, construction, economy, movement, prestige, research};

/// Mutable per-turn scratch shared by the phase functions.
pub struct TurnContext {
    pub turn: u32,
    pub phase: TurnPhase,
    pub events: Vec<Event>,
    pub prestige: Vec<PrestigeEvent>,
    pub combat_reports: Vec<CombatReport>,
    pub covert_intents: Vec<CovertIntent>,
}

impl TurnContext {
    pub fn new(turn: u32) -> Self {
        Self {
            turn,
            phase: TurnPhase::Command,
            events: Vec::new(),
            prestige: Vec::new(),
            combat_reports: Vec::new(),
            covert_intents: Vec::new(),
        }
    }

    pub fn push_public_event(&mut self, kind: EventKind) {
        self.events.push(Event {
            turn: self.turn,
            phase: self.phase,
            audience: EventAudience::Public,
            kind,
        });
    }

    pub fn push_house_event(&mut self, house: HouseId, kind: EventKind) {
        self.events.push(Event {
            turn: self.turn,
            phase: self.phase,
            audience: EventAudience::House(house),
            kind,
        });
    }

    pub fn push_participant_event(&mut self, houses: &[HouseId], kind: EventKind) {
        self.events.push(Event {
            turn: self.turn,
            phase: self.phase,
            audience: EventAudience::Houses(houses.to_vec()),
            kind,
        });
    }
}

/// Resolve one full turn against the submitted packets.
pub fn resolve_turn(
    state: &mut GameState,
    packets: &BTreeMap<HouseId, CommandPacket>,
) -> EngineResult<(Vec<Event>, Vec<CombatReport>)> {
    let mut ctx = TurnContext::new(state.turn);
    log::info!("resolving turn {} of game {}", state.turn, state.game_id);

    // ========== Command Phase ==========

    ctx.phase = TurnPhase::Command;
    let mut pending = PendingOps::default();
    for house_id in state.store.house_ids() {
        let active = state.store.house(house_id).is_some_and(|h| h.is_active());
        if !active {
            continue;
        }
        match packets.get(&house_id) {
            Some(packet) => {
                clear_autopilot(state, house_id, &mut ctx);
                apply_packet(state, house_id, packet, &mut pending, &mut ctx);
            }
            None => {
                mark_missed_submission(state, house_id, &mut ctx);
            }
        }
    }

    // ========== Production Phase ==========

    ctx.phase = TurnPhase::Production;
    construction::run_construction_tick(state, &mut ctx);
    economy::run_growth(state);
    economy::run_maintenance(state, &mut ctx);
    movement::run_movement(state, &pending, &mut ctx);
    construction::enforce_capacity(state, &mut ctx);
    state.store.verify_indexes(TurnPhase::Production)?;

    // ========== Conflict Phase ==========

    ctx.phase = TurnPhase::Conflict;
    conflict::run_conflict(state, &mut ctx);
    state.store.verify_indexes(TurnPhase::Conflict)?;

    // ========== Income Phase ==========

    ctx.phase = TurnPhase::Income;
    economy::run_income(state, &mut ctx);
    prestige::apply_prestige(state, &mut ctx);
    prestige::run_lifecycle(state, &mut ctx);
    prestige::tick_disinformation(state);
    state.store.verify_indexes(TurnPhase::Income)?;

    state.turn += 1;
    Ok((ctx.events, ctx.combat_reports))
}

/// Apply one house's packet. Individually invalid orders are skipped as
/// resolution anomalies — the packet as a whole was validated at
/// submission, but the world may have moved since.
fn apply_packet(
    state: &mut GameState,
    house_id: HouseId,
    packet: &CommandPacket,
    pending: &mut PendingOps,
    ctx: &mut TurnContext,
) {
    if let Some(rate) = packet.tax_rate {
        if let Some(house) = state.store.house_mut(house_id) {
            house.tax_rate = rate.min(100);
        }
    }
    for &(other, stance) in &packet.diplomacy {
        if other != house_id && state.store.house(other).is_some() {
            if let Some(house) = state.store.house_mut(house_id) {
                house.set_stance(other, stance);
            }
        }
    }

    // Espionage budgets are treasury transfers.
    let invest = packet.ebp_investment + packet.cip_investment;
    if invest > 0 {
        if let Some(house) = state.store.house_mut(house_id) {
            if house.treasury >= invest {
                house.treasury -= invest;
                house.espionage.ebp += packet.ebp_investment;
                house.espionage.cip += packet.cip_investment;
            }
        }
    }

    if let Err(err) = research::fund_pools(state, house_id, packet.research) {
        log::debug!("house {} research allocation rejected: {err}", house_id.0);
    }
    for &field in &packet.tech_orders {
        if let Err(err) = research::purchase_tech(state, house_id, field, ctx) {
            log::debug!("house {} tech order rejected: {err}", house_id.0);
        }
    }
    research::advance_science_level(state, house_id, ctx);

    for order in &packet.builds {
        if let Err(err) = construction::queue_build(state, house_id, order) {
            log::debug!("house {} build rejected: {err}", house_id.0);
        }
    }
    for order in &packet.repairs {
        if let Err(err) = construction::queue_repair(state, house_id, order) {
            log::debug!("house {} repair rejected: {err}", house_id.0);
        }
    }
    for &project in &packet.cancellations {
        if let Err(err) = construction::cancel_project(state, house_id, project, ctx) {
            log::debug!("house {} cancellation rejected: {err}", house_id.0);
        }
    }
    for order in &packet.commissions {
        if let Err(err) = movement::commission_squadrons(state, house_id, order) {
            log::debug!("house {} commission rejected: {err}", house_id.0);
        }
    }
    for request in &packet.fleet_orders {
        match movement::apply_fleet_order(state, house_id, request) {
            Ok(Some(PendingOp::Join { source, target })) => pending.joins.push((source, target)),
            Ok(Some(PendingOp::Salvage(fleet))) => pending.salvages.push(fleet),
            Ok(Some(PendingOp::Colonize(fleet))) => pending.colonizations.push(fleet),
            Ok(None) => {}
            Err(err) => log::debug!("house {} fleet order rejected: {err}", house_id.0),
        }
    }

    if let Some(espionage) = &packet.espionage {
        let cost = espionage.action.ebp_cost();
        let funded = state
            .store
            .house_mut(house_id)
            .map(|h| {
                if h.espionage.ebp >= cost {
                    h.espionage.ebp -= cost;
                    true
                } else {
                    false
                }
            })
            .unwrap_or(false);
        if funded && state.store.house(espionage.target).is_some() {
            let target_colony = state
                .store
                .colonies_by_owner(espionage.target)
                .into_iter()
                .filter_map(|id| state.store.colony(id))
                .max_by_key(|c| (c.iu, std::cmp::Reverse(c.id)))
                .map(|c| c.id);
            ctx.covert_intents.push(CovertIntent {
                attacker: house_id,
                order: espionage.clone(),
                target_colony,
            });
        }
    }
}

fn clear_autopilot(state: &mut GameState, house_id: HouseId, ctx: &mut TurnContext) {
    let Some(house) = state.store.house_mut(house_id) else {
        return;
    };
    house.flags.missed_turns = 0;
    if house.flags.autopilot {
        house.flags.autopilot = false;
        ctx.push_house_event(house_id, EventKind::AutopilotCleared { house: house_id });
    }
}

/// A silent house drifts toward autopilot; once engaged, its standing
/// orders keep running but nothing new is issued.
fn mark_missed_submission(state: &mut GameState, house_id: HouseId, ctx: &mut TurnContext) {
    let Some(house) = state.store.house_mut(house_id) else {
        return;
    };
    house.flags.missed_turns = house.flags.missed_turns.saturating_add(1);
    if house.flags.missed_turns >= constants::AUTOPILOT_TURNS && !house.flags.autopilot {
        house.flags.autopilot = true;
        ctx.push_public_event(EventKind::AutopilotEngaged { house: house_id });
        log::info!("house {} on autopilot", house_id.0);
    }
}
