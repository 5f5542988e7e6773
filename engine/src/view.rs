//! Fog-of-war projection.
//!
//! Each house gets a `PlayerView`: its own entities exactly, visible
//! systems where it has presence, intelligence for everything else, the
//! public leaderboard, and this turn's filtered events. Nothing ever
//! crosses between houses except through these views.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use ec4x_common::{
    Colony, Event, Fleet, HouseId, IntelPayload, IntelQuality, IntelReport, IntelSubject, Ship,
    ShipClass, StandingOrder, SystemId,
};

use crate::conflict::build_colony_report;
use crate::state::GameState;

/// One row of the public leaderboard.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LeaderboardRow {
    pub house: HouseId,
    pub name: String,
    pub prestige: i64,
    pub eliminated: bool,
    pub collapsed: bool,
}

/// Everything one house is allowed to see.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerView {
    pub turn: u32,
    pub house: HouseId,
    pub treasury: u32,
    pub prestige: i64,
    pub tax_rate: u8,
    pub science_level: u8,
    /// Own colonies, exact.
    pub colonies: Vec<Colony>,
    /// Own fleets, exact.
    pub fleets: Vec<Fleet>,
    /// Own ships, exact.
    pub ships: Vec<Ship>,
    /// Systems under direct observation this turn.
    pub visible_systems: Vec<SystemId>,
    /// Everything the house knows about the rest of the map, stale or
    /// fresh; `snapshot_turn` carries the age.
    pub intel: Vec<IntelReport>,
    pub leaderboard: Vec<LeaderboardRow>,
    pub house_count: u8,
    /// This turn's events, filtered by audience.
    pub events: Vec<Event>,
}

/// The per-turn change feed for one house, diffed against its previous
/// view snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ViewDelta {
    pub turn: u32,
    pub house: HouseId,
    pub events: Vec<Event>,
    /// Reports that are new or newer than the previous snapshot.
    pub intel_updates: Vec<IntelReport>,
    pub leaderboard: Vec<LeaderboardRow>,
    /// Systems that became visible since last turn.
    pub systems_revealed: Vec<SystemId>,
    /// Systems that dropped out of view.
    pub systems_lost: Vec<SystemId>,
}

/// Build the current view for one house.
pub fn project_view(state: &GameState, house_id: HouseId, events: &[Event]) -> PlayerView {
    let house = state.store.house(house_id);
    let visible = visible_systems(state, house_id);

    let colonies: Vec<Colony> = state
        .store
        .colonies_by_owner(house_id)
        .into_iter()
        .filter_map(|id| state.store.colony(id).cloned())
        .collect();
    let fleets: Vec<Fleet> = state
        .store
        .fleets_by_owner(house_id)
        .into_iter()
        .filter_map(|id| state.store.fleet(id).cloned())
        .collect();
    let ships: Vec<Ship> = state
        .store
        .ships()
        .filter(|s| s.owner == house_id)
        .cloned()
        .collect();

    // Fresh visual contacts merge over the stored intel database.
    let mut intel: BTreeMap<IntelSubject, IntelReport> = house
        .map(|h| h.intel.clone())
        .unwrap_or_default();
    for report in visual_contacts(state, house_id, &visible) {
        match intel.get(&report.subject) {
            Some(existing) if existing.snapshot_turn > report.snapshot_turn => {}
            Some(existing)
                if existing.snapshot_turn == report.snapshot_turn
                    && existing.quality > report.quality => {}
            _ => {
                intel.insert(report.subject, report);
            }
        }
    }

    let leaderboard = leaderboard(state);
    let house_count = state.store.houses().count() as u8;
    let filtered_events: Vec<Event> = events
        .iter()
        .filter(|e| e.audience.includes(house_id))
        .cloned()
        .collect();

    PlayerView {
        turn: state.turn,
        house: house_id,
        treasury: house.map(|h| h.treasury).unwrap_or(0),
        prestige: house.map(|h| h.prestige).unwrap_or(0),
        tax_rate: house.map(|h| h.tax_rate).unwrap_or(0),
        science_level: house.map(|h| h.tech.sl).unwrap_or(0),
        colonies,
        fleets,
        ships,
        visible_systems: visible.into_iter().collect(),
        intel: intel.into_values().collect(),
        leaderboard,
        house_count,
        events: filtered_events,
    }
}

/// Diff a fresh view against the previous snapshot.
pub fn diff_views(previous: Option<&PlayerView>, current: &PlayerView) -> ViewDelta {
    let old_intel: BTreeMap<IntelSubject, u32> = previous
        .map(|v| {
            v.intel
                .iter()
                .map(|r| (r.subject, r.snapshot_turn))
                .collect()
        })
        .unwrap_or_default();
    let intel_updates = current
        .intel
        .iter()
        .filter(|r| {
            old_intel
                .get(&r.subject)
                .map_or(true, |&turn| r.snapshot_turn > turn)
        })
        .cloned()
        .collect();

    let old_visible: BTreeSet<SystemId> = previous
        .map(|v| v.visible_systems.iter().copied().collect())
        .unwrap_or_default();
    let new_visible: BTreeSet<SystemId> = current.visible_systems.iter().copied().collect();

    ViewDelta {
        turn: current.turn,
        house: current.house,
        events: current.events.clone(),
        intel_updates,
        leaderboard: current.leaderboard.clone(),
        systems_revealed: new_visible.difference(&old_visible).copied().collect(),
        systems_lost: old_visible.difference(&new_visible).copied().collect(),
    }
}

/// Systems with the house's fleets or colonies this turn.
fn visible_systems(state: &GameState, house_id: HouseId) -> BTreeSet<SystemId> {
    let mut visible = BTreeSet::new();
    for colony_id in state.store.colonies_by_owner(house_id) {
        if let Some(colony) = state.store.colony(colony_id) {
            visible.insert(colony.system);
        }
    }
    for fleet_id in state.store.fleets_by_owner(house_id) {
        if let Some(fleet) = state.store.fleet(fleet_id) {
            visible.insert(fleet.system);
            // The trail was scouted in passing.
            visible.extend(fleet.trail.iter().copied());
        }
    }
    visible
}

/// Visual-quality reports for foreign presence in visible systems:
/// composition and apparent orders only — no tech, no hull states, no
/// cargo manifests.
fn visual_contacts(
    state: &GameState,
    house_id: HouseId,
    visible: &BTreeSet<SystemId>,
) -> Vec<IntelReport> {
    let mut reports = Vec::new();
    for &system in visible {
        for fleet_id in state.store.fleets_in_system(system) {
            let Some(fleet) = state.store.fleet(fleet_id) else {
                continue;
            };
            if fleet.owner == house_id {
                continue;
            }
            let mut composition: BTreeMap<ShipClass, u32> = BTreeMap::new();
            let mut transports = 0u32;
            for ship_id in fleet.ship_ids() {
                if let Some(ship) = state.store.ship(ship_id) {
                    *composition.entry(ship.class).or_default() += 1;
                    if ship.class.is_spacelift() {
                        transports += 1;
                    }
                }
            }
            reports.push(IntelReport::new(
                IntelSubject::Fleet(fleet_id),
                IntelQuality::Visual,
                state.turn,
                IntelPayload::Fleet(ec4x_common::FleetIntel {
                    owner: Some(fleet.owner),
                    system: Some(system),
                    composition,
                    transports,
                    observed_order: Some(order_name(&fleet.order).to_string()),
                }),
            ));
        }
        // A foreign colony under observation yields a visual survey.
        if let Some(colony) = state
            .store
            .colony_by_system(system)
            .and_then(|id| state.store.colony(id))
        {
            if colony.owner != house_id {
                let mut report = build_colony_report(state, colony, IntelQuality::Visual);
                if let IntelPayload::Colony(ref mut payload) = report.payload {
                    // Line-of-sight never reads internals.
                    payload.tech_sl = None;
                    payload.industrial_units = 0;
                }
                reports.push(report);
            }
        }
    }
    reports
}

/// The order as an outside observer would classify it.
fn order_name(order: &StandingOrder) -> &'static str {
    match order {
        StandingOrder::Hold => "holding",
        StandingOrder::Move { .. } => "underway",
        StandingOrder::SeekHome { .. } => "withdrawing",
        StandingOrder::Patrol => "patrolling",
        StandingOrder::GuardStarbase | StandingOrder::GuardColony => "guarding",
        StandingOrder::Blockade => "blockading",
        StandingOrder::Bombard | StandingOrder::Invade | StandingOrder::Blitz => "attacking",
        StandingOrder::Reserve => "in reserve",
        StandingOrder::Mothball => "mothballed",
        StandingOrder::SpyColony { .. }
        | StandingOrder::SpySystem { .. }
        | StandingOrder::HackStarbase { .. } => "loitering",
    }
}

/// Public data: prestige standings and lifecycle flags.
pub fn leaderboard(state: &GameState) -> Vec<LeaderboardRow> {
    state
        .store
        .houses()
        .map(|h| LeaderboardRow {
            house: h.id,
            name: h.name.clone(),
            prestige: h.prestige,
            eliminated: h.flags.eliminated,
            collapsed: h.flags.defensive_collapse,
        })
        .collect()
}
