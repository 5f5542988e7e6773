//! End-to-end scenario tests: combat prestige accounting, colonization
//! contests, and the fog-of-war contract around espionage.

use std::collections::BTreeMap;

use ec4x_common::{
    CommandPacket, DiplomaticStance, EventKind, FleetCommandKind, FleetOrderRequest, GameConfig,
    HouseId, IntelPayload, IntelQuality, IntelSubject, PrestigeReason, ShipClass, Squadron,
    StandingOrder,
};
use ec4x_engine::api::bootstrap_state;
use ec4x_engine::turn::resolve_turn;
use ec4x_engine::view::project_view;

fn combat_reasons() -> [PrestigeReason; 3] {
    [
        PrestigeReason::CombatKill,
        PrestigeReason::CombatLoss,
        PrestigeReason::RetreatForced,
    ]
}

#[test]
fn combat_prestige_is_zero_sum() {
    let mut state = bootstrap_state(1, GameConfig::standard(2), 42);
    let houses = state.store.house_ids();
    let (a, b) = (houses[0], houses[1]);
    state
        .store
        .house_mut(a)
        .unwrap()
        .set_stance(b, DiplomaticStance::Enemy);
    state
        .store
        .house_mut(b)
        .unwrap()
        .set_stance(a, DiplomaticStance::Enemy);

    // Throw both starting fleets into the hub.
    let hub = state.map.hub();
    for house in [a, b] {
        for fleet in state.store.fleets_by_owner(house) {
            state.store.move_fleet(fleet, hub);
        }
    }

    let (events, reports) = resolve_turn(&mut state, &BTreeMap::new()).unwrap();
    assert!(!reports.is_empty(), "a battle must have been fought");

    let combat_sum: i64 = events
        .iter()
        .filter_map(|e| match e.kind {
            EventKind::PrestigeChanged { amount, reason, .. }
                if combat_reasons().contains(&reason) =>
            {
                Some(amount)
            }
            _ => None,
        })
        .sum();
    assert_eq!(combat_sum, 0, "combat prestige must be zero-sum");
}

#[test]
fn contested_colonization_has_one_winner_and_losers_keep_their_etac() {
    let mut state = bootstrap_state(1, GameConfig::standard(2), 5);
    let houses = state.store.house_ids();
    let hub = state.map.hub();
    let mut fleet_of = BTreeMap::new();
    for &house in &houses {
        let fleet = state.store.fleets_by_owner(house)[0];
        state.store.move_fleet(fleet, hub);
        fleet_of.insert(house, fleet);
    }

    let mut packets: BTreeMap<HouseId, CommandPacket> = BTreeMap::new();
    for &house in &houses {
        packets.insert(
            house,
            CommandPacket {
                fleet_orders: vec![FleetOrderRequest {
                    fleet: fleet_of[&house],
                    command: FleetCommandKind::Colonize,
                    target_system: Some(hub),
                    target_fleet: None,
                    roe: None,
                }],
                ..Default::default()
            },
        );
    }
    let (events, _) = resolve_turn(&mut state, &packets).unwrap();

    // Exactly one colony, owned by the tie-break winner (lowest house).
    let colony = state.store.colony_by_system(hub).expect("hub colonized");
    let winner = state.store.colony(colony).unwrap().owner;
    assert_eq!(winner, houses[0]);
    assert!(events
        .iter()
        .any(|e| matches!(e.kind, EventKind::ColonizationContested { .. })));
    assert!(events.iter().any(
        |e| matches!(e.kind, EventKind::ColonizationFailed { house, .. } if house == houses[1])
    ));

    // The loser's ETAC is still aboard and still loaded.
    let loser_fleet = fleet_of[&houses[1]];
    let loaded_etacs = state
        .store
        .fleet(loser_fleet)
        .unwrap()
        .ship_ids()
        .filter(|id| {
            state.store.ship(*id).is_some_and(|s| {
                s.class == ShipClass::Etac && s.cargo.is_some()
            })
        })
        .count();
    assert_eq!(loaded_etacs, 1);
}

#[test]
fn colonizing_an_occupied_system_fails_without_refund() {
    let mut state = bootstrap_state(1, GameConfig::standard(2), 6);
    let houses = state.store.house_ids();
    let (a, b) = (houses[0], houses[1]);
    let a_home = state.store.house(a).unwrap().home_system;
    let fleet = state.store.fleets_by_owner(b)[0];
    state.store.move_fleet(fleet, a_home);

    let mut packets = BTreeMap::new();
    packets.insert(
        b,
        CommandPacket {
            fleet_orders: vec![FleetOrderRequest {
                fleet,
                command: FleetCommandKind::Colonize,
                target_system: Some(a_home),
                target_fleet: None,
                roe: None,
            }],
            ..Default::default()
        },
    );
    let (events, _) = resolve_turn(&mut state, &packets).unwrap();

    assert_eq!(
        state.store.colony_by_system(a_home).map(|c| state
            .store
            .colony(c)
            .unwrap()
            .owner),
        Some(a),
        "the standing colony is untouched"
    );
    assert!(events
        .iter()
        .any(|e| matches!(e.kind, EventKind::ColonizationFailed { house, .. } if house == b)));
    // The ETAC was not consumed by the failed claim.
    let loaded_etacs = state
        .store
        .fleet(fleet)
        .unwrap()
        .ship_ids()
        .filter(|id| {
            state
                .store
                .ship(*id)
                .is_some_and(|s| s.class == ShipClass::Etac && s.cargo.is_some())
        })
        .count();
    assert_eq!(loaded_etacs, 1);
}

#[test]
fn successful_spy_mission_reports_to_the_attacker_only() {
    let mut state = bootstrap_state(1, GameConfig::standard(2), 8);
    let houses = state.store.house_ids();
    let (a, b) = (houses[0], houses[1]);
    let b_home = state.store.house(b).unwrap().home_system;

    // Clear B's home of ELI assets: park its starting fleet at the hub.
    for fleet in state.store.fleets_by_owner(b) {
        state.store.move_fleet(fleet, state.map.hub());
    }

    // Split A's scout into its own fleet over B's homeworld.
    let a_fleet_id = state.store.fleets_by_owner(a)[0];
    let scout = {
        let fleet = state.store.fleet(a_fleet_id).unwrap();
        fleet
            .ship_ids()
            .find(|id| {
                state
                    .store
                    .ship(*id)
                    .is_some_and(|s| s.class == ShipClass::Scout)
            })
            .unwrap()
    };
    let spy_fleet = ec4x_common::FleetId(state.store.mint.next());
    {
        let fleet = state.store.fleet_mut(a_fleet_id).unwrap();
        fleet.take_squadron(scout).expect("scout squadron");
    }
    let mut fleet = ec4x_common::Fleet::new(spy_fleet, a, b_home);
    fleet.squadrons.push(Squadron::solo(scout));
    fleet.order = StandingOrder::SpyColony { target: b_home };
    state.store.create_fleet(fleet);
    state.store.ship_mut(scout).unwrap().fleet = Some(spy_fleet);

    let (events, _) = resolve_turn(&mut state, &BTreeMap::new()).unwrap();

    // The scout is consumed either way.
    assert!(state.store.ship(scout).is_none());

    // A holds a Spy-quality report on B's homeworld colony.
    let b_colony = state.store.colony_by_system(b_home).unwrap();
    let report = state
        .store
        .house(a)
        .unwrap()
        .intel
        .get(&IntelSubject::Colony(b_colony))
        .expect("spy report filed");
    assert_eq!(report.quality, IntelQuality::Spy);
    match &report.payload {
        IntelPayload::Colony(intel) => {
            assert!(intel.population_units > 0);
            assert!(intel.tech_sl.is_some(), "spy quality reads tech");
        }
        other => panic!("wrong payload: {other:?}"),
    }

    // B saw nothing: no unusual-activity, no scout-lost in its feed.
    let b_view = project_view(&state, b, &events);
    assert!(!b_view.events.iter().any(|e| matches!(
        e.kind,
        EventKind::UnusualActivity { .. } | EventKind::ScoutLost { .. }
    )));
}
