//! House lifecycle: autopilot, defensive collapse, elimination, and the
//! last-stand rule.

use std::collections::BTreeMap;

use ec4x_common::{
    Cargo, CargoKind, CommandPacket, EventKind, GameConfig, HouseId, ShipClass, StandingOrder,
};
use ec4x_engine::api::bootstrap_state;
use ec4x_engine::movement::{run_movement, PendingOps};
use ec4x_engine::prestige;
use ec4x_engine::turn::{resolve_turn, TurnContext};
use ec4x_engine::Engine;

#[test]
fn three_missed_turns_engage_autopilot_and_submission_clears_it() {
    let mut engine = Engine::new();
    let (game_id, state, _) = engine.new_game(GameConfig::standard(3), 11);
    let houses = state.store.house_ids();
    let silent = houses[0];

    // The silent house never submits for three turns.
    for turn in 1..=3 {
        for &house in houses.iter().skip(1) {
            engine
                .submit_commands(game_id, house, turn, CommandPacket::default())
                .unwrap();
        }
        let closed = engine.close_turn(game_id, turn).unwrap();
        let engaged = closed
            .result
            .events
            .iter()
            .any(|e| matches!(e.kind, EventKind::AutopilotEngaged { house } if house == silent));
        if turn < 3 {
            assert!(!engaged, "autopilot must wait for the third miss");
        } else {
            assert!(engaged, "third miss engages autopilot");
        }
    }
    assert!(
        engine
            .state(game_id)
            .unwrap()
            .store
            .house(silent)
            .unwrap()
            .flags
            .autopilot
    );

    // Submitting again clears it in the same Command Phase.
    for &house in &houses {
        engine
            .submit_commands(game_id, house, 4, CommandPacket::default())
            .unwrap();
    }
    let closed = engine.close_turn(game_id, 4).unwrap();
    assert!(closed
        .result
        .events
        .iter()
        .any(|e| matches!(e.kind, EventKind::AutopilotCleared { house } if house == silent)));
    assert!(
        !engine
            .state(game_id)
            .unwrap()
            .store
            .house(silent)
            .unwrap()
            .flags
            .autopilot
    );
}

#[test]
fn collapse_counter_starts_below_zero_and_resets_on_recovery() {
    let mut state = bootstrap_state(1, GameConfig::standard(2), 3);
    let house = state.store.house_ids()[0];

    // One Income Phase in the red starts the counter.
    state.store.house_mut(house).unwrap().prestige = -1;
    let mut ctx = TurnContext::new(state.turn);
    prestige::run_lifecycle(&mut state, &mut ctx);
    assert_eq!(
        state
            .store
            .house(house)
            .unwrap()
            .flags
            .negative_prestige_turns,
        1
    );
    assert!(!state.store.house(house).unwrap().flags.defensive_collapse);

    // Bouncing back to zero or better resets it.
    state.store.house_mut(house).unwrap().prestige = 0;
    let mut ctx = TurnContext::new(state.turn);
    prestige::run_lifecycle(&mut state, &mut ctx);
    assert_eq!(
        state
            .store
            .house(house)
            .unwrap()
            .flags
            .negative_prestige_turns,
        0
    );

    // Three consecutive phases in the red trigger the collapse.
    state.store.house_mut(house).unwrap().prestige = -5;
    for _ in 0..3 {
        let mut ctx = TurnContext::new(state.turn);
        prestige::run_lifecycle(&mut state, &mut ctx);
    }
    assert!(state.store.house(house).unwrap().flags.defensive_collapse);
}

#[test]
fn loaded_marines_keep_a_colonyless_house_alive() {
    let mut state = bootstrap_state(1, GameConfig::standard(2), 9);
    let house = state.store.house_ids()[0];

    // Strip the house of its colonies, then arm one transport.
    for colony in state.store.colonies_by_owner(house) {
        state.store.destroy_colony(colony);
    }
    let fleet = state.store.fleets_by_owner(house)[0];
    let transport = {
        let fleet_ref = state.store.fleet(fleet).unwrap();
        fleet_ref
            .ship_ids()
            .find(|id| {
                state
                    .store
                    .ship(*id)
                    .is_some_and(|s| s.class == ShipClass::Etac)
            })
            .unwrap()
    };
    state.store.ship_mut(transport).unwrap().cargo = Some(Cargo {
        kind: CargoKind::Marines,
        quantity: 2,
    });

    let mut ctx = TurnContext::new(state.turn);
    prestige::run_lifecycle(&mut state, &mut ctx);
    assert!(
        state.store.house(house).unwrap().is_active(),
        "an invasion force in being is a last stand, not an elimination"
    );

    // Dump the marines and the house is done.
    state.store.ship_mut(transport).unwrap().cargo = None;
    let mut ctx = TurnContext::new(state.turn);
    prestige::run_lifecycle(&mut state, &mut ctx);
    assert!(!state.store.house(house).unwrap().is_active());
}

#[test]
fn collapse_forces_every_fleet_home_regardless_of_standing_order() {
    let mut state = bootstrap_state(1, GameConfig::standard(2), 31);
    let house = state.store.house_ids()[0];
    state.store.house_mut(house).unwrap().flags.defensive_collapse = true;

    // Park the fleet in neutral space under a Blockade order. The ETAC
    // is scuttled first so no lane class can strand the fleet.
    let fleet = state.store.fleets_by_owner(house)[0];
    let etac = {
        let fleet_ref = state.store.fleet(fleet).unwrap();
        fleet_ref
            .ship_ids()
            .find(|id| {
                state
                    .store
                    .ship(*id)
                    .is_some_and(|s| s.class == ShipClass::Etac)
            })
            .unwrap()
    };
    state.store.destroy_ship(etac);
    let hub = state.map.hub();
    state.store.move_fleet(fleet, hub);
    state.store.fleet_mut(fleet).unwrap().order = StandingOrder::Blockade;

    let mut ctx = TurnContext::new(state.turn);
    run_movement(&mut state, &PendingOps::default(), &mut ctx);

    let fleet_ref = state.store.fleet(fleet).unwrap();
    assert_ne!(fleet_ref.system, hub, "a collapsed navy must head home");
    assert!(
        matches!(fleet_ref.order, StandingOrder::SeekHome { .. }),
        "the blockade is abandoned for the trip home"
    );
}

#[test]
fn collapse_revokes_offensive_standing_orders() {
    let mut state = bootstrap_state(1, GameConfig::standard(3), 37);
    let house = state.store.house_ids()[0];
    let fleet = state.store.fleets_by_owner(house)[0];
    state.store.fleet_mut(fleet).unwrap().order = StandingOrder::Invade;

    // Third consecutive Income Phase in the red trips the collapse.
    {
        let h = state.store.house_mut(house).unwrap();
        h.prestige = -5;
        h.flags.negative_prestige_turns = 2;
    }
    let mut ctx = TurnContext::new(state.turn);
    prestige::run_lifecycle(&mut state, &mut ctx);

    assert!(state.store.house(house).unwrap().flags.defensive_collapse);
    assert!(
        matches!(
            state.store.fleet(fleet).unwrap().order,
            StandingOrder::SeekHome { .. }
        ),
        "the invasion run is called off the turn collapse bites"
    );
}

#[test]
fn turn_limit_crowns_the_prestige_leader() {
    let mut state = bootstrap_state(1, GameConfig::standard(3), 21);
    let houses = state.store.house_ids();
    state.store.house_mut(houses[1]).unwrap().prestige = 500;
    state.turn = state.config.turn_limit.unwrap();

    let mut ctx = TurnContext::new(state.turn);
    prestige::run_lifecycle(&mut state, &mut ctx);
    assert_eq!(state.victor, Some(houses[1]));
}

#[test]
fn unknown_houses_are_rejected_at_submission() {
    let mut engine = Engine::new();
    let (game_id, _, _) = engine.new_game(GameConfig::standard(2), 13);
    let err = engine
        .submit_commands(game_id, HouseId(9999), 1, CommandPacket::default())
        .unwrap_err();
    assert_eq!(err.code, ec4x_common::ValidationCode::UnknownEntity);
}

#[test]
fn eliminated_houses_are_skipped_by_the_pipeline() {
    let mut state = bootstrap_state(1, GameConfig::standard(3), 17);
    let house = state.store.house_ids()[0];
    state.store.house_mut(house).unwrap().flags.eliminated = true;

    let mut packets: BTreeMap<HouseId, CommandPacket> = BTreeMap::new();
    packets.insert(house, CommandPacket::default());
    let before = state.store.house(house).unwrap().flags.missed_turns;
    resolve_turn(&mut state, &packets).expect("turn resolves");
    // The dead house neither accrues missed turns nor acts.
    assert_eq!(
        state.store.house(house).unwrap().flags.missed_turns,
        before
    );
    assert!(!state.store.house(house).unwrap().flags.autopilot);
}
