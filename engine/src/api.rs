//! The stable engine API: new game, command submission, turn close,
//! views.
//!
//! `Engine` hosts any number of game instances. `close_turn` is
//! idempotent per `(game, turn)` — replays return the cached envelope —
//! and runs the phase pipeline on a working copy, so a fatal invariant
//! breach leaves the last good state in place.

use std::collections::BTreeMap;

use ec4x_common::{
    constants, Colony, CommandPacket, Drydock, DrydockId, EngineError, EngineResult, Fleet,
    FleetId, GameConfig, GroundUnit, GroundUnitId, GroundUnitKind, House, HouseId, HullState,
    PlanetClass, ResourceRating, Ship, ShipClass, ShipId, Shipyard, ShipyardId, Spaceport,
    SpaceportId, Squadron, TurnResult, ValidationCode, ValidationError, TURN_RESULT_VERSION,
};

use crate::state::GameState;
use crate::store::EntityStore;
use crate::turn::resolve_turn;
use crate::view::{diff_views, project_view, PlayerView, ViewDelta};

/// A closed turn: the persisted envelope plus per-house deltas.
#[derive(Debug, Clone)]
pub struct ClosedTurn {
    pub result: TurnResult,
    pub deltas: BTreeMap<HouseId, ViewDelta>,
}

struct GameInstance {
    state: GameState,
    pending: BTreeMap<HouseId, CommandPacket>,
    /// Append-only log of closed turns.
    results: BTreeMap<u32, TurnResult>,
    /// Last published view per house, for delta generation.
    last_views: BTreeMap<HouseId, PlayerView>,
}

/// The engine facade. One logical writer per game instance.
#[derive(Default)]
pub struct Engine {
    games: BTreeMap<u64, GameInstance>,
    next_game_id: u64,
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a game: map, houses, homeworlds, and starting forces.
    /// Returns the game id, a reference to the initial state, and the
    /// initial per-house views.
    pub fn new_game(
        &mut self,
        config: GameConfig,
        seed: u64,
    ) -> (u64, &GameState, BTreeMap<HouseId, PlayerView>) {
        self.next_game_id += 1;
        let game_id = self.next_game_id;
        let state = bootstrap_state(game_id, config, seed);

        let mut views = BTreeMap::new();
        for house_id in state.store.house_ids() {
            views.insert(house_id, project_view(&state, house_id, &[]));
        }
        let instance = GameInstance {
            state,
            pending: BTreeMap::new(),
            results: BTreeMap::new(),
            last_views: views.clone(),
        };
        self.games.insert(game_id, instance);
        (game_id, &self.games[&game_id].state, views)
    }

    pub fn state(&self, game_id: u64) -> Option<&GameState> {
        self.games.get(&game_id).map(|g| &g.state)
    }

    /// Validate and bank one house's command packet for the current
    /// turn. Later submissions replace earlier ones until the turn
    /// closes.
    pub fn submit_commands(
        &mut self,
        game_id: u64,
        house_id: HouseId,
        turn: u32,
        packet: CommandPacket,
    ) -> Result<(), ValidationError> {
        let game = self.games.get_mut(&game_id).ok_or_else(|| {
            ValidationError::new(ValidationCode::UnknownEntity, format!("game {game_id}"))
        })?;
        if turn != game.state.turn {
            return Err(ValidationError::new(
                ValidationCode::TurnMismatch,
                format!("turn {turn} is not open (current {})", game.state.turn),
            ));
        }
        validate_packet(&game.state, house_id, &packet)?;
        game.pending.insert(house_id, packet);
        Ok(())
    }

    /// Close the given turn. Idempotent: closing an already-closed turn
    /// returns the recorded envelope.
    pub fn close_turn(&mut self, game_id: u64, turn: u32) -> EngineResult<ClosedTurn> {
        let game = self
            .games
            .get_mut(&game_id)
            .ok_or(EngineError::GameNotFound { game_id })?;
        if let Some(result) = game.results.get(&turn) {
            // Replayed close: same envelope, empty deltas.
            return Ok(ClosedTurn {
                result: result.clone(),
                deltas: BTreeMap::new(),
            });
        }
        if turn != game.state.turn {
            return Err(EngineError::Validation(ValidationError::new(
                ValidationCode::TurnMismatch,
                format!("turn {turn} is not open (current {})", game.state.turn),
            )));
        }

        // Work on a copy so a fatal phase error keeps the last good
        // state persisted.
        let mut working = game.state.clone();
        let packets = std::mem::take(&mut game.pending);
        let (events, combat_reports) = resolve_turn(&mut working, &packets)?;
        let digest = working.digest()?;

        let result = TurnResult {
            version: TURN_RESULT_VERSION,
            game_id,
            turn,
            state_digest: digest,
            events: events.clone(),
            combat_reports,
        };

        let mut deltas = BTreeMap::new();
        for house_id in working.store.house_ids() {
            let view = project_view(&working, house_id, &events);
            let delta = diff_views(game.last_views.get(&house_id), &view);
            game.last_views.insert(house_id, view);
            deltas.insert(house_id, delta);
        }

        game.state = working;
        game.results.insert(turn, result.clone());
        Ok(ClosedTurn { result, deltas })
    }

    /// The current (or last published) view for a house.
    pub fn view(&self, game_id: u64, house_id: HouseId) -> Option<&PlayerView> {
        self.games
            .get(&game_id)
            .and_then(|g| g.last_views.get(&house_id))
    }

    /// The persisted envelope for a closed turn.
    pub fn turn_result(&self, game_id: u64, turn: u32) -> Option<&TurnResult> {
        self.games.get(&game_id).and_then(|g| g.results.get(&turn))
    }
}

/// Encode a turn envelope in the self-describing wire format the
/// persistence layer appends per `(game, turn)`.
pub fn encode_turn_result(result: &TurnResult) -> Result<String, EngineError> {
    serde_json::to_string(result).map_err(|e| EngineError::Serialization(e.to_string()))
}

/// Decode a persisted turn envelope.
pub fn decode_turn_result(raw: &str) -> Result<TurnResult, EngineError> {
    serde_json::from_str(raw).map_err(|e| EngineError::Serialization(e.to_string()))
}

/// Surface-level packet validation at submission time. Deep validation
/// reruns at resolution; this catches what the submitter can fix.
fn validate_packet(
    state: &GameState,
    house_id: HouseId,
    packet: &CommandPacket,
) -> Result<(), ValidationError> {
    let house = state
        .store
        .house(house_id)
        .ok_or_else(|| ValidationError::new(ValidationCode::UnknownEntity, "no such house"))?;
    if !house.is_active() {
        return Err(ValidationError::new(
            ValidationCode::HouseInactive,
            "house is eliminated",
        ));
    }
    if let Some(rate) = packet.tax_rate {
        if rate > 100 {
            return Err(ValidationError::new(
                ValidationCode::InvalidTarget,
                "tax rate is 0..=100",
            ));
        }
    }
    if let Some(espionage) = &packet.espionage {
        if espionage.target == house_id || state.store.house(espionage.target).is_none() {
            return Err(ValidationError::new(
                ValidationCode::InvalidTarget,
                "bad espionage target",
            ));
        }
        if house.espionage.ebp + packet.ebp_investment < espionage.action.ebp_cost() {
            return Err(ValidationError::new(
                ValidationCode::InsufficientEspionageBudget,
                "espionage budget cannot cover the action",
            ));
        }
    }
    for request in &packet.fleet_orders {
        let fleet = state.store.fleet(request.fleet).ok_or_else(|| {
            ValidationError::new(ValidationCode::UnknownEntity, "no such fleet")
                .with_refs([request.fleet.0])
        })?;
        if fleet.owner != house_id {
            return Err(
                ValidationError::new(ValidationCode::NotOwner, "fleet is not yours")
                    .with_refs([request.fleet.0]),
            );
        }
        if let Some(roe) = request.roe {
            if roe > 10 {
                return Err(ValidationError::new(
                    ValidationCode::InvalidRoe,
                    "ROE is 0..=10",
                ));
            }
        }
    }
    for order in &packet.builds {
        let colony = state.store.colony(order.colony).ok_or_else(|| {
            ValidationError::new(ValidationCode::UnknownEntity, "no such colony")
                .with_refs([order.colony.0])
        })?;
        if colony.owner != house_id {
            return Err(
                ValidationError::new(ValidationCode::NotOwner, "colony is not yours")
                    .with_refs([order.colony.0]),
            );
        }
    }
    Ok(())
}

/// Build the initial world: starmap, houses, homeworld colonies with
/// yards and garrison, and a starting fleet apiece.
pub fn bootstrap_state(game_id: u64, config: GameConfig, seed: u64) -> GameState {
    let mut store = EntityStore::new();
    let rng = ec4x_common::GameRng::new(seed);

    // House ids are minted before the map so homeworld assignment can
    // follow house order.
    let house_ids: Vec<HouseId> = (0..config.players)
        .map(|_| HouseId(store.mint.next()))
        .collect();

    let map = ec4x_galaxy::generate(config.map_rings, config.players, &mut store.mint, &rng);

    let mut state = GameState {
        game_id,
        turn: 1,
        seed,
        config,
        map,
        store,
        victor: None,
        disinformation: BTreeMap::new(),
    };

    for (index, &house_id) in house_ids.iter().enumerate() {
        let home = state.map.homeworlds()[index % state.map.homeworlds().len()];
        let mut house = House::new(house_id, format!("House {}", index + 1), home);
        house.treasury = state.config.starting_treasury;
        house.tax_rate = state.config.starting_tax_rate;
        state.store.add_house(house);

        // Homeworld colony with the full yard stack.
        let colony_id = ec4x_common::ColonyId(state.store.mint.next());
        let mut colony = Colony::new(
            colony_id,
            home,
            house_id,
            PlanetClass::Terran,
            ResourceRating::Normal,
            constants::HOMEWORLD_SOULS,
        );
        colony.iu = constants::HOMEWORLD_IU;

        let spaceport = SpaceportId(state.store.mint.next());
        colony.spaceports.push(spaceport);
        let shipyard = ShipyardId(state.store.mint.next());
        colony.shipyards.push(shipyard);
        let drydock = DrydockId(state.store.mint.next());
        colony.drydocks.push(drydock);

        let mut garrison = Vec::new();
        for kind in [
            GroundUnitKind::Army,
            GroundUnitKind::Army,
            GroundUnitKind::Marine,
            GroundUnitKind::GroundBattery,
        ] {
            let gid = GroundUnitId(state.store.mint.next());
            garrison.push((gid, kind));
            colony.ground_units.push(gid);
        }
        state.store.create_colony(colony);
        state.store.add_spaceport(Spaceport {
            id: spaceport,
            colony: colony_id,
            hull: HullState::Undamaged,
            tier: 0,
        });
        state.store.add_shipyard(Shipyard {
            id: shipyard,
            colony: colony_id,
            hull: HullState::Undamaged,
            tier: 0,
        });
        state.store.add_drydock(Drydock {
            id: drydock,
            colony: colony_id,
            hull: HullState::Undamaged,
            tier: 0,
        });
        for (gid, kind) in garrison {
            state
                .store
                .add_ground_unit(GroundUnit::new(gid, colony_id, house_id, kind));
        }

        // Starting fleet: a scout, a corvette pair, and a loaded ETAC.
        let fleet_id = FleetId(state.store.mint.next());
        let mut fleet = Fleet::new(fleet_id, house_id, home);
        let mut commission = |state: &mut GameState, class: ShipClass| -> ShipId {
            let ship_id = ShipId(state.store.mint.next());
            let mut ship = Ship::new(ship_id, class, house_id);
            ship.fleet = Some(fleet_id);
            if class == ShipClass::Etac {
                ship.cargo = Some(ec4x_common::Cargo {
                    kind: ec4x_common::CargoKind::Colonists,
                    quantity: class.capacity_at(0),
                });
            }
            state.store.add_ship(ship);
            ship_id
        };
        let scout = commission(&mut state, ShipClass::Scout);
        let corvette = commission(&mut state, ShipClass::Corvette);
        let escort = commission(&mut state, ShipClass::Corvette);
        let etac = commission(&mut state, ShipClass::Etac);
        fleet.squadrons.push(Squadron::solo(scout));
        fleet.squadrons.push(Squadron {
            flagship: corvette,
            escorts: vec![escort],
        });
        fleet.squadrons.push(Squadron::solo(etac));
        state.store.create_fleet(fleet);
    }

    state
}
