//! Starmap generation.
//!
//! The map is a hex disc of `rings` rings around a central hub. Lanes
//! connect adjacent hexes and carry a class that constrains traversal.
//! Generation is fully deterministic from the game seed: the hub gets
//! exactly six Major lanes to ring one, homeworlds sit on the outer ring
//! at maximal pairwise spacing with exactly three Major lanes each, and
//! the global lane mix targets 50% Major / 35% Minor / 15% Restricted.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use ec4x_common::{
    GameRng, HexCoord, IdMint, LaneClass, PlanetClass, ResourceRating, StarClass, SystemId,
};

/// One star system (one hex).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StarSystem {
    pub id: SystemId,
    pub coord: HexCoord,
    pub star: StarClass,
    pub planet_class: PlanetClass,
    pub resources: ResourceRating,
}

/// An undirected jump lane between two adjacent systems.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Lane {
    pub a: SystemId,
    pub b: SystemId,
    pub class: LaneClass,
}

/// The immutable map: systems, lanes, and the adjacency index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Starmap {
    systems: BTreeMap<SystemId, StarSystem>,
    by_coord: BTreeMap<HexCoord, SystemId>,
    lanes: Vec<Lane>,
    adjacency: BTreeMap<SystemId, Vec<(SystemId, LaneClass)>>,
    hub: SystemId,
    homeworlds: Vec<SystemId>,
}

impl Starmap {
    pub fn hub(&self) -> SystemId {
        self.hub
    }

    /// Homeworld systems in house order (first house gets the first).
    pub fn homeworlds(&self) -> &[SystemId] {
        &self.homeworlds
    }

    pub fn system(&self, id: SystemId) -> Option<&StarSystem> {
        self.systems.get(&id)
    }

    pub fn system_at(&self, coord: HexCoord) -> Option<SystemId> {
        self.by_coord.get(&coord).copied()
    }

    pub fn systems(&self) -> impl Iterator<Item = &StarSystem> {
        self.systems.values()
    }

    pub fn system_count(&self) -> usize {
        self.systems.len()
    }

    pub fn lanes(&self) -> &[Lane] {
        &self.lanes
    }

    /// Neighbors of a system with the connecting lane class, in stable
    /// order.
    pub fn neighbors(&self, id: SystemId) -> &[(SystemId, LaneClass)] {
        self.adjacency.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The lane between two systems, if adjacent.
    pub fn lane_between(&self, a: SystemId, b: SystemId) -> Option<LaneClass> {
        self.neighbors(a)
            .iter()
            .find(|(n, _)| *n == b)
            .map(|(_, class)| *class)
    }

    fn rebuild_adjacency(&mut self) {
        self.adjacency.clear();
        for lane in &self.lanes {
            self.adjacency
                .entry(lane.a)
                .or_default()
                .push((lane.b, lane.class));
            self.adjacency
                .entry(lane.b)
                .or_default()
                .push((lane.a, lane.class));
        }
        for neighbors in self.adjacency.values_mut() {
            neighbors.sort();
        }
    }

    fn set_lane_class(&mut self, a: SystemId, b: SystemId, class: LaneClass) {
        for lane in &mut self.lanes {
            if (lane.a == a && lane.b == b) || (lane.a == b && lane.b == a) {
                lane.class = class;
            }
        }
    }
}

/// Generate the starmap for a new game.
///
/// `players` homeworlds are spaced evenly around the outer ring; ids are
/// minted in spiral order so the hub is always the first system.
pub fn generate(rings: u8, players: u8, mint: &mut IdMint, rng: &GameRng) -> Starmap {
    let mut map = Starmap {
        systems: BTreeMap::new(),
        by_coord: BTreeMap::new(),
        lanes: Vec::new(),
        adjacency: BTreeMap::new(),
        hub: SystemId(0),
        homeworlds: Vec::new(),
    };

    // Systems, hub first.
    for coord in HexCoord::spiral(u32::from(rings)) {
        let id = SystemId(mint.next());
        let mut stream = rng.stream(0, &format!("mapgen:sys:{}:{}", coord.q, coord.r));
        let system = StarSystem {
            id,
            coord,
            star: roll_star_class(stream.index(100)),
            planet_class: roll_planet_class(stream.index(100)),
            resources: roll_resource_rating(stream.index(100)),
        };
        if coord == HexCoord::origin() {
            map.hub = id;
        }
        map.by_coord.insert(coord, id);
        map.systems.insert(id, system);
    }

    // Lanes between adjacent hexes. Each pair is visited once by only
    // walking the first three directions from every hex.
    let coords: Vec<HexCoord> = map.by_coord.keys().copied().collect();
    for coord in &coords {
        let from = map.by_coord[coord];
        for (dir, neighbor) in coord.neighbors().into_iter().enumerate().take(3) {
            let Some(&to) = map.by_coord.get(&neighbor) else {
                continue;
            };
            let mut stream = rng.stream(0, &format!("mapgen:lane:{}:{}:{}", coord.q, coord.r, dir));
            let class = roll_lane_class(stream.index(100));
            map.lanes.push(Lane { a: from, b: to, class });
        }
    }

    // The hub always has six Major lanes to ring one.
    let hub = map.hub;
    let hub_coord = HexCoord::origin();
    for neighbor in hub_coord.neighbors() {
        if let Some(&to) = map.by_coord.get(&neighbor) {
            map.set_lane_class(hub, to, LaneClass::Major);
        }
    }

    // Homeworlds: evenly spaced around the outer ring for maximal
    // pairwise distance, each with exactly three Major lanes (the rest
    // demoted to Minor).
    let outer = HexCoord::ring_coords(u32::from(rings));
    let players = usize::from(players.max(2));
    let step = outer.len() / players;
    let offset = rng.stream(0, "mapgen:homeworld-offset").index(outer.len());
    for p in 0..players {
        let coord = outer[(offset + p * step) % outer.len()];
        let id = map.by_coord[&coord];
        {
            let system = map.systems.get_mut(&id).expect("homeworld system exists");
            system.planet_class = PlanetClass::Terran;
            system.resources = ResourceRating::Normal;
        }

        // Rank this homeworld's lanes hub-ward and keep the best three
        // as Major.
        let mut lanes: Vec<(u32, SystemId)> = Vec::new();
        for neighbor in coord.neighbors() {
            if let Some(&to) = map.by_coord.get(&neighbor) {
                lanes.push((neighbor.ring(), to));
            }
        }
        lanes.sort();
        for (i, (_, to)) in lanes.into_iter().enumerate() {
            let class = if i < 3 { LaneClass::Major } else { LaneClass::Minor };
            map.set_lane_class(id, to, class);
        }
        map.homeworlds.push(id);
    }

    map.rebuild_adjacency();
    log::info!(
        "generated starmap: {} systems, {} lanes, {} homeworlds",
        map.systems.len(),
        map.lanes.len(),
        map.homeworlds.len()
    );
    map
}

fn roll_star_class(roll: usize) -> StarClass {
    match roll {
        0..=4 => StarClass::O,
        5..=11 => StarClass::B,
        12..=21 => StarClass::A,
        22..=36 => StarClass::F,
        37..=56 => StarClass::G,
        57..=76 => StarClass::K,
        _ => StarClass::M,
    }
}

fn roll_planet_class(roll: usize) -> PlanetClass {
    match roll {
        0..=9 => PlanetClass::Extreme,
        10..=24 => PlanetClass::Desolate,
        25..=44 => PlanetClass::Hostile,
        45..=64 => PlanetClass::Harsh,
        65..=84 => PlanetClass::Benign,
        85..=96 => PlanetClass::Terran,
        _ => PlanetClass::Eden,
    }
}

fn roll_resource_rating(roll: usize) -> ResourceRating {
    match roll {
        0..=9 => ResourceRating::VeryPoor,
        10..=29 => ResourceRating::Poor,
        30..=69 => ResourceRating::Normal,
        70..=89 => ResourceRating::Rich,
        _ => ResourceRating::VeryRich,
    }
}

fn roll_lane_class(roll: usize) -> LaneClass {
    match roll {
        0..=49 => LaneClass::Major,
        50..=84 => LaneClass::Minor,
        _ => LaneClass::Restricted,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_map() -> Starmap {
        let mut mint = IdMint::new();
        generate(4, 4, &mut mint, &GameRng::new(42))
    }

    #[test]
    fn hub_has_six_major_lanes() {
        let map = small_map();
        let hub_lanes = map.neighbors(map.hub());
        assert_eq!(hub_lanes.len(), 6);
        assert!(hub_lanes.iter().all(|(_, c)| *c == LaneClass::Major));
    }

    #[test]
    fn homeworlds_have_exactly_three_major_lanes() {
        let map = small_map();
        assert_eq!(map.homeworlds().len(), 4);
        for &hw in map.homeworlds() {
            let majors = map
                .neighbors(hw)
                .iter()
                .filter(|(_, c)| *c == LaneClass::Major)
                .count();
            assert_eq!(majors, 3, "homeworld {hw} major lane count");
        }
    }

    #[test]
    fn generation_is_deterministic() {
        let mut mint_a = IdMint::new();
        let mut mint_b = IdMint::new();
        let a = generate(4, 6, &mut mint_a, &GameRng::new(7));
        let b = generate(4, 6, &mut mint_b, &GameRng::new(7));
        assert_eq!(a, b);
    }

    #[test]
    fn homeworlds_are_spread_apart() {
        let map = small_map();
        let coords: Vec<HexCoord> = map
            .homeworlds()
            .iter()
            .map(|&id| map.system(id).unwrap().coord)
            .collect();
        for (i, a) in coords.iter().enumerate() {
            for b in coords.iter().skip(i + 1) {
                assert!(a.distance_to(b) >= 3, "homeworlds {a} and {b} too close");
            }
        }
    }
}
