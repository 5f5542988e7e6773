//! Lane-graph pathfinding and per-turn jump allowances.
//!
//! Lanes are unweighted; what varies is which lanes the moving fleet may
//! use at all. Restricted lanes reject crippled hulls and spacelift
//! (ETAC / troop transport); Minor lanes reject crippled hulls; Major
//! lanes take anyone.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

use ec4x_common::{LaneClass, SystemId};

use crate::map::Starmap;

/// The traversal-relevant shape of a moving fleet.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct TransitProfile {
    pub has_crippled: bool,
    pub has_spacelift: bool,
}

/// Whether this fleet may use a lane of the given class.
pub fn lane_passable(class: LaneClass, profile: TransitProfile) -> bool {
    match class {
        LaneClass::Major => true,
        LaneClass::Minor => !profile.has_crippled,
        LaneClass::Restricted => !profile.has_crippled && !profile.has_spacelift,
    }
}

/// Shortest path from `from` to `to` for the given profile, as the list
/// of systems after `from` (so `path.len()` is the hop count). `None`
/// when no passable route exists.
pub fn shortest_path(
    map: &Starmap,
    from: SystemId,
    to: SystemId,
    profile: TransitProfile,
) -> Option<Vec<SystemId>> {
    if from == to {
        return Some(Vec::new());
    }
    let mut parents: BTreeMap<SystemId, SystemId> = BTreeMap::new();
    let mut seen: BTreeSet<SystemId> = BTreeSet::new();
    let mut queue = VecDeque::new();
    seen.insert(from);
    queue.push_back(from);

    while let Some(current) = queue.pop_front() {
        for &(next, class) in map.neighbors(current) {
            if !lane_passable(class, profile) || !seen.insert(next) {
                continue;
            }
            parents.insert(next, current);
            if next == to {
                let mut path = vec![to];
                let mut cursor = to;
                while let Some(&parent) = parents.get(&cursor) {
                    if parent == from {
                        break;
                    }
                    path.push(parent);
                    cursor = parent;
                }
                path.reverse();
                return Some(path);
            }
            queue.push_back(next);
        }
    }
    None
}

/// The nearest system satisfying `accept`, with the path to it. Used for
/// seek-home orders and combat retreats.
pub fn nearest_matching(
    map: &Starmap,
    from: SystemId,
    profile: TransitProfile,
    accept: impl Fn(SystemId) -> bool,
) -> Option<(SystemId, Vec<SystemId>)> {
    let mut parents: BTreeMap<SystemId, SystemId> = BTreeMap::new();
    let mut seen: BTreeSet<SystemId> = BTreeSet::new();
    let mut queue = VecDeque::new();
    seen.insert(from);
    queue.push_back(from);

    while let Some(current) = queue.pop_front() {
        if current != from && accept(current) {
            let mut path = vec![current];
            let mut cursor = current;
            while let Some(&parent) = parents.get(&cursor) {
                if parent == from {
                    break;
                }
                path.push(parent);
                cursor = parent;
            }
            path.reverse();
            return Some((current, path));
        }
        for &(next, class) in map.neighbors(current) {
            if !lane_passable(class, profile) || !seen.insert(next) {
                continue;
            }
            parents.insert(next, current);
            queue.push_back(next);
        }
    }
    None
}

/// How many hops of `path` the fleet may take this turn.
///
/// Two jumps are allowed only when the next two hops are both Major lanes
/// and every system along the two-hop path is controlled by the fleet's
/// owner; any move into unexplored or non-owner space is one jump.
pub fn jumps_this_turn(
    map: &Starmap,
    from: SystemId,
    path: &[SystemId],
    controls: impl Fn(SystemId) -> bool,
) -> usize {
    if path.is_empty() {
        return 0;
    }
    if path.len() < 2 {
        return 1;
    }
    let first = path[0];
    let second = path[1];
    let first_major = map.lane_between(from, first) == Some(LaneClass::Major);
    let second_major = map.lane_between(first, second) == Some(LaneClass::Major);
    if first_major && second_major && controls(first) && controls(second) {
        2
    } else {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::generate;
    use ec4x_common::{GameRng, IdMint};

    fn map() -> Starmap {
        let mut mint = IdMint::new();
        generate(4, 4, &mut mint, &GameRng::new(42))
    }

    #[test]
    fn path_exists_between_hub_and_homeworld() {
        let map = map();
        let hw = map.homeworlds()[0];
        let path = shortest_path(&map, map.hub(), hw, TransitProfile::default())
            .expect("route to homeworld");
        assert!(!path.is_empty());
        assert_eq!(*path.last().unwrap(), hw);
        // A radius-4 disc is crossable in at most 8 hops.
        assert!(path.len() <= 8);
    }

    #[test]
    fn crippled_fleet_avoids_minor_lanes() {
        let map = map();
        let profile = TransitProfile {
            has_crippled: true,
            has_spacelift: false,
        };
        let hw = map.homeworlds()[0];
        if let Some(path) = shortest_path(&map, map.hub(), hw, profile) {
            let mut from = map.hub();
            for &next in &path {
                assert_eq!(map.lane_between(from, next), Some(LaneClass::Major));
                from = next;
            }
        }
    }

    #[test]
    fn two_jumps_need_majors_and_control() {
        let map = map();
        let hub = map.hub();
        // The hub's lanes are all Major, so a two-hop path through ring
        // one is double-jumpable iff both systems are controlled.
        let (first, _) = map.neighbors(hub)[0];
        let second = map
            .neighbors(first)
            .iter()
            .find(|(n, c)| *n != hub && *c == LaneClass::Major)
            .map(|(n, _)| *n);
        let Some(second) = second else {
            return;
        };
        let path = vec![first, second];
        assert_eq!(jumps_this_turn(&map, hub, &path, |_| true), 2);
        assert_eq!(jumps_this_turn(&map, hub, &path, |_| false), 1);
    }

    #[test]
    fn unreachable_destination_returns_none() {
        let map = map();
        // A fleet that can use no lane class but Major may still find
        // most systems; a profile that blocks everything cannot move.
        let profile = TransitProfile {
            has_crippled: true,
            has_spacelift: true,
        };
        // Find a system whose lanes are all sub-Major; from there this
        // profile is stuck.
        for system in map.systems() {
            let stuck = map
                .neighbors(system.id)
                .iter()
                .all(|(_, c)| *c != LaneClass::Major);
            if stuck {
                let target = map.hub();
                assert_eq!(shortest_path(&map, system.id, target, profile), None);
                return;
            }
        }
    }
}
