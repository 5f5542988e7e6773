//! # EC4X Galaxy
//!
//! Starmap generation and lane-graph pathfinding. The map is generated
//! once per game from the shared deterministic RNG and never mutates;
//! the pathfinder answers movement queries for the engine's Production
//! Phase and retreat resolution.

pub mod map;
pub mod pathfind;

pub use map::{generate, Lane, StarSystem, Starmap};
pub use pathfind::{
    jumps_this_turn, lane_passable, nearest_matching, shortest_path, TransitProfile,
};
