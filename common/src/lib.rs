//! # EC4X Common
//!
//! Shared types, rule tables, and utilities for the EC4X turn engine.
//! This crate defines the data model used across the workspace:
//! - typed entity ids and the per-game id mint
//! - houses, colonies, ships, squadrons, fleets, ground forces
//! - the tech tree, command packets, events, and intelligence reports
//! - immutable game configuration and the numeric rule tables
//! - the deterministic event-keyed RNG

pub mod colony;
pub mod commands;
pub mod config;
pub mod constants;
pub mod coordinates;
pub mod errors;
pub mod events;
pub mod ground;
pub mod house;
pub mod ids;
pub mod intel;
pub mod rng;
pub mod tech;
pub mod types;
pub mod units;

pub use colony::*;
pub use commands::*;
pub use config::*;
pub use coordinates::*;
pub use errors::*;
pub use events::*;
pub use ground::*;
pub use house::*;
pub use ids::*;
pub use intel::*;
pub use rng::*;
pub use tech::*;
pub use types::*;
pub use units::*;
