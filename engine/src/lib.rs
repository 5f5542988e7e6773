//! # EC4X Engine
//!
//! The server-authoritative turn engine: entity store, four-phase
//! pipeline (Command → Production → Conflict → Income), prestige and
//! lifecycle, and the per-house fog-of-war projection. The public
//! surface is [`api::Engine`]; everything else backs it.

pub mod api;
pub mod conflict;
pub mod construction;
pub mod economy;
pub mod movement;
pub mod prestige;
pub mod research;
pub mod state;
pub mod store;
pub mod turn;
pub mod view;

pub use api::{ClosedTurn, Engine};
pub use state::GameState;
pub use store::EntityStore;
pub use view::{LeaderboardRow, PlayerView, ViewDelta};
