//! Immutable per-game configuration.
//!
//! Fixed at `NewGame` and injected into every phase function; nothing here
//! changes after initialization.

use serde::{Deserialize, Serialize};

use crate::constants;

/// Options chosen when a game is created.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameConfig {
    /// Number of player houses, 2..=12.
    pub players: u8,
    /// Map radius in rings around the hub.
    pub map_rings: u8,
    /// Hard end of game; highest prestige wins at this turn.
    pub turn_limit: Option<u32>,
    /// Optional sudden-death prestige threshold.
    pub prestige_victory_threshold: Option<i64>,
    /// Prestige scaling in percent, derived from map size at creation.
    pub prestige_scale_percent: u32,
    pub starting_treasury: u32,
    pub starting_tax_rate: u8,
}

impl GameConfig {
    /// Standard configuration for the given player count. Map radius
    /// grows with the field: 2–4 houses on 4 rings, up to 12 on 7.
    pub fn standard(players: u8) -> Self {
        let map_rings = match players {
            0..=4 => 4,
            5..=6 => 5,
            7..=9 => 6,
            _ => 7,
        };
        Self {
            players,
            map_rings,
            turn_limit: Some(60),
            prestige_victory_threshold: None,
            prestige_scale_percent: constants::prestige_scale_percent(map_rings),
            starting_treasury: constants::STARTING_TREASURY,
            starting_tax_rate: constants::STARTING_TAX_RATE,
        }
    }

    /// Apply the map-size scaling to a raw prestige amount. Scaling
    /// rounds away from zero so small awards never vanish.
    pub fn scale_prestige(&self, amount: i64) -> i64 {
        if amount == 0 {
            return 0;
        }
        let scaled = amount * i64::from(self.prestige_scale_percent);
        let magnitude = (scaled.abs() + 99) / 100;
        magnitude * amount.signum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_config_scales_with_players() {
        assert_eq!(GameConfig::standard(2).map_rings, 4);
        assert_eq!(GameConfig::standard(12).map_rings, 7);
    }

    #[test]
    fn prestige_scaling_preserves_sign_and_minimum() {
        let config = GameConfig::standard(8);
        assert!(config.prestige_scale_percent > 100);
        assert!(config.scale_prestige(1) >= 1);
        assert!(config.scale_prestige(-1) <= -1);
        assert_eq!(config.scale_prestige(0), 0);
    }
}
