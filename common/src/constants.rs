//! Game constants and rule tables.
//!
//! Numeric knobs for the economy, combat, espionage, and lifecycle rules.
//! Multiplier tables are expressed in integer percent so the persisted
//! state never carries floats; callers convert at the point of use.

use crate::types::{PlanetClass, ResourceRating};

// ========== Economy ==========

/// Per-PU raw output base by planet class (PP, percent-scaled by the
/// resource rating below).
pub fn raw_index(class: PlanetClass, rating: ResourceRating) -> u32 {
    let base: u32 = match class {
        PlanetClass::Extreme => 1,
        PlanetClass::Desolate => 2,
        PlanetClass::Hostile => 3,
        PlanetClass::Harsh => 4,
        PlanetClass::Benign => 5,
        PlanetClass::Terran => 6,
        PlanetClass::Eden => 8,
    };
    let rating_percent: u32 = match rating {
        ResourceRating::VeryPoor => 50,
        ResourceRating::Poor => 75,
        ResourceRating::Normal => 100,
        ResourceRating::Rich => 125,
        ResourceRating::VeryRich => 150,
    };
    base * rating_percent / 100
}

/// Economic-level output multiplier, percent: 100, 150, 200, ...
pub fn el_mod_percent(el: u8) -> u32 {
    100 + 50 * u32::from(el)
}

/// Construction-tech output multiplier, percent: 100, 110, 120, ...
pub fn cst_mod_percent(cst: u8) -> u32 {
    100 + 10 * u32::from(cst)
}

/// Output bonus per operational starbase, percent, capped at three bases.
pub fn starbase_bonus_percent(operational: u32) -> u32 {
    operational.min(MAX_STARBASE_BONUS_COUNT) * 5
}

pub const MAX_STARBASE_BONUS_COUNT: u32 = 3;

/// Tax-derived production growth bonus, percent of IU output.
pub fn prod_growth_percent(tax_rate: u8) -> u32 {
    u32::from(50u8.saturating_sub(tax_rate)) / 2
}

/// GCO share a blockaded colony still produces, percent.
pub const BLOCKADE_OUTPUT_PERCENT: u32 = 40;

/// Stepped prestige penalty for a rolling average tax rate above 50%.
pub fn tax_penalty(average: u8) -> i64 {
    if average <= 50 {
        return 0;
    }
    if average >= 100 {
        // Full confiscation sits on its own row.
        return -11;
    }
    // −1 per five points over 50.
    let steps = (u32::from(average) - 50).div_ceil(5);
    -i64::from(steps)
}

/// Low-tax incentive: (prestige per colony, growth multiplier percent).
pub fn tax_incentive(rate: u8) -> (i64, u32) {
    match rate {
        0..=15 => (2, 150),
        16..=30 => (1, 125),
        31..=40 => (1, 110),
        _ => (0, 100),
    }
}

/// PU divisor for passive IU growth.
pub const IU_GROWTH_PU_DIVISOR: u32 = 200;

/// Population growth rate, percent of PU per turn before multipliers.
pub const POP_GROWTH_PERCENT: u32 = 2;

/// Maintenance shortfall: base prestige penalty and per-turn escalation.
pub const SHORTFALL_BASE_PENALTY: i64 = -5;
pub const SHORTFALL_ESCALATION: i64 = -2;

/// Refund share when the Space Guild claims or a player salvages a hull.
pub const SALVAGE_REFUND_PERCENT: u32 = 50;

// ========== Construction ==========

/// Ship cost multiplier when built planet-side at a spaceport.
pub const SPACEPORT_COST_MULTIPLIER: u32 = 2;

/// Repair cost, percent of production cost.
pub const REPAIR_COST_PERCENT: u32 = 25;

/// Refund share when a queued project is cancelled.
pub const CANCEL_REFUND_PERCENT: u32 = 50;

/// Base concurrent projects per dock before the CST multiplier.
pub const DOCK_BASE_CAPACITY: u32 = 2;

/// Concurrent projects a dock can host at the given CST tier.
pub fn dock_capacity(cst: u8) -> u32 {
    DOCK_BASE_CAPACITY * cst_mod_percent(cst) / 100
}

/// Turns a ship class takes to build (spaceport or shipyard).
pub fn ship_build_turns(production_cost: u32) -> u8 {
    // One turn per 80 PP, at least one.
    ((production_cost + 79) / 80).max(1).min(u32::from(u8::MAX)) as u8
}

/// Turns to terraform one planet class step.
pub const TERRAFORM_TURNS: u8 = 4;

/// PP cost of one planet-class terraform step.
pub const TERRAFORM_COST: u32 = 150;

/// PP cost per planetary shield level.
pub const SHIELD_COST_PER_LEVEL: u32 = 80;

/// Maximum planetary shield level.
pub const MAX_SHIELD_LEVEL: u8 = 6;

// ========== Capacity enforcement ==========

/// PU per permitted fighter squadron, before fighter doctrine.
pub const FIGHTER_CAP_PU_DIVISOR: u32 = 100;

/// Fighter-cap multiplier from fighter doctrine.
pub fn fd_mult(fd: u8) -> u32 {
    1 + u32::from(fd)
}

/// Fighter squadrons supported per operational starbase.
pub const FIGHTERS_PER_STARBASE: u32 = 5;

/// House-wide capital squadron cap.
pub fn capital_cap(total_iu: u32) -> u32 {
    (total_iu / 100 * 2).max(8)
}

/// Grace turns before a capacity violation is enforced.
pub const CAPACITY_GRACE_TURNS: u8 = 2;

// ========== Combat ==========

/// Maximum rounds per theater before a stalemate is declared.
pub const MAX_COMBAT_ROUNDS: u8 = 20;

/// Maximum bombardment rounds per turn.
pub const MAX_BOMBARDMENT_ROUNDS: u8 = 3;

/// CER damage multiplier in percent for a space/orbital/bombardment roll.
pub fn space_cer_percent(roll: u8) -> u32 {
    match roll {
        0..=2 => 25,
        3..=5 => 50,
        6..=8 => 75,
        _ => 100,
    }
}

/// Ground-combat CER multiplier in percent.
pub fn ground_cer_percent(roll: u8) -> u32 {
    match roll {
        0..=2 => 50,
        3..=5 => 100,
        6..=8 => 150,
        _ => 200,
    }
}

/// The d10 face that counts as a critical hit.
pub const CRITICAL_ROLL: u8 = 9;

/// First-round CER bonus for an undetected raider squadron.
pub const RAIDER_SURPRISE_BONUS: i32 = 4;

/// Maximum scout CER bonus per task force.
pub const SCOUT_CER_BONUS: i32 = 1;

/// Shield block share, percent, by shield level 0..=6.
pub fn shield_block_percent(level: u8) -> u32 {
    match level {
        0 => 0,
        1 => 15,
        2 => 25,
        3 => 35,
        4 => 45,
        5 => 55,
        _ => 65,
    }
}

/// d20 result at or above which the shield absorbs, by level 0..=6.
pub fn shield_threshold(level: u8) -> u8 {
    match level {
        0 => 21, // never
        1 => 16,
        2 => 14,
        3 => 12,
        4 => 10,
        5 => 8,
        _ => 6,
    }
}

/// d20 result at or above which a defender ELI unit detects a cloaked or
/// sneaking hull.
pub fn detection_threshold(eli: u8, clk: u8) -> u8 {
    let base = 12 + 2 * (i32::from(clk) - i32::from(eli));
    base.clamp(2, 20) as u8
}

/// Retreat threshold by ROE 0..=10: retreat when own AS / hostile AS
/// drops below the threshold (percent). ROE 10 always disengages.
pub fn roe_threshold_percent(roe: u8) -> u32 {
    match roe {
        0 => 0,
        1 => 10,
        2 => 20,
        3 => 30,
        4 => 40,
        5 => 50,
        6 => 75,
        7 => 100,
        8 => 150,
        9 => 200,
        _ => u32::MAX,
    }
}

/// Morale tier derived from house prestige.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoraleTier {
    /// d20 result needed for the bonus.
    pub threshold: u8,
    /// CER modifier on success.
    pub success_bonus: i32,
    /// CER modifier on failure.
    pub failure_malus: i32,
    /// Whether a success also grants one guaranteed critical.
    pub guaranteed_critical: bool,
}

pub fn morale_tier(prestige: i64) -> MoraleTier {
    if prestige >= 200 {
        MoraleTier {
            threshold: 5,
            success_bonus: 2,
            failure_malus: 0,
            guaranteed_critical: true,
        }
    } else if prestige >= 100 {
        MoraleTier {
            threshold: 8,
            success_bonus: 1,
            failure_malus: 0,
            guaranteed_critical: false,
        }
    } else if prestige >= 1 {
        MoraleTier {
            threshold: 12,
            success_bonus: 1,
            failure_malus: 0,
            guaranteed_critical: false,
        }
    } else {
        // Non-positive prestige: automatic malus; one random fleet holds.
        MoraleTier {
            threshold: 21,
            success_bonus: 0,
            failure_malus: -1,
            guaranteed_critical: false,
        }
    }
}

/// IU share destroyed by loyalists when an invasion succeeds.
pub const INVASION_IU_LOSS_PERCENT: u32 = 50;

/// AS multiplier (percent) for marines landing during a blitz.
pub const BLITZ_LANDING_AS_PERCENT: u32 = 50;

/// AS/DS multiplier (percent) for reserve fleets in the orbital theater.
pub const RESERVE_STRENGTH_PERCENT: u32 = 50;

// ========== Prestige ==========

/// Prestige for destroying a squadron, by bucket.
pub fn kill_prestige(bucket: crate::types::SquadronBucket) -> i64 {
    use crate::types::SquadronBucket::*;
    match bucket {
        Raider => 2,
        Capital => 3,
        Escort => 1,
        Fighter => 1,
        Starbase => 4,
    }
}

/// Prestige for founding a colony.
pub const COLONIZATION_PRESTIGE: i64 = 5;

/// Prestige for capturing a colony (the loser mirrors it).
pub const COLONY_CAPTURE_PRESTIGE: i64 = 10;

/// Prestige for advancing a tech field one tier.
pub const TECH_PRESTIGE: i64 = 1;

/// Prestige swing for a successful covert action and the penalty for a
/// detected one.
pub const ESPIONAGE_SUCCESS_PRESTIGE: i64 = 2;
pub const ESPIONAGE_DETECTED_PENALTY: i64 = -3;

/// Map-size prestige multiplier, percent.
pub fn prestige_scale_percent(map_rings: u8) -> u32 {
    100 + 25 * u32::from(map_rings.saturating_sub(3))
}

// ========== Espionage ==========

/// CIP at or above which a defender notices "unusual activity" even when
/// a scout mission goes undetected.
pub const CIP_SWEEP_THRESHOLD: u32 = 10;

/// SRP stolen by a successful tech theft.
pub const TECH_THEFT_SRP: u32 = 50;

/// IU destroyed by sabotage.
pub const SABOTAGE_LOW_IU: u32 = 2;
pub const SABOTAGE_HIGH_IU: u32 = 6;

/// Treasury skimmed by economic manipulation.
pub const ECONOMIC_MANIPULATION_PP: u32 = 30;

/// Prestige damage from a psyops campaign.
pub const PSYOPS_PRESTIGE: i64 = -4;

// ========== Lifecycle ==========

/// Consecutive negative-prestige Income Phases before defensive collapse.
pub const COLLAPSE_TURNS: u8 = 3;

/// Consecutive missed submissions before autopilot engages.
pub const AUTOPILOT_TURNS: u8 = 3;

// ========== Start-of-game ==========

pub const STARTING_TREASURY: u32 = 300;
pub const STARTING_TAX_RATE: u8 = 30;
pub const HOMEWORLD_SOULS: u64 = 500_000;
pub const HOMEWORLD_IU: u32 = 60;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tax_penalty_steps() {
        assert_eq!(tax_penalty(50), 0);
        assert_eq!(tax_penalty(51), -1);
        assert_eq!(tax_penalty(60), -2);
        assert_eq!(tax_penalty(75), -5);
        assert_eq!(tax_penalty(99), -10);
        assert_eq!(tax_penalty(100), -11);
    }

    #[test]
    fn shield_matches_published_row() {
        // Level 3: 35% block at threshold 12.
        assert_eq!(shield_block_percent(3), 35);
        assert_eq!(shield_threshold(3), 12);
    }

    #[test]
    fn detection_threshold_clamps() {
        assert!(detection_threshold(10, 0) >= 2);
        assert!(detection_threshold(0, 10) <= 20);
        assert_eq!(detection_threshold(3, 3), 12);
    }

    #[test]
    fn capital_cap_floors_at_eight() {
        assert_eq!(capital_cap(0), 8);
        assert_eq!(capital_cap(399), 8);
        assert_eq!(capital_cap(600), 12);
    }

    #[test]
    fn cer_bands() {
        assert_eq!(space_cer_percent(0), 25);
        assert_eq!(space_cer_percent(6), 75);
        assert_eq!(space_cer_percent(9), 100);
        assert_eq!(ground_cer_percent(9), 200);
    }
}
