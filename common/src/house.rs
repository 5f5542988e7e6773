//! House (player dynasty) state.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::ids::{HouseId, SystemId};
use crate::intel::{IntelReport, IntelSubject};
use crate::tech::TechTree;
use crate::types::DiplomaticStance;

/// Espionage budgets: points spent on offense (EBP) and defense (CIP).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct EspionageBudget {
    pub ebp: u32,
    pub cip: u32,
}

/// Lifecycle flags. Houses are never deleted; they are flagged.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct HouseFlags {
    pub eliminated: bool,
    pub autopilot: bool,
    pub defensive_collapse: bool,
    /// Consecutive turns without a command submission.
    pub missed_turns: u8,
    /// Consecutive Income Phases closed with negative prestige.
    pub negative_prestige_turns: u8,
    /// Consecutive turns the house failed to cover fleet maintenance.
    pub maintenance_shortfall_turns: u8,
    /// Turns the house has exceeded its capital-squadron cap.
    pub capital_excess_turns: u8,
}

/// A player house.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct House {
    pub id: HouseId,
    pub name: String,
    pub home_system: SystemId,
    /// Prestige; may go negative.
    pub prestige: i64,
    /// Treasury in PP; never negative (shortfalls are resolved by forced
    /// decommission, not debt).
    pub treasury: u32,
    /// House-wide tax rate, 0..=100.
    pub tax_rate: u8,
    pub tech: TechTree,
    pub espionage: EspionageBudget,
    /// Posture toward each other house; absent means Neutral.
    stances: BTreeMap<HouseId, DiplomaticStance>,
    /// Latest intel per subject.
    pub intel: BTreeMap<IntelSubject, IntelReport>,
    /// Tax rates for recent Income Phases, newest last. Kept at six
    /// entries once warm; the rolling average drives the tax penalty.
    pub tax_history: Vec<u8>,
    pub flags: HouseFlags,
}

/// Number of Income Phases in the rolling tax-average window.
pub const TAX_HISTORY_WINDOW: usize = 6;

impl House {
    pub fn new(id: HouseId, name: String, home_system: SystemId) -> Self {
        Self {
            id,
            name,
            home_system,
            prestige: 0,
            treasury: 0,
            tax_rate: 30,
            tech: TechTree::default(),
            espionage: EspionageBudget::default(),
            stances: BTreeMap::new(),
            intel: BTreeMap::new(),
            tax_history: Vec::new(),
            flags: HouseFlags::default(),
        }
    }

    /// A house still playing: not eliminated.
    pub fn is_active(&self) -> bool {
        !self.flags.eliminated
    }

    pub fn stance_toward(&self, other: HouseId) -> DiplomaticStance {
        self.stances.get(&other).copied().unwrap_or_default()
    }

    pub fn set_stance(&mut self, other: HouseId, stance: DiplomaticStance) {
        self.stances.insert(other, stance);
    }

    /// Record this turn's tax rate and return the rolling average.
    pub fn push_tax_history(&mut self, rate: u8) -> u8 {
        self.tax_history.push(rate);
        if self.tax_history.len() > TAX_HISTORY_WINDOW {
            self.tax_history.remove(0);
        }
        self.rolling_tax_average()
    }

    /// Average tax over the last window (integer percent).
    pub fn rolling_tax_average(&self) -> u8 {
        if self.tax_history.is_empty() {
            return self.tax_rate;
        }
        let sum: u32 = self.tax_history.iter().map(|&t| u32::from(t)).sum();
        (sum / self.tax_history.len() as u32) as u8
    }

    /// Store a report, replacing any older one for the same subject.
    pub fn record_intel(&mut self, report: IntelReport) {
        let subject = report.subject;
        match self.intel.get(&subject) {
            Some(existing) if existing.snapshot_turn > report.snapshot_turn => {}
            _ => {
                self.intel.insert(subject, report);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tax_history_window_is_bounded() {
        let mut house = House::new(HouseId(1), "Atreides".into(), SystemId(1));
        for t in [10u8, 20, 30, 40, 50, 60, 70, 80] {
            house.push_tax_history(t);
        }
        assert_eq!(house.tax_history.len(), TAX_HISTORY_WINDOW);
        // Window holds 30..=80 → average 55.
        assert_eq!(house.rolling_tax_average(), 55);
    }

    #[test]
    fn stance_defaults_to_neutral() {
        let house = House::new(HouseId(1), "Corrino".into(), SystemId(1));
        assert_eq!(house.stance_toward(HouseId(9)), DiplomaticStance::Neutral);
    }
}
