//! Research model: science level, tech fields, and research-point pools.
//!
//! Each house banks economic (ERP), science (SRP), and technical (TRP)
//! research points. The science level (SL) advances when both the ERP and
//! SRP thresholds for the next level are banked; individual fields are
//! bought from their matching pool and gate on SL.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A purchasable technology field.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum TechField {
    /// Economic level: steps the industrial output multiplier.
    EL = 0,
    /// Weapons: scales ship AS/DS.
    WEP = 1,
    /// Construction: dock capacity and output multiplier.
    CST = 2,
    /// Shields: planetary shield levels.
    SLD = 3,
    /// Terraforming: gates planet-class improvement.
    TER = 4,
    /// Cloaking: raider concealment.
    CLK = 5,
    /// Electronic intelligence: detection.
    ELI = 6,
    /// Spacelift: ETAC / transport capacity.
    STL = 7,
    /// Command: squadron command ratings.
    CMD = 8,
    /// Fighter doctrine: colony fighter caps.
    FD = 9,
    /// Advanced carrier ops: hangar capacity.
    ACO = 10,
    /// Counter-intelligence capability.
    CIC = 11,
}

/// Which pool pays for a field.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[repr(u8)]
pub enum ResearchPool {
    Economic = 0,
    Science = 1,
    Technical = 2,
}

impl TechField {
    pub fn all() -> &'static [TechField] {
        &[
            TechField::EL,
            TechField::WEP,
            TechField::CST,
            TechField::SLD,
            TechField::TER,
            TechField::CLK,
            TechField::ELI,
            TechField::STL,
            TechField::CMD,
            TechField::FD,
            TechField::ACO,
            TechField::CIC,
        ]
    }

    /// The pool this field is purchased from.
    pub fn pool(&self) -> ResearchPool {
        match self {
            TechField::EL | TechField::CST | TechField::TER => ResearchPool::Economic,
            TechField::SLD
            | TechField::CLK
            | TechField::ELI
            | TechField::STL
            | TechField::CIC => ResearchPool::Science,
            TechField::WEP | TechField::CMD | TechField::FD | TechField::ACO => {
                ResearchPool::Technical
            }
        }
    }

    /// Base purchase cost; tier `n` costs `base * n^2` from the pool.
    pub fn base_cost(&self) -> u32 {
        match self {
            TechField::EL => 60,
            TechField::WEP => 50,
            TechField::CST => 40,
            TechField::SLD => 45,
            TechField::TER => 55,
            TechField::CLK => 50,
            TechField::ELI => 40,
            TechField::STL => 30,
            TechField::CMD => 35,
            TechField::FD => 30,
            TechField::ACO => 35,
            TechField::CIC => 40,
        }
    }

    /// Full cost of purchasing the given tier.
    pub fn cost_at(&self, tier: u8) -> u32 {
        self.base_cost() * u32::from(tier) * u32::from(tier)
    }
}

/// Banked research points.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ResearchPools {
    pub erp: u32,
    pub srp: u32,
    pub trp: u32,
}

impl ResearchPools {
    pub fn balance(&self, pool: ResearchPool) -> u32 {
        match pool {
            ResearchPool::Economic => self.erp,
            ResearchPool::Science => self.srp,
            ResearchPool::Technical => self.trp,
        }
    }

    pub fn debit(&mut self, pool: ResearchPool, amount: u32) {
        match pool {
            ResearchPool::Economic => self.erp -= amount,
            ResearchPool::Science => self.srp -= amount,
            ResearchPool::Technical => self.trp -= amount,
        }
    }
}

/// ERP and SRP each required to advance to science level `level`.
pub fn sl_threshold(level: u8) -> u32 {
    100 * u32::from(level) * u32::from(level)
}

/// A house's research state.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct TechTree {
    /// Science level. Gates field tiers: a field tier may not exceed SL.
    pub sl: u8,
    /// Field levels; absent means 0.
    levels: BTreeMap<u8, u8>,
    pub pools: ResearchPools,
}

impl TechTree {
    pub fn level(&self, field: TechField) -> u8 {
        self.levels.get(&(field as u8)).copied().unwrap_or(0)
    }

    pub fn set_level(&mut self, field: TechField, level: u8) {
        self.levels.insert(field as u8, level);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sl_threshold_grows_quadratically() {
        assert_eq!(sl_threshold(1), 100);
        assert_eq!(sl_threshold(2), 400);
        assert_eq!(sl_threshold(3), 900);
    }

    #[test]
    fn field_levels_default_to_zero() {
        let mut tree = TechTree::default();
        assert_eq!(tree.level(TechField::WEP), 0);
        tree.set_level(TechField::WEP, 3);
        assert_eq!(tree.level(TechField::WEP), 3);
    }

    #[test]
    fn tier_cost_is_quadratic() {
        assert_eq!(TechField::WEP.cost_at(1), 50);
        assert_eq!(TechField::WEP.cost_at(3), 450);
    }
}
