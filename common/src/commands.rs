//! Per-house command packets submitted each Command Phase.
//!
//! A packet carries house-level settings, at most one espionage action,
//! per-colony build orders, and per-fleet commands. Packets are validated
//! on submission; everything submitted before the deadline is treated as
//! simultaneous.

use serde::{Deserialize, Serialize};

use crate::ids::{ColonyId, ConstructionProjectId, FleetId, HouseId, ShipId, SystemId};
use crate::colony::{BuildSubject, DockRef, RepairSubject};
use crate::tech::TechField;
use crate::types::DiplomaticStance;

/// Fleet command types. `target_system`/`target_fleet`/`roe` ride beside
/// the discriminant in [`FleetOrderRequest`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FleetCommandKind {
    Hold = 0,
    Move = 1,
    SeekHome = 2,
    Patrol = 3,
    GuardStarbase = 4,
    GuardColony = 5,
    Blockade = 6,
    Bombard = 7,
    Invade = 8,
    Blitz = 9,
    SpyColony = 10,
    SpySystem = 11,
    HackStarbase = 12,
    Colonize = 13,
    JoinFleet = 14,
    Rendezvous = 15,
    Salvage = 16,
    Reserve = 17,
    Mothball = 18,
    View = 19,
}

/// One fleet command as submitted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FleetOrderRequest {
    pub fleet: FleetId,
    pub command: FleetCommandKind,
    pub target_system: Option<SystemId>,
    pub target_fleet: Option<FleetId>,
    /// New rules of engagement, 0..=10.
    pub roe: Option<u8>,
}

/// Budget-based covert actions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum EspionageAction {
    SabotageLow = 0,
    SabotageHigh = 1,
    TechTheft = 2,
    Assassination = 3,
    EconomicManipulation = 4,
    CyberAttack = 5,
    PsyopsCampaign = 6,
    IntelTheft = 7,
    PlantDisinformation = 8,
    CounterIntelSweep = 9,
}

impl EspionageAction {
    /// EBP cost of launching this action.
    pub fn ebp_cost(&self) -> u32 {
        match self {
            EspionageAction::SabotageLow => 20,
            EspionageAction::SabotageHigh => 50,
            EspionageAction::TechTheft => 40,
            EspionageAction::Assassination => 60,
            EspionageAction::EconomicManipulation => 35,
            EspionageAction::CyberAttack => 30,
            EspionageAction::PsyopsCampaign => 25,
            EspionageAction::IntelTheft => 30,
            EspionageAction::PlantDisinformation => 25,
            EspionageAction::CounterIntelSweep => 15,
        }
    }

    /// Detection-roll modifier; riskier actions are easier to catch.
    pub fn detection_modifier(&self) -> i32 {
        match self {
            EspionageAction::SabotageLow => 0,
            EspionageAction::SabotageHigh => 3,
            EspionageAction::TechTheft => 2,
            EspionageAction::Assassination => 4,
            EspionageAction::EconomicManipulation => 1,
            EspionageAction::CyberAttack => 1,
            EspionageAction::PsyopsCampaign => 0,
            EspionageAction::IntelTheft => 1,
            EspionageAction::PlantDisinformation => 0,
            EspionageAction::CounterIntelSweep => 0,
        }
    }
}

/// A submitted covert action against another house.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EspionageOrder {
    pub action: EspionageAction,
    pub target: HouseId,
}

/// A per-colony build order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BuildOrder {
    pub colony: ColonyId,
    pub subject: BuildSubject,
    /// Dock to build at; required for ships, ignored otherwise.
    pub dock: Option<DockRef>,
}

/// A per-colony repair order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RepairOrder {
    pub colony: ColonyId,
    pub subject: RepairSubject,
}

/// PP routed into the three research pools this turn.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ResearchAllocation {
    pub erp: u32,
    pub srp: u32,
    pub trp: u32,
}

impl ResearchAllocation {
    pub fn total(&self) -> u32 {
        self.erp + self.srp + self.trp
    }
}

/// Everything a house submits for one turn.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct CommandPacket {
    /// New house tax rate, if changing.
    pub tax_rate: Option<u8>,
    pub research: ResearchAllocation,
    /// Tech tiers to purchase this turn, in submission order.
    pub tech_orders: Vec<TechField>,
    pub diplomacy: Vec<(HouseId, DiplomaticStance)>,
    /// PP moved into the espionage budget.
    pub ebp_investment: u32,
    /// PP moved into counter-intelligence.
    pub cip_investment: u32,
    /// At most one covert action per turn.
    pub espionage: Option<EspionageOrder>,
    pub builds: Vec<BuildOrder>,
    pub repairs: Vec<RepairOrder>,
    /// Projects to cancel for a 50% refund.
    pub cancellations: Vec<ConstructionProjectId>,
    pub fleet_orders: Vec<FleetOrderRequest>,
    /// Ships to strip from colonies into a new fleet, by flagship.
    pub commissions: Vec<CommissionOrder>,
}

/// Forming unassigned squadrons at a colony into a fleet.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommissionOrder {
    pub colony: ColonyId,
    /// Flagship ids of the unassigned squadrons to commission.
    pub squadrons: Vec<ShipId>,
    /// Join an existing fleet in the system, or form a new one.
    pub into_fleet: Option<FleetId>,
}
