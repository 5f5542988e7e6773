//! Engine event stream and the per-turn result envelope.
//!
//! Every phase emits events; the fog-of-war projector later filters them
//! per house by audience. Prestige changes are themselves events — the
//! prestige engine is the only writer of house prestige and applies these
//! after dynamic scaling.

use serde::{Deserialize, Serialize};

use crate::colony::BuildSubject;
use crate::commands::EspionageAction;
use crate::ids::{ColonyId, ConstructionProjectId, FleetId, HouseId, ShipId, StarbaseId, SystemId};
use crate::ground::FacilityKind;
use crate::tech::TechField;
use crate::types::{HullState, SquadronBucket, TurnPhase};

/// Why prestige moved.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PrestigeReason {
    CombatKill = 0,
    CombatLoss = 1,
    RetreatForced = 2,
    Colonization = 3,
    ColonyCaptured = 4,
    ColonyLost = 5,
    TaxPolicy = 6,
    MaintenanceShortfall = 7,
    EspionageSuccess = 8,
    EspionageCompromised = 9,
    TechAdvance = 10,
}

/// A pre-scaling prestige mutation. The prestige engine multiplies by the
/// map-size factor and applies it at the Income Phase.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PrestigeEvent {
    pub house: HouseId,
    pub amount: i64,
    pub reason: PrestigeReason,
    /// The system where it happened, when meaningful.
    pub source: Option<SystemId>,
}

/// Who may see an event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum EventAudience {
    Public,
    House(HouseId),
    Houses(Vec<HouseId>),
}

impl EventAudience {
    pub fn includes(&self, house: HouseId) -> bool {
        match self {
            EventAudience::Public => true,
            EventAudience::House(h) => *h == house,
            EventAudience::Houses(hs) => hs.contains(&house),
        }
    }
}

/// Why a fleet stayed put.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[repr(u8)]
pub enum HoldReason {
    NoPath = 0,
    DestinationLost = 1,
    DefensiveCollapse = 2,
}

/// Victory conditions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[repr(u8)]
pub enum VictoryCondition {
    TurnLimit = 0,
    LastHouseStanding = 1,
    PrestigeThreshold = 2,
}

/// Everything the engine reports about a turn.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum EventKind {
    // ========== Prestige & lifecycle ==========
    PrestigeChanged {
        house: HouseId,
        amount: i64,
        reason: PrestigeReason,
    },
    HouseEliminated {
        house: HouseId,
    },
    HouseCollapsed {
        house: HouseId,
    },
    HouseRecovered {
        house: HouseId,
    },
    AutopilotEngaged {
        house: HouseId,
    },
    AutopilotCleared {
        house: HouseId,
    },
    VictoryAchieved {
        house: HouseId,
        condition: VictoryCondition,
    },

    // ========== Colonies & construction ==========
    ColonyFounded {
        house: HouseId,
        colony: ColonyId,
        system: SystemId,
    },
    ColonizationContested {
        system: SystemId,
        winner: HouseId,
        losers: Vec<HouseId>,
    },
    ColonizationFailed {
        house: HouseId,
        system: SystemId,
    },
    ConstructionCompleted {
        colony: ColonyId,
        project: ConstructionProjectId,
        subject: BuildSubject,
    },
    ConstructionCancelled {
        colony: ColonyId,
        project: ConstructionProjectId,
        refund: u32,
    },
    ConstructionLost {
        colony: ColonyId,
        project: ConstructionProjectId,
    },
    RepairCompleted {
        colony: ColonyId,
    },
    TerraformCompleted {
        colony: ColonyId,
    },
    CapacityEnforced {
        house: HouseId,
        colony: Option<ColonyId>,
        disbanded: u32,
    },

    // ========== Economy ==========
    MaintenanceShortfall {
        house: HouseId,
        deficit: u32,
    },
    GuildClaim {
        house: HouseId,
        ship: ShipId,
        refund: u32,
    },
    BlockadeEstablished {
        colony: ColonyId,
        by: HouseId,
    },
    BlockadeLifted {
        colony: ColonyId,
    },

    // ========== Research ==========
    TechAdvanced {
        house: HouseId,
        field: TechField,
        tier: u8,
    },
    ScienceLevelAdvanced {
        house: HouseId,
        sl: u8,
    },

    // ========== Movement ==========
    FleetMoved {
        fleet: FleetId,
        from: SystemId,
        to: SystemId,
    },
    FleetHeld {
        fleet: FleetId,
        reason: HoldReason,
    },
    FleetsJoined {
        into: FleetId,
        absorbed: FleetId,
    },
    FleetSalvaged {
        fleet: FleetId,
        refund: u32,
    },

    // ========== Combat ==========
    CombatResolved {
        system: SystemId,
        participants: Vec<HouseId>,
    },
    SquadronDestroyed {
        system: SystemId,
        flagship: ShipId,
        house: HouseId,
        by: HouseId,
    },
    FleetRetreated {
        fleet: FleetId,
        from: SystemId,
        to: SystemId,
    },
    FacilityDestroyed {
        colony: ColonyId,
        kind: FacilityKind,
    },
    ColonyBombarded {
        colony: ColonyId,
        iu_destroyed: u32,
        pu_killed: u32,
    },
    ColonyCaptured {
        colony: ColonyId,
        from: HouseId,
        to: HouseId,
    },
    InvasionRepelled {
        colony: ColonyId,
        attacker: HouseId,
    },

    // ========== Espionage ==========
    EspionageSucceeded {
        attacker: HouseId,
        action: EspionageAction,
        target: HouseId,
    },
    EspionageDetected {
        attacker: HouseId,
        target: HouseId,
        action: EspionageAction,
    },
    UnusualActivity {
        system: SystemId,
    },
    ScoutLost {
        house: HouseId,
        system: SystemId,
    },
}

/// One event with its provenance and audience.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Event {
    pub turn: u32,
    pub phase: TurnPhase,
    pub audience: EventAudience,
    pub kind: EventKind,
}

// ========== Combat reports ==========

/// Combat theater, in resolution order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Theater {
    Space = 0,
    Orbital = 1,
    Planetary = 2,
}

/// How a theater ended.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[repr(u8)]
pub enum TheaterOutcome {
    AttackerVictory = 0,
    DefenderVictory = 1,
    Stalemate = 2,
    MutualDisengagement = 3,
}

/// Final state of one squadron after a theater.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SquadronResult {
    pub flagship: ShipId,
    pub house: HouseId,
    pub bucket: SquadronBucket,
    pub state_after: HullState,
}

/// Per-theater summary inside a combat report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TheaterReport {
    pub theater: Theater,
    pub rounds: u8,
    pub outcome: TheaterOutcome,
    pub squadrons: Vec<SquadronResult>,
    /// Starbases destroyed this theater.
    pub starbases_destroyed: Vec<StarbaseId>,
}

/// Full report for one system's battle, delivered to every combatant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CombatReport {
    pub system: SystemId,
    pub participants: Vec<HouseId>,
    pub theaters: Vec<TheaterReport>,
}

/// Wire-format version of the turn envelope.
pub const TURN_RESULT_VERSION: u16 = 1;

/// The append-only envelope persisted per `(game, turn)`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TurnResult {
    pub version: u16,
    pub game_id: u64,
    pub turn: u32,
    /// Hex SHA3-256 of the canonical post-turn state.
    pub state_digest: String,
    pub events: Vec<Event>,
    pub combat_reports: Vec<CombatReport>,
}
