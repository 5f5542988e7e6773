//! Error taxonomy.
//!
//! Three tiers, with different propagation:
//! - validation errors reject a command and surface to the submitter;
//! - resolution anomalies are *not* errors — resolvers recover locally
//!   and emit ordinary in-game events;
//! - invariant breaches are fatal: the turn aborts and the pre-phase
//!   state is what persists.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::TurnPhase;

/// Machine-readable reason a command was rejected.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ValidationCode {
    UnknownEntity = 0,
    NotOwner = 1,
    InsufficientTreasury = 2,
    InsufficientEspionageBudget = 3,
    PathNotFound = 4,
    WrongShipKind = 5,
    CapacityExceeded = 6,
    InvalidRoe = 7,
    SubmittedAfterDeadline = 8,
    TurnMismatch = 9,
    InvalidTarget = 10,
    InsufficientPool = 11,
    SlGated = 12,
    HouseInactive = 13,
    DuplicateOrder = 14,
}

/// A rejected command, with the entities it referenced.
#[derive(Debug, Clone, Serialize, Deserialize, Error, PartialEq, Eq)]
#[error("validation failed ({code:?}): {message}")]
pub struct ValidationError {
    pub code: ValidationCode,
    pub message: String,
    /// Raw id values of the entities involved, for client highlighting.
    pub entity_refs: Vec<u32>,
}

impl ValidationError {
    pub fn new(code: ValidationCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            entity_refs: Vec::new(),
        }
    }

    pub fn with_refs(mut self, refs: impl IntoIterator<Item = u32>) -> Self {
        self.entity_refs.extend(refs);
        self
    }
}

/// Fatal engine failures. Any of these aborts the turn; the offending
/// entity id and phase name are preserved for the crash report.
#[derive(Debug, Clone, Serialize, Deserialize, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("command rejected: {0}")]
    Validation(#[from] ValidationError),

    #[error("secondary index desynchronized for {index} during {phase}")]
    IndexDesynchronized { index: String, phase: TurnPhase },

    #[error("required entity {entity_id} missing during {phase}")]
    MissingEntity { entity_id: u32, phase: TurnPhase },

    #[error("game {game_id} not found")]
    GameNotFound { game_id: u64 },

    #[error("state serialization failed: {0}")]
    Serialization(String),
}

pub type EngineResult<T> = Result<T, EngineError>;
