use serde::Serialize;
use thiserror::Error;

// ── Error categories ────────────────────────────────────────────────

/// Coarse grouping of [`GameError`] variants, used by the transports to pick
/// a status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Unauthenticated,
    NotFound,
    Validation,
    Storage,
}

// ── Game errors ─────────────────────────────────────────────────────

/// Every way a game operation can be rejected.
///
/// A rejected operation never leaves a partial mutation behind; see
/// [`crate::store::UserSlot::step`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GameError {
    #[error("Not logged in")]
    Unauthenticated,

    #[error("User not found")]
    UserNotFound,
    #[error("Machine {0} not found")]
    MachineNotFound(u64),

    #[error("Unknown machine type: {0}")]
    UnknownMachineType(String),
    #[error("Cannot build more of this machine type.")]
    Unbuildable,
    #[error("Cannot upgrade further.")]
    MaxLevel,
    #[error("Gating not met for this upgrade.")]
    GatingNotMet,
    #[error("All machines must be at max level to build Incubator.")]
    IncubatorLocked,
    #[error("Not enough resources")]
    InsufficientResources,
    #[error("Cannot build outside map boundaries.")]
    OutOfBounds,
    #[error("Cannot build here!")]
    Overlap,
    #[error("Cooldown not finished")]
    Cooldown { remaining_ms: i64 },
    #[error("Staked amount must be a non-negative number")]
    InvalidStake,
    #[error("Invalid user id")]
    InvalidUserId,
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("storage failure: {0}")]
    Storage(String),
}

impl GameError {
    /// Stable, machine-readable reason code.
    pub fn code(&self) -> &'static str {
        match self {
            GameError::Unauthenticated => "unauthenticated",
            GameError::UserNotFound => "user_not_found",
            GameError::MachineNotFound(_) => "machine_not_found",
            GameError::UnknownMachineType(_) => "unknown_machine_type",
            GameError::Unbuildable => "unbuildable",
            GameError::MaxLevel => "max_level",
            GameError::GatingNotMet => "gating_not_met",
            GameError::IncubatorLocked => "incubator_locked",
            GameError::InsufficientResources => "insufficient_resources",
            GameError::OutOfBounds => "out_of_bounds",
            GameError::Overlap => "overlap",
            GameError::Cooldown { .. } => "cooldown",
            GameError::InvalidStake => "invalid_stake",
            GameError::InvalidUserId => "invalid_user_id",
            GameError::BadRequest(_) => "bad_request",
            GameError::Storage(_) => "storage",
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            GameError::Unauthenticated => ErrorCategory::Unauthenticated,
            GameError::UserNotFound | GameError::MachineNotFound(_) => ErrorCategory::NotFound,
            GameError::Storage(_) => ErrorCategory::Storage,
            _ => ErrorCategory::Validation,
        }
    }

    /// HTTP status code for the JSON API.
    pub fn http_status(&self) -> u16 {
        match self.category() {
            ErrorCategory::Unauthenticated => 401,
            ErrorCategory::NotFound => 404,
            ErrorCategory::Validation => 400,
            ErrorCategory::Storage => 500,
        }
    }

    pub fn to_body(&self) -> ErrorBody {
        let remaining_ms = match self {
            GameError::Cooldown { remaining_ms } => Some(*remaining_ms),
            _ => None,
        };
        ErrorBody {
            error: self.to_string(),
            code: self.code().to_string(),
            remaining_ms,
        }
    }
}

impl From<std::io::Error> for GameError {
    fn from(e: std::io::Error) -> Self {
        GameError::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for GameError {
    fn from(e: serde_json::Error) -> Self {
        GameError::Storage(e.to_string())
    }
}

// ── Wire form ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub remaining_ms: Option<i64>,
}
