use serde::{Deserialize, Serialize};

use crate::error::ErrorBody;
use crate::game::ledger::Wallet;
use crate::game::machines::{Machine, MachineType};

pub const STATUS_OK: &str = "ok";

// ── Requests ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutEntry {
    pub id: u64,
    #[serde(default)]
    pub x: i64,
    #[serde(default)]
    pub y: i64,
}

/// Every game operation a client can ask for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum GameRequest {
    GetGameState,
    #[serde(rename_all = "camelCase")]
    BuildMachine {
        machine_type: String,
        #[serde(default)]
        x: i64,
        #[serde(default)]
        y: i64,
    },
    #[serde(rename_all = "camelCase")]
    UpgradeMachine { machine_id: u64 },
    #[serde(rename_all = "camelCase")]
    ActivateMachine {
        machine_id: u64,
        #[serde(default)]
        staked_cvx: Option<f64>,
    },
    SyncLayout {
        #[serde(default)]
        machines: Vec<LayoutEntry>,
    },
}

// ── Responses ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineView {
    pub id: u64,
    #[serde(rename = "type")]
    pub kind: MachineType,
    pub x: i64,
    pub y: i64,
    pub level: u32,
    pub last_activated: i64,
    pub is_offline: bool,
}

impl From<&Machine> for MachineView {
    fn from(m: &Machine) -> Self {
        Self {
            id: m.id,
            kind: m.kind,
            x: m.x,
            y: m.y,
            level: m.level,
            last_activated: m.last_activated,
            is_offline: m.is_offline,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStateView {
    pub tcorvax: f64,
    pub cat_nips: f64,
    pub energy: f64,
    pub machines: Vec<MachineView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildResponse {
    pub status: &'static str,
    pub machine_id: u64,
    pub machine_type: MachineType,
    pub new_resources: Wallet,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpgradeResponse {
    pub status: &'static str,
    pub machine_id: u64,
    pub new_level: u32,
    pub new_resources: Wallet,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ActivateResponse {
    #[serde(rename_all = "camelCase")]
    Status {
        status: &'static str,
        message: &'static str,
    },
    #[serde(rename_all = "camelCase")]
    IncubatorOnline {
        status: &'static str,
        message: &'static str,
        new_last_activated: i64,
    },
    #[serde(rename_all = "camelCase")]
    IncubatorReward {
        status: &'static str,
        machine_id: u64,
        machine_type: MachineType,
        new_last_activated: i64,
        #[serde(rename = "stakedCVX")]
        staked_cvx: f64,
        reward: u32,
        updated_resources: Wallet,
    },
    #[serde(rename_all = "camelCase")]
    Produced {
        status: &'static str,
        machine_id: u64,
        machine_type: MachineType,
        new_last_activated: i64,
        updated_resources: Wallet,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutResponse {
    pub status: &'static str,
    pub message: &'static str,
    /// Entries that were not applied (unknown id, out of bounds, overlap).
    pub skipped: Vec<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WhoAmI {
    pub logged_in: bool,
    pub first_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum GameResponse {
    State(GameStateView),
    Built(BuildResponse),
    Upgraded(UpgradeResponse),
    Activated(ActivateResponse),
    Layout(LayoutResponse),
}

// ── WebSocket framing ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    /// Binds the connection to a user the auth layer has already verified.
    #[serde(rename_all = "camelCase")]
    Login {
        user_id: String,
        #[serde(default)]
        first_name: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Request { request_id: u64, request: GameRequest },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage {
    #[serde(rename_all = "camelCase")]
    Welcome { user_id: String, created: bool },
    #[serde(rename_all = "camelCase")]
    Response { request_id: u64, body: GameResponse },
    #[serde(rename_all = "camelCase")]
    Error {
        request_id: Option<u64>,
        error: ErrorBody,
    },
}
