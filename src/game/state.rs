use serde::{Deserialize, Serialize};

use crate::error::GameError;
use crate::game::ledger::Wallet;
use crate::game::machines::{Machine, MachineType};

pub type UserId = String;

/// Everything the engine knows about one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserState {
    pub user_id: UserId,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub wallet: Wallet,
    /// Kept in ascending id order, which is creation order.
    #[serde(default)]
    pub machines: Vec<Machine>,
    #[serde(default = "first_machine_id")]
    pub next_machine_id: u64,
}

fn first_machine_id() -> u64 {
    1
}

impl UserState {
    pub fn new(user_id: impl Into<UserId>) -> Self {
        Self {
            user_id: user_id.into(),
            first_name: None,
            wallet: Wallet::default(),
            machines: Vec::new(),
            next_machine_id: first_machine_id(),
        }
    }

    pub fn machine(&self, id: u64) -> Result<&Machine, GameError> {
        self.machines
            .iter()
            .find(|m| m.id == id)
            .ok_or(GameError::MachineNotFound(id))
    }

    pub fn machine_mut(&mut self, id: u64) -> Result<&mut Machine, GameError> {
        self.machines
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or(GameError::MachineNotFound(id))
    }

    /// Appends a new level-1 machine and returns its id.
    pub fn add_machine(&mut self, kind: MachineType, x: i64, y: i64) -> u64 {
        let id = self.next_machine_id;
        self.next_machine_id += 1;
        self.machines.push(Machine::new(id, kind, x, y));
        id
    }
}
