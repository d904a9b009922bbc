use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::GameError;
use crate::game::ledger::Cost;

// ── Machine types ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MachineType {
    CatLair,
    Reactor,
    Amplifier,
    Incubator,
}

impl MachineType {
    pub const ALL: [MachineType; 4] = [
        MachineType::CatLair,
        MachineType::Reactor,
        MachineType::Amplifier,
        MachineType::Incubator,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MachineType::CatLair => "catLair",
            MachineType::Reactor => "reactor",
            MachineType::Amplifier => "amplifier",
            MachineType::Incubator => "incubator",
        }
    }

    pub fn def(self) -> &'static MachineDef {
        machine_def(self)
    }
}

impl fmt::Display for MachineType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MachineType {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MachineType::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| GameError::UnknownMachineType(s.to_string()))
    }
}

// ── Machine definition ──────────────────────────────────────────────

pub struct MachineDef {
    pub name: &'static str,
    /// Price of the n-th instance, indexed by how many already exist. The
    /// length of this table is the per-user instance cap.
    pub build_costs: &'static [Cost],
    pub max_level: u32,
    /// Extra factor on every upgrade of the second-created instance.
    pub second_instance_multiplier: f64,
}

impl MachineDef {
    pub fn max_instances(&self) -> usize {
        self.build_costs.len()
    }

    /// Level-1 unit price every upgrade is scaled from.
    pub fn base_unit_cost(&self) -> Cost {
        self.build_costs[0]
    }
}

static CAT_LAIR: MachineDef = MachineDef {
    name: "Cat Lair",
    build_costs: &[Cost::new(10.0, 0.0, 0.0), Cost::new(40.0, 0.0, 0.0)],
    max_level: 3,
    second_instance_multiplier: 4.0,
};

static REACTOR: MachineDef = MachineDef {
    name: "Reactor",
    build_costs: &[Cost::new(10.0, 10.0, 0.0), Cost::new(40.0, 40.0, 0.0)],
    max_level: 3,
    second_instance_multiplier: 4.0,
};

static AMPLIFIER: MachineDef = MachineDef {
    name: "Amplifier",
    build_costs: &[Cost::new(10.0, 10.0, 10.0)],
    max_level: 5,
    second_instance_multiplier: 1.0,
};

static INCUBATOR: MachineDef = MachineDef {
    name: "Incubator",
    build_costs: &[Cost::new(320.0, 320.0, 320.0)],
    max_level: 1,
    second_instance_multiplier: 1.0,
};

/// Looks up the static definition for a machine type.
pub fn machine_def(kind: MachineType) -> &'static MachineDef {
    match kind {
        MachineType::CatLair => &CAT_LAIR,
        MachineType::Reactor => &REACTOR,
        MachineType::Amplifier => &AMPLIFIER,
        MachineType::Incubator => &INCUBATOR,
    }
}

// ── Placed machine ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Machine {
    /// Unique per user, assigned in creation order.
    pub id: u64,
    #[serde(rename = "type")]
    pub kind: MachineType,
    pub x: i64,
    pub y: i64,
    pub level: u32,
    /// Milliseconds since epoch, 0 = never activated.
    pub last_activated: i64,
    pub is_offline: bool,
    /// Next amplifier upkeep due time in ms, 0 = unset.
    pub next_cost_time: i64,
}

impl Machine {
    pub fn new(id: u64, kind: MachineType, x: i64, y: i64) -> Self {
        Self {
            id,
            kind,
            x,
            y,
            level: 1,
            last_activated: 0,
            // Incubators stay dormant until their first activation.
            is_offline: kind == MachineType::Incubator,
            next_cost_time: 0,
        }
    }
}

/// Machines of one type in creation order.
pub fn of_type(machines: &[Machine], kind: MachineType) -> impl Iterator<Item = &Machine> {
    machines.iter().filter(move |m| m.kind == kind)
}

pub fn count_of_type(machines: &[Machine], kind: MachineType) -> usize {
    of_type(machines, kind).count()
}

/// Creation-order position (0-indexed) of `machine` among machines of its type.
pub fn rank_of(machines: &[Machine], machine: &Machine) -> Option<usize> {
    of_type(machines, machine.kind).position(|m| m.id == machine.id)
}
