use serde::{Deserialize, Serialize};

use crate::error::GameError;

// ── Cost ────────────────────────────────────────────────────────────

/// A price in the three game currencies. Components not charged are zero.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cost {
    pub tcorvax: f64,
    pub cat_nips: f64,
    pub energy: f64,
}

impl Cost {
    pub const fn new(tcorvax: f64, cat_nips: f64, energy: f64) -> Self {
        Self {
            tcorvax,
            cat_nips,
            energy,
        }
    }

    /// Multiplies every component by `factor`.
    pub fn scaled(self, factor: f64) -> Self {
        Self {
            tcorvax: self.tcorvax * factor,
            cat_nips: self.cat_nips * factor,
            energy: self.energy * factor,
        }
    }
}

// ── Wallet ──────────────────────────────────────────────────────────

/// Per-user balances. A currency that was never touched reads as zero.
///
/// Balances never go negative: every debit goes through [`Wallet::debit`],
/// which checks all components before changing any of them.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Wallet {
    pub tcorvax: f64,
    pub cat_nips: f64,
    pub energy: f64,
}

impl Wallet {
    pub fn can_afford(&self, cost: &Cost) -> bool {
        self.tcorvax >= cost.tcorvax && self.cat_nips >= cost.cat_nips && self.energy >= cost.energy
    }

    pub fn debit(&mut self, cost: &Cost) -> Result<(), GameError> {
        if !self.can_afford(cost) {
            return Err(GameError::InsufficientResources);
        }
        self.tcorvax -= cost.tcorvax;
        self.cat_nips -= cost.cat_nips;
        self.energy -= cost.energy;
        Ok(())
    }
}
