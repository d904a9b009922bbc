use tracing::debug;

use crate::game::machines::MachineType;
use crate::game::state::UserState;

pub const DAY_MS: i64 = 86_400_000;

/// Energy an amplifier burns per day at `level`.
pub fn daily_cost(level: u32) -> f64 {
    2.0 * f64::from(level)
}

/// Upkeep-relevant state of one amplifier plus the user's energy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Upkeep {
    pub next_cost_time: i64,
    pub energy: f64,
    pub is_offline: bool,
}

/// Advances one amplifier's upkeep to `now`.
///
/// An unset due time (0) is initialized to one day from now. While online,
/// every due day is paid in order; the first day that cannot be paid takes
/// the amplifier offline and leaves `next_cost_time` at that day. While
/// offline, a single payment is attempted when due; success brings it back
/// online with the next payment a full day from now. Missed days are never
/// backlogged.
pub fn catch_up(now: i64, level: u32, upkeep: Upkeep) -> Upkeep {
    let Upkeep {
        mut next_cost_time,
        mut energy,
        mut is_offline,
    } = upkeep;
    let cost = daily_cost(level);

    if next_cost_time == 0 {
        next_cost_time = now + DAY_MS;
    }

    if !is_offline {
        while next_cost_time <= now {
            if energy >= cost {
                energy -= cost;
                next_cost_time += DAY_MS;
            } else {
                is_offline = true;
                break;
            }
        }
    } else if next_cost_time <= now && energy >= cost {
        energy -= cost;
        next_cost_time = now + DAY_MS;
        is_offline = false;
    }

    Upkeep {
        next_cost_time,
        energy,
        is_offline,
    }
}

/// Runs [`catch_up`] for every amplifier the user owns, in creation order,
/// threading the shared energy balance through them. Returns `true` if
/// anything changed.
pub fn tick_amplifiers(state: &mut UserState, now: i64) -> bool {
    let mut changed = false;
    let mut energy = state.wallet.energy;

    for amp in state
        .machines
        .iter_mut()
        .filter(|m| m.kind == MachineType::Amplifier)
    {
        let before = Upkeep {
            next_cost_time: amp.next_cost_time,
            energy,
            is_offline: amp.is_offline,
        };
        let after = catch_up(now, amp.level, before);
        if after != before {
            debug!(
                "amplifier {} caught up: energy {} -> {}, offline {} -> {}, next due {}",
                amp.id, before.energy, after.energy, before.is_offline, after.is_offline, after.next_cost_time
            );
            changed = true;
        }
        amp.next_cost_time = after.next_cost_time;
        amp.is_offline = after.is_offline;
        energy = after.energy;
    }

    state.wallet.energy = energy;
    changed
}
