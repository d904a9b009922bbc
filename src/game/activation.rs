use tracing::debug;

use crate::error::GameError;
use crate::game::ledger::Cost;
use crate::game::machines::{of_type, MachineType};
use crate::game::state::UserState;

/// Minimum time between two activations of the same machine.
pub const COOLDOWN_MS: i64 = 10_000;

const CAT_LAIR_BASE_YIELD: f64 = 5.0;
const REACTOR_CAT_NIP_COST: f64 = 3.0;
const REACTOR_ENERGY_YIELD: f64 = 2.0;
const AMPLIFIER_BONUS_PER_LEVEL: f64 = 0.5;
const INCUBATOR_STAKE_PER_REWARD: f64 = 100.0;
const INCUBATOR_MAX_REWARD: u32 = 10;

/// What an activation did, for the caller to report.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Activation {
    /// Amplifiers are never "run"; activating one only reads its status.
    AmplifierStatus { online: bool },
    IncubatorOnline { at: i64 },
    IncubatorReward { at: i64, staked: f64, reward: u32 },
    Produced { at: i64 },
}

fn reactor_base_yield(level: u32) -> f64 {
    match level {
        2 => 1.5,
        3 => 2.0,
        _ => 1.0,
    }
}

/// Reward for an incubator run given the (client-asserted) staked amount.
/// Whole tcorvax only; callers reject negative and non-finite stakes first.
pub fn incubator_reward(staked: f64) -> u32 {
    let units = (staked / INCUBATOR_STAKE_PER_REWARD).floor();
    if units >= f64::from(INCUBATOR_MAX_REWARD) {
        INCUBATOR_MAX_REWARD
    } else {
        units as u32
    }
}

/// Activates machine `machine_id` at `now`.
///
/// The caller is expected to have run the amplifier catch-up first so the
/// reactor bonus sees the current online state. On error `state` may be
/// partially modified; run this inside a store step so it is discarded.
pub fn activate(
    state: &mut UserState,
    machine_id: u64,
    now: i64,
    staked: Option<f64>,
) -> Result<Activation, GameError> {
    let machine = state.machine(machine_id)?;
    let (kind, level, last_activated, is_offline) = (
        machine.kind,
        machine.level,
        machine.last_activated,
        machine.is_offline,
    );

    let elapsed = now - last_activated;
    if kind != MachineType::Amplifier && elapsed < COOLDOWN_MS {
        return Err(GameError::Cooldown {
            remaining_ms: COOLDOWN_MS - elapsed,
        });
    }

    let outcome = match kind {
        MachineType::Amplifier => {
            return Ok(Activation::AmplifierStatus {
                online: !is_offline,
            })
        }
        MachineType::CatLair => {
            state.wallet.cat_nips += CAT_LAIR_BASE_YIELD + f64::from(level - 1);
            Activation::Produced { at: now }
        }
        MachineType::Reactor => {
            state
                .wallet
                .debit(&Cost::new(0.0, REACTOR_CAT_NIP_COST, 0.0))?;
            let mut gain = reactor_base_yield(level);
            if let Some(amp) = of_type(&state.machines, MachineType::Amplifier).next() {
                if !amp.is_offline {
                    gain += AMPLIFIER_BONUS_PER_LEVEL * f64::from(amp.level);
                }
            }
            state.wallet.tcorvax += gain;
            state.wallet.energy += REACTOR_ENERGY_YIELD;
            Activation::Produced { at: now }
        }
        MachineType::Incubator if last_activated == 0 => {
            state.machine_mut(machine_id)?.is_offline = false;
            Activation::IncubatorOnline { at: now }
        }
        MachineType::Incubator => {
            let staked = staked.unwrap_or(0.0);
            if !staked.is_finite() || staked < 0.0 {
                return Err(GameError::InvalidStake);
            }
            let reward = incubator_reward(staked);
            state.wallet.tcorvax += f64::from(reward);
            Activation::IncubatorReward {
                at: now,
                staked,
                reward,
            }
        }
    };

    state.machine_mut(machine_id)?.last_activated = now;
    debug!("machine {} ({}) activated at {}", machine_id, kind, now);
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000_000;

    fn state_with(kind: MachineType, level: u32) -> (UserState, u64) {
        let mut state = UserState::new("u");
        let id = state.add_machine(kind, 0, 0);
        state.machine_mut(id).unwrap().level = level;
        (state, id)
    }

    #[test]
    fn cat_lair_yield_scales_with_level() {
        let (mut state, id) = state_with(MachineType::CatLair, 3);
        let outcome = activate(&mut state, id, NOW, None).unwrap();
        assert_eq!(outcome, Activation::Produced { at: NOW });
        assert_eq!(state.wallet.cat_nips, 7.0);
        assert_eq!(state.machine(id).unwrap().last_activated, NOW);
    }

    #[test]
    fn second_activation_inside_cooldown_is_rejected() {
        let (mut state, id) = state_with(MachineType::CatLair, 1);
        activate(&mut state, id, NOW, None).unwrap();
        let after_first = state.clone();

        let result = activate(&mut state, id, NOW + 4_000, None);
        assert_eq!(result, Err(GameError::Cooldown { remaining_ms: 6_000 }));
        assert_eq!(state, after_first);

        assert!(activate(&mut state, id, NOW + COOLDOWN_MS, None).is_ok());
    }

    #[test]
    fn reactor_needs_three_cat_nips() {
        let (mut state, id) = state_with(MachineType::Reactor, 1);
        state.wallet.cat_nips = 2.0;
        let before = state.clone();

        let result = activate(&mut state, id, NOW, None);
        assert_eq!(result, Err(GameError::InsufficientResources));
        assert_eq!(state, before);
    }

    #[test]
    fn reactor_converts_cat_nips() {
        let (mut state, id) = state_with(MachineType::Reactor, 2);
        state.wallet.cat_nips = 10.0;

        activate(&mut state, id, NOW, None).unwrap();
        assert_eq!(state.wallet.cat_nips, 7.0);
        assert_eq!(state.wallet.tcorvax, 1.5);
        assert_eq!(state.wallet.energy, 2.0);
    }

    #[test]
    fn online_amplifier_boosts_reactor() {
        let (mut state, reactor) = state_with(MachineType::Reactor, 3);
        let amp = state.add_machine(MachineType::Amplifier, 200, 0);
        state.machine_mut(amp).unwrap().level = 2;
        state.wallet.cat_nips = 3.0;

        activate(&mut state, reactor, NOW, None).unwrap();
        assert_eq!(state.wallet.tcorvax, 3.0);
    }

    #[test]
    fn offline_amplifier_gives_no_bonus() {
        let (mut state, reactor) = state_with(MachineType::Reactor, 1);
        let amp = state.add_machine(MachineType::Amplifier, 200, 0);
        state.machine_mut(amp).unwrap().is_offline = true;
        state.wallet.cat_nips = 3.0;

        activate(&mut state, reactor, NOW, None).unwrap();
        assert_eq!(state.wallet.tcorvax, 1.0);
    }

    #[test]
    fn amplifier_activation_is_a_status_read() {
        let (mut state, id) = state_with(MachineType::Amplifier, 1);
        state.machine_mut(id).unwrap().last_activated = NOW;
        let before = state.clone();

        let outcome = activate(&mut state, id, NOW + 1, None).unwrap();
        assert_eq!(outcome, Activation::AmplifierStatus { online: true });
        assert_eq!(state, before);
    }

    #[test]
    fn incubator_first_activation_brings_it_online() {
        let (mut state, id) = state_with(MachineType::Incubator, 1);
        assert!(state.machine(id).unwrap().is_offline);

        let outcome = activate(&mut state, id, NOW, Some(5_000.0)).unwrap();
        assert_eq!(outcome, Activation::IncubatorOnline { at: NOW });
        assert!(!state.machine(id).unwrap().is_offline);
        assert_eq!(state.wallet.tcorvax, 0.0);
    }

    #[test]
    fn incubator_reward_is_capped() {
        let (mut state, id) = state_with(MachineType::Incubator, 1);
        activate(&mut state, id, NOW, None).unwrap();

        let outcome = activate(&mut state, id, NOW + COOLDOWN_MS, Some(1050.0)).unwrap();
        assert_eq!(
            outcome,
            Activation::IncubatorReward {
                at: NOW + COOLDOWN_MS,
                staked: 1050.0,
                reward: 10
            }
        );
        assert_eq!(state.wallet.tcorvax, 10.0);
        assert_eq!(incubator_reward(350.0), 3);
        assert_eq!(incubator_reward(99.0), 0);
    }

    #[test]
    fn negative_stake_is_rejected() {
        let (mut state, id) = state_with(MachineType::Incubator, 1);
        activate(&mut state, id, NOW, None).unwrap();
        let result = activate(&mut state, id, NOW + COOLDOWN_MS, Some(-500.0));
        assert_eq!(result, Err(GameError::InvalidStake));
    }

    #[test]
    fn unknown_machine() {
        let mut state = UserState::new("u");
        assert_eq!(
            activate(&mut state, 3, NOW, None),
            Err(GameError::MachineNotFound(3))
        );
    }
}
