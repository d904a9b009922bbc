use std::sync::Arc;

use tracing::{info, warn};

use crate::clock::Clock;
use crate::error::GameError;
use crate::game::activation::{self, Activation};
use crate::game::amplifier::tick_amplifiers;
use crate::game::costs::{build_cost, incubator_unlocked, upgrade_cost};
use crate::game::machines::{count_of_type, MachineType};
use crate::game::placement::validate_placement;
use crate::game::state::UserState;
use crate::protocol::{
    ActivateResponse, BuildResponse, GameRequest, GameResponse, GameStateView, LayoutEntry,
    LayoutResponse, MachineView, UpgradeResponse, WhoAmI, STATUS_OK,
};
use crate::store::{GameStore, UserSlot};

/// The game-economy engine behind every transport.
///
/// Each operation locks the user, runs the amplifier catch-up as its own
/// committed step, then applies the operation as a second step.
pub struct GameService {
    store: GameStore,
    clock: Arc<dyn Clock>,
}

impl GameService {
    pub fn new(store: GameStore, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Login hook: called once the auth layer has verified `user_id`.
    pub fn register_user(&self, user_id: &str, first_name: Option<String>) -> Result<bool, GameError> {
        self.store.register(user_id, first_name)
    }

    pub fn whoami(&self, user_id: &str) -> Result<WhoAmI, GameError> {
        self.store.with_user(user_id, |slot| {
            Ok(WhoAmI {
                logged_in: true,
                first_name: slot
                    .state()
                    .first_name
                    .clone()
                    .unwrap_or_else(|| "Unknown".to_string()),
            })
        })
    }

    /// Routes a request to the matching operation.
    pub fn dispatch(&self, user_id: &str, request: GameRequest) -> Result<GameResponse, GameError> {
        let result = match request {
            GameRequest::GetGameState => self.get_game_state(user_id).map(GameResponse::State),
            GameRequest::BuildMachine { machine_type, x, y } => machine_type
                .parse::<MachineType>()
                .and_then(|kind| self.build_machine(user_id, kind, x, y))
                .map(GameResponse::Built),
            GameRequest::UpgradeMachine { machine_id } => self
                .upgrade_machine(user_id, machine_id)
                .map(GameResponse::Upgraded),
            GameRequest::ActivateMachine {
                machine_id,
                staked_cvx,
            } => self
                .activate_machine(user_id, machine_id, staked_cvx)
                .map(GameResponse::Activated),
            GameRequest::SyncLayout { machines } => {
                self.sync_layout(user_id, &machines).map(GameResponse::Layout)
            }
        };
        if let Err(e) = &result {
            warn!("Request from user {} rejected: {} ({})", user_id, e, e.code());
        }
        result
    }

    fn with_caught_up<T>(
        &self,
        user_id: &str,
        op: impl FnOnce(&mut UserSlot<'_>, i64) -> Result<T, GameError>,
    ) -> Result<T, GameError> {
        let now = self.clock.now_ms();
        self.store.with_user(user_id, |slot| {
            slot.step(|state| {
                tick_amplifiers(state, now);
                Ok(())
            })?;
            op(slot, now)
        })
    }

    pub fn get_game_state(&self, user_id: &str) -> Result<GameStateView, GameError> {
        self.with_caught_up(user_id, |slot, _| Ok(state_view(slot.state())))
    }

    pub fn build_machine(
        &self,
        user_id: &str,
        kind: MachineType,
        x: i64,
        y: i64,
    ) -> Result<BuildResponse, GameError> {
        self.with_caught_up(user_id, |slot, _| {
            slot.step(|state| {
                let existing = count_of_type(&state.machines, kind);
                let cost = build_cost(kind, existing).ok_or(GameError::Unbuildable)?;
                if kind == MachineType::Incubator && !incubator_unlocked(&state.machines) {
                    return Err(GameError::IncubatorLocked);
                }
                if !state.wallet.can_afford(&cost) {
                    return Err(GameError::InsufficientResources);
                }
                validate_placement(&state.machines, x, y, None)?;

                state.wallet.debit(&cost)?;
                let machine_id = state.add_machine(kind, x, y);
                info!(
                    "User {} built {} #{} at ({}, {})",
                    user_id,
                    kind.def().name,
                    machine_id,
                    x,
                    y
                );

                Ok(BuildResponse {
                    status: STATUS_OK,
                    machine_id,
                    machine_type: kind,
                    new_resources: state.wallet,
                })
            })
        })
    }

    pub fn upgrade_machine(&self, user_id: &str, machine_id: u64) -> Result<UpgradeResponse, GameError> {
        self.with_caught_up(user_id, |slot, _| {
            slot.step(|state| {
                let machine = state.machine(machine_id)?;
                let cost = upgrade_cost(&state.machines, machine)?;
                state.wallet.debit(&cost)?;

                let machine = state.machine_mut(machine_id)?;
                machine.level += 1;
                let new_level = machine.level;
                info!(
                    "User {} upgraded {} #{} to level {}",
                    user_id,
                    machine.kind.def().name,
                    machine_id,
                    new_level
                );

                Ok(UpgradeResponse {
                    status: STATUS_OK,
                    machine_id,
                    new_level,
                    new_resources: state.wallet,
                })
            })
        })
    }

    pub fn activate_machine(
        &self,
        user_id: &str,
        machine_id: u64,
        staked: Option<f64>,
    ) -> Result<ActivateResponse, GameError> {
        self.with_caught_up(user_id, |slot, now| {
            slot.step(|state| {
                let outcome = activation::activate(state, machine_id, now, staked)?;
                let machine_type = state.machine(machine_id)?.kind;
                Ok(match outcome {
                    Activation::AmplifierStatus { online } => ActivateResponse::Status {
                        status: STATUS_OK,
                        message: if online { "Online" } else { "Offline" },
                    },
                    Activation::IncubatorOnline { at } => ActivateResponse::IncubatorOnline {
                        status: STATUS_OK,
                        message: "Incubator Online",
                        new_last_activated: at,
                    },
                    Activation::IncubatorReward { at, staked, reward } => {
                        ActivateResponse::IncubatorReward {
                            status: STATUS_OK,
                            machine_id,
                            machine_type,
                            new_last_activated: at,
                            staked_cvx: staked,
                            reward,
                            updated_resources: state.wallet,
                        }
                    }
                    Activation::Produced { at } => ActivateResponse::Produced {
                        status: STATUS_OK,
                        machine_id,
                        machine_type,
                        new_last_activated: at,
                        updated_resources: state.wallet,
                    },
                })
            })
        })
    }

    /// Moves machines in bulk. Each entry is applied on its own; entries for
    /// unknown machines or positions that break bounds/overlap are skipped.
    pub fn sync_layout(&self, user_id: &str, entries: &[LayoutEntry]) -> Result<LayoutResponse, GameError> {
        self.with_caught_up(user_id, |slot, _| {
            slot.step(|state| {
                let mut skipped = Vec::new();
                for entry in entries {
                    let valid = state.machine(entry.id).is_ok()
                        && validate_placement(&state.machines, entry.x, entry.y, Some(entry.id)).is_ok();
                    if !valid {
                        skipped.push(entry.id);
                        continue;
                    }
                    let machine = state.machine_mut(entry.id)?;
                    machine.x = entry.x;
                    machine.y = entry.y;
                }
                Ok(LayoutResponse {
                    status: STATUS_OK,
                    message: "Layout updated",
                    skipped,
                })
            })
        })
    }
}

fn state_view(state: &UserState) -> GameStateView {
    GameStateView {
        tcorvax: state.wallet.tcorvax,
        cat_nips: state.wallet.cat_nips,
        energy: state.wallet.energy,
        machines: state.machines.iter().map(MachineView::from).collect(),
    }
}
