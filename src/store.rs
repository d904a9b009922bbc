use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{error, info};

use crate::error::GameError;
use crate::game::state::{UserId, UserState};

const MAX_USER_ID_LEN: usize = 64;

/// Per-user game state, optionally mirrored to one JSON file per user.
///
/// Each user has their own lock; every read or write of a user goes through
/// [`GameStore::with_user`], so two requests for the same user never
/// interleave.
pub struct GameStore {
    users: Mutex<HashMap<UserId, Arc<Mutex<UserState>>>>,
    data_dir: Option<PathBuf>,
}

impl GameStore {
    /// A store that keeps everything in memory.
    pub fn in_memory() -> Self {
        Self {
            users: Mutex::new(HashMap::new()),
            data_dir: None,
        }
    }

    /// Opens (creating if needed) a file-backed store and loads every user
    /// file found in `dir`.
    pub fn open(dir: &Path) -> Result<Self, GameError> {
        fs::create_dir_all(dir)?;

        let mut users = HashMap::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let contents = fs::read_to_string(&path)?;
            let state: UserState = serde_json::from_str(&contents).map_err(|e| {
                GameError::Storage(format!("corrupt user file {}: {}", path.display(), e))
            })?;
            users.insert(state.user_id.clone(), Arc::new(Mutex::new(state)));
        }

        info!("Loaded {} users from {}", users.len(), dir.display());

        Ok(Self {
            users: Mutex::new(users),
            data_dir: Some(dir.to_path_buf()),
        })
    }

    fn users(&self) -> Result<MutexGuard<'_, HashMap<UserId, Arc<Mutex<UserState>>>>, GameError> {
        self.users
            .lock()
            .map_err(|_| GameError::Storage("user table lock poisoned".to_string()))
    }

    /// Creates the user if absent. Returns `true` when a new record was made.
    pub fn register(&self, user_id: &str, first_name: Option<String>) -> Result<bool, GameError> {
        validate_user_id(user_id)?;
        let mut users = self.users()?;
        if users.contains_key(user_id) {
            return Ok(false);
        }

        let mut state = UserState::new(user_id);
        state.first_name = first_name;
        persist(self.data_dir.as_deref(), &state)?;
        users.insert(user_id.to_string(), Arc::new(Mutex::new(state)));
        info!("Created user {}", user_id);
        Ok(true)
    }

    /// Runs `op` with exclusive access to one user's state.
    pub fn with_user<T>(
        &self,
        user_id: &str,
        op: impl FnOnce(&mut UserSlot<'_>) -> Result<T, GameError>,
    ) -> Result<T, GameError> {
        let cell = self
            .users()?
            .get(user_id)
            .cloned()
            .ok_or(GameError::UserNotFound)?;
        let mut state = cell
            .lock()
            .map_err(|_| GameError::Storage(format!("lock for user {} poisoned", user_id)))?;

        let mut slot = UserSlot {
            state: &mut *state,
            data_dir: self.data_dir.as_deref(),
        };
        op(&mut slot)
    }
}

/// Exclusive handle on one user's state, handed out by [`GameStore::with_user`].
pub struct UserSlot<'a> {
    state: &'a mut UserState,
    data_dir: Option<&'a Path>,
}

impl UserSlot<'_> {
    pub fn state(&self) -> &UserState {
        self.state
    }

    /// Applies `op` atomically.
    ///
    /// `op` runs on a copy of the state. If it returns `Ok` the copy is
    /// written out (when file-backed) and then becomes the live state; if
    /// it returns `Err`, or the write fails, nothing changes.
    pub fn step<T>(
        &mut self,
        op: impl FnOnce(&mut UserState) -> Result<T, GameError>,
    ) -> Result<T, GameError> {
        let mut working = self.state.clone();
        let out = op(&mut working)?;
        if working != *self.state {
            persist(self.data_dir, &working)?;
            *self.state = working;
        }
        Ok(out)
    }
}

fn validate_user_id(user_id: &str) -> Result<(), GameError> {
    let ok = !user_id.is_empty()
        && user_id.len() <= MAX_USER_ID_LEN
        && user_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if ok {
        Ok(())
    } else {
        Err(GameError::InvalidUserId)
    }
}

fn persist(data_dir: Option<&Path>, state: &UserState) -> Result<(), GameError> {
    let Some(dir) = data_dir else {
        return Ok(());
    };
    let path = dir.join(format!("{}.json", state.user_id));
    let tmp = dir.join(format!("{}.json.tmp", state.user_id));

    let write = || -> Result<(), GameError> {
        fs::write(&tmp, serde_json::to_vec_pretty(state)?)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    };
    write().inspect_err(|e| error!("Failed to persist user {}: {}", state.user_id, e))
}
