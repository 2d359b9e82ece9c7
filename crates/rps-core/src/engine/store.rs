//! Session storage keyed by game id, optionally backed by a JSON file.
//!
//! A committed secret that is lost can never be revealed, so with a file
//! configured every mutation is written through before it returns.

use super::session::{CommitPhase, CommitSession};
use crate::protocol::GameId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use thiserror::Error;
use tracing::debug;

const STORE_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("bad session file {path}: {source}")]
    Format {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("unsupported session file version {0}")]
    Version(u32),
}

#[derive(Serialize, Deserialize)]
struct StoreFile {
    version: u32,
    sessions: Vec<CommitSession>,
}

pub struct SessionStore {
    sessions: RwLock<HashMap<GameId, CommitSession>>,
    path: Option<PathBuf>,
}

impl SessionStore {
    /// Store that lives only as long as the process
    pub fn in_memory() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            path: None,
        }
    }

    /// Open (or start) a file-backed store. An existing file that cannot be
    /// read is an error, never silently replaced.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let sessions = if path.exists() {
            load(&path)?
        } else {
            HashMap::new()
        };
        debug!(path = %path.display(), count = sessions.len(), "session store opened");
        Ok(Self {
            sessions: RwLock::new(sessions),
            path: Some(path),
        })
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<GameId, CommitSession>> {
        self.sessions.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<GameId, CommitSession>> {
        self.sessions.write().unwrap_or_else(|e| e.into_inner())
    }

    pub fn get(&self, game_id: GameId) -> Option<CommitSession> {
        self.read().get(&game_id).cloned()
    }

    /// Phase of the session for `game_id`; `NoMove` if there is none
    pub fn phase(&self, game_id: GameId) -> CommitPhase {
        self.read()
            .get(&game_id)
            .map(CommitSession::phase)
            .unwrap_or(CommitPhase::NoMove)
    }

    pub fn game_ids(&self) -> Vec<GameId> {
        let mut ids: Vec<GameId> = self.read().keys().copied().collect();
        ids.sort();
        ids
    }

    /// Insert or replace a session. On a persistence failure the in-memory
    /// map is left unchanged.
    pub fn put(&self, session: CommitSession) -> Result<(), StoreError> {
        let mut sessions = self.write();
        let game_id = session.game_id();
        let previous = sessions.insert(game_id, session);
        if let Err(e) = self.persist(&sessions) {
            match previous {
                Some(previous) => sessions.insert(game_id, previous),
                None => sessions.remove(&game_id),
            };
            return Err(e);
        }
        Ok(())
    }

    /// Remove a session. On a persistence failure it stays in memory, the
    /// same as in the file.
    pub fn remove(&self, game_id: GameId) -> Result<Option<CommitSession>, StoreError> {
        let mut sessions = self.write();
        let Some(removed) = sessions.remove(&game_id) else {
            return Ok(None);
        };
        if let Err(e) = self.persist(&sessions) {
            sessions.insert(game_id, removed);
            return Err(e);
        }
        Ok(Some(removed))
    }

    fn persist(&self, sessions: &HashMap<GameId, CommitSession>) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let mut list: Vec<CommitSession> = sessions.values().cloned().collect();
        list.sort_by_key(CommitSession::game_id);
        let file = StoreFile {
            version: STORE_VERSION,
            sessions: list,
        };
        let json = serde_json::to_vec_pretty(&file).map_err(|source| StoreError::Format {
            path: path.clone(),
            source,
        })?;

        let tmp = path.with_extension("tmp");
        fs::write(&tmp, json).map_err(|source| StoreError::Io {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, path).map_err(|source| StoreError::Io {
            path: path.clone(),
            source,
        })
    }
}

fn load(path: &Path) -> Result<HashMap<GameId, CommitSession>, StoreError> {
    let bytes = fs::read(path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let file: StoreFile = serde_json::from_slice(&bytes).map_err(|source| StoreError::Format {
        path: path.to_path_buf(),
        source,
    })?;
    if file.version != STORE_VERSION {
        return Err(StoreError::Version(file.version));
    }
    Ok(file
        .sessions
        .into_iter()
        .map(|s| (s.game_id(), s))
        .collect())
}
