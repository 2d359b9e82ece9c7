//! Shared player service state.

use rps_core::protocol::GameId;
use rps_core::{CommitmentEngine, GameWatch};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{info, warn};

/// Which contract client the engine talks to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Rpc,
    Mock,
}

/// Engine plus one background watcher per game of interest
pub struct PlayerState {
    engine: CommitmentEngine,
    backend: Backend,
    chain_id: Option<u64>,
    poll_interval: Duration,
    watchers: Mutex<HashMap<GameId, GameWatch>>,
}

impl PlayerState {
    pub fn new(
        engine: CommitmentEngine,
        backend: Backend,
        chain_id: Option<u64>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            engine,
            backend,
            chain_id,
            poll_interval,
            watchers: Mutex::new(HashMap::new()),
        }
    }

    pub fn engine(&self) -> &CommitmentEngine {
        &self.engine
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    pub fn chain_id(&self) -> Option<u64> {
        self.chain_id
    }

    fn watchers(&self) -> MutexGuard<'_, HashMap<GameId, GameWatch>> {
        self.watchers.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Start polling `game_id` unless a live watcher already exists. When the
    /// game finishes the watcher is dropped and its session released.
    pub fn watch_game(self: &Arc<Self>, game_id: GameId) {
        let mut watchers = self.watchers();
        if watchers.get(&game_id).map_or(false, GameWatch::is_running) {
            return;
        }

        let watch = GameWatch::spawn(self.engine.contract(), game_id, self.poll_interval);
        let mut updates = watch.subscribe();
        watchers.insert(game_id, watch);
        drop(watchers);

        let state = Arc::clone(self);
        tokio::spawn(async move {
            let finished = updates
                .wait_for(|u| u.map_or(false, |u| u.is_finished()))
                .await
                .map(|u| *u);
            let Ok(Some(update)) = finished else {
                return;
            };
            state.watchers().remove(&game_id);
            match state
                .engine
                .release_finished(game_id, &update.snapshot)
                .await
            {
                Ok(true) => info!("Game {}: result {:?}", game_id, update.result),
                Ok(false) => {}
                Err(e) => warn!("Game {}: could not release session: {}", game_id, e),
            }
        });
    }

    pub fn stop_watching(&self, game_id: GameId) -> bool {
        self.watchers().remove(&game_id).is_some()
    }

    /// Games with a running watcher, sorted
    pub fn watched_games(&self) -> Vec<GameId> {
        let mut ids: Vec<GameId> = self
            .watchers()
            .iter()
            .filter(|(_, watch)| watch.is_running())
            .map(|(id, _)| *id)
            .collect();
        ids.sort();
        ids
    }

    /// Resume watchers for sessions loaded from disk
    pub fn resume(self: &Arc<Self>) {
        for game_id in self.engine.tracked_games() {
            info!("Resuming game {}", game_id);
            self.watch_game(game_id);
        }
    }
}
