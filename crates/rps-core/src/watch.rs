//! Background polling of one game's on-chain state.
//!
//! A `GameWatch` owns a tokio task that reads the game on a fixed interval
//! and publishes changes through a `watch` channel. The task stops on its own
//! once the game is finished and the result has been read, when `stop` is
//! called, or when the `GameWatch` is dropped.

use crate::contract::{ContractError, RpsContract};
use crate::protocol::{GameId, GameResult, GameSnapshot};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

/// What the watcher last saw for the game
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GameUpdate {
    pub snapshot: GameSnapshot,
    /// Present once the game is finished
    pub result: Option<GameResult>,
}

impl GameUpdate {
    pub fn is_finished(&self) -> bool {
        self.result.is_some()
    }
}

pub struct GameWatch {
    game_id: GameId,
    updates: watch::Receiver<Option<GameUpdate>>,
    stop: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl GameWatch {
    /// Start polling `game_id` every `period`. The first read happens
    /// immediately.
    pub fn spawn(contract: Arc<dyn RpsContract>, game_id: GameId, period: Duration) -> Self {
        let (updates_tx, updates) = watch::channel(None);
        let (stop_tx, stop_rx) = oneshot::channel();
        let task = tokio::spawn(poll_game(contract, game_id, period, updates_tx, stop_rx));
        info!("Watching game {} every {:?}", game_id, period);
        Self {
            game_id,
            updates,
            stop: Some(stop_tx),
            task,
        }
    }

    pub fn game_id(&self) -> GameId {
        self.game_id
    }

    /// Most recent update, `None` until the first successful read
    pub fn latest(&self) -> Option<GameUpdate> {
        *self.updates.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<GameUpdate>> {
        self.updates.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.latest().map_or(false, |u| u.is_finished())
    }

    /// False once the polling task has exited
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Resolves with the final update, or `None` if polling stopped first.
    pub async fn finished(&self) -> Option<GameUpdate> {
        let mut updates = self.updates.clone();
        let update = updates
            .wait_for(|u| u.map_or(false, |u| u.is_finished()))
            .await
            .ok()?;
        *update
    }

    /// Stop polling. Idempotent.
    pub fn stop(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
    }
}

impl Drop for GameWatch {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn poll_game(
    contract: Arc<dyn RpsContract>,
    game_id: GameId,
    period: Duration,
    updates: watch::Sender<Option<GameUpdate>>,
    mut stop: oneshot::Receiver<()>,
) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = &mut stop => {
                debug!("Game {}: watcher stopped", game_id);
                return;
            }
            _ = ticker.tick() => {}
        }

        match read_game(contract.as_ref(), game_id).await {
            Ok(update) => {
                let changed = *updates.borrow() != Some(update);
                if changed {
                    debug!("Game {}: state changed", game_id);
                    updates.send_replace(Some(update));
                }
                if update.is_finished() {
                    info!("Game {} finished, watcher done", game_id);
                    return;
                }
            }
            Err(e) => warn!("Game {}: poll failed: {}", game_id, e),
        }
    }
}

async fn read_game(
    contract: &dyn RpsContract,
    game_id: GameId,
) -> Result<GameUpdate, ContractError> {
    let snapshot = contract.get_game(game_id).await?;
    let result = if snapshot.finished {
        Some(contract.get_game_result(game_id).await?)
    } else {
        None
    };
    Ok(GameUpdate { snapshot, result })
}
