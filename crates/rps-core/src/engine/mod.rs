//! Commitment engine: drives one local account through commit-reveal.
//!
//! The engine owns the per-game sessions and is the only place that talks to
//! the contract on the player's behalf. Actions on the same game are
//! serialized through a per-game async lock; different games never share
//! state.

mod error;
mod session;
mod step;
mod store;

pub use error::{DesyncError, EngineError, ErrorKind};
pub use session::{CommitPhase, CommitSession, SessionError};
pub use step::{next_step, NextStep};
pub use store::{SessionStore, StoreError};

use crate::contract::RpsContract;
use crate::crypto::{CommitError, Commitment};
use crate::games::Move;
use crate::protocol::{Address, GameId, GameResult, GameSnapshot, Role, Wei};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{error, info, warn};

/// How many of the newest games `create_game` inspects to find its own.
const CREATED_GAME_SEARCH_DEPTH: u64 = 16;

/// Everything a front-end needs to render one game
#[derive(Clone, Debug, Serialize)]
pub struct GameView {
    pub game_id: GameId,
    pub snapshot: GameSnapshot,
    pub role: Option<Role>,
    pub phase: CommitPhase,
    pub selected_move: Option<Move>,
    pub next_step: NextStep,
    pub result: Option<GameResult>,
}

pub struct CommitmentEngine {
    contract: Arc<dyn RpsContract>,
    player: Address,
    entry_fee: Wei,
    store: SessionStore,
    locks: Mutex<HashMap<GameId, Arc<AsyncMutex<()>>>>,
    /// Held across the whole of `create_game`
    create_lock: AsyncMutex<()>,
    /// Set only from a confirmed create or join receipt
    active_game: RwLock<Option<GameId>>,
}

impl CommitmentEngine {
    pub fn new(
        contract: Arc<dyn RpsContract>,
        player: Address,
        entry_fee: Wei,
        store: SessionStore,
    ) -> Self {
        Self {
            contract,
            player,
            entry_fee,
            store,
            locks: Mutex::new(HashMap::new()),
            create_lock: AsyncMutex::new(()),
            active_game: RwLock::new(None),
        }
    }

    pub fn player(&self) -> Address {
        self.player
    }

    pub fn entry_fee(&self) -> Wei {
        self.entry_fee
    }

    pub fn contract(&self) -> Arc<dyn RpsContract> {
        Arc::clone(&self.contract)
    }

    pub fn active_game(&self) -> Option<GameId> {
        *self.active_game.read().unwrap_or_else(|e| e.into_inner())
    }

    fn set_active_game(&self, game_id: Option<GameId>) {
        *self.active_game.write().unwrap_or_else(|e| e.into_inner()) = game_id;
    }

    pub fn phase(&self, game_id: GameId) -> CommitPhase {
        self.store.phase(game_id)
    }

    pub fn session(&self, game_id: GameId) -> Option<CommitSession> {
        self.store.get(game_id)
    }

    /// Games with a live session
    pub fn tracked_games(&self) -> Vec<GameId> {
        self.store.game_ids()
    }

    async fn lock_game(&self, game_id: GameId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            Arc::clone(locks.entry(game_id).or_default())
        };
        lock.lock_owned().await
    }

    /// Drop the lock entry for `game_id` unless a task still holds or waits
    /// on it. Call with the game's guard already released.
    fn forget_lock(&self, game_id: GameId) {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        if locks
            .get(&game_id)
            .map_or(false, |lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&game_id);
        }
    }

    /// Stored session for `game_id`. A session made for another account is
    /// refused: its commitment can never verify for this one.
    fn own_session(&self, game_id: GameId) -> Result<Option<CommitSession>, EngineError> {
        match self.store.get(game_id) {
            Some(session) if session.player() != self.player => {
                error!(
                    "Game {}: stored session belongs to {}, engine plays as {}",
                    game_id,
                    session.player(),
                    self.player
                );
                Err(DesyncError::ForeignSession {
                    game_id,
                    owner: session.player(),
                }
                .into())
            }
            session => Ok(session),
        }
    }

    async fn snapshot(&self, game_id: GameId) -> Result<GameSnapshot, EngineError> {
        let snapshot = self.contract.get_game(game_id).await?;
        if !snapshot.exists() {
            return Err(EngineError::UnknownGame(game_id));
        }
        Ok(snapshot)
    }

    fn role_in(&self, snapshot: &GameSnapshot, game_id: GameId) -> Result<Role, EngineError> {
        snapshot
            .role_of(&self.player)
            .ok_or(EngineError::NotParticipant {
                player: self.player,
                game_id,
            })
    }

    /// Write a session, logging instead of failing: used once the chain has
    /// already moved, so the caller must still see success.
    fn save_after_confirmation(&self, session: CommitSession) {
        let game_id = session.game_id();
        if let Err(e) = self.store.put(session) {
            warn!("Game {}: confirmed on-chain but session not saved: {}", game_id, e);
        }
    }

    /// Newest game id according to `gameCounter()`. A hint for discovery
    /// only; it never changes the active game.
    pub async fn latest_game(&self) -> Result<Option<GameId>, EngineError> {
        let counter = self.contract.game_counter().await?;
        Ok((counter > 0).then(|| GameId::new(counter)))
    }

    /// Create a game paying the entry fee and make it the active game. An
    /// open game of ours that nobody has joined yet is reused instead, so a
    /// retried create never pays twice.
    pub async fn create_game(&self) -> Result<GameId, EngineError> {
        let _guard = self.create_lock.lock().await;

        if let Some(game_id) = self.find_open_game().await? {
            self.set_active_game(Some(game_id));
            info!("Game {}: still waiting for an opponent, reusing it", game_id);
            return Ok(game_id);
        }

        let receipt = self
            .contract
            .create_game(self.player, self.entry_fee)
            .await
            .map_err(|e| {
                warn!("Create game failed: {}", e);
                e
            })?;

        let game_id = self
            .find_open_game()
            .await?
            .ok_or(EngineError::CreatedGameNotFound(CREATED_GAME_SEARCH_DEPTH))?;
        self.set_active_game(Some(game_id));
        info!("Created game {} in tx {}", game_id, receipt.tx_hash);
        Ok(game_id)
    }

    /// Newest open game whose creator is us. Other players may create games
    /// between our receipt and the counter read, so the counter alone is not
    /// trusted.
    async fn find_open_game(&self) -> Result<Option<GameId>, EngineError> {
        let counter = self.contract.game_counter().await?;
        let oldest = counter
            .saturating_sub(CREATED_GAME_SEARCH_DEPTH - 1)
            .max(1);
        for id in (oldest..=counter).rev() {
            let game_id = GameId::new(id);
            let snapshot = self.contract.get_game(game_id).await?;
            if snapshot.player1 == self.player && !snapshot.has_opponent() && !snapshot.finished {
                return Ok(Some(game_id));
            }
        }
        Ok(None)
    }

    /// Join `game_id` as the second player and make it the active game.
    pub async fn join_game(&self, game_id: GameId) -> Result<(), EngineError> {
        let snapshot = self.snapshot(game_id).await?;
        if snapshot.role_of(&self.player) == Some(Role::Player2) {
            self.set_active_game(Some(game_id));
            return Ok(());
        }
        if snapshot.player1 == self.player {
            return Err(EngineError::OwnGame(game_id));
        }
        if snapshot.has_opponent() {
            return Err(EngineError::GameFull(game_id));
        }
        if snapshot.finished {
            return Err(EngineError::Finished(game_id));
        }

        let fee = if snapshot.entry_fee > 0 {
            snapshot.entry_fee
        } else {
            self.entry_fee
        };
        let receipt = self
            .contract
            .join_game(self.player, game_id, fee)
            .await
            .map_err(|e| {
                warn!("Join game {} failed: {}", game_id, e);
                e
            })?;

        self.set_active_game(Some(game_id));
        info!("Joined game {} in tx {}", game_id, receipt.tx_hash);
        Ok(())
    }

    /// Choose a move for `game_id`, generating a fresh secret. Purely local.
    pub async fn select_move(&self, game_id: GameId, mv: Move) -> Result<CommitPhase, EngineError> {
        let _guard = self.lock_game(game_id).await;

        let session = match self.own_session(game_id)? {
            Some(mut session) => {
                session.reselect(mv)?;
                session
            }
            None => CommitSession::new(game_id, self.player, mv),
        };
        self.store.put(session)?;

        info!("Game {}: move selected", game_id);
        Ok(CommitPhase::MoveSelected)
    }

    /// Like `select_move`, from the raw on-chain encoding.
    pub async fn select_raw_move(
        &self,
        game_id: GameId,
        raw_move: u8,
    ) -> Result<CommitPhase, EngineError> {
        let mv = Move::try_from(raw_move).map_err(CommitError::from)?;
        self.select_move(game_id, mv).await
    }

    /// Submit the commitment for the selected move. Advances to `Committed`
    /// only on a confirmed receipt; calling again after a failure resends the
    /// identical commitment.
    pub async fn commit(&self, game_id: GameId) -> Result<Commitment, EngineError> {
        let _guard = self.lock_game(game_id).await;

        let Some(mut session) = self.own_session(game_id)? else {
            return Err(EngineError::MissingMove(game_id));
        };
        if matches!(
            session.phase(),
            CommitPhase::Committed | CommitPhase::Revealed
        ) {
            return Ok(session.commitment());
        }

        let snapshot = self.snapshot(game_id).await?;
        let role = self.role_in(&snapshot, game_id)?;
        if snapshot.finished {
            return Err(EngineError::Finished(game_id));
        }
        if !snapshot.has_opponent() {
            return Err(EngineError::NoOpponent(game_id));
        }

        if snapshot.committed(role) {
            if session.matches_submitted() {
                // An earlier attempt landed after we stopped waiting for it.
                session.confirm_commit();
                let commitment = session.commitment();
                self.save_after_confirmation(session);
                info!("Game {}: earlier commit found on-chain", game_id);
                return Ok(commitment);
            }
            error!("Game {}: on-chain commitment does not match local secret", game_id);
            return Err(DesyncError::CommitmentMismatch(game_id).into());
        }

        let commitment = session.mark_submitted();
        self.store.put(session.clone())?;

        match self
            .contract
            .commit_move(self.player, game_id, commitment)
            .await
        {
            Ok(receipt) => {
                session.confirm_commit();
                self.save_after_confirmation(session);
                info!("Game {}: committed {} in tx {}", game_id, commitment, receipt.tx_hash);
                Ok(commitment)
            }
            Err(e) => {
                if e.definitely_not_applied() {
                    session.clear_submitted();
                    if let Err(store_err) = self.store.put(session) {
                        warn!("Game {}: could not clear submitted commit: {}", game_id, store_err);
                    }
                }
                warn!("Game {}: commit failed: {}", game_id, e);
                Err(e.into())
            }
        }
    }

    /// Reveal the committed move once both players have committed.
    pub async fn reveal(&self, game_id: GameId) -> Result<(), EngineError> {
        let _guard = self.lock_game(game_id).await;

        let snapshot = self.snapshot(game_id).await?;
        let role = self.role_in(&snapshot, game_id)?;

        let Some(mut session) = self.own_session(game_id)? else {
            if snapshot.committed(role) && !snapshot.revealed(role) {
                error!("Game {}: committed but no local secret to reveal", game_id);
                return Err(DesyncError::SecretLost(game_id).into());
            }
            return Err(EngineError::MissingMove(game_id));
        };

        match session.phase() {
            CommitPhase::Revealed => return Ok(()),
            CommitPhase::MoveSelected if snapshot.committed(role) => {
                if !session.matches_submitted() {
                    error!("Game {}: on-chain commitment does not match local secret", game_id);
                    return Err(DesyncError::CommitmentMismatch(game_id).into());
                }
                session.confirm_commit();
                self.save_after_confirmation(session.clone());
            }
            CommitPhase::Committed => {}
            phase => {
                return Err(EngineError::WrongPhase {
                    game_id,
                    action: "reveal",
                    phase,
                })
            }
        }

        if snapshot.revealed(role) {
            session.confirm_reveal();
            self.save_after_confirmation(session);
            return Ok(());
        }
        if snapshot.finished {
            return Err(EngineError::Finished(game_id));
        }
        if !snapshot.both_committed() {
            return Err(EngineError::OpponentNotCommitted(game_id));
        }

        let (mv, digest) = session.reveal_payload().map_err(|e| {
            error!("{}", e);
            e
        })?;

        match self
            .contract
            .reveal_move(self.player, game_id, mv, digest)
            .await
        {
            Ok(receipt) => {
                session.confirm_reveal();
                self.save_after_confirmation(session);
                info!("Game {}: revealed {} in tx {}", game_id, mv, receipt.tx_hash);
                Ok(())
            }
            Err(e) => {
                warn!("Game {}: reveal failed: {}", game_id, e);
                Err(e.into())
            }
        }
    }

    /// Combine a snapshot with local state. No network access.
    pub fn describe(
        &self,
        game_id: GameId,
        snapshot: GameSnapshot,
        result: Option<GameResult>,
    ) -> GameView {
        let role = snapshot.role_of(&self.player);
        let session = self
            .store
            .get(game_id)
            .filter(|session| session.player() == self.player);
        let phase = session
            .as_ref()
            .map(CommitSession::phase)
            .unwrap_or(CommitPhase::NoMove);
        GameView {
            game_id,
            snapshot,
            role,
            phase,
            selected_move: session.as_ref().map(CommitSession::selected_move),
            next_step: next_step(&snapshot, role, phase),
            result,
        }
    }

    /// Read the game from the contract and describe it.
    pub async fn view(&self, game_id: GameId) -> Result<GameView, EngineError> {
        let snapshot = self.snapshot(game_id).await?;
        let result = if snapshot.finished {
            Some(self.contract.get_game_result(game_id).await?)
        } else {
            None
        };
        Ok(self.describe(game_id, snapshot, result))
    }

    /// Drop the session for a finished game. A game only finishes after both
    /// reveals are confirmed, so the secret is no longer needed.
    pub async fn release_finished(
        &self,
        game_id: GameId,
        snapshot: &GameSnapshot,
    ) -> Result<bool, EngineError> {
        if !snapshot.finished {
            return Ok(false);
        }
        let guard = self.lock_game(game_id).await;
        let released = self.store.remove(game_id)?.is_some();
        drop(guard);
        self.forget_lock(game_id);
        if released {
            info!("Game {}: finished, session released", game_id);
        }
        Ok(released)
    }

    /// Forget a game. Abandoning after a commit forfeits the reveal.
    pub async fn abandon(&self, game_id: GameId) -> Result<Option<CommitSession>, EngineError> {
        let guard = self.lock_game(game_id).await;
        let removed = self.store.remove(game_id)?;
        drop(guard);
        self.forget_lock(game_id);
        if let Some(session) = &removed {
            if session.phase() == CommitPhase::Committed {
                warn!("Game {}: abandoned after commit; the move can no longer be revealed", game_id);
            }
        }
        if self.active_game() == Some(game_id) {
            self.set_active_game(None);
        }
        info!("Game {}: abandoned", game_id);
        Ok(removed)
    }
}
