//! Per-player, per-game commit-reveal session.

use super::error::DesyncError;
use crate::crypto::{Commitment, Secret, SecretDigest};
use crate::games::Move;
use crate::protocol::{Address, GameId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Client-observable progress of one player through commit-reveal
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommitPhase {
    NoMove,
    MoveSelected,
    Committed,
    Revealed,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("game {0}: move is already committed and can no longer change")]
    MoveLocked(GameId),

    #[error("game {0}: an earlier commit is unresolved; retry the commit before choosing again")]
    CommitInFlight(GameId),
}

/// Move and secret held for one game until the reveal is confirmed.
///
/// A session only exists from move selection onwards, so `NoMove` is never
/// stored; it is what the store reports for an absent game. The secret is
/// fixed once a commit has been submitted.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CommitSession {
    game_id: GameId,
    player: Address,
    #[serde(rename = "move")]
    mv: Move,
    secret: Secret,
    /// Commitment sent in a commit transaction whose outcome may not be
    /// known yet.
    submitted: Option<Commitment>,
    phase: CommitPhase,
}

impl CommitSession {
    /// Select `mv` with a freshly generated secret
    pub fn new(game_id: GameId, player: Address, mv: Move) -> Self {
        Self::with_secret(game_id, player, mv, Secret::random())
    }

    pub fn with_secret(game_id: GameId, player: Address, mv: Move, secret: Secret) -> Self {
        Self {
            game_id,
            player,
            mv,
            secret,
            submitted: None,
            phase: CommitPhase::MoveSelected,
        }
    }

    pub fn game_id(&self) -> GameId {
        self.game_id
    }

    pub fn player(&self) -> Address {
        self.player
    }

    pub fn selected_move(&self) -> Move {
        self.mv
    }

    pub fn secret(&self) -> &Secret {
        &self.secret
    }

    pub fn phase(&self) -> CommitPhase {
        self.phase
    }

    pub fn submitted(&self) -> Option<Commitment> {
        self.submitted
    }

    /// Commitment for the held move and secret. Pure, so a retried commit
    /// sends exactly the same value.
    pub fn commitment(&self) -> Commitment {
        Commitment::new(self.mv, &self.secret.digest(), &self.player)
    }

    /// Choose a different move with a new secret.
    pub fn reselect(&mut self, mv: Move) -> Result<(), SessionError> {
        if self.phase != CommitPhase::MoveSelected {
            return Err(SessionError::MoveLocked(self.game_id));
        }
        if self.submitted.is_some() {
            return Err(SessionError::CommitInFlight(self.game_id));
        }
        self.mv = mv;
        self.secret = Secret::random();
        Ok(())
    }

    /// Record that the commitment is about to be sent.
    pub fn mark_submitted(&mut self) -> Commitment {
        let commitment = self.commitment();
        self.submitted = Some(commitment);
        commitment
    }

    /// The transaction definitely did not land.
    pub fn clear_submitted(&mut self) {
        self.submitted = None;
    }

    /// True if the held secret reproduces what was sent on-chain.
    pub fn matches_submitted(&self) -> bool {
        self.submitted == Some(self.commitment())
    }

    pub fn confirm_commit(&mut self) {
        self.submitted = Some(self.commitment());
        self.phase = CommitPhase::Committed;
    }

    /// Move and digest to submit in `revealMove`.
    pub fn reveal_payload(&self) -> Result<(Move, SecretDigest), DesyncError> {
        if !self.matches_submitted() {
            return Err(DesyncError::CommitmentMismatch(self.game_id));
        }
        Ok((self.mv, self.secret.digest()))
    }

    pub fn confirm_reveal(&mut self) {
        self.phase = CommitPhase::Revealed;
    }
}
