//! What the local player should do next, derived from the chain snapshot.

use super::session::CommitPhase;
use crate::protocol::{GameSnapshot, Role};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NextStep {
    /// Not a player and the second seat is free
    Join,
    /// Not a player and the game is full
    Spectate,
    WaitForOpponent,
    SelectMove,
    Commit,
    WaitForOpponentCommit,
    Reveal,
    WaitForOpponentReveal,
    /// Committed on-chain but the secret is gone; this game cannot be revealed
    SecretLost,
    Finished,
}

/// The contract is the source of truth: if it says the local player has not
/// committed, the answer is to commit, whatever the opponent's flags are.
pub fn next_step(snapshot: &GameSnapshot, role: Option<Role>, phase: CommitPhase) -> NextStep {
    if snapshot.finished {
        return NextStep::Finished;
    }
    let Some(role) = role else {
        return if snapshot.has_opponent() {
            NextStep::Spectate
        } else {
            NextStep::Join
        };
    };
    if !snapshot.has_opponent() {
        return NextStep::WaitForOpponent;
    }
    if !snapshot.committed(role) {
        return match phase {
            CommitPhase::NoMove => NextStep::SelectMove,
            _ => NextStep::Commit,
        };
    }
    if snapshot.revealed(role) {
        return NextStep::WaitForOpponentReveal;
    }
    if phase == CommitPhase::NoMove {
        return NextStep::SecretLost;
    }
    if !snapshot.committed(role.opponent()) {
        return NextStep::WaitForOpponentCommit;
    }
    NextStep::Reveal
}
