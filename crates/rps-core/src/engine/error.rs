//! Engine error taxonomy.

use super::session::{CommitPhase, SessionError};
use super::store::StoreError;
use crate::contract::ContractError;
use crate::crypto::CommitError;
use crate::protocol::{Address, GameId};
use serde::Serialize;
use thiserror::Error;

/// How a failure should be handled by the caller
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    /// Rejected locally; nothing reached the network
    Input,
    /// The network, wallet, or contract refused; safe to retry
    Transaction,
    /// Local secret no longer matches the chain; no retry can fix it
    Desync,
}

/// The local secret cannot produce a valid reveal for the game.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DesyncError {
    #[error("game {0}: move is committed on-chain but the local secret is gone")]
    SecretLost(GameId),

    #[error("game {0}: local secret does not reproduce the on-chain commitment")]
    CommitmentMismatch(GameId),

    #[error("game {game_id}: stored session was made for {owner}, not this account")]
    ForeignSession { game_id: GameId, owner: Address },
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("game {0}: no move selected")]
    MissingMove(GameId),

    #[error(transparent)]
    Commit(#[from] CommitError),

    #[error("game {0} does not exist")]
    UnknownGame(GameId),

    #[error("{player} is not a player in game {game_id}")]
    NotParticipant { player: Address, game_id: GameId },

    #[error("game {0} is still waiting for an opponent")]
    NoOpponent(GameId),

    #[error("game {0} already has two players")]
    GameFull(GameId),

    #[error("cannot join game {0}: it is your own game")]
    OwnGame(GameId),

    #[error("game {0} is already finished")]
    Finished(GameId),

    #[error("game {0}: both players must commit before revealing")]
    OpponentNotCommitted(GameId),

    #[error("game {game_id}: cannot {action} in phase {phase:?}")]
    WrongPhase {
        game_id: GameId,
        action: &'static str,
        phase: CommitPhase,
    },

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("created game not found among the latest {0} games")]
    CreatedGameNotFound(u64),

    #[error(transparent)]
    Contract(#[from] ContractError),

    #[error("session store: {0}")]
    Store(#[from] StoreError),

    #[error(transparent)]
    Desync(#[from] DesyncError),
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::Contract(_) | EngineError::Store(_) => ErrorKind::Transaction,
            EngineError::Desync(_) => ErrorKind::Desync,
            _ => ErrorKind::Input,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Transaction
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        let id = GameId::new(1);
        assert_eq!(EngineError::MissingMove(id).kind(), ErrorKind::Input);
        assert_eq!(
            EngineError::from(CommitError::EmptySecret).kind(),
            ErrorKind::Input
        );
        assert_eq!(
            EngineError::from(ContractError::Network("down".to_string())).kind(),
            ErrorKind::Transaction
        );
        assert_eq!(
            EngineError::from(DesyncError::SecretLost(id)).kind(),
            ErrorKind::Desync
        );
        assert!(EngineError::from(ContractError::Rejected("no".to_string())).is_retryable());
        assert!(!EngineError::from(DesyncError::CommitmentMismatch(id)).is_retryable());
        let foreign = DesyncError::ForeignSession {
            game_id: id,
            owner: Address::repeat_byte(0xC0),
        };
        assert_eq!(EngineError::from(foreign).kind(), ErrorKind::Desync);
    }
}
