//! Contract client trait definition.

use crate::crypto::{Commitment, SecretDigest};
use crate::games::Move;
use crate::protocol::{Address, GameId, GameResult, GameSnapshot, TxHash, TxReceipt, Wei};
use async_trait::async_trait;
use thiserror::Error;

/// Errors from contract calls. None of them is fatal; a failed write leaves
/// local state where it was so the action can be re-triggered.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ContractError {
    #[error("Transaction rejected by signer: {0}")]
    Rejected(String),

    #[error("Transaction reverted: {reason}")]
    Reverted {
        tx_hash: Option<TxHash>,
        reason: String,
    },

    #[error("Transaction {0} not confirmed before timeout")]
    Unconfirmed(TxHash),

    #[error("Network error: {0}")]
    Network(String),

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Malformed response: {0}")]
    Decode(String),
}

impl ContractError {
    /// True when the transaction definitely did not change contract state.
    pub fn definitely_not_applied(&self) -> bool {
        matches!(
            self,
            ContractError::Rejected(_) | ContractError::Reverted { .. }
        )
    }
}

/// Trait for the Rock-Paper-Scissors contract surface
///
/// Write methods resolve only once a receipt is observed; a submitted but
/// unmined transaction is `Unconfirmed`, a failed one `Reverted`.
/// Implementations:
/// - MockRpsContract for testing and offline play
/// - RpcRpsContract for a JSON-RPC node
#[async_trait]
pub trait RpsContract: Send + Sync {
    /// `createGame()`, payable
    async fn create_game(&self, from: Address, value: Wei) -> Result<TxReceipt, ContractError>;

    /// `joinGame(uint256)`, payable
    async fn join_game(
        &self,
        from: Address,
        game_id: GameId,
        value: Wei,
    ) -> Result<TxReceipt, ContractError>;

    /// `commitMove(uint256,bytes32)`
    async fn commit_move(
        &self,
        from: Address,
        game_id: GameId,
        commitment: Commitment,
    ) -> Result<TxReceipt, ContractError>;

    /// `revealMove(uint256,uint8,bytes32)`
    async fn reveal_move(
        &self,
        from: Address,
        game_id: GameId,
        mv: Move,
        digest: SecretDigest,
    ) -> Result<TxReceipt, ContractError>;

    /// `getGame(uint256)`
    async fn get_game(&self, game_id: GameId) -> Result<GameSnapshot, ContractError>;

    /// `getGameResult(uint256)`
    async fn get_game_result(&self, game_id: GameId) -> Result<GameResult, ContractError>;

    /// `gameCounter()`: number of games ever created
    async fn game_counter(&self) -> Result<u64, ContractError>;
}
