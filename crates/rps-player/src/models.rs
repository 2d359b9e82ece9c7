//! Request and response bodies for the player API.

use crate::state::Backend;
use rps_core::crypto::Commitment;
use rps_core::engine::CommitPhase;
use rps_core::protocol::{Address, GameId, GameSnapshot};
use serde::{Deserialize, Serialize};

#[derive(Serialize)]
pub struct PlayerInfoResponse {
    pub address: Address,
    pub backend: Backend,
    pub chain_id: Option<u64>,
    /// Decimal string; wei amounts overflow JSON numbers
    pub entry_fee_wei: String,
    pub active_game: Option<GameId>,
    pub tracked_games: Vec<GameId>,
    pub watched_games: Vec<GameId>,
}

#[derive(Serialize)]
pub struct LatestGameResponse {
    pub game_id: Option<GameId>,
    pub game: Option<GameSnapshot>,
}

#[derive(Serialize)]
pub struct CreateGameResponse {
    pub game_id: GameId,
}

#[derive(Deserialize)]
pub struct JoinGameRequest {
    pub game_id: GameId,
}

/// Either the on-chain number or a case-insensitive name
#[derive(Deserialize)]
#[serde(untagged)]
pub enum MoveInput {
    Raw(u8),
    Name(String),
}

#[derive(Deserialize)]
pub struct SelectMoveRequest {
    #[serde(rename = "move")]
    pub mv: MoveInput,
}

#[derive(Serialize)]
pub struct PhaseResponse {
    pub game_id: GameId,
    pub phase: CommitPhase,
}

#[derive(Serialize)]
pub struct CommitResponse {
    pub game_id: GameId,
    pub commitment: Commitment,
}

#[derive(Serialize)]
pub struct AbandonResponse {
    pub game_id: GameId,
    pub had_session: bool,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: Option<rps_core::ErrorKind>,
}
