//! Calldata and return-data codec for the game contract.
//!
//! The contract surface is declared once with `sol!`; selectors and word
//! layout come from the generated call types.

use crate::crypto::{Commitment, SecretDigest};
use crate::games::Move;
use crate::protocol::{GameId, GameResult, GameSnapshot, Wei};
use alloy_primitives::U256;
use alloy_sol_types::{sol, SolCall};
use thiserror::Error;

sol! {
    interface IRockPaperScissors {
        function createGame() external payable;
        function joinGame(uint256 gameId) external payable;
        function commitMove(uint256 gameId, bytes32 commitment) external;
        function revealMove(uint256 gameId, uint8 playerMove, bytes32 secretDigest) external;
        function getGame(uint256 gameId) external view returns (
            address player1,
            address player2,
            uint256 entryFee,
            bool player1Committed,
            bool player2Committed,
            bool player1Revealed,
            bool player2Revealed,
            bool finished
        );
        function getGameResult(uint256 gameId) external view returns (
            uint8 move1,
            uint8 move2,
            address winner
        );
        function gameCounter() external view returns (uint256);
    }
}

use IRockPaperScissors::*;

#[derive(Debug, Error)]
pub enum AbiError {
    #[error(transparent)]
    Sol(#[from] alloy_sol_types::Error),

    #[error("{field} does not fit: {value}")]
    Overflow { field: &'static str, value: U256 },

    #[error("{field} is not a valid move: {value}")]
    InvalidMove { field: &'static str, value: u8 },
}

fn game_id_word(game_id: GameId) -> U256 {
    U256::from(game_id.value())
}

pub fn create_game() -> Vec<u8> {
    createGameCall {}.abi_encode()
}

pub fn join_game(game_id: GameId) -> Vec<u8> {
    joinGameCall {
        gameId: game_id_word(game_id),
    }
    .abi_encode()
}

pub fn commit_move(game_id: GameId, commitment: &Commitment) -> Vec<u8> {
    commitMoveCall {
        gameId: game_id_word(game_id),
        commitment: commitment.to_b256(),
    }
    .abi_encode()
}

pub fn reveal_move(game_id: GameId, mv: Move, digest: &SecretDigest) -> Vec<u8> {
    revealMoveCall {
        gameId: game_id_word(game_id),
        playerMove: mv.as_u8(),
        secretDigest: digest.to_b256(),
    }
    .abi_encode()
}

pub fn get_game(game_id: GameId) -> Vec<u8> {
    getGameCall {
        gameId: game_id_word(game_id),
    }
    .abi_encode()
}

pub fn get_game_result(game_id: GameId) -> Vec<u8> {
    getGameResultCall {
        gameId: game_id_word(game_id),
    }
    .abi_encode()
}

pub fn game_counter() -> Vec<u8> {
    gameCounterCall {}.abi_encode()
}

/// Decode `getGame` return data.
pub fn decode_game(data: &[u8]) -> Result<GameSnapshot, AbiError> {
    let game = getGameCall::abi_decode_returns(data, true)?;
    let entry_fee = Wei::try_from(game.entryFee).map_err(|_| AbiError::Overflow {
        field: "entryFee",
        value: game.entryFee,
    })?;
    Ok(GameSnapshot {
        player1: game.player1,
        player2: game.player2,
        entry_fee,
        player1_committed: game.player1Committed,
        player2_committed: game.player2Committed,
        player1_revealed: game.player1Revealed,
        player2_revealed: game.player2Revealed,
        finished: game.finished,
    })
}

/// Decode `getGameResult` return data.
pub fn decode_game_result(data: &[u8]) -> Result<GameResult, AbiError> {
    fn onchain_move(field: &'static str, value: u8) -> Result<Option<Move>, AbiError> {
        Move::from_onchain(value).map_err(|_| AbiError::InvalidMove { field, value })
    }

    let result = getGameResultCall::abi_decode_returns(data, true)?;
    Ok(GameResult {
        move1: onchain_move("move1", result.move1)?,
        move2: onchain_move("move2", result.move2)?,
        winner: result.winner,
    })
}

/// Decode `gameCounter` return data.
pub fn decode_counter(data: &[u8]) -> Result<u64, AbiError> {
    let counter = gameCounterCall::abi_decode_returns(data, true)?._0;
    u64::try_from(counter).map_err(|_| AbiError::Overflow {
        field: "gameCounter",
        value: counter,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Address;
    use alloy_primitives::keccak256;
    use alloy_sol_types::{sol_data, SolType, SolValue};

    #[test]
    fn test_signatures_use_bytes32() {
        assert_eq!(commitMoveCall::SIGNATURE, "commitMove(uint256,bytes32)");
        assert_eq!(revealMoveCall::SIGNATURE, "revealMove(uint256,uint8,bytes32)");
        assert_eq!(
            &revealMoveCall::SELECTOR[..],
            &keccak256("revealMove(uint256,uint8,bytes32)")[..4]
        );
    }

    #[test]
    fn test_encode_call_layout() {
        let digest = SecretDigest::from_bytes([0x22; 32]);
        let data = reveal_move(GameId::new(5), Move::Scissors, &digest);

        assert_eq!(data.len(), 4 + 3 * 32);
        assert_eq!(&data[..4], &revealMoveCall::SELECTOR);
        assert_eq!(data[35], 5);
        assert!(data[4..35].iter().all(|b| *b == 0));
        assert_eq!(data[67], 3);
        assert!(data[36..67].iter().all(|b| *b == 0));
        assert_eq!(&data[68..100], &[0x22; 32]);
    }

    #[test]
    fn test_no_arg_calls_are_selector_only() {
        assert_eq!(create_game(), createGameCall::SELECTOR.to_vec());
        assert_eq!(game_counter(), gameCounterCall::SELECTOR.to_vec());
    }

    #[test]
    fn test_decode_game() {
        let p1 = Address::repeat_byte(1);
        let p2 = Address::repeat_byte(2);
        let data = (
            p1,
            p2,
            U256::from(10_000_000_000_000_000u128),
            true,
            true,
            false,
            true,
            false,
        )
            .abi_encode_params();

        let game = decode_game(&data).unwrap();
        assert_eq!(game.player1, p1);
        assert_eq!(game.player2, p2);
        assert_eq!(game.entry_fee, 10_000_000_000_000_000);
        assert!(game.player1_committed && game.player2_committed);
        assert!(!game.player1_revealed && game.player2_revealed);
        assert!(!game.finished);
    }

    #[test]
    fn test_decode_game_short_data() {
        let data = vec![0u8; 7 * 32];
        assert!(matches!(decode_game(&data), Err(AbiError::Sol(_))));
    }

    #[test]
    fn test_decode_rejects_bad_bool() {
        let mut data = vec![0u8; 8 * 32];
        data[3 * 32 + 31] = 2;
        assert!(matches!(decode_game(&data), Err(AbiError::Sol(_))));
    }

    #[test]
    fn test_decode_rejects_fee_above_u128() {
        let mut data = vec![0u8; 8 * 32];
        data[2 * 32] = 1;
        assert!(matches!(
            decode_game(&data),
            Err(AbiError::Overflow { field: "entryFee", .. })
        ));
    }

    #[test]
    fn test_decode_game_result() {
        let winner = Address::repeat_byte(9);
        let data = <(sol_data::Uint<8>, sol_data::Uint<8>, sol_data::Address)>::abi_encode_params(&(1u8, 3u8, winner));

        let result = decode_game_result(&data).unwrap();
        assert_eq!(result.move1, Some(Move::Rock));
        assert_eq!(result.move2, Some(Move::Scissors));
        assert_eq!(result.winner, winner);
    }

    #[test]
    fn test_decode_result_rejects_unknown_move() {
        let data = <(sol_data::Uint<8>, sol_data::Uint<8>, sol_data::Address)>::abi_encode_params(&(7u8, 0u8, Address::ZERO));
        assert!(matches!(
            decode_game_result(&data),
            Err(AbiError::InvalidMove {
                field: "move1",
                value: 7
            })
        ));
    }

    #[test]
    fn test_decode_counter_overflow() {
        assert_eq!(decode_counter(&U256::from(12).abi_encode()).unwrap(), 12);

        let too_big = U256::from(u64::MAX) + U256::from(1);
        assert!(matches!(
            decode_counter(&too_big.abi_encode()),
            Err(AbiError::Overflow { field: "gameCounter", .. })
        ));
    }
}
