//! Mock game contract for testing.
//!
//! Enforces the same participation, ordering, and commitment-verification
//! rules the deployed contract does, entirely in memory.

use super::traits::{ContractError, RpsContract};
use crate::crypto::{Commitment, SecretDigest};
use crate::games::{judge, Move, Verdict};
use crate::protocol::{
    Address, GameId, GameResult, GameSnapshot, Role, TxReceipt, Wei, DEFAULT_ENTRY_FEE,
};
use alloy_primitives::keccak256;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

/// A write the mock was asked to perform, whether or not it succeeded
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WriteCall {
    CreateGame {
        from: Address,
        value: Wei,
    },
    JoinGame {
        from: Address,
        game_id: GameId,
        value: Wei,
    },
    CommitMove {
        from: Address,
        game_id: GameId,
        commitment: Commitment,
    },
    RevealMove {
        from: Address,
        game_id: GameId,
        mv: Move,
        digest: SecretDigest,
    },
}

/// Injected failure for the next write
#[derive(Clone, Debug)]
enum Fault {
    /// Fail without touching state
    Before(ContractError),
    /// Apply the write, then report it as unconfirmed
    LostConfirmation,
}

#[derive(Clone, Debug, Default)]
struct MockGame {
    player1: Address,
    player2: Address,
    entry_fee: Wei,
    commits: [Option<Commitment>; 2],
    reveals: [Option<Move>; 2],
    finished: bool,
    winner: Address,
}

impl MockGame {
    fn seat(&self, from: &Address) -> Option<usize> {
        if *from == self.player1 {
            Some(0)
        } else if *from == self.player2 && !self.player2.is_zero() {
            Some(1)
        } else {
            None
        }
    }

    fn snapshot(&self) -> GameSnapshot {
        GameSnapshot {
            player1: self.player1,
            player2: self.player2,
            entry_fee: self.entry_fee,
            player1_committed: self.commits[0].is_some(),
            player2_committed: self.commits[1].is_some(),
            player1_revealed: self.reveals[0].is_some(),
            player2_revealed: self.reveals[1].is_some(),
            finished: self.finished,
        }
    }
}

struct MockState {
    entry_fee: Wei,
    games: Vec<MockGame>,
    writes: Vec<WriteCall>,
    faults: VecDeque<Fault>,
    block_number: u64,
}

/// In-memory mock contract for testing
#[derive(Clone)]
pub struct MockRpsContract {
    state: Arc<Mutex<MockState>>,
}

impl Default for MockRpsContract {
    fn default() -> Self {
        Self::new(DEFAULT_ENTRY_FEE)
    }
}

impl MockRpsContract {
    /// Create a mock contract that charges `entry_fee` per player
    pub fn new(entry_fee: Wei) -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                entry_fee,
                games: Vec::new(),
                writes: Vec::new(),
                faults: VecDeque::new(),
                block_number: 0,
            })),
        }
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Every write attempted so far, in order
    pub fn writes(&self) -> Vec<WriteCall> {
        self.state().writes.clone()
    }

    pub fn write_count(&self) -> usize {
        self.state().writes.len()
    }

    /// Make the next write fail with `error` without changing state
    pub fn fail_next_write(&self, error: ContractError) {
        self.state().faults.push_back(Fault::Before(error));
    }

    /// Apply the next write but report it as `Unconfirmed`, as when a
    /// receipt wait times out after the transaction was actually mined
    pub fn lose_next_confirmation(&self) {
        self.state().faults.push_back(Fault::LostConfirmation);
    }

    /// Commitment stored for `role`, if any
    pub fn stored_commitment(&self, game_id: GameId, role: Role) -> Option<Commitment> {
        let state = self.state();
        let game = game_index(game_id).and_then(|i| state.games.get(i))?;
        game.commits[seat_index(role)]
    }

    fn write<F>(&self, call: WriteCall, apply: F) -> Result<TxReceipt, ContractError>
    where
        F: FnOnce(&mut MockState) -> Result<(), String>,
    {
        let mut state = self.state();
        state.writes.push(call);
        state.block_number += 1;
        let block_number = state.block_number;
        let tx_hash = keccak256(block_number.to_be_bytes());

        let lose_confirmation = match state.faults.pop_front() {
            Some(Fault::Before(error)) => return Err(error),
            Some(Fault::LostConfirmation) => true,
            None => false,
        };

        apply(&mut *state).map_err(|reason| ContractError::Reverted {
            tx_hash: Some(tx_hash),
            reason,
        })?;

        if lose_confirmation {
            return Err(ContractError::Unconfirmed(tx_hash));
        }
        Ok(TxReceipt {
            tx_hash,
            block_number,
        })
    }
}

fn game_index(game_id: GameId) -> Option<usize> {
    (game_id.value() as usize).checked_sub(1)
}

fn seat_index(role: Role) -> usize {
    match role {
        Role::Player1 => 0,
        Role::Player2 => 1,
    }
}

fn game_mut(state: &mut MockState, game_id: GameId) -> Result<&mut MockGame, String> {
    game_index(game_id)
        .and_then(|i| state.games.get_mut(i))
        .ok_or_else(|| format!("game {} does not exist", game_id))
}

#[async_trait]
impl RpsContract for MockRpsContract {
    async fn create_game(&self, from: Address, value: Wei) -> Result<TxReceipt, ContractError> {
        self.write(WriteCall::CreateGame { from, value }, |state| {
            if value != state.entry_fee {
                return Err("incorrect entry fee".to_string());
            }
            let entry_fee = state.entry_fee;
            state.games.push(MockGame {
                player1: from,
                entry_fee,
                ..MockGame::default()
            });
            Ok(())
        })
    }

    async fn join_game(
        &self,
        from: Address,
        game_id: GameId,
        value: Wei,
    ) -> Result<TxReceipt, ContractError> {
        let call = WriteCall::JoinGame {
            from,
            game_id,
            value,
        };
        self.write(call, |state| {
            let game = game_mut(state, game_id)?;
            if value != game.entry_fee {
                return Err("incorrect entry fee".to_string());
            }
            if !game.player2.is_zero() {
                return Err("game is full".to_string());
            }
            if game.player1 == from {
                return Err("cannot join own game".to_string());
            }
            game.player2 = from;
            Ok(())
        })
    }

    async fn commit_move(
        &self,
        from: Address,
        game_id: GameId,
        commitment: Commitment,
    ) -> Result<TxReceipt, ContractError> {
        let call = WriteCall::CommitMove {
            from,
            game_id,
            commitment,
        };
        self.write(call, |state| {
            let game = game_mut(state, game_id)?;
            if game.finished {
                return Err("game finished".to_string());
            }
            let seat = game.seat(&from).ok_or("not a player")?;
            if game.commits[seat].is_some() {
                return Err("already committed".to_string());
            }
            game.commits[seat] = Some(commitment);
            Ok(())
        })
    }

    async fn reveal_move(
        &self,
        from: Address,
        game_id: GameId,
        mv: Move,
        digest: SecretDigest,
    ) -> Result<TxReceipt, ContractError> {
        let call = WriteCall::RevealMove {
            from,
            game_id,
            mv,
            digest,
        };
        self.write(call, |state| {
            let game = game_mut(state, game_id)?;
            let seat = game.seat(&from).ok_or("not a player")?;
            let (Some(c1), Some(c2)) = (game.commits[0], game.commits[1]) else {
                return Err("both players must commit first".to_string());
            };
            if game.reveals[seat].is_some() {
                return Err("already revealed".to_string());
            }
            let stored = if seat == 0 { c1 } else { c2 };
            if !stored.verify(mv, &digest, &from) {
                return Err("invalid reveal".to_string());
            }
            game.reveals[seat] = Some(mv);

            if let [Some(m1), Some(m2)] = game.reveals {
                game.finished = true;
                game.winner = match judge(m1, m2) {
                    Verdict::FirstWins => game.player1,
                    Verdict::SecondWins => game.player2,
                    Verdict::Draw => Address::ZERO,
                };
            }
            Ok(())
        })
    }

    async fn get_game(&self, game_id: GameId) -> Result<GameSnapshot, ContractError> {
        let state = self.state();
        Ok(game_index(game_id)
            .and_then(|i| state.games.get(i))
            .cloned()
            .unwrap_or_default()
            .snapshot())
    }

    async fn get_game_result(&self, game_id: GameId) -> Result<GameResult, ContractError> {
        let state = self.state();
        let game = game_index(game_id)
            .and_then(|i| state.games.get(i))
            .cloned()
            .unwrap_or_default();
        Ok(GameResult {
            move1: game.reveals[0],
            move2: game.reveals[1],
            winner: game.winner,
        })
    }

    async fn game_counter(&self) -> Result<u64, ContractError> {
        Ok(self.state().games.len() as u64)
    }
}
