//! Protocol types.

use crate::games::Move;
use alloy_primitives::B256;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

pub use alloy_primitives::Address;

/// Amount in wei.
pub type Wei = u128;

/// 0.01 ether, the entry fee the game contract is deployed with.
pub const DEFAULT_ENTRY_FEE: Wei = 10_000_000_000_000_000;

/// On-chain game identifier. Ids start at 1; the newest game's id equals
/// `gameCounter()`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameId(u64);

impl GameId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl FromStr for GameId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

impl fmt::Debug for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GameId({})", self.0)
    }
}

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Transaction hash
pub type TxHash = B256;

/// Receipt of a mined, successful transaction
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxReceipt {
    pub tx_hash: TxHash,
    pub block_number: u64,
}

/// Seat a player occupies in a game
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Player1,
    Player2,
}

impl Role {
    /// Get the opponent
    pub fn opponent(&self) -> Role {
        match self {
            Role::Player1 => Role::Player2,
            Role::Player2 => Role::Player1,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Player1 => write!(f, "player 1"),
            Role::Player2 => write!(f, "player 2"),
        }
    }
}

/// Read-only copy of the contract's `getGame` tuple
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSnapshot {
    pub player1: Address,
    pub player2: Address,
    pub entry_fee: Wei,
    pub player1_committed: bool,
    pub player2_committed: bool,
    pub player1_revealed: bool,
    pub player2_revealed: bool,
    pub finished: bool,
}

impl GameSnapshot {
    /// A game nobody created reads back as all zeroes.
    pub fn exists(&self) -> bool {
        !self.player1.is_zero()
    }

    pub fn has_opponent(&self) -> bool {
        !self.player2.is_zero()
    }

    /// Which seat `player` occupies, if any.
    pub fn role_of(&self, player: &Address) -> Option<Role> {
        if player.is_zero() {
            None
        } else if *player == self.player1 {
            Some(Role::Player1)
        } else if *player == self.player2 {
            Some(Role::Player2)
        } else {
            None
        }
    }

    pub fn player(&self, role: Role) -> Address {
        match role {
            Role::Player1 => self.player1,
            Role::Player2 => self.player2,
        }
    }

    pub fn committed(&self, role: Role) -> bool {
        match role {
            Role::Player1 => self.player1_committed,
            Role::Player2 => self.player2_committed,
        }
    }

    pub fn revealed(&self, role: Role) -> bool {
        match role {
            Role::Player1 => self.player1_revealed,
            Role::Player2 => self.player2_revealed,
        }
    }

    pub fn both_committed(&self) -> bool {
        self.player1_committed && self.player2_committed
    }
}

/// Read-only copy of the contract's `getGameResult` tuple
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameResult {
    pub move1: Option<Move>,
    pub move2: Option<Move>,
    /// Zero address on a tie.
    pub winner: Address,
}

impl GameResult {
    pub fn is_tie(&self) -> bool {
        self.winner.is_zero()
    }

    /// Winner's seat, resolved against the game's snapshot.
    pub fn winner_role(&self, snapshot: &GameSnapshot) -> Option<Role> {
        snapshot.role_of(&self.winner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> GameSnapshot {
        GameSnapshot {
            player1: Address::repeat_byte(1),
            player2: Address::repeat_byte(2),
            entry_fee: DEFAULT_ENTRY_FEE,
            player1_committed: true,
            player2_committed: false,
            player1_revealed: false,
            player2_revealed: false,
            finished: false,
        }
    }

    #[test]
    fn test_address_parse_and_display() {
        let text = "0x5FbDB2315678afecb367f032d93F642f64180aa3";
        let address: Address = text.parse().unwrap();
        assert_eq!(address, text.to_lowercase().parse::<Address>().unwrap());
        assert_eq!(
            serde_json::to_value(address).unwrap(),
            serde_json::json!(text.to_lowercase())
        );
        assert!("0x1234".parse::<Address>().is_err());
        assert!("not an address".parse::<Address>().is_err());
    }

    #[test]
    fn test_role_lookup_is_explicit() {
        let game = snapshot();
        assert_eq!(game.role_of(&Address::repeat_byte(1)), Some(Role::Player1));
        assert_eq!(game.role_of(&Address::repeat_byte(2)), Some(Role::Player2));
        assert_eq!(game.role_of(&Address::repeat_byte(3)), None);
    }

    #[test]
    fn test_zero_address_never_has_a_role() {
        let mut game = snapshot();
        game.player2 = Address::ZERO;
        assert_eq!(game.role_of(&Address::ZERO), None);
        assert!(!game.has_opponent());
    }

    #[test]
    fn test_flags_by_role() {
        let game = snapshot();
        assert!(game.committed(Role::Player1));
        assert!(!game.committed(Role::Player2));
        assert!(!game.both_committed());
        assert_eq!(Role::Player1.opponent(), Role::Player2);
    }

    #[test]
    fn test_result_tie_and_winner() {
        let game = snapshot();
        let tie = GameResult {
            move1: Some(Move::Paper),
            move2: Some(Move::Paper),
            winner: Address::ZERO,
        };
        assert!(tie.is_tie());
        assert_eq!(tie.winner_role(&game), None);

        let win = GameResult {
            move1: Some(Move::Rock),
            move2: Some(Move::Scissors),
            winner: game.player1,
        };
        assert!(!win.is_tie());
        assert_eq!(win.winner_role(&game), Some(Role::Player1));
    }

    #[test]
    fn test_game_id_serializes_as_number() {
        assert_eq!(serde_json::to_string(&GameId::new(7)).unwrap(), "7");
        assert_eq!("42".parse::<GameId>().unwrap(), GameId::new(42));
    }
}
