//! Rock-Paper-Scissors moves and judging.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A raw move value outside the on-chain range 1..=3.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("invalid move {0}: expected 1 (Rock), 2 (Paper) or 3 (Scissors)")]
pub struct InvalidMove(pub u8);

/// Text that names no move.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown move {input:?}: expected rock, paper, scissors or 1..=3")]
pub struct ParseMoveError {
    pub input: String,
}

/// Rock-Paper-Scissors move. On-chain it is a `uint8` in 1..=3; 0 means
/// "no move yet" and is represented as `Option::None` by callers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Move {
    Rock,
    Paper,
    Scissors,
}

impl Move {
    pub const ALL: [Move; 3] = [Move::Rock, Move::Paper, Move::Scissors];

    /// On-chain encoding
    pub fn as_u8(&self) -> u8 {
        match self {
            Move::Rock => 1,
            Move::Paper => 2,
            Move::Scissors => 3,
        }
    }

    /// Decode an on-chain value where 0 means "not revealed".
    pub fn from_onchain(raw: u8) -> Result<Option<Move>, InvalidMove> {
        match raw {
            0 => Ok(None),
            raw => Move::try_from(raw).map(Some),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Move::Rock => "Rock",
            Move::Paper => "Paper",
            Move::Scissors => "Scissors",
        }
    }

    /// Check if this move beats the other
    pub fn beats(&self, other: &Move) -> bool {
        matches!(
            (self, other),
            (Move::Rock, Move::Scissors)
                | (Move::Scissors, Move::Paper)
                | (Move::Paper, Move::Rock)
        )
    }
}

impl TryFrom<u8> for Move {
    type Error = InvalidMove;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        match raw {
            1 => Ok(Move::Rock),
            2 => Ok(Move::Paper),
            3 => Ok(Move::Scissors),
            other => Err(InvalidMove(other)),
        }
    }
}

impl FromStr for Move {
    type Err = ParseMoveError;

    /// Accepts names (any case) or the on-chain digit.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rock" | "1" => Ok(Move::Rock),
            "paper" | "2" => Ok(Move::Paper),
            "scissors" | "3" => Ok(Move::Scissors),
            _ => Err(ParseMoveError {
                input: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Outcome of one round from the first player's point of view
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    FirstWins,
    SecondWins,
    Draw,
}

/// Judge a round between the first and second player.
pub fn judge(first: Move, second: Move) -> Verdict {
    if first == second {
        Verdict::Draw
    } else if first.beats(&second) {
        Verdict::FirstWins
    } else {
        Verdict::SecondWins
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rps_rock_beats_scissors() {
        assert_eq!(judge(Move::Rock, Move::Scissors), Verdict::FirstWins);
        assert_eq!(judge(Move::Scissors, Move::Rock), Verdict::SecondWins);
    }

    #[test]
    fn test_rps_scissors_beats_paper() {
        assert_eq!(judge(Move::Scissors, Move::Paper), Verdict::FirstWins);
        assert_eq!(judge(Move::Paper, Move::Scissors), Verdict::SecondWins);
    }

    #[test]
    fn test_rps_paper_beats_rock() {
        assert_eq!(judge(Move::Paper, Move::Rock), Verdict::FirstWins);
        assert_eq!(judge(Move::Rock, Move::Paper), Verdict::SecondWins);
    }

    #[test]
    fn test_rps_all_outcomes() {
        let mut first = 0;
        let mut second = 0;
        let mut draws = 0;

        for a in Move::ALL {
            for b in Move::ALL {
                match judge(a, b) {
                    Verdict::FirstWins => first += 1,
                    Verdict::SecondWins => second += 1,
                    Verdict::Draw => draws += 1,
                }
            }
        }

        assert_eq!(first, 3);
        assert_eq!(second, 3);
        assert_eq!(draws, 3);
    }

    #[test]
    fn test_onchain_encoding() {
        for mv in Move::ALL {
            assert_eq!(Move::try_from(mv.as_u8()), Ok(mv));
        }
        assert_eq!(Move::try_from(0), Err(InvalidMove(0)));
        assert_eq!(Move::try_from(4), Err(InvalidMove(4)));
        assert_eq!(Move::from_onchain(0), Ok(None));
        assert_eq!(Move::from_onchain(2), Ok(Some(Move::Paper)));
        assert!(Move::from_onchain(9).is_err());
    }

    #[test]
    fn test_parse_names_and_digits() {
        assert_eq!("rock".parse::<Move>(), Ok(Move::Rock));
        assert_eq!("PAPER".parse::<Move>(), Ok(Move::Paper));
        assert_eq!("3".parse::<Move>(), Ok(Move::Scissors));
        assert_eq!(
            "4".parse::<Move>(),
            Err(ParseMoveError {
                input: "4".to_string()
            })
        );
        let err = "lizard".parse::<Move>().unwrap_err();
        assert_eq!(err.input, "lizard");
        assert!(err.to_string().contains("\"lizard\""));
    }
}
