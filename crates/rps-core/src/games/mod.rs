//! Game definitions and logic.

mod rps;

pub use rps::{judge, InvalidMove, Move, ParseMoveError, Verdict};
