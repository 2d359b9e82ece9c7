//! Protocol types shared by the engine and contract clients.

mod types;

pub use types::{
    Address, GameId, GameResult, GameSnapshot, Role, TxHash, TxReceipt, Wei,
    DEFAULT_ENTRY_FEE,
};
