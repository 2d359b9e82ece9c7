//! RPS Commit Core Library
//!
//! This crate provides the commit-reveal primitives, the contract client
//! abstraction, and the per-game session engine for playing Rock-Paper-Scissors
//! against an on-chain adjudicating contract.

pub mod contract;
pub mod crypto;
pub mod engine;
pub mod games;
pub mod protocol;
pub mod watch;

pub use contract::{ContractError, MockRpsContract, RpcRpsContract, RpsContract};
pub use crypto::{compute_commitment, derive_secret_digest, Commitment, Secret, SecretDigest};
pub use engine::{
    CommitPhase, CommitSession, CommitmentEngine, EngineError, ErrorKind, GameView, NextStep,
    SessionStore,
};
pub use games::{Move, Verdict};
pub use protocol::{Address, GameId, GameResult, GameSnapshot, Role, TxHash, TxReceipt, Wei};
pub use watch::{GameUpdate, GameWatch};
