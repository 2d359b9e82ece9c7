//! Startup configuration read from the environment.

use alloy_primitives::address;
use rps_core::engine::StoreError;
use rps_core::protocol::{Address, Wei, DEFAULT_ENTRY_FEE};
use rps_core::ContractError;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Local Anvil deployment address of the game contract
pub const DEFAULT_CONTRACT: Address = address!("5FbDB2315678afecb367f032d93F642f64180aa3");
/// Anvil's first dev account, used as the player when running on the mock
pub const DEV_PLAYER: Address = address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266");
pub const DEFAULT_CHAIN_ID: u64 = 31337;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {name}={value:?}: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("node reports chain id {actual}, expected {expected}")]
    ChainMismatch { expected: u64, actual: u64 },

    #[error("PLAYER_ADDRESS not set and the node has no accounts")]
    NoAccount,

    #[error("node unavailable: {0}")]
    Node(#[from] ContractError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    /// `None` runs against the in-process mock contract
    pub rpc_url: Option<String>,
    pub contract_address: Address,
    pub player_address: Option<Address>,
    pub entry_fee: Wei,
    pub poll_interval: Duration,
    pub receipt_timeout: Duration,
    pub chain_id: u64,
    /// `None` keeps sessions in memory only
    pub session_file: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source; empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        Ok(Self {
            port: parse(&get, "PORT")?.unwrap_or(3001),
            rpc_url: get("RPC_URL"),
            contract_address: parse(&get, "CONTRACT_ADDRESS")?.unwrap_or(DEFAULT_CONTRACT),
            player_address: parse(&get, "PLAYER_ADDRESS")?,
            entry_fee: parse(&get, "ENTRY_FEE_WEI")?.unwrap_or(DEFAULT_ENTRY_FEE),
            poll_interval: Duration::from_millis(
                parse(&get, "POLL_INTERVAL_MS")?.unwrap_or(2_000),
            ),
            receipt_timeout: Duration::from_millis(
                parse(&get, "RECEIPT_TIMEOUT_MS")?.unwrap_or(60_000),
            ),
            chain_id: parse(&get, "CHAIN_ID")?.unwrap_or(DEFAULT_CHAIN_ID),
            session_file: get("SESSION_FILE").map(PathBuf::from),
        })
    }
}

fn parse<T, G>(get: &G, name: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: Display,
    G: Fn(&str) -> Option<String>,
{
    let Some(value) = get(name) else {
        return Ok(None);
    };
    match value.trim().parse::<T>() {
        Ok(parsed) => Ok(Some(parsed)),
        Err(e) => Err(ConfigError::Invalid {
            name,
            reason: e.to_string(),
            value,
        }),
    }
}
