//! RPS Player Service
//!
//! HTTP service through which one local account creates or joins on-chain
//! Rock-Paper-Scissors games and plays them with commit-reveal.

mod config;
mod handlers;
mod models;
mod state;

use rps_core::protocol::Address;
use rps_core::{CommitmentEngine, MockRpsContract, RpcRpsContract, RpsContract, SessionStore};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::{Config, ConfigError, DEV_PLAYER};
use handlers::create_router;
use state::{Backend, PlayerState};

/// Contract client, local player and backend kind chosen from the config
async fn connect(
    config: &Config,
) -> Result<(Arc<dyn RpsContract>, Address, Backend, Option<u64>), ConfigError> {
    let Some(url) = &config.rpc_url else {
        info!("RPC_URL not set, using the in-process mock contract");
        let player = config.player_address.unwrap_or(DEV_PLAYER);
        let contract: Arc<dyn RpsContract> = Arc::new(MockRpsContract::new(config.entry_fee));
        return Ok((contract, player, Backend::Mock, None));
    };

    let receipt_poll = config.poll_interval.min(config.receipt_timeout);
    let client = RpcRpsContract::new(url.clone(), config.contract_address)
        .with_receipt_timing(receipt_poll, config.receipt_timeout);

    let chain_id = client.chain_id().await?;
    if chain_id != config.chain_id {
        return Err(ConfigError::ChainMismatch {
            expected: config.chain_id,
            actual: chain_id,
        });
    }

    let player = match config.player_address {
        Some(player) => player,
        None => client
            .accounts()
            .await?
            .first()
            .copied()
            .ok_or(ConfigError::NoAccount)?,
    };

    info!(
        "Using node {} (chain {}), contract {}",
        url,
        chain_id,
        client.contract_address()
    );
    Ok((Arc::new(client), player, Backend::Rpc, Some(chain_id)))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let (contract, player, backend, chain_id) = connect(&config).await?;

    let store = match &config.session_file {
        Some(path) => {
            info!("Sessions persisted to {}", path.display());
            SessionStore::open(path).map_err(ConfigError::from)?
        }
        None => SessionStore::in_memory(),
    };

    let engine = CommitmentEngine::new(contract, player, config.entry_fee, store);
    let state = Arc::new(PlayerState::new(
        engine,
        backend,
        chain_id,
        config.poll_interval,
    ));
    state.resume();

    info!("Player address: {}", player);
    info!("Entry fee: {} wei", config.entry_fee);

    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr).await?;
    info!("Player service listening on http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
