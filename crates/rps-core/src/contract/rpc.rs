//! RPC client for an Ethereum JSON-RPC node.
//!
//! This module provides a real implementation of `RpsContract` that talks to a
//! node over HTTP. Transactions are sent with `eth_sendTransaction`, so the
//! node (or the wallet in front of it) holds the signing key for `from`.

use super::abi::{self, AbiError};
use super::traits::{ContractError, RpsContract};
use crate::crypto::{Commitment, SecretDigest};
use crate::games::Move;
use crate::protocol::{Address, GameId, GameResult, GameSnapshot, TxHash, TxReceipt, Wei};
use alloy_primitives::hex;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, info};

/// EIP-1193 "user rejected request".
const USER_REJECTED_CODE: i64 = 4001;

impl From<AbiError> for ContractError {
    fn from(e: AbiError) -> Self {
        ContractError::Decode(e.to_string())
    }
}

/// RPC client for the game contract
pub struct RpcRpsContract {
    /// HTTP client
    client: Client,
    /// Node RPC URL
    rpc_url: String,
    /// Deployed game contract
    contract: Address,
    /// How often to ask for a receipt
    receipt_poll: Duration,
    /// Give up waiting for a receipt after this long
    receipt_timeout: Duration,
    next_id: AtomicU64,
}

impl RpcRpsContract {
    /// Create a new RPC client
    pub fn new(rpc_url: impl Into<String>, contract: Address) -> Self {
        Self {
            client: Client::new(),
            rpc_url: rpc_url.into(),
            contract,
            receipt_poll: Duration::from_millis(500),
            receipt_timeout: Duration::from_secs(60),
            next_id: AtomicU64::new(1),
        }
    }

    /// Override receipt polling cadence and timeout
    pub fn with_receipt_timing(mut self, poll: Duration, timeout: Duration) -> Self {
        self.receipt_poll = poll;
        self.receipt_timeout = timeout;
        self
    }

    pub fn contract_address(&self) -> Address {
        self.contract
    }

    /// Make a JSON-RPC call
    async fn call(&self, method: &str, params: Value) -> Result<Value, ContractError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        debug!(method, %request, "rpc request");

        let response = self
            .client
            .post(&self.rpc_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| ContractError::Network(e.to_string()))?;

        let body: Value = response
            .json()
            .await
            .map_err(|e| ContractError::Network(e.to_string()))?;

        debug!(method, response = %body, "rpc response");

        if let Some(error) = body.get("error") {
            let code = error.get("code").and_then(Value::as_i64).unwrap_or(0);
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("Unknown error");
            return Err(classify_rpc_error(code, message));
        }

        body.get("result")
            .cloned()
            .ok_or_else(|| ContractError::Decode("No result in response".to_string()))
    }

    /// Read-only call against the latest block
    async fn eth_call(&self, data: Vec<u8>) -> Result<Vec<u8>, ContractError> {
        let params = json!([
            {
                "to": self.contract,
                "data": hex::encode_prefixed(&data),
            },
            "latest"
        ]);
        let result = self.call("eth_call", params).await?;
        let text = result
            .as_str()
            .ok_or_else(|| ContractError::Decode("eth_call result is not a string".to_string()))?;
        decode_data(text)
    }

    /// Submit a transaction and wait until it is mined
    async fn send_transaction(
        &self,
        from: Address,
        data: Vec<u8>,
        value: Wei,
    ) -> Result<TxReceipt, ContractError> {
        let mut tx = json!({
            "from": from,
            "to": self.contract,
            "data": hex::encode_prefixed(&data),
        });
        if value > 0 {
            tx["value"] = Value::String(format!("0x{:x}", value));
        }

        let result = self.call("eth_sendTransaction", json!([tx])).await?;
        let tx_hash: TxHash = result
            .as_str()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| ContractError::Decode(format!("bad transaction hash: {}", result)))?;

        info!(%tx_hash, %from, "transaction submitted");
        self.wait_for_receipt(tx_hash).await
    }

    /// Poll `eth_getTransactionReceipt` until mined or timed out
    async fn wait_for_receipt(&self, tx_hash: TxHash) -> Result<TxReceipt, ContractError> {
        let deadline = Instant::now() + self.receipt_timeout;
        loop {
            let result = self
                .call("eth_getTransactionReceipt", json!([tx_hash]))
                .await?;
            if let Some(receipt) = parse_receipt(tx_hash, &result)? {
                info!(%tx_hash, block = receipt.block_number, "transaction confirmed");
                return Ok(receipt);
            }
            if Instant::now() >= deadline {
                return Err(ContractError::Unconfirmed(tx_hash));
            }
            sleep(self.receipt_poll).await;
        }
    }

    /// `eth_chainId`
    pub async fn chain_id(&self) -> Result<u64, ContractError> {
        let result = self.call("eth_chainId", json!([])).await?;
        parse_quantity(&result)
    }

    /// `eth_accounts`: accounts the node can sign for
    pub async fn accounts(&self) -> Result<Vec<Address>, ContractError> {
        let result = self.call("eth_accounts", json!([])).await?;
        result
            .as_array()
            .ok_or_else(|| ContractError::Decode("eth_accounts result is not an array".to_string()))?
            .iter()
            .map(|v| {
                v.as_str()
                    .and_then(|s| s.parse().ok())
                    .ok_or_else(|| ContractError::Decode(format!("bad account: {}", v)))
            })
            .collect()
    }
}

#[async_trait]
impl RpsContract for RpcRpsContract {
    async fn create_game(&self, from: Address, value: Wei) -> Result<TxReceipt, ContractError> {
        self.send_transaction(from, abi::create_game(), value).await
    }

    async fn join_game(
        &self,
        from: Address,
        game_id: GameId,
        value: Wei,
    ) -> Result<TxReceipt, ContractError> {
        self.send_transaction(from, abi::join_game(game_id), value)
            .await
    }

    async fn commit_move(
        &self,
        from: Address,
        game_id: GameId,
        commitment: Commitment,
    ) -> Result<TxReceipt, ContractError> {
        self.send_transaction(from, abi::commit_move(game_id, &commitment), 0)
            .await
    }

    async fn reveal_move(
        &self,
        from: Address,
        game_id: GameId,
        mv: Move,
        digest: SecretDigest,
    ) -> Result<TxReceipt, ContractError> {
        self.send_transaction(from, abi::reveal_move(game_id, mv, &digest), 0)
            .await
    }

    async fn get_game(&self, game_id: GameId) -> Result<GameSnapshot, ContractError> {
        let data = self.eth_call(abi::get_game(game_id)).await?;
        Ok(abi::decode_game(&data)?)
    }

    async fn get_game_result(&self, game_id: GameId) -> Result<GameResult, ContractError> {
        let data = self.eth_call(abi::get_game_result(game_id)).await?;
        Ok(abi::decode_game_result(&data)?)
    }

    async fn game_counter(&self) -> Result<u64, ContractError> {
        let data = self.eth_call(abi::game_counter()).await?;
        Ok(abi::decode_counter(&data)?)
    }
}

/// Map a JSON-RPC error object onto the client's error classes.
fn classify_rpc_error(code: i64, message: &str) -> ContractError {
    if code == USER_REJECTED_CODE {
        ContractError::Rejected(message.to_string())
    } else if message.to_ascii_lowercase().contains("revert") {
        ContractError::Reverted {
            tx_hash: None,
            reason: message.to_string(),
        }
    } else {
        ContractError::Rpc {
            code,
            message: message.to_string(),
        }
    }
}

/// Hex quantity such as `"0x7a69"`.
fn parse_quantity(value: &Value) -> Result<u64, ContractError> {
    let text = value
        .as_str()
        .ok_or_else(|| ContractError::Decode(format!("expected hex quantity, got {}", value)))?;
    let digits = text.strip_prefix("0x").unwrap_or(text);
    u64::from_str_radix(digits, 16)
        .map_err(|e| ContractError::Decode(format!("bad quantity {:?}: {}", text, e)))
}

fn decode_data(text: &str) -> Result<Vec<u8>, ContractError> {
    hex::decode(text).map_err(|e| ContractError::Decode(e.to_string()))
}

/// `None` while the transaction is pending; `Reverted` for `status == 0`.
fn parse_receipt(tx_hash: TxHash, value: &Value) -> Result<Option<TxReceipt>, ContractError> {
    if value.is_null() {
        return Ok(None);
    }
    let block_number = match value.get("blockNumber") {
        Some(v) if !v.is_null() => parse_quantity(v)?,
        _ => return Ok(None),
    };
    let status = value
        .get("status")
        .map(parse_quantity)
        .transpose()?
        .unwrap_or(1);
    if status == 0 {
        return Err(ContractError::Reverted {
            tx_hash: Some(tx_hash),
            reason: "execution reverted".to_string(),
        });
    }
    Ok(Some(TxReceipt {
        tx_hash,
        block_number,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hash() -> TxHash {
        TxHash::new([7; 32])
    }

    #[test]
    fn test_classify_rpc_error() {
        assert!(matches!(
            classify_rpc_error(4001, "User rejected the request."),
            ContractError::Rejected(_)
        ));
        assert!(matches!(
            classify_rpc_error(3, "execution reverted: already committed"),
            ContractError::Reverted { tx_hash: None, .. }
        ));
        assert_eq!(
            classify_rpc_error(-32000, "nonce too low"),
            ContractError::Rpc {
                code: -32000,
                message: "nonce too low".to_string()
            }
        );
    }

    #[test]
    fn test_parse_quantity() {
        assert_eq!(parse_quantity(&json!("0x7a69")).unwrap(), 31337);
        assert_eq!(parse_quantity(&json!("0x0")).unwrap(), 0);
        assert!(parse_quantity(&json!(12)).is_err());
        assert!(parse_quantity(&json!("0xzz")).is_err());
    }

    #[test]
    fn test_pending_receipt() {
        assert_eq!(parse_receipt(hash(), &Value::Null).unwrap(), None);
        assert_eq!(
            parse_receipt(hash(), &json!({ "blockNumber": null })).unwrap(),
            None
        );
    }

    #[test]
    fn test_successful_receipt() {
        let receipt = parse_receipt(hash(), &json!({ "blockNumber": "0x10", "status": "0x1" }))
            .unwrap()
            .unwrap();
        assert_eq!(receipt.block_number, 16);
        assert_eq!(receipt.tx_hash, hash());
    }

    #[test]
    fn test_reverted_receipt() {
        let result = parse_receipt(hash(), &json!({ "blockNumber": "0x10", "status": "0x0" }));
        assert!(matches!(
            result,
            Err(ContractError::Reverted { tx_hash: Some(h), .. }) if h == hash()
        ));
    }

    #[test]
    fn test_decode_data() {
        assert_eq!(decode_data("0x").unwrap(), Vec::<u8>::new());
        assert_eq!(decode_data("0x0102").unwrap(), vec![1, 2]);
        assert!(decode_data("0x0").is_err());
    }

    #[tokio::test]
    async fn test_unreachable_node_is_network_error() {
        let client = RpcRpsContract::new("http://127.0.0.1:9", Address::repeat_byte(1));
        let result = client.game_counter().await;
        assert!(matches!(result, Err(ContractError::Network(_))));
    }
}
