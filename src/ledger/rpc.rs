use crate::gas::WriteCost;
use crate::ledger::abi::{self, Kind, Token};
use crate::ledger::calls::WriteCall;
use crate::ledger::tx::{Address, LegacyTx, Signer, format_address, parse_address};
use crate::ledger::{Ledger, LedgerError, Receipt, TxHash};
use crate::settings::Settings;
use async_trait::async_trait;
use log::{debug, info};
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::Instant;

const FOUR_RECORDS: usize = 4;

/// [`Ledger`] over an EVM node's JSON-RPC endpoint.
pub struct RpcLedger {
    client: Client,
    url: String,
    contract: Address,
    signer: Signer,
    chain_id: u64,
    timeout: Duration,
    confirm_timeout: Duration,
    poll_interval: Duration,
    next_id: AtomicU64,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Value,
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawReceipt {
    block_number: Option<String>,
    status: Option<String>,
    #[serde(default)]
    gas_used: Option<String>,
}

impl RpcLedger {
    pub fn new(url: impl Into<String>, contract: Address, signer: Signer, chain_id: u64) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
            contract,
            signer,
            chain_id,
            timeout: Duration::from_secs(15),
            confirm_timeout: Duration::from_secs(120),
            poll_interval: Duration::from_secs(2),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn with_confirm_timeout(mut self, timeout: Duration) -> Self {
        self.confirm_timeout = timeout;
        self
    }

    /// Build a ledger from settings, asking the node for its chain id when
    /// none is configured.
    pub async fn connect(settings: &Settings) -> Result<Self, LedgerError> {
        let contract = parse_address(&settings.contract)
            .ok_or_else(|| LedgerError::InvalidAddress(settings.contract.clone()))?;
        let signer = Signer::from_hex(&settings.private_key)?;

        let mut ledger = Self::new(settings.rpc_url.clone(), contract, signer, settings.chain_id.unwrap_or(0))
            .with_confirm_timeout(settings.confirm_timeout);
        if settings.chain_id.is_none() {
            let raw: String = ledger.request("eth_chainId", json!([])).await?;
            ledger.chain_id = parse_u64("chain id", &raw)?;
        }

        info!(
            "ledger {} on chain {} as {}",
            format_address(&ledger.contract),
            ledger.chain_id,
            format_address(&ledger.signer.address())
        );
        Ok(ledger)
    }

    async fn request<T: DeserializeOwned>(&self, method: &'static str, params: Value) -> Result<T, LedgerError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({ "jsonrpc": "2.0", "id": id, "method": method, "params": params });

        let response: RpcResponse = self
            .client
            .post(&self.url)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|source| LedgerError::Transport { method, source })?
            .json()
            .await
            .map_err(|source| LedgerError::Transport { method, source })?;

        if let Some(err) = response.error {
            return Err(LedgerError::Rpc { method, code: err.code, message: err.message });
        }
        serde_json::from_value(response.result)
            .map_err(|e| LedgerError::Decode { what: method, detail: e.to_string() })
    }

    async fn call(&self, signature: &'static str, season: u16, returns: Kind) -> Result<Token, LedgerError> {
        let data = abi::encode_call(signature, &[Token::Uint(u128::from(season))]);
        let params = json!([
            { "to": format_address(&self.contract), "data": to_hex(&data) },
            "latest"
        ]);
        let raw: String = self.request("eth_call", params).await?;
        let bytes = from_hex("eth_call result", &raw)?;
        abi::decode_one(returns, &bytes).map_err(|e| LedgerError::Decode {
            what: "eth_call result",
            detail: format!("{signature}: {e}"),
        })
    }

    async fn call_bytes(&self, signature: &'static str, season: u16) -> Result<Vec<u8>, LedgerError> {
        let token = self.call(signature, season, Kind::Bytes).await?;
        token.into_bytes().map_err(|e| decode_err(signature, e))
    }

    async fn call_bytes_array(&self, signature: &'static str, season: u16) -> Result<Vec<Vec<u8>>, LedgerError> {
        let token = self
            .call(signature, season, Kind::array(Kind::Bytes, FOUR_RECORDS))
            .await?;
        token
            .into_array()
            .map_err(|e| decode_err(signature, e))?
            .into_iter()
            .map(|t| t.into_bytes().map_err(|e| decode_err(signature, e)))
            .collect()
    }

    fn tx_object(&self, call: &WriteCall) -> Value {
        json!({
            "from": format_address(&self.signer.address()),
            "to": format_address(&self.contract),
            "data": to_hex(&call.calldata()),
        })
    }
}

#[async_trait]
impl Ledger for RpcLedger {
    async fn tournament_exists(&self, season: u16) -> Result<bool, LedgerError> {
        let token = self.call("tournaments(uint256)", season, Kind::Address).await?;
        let address = token.into_address().map_err(|e| decode_err("tournaments", e))?;
        Ok(address != [0u8; 20])
    }

    async fn game_status(&self, season: u16) -> Result<Vec<u8>, LedgerError> {
        self.call_bytes("getGameStatus(uint256)", season).await
    }

    async fn all_regions_data(&self, season: u16) -> Result<Vec<Vec<u8>>, LedgerError> {
        self.call_bytes_array("getAllRegionsData(uint256)", season).await
    }

    async fn first_four_data(&self, season: u16) -> Result<Vec<Vec<u8>>, LedgerError> {
        self.call_bytes_array("getFirstFourData(uint256)", season).await
    }

    async fn final_four_data(&self, season: u16) -> Result<Vec<u8>, LedgerError> {
        self.call_bytes("getFinalFourData(uint256)", season).await
    }

    async fn estimate(&self, call: &WriteCall) -> Result<u64, LedgerError> {
        let raw: String = self
            .request("eth_estimateGas", json!([self.tx_object(call)]))
            .await
            .map_err(|e| match e {
                LedgerError::Rpc { message, .. } => LedgerError::SimulationRejected { call: call.name(), reason: message },
                other => other,
            })?;
        parse_u64("gas estimate", &raw)
    }

    async fn submit(&self, call: &WriteCall, cost: WriteCost) -> Result<TxHash, LedgerError> {
        let from = format_address(&self.signer.address());
        let raw_nonce: String = self
            .request("eth_getTransactionCount", json!([from, "pending"]))
            .await?;
        let nonce = parse_u64("nonce", &raw_nonce)?;

        let tx = LegacyTx {
            nonce,
            gas_price: cost.gas_price,
            gas_limit: cost.gas_limit,
            to: self.contract,
            value: 0,
            data: call.calldata(),
            chain_id: self.chain_id,
        };
        let raw = tx.sign(&self.signer)?;
        debug!("{} nonce {nonce}, {} bytes signed", call.name(), raw.len());

        self.request("eth_sendRawTransaction", json!([to_hex(&raw)]))
            .await
            .map_err(|e| match e {
                LedgerError::Rpc { message, .. } => LedgerError::SubmissionRejected { call: call.name(), reason: message },
                other => other,
            })
    }

    async fn confirm(&self, tx_hash: &TxHash) -> Result<Receipt, LedgerError> {
        let deadline = Instant::now() + self.confirm_timeout;
        loop {
            let receipt: Option<RawReceipt> = self
                .request("eth_getTransactionReceipt", json!([tx_hash]))
                .await?;

            if let Some(receipt) = receipt
                && let Some(block) = receipt.block_number.as_deref()
            {
                if receipt.status.as_deref().map(|s| parse_quantity("receipt status", s)).transpose()? == Some(0) {
                    return Err(LedgerError::Reverted(tx_hash.clone()));
                }
                let gas_used = match receipt.gas_used.as_deref() {
                    Some(raw) => parse_u64("gas used", raw)?,
                    None => 0,
                };
                return Ok(Receipt {
                    tx_hash: tx_hash.clone(),
                    block_number: parse_u64("block number", block)?,
                    gas_used,
                });
            }

            if Instant::now() >= deadline {
                return Err(LedgerError::ConfirmationTimeout {
                    tx_hash: tx_hash.clone(),
                    secs: self.confirm_timeout.as_secs(),
                });
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

// ---------------------------------------------------------------------------
// Hex helpers
// ---------------------------------------------------------------------------

fn decode_err(what: &'static str, e: abi::AbiError) -> LedgerError {
    LedgerError::Decode { what, detail: e.to_string() }
}

fn to_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

fn from_hex(what: &'static str, raw: &str) -> Result<Vec<u8>, LedgerError> {
    hex::decode(raw.trim_start_matches("0x")).map_err(|e| LedgerError::Decode { what, detail: e.to_string() })
}

fn parse_quantity(what: &'static str, raw: &str) -> Result<u128, LedgerError> {
    let digits = raw.trim().trim_start_matches("0x");
    if digits.is_empty() {
        return Ok(0);
    }
    u128::from_str_radix(digits, 16).map_err(|e| LedgerError::Decode { what, detail: format!("{raw:?}: {e}") })
}

fn parse_u64(what: &'static str, raw: &str) -> Result<u64, LedgerError> {
    u64::try_from(parse_quantity(what, raw)?)
        .map_err(|e| LedgerError::Decode { what, detail: format!("{raw:?}: {e}") })
}
