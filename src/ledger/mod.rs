pub mod abi;
pub mod calls;
#[cfg(test)]
pub mod memory;
pub mod records;
pub mod rpc;
pub mod tx;

use crate::gas::WriteCost;
use async_trait::async_trait;
use calls::WriteCall;
use thiserror::Error;
use tx::SignerError;

/// `0x`-prefixed transaction hash.
pub type TxHash = String;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub tx_hash: TxHash,
    pub block_number: u64,
    pub gas_used: u64,
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("transport error during {method}: {source}")]
    Transport {
        method: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("{method} failed with code {code}: {message}")]
    Rpc {
        method: &'static str,
        code: i64,
        message: String,
    },
    #[error("could not decode {what}: {detail}")]
    Decode { what: &'static str, detail: String },
    #[error("simulation of {call} rejected: {reason}")]
    SimulationRejected { call: &'static str, reason: String },
    #[error("submission of {call} rejected: {reason}")]
    SubmissionRejected { call: &'static str, reason: String },
    #[error("transaction {0} reverted")]
    Reverted(TxHash),
    #[error("transaction {tx_hash} not confirmed after {secs}s")]
    ConfirmationTimeout { tx_hash: TxHash, secs: u64 },
    #[error("invalid contract address {0:?}")]
    InvalidAddress(String),
    #[error(transparent)]
    Signer(#[from] SignerError),
}

/// Read/write capabilities of a deployed bracket contract. Reads return the
/// raw encoded records; decoding lives in [`records`].
#[async_trait]
pub trait Ledger: Send + Sync {
    async fn tournament_exists(&self, season: u16) -> Result<bool, LedgerError>;

    /// Encoded `(uint8 round, uint8 status)`.
    async fn game_status(&self, season: u16) -> Result<Vec<u8>, LedgerError>;

    /// Four encoded region records, South/West/Midwest/East.
    async fn all_regions_data(&self, season: u16) -> Result<Vec<Vec<u8>>, LedgerError>;

    /// Four encoded play-in match records.
    async fn first_four_data(&self, season: u16) -> Result<Vec<Vec<u8>>, LedgerError>;

    /// Encoded final four record.
    async fn final_four_data(&self, season: u16) -> Result<Vec<u8>, LedgerError>;

    /// Simulated gas for `call`. A rejection means the write would fail.
    async fn estimate(&self, call: &WriteCall) -> Result<u64, LedgerError>;

    async fn submit(&self, call: &WriteCall, cost: WriteCost) -> Result<TxHash, LedgerError>;

    /// Wait until `tx_hash` is included.
    async fn confirm(&self, tx_hash: &TxHash) -> Result<Receipt, LedgerError>;
}
