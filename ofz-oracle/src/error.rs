//! Error taxonomy shared by the Provider and Publisher.
//!
//! Mirrors spec §7: a small set of named failure modes, each with an
//! explicit blast radius. `ConfigError` and `ContractMissing` are fatal at
//! startup; everything else is caught at a request or per-SECID boundary
//! and logged without tearing down the process.

use alloy::primitives::{Address, TxHash};
use std::fmt;

/// Receipt summary kept on a `TxReverted` error, just enough to log.
#[derive(Debug, Clone)]
pub struct ReceiptSummary {
    pub block_number: Option<u64>,
    pub gas_used: u64,
}

impl fmt::Display for ReceiptSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "block={:?} gas_used={}",
            self.block_number, self.gas_used
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    /// Malformed environment at startup. Fatal.
    #[error("configuration error: {0}")]
    Config(String),

    /// Exchange HTTP failure. Recoverable on the next call.
    #[error("upstream exchange error: {message} (status: {status:?})")]
    Upstream {
        message: String,
        status: Option<u16>,
    },

    /// JSON-RPC failure or disconnect. Logged, the cycle moves on.
    #[error("chain RPC error: {0}")]
    ChainRpc(String),

    /// `code_at(address)` returned empty bytecode at startup. Fatal.
    #[error("no contract code found at {0}")]
    ContractMissing(Address),

    /// `deadline <= now` when the Publisher inspected the attestation.
    #[error("signature for {secid} expired at {deadline} (now {now})")]
    SignatureExpired {
        secid: String,
        deadline: u64,
        now: u64,
    },

    /// Receipt status 0. Per-SECID, logged, cycle continues.
    #[error("transaction {tx_hash} reverted ({receipt})")]
    TxReverted {
        tx_hash: TxHash,
        receipt: ReceiptSummary,
    },

    /// Receipt not observed within the configured timeout.
    #[error("transaction {0} not confirmed before timeout")]
    TxTimeout(TxHash),

    /// Cache file unreadable; treated as absence, never propagated as an error
    /// to callers of `get()` — kept here only so the cache can log why.
    #[error("cache file corrupted: {0}")]
    CacheCorruption(String),
}

pub type Result<T> = std::result::Result<T, OracleError>;
