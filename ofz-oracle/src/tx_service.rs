//! Builds, signs (via the chain client's wallet filler), sends, and
//! awaits a single `updatePriceFeedWithSignature` transaction.
//!
//! Ported from `TransactionService._send_transaction` in `publisher.py`.

use std::time::Duration;

use alloy::primitives::{TxHash, U256};

use crate::chain::ChainClient;
use crate::error::{OracleError, Result};

pub struct TxService<'a> {
    chain: &'a ChainClient,
    gas_limit: u64,
    receipt_timeout: Duration,
}

impl<'a> TxService<'a> {
    pub fn new(chain: &'a ChainClient, gas_limit: u64, receipt_timeout: Duration) -> Self {
        TxService {
            chain,
            gas_limit,
            receipt_timeout,
        }
    }

    /// Decodes a `0x`-prefixed hex signature string into raw bytes.
    fn decode_signature(secid: &str, signature_hex: &str) -> Result<Vec<u8>> {
        let trimmed = signature_hex.strip_prefix("0x").unwrap_or(signature_hex);
        alloy::primitives::hex::decode(trimmed)
            .map_err(|e| OracleError::Config(format!("invalid signature hex for {secid}: {e}")))
    }

    /// Sends a signed price update and waits for confirmation.
    pub async fn send_update_price(
        &self,
        secid: &str,
        price_uint: U256,
        deadline: u64,
        nonce: u64,
        signature_hex: &str,
    ) -> Result<TxHash> {
        let signature = Self::decode_signature(secid, signature_hex)?;
        log::info!(
            "submitting price update for {secid}: price={price_uint}, deadline={deadline}, nonce={nonce}"
        );
        let tx_hash = self
            .chain
            .update_price_feed_with_signature(
                secid,
                price_uint,
                deadline,
                nonce,
                signature,
                self.gas_limit,
                self.receipt_timeout,
            )
            .await?;
        log::info!("price update for {secid} confirmed in tx {tx_hash}");
        Ok(tx_hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_0x_prefixed_signature() {
        let bytes = TxService::decode_signature("SU26207RMFS9", "0x0011ff").unwrap();
        assert_eq!(bytes, vec![0x00, 0x11, 0xff]);
    }

    #[test]
    fn decodes_unprefixed_signature() {
        let bytes = TxService::decode_signature("SU26207RMFS9", "0011ff").unwrap();
        assert_eq!(bytes, vec![0x00, 0x11, 0xff]);
    }

    #[test]
    fn rejects_invalid_hex() {
        assert!(TxService::decode_signature("SU26207RMFS9", "not-hex").is_err());
    }
}
