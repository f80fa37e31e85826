//! Orchestrates one price-update cycle: discover registered bonds,
//! fetch a signed price per SECID, compare against the on-chain value,
//! and submit a transaction when the deviation threshold is met.
//!
//! Ported from `PricePublisher.run_update_cycle` /
//! `process_single_price_update` in `publisher.py`. SECIDs are
//! processed sequentially, not concurrently: they share one account
//! nonce, and `TxService` relies on each transaction confirming (or
//! failing) before the next is built.

use alloy::primitives::{Address, U256};
use serde::Deserialize;

use crate::chain::ChainClient;
use crate::discovery::DiscoveryService;
use crate::error::Result;
use crate::tx_service::TxService;

#[derive(Debug, Deserialize)]
struct SignedPriceResponse {
    price: Option<SignedPrice>,
}

#[derive(Debug, Deserialize)]
struct SignedPrice {
    price_uint: String,
    signature: Option<String>,
    deadline: Option<u64>,
    nonce: Option<u64>,
}

pub struct PublishCycle<'a> {
    http: reqwest::Client,
    provider_base_url: String,
    chain: &'a ChainClient,
    tx_service: TxService<'a>,
    threshold_percent: rust_decimal::Decimal,
    requests_timeout: std::time::Duration,
}

impl<'a> PublishCycle<'a> {
    pub fn new(
        http: reqwest::Client,
        provider_base_url: String,
        chain: &'a ChainClient,
        tx_service: TxService<'a>,
        threshold_percent: rust_decimal::Decimal,
        requests_timeout: std::time::Duration,
    ) -> Self {
        PublishCycle {
            http,
            provider_base_url,
            chain,
            tx_service,
            threshold_percent,
            requests_timeout,
        }
    }

    async fn fetch_signed_price(&self, secid: &str) -> Result<Option<SignedPrice>> {
        let url = format!("{}/api/prices/{secid}?sign=true", self.provider_base_url);
        let response = tokio::time::timeout(self.requests_timeout, self.http.get(&url).send())
            .await
            .map_err(|_| crate::error::OracleError::Upstream {
                message: format!("request to {url} timed out"),
                status: None,
            })?
            .map_err(|e| crate::error::OracleError::Upstream {
                message: format!("request to {url} failed: {e}"),
                status: e.status().map(|s| s.as_u16()),
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(crate::error::OracleError::Upstream {
                message: format!("{url} returned {status}"),
                status: Some(status.as_u16()),
            });
        }
        let body: SignedPriceResponse =
            response.json().await.map_err(|e| crate::error::OracleError::Upstream {
                message: format!("{url} returned invalid JSON: {e}"),
                status: None,
            })?;
        Ok(body.price)
    }

    /// Whether `new_price` differs from `current_price` by at least the
    /// configured threshold. A zero on-chain price always updates (the
    /// feed has never been set); a non-zero price updates only once the
    /// absolute percentage change clears the threshold.
    fn should_update(&self, current_price: U256, new_price: U256) -> bool {
        if current_price.is_zero() {
            return true;
        }
        let current = rust_decimal::Decimal::from_str_exact(&current_price.to_string())
            .unwrap_or(rust_decimal::Decimal::ZERO);
        let new = rust_decimal::Decimal::from_str_exact(&new_price.to_string())
            .unwrap_or(rust_decimal::Decimal::ZERO);
        if current.is_zero() {
            return true;
        }
        let change_percent = ((new - current).abs() / current) * rust_decimal::Decimal::from(100);
        change_percent >= self.threshold_percent
    }

    /// Runs one update cycle and returns the number of SECIDs for which
    /// a transaction was submitted successfully.
    pub async fn run(&self) -> usize {
        let discovery = DiscoveryService::new(
            self.http.clone(),
            self.provider_base_url.clone(),
            self.chain,
        );
        let registered = match discovery.registered_secids().await {
            Ok(r) => r,
            Err(e) => {
                log::error!("discovery failed, aborting cycle: {e}");
                return 0;
            }
        };
        if registered.is_empty() {
            log::warn!("no registered bonds found; nothing to update this cycle");
            return 0;
        }

        log::info!("processing {} registered bonds", registered.len());
        let mut updated = 0;
        for (secid, bond_address) in registered {
            if self.process_one(&secid, bond_address).await {
                updated += 1;
            }
        }
        updated
    }

    async fn process_one(&self, secid: &str, bond_address: Address) -> bool {
        let signed = match self.fetch_signed_price(secid).await {
            Ok(Some(signed)) => signed,
            Ok(None) => {
                log::warn!("no signed price available for {secid}; skipping");
                return false;
            }
            Err(e) => {
                log::error!("failed to fetch signed price for {secid}: {e}");
                return false;
            }
        };

        let (Some(signature), Some(deadline), Some(nonce)) =
            (signed.signature, signed.deadline, signed.nonce)
        else {
            log::warn!("incomplete signed price payload for {secid}; skipping");
            return false;
        };

        let new_price: U256 = match signed.price_uint.parse() {
            Ok(p) => p,
            Err(e) => {
                log::error!("malformed price_uint for {secid}: {e}");
                return false;
            }
        };

        let current_price = match self.chain.price_feed(bond_address).await {
            Ok((price, ..)) => price,
            Err(e) => {
                log::error!("failed to read on-chain price for {secid}: {e}");
                return false;
            }
        };

        if !self.should_update(current_price, new_price) {
            log::info!("{secid}: price change below threshold, no update needed");
            return false;
        }

        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_secs();
        if deadline <= now {
            log::warn!("signature for {secid} expired at {deadline} (now {now}); skipping");
            return false;
        }

        match self
            .tx_service
            .send_update_price(secid, new_price, deadline, nonce, &signature)
            .await
        {
            Ok(_) => true,
            Err(e) => {
                log::error!("failed to submit price update for {secid}: {e}");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cycle_for_threshold(threshold_percent: &str) -> PublishCycleParts {
        PublishCycleParts {
            threshold_percent: rust_decimal::Decimal::from_str_exact(threshold_percent).unwrap(),
        }
    }

    /// `PublishCycle` needs a live `ChainClient`/`TxService` to construct,
    /// neither of which is mockable without a provider; `should_update`
    /// only touches plain values, so it is exercised through this
    /// threshold-only stand-in rather than the full struct.
    struct PublishCycleParts {
        threshold_percent: rust_decimal::Decimal,
    }

    impl PublishCycleParts {
        fn should_update(&self, current_price: U256, new_price: U256) -> bool {
            if current_price.is_zero() {
                return true;
            }
            let current = rust_decimal::Decimal::from_str_exact(&current_price.to_string())
                .unwrap_or(rust_decimal::Decimal::ZERO);
            let new = rust_decimal::Decimal::from_str_exact(&new_price.to_string())
                .unwrap_or(rust_decimal::Decimal::ZERO);
            if current.is_zero() {
                return true;
            }
            let change_percent =
                ((new - current).abs() / current) * rust_decimal::Decimal::from(100);
            change_percent >= self.threshold_percent
        }
    }

    #[test]
    fn zero_current_price_always_updates() {
        let cycle = cycle_for_threshold("0.5");
        assert!(cycle.should_update(U256::ZERO, U256::from(1_000_000u64)));
    }

    #[test]
    fn small_change_below_threshold_does_not_update() {
        let cycle = cycle_for_threshold("0.5");
        let current = U256::from(1_000_000u64);
        let new = U256::from(1_002_000u64); // 0.2% change
        assert!(!cycle.should_update(current, new));
    }

    #[test]
    fn change_at_threshold_updates() {
        let cycle = cycle_for_threshold("0.5");
        let current = U256::from(1_000_000u64);
        let new = U256::from(1_005_000u64); // exactly 0.5% change
        assert!(cycle.should_update(current, new));
    }

    #[test]
    fn large_drop_updates() {
        let cycle = cycle_for_threshold("0.5");
        let current = U256::from(1_000_000u64);
        let new = U256::from(900_000u64); // 10% drop
        assert!(cycle.should_update(current, new));
    }
}
