//! Intersects the Provider's known bond list with the subset actually
//! registered in `BondOracle`.
//!
//! Ported from `ContractService.get_all_registered_secids`: there is no
//! view function enumerating every registered SECID, so discovery
//! fetches the Provider's candidate list and probes each one with
//! `secidToBond`, keeping only the SECIDs that resolve to a non-zero
//! bond address.

use alloy::primitives::Address;
use serde::Deserialize;

use crate::chain::ChainClient;
use crate::error::{OracleError, Result};

#[derive(Debug, Deserialize)]
struct BondsResponse {
    bonds: Vec<BondListing>,
}

#[derive(Debug, Deserialize)]
struct BondListing {
    secid: String,
}

pub struct DiscoveryService<'a> {
    http: reqwest::Client,
    provider_base_url: String,
    chain: &'a ChainClient,
}

impl<'a> DiscoveryService<'a> {
    pub fn new(http: reqwest::Client, provider_base_url: String, chain: &'a ChainClient) -> Self {
        DiscoveryService {
            http,
            provider_base_url,
            chain,
        }
    }

    /// Candidate SECIDs the Provider currently knows about.
    async fn fetch_candidates(&self) -> Result<Vec<String>> {
        let url = format!("{}/api/bonds", self.provider_base_url);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| OracleError::Upstream {
                message: format!("fetching {url} failed: {e}"),
                status: e.status().map(|s| s.as_u16()),
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(OracleError::Upstream {
                message: format!("{url} returned {status}"),
                status: Some(status.as_u16()),
            });
        }
        let body: BondsResponse = response.json().await.map_err(|e| OracleError::Upstream {
            message: format!("{url} returned invalid JSON: {e}"),
            status: None,
        })?;
        Ok(body.bonds.into_iter().map(|b| b.secid).collect())
    }

    /// Returns the SECIDs that are both known to the Provider and
    /// registered on-chain, paired with their bond contract address.
    ///
    /// A candidate lookup failure is logged and the candidate is
    /// dropped rather than aborting discovery for the whole set —
    /// matching the Python version's `continue`-on-error loop.
    pub async fn registered_secids(&self) -> Result<Vec<(String, Address)>> {
        let candidates = self.fetch_candidates().await?;
        let mut registered = Vec::new();
        for secid in candidates {
            match self.chain.secid_to_bond(&secid).await {
                Ok(bond) if bond != Address::ZERO => registered.push((secid, bond)),
                Ok(_) => {}
                Err(e) => {
                    log::error!("failed to probe secidToBond for {secid}: {e}");
                }
            }
        }
        Ok(registered)
    }
}
