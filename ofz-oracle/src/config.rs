//! Environment-driven configuration for both binaries.
//!
//! Every variable is read with `std::env::var`, after an optional
//! `.env` load performed by the binary's `main`. Parsing failures and
//! missing required variables are collected into a single
//! [`OracleError::Config`] so a misconfigured deployment fails fast with
//! one readable message instead of panicking on the first missing key.

use alloy::primitives::Address;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{OracleError, Result};

fn env_var(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| OracleError::Config(format!("{key} is not set")))
}

fn env_parse<T: FromStr>(key: &str) -> Result<T> {
    let raw = env_var(key)?;
    raw.parse::<T>()
        .map_err(|_| OracleError::Config(format!("{key} is not a valid value: {raw:?}")))
}

fn env_var_opt(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Configuration for `ofz-provider`, the signing HTTP front-end.
///
/// Prefix: `OFFCHAIN_PROVIDER_*`, matching the upstream service's
/// environment so existing deployment tooling can be reused unchanged.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub host: String,
    pub port: u16,
    pub debug: bool,

    pub cache_ttl: Duration,
    pub cache_dir: std::path::PathBuf,
    /// TTL for the separate registered-bonds list cache, kept short-lived
    /// independently of the price cache.
    pub registered_bonds_cache_ttl: Duration,

    pub moex_api_base: String,
    pub moex_api_timeout: Duration,

    pub price_scaling_factor: u64,
    pub bond_oracle_address: Address,
    pub chain_id: u64,
    pub signature_expiry: Duration,
    pub nonce_file: std::path::PathBuf,
    pub eth_rpc_url: String,
    pub eth_private_key: String,
}

impl ProviderConfig {
    pub fn from_env() -> Result<Self> {
        let cfg = ProviderConfig {
            host: env_var("OFFCHAIN_PROVIDER_HOST")?,
            port: env_parse("OFFCHAIN_PROVIDER_PORT")?,
            debug: env_var_opt("OFFCHAIN_PROVIDER_DEBUG")
                .map(|v| v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),

            cache_ttl: Duration::from_secs(env_parse("OFFCHAIN_PROVIDER_CACHE_TTL")?),
            cache_dir: env_var("OFFCHAIN_PROVIDER_CACHE_DIR")?.into(),
            registered_bonds_cache_ttl: Duration::from_secs(300),

            moex_api_base: "https://iss.moex.com/iss/engines/stock/markets/bonds".to_string(),
            moex_api_timeout: Duration::from_secs(15),

            price_scaling_factor: env_parse("OFFCHAIN_PROVIDER_PRICE_SCALING_FACTOR")?,
            bond_oracle_address: {
                let raw = env_var("OFFCHAIN_PROVIDER_BOND_ORACLE_ADDRESS")?;
                Address::from_str(&raw).map_err(|e| {
                    OracleError::Config(format!("invalid OFFCHAIN_PROVIDER_BOND_ORACLE_ADDRESS: {e}"))
                })?
            },
            chain_id: env_parse("OFFCHAIN_PROVIDER_CHAIN_ID")?,
            signature_expiry: Duration::from_secs(env_parse(
                "OFFCHAIN_PROVIDER_SIGNATURE_EXPIRY_SECONDS",
            )?),
            nonce_file: env_var("OFFCHAIN_PROVIDER_NONCE_FILE")?.into(),
            eth_rpc_url: env_var("OFFCHAIN_PROVIDER_ETH_RPC_URL")?,
            eth_private_key: {
                let raw = env_var("OFFCHAIN_PROVIDER_ETH_PRIVATE_KEY")?;
                raw.strip_prefix("0x").unwrap_or(&raw).to_string()
            },
        };
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<()> {
        if self.eth_private_key.len() != 64
            || alloy::primitives::hex::decode(&self.eth_private_key).is_err()
        {
            return Err(OracleError::Config(
                "OFFCHAIN_PROVIDER_ETH_PRIVATE_KEY must be 64 hex characters".to_string(),
            ));
        }
        if self.price_scaling_factor == 0 {
            return Err(OracleError::Config(
                "OFFCHAIN_PROVIDER_PRICE_SCALING_FACTOR must be nonzero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration for `ofz-publisher`, the on-chain submission loop.
///
/// Prefix: `ONCHAIN_PUBLISHER_*`.
#[derive(Debug, Clone)]
pub struct PublisherConfig {
    pub offchain_provider_base_url: String,
    pub bond_oracle_address: Address,
    pub ethereum_rpc_url: String,
    pub publisher_private_key: String,
    /// `None` lets the signer middleware fetch the chain id from the RPC
    /// endpoint, matching the Python service treating this field as
    /// optional.
    pub chain_id: Option<u64>,

    pub poll_interval: Duration,
    /// How late a scheduled update cycle may fire and still run, matching
    /// APScheduler's `misfire_grace_time`; a tick later than this is
    /// skipped instead of run late.
    pub scheduler_misfire_grace_time: Duration,
    pub price_change_threshold_percent: rust_decimal::Decimal,
    pub bond_oracle_abi_path: std::path::PathBuf,
    pub log_level: String,

    pub gas_limit_update_price: u64,
    pub tx_receipt_timeout: Duration,
    pub requests_timeout: Duration,
}

impl PublisherConfig {
    pub fn from_env() -> Result<Self> {
        let cfg = PublisherConfig {
            offchain_provider_base_url: env_var("ONCHAIN_PUBLISHER_OFFCHAIN_PROVIDER_BASE_URL")?,
            bond_oracle_address: {
                let raw = env_var("ONCHAIN_PUBLISHER_BOND_ORACLE_ADDRESS")?;
                Address::from_str(&raw).map_err(|e| {
                    OracleError::Config(format!(
                        "invalid ONCHAIN_PUBLISHER_BOND_ORACLE_ADDRESS: {e}"
                    ))
                })?
            },
            ethereum_rpc_url: env_var("ONCHAIN_PUBLISHER_ETHEREUM_RPC_URL")?,
            publisher_private_key: {
                let raw = env_var("ONCHAIN_PUBLISHER_PRIVATE_KEY")?;
                raw.strip_prefix("0x").unwrap_or(&raw).to_string()
            },
            chain_id: env_var_opt("ONCHAIN_PUBLISHER_CHAIN_ID")
                .map(|v| {
                    v.parse::<u64>().map_err(|_| {
                        OracleError::Config(
                            "ONCHAIN_PUBLISHER_CHAIN_ID must be an integer if provided".to_string(),
                        )
                    })
                })
                .transpose()?,

            poll_interval: Duration::from_secs(env_parse("ONCHAIN_PUBLISHER_POLL_INTERVAL_SECONDS")?),
            scheduler_misfire_grace_time: Duration::from_secs(env_parse(
                "ONCHAIN_PUBLISHER_SCHEDULER_MISFIRE_GRACE_TIME",
            )?),
            price_change_threshold_percent: env_parse(
                "ONCHAIN_PUBLISHER_PRICE_CHANGE_THRESHOLD_PERCENT",
            )?,
            bond_oracle_abi_path: env_var("ONCHAIN_PUBLISHER_BOND_ORACLE_ABI_PATH")?.into(),
            log_level: env_var("ONCHAIN_PUBLISHER_LOG_LEVEL")?.to_uppercase(),

            gas_limit_update_price: env_parse("ONCHAIN_PUBLISHER_GAS_LIMIT_UPDATE_PRICE")?,
            tx_receipt_timeout: Duration::from_secs(env_parse(
                "ONCHAIN_PUBLISHER_TX_RECEIPT_TIMEOUT_SECONDS",
            )?),
            requests_timeout: Duration::from_secs(env_parse(
                "ONCHAIN_PUBLISHER_REQUESTS_TIMEOUT_SECONDS",
            )?),
        };
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<()> {
        if self.publisher_private_key.len() != 64
            || alloy::primitives::hex::decode(&self.publisher_private_key).is_err()
        {
            return Err(OracleError::Config(
                "ONCHAIN_PUBLISHER_PRIVATE_KEY must be 64 hex characters".to_string(),
            ));
        }
        Ok(())
    }
}
