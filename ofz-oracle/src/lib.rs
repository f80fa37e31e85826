//! # ofz-oracle
//!
//! Shared library behind the OFZ (Russian federal bond) price oracle
//! bridge: a signed-price HTTP provider and an on-chain publisher built
//! around one `BondOracle` contract.
//!
//! - [`exchange`] and [`resolver`] fetch and prioritise quotes from the
//!   MOEX ISS API.
//! - [`scaling`] converts MOEX's percent-of-par prices into the
//!   contract's fixed-point representation.
//! - [`signing`] produces the EIP-712 `PriceUpdate` attestation the
//!   Provider hands out and the Publisher submits on-chain.
//! - [`cache`] and [`nonce`] hold the Provider's on-disk state: cached
//!   quotes, the registered-bonds list, and the monotonic nonce.
//! - [`abi`] and [`chain`] connect to the EVM and call `BondOracle`.
//! - [`discovery`], [`tx_service`], and [`publish_cycle`] make up the
//!   Publisher's update loop.
//! - [`config`] and [`error`] are the ambient layers both binaries share.

pub mod abi;
pub mod cache;
pub mod chain;
pub mod config;
pub mod discovery;
pub mod error;
pub mod exchange;
pub mod nonce;
pub mod publish_cycle;
pub mod resolver;
pub mod scaling;
pub mod signing;
pub mod tx_service;
pub mod types;

pub use error::{OracleError, Result};
