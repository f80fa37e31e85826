//! Core data model: instruments, quotes, scaled prices and the structures
//! that cross the Provider/Publisher boundary as JSON.
//!
//! Field names match the original MOEX-backed service's JSON shapes
//! (`price_uint`, `is_current_market_data`, `data_source`, ...) so existing
//! consumers of the HTTP surface keep working.

use std::collections::HashMap;

use alloy::primitives::U256;
use serde::{Deserialize, Serialize};

/// The exchange field a quote was taken from, in priority order.
///
/// The order here is load-bearing: it becomes a publicly observable
/// source attribution once it appears in `/api/prices` responses, so it
/// must never be reordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceField {
    MarketPrice,
    Last,
    LClosePrice,
    WaPrice,
    PrevWaPrice,
    ClosePrice,
    /// Fallback: most recent daily candle close, not live market data.
    Candle,
}

impl SourceField {
    /// Market-data field names, in the fixed priority order §4.2 fixes.
    pub const PRIORITY: [SourceField; 6] = [
        SourceField::MarketPrice,
        SourceField::Last,
        SourceField::LClosePrice,
        SourceField::WaPrice,
        SourceField::PrevWaPrice,
        SourceField::ClosePrice,
    ];

    /// The MOEX marketdata column name for this field.
    pub fn moex_column(self) -> &'static str {
        match self {
            SourceField::MarketPrice => "MARKETPRICE",
            SourceField::Last => "LAST",
            SourceField::LClosePrice => "LCLOSEPRICE",
            SourceField::WaPrice => "WAPRICE",
            SourceField::PrevWaPrice => "PREVWAPRICE",
            SourceField::ClosePrice => "CLOSEPRICE",
            SourceField::Candle => "candle",
        }
    }

    pub fn is_current(self) -> bool {
        !matches!(self, SourceField::Candle)
    }

    /// The `data_source` string the HTTP surface reports.
    pub fn data_source_label(self) -> &'static str {
        if self.is_current() {
            "market_price"
        } else {
            "daily_candle"
        }
    }
}

/// A resolved quote for one instrument: its price as a percentage of
/// face value, which field it came from, and whether that field reflects
/// live trading.
#[derive(Debug, Clone, Copy)]
pub struct Quote {
    pub price_percent: rust_decimal::Decimal,
    pub source_field: SourceField,
}

impl Quote {
    pub fn is_current(&self) -> bool {
        self.source_field.is_current()
    }
}

/// One OFZ instrument as returned by the exchange's instrument list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instrument {
    pub secid: String,
    pub shortname: String,
}

/// Static descriptive metadata for one bond issue. Every field is optional
/// because the upstream exchange may not have it for a given instrument.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BondDetails {
    /// MOEX `INITIALFACEVALUE`.
    pub initial_price: Option<rust_decimal::Decimal>,
    /// MOEX `FACEVALUE`.
    pub maturity_price: Option<rust_decimal::Decimal>,
    /// MOEX `MATDATE`.
    pub maturity_at: Option<String>,
    /// MOEX `ISSUEDATE`.
    pub issue_date: Option<String>,
    /// MOEX `FACEUNIT`.
    pub face_unit: Option<String>,
    /// MOEX `COUPONVALUE`.
    pub coupon_value: Option<rust_decimal::Decimal>,
    /// MOEX `COUPONPERCENT`.
    pub coupon_percent: Option<rust_decimal::Decimal>,
    /// MOEX `NEXTCOUPON`.
    pub next_coupon: Option<String>,
    /// MOEX `COUPONFREQUENCY`, derived from `COUPONPERIOD` (days) when absent.
    pub coupon_frequency: Option<u32>,
    /// MOEX `ACCRUEDINT`.
    pub accrued_int: Option<rust_decimal::Decimal>,
    /// MOEX `SECNAME`.
    pub security_type: Option<String>,
    /// MOEX `ISSUESIZE`.
    pub issue_size: Option<rust_decimal::Decimal>,
    pub isin: Option<String>,
    pub reg_number: Option<String>,
}

/// One priced entry as it appears inside a `PriceSnapshot`, optionally
/// carrying a signed attestation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceEntry {
    pub price: rust_decimal::Decimal,
    pub price_uint: String,
    pub is_current_market_data: bool,
    pub data_source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<u64>,
}

impl PriceEntry {
    /// Returns a copy with `signature`/`nonce`/`deadline` stripped, used to
    /// serve unsigned requests from a cache entry that does carry them
    /// (spec §4.5, §4.7 signature visibility rule).
    pub fn without_signature(&self) -> PriceEntry {
        PriceEntry {
            signature: None,
            nonce: None,
            deadline: None,
            ..self.clone()
        }
    }
}

/// The full price snapshot persisted by `PriceCache`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceSnapshot {
    pub timestamp: u64,
    pub prices: HashMap<String, PriceEntry>,
}

/// Persisted nonce counter, `{"nonce": N}` on disk.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct NonceRecord {
    pub nonce: u64,
}

/// A fully signed price update, ready to be handed to `TxService` or
/// returned from the HTTP surface. Never persisted.
#[derive(Debug, Clone)]
pub struct SignedAttestation {
    pub secid: String,
    pub price_uint: U256,
    pub nonce: u64,
    pub deadline: u64,
    /// `0x`-prefixed hex of `abi.encode(bytes32 r, bytes32 s, uint8 v)`.
    pub signature: String,
}
