//! MOEX ISS HTTP client: instrument discovery, market quotes, daily
//! candles and bond description lookups.
//!
//! Mirrors the original service's `get_ofz_prices.py`, ported from
//! pandas `DataFrame` column indexing to typed `serde_json` responses.
//! MOEX's ISS API returns `{"block": {"columns": [...], "data": [[...]]}}`
//! for every endpoint used here; [`IssTable::row_map`] turns one row of
//! that shape into a `HashMap` keyed by column name so callers don't
//! repeat the columns/data zip at every call site.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{OracleError, Result};
use crate::types::{BondDetails, Instrument, Quote, SourceField};

#[derive(Debug, Deserialize)]
struct IssTable {
    columns: Vec<String>,
    data: Vec<Vec<Value>>,
}

impl IssTable {
    fn row_map(&self, row: usize) -> Option<HashMap<&str, &Value>> {
        let row = self.data.get(row)?;
        Some(
            self.columns
                .iter()
                .map(String::as_str)
                .zip(row.iter())
                .collect(),
        )
    }
}

fn value_as_decimal(v: &Value) -> Option<rust_decimal::Decimal> {
    match v {
        Value::Number(n) => n
            .as_f64()
            .and_then(|f| rust_decimal::Decimal::try_from(f).ok()),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn value_as_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

/// Source of OFZ instrument lists, market quotes and bond descriptions.
///
/// Abstracted behind a trait so `PriceResolver` and the HTTP handlers can
/// be exercised in tests against a fixture client instead of the live
/// MOEX endpoint.
#[async_trait]
pub trait ExchangeClient: Send + Sync {
    /// All actively traded OFZ instruments on board TQOB.
    async fn fetch_ofz_list(&self) -> Result<Vec<Instrument>>;

    /// Current market quote for one instrument, in priority-field order.
    /// Returns `Ok(None)` when no current market field is populated —
    /// callers fall back to [`ExchangeClient::latest_daily_close`].
    async fn market_quote(&self, secid: &str) -> Result<Option<Quote>>;

    /// Most recent daily candle close over the last 7 days, as a
    /// percent-of-face quote tagged [`SourceField::Candle`].
    async fn latest_daily_close(&self, secid: &str) -> Result<Option<Quote>>;

    /// Static descriptive metadata for one bond issue.
    async fn bond_details(&self, secid: &str) -> Result<BondDetails>;
}

/// Live `ExchangeClient` backed by the MOEX ISS REST API.
pub struct MoexClient {
    http: reqwest::Client,
    base_url: String,
    securities_base: String,
}

impl MoexClient {
    pub fn new(base_url: String, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent("ofz-price-bot/1.0")
            .timeout(timeout)
            .build()
            .map_err(|e| OracleError::Upstream {
                message: format!("failed to build HTTP client: {e}"),
                status: None,
            })?;
        Ok(MoexClient {
            http,
            base_url,
            securities_base: "https://iss.moex.com/iss/securities".to_string(),
        })
    }

    async fn get_json(&self, url: String) -> Result<Value> {
        let response = self.http.get(&url).send().await.map_err(|e| OracleError::Upstream {
            message: format!("request to {url} failed: {e}"),
            status: e.status().map(|s| s.as_u16()),
        })?;
        let status = response.status();
        if !status.is_success() {
            return Err(OracleError::Upstream {
                message: format!("{url} returned {status}"),
                status: Some(status.as_u16()),
            });
        }
        response.json().await.map_err(|e| OracleError::Upstream {
            message: format!("{url} returned invalid JSON: {e}"),
            status: None,
        })
    }
}

#[async_trait]
impl ExchangeClient for MoexClient {
    async fn fetch_ofz_list(&self) -> Result<Vec<Instrument>> {
        let url = format!(
            "{}/boards/TQOB/securities.json?iss.meta=off&limit=10000",
            self.base_url
        );
        let body = self.get_json(url).await?;
        let securities: IssTable = serde_json::from_value(
            body.get("securities")
                .cloned()
                .ok_or_else(|| OracleError::Upstream {
                    message: "missing 'securities' block in MOEX response".to_string(),
                    status: None,
                })?,
        )
        .map_err(|e| OracleError::Upstream {
            message: format!("malformed securities table: {e}"),
            status: None,
        })?;

        let sectype_idx = securities
            .columns
            .iter()
            .position(|c| c == "SECTYPE");
        let status_idx = securities.columns.iter().position(|c| c == "STATUS");
        let secid_idx = securities
            .columns
            .iter()
            .position(|c| c == "SECID")
            .ok_or_else(|| OracleError::Upstream {
                message: "SECID column missing from securities table".to_string(),
                status: None,
            })?;
        let shortname_idx = securities
            .columns
            .iter()
            .position(|c| c == "SHORTNAME")
            .ok_or_else(|| OracleError::Upstream {
                message: "SHORTNAME column missing from securities table".to_string(),
                status: None,
            })?;

        let mut out = Vec::new();
        for row in &securities.data {
            let is_ofz = sectype_idx
                .map(|i| row.get(i).and_then(Value::as_str) == Some("3"))
                .unwrap_or(true);
            let is_active = status_idx
                .map(|i| row.get(i).and_then(Value::as_str) == Some("A"))
                .unwrap_or(true);
            if !is_ofz || !is_active {
                continue;
            }
            let secid = row.get(secid_idx).and_then(Value::as_str);
            let shortname = row.get(shortname_idx).and_then(Value::as_str);
            if let (Some(secid), Some(shortname)) = (secid, shortname) {
                out.push(Instrument {
                    secid: secid.to_string(),
                    shortname: shortname.to_string(),
                });
            }
        }
        Ok(out)
    }

    async fn market_quote(&self, secid: &str) -> Result<Option<Quote>> {
        let url = format!(
            "{}/securities/{secid}.json?iss.only=marketdata&iss.meta=off",
            self.base_url
        );
        let body = self.get_json(url).await?;
        let table: IssTable = serde_json::from_value(
            body.get("marketdata")
                .cloned()
                .ok_or_else(|| OracleError::Upstream {
                    message: "missing 'marketdata' block in MOEX response".to_string(),
                    status: None,
                })?,
        )
        .map_err(|e| OracleError::Upstream {
            message: format!("malformed marketdata table: {e}"),
            status: None,
        })?;
        let Some(row) = table.row_map(0) else {
            return Ok(None);
        };

        for field in SourceField::PRIORITY {
            if let Some(price) = row.get(field.moex_column()).and_then(|v| value_as_decimal(v)) {
                return Ok(Some(Quote {
                    price_percent: price,
                    source_field: field,
                }));
            }
        }
        Ok(None)
    }

    async fn latest_daily_close(&self, secid: &str) -> Result<Option<Quote>> {
        let today = chrono::Utc::now().date_naive();
        let week_ago = today - chrono::Duration::days(7);
        let url = format!(
            "{}/boards/TQOB/securities/{secid}/candles.json?interval=24&from={week_ago}&to={today}&iss.meta=off",
            self.base_url
        );
        let body = self.get_json(url).await?;
        let table: IssTable = serde_json::from_value(
            body.get("candles")
                .cloned()
                .ok_or_else(|| OracleError::Upstream {
                    message: "missing 'candles' block in MOEX response".to_string(),
                    status: None,
                })?,
        )
        .map_err(|e| OracleError::Upstream {
            message: format!("malformed candles table: {e}"),
            status: None,
        })?;
        let close_idx = table.columns.iter().position(|c| c == "close");
        let Some(close_idx) = close_idx else {
            return Ok(None);
        };
        let Some(last_row) = table.data.last() else {
            return Ok(None);
        };
        let Some(close) = last_row.get(close_idx).and_then(value_as_decimal) else {
            return Ok(None);
        };
        Ok(Some(Quote {
            price_percent: close,
            source_field: SourceField::Candle,
        }))
    }

    async fn bond_details(&self, secid: &str) -> Result<BondDetails> {
        let url = format!(
            "{}/{secid}.json?iss.only=securities,description&iss.meta=off",
            self.securities_base
        );
        let body = self.get_json(url).await?;
        let mut details = BondDetails::default();

        if let Some(description) = body.get("description") {
            if let Ok(table) = serde_json::from_value::<IssTable>(description.clone()) {
                let name_idx = table.columns.iter().position(|c| c == "name");
                let value_idx = table.columns.iter().position(|c| c == "value");
                if let (Some(name_idx), Some(value_idx)) = (name_idx, value_idx) {
                    let mut fields: HashMap<&str, &Value> = HashMap::new();
                    for row in &table.data {
                        if let Some(name) = row.get(name_idx).and_then(Value::as_str) {
                            if let Some(value) = row.get(value_idx) {
                                fields.insert(name, value);
                            }
                        }
                    }
                    details.initial_price = fields.get("INITIALFACEVALUE").and_then(|v| value_as_decimal(v));
                    details.maturity_price = fields.get("FACEVALUE").and_then(|v| value_as_decimal(v));
                    details.maturity_at = fields.get("MATDATE").and_then(|v| value_as_string(v));
                    details.issue_date = fields.get("ISSUEDATE").and_then(|v| value_as_string(v));
                    details.face_unit = fields.get("FACEUNIT").and_then(|v| value_as_string(v));
                    details.coupon_value = fields.get("COUPONVALUE").and_then(|v| value_as_decimal(v));
                    details.coupon_percent = fields.get("COUPONPERCENT").and_then(|v| value_as_decimal(v));
                    details.next_coupon = fields.get("NEXTCOUPON").and_then(|v| value_as_string(v));
                    details.accrued_int = fields.get("ACCRUEDINT").and_then(|v| value_as_decimal(v));
                    details.security_type = fields.get("SECNAME").and_then(|v| value_as_string(v));
                    details.issue_size = fields.get("ISSUESIZE").and_then(|v| value_as_decimal(v));
                    details.isin = fields.get("ISIN").and_then(|v| value_as_string(v));
                    details.reg_number = fields.get("REGNUMBER").and_then(|v| value_as_string(v));

                    if let Some(period) = fields.get("COUPONPERIOD").and_then(|v| value_as_decimal(v)) {
                        if !period.is_zero() {
                            let per_year = rust_decimal::Decimal::from(365) / period;
                            details.coupon_frequency = rust_decimal::prelude::ToPrimitive::to_u32(&per_year.round());
                        }
                    }
                }
            }
        }

        if let Some(securities) = body.get("securities") {
            if let Ok(table) = serde_json::from_value::<IssTable>(securities.clone()) {
                if let Some(row) = table.row_map(0) {
                    if details.maturity_price.is_none() {
                        details.maturity_price =
                            row.get("FACEVALUE").and_then(|v| value_as_decimal(v));
                    }
                    if details.maturity_at.is_none() {
                        details.maturity_at = row.get("MATDATE").and_then(|v| value_as_string(v));
                    }
                    if details.coupon_value.is_none() {
                        details.coupon_value =
                            row.get("COUPONVALUE").and_then(|v| value_as_decimal(v));
                    }
                    if details.coupon_percent.is_none() {
                        details.coupon_percent =
                            row.get("COUPONPERCENT").and_then(|v| value_as_decimal(v));
                    }
                    if details.next_coupon.is_none() {
                        details.next_coupon = row.get("NEXTCOUPON").and_then(|v| value_as_string(v));
                    }
                }
            }
        }

        if details.initial_price.is_none() {
            details.initial_price = details.maturity_price;
        }

        Ok(details)
    }
}
