//! Resolves the best available quote for an instrument: live market
//! data first, the most recent daily candle close as a fallback.
//!
//! Grounded on `get_price_detailed` in the original service: try the
//! market-data fields in priority order, and only reach for `candles.json`
//! once every market field on the instrument is empty.

use std::sync::Arc;

use crate::error::Result;
use crate::exchange::ExchangeClient;
use crate::types::Quote;

pub struct PriceResolver {
    exchange: Arc<dyn ExchangeClient>,
}

impl PriceResolver {
    pub fn new(exchange: Arc<dyn ExchangeClient>) -> Self {
        PriceResolver { exchange }
    }

    /// Resolves the best quote for `secid`, or `Ok(None)` when neither
    /// live market data nor a recent candle is available.
    pub async fn resolve(&self, secid: &str) -> Result<Option<Quote>> {
        if let Some(quote) = self.exchange.market_quote(secid).await? {
            return Ok(Some(quote));
        }
        self.exchange.latest_daily_close(secid).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BondDetails, Instrument, SourceField};
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeExchange {
        market: Mutex<Option<Quote>>,
        candle: Mutex<Option<Quote>>,
    }

    #[async_trait]
    impl ExchangeClient for FakeExchange {
        async fn fetch_ofz_list(&self) -> Result<Vec<Instrument>> {
            Ok(vec![])
        }
        async fn market_quote(&self, _secid: &str) -> Result<Option<Quote>> {
            Ok(*self.market.lock().unwrap())
        }
        async fn latest_daily_close(&self, _secid: &str) -> Result<Option<Quote>> {
            Ok(*self.candle.lock().unwrap())
        }
        async fn bond_details(&self, _secid: &str) -> Result<BondDetails> {
            Ok(BondDetails::default())
        }
    }

    #[tokio::test]
    async fn prefers_market_quote_over_candle() {
        let exchange = FakeExchange {
            market: Mutex::new(Some(Quote {
                price_percent: "99.5".parse().unwrap(),
                source_field: SourceField::Last,
            })),
            candle: Mutex::new(Some(Quote {
                price_percent: "90.0".parse().unwrap(),
                source_field: SourceField::Candle,
            })),
        };
        let resolver = PriceResolver::new(Arc::new(exchange));
        let quote = resolver.resolve("SU26207RMFS9").await.unwrap().unwrap();
        assert_eq!(quote.source_field, SourceField::Last);
        assert!(quote.is_current());
    }

    #[tokio::test]
    async fn falls_back_to_candle_when_no_market_data() {
        let exchange = FakeExchange {
            market: Mutex::new(None),
            candle: Mutex::new(Some(Quote {
                price_percent: "90.0".parse().unwrap(),
                source_field: SourceField::Candle,
            })),
        };
        let resolver = PriceResolver::new(Arc::new(exchange));
        let quote = resolver.resolve("SU26207RMFS9").await.unwrap().unwrap();
        assert_eq!(quote.source_field, SourceField::Candle);
        assert!(!quote.is_current());
    }

    #[tokio::test]
    async fn returns_none_when_nothing_is_available() {
        let exchange = FakeExchange::default();
        let resolver = PriceResolver::new(Arc::new(exchange));
        assert!(resolver.resolve("SU26207RMFS9").await.unwrap().is_none());
    }
}
