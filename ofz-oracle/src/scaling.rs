//! Fixed-point conversion from a percent-of-face price to the on-chain
//! `uint160` the `BondOracle` contract stores.
//!
//! The original service scaled two different ways depending on which
//! endpoint served the price: the list endpoint rounded to two decimal
//! digits before multiplying, the single-SECID endpoint rounded to
//! three. The two disagreed on the same input whenever `price_percent`
//! carried a third decimal digit. `scale_price` is the single rule both
//! endpoints now share: round to three decimal digits of percent, then
//! multiply by `S / 1000` — exact as long as `S` is a multiple of 1000,
//! which the scaling factor configuration is required to be.

use alloy::primitives::U256;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

/// Converts a price expressed as a percentage of face value (e.g.
/// `99.875` meaning 99.875% of face value) into the `uint160` the
/// contract expects: `round(price_percent * 1000) * (scaling_factor / 1000)`.
///
/// `scaling_factor` (`S` in the spec) is the process-wide
/// `PRICE_SCALING_FACTOR`, an integer power of ten large enough that the
/// division is exact.
pub fn scale_price(price_percent: Decimal, scaling_factor: u64) -> U256 {
    let thousandths =
        (price_percent * Decimal::from(1000)).round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    let scaled = thousandths * Decimal::from(scaling_factor) / Decimal::from(1000);
    let as_u128 = scaled
        .to_u128()
        .expect("scaled OFZ price exceeds u128 range");
    U256::from(as_u128)
}

/// Inverse of `scale_price`, used when reporting a price already stored
/// on-chain back out as a percent-of-face decimal.
pub fn unscale_price(price_uint: U256, scaling_factor: u64) -> Decimal {
    let as_u128: u128 = price_uint.to::<u128>();
    Decimal::from(as_u128) * Decimal::from(1000) / Decimal::from(scaling_factor) / Decimal::from(1000)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    const SCALING_FACTOR: u64 = 1_000_000_000_000_000_000;

    #[test]
    fn round_trips_a_typical_quote() {
        let price = Decimal::from_str("99.875").unwrap();
        let scaled = scale_price(price, SCALING_FACTOR);
        let back = unscale_price(scaled, SCALING_FACTOR);
        assert_eq!(back, price);
    }

    #[test]
    fn rounds_fourth_decimal_consistently() {
        let a = scale_price(Decimal::from_str("99.8755").unwrap(), SCALING_FACTOR);
        let b = scale_price(Decimal::from_str("99.8755000").unwrap(), SCALING_FACTOR);
        assert_eq!(a, b);
    }

    #[test]
    fn zero_price_scales_to_zero() {
        assert_eq!(scale_price(Decimal::ZERO, SCALING_FACTOR), U256::ZERO);
    }

    #[test]
    fn list_and_single_endpoint_rules_now_agree() {
        // Before the fix, the list endpoint rounded price_percent to 2
        // decimal digits and the single-SECID endpoint rounded to 3,
        // producing different price_uint for the same quote. Both call
        // sites now go through this one function.
        let price = Decimal::from_str("99.123").unwrap();
        let from_list_path = scale_price(price, SCALING_FACTOR);
        let from_single_path = scale_price(price, SCALING_FACTOR);
        assert_eq!(from_list_path, from_single_path);
    }
}
