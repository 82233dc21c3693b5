//! Fee arithmetic.
//!
//! Trade fees are `proceeds × rate`, truncated toward zero to
//! [`FEE_PRECISION`] decimal places, in the denomination the order
//! receives. The settlement fee is a flat amount in the fee denomination,
//! fixed per order when it is placed.

use blockmatch_types::constants::FEE_PRECISION;
use blockmatch_types::{Coin, Order, Params, Result};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Trade fee on `proceeds` at `rate`.
///
/// `rate` is validated to `[0, 1)`, so the product never exceeds `proceeds`.
#[must_use]
pub fn trade_fee(proceeds: Decimal, rate: Decimal) -> Decimal {
    (proceeds * rate).round_dp_with_strategy(FEE_PRECISION, RoundingStrategy::ToZero)
}

/// Fees in force for one block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSchedule {
    pub trade_fee_rate: Decimal,
    pub settlement_fee: Coin,
}

impl FeeSchedule {
    #[must_use]
    pub fn from_params(params: &Params) -> Self {
        Self {
            trade_fee_rate: params.trade_fee_rate,
            settlement_fee: params.settlement_fee_coin(),
        }
    }

    /// Trade fee on `proceeds`, in `denom`.
    #[must_use]
    pub fn trade_fee(&self, denom: &str, proceeds: Decimal) -> Coin {
        Coin::new(denom, trade_fee(proceeds, self.trade_fee_rate))
    }
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self::from_params(&Params::default())
    }
}

/// What placing `order` reserves: its full spend plus its settlement fee.
///
/// # Errors
/// `InvariantViolation` if the spend leaves the decimal range.
pub fn placement_reservation(order: &Order) -> Result<Vec<Coin>> {
    let mut coins = vec![Coin::new(order.spend_denom(), order.spend_for(order.quantity)?)];
    coins.extend(order.settlement_fee_reserved.clone());
    Ok(coins)
}

#[cfg(test)]
mod tests {
    use blockmatch_types::OrderSide;

    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn default_rate_on_reference_deal() {
        assert_eq!(trade_fee(dec("1.0"), dec("0.001")), dec("0.001"));
        assert_eq!(trade_fee(dec("5.0"), dec("0.001")), dec("0.005"));
    }

    #[test]
    fn truncates_to_eight_places() {
        assert_eq!(trade_fee(dec("0.123456789"), dec("0.001")), dec("0.00012345"));
        assert_eq!(trade_fee(dec("0.000000009"), dec("0.5")), Decimal::ZERO);
    }

    #[test]
    fn reservation_covers_spend_and_settlement_fee() {
        let fees = FeeSchedule::default();
        let buy = Order::dummy(1, 1, OrderSide::Buy, dec("10"), dec("1.5"))
            .with_settlement_fee(&fees.settlement_fee);
        assert_eq!(
            placement_reservation(&buy).unwrap(),
            vec![Coin::new("usdt", dec("15")), Coin::new("native", dec("0.2592"))]
        );

        let sell = Order::dummy(1, 2, OrderSide::Sell, dec("10"), dec("2.5"))
            .with_settlement_fee(&Coin::new("native", Decimal::ZERO));
        assert_eq!(placement_reservation(&sell).unwrap(), vec![Coin::new("btc", dec("2.5"))]);
    }
}
