//! Governance parameters read at the start of every block.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{BlockmatchError, Coin, Result, constants};

/// Parameters supplied by governance. Immutable during one block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Params {
    /// Deals a single product may execute per block before it locks.
    pub max_deals_per_block: u32,
    /// Blocks an order rests before it expires.
    pub order_expire_blocks: u64,
    /// Fraction of each deal's proceeds taken as trade fee.
    pub trade_fee_rate: Decimal,
    /// Flat fee charged when an order closes.
    pub settlement_fee: Decimal,
    /// Denomination the settlement fee is paid in.
    pub fee_denom: String,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            max_deals_per_block: constants::DEFAULT_MAX_DEALS_PER_BLOCK,
            order_expire_blocks: constants::DEFAULT_ORDER_EXPIRE_BLOCKS,
            trade_fee_rate: constants::DEFAULT_TRADE_FEE_RATE,
            settlement_fee: constants::DEFAULT_SETTLEMENT_FEE,
            fee_denom: constants::DEFAULT_FEE_DENOM.to_string(),
        }
    }
}

impl Params {
    /// Parse parameters from JSON; missing fields take their defaults.
    ///
    /// # Errors
    /// Returns `Configuration` if the JSON is malformed or the values are
    /// out of range.
    pub fn from_json(json: &str) -> Result<Self> {
        let params: Self = serde_json::from_str(json)
            .map_err(|e| BlockmatchError::Configuration(e.to_string()))?;
        params.validate()?;
        Ok(params)
    }

    /// Check the parameters are usable.
    ///
    /// # Errors
    /// Returns `Configuration` describing the first bad field.
    pub fn validate(&self) -> Result<()> {
        if self.max_deals_per_block == 0 {
            return Err(BlockmatchError::Configuration(
                "max_deals_per_block must be > 0".to_string(),
            ));
        }
        if self.order_expire_blocks == 0 {
            return Err(BlockmatchError::Configuration(
                "order_expire_blocks must be > 0".to_string(),
            ));
        }
        if self.trade_fee_rate.is_sign_negative() || self.trade_fee_rate >= Decimal::ONE {
            return Err(BlockmatchError::Configuration(format!(
                "trade_fee_rate {} must be in [0, 1)",
                self.trade_fee_rate
            )));
        }
        if self.settlement_fee.is_sign_negative() {
            return Err(BlockmatchError::Configuration(format!(
                "settlement_fee {} must not be negative",
                self.settlement_fee
            )));
        }
        if self.fee_denom.is_empty() {
            return Err(BlockmatchError::Configuration(
                "fee_denom must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// The settlement fee as a coin.
    #[must_use]
    pub fn settlement_fee_coin(&self) -> Coin {
        Coin::new(self.fee_denom.clone(), self.settlement_fee)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let params = Params::default();
        params.validate().unwrap();
        assert_eq!(params.max_deals_per_block, 1000);
        assert_eq!(params.order_expire_blocks, 86_400);
        assert_eq!(params.trade_fee_rate, "0.001".parse::<Decimal>().unwrap());
        assert_eq!(params.settlement_fee, "0.2592".parse::<Decimal>().unwrap());
        assert_eq!(params.settlement_fee_coin().denom, "native");
    }

    #[test]
    fn partial_json_fills_defaults() {
        let params = Params::from_json(r#"{"max_deals_per_block": 2}"#).unwrap();
        assert_eq!(params.max_deals_per_block, 2);
        assert_eq!(params.order_expire_blocks, 86_400);
    }

    #[test]
    fn rejects_zero_deal_cap() {
        let err = Params::from_json(r#"{"max_deals_per_block": 0}"#).unwrap_err();
        assert!(matches!(err, BlockmatchError::Configuration(_)));
    }

    #[test]
    fn rejects_fee_rate_out_of_range() {
        let params = Params {
            trade_fee_rate: Decimal::ONE,
            ..Params::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn params_serde_roundtrip() {
        let params = Params::default();
        let json = serde_json::to_string(&params).unwrap();
        let back = Params::from_json(&json).unwrap();
        assert_eq!(params, back);
    }
}
