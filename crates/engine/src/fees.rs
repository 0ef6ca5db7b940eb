//! Settlement fee policy.
//!
//! When a secondary-market trade completes, the gross price is split between
//! the platform, the project's operator and the seller. Fees are expressed in
//! basis points and truncated to minor units; the seller receives whatever is
//! left, so the three parts always add up to the gross amount.

use serde::{Deserialize, Serialize};

use crate::{EngineError, ResultEngine, Settlement};

pub const BPS_DENOMINATOR: i64 = 10_000;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeePolicy {
    pub platform_fee_bps: u16,
    pub operator_fee_bps: u16,
}

impl FeePolicy {
    pub fn new(platform_fee_bps: u16, operator_fee_bps: u16) -> ResultEngine<Self> {
        let total = i64::from(platform_fee_bps) + i64::from(operator_fee_bps);
        if total > BPS_DENOMINATOR {
            return Err(EngineError::InvalidAmount(format!(
                "fees add up to {total} bps, max is {BPS_DENOMINATOR}"
            )));
        }
        Ok(Self {
            platform_fee_bps,
            operator_fee_bps,
        })
    }

    /// Splits `gross_minor` into platform fee, operator fee and seller net.
    pub fn settle(&self, gross_minor: i64) -> ResultEngine<Settlement> {
        if gross_minor < 0 {
            return Err(EngineError::InvalidAmount(
                "gross amount must be >= 0".to_string(),
            ));
        }
        let platform_fee_minor = bps_of(gross_minor, self.platform_fee_bps);
        let operator_fee_minor = bps_of(gross_minor, self.operator_fee_bps);
        Ok(Settlement {
            gross_minor,
            platform_fee_minor,
            operator_fee_minor,
            seller_net_minor: gross_minor - platform_fee_minor - operator_fee_minor,
        })
    }
}

fn bps_of(amount_minor: i64, bps: u16) -> i64 {
    (amount_minor as i128 * i128::from(bps) / i128::from(BPS_DENOMINATOR)) as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_pays_seller_everything() {
        let settlement = FeePolicy::default().settle(12_345).unwrap();
        assert_eq!(settlement.seller_net_minor, 12_345);
        assert_eq!(settlement.platform_fee_minor, 0);
        assert_eq!(settlement.operator_fee_minor, 0);
    }

    #[test]
    fn fees_truncate_and_seller_takes_the_rest() {
        // 2.5% platform, 1% operator
        let policy = FeePolicy::new(250, 100).unwrap();
        let settlement = policy.settle(10_001).unwrap();

        assert_eq!(settlement.platform_fee_minor, 250);
        assert_eq!(settlement.operator_fee_minor, 100);
        assert_eq!(settlement.seller_net_minor, 9_651);
        assert_eq!(
            settlement.platform_fee_minor
                + settlement.operator_fee_minor
                + settlement.seller_net_minor,
            settlement.gross_minor
        );
    }

    #[test]
    fn rejects_fees_above_one_hundred_percent() {
        assert!(FeePolicy::new(6_000, 5_000).is_err());
        assert!(FeePolicy::new(5_000, 5_000).is_ok());
    }
}
