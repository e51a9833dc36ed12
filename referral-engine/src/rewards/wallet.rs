//! Points to cash conversion
//!
//! Points are paid out at a fixed rate per 1000 points. Amounts use
//! `rust_decimal` so the cash value is exact.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::models::WalletSummary;

/// Conversion rate and withdrawal floor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletPolicy {
    /// Cash units credited per 1000 points
    pub cash_per_thousand_points: u64,
    /// Smallest cash balance that may be withdrawn
    pub minimum_withdrawal: u64,
}

impl Default for WalletPolicy {
    fn default() -> Self {
        Self {
            cash_per_thousand_points: 50,
            minimum_withdrawal: 500,
        }
    }
}

impl WalletPolicy {
    /// Cash value of a points balance
    pub fn cash_value(&self, points: u64) -> Decimal {
        Decimal::from(points) * Decimal::from(self.cash_per_thousand_points) / Decimal::from(1000)
    }

    /// Points needed to reach the withdrawal floor
    pub fn minimum_withdrawal_points(&self) -> u64 {
        if self.cash_per_thousand_points == 0 {
            return u64::MAX;
        }
        self.minimum_withdrawal
            .saturating_mul(1000)
            .div_ceil(self.cash_per_thousand_points)
    }

    pub fn summary(&self, points: u64) -> WalletSummary {
        let cash_value = self.cash_value(points);
        let minimum_withdrawal = Decimal::from(self.minimum_withdrawal);
        WalletSummary {
            points,
            can_withdraw: cash_value >= minimum_withdrawal,
            cash_value,
            minimum_withdrawal,
            minimum_withdrawal_points: self.minimum_withdrawal_points(),
        }
    }
}
