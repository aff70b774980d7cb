//! Engine configuration.

use std::env;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Thresholds used by the document validator for advisory warnings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceivingConfig {
    /// Warn when free quantity exceeds this multiple of the received quantity.
    pub free_qty_warning_ratio: Decimal,
    /// Receipt dates up to this many days after "today" do not warn. Negative
    /// values count as zero.
    pub future_receipt_tolerance_days: i64,
}

impl Default for ReceivingConfig {
    fn default() -> Self {
        Self {
            free_qty_warning_ratio: Decimal::ONE,
            future_receipt_tolerance_days: 0,
        }
    }
}

impl ReceivingConfig {
    /// Read overrides from the environment; missing or unparsable values
    /// keep their defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let free_qty_warning_ratio = env::var("WARDSTOCK_FREE_QTY_WARNING_RATIO")
            .ok()
            .and_then(|s| s.trim().parse::<Decimal>().ok())
            .filter(|r| *r >= Decimal::ZERO)
            .unwrap_or(defaults.free_qty_warning_ratio);

        let future_receipt_tolerance_days = env::var("WARDSTOCK_FUTURE_RECEIPT_DAYS")
            .ok()
            .and_then(|s| s.trim().parse::<i64>().ok())
            .filter(|d| *d >= 0)
            .unwrap_or(defaults.future_receipt_tolerance_days);

        Self {
            free_qty_warning_ratio,
            future_receipt_tolerance_days,
        }
    }
}
