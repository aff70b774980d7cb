//! Document totals from valued lines plus document-level adjustments.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use wardstock_core::{
    clamp_non_negative, clamp_percent, round_money, saturating_add, saturating_div, saturating_mul,
    saturating_sum,
};

use crate::valuation::ValuatedLine;

/// Discount applied to the whole document after line discounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "value", rename_all = "snake_case")]
pub enum DocumentDiscount {
    Amount(Decimal),
    Percent(Decimal),
}

impl Default for DocumentDiscount {
    fn default() -> Self {
        Self::Amount(Decimal::ZERO)
    }
}

impl DocumentDiscount {
    /// Amount asked for against `base`, before clamping.
    pub fn requested_amount(&self, base: Decimal) -> Decimal {
        match *self {
            DocumentDiscount::Amount(amount) => amount,
            DocumentDiscount::Percent(pct) => {
                saturating_div(saturating_mul(base, pct), Decimal::ONE_HUNDRED)
            }
        }
    }

    /// Amount actually taken off `base`, kept within `[0, base]`.
    pub fn effective_amount(&self, base: Decimal) -> Decimal {
        let base = clamp_non_negative(base);
        let raw = match *self {
            DocumentDiscount::Amount(amount) => amount,
            DocumentDiscount::Percent(pct) => {
                saturating_div(saturating_mul(base, clamp_percent(pct)), Decimal::ONE_HUNDRED)
            }
        };
        round_money(raw.max(Decimal::ZERO).min(base))
    }
}

/// Document-level adjustments entered on the receipt header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Adjustments {
    #[serde(default)]
    pub discount: DocumentDiscount,
    #[serde(default)]
    pub other_charges: Decimal,
    /// May be negative (round down) or positive (round up).
    #[serde(default)]
    pub rounding_adjustment: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Totals {
    pub items_total: Decimal,
    pub line_discount_total: Decimal,
    pub taxable_total: Decimal,
    pub document_discount: Decimal,
    pub final_taxable_total: Decimal,
    pub cgst_total: Decimal,
    pub sgst_total: Decimal,
    pub tax_total: Decimal,
    pub net_total: Decimal,
    pub other_charges: Decimal,
    pub rounding_adjustment: Decimal,
    pub grand_total: Decimal,
}

/// Sum valued lines and apply the document adjustments.
///
/// Always a full recompute; an empty line set gives all-zero line sums.
/// Sums saturate at the `Decimal` bounds.
pub fn aggregate(lines: &[ValuatedLine], adjustments: &Adjustments) -> Totals {
    let sum = |field: fn(&ValuatedLine) -> Decimal| saturating_sum(lines.iter().map(field));
    let items_total = sum(|l| l.valuation.base_amount);
    let line_discount_total = sum(|l| l.valuation.discount_amount);
    let taxable_total = sum(|l| l.valuation.taxable_amount);
    let cgst_total = sum(|l| l.valuation.cgst_amount);
    let sgst_total = sum(|l| l.valuation.sgst_amount);

    let document_discount = adjustments.discount.effective_amount(taxable_total);
    let final_taxable_total = taxable_total - document_discount;
    let tax_total = saturating_add(cgst_total, sgst_total);
    let net_total = final_taxable_total;
    let other_charges = round_money(clamp_non_negative(adjustments.other_charges));
    let rounding_adjustment = round_money(adjustments.rounding_adjustment);

    Totals {
        items_total,
        line_discount_total,
        taxable_total,
        document_discount,
        final_taxable_total,
        cgst_total,
        sgst_total,
        tax_total,
        net_total,
        other_charges,
        rounding_adjustment,
        grand_total: saturating_sum([net_total, tax_total, other_charges, rounding_adjustment]),
    }
}
