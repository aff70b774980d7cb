//! Line valuation: value, discount, taxable base and split tax of one line.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use wardstock_core::{
    clamp_non_negative, clamp_percent, round_money, saturating_add, saturating_div, saturating_mul,
};

use crate::line::{LineDiscount, ReceivedLine};

/// Derived amounts for one line. Never a source of truth; recomputed from
/// the line on every change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LineValuation {
    pub quantity: Decimal,
    pub base_amount: Decimal,
    pub discount_amount: Decimal,
    /// Discount as a share of the base, whichever form was entered.
    pub discount_percent: Decimal,
    pub taxable_amount: Decimal,
    pub tax_base: Decimal,
    pub total_tax_amount: Decimal,
    pub cgst_amount: Decimal,
    pub sgst_amount: Decimal,
    /// Taxable amount plus tax.
    pub line_value: Decimal,
}

/// A line together with its valuation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValuatedLine {
    #[serde(flatten)]
    pub line: ReceivedLine,
    pub valuation: LineValuation,
}

/// Value a single line.
///
/// Out-of-range inputs are clamped rather than rejected: negative quantities,
/// prices and rates count as zero, percentages are capped at 100 and the
/// discount never exceeds the base amount. Products beyond the `Decimal`
/// range saturate instead of overflowing.
pub fn valuate(line: &ReceivedLine) -> ValuatedLine {
    ValuatedLine {
        line: line.clone(),
        valuation: compute(line),
    }
}

fn compute(line: &ReceivedLine) -> LineValuation {
    let quantity = clamp_non_negative(line.available_qty());
    let unit_price = clamp_non_negative(line.unit_price);
    let base = saturating_mul(quantity, unit_price);

    let discount = match line.discount {
        LineDiscount::Amount(amount) if amount > Decimal::ZERO => amount,
        LineDiscount::Percent(pct) => {
            saturating_div(saturating_mul(base, clamp_percent(pct)), Decimal::ONE_HUNDRED)
        }
        LineDiscount::Amount(_) | LineDiscount::None => Decimal::ZERO,
    }
    .max(Decimal::ZERO)
    .min(base);

    let taxable = clamp_non_negative(base - discount);
    let tax_base = if line.tax_after_discount { taxable } else { base };

    let cgst_rate = clamp_non_negative(line.cgst_percent);
    let sgst_rate = clamp_non_negative(line.sgst_percent);
    let combined_rate = saturating_add(cgst_rate, sgst_rate);
    let total_tax = saturating_div(saturating_mul(tax_base, combined_rate), Decimal::ONE_HUNDRED);

    let total_tax_amount = round_money(total_tax);
    let (cgst_amount, sgst_amount) = if combined_rate > Decimal::ZERO {
        let cgst = round_money(saturating_div(saturating_mul(total_tax, cgst_rate), combined_rate));
        (cgst, total_tax_amount - cgst)
    } else {
        (Decimal::ZERO, Decimal::ZERO)
    };

    let discount_percent = if base > Decimal::ZERO {
        round_money(saturating_div(saturating_mul(discount, Decimal::ONE_HUNDRED), base))
    } else {
        Decimal::ZERO
    };

    LineValuation {
        quantity,
        base_amount: round_money(base),
        discount_amount: round_money(discount),
        discount_percent,
        taxable_amount: round_money(taxable),
        tax_base: round_money(tax_base),
        total_tax_amount,
        cgst_amount,
        sgst_amount,
        line_value: round_money(saturating_add(taxable, total_tax)),
    }
}

/// Value every line, preserving order.
pub fn valuate_all<'a>(lines: impl IntoIterator<Item = &'a ReceivedLine>) -> Vec<ValuatedLine> {
    lines.into_iter().map(valuate).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::line::fixtures::scenario_line;
    use crate::line::LineEdit;
    use rust_decimal_macros::dec;

    #[test]
    fn tax_after_discount_scenario() {
        let v = valuate(&scenario_line(1)).valuation;
        assert_eq!(v.quantity, dec!(10));
        assert_eq!(v.base_amount, dec!(1000));
        assert_eq!(v.discount_amount, dec!(100));
        assert_eq!(v.taxable_amount, dec!(900));
        assert_eq!(v.total_tax_amount, dec!(108));
        assert_eq!(v.cgst_amount, dec!(54));
        assert_eq!(v.sgst_amount, dec!(54));
        assert_eq!(v.line_value, dec!(1008.00));
    }

    #[test]
    fn tax_before_discount_scenario() {
        let line = scenario_line(1).with_edit(&LineEdit::TaxAfterDiscount(false));
        let v = valuate(&line).valuation;
        assert_eq!(v.tax_base, dec!(1000));
        assert_eq!(v.total_tax_amount, dec!(120));
        assert_eq!(v.cgst_amount, dec!(60));
        assert_eq!(v.sgst_amount, dec!(60));
        assert_eq!(v.line_value, dec!(1020.00));
    }

    #[test]
    fn explicit_amount_wins_and_percent_is_derived() {
        let line = scenario_line(1).with_edit(&LineEdit::DiscountAmount(dec!(250)));
        let v = valuate(&line).valuation;
        assert_eq!(v.discount_amount, dec!(250));
        assert_eq!(v.discount_percent, dec!(25));
        assert_eq!(v.taxable_amount, dec!(750));
    }

    #[test]
    fn overshooting_discounts_are_clamped_to_base() {
        let by_amount = scenario_line(1).with_edit(&LineEdit::DiscountAmount(dec!(5000)));
        let v = valuate(&by_amount).valuation;
        assert_eq!(v.discount_amount, dec!(1000));
        assert_eq!(v.taxable_amount, Decimal::ZERO);
        assert_eq!(v.line_value, Decimal::ZERO);

        let by_percent = scenario_line(1).with_edit(&LineEdit::DiscountPercent(dec!(140)));
        let v = valuate(&by_percent).valuation;
        assert_eq!(v.discount_amount, dec!(1000));
        assert_eq!(v.discount_percent, dec!(100));
    }

    #[test]
    fn zero_tax_rates_yield_zero_split() {
        let line = scenario_line(1).with_edit(&LineEdit::TaxRates {
            cgst_percent: Decimal::ZERO,
            sgst_percent: Decimal::ZERO,
        });
        let v = valuate(&line).valuation;
        assert_eq!(v.total_tax_amount, Decimal::ZERO);
        assert_eq!(v.cgst_amount, Decimal::ZERO);
        assert_eq!(v.sgst_amount, Decimal::ZERO);
        assert_eq!(v.line_value, dec!(900));
    }

    #[test]
    fn uneven_split_keeps_sum_equal_to_total() {
        let line = scenario_line(1)
            .with_edit(&LineEdit::UnitPrice(dec!(33.33)))
            .with_edit(&LineEdit::TaxRates {
                cgst_percent: dec!(2.5),
                sgst_percent: dec!(9),
            });
        let v = valuate(&line).valuation;
        assert_eq!(v.cgst_amount + v.sgst_amount, v.total_tax_amount);
    }

    #[test]
    fn negative_inputs_count_as_zero() {
        let line = scenario_line(1)
            .with_edit(&LineEdit::ReceivedQty(dec!(-4)))
            .with_edit(&LineEdit::UnitPrice(dec!(-10)));
        let v = valuate(&line).valuation;
        assert_eq!(v.base_amount, Decimal::ZERO);
        assert_eq!(v.line_value, Decimal::ZERO);
    }

    #[test]
    fn huge_quantity_times_price_saturates() {
        let line = scenario_line(1)
            .with_edit(&LineEdit::ReceivedQty(Decimal::from_i128_with_scale(
                10_i128.pow(20),
                0,
            )))
            .with_edit(&LineEdit::UnitPrice(dec!(10000000000)));
        let v = valuate(&line).valuation;
        assert_eq!(v.base_amount, Decimal::MAX);
        assert!(v.discount_amount <= v.base_amount);
        assert!(v.line_value > Decimal::ZERO);
        assert_eq!(v.cgst_amount + v.sgst_amount, v.total_tax_amount);
    }

    #[test]
    fn accepted_quantity_drives_valuation() {
        let line = scenario_line(1).with_edit(&LineEdit::AcceptedQty(dec!(4)));
        let v = valuate(&line).valuation;
        assert_eq!(v.quantity, dec!(4));
        assert_eq!(v.base_amount, dec!(400));
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        fn money() -> impl Strategy<Value = Decimal> {
            (0i64..10_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
        }

        fn rate() -> impl Strategy<Value = Decimal> {
            (0i64..3_000i64).prop_map(|bp| Decimal::new(bp, 2))
        }

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 512,
                ..ProptestConfig::default()
            })]

            /// Property: CGST + SGST always equals the rounded total tax.
            #[test]
            fn split_sums_to_total(
                qty in 1i64..500,
                price in money(),
                pct in 0i64..100,
                cgst in rate(),
                sgst in rate(),
                after in any::<bool>(),
            ) {
                let line = scenario_line(1)
                    .with_edit(&LineEdit::ReceivedQty(Decimal::from(qty)))
                    .with_edit(&LineEdit::UnitPrice(price))
                    .with_edit(&LineEdit::DiscountPercent(Decimal::from(pct)))
                    .with_edit(&LineEdit::TaxRates { cgst_percent: cgst, sgst_percent: sgst })
                    .with_edit(&LineEdit::TaxAfterDiscount(after));
                let v = valuate(&line).valuation;
                prop_assert_eq!(round_money(v.cgst_amount + v.sgst_amount), v.total_tax_amount);
            }

            /// Property: derived amounts are never negative, whatever the discount.
            #[test]
            fn derived_amounts_are_non_negative(
                qty in -50i64..500,
                price in money(),
                discount in money(),
                pct in -50i64..300,
                use_amount in any::<bool>(),
            ) {
                let edit = if use_amount {
                    LineEdit::DiscountAmount(discount)
                } else {
                    LineEdit::DiscountPercent(Decimal::from(pct))
                };
                let line = scenario_line(1)
                    .with_edit(&LineEdit::ReceivedQty(Decimal::from(qty)))
                    .with_edit(&LineEdit::UnitPrice(price))
                    .with_edit(&edit);
                let v = valuate(&line).valuation;
                prop_assert!(v.discount_amount >= Decimal::ZERO);
                prop_assert!(v.discount_amount <= v.base_amount);
                prop_assert!(v.taxable_amount >= Decimal::ZERO);
                prop_assert!(v.line_value >= Decimal::ZERO);
            }

            /// Property: valuing an already-valued line gives the same result.
            #[test]
            fn valuation_is_idempotent(qty in 0i64..1_000, price in money(), pct in 0i64..100) {
                let line = scenario_line(1)
                    .with_edit(&LineEdit::ReceivedQty(Decimal::from(qty)))
                    .with_edit(&LineEdit::UnitPrice(price))
                    .with_edit(&LineEdit::DiscountPercent(Decimal::from(pct)));
                let first = valuate(&line);
                let second = valuate(&first.line);
                prop_assert_eq!(first, second);
            }
        }
    }
}
