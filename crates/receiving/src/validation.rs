//! Whole-document validation gate run before a receipt may be approved.

use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

use wardstock_core::{saturating_mul, ProductId};

use crate::allocation::{validate_allocations, AllocationError, AllocationRequest};
use crate::catalog::DepartmentDirectory;
use crate::config::ReceivingConfig;
use crate::document::ReceiptHeader;
use crate::line::{LineDiscount, ReceivedLine};
use crate::totals::{aggregate, Adjustments};
use crate::valuation::valuate_all;

/// Blocking problems.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "issue", rename_all = "snake_case")]
pub enum DocumentIssue {
    #[error("department is required")]
    MissingDepartment,

    #[error("supplier is required")]
    MissingSupplier,

    #[error("invoice number is required")]
    MissingInvoiceNumber,

    #[error("receipt date is required")]
    MissingReceiptDate,

    #[error("invoice date is required")]
    MissingInvoiceDate,

    #[error("at least one line is required")]
    NoLines,

    #[error("line {serial}: product must be selected")]
    InvalidProduct { serial: u32 },

    #[error("product {product_id}: received quantity must be greater than zero")]
    NonPositiveReceivedQty { product_id: ProductId },

    #[error("product {product_id}: unit price must be greater than zero")]
    NonPositiveUnitPrice { product_id: ProductId },

    #[error("product {product_id}: accepted quantity {accepted} exceeds received quantity {received}")]
    AcceptedExceedsReceived {
        product_id: ProductId,
        accepted: Decimal,
        received: Decimal,
    },

    #[error("product {product_id}: accepted quantity {accepted} must not be negative")]
    NegativeAcceptedQty {
        product_id: ProductId,
        accepted: Decimal,
    },

    #[error("product {product_id}: free quantity {free} must not be negative")]
    NegativeFreeQty { product_id: ProductId, free: Decimal },

    #[error("product {product_id}: discount {percent}% must be between 0 and 100")]
    DiscountPercentOutOfRange {
        product_id: ProductId,
        percent: Decimal,
    },

    #[error("product {product_id}: discount amount {amount} must not be negative")]
    NegativeDiscountAmount {
        product_id: ProductId,
        amount: Decimal,
    },

    #[error("product {product_id}: tax rates must not be negative (CGST {cgst_percent}%, SGST {sgst_percent}%)")]
    NegativeTaxRate {
        product_id: ProductId,
        cgst_percent: Decimal,
        sgst_percent: Decimal,
    },

    #[error("product {product_id} appears more than once")]
    DuplicateProduct { product_id: ProductId },

    #[error("product {product_id}: batch number is required")]
    MissingBatch { product_id: ProductId },

    #[error("product {product_id}: expiry date is required")]
    MissingExpiry { product_id: ProductId },

    #[error("product {product_id}: expired on {expiry_date}")]
    ExpiredOnReceipt {
        product_id: ProductId,
        expiry_date: NaiveDate,
    },

    #[error(transparent)]
    Allocation(#[from] AllocationError),
}

/// Advisory problems; never block submission.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum DocumentWarning {
    #[error("receipt date {receipt_date} is before invoice date {invoice_date}")]
    ReceiptBeforeInvoice {
        receipt_date: NaiveDate,
        invoice_date: NaiveDate,
    },

    #[error("receipt date {receipt_date} is in the future")]
    ReceiptInFuture { receipt_date: NaiveDate },

    #[error("document discount {discount} exceeds items total {items_total}")]
    DiscountExceedsItemsTotal {
        discount: Decimal,
        items_total: Decimal,
    },

    #[error("product {product_id}: discount {discount} exceeds line amount {base_amount} and was capped")]
    DiscountAmountOverBase {
        product_id: ProductId,
        discount: Decimal,
        base_amount: Decimal,
    },

    #[error("product {product_id}: free quantity {free} looks high for received quantity {received}")]
    HighFreeQuantity {
        product_id: ProductId,
        free: Decimal,
        received: Decimal,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<DocumentIssue>,
    pub warnings: Vec<DocumentWarning>,
}

impl ValidationReport {
    pub fn error_messages(&self) -> Vec<String> {
        self.errors.iter().map(ToString::to_string).collect()
    }

    pub fn warning_messages(&self) -> Vec<String> {
        self.warnings.iter().map(ToString::to_string).collect()
    }

    /// Error messages with department names resolved.
    pub fn describe_errors(&self, departments: &dyn DepartmentDirectory) -> Vec<String> {
        self.errors
            .iter()
            .map(|e| match e {
                DocumentIssue::Allocation(a) => a.describe(departments),
                other => other.to_string(),
            })
            .collect()
    }
}

/// Borrowed view of everything the validator looks at.
#[derive(Debug, Clone, Copy)]
pub struct ReceiptView<'a> {
    pub header: &'a ReceiptHeader,
    pub lines: &'a [ReceivedLine],
    pub adjustments: &'a Adjustments,
    pub allocations: &'a [AllocationRequest],
}

/// Validate header, lines and allocations. `today` anchors the future-date check.
pub fn validate_document(
    view: ReceiptView<'_>,
    today: NaiveDate,
    config: &ReceivingConfig,
) -> ValidationReport {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    check_header(view.header, today, config, &mut errors, &mut warnings);
    check_lines(view.lines, view.header, config, &mut errors, &mut warnings);

    let valued = valuate_all(view.lines);
    let totals = aggregate(&valued, view.adjustments);
    let requested_discount = view.adjustments.discount.requested_amount(totals.taxable_total);
    if requested_discount > totals.items_total {
        warnings.push(DocumentWarning::DiscountExceedsItemsTotal {
            discount: requested_discount,
            items_total: totals.items_total,
        });
    }

    let allocation = validate_allocations(view.allocations, view.lines);
    errors.extend(allocation.errors.into_iter().map(DocumentIssue::from));

    tracing::debug!(
        errors = errors.len(),
        warnings = warnings.len(),
        "receipt validated"
    );

    ValidationReport {
        valid: errors.is_empty(),
        errors,
        warnings,
    }
}

fn check_header(
    header: &ReceiptHeader,
    today: NaiveDate,
    config: &ReceivingConfig,
    errors: &mut Vec<DocumentIssue>,
    warnings: &mut Vec<DocumentWarning>,
) {
    if !header.department_id.is_some_and(|d| d.is_positive()) {
        errors.push(DocumentIssue::MissingDepartment);
    }
    if !header.supplier_id.is_some_and(|s| s.is_positive()) {
        errors.push(DocumentIssue::MissingSupplier);
    }
    if header.invoice_number.trim().is_empty() {
        errors.push(DocumentIssue::MissingInvoiceNumber);
    }
    if header.receipt_date.is_none() {
        errors.push(DocumentIssue::MissingReceiptDate);
    }
    if header.invoice_date.is_none() {
        errors.push(DocumentIssue::MissingInvoiceDate);
    }

    if let Some(receipt_date) = header.receipt_date {
        if let Some(invoice_date) = header.invoice_date {
            if receipt_date < invoice_date {
                warnings.push(DocumentWarning::ReceiptBeforeInvoice {
                    receipt_date,
                    invoice_date,
                });
            }
        }
        // Negative tolerance counts as zero; a window past the calendar never warns.
        let tolerance = Days::new(u64::try_from(config.future_receipt_tolerance_days).unwrap_or(0));
        if today
            .checked_add_days(tolerance)
            .is_some_and(|latest| receipt_date > latest)
        {
            warnings.push(DocumentWarning::ReceiptInFuture { receipt_date });
        }
    }
}

fn check_lines(
    lines: &[ReceivedLine],
    header: &ReceiptHeader,
    config: &ReceivingConfig,
    errors: &mut Vec<DocumentIssue>,
    warnings: &mut Vec<DocumentWarning>,
) {
    if lines.is_empty() {
        errors.push(DocumentIssue::NoLines);
        return;
    }

    let mut seen: Vec<ProductId> = Vec::with_capacity(lines.len());
    for (line, serial) in lines.iter().zip(1u32..) {
        let product_id = line.product_id;
        if !product_id.is_positive() {
            errors.push(DocumentIssue::InvalidProduct { serial });
        }
        if seen.contains(&product_id) {
            errors.push(DocumentIssue::DuplicateProduct { product_id });
        } else {
            seen.push(product_id);
        }

        if line.received_qty <= Decimal::ZERO {
            errors.push(DocumentIssue::NonPositiveReceivedQty { product_id });
        }
        if line.unit_price <= Decimal::ZERO {
            errors.push(DocumentIssue::NonPositiveUnitPrice { product_id });
        }
        if line.accepted_qty > line.received_qty {
            errors.push(DocumentIssue::AcceptedExceedsReceived {
                product_id,
                accepted: line.accepted_qty,
                received: line.received_qty,
            });
        }
        if line.accepted_qty < Decimal::ZERO {
            errors.push(DocumentIssue::NegativeAcceptedQty {
                product_id,
                accepted: line.accepted_qty,
            });
        }
        if line.free_qty < Decimal::ZERO {
            errors.push(DocumentIssue::NegativeFreeQty {
                product_id,
                free: line.free_qty,
            });
        }
        if line.cgst_percent < Decimal::ZERO || line.sgst_percent < Decimal::ZERO {
            errors.push(DocumentIssue::NegativeTaxRate {
                product_id,
                cgst_percent: line.cgst_percent,
                sgst_percent: line.sgst_percent,
            });
        }

        if line.expiry_tracked {
            if line.batch_no.is_none() {
                errors.push(DocumentIssue::MissingBatch { product_id });
            }
            match (line.expiry_date, header.receipt_date) {
                (None, _) => errors.push(DocumentIssue::MissingExpiry { product_id }),
                (Some(expiry_date), Some(receipt_date)) if expiry_date <= receipt_date => {
                    errors.push(DocumentIssue::ExpiredOnReceipt {
                        product_id,
                        expiry_date,
                    })
                }
                _ => {}
            }
        }

        match line.discount {
            LineDiscount::Percent(percent)
                if percent < Decimal::ZERO || percent > Decimal::ONE_HUNDRED =>
            {
                errors.push(DocumentIssue::DiscountPercentOutOfRange { product_id, percent })
            }
            LineDiscount::Amount(amount) if amount < Decimal::ZERO => {
                errors.push(DocumentIssue::NegativeDiscountAmount { product_id, amount })
            }
            LineDiscount::Amount(discount) => {
                let base_amount = saturating_mul(line.available_qty(), line.unit_price);
                if discount > base_amount {
                    warnings.push(DocumentWarning::DiscountAmountOverBase {
                        product_id,
                        discount,
                        base_amount,
                    });
                }
            }
            _ => {}
        }

        if line.free_qty > Decimal::ZERO
            && line.free_qty > saturating_mul(line.received_qty, config.free_qty_warning_ratio)
        {
            warnings.push(DocumentWarning::HighFreeQuantity {
                product_id,
                free: line.free_qty,
                received: line.received_qty,
            });
        }
    }
}
