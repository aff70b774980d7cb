//! Received line model and field edits.

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use wardstock_core::{ManufacturerId, PoDetailId, ProductId};

use crate::catalog::{CatalogEntry, PurchaseOrderLine};

/// Unit prices derived from a pack price keep four places.
const UNIT_PRICE_SCALE: u32 = 4;

/// Where a received line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LineSource {
    PurchaseOrder { detail_id: PoDetailId },
    Manual,
}

/// Per-line discount. Exactly one of percent or amount is authoritative;
/// the other is derived during valuation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", content = "value", rename_all = "snake_case")]
pub enum LineDiscount {
    #[default]
    None,
    Percent(Decimal),
    Amount(Decimal),
}

/// One product received on the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceivedLine {
    pub product_id: ProductId,
    pub source: LineSource,
    pub name: String,
    pub manufacturer_id: Option<ManufacturerId>,
    pub required_qty: Decimal,
    pub received_qty: Decimal,
    pub accepted_qty: Decimal,
    pub free_qty: Decimal,
    pub unit_price: Decimal,
    pub pack_size: Decimal,
    pub discount: LineDiscount,
    pub cgst_percent: Decimal,
    pub sgst_percent: Decimal,
    pub tax_after_discount: bool,
    pub expiry_tracked: bool,
    pub batch_no: Option<String>,
    pub expiry_date: Option<NaiveDate>,
}

impl ReceivedLine {
    /// Line for a product picked from the catalog by hand.
    pub fn manual(entry: &CatalogEntry, received_qty: Decimal) -> Self {
        Self {
            product_id: entry.product_id,
            source: LineSource::Manual,
            name: entry.name.clone(),
            manufacturer_id: entry.manufacturer_id,
            required_qty: Decimal::ZERO,
            received_qty,
            accepted_qty: Decimal::ZERO,
            free_qty: Decimal::ZERO,
            unit_price: entry.unit_price,
            pack_size: entry.pack_size,
            discount: LineDiscount::None,
            cgst_percent: entry.tax.cgst_percent,
            sgst_percent: entry.tax.sgst_percent,
            tax_after_discount: true,
            expiry_tracked: entry.expiry_tracked,
            batch_no: None,
            expiry_date: None,
        }
    }

    /// Line expanded from a purchase order detail. Received quantity starts
    /// at the ordered quantity.
    pub fn from_purchase_order(po_line: &PurchaseOrderLine) -> Self {
        Self {
            product_id: po_line.product_id,
            source: LineSource::PurchaseOrder {
                detail_id: po_line.detail_id,
            },
            name: po_line.name.clone(),
            manufacturer_id: None,
            required_qty: po_line.required_qty,
            received_qty: po_line.required_qty,
            accepted_qty: Decimal::ZERO,
            free_qty: Decimal::ZERO,
            unit_price: po_line.unit_price,
            pack_size: po_line.pack_size,
            discount: po_line.discount,
            cgst_percent: po_line.tax.cgst_percent,
            sgst_percent: po_line.tax.sgst_percent,
            tax_after_discount: po_line.tax_after_discount,
            expiry_tracked: po_line.expiry_tracked,
            batch_no: None,
            expiry_date: None,
        }
    }

    pub fn is_manual(&self) -> bool {
        self.source == LineSource::Manual
    }

    pub fn po_detail_id(&self) -> Option<PoDetailId> {
        match self.source {
            LineSource::PurchaseOrder { detail_id } => Some(detail_id),
            LineSource::Manual => None,
        }
    }

    /// Quantity that is priced and can be issued: accepted if set, else received.
    pub fn available_qty(&self) -> Decimal {
        if self.accepted_qty > Decimal::ZERO {
            self.accepted_qty
        } else {
            self.received_qty
        }
    }

    /// Price of one pack at the current unit price.
    pub fn pack_price(&self) -> Decimal {
        self.unit_price * self.pack_size.max(Decimal::ONE)
    }

    /// Return a copy with one edit applied. Values are stored as entered;
    /// valuation clamps and the document validator reports.
    pub fn with_edit(&self, edit: &LineEdit) -> Self {
        let mut line = self.clone();
        match edit {
            LineEdit::ReceivedQty(qty) => line.received_qty = *qty,
            LineEdit::AcceptedQty(qty) => line.accepted_qty = *qty,
            LineEdit::FreeQty(qty) => line.free_qty = *qty,
            LineEdit::UnitPrice(price) => line.unit_price = *price,
            LineEdit::PackPrice {
                pack_size,
                pack_price,
            } => {
                let size = (*pack_size).max(Decimal::ONE);
                line.pack_size = size;
                line.unit_price = (*pack_price / size).round_dp_with_strategy(
                    UNIT_PRICE_SCALE,
                    RoundingStrategy::MidpointAwayFromZero,
                );
            }
            LineEdit::DiscountPercent(pct) => line.discount = LineDiscount::Percent(*pct),
            LineEdit::DiscountAmount(amount) => line.discount = LineDiscount::Amount(*amount),
            LineEdit::ClearDiscount => line.discount = LineDiscount::None,
            LineEdit::TaxRates {
                cgst_percent,
                sgst_percent,
            } => {
                line.cgst_percent = *cgst_percent;
                line.sgst_percent = *sgst_percent;
            }
            LineEdit::TaxAfterDiscount(flag) => line.tax_after_discount = *flag,
            LineEdit::Batch {
                batch_no,
                expiry_date,
            } => {
                line.batch_no = batch_no.clone().filter(|b| !b.trim().is_empty());
                line.expiry_date = *expiry_date;
            }
        }
        line
    }
}

/// A single field edit on a received line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum LineEdit {
    ReceivedQty(Decimal),
    AcceptedQty(Decimal),
    FreeQty(Decimal),
    UnitPrice(Decimal),
    /// Pack size and pack price change together; unit price is derived.
    PackPrice {
        pack_size: Decimal,
        pack_price: Decimal,
    },
    DiscountPercent(Decimal),
    DiscountAmount(Decimal),
    ClearDiscount,
    TaxRates {
        cgst_percent: Decimal,
        sgst_percent: Decimal,
    },
    TaxAfterDiscount(bool),
    Batch {
        batch_no: Option<String>,
        expiry_date: Option<NaiveDate>,
    },
}

impl LineEdit {
    /// Whether this edit changes any input of the line valuation.
    pub fn affects_valuation(&self) -> bool {
        !matches!(self, LineEdit::FreeQty(_) | LineEdit::Batch { .. })
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use rust_decimal_macros::dec;

    /// Manual line, qty 10 @ 100, 10% discount, 6% + 6% tax after discount.
    pub fn scenario_line(product: i64) -> ReceivedLine {
        ReceivedLine {
            product_id: ProductId(product),
            source: LineSource::Manual,
            name: format!("product {product}"),
            manufacturer_id: None,
            required_qty: Decimal::ZERO,
            received_qty: dec!(10),
            accepted_qty: Decimal::ZERO,
            free_qty: Decimal::ZERO,
            unit_price: dec!(100),
            pack_size: Decimal::ONE,
            discount: LineDiscount::Percent(dec!(10)),
            cgst_percent: dec!(6),
            sgst_percent: dec!(6),
            tax_after_discount: true,
            expiry_tracked: false,
            batch_no: None,
            expiry_date: None,
        }
    }

    pub fn po_line(product: i64, detail: i64) -> ReceivedLine {
        ReceivedLine {
            source: LineSource::PurchaseOrder {
                detail_id: PoDetailId(detail),
            },
            ..scenario_line(product)
        }
    }
}
