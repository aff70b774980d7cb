//! Merging purchase-order lines and manual lines into one keyed line set.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use wardstock_core::ProductId;

use crate::line::ReceivedLine;
use crate::valuation::{valuate_all, ValuatedLine};

/// Which subset a line belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineOrigin {
    PurchaseOrder,
    Manual,
}

impl core::fmt::Display for LineOrigin {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            LineOrigin::PurchaseOrder => f.write_str("purchase order"),
            LineOrigin::Manual => f.write_str("manual entry"),
        }
    }
}

/// Recoverable line-set errors. The set is left untouched when one is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum ReconcileError {
    #[error("product {product_id} already added (from {existing})")]
    AlreadyAdded {
        product_id: ProductId,
        existing: LineOrigin,
    },

    #[error("product {product_id} appears more than once on the purchase order")]
    DuplicateOnPurchaseOrder { product_id: ProductId },

    #[error("product {product_id} is not on this document")]
    NotFound { product_id: ProductId },

    #[error("product {product_id} was expected to come from {expected}")]
    SourceMismatch {
        product_id: ProductId,
        expected: LineOrigin,
    },
}

/// A line with its presentation serial (1-based, recomputed on every pass).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SerialLine<'a> {
    pub serial: u32,
    pub line: &'a ReceivedLine,
}

impl SerialLine<'_> {
    pub fn origin(&self) -> LineOrigin {
        origin_of(self.line)
    }
}

/// Ordered set of received lines keyed by product.
///
/// Purchase-order lines come first in PO order, manual lines follow in
/// insertion order. A product appears at most once across both subsets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LineSet {
    lines: Vec<ReceivedLine>,
}

impl LineSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn as_slice(&self) -> &[ReceivedLine] {
        &self.lines
    }

    pub fn iter(&self) -> impl Iterator<Item = &ReceivedLine> {
        self.lines.iter()
    }

    pub fn po_lines(&self) -> impl Iterator<Item = &ReceivedLine> {
        self.lines.iter().filter(|l| !l.is_manual())
    }

    pub fn manual_lines(&self) -> impl Iterator<Item = &ReceivedLine> {
        self.lines.iter().filter(|l| l.is_manual())
    }

    pub fn contains(&self, product_id: ProductId) -> bool {
        self.get(product_id).is_some()
    }

    pub fn get(&self, product_id: ProductId) -> Option<&ReceivedLine> {
        self.lines.iter().find(|l| l.product_id == product_id)
    }

    /// Lines with their display serials.
    pub fn sequenced(&self) -> Vec<SerialLine<'_>> {
        self.lines
            .iter()
            .zip(1u32..)
            .map(|(line, serial)| SerialLine { serial, line })
            .collect()
    }

    pub fn valuated(&self) -> Vec<ValuatedLine> {
        valuate_all(&self.lines)
    }

    /// Check that a manual line for `product_id` could be added.
    pub fn check_add_manual(&self, line: &ReceivedLine) -> Result<(), ReconcileError> {
        if !line.is_manual() {
            return Err(ReconcileError::SourceMismatch {
                product_id: line.product_id,
                expected: LineOrigin::Manual,
            });
        }
        match self.get(line.product_id) {
            Some(existing) => Err(ReconcileError::AlreadyAdded {
                product_id: line.product_id,
                existing: origin_of(existing),
            }),
            None => Ok(()),
        }
    }

    pub fn add_manual(&mut self, line: ReceivedLine) -> Result<(), ReconcileError> {
        self.check_add_manual(&line)?;
        self.lines.push(line);
        Ok(())
    }

    /// Check that `po_lines` could replace the current purchase-order subset.
    pub fn check_replace_po(&self, po_lines: &[ReceivedLine]) -> Result<(), ReconcileError> {
        for (i, line) in po_lines.iter().enumerate() {
            if line.is_manual() {
                return Err(ReconcileError::SourceMismatch {
                    product_id: line.product_id,
                    expected: LineOrigin::PurchaseOrder,
                });
            }
            if po_lines[..i].iter().any(|l| l.product_id == line.product_id) {
                return Err(ReconcileError::DuplicateOnPurchaseOrder {
                    product_id: line.product_id,
                });
            }
            if self
                .manual_lines()
                .any(|l| l.product_id == line.product_id)
            {
                return Err(ReconcileError::AlreadyAdded {
                    product_id: line.product_id,
                    existing: LineOrigin::Manual,
                });
            }
        }
        Ok(())
    }

    /// Swap the purchase-order subset wholesale; manual lines are kept as is.
    /// An empty slice clears the PO subset.
    pub fn replace_po(&mut self, po_lines: Vec<ReceivedLine>) -> Result<(), ReconcileError> {
        self.check_replace_po(&po_lines)?;
        self.lines.retain(|l| l.is_manual());
        self.lines.splice(0..0, po_lines);
        Ok(())
    }

    /// Replace the line for the same product in place.
    pub fn update(&mut self, line: ReceivedLine) -> Result<(), ReconcileError> {
        let slot = self
            .lines
            .iter_mut()
            .find(|l| l.product_id == line.product_id)
            .ok_or(ReconcileError::NotFound {
                product_id: line.product_id,
            })?;
        if slot.source != line.source {
            return Err(ReconcileError::SourceMismatch {
                product_id: line.product_id,
                expected: origin_of(slot),
            });
        }
        *slot = line;
        Ok(())
    }

    pub fn remove(&mut self, product_id: ProductId) -> Result<ReceivedLine, ReconcileError> {
        let pos = self
            .lines
            .iter()
            .position(|l| l.product_id == product_id)
            .ok_or(ReconcileError::NotFound { product_id })?;
        Ok(self.lines.remove(pos))
    }

    /// Remove several lines at once. Fails without removing anything if any
    /// product is missing.
    pub fn remove_many(
        &mut self,
        product_ids: &[ProductId],
    ) -> Result<Vec<ReceivedLine>, ReconcileError> {
        if let Some(&product_id) = product_ids.iter().find(|p| !self.contains(**p)) {
            return Err(ReconcileError::NotFound { product_id });
        }
        let (removed, kept): (Vec<_>, Vec<_>) = self
            .lines
            .drain(..)
            .partition(|l| product_ids.contains(&l.product_id));
        self.lines = kept;
        Ok(removed)
    }
}

fn origin_of(line: &ReceivedLine) -> LineOrigin {
    if line.is_manual() {
        LineOrigin::Manual
    } else {
        LineOrigin::PurchaseOrder
    }
}
