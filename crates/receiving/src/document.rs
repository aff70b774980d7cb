//! Receipt header and the payload handed to persistence on approval.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use wardstock_core::{AggregateId, CompanyId, DepartmentId, SupplierId, UserId};

use crate::allocation::LineIssues;
use crate::catalog::PurchaseOrderRef;
use crate::totals::{Adjustments, Totals};
use crate::valuation::ValuatedLine;

/// Goods receipt header.
///
/// Company and user context travel on the header; the engine keeps no
/// session state of its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptHeader {
    pub company_id: CompanyId,
    #[serde(default)]
    pub received_by: Option<UserId>,
    #[serde(default)]
    pub department_id: Option<DepartmentId>,
    #[serde(default)]
    pub supplier_id: Option<SupplierId>,
    #[serde(default)]
    pub invoice_number: String,
    #[serde(default)]
    pub invoice_date: Option<NaiveDate>,
    #[serde(default)]
    pub receipt_date: Option<NaiveDate>,
    #[serde(default)]
    pub purchase_order: Option<PurchaseOrderRef>,
    #[serde(default)]
    pub remarks: Option<String>,
}

impl ReceiptHeader {
    pub fn new(company_id: CompanyId) -> Self {
        Self {
            company_id,
            received_by: None,
            department_id: None,
            supplier_id: None,
            invoice_number: String::new(),
            invoice_date: None,
            receipt_date: None,
            purchase_order: None,
            remarks: None,
        }
    }
}

/// Everything persistence needs once a receipt passes validation.
///
/// Id assignment, document numbering and stock posting happen downstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptSubmission {
    pub receipt_id: AggregateId,
    pub header: ReceiptHeader,
    pub adjustments: Adjustments,
    pub lines: Vec<ValuatedLine>,
    pub allocations: Vec<LineIssues>,
    pub totals: Totals,
}
