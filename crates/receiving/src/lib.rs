//! Goods receipt (GRN) engine: line valuation, GST split, document totals,
//! PO/manual line reconciliation and department allocation checks.
//!
//! Everything here is deterministic domain logic. Catalog, purchase order
//! and department lookups come in through the traits in [`catalog`]; the
//! crate performs no IO of its own.

pub mod allocation;
pub mod catalog;
pub mod config;
pub mod document;
pub mod line;
pub mod receipt;
pub mod reconcile;
pub mod totals;
pub mod validation;
pub mod valuation;

pub use allocation::{
    materialize_issues, validate_allocations, AllocationError, AllocationReport,
    AllocationRequest, IssueOrder, LineIssues,
};
pub use catalog::{
    CatalogEntry, DepartmentDirectory, InMemoryDepartments, InMemoryProductCatalog,
    InMemoryPurchaseOrders, ProductCatalog, PurchaseOrderLine, PurchaseOrderRef,
    PurchaseOrderSnapshot, PurchaseOrderSource, TaxProfile,
};
pub use config::ReceivingConfig;
pub use document::{ReceiptHeader, ReceiptSubmission};
pub use line::{LineDiscount, LineEdit, LineSource, ReceivedLine};
pub use receipt::{
    AddAllocation, AddManualLine, AllocationEntry, Approve, ClearPurchaseOrder, CreateReceipt,
    EditAllocation, EditLine, GoodsReceipt, ReceiptCommand, ReceiptEvent, RemoveAllocation,
    RemoveLines, SelectPurchaseOrder, SetAdjustments, UpdateHeader,
};
pub use reconcile::{LineOrigin, LineSet, ReconcileError, SerialLine};
pub use totals::{aggregate, Adjustments, DocumentDiscount, Totals};
pub use validation::{
    validate_document, DocumentIssue, DocumentWarning, ReceiptView, ValidationReport,
};
pub use valuation::{valuate, valuate_all, LineValuation, ValuatedLine};
