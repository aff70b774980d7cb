//! JSON receipt drafts and replaying them onto a [`GoodsReceipt`].

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use wardstock_core::{Aggregate, AggregateId, DepartmentId, ProductId, PurchaseOrderId};
use wardstock_receiving::{
    AddAllocation, AddManualLine, Adjustments, AllocationRequest, CatalogEntry, CreateReceipt,
    EditLine, GoodsReceipt, InMemoryDepartments, InMemoryProductCatalog, InMemoryPurchaseOrders,
    LineEdit, ProductCatalog, PurchaseOrderSnapshot, PurchaseOrderSource, ReceiptCommand,
    ReceiptHeader, ReceivingConfig, RemoveLines, SelectPurchaseOrder, SetAdjustments,
};

#[derive(Debug, Clone, Deserialize)]
pub struct ManualLineDraft {
    pub product_id: ProductId,
    pub received_qty: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LineEditDraft {
    pub product_id: ProductId,
    pub edit: LineEdit,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DepartmentName {
    pub id: DepartmentId,
    pub name: String,
}

/// Everything a user has entered on the receipt screen, plus the master data
/// snapshots the engine needs to resolve it.
#[derive(Debug, Clone, Deserialize)]
pub struct ReceiptDraft {
    #[serde(default)]
    pub receipt_id: Option<AggregateId>,
    pub header: ReceiptHeader,
    #[serde(default)]
    pub catalog: Vec<CatalogEntry>,
    #[serde(default)]
    pub purchase_orders: Vec<PurchaseOrderSnapshot>,
    #[serde(default)]
    pub purchase_order_id: Option<PurchaseOrderId>,
    #[serde(default)]
    pub manual_lines: Vec<ManualLineDraft>,
    #[serde(default)]
    pub edits: Vec<LineEditDraft>,
    #[serde(default)]
    pub removed: Vec<ProductId>,
    #[serde(default)]
    pub adjustments: Adjustments,
    #[serde(default)]
    pub allocations: Vec<AllocationRequest>,
    #[serde(default)]
    pub departments: Vec<DepartmentName>,
    /// Reference date for date checks; the current UTC date when absent.
    #[serde(default)]
    pub today: Option<NaiveDate>,
}

/// A draft step the receipt refused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rejection {
    pub step: String,
    pub message: String,
}

impl ReceiptDraft {
    pub fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Utc::now().date_naive())
    }

    pub fn department_directory(&self) -> InMemoryDepartments {
        InMemoryDepartments::new(self.departments.iter().map(|d| (d.id, d.name.clone())))
    }

    /// Run every draft step as a command, in screen order: header, purchase
    /// order, manual lines, edits, removals, adjustments, allocations.
    ///
    /// Rejected steps are collected and the rest still run, so one report
    /// shows every problem.
    pub fn replay(&self, config: ReceivingConfig) -> (GoodsReceipt, Vec<Rejection>) {
        let id = self.receipt_id.unwrap_or_default();
        let mut receipt = GoodsReceipt::empty(id).with_config(config);
        let mut rejected = Vec::new();
        let catalog = InMemoryProductCatalog::new(self.catalog.iter().cloned());
        let orders = InMemoryPurchaseOrders::new(self.purchase_orders.iter().cloned());

        run(
            &mut receipt,
            &mut rejected,
            "header".into(),
            ReceiptCommand::CreateReceipt(CreateReceipt {
                receipt_id: id,
                header: ReceiptHeader {
                    purchase_order: None,
                    ..self.header.clone()
                },
                occurred_at: Utc::now(),
            }),
        );

        if let Some(order_id) = self.purchase_order_id {
            match orders.fetch(order_id) {
                Some(order) => run(
                    &mut receipt,
                    &mut rejected,
                    format!("purchase_order {order_id}"),
                    ReceiptCommand::SelectPurchaseOrder(SelectPurchaseOrder {
                        receipt_id: id,
                        order,
                        occurred_at: Utc::now(),
                    }),
                ),
                None => rejected.push(Rejection {
                    step: format!("purchase_order {order_id}"),
                    message: "purchase order not found".into(),
                }),
            }
        }

        for manual in &self.manual_lines {
            let step = format!("manual_line {}", manual.product_id);
            match catalog.lookup(manual.product_id) {
                Some(entry) => run(
                    &mut receipt,
                    &mut rejected,
                    step,
                    ReceiptCommand::AddManualLine(AddManualLine {
                        receipt_id: id,
                        entry,
                        received_qty: manual.received_qty,
                        occurred_at: Utc::now(),
                    }),
                ),
                None => rejected.push(Rejection {
                    step,
                    message: "product not in catalog".into(),
                }),
            }
        }

        for edit in &self.edits {
            run(
                &mut receipt,
                &mut rejected,
                format!("edit {}", edit.product_id),
                ReceiptCommand::EditLine(EditLine {
                    receipt_id: id,
                    product_id: edit.product_id,
                    edit: edit.edit.clone(),
                    occurred_at: Utc::now(),
                }),
            );
        }

        if !self.removed.is_empty() {
            run(
                &mut receipt,
                &mut rejected,
                "remove".into(),
                ReceiptCommand::RemoveLines(RemoveLines {
                    receipt_id: id,
                    product_ids: self.removed.clone(),
                    occurred_at: Utc::now(),
                }),
            );
        }

        run(
            &mut receipt,
            &mut rejected,
            "adjustments".into(),
            ReceiptCommand::SetAdjustments(SetAdjustments {
                receipt_id: id,
                adjustments: self.adjustments,
                occurred_at: Utc::now(),
            }),
        );

        for (i, request) in self.allocations.iter().enumerate() {
            run(
                &mut receipt,
                &mut rejected,
                format!("allocation {}", i + 1),
                ReceiptCommand::AddAllocation(AddAllocation {
                    receipt_id: id,
                    request: request.clone(),
                    occurred_at: Utc::now(),
                }),
            );
        }

        tracing::debug!(
            receipt_id = %id,
            lines = receipt.lines().len(),
            rejected = rejected.len(),
            "draft replayed"
        );
        (receipt, rejected)
    }
}

fn run(
    receipt: &mut GoodsReceipt,
    rejected: &mut Vec<Rejection>,
    step: String,
    command: ReceiptCommand,
) {
    if let Err(err) = receipt.execute(&command) {
        rejected.push(Rejection {
            step,
            message: err.to_string(),
        });
    }
}
