use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use wardstock_core::{
    Aggregate, AggregateId, CompanyId, DepartmentId, DomainError, Event, PoDetailId, ProductId,
    PurchaseOrderId, SupplierId, UserId,
};
use wardstock_receiving::{
    AddAllocation, AddManualLine, Adjustments, AllocationRequest, Approve, CatalogEntry,
    CreateReceipt, DepartmentDirectory, DocumentDiscount, DocumentWarning, EditAllocation,
    EditLine, GoodsReceipt, InMemoryDepartments, InMemoryProductCatalog, InMemoryPurchaseOrders,
    LineDiscount, LineEdit, ProductCatalog, PurchaseOrderLine, PurchaseOrderSnapshot,
    PurchaseOrderSource, ReceiptCommand, ReceiptEvent, ReceiptHeader, ReceivingConfig,
    SelectPurchaseOrder, SetAdjustments, TaxProfile,
};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn tax(rate: Decimal) -> TaxProfile {
    TaxProfile {
        cgst_percent: rate,
        sgst_percent: rate,
    }
}

fn catalog() -> InMemoryProductCatalog {
    InMemoryProductCatalog::new([CatalogEntry {
        product_id: ProductId(3),
        name: "Ringer lactate 500ml".into(),
        unit_price: dec!(12.5),
        pack_size: Decimal::ONE,
        manufacturer_id: None,
        tax: tax(dec!(9)),
        expiry_tracked: true,
    }])
}

fn purchase_orders() -> InMemoryPurchaseOrders {
    InMemoryPurchaseOrders::new([PurchaseOrderSnapshot {
        id: PurchaseOrderId(77),
        code: "PO-0077".into(),
        order_date: date(2026, 4, 1),
        total_amount: dec!(1218),
        lines: vec![
            PurchaseOrderLine {
                detail_id: PoDetailId(701),
                product_id: ProductId(1),
                name: "Surgical gloves (pair)".into(),
                required_qty: dec!(10),
                unit_price: dec!(100),
                pack_size: Decimal::ONE,
                discount: LineDiscount::Percent(dec!(10)),
                tax: tax(dec!(6)),
                tax_after_discount: true,
                expiry_tracked: false,
            },
            PurchaseOrderLine {
                detail_id: PoDetailId(702),
                product_id: ProductId(2),
                name: "Gauze roll".into(),
                required_qty: dec!(5),
                unit_price: dec!(40),
                pack_size: Decimal::ONE,
                discount: LineDiscount::None,
                tax: tax(dec!(2.5)),
                tax_after_discount: true,
                expiry_tracked: false,
            },
        ],
    }])
}

fn departments() -> InMemoryDepartments {
    InMemoryDepartments::new([
        (DepartmentId(10), "Main store".to_string()),
        (DepartmentId(11), "ICU".to_string()),
        (DepartmentId(12), "Casualty".to_string()),
    ])
}

fn request(product: i64, dept: i64, qty: Decimal) -> AllocationRequest {
    AllocationRequest {
        product_id: ProductId(product),
        department_id: DepartmentId(dept),
        quantity: qty,
        reference_note: None,
    }
}

struct Session {
    receipt: GoodsReceipt,
    today: NaiveDate,
}

impl Session {
    fn open() -> Self {
        let id = AggregateId::new();
        let mut receipt = GoodsReceipt::empty(id).with_config(ReceivingConfig::default());
        let header = ReceiptHeader {
            received_by: Some(UserId::new()),
            department_id: Some(DepartmentId(10)),
            supplier_id: Some(SupplierId(4)),
            invoice_number: "MED/4471".into(),
            invoice_date: Some(date(2026, 4, 8)),
            receipt_date: Some(date(2026, 4, 9)),
            ..ReceiptHeader::new(CompanyId::new())
        };
        receipt
            .execute(&ReceiptCommand::CreateReceipt(CreateReceipt {
                receipt_id: id,
                header,
                occurred_at: Utc::now(),
            }))
            .unwrap();
        Self {
            receipt,
            today: date(2026, 4, 10),
        }
    }

    fn run(&mut self, command: ReceiptCommand) -> Result<Vec<ReceiptEvent>, DomainError> {
        self.receipt.execute(&command)
    }

    fn id(&self) -> AggregateId {
        self.receipt.id_typed()
    }

    fn edit(&mut self, product: i64, edit: LineEdit) {
        let cmd = ReceiptCommand::EditLine(EditLine {
            receipt_id: self.id(),
            product_id: ProductId(product),
            edit,
            occurred_at: Utc::now(),
        });
        self.run(cmd).unwrap();
    }

    fn allocate(&mut self, product: i64, dept: i64, qty: Decimal) {
        let cmd = ReceiptCommand::AddAllocation(AddAllocation {
            receipt_id: self.id(),
            request: request(product, dept, qty),
            occurred_at: Utc::now(),
        });
        self.run(cmd).unwrap();
    }

    fn approve(&mut self) -> Result<Vec<ReceiptEvent>, DomainError> {
        let cmd = ReceiptCommand::Approve(Approve {
            receipt_id: self.id(),
            approved_by: Some(UserId::new()),
            today: self.today,
            occurred_at: Utc::now(),
        });
        self.run(cmd)
    }
}

fn session_with_lines() -> Session {
    let mut session = Session::open();
    let order = purchase_orders().fetch(PurchaseOrderId(77)).unwrap();
    let cmd = ReceiptCommand::SelectPurchaseOrder(SelectPurchaseOrder {
        receipt_id: session.id(),
        order,
        occurred_at: Utc::now(),
    });
    session.run(cmd).unwrap();

    let entry = catalog().lookup(ProductId(3)).unwrap();
    let cmd = ReceiptCommand::AddManualLine(AddManualLine {
        receipt_id: session.id(),
        entry,
        received_qty: dec!(20),
        occurred_at: Utc::now(),
    });
    session.run(cmd).unwrap();
    session
}

#[test]
fn po_and_manual_lines_value_and_total_as_one_document() {
    let mut session = session_with_lines();
    let cmd = ReceiptCommand::SetAdjustments(SetAdjustments {
        receipt_id: session.id(),
        adjustments: Adjustments {
            discount: DocumentDiscount::Amount(Decimal::ZERO),
            other_charges: dec!(20),
            rounding_adjustment: dec!(-0.5),
        },
        occurred_at: Utc::now(),
    });
    session.run(cmd).unwrap();

    let serials: Vec<(u32, i64)> = session
        .receipt
        .sequenced_lines()
        .iter()
        .map(|s| (s.serial, s.line.product_id.get()))
        .collect();
    assert_eq!(serials, vec![(1, 1), (2, 2), (3, 3)]);

    let values: Vec<Decimal> = session
        .receipt
        .valuated_lines()
        .iter()
        .map(|v| v.valuation.line_value)
        .collect();
    assert_eq!(values, vec![dec!(1008), dec!(210), dec!(295)]);

    let totals = session.receipt.totals();
    assert_eq!(totals.items_total, dec!(1450));
    assert_eq!(totals.line_discount_total, dec!(100));
    assert_eq!(totals.taxable_total, dec!(1350));
    assert_eq!(totals.tax_total, dec!(163));
    assert_eq!(totals.cgst_total, totals.sgst_total);
    assert_eq!(totals.grand_total, dec!(1532.5));
}

#[test]
fn expiry_tracked_line_blocks_approval_until_batch_is_entered() {
    let mut session = session_with_lines();

    let err = session.approve().unwrap_err();
    match err {
        DomainError::Validation(msg)
            if msg.contains("product 3: batch number is required")
                && msg.contains("product 3: expiry date is required") => {}
        other => panic!("Expected Validation, got {other:?}"),
    }

    session.edit(
        3,
        LineEdit::Batch {
            batch_no: Some("RL-2291".into()),
            expiry_date: Some(date(2027, 1, 31)),
        },
    );
    session.approve().unwrap();
    assert!(session.receipt.is_approved());
}

#[test]
fn allocations_follow_accepted_quantity_and_reach_the_submission() {
    let mut session = session_with_lines();
    session.edit(
        3,
        LineEdit::Batch {
            batch_no: Some("RL-2291".into()),
            expiry_date: Some(date(2027, 1, 31)),
        },
    );
    session.edit(1, LineEdit::AcceptedQty(dec!(8)));

    session.allocate(1, 11, dec!(5));
    session.allocate(1, 12, dec!(4));
    session.allocate(2, 11, dec!(5));

    let report = session.receipt.allocation_report();
    assert!(!report.valid);
    assert_eq!(
        report.messages(),
        vec!["product 1: requested 9 exceeds available 8".to_string()]
    );
    assert!(session.approve().is_err());

    let cmd = ReceiptCommand::EditAllocation(EditAllocation {
        receipt_id: session.id(),
        allocation_no: 2,
        request: request(1, 12, dec!(3)),
        occurred_at: Utc::now(),
    });
    session.run(cmd).unwrap();
    assert!(session.receipt.allocation_report().valid);

    let events = session.approve().unwrap();
    assert_eq!(events[0].event_type(), "receiving.receipt.approved");
    let submission = match &events[0] {
        ReceiptEvent::ReceiptApproved(e) => &e.submission,
        _ => panic!("Expected ReceiptApproved event"),
    };
    assert_eq!(submission.lines.len(), 3);
    assert_eq!(submission.allocations.len(), 2);
    let icu: Decimal = submission
        .allocations
        .iter()
        .flat_map(|l| l.issues.iter())
        .filter(|i| i.department_id == DepartmentId(11))
        .map(|i| i.quantity)
        .sum();
    assert_eq!(icu, dec!(10));

    let json = serde_json::to_value(submission).unwrap();
    assert_eq!(json["lines"][0]["source"]["kind"], "purchase_order");
    assert_eq!(json["header"]["purchase_order"]["code"], "PO-0077");
}

#[test]
fn duplicate_department_messages_use_directory_names() {
    let mut session = session_with_lines();
    session.allocate(2, 11, dec!(1));
    session.allocate(2, 11, dec!(1));

    let report = session.receipt.validate(session.today).unwrap();
    assert!(!report.valid);
    let described = report.describe_errors(&departments());
    assert!(
        described
            .iter()
            .any(|m| m == "duplicate department ICU for product 2"),
        "got {described:?}"
    );
    assert_eq!(departments().label(DepartmentId(99)), "department 99");
}

#[test]
fn advisory_warnings_do_not_block_approval() {
    let mut session = session_with_lines();
    session.edit(
        3,
        LineEdit::Batch {
            batch_no: Some("RL-2291".into()),
            expiry_date: Some(date(2027, 1, 31)),
        },
    );
    session.edit(2, LineEdit::FreeQty(dec!(6)));

    let report = session.receipt.validate(session.today).unwrap();
    assert!(report.valid);
    assert!(report
        .warnings
        .iter()
        .any(|w| matches!(w, DocumentWarning::HighFreeQuantity { .. })));
    session.approve().unwrap();
}
