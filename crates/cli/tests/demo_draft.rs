use rust_decimal_macros::dec;

use wardstock_cli::{build_report, ReceiptDraft};
use wardstock_receiving::{LineOrigin, ReceivingConfig};

const DEMO: &str = include_str!("../../../demos/receipt-draft.json");

fn demo() -> ReceiptDraft {
    serde_json::from_str(DEMO).unwrap()
}

#[test]
fn demo_draft_is_clean_and_values_accepted_quantities() {
    let report = build_report(&demo(), ReceivingConfig::default(), None);

    assert!(report.is_clean(), "{report:?}");
    assert!(!report.approved);
    let origins: Vec<LineOrigin> = report.lines.iter().map(|l| l.origin).collect();
    assert_eq!(
        origins,
        vec![LineOrigin::PurchaseOrder, LineOrigin::PurchaseOrder, LineOrigin::Manual]
    );
    assert_eq!(report.lines[0].line.valuation.quantity, dec!(8));
    assert_eq!(report.lines[0].line.valuation.line_value, dec!(806.4));
    assert_eq!(report.totals.taxable_total, dec!(1170));
    assert_eq!(report.totals.tax_total, dec!(141.4));
    assert_eq!(report.totals.grand_total, dec!(1330.9));
}

#[test]
fn demo_draft_approves_with_issue_orders() {
    let report = build_report(&demo(), ReceivingConfig::default(), Some(None));

    assert!(report.approved);
    let submission = report.submission.as_ref().unwrap();
    assert_eq!(submission.allocations.len(), 1);
    assert_eq!(submission.allocations[0].issues.len(), 2);

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["lines"][2]["serial"], 3);
    assert_eq!(json["lines"][2]["origin"], "manual");
    assert_eq!(json["lines"][2]["batch_no"], "RL-2291");
}

#[test]
fn future_receipt_warns_without_blocking() {
    let mut draft = demo();
    draft.today = chrono::NaiveDate::from_ymd_opt(2026, 4, 5);

    let report = build_report(&draft, ReceivingConfig::default(), None);
    assert!(report.valid);
    assert!(
        report.warnings.iter().any(|w| w.contains("in the future")),
        "{:?}",
        report.warnings
    );
}
