//! Receipt report: what the receipt screen shows after every change.

use serde::Serialize;

use wardstock_core::{Aggregate, AggregateId, UserId};
use wardstock_receiving::{
    Approve, LineOrigin, ReceiptCommand, ReceiptEvent, ReceiptSubmission, ReceivingConfig, Totals,
    ValuatedLine,
};

use crate::draft::{ReceiptDraft, Rejection};

#[derive(Debug, Clone, Serialize)]
pub struct ReportLine {
    pub serial: u32,
    pub origin: LineOrigin,
    #[serde(flatten)]
    pub line: ValuatedLine,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReceiptReport {
    pub receipt_id: AggregateId,
    pub lines: Vec<ReportLine>,
    pub totals: Totals,
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub rejected: Vec<Rejection>,
    pub approved: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submission: Option<ReceiptSubmission>,
}

impl ReceiptReport {
    /// No validation errors and no rejected draft steps.
    pub fn is_clean(&self) -> bool {
        self.valid && self.rejected.is_empty()
    }
}

/// Replay the draft, validate it, and approve it when asked and possible.
pub fn build_report(
    draft: &ReceiptDraft,
    config: ReceivingConfig,
    approve_as: Option<Option<UserId>>,
) -> ReceiptReport {
    let today = draft.today();
    let departments = draft.department_directory();
    let (mut receipt, mut rejected) = draft.replay(config);

    let (valid, errors, warnings) = match receipt.validate(today) {
        Some(report) => (
            report.valid,
            report.describe_errors(&departments),
            report.warning_messages(),
        ),
        None => (false, vec!["receipt was not created".to_string()], Vec::new()),
    };

    let mut submission = None;
    if let Some(approved_by) = approve_as {
        if valid && rejected.is_empty() {
            let command = ReceiptCommand::Approve(Approve {
                receipt_id: receipt.id_typed(),
                approved_by,
                today,
                occurred_at: chrono::Utc::now(),
            });
            match receipt.execute(&command) {
                Ok(events) => {
                    submission = events.into_iter().find_map(|e| match e {
                        ReceiptEvent::ReceiptApproved(a) => Some(a.submission),
                        _ => None,
                    })
                }
                Err(err) => rejected.push(Rejection {
                    step: "approve".into(),
                    message: err.to_string(),
                }),
            }
        } else {
            rejected.push(Rejection {
                step: "approve".into(),
                message: "receipt has errors and cannot be approved".into(),
            });
        }
    }

    let lines = receipt
        .sequenced_lines()
        .iter()
        .zip(receipt.valuated_lines())
        .map(|(s, line)| ReportLine {
            serial: s.serial,
            origin: s.origin(),
            line,
        })
        .collect();

    ReceiptReport {
        receipt_id: receipt.id_typed(),
        lines,
        totals: receipt.totals(),
        valid,
        errors,
        warnings,
        rejected,
        approved: receipt.is_approved(),
        submission,
    }
}
