//! Department allocation ("issue on receipt") validation and materialization.
//!
//! Allocation requests are free-form until submission. [`validate_allocations`]
//! is pure and cheap, so callers re-run it after every add/edit/delete and once
//! more, authoritatively, right before approval.

use std::collections::{HashMap, HashSet};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use wardstock_core::{saturating_sum, DepartmentId, ProductId};

use crate::catalog::DepartmentDirectory;
use crate::line::ReceivedLine;

/// Proposed transfer of part of a received line to a department.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationRequest {
    pub product_id: ProductId,
    pub department_id: DepartmentId,
    pub quantity: Decimal,
    #[serde(default)]
    pub reference_note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum AllocationError {
    #[error("product {product_id} not found in received lines")]
    ProductNotFound { product_id: ProductId },

    #[error("product {product_id}: requested {requested} exceeds available {available}")]
    ExceedsAvailable {
        product_id: ProductId,
        requested: Decimal,
        available: Decimal,
    },

    #[error("duplicate department {department_id} for product {product_id}")]
    DuplicateDepartment {
        product_id: ProductId,
        department_id: DepartmentId,
    },

    #[error("allocation {position}: department must be selected")]
    MissingDepartment { position: usize },

    #[error("allocation {position}: quantity must be greater than zero (got {quantity})")]
    NonPositiveQuantity { position: usize, quantity: Decimal },
}

impl AllocationError {
    /// Message with department names resolved through the directory.
    pub fn describe(&self, departments: &dyn DepartmentDirectory) -> String {
        match self {
            AllocationError::DuplicateDepartment {
                product_id,
                department_id,
            } => format!(
                "duplicate department {} for product {product_id}",
                departments.label(*department_id)
            ),
            other => other.to_string(),
        }
    }
}

/// Outcome of an allocation validation pass.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct AllocationReport {
    pub valid: bool,
    pub errors: Vec<AllocationError>,
}

impl AllocationReport {
    fn from_errors(errors: Vec<AllocationError>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }

    pub fn messages(&self) -> Vec<String> {
        self.errors.iter().map(ToString::to_string).collect()
    }

    pub fn describe(&self, departments: &dyn DepartmentDirectory) -> Vec<String> {
        self.errors.iter().map(|e| e.describe(departments)).collect()
    }
}

/// Validate allocation requests against the reconciled line set.
///
/// All problems are collected. Positions in per-item messages are 1-based
/// indexes into `requests`.
pub fn validate_allocations(
    requests: &[AllocationRequest],
    lines: &[ReceivedLine],
) -> AllocationReport {
    let mut errors = Vec::new();

    for (product_id, group) in group_by_product(requests) {
        let Some(line) = lines.iter().find(|l| l.product_id == product_id) else {
            errors.push(AllocationError::ProductNotFound { product_id });
            continue;
        };

        let available = line.available_qty();
        let requested = saturating_sum(
            group
                .iter()
                .map(|(_, r)| r.quantity)
                .filter(|q| *q > Decimal::ZERO),
        );
        if requested > available {
            errors.push(AllocationError::ExceedsAvailable {
                product_id,
                requested,
                available,
            });
        }

        let mut seen: HashSet<DepartmentId> = HashSet::new();
        let mut reported: HashSet<DepartmentId> = HashSet::new();
        for (_, request) in &group {
            if !request.department_id.is_positive() {
                continue;
            }
            if !seen.insert(request.department_id) && reported.insert(request.department_id) {
                errors.push(AllocationError::DuplicateDepartment {
                    product_id,
                    department_id: request.department_id,
                });
            }
        }

        for (position, request) in &group {
            if !request.department_id.is_positive() {
                errors.push(AllocationError::MissingDepartment {
                    position: *position,
                });
            }
            if request.quantity <= Decimal::ZERO {
                errors.push(AllocationError::NonPositiveQuantity {
                    position: *position,
                    quantity: request.quantity,
                });
            }
        }
    }

    if !errors.is_empty() {
        tracing::debug!(errors = errors.len(), "allocation validation failed");
    }
    AllocationReport::from_errors(errors)
}

/// Groups in order of first appearance, each entry tagged with its 1-based position.
fn group_by_product(
    requests: &[AllocationRequest],
) -> Vec<(ProductId, Vec<(usize, &AllocationRequest)>)> {
    let mut index: HashMap<ProductId, usize> = HashMap::new();
    let mut groups: Vec<(ProductId, Vec<(usize, &AllocationRequest)>)> = Vec::new();
    for (i, request) in requests.iter().enumerate() {
        let slot = *index.entry(request.product_id).or_insert_with(|| {
            groups.push((request.product_id, Vec::new()));
            groups.len() - 1
        });
        groups[slot].1.push((i + 1, request));
    }
    groups
}

/// Immutable issue order attached to a received line once the receipt is approved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueOrder {
    pub department_id: DepartmentId,
    pub quantity: Decimal,
    pub reference_note: Option<String>,
    /// Tells stock posting to raise the department transfer.
    pub create_issual: bool,
}

/// Issue orders belonging to one received line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineIssues {
    pub product_id: ProductId,
    pub issues: Vec<IssueOrder>,
}

/// Validate and convert requests into per-line issue orders.
///
/// Lines without requests are omitted. Line order follows `lines`.
pub fn materialize_issues(
    requests: &[AllocationRequest],
    lines: &[ReceivedLine],
) -> Result<Vec<LineIssues>, AllocationReport> {
    let report = validate_allocations(requests, lines);
    if !report.valid {
        return Err(report);
    }

    Ok(lines
        .iter()
        .filter_map(|line| {
            let issues: Vec<IssueOrder> = requests
                .iter()
                .filter(|r| r.product_id == line.product_id)
                .map(|r| IssueOrder {
                    department_id: r.department_id,
                    quantity: r.quantity,
                    reference_note: r.reference_note.clone(),
                    create_issual: true,
                })
                .collect();
            (!issues.is_empty()).then(|| LineIssues {
                product_id: line.product_id,
                issues,
            })
        })
        .collect())
}
