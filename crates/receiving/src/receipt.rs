use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use wardstock_core::{Aggregate, AggregateId, AggregateRoot, DomainError, Event, ProductId, UserId};

use crate::allocation::{materialize_issues, validate_allocations, AllocationReport, AllocationRequest};
use crate::catalog::{CatalogEntry, PurchaseOrderRef, PurchaseOrderSnapshot};
use crate::config::ReceivingConfig;
use crate::document::{ReceiptHeader, ReceiptSubmission};
use crate::line::{LineEdit, ReceivedLine};
use crate::reconcile::{LineSet, ReconcileError, SerialLine};
use crate::totals::{aggregate, Adjustments, Totals};
use crate::validation::{validate_document, ReceiptView, ValidationReport};
use crate::valuation::ValuatedLine;

/// Allocation request with its stable per-document number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationEntry {
    pub allocation_no: u32,
    pub request: AllocationRequest,
}

/// Aggregate root: GoodsReceipt (GRN).
///
/// All mutation goes through commands. Once approved, every command is
/// rejected with [`DomainError::DocumentApproved`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoodsReceipt {
    id: AggregateId,
    header: Option<ReceiptHeader>,
    lines: LineSet,
    adjustments: Adjustments,
    allocations: Vec<AllocationEntry>,
    next_allocation_no: u32,
    approved: bool,
    config: ReceivingConfig,
    version: u64,
    created: bool,
}

impl GoodsReceipt {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: AggregateId) -> Self {
        Self {
            id,
            header: None,
            lines: LineSet::new(),
            adjustments: Adjustments::default(),
            allocations: Vec::new(),
            next_allocation_no: 1,
            approved: false,
            config: ReceivingConfig::default(),
            version: 0,
            created: false,
        }
    }

    pub fn with_config(mut self, config: ReceivingConfig) -> Self {
        self.config = config;
        self
    }

    pub fn id_typed(&self) -> AggregateId {
        self.id
    }

    pub fn header(&self) -> Option<&ReceiptHeader> {
        self.header.as_ref()
    }

    pub fn lines(&self) -> &LineSet {
        &self.lines
    }

    pub fn sequenced_lines(&self) -> Vec<SerialLine<'_>> {
        self.lines.sequenced()
    }

    pub fn adjustments(&self) -> &Adjustments {
        &self.adjustments
    }

    pub fn allocations(&self) -> &[AllocationEntry] {
        &self.allocations
    }

    pub fn is_approved(&self) -> bool {
        self.approved
    }

    pub fn valuated_lines(&self) -> Vec<ValuatedLine> {
        self.lines.valuated()
    }

    pub fn totals(&self) -> Totals {
        aggregate(&self.valuated_lines(), &self.adjustments)
    }

    fn allocation_requests(&self) -> Vec<AllocationRequest> {
        self.allocations.iter().map(|a| a.request.clone()).collect()
    }

    /// Allocation check against the current line set.
    pub fn allocation_report(&self) -> AllocationReport {
        validate_allocations(&self.allocation_requests(), self.lines.as_slice())
    }

    /// Full document validation. `None` until the receipt is created.
    pub fn validate(&self, today: NaiveDate) -> Option<ValidationReport> {
        let header = self.header.as_ref()?;
        let requests = self.allocation_requests();
        Some(validate_document(
            ReceiptView {
                header,
                lines: self.lines.as_slice(),
                adjustments: &self.adjustments,
                allocations: &requests,
            },
            today,
            &self.config,
        ))
    }
}

impl AggregateRoot for GoodsReceipt {
    type Id = AggregateId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateReceipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateReceipt {
    pub receipt_id: AggregateId,
    pub header: ReceiptHeader,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateHeader. The company cannot change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateHeader {
    pub receipt_id: AggregateId,
    pub header: ReceiptHeader,
    pub occurred_at: DateTime<Utc>,
}

/// Command: SelectPurchaseOrder (replaces any previously selected order's lines).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectPurchaseOrder {
    pub receipt_id: AggregateId,
    pub order: PurchaseOrderSnapshot,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ClearPurchaseOrder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearPurchaseOrder {
    pub receipt_id: AggregateId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AddManualLine. The caller resolves the catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddManualLine {
    pub receipt_id: AggregateId,
    pub entry: CatalogEntry,
    pub received_qty: Decimal,
    pub occurred_at: DateTime<Utc>,
}

/// Command: EditLine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditLine {
    pub receipt_id: AggregateId,
    pub product_id: ProductId,
    pub edit: LineEdit,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RemoveLines (one or many).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveLines {
    pub receipt_id: AggregateId,
    pub product_ids: Vec<ProductId>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: SetAdjustments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetAdjustments {
    pub receipt_id: AggregateId,
    pub adjustments: Adjustments,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AddAllocation. Checked against stock only at validation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddAllocation {
    pub receipt_id: AggregateId,
    pub request: AllocationRequest,
    pub occurred_at: DateTime<Utc>,
}

/// Command: EditAllocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditAllocation {
    pub receipt_id: AggregateId,
    pub allocation_no: u32,
    pub request: AllocationRequest,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RemoveAllocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveAllocation {
    pub receipt_id: AggregateId,
    pub allocation_no: u32,
    pub occurred_at: DateTime<Utc>,
}

/// Command: Approve. Runs the document validator first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Approve {
    pub receipt_id: AggregateId,
    pub approved_by: Option<UserId>,
    pub today: NaiveDate,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReceiptCommand {
    CreateReceipt(CreateReceipt),
    UpdateHeader(UpdateHeader),
    SelectPurchaseOrder(SelectPurchaseOrder),
    ClearPurchaseOrder(ClearPurchaseOrder),
    AddManualLine(AddManualLine),
    EditLine(EditLine),
    RemoveLines(RemoveLines),
    SetAdjustments(SetAdjustments),
    AddAllocation(AddAllocation),
    EditAllocation(EditAllocation),
    RemoveAllocation(RemoveAllocation),
    Approve(Approve),
}

impl ReceiptCommand {
    fn receipt_id(&self) -> AggregateId {
        match self {
            ReceiptCommand::CreateReceipt(c) => c.receipt_id,
            ReceiptCommand::UpdateHeader(c) => c.receipt_id,
            ReceiptCommand::SelectPurchaseOrder(c) => c.receipt_id,
            ReceiptCommand::ClearPurchaseOrder(c) => c.receipt_id,
            ReceiptCommand::AddManualLine(c) => c.receipt_id,
            ReceiptCommand::EditLine(c) => c.receipt_id,
            ReceiptCommand::RemoveLines(c) => c.receipt_id,
            ReceiptCommand::SetAdjustments(c) => c.receipt_id,
            ReceiptCommand::AddAllocation(c) => c.receipt_id,
            ReceiptCommand::EditAllocation(c) => c.receipt_id,
            ReceiptCommand::RemoveAllocation(c) => c.receipt_id,
            ReceiptCommand::Approve(c) => c.receipt_id,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            ReceiptCommand::CreateReceipt(_) => "create_receipt",
            ReceiptCommand::UpdateHeader(_) => "update_header",
            ReceiptCommand::SelectPurchaseOrder(_) => "select_purchase_order",
            ReceiptCommand::ClearPurchaseOrder(_) => "clear_purchase_order",
            ReceiptCommand::AddManualLine(_) => "add_manual_line",
            ReceiptCommand::EditLine(_) => "edit_line",
            ReceiptCommand::RemoveLines(_) => "remove_lines",
            ReceiptCommand::SetAdjustments(_) => "set_adjustments",
            ReceiptCommand::AddAllocation(_) => "add_allocation",
            ReceiptCommand::EditAllocation(_) => "edit_allocation",
            ReceiptCommand::RemoveAllocation(_) => "remove_allocation",
            ReceiptCommand::Approve(_) => "approve",
        }
    }
}

/// Event: ReceiptCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptCreated {
    pub receipt_id: AggregateId,
    pub header: ReceiptHeader,
    pub occurred_at: DateTime<Utc>,
}

/// Event: HeaderUpdated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderUpdated {
    pub receipt_id: AggregateId,
    pub header: ReceiptHeader,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PurchaseOrderLinesReplaced. `purchase_order: None` means cleared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseOrderLinesReplaced {
    pub receipt_id: AggregateId,
    pub purchase_order: Option<PurchaseOrderRef>,
    pub lines: Vec<ReceivedLine>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ManualLineAdded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualLineAdded {
    pub receipt_id: AggregateId,
    pub line: ReceivedLine,
    pub occurred_at: DateTime<Utc>,
}

/// Event: LineEdited. Carries the whole edited line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineEdited {
    pub receipt_id: AggregateId,
    pub line: ReceivedLine,
    pub occurred_at: DateTime<Utc>,
}

/// Event: LinesRemoved. Allocations for removed products go with them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinesRemoved {
    pub receipt_id: AggregateId,
    pub product_ids: Vec<ProductId>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: AdjustmentsChanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjustmentsChanged {
    pub receipt_id: AggregateId,
    pub adjustments: Adjustments,
    pub occurred_at: DateTime<Utc>,
}

/// Event: AllocationAdded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationAdded {
    pub receipt_id: AggregateId,
    pub allocation_no: u32,
    pub request: AllocationRequest,
    pub occurred_at: DateTime<Utc>,
}

/// Event: AllocationEdited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationEdited {
    pub receipt_id: AggregateId,
    pub allocation_no: u32,
    pub request: AllocationRequest,
    pub occurred_at: DateTime<Utc>,
}

/// Event: AllocationRemoved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationRemoved {
    pub receipt_id: AggregateId,
    pub allocation_no: u32,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ReceiptApproved.
///
/// Carries the persistence payload. Stock posting and department issue
/// transfers are raised from it downstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptApproved {
    pub receipt_id: AggregateId,
    pub approved_by: Option<UserId>,
    pub submission: ReceiptSubmission,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReceiptEvent {
    ReceiptCreated(ReceiptCreated),
    HeaderUpdated(HeaderUpdated),
    PurchaseOrderLinesReplaced(PurchaseOrderLinesReplaced),
    ManualLineAdded(ManualLineAdded),
    LineEdited(LineEdited),
    LinesRemoved(LinesRemoved),
    AdjustmentsChanged(AdjustmentsChanged),
    AllocationAdded(AllocationAdded),
    AllocationEdited(AllocationEdited),
    AllocationRemoved(AllocationRemoved),
    ReceiptApproved(ReceiptApproved),
}

impl Event for ReceiptEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ReceiptEvent::ReceiptCreated(_) => "receiving.receipt.created",
            ReceiptEvent::HeaderUpdated(_) => "receiving.receipt.header_updated",
            ReceiptEvent::PurchaseOrderLinesReplaced(_) => "receiving.receipt.po_lines_replaced",
            ReceiptEvent::ManualLineAdded(_) => "receiving.receipt.manual_line_added",
            ReceiptEvent::LineEdited(_) => "receiving.receipt.line_edited",
            ReceiptEvent::LinesRemoved(_) => "receiving.receipt.lines_removed",
            ReceiptEvent::AdjustmentsChanged(_) => "receiving.receipt.adjustments_changed",
            ReceiptEvent::AllocationAdded(_) => "receiving.receipt.allocation_added",
            ReceiptEvent::AllocationEdited(_) => "receiving.receipt.allocation_edited",
            ReceiptEvent::AllocationRemoved(_) => "receiving.receipt.allocation_removed",
            ReceiptEvent::ReceiptApproved(_) => "receiving.receipt.approved",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            ReceiptEvent::ReceiptCreated(e) => e.occurred_at,
            ReceiptEvent::HeaderUpdated(e) => e.occurred_at,
            ReceiptEvent::PurchaseOrderLinesReplaced(e) => e.occurred_at,
            ReceiptEvent::ManualLineAdded(e) => e.occurred_at,
            ReceiptEvent::LineEdited(e) => e.occurred_at,
            ReceiptEvent::LinesRemoved(e) => e.occurred_at,
            ReceiptEvent::AdjustmentsChanged(e) => e.occurred_at,
            ReceiptEvent::AllocationAdded(e) => e.occurred_at,
            ReceiptEvent::AllocationEdited(e) => e.occurred_at,
            ReceiptEvent::AllocationRemoved(e) => e.occurred_at,
            ReceiptEvent::ReceiptApproved(e) => e.occurred_at,
        }
    }
}

impl Aggregate for GoodsReceipt {
    type Command = ReceiptCommand;
    type Event = ReceiptEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            ReceiptEvent::ReceiptCreated(e) => {
                self.id = e.receipt_id;
                self.header = Some(e.header.clone());
                self.lines = LineSet::new();
                self.adjustments = Adjustments::default();
                self.allocations.clear();
                self.next_allocation_no = 1;
                self.approved = false;
                self.created = true;
            }
            ReceiptEvent::HeaderUpdated(e) => {
                let purchase_order = self.header.as_ref().and_then(|h| h.purchase_order.clone());
                let mut header = e.header.clone();
                header.purchase_order = purchase_order;
                self.header = Some(header);
            }
            ReceiptEvent::PurchaseOrderLinesReplaced(e) => {
                let result = self.lines.replace_po(e.lines.clone());
                self.note_unapplied(event, result);
                if let Some(header) = self.header.as_mut() {
                    header.purchase_order = e.purchase_order.clone();
                }
                self.drop_orphan_allocations();
            }
            ReceiptEvent::ManualLineAdded(e) => {
                let result = self.lines.add_manual(e.line.clone());
                self.note_unapplied(event, result);
            }
            ReceiptEvent::LineEdited(e) => {
                let result = self.lines.update(e.line.clone());
                self.note_unapplied(event, result);
            }
            ReceiptEvent::LinesRemoved(e) => {
                let result = self.lines.remove_many(&e.product_ids);
                self.note_unapplied(event, result);
                self.drop_orphan_allocations();
            }
            ReceiptEvent::AdjustmentsChanged(e) => {
                self.adjustments = e.adjustments;
            }
            ReceiptEvent::AllocationAdded(e) => {
                self.allocations.push(AllocationEntry {
                    allocation_no: e.allocation_no,
                    request: e.request.clone(),
                });
                self.next_allocation_no = self.next_allocation_no.max(e.allocation_no + 1);
            }
            ReceiptEvent::AllocationEdited(e) => {
                if let Some(entry) = self
                    .allocations
                    .iter_mut()
                    .find(|a| a.allocation_no == e.allocation_no)
                {
                    entry.request = e.request.clone();
                }
            }
            ReceiptEvent::AllocationRemoved(e) => {
                self.allocations.retain(|a| a.allocation_no != e.allocation_no);
            }
            ReceiptEvent::ReceiptApproved(_) => {
                self.approved = true;
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        let result = self.decide(command);
        match &result {
            Ok(events) => tracing::debug!(
                receipt_id = %self.id,
                command = command.name(),
                events = events.len(),
                "receipt command accepted"
            ),
            Err(err) => tracing::warn!(
                receipt_id = %self.id,
                command = command.name(),
                error = %err,
                "receipt command rejected"
            ),
        }
        result
    }
}

impl GoodsReceipt {
    /// Line events are checked in `handle`; one that still fails on apply came
    /// from an inconsistent history and is logged, not applied.
    fn note_unapplied<T>(&self, event: &ReceiptEvent, result: Result<T, ReconcileError>) {
        if let Err(err) = result {
            tracing::warn!(
                receipt_id = %self.id,
                event = event.event_type(),
                error = %err,
                "event did not apply to receipt lines"
            );
        }
    }

    fn decide(&self, command: &ReceiptCommand) -> Result<Vec<ReceiptEvent>, DomainError> {
        if !matches!(command, ReceiptCommand::CreateReceipt(_)) {
            self.ensure_open(command.receipt_id())?;
        }

        match command {
            ReceiptCommand::CreateReceipt(cmd) => self.handle_create(cmd),
            ReceiptCommand::UpdateHeader(cmd) => self.handle_update_header(cmd),
            ReceiptCommand::SelectPurchaseOrder(cmd) => self.handle_select_po(cmd),
            ReceiptCommand::ClearPurchaseOrder(cmd) => self.handle_clear_po(cmd),
            ReceiptCommand::AddManualLine(cmd) => self.handle_add_manual(cmd),
            ReceiptCommand::EditLine(cmd) => self.handle_edit_line(cmd),
            ReceiptCommand::RemoveLines(cmd) => self.handle_remove_lines(cmd),
            ReceiptCommand::SetAdjustments(cmd) => Ok(vec![ReceiptEvent::AdjustmentsChanged(
                AdjustmentsChanged {
                    receipt_id: cmd.receipt_id,
                    adjustments: cmd.adjustments,
                    occurred_at: cmd.occurred_at,
                },
            )]),
            ReceiptCommand::AddAllocation(cmd) => Ok(vec![ReceiptEvent::AllocationAdded(
                AllocationAdded {
                    receipt_id: cmd.receipt_id,
                    allocation_no: self.next_allocation_no,
                    request: cmd.request.clone(),
                    occurred_at: cmd.occurred_at,
                },
            )]),
            ReceiptCommand::EditAllocation(cmd) => self.handle_edit_allocation(cmd),
            ReceiptCommand::RemoveAllocation(cmd) => self.handle_remove_allocation(cmd),
            ReceiptCommand::Approve(cmd) => self.handle_approve(cmd),
        }
    }

    /// Created, addressed to this receipt, and not yet approved.
    fn ensure_open(&self, receipt_id: AggregateId) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        if self.id != receipt_id {
            return Err(DomainError::invariant("receipt_id mismatch"));
        }
        if self.approved {
            return Err(DomainError::approved());
        }
        Ok(())
    }

    fn drop_orphan_allocations(&mut self) {
        let lines = &self.lines;
        self.allocations
            .retain(|a| lines.contains(a.request.product_id));
    }

    fn handle_create(&self, cmd: &CreateReceipt) -> Result<Vec<ReceiptEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("receipt already exists"));
        }

        Ok(vec![ReceiptEvent::ReceiptCreated(ReceiptCreated {
            receipt_id: cmd.receipt_id,
            header: cmd.header.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update_header(&self, cmd: &UpdateHeader) -> Result<Vec<ReceiptEvent>, DomainError> {
        let current = self.header.as_ref().ok_or_else(DomainError::not_found)?;
        if current.company_id != cmd.header.company_id {
            return Err(DomainError::invariant("company mismatch"));
        }

        Ok(vec![ReceiptEvent::HeaderUpdated(HeaderUpdated {
            receipt_id: cmd.receipt_id,
            header: cmd.header.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_select_po(
        &self,
        cmd: &SelectPurchaseOrder,
    ) -> Result<Vec<ReceiptEvent>, DomainError> {
        let lines: Vec<ReceivedLine> = cmd
            .order
            .lines
            .iter()
            .map(ReceivedLine::from_purchase_order)
            .collect();
        self.lines
            .check_replace_po(&lines)
            .map_err(|e| DomainError::conflict(e.to_string()))?;

        Ok(vec![ReceiptEvent::PurchaseOrderLinesReplaced(
            PurchaseOrderLinesReplaced {
                receipt_id: cmd.receipt_id,
                purchase_order: Some(cmd.order.reference()),
                lines,
                occurred_at: cmd.occurred_at,
            },
        )])
    }

    fn handle_clear_po(&self, cmd: &ClearPurchaseOrder) -> Result<Vec<ReceiptEvent>, DomainError> {
        Ok(vec![ReceiptEvent::PurchaseOrderLinesReplaced(
            PurchaseOrderLinesReplaced {
                receipt_id: cmd.receipt_id,
                purchase_order: None,
                lines: Vec::new(),
                occurred_at: cmd.occurred_at,
            },
        )])
    }

    fn handle_add_manual(&self, cmd: &AddManualLine) -> Result<Vec<ReceiptEvent>, DomainError> {
        if !cmd.entry.product_id.is_positive() {
            return Err(DomainError::validation("product must be selected"));
        }
        let line = ReceivedLine::manual(&cmd.entry, cmd.received_qty);
        self.lines
            .check_add_manual(&line)
            .map_err(|e| DomainError::conflict(e.to_string()))?;

        Ok(vec![ReceiptEvent::ManualLineAdded(ManualLineAdded {
            receipt_id: cmd.receipt_id,
            line,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_edit_line(&self, cmd: &EditLine) -> Result<Vec<ReceiptEvent>, DomainError> {
        let current = self.lines.get(cmd.product_id).ok_or_else(|| {
            DomainError::validation(format!("product {} is not on this document", cmd.product_id))
        })?;
        let line = current.with_edit(&cmd.edit);
        if &line == current {
            return Ok(Vec::new());
        }

        Ok(vec![ReceiptEvent::LineEdited(LineEdited {
            receipt_id: cmd.receipt_id,
            line,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_remove_lines(&self, cmd: &RemoveLines) -> Result<Vec<ReceiptEvent>, DomainError> {
        if cmd.product_ids.is_empty() {
            return Err(DomainError::validation("no lines selected for removal"));
        }
        if let Some(missing) = cmd.product_ids.iter().find(|p| !self.lines.contains(**p)) {
            return Err(DomainError::validation(format!(
                "product {missing} is not on this document"
            )));
        }

        Ok(vec![ReceiptEvent::LinesRemoved(LinesRemoved {
            receipt_id: cmd.receipt_id,
            product_ids: cmd.product_ids.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn find_allocation(&self, allocation_no: u32) -> Result<&AllocationEntry, DomainError> {
        self.allocations
            .iter()
            .find(|a| a.allocation_no == allocation_no)
            .ok_or_else(|| DomainError::validation(format!("allocation {allocation_no} not found")))
    }

    fn handle_edit_allocation(
        &self,
        cmd: &EditAllocation,
    ) -> Result<Vec<ReceiptEvent>, DomainError> {
        self.find_allocation(cmd.allocation_no)?;

        Ok(vec![ReceiptEvent::AllocationEdited(AllocationEdited {
            receipt_id: cmd.receipt_id,
            allocation_no: cmd.allocation_no,
            request: cmd.request.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_remove_allocation(
        &self,
        cmd: &RemoveAllocation,
    ) -> Result<Vec<ReceiptEvent>, DomainError> {
        self.find_allocation(cmd.allocation_no)?;

        Ok(vec![ReceiptEvent::AllocationRemoved(AllocationRemoved {
            receipt_id: cmd.receipt_id,
            allocation_no: cmd.allocation_no,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_approve(&self, cmd: &Approve) -> Result<Vec<ReceiptEvent>, DomainError> {
        let header = self.header.as_ref().ok_or_else(DomainError::not_found)?;
        let report = self.validate(cmd.today).ok_or_else(DomainError::not_found)?;
        if !report.valid {
            return Err(DomainError::validation(report.error_messages().join("; ")));
        }

        let requests = self.allocation_requests();
        let allocations = materialize_issues(&requests, self.lines.as_slice())
            .map_err(|r| DomainError::validation(r.messages().join("; ")))?;
        let lines = self.valuated_lines();
        let totals = aggregate(&lines, &self.adjustments);

        tracing::info!(
            receipt_id = %self.id,
            lines = lines.len(),
            grand_total = %totals.grand_total,
            warnings = report.warnings.len(),
            "receipt approved"
        );

        Ok(vec![ReceiptEvent::ReceiptApproved(ReceiptApproved {
            receipt_id: cmd.receipt_id,
            approved_by: cmd.approved_by,
            submission: ReceiptSubmission {
                receipt_id: self.id,
                header: header.clone(),
                adjustments: self.adjustments,
                lines,
                allocations,
                totals,
            },
            occurred_at: cmd.occurred_at,
        })])
    }
}
