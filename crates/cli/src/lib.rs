//! Command-line front end for the receiving engine.
//!
//! Reads a receipt draft as JSON, replays it through a [`GoodsReceipt`],
//! and renders the resulting report.
//!
//! [`GoodsReceipt`]: wardstock_receiving::GoodsReceipt

pub mod draft;
pub mod report;

pub use draft::{ReceiptDraft, Rejection};
pub use report::{build_report, ReceiptReport, ReportLine};
