//! `wardstock-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives shared by the receiving
//! engine: identifiers, the domain error model, aggregate/event traits and
//! monetary rounding rules. No infrastructure concerns live here.

pub mod aggregate;
pub mod error;
pub mod event;
pub mod id;
pub mod money;

pub use aggregate::{Aggregate, AggregateRoot};
pub use error::{DomainError, DomainResult};
pub use event::Event;
pub use id::{
    AggregateId, CompanyId, DepartmentId, ManufacturerId, PoDetailId, ProductId, PurchaseOrderId,
    SupplierId, UserId,
};
pub use money::{
    clamp_non_negative, clamp_percent, round_money, saturating_add, saturating_div, saturating_mul,
    saturating_sum, MONEY_SCALE,
};
