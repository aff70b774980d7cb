use chrono::{DateTime, Utc};

/// A domain event emitted by an aggregate.
///
/// Events are immutable facts with a stable type name and a schema version,
/// so the persistence layer can store and replay them.
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Stable event name/type identifier (e.g. "receiving.receipt.approved").
    fn event_type(&self) -> &'static str;

    /// Schema version for this event type.
    fn version(&self) -> u32;

    /// When the event occurred (business time).
    fn occurred_at(&self) -> DateTime<Utc>;
}
