//! Last-writer-wins decision for incoming updates.

use chrono::{DateTime, Utc};

use crate::domain::Expense;

/// Outcome of comparing an incoming update with the stored expense.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictDecision {
    /// The client version is at least as new; write it.
    Apply,
    /// The server row was written after the client event; keep it.
    RejectStale,
}

/// Decide whether an update stamped `incoming_timestamp` may overwrite
/// `existing`.
///
/// The client's event time is compared with the server's last write time
/// and ties go to the client. These are different clocks: an edit to an old
/// expense whose event time predates the last server write is rejected even
/// when the edit itself is newer.
#[must_use]
pub fn resolve_conflict(existing: &Expense, incoming_timestamp: DateTime<Utc>) -> ConflictDecision {
    if incoming_timestamp >= existing.updated_at {
        ConflictDecision::Apply
    } else {
        ConflictDecision::RejectStale
    }
}
