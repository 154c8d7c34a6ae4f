//! Per-item outcomes returned to syncing clients.

use crate::domain::{ExpenseId, LocalId};

/// Server id assigned to a client-created expense.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedMapping {
    pub local_id: LocalId,
    pub server_id: ExpenseId,
}

/// Wire-level status of an update outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateStatus {
    Success,
    Skipped,
    Conflict,
    NotFound,
}

impl UpdateStatus {
    /// Lower snake case label used on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Skipped => "skipped",
            Self::Conflict => "conflict",
            Self::NotFound => "not_found",
        }
    }
}

/// What happened to one item of the update batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The incoming version was written.
    Applied { id: ExpenseId },
    /// Another active expense already has the same product and timestamp.
    Duplicate {
        id: ExpenseId,
        conflicting_id: ExpenseId,
    },
    /// The stored version was written more recently than the client event.
    Stale { id: ExpenseId },
    /// No active expense with this id belongs to the caller.
    NotFound { id: ExpenseId },
}

impl UpdateOutcome {
    /// Expense the outcome refers to.
    #[must_use]
    pub const fn id(&self) -> ExpenseId {
        match self {
            Self::Applied { id }
            | Self::Duplicate { id, .. }
            | Self::Stale { id }
            | Self::NotFound { id } => *id,
        }
    }

    #[must_use]
    pub const fn status(&self) -> UpdateStatus {
        match self {
            Self::Applied { .. } => UpdateStatus::Success,
            Self::Duplicate { .. } => UpdateStatus::Skipped,
            Self::Stale { .. } => UpdateStatus::Conflict,
            Self::NotFound { .. } => UpdateStatus::NotFound,
        }
    }

    /// Client-facing explanation, absent for applied updates.
    #[must_use]
    pub const fn message(&self) -> Option<&'static str> {
        match self {
            Self::Applied { .. } => None,
            Self::Duplicate { .. } => Some("Duplicate found"),
            Self::Stale { .. } => Some("Server version is more recent"),
            Self::NotFound { .. } => Some("Expense not found"),
        }
    }

    #[must_use]
    pub const fn conflicting_id(&self) -> Option<ExpenseId> {
        match self {
            Self::Duplicate { conflicting_id, .. } => Some(*conflicting_id),
            _ => None,
        }
    }
}

/// Result of a committed sync call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub created_map: Vec<CreatedMapping>,
    pub updated_results: Vec<UpdateOutcome>,
    pub deleted_count: u64,
}

impl SyncReport {
    /// Updates skipped because they would collide with another expense.
    pub fn duplicate_updates(&self) -> impl Iterator<Item = (ExpenseId, ExpenseId)> + '_ {
        self.updated_results
            .iter()
            .filter_map(|outcome| outcome.conflicting_id().map(|other| (outcome.id(), other)))
    }
}

/// Counts produced by a full client upload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaceReport {
    pub created_count: u64,
    pub updated_count: u64,
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(UpdateOutcome::Applied { id: ExpenseId::new(1) }, "success", None)]
    #[case(
        UpdateOutcome::Duplicate { id: ExpenseId::new(1), conflicting_id: ExpenseId::new(2) },
        "skipped",
        Some("Duplicate found")
    )]
    #[case(UpdateOutcome::Stale { id: ExpenseId::new(1) }, "conflict", Some("Server version is more recent"))]
    #[case(UpdateOutcome::NotFound { id: ExpenseId::new(1) }, "not_found", Some("Expense not found"))]
    fn outcomes_map_to_wire_labels(
        #[case] outcome: UpdateOutcome,
        #[case] status: &str,
        #[case] message: Option<&str>,
    ) {
        assert_eq!(outcome.status().as_str(), status);
        assert_eq!(outcome.message(), message);
        assert_eq!(outcome.id(), ExpenseId::new(1));
    }

    #[rstest]
    fn duplicate_updates_lists_only_collisions() {
        let report = SyncReport {
            updated_results: vec![
                UpdateOutcome::Applied { id: ExpenseId::new(1) },
                UpdateOutcome::Duplicate {
                    id: ExpenseId::new(2),
                    conflicting_id: ExpenseId::new(9),
                },
            ],
            ..SyncReport::default()
        };
        let duplicates: Vec<_> = report.duplicate_updates().collect();
        assert_eq!(duplicates, vec![(ExpenseId::new(2), ExpenseId::new(9))]);
    }
}
