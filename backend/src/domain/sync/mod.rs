//! Offline sync core.
//!
//! - [`CategoryResolver`]: case-insensitive find-or-create of categories.
//! - [`find_collision`]: duplicate detection for incoming updates.
//! - [`resolve_conflict`]: last-writer-wins decision.
//! - [`SyncService`]: runs one sync call as one atomic store transaction.
//! - [`SnapshotService`]: full and incremental exports with a watermark.

mod batch;
mod category_resolver;
mod conflict_resolver;
mod duplicate_detector;
mod report;
mod service;
mod snapshot;

pub use batch::{CreatedExpense, ReplacementExpense, SyncBatch, UpdatedExpense};
pub use category_resolver::CategoryResolver;
pub use conflict_resolver::{ConflictDecision, resolve_conflict};
pub use duplicate_detector::find_collision;
pub use report::{
    CreatedMapping, ReplaceReport, SyncReport, UpdateOutcome, UpdateStatus,
};
pub use service::SyncService;
pub use snapshot::{
    ExpenseSnapshot, FullSnapshot, IncrementalSnapshot, SnapshotService, SnapshotWindow,
};
