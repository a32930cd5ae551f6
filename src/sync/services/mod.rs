//! Application services for a sync run.

mod generator;
mod reconcile;
mod run;
mod snapshot;
mod transition;

use crate::sync::ports::{CodeHostError, IssueTrackerError};
use thiserror::Error;

pub use generator::{
    GenerateError, GenerateOutcome, GeneratorSettings, PullRequestReport, TicketGenerator,
    is_old_enough,
};
pub use reconcile::{ReconcileError, ReconcileOutcome, ReconciliationService, TicketReport};
pub use run::{RunError, RunReport, RunSettings, SyncRunner};
pub use snapshot::{SnapshotError, SnapshotLoader, SnapshotRequest};
pub use transition::{TransitionApplier, TransitionError};

/// Failure of a read against either collaborator.
#[derive(Debug, Clone, Error)]
pub enum RemoteFetchError {
    /// Issue tracker read failed.
    #[error(transparent)]
    Tracker(#[from] IssueTrackerError),
    /// Code host read failed.
    #[error(transparent)]
    Host(#[from] CodeHostError),
}
