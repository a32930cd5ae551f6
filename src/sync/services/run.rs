//! Run coordinator: snapshot, reconciliation fan-out, then generation.

use crate::sync::{
    domain::{Iteration, LinkKey, Snapshot, Ticket, WorkflowPolicy},
    ports::{CodeHost, IssueTracker, IssueTrackerError},
};
use futures::{StreamExt, stream};
use mockable::Clock;
use std::collections::BTreeSet;
use std::sync::Arc;
use thiserror::Error;
use tracing::{Instrument, debug, info, info_span};
use uuid::Uuid;

use super::{
    GenerateOutcome, GeneratorSettings, PullRequestReport, ReconcileOutcome,
    ReconciliationService, SnapshotError, SnapshotLoader, SnapshotRequest, TicketGenerator,
    TicketReport,
};

/// Errors that abort a whole run.
#[derive(Debug, Clone, Error)]
pub enum RunError {
    /// The snapshot could not be loaded; nothing was reconciled.
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    /// The board's iterations could not be listed.
    #[error("failed to list iterations of board {board}: {source}")]
    Iterations {
        /// Board that was queried.
        board: String,
        /// Tracker failure.
        #[source]
        source: IssueTrackerError,
    },

    /// Pull requests need tickets but the board has no active iteration.
    #[error("board {board} has no active iteration")]
    NoActiveIteration {
        /// Board that was queried.
        board: String,
    },
}

/// Everything a run needs besides its collaborators.
#[derive(Debug, Clone)]
pub struct RunSettings {
    /// Working set to load.
    pub snapshot: SnapshotRequest,
    /// Workflow vocabulary for the decision table.
    pub policy: WorkflowPolicy,
    /// Tracker field ID that holds the pull request link.
    pub link_field_id: String,
    /// Generation settings; `None` disables generation.
    pub generator: Option<GeneratorSettings>,
    /// Upper bound on in-flight tasks per fan-out.
    pub max_concurrency: usize,
}

/// Outcome of a completed run.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// One report per reconciled ticket, in completion order.
    pub tickets: Vec<TicketReport>,
    /// One report per eligible pull request, in completion order.
    pub pull_requests: Vec<PullRequestReport>,
}

impl RunReport {
    /// Number of tickets moved through a transition.
    #[must_use]
    pub fn transitioned(&self) -> usize {
        self.tickets
            .iter()
            .filter(|report| matches!(report.result, Ok(ReconcileOutcome::Transitioned { .. })))
            .count()
    }

    /// Number of tickets left as they were.
    #[must_use]
    pub fn unchanged(&self) -> usize {
        self.tickets
            .iter()
            .filter(|report| matches!(report.result, Ok(ReconcileOutcome::Unchanged { .. })))
            .count()
    }

    /// Number of tickets whose reconciliation failed.
    #[must_use]
    pub fn failed_tickets(&self) -> usize {
        self.tickets.iter().filter(|report| report.result.is_err()).count()
    }

    /// Number of tickets created.
    #[must_use]
    pub fn created(&self) -> usize {
        self.pull_requests
            .iter()
            .filter(|report| matches!(report.result, Ok(GenerateOutcome::Created { .. })))
            .count()
    }

    /// Number of pull requests skipped because a ticket already existed.
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.pull_requests
            .iter()
            .filter(|report| matches!(report.result, Ok(GenerateOutcome::DuplicateSkipped { .. })))
            .count()
    }

    /// Number of pull requests whose generation failed.
    #[must_use]
    pub fn failed_pull_requests(&self) -> usize {
        self.pull_requests
            .iter()
            .filter(|report| report.result.is_err())
            .count()
    }

    fn log_summary(&self) {
        info!(
            tickets = self.tickets.len(),
            transitioned = self.transitioned(),
            unchanged = self.unchanged(),
            failed_tickets = self.failed_tickets(),
            created = self.created(),
            skipped = self.skipped(),
            failed_pull_requests = self.failed_pull_requests(),
            "sync run finished"
        );
    }
}

/// Coordinates one sync run.
///
/// The snapshot is loaded sequentially, then one task per ticket and one
/// task per eligible pull request run concurrently. Tasks share only the
/// read-only snapshot, and the run returns once every task has finished.
pub struct SyncRunner<T, H, C>
where
    T: IssueTracker,
    H: CodeHost,
    C: Clock + Send + Sync,
{
    loader: SnapshotLoader<T, H>,
    reconciler: ReconciliationService<T, H>,
    generator: Option<TicketGenerator<T, C>>,
    snapshot: SnapshotRequest,
    max_concurrency: usize,
}

impl<T, H, C> SyncRunner<T, H, C>
where
    T: IssueTracker,
    H: CodeHost,
    C: Clock + Send + Sync,
{
    /// Wires the run services over the given collaborators.
    #[must_use]
    pub fn new(tracker: Arc<T>, host: Arc<H>, clock: Arc<C>, settings: RunSettings) -> Self {
        let generator = settings.generator.map(|generator| {
            TicketGenerator::new(Arc::clone(&tracker), clock, Arc::new(generator))
        });
        Self {
            loader: SnapshotLoader::new(Arc::clone(&tracker), Arc::clone(&host)),
            reconciler: ReconciliationService::new(
                tracker,
                host,
                Arc::new(settings.policy),
                settings.link_field_id,
            ),
            generator,
            snapshot: settings.snapshot,
            max_concurrency: settings.max_concurrency.max(1),
        }
    }

    /// Executes one run.
    ///
    /// Per-ticket and per-pull-request failures are reported, never
    /// returned.
    ///
    /// # Errors
    ///
    /// Returns [`RunError`] when the snapshot cannot be loaded or when
    /// eligible pull requests exist but no active iteration can be found.
    /// Both are detected before any ticket is reconciled.
    pub async fn run(&self) -> Result<RunReport, RunError> {
        let run_id = Uuid::new_v4();
        self.run_inner()
            .instrument(info_span!("sync_run", %run_id))
            .await
    }

    async fn run_inner(&self) -> Result<RunReport, RunError> {
        let snapshot = self.loader.load(&self.snapshot).await?;
        let iteration = self.resolve_iteration(&snapshot).await?;

        let tickets: Vec<TicketReport> = stream::iter(snapshot.tickets())
            .map(|ticket| self.reconciler.reconcile(ticket, &snapshot))
            .buffer_unordered(self.max_concurrency)
            .collect()
            .await;

        let linked: BTreeSet<LinkKey> = tickets
            .iter()
            .filter_map(|report| report.link.as_deref())
            .map(LinkKey::from_raw)
            .collect();

        let mut report = RunReport {
            tickets,
            pull_requests: Vec::new(),
        };
        if let (Some(generator), Some(target)) = (&self.generator, &iteration) {
            report.pull_requests = self.generate(generator, &snapshot, &linked, target).await;
        }
        report.log_summary();
        Ok(report)
    }

    /// Finds the iteration new tickets go to, before any ticket is touched.
    ///
    /// Candidates are judged against the links the snapshot already carries.
    /// Reconciliation can only add links, so the final candidate set is a
    /// subset of this one.
    async fn resolve_iteration(
        &self,
        snapshot: &Snapshot,
    ) -> Result<Option<Iteration>, RunError> {
        let Some(generator) = &self.generator else {
            return Ok(None);
        };
        let known: BTreeSet<LinkKey> = snapshot
            .tickets()
            .iter()
            .filter_map(Ticket::link)
            .map(LinkKey::from_raw)
            .collect();
        if generator.eligible(snapshot.pull_requests(), &known).is_empty() {
            debug!("no pull request needs a ticket");
            return Ok(None);
        }

        let board = &generator.settings().board_id;
        let iteration = generator
            .active_iteration()
            .await
            .map_err(|source| RunError::Iterations {
                board: board.clone(),
                source,
            })?
            .ok_or_else(|| RunError::NoActiveIteration {
                board: board.clone(),
            })?;
        Ok(Some(iteration))
    }

    async fn generate(
        &self,
        generator: &TicketGenerator<T, C>,
        snapshot: &Snapshot,
        linked: &BTreeSet<LinkKey>,
        iteration: &Iteration,
    ) -> Vec<PullRequestReport> {
        let eligible = generator.eligible(snapshot.pull_requests(), linked);
        if eligible.is_empty() {
            debug!("every candidate pull request turned out to be linked");
            return Vec::new();
        }
        info!(
            eligible = eligible.len(),
            iteration = %iteration.name,
            "generating tickets for untracked pull requests"
        );

        stream::iter(eligible)
            .map(|pull_request| generator.generate(pull_request, iteration))
            .buffer_unordered(self.max_concurrency)
            .collect()
            .await
    }
}
