//! Shared world state for ticket reconciliation BDD scenarios.

use chrono::TimeDelta;
use mockable::DefaultClock;
use rstest::fixture;
use std::collections::BTreeSet;
use std::sync::Arc;
use ticketsync::sync::{
    adapters::memory::{InMemoryCodeHost, InMemoryIssueTracker, LINK_FIELD_ID, WorkflowEdge},
    domain::{RepositoryRef, WorkflowPolicy},
    services::{GeneratorSettings, RunError, RunReport, RunSettings, SnapshotRequest, SyncRunner},
};

/// Runner type used by the BDD world.
pub type TestRunner = SyncRunner<InMemoryIssueTracker, InMemoryCodeHost, DefaultClock>;

/// Scenario world for reconciliation behaviour tests.
pub struct SyncWorld {
    pub tracker: InMemoryIssueTracker,
    pub host: InMemoryCodeHost,
    pub reports: Vec<RunReport>,
    pub mutations_after_first_run: Option<usize>,
}

impl SyncWorld {
    /// Creates a world over a tracker with the stock workflow.
    ///
    /// # Panics
    ///
    /// Panics when the in-memory tracker lock is poisoned.
    #[must_use]
    pub fn new() -> Self {
        let tracker = InMemoryIssueTracker::new("SYNC");
        for edge in [
            WorkflowEdge::new("11", "Start Development", "In Development")
                .from_statuses(["To Do"]),
            WorkflowEdge::new("21", "In Progress", "In Progress").from_statuses(["To Do"]),
            WorkflowEdge::new("31", "Ready to Merge", "Ready to Merge")
                .from_statuses(["To Do", "In Development", "In Progress"]),
            WorkflowEdge::new("41", "Done", "Done"),
        ] {
            tracker
                .add_workflow_edge(edge)
                .expect("workflow edge should be stored");
        }
        Self {
            tracker,
            host: InMemoryCodeHost::new(),
            reports: Vec::new(),
            mutations_after_first_run: None,
        }
    }

    /// Builds a runner that tracks `alice` and `bob` in `acme/api`.
    #[must_use]
    pub fn runner(&self) -> TestRunner {
        let mut policy = WorkflowPolicy::default();
        policy
            .start_transition_by_type
            .insert("Bug".to_owned(), "In Progress".to_owned());
        let settings = RunSettings {
            snapshot: SnapshotRequest {
                repository: RepositoryRef::new("acme", "api"),
                users: BTreeSet::from(["alice".to_owned(), "bob".to_owned()]),
                labels: Vec::new(),
                excluded_statuses: policy.terminal_statuses.clone(),
                ticket_page_size: 50,
                host_page_size: 100,
            },
            policy,
            link_field_id: LINK_FIELD_ID.to_owned(),
            generator: Some(GeneratorSettings::new(
                "SYNC",
                "Task",
                "42",
                TimeDelta::hours(1),
            )),
            max_concurrency: 4,
        };
        SyncRunner::new(
            Arc::new(self.tracker.clone()),
            Arc::new(self.host.clone()),
            Arc::new(DefaultClock),
            settings,
        )
    }

    /// Executes one run and records its report.
    ///
    /// # Errors
    ///
    /// Returns the run error when the run aborts.
    pub fn run_once(&mut self) -> Result<(), RunError> {
        let report = run_async(self.runner().run())?;
        self.reports.push(report);
        Ok(())
    }
}

impl Default for SyncWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixture that creates a new scenario world.
#[fixture]
pub fn world() -> SyncWorld {
    SyncWorld::default()
}

/// Runs an async operation within sync step definitions.
pub fn run_async<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}

/// Pull request URL for `number` in `acme/api`.
#[must_use]
pub fn pr_url(number: u64) -> String {
    format!("https://github.com/acme/api/pull/{number}")
}
