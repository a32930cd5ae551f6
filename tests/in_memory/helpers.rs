//! Shared builders for in-memory end-to-end tests.

use chrono::{TimeDelta, Utc};
use mockable::DefaultClock;
use std::sync::Arc;
use ticketsync::config::SyncConfig;
use ticketsync::sync::{
    adapters::memory::{InMemoryCodeHost, InMemoryIssueTracker, LINK_FIELD_ID, WorkflowEdge},
    domain::{
        IssueNumber, Iteration, PullRequest, PullRequestData, RepositoryRef, Ticket, TicketId,
        TicketKey,
    },
    services::{RunError, RunReport, SyncRunner},
};

/// Configuration shared by the end-to-end tests. Tokens are placeholders;
/// the in-memory adapters never check them.
pub fn config_text(extra: &str) -> String {
    format!(
        r#"
[tracker]
base_url = "https://tracker.invalid"
username = "sync-bot"
token = "unused"
link_field_name = "GitHub Link"
link_field_id = "{LINK_FIELD_ID}"
project_key = "SYNC"
board_id = "42"

[host]
token = "unused"
owner = "acme"
repository = "api"
users = ["alice", "bob"]
page_size = 2
{extra}
"#
    )
}

/// Parses and validates [`config_text`].
///
/// # Errors
///
/// Returns an error when the configuration does not parse or validate.
pub fn config(extra: &str) -> Result<SyncConfig, eyre::Report> {
    let config = SyncConfig::from_toml_str(&config_text(extra))?;
    config.validate()?;
    Ok(config)
}

pub fn pr_url(number: u64) -> String {
    format!("https://github.com/acme/api/pull/{number}")
}

/// Open pull request created `age` ago.
pub fn pull_request(number: u64, author: &str, age: TimeDelta) -> PullRequest {
    PullRequest::from_data(PullRequestData {
        repository: RepositoryRef::new("acme", "api"),
        number: IssueNumber::new(number),
        html_url: pr_url(number),
        author: author.to_owned(),
        title: format!("Change #{number}"),
        body: None,
        merged: None,
        merged_at: None,
        closed_at: None,
        created_at: Utc::now() - age,
    })
}

pub fn ticket(number: u64, status: &str, issue_type: &str, link: &str) -> Ticket {
    Ticket::new(
        TicketId::new(number.to_string()),
        TicketKey::new(format!("SYNC-{number}")),
        status,
        issue_type,
    )
    .with_link(link)
}

/// Tracker with the stock workflow, a bug-specific start edge, and an
/// active iteration.
///
/// # Errors
///
/// Returns an error when the tracker state cannot be written.
pub fn tracker() -> Result<InMemoryIssueTracker, eyre::Report> {
    let tracker = InMemoryIssueTracker::new("SYNC");
    for edge in [
        WorkflowEdge::new("11", "Start Development", "In Development").from_statuses(["To Do"]),
        WorkflowEdge::new("21", "In Progress", "In Progress").from_statuses(["To Do"]),
        WorkflowEdge::new("31", "Ready to Merge", "Ready to Merge")
            .from_statuses(["To Do", "In Development", "In Progress"]),
        WorkflowEdge::new("41", "Done", "Done"),
    ] {
        tracker.add_workflow_edge(edge)?;
    }
    tracker.set_iterations(vec![Iteration {
        id: 7,
        name: "Sprint 7".to_owned(),
        state: "active".to_owned(),
    }])?;
    Ok(tracker)
}

/// Runs one sync pass configured by `config`.
///
/// # Errors
///
/// Returns an error when run settings cannot be built.
pub async fn run(
    config: &SyncConfig,
    tracker: &InMemoryIssueTracker,
    host: &InMemoryCodeHost,
) -> Result<Result<RunReport, RunError>, eyre::Report> {
    let runner = SyncRunner::new(
        Arc::new(tracker.clone()),
        Arc::new(host.clone()),
        Arc::new(DefaultClock),
        config.run_settings(false)?,
    );
    Ok(runner.run().await)
}
