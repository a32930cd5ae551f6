//! Given steps for ticket reconciliation BDD scenarios.

use super::world::{SyncWorld, pr_url};
use chrono::{TimeDelta, Utc};
use rstest_bdd_macros::given;
use ticketsync::sync::domain::{
    IssueNumber, Iteration, PullRequest, PullRequestData, RepositoryRef, Ticket, TicketId,
    TicketKey,
};

fn pull_request_data(number: u64, author: String) -> PullRequestData {
    PullRequestData {
        repository: RepositoryRef::new("acme", "api"),
        number: IssueNumber::new(number),
        html_url: pr_url(number),
        author,
        title: format!("Change #{number}"),
        body: Some("Scenario pull request".to_owned()),
        merged: None,
        merged_at: None,
        closed_at: None,
        created_at: Utc::now() - TimeDelta::days(2),
    }
}

fn publish(
    world: &SyncWorld,
    data: PullRequestData,
    labels: Vec<String>,
) -> Result<(), eyre::Report> {
    world
        .host
        .insert_labelled_pull_request(PullRequest::from_data(data), labels)?;
    Ok(())
}

#[given(
    r#"a "{issue_type}" ticket {number:u64} in status "{status}" linked to pull request {pull:u64}"#
)]
fn linked_ticket(
    world: &mut SyncWorld,
    issue_type: String,
    number: u64,
    status: String,
    pull: u64,
) -> Result<(), eyre::Report> {
    let ticket = Ticket::new(
        TicketId::new(number.to_string()),
        TicketKey::new(format!("SYNC-{number}")),
        status,
        issue_type,
    )
    .with_link(pr_url(pull));
    world.tracker.insert_ticket(ticket)?;
    Ok(())
}

#[given(r#"pull request {number:u64} by "{author}" is merged"#)]
fn merged_pull_request(
    world: &mut SyncWorld,
    number: u64,
    author: String,
) -> Result<(), eyre::Report> {
    let mut data = pull_request_data(number, author);
    data.merged = Some(true);
    data.merged_at = Some(Utc::now() - TimeDelta::minutes(5));
    data.closed_at = data.merged_at;
    publish(world, data, Vec::new())
}

#[given(r#"pull request {number:u64} by "{author}" is closed without merge"#)]
fn closed_pull_request(
    world: &mut SyncWorld,
    number: u64,
    author: String,
) -> Result<(), eyre::Report> {
    let mut data = pull_request_data(number, author);
    data.merged = Some(false);
    data.closed_at = Some(Utc::now() - TimeDelta::minutes(5));
    publish(world, data, Vec::new())
}

#[given(r#"pull request {number:u64} by "{author}" is open with label "{label}""#)]
fn labelled_pull_request(
    world: &mut SyncWorld,
    number: u64,
    author: String,
    label: String,
) -> Result<(), eyre::Report> {
    publish(world, pull_request_data(number, author), vec![label])
}

#[given(r#"pull request {number:u64} by "{author}" is open"#)]
fn open_pull_request(
    world: &mut SyncWorld,
    number: u64,
    author: String,
) -> Result<(), eyre::Report> {
    publish(world, pull_request_data(number, author), Vec::new())
}

#[given("the board has an active iteration {id:u64}")]
fn active_iteration(world: &mut SyncWorld, id: u64) -> Result<(), eyre::Report> {
    world.tracker.set_iterations(vec![Iteration {
        id,
        name: format!("Sprint {id}"),
        state: "active".to_owned(),
    }])?;
    Ok(())
}
