//! Configuration-driven runs against the in-memory adapters.

use super::helpers::{config, pr_url, pull_request, run, ticket, tracker};
use chrono::TimeDelta;
use rstest::rstest;
use ticketsync::sync::{
    adapters::memory::{InMemoryCodeHost, TrackerMutation},
    domain::TicketKey,
    services::ReconcileOutcome,
};

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn workflow_overrides_choose_transitions() -> Result<(), eyre::Report> {
    let config = config(
        r#"
[workflow]
approved_label = "approved"

[workflow.start_transition_by_type]
Bug = "In Progress"
"#,
    )?;
    let tracker = tracker()?;
    let host = InMemoryCodeHost::new();
    tracker.insert_ticket(ticket(1, "To Do", "Bug", &pr_url(1)))?;
    tracker.insert_ticket(ticket(2, "To Do", "Story", &pr_url(2)))?;
    tracker.insert_ticket(ticket(3, "In Development", "Story", &pr_url(3)))?;
    host.insert_pull_request(pull_request(1, "alice", TimeDelta::days(1)))?;
    host.insert_pull_request(pull_request(2, "alice", TimeDelta::days(1)))?;
    host.insert_labelled_pull_request(
        pull_request(3, "bob", TimeDelta::days(1)),
        vec!["approved".to_owned()],
    )?;

    let report = run(&config, &tracker, &host).await??;

    eyre::ensure!(report.transitioned() == 3, "report: {report:?}");
    for (key, expected) in [
        ("SYNC-1", "In Progress"),
        ("SYNC-2", "In Development"),
        ("SYNC-3", "Ready to Merge"),
    ] {
        let status = tracker.status_of(&TicketKey::new(key))?;
        eyre::ensure!(
            status.as_deref() == Some(expected),
            "{key}: expected {expected}, got {status:?}"
        );
    }
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn generated_ticket_uses_templates_and_mapping() -> Result<(), eyre::Report> {
    let config = config(
        r#"
[generator]
summary_template = "PR {{ number }}: {{ title }}"
description_template = "{{ url }} by {{ author }}"

[generator.user_mapping]
alice = "alice.tracker"
"#,
    )?;
    let tracker = tracker()?;
    let host = InMemoryCodeHost::new();
    host.insert_pull_request(pull_request(8, "alice", TimeDelta::days(2)))?;

    let report = run(&config, &tracker, &host).await??;

    eyre::ensure!(report.created() == 1, "report: {report:?}");
    let created = TicketKey::new("SYNC-10001");
    eyre::ensure!(tracker.summary_of(&created)?.as_deref() == Some("PR 8: Change #8"));
    eyre::ensure!(tracker.assignee_of(&created)?.as_deref() == Some("alice.tracker"));
    eyre::ensure!(tracker.mutations()?.contains(&TrackerMutation::AddedToIteration {
        iteration_id: 7,
        tickets: vec![created],
    }));
    Ok(())
}

#[rstest]
#[case::disabled("[generator]\nenabled = false\n", TimeDelta::days(2))]
#[case::too_young("", TimeDelta::minutes(10))]
#[tokio::test(flavor = "multi_thread")]
async fn no_ticket_is_generated(
    #[case] extra: &str,
    #[case] age: TimeDelta,
) -> Result<(), eyre::Report> {
    let config = config(extra)?;
    let tracker = tracker()?;
    let host = InMemoryCodeHost::new();
    host.insert_pull_request(pull_request(9, "alice", age))?;

    let report = run(&config, &tracker, &host).await??;

    eyre::ensure!(report.pull_requests.is_empty());
    eyre::ensure!(tracker.mutations()?.is_empty());
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn failing_tickets_do_not_fail_the_run() -> Result<(), eyre::Report> {
    let config = config("")?;
    let tracker = tracker()?;
    let host = InMemoryCodeHost::new();
    tracker.insert_ticket(ticket(1, "To Do", "Story", "https://github.com/acme/api/pull/x"))?;
    tracker.insert_ticket(ticket(2, "To Do", "Story", &pr_url(404)))?;
    tracker.insert_ticket(ticket(3, "To Do", "Story", &pr_url(3)))?;
    host.insert_pull_request(pull_request(3, "alice", TimeDelta::days(1)))?;

    let report = run(&config, &tracker, &host).await??;

    eyre::ensure!(report.failed_tickets() == 2, "report: {report:?}");
    let started = report.tickets.iter().find(|entry| entry.ticket.as_str() == "SYNC-3");
    eyre::ensure!(
        matches!(
            started.map(|entry| &entry.result),
            Some(Ok(ReconcileOutcome::Transitioned { .. }))
        ),
        "SYNC-3 should still be started"
    );
    Ok(())
}
