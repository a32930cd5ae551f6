//! Fan-out width does not change what a run does.

use super::helpers::{config, pr_url, pull_request, run, ticket, tracker};
use chrono::TimeDelta;
use rstest::rstest;
use std::collections::BTreeSet;
use ticketsync::sync::adapters::memory::{InMemoryCodeHost, TrackerMutation};

const TICKETS: u64 = 24;

#[rstest]
#[case::sequential(1)]
#[case::wide(16)]
#[tokio::test(flavor = "multi_thread")]
async fn every_ticket_is_processed_once(#[case] width: usize) -> Result<(), eyre::Report> {
    let config = config(&format!("[run]\nmax_concurrency = {width}\n"))?;
    let tracker = tracker()?;
    let host = InMemoryCodeHost::new();
    for number in 1..=TICKETS {
        tracker.insert_ticket(ticket(number, "To Do", "Story", &pr_url(number)))?;
        host.insert_pull_request(pull_request(number, "alice", TimeDelta::days(1)))?;
    }
    for number in (TICKETS + 1)..=(TICKETS + 4) {
        host.insert_pull_request(pull_request(number, "bob", TimeDelta::days(1)))?;
    }

    let report = run(&config, &tracker, &host).await??;

    eyre::ensure!(report.tickets.len() == 24);
    eyre::ensure!(report.transitioned() == 24, "report: {report:?}");
    eyre::ensure!(report.created() == 4, "report: {report:?}");

    let transitioned: Vec<String> = tracker
        .mutations()?
        .into_iter()
        .filter_map(|mutation| match mutation {
            TrackerMutation::Transitioned { ticket, .. } => Some(ticket.as_str().to_owned()),
            _ => None,
        })
        .collect();
    let distinct: BTreeSet<&String> = transitioned.iter().collect();
    eyre::ensure!(transitioned.len() == 24, "got {} transitions", transitioned.len());
    eyre::ensure!(distinct.len() == 24, "each ticket is transitioned exactly once");
    Ok(())
}
