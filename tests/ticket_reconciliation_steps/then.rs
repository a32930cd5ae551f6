//! Then steps for ticket reconciliation BDD scenarios.

use super::world::{SyncWorld, pr_url};
use rstest_bdd_macros::then;
use ticketsync::sync::{adapters::memory::TrackerMutation, domain::TicketKey};

#[then(r#"ticket {number:u64} is in status "{status}""#)]
fn ticket_is_in_status(
    world: &SyncWorld,
    number: u64,
    status: String,
) -> Result<(), eyre::Report> {
    let key = TicketKey::new(format!("SYNC-{number}"));
    let actual = world
        .tracker
        .status_of(&key)?
        .ok_or_else(|| eyre::eyre!("ticket {key} does not exist"))?;
    if actual != status {
        return Err(eyre::eyre!("expected {key} in {status}, found {actual}"));
    }
    Ok(())
}

#[then(r#"ticket {number:u64} was resolved as "{resolution}""#)]
fn ticket_was_resolved_as(
    world: &SyncWorld,
    number: u64,
    resolution: String,
) -> Result<(), eyre::Report> {
    let key = TicketKey::new(format!("SYNC-{number}"));
    let resolved = world.tracker.mutations()?.into_iter().any(|mutation| {
        matches!(
            mutation,
            TrackerMutation::Transitioned {
                ticket,
                resolution: Some(submitted),
                ..
            } if ticket == key && submitted == resolution
        )
    });
    if !resolved {
        return Err(eyre::eyre!("{key} was not resolved as {resolution}"));
    }
    Ok(())
}

#[then("a ticket linked to pull request {number:u64} was added to iteration {id:u64}")]
fn ticket_added_to_iteration(
    world: &SyncWorld,
    number: u64,
    id: u64,
) -> Result<(), eyre::Report> {
    let mutations = world.tracker.mutations()?;
    let link = pr_url(number);
    let created = mutations
        .iter()
        .find_map(|mutation| match mutation {
            TrackerMutation::Created { ticket, link: linked } if *linked == link => Some(ticket),
            _ => None,
        })
        .ok_or_else(|| eyre::eyre!("no ticket was created for {link}"))?;
    let scheduled = mutations.iter().any(|mutation| {
        matches!(
            mutation,
            TrackerMutation::AddedToIteration { iteration_id, tickets }
                if *iteration_id == id && tickets.contains(created)
        )
    });
    if !scheduled {
        return Err(eyre::eyre!("{created} was not added to iteration {id}"));
    }
    Ok(())
}

#[then("the second run made no changes")]
fn second_run_made_no_changes(world: &SyncWorld) -> Result<(), eyre::Report> {
    let baseline = world
        .mutations_after_first_run
        .ok_or_else(|| eyre::eyre!("the scenario did not run twice"))?;
    let total = world.tracker.mutations()?.len();
    if total != baseline {
        return Err(eyre::eyre!(
            "second run issued {} mutations",
            total.saturating_sub(baseline)
        ));
    }
    let second = world
        .reports
        .last()
        .ok_or_else(|| eyre::eyre!("missing second run report"))?;
    if second.transitioned() != 0 || second.created() != 0 {
        return Err(eyre::eyre!("second run reported changes: {second:?}"));
    }
    Ok(())
}
