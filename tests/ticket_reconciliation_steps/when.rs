//! When steps for ticket reconciliation BDD scenarios.

use super::world::SyncWorld;
use eyre::WrapErr;
use rstest_bdd_macros::when;

#[when("the sync job runs")]
fn sync_job_runs(world: &mut SyncWorld) -> Result<(), eyre::Report> {
    world.run_once().wrap_err("sync run in scenario")
}

#[when("the sync job runs twice")]
fn sync_job_runs_twice(world: &mut SyncWorld) -> Result<(), eyre::Report> {
    world.run_once().wrap_err("first sync run in scenario")?;
    world.mutations_after_first_run = Some(world.tracker.mutations()?.len());
    world.run_once().wrap_err("second sync run in scenario")
}
