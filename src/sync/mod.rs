//! Ticket and pull request synchronisation.
//!
//! One run loads a snapshot of open linked tickets and tracked pull
//! requests, moves every ticket to the workflow status its pull request
//! implies, and optionally files tickets for untracked pull requests. The
//! module follows hexagonal architecture:
//!
//! - Domain types and the decision table in [`domain`]
//! - Port contracts for the tracker and the code host in [`ports`]
//! - Jira, GitHub, and in-memory implementations in [`adapters`]
//! - Snapshot loading, reconciliation, and generation in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
