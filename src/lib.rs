//! Ticketsync: keeps issue-tracker tickets in step with their pull requests.
//!
//! A run is a single pass. It loads the open tickets that carry a pull
//! request link, moves each one to the workflow status its pull request
//! implies (started, reviewed, done), and files tickets for tracked pull
//! requests that no ticket links to yet.
//!
//! # Architecture
//!
//! Ticketsync follows hexagonal architecture principles:
//!
//! - **Domain**: link parsing, classification, and the decision table
//! - **Ports**: issue-tracker and code-host traits
//! - **Adapters**: Jira and GitHub over HTTP, plus in-memory doubles
//!
//! # Modules
//!
//! - [`sync`]: the reconciliation engine and its collaborators
//! - [`config`]: TOML configuration
//! - [`telemetry`]: `tracing` subscriber setup

pub mod config;
pub mod sync;
pub mod telemetry;
