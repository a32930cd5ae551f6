//! Adapters implementing the sync ports.
//!
//! `jira` and `github` talk to the real services over HTTP; `memory`
//! provides deterministic doubles for tests and dry runs.

pub mod github;
pub mod jira;
pub mod memory;

pub use github::{GitHubClient, GitHubSettings};
pub use jira::{JiraClient, JiraSettings};
pub use memory::{InMemoryCodeHost, InMemoryIssueTracker};
