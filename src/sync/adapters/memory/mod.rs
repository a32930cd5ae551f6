//! In-memory adapters for both collaborators.

mod code_host;
mod tracker;

pub use code_host::{HostOperation, InMemoryCodeHost};
pub use tracker::{InMemoryIssueTracker, TrackerMutation, TrackerOperation, WorkflowEdge};

/// Custom-field ID under which the in-memory tracker reports ticket links.
pub const LINK_FIELD_ID: &str = "customfield_10100";
