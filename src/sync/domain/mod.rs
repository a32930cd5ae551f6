//! Domain model for ticket and pull request reconciliation.
//!
//! Everything here is pure: link parsing, ticket and pull request
//! classification, and the decision table. Remote access lives behind the
//! ports.

mod decision;
mod error;
mod ids;
mod link;
mod pull_request;
mod snapshot;
mod ticket;
mod transition;

pub use decision::{Decision, PullRequestCondition, TicketCondition, WorkflowPolicy};
pub use error::LinkError;
pub use ids::{IssueNumber, RepositoryRef, TicketId, TicketKey};
pub use link::{LinkKey, PullRequestLink};
pub use pull_request::{HostIssue, PullRequest, PullRequestData, PullRequestState};
pub use snapshot::Snapshot;
pub use ticket::{CreatedTicket, NewTicket, Ticket, TicketQuery};
pub use transition::{Iteration, Transition, TransitionFields, TransitionRequest};
