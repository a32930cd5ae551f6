//! Issue-tracker port.

use super::{Page, PageRequest};
use crate::sync::domain::{
    CreatedTicket, Iteration, NewTicket, Ticket, TicketId, TicketKey, TicketQuery, Transition,
    TransitionFields,
};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

/// Result type for issue-tracker operations.
pub type IssueTrackerResult<T> = Result<T, IssueTrackerError>;

/// Operations the sync job needs from the issue tracker.
///
/// Each call is attempted once; adapters must not retry.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IssueTracker: Send + Sync {
    /// Returns one page of tickets matching `query`.
    async fn search(
        &self,
        query: &TicketQuery,
        page: PageRequest,
    ) -> IssueTrackerResult<Page<Ticket>>;

    /// Returns the ticket's custom fields keyed by field ID.
    async fn custom_fields(&self, ticket: &TicketId)
    -> IssueTrackerResult<BTreeMap<String, String>>;

    /// Lists the transitions currently allowed out of the ticket's status.
    async fn transitions(&self, ticket: &TicketId) -> IssueTrackerResult<Vec<Transition>>;

    /// Executes a transition with optional extra fields.
    async fn apply_transition(
        &self,
        ticket: &TicketId,
        transition_id: &str,
        fields: &TransitionFields,
    ) -> IssueTrackerResult<()>;

    /// Files a new ticket.
    async fn create_ticket(&self, ticket: &NewTicket) -> IssueTrackerResult<CreatedTicket>;

    /// Lists the iterations of a board.
    async fn iterations(&self, board_id: &str) -> IssueTrackerResult<Vec<Iteration>>;

    /// Moves tickets into an iteration.
    async fn add_to_iteration(
        &self,
        iteration_id: u64,
        tickets: &[TicketKey],
    ) -> IssueTrackerResult<()>;
}

/// Errors returned by issue-tracker adapters.
#[derive(Debug, Clone, Error)]
pub enum IssueTrackerError {
    /// The tracker answered with a non-success status.
    #[error("issue tracker returned {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, kept for diagnostics.
        body: String,
    },

    /// The tracker answered with a payload that could not be decoded.
    #[error("could not decode issue tracker response: {0}")]
    Decode(String),

    /// The request could not be built or delivered.
    #[error("issue tracker transport error: {0}")]
    Transport(Arc<dyn std::error::Error + Send + Sync>),
}

impl IssueTrackerError {
    /// Wraps a transport error.
    pub fn transport(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Transport(Arc::new(err))
    }
}
