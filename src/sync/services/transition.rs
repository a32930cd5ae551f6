//! Transition applier: resolves a decided target among allowed transitions.

use crate::sync::{
    domain::{Ticket, TicketKey, Transition, TransitionRequest},
    ports::{IssueTracker, IssueTrackerError},
};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// Errors returned while applying a decided transition.
#[derive(Debug, Clone, Error)]
pub enum TransitionError {
    /// The ticket's current status offers no transition with this name.
    #[error("transition for {ticket} to '{target}' not found")]
    NotFound {
        /// Ticket the transition was decided for.
        ticket: TicketKey,
        /// Transition name that was looked up.
        target: String,
    },

    /// The tracker rejected or failed the transition call.
    #[error("transition of {ticket} failed: {source}")]
    Execution {
        /// Ticket the transition was attempted on.
        ticket: TicketKey,
        /// Tracker failure.
        #[source]
        source: IssueTrackerError,
    },
}

/// Executes decided transitions against the tracker.
#[derive(Clone)]
pub struct TransitionApplier<T>
where
    T: IssueTracker,
{
    tracker: Arc<T>,
}

impl<T> TransitionApplier<T>
where
    T: IssueTracker,
{
    /// Creates an applier.
    #[must_use]
    pub const fn new(tracker: Arc<T>) -> Self {
        Self { tracker }
    }

    /// Returns the first allowed transition whose name equals `target`.
    #[must_use]
    pub fn find<'a>(allowed: &'a [Transition], target: &str) -> Option<&'a Transition> {
        allowed.iter().find(|transition| transition.name == target)
    }

    /// Applies `request` to `ticket` using one of its allowed transitions.
    ///
    /// No remote call is made when the target is missing. Execution
    /// failures are returned as-is; nothing is retried.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError::NotFound`] when no allowed transition
    /// matches, or [`TransitionError::Execution`] when the tracker call fails.
    pub async fn apply(
        &self,
        ticket: &Ticket,
        request: &TransitionRequest,
        allowed: &[Transition],
    ) -> Result<Transition, TransitionError> {
        let transition =
            Self::find(allowed, &request.target).ok_or_else(|| TransitionError::NotFound {
                ticket: ticket.key().clone(),
                target: request.target.clone(),
            })?;

        info!(
            ticket = %ticket.key(),
            from = ticket.status(),
            transition = %transition.name,
            resolution = request.fields.resolution.as_deref().unwrap_or("-"),
            "changing ticket status"
        );
        self.tracker
            .apply_transition(ticket.id(), &transition.id, &request.fields)
            .await
            .map_err(|source| TransitionError::Execution {
                ticket: ticket.key().clone(),
                source,
            })?;
        Ok(transition.clone())
    }
}
