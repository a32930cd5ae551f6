//! Reconciliation engine: one ticket, one decision, at most one transition.

use crate::sync::{
    domain::{
        Decision, LinkError, PullRequest, PullRequestCondition, PullRequestLink, PullRequestState,
        Snapshot, Ticket, TicketCondition, TicketKey, Transition, WorkflowPolicy,
    },
    ports::{CodeHost, IssueTracker},
};
use std::borrow::Cow;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use super::{RemoteFetchError, TransitionApplier, TransitionError};

/// Errors that abort reconciliation of a single ticket.
///
/// None of these propagate past the ticket they occurred on.
#[derive(Debug, Clone, Error)]
pub enum ReconcileError {
    /// The link field is empty.
    #[error("ticket {0} has no pull request link")]
    MissingLink(TicketKey),

    /// The link field does not name a pull request.
    #[error("ticket {ticket} has an unusable link: {source}")]
    Link {
        /// Ticket carrying the link.
        ticket: TicketKey,
        /// Parse failure.
        #[source]
        source: LinkError,
    },

    /// A collaborator read failed.
    #[error("ticket {ticket}: failed to load {what}: {source}")]
    RemoteFetch {
        /// Ticket being reconciled.
        ticket: TicketKey,
        /// What was being fetched.
        what: &'static str,
        /// Underlying failure.
        #[source]
        source: RemoteFetchError,
    },

    /// The decided transition could not be applied.
    #[error(transparent)]
    Transition(#[from] TransitionError),
}

/// What reconciliation did to a ticket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The ticket already reflected the pull request.
    Unchanged {
        /// Observed pull request condition.
        pull_request: PullRequestCondition,
        /// Observed ticket condition.
        ticket: TicketCondition,
    },
    /// A transition was executed.
    Transitioned {
        /// Observed pull request condition.
        pull_request: PullRequestCondition,
        /// Transition executed.
        transition: Transition,
        /// Resolution submitted with it.
        resolution: Option<String>,
    },
}

/// Per-ticket result of a run.
#[derive(Debug, Clone)]
pub struct TicketReport {
    /// Ticket processed.
    pub ticket: TicketKey,
    /// Link read from the ticket, when one was found.
    pub link: Option<String>,
    /// Outcome or the error that stopped processing.
    pub result: Result<ReconcileOutcome, ReconcileError>,
}

/// Reconciles tickets against the pull requests they link to.
///
/// Instances hold only shared, read-only state and may serve any number of
/// concurrent tickets.
#[derive(Clone)]
pub struct ReconciliationService<T, H>
where
    T: IssueTracker,
    H: CodeHost,
{
    tracker: Arc<T>,
    host: Arc<H>,
    applier: TransitionApplier<T>,
    policy: Arc<WorkflowPolicy>,
    link_field_id: String,
}

impl<T, H> ReconciliationService<T, H>
where
    T: IssueTracker,
    H: CodeHost,
{
    /// Creates a reconciliation service.
    ///
    /// `link_field_id` names the custom field read when a search result did
    /// not carry the link.
    #[must_use]
    pub fn new(
        tracker: Arc<T>,
        host: Arc<H>,
        policy: Arc<WorkflowPolicy>,
        link_field_id: impl Into<String>,
    ) -> Self {
        Self {
            applier: TransitionApplier::new(Arc::clone(&tracker)),
            tracker,
            host,
            policy,
            link_field_id: link_field_id.into(),
        }
    }

    /// Returns the workflow policy in use.
    #[must_use]
    pub fn policy(&self) -> &WorkflowPolicy {
        &self.policy
    }

    /// Reconciles one ticket. Failures are logged and captured in the report.
    pub async fn reconcile(&self, ticket: &Ticket, snapshot: &Snapshot) -> TicketReport {
        let link = match self.resolve_link(ticket).await {
            Ok(link) => link,
            Err(err) => {
                warn!(ticket = %ticket.key(), error = %err, "skipping ticket");
                return TicketReport {
                    ticket: ticket.key().clone(),
                    link: None,
                    result: Err(err),
                };
            }
        };

        let result = self.reconcile_link(ticket, &link, snapshot).await;
        match &result {
            Ok(ReconcileOutcome::Unchanged {
                pull_request,
                ticket: condition,
            }) => debug!(
                ticket = %ticket.key(),
                pull_request = %link,
                pull_request_condition = %pull_request,
                ticket_condition = %condition,
                "ticket already up to date"
            ),
            Ok(ReconcileOutcome::Transitioned { .. }) => {}
            Err(err) => warn!(
                ticket = %ticket.key(),
                pull_request = %link,
                error = %err,
                "ticket reconciliation failed"
            ),
        }

        TicketReport {
            ticket: ticket.key().clone(),
            link: Some(link),
            result,
        }
    }

    /// Reads the ticket's link from the search result or its custom fields.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::MissingLink`] when the field is empty and
    /// [`ReconcileError::RemoteFetch`] when custom fields cannot be read.
    pub async fn resolve_link(&self, ticket: &Ticket) -> Result<String, ReconcileError> {
        if let Some(link) = ticket.link() {
            return Ok(link.to_owned());
        }
        let fields = self
            .tracker
            .custom_fields(ticket.id())
            .await
            .map_err(|err| ReconcileError::RemoteFetch {
                ticket: ticket.key().clone(),
                what: "custom fields",
                source: err.into(),
            })?;
        fields
            .get(&self.link_field_id)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
            .map(str::to_owned)
            .ok_or_else(|| ReconcileError::MissingLink(ticket.key().clone()))
    }

    async fn reconcile_link(
        &self,
        ticket: &Ticket,
        link: &str,
        snapshot: &Snapshot,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let fetch_error = |what: &'static str| {
            let key = ticket.key().clone();
            move |source: RemoteFetchError| ReconcileError::RemoteFetch {
                ticket: key,
                what,
                source,
            }
        };

        let target = PullRequestLink::parse(link).map_err(|source| ReconcileError::Link {
            ticket: ticket.key().clone(),
            source,
        })?;
        let pull_request = self
            .locate_pull_request(&target, snapshot)
            .await
            .map_err(fetch_error("pull request"))?;
        let allowed = self
            .tracker
            .transitions(ticket.id())
            .await
            .map_err(|err| fetch_error("transitions")(err.into()))?;
        let condition = self
            .classify_pull_request(&pull_request, snapshot)
            .await
            .map_err(fetch_error("review labels"))?;

        match self.policy.decide(condition, ticket) {
            Decision::NoOp => Ok(ReconcileOutcome::Unchanged {
                pull_request: condition,
                ticket: self.policy.classify_ticket(ticket),
            }),
            Decision::Transition(request) => {
                let transition = self.applier.apply(ticket, &request, &allowed).await?;
                Ok(ReconcileOutcome::Transitioned {
                    pull_request: condition,
                    transition,
                    resolution: request.fields.resolution,
                })
            }
        }
    }

    /// Finds the linked pull request in the snapshot, fetching it on a miss.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteFetchError::Host`] when the direct fetch fails.
    pub async fn locate_pull_request<'s>(
        &self,
        link: &PullRequestLink,
        snapshot: &'s Snapshot,
    ) -> Result<Cow<'s, PullRequest>, RemoteFetchError> {
        if let Some(preloaded) = snapshot.find_pull_request(link) {
            return Ok(Cow::Borrowed(preloaded));
        }
        debug!(pull_request = %link, "pull request not preloaded, fetching");
        let fetched = self
            .host
            .pull_request(link.repository(), link.number())
            .await?;
        Ok(Cow::Owned(fetched))
    }

    /// Classifies a pull request: merged, then closed, then reviewed.
    ///
    /// The review label is only looked up for open pull requests, from the
    /// snapshot first and the code host on a miss.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteFetchError::Host`] when the issue record cannot be
    /// fetched.
    pub async fn classify_pull_request(
        &self,
        pull_request: &PullRequest,
        snapshot: &Snapshot,
    ) -> Result<PullRequestCondition, RemoteFetchError> {
        let state = pull_request.state();
        if state != PullRequestState::Open {
            return Ok(PullRequestCondition::classify(state, false));
        }

        let label = self.policy.approved_label.as_str();
        if let Some(issue) = snapshot.find_issue(pull_request.repository(), pull_request.number())
        {
            return Ok(PullRequestCondition::classify(state, issue.has_label(label)));
        }
        let issue = self
            .host
            .issue(pull_request.repository(), pull_request.number())
            .await?;
        Ok(PullRequestCondition::classify(state, issue.has_label(label)))
    }
}
