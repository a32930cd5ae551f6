//! In-memory issue tracker for sync tests and local dry runs.

use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::sync::{
    domain::{
        CreatedTicket, Iteration, NewTicket, Ticket, TicketId, TicketKey, TicketQuery, Transition,
        TransitionFields,
    },
    ports::{IssueTracker, IssueTrackerError, IssueTrackerResult, Page, PageRequest},
};

/// Operations that can be made to fail on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TrackerOperation {
    /// [`IssueTracker::search`].
    Search,
    /// [`IssueTracker::custom_fields`].
    CustomFields,
    /// [`IssueTracker::transitions`].
    Transitions,
    /// [`IssueTracker::apply_transition`].
    ApplyTransition,
    /// [`IssueTracker::create_ticket`].
    CreateTicket,
    /// [`IssueTracker::iterations`].
    Iterations,
    /// [`IssueTracker::add_to_iteration`].
    AddToIteration,
}

/// Workflow edge available from a set of statuses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowEdge {
    /// Transition exposed to callers.
    pub transition: Transition,
    /// Statuses the transition is offered from; empty means every status.
    pub from: Vec<String>,
    /// Status the ticket lands in.
    pub to: String,
}

impl WorkflowEdge {
    /// Creates an edge offered from every status.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            transition: Transition::new(id, name),
            from: Vec::new(),
            to: to.into(),
        }
    }

    /// Restricts the edge to the given source statuses.
    #[must_use]
    pub fn from_statuses<I, S>(mut self, statuses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.from = statuses.into_iter().map(Into::into).collect();
        self
    }

    fn offered_from(&self, status: &str) -> bool {
        self.from.is_empty() || self.from.iter().any(|from| from == status)
    }
}

/// Remote mutation recorded by the in-memory tracker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackerMutation {
    /// A transition was executed.
    Transitioned {
        /// Ticket moved.
        ticket: TicketKey,
        /// Transition name executed.
        transition: String,
        /// Resolution submitted with it.
        resolution: Option<String>,
    },
    /// A ticket was created.
    Created {
        /// New ticket key.
        ticket: TicketKey,
        /// Link written to the link field.
        link: String,
    },
    /// Tickets were moved into an iteration.
    AddedToIteration {
        /// Iteration identifier.
        iteration_id: u64,
        /// Tickets moved.
        tickets: Vec<TicketKey>,
    },
}

/// Thread-safe in-memory issue tracker.
///
/// Tickets move through a configurable workflow so repeated runs observe
/// the effect of earlier transitions.
#[derive(Debug, Clone)]
pub struct InMemoryIssueTracker {
    state: Arc<RwLock<InMemoryTrackerState>>,
}

#[derive(Debug)]
struct InMemoryTrackerState {
    project_key: String,
    tickets: BTreeMap<TicketId, StoredTicket>,
    workflow: Vec<WorkflowEdge>,
    iterations: Vec<Iteration>,
    failures: BTreeSet<TrackerOperation>,
    mutations: Vec<TrackerMutation>,
    searches: Vec<TicketQuery>,
    next_id: u64,
}

#[derive(Debug, Clone)]
struct StoredTicket {
    ticket: Ticket,
    link: Option<String>,
    assignee: Option<String>,
    summary: Option<String>,
}

impl Default for InMemoryIssueTracker {
    fn default() -> Self {
        Self::new("SYNC")
    }
}

impl InMemoryIssueTracker {
    /// Creates an empty tracker whose generated tickets use `project_key`.
    #[must_use]
    pub fn new(project_key: impl Into<String>) -> Self {
        Self {
            state: Arc::new(RwLock::new(InMemoryTrackerState {
                project_key: project_key.into(),
                tickets: BTreeMap::new(),
                workflow: Vec::new(),
                iterations: Vec::new(),
                failures: BTreeSet::new(),
                mutations: Vec::new(),
                searches: Vec::new(),
                next_id: 10_000,
            })),
        }
    }

    fn read(&self) -> IssueTrackerResult<RwLockReadGuard<'_, InMemoryTrackerState>> {
        self.state
            .read()
            .map_err(|err| IssueTrackerError::transport(std::io::Error::other(err.to_string())))
    }

    fn write(&self) -> IssueTrackerResult<RwLockWriteGuard<'_, InMemoryTrackerState>> {
        self.state
            .write()
            .map_err(|err| IssueTrackerError::transport(std::io::Error::other(err.to_string())))
    }

    /// Stores a ticket. The link is taken from [`Ticket::link`].
    ///
    /// # Errors
    ///
    /// Returns a transport error when lock acquisition fails.
    pub fn insert_ticket(&self, ticket: Ticket) -> IssueTrackerResult<()> {
        let mut state = self.write()?;
        let link = ticket.link().map(str::to_owned);
        state.tickets.insert(
            ticket.id().clone(),
            StoredTicket {
                ticket,
                link,
                assignee: None,
                summary: None,
            },
        );
        Ok(())
    }

    /// Adds a workflow edge.
    ///
    /// # Errors
    ///
    /// Returns a transport error when lock acquisition fails.
    pub fn add_workflow_edge(&self, edge: WorkflowEdge) -> IssueTrackerResult<()> {
        self.write()?.workflow.push(edge);
        Ok(())
    }

    /// Replaces the board's iterations.
    ///
    /// # Errors
    ///
    /// Returns a transport error when lock acquisition fails.
    pub fn set_iterations(&self, iterations: Vec<Iteration>) -> IssueTrackerResult<()> {
        self.write()?.iterations = iterations;
        Ok(())
    }

    /// Makes every subsequent call to `operation` fail with a 500 status.
    ///
    /// # Errors
    ///
    /// Returns a transport error when lock acquisition fails.
    pub fn fail_on(&self, operation: TrackerOperation) -> IssueTrackerResult<()> {
        self.write()?.failures.insert(operation);
        Ok(())
    }

    /// Returns the current status of a ticket by key.
    ///
    /// # Errors
    ///
    /// Returns a transport error when lock acquisition fails.
    pub fn status_of(&self, key: &TicketKey) -> IssueTrackerResult<Option<String>> {
        Ok(self
            .read()?
            .tickets
            .values()
            .find(|stored| stored.ticket.key() == key)
            .map(|stored| stored.ticket.status().to_owned()))
    }

    /// Returns the assignee recorded for a generated ticket.
    ///
    /// # Errors
    ///
    /// Returns a transport error when lock acquisition fails.
    pub fn assignee_of(&self, key: &TicketKey) -> IssueTrackerResult<Option<String>> {
        Ok(self
            .read()?
            .tickets
            .values()
            .find(|stored| stored.ticket.key() == key)
            .and_then(|stored| stored.assignee.clone()))
    }

    /// Returns the summary recorded for a generated ticket.
    ///
    /// # Errors
    ///
    /// Returns a transport error when lock acquisition fails.
    pub fn summary_of(&self, key: &TicketKey) -> IssueTrackerResult<Option<String>> {
        Ok(self
            .read()?
            .tickets
            .values()
            .find(|stored| stored.ticket.key() == key)
            .and_then(|stored| stored.summary.clone()))
    }

    /// Returns every mutation in the order it was applied.
    ///
    /// # Errors
    ///
    /// Returns a transport error when lock acquisition fails.
    pub fn mutations(&self) -> IssueTrackerResult<Vec<TrackerMutation>> {
        Ok(self.read()?.mutations.clone())
    }

    /// Returns every search query in the order it was received.
    ///
    /// # Errors
    ///
    /// Returns a transport error when lock acquisition fails.
    pub fn searches(&self) -> IssueTrackerResult<Vec<TicketQuery>> {
        Ok(self.read()?.searches.clone())
    }
}

impl InMemoryTrackerState {
    fn check(&self, operation: TrackerOperation) -> IssueTrackerResult<()> {
        if self.failures.contains(&operation) {
            return Err(IssueTrackerError::Status {
                status: 500,
                body: format!("injected failure for {operation:?}"),
            });
        }
        Ok(())
    }

    fn stored(&self, id: &TicketId) -> IssueTrackerResult<&StoredTicket> {
        self.tickets.get(id).ok_or_else(|| not_found(id))
    }
}

fn not_found(id: &TicketId) -> IssueTrackerError {
    IssueTrackerError::Status {
        status: 404,
        body: format!("ticket {id} does not exist"),
    }
}

fn matches_query(stored: &StoredTicket, query: &TicketQuery) -> bool {
    match query {
        TicketQuery::OpenLinked { excluded_statuses } => {
            stored.link.is_some()
                && !excluded_statuses
                    .iter()
                    .any(|status| status == stored.ticket.status())
        }
        TicketQuery::LinkedTo { url } => stored
            .link
            .as_deref()
            .is_some_and(|link| link.trim_matches('/') == url.trim_matches('/')),
    }
}

#[async_trait]
impl IssueTracker for InMemoryIssueTracker {
    async fn search(
        &self,
        query: &TicketQuery,
        page: PageRequest,
    ) -> IssueTrackerResult<Page<Ticket>> {
        let mut state = self.write()?;
        state.searches.push(query.clone());
        state.check(TrackerOperation::Search)?;

        let matching: Vec<Ticket> = state
            .tickets
            .values()
            .filter(|stored| matches_query(stored, query))
            .map(|stored| stored.ticket.clone())
            .collect();
        let start = page.cursor.unwrap_or(0) as usize;
        let size = page.size.max(1) as usize;
        let items: Vec<Ticket> = matching.iter().skip(start).take(size).cloned().collect();
        let end = start.saturating_add(items.len());
        let next = (end < matching.len())
            .then(|| u32::try_from(end).ok())
            .flatten();
        Ok(Page::new(items, next))
    }

    async fn custom_fields(
        &self,
        ticket: &TicketId,
    ) -> IssueTrackerResult<BTreeMap<String, String>> {
        let state = self.read()?;
        state.check(TrackerOperation::CustomFields)?;
        let stored = state.stored(ticket)?;
        Ok(stored
            .link
            .iter()
            .map(|link| (super::LINK_FIELD_ID.to_owned(), link.clone()))
            .collect())
    }

    async fn transitions(&self, ticket: &TicketId) -> IssueTrackerResult<Vec<Transition>> {
        let state = self.read()?;
        state.check(TrackerOperation::Transitions)?;
        let status = state.stored(ticket)?.ticket.status().to_owned();
        Ok(state
            .workflow
            .iter()
            .filter(|edge| edge.offered_from(&status))
            .map(|edge| edge.transition.clone())
            .collect())
    }

    async fn apply_transition(
        &self,
        ticket: &TicketId,
        transition_id: &str,
        fields: &TransitionFields,
    ) -> IssueTrackerResult<()> {
        let mut state = self.write()?;
        state.check(TrackerOperation::ApplyTransition)?;
        let stored = state.stored(ticket)?.clone();
        let edge = state
            .workflow
            .iter()
            .find(|edge| {
                edge.transition.id == transition_id && edge.offered_from(stored.ticket.status())
            })
            .cloned()
            .ok_or_else(|| IssueTrackerError::Status {
                status: 400,
                body: format!("transition {transition_id} is not valid for {ticket}"),
            })?;

        let moved = Ticket::new(
            stored.ticket.id().clone(),
            stored.ticket.key().clone(),
            edge.to.clone(),
            stored.ticket.issue_type(),
        );
        let moved = match stored.link.as_deref() {
            Some(link) => moved.with_link(link),
            None => moved,
        };
        state.mutations.push(TrackerMutation::Transitioned {
            ticket: moved.key().clone(),
            transition: edge.transition.name.clone(),
            resolution: fields.resolution.clone(),
        });
        state.tickets.insert(
            ticket.clone(),
            StoredTicket {
                ticket: moved,
                ..stored
            },
        );
        Ok(())
    }

    async fn create_ticket(&self, ticket: &NewTicket) -> IssueTrackerResult<CreatedTicket> {
        let mut state = self.write()?;
        state.check(TrackerOperation::CreateTicket)?;
        state.next_id = state.next_id.saturating_add(1);
        let id = TicketId::new(state.next_id.to_string());
        let key = TicketKey::new(format!("{}-{}", state.project_key, state.next_id));

        let stored = StoredTicket {
            ticket: Ticket::new(id.clone(), key.clone(), "To Do", ticket.issue_type.clone())
                .with_link(ticket.link.clone()),
            link: Some(ticket.link.clone()),
            assignee: ticket.assignee.clone(),
            summary: Some(ticket.summary.clone()),
        };
        state.tickets.insert(id.clone(), stored);
        state.mutations.push(TrackerMutation::Created {
            ticket: key.clone(),
            link: ticket.link.clone(),
        });
        Ok(CreatedTicket { id, key })
    }

    async fn iterations(&self, _board_id: &str) -> IssueTrackerResult<Vec<Iteration>> {
        let state = self.read()?;
        state.check(TrackerOperation::Iterations)?;
        Ok(state.iterations.clone())
    }

    async fn add_to_iteration(
        &self,
        iteration_id: u64,
        tickets: &[TicketKey],
    ) -> IssueTrackerResult<()> {
        let mut state = self.write()?;
        state.check(TrackerOperation::AddToIteration)?;
        state.mutations.push(TrackerMutation::AddedToIteration {
            iteration_id,
            tickets: tickets.to_vec(),
        });
        Ok(())
    }
}
