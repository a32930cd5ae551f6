//! Ticket generation for pull requests no ticket links to.

use crate::sync::{
    domain::{Iteration, LinkKey, NewTicket, PullRequest, TicketKey, TicketQuery},
    ports::{IssueTracker, IssueTrackerError, PageRequest},
};
use chrono::{DateTime, TimeDelta, Utc};
use minijinja::Environment;
use mockable::Clock;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// Static inputs to ticket generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorSettings {
    /// Project new tickets are created in.
    pub project_key: String,
    /// Issue type of new tickets.
    pub issue_type: String,
    /// Pull requests must be strictly older than this to get a ticket.
    pub min_age: TimeDelta,
    /// Code-host login to tracker account mapping.
    pub user_mapping: BTreeMap<String, String>,
    /// Team metadata attached to new tickets.
    pub team_id: Option<String>,
    /// Board whose active iteration receives new tickets.
    pub board_id: String,
    /// `minijinja` template for the ticket summary.
    pub summary_template: String,
    /// `minijinja` template for the ticket description.
    pub description_template: String,
}

impl GeneratorSettings {
    /// Creates settings with the default templates and no user mapping.
    #[must_use]
    pub fn new(
        project_key: impl Into<String>,
        issue_type: impl Into<String>,
        board_id: impl Into<String>,
        min_age: TimeDelta,
    ) -> Self {
        Self {
            project_key: project_key.into(),
            issue_type: issue_type.into(),
            min_age,
            user_mapping: BTreeMap::new(),
            team_id: None,
            board_id: board_id.into(),
            summary_template: "{{ title }}".to_owned(),
            description_template: "{{ body }}".to_owned(),
        }
    }

    /// Maps a code-host login to a tracker account.
    #[must_use]
    pub fn with_user(mut self, login: impl Into<String>, account: impl Into<String>) -> Self {
        self.user_mapping.insert(login.into(), account.into());
        self
    }

    /// Attaches team metadata to generated tickets.
    #[must_use]
    pub fn with_team(mut self, team_id: impl Into<String>) -> Self {
        self.team_id = Some(team_id.into());
        self
    }

    /// Replaces both templates.
    #[must_use]
    pub fn with_templates(
        mut self,
        summary: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        self.summary_template = summary.into();
        self.description_template = description.into();
        self
    }
}

/// Errors that stop generation for one pull request.
#[derive(Debug, Clone, Error)]
pub enum GenerateError {
    /// The duplicate-guard search failed; creation was not attempted.
    #[error("duplicate check for {link} failed: {source}")]
    DuplicateCheck {
        /// Pull request URL.
        link: String,
        /// Tracker failure.
        #[source]
        source: IssueTrackerError,
    },

    /// Ticket creation failed.
    #[error("creating a ticket for {link} failed: {source}")]
    Create {
        /// Pull request URL.
        link: String,
        /// Tracker failure.
        #[source]
        source: IssueTrackerError,
    },

    /// The ticket exists but could not be added to the iteration.
    #[error("adding {created} to iteration {iteration} failed: {source}")]
    AddToIteration {
        /// Ticket that was created.
        created: TicketKey,
        /// Target iteration.
        iteration: u64,
        /// Tracker failure.
        #[source]
        source: IssueTrackerError,
    },

    /// A summary or description template failed to render.
    #[error("rendering the {field} for {link} failed: {reason}")]
    Template {
        /// Pull request URL.
        link: String,
        /// `summary` or `description`.
        field: &'static str,
        /// Renderer message.
        reason: String,
    },
}

/// What generation did for a pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerateOutcome {
    /// A ticket was created and added to the iteration.
    Created {
        /// New ticket key.
        ticket: TicketKey,
        /// Iteration it was added to.
        iteration: u64,
    },
    /// A ticket already links to the pull request.
    DuplicateSkipped {
        /// Existing ticket key.
        existing: TicketKey,
    },
}

/// Per-pull-request result of a run.
#[derive(Debug, Clone)]
pub struct PullRequestReport {
    /// Pull request URL.
    pub link: String,
    /// Outcome or the error that stopped processing.
    pub result: Result<GenerateOutcome, GenerateError>,
}

/// Returns whether a pull request opened at `created_at` is strictly older
/// than `min_age` at `now`.
#[must_use]
pub fn is_old_enough(created_at: DateTime<Utc>, now: DateTime<Utc>, min_age: TimeDelta) -> bool {
    now.signed_duration_since(created_at) > min_age
}

/// Creates tickets for untracked pull requests.
#[derive(Clone)]
pub struct TicketGenerator<T, C>
where
    T: IssueTracker,
    C: Clock + Send + Sync,
{
    tracker: Arc<T>,
    clock: Arc<C>,
    settings: Arc<GeneratorSettings>,
}

impl<T, C> TicketGenerator<T, C>
where
    T: IssueTracker,
    C: Clock + Send + Sync,
{
    /// Creates a generator.
    #[must_use]
    pub const fn new(tracker: Arc<T>, clock: Arc<C>, settings: Arc<GeneratorSettings>) -> Self {
        Self {
            tracker,
            clock,
            settings,
        }
    }

    /// Returns the generator settings.
    #[must_use]
    pub fn settings(&self) -> &GeneratorSettings {
        &self.settings
    }

    /// Selects pull requests that need a ticket.
    ///
    /// A pull request qualifies when no ticket links to it and it is older
    /// than the configured minimum age. Pull requests sharing a link
    /// identity are reduced to the first occurrence.
    #[must_use]
    pub fn eligible<'a>(
        &self,
        pull_requests: &'a [PullRequest],
        linked: &BTreeSet<LinkKey>,
    ) -> Vec<&'a PullRequest> {
        let now = self.clock.utc();
        let mut seen = BTreeSet::new();
        pull_requests
            .iter()
            .filter(|pull_request| {
                let key = LinkKey::from_raw(pull_request.html_url());
                !linked.contains(&key)
                    && is_old_enough(pull_request.created_at(), now, self.settings.min_age)
                    && seen.insert(key)
            })
            .collect()
    }

    /// Returns the board's active iteration, if any.
    ///
    /// # Errors
    ///
    /// Returns [`IssueTrackerError`] when the iteration listing fails.
    pub async fn active_iteration(&self) -> Result<Option<Iteration>, IssueTrackerError> {
        let iterations = self.tracker.iterations(&self.settings.board_id).await?;
        Ok(Iteration::find_active(&iterations).cloned())
    }

    /// Generates a ticket for one pull request. Failures are logged and
    /// captured in the report.
    pub async fn generate(
        &self,
        pull_request: &PullRequest,
        iteration: &Iteration,
    ) -> PullRequestReport {
        let result = self.try_generate(pull_request, iteration).await;
        match &result {
            Ok(GenerateOutcome::Created { ticket, iteration }) => info!(
                ticket = %ticket,
                pull_request = pull_request.html_url(),
                iteration,
                "created ticket for pull request"
            ),
            Ok(GenerateOutcome::DuplicateSkipped { existing }) => info!(
                ticket = %existing,
                pull_request = pull_request.html_url(),
                "ticket already exists, skipping"
            ),
            Err(err) => warn!(
                pull_request = pull_request.html_url(),
                error = %err,
                "ticket generation failed"
            ),
        }
        PullRequestReport {
            link: pull_request.html_url().to_owned(),
            result,
        }
    }

    async fn try_generate(
        &self,
        pull_request: &PullRequest,
        iteration: &Iteration,
    ) -> Result<GenerateOutcome, GenerateError> {
        let link = pull_request.html_url();
        let new_ticket = self.new_ticket(pull_request)?;

        let query = TicketQuery::LinkedTo {
            url: link.to_owned(),
        };
        let existing = self
            .tracker
            .search(&query, PageRequest::first(1))
            .await
            .map_err(|source| GenerateError::DuplicateCheck {
                link: link.to_owned(),
                source,
            })?;
        if let Some(ticket) = existing.items.first() {
            return Ok(GenerateOutcome::DuplicateSkipped {
                existing: ticket.key().clone(),
            });
        }

        let created = self
            .tracker
            .create_ticket(&new_ticket)
            .await
            .map_err(|source| GenerateError::Create {
                link: link.to_owned(),
                source,
            })?;
        self.tracker
            .add_to_iteration(iteration.id, std::slice::from_ref(&created.key))
            .await
            .map_err(|source| GenerateError::AddToIteration {
                created: created.key.clone(),
                iteration: iteration.id,
                source,
            })?;

        Ok(GenerateOutcome::Created {
            ticket: created.key,
            iteration: iteration.id,
        })
    }

    /// Builds the creation payload for a pull request.
    ///
    /// # Errors
    ///
    /// Returns [`GenerateError::Template`] when a template fails to render.
    pub fn new_ticket(&self, pull_request: &PullRequest) -> Result<NewTicket, GenerateError> {
        let context = template_context(pull_request);
        let render = |field: &'static str, template: &str| {
            Environment::new()
                .render_str(template, &context)
                .map_err(|error| GenerateError::Template {
                    link: pull_request.html_url().to_owned(),
                    field,
                    reason: error.to_string(),
                })
        };

        let assignee = self.settings.user_mapping.get(pull_request.author()).cloned();
        if assignee.is_none() {
            warn!(
                author = pull_request.author(),
                pull_request = pull_request.html_url(),
                "no tracker account mapped for author, ticket will be unassigned"
            );
        }

        Ok(NewTicket {
            project_key: self.settings.project_key.clone(),
            issue_type: self.settings.issue_type.clone(),
            summary: render("summary", &self.settings.summary_template)?,
            description: render("description", &self.settings.description_template)?,
            link: pull_request.html_url().to_owned(),
            assignee,
            team_id: self.settings.team_id.clone(),
        })
    }
}

fn template_context(pull_request: &PullRequest) -> Map<String, Value> {
    let mut context = Map::new();
    context.insert("title".to_owned(), Value::from(pull_request.title()));
    context.insert(
        "body".to_owned(),
        Value::from(pull_request.body().unwrap_or_default()),
    );
    context.insert("url".to_owned(), Value::from(pull_request.html_url()));
    context.insert("author".to_owned(), Value::from(pull_request.author()));
    context.insert(
        "number".to_owned(),
        Value::from(pull_request.number().value()),
    );
    context
}
