//! Issue-tracker ticket types.

use super::{TicketId, TicketKey};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Ticket as read from the issue tracker.
///
/// The sync job never edits ticket fields; it only requests workflow
/// transitions, so the type exposes read accessors and builder-style
/// construction for adapters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    id: TicketId,
    key: TicketKey,
    status: String,
    issue_type: String,
    link: Option<String>,
    created_at: Option<DateTime<Utc>>,
}

impl Ticket {
    /// Creates a ticket with the fields every tracker response carries.
    #[must_use]
    pub fn new(
        id: TicketId,
        key: TicketKey,
        status: impl Into<String>,
        issue_type: impl Into<String>,
    ) -> Self {
        Self {
            id,
            key,
            status: status.into(),
            issue_type: issue_type.into(),
            link: None,
            created_at: None,
        }
    }

    /// Sets the pull request link held in the link field.
    ///
    /// Blank values are treated as an unset field.
    #[must_use]
    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        let value = link.into();
        let normalized = value.trim();
        self.link = (!normalized.is_empty()).then(|| normalized.to_owned());
        self
    }

    /// Sets the creation timestamp.
    #[must_use]
    pub const fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    /// Returns the tracker identifier.
    #[must_use]
    pub const fn id(&self) -> &TicketId {
        &self.id
    }

    /// Returns the human-readable key.
    #[must_use]
    pub const fn key(&self) -> &TicketKey {
        &self.key
    }

    /// Returns the workflow status name.
    #[must_use]
    pub fn status(&self) -> &str {
        &self.status
    }

    /// Returns the issue type name, for example `Bug`.
    #[must_use]
    pub fn issue_type(&self) -> &str {
        &self.issue_type
    }

    /// Returns the linked pull request URL when the search returned it.
    #[must_use]
    pub fn link(&self) -> Option<&str> {
        self.link.as_deref()
    }

    /// Returns the creation timestamp, if known.
    #[must_use]
    pub const fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }
}

/// Query shapes the sync job issues against the tracker.
///
/// Adapters render these into their own query language; the link field
/// name is adapter configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TicketQuery {
    /// Tickets with a non-empty link field whose status is not excluded.
    OpenLinked {
        /// Status names to leave out, typically the terminal set.
        excluded_statuses: Vec<String>,
    },
    /// Tickets whose link field equals `url`.
    LinkedTo {
        /// Pull request URL to look for.
        url: String,
    },
}

/// Payload for a ticket generated from an untracked pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewTicket {
    /// Project key the ticket is filed under.
    pub project_key: String,
    /// Issue type name.
    pub issue_type: String,
    /// One-line summary.
    pub summary: String,
    /// Long description.
    pub description: String,
    /// Pull request URL written to the link field.
    pub link: String,
    /// Tracker user to assign, if the author is mapped.
    pub assignee: Option<String>,
    /// Owning team identifier, if configured.
    pub team_id: Option<String>,
}

/// Identity of a ticket the tracker has just created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedTicket {
    /// Tracker identifier.
    pub id: TicketId,
    /// Human-readable key.
    pub key: TicketKey,
}
