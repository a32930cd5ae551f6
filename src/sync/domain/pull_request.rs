//! Code-host pull request and issue records.

use super::{IssueNumber, PullRequestLink, RepositoryRef};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Merge lifecycle of a pull request, ignoring review state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PullRequestState {
    /// Merged into its base branch.
    Merged,
    /// Closed without being merged.
    ClosedWithoutMerge,
    /// Still open.
    Open,
}

/// Pull request as read from the code host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    repository: RepositoryRef,
    number: IssueNumber,
    html_url: String,
    author: String,
    title: String,
    body: Option<String>,
    merged: Option<bool>,
    merged_at: Option<DateTime<Utc>>,
    closed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

/// Parameter object for building a [`PullRequest`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestData {
    /// Repository holding the pull request.
    pub repository: RepositoryRef,
    /// Pull request number.
    pub number: IssueNumber,
    /// Browser URL, the value stored in ticket link fields.
    pub html_url: String,
    /// Author login.
    pub author: String,
    /// Title.
    pub title: String,
    /// Body text, absent when the author left it empty.
    pub body: Option<String>,
    /// Explicit merged flag; list endpoints omit it.
    pub merged: Option<bool>,
    /// Merge timestamp.
    pub merged_at: Option<DateTime<Utc>>,
    /// Close timestamp, set for both merged and abandoned pull requests.
    pub closed_at: Option<DateTime<Utc>>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl PullRequest {
    /// Builds a pull request from code-host data.
    #[must_use]
    pub fn from_data(data: PullRequestData) -> Self {
        Self {
            repository: data.repository,
            number: data.number,
            html_url: data.html_url,
            author: data.author,
            title: data.title,
            body: data.body,
            merged: data.merged,
            merged_at: data.merged_at,
            closed_at: data.closed_at,
            created_at: data.created_at,
        }
    }

    /// Returns the repository holding the pull request.
    #[must_use]
    pub const fn repository(&self) -> &RepositoryRef {
        &self.repository
    }

    /// Returns the pull request number.
    #[must_use]
    pub const fn number(&self) -> IssueNumber {
        self.number
    }

    /// Returns the browser URL.
    #[must_use]
    pub fn html_url(&self) -> &str {
        &self.html_url
    }

    /// Returns the author login.
    #[must_use]
    pub fn author(&self) -> &str {
        &self.author
    }

    /// Returns the title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the body text.
    #[must_use]
    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    /// Returns the close timestamp.
    #[must_use]
    pub const fn closed_at(&self) -> Option<DateTime<Utc>> {
        self.closed_at
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns whether the pull request has been merged.
    ///
    /// The explicit flag wins when the host reported one; otherwise a merge
    /// timestamp is taken as proof of merge.
    #[must_use]
    pub fn is_merged(&self) -> bool {
        self.merged.unwrap_or(self.merged_at.is_some())
    }

    /// Classifies the merge lifecycle. Merged takes precedence over closed.
    #[must_use]
    pub fn state(&self) -> PullRequestState {
        if self.is_merged() {
            PullRequestState::Merged
        } else if self.closed_at.is_some() {
            PullRequestState::ClosedWithoutMerge
        } else {
            PullRequestState::Open
        }
    }

    /// Returns whether `link` addresses this pull request.
    #[must_use]
    pub fn is_target_of(&self, link: &PullRequestLink) -> bool {
        self.number == link.number() && self.repository.matches(link.repository())
    }
}

/// Issue record the code host keeps for every pull request.
///
/// Labels live on the issue record, so the review signal is read here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostIssue {
    repository: RepositoryRef,
    number: IssueNumber,
    labels: Vec<String>,
}

impl HostIssue {
    /// Creates an issue record.
    #[must_use]
    pub fn new(
        repository: RepositoryRef,
        number: IssueNumber,
        labels: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            repository,
            number,
            labels: labels.into_iter().collect(),
        }
    }

    /// Returns the repository holding the issue.
    #[must_use]
    pub const fn repository(&self) -> &RepositoryRef {
        &self.repository
    }

    /// Returns the issue number.
    #[must_use]
    pub const fn number(&self) -> IssueNumber {
        self.number
    }

    /// Returns the label names.
    #[must_use]
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Returns whether the issue carries `label` (case-insensitive).
    #[must_use]
    pub fn has_label(&self, label: &str) -> bool {
        self.labels
            .iter()
            .any(|candidate| candidate.eq_ignore_ascii_case(label))
    }
}
