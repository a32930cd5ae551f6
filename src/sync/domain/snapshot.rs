//! Read-only working set fetched once at the start of a run.

use super::{HostIssue, IssueNumber, PullRequest, PullRequestLink, RepositoryRef, Ticket};

/// Tickets, pull requests, and issue records loaded for one run.
///
/// Reconciliation tasks share a snapshot by reference and never mutate it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    repository: RepositoryRef,
    tickets: Vec<Ticket>,
    pull_requests: Vec<PullRequest>,
    issues: Vec<HostIssue>,
}

impl Snapshot {
    /// Creates a snapshot for the target repository.
    #[must_use]
    pub const fn new(
        repository: RepositoryRef,
        tickets: Vec<Ticket>,
        pull_requests: Vec<PullRequest>,
        issues: Vec<HostIssue>,
    ) -> Self {
        Self {
            repository,
            tickets,
            pull_requests,
            issues,
        }
    }

    /// Creates a snapshot with nothing preloaded.
    #[must_use]
    pub const fn empty(repository: RepositoryRef) -> Self {
        Self::new(repository, Vec::new(), Vec::new(), Vec::new())
    }

    /// Returns the repository pull requests and issues were preloaded from.
    #[must_use]
    pub const fn repository(&self) -> &RepositoryRef {
        &self.repository
    }

    /// Returns the open linked tickets.
    #[must_use]
    pub fn tickets(&self) -> &[Ticket] {
        &self.tickets
    }

    /// Returns the preloaded pull requests.
    #[must_use]
    pub fn pull_requests(&self) -> &[PullRequest] {
        &self.pull_requests
    }

    /// Returns the preloaded issue records.
    #[must_use]
    pub fn issues(&self) -> &[HostIssue] {
        &self.issues
    }

    /// Finds the preloaded pull request a link points at.
    #[must_use]
    pub fn find_pull_request(&self, link: &PullRequestLink) -> Option<&PullRequest> {
        self.pull_requests
            .iter()
            .find(|pull_request| pull_request.is_target_of(link))
    }

    /// Finds the preloaded issue record for a pull request number.
    ///
    /// Only the target repository is preloaded, so lookups for other
    /// repositories always miss.
    #[must_use]
    pub fn find_issue(&self, repository: &RepositoryRef, number: IssueNumber) -> Option<&HostIssue> {
        if !self.repository.matches(repository) {
            return None;
        }
        self.issues.iter().find(|issue| issue.number() == number)
    }
}
