//! Snapshot loading: the paginated reads performed once per run.

use crate::sync::{
    domain::{HostIssue, PullRequest, RepositoryRef, Snapshot, Ticket, TicketQuery},
    ports::{CodeHost, IssueFilter, IssueTracker, Page, PageRequest},
};
use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

use super::RemoteFetchError;

/// Parameters describing which working set to load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotRequest {
    /// Repository whose pull requests and issues are preloaded.
    pub repository: RepositoryRef,
    /// Logins whose pull requests are tracked.
    pub users: BTreeSet<String>,
    /// Labels the issue listing is filtered by.
    pub labels: Vec<String>,
    /// Statuses excluded from the ticket search.
    pub excluded_statuses: Vec<String>,
    /// Page size for tracker searches.
    pub ticket_page_size: u32,
    /// Page size for code-host listings.
    pub host_page_size: u32,
}

/// Error returned when a snapshot cannot be loaded.
#[derive(Debug, Clone, Error)]
#[error("failed to load {what}: {source}")]
pub struct SnapshotError {
    /// Which part of the snapshot failed.
    pub what: &'static str,
    /// Underlying fetch failure.
    #[source]
    pub source: RemoteFetchError,
}

/// Loads the read-only snapshot a run works from.
///
/// Every listing walks pages until the collaborator reports no further
/// page and fails fast on the first page error; nothing partial is
/// returned.
#[derive(Clone)]
pub struct SnapshotLoader<T, H>
where
    T: IssueTracker,
    H: CodeHost,
{
    tracker: Arc<T>,
    host: Arc<H>,
}

impl<T, H> SnapshotLoader<T, H>
where
    T: IssueTracker,
    H: CodeHost,
{
    /// Creates a loader over both collaborators.
    #[must_use]
    pub const fn new(tracker: Arc<T>, host: Arc<H>) -> Self {
        Self { tracker, host }
    }

    /// Loads tickets, issue records, and pull requests, in that order.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError`] naming the first listing that failed.
    pub async fn load(&self, request: &SnapshotRequest) -> Result<Snapshot, SnapshotError> {
        let tickets = self
            .open_linked_tickets(&request.excluded_statuses, request.ticket_page_size)
            .await
            .map_err(|source| SnapshotError {
                what: "open linked tickets",
                source,
            })?;
        let issues = self
            .tracked_issues(request)
            .await
            .map_err(|source| SnapshotError {
                what: "tracked issues",
                source,
            })?;
        let pull_requests = self
            .tracked_pull_requests(request)
            .await
            .map_err(|source| SnapshotError {
                what: "tracked pull requests",
                source,
            })?;

        info!(
            tickets = tickets.len(),
            issues = issues.len(),
            pull_requests = pull_requests.len(),
            repository = %request.repository,
            "snapshot loaded"
        );
        Ok(Snapshot::new(
            request.repository.clone(),
            tickets,
            pull_requests,
            issues,
        ))
    }

    /// Returns every ticket with a link whose status is not excluded.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteFetchError::Tracker`] on the first failed page.
    pub async fn open_linked_tickets(
        &self,
        excluded_statuses: &[String],
        page_size: u32,
    ) -> Result<Vec<Ticket>, RemoteFetchError> {
        let query = TicketQuery::OpenLinked {
            excluded_statuses: excluded_statuses.to_vec(),
        };
        collect_pages(page_size, |page| self.tracker.search(&query, page))
            .await
            .map_err(RemoteFetchError::from)
    }

    /// Returns open issue records created by any tracked user.
    ///
    /// The listing is filtered by creator on the host, one user at a time.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteFetchError::Host`] on the first failed page.
    pub async fn tracked_issues(
        &self,
        request: &SnapshotRequest,
    ) -> Result<Vec<HostIssue>, RemoteFetchError> {
        let mut issues = Vec::new();
        for user in &request.users {
            let filter = IssueFilter::by_creator(user.as_str(), &request.labels);
            let page = collect_pages(request.host_page_size, |page| {
                self.host.list_issues(&request.repository, &filter, page)
            })
            .await?;
            debug!(user = %user, issues = page.len(), "loaded issues for user");
            issues.extend(page);
        }
        Ok(issues)
    }

    /// Returns open pull requests authored by any tracked user.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteFetchError::Host`] on the first failed page.
    pub async fn tracked_pull_requests(
        &self,
        request: &SnapshotRequest,
    ) -> Result<Vec<PullRequest>, RemoteFetchError> {
        let all = collect_pages(request.host_page_size, |page| {
            self.host.list_pull_requests(&request.repository, page)
        })
        .await?;
        Ok(all
            .into_iter()
            .filter(|pull_request| {
                request
                    .users
                    .iter()
                    .any(|user| user.eq_ignore_ascii_case(pull_request.author()))
            })
            .collect())
    }
}

/// Walks a paginated listing to the end.
///
/// Stops when the collaborator reports no next page or hands back the
/// cursor it was just given.
pub(crate) async fn collect_pages<T, E, F, Fut>(page_size: u32, mut fetch: F) -> Result<Vec<T>, E>
where
    F: FnMut(PageRequest) -> Fut,
    Fut: Future<Output = Result<Page<T>, E>>,
{
    let mut items = Vec::new();
    let mut request = PageRequest::first(page_size);
    loop {
        let page = fetch(request).await?;
        items.extend(page.items);
        match page.next {
            Some(next) if request.cursor != Some(next) => {
                request = PageRequest::at(page_size, next);
            }
            _ => return Ok(items),
        }
    }
}
