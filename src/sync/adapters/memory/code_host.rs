//! In-memory code host for sync tests.

use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::sync::{
    domain::{HostIssue, IssueNumber, PullRequest, RepositoryRef},
    ports::{CodeHost, CodeHostError, CodeHostResult, IssueFilter, Page, PageRequest},
};

/// Operations that can be made to fail on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HostOperation {
    /// [`CodeHost::list_issues`].
    ListIssues,
    /// [`CodeHost::list_pull_requests`].
    ListPullRequests,
    /// [`CodeHost::pull_request`].
    PullRequest,
    /// [`CodeHost::issue`].
    Issue,
}

/// Thread-safe in-memory code host.
///
/// Issue records remember their creator so creator filters behave like the
/// real listing endpoint.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCodeHost {
    state: Arc<RwLock<InMemoryHostState>>,
}

#[derive(Debug, Default)]
struct InMemoryHostState {
    pull_requests: Vec<PullRequest>,
    issues: Vec<(String, HostIssue)>,
    failures: BTreeSet<HostOperation>,
    direct_fetches: Vec<(HostOperation, IssueNumber)>,
}

impl InMemoryCodeHost {
    /// Creates an empty code host.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> CodeHostResult<RwLockReadGuard<'_, InMemoryHostState>> {
        self.state
            .read()
            .map_err(|err| CodeHostError::transport(std::io::Error::other(err.to_string())))
    }

    fn write(&self) -> CodeHostResult<RwLockWriteGuard<'_, InMemoryHostState>> {
        self.state
            .write()
            .map_err(|err| CodeHostError::transport(std::io::Error::other(err.to_string())))
    }

    /// Stores a pull request together with its label-less issue record.
    ///
    /// # Errors
    ///
    /// Returns a transport error when lock acquisition fails.
    pub fn insert_pull_request(&self, pull_request: PullRequest) -> CodeHostResult<()> {
        self.insert_labelled_pull_request(pull_request, Vec::new())
    }

    /// Stores a pull request whose issue record carries `labels`.
    ///
    /// # Errors
    ///
    /// Returns a transport error when lock acquisition fails.
    pub fn insert_labelled_pull_request(
        &self,
        pull_request: PullRequest,
        labels: Vec<String>,
    ) -> CodeHostResult<()> {
        let mut state = self.write()?;
        let issue = HostIssue::new(
            pull_request.repository().clone(),
            pull_request.number(),
            labels,
        );
        state.issues.retain(|(_, existing)| {
            !(existing.number() == issue.number()
                && existing.repository().matches(issue.repository()))
        });
        state
            .issues
            .push((pull_request.author().to_owned(), issue));
        state.pull_requests.retain(|existing| {
            !(existing.number() == pull_request.number()
                && existing.repository().matches(pull_request.repository()))
        });
        state.pull_requests.push(pull_request);
        Ok(())
    }

    /// Makes every subsequent call to `operation` fail with a 502 status.
    ///
    /// # Errors
    ///
    /// Returns a transport error when lock acquisition fails.
    pub fn fail_on(&self, operation: HostOperation) -> CodeHostResult<()> {
        self.write()?.failures.insert(operation);
        Ok(())
    }

    /// Returns single-item fetches in the order they were made.
    ///
    /// # Errors
    ///
    /// Returns a transport error when lock acquisition fails.
    pub fn direct_fetches(&self) -> CodeHostResult<Vec<(HostOperation, IssueNumber)>> {
        Ok(self.read()?.direct_fetches.clone())
    }
}

impl InMemoryHostState {
    fn check(&self, operation: HostOperation) -> CodeHostResult<()> {
        if self.failures.contains(&operation) {
            return Err(CodeHostError::Status {
                status: 502,
                body: format!("injected failure for {operation:?}"),
            });
        }
        Ok(())
    }
}

/// Slices `items` into a page; the cursor is a 1-based page number.
fn paginate<T: Clone>(items: &[T], page: PageRequest) -> Page<T> {
    let size = page.size.max(1) as usize;
    let number = page.cursor.unwrap_or(1).max(1);
    let start = (number as usize).saturating_sub(1).saturating_mul(size);
    let slice: Vec<T> = items.iter().skip(start).take(size).cloned().collect();
    let has_more = start.saturating_add(slice.len()) < items.len();
    Page::new(slice, has_more.then(|| number.saturating_add(1)))
}

fn not_found(repository: &RepositoryRef, number: IssueNumber) -> CodeHostError {
    CodeHostError::Status {
        status: 404,
        body: format!("{repository}#{number} does not exist"),
    }
}

#[async_trait]
impl CodeHost for InMemoryCodeHost {
    async fn list_issues(
        &self,
        repository: &RepositoryRef,
        filter: &IssueFilter,
        page: PageRequest,
    ) -> CodeHostResult<Page<HostIssue>> {
        let state = self.read()?;
        state.check(HostOperation::ListIssues)?;
        let matching: Vec<HostIssue> = state
            .issues
            .iter()
            .filter(|(creator, issue)| {
                issue.repository().matches(repository)
                    && filter
                        .creator
                        .as_deref()
                        .is_none_or(|wanted| wanted.eq_ignore_ascii_case(creator))
                    && filter.labels.iter().all(|label| issue.has_label(label))
            })
            .map(|(_, issue)| issue.clone())
            .collect();
        Ok(paginate(&matching, page))
    }

    async fn list_pull_requests(
        &self,
        repository: &RepositoryRef,
        page: PageRequest,
    ) -> CodeHostResult<Page<PullRequest>> {
        let state = self.read()?;
        state.check(HostOperation::ListPullRequests)?;
        let matching: Vec<PullRequest> = state
            .pull_requests
            .iter()
            .filter(|pull_request| pull_request.repository().matches(repository))
            .cloned()
            .collect();
        Ok(paginate(&matching, page))
    }

    async fn pull_request(
        &self,
        repository: &RepositoryRef,
        number: IssueNumber,
    ) -> CodeHostResult<PullRequest> {
        let mut state = self.write()?;
        state
            .direct_fetches
            .push((HostOperation::PullRequest, number));
        state.check(HostOperation::PullRequest)?;
        state
            .pull_requests
            .iter()
            .find(|pull_request| {
                pull_request.number() == number && pull_request.repository().matches(repository)
            })
            .cloned()
            .ok_or_else(|| not_found(repository, number))
    }

    async fn issue(
        &self,
        repository: &RepositoryRef,
        number: IssueNumber,
    ) -> CodeHostResult<HostIssue> {
        let mut state = self.write()?;
        state.direct_fetches.push((HostOperation::Issue, number));
        state.check(HostOperation::Issue)?;
        state
            .issues
            .iter()
            .map(|(_, issue)| issue)
            .find(|issue| issue.number() == number && issue.repository().matches(repository))
            .cloned()
            .ok_or_else(|| not_found(repository, number))
    }
}
