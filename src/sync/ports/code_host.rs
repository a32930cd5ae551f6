//! Code-host port.

use super::{Page, PageRequest};
use crate::sync::domain::{HostIssue, IssueNumber, PullRequest, RepositoryRef};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for code-host operations.
pub type CodeHostResult<T> = Result<T, CodeHostError>;

/// Filter applied when listing issue records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IssueFilter {
    /// Only issues opened by this login.
    pub creator: Option<String>,
    /// Only issues carrying all of these labels.
    pub labels: Vec<String>,
}

impl IssueFilter {
    /// Filter for one creator and a label set.
    #[must_use]
    pub fn by_creator(creator: impl Into<String>, labels: &[String]) -> Self {
        Self {
            creator: Some(creator.into()),
            labels: labels.to_vec(),
        }
    }
}

/// Operations the sync job needs from the code host.
///
/// Each call is attempted once; adapters must not retry.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CodeHost: Send + Sync {
    /// Returns one page of open issue records (pull requests included).
    async fn list_issues(
        &self,
        repository: &RepositoryRef,
        filter: &IssueFilter,
        page: PageRequest,
    ) -> CodeHostResult<Page<HostIssue>>;

    /// Returns one page of open pull requests.
    async fn list_pull_requests(
        &self,
        repository: &RepositoryRef,
        page: PageRequest,
    ) -> CodeHostResult<Page<PullRequest>>;

    /// Fetches a single pull request.
    async fn pull_request(
        &self,
        repository: &RepositoryRef,
        number: IssueNumber,
    ) -> CodeHostResult<PullRequest>;

    /// Fetches the issue record of a pull request.
    async fn issue(
        &self,
        repository: &RepositoryRef,
        number: IssueNumber,
    ) -> CodeHostResult<HostIssue>;
}

/// Errors returned by code-host adapters.
#[derive(Debug, Clone, Error)]
pub enum CodeHostError {
    /// The host answered with a non-success status.
    #[error("code host returned {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, kept for diagnostics.
        body: String,
    },

    /// The host answered with a payload that could not be decoded.
    #[error("could not decode code host response: {0}")]
    Decode(String),

    /// The request could not be built or delivered.
    #[error("code host transport error: {0}")]
    Transport(Arc<dyn std::error::Error + Send + Sync>),
}

impl CodeHostError {
    /// Wraps a transport error.
    pub fn transport(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Transport(Arc::new(err))
    }
}
