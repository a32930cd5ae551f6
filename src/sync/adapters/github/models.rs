//! Wire types for the GitHub REST API.

use crate::sync::domain::{HostIssue, IssueNumber, PullRequest, PullRequestData, RepositoryRef};
use chrono::{DateTime, Utc};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub(super) struct UserResponse {
    pub login: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct LabelResponse {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct IssueResponse {
    pub number: u64,
    #[serde(default)]
    pub labels: Vec<LabelResponse>,
}

impl IssueResponse {
    pub fn into_domain(self, repository: &RepositoryRef) -> HostIssue {
        HostIssue::new(
            repository.clone(),
            IssueNumber::new(self.number),
            self.labels.into_iter().map(|label| label.name),
        )
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct PullRequestResponse {
    pub number: u64,
    pub html_url: String,
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    pub user: UserResponse,
    #[serde(default)]
    pub merged: Option<bool>,
    #[serde(default)]
    pub merged_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub closed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl PullRequestResponse {
    pub fn into_domain(self, repository: &RepositoryRef) -> PullRequest {
        PullRequest::from_data(PullRequestData {
            repository: repository.clone(),
            number: IssueNumber::new(self.number),
            html_url: self.html_url,
            author: self.user.login,
            title: self.title,
            body: self.body,
            merged: self.merged,
            merged_at: self.merged_at,
            closed_at: self.closed_at,
            created_at: self.created_at,
        })
    }
}
