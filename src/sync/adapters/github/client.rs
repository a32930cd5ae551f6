//! `reqwest`-backed GitHub client.

use super::link_header::next_page;
use super::models::{IssueResponse, PullRequestResponse};
use crate::sync::{
    domain::{HostIssue, IssueNumber, PullRequest, RepositoryRef},
    ports::{CodeHost, CodeHostError, CodeHostResult, IssueFilter, Page, PageRequest},
};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, LINK, USER_AGENT};
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

/// Default public API root.
pub const DEFAULT_API_BASE_URL: &str = "https://api.github.com";

/// Connection settings for the GitHub REST API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitHubSettings {
    /// API root, `https://api.github.com` for the public service.
    pub api_base_url: Url,
    /// Token sent as a bearer credential.
    pub token: String,
}

/// Code-host adapter for the GitHub REST API.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    http: reqwest::Client,
    api_base_url: Url,
}

impl GitHubClient {
    /// Builds a client. No request is made.
    ///
    /// # Errors
    ///
    /// Returns [`CodeHostError::Transport`] when the token is not a valid
    /// header value or the HTTP client cannot be constructed.
    pub fn new(settings: &GitHubSettings) -> CodeHostResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("ticketsync/", env!("CARGO_PKG_VERSION"))),
        );
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "x-github-api-version",
            HeaderValue::from_static("2022-11-28"),
        );
        let mut authorization = HeaderValue::from_str(&format!("Bearer {}", settings.token.trim()))
            .map_err(CodeHostError::transport)?;
        authorization.set_sensitive(true);
        headers.insert(AUTHORIZATION, authorization);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(CodeHostError::transport)?;
        let mut api_base_url = settings.api_base_url.clone();
        if !api_base_url.path().ends_with('/') {
            let path = format!("{}/", api_base_url.path());
            api_base_url.set_path(&path);
        }
        Ok(Self { http, api_base_url })
    }

    fn get(&self, repository: &RepositoryRef, resource: &str) -> CodeHostResult<RequestBuilder> {
        let path = format!(
            "repos/{}/{}/{resource}",
            repository.owner(),
            repository.name()
        );
        let url = self
            .api_base_url
            .join(&path)
            .map_err(CodeHostError::transport)?;
        debug!(%url, "github request");
        Ok(self.http.get(url))
    }
}

fn paged(request: RequestBuilder, page: PageRequest) -> RequestBuilder {
    request.query(&[
        ("per_page", page.size),
        ("page", page.cursor.unwrap_or(1)),
    ])
}

#[async_trait]
impl CodeHost for GitHubClient {
    async fn list_issues(
        &self,
        repository: &RepositoryRef,
        filter: &IssueFilter,
        page: PageRequest,
    ) -> CodeHostResult<Page<HostIssue>> {
        let mut request = paged(self.get(repository, "issues")?, page).query(&[("state", "open")]);
        if let Some(creator) = &filter.creator {
            request = request.query(&[("creator", creator)]);
        }
        if !filter.labels.is_empty() {
            request = request.query(&[("labels", filter.labels.join(","))]);
        }
        let (issues, next): (Vec<IssueResponse>, _) = receive_page(request).await?;
        Ok(Page::new(
            issues
                .into_iter()
                .map(|issue| issue.into_domain(repository))
                .collect(),
            next,
        ))
    }

    async fn list_pull_requests(
        &self,
        repository: &RepositoryRef,
        page: PageRequest,
    ) -> CodeHostResult<Page<PullRequest>> {
        let request = paged(self.get(repository, "pulls")?, page).query(&[("state", "open")]);
        let (pulls, next): (Vec<PullRequestResponse>, _) = receive_page(request).await?;
        Ok(Page::new(
            pulls
                .into_iter()
                .map(|pull| pull.into_domain(repository))
                .collect(),
            next,
        ))
    }

    async fn pull_request(
        &self,
        repository: &RepositoryRef,
        number: IssueNumber,
    ) -> CodeHostResult<PullRequest> {
        let request = self.get(repository, &format!("pulls/{number}"))?;
        let pull: PullRequestResponse = receive_json(send(request).await?).await?;
        Ok(pull.into_domain(repository))
    }

    async fn issue(
        &self,
        repository: &RepositoryRef,
        number: IssueNumber,
    ) -> CodeHostResult<HostIssue> {
        let request = self.get(repository, &format!("issues/{number}"))?;
        let issue: IssueResponse = receive_json(send(request).await?).await?;
        Ok(issue.into_domain(repository))
    }
}

async fn send(request: RequestBuilder) -> CodeHostResult<Response> {
    let response = request.send().await.map_err(CodeHostError::transport)?;
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(CodeHostError::Status {
        status: status.as_u16(),
        body,
    })
}

async fn receive_json<T: DeserializeOwned>(response: Response) -> CodeHostResult<T> {
    let bytes = response.bytes().await.map_err(CodeHostError::transport)?;
    serde_json::from_slice(&bytes).map_err(|err| CodeHostError::Decode(err.to_string()))
}

async fn receive_page<T: DeserializeOwned>(
    request: RequestBuilder,
) -> CodeHostResult<(Vec<T>, Option<u32>)> {
    let response = send(request).await?;
    let next = response
        .headers()
        .get(LINK)
        .and_then(|value| value.to_str().ok())
        .and_then(next_page);
    Ok((receive_json(response).await?, next))
}
