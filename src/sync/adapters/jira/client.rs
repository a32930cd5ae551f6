//! `reqwest`-backed Jira client.

use super::jql::render_query;
use super::models::{
    CreatedResponse, IssueResponse, MyselfResponse, SearchResponse, SprintPage,
    TransitionsResponse,
};
use crate::sync::{
    domain::{
        CreatedTicket, Iteration, NewTicket, Ticket, TicketId, TicketKey, TicketQuery, Transition,
        TransitionFields,
    },
    ports::{IssueTracker, IssueTrackerError, IssueTrackerResult, Page, PageRequest},
};
use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;
use tracing::debug;
use url::Url;

const SPRINT_PAGE_SIZE: u32 = 50;

/// Connection and field settings for a Jira instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JiraSettings {
    /// Instance root, for example `https://acme.atlassian.net`.
    pub base_url: Url,
    /// Account used for basic authentication.
    pub username: String,
    /// API token paired with `username`.
    pub token: String,
    /// Field name of the link field, as used in JQL.
    pub link_field_name: String,
    /// Custom-field ID of the link field, as used in payloads.
    pub link_field_id: String,
    /// Custom-field ID of the team field, when generated tickets carry one.
    pub team_field_id: Option<String>,
}

/// Issue-tracker adapter for Jira REST v2 and Agile 1.0.
#[derive(Debug, Clone)]
pub struct JiraClient {
    http: reqwest::Client,
    base_url: Url,
    settings: JiraSettings,
}

impl JiraClient {
    /// Builds a client. No request is made.
    ///
    /// # Errors
    ///
    /// Returns [`IssueTrackerError::Transport`] when the HTTP client cannot
    /// be constructed.
    pub fn new(settings: JiraSettings) -> IssueTrackerResult<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("ticketsync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(IssueTrackerError::transport)?;
        let mut base_url = settings.base_url.clone();
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self {
            http,
            base_url,
            settings,
        })
    }

    /// Verifies the credentials and returns the authenticated account name.
    ///
    /// # Errors
    ///
    /// Returns [`IssueTrackerError::Status`] when the credentials are
    /// rejected.
    pub async fn authenticate(&self) -> IssueTrackerResult<String> {
        let myself: MyselfResponse =
            receive_json(self.request(Method::GET, "rest/api/2/myself")?).await?;
        Ok(myself
            .name
            .or(myself.account_id)
            .unwrap_or_else(|| self.settings.username.clone()))
    }

    fn request(&self, method: Method, path: &str) -> IssueTrackerResult<RequestBuilder> {
        let url = self
            .base_url
            .join(path)
            .map_err(IssueTrackerError::transport)?;
        debug!(%method, %url, "jira request");
        Ok(self
            .http
            .request(method, url)
            .basic_auth(&self.settings.username, Some(&self.settings.token)))
    }

    fn new_ticket_payload(&self, ticket: &NewTicket) -> Value {
        let mut fields = Map::new();
        fields.insert("project".to_owned(), json!({ "key": ticket.project_key }));
        fields.insert("issuetype".to_owned(), json!({ "name": ticket.issue_type }));
        fields.insert("summary".to_owned(), Value::from(ticket.summary.as_str()));
        fields.insert(
            "description".to_owned(),
            Value::from(ticket.description.as_str()),
        );
        fields.insert(
            self.settings.link_field_id.clone(),
            Value::from(ticket.link.as_str()),
        );
        if let Some(assignee) = &ticket.assignee {
            fields.insert("assignee".to_owned(), json!({ "name": assignee }));
        }
        if let (Some(field), Some(team)) = (&self.settings.team_field_id, &ticket.team_id) {
            fields.insert(field.clone(), json!({ "id": team }));
        }
        json!({ "fields": fields })
    }
}

#[async_trait]
impl IssueTracker for JiraClient {
    async fn search(
        &self,
        query: &TicketQuery,
        page: PageRequest,
    ) -> IssueTrackerResult<Page<Ticket>> {
        let jql = render_query(query, &self.settings.link_field_name);
        let start_at = page.cursor.unwrap_or(0).to_string();
        let max_results = page.size.to_string();
        let fields = format!("status,issuetype,created,{}", self.settings.link_field_id);
        let request = self.request(Method::GET, "rest/api/2/search")?.query(&[
            ("jql", jql.as_str()),
            ("startAt", start_at.as_str()),
            ("maxResults", max_results.as_str()),
            ("fields", fields.as_str()),
        ]);
        let response: SearchResponse = receive_json(request).await?;

        let returned = u32::try_from(response.issues.len()).unwrap_or(u32::MAX);
        let consumed = response.start_at.saturating_add(returned);
        let next = (returned > 0 && consumed < response.total).then_some(consumed);
        let tickets = response
            .issues
            .into_iter()
            .map(|issue| issue.into_ticket(&self.settings.link_field_id))
            .collect();
        Ok(Page::new(tickets, next))
    }

    async fn custom_fields(
        &self,
        ticket: &TicketId,
    ) -> IssueTrackerResult<BTreeMap<String, String>> {
        let path = format!("rest/api/2/issue/{ticket}");
        let issue: IssueResponse = receive_json(self.request(Method::GET, &path)?).await?;
        Ok(issue.custom_fields())
    }

    async fn transitions(&self, ticket: &TicketId) -> IssueTrackerResult<Vec<Transition>> {
        let path = format!("rest/api/2/issue/{ticket}/transitions");
        let response: TransitionsResponse =
            receive_json(self.request(Method::GET, &path)?).await?;
        Ok(response.transitions.into_iter().map(Transition::from).collect())
    }

    async fn apply_transition(
        &self,
        ticket: &TicketId,
        transition_id: &str,
        fields: &TransitionFields,
    ) -> IssueTrackerResult<()> {
        let path = format!("rest/api/2/issue/{ticket}/transitions");
        let mut payload = Map::new();
        payload.insert("transition".to_owned(), json!({ "id": transition_id }));
        if let Some(resolution) = &fields.resolution {
            payload.insert(
                "fields".to_owned(),
                json!({ "resolution": { "name": resolution } }),
            );
        }
        receive_empty(self.request(Method::POST, &path)?.json(&payload)).await
    }

    async fn create_ticket(&self, ticket: &NewTicket) -> IssueTrackerResult<CreatedTicket> {
        let payload = self.new_ticket_payload(ticket);
        let created: CreatedResponse =
            receive_json(self.request(Method::POST, "rest/api/2/issue")?.json(&payload)).await?;
        Ok(CreatedTicket {
            id: TicketId::new(created.id),
            key: TicketKey::new(created.key),
        })
    }

    async fn iterations(&self, board_id: &str) -> IssueTrackerResult<Vec<Iteration>> {
        let path = format!("rest/agile/1.0/board/{board_id}/sprint");
        let mut iterations = Vec::new();
        let mut start_at = 0_u32;
        loop {
            let request = self.request(Method::GET, &path)?.query(&[
                ("startAt", start_at.to_string()),
                ("maxResults", SPRINT_PAGE_SIZE.to_string()),
            ]);
            let page: SprintPage = receive_json(request).await?;
            let returned = u32::try_from(page.values.len()).unwrap_or(u32::MAX);
            iterations.extend(page.values.into_iter().map(Iteration::from));
            if page.is_last || returned == 0 {
                return Ok(iterations);
            }
            start_at = start_at.saturating_add(returned);
        }
    }

    async fn add_to_iteration(
        &self,
        iteration_id: u64,
        tickets: &[TicketKey],
    ) -> IssueTrackerResult<()> {
        let path = format!("rest/agile/1.0/sprint/{iteration_id}/issue");
        let issues: Vec<&str> = tickets.iter().map(TicketKey::as_str).collect();
        receive_empty(
            self.request(Method::POST, &path)?
                .json(&json!({ "issues": issues })),
        )
        .await
    }
}

async fn send(request: RequestBuilder) -> IssueTrackerResult<Response> {
    let response = request.send().await.map_err(IssueTrackerError::transport)?;
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(IssueTrackerError::Status {
        status: status.as_u16(),
        body,
    })
}

async fn receive_json<T: DeserializeOwned>(request: RequestBuilder) -> IssueTrackerResult<T> {
    let bytes = send(request)
        .await?
        .bytes()
        .await
        .map_err(IssueTrackerError::transport)?;
    serde_json::from_slice(&bytes).map_err(|err| IssueTrackerError::Decode(err.to_string()))
}

async fn receive_empty(request: RequestBuilder) -> IssueTrackerResult<()> {
    send(request).await.map(drop)
}
