//! Wire types for the Jira REST and Agile APIs.

use crate::sync::domain::{Iteration, Ticket, TicketId, TicketKey, Transition};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct SearchResponse {
    pub start_at: u32,
    pub total: u32,
    #[serde(default)]
    pub issues: Vec<IssueResponse>,
}

#[derive(Debug, Deserialize)]
pub(super) struct IssueResponse {
    pub id: String,
    pub key: String,
    #[serde(default)]
    pub fields: Map<String, Value>,
}

impl IssueResponse {
    /// Converts a search hit into a ticket, reading the link from
    /// `link_field_id` when the field was returned.
    pub fn into_ticket(self, link_field_id: &str) -> Ticket {
        let status = named(&self.fields, "status");
        let issue_type = named(&self.fields, "issuetype");
        let mut ticket = Ticket::new(
            TicketId::new(self.id),
            TicketKey::new(self.key),
            status,
            issue_type,
        );
        if let Some(link) = self.fields.get(link_field_id).and_then(Value::as_str) {
            ticket = ticket.with_link(link);
        }
        if let Some(created) = self
            .fields
            .get("created")
            .and_then(Value::as_str)
            .and_then(parse_timestamp)
        {
            ticket = ticket.with_created_at(created);
        }
        ticket
    }

    /// Returns scalar `customfield_*` values rendered as strings.
    pub fn custom_fields(&self) -> BTreeMap<String, String> {
        self.fields
            .iter()
            .filter(|(name, _)| name.starts_with("customfield_"))
            .filter_map(|(name, value)| {
                let rendered = match value {
                    Value::String(text) => text.clone(),
                    Value::Number(number) => number.to_string(),
                    _ => return None,
                };
                Some((name.clone(), rendered))
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct TransitionsResponse {
    #[serde(default)]
    pub transitions: Vec<TransitionResponse>,
}

#[derive(Debug, Deserialize)]
pub(super) struct TransitionResponse {
    pub id: String,
    pub name: String,
}

impl From<TransitionResponse> for Transition {
    fn from(value: TransitionResponse) -> Self {
        Self::new(value.id, value.name)
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct CreatedResponse {
    pub id: String,
    pub key: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct SprintPage {
    #[serde(default)]
    pub is_last: bool,
    #[serde(default)]
    pub values: Vec<SprintResponse>,
}

#[derive(Debug, Deserialize)]
pub(super) struct SprintResponse {
    pub id: u64,
    pub name: String,
    pub state: String,
}

impl From<SprintResponse> for Iteration {
    fn from(value: SprintResponse) -> Self {
        Self {
            id: value.id,
            name: value.name,
            state: value.state,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct MyselfResponse {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "accountId", default)]
    pub account_id: Option<String>,
}

fn named(fields: &Map<String, Value>, field: &str) -> String {
    fields
        .get(field)
        .and_then(|value| value.get("name"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_owned()
}

/// Parses Jira timestamps, which omit the colon in the UTC offset.
pub(super) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .or_else(|_| DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f%z"))
        .ok()
        .map(|timestamp| timestamp.with_timezone(&Utc))
}
