//! Jira adapter for the issue-tracker port.
//!
//! Searches go through REST v2 with JQL rendered from [`TicketQuery`]
//! values; iterations are board sprints from the Agile 1.0 API.
//!
//! [`TicketQuery`]: crate::sync::domain::TicketQuery

mod client;
mod jql;
mod models;

pub use client::{JiraClient, JiraSettings};
pub use jql::render_query;
