//! JQL rendering for the typed ticket queries.

use crate::sync::domain::TicketQuery;

/// Renders `query` as JQL against the link field named `link_field_name`.
///
/// Results are ordered by key so that offset paging is stable.
///
/// ```
/// use ticketsync::sync::{adapters::jira::render_query, domain::TicketQuery};
///
/// let query = TicketQuery::LinkedTo {
///     url: "https://github.com/acme/api/pull/7".to_owned(),
/// };
/// assert_eq!(
///     render_query(&query, "GitHub Link"),
///     r#""GitHub Link" = "https://github.com/acme/api/pull/7" ORDER BY key ASC"#,
/// );
/// ```
#[must_use]
pub fn render_query(query: &TicketQuery, link_field_name: &str) -> String {
    let field = quote(link_field_name);
    let condition = match query {
        TicketQuery::OpenLinked { excluded_statuses } if excluded_statuses.is_empty() => {
            format!("{field} is not EMPTY")
        }
        TicketQuery::OpenLinked { excluded_statuses } => {
            let statuses = excluded_statuses
                .iter()
                .map(String::as_str)
                .map(quote)
                .collect::<Vec<_>>()
                .join(", ");
            format!("{field} is not EMPTY AND status NOT IN ({statuses})")
        }
        TicketQuery::LinkedTo { url } => format!("{field} = {}", quote(url)),
    };
    format!("{condition} ORDER BY key ASC")
}

fn quote(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{escaped}\"")
}
