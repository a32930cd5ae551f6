//! HTTP contract tests for the Jira adapter against a `wiremock` server.

use rstest::rstest;
use serde_json::json;
use ticketsync::sync::{
    adapters::{JiraClient, JiraSettings},
    domain::{Iteration, NewTicket, TicketId, TicketKey, TicketQuery, TransitionFields},
    ports::{IssueTracker, IssueTrackerError, PageRequest},
};
use url::Url;
use wiremock::matchers::{basic_auth, body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const LINK_FIELD_ID: &str = "customfield_22000";

fn client(server: &MockServer) -> Result<JiraClient, eyre::Report> {
    let settings = JiraSettings {
        base_url: Url::parse(&server.uri())?,
        username: "sync-bot".to_owned(),
        token: "secret".to_owned(),
        link_field_name: "GitHub Link".to_owned(),
        link_field_id: LINK_FIELD_ID.to_owned(),
        team_field_id: Some("customfield_30000".to_owned()),
    };
    Ok(JiraClient::new(settings)?)
}

fn issue(id: &str, key: &str, status: &str, link: Option<&str>) -> serde_json::Value {
    json!({
        "id": id,
        "key": key,
        "fields": {
            "status": { "name": status },
            "issuetype": { "name": "Story" },
            "created": "2024-04-30T09:15:00.000+0000",
            LINK_FIELD_ID: link,
        }
    })
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn search_renders_jql_and_reports_next_offset() -> Result<(), eyre::Report> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/api/2/search"))
        .and(basic_auth("sync-bot", "secret"))
        .and(query_param(
            "jql",
            r#""GitHub Link" is not EMPTY AND status NOT IN ("Done") ORDER BY key ASC"#,
        ))
        .and(query_param("startAt", "0"))
        .and(query_param("maxResults", "2"))
        .and(query_param(
            "fields",
            format!("status,issuetype,created,{LINK_FIELD_ID}"),
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "startAt": 0,
            "maxResults": 2,
            "total": 3,
            "issues": [
                issue("100", "OPS-1", "To Do", Some("https://github.com/acme/api/pull/1")),
                issue("101", "OPS-2", "In Development", None),
            ],
        })))
        .expect(1)
        .mount(&server)
        .await;

    let page = client(&server)?
        .search(
            &TicketQuery::OpenLinked {
                excluded_statuses: vec!["Done".to_owned()],
            },
            PageRequest::first(2),
        )
        .await?;

    eyre::ensure!(page.next == Some(2), "expected next offset 2, got {:?}", page.next);
    let [first, second] = page.items.as_slice() else {
        eyre::bail!("expected two tickets, got {}", page.items.len());
    };
    eyre::ensure!(first.key().as_str() == "OPS-1");
    eyre::ensure!(first.status() == "To Do");
    eyre::ensure!(first.link() == Some("https://github.com/acme/api/pull/1"));
    eyre::ensure!(first.created_at().is_some(), "created timestamp should parse");
    eyre::ensure!(second.link().is_none(), "null link field should stay unset");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn search_stops_after_last_page() -> Result<(), eyre::Report> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/api/2/search"))
        .and(query_param("startAt", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "startAt": 2,
            "total": 3,
            "issues": [issue("102", "OPS-3", "To Do", None)],
        })))
        .mount(&server)
        .await;

    let page = client(&server)?
        .search(
            &TicketQuery::LinkedTo {
                url: "https://github.com/acme/api/pull/1".to_owned(),
            },
            PageRequest::at(2, 2),
        )
        .await?;

    eyre::ensure!(page.next.is_none(), "last page should end pagination");
    eyre::ensure!(page.items.len() == 1);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn transition_posts_id_and_resolution() -> Result<(), eyre::Report> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/api/2/issue/100/transitions"))
        .and(body_json(json!({
            "transition": { "id": "41" },
            "fields": { "resolution": { "name": "Won't Do" } },
        })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    client(&server)?
        .apply_transition(
            &TicketId::new("100"),
            "41",
            &TransitionFields::resolution("Won't Do"),
        )
        .await?;
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn transition_without_fields_sends_only_the_id() -> Result<(), eyre::Report> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/api/2/issue/100/transitions"))
        .and(body_json(json!({ "transition": { "id": "11" } })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    client(&server)?
        .apply_transition(&TicketId::new("100"), "11", &TransitionFields::default())
        .await?;
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn rejected_transition_keeps_status_and_body() -> Result<(), eyre::Report> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/api/2/issue/100/transitions"))
        .respond_with(
            ResponseTemplate::new(400).set_body_string(r#"{"errorMessages":["bad transition"]}"#),
        )
        .mount(&server)
        .await;

    let result = client(&server)?
        .apply_transition(&TicketId::new("100"), "99", &TransitionFields::default())
        .await;

    let Err(IssueTrackerError::Status { status, body }) = result else {
        eyre::bail!("expected a status error, got {result:?}");
    };
    eyre::ensure!(status == 400);
    eyre::ensure!(body.contains("bad transition"));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn transitions_and_custom_fields_are_read() -> Result<(), eyre::Report> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/api/2/issue/100/transitions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "transitions": [
                { "id": "31", "name": "Ready to Merge", "to": { "name": "Ready to Merge" } },
                { "id": "41", "name": "Done" },
            ]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/api/2/issue/100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "100",
            "key": "OPS-1",
            "fields": {
                "summary": "ignored",
                LINK_FIELD_ID: "https://github.com/acme/api/pull/1",
                "customfield_10002": 5,
                "customfield_10003": { "value": "nested" },
            }
        })))
        .mount(&server)
        .await;
    let jira = client(&server)?;

    let transitions = jira.transitions(&TicketId::new("100")).await?;
    let fields = jira.custom_fields(&TicketId::new("100")).await?;

    let names: Vec<&str> = transitions.iter().map(|transition| transition.name.as_str()).collect();
    eyre::ensure!(names == ["Ready to Merge", "Done"], "got {names:?}");
    eyre::ensure!(
        fields.get(LINK_FIELD_ID).map(String::as_str) == Some("https://github.com/acme/api/pull/1")
    );
    eyre::ensure!(fields.get("customfield_10002").map(String::as_str) == Some("5"));
    eyre::ensure!(!fields.contains_key("customfield_10003"));
    eyre::ensure!(!fields.contains_key("summary"));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn create_ticket_writes_link_assignee_and_team() -> Result<(), eyre::Report> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/api/2/issue"))
        .and(body_json(json!({
            "fields": {
                "project": { "key": "OPS" },
                "issuetype": { "name": "Task" },
                "summary": "Add retries",
                "description": "Body",
                LINK_FIELD_ID: "https://github.com/acme/api/pull/7",
                "assignee": { "name": "alice.jira" },
                "customfield_30000": { "id": "team-9" },
            }
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": "200",
            "key": "OPS-50",
            "self": "https://acme.atlassian.net/rest/api/2/issue/200",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let created = client(&server)?
        .create_ticket(&NewTicket {
            project_key: "OPS".to_owned(),
            issue_type: "Task".to_owned(),
            summary: "Add retries".to_owned(),
            description: "Body".to_owned(),
            link: "https://github.com/acme/api/pull/7".to_owned(),
            assignee: Some("alice.jira".to_owned()),
            team_id: Some("team-9".to_owned()),
        })
        .await?;

    eyre::ensure!(created.id.as_str() == "200");
    eyre::ensure!(created.key.as_str() == "OPS-50");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn iterations_follow_sprint_pages() -> Result<(), eyre::Report> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/agile/1.0/board/42/sprint"))
        .and(query_param("startAt", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "isLast": false,
            "values": [{ "id": 6, "name": "Sprint 6", "state": "closed" }],
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/agile/1.0/board/42/sprint"))
        .and(query_param("startAt", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "isLast": true,
            "values": [{ "id": 7, "name": "Sprint 7", "state": "active" }],
        })))
        .mount(&server)
        .await;

    let iterations = client(&server)?.iterations("42").await?;

    let ids: Vec<u64> = iterations.iter().map(|iteration| iteration.id).collect();
    eyre::ensure!(ids == [6, 7], "got {ids:?}");
    eyre::ensure!(iterations.last().is_some_and(Iteration::is_active));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn add_to_iteration_posts_issue_keys() -> Result<(), eyre::Report> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/agile/1.0/sprint/7/issue"))
        .and(body_json(json!({ "issues": ["OPS-50"] })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    client(&server)?
        .add_to_iteration(7, &[TicketKey::new("OPS-50")])
        .await?;
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn authenticate_returns_account_name() -> Result<(), eyre::Report> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/api/2/myself"))
        .and(basic_auth("sync-bot", "secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "name": "sync-bot" })))
        .mount(&server)
        .await;

    let account = client(&server)?.authenticate().await?;

    eyre::ensure!(account == "sync-bot");
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn rejected_credentials_fail_authentication() -> Result<(), eyre::Report> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/api/2/myself"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let result = client(&server)?.authenticate().await;

    eyre::ensure!(
        matches!(result, Err(IssueTrackerError::Status { status: 401, .. })),
        "expected 401, got {result:?}"
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn malformed_payload_is_a_decode_error() -> Result<(), eyre::Report> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/api/2/issue/100/transitions"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let result = client(&server)?.transitions(&TicketId::new("100")).await;

    eyre::ensure!(
        matches!(result, Err(IssueTrackerError::Decode(_))),
        "expected a decode error, got {result:?}"
    );
    Ok(())
}
