//! Reconciliation decision table.
//!
//! A pull request's observed condition and a ticket's workflow condition
//! map to at most one outgoing transition. Rows are evaluated in priority
//! order (merged, closed, reviewed, open) and every "already there" row is
//! a no-op, so repeating a run against an unchanged world issues nothing.

use super::{PullRequestState, Ticket, TransitionRequest};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Pull request condition as seen by the decision table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PullRequestCondition {
    /// Merged.
    Done,
    /// Closed without merge.
    ClosedWithoutMerge,
    /// Open and carrying the approval label.
    Reviewed,
    /// Open without approval.
    Open,
}

impl PullRequestCondition {
    /// Combines merge lifecycle with the review signal.
    ///
    /// `approved` is only consulted for open pull requests.
    #[must_use]
    pub const fn classify(state: PullRequestState, approved: bool) -> Self {
        match state {
            PullRequestState::Merged => Self::Done,
            PullRequestState::ClosedWithoutMerge => Self::ClosedWithoutMerge,
            PullRequestState::Open if approved => Self::Reviewed,
            PullRequestState::Open => Self::Open,
        }
    }

    /// Returns the snake-case name used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Done => "done",
            Self::ClosedWithoutMerge => "closed_without_merge",
            Self::Reviewed => "reviewed",
            Self::Open => "open",
        }
    }
}

impl fmt::Display for PullRequestCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ticket condition derived from its status name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketCondition {
    /// Status is in the terminal set.
    Done,
    /// Status is the reviewed status.
    Reviewed,
    /// Status is one of the in-progress statuses.
    InProgress,
    /// Anything else.
    NotStarted,
}

impl TicketCondition {
    /// Returns the snake-case name used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Done => "done",
            Self::Reviewed => "reviewed",
            Self::InProgress => "in_progress",
            Self::NotStarted => "not_started",
        }
    }
}

impl fmt::Display for TicketCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of the decision table for one ticket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// The ticket already reflects the pull request, or no row matched.
    NoOp,
    /// Move the ticket through the named transition.
    Transition(TransitionRequest),
}

/// Workflow vocabulary the decision table runs against.
///
/// Defaults reproduce the stock software workflow: `Done`/`In QA` are
/// terminal, `Ready to Merge` marks review, and `lgtm` is the approval
/// label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowPolicy {
    /// Statuses treated as finished. Tickets in these are never re-opened.
    pub terminal_statuses: Vec<String>,
    /// Status meaning the pull request is approved and waiting to merge.
    pub reviewed_status: String,
    /// Statuses meaning development has started.
    pub in_progress_statuses: Vec<String>,
    /// Transition that closes a ticket.
    pub done_transition: String,
    /// Transition that marks a ticket reviewed.
    pub review_transition: String,
    /// Transition that starts development.
    pub start_transition: String,
    /// Per-issue-type override of `start_transition`, for example
    /// `Bug = "In Progress"`.
    pub start_transition_by_type: BTreeMap<String, String>,
    /// Label on the pull request's issue record that marks approval.
    pub approved_label: String,
    /// Resolution for tickets whose pull request merged.
    pub merged_resolution: String,
    /// Resolution for tickets whose pull request closed unmerged.
    pub abandoned_resolution: String,
}

impl Default for WorkflowPolicy {
    fn default() -> Self {
        Self {
            terminal_statuses: vec!["Done".to_owned(), "In QA".to_owned()],
            reviewed_status: "Ready to Merge".to_owned(),
            in_progress_statuses: vec!["In Development".to_owned(), "In Progress".to_owned()],
            done_transition: "Done".to_owned(),
            review_transition: "Ready to Merge".to_owned(),
            start_transition: "Start Development".to_owned(),
            start_transition_by_type: BTreeMap::new(),
            approved_label: "lgtm".to_owned(),
            merged_resolution: "Done".to_owned(),
            abandoned_resolution: "Won't Do".to_owned(),
        }
    }
}

impl WorkflowPolicy {
    /// Classifies a ticket by its status name.
    #[must_use]
    pub fn classify_ticket(&self, ticket: &Ticket) -> TicketCondition {
        let status = ticket.status();
        if contains_status(&self.terminal_statuses, status) {
            TicketCondition::Done
        } else if status == self.reviewed_status {
            TicketCondition::Reviewed
        } else if contains_status(&self.in_progress_statuses, status) {
            TicketCondition::InProgress
        } else {
            TicketCondition::NotStarted
        }
    }

    /// Returns the start transition for the ticket's issue type.
    #[must_use]
    pub fn start_transition_for(&self, issue_type: &str) -> &str {
        self.start_transition_by_type
            .get(issue_type)
            .map_or(self.start_transition.as_str(), String::as_str)
    }

    /// Applies the decision table.
    ///
    /// | Pull request | Ticket | Action |
    /// |---|---|---|
    /// | done | done | no-op |
    /// | done | not done | done transition, merged resolution |
    /// | closed | done | no-op |
    /// | closed | not done | done transition, abandoned resolution |
    /// | reviewed | reviewed | no-op |
    /// | reviewed | not reviewed | review transition |
    /// | open | in progress | no-op |
    /// | open | not started | start transition for the issue type |
    ///
    /// An open pull request on a done or reviewed ticket matches no row and
    /// yields [`Decision::NoOp`].
    #[must_use]
    pub fn decide(&self, pull_request: PullRequestCondition, ticket: &Ticket) -> Decision {
        let condition = self.classify_ticket(ticket);
        match (pull_request, condition) {
            (
                PullRequestCondition::Done | PullRequestCondition::ClosedWithoutMerge,
                TicketCondition::Done,
            )
            | (PullRequestCondition::Reviewed, TicketCondition::Reviewed)
            | (
                PullRequestCondition::Open,
                TicketCondition::InProgress | TicketCondition::Done | TicketCondition::Reviewed,
            ) => Decision::NoOp,
            (PullRequestCondition::Done, _) => Decision::Transition(
                TransitionRequest::new(&self.done_transition)
                    .with_resolution(&self.merged_resolution),
            ),
            (PullRequestCondition::ClosedWithoutMerge, _) => Decision::Transition(
                TransitionRequest::new(&self.done_transition)
                    .with_resolution(&self.abandoned_resolution),
            ),
            (PullRequestCondition::Reviewed, _) => {
                Decision::Transition(TransitionRequest::new(&self.review_transition))
            }
            (PullRequestCondition::Open, TicketCondition::NotStarted) => Decision::Transition(
                TransitionRequest::new(self.start_transition_for(ticket.issue_type())),
            ),
        }
    }
}

fn contains_status(statuses: &[String], status: &str) -> bool {
    statuses.iter().any(|candidate| candidate == status)
}
