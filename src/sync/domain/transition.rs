//! Workflow transitions and iterations exposed by the issue tracker.

use serde::{Deserialize, Serialize};

/// Allowed move out of a ticket's current status.
///
/// The tracker enumerates these per ticket; the set depends on the current
/// status and is never global.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    /// Opaque tracker identifier used to execute the transition.
    pub id: String,
    /// Display name matched against decided targets.
    pub name: String,
}

impl Transition {
    /// Creates a transition descriptor.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Extra fields submitted alongside a transition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionFields {
    /// Resolution display name, for example `Done` or `Won't Do`.
    pub resolution: Option<String>,
}

impl TransitionFields {
    /// Fields carrying only a resolution.
    #[must_use]
    pub fn resolution(name: impl Into<String>) -> Self {
        Self {
            resolution: Some(name.into()),
        }
    }

    /// Returns whether no field is set.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.resolution.is_none()
    }
}

/// Transition the decision table chose for a ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRequest {
    /// Transition name to look up among the allowed transitions.
    pub target: String,
    /// Fields to submit with the transition.
    pub fields: TransitionFields,
}

impl TransitionRequest {
    /// Creates a transition request without extra fields.
    #[must_use]
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            fields: TransitionFields::default(),
        }
    }

    /// Attaches a resolution field.
    #[must_use]
    pub fn with_resolution(mut self, resolution: impl Into<String>) -> Self {
        self.fields = TransitionFields::resolution(resolution);
        self
    }
}

/// Board iteration (sprint).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Iteration {
    /// Tracker identifier.
    pub id: u64,
    /// Display name.
    pub name: String,
    /// Lifecycle state as reported by the tracker (`active`, `future`, `closed`).
    pub state: String,
}

impl Iteration {
    /// Returns whether this iteration is the one in progress.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state.eq_ignore_ascii_case("active")
    }

    /// Returns the first active iteration in `iterations`.
    #[must_use]
    pub fn find_active(iterations: &[Self]) -> Option<&Self> {
        iterations.iter().find(|iteration| iteration.is_active())
    }
}
