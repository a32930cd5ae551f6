//! Error types for sync domain parsing.

use thiserror::Error;

/// Errors returned while resolving a pull request link.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LinkError {
    /// The link path does not have the `{owner}/{repo}/{kind}/{number}` shape.
    #[error("link path '{path}' has wrong number of segments: expected {expected}, got {actual}")]
    MalformedLink {
        /// Path component of the link.
        path: String,
        /// Number of segments required.
        expected: usize,
        /// Number of non-empty segments found.
        actual: usize,
    },

    /// The number segment is not a non-negative integer.
    #[error("invalid pull request number '{segment}'")]
    InvalidIdentifier {
        /// The offending path segment.
        segment: String,
    },

    /// The link is not an absolute URL.
    #[error("link '{link}' is not a valid URL: {reason}")]
    UnparsableUrl {
        /// Raw link text.
        link: String,
        /// Parser diagnostic.
        reason: String,
    },
}
