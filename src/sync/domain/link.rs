//! Pull request link resolution.
//!
//! Tickets store the pull request they track as a plain URL. The path of
//! that URL must be exactly `/{owner}/{repo}/{kind}/{number}`; the host and
//! the `kind` segment (`pull`, `pulls`, `issues`) are not interpreted.

use super::{IssueNumber, LinkError, RepositoryRef};
use std::fmt;
use url::Url;

/// Code-host pull request identity extracted from a ticket link.
///
/// # Examples
///
/// ```rust
/// use ticketsync::sync::domain::PullRequestLink;
///
/// let link = PullRequestLink::parse("https://github.com/ownerA/repoB/pull/42")
///     .expect("well-formed link");
/// assert_eq!(link.repository().owner(), "ownerA");
/// assert_eq!(link.repository().name(), "repoB");
/// assert_eq!(link.number().value(), 42);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PullRequestLink {
    repository: RepositoryRef,
    kind: String,
    number: IssueNumber,
}

impl PullRequestLink {
    /// Number of path segments a link must carry.
    pub const EXPECTED_SEGMENTS: usize = 4;

    /// Parses a ticket link into owner, repository, and number.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::UnparsableUrl`] when the text is not a URL,
    /// [`LinkError::MalformedLink`] when the path does not have exactly four
    /// non-empty segments, and [`LinkError::InvalidIdentifier`] when the
    /// fourth segment is not a non-negative integer.
    pub fn parse(link: &str) -> Result<Self, LinkError> {
        let url = Url::parse(link.trim()).map_err(|err| LinkError::UnparsableUrl {
            link: link.to_owned(),
            reason: err.to_string(),
        })?;
        let path = url.path();
        let trimmed = path.trim_matches('/');
        let segments: Vec<&str> = if trimmed.is_empty() {
            Vec::new()
        } else {
            trimmed.split('/').collect()
        };

        let malformed = |actual: usize| LinkError::MalformedLink {
            path: path.to_owned(),
            expected: Self::EXPECTED_SEGMENTS,
            actual,
        };
        let [owner, repo, kind, number] = segments.as_slice() else {
            return Err(malformed(segments.len()));
        };
        if segments.iter().any(|segment| segment.is_empty()) {
            return Err(malformed(
                segments.iter().filter(|segment| !segment.is_empty()).count(),
            ));
        }

        Ok(Self {
            repository: RepositoryRef::new(*owner, *repo),
            kind: (*kind).to_owned(),
            number: parse_number(number)?,
        })
    }

    /// Returns the repository the link points into.
    #[must_use]
    pub const fn repository(&self) -> &RepositoryRef {
        &self.repository
    }

    /// Returns the raw `kind` segment (`pull`, `pulls`, `issues`).
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Returns the pull request number.
    #[must_use]
    pub const fn number(&self) -> IssueNumber {
        self.number
    }

    /// Returns whether both links address the same pull request.
    ///
    /// The `kind` segment is ignored: `/pull/7` and `/issues/7` name the same
    /// record on the code host.
    #[must_use]
    pub fn same_target(&self, other: &Self) -> bool {
        self.number == other.number && self.repository.matches(&other.repository)
    }

    /// Returns the set-membership key for this link.
    #[must_use]
    pub fn key(&self) -> LinkKey {
        LinkKey(format!(
            "{}/{}#{}",
            self.repository.owner().to_ascii_lowercase(),
            self.repository.name().to_ascii_lowercase(),
            self.number
        ))
    }
}

impl fmt::Display for PullRequestLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.repository, self.kind, self.number)
    }
}

fn parse_number(segment: &str) -> Result<IssueNumber, LinkError> {
    let invalid = || LinkError::InvalidIdentifier {
        segment: segment.to_owned(),
    };
    if !segment.bytes().all(|byte| byte.is_ascii_digit()) {
        return Err(invalid());
    }
    segment
        .parse::<u64>()
        .map(IssueNumber::new)
        .map_err(|_| invalid())
}

/// Normalized identity of a link, used to decide whether a pull request is
/// already tracked by some ticket.
///
/// Well-formed links reduce to `owner/repo#number` in lower case so that
/// `/pull/` and `/pulls/` spellings, trailing slashes, and case differences
/// collapse. Anything else falls back to the trimmed raw text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LinkKey(String);

impl LinkKey {
    /// Builds the key for a raw link.
    #[must_use]
    pub fn from_raw(link: &str) -> Self {
        PullRequestLink::parse(link)
            .map_or_else(|_| Self(link.trim().trim_matches('/').to_owned()), |parsed| parsed.key())
    }

    /// Returns the key text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LinkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
