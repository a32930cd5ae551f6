//! Port contracts for the issue tracker and the code host.
//!
//! Ports define infrastructure-agnostic interfaces used by sync services.

pub mod code_host;
mod page;
pub mod tracker;

pub use code_host::{CodeHost, CodeHostError, CodeHostResult, IssueFilter};
pub use page::{Page, PageRequest};
pub use tracker::{IssueTracker, IssueTrackerError, IssueTrackerResult};

#[cfg(test)]
pub use code_host::MockCodeHost;
#[cfg(test)]
pub use tracker::MockIssueTracker;
