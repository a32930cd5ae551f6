//! GitHub adapter for the code-host port.

mod client;
mod link_header;
mod models;

pub use client::{DEFAULT_API_BASE_URL, GitHubClient, GitHubSettings};
