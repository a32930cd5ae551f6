//! Unit tests for the sync module.
//!
//! Domain tests exercise link parsing and the decision table directly.
//! Service tests run against the in-memory adapters, or against `mockall`
//! doubles where a test must prove a call is never made.
