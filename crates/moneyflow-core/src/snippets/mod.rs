//! Saved groups of transaction templates that can be re-created in one go.

pub mod store;

pub use store::{ReplayFailure, ReplayOutcome, Snippet, SnippetStore};
