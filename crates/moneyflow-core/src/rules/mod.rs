//! Client-side support for the rule script editor.
//!
//! Scripts run on the backend; this module only provides the autocomplete
//! catalogue and turns dry-run results into a field-level diff.

pub mod completions;
pub mod diff;

pub use completions::{completions, Completion, CompletionKind};
pub use diff::{diff_transactions, dry_run_changes, FieldChange};
