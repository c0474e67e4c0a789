//! Utility functions for text output.

pub mod format;

pub use format::{format_amount, format_date, format_table, truncate_string};
