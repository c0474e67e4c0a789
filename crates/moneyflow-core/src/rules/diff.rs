use std::collections::BTreeSet;

use anyhow::Result;
use serde_json::Value;

use crate::models::{DryRunResult, Transaction};

/// One field a rule changed.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldChange {
    /// camelCase field name as sent by the backend
    pub field: String,
    pub before: Value,
    pub after: Value,
}

impl FieldChange {
    pub fn describe(&self) -> String {
        format!("{}: {} -> {}", self.field, display(&self.before), display(&self.after))
    }
}

fn display(value: &Value) -> String {
    match value {
        Value::Null => "(none)".to_string(),
        Value::String(s) if s.is_empty() => "(empty)".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Field-level difference between two versions of a transaction, sorted by field.
pub fn diff_transactions(before: &Transaction, after: &Transaction) -> Result<Vec<FieldChange>> {
    let before = serde_json::to_value(before)?;
    let after = serde_json::to_value(after)?;
    Ok(diff_objects(&before, &after))
}

/// Changes reported by a dry run; empty when the rule did not apply.
pub fn dry_run_changes(result: &DryRunResult) -> Result<Vec<FieldChange>> {
    match (&result.before, &result.after) {
        (Some(before), Some(after)) if result.rule_applied => diff_transactions(before, after),
        _ => Ok(Vec::new()),
    }
}

fn diff_objects(before: &Value, after: &Value) -> Vec<FieldChange> {
    let empty = serde_json::Map::new();
    let b = before.as_object().unwrap_or(&empty);
    let a = after.as_object().unwrap_or(&empty);

    let fields: BTreeSet<&String> = b.keys().chain(a.keys()).collect();
    fields
        .into_iter()
        .filter_map(|field| {
            let old = b.get(field).cloned().unwrap_or(Value::Null);
            let new = a.get(field).cloned().unwrap_or(Value::Null);
            (old != new).then(|| FieldChange {
                field: field.clone(),
                before: old,
                after: new,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn sample() -> Transaction {
        Transaction {
            id: 10,
            title: "AMZN Mktp".to_string(),
            notes: String::new(),
            transaction_date: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            transaction_type: crate::models::TransactionType::Expense,
            source_account_id: Some(1),
            source_amount: "-20.00".to_string(),
            source_currency: "USD".to_string(),
            destination_account_id: None,
            destination_amount: String::new(),
            destination_currency: String::new(),
            category_id: None,
            tag_ids: vec![],
            reference_number: String::new(),
        }
    }

    #[test]
    fn test_diff_reports_changed_fields_only() {
        let before = sample();
        let mut after = sample();
        after.title = "Amazon".to_string();
        after.category_id = Some(4);
        after.tag_ids = vec![2];

        let changes = diff_transactions(&before, &after).unwrap();
        let fields: Vec<_> = changes.iter().map(|c| c.field.as_str()).collect();
        assert_eq!(fields, vec!["categoryId", "tagIds", "title"]);
        assert_eq!(changes[0].describe(), "categoryId: (none) -> 4");
        assert_eq!(changes[2].describe(), "title: AMZN Mktp -> Amazon");
    }

    #[test]
    fn test_identical_transactions_have_no_changes() {
        assert!(diff_transactions(&sample(), &sample()).unwrap().is_empty());
    }

    #[test]
    fn test_dry_run_not_applied_has_no_changes() {
        let mut after = sample();
        after.title = "changed".to_string();
        let result = DryRunResult {
            rule_applied: false,
            before: Some(sample()),
            after: Some(after),
        };
        assert!(dry_run_changes(&result).unwrap().is_empty());
    }
}
