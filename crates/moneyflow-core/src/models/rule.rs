use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Transaction;

/// Script interpreter the backend runs rules with.
pub const LUA_INTERPRETER: &str = "lua";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    #[serde(default)]
    pub id: i32,
    pub title: String,
    pub script: String,
    #[serde(default = "default_interpreter")]
    pub interpreter: String,
    #[serde(default)]
    pub sort_order: i32,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub is_final_rule: bool,
    #[serde(default)]
    pub group_name: String,
}

fn default_interpreter() -> String {
    LUA_INTERPRETER.to_string()
}

impl Rule {
    /// Unsaved rule wrapping `script`, as sent for a dry run.
    pub fn draft(script: impl Into<String>) -> Self {
        Self {
            id: 0,
            title: "draft".to_string(),
            script: script.into(),
            interpreter: default_interpreter(),
            sort_order: 0,
            enabled: true,
            is_final_rule: false,
            group_name: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledRule {
    #[serde(default)]
    pub id: i32,
    pub title: String,
    pub script: String,
    #[serde(default = "default_interpreter")]
    pub interpreter: String,
    pub cron_expression: String,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_run_at: Option<DateTime<Utc>>,
}

/// Outcome of evaluating a script against one transaction without saving.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DryRunResult {
    #[serde(default)]
    pub rule_applied: bool,
    #[serde(default)]
    pub before: Option<Transaction>,
    #[serde(default)]
    pub after: Option<Transaction>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_defaults_to_lua() {
        let rule: Rule = serde_json::from_str(r#"{"title": "t", "script": "return true"}"#)
            .expect("Failed to parse rule JSON");
        assert_eq!(rule.interpreter, "lua");
        assert!(!rule.enabled);
    }

    #[test]
    fn test_dry_run_result_without_transactions() {
        let result: DryRunResult = serde_json::from_str(r#"{"ruleApplied": false}"#).unwrap();
        assert!(!result.rule_applied);
        assert!(result.before.is_none());
    }
}
