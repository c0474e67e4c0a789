use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionType {
    #[serde(rename = "TRANSACTION_TYPE_UNSPECIFIED")]
    #[default]
    Unspecified,
    #[serde(rename = "TRANSACTION_TYPE_INCOME")]
    Income,
    #[serde(rename = "TRANSACTION_TYPE_EXPENSE")]
    Expense,
    #[serde(rename = "TRANSACTION_TYPE_TRANSFER_BETWEEN_ACCOUNTS")]
    TransferBetweenAccounts,
    #[serde(rename = "TRANSACTION_TYPE_ADJUSTMENT")]
    Adjustment,
}

impl TransactionType {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "income" => Some(TransactionType::Income),
            "expense" => Some(TransactionType::Expense),
            "transfer" => Some(TransactionType::TransferBetweenAccounts),
            "adjustment" => Some(TransactionType::Adjustment),
            _ => None,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            TransactionType::Unspecified => "Unknown",
            TransactionType::Income => "Income",
            TransactionType::Expense => "Expense",
            TransactionType::TransferBetweenAccounts => "Transfer",
            TransactionType::Adjustment => "Adjustment",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    #[serde(default, with = "super::int64")]
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub notes: String,
    pub transaction_date: DateTime<Utc>,
    #[serde(default, rename = "type")]
    pub transaction_type: TransactionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_account_id: Option<i32>,
    #[serde(default)]
    pub source_amount: String,
    #[serde(default)]
    pub source_currency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_account_id: Option<i32>,
    #[serde(default)]
    pub destination_amount: String,
    #[serde(default)]
    pub destination_currency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<i32>,
    #[serde(default)]
    pub tag_ids: Vec<i32>,
    #[serde(default)]
    pub reference_number: String,
}

/// Paged query for `ListTransactions` and `ExportTransactions`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub account_ids: Vec<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_query: Option<String>,
    #[serde(default)]
    pub limit: u32,
    #[serde(default)]
    pub skip: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_transaction_with_string_id() {
        let json = r#"{
            "id": "1234567890123",
            "title": "Coffee",
            "transactionDate": "2024-03-01T08:30:00Z",
            "type": "TRANSACTION_TYPE_EXPENSE",
            "sourceAccountId": 1,
            "sourceAmount": "-4.50",
            "sourceCurrency": "USD",
            "tagIds": [2, 5]
        }"#;
        let tx: Transaction = serde_json::from_str(json).expect("Failed to parse transaction JSON");
        assert_eq!(tx.id, 1_234_567_890_123);
        assert_eq!(tx.transaction_type, TransactionType::Expense);
        assert_eq!(tx.destination_account_id, None);
        assert_eq!(tx.tag_ids, vec![2, 5]);
    }

    #[test]
    fn test_missing_type_defaults_to_unspecified() {
        let tx: Transaction =
            serde_json::from_str(r#"{"title": "x", "transactionDate": "2024-03-01T00:00:00Z"}"#)
                .unwrap();
        assert_eq!(tx.transaction_type, TransactionType::Unspecified);
        assert_eq!(TransactionType::default(), TransactionType::Unspecified);
    }

    #[test]
    fn test_filter_skips_empty_fields() {
        let filter = TransactionFilter {
            limit: 50,
            ..Default::default()
        };
        let json = serde_json::to_value(&filter).unwrap();
        assert_eq!(json, serde_json::json!({"limit": 50, "skip": 0}));
    }
}
