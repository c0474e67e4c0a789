use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountType {
    #[serde(rename = "ACCOUNT_TYPE_UNSPECIFIED")]
    #[default]
    Unspecified,
    #[serde(rename = "ACCOUNT_TYPE_ASSET")]
    Asset,
    #[serde(rename = "ACCOUNT_TYPE_LIABILITY")]
    Liability,
    #[serde(rename = "ACCOUNT_TYPE_EXPENSE")]
    Expense,
    #[serde(rename = "ACCOUNT_TYPE_INCOME")]
    Income,
    #[serde(rename = "ACCOUNT_TYPE_ADJUSTMENT")]
    Adjustment,
}

impl AccountType {
    pub fn display_name(&self) -> &'static str {
        match self {
            AccountType::Unspecified => "Unknown",
            AccountType::Asset => "Asset",
            AccountType::Liability => "Liability",
            AccountType::Expense => "Expense",
            AccountType::Income => "Income",
            AccountType::Adjustment => "Adjustment",
        }
    }

    /// Parse a user-supplied name such as `asset` or `Liability`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "asset" => Some(AccountType::Asset),
            "liability" => Some(AccountType::Liability),
            "expense" => Some(AccountType::Expense),
            "income" => Some(AccountType::Income),
            "adjustment" => Some(AccountType::Adjustment),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    #[serde(default)]
    pub id: i32,
    pub name: String,
    pub currency: String,
    #[serde(default, rename = "type")]
    pub account_type: AccountType,
    /// Decimal string in the account currency
    #[serde(default)]
    pub current_balance: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default)]
    pub display_order: i32,
}

impl Account {
    pub fn new(name: impl Into<String>, currency: impl Into<String>, account_type: AccountType) -> Self {
        Self {
            id: 0,
            name: name.into(),
            currency: currency.into(),
            account_type,
            current_balance: String::new(),
            note: None,
            display_order: 0,
        }
    }
}

/// Accounts valid as source and destination for one transaction type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicableAccounts {
    #[serde(default)]
    pub source_accounts: Vec<Account>,
    #[serde(default)]
    pub destination_accounts: Vec<Account>,
}
