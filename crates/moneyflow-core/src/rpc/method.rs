use std::fmt;

use crate::cache::CacheProfile;

/// Protobuf package every service lives in.
const PACKAGE: &str = "moneyflow.v1";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodKind {
    Unary,
    ServerStreaming,
}

/// Every RPC the client issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RpcMethod {
    // ConfigurationService
    GetConfigurations,
    // UsersService
    Login,
    // TagsService
    ListTags,
    CreateTag,
    UpdateTag,
    DeleteTag,
    // CategoriesService
    ListCategories,
    CreateCategory,
    UpdateCategory,
    DeleteCategory,
    // CurrencyService
    ListCurrencies,
    CreateCurrency,
    UpdateCurrency,
    // AccountsService
    ListAccounts,
    GetApplicableAccounts,
    CreateAccount,
    UpdateAccount,
    DeleteAccount,
    // TransactionsService
    ListTransactions,
    CreateTransaction,
    UpdateTransaction,
    DeleteTransactions,
    ExportTransactions,
    // RulesService
    ListRules,
    CreateRule,
    UpdateRule,
    DeleteRule,
    DryRunRule,
    // ScheduledRulesService
    ListScheduledRules,
    CreateScheduledRule,
    UpdateScheduledRule,
    DeleteScheduledRule,
    // ServiceTokensService
    ListServiceTokens,
    CreateServiceToken,
    RevokeServiceToken,
}

impl RpcMethod {
    pub fn service(&self) -> &'static str {
        use RpcMethod::*;
        match self {
            GetConfigurations => "ConfigurationService",
            Login => "UsersService",
            ListTags | CreateTag | UpdateTag | DeleteTag => "TagsService",
            ListCategories | CreateCategory | UpdateCategory | DeleteCategory => {
                "CategoriesService"
            }
            ListCurrencies | CreateCurrency | UpdateCurrency => "CurrencyService",
            ListAccounts | GetApplicableAccounts | CreateAccount | UpdateAccount
            | DeleteAccount => "AccountsService",
            ListTransactions | CreateTransaction | UpdateTransaction | DeleteTransactions
            | ExportTransactions => "TransactionsService",
            ListRules | CreateRule | UpdateRule | DeleteRule | DryRunRule => "RulesService",
            ListScheduledRules | CreateScheduledRule | UpdateScheduledRule
            | DeleteScheduledRule => "ScheduledRulesService",
            ListServiceTokens | CreateServiceToken | RevokeServiceToken => {
                "ServiceTokensService"
            }
        }
    }

    pub fn name(&self) -> &'static str {
        use RpcMethod::*;
        match self {
            GetConfigurations => "GetConfigurations",
            Login => "Login",
            ListTags => "ListTags",
            CreateTag => "CreateTag",
            UpdateTag => "UpdateTag",
            DeleteTag => "DeleteTag",
            ListCategories => "ListCategories",
            CreateCategory => "CreateCategory",
            UpdateCategory => "UpdateCategory",
            DeleteCategory => "DeleteCategory",
            ListCurrencies => "ListCurrencies",
            CreateCurrency => "CreateCurrency",
            UpdateCurrency => "UpdateCurrency",
            ListAccounts => "ListAccounts",
            GetApplicableAccounts => "GetApplicableAccounts",
            CreateAccount => "CreateAccount",
            UpdateAccount => "UpdateAccount",
            DeleteAccount => "DeleteAccount",
            ListTransactions => "ListTransactions",
            CreateTransaction => "CreateTransaction",
            UpdateTransaction => "UpdateTransaction",
            DeleteTransactions => "DeleteTransactions",
            ExportTransactions => "ExportTransactions",
            ListRules => "ListRules",
            CreateRule => "CreateRule",
            UpdateRule => "UpdateRule",
            DeleteRule => "DeleteRule",
            DryRunRule => "DryRunRule",
            ListScheduledRules => "ListScheduledRules",
            CreateScheduledRule => "CreateScheduledRule",
            UpdateScheduledRule => "UpdateScheduledRule",
            DeleteScheduledRule => "DeleteScheduledRule",
            ListServiceTokens => "ListServiceTokens",
            CreateServiceToken => "CreateServiceToken",
            RevokeServiceToken => "RevokeServiceToken",
        }
    }

    /// Fully qualified procedure path, e.g. `moneyflow.v1.TagsService/ListTags`.
    pub fn path(&self) -> String {
        format!("{}.{}/{}", PACKAGE, self.service(), self.name())
    }

    pub fn kind(&self) -> MethodKind {
        match self {
            RpcMethod::ExportTransactions => MethodKind::ServerStreaming,
            _ => MethodKind::Unary,
        }
    }

    pub fn is_streaming(&self) -> bool {
        self.kind() == MethodKind::ServerStreaming
    }

    /// Cache profile for allow-listed read methods; `None` means never cached.
    pub fn cache_profile(&self) -> Option<CacheProfile> {
        use RpcMethod::*;
        match self {
            ListTags | ListCategories | GetConfigurations => Some(CacheProfile::Default),
            GetApplicableAccounts | ListCurrencies => Some(CacheProfile::ShortLived),
            _ => None,
        }
    }

    /// Cache profiles made stale by a successful call to this method.
    pub fn invalidates(&self) -> &'static [CacheProfile] {
        use RpcMethod::*;
        match self {
            CreateTag | UpdateTag | DeleteTag | CreateCategory | UpdateCategory
            | DeleteCategory => &[CacheProfile::Default],
            CreateCurrency | UpdateCurrency | CreateAccount | UpdateAccount | DeleteAccount => {
                &[CacheProfile::ShortLived]
            }
            _ => &[],
        }
    }
}

impl fmt::Display for RpcMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.service(), self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path() {
        assert_eq!(RpcMethod::ListTags.path(), "moneyflow.v1.TagsService/ListTags");
        assert_eq!(
            RpcMethod::GetApplicableAccounts.path(),
            "moneyflow.v1.AccountsService/GetApplicableAccounts"
        );
    }

    #[test]
    fn test_cache_profiles() {
        assert_eq!(RpcMethod::ListTags.cache_profile(), Some(CacheProfile::Default));
        assert_eq!(RpcMethod::ListCategories.cache_profile(), Some(CacheProfile::Default));
        assert_eq!(RpcMethod::GetConfigurations.cache_profile(), Some(CacheProfile::Default));
        assert_eq!(
            RpcMethod::GetApplicableAccounts.cache_profile(),
            Some(CacheProfile::ShortLived)
        );
        assert_eq!(RpcMethod::ListCurrencies.cache_profile(), Some(CacheProfile::ShortLived));
        assert_eq!(RpcMethod::CreateAccount.cache_profile(), None);
        assert_eq!(RpcMethod::ListTransactions.cache_profile(), None);
    }

    #[test]
    fn test_writes_invalidate_the_profile_of_their_reads() {
        for (write, read) in [
            (RpcMethod::CreateTag, RpcMethod::ListTags),
            (RpcMethod::DeleteCategory, RpcMethod::ListCategories),
            (RpcMethod::CreateAccount, RpcMethod::GetApplicableAccounts),
            (RpcMethod::UpdateCurrency, RpcMethod::ListCurrencies),
        ] {
            let profile = read.cache_profile().expect("read is cacheable");
            assert!(write.invalidates().contains(&profile), "{} should clear {}", write, profile);
        }
        assert!(RpcMethod::ListTags.invalidates().is_empty());
    }

    #[test]
    fn test_streaming_kind() {
        assert!(RpcMethod::ExportTransactions.is_streaming());
        assert!(!RpcMethod::ListTransactions.is_streaming());
    }
}
