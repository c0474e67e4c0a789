//! Typed client for the moneyflow backend.
//!
//! `ApiClient` is the composition root of the RPC stack: it owns the
//! response caches, installs the auth and cache interceptors in front of
//! the transport, and exposes one async method per backend operation.

use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::auth::{Session, SessionData};
use crate::cache::CacheRegistry;
use crate::interceptors::{AuthInterceptor, CacheInterceptor};
use crate::models::{
    Account, ApplicableAccounts, Category, Configuration, CreatedServiceToken, Currency,
    DryRunResult, Rule, ScheduledRule, ServiceToken, Tag, Transaction, TransactionFilter,
    TransactionType,
};
use crate::rpc::{HttpTransport, Pipeline, RpcMethod, RpcRequest, Transport};

// ============================================================================
// Request / response messages
// ============================================================================

#[derive(Debug, Default, Serialize)]
struct Empty {}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    token: String,
}

#[derive(Debug, Serialize)]
struct IdRequest {
    id: i32,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    tags: Vec<Tag>,
}

#[derive(Debug, Serialize, Deserialize)]
struct TagMessage {
    tag: Tag,
}

#[derive(Debug, Deserialize)]
struct CategoriesResponse {
    #[serde(default)]
    categories: Vec<Category>,
}

#[derive(Debug, Serialize, Deserialize)]
struct CategoryMessage {
    category: Category,
}

#[derive(Debug, Deserialize)]
struct CurrenciesResponse {
    #[serde(default)]
    currencies: Vec<Currency>,
}

#[derive(Debug, Serialize, Deserialize)]
struct CurrencyMessage {
    currency: Currency,
}

#[derive(Debug, Deserialize)]
struct ConfigurationResponse {
    configuration: Configuration,
}

#[derive(Debug, Deserialize)]
struct AccountsResponse {
    #[serde(default)]
    accounts: Vec<Account>,
}

#[derive(Debug, Serialize, Deserialize)]
struct AccountMessage {
    account: Account,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApplicableAccountsRequest {
    transaction_type: TransactionType,
}

#[derive(Debug, Serialize)]
struct ListTransactionsRequest<'a> {
    filter: &'a TransactionFilter,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransactionsResponse {
    #[serde(default)]
    transactions: Vec<Transaction>,
}

#[derive(Debug, Serialize, Deserialize)]
struct TransactionMessage {
    transaction: Transaction,
}

#[derive(Debug, Serialize)]
struct DeleteTransactionsRequest {
    ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RulesResponse {
    #[serde(default)]
    rules: Vec<Rule>,
}

#[derive(Debug, Serialize, Deserialize)]
struct RuleMessage {
    rule: Rule,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DryRunRequest<'a> {
    rule: &'a Rule,
    #[serde(skip_serializing_if = "Option::is_none", with = "crate::models::int64::option")]
    transaction_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScheduledRulesResponse {
    #[serde(default)]
    rules: Vec<ScheduledRule>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ScheduledRuleMessage {
    rule: ScheduledRule,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServiceTokensResponse {
    #[serde(default)]
    service_tokens: Vec<ServiceToken>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateServiceTokenRequest<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    ttl_days: Option<u32>,
}

#[derive(Debug, Serialize)]
struct RevokeServiceTokenRequest<'a> {
    id: &'a str,
}

// ============================================================================
// Client
// ============================================================================

/// Client for the moneyflow backend.
pub struct ApiClient {
    endpoint: String,
    pipeline: Pipeline,
    caches: Arc<CacheRegistry>,
    session: Arc<Session>,
}

impl ApiClient {
    /// Create a client talking Connect over HTTP to `endpoint`
    pub fn new(endpoint: impl Into<String>, session: Arc<Session>) -> Result<Self> {
        let transport = HttpTransport::new().context("Failed to build HTTP client")?;
        Ok(Self::with_transport(endpoint, session, Arc::new(transport)))
    }

    /// Create a client on top of an arbitrary transport
    pub fn with_transport(
        endpoint: impl Into<String>,
        session: Arc<Session>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let caches = Arc::new(CacheRegistry::new());
        let pipeline = Pipeline::new(transport)
            .with(AuthInterceptor::new(session.clone(), caches.clone()))
            .with(CacheInterceptor::new(caches.clone()));
        Self {
            endpoint: endpoint.into(),
            pipeline,
            caches,
            session,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn caches(&self) -> &Arc<CacheRegistry> {
        &self.caches
    }

    async fn call(&self, method: RpcMethod, request: &impl Serialize) -> Result<Value> {
        let payload = serde_json::to_value(request)
            .with_context(|| format!("Failed to encode {} request", method))?;
        let response = self
            .pipeline
            .call(RpcRequest::new(&self.endpoint, method, payload))
            .await?;

        for profile in method.invalidates() {
            debug!(method = %method, profile = %profile, "Invalidating after write");
            self.caches.clear(*profile);
        }
        Ok(response)
    }

    async fn unary<T: DeserializeOwned>(&self, method: RpcMethod, request: &impl Serialize) -> Result<T> {
        let response = self.call(method, request).await?;
        serde_json::from_value(response)
            .with_context(|| format!("Failed to parse {} response", method))
    }

    /// Server-streaming call; every streamed message is decoded as `T`.
    async fn stream<T: DeserializeOwned>(&self, method: RpcMethod, request: &impl Serialize) -> Result<Vec<T>> {
        match self.call(method, request).await? {
            Value::Array(messages) => messages
                .into_iter()
                .map(|m| {
                    serde_json::from_value(m)
                        .with_context(|| format!("Failed to parse {} stream message", method))
                })
                .collect(),
            other => Err(anyhow::anyhow!(
                "Expected stream messages from {}, got {}",
                method,
                other
            )),
        }
    }

    // ===== Session =====

    /// Exchange credentials for a token and start a session
    pub async fn login(&self, username: &str, password: &str) -> Result<()> {
        let response: LoginResponse = self
            .unary(RpcMethod::Login, &LoginRequest { username, password })
            .await
            .context("Login failed")?;
        self.session
            .update(SessionData::new(response.token, username.to_string()))?;
        // Cached responses belong to the previous identity
        self.caches.clear_all();
        info!(username = username, "Logged in");
        Ok(())
    }

    pub fn logout(&self) -> Result<()> {
        self.session.clear()?;
        self.caches.clear_all();
        info!("Logged out");
        Ok(())
    }

    // ===== Configuration =====

    pub async fn get_configuration(&self) -> Result<Configuration> {
        let response: ConfigurationResponse =
            self.unary(RpcMethod::GetConfigurations, &Empty::default()).await?;
        Ok(response.configuration)
    }

    // ===== Tags =====

    pub async fn list_tags(&self) -> Result<Vec<Tag>> {
        let response: TagsResponse = self.unary(RpcMethod::ListTags, &Empty::default()).await?;
        Ok(response.tags)
    }

    pub async fn create_tag(&self, tag: Tag) -> Result<Tag> {
        let response: TagMessage = self.unary(RpcMethod::CreateTag, &TagMessage { tag }).await?;
        Ok(response.tag)
    }

    pub async fn update_tag(&self, tag: Tag) -> Result<Tag> {
        let response: TagMessage = self.unary(RpcMethod::UpdateTag, &TagMessage { tag }).await?;
        Ok(response.tag)
    }

    pub async fn delete_tag(&self, id: i32) -> Result<()> {
        self.call(RpcMethod::DeleteTag, &IdRequest { id }).await?;
        Ok(())
    }

    // ===== Categories =====

    pub async fn list_categories(&self) -> Result<Vec<Category>> {
        let response: CategoriesResponse =
            self.unary(RpcMethod::ListCategories, &Empty::default()).await?;
        Ok(response.categories)
    }

    pub async fn create_category(&self, category: Category) -> Result<Category> {
        let response: CategoryMessage = self
            .unary(RpcMethod::CreateCategory, &CategoryMessage { category })
            .await?;
        Ok(response.category)
    }

    pub async fn update_category(&self, category: Category) -> Result<Category> {
        let response: CategoryMessage = self
            .unary(RpcMethod::UpdateCategory, &CategoryMessage { category })
            .await?;
        Ok(response.category)
    }

    pub async fn delete_category(&self, id: i32) -> Result<()> {
        self.call(RpcMethod::DeleteCategory, &IdRequest { id }).await?;
        Ok(())
    }

    // ===== Currencies =====

    pub async fn list_currencies(&self) -> Result<Vec<Currency>> {
        let response: CurrenciesResponse =
            self.unary(RpcMethod::ListCurrencies, &Empty::default()).await?;
        Ok(response.currencies)
    }

    pub async fn create_currency(&self, currency: Currency) -> Result<Currency> {
        let response: CurrencyMessage = self
            .unary(RpcMethod::CreateCurrency, &CurrencyMessage { currency })
            .await?;
        Ok(response.currency)
    }

    pub async fn update_currency(&self, currency: Currency) -> Result<Currency> {
        let response: CurrencyMessage = self
            .unary(RpcMethod::UpdateCurrency, &CurrencyMessage { currency })
            .await?;
        Ok(response.currency)
    }

    // ===== Accounts =====

    pub async fn list_accounts(&self) -> Result<Vec<Account>> {
        let response: AccountsResponse =
            self.unary(RpcMethod::ListAccounts, &Empty::default()).await?;
        Ok(response.accounts)
    }

    /// Accounts that may be used on each side of a transaction of `transaction_type`
    pub async fn get_applicable_accounts(
        &self,
        transaction_type: TransactionType,
    ) -> Result<ApplicableAccounts> {
        self.unary(
            RpcMethod::GetApplicableAccounts,
            &ApplicableAccountsRequest { transaction_type },
        )
        .await
    }

    pub async fn create_account(&self, account: Account) -> Result<Account> {
        let response: AccountMessage = self
            .unary(RpcMethod::CreateAccount, &AccountMessage { account })
            .await?;
        Ok(response.account)
    }

    pub async fn update_account(&self, account: Account) -> Result<Account> {
        let response: AccountMessage = self
            .unary(RpcMethod::UpdateAccount, &AccountMessage { account })
            .await?;
        Ok(response.account)
    }

    pub async fn delete_account(&self, id: i32) -> Result<()> {
        self.call(RpcMethod::DeleteAccount, &IdRequest { id }).await?;
        Ok(())
    }

    // ===== Transactions =====

    pub async fn list_transactions(&self, filter: &TransactionFilter) -> Result<Vec<Transaction>> {
        let response: TransactionsResponse = self
            .unary(RpcMethod::ListTransactions, &ListTransactionsRequest { filter })
            .await?;
        Ok(response.transactions)
    }

    pub async fn create_transaction(&self, transaction: Transaction) -> Result<Transaction> {
        let response: TransactionMessage = self
            .unary(RpcMethod::CreateTransaction, &TransactionMessage { transaction })
            .await?;
        Ok(response.transaction)
    }

    pub async fn update_transaction(&self, transaction: Transaction) -> Result<Transaction> {
        let response: TransactionMessage = self
            .unary(RpcMethod::UpdateTransaction, &TransactionMessage { transaction })
            .await?;
        Ok(response.transaction)
    }

    pub async fn delete_transactions(&self, ids: &[i64]) -> Result<()> {
        let request = DeleteTransactionsRequest {
            ids: ids.iter().map(|id| id.to_string()).collect(),
        };
        self.call(RpcMethod::DeleteTransactions, &request).await?;
        Ok(())
    }

    /// Stream every transaction matching `filter`
    pub async fn export_transactions(&self, filter: &TransactionFilter) -> Result<Vec<Transaction>> {
        let batches: Vec<TransactionsResponse> = self
            .stream(RpcMethod::ExportTransactions, &ListTransactionsRequest { filter })
            .await?;
        Ok(batches.into_iter().flat_map(|b| b.transactions).collect())
    }

    // ===== Rules =====

    pub async fn list_rules(&self) -> Result<Vec<Rule>> {
        let response: RulesResponse = self.unary(RpcMethod::ListRules, &Empty::default()).await?;
        Ok(response.rules)
    }

    pub async fn create_rule(&self, rule: Rule) -> Result<Rule> {
        let response: RuleMessage = self.unary(RpcMethod::CreateRule, &RuleMessage { rule }).await?;
        Ok(response.rule)
    }

    pub async fn update_rule(&self, rule: Rule) -> Result<Rule> {
        let response: RuleMessage = self.unary(RpcMethod::UpdateRule, &RuleMessage { rule }).await?;
        Ok(response.rule)
    }

    pub async fn delete_rule(&self, id: i32) -> Result<()> {
        self.call(RpcMethod::DeleteRule, &IdRequest { id }).await?;
        Ok(())
    }

    /// Evaluate `rule` server-side without saving anything.
    ///
    /// Without a transaction id the backend picks a sample transaction.
    pub async fn dry_run_rule(&self, rule: &Rule, transaction_id: Option<i64>) -> Result<DryRunResult> {
        self.unary(
            RpcMethod::DryRunRule,
            &DryRunRequest {
                rule,
                transaction_id,
            },
        )
        .await
    }

    // ===== Scheduled rules =====

    pub async fn list_scheduled_rules(&self) -> Result<Vec<ScheduledRule>> {
        let response: ScheduledRulesResponse = self
            .unary(RpcMethod::ListScheduledRules, &Empty::default())
            .await?;
        Ok(response.rules)
    }

    pub async fn create_scheduled_rule(&self, rule: ScheduledRule) -> Result<ScheduledRule> {
        let response: ScheduledRuleMessage = self
            .unary(RpcMethod::CreateScheduledRule, &ScheduledRuleMessage { rule })
            .await?;
        Ok(response.rule)
    }

    pub async fn update_scheduled_rule(&self, rule: ScheduledRule) -> Result<ScheduledRule> {
        let response: ScheduledRuleMessage = self
            .unary(RpcMethod::UpdateScheduledRule, &ScheduledRuleMessage { rule })
            .await?;
        Ok(response.rule)
    }

    pub async fn delete_scheduled_rule(&self, id: i32) -> Result<()> {
        self.call(RpcMethod::DeleteScheduledRule, &IdRequest { id }).await?;
        Ok(())
    }

    // ===== Service tokens =====

    pub async fn list_service_tokens(&self) -> Result<Vec<ServiceToken>> {
        let response: ServiceTokensResponse = self
            .unary(RpcMethod::ListServiceTokens, &Empty::default())
            .await?;
        Ok(response.service_tokens)
    }

    pub async fn create_service_token(&self, name: &str, ttl_days: Option<u32>) -> Result<CreatedServiceToken> {
        self.unary(
            RpcMethod::CreateServiceToken,
            &CreateServiceTokenRequest { name, ttl_days },
        )
        .await
    }

    pub async fn revoke_service_token(&self, id: &str) -> Result<()> {
        self.call(RpcMethod::RevokeServiceToken, &RevokeServiceTokenRequest { id })
            .await?;
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthState;
    use crate::models::AccountType;
    use crate::rpc::testing::FakeTransport;
    use crate::rpc::{Code, RpcError};
    use serde_json::json;
    use std::time::Duration;

    struct Fixture {
        _dir: tempfile::TempDir,
        transport: Arc<FakeTransport>,
        client: ApiClient,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let session = Arc::new(Session::new(dir.path().to_path_buf()));
        let transport = Arc::new(FakeTransport::new(json!({})));
        let client = ApiClient::with_transport("http://api.test", session, transport.clone());
        Fixture {
            _dir: dir,
            transport,
            client,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_list_tags_is_cached() {
        let f = fixture();
        f.transport.respond(
            RpcMethod::ListTags,
            json!({"tags": [{"id": 1, "name": "food"}, {"id": 2, "name": "rent"}]}),
        );

        let first = f.client.list_tags().await.unwrap();
        let second = f.client.list_tags().await.unwrap();

        assert_eq!(first.len(), 2);
        assert_eq!(first, second);
        assert_eq!(f.transport.calls_to(RpcMethod::ListTags), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_tag_invalidates_tag_list() {
        let f = fixture();
        f.transport.respond(RpcMethod::ListTags, json!({"tags": []}));
        f.transport
            .respond(RpcMethod::CreateTag, json!({"tag": {"id": 9, "name": "travel"}}));

        f.client.list_tags().await.unwrap();
        let created = f.client.create_tag(Tag::new("travel")).await.unwrap();
        f.client.list_tags().await.unwrap();

        assert_eq!(created.id, 9);
        assert_eq!(f.transport.calls_to(RpcMethod::ListTags), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_account_invalidates_applicable_accounts() {
        let f = fixture();
        f.transport.respond(
            RpcMethod::CreateAccount,
            json!({"account": {"id": 4, "name": "Wallet", "currency": "USD", "type": "ACCOUNT_TYPE_ASSET"}}),
        );

        f.client
            .get_applicable_accounts(TransactionType::Expense)
            .await
            .unwrap();
        f.client
            .create_account(Account::new("Wallet", "USD", AccountType::Asset))
            .await
            .unwrap();
        f.client
            .get_applicable_accounts(TransactionType::Expense)
            .await
            .unwrap();

        assert_eq!(f.transport.calls_to(RpcMethod::GetApplicableAccounts), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_applicable_accounts_refetched_after_short_ttl() {
        let f = fixture();
        f.client
            .get_applicable_accounts(TransactionType::Income)
            .await
            .unwrap();
        f.client
            .get_applicable_accounts(TransactionType::Income)
            .await
            .unwrap();
        assert_eq!(f.transport.calls(), 1);

        tokio::time::advance(Duration::from_secs(2)).await;
        f.client
            .get_applicable_accounts(TransactionType::Income)
            .await
            .unwrap();
        assert_eq!(f.transport.calls(), 2);
    }

    #[tokio::test]
    async fn test_login_stores_token_and_clears_caches() {
        let f = fixture();
        f.transport.respond(RpcMethod::Login, json!({"token": "abc"}));
        f.transport.respond(RpcMethod::ListCategories, json!({"categories": []}));

        f.client.list_categories().await.unwrap();
        f.client.login("alice", "hunter2").await.unwrap();
        f.client.list_categories().await.unwrap();

        assert_eq!(f.client.session().token().as_deref(), Some("abc"));
        assert_eq!(f.transport.calls_to(RpcMethod::ListCategories), 2);
        let sent = f.transport.last_request().unwrap();
        assert_eq!(
            sent.metadata.get("authorization").map(String::as_str),
            Some("Bearer abc")
        );
    }

    #[tokio::test]
    async fn test_unauthenticated_error_surfaces_as_rpc_error() {
        let f = fixture();
        f.transport.respond(RpcMethod::Login, json!({"token": "abc"}));
        f.client.login("alice", "pw").await.unwrap();
        f.transport.fail_next(Code::Unauthenticated);

        let err = f.client.list_accounts().await.unwrap_err();

        let rpc = err.downcast_ref::<RpcError>().expect("rpc error");
        assert!(rpc.is_unauthenticated());
        assert_eq!(f.client.session().state(), AuthState::LoginRequired);
    }

    #[tokio::test]
    async fn test_failed_write_does_not_invalidate() {
        let f = fixture();
        f.transport.respond(RpcMethod::ListTags, json!({"tags": []}));
        f.client.list_tags().await.unwrap();

        f.transport.fail_next(Code::InvalidArgument);
        assert!(f.client.create_tag(Tag::new("")).await.is_err());
        f.client.list_tags().await.unwrap();

        assert_eq!(f.transport.calls_to(RpcMethod::ListTags), 1);
    }

    #[tokio::test]
    async fn test_export_transactions_flattens_stream() {
        let f = fixture();
        f.transport.respond(
            RpcMethod::ExportTransactions,
            json!([
                {"transactions": [{"id": "1", "title": "a", "transactionDate": "2024-01-01T00:00:00Z"}]},
                {"transactions": [{"id": "2", "title": "b", "transactionDate": "2024-01-02T00:00:00Z"}]}
            ]),
        );

        let all = f
            .client
            .export_transactions(&TransactionFilter::default())
            .await
            .unwrap();

        assert_eq!(all.iter().map(|t| t.id).collect::<Vec<_>>(), vec![1, 2]);
        assert!(f.transport.last_request().unwrap().streaming);
    }

    #[tokio::test]
    async fn test_dry_run_sends_script_and_transaction_id() {
        let f = fixture();
        f.transport
            .respond(RpcMethod::DryRunRule, json!({"ruleApplied": true}));

        let result = f
            .client
            .dry_run_rule(&Rule::draft("tx:title(\"x\")"), Some(77))
            .await
            .unwrap();

        assert!(result.rule_applied);
        let sent = f.transport.last_request().unwrap();
        assert_eq!(sent.payload["transactionId"], json!("77"));
        assert_eq!(sent.payload["rule"]["script"], json!("tx:title(\"x\")"));
    }

    #[tokio::test]
    async fn test_delete_transactions_encodes_ids_as_strings() {
        let f = fixture();
        f.client.delete_transactions(&[5, 6]).await.unwrap();
        let sent = f.transport.last_request().unwrap();
        assert_eq!(sent.payload, json!({"ids": ["5", "6"]}));
    }
}
