use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::api::ApiClient;
use crate::models::Transaction;

const SNIPPETS_FILE: &str = "snippets.json";

/// Transactions created concurrently during a replay.
const REPLAY_CONCURRENCY: usize = 4;

/// A named group of transaction templates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snippet {
    pub id: u64,
    pub title: String,
    pub transactions: Vec<Transaction>,
    pub created_at: DateTime<Utc>,
}

/// A template that could not be created during a replay.
#[derive(Debug)]
pub struct ReplayFailure {
    /// Position of the template in the snippet
    pub index: usize,
    pub title: String,
    pub error: anyhow::Error,
}

/// What a replay created and what it did not.
///
/// Every template is attempted, so `created` and `failed` together account
/// for the whole snippet.
#[derive(Debug, Default)]
pub struct ReplayOutcome {
    /// Created transactions in template order, skipping failures
    pub created: Vec<Transaction>,
    pub failed: Vec<ReplayFailure>,
}

impl ReplayOutcome {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Snippets kept in a single JSON file in the data directory.
pub struct SnippetStore {
    path: PathBuf,
}

impl SnippetStore {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join(SNIPPETS_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn list(&self) -> Result<Vec<Snippet>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let contents = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read snippets file: {}", self.path.display()))?;
        serde_json::from_str(&contents).context("Failed to parse snippets file")
    }

    pub fn get(&self, id: u64) -> Result<Option<Snippet>> {
        Ok(self.list()?.into_iter().find(|s| s.id == id))
    }

    /// Store `transactions` as a new snippet. Ids and dates are dropped;
    /// they are assigned again on replay.
    pub fn save(&self, title: &str, transactions: Vec<Transaction>) -> Result<Snippet> {
        let mut snippets = self.list()?;
        let id = snippets.iter().map(|s| s.id).max().unwrap_or(0) + 1;
        let snippet = Snippet {
            id,
            title: title.to_string(),
            transactions: transactions
                .into_iter()
                .map(|mut tx| {
                    tx.id = 0;
                    tx
                })
                .collect(),
            created_at: Utc::now(),
        };
        snippets.push(snippet.clone());
        self.write(&snippets)?;
        debug!(id, title, "Saved snippet");
        Ok(snippet)
    }

    pub fn rename(&self, id: u64, title: &str) -> Result<()> {
        let mut snippets = self.list()?;
        let snippet = snippets
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| anyhow::anyhow!("Snippet {} not found", id))?;
        snippet.title = title.to_string();
        self.write(&snippets)
    }

    /// Returns false when no snippet has `id`.
    pub fn delete(&self, id: u64) -> Result<bool> {
        let mut snippets = self.list()?;
        let before = snippets.len();
        snippets.retain(|s| s.id != id);
        if snippets.len() == before {
            return Ok(false);
        }
        self.write(&snippets)?;
        Ok(true)
    }

    /// Create every transaction of the snippet dated now.
    ///
    /// A failed template does not stop the others; each outcome is reported
    /// so the caller knows exactly which transactions now exist. Only a
    /// missing snippet is an error.
    pub async fn replay(&self, client: &ApiClient, id: u64) -> Result<ReplayOutcome> {
        let snippet = self
            .get(id)?
            .ok_or_else(|| anyhow::anyhow!("Snippet {} not found", id))?;
        let now = Utc::now();

        let results: Vec<(usize, String, Result<Transaction>)> =
            stream::iter(snippet.transactions.into_iter().enumerate().map(|(index, mut tx)| {
                tx.id = 0;
                tx.transaction_date = now;
                let title = tx.title.clone();
                async move { (index, title, client.create_transaction(tx).await) }
            }))
            .buffered(REPLAY_CONCURRENCY)
            .collect()
            .await;

        let mut outcome = ReplayOutcome::default();
        for (index, title, result) in results {
            match result {
                Ok(tx) => outcome.created.push(tx),
                Err(error) => {
                    warn!(id, index, title = %title, error = %error, "Snippet template not created");
                    outcome.failed.push(ReplayFailure { index, title, error });
                }
            }
        }

        info!(
            id,
            created = outcome.created.len(),
            failed = outcome.failed.len(),
            "Replayed snippet"
        );
        Ok(outcome)
    }

    fn write(&self, snippets: &[Snippet]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(snippets)?;
        std::fs::write(&self.path, contents)
            .with_context(|| format!("Failed to write snippets file: {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Session;
    use crate::models::TransactionType;
    use crate::rpc::testing::FakeTransport;
    use crate::rpc::{Code, RpcMethod};
    use chrono::TimeZone;
    use serde_json::json;
    use std::sync::Arc;

    fn template(title: &str) -> Transaction {
        Transaction {
            id: 55,
            title: title.to_string(),
            notes: String::new(),
            transaction_date: Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap(),
            transaction_type: TransactionType::Expense,
            source_account_id: Some(1),
            source_amount: "-12.00".to_string(),
            source_currency: "EUR".to_string(),
            destination_account_id: None,
            destination_amount: String::new(),
            destination_currency: String::new(),
            category_id: Some(3),
            tag_ids: vec![],
            reference_number: String::new(),
        }
    }

    #[test]
    fn test_empty_store_lists_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnippetStore::new(dir.path());
        assert!(store.list().unwrap().is_empty());
        assert!(store.get(1).unwrap().is_none());
    }

    #[test]
    fn test_save_assigns_ids_and_strips_transaction_ids() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnippetStore::new(dir.path());

        let first = store.save("groceries", vec![template("Market")]).unwrap();
        let second = store.save("rent", vec![template("Rent")]).unwrap();

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert_eq!(first.transactions[0].id, 0);
        assert_eq!(store.list().unwrap().len(), 2);
        assert!(dir.path().join("snippets.json").exists());
    }

    #[test]
    fn test_rename_and_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnippetStore::new(dir.path());
        let snippet = store.save("old", vec![]).unwrap();

        store.rename(snippet.id, "new").unwrap();
        assert_eq!(store.get(snippet.id).unwrap().unwrap().title, "new");
        assert!(store.rename(99, "x").is_err());

        assert!(store.delete(snippet.id).unwrap());
        assert!(!store.delete(snippet.id).unwrap());
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn test_ids_not_reused_after_delete_of_older_snippet() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnippetStore::new(dir.path());
        store.save("a", vec![]).unwrap();
        let b = store.save("b", vec![]).unwrap();
        store.delete(1).unwrap();

        let c = store.save("c", vec![]).unwrap();
        assert_eq!(c.id, b.id + 1);
    }

    fn client(dir: &Path, transport: Arc<FakeTransport>) -> ApiClient {
        let session = Arc::new(Session::new(dir.to_path_buf()));
        ApiClient::with_transport("http://api.test", session, transport)
    }

    #[tokio::test]
    async fn test_replay_creates_each_transaction_dated_now() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnippetStore::new(dir.path());
        let snippet = store
            .save("weekly", vec![template("Bakery"), template("Butcher")])
            .unwrap();

        let transport = Arc::new(FakeTransport::new(json!({})));
        transport.respond(
            RpcMethod::CreateTransaction,
            json!({"transaction": {"id": "500", "title": "created", "transactionDate": "2024-06-01T00:00:00Z"}}),
        );
        let client = client(dir.path(), transport.clone());

        let before = Utc::now();
        let outcome = store.replay(&client, snippet.id).await.unwrap();

        assert!(outcome.is_complete());
        assert_eq!(outcome.created.len(), 2);
        assert_eq!(transport.calls_to(RpcMethod::CreateTransaction), 2);
        let sent = transport.last_request().unwrap();
        let date: DateTime<Utc> =
            serde_json::from_value(sent.payload["transaction"]["transactionDate"].clone()).unwrap();
        assert!(date >= before);
        assert_eq!(sent.payload["transaction"]["id"], "0");
    }

    #[tokio::test]
    async fn test_replay_unknown_snippet_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnippetStore::new(dir.path());
        let transport = Arc::new(FakeTransport::new(json!({})));
        let client = client(dir.path(), transport.clone());

        assert!(store.replay(&client, 7).await.is_err());
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_replay_reports_failed_middle_template() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnippetStore::new(dir.path());
        let snippet = store
            .save("commute", vec![template("Bus"), template("Taxi"), template("Train")])
            .unwrap();
        let transport = Arc::new(
            FakeTransport::new(json!({})).with_delay(std::time::Duration::from_millis(20)),
        );
        transport.respond(
            RpcMethod::CreateTransaction,
            json!({"transaction": {"id": "9", "title": "created", "transactionDate": "2024-06-01T00:00:00Z"}}),
        );
        transport.fail_call(2, Code::Internal);
        let client = client(dir.path(), transport.clone());

        let outcome = store.replay(&client, snippet.id).await.unwrap();

        assert!(!outcome.is_complete());
        assert_eq!(transport.calls_to(RpcMethod::CreateTransaction), 3);
        assert_eq!(outcome.created.len(), 2);
        assert_eq!(outcome.failed.len(), 1);
        assert_eq!(outcome.failed[0].index, 1);
        assert_eq!(outcome.failed[0].title, "Taxi");
    }
}
