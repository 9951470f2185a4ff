//! Storage trait and its backends.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

use crate::config::DatabaseConfig;
use crate::db::errors::Result;
use crate::db::models::{
    articles::{Article, Keyword},
    settings::Setting,
    transactions::{NewTransaction, Transaction, TransactionStatus},
    usage::{AiUsageLog, NewUsageLog, UsageLogFilter, UsageTotals},
};
use crate::types::{AiProvider, ArticleId, KeywordId, OrderCode, UserId};

pub mod in_memory;
pub mod postgres;

/// Reads and writes against the hosted relational store.
///
/// Settings are scoped by an optional owner: `None` is the global (admin) scope.
#[async_trait]
pub trait Store: Send + Sync {
    async fn get_setting(&self, key: &str, user_id: Option<UserId>) -> Result<Option<Setting>>;

    /// Upsert by (key, owner). Last write wins.
    async fn set_setting(&self, key: &str, user_id: Option<UserId>, value: &Value) -> Result<Setting>;

    /// Usage logs, newest first.
    async fn list_usage_logs(&self, filter: &UsageLogFilter) -> Result<Vec<AiUsageLog>>;

    /// Usage aggregated per provider. Empty when nothing has been logged.
    async fn usage_totals(&self, user_id: Option<UserId>) -> Result<BTreeMap<AiProvider, UsageTotals>>;

    async fn record_usage(&self, log: &NewUsageLog) -> Result<AiUsageLog>;

    /// A user's articles, newest first.
    async fn list_articles(&self, user_id: UserId) -> Result<Vec<Article>>;

    async fn get_article(&self, id: ArticleId) -> Result<Option<Article>>;

    /// # Errors
    /// - `NotFound` if the article doesn't exist
    async fn update_article_image(&self, id: ArticleId, image_url: &str) -> Result<Article>;

    /// # Errors
    /// - `NotFound` if the article doesn't exist
    async fn update_article_published_url(&self, id: ArticleId, published_url: &str) -> Result<Article>;

    async fn get_keyword(&self, id: KeywordId) -> Result<Option<Keyword>>;

    /// Insert a `PENDING` transaction.
    ///
    /// # Errors
    /// - `UniqueViolation` if the order code is already taken
    async fn create_transaction(&self, transaction: &NewTransaction) -> Result<Transaction>;

    /// Store the provider's checkout URL on an existing transaction.
    async fn attach_checkout(&self, order_code: OrderCode, checkout_url: &str, payment_link_id: Option<&str>) -> Result<Transaction>;

    async fn set_transaction_status(&self, order_code: OrderCode, status: TransactionStatus) -> Result<Transaction>;
}

/// Build the store selected by configuration, running migrations when asked to.
pub async fn create_store(config: &DatabaseConfig) -> anyhow::Result<Arc<dyn Store>> {
    match config {
        DatabaseConfig::Memory => {
            info!("Using in-memory store; data will be lost on shutdown");
            Ok(Arc::new(in_memory::InMemoryStore::new()))
        }
        DatabaseConfig::External { url, pool, run_migrations } => {
            info!("Using external database");
            let store = postgres::PgStore::connect(url, pool).await?;
            if *run_migrations {
                postgres::migrator().run(store.pool()).await?;
            }
            Ok(Arc::new(store))
        }
    }
}
