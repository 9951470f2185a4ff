//! Process-local store for development and tests.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde_json::Value;
use std::collections::BTreeMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::Store;
use crate::db::errors::{DbError, Result};
use crate::db::models::{
    articles::{Article, Keyword},
    settings::Setting,
    transactions::{NewTransaction, Transaction, TransactionStatus},
    usage::{AiUsageLog, NewUsageLog, UsageLogFilter, UsageTotals},
};
use crate::types::{AiProvider, ArticleId, KeywordId, OrderCode, UserId};

#[derive(Default)]
pub struct InMemoryStore {
    settings: DashMap<(String, Option<UserId>), Setting>,
    usage_logs: RwLock<Vec<AiUsageLog>>,
    articles: DashMap<ArticleId, Article>,
    keywords: DashMap<KeywordId, Keyword>,
    transactions: DashMap<OrderCode, Transaction>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Articles are created by the editor front end; this seeds them directly.
    pub fn insert_article(&self, article: Article) {
        self.articles.insert(article.id, article);
    }

    pub fn insert_keyword(&self, keyword: Keyword) {
        self.keywords.insert(keyword.id, keyword);
    }

    /// Snapshot of every transaction, in no particular order.
    pub fn transactions(&self) -> Vec<Transaction> {
        self.transactions.iter().map(|entry| entry.value().clone()).collect()
    }

    fn update_article(&self, id: ArticleId, update: impl FnOnce(&mut Article)) -> Result<Article> {
        let mut article = self.articles.get_mut(&id).ok_or(DbError::NotFound)?;
        update(&mut *article);
        article.updated_at = Utc::now();
        Ok(article.clone())
    }

    fn update_transaction(&self, order_code: OrderCode, update: impl FnOnce(&mut Transaction)) -> Result<Transaction> {
        let mut transaction = self.transactions.get_mut(&order_code).ok_or(DbError::NotFound)?;
        update(&mut *transaction);
        transaction.updated_at = Utc::now();
        Ok(transaction.clone())
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn get_setting(&self, key: &str, user_id: Option<UserId>) -> Result<Option<Setting>> {
        Ok(self.settings.get(&(key.to_string(), user_id)).map(|s| s.clone()))
    }

    async fn set_setting(&self, key: &str, user_id: Option<UserId>, value: &Value) -> Result<Setting> {
        let setting = Setting {
            key: key.to_string(),
            user_id,
            value: value.clone(),
            updated_at: Utc::now(),
        };
        self.settings.insert((key.to_string(), user_id), setting.clone());
        Ok(setting)
    }

    async fn list_usage_logs(&self, filter: &UsageLogFilter) -> Result<Vec<AiUsageLog>> {
        let logs = self.usage_logs.read().await;
        // Appended in time order, so newest first is a reverse walk
        Ok(logs
            .iter()
            .rev()
            .filter(|log| filter.user_id.is_none() || log.user_id == filter.user_id)
            .take(filter.limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn usage_totals(&self, user_id: Option<UserId>) -> Result<BTreeMap<AiProvider, UsageTotals>> {
        let logs = self.usage_logs.read().await;
        let mut totals: BTreeMap<AiProvider, UsageTotals> = BTreeMap::new();
        for log in logs.iter().filter(|log| user_id.is_none() || log.user_id == user_id) {
            totals.entry(log.provider).or_default().add(log);
        }
        Ok(totals)
    }

    async fn record_usage(&self, log: &NewUsageLog) -> Result<AiUsageLog> {
        let created = AiUsageLog {
            id: Uuid::new_v4(),
            user_id: log.user_id,
            provider: log.provider,
            model: log.model.clone(),
            operation: log.operation,
            prompt_tokens: log.prompt_tokens,
            completion_tokens: log.completion_tokens,
            total_tokens: log.total_tokens,
            created_at: Utc::now(),
        };
        self.usage_logs.write().await.push(created.clone());
        Ok(created)
    }

    async fn list_articles(&self, user_id: UserId) -> Result<Vec<Article>> {
        let mut articles: Vec<Article> = self
            .articles
            .iter()
            .filter(|entry| entry.user_id == user_id)
            .map(|entry| entry.value().clone())
            .collect();
        articles.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(articles)
    }

    async fn get_article(&self, id: ArticleId) -> Result<Option<Article>> {
        Ok(self.articles.get(&id).map(|a| a.clone()))
    }

    async fn update_article_image(&self, id: ArticleId, image_url: &str) -> Result<Article> {
        self.update_article(id, |article| article.image_url = Some(image_url.to_string()))
    }

    async fn update_article_published_url(&self, id: ArticleId, published_url: &str) -> Result<Article> {
        self.update_article(id, |article| article.published_url = Some(published_url.to_string()))
    }

    async fn get_keyword(&self, id: KeywordId) -> Result<Option<Keyword>> {
        Ok(self.keywords.get(&id).map(|k| k.clone()))
    }

    async fn create_transaction(&self, transaction: &NewTransaction) -> Result<Transaction> {
        match self.transactions.entry(transaction.order_code) {
            Entry::Occupied(_) => Err(DbError::UniqueViolation {
                constraint: Some("transactions_pkey".to_string()),
                table: Some("transactions".to_string()),
                message: format!("order code {} already exists", transaction.order_code),
            }),
            Entry::Vacant(slot) => {
                let now = Utc::now();
                let created = Transaction {
                    order_code: transaction.order_code,
                    user_id: transaction.user_id,
                    plan: transaction.plan.clone(),
                    amount: transaction.amount,
                    status: TransactionStatus::Pending,
                    checkout_url: None,
                    payment_link_id: None,
                    created_at: now,
                    updated_at: now,
                };
                slot.insert(created.clone());
                Ok(created)
            }
        }
    }

    async fn attach_checkout(&self, order_code: OrderCode, checkout_url: &str, payment_link_id: Option<&str>) -> Result<Transaction> {
        self.update_transaction(order_code, |transaction| {
            transaction.checkout_url = Some(checkout_url.to_string());
            transaction.payment_link_id = payment_link_id.map(str::to_string);
        })
    }

    async fn set_transaction_status(&self, order_code: OrderCode, status: TransactionStatus) -> Result<Transaction> {
        self.update_transaction(order_code, |transaction| transaction.status = status)
    }
}
