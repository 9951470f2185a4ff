//! Postgres-backed store.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{instrument, warn};

use super::Store;
use crate::config::PoolSettings;
use crate::db::errors::{DbError, Result};
use crate::db::models::{
    articles::{Article, Keyword},
    settings::Setting,
    transactions::{NewTransaction, Transaction, TransactionStatus},
    usage::{AiUsageLog, NewUsageLog, UsageLogFilter, UsageTotals},
};
use crate::types::{AiProvider, ArticleId, KeywordId, OrderCode, UserId};

/// Get the seogen database migrator
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

const ARTICLE_COLUMNS: &str =
    "id, user_id, title, content, slug, keyword_id, image_url, published_url, created_at, updated_at";

const TRANSACTION_COLUMNS: &str =
    "order_code, user_id, plan, amount, status, checkout_url, payment_link_id, created_at, updated_at";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

#[derive(FromRow)]
struct ProviderTotalsRow {
    provider: String,
    #[sqlx(flatten)]
    totals: UsageTotals,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(url: &str, settings: &PoolSettings) -> anyhow::Result<Self> {
        let mut options = PgPoolOptions::new()
            .max_connections(settings.max_connections)
            .min_connections(settings.min_connections)
            .acquire_timeout(Duration::from_secs(settings.acquire_timeout_secs));
        if settings.idle_timeout_secs > 0 {
            options = options.idle_timeout(Duration::from_secs(settings.idle_timeout_secs));
        }
        let pool = options.connect(url).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Store for PgStore {
    #[instrument(skip(self), err)]
    async fn get_setting(&self, key: &str, user_id: Option<UserId>) -> Result<Option<Setting>> {
        let setting = sqlx::query_as::<_, Setting>(
            "SELECT key, user_id, value, updated_at FROM settings WHERE key = $1 AND user_id IS NOT DISTINCT FROM $2",
        )
        .bind(key)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(setting)
    }

    #[instrument(skip(self, value), err)]
    async fn set_setting(&self, key: &str, user_id: Option<UserId>, value: &Value) -> Result<Setting> {
        let setting = sqlx::query_as::<_, Setting>(
            r#"
            INSERT INTO settings (key, user_id, value, updated_at)
            VALUES ($1, $2, $3, NOW())
            ON CONFLICT (key, (COALESCE(user_id, '00000000-0000-0000-0000-000000000000'::uuid)))
            DO UPDATE SET value = EXCLUDED.value, updated_at = NOW()
            RETURNING key, user_id, value, updated_at
            "#,
        )
        .bind(key)
        .bind(user_id)
        .bind(value)
        .fetch_one(&self.pool)
        .await?;
        Ok(setting)
    }

    #[instrument(skip(self), err)]
    async fn list_usage_logs(&self, filter: &UsageLogFilter) -> Result<Vec<AiUsageLog>> {
        let logs = sqlx::query_as::<_, AiUsageLog>(
            r#"
            SELECT id, user_id, provider, model, operation, prompt_tokens, completion_tokens, total_tokens, created_at
            FROM ai_usage_logs
            WHERE ($1::uuid IS NULL OR user_id = $1)
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(filter.user_id)
        .bind(filter.limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(logs)
    }

    #[instrument(skip(self), err)]
    async fn usage_totals(&self, user_id: Option<UserId>) -> Result<BTreeMap<AiProvider, UsageTotals>> {
        let rows = sqlx::query_as::<_, ProviderTotalsRow>(
            r#"
            SELECT provider,
                   COUNT(*)::BIGINT AS requests,
                   COALESCE(SUM(prompt_tokens), 0)::BIGINT AS prompt_tokens,
                   COALESCE(SUM(completion_tokens), 0)::BIGINT AS completion_tokens,
                   COALESCE(SUM(total_tokens), 0)::BIGINT AS total_tokens
            FROM ai_usage_logs
            WHERE ($1::uuid IS NULL OR user_id = $1)
            GROUP BY provider
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let mut totals = BTreeMap::new();
        for row in rows {
            match row.provider.parse::<AiProvider>() {
                Ok(provider) => {
                    totals.insert(provider, row.totals);
                }
                Err(e) => warn!("Skipping usage rows for {e}"),
            }
        }
        Ok(totals)
    }

    #[instrument(skip(self, log), fields(provider = %log.provider), err)]
    async fn record_usage(&self, log: &NewUsageLog) -> Result<AiUsageLog> {
        let created = sqlx::query_as::<_, AiUsageLog>(
            r#"
            INSERT INTO ai_usage_logs (user_id, provider, model, operation, prompt_tokens, completion_tokens, total_tokens)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, user_id, provider, model, operation, prompt_tokens, completion_tokens, total_tokens, created_at
            "#,
        )
        .bind(log.user_id)
        .bind(log.provider)
        .bind(&log.model)
        .bind(log.operation)
        .bind(log.prompt_tokens)
        .bind(log.completion_tokens)
        .bind(log.total_tokens)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    #[instrument(skip(self), err)]
    async fn list_articles(&self, user_id: UserId) -> Result<Vec<Article>> {
        let articles = sqlx::query_as::<_, Article>(&format!(
            "SELECT {ARTICLE_COLUMNS} FROM articles WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(articles)
    }

    #[instrument(skip(self), err)]
    async fn get_article(&self, id: ArticleId) -> Result<Option<Article>> {
        let article = sqlx::query_as::<_, Article>(&format!("SELECT {ARTICLE_COLUMNS} FROM articles WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(article)
    }

    #[instrument(skip(self, image_url), err)]
    async fn update_article_image(&self, id: ArticleId, image_url: &str) -> Result<Article> {
        let article = sqlx::query_as::<_, Article>(&format!(
            "UPDATE articles SET image_url = $2, updated_at = NOW() WHERE id = $1 RETURNING {ARTICLE_COLUMNS}"
        ))
        .bind(id)
        .bind(image_url)
        .fetch_optional(&self.pool)
        .await?;
        article.ok_or(DbError::NotFound)
    }

    #[instrument(skip(self), err)]
    async fn update_article_published_url(&self, id: ArticleId, published_url: &str) -> Result<Article> {
        let article = sqlx::query_as::<_, Article>(&format!(
            "UPDATE articles SET published_url = $2, updated_at = NOW() WHERE id = $1 RETURNING {ARTICLE_COLUMNS}"
        ))
        .bind(id)
        .bind(published_url)
        .fetch_optional(&self.pool)
        .await?;
        article.ok_or(DbError::NotFound)
    }

    #[instrument(skip(self), err)]
    async fn get_keyword(&self, id: KeywordId) -> Result<Option<Keyword>> {
        let keyword = sqlx::query_as::<_, Keyword>("SELECT id, keyword, search_volume, difficulty FROM keywords WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(keyword)
    }

    #[instrument(skip(self, transaction), fields(order_code = transaction.order_code), err)]
    async fn create_transaction(&self, transaction: &NewTransaction) -> Result<Transaction> {
        let created = sqlx::query_as::<_, Transaction>(&format!(
            r#"
            INSERT INTO transactions (order_code, user_id, plan, amount, status)
            VALUES ($1, $2, $3, $4, 'PENDING')
            RETURNING {TRANSACTION_COLUMNS}
            "#
        ))
        .bind(transaction.order_code)
        .bind(transaction.user_id)
        .bind(&transaction.plan)
        .bind(transaction.amount)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    #[instrument(skip(self, checkout_url), err)]
    async fn attach_checkout(&self, order_code: OrderCode, checkout_url: &str, payment_link_id: Option<&str>) -> Result<Transaction> {
        let updated = sqlx::query_as::<_, Transaction>(&format!(
            r#"
            UPDATE transactions
            SET checkout_url = $2, payment_link_id = $3, updated_at = NOW()
            WHERE order_code = $1
            RETURNING {TRANSACTION_COLUMNS}
            "#
        ))
        .bind(order_code)
        .bind(checkout_url)
        .bind(payment_link_id)
        .fetch_optional(&self.pool)
        .await?;
        updated.ok_or(DbError::NotFound)
    }

    #[instrument(skip(self), err)]
    async fn set_transaction_status(&self, order_code: OrderCode, status: TransactionStatus) -> Result<Transaction> {
        let updated = sqlx::query_as::<_, Transaction>(&format!(
            "UPDATE transactions SET status = $2, updated_at = NOW() WHERE order_code = $1 RETURNING {TRANSACTION_COLUMNS}"
        ))
        .bind(order_code)
        .bind(status)
        .fetch_optional(&self.pool)
        .await?;
        updated.ok_or(DbError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AiOperation;
    use serde_json::json;
    use uuid::Uuid;

    fn usage(user_id: Option<UserId>, provider: AiProvider, total: i64) -> NewUsageLog {
        NewUsageLog {
            user_id,
            provider,
            model: "m".to_string(),
            operation: AiOperation::Text,
            prompt_tokens: total / 2,
            completion_tokens: total - total / 2,
            total_tokens: total,
        }
    }

    async fn insert_article(pool: &PgPool, user_id: UserId, title: &str, keyword_id: Option<KeywordId>, age_secs: f64) -> ArticleId {
        sqlx::query_scalar::<_, ArticleId>(
            r#"
            INSERT INTO articles (user_id, title, content, keyword_id, created_at)
            VALUES ($1, $2, '<p>body</p>', $3, NOW() - make_interval(secs => $4))
            RETURNING id
            "#,
        )
        .bind(user_id)
        .bind(title)
        .bind(keyword_id)
        .bind(age_secs)
        .fetch_one(pool)
        .await
        .unwrap()
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_settings_are_scoped_by_owner(pool: PgPool) {
        let store = PgStore::new(pool);
        let user = Uuid::new_v4();

        store.set_setting("seo_config", None, &json!({ "scope": "global" })).await.unwrap();
        store.set_setting("seo_config", None, &json!({ "scope": "global", "v": 2 })).await.unwrap();
        store.set_setting("seo_config", Some(user), &json!({ "scope": "user" })).await.unwrap();

        let global = store.get_setting("seo_config", None).await.unwrap().unwrap();
        assert_eq!(global.value, json!({ "scope": "global", "v": 2 }));
        assert_eq!(global.user_id, None);

        let mine = store.get_setting("seo_config", Some(user)).await.unwrap().unwrap();
        assert_eq!(mine.value, json!({ "scope": "user" }));
        assert!(store.get_setting("seo_config", Some(Uuid::new_v4())).await.unwrap().is_none());

        let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM settings WHERE key = 'seo_config'")
            .fetch_one(store.pool())
            .await
            .unwrap();
        assert_eq!(rows, 2);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_usage_logs_newest_first_with_limit_and_owner(pool: PgPool) {
        let store = PgStore::new(pool);
        let alice = Uuid::new_v4();
        for total in [10, 20, 30] {
            store.record_usage(&usage(Some(alice), AiProvider::Gemini, total)).await.unwrap();
        }
        store.record_usage(&usage(None, AiProvider::OpenAi, 40)).await.unwrap();

        let recent = store.list_usage_logs(&UsageLogFilter::recent(2)).await.unwrap();
        assert_eq!(recent.iter().map(|l| l.total_tokens).collect::<Vec<_>>(), vec![40, 30]);
        assert_eq!(recent[0].provider, AiProvider::OpenAi);
        assert_eq!(recent[0].operation, AiOperation::Text);

        let filter = UsageLogFilter {
            user_id: Some(alice),
            limit: 10,
        };
        let alices = store.list_usage_logs(&filter).await.unwrap();
        assert_eq!(alices.iter().map(|l| l.total_tokens).collect::<Vec<_>>(), vec![30, 20, 10]);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_usage_totals_group_by_provider(pool: PgPool) {
        let store = PgStore::new(pool);
        assert!(store.usage_totals(None).await.unwrap().is_empty());

        let alice = Uuid::new_v4();
        store.record_usage(&usage(Some(alice), AiProvider::Gemini, 10)).await.unwrap();
        store.record_usage(&usage(None, AiProvider::Gemini, 6)).await.unwrap();
        store.record_usage(&usage(None, AiProvider::OpenAi, 4)).await.unwrap();

        let totals = store.usage_totals(None).await.unwrap();
        assert_eq!(
            totals[&AiProvider::Gemini],
            UsageTotals {
                requests: 2,
                prompt_tokens: 8,
                completion_tokens: 8,
                total_tokens: 16
            }
        );
        assert_eq!(totals[&AiProvider::OpenAi].requests, 1);

        let alices = store.usage_totals(Some(alice)).await.unwrap();
        assert_eq!(alices.len(), 1);
        assert_eq!(alices[&AiProvider::Gemini].total_tokens, 10);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_articles_and_keywords(pool: PgPool) {
        let store = PgStore::new(pool.clone());
        let user = Uuid::new_v4();
        let keyword_id: KeywordId =
            sqlx::query_scalar("INSERT INTO keywords (keyword, search_volume) VALUES ('seo tips', 880) RETURNING id")
                .fetch_one(&pool)
                .await
                .unwrap();

        let older = insert_article(&pool, user, "Older", Some(keyword_id), 60.0).await;
        let newer = insert_article(&pool, user, "Newer", None, 0.0).await;
        insert_article(&pool, Uuid::new_v4(), "Someone else's", None, 0.0).await;

        let articles = store.list_articles(user).await.unwrap();
        assert_eq!(articles.iter().map(|a| a.id).collect::<Vec<_>>(), vec![newer, older]);

        let keyword = store.get_keyword(keyword_id).await.unwrap().unwrap();
        assert_eq!(keyword.keyword, "seo tips");
        assert_eq!(keyword.search_volume, Some(880));

        let updated = store.update_article_image(older, "https://img/1.png").await.unwrap();
        assert_eq!(updated.image_url.as_deref(), Some("https://img/1.png"));
        let updated = store.update_article_published_url(older, "https://blog/older").await.unwrap();
        assert_eq!(updated.published_url.as_deref(), Some("https://blog/older"));
        assert_eq!(updated.image_url.as_deref(), Some("https://img/1.png"));

        assert!(store.get_article(Uuid::new_v4()).await.unwrap().is_none());
        assert!(matches!(
            store.update_article_image(Uuid::new_v4(), "https://img").await,
            Err(DbError::NotFound)
        ));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_transaction_lifecycle(pool: PgPool) {
        let store = PgStore::new(pool);
        let new = NewTransaction {
            order_code: 7,
            user_id: Uuid::new_v4(),
            plan: "pro".to_string(),
            amount: 100_000,
        };

        let created = store.create_transaction(&new).await.unwrap();
        assert_eq!(created.status, TransactionStatus::Pending);
        assert!(matches!(
            store.create_transaction(&new).await,
            Err(DbError::UniqueViolation { .. })
        ));

        let updated = store.attach_checkout(7, "https://pay/abc", Some("abc")).await.unwrap();
        assert_eq!(updated.checkout_url.as_deref(), Some("https://pay/abc"));
        assert_eq!(updated.payment_link_id.as_deref(), Some("abc"));
        assert_eq!(updated.status, TransactionStatus::Pending);

        let failed = store.set_transaction_status(7, TransactionStatus::Failed).await.unwrap();
        assert_eq!(failed.status, TransactionStatus::Failed);

        assert!(matches!(store.attach_checkout(8, "x", None).await, Err(DbError::NotFound)));
    }
}
