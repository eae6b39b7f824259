use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqlitePoolOptions, FromRow, SqlitePool};

use crate::registry::CategoryFeeds;

#[derive(Debug, Clone, FromRow)]
pub struct Article {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub content: String,
    pub image_url: Option<String>,
    pub source: String,
    pub source_url: String,
    pub author: String,
    pub category_id: i64,
    pub published_at: String,
    pub view_count: i64,
    pub created_at: String,
}

/// An article ready to be written, produced by the fetcher.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedArticle {
    pub title: String,
    pub description: String,
    pub content: String,
    pub image_url: Option<String>,
    pub source: String,
    pub source_url: String,
    pub author: String,
    pub category_id: i64,
    pub published_at: DateTime<Utc>,
}

/// What the aggregation pipeline needs from storage.
#[async_trait]
pub trait ArticleStore: Send + Sync {
    async fn find_by_source_url(&self, source_url: &str) -> anyhow::Result<Option<Article>>;

    /// Returns `None` when an article with the same `source_url` already exists.
    async fn insert_article(&self, article: &NormalizedArticle) -> anyhow::Result<Option<Article>>;

    async fn find_category_id_by_slug(&self, slug: &str) -> anyhow::Result<Option<i64>>;
}

pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        // Every connection to an in-memory database gets its own empty schema
        let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    pub async fn initialize(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS categories (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                slug TEXT NOT NULL UNIQUE
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS articles (
                id INTEGER PRIMARY KEY,
                title TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                content TEXT NOT NULL DEFAULT '',
                image_url TEXT,
                source TEXT NOT NULL DEFAULT '',
                source_url TEXT NOT NULL UNIQUE,
                author TEXT NOT NULL,
                category_id INTEGER NOT NULL REFERENCES categories(id),
                published_at TEXT NOT NULL,
                view_count INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_articles_category_published
            ON articles(category_id, published_at DESC)
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Make sure every configured category has a row; existing rows keep their id.
    pub async fn sync_categories(&self, categories: &[CategoryFeeds]) -> anyhow::Result<()> {
        for category in categories {
            sqlx::query(
                r#"
                INSERT INTO categories (name, slug)
                VALUES (?, ?)
                ON CONFLICT(slug) DO UPDATE SET
                    name = excluded.name
                "#,
            )
            .bind(&category.name)
            .bind(&category.slug)
            .execute(&self.pool)
            .await?;
        }
        Ok(())
    }

    pub async fn get_article_count(&self) -> anyhow::Result<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM articles")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.0)
    }
}

#[async_trait]
impl ArticleStore for Database {
    async fn find_by_source_url(&self, source_url: &str) -> anyhow::Result<Option<Article>> {
        let article = sqlx::query_as::<_, Article>("SELECT * FROM articles WHERE source_url = ?")
            .bind(source_url)
            .fetch_optional(&self.pool)
            .await?;
        Ok(article)
    }

    async fn insert_article(&self, article: &NormalizedArticle) -> anyhow::Result<Option<Article>> {
        let now = Utc::now().to_rfc3339();

        let inserted = sqlx::query_as::<_, Article>(
            r#"
            INSERT INTO articles (
                title, description, content, image_url, source, source_url,
                author, category_id, published_at, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(source_url) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(&article.title)
        .bind(&article.description)
        .bind(&article.content)
        .bind(&article.image_url)
        .bind(&article.source)
        .bind(&article.source_url)
        .bind(&article.author)
        .bind(article.category_id)
        .bind(article.published_at.to_rfc3339())
        .bind(&now)
        .fetch_optional(&self.pool)
        .await?;

        Ok(inserted)
    }

    async fn find_category_id_by_slug(&self, slug: &str) -> anyhow::Result<Option<i64>> {
        let id: Option<(i64,)> = sqlx::query_as("SELECT id FROM categories WHERE slug = ?")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;
        Ok(id.map(|row| row.0))
    }
}
