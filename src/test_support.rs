//! Fixtures shared by the unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::db::{Article, ArticleStore, Database, NormalizedArticle};
use crate::registry::CategoryFeeds;
use crate::throttle::Throttle;
use crate::transport::{FeedTransport, FetchError, ParsedFeed, RawFeedItem};

/// Serves canned feeds; unknown URLs answer with a 404 error.
#[derive(Default)]
pub struct StaticTransport {
    feeds: Mutex<HashMap<String, ParsedFeed>>,
    calls: AtomicUsize,
}

impl StaticTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_feed(self, url: &str, feed: ParsedFeed) -> Self {
        self.set_feed(url, feed);
        self
    }

    pub fn set_feed(&self, url: &str, feed: ParsedFeed) {
        self.feeds.lock().unwrap().insert(url.to_string(), feed);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FeedTransport for StaticTransport {
    async fn fetch_and_parse(&self, url: &str) -> Result<ParsedFeed, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.feeds
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::Status {
                status: 404,
                url: url.to_string(),
            })
    }
}

/// Counts pauses instead of sleeping.
#[derive(Default)]
pub struct CountingThrottle {
    pauses: AtomicUsize,
}

impl CountingThrottle {
    pub fn pauses(&self) -> usize {
        self.pauses.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Throttle for CountingThrottle {
    async fn pause(&self) {
        self.pauses.fetch_add(1, Ordering::SeqCst);
    }
}

pub fn item(link: &str) -> RawFeedItem {
    RawFeedItem {
        title: Some(format!("Title for {}", link)),
        description: Some(format!("<p>Description for {}</p>", link)),
        link: Some(link.to_string()),
        ..Default::default()
    }
}

pub fn feed(title: &str, links: &[&str]) -> ParsedFeed {
    ParsedFeed {
        title: Some(title.to_string()),
        items: links.iter().map(|link| item(link)).collect(),
    }
}

pub fn category(slug: &str, feeds: &[&str]) -> CategoryFeeds {
    CategoryFeeds {
        slug: slug.to_string(),
        name: slug.to_string(),
        feeds: feeds.iter().map(|f| f.to_string()).collect(),
    }
}

pub async fn memory_db(categories: &[CategoryFeeds]) -> Arc<Database> {
    let db = Database::new("sqlite::memory:").await.unwrap();
    db.initialize().await.unwrap();
    db.sync_categories(categories).await.unwrap();
    Arc::new(db)
}

/// Storage with no categories and no articles; never fails.
pub struct EmptyStore;

#[async_trait]
impl ArticleStore for EmptyStore {
    async fn find_by_source_url(&self, _source_url: &str) -> anyhow::Result<Option<Article>> {
        Ok(None)
    }

    async fn insert_article(
        &self,
        _article: &NormalizedArticle,
    ) -> anyhow::Result<Option<Article>> {
        Ok(None)
    }

    async fn find_category_id_by_slug(&self, _slug: &str) -> anyhow::Result<Option<i64>> {
        Ok(None)
    }
}

/// Delegates to a real database but fails lookups for one source URL and one
/// category slug.
pub struct FailingStore {
    inner: Arc<Database>,
    fail_source_url: Option<String>,
    fail_slug: Option<String>,
}

impl FailingStore {
    pub fn new(inner: Arc<Database>) -> Self {
        Self {
            inner,
            fail_source_url: None,
            fail_slug: None,
        }
    }

    pub fn failing_source_url(mut self, source_url: &str) -> Self {
        self.fail_source_url = Some(source_url.to_string());
        self
    }

    pub fn failing_slug(mut self, slug: &str) -> Self {
        self.fail_slug = Some(slug.to_string());
        self
    }
}

#[async_trait]
impl ArticleStore for FailingStore {
    async fn find_by_source_url(&self, source_url: &str) -> anyhow::Result<Option<Article>> {
        if self.fail_source_url.as_deref() == Some(source_url) {
            anyhow::bail!("database is locked");
        }
        self.inner.find_by_source_url(source_url).await
    }

    async fn insert_article(&self, article: &NormalizedArticle) -> anyhow::Result<Option<Article>> {
        self.inner.insert_article(article).await
    }

    async fn find_category_id_by_slug(&self, slug: &str) -> anyhow::Result<Option<i64>> {
        if self.fail_slug.as_deref() == Some(slug) {
            anyhow::bail!("disk I/O error");
        }
        self.inner.find_category_id_by_slug(slug).await
    }
}
