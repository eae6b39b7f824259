use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::db::{ArticleStore, NormalizedArticle};
use crate::normalize::{clean_text, extract_image_url, truncate_chars};
use crate::transport::{FeedTransport, RawFeedItem};

/// Only the newest items of each feed are considered per run.
pub const MAX_ITEMS_PER_FEED: usize = 10;
pub const DESCRIPTION_MAX_CHARS: usize = 300;
pub const CONTENT_MAX_CHARS: usize = 2000;

const UNKNOWN_AUTHOR: &str = "Unknown";

#[derive(Debug, Error)]
pub enum ItemError {
    #[error("item has no link")]
    MissingLink,

    #[error("storage error: {0}")]
    Storage(anyhow::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemOutcome {
    Inserted,
    AlreadyStored,
}

/// Pulls one feed and writes its unseen items to the article store.
pub struct Fetcher {
    transport: Arc<dyn FeedTransport>,
    store: Arc<dyn ArticleStore>,
}

impl Fetcher {
    pub fn new(transport: Arc<dyn FeedTransport>, store: Arc<dyn ArticleStore>) -> Self {
        Self { transport, store }
    }

    /// Returns the number of newly inserted articles. Never fails: transport
    /// errors and unknown categories are logged and count as zero.
    pub async fn fetch_from_feed(&self, feed_url: &str, category_slug: &str) -> usize {
        info!("Fetching {} for category {}", feed_url, category_slug);

        let feed = match self.transport.fetch_and_parse(feed_url).await {
            Ok(feed) => feed,
            Err(e) => {
                error!("Failed to fetch feed '{}': {}", feed_url, e);
                return 0;
            }
        };

        let category_id = match self.store.find_category_id_by_slug(category_slug).await {
            Ok(Some(id)) => id,
            Ok(None) => {
                error!("Category not found: {}", category_slug);
                return 0;
            }
            Err(e) => {
                error!("Failed to look up category '{}': {}", category_slug, e);
                return 0;
            }
        };

        let mut inserted = 0;
        for item in feed.items.iter().take(MAX_ITEMS_PER_FEED) {
            match self
                .process_item(item, feed.title.as_deref(), category_id)
                .await
            {
                Ok(ItemOutcome::Inserted) => inserted += 1,
                Ok(ItemOutcome::AlreadyStored) => {}
                Err(e) => warn!("Skipping item from {}: {}", feed_url, e),
            }
        }

        info!("Inserted {} articles from {}", inserted, feed_url);
        inserted
    }

    async fn process_item(
        &self,
        item: &RawFeedItem,
        feed_title: Option<&str>,
        category_id: i64,
    ) -> Result<ItemOutcome, ItemError> {
        let article = normalize_item(item, feed_title, category_id, Utc::now())?;

        let existing = self
            .store
            .find_by_source_url(&article.source_url)
            .await
            .map_err(ItemError::Storage)?;
        if existing.is_some() {
            return Ok(ItemOutcome::AlreadyStored);
        }

        // A concurrent writer can still win the unique constraint
        match self
            .store
            .insert_article(&article)
            .await
            .map_err(ItemError::Storage)?
        {
            Some(_) => Ok(ItemOutcome::Inserted),
            None => Ok(ItemOutcome::AlreadyStored),
        }
    }
}

/// Build the row to store for one feed item. `now` is used when the item
/// carries no publish date.
pub fn normalize_item(
    item: &RawFeedItem,
    feed_title: Option<&str>,
    category_id: i64,
    now: DateTime<Utc>,
) -> Result<NormalizedArticle, ItemError> {
    let source_url = item
        .link
        .as_deref()
        .map(str::trim)
        .filter(|link| !link.is_empty())
        .ok_or(ItemError::MissingLink)?
        .to_string();

    let summary = item
        .content_snippet
        .as_deref()
        .or(item.description.as_deref());
    let body = summary.or(item.content.as_deref());

    let author = [
        item.creator.as_deref(),
        item.author.as_deref(),
        feed_title,
    ]
    .into_iter()
    .flatten()
    .find(|name| !name.trim().is_empty())
    .unwrap_or(UNKNOWN_AUTHOR)
    .to_string();

    Ok(NormalizedArticle {
        title: clean_text(item.title.as_deref()),
        description: truncate_chars(&clean_text(summary), DESCRIPTION_MAX_CHARS),
        content: truncate_chars(&clean_text(body), CONTENT_MAX_CHARS),
        image_url: extract_image_url(item),
        source: feed_title.unwrap_or_default().to_string(),
        source_url,
        author,
        category_id,
        published_at: item.published.unwrap_or(now),
    })
}
