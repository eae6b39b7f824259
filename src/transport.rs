use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use feed_rs::model::Entry;
use feed_rs::parser;
use reqwest::Client;
use rss::Channel;
use thiserror::Error;
use tracing::debug;

/// One syndication entry as it came off the wire, before normalization.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawFeedItem {
    pub title: Option<String>,
    pub content_snippet: Option<String>,
    pub description: Option<String>,
    pub content: Option<String>,
    pub encoded_content: Option<String>,
    pub published: Option<DateTime<Utc>>,
    pub creator: Option<String>,
    pub author: Option<String>,
    pub link: Option<String>,
    pub media_content_url: Option<String>,
    pub enclosure_url: Option<String>,
    pub thumbnail_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedFeed {
    pub title: Option<String>,
    pub items: Vec<RawFeedItem>,
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected HTTP status {status} from {url}")]
    Status { status: u16, url: String },

    #[error("Failed to parse feed: {0}")]
    Parse(#[from] parser::ParseFeedError),
}

/// Retrieves and parses a single feed.
#[async_trait]
pub trait FeedTransport: Send + Sync {
    async fn fetch_and_parse(&self, url: &str) -> Result<ParsedFeed, FetchError>;
}

pub struct HttpFeedTransport {
    client: Client,
}

impl HttpFeedTransport {
    /// `timeout` bounds the whole request, body included.
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent("Newsstand/1.0 (RSS Aggregator)")
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl FeedTransport for HttpFeedTransport {
    async fn fetch_and_parse(&self, url: &str) -> Result<ParsedFeed, FetchError> {
        debug!("GET {}", url);

        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(FetchError::Status {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }

        let bytes = response.bytes().await?;
        parse_feed(&bytes)
    }
}

/// Parse RSS, Atom or JSON Feed bytes.
///
/// RSS goes through the `rss` crate, which keeps `<enclosure>` and
/// `<media:content>` apart; everything else goes through feed-rs.
pub fn parse_feed(bytes: &[u8]) -> Result<ParsedFeed, FetchError> {
    if let Ok(channel) = Channel::read_from(bytes) {
        return Ok(ParsedFeed::from(channel));
    }

    let feed = parser::parse(bytes)?;

    Ok(ParsedFeed {
        title: feed.title.map(|t| t.content),
        items: feed.entries.into_iter().map(RawFeedItem::from).collect(),
    })
}

impl From<Channel> for ParsedFeed {
    fn from(channel: Channel) -> Self {
        let title = Some(channel.title().trim())
            .filter(|t| !t.is_empty())
            .map(str::to_string);

        Self {
            title,
            items: channel.items().iter().map(RawFeedItem::from).collect(),
        }
    }
}

impl From<&rss::Item> for RawFeedItem {
    fn from(item: &rss::Item) -> Self {
        let description = item.description().map(str::to_string);
        let body = item.content().map(str::to_string);

        let creator = item
            .dublin_core_ext()
            .and_then(|dc| dc.creators().iter().find(|c| !c.trim().is_empty()))
            .cloned();

        let published = item
            .pub_date()
            .or_else(|| {
                item.dublin_core_ext()
                    .and_then(|dc| dc.dates().first().map(String::as_str))
            })
            .and_then(parse_rss_date);

        Self {
            title: item.title().map(str::to_string),
            content_snippet: None,
            content: description.clone().or_else(|| body.clone()),
            description,
            encoded_content: body,
            published,
            creator,
            author: item.author().map(str::to_string),
            link: item.link().map(str::to_string),
            media_content_url: media_attr_url(item, "content"),
            enclosure_url: item
                .enclosure()
                .map(|e| e.url().trim())
                .filter(|url| !url.is_empty())
                .map(str::to_string),
            thumbnail_url: media_attr_url(item, "thumbnail"),
        }
    }
}

/// First non-empty `url` attribute of a `media:<name>` element.
fn media_attr_url(item: &rss::Item, name: &str) -> Option<String> {
    item.extensions()
        .get("media")
        .and_then(|media| media.get(name))
        .into_iter()
        .flatten()
        .filter_map(|ext| ext.attrs().get("url"))
        .map(|url| url.trim())
        .find(|url| !url.is_empty())
        .map(str::to_string)
}

fn parse_rss_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    DateTime::parse_from_rfc2822(value)
        .or_else(|_| DateTime::parse_from_rfc3339(value))
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

impl From<Entry> for RawFeedItem {
    fn from(entry: Entry) -> Self {
        // Atom enclosures stay links
        let media_content_url = entry
            .media
            .iter()
            .flat_map(|m| m.content.iter())
            .find_map(|c| c.url.as_ref().map(|u| u.to_string()));

        let thumbnail_url = entry
            .media
            .iter()
            .flat_map(|m| m.thumbnails.iter())
            .map(|t| t.image.uri.clone())
            .find(|uri| !uri.is_empty());

        let enclosure_url = entry
            .links
            .iter()
            .find(|l| l.rel.as_deref() == Some("enclosure"))
            .map(|l| l.href.clone());

        let link = entry
            .links
            .iter()
            .find(|l| l.rel.as_deref().map_or(true, |rel| rel == "alternate"))
            .or_else(|| entry.links.first())
            .map(|l| l.href.clone());

        let author = entry
            .authors
            .iter()
            .map(|p| p.name.trim())
            .find(|name| !name.is_empty())
            .map(str::to_string);

        let description = entry.summary.map(|t| t.content);
        let body = entry.content.and_then(|c| c.body);

        Self {
            title: entry.title.map(|t| t.content),
            content_snippet: None,
            content: description.clone().or_else(|| body.clone()),
            description,
            encoded_content: body,
            published: entry.published.or(entry.updated),
            creator: None,
            author,
            link,
            media_content_url,
            enclosure_url,
            thumbnail_url,
        }
    }
}
