use std::collections::HashSet;

use serde::Deserialize;

/// A category and the feeds that populate it, in fetch order.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CategoryFeeds {
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub feeds: Vec<String>,
}

/// One (category, feed URL) pair handed to the fetcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedSource {
    pub category_slug: String,
    pub url: String,
}

/// Immutable mapping from category slug to its ordered feed URLs.
///
/// Built once at startup and shared read-only with the aggregator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedRegistry {
    categories: Vec<CategoryFeeds>,
}

impl FeedRegistry {
    pub fn new(categories: Vec<CategoryFeeds>) -> anyhow::Result<Self> {
        let mut seen = HashSet::new();
        for category in &categories {
            if category.slug.trim().is_empty() {
                anyhow::bail!("Category '{}' has an empty slug", category.name);
            }
            if !seen.insert(category.slug.as_str()) {
                anyhow::bail!("Duplicate category slug: {}", category.slug);
            }
        }

        Ok(Self { categories })
    }

    /// The feed list the service ships with.
    pub fn builtin() -> Self {
        let category = |slug: &str, name: &str, feeds: &[&str]| CategoryFeeds {
            slug: slug.to_string(),
            name: name.to_string(),
            feeds: feeds.iter().map(|f| f.to_string()).collect(),
        };

        Self {
            categories: vec![
                category(
                    "technology",
                    "Technology",
                    &[
                        "https://techcrunch.com/feed/",
                        "https://www.theverge.com/rss/index.xml",
                        "https://www.wired.com/feed/rss",
                    ],
                ),
                category(
                    "business",
                    "Business",
                    &[
                        "https://feeds.bloomberg.com/markets/news.rss",
                        "https://www.cnbc.com/id/100003114/device/rss/rss.html",
                    ],
                ),
                category(
                    "science",
                    "Science",
                    &[
                        "https://www.sciencedaily.com/rss/all.xml",
                        "https://www.nature.com/nature.rss",
                    ],
                ),
                category(
                    "entertainment",
                    "Entertainment",
                    &[
                        "https://www.hollywoodreporter.com/feed/",
                        "https://variety.com/feed/",
                    ],
                ),
                category(
                    "sports",
                    "Sports",
                    &[
                        "https://www.espn.com/espn/rss/news",
                        "https://www.reuters.com/lifestyle/sports",
                    ],
                ),
                category(
                    "health",
                    "Health",
                    &[
                        "https://www.medicalnewstoday.com/rss",
                        "https://www.health.com/syndication/feed",
                    ],
                ),
                category(
                    "travel",
                    "Travel",
                    &[
                        "https://www.lonelyplanet.com/blog/feed/",
                        "https://www.travelandleisure.com/rss",
                    ],
                ),
                category(
                    "food",
                    "Food",
                    &[
                        "https://www.bonappetit.com/feed/rss",
                        "https://www.foodnetwork.com/feeds/all-recipes.rss",
                    ],
                ),
            ],
        }
    }

    pub fn categories(&self) -> &[CategoryFeeds] {
        &self.categories
    }

    /// Every feed in registry order: categories first, then feeds within each.
    pub fn sources(&self) -> impl Iterator<Item = FeedSource> + '_ {
        self.categories.iter().flat_map(|category| {
            category.feeds.iter().map(move |url| FeedSource {
                category_slug: category.slug.clone(),
                url: url.clone(),
            })
        })
    }

    pub fn feed_count(&self) -> usize {
        self.categories.iter().map(|c| c.feeds.len()).sum()
    }
}
