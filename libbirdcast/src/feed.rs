//! Fetching, archiving and parsing syndication feeds

use std::path::Path;

use async_trait::async_trait;
use feed_rs::parser;
use reqwest::Client;
use tracing::{debug, info};

use crate::error::{FeedError, Result};
use crate::types::FeedItem;

/// Source of raw feed bytes
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Fetch the document at `url`; no retries
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// Fetches feeds over HTTP, identifying itself with the configured User-Agent
pub struct HttpFeedSource {
    client: Client,
}

impl HttpFeedSource {
    pub fn new(user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .build()
            .map_err(|e| FeedError::Fetch(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl FeedSource for HttpFeedSource {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FeedError::Fetch(format!("{}: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Fetch(format!("{}: HTTP {}", url, status)).into());
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| FeedError::Fetch(format!("{}: failed to read body: {}", url, e)))?;

        info!("Fetched {} ({} bytes)", url, bytes.len());
        Ok(bytes.to_vec())
    }
}

/// Write the fetched bytes verbatim to `path`, replacing the previous copy
pub fn archive_raw(bytes: &[u8], path: &Path) -> Result<()> {
    debug!("Writing feed to {}", path.display());

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| FeedError::Archive(format!("{}: {}", parent.display(), e)))?;
    }

    std::fs::write(path, bytes)
        .map_err(|e| FeedError::Archive(format!("{}: {}", path.display(), e)))?;

    Ok(())
}

/// Parse RSS/Atom bytes into items, in the order the feed lists them
pub fn parse_feed(bytes: &[u8]) -> Result<Vec<FeedItem>> {
    let feed = parser::parse(bytes).map_err(|e| FeedError::Parse(e.to_string()))?;

    let items: Vec<FeedItem> = feed
        .entries
        .into_iter()
        .enumerate()
        .map(|(position, entry)| {
            let content = entry
                .content
                .and_then(|c| c.body)
                .or_else(|| entry.summary.map(|s| s.content))
                .unwrap_or_default();

            FeedItem {
                id: entry.id,
                title: entry.title.map(|t| t.content).unwrap_or_default(),
                content,
                position,
            }
        })
        .collect();

    debug!("Parsed feed with {} entries", items.len());
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BirdcastError;
    use tempfile::TempDir;

    const RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:content="http://purl.org/rss/1.0/modules/content/">
  <channel>
    <title>Example</title>
    <link>https://example.org/</link>
    <description>Example feed</description>
    <item>
      <guid>https://example.org/3</guid>
      <title>Third</title>
      <description>Third summary</description>
      <content:encoded><![CDATA[<p>Third <b>body</b></p>]]></content:encoded>
      <pubDate>Wed, 03 Jan 2024 10:00:00 GMT</pubDate>
    </item>
    <item>
      <guid>https://example.org/2</guid>
      <title>Second</title>
      <description>Second summary</description>
    </item>
    <item>
      <guid>https://example.org/1</guid>
      <title>First</title>
    </item>
  </channel>
</rss>"#;

    const ATOM: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Atom Example</title>
  <id>urn:uuid:feed</id>
  <updated>2024-01-02T00:00:00Z</updated>
  <entry>
    <id>urn:uuid:entry-2</id>
    <title>Newer</title>
    <updated>2024-01-02T00:00:00Z</updated>
    <content type="html">&lt;p&gt;Newer body&lt;/p&gt;</content>
  </entry>
  <entry>
    <id>urn:uuid:entry-1</id>
    <title>Older</title>
    <updated>2024-01-01T00:00:00Z</updated>
  </entry>
</feed>"#;

    #[test]
    fn test_parse_rss_keeps_feed_order() {
        let items = parse_feed(RSS.as_bytes()).unwrap();

        let ids: Vec<&str> = items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "https://example.org/3",
                "https://example.org/2",
                "https://example.org/1"
            ]
        );
        let positions: Vec<usize> = items.iter().map(|i| i.position).collect();
        assert_eq!(positions, vec![0, 1, 2]);
    }

    #[test]
    fn test_parse_rss_content_fields() {
        let items = parse_feed(RSS.as_bytes()).unwrap();

        assert_eq!(items[0].title, "Third");
        assert!(items[0].content.contains("<b>body</b>"));

        // description stands in when there is no content body
        assert_eq!(items[1].content, "Second summary");
        assert_eq!(items[2].content, "");
    }

    #[test]
    fn test_parse_atom() {
        let items = parse_feed(ATOM.as_bytes()).unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].id, "urn:uuid:entry-2");
        assert_eq!(items[0].title, "Newer");
        assert!(items[0].content.contains("Newer body"));
        assert_eq!(items[1].id, "urn:uuid:entry-1");
    }

    #[test]
    fn test_parse_garbage_is_parse_error() {
        let result = parse_feed(b"this is not a feed");
        assert!(matches!(
            result,
            Err(BirdcastError::Feed(FeedError::Parse(_)))
        ));
    }

    #[test]
    fn test_archive_raw_overwrites() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("news.feed");

        archive_raw(b"first", &path).unwrap();
        archive_raw(b"second", &path).unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"second");
    }

    #[test]
    fn test_archive_raw_failure() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "x").unwrap();

        let result = archive_raw(b"data", &blocker.join("news.feed"));
        assert!(matches!(
            result,
            Err(BirdcastError::Feed(FeedError::Archive(_)))
        ));
    }

    #[tokio::test]
    async fn test_http_fetch_unreachable_is_fetch_error() {
        let source = HttpFeedSource::new("Birdcast tests").unwrap();
        let result = source.fetch("http://127.0.0.1:9/feed.xml").await;
        assert!(matches!(
            result,
            Err(BirdcastError::Feed(FeedError::Fetch(_)))
        ));
    }
}
