//! Posting endpoint abstraction and implementations
//!
//! A [`Publisher`] knows how to log an account in; the [`Session`] it returns
//! does the actual posting for the rest of that account's run.
//!
//! # Examples
//!
//! ```no_run
//! use libbirdcast::config::ServerConfig;
//! use libbirdcast::platforms::{mastodon::MastodonPublisher, Publisher};
//! use libbirdcast::types::Credentials;
//!
//! # async fn example(credentials: Credentials) -> libbirdcast::error::Result<()> {
//! let server = ServerConfig {
//!     instance: "https://social.example.org".to_string(),
//!     client_id: "client-id".to_string(),
//!     client_secret: "client-secret".to_string(),
//! };
//!
//! let publisher = MastodonPublisher::new(&server, "Birdcast (ops@example.org)")?;
//! let session = publisher.authenticate(&credentials).await?;
//! let post_id = session.post("Hello from a feed").await?;
//! println!("Posted: {}", post_id);
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;

use crate::error::Result;
use crate::types::Credentials;

pub mod mastodon;

// Mock publisher is available for all builds (not just tests) to support integration tests
pub mod mock;

/// Logs accounts in to a posting endpoint
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Authenticate one account.
    ///
    /// # Errors
    ///
    /// Returns `PlatformError::Authentication` when the credentials are
    /// rejected, or `PlatformError::Network` when the endpoint is unreachable.
    async fn authenticate(&self, credentials: &Credentials) -> Result<Box<dyn Session>>;

    /// Lowercase identifier for the endpoint kind (e.g. "mastodon")
    fn name(&self) -> &str;
}

/// An authenticated connection for a single account's run
#[async_trait]
pub trait Session: Send + Sync {
    /// Submit one text post and return its id on the endpoint
    async fn post(&self, text: &str) -> Result<String>;

    /// One page of this account's own posts, newest first
    async fn list_timeline(&self, page: &Pagination) -> Result<TimelinePage>;

    /// Delete one post by id
    async fn delete_post(&self, id: &str) -> Result<()>;
}

/// Cursor into a timeline
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pagination {
    /// Only return posts older than this id
    pub max_id: Option<String>,
    /// Only return posts newer than this id
    pub since_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelinePost {
    pub id: String,
    pub content: String,
}

#[derive(Debug, Clone, Default)]
pub struct TimelinePage {
    pub posts: Vec<TimelinePost>,
    /// Cursor for the next (older) page; `None` once the timeline is exhausted
    pub next: Option<Pagination>,
}

impl TimelinePage {
    /// Build a page whose next cursor continues below its oldest post
    pub fn from_posts(posts: Vec<TimelinePost>) -> Self {
        let next = posts.last().map(|oldest| Pagination {
            max_id: Some(oldest.id.clone()),
            since_id: None,
        });
        Self { posts, next }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(id: &str) -> TimelinePost {
        TimelinePost {
            id: id.to_string(),
            content: String::new(),
        }
    }

    #[test]
    fn test_page_cursor_follows_oldest_post() {
        let page = TimelinePage::from_posts(vec![post("30"), post("20"), post("10")]);
        assert_eq!(
            page.next,
            Some(Pagination {
                max_id: Some("10".to_string()),
                since_id: None,
            })
        );
    }

    #[test]
    fn test_empty_page_ends_pagination() {
        let page = TimelinePage::from_posts(vec![]);
        assert!(page.posts.is_empty());
        assert!(page.next.is_none());
    }
}
