//! Core types for Birdcast

use std::fmt;
use std::str::FromStr;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// One feed-to-account bridge as configured in `[[accounts]]`
#[derive(Clone, Serialize, Deserialize)]
pub struct Account {
    /// Local name; also names the `.cache` and `.feed` files in the cache dir
    pub name: String,

    #[serde(default = "default_active")]
    pub active: bool,

    pub feed_url: String,

    /// Which feed field to post: `title` (default), `content` or `titlecontent`
    #[serde(default)]
    pub post_field: String,

    pub username: String,

    pub password: String,
}

fn default_active() -> bool {
    true
}

impl Account {
    /// Credentials for the posting endpoint, with the password moved into a secret
    pub fn credentials(&self) -> Credentials {
        Credentials {
            username: self.username.clone(),
            password: SecretString::from(self.password.clone()),
        }
    }

    /// Resolve the configured post field selector
    pub fn post_field(&self) -> Result<PostField, ConfigError> {
        PostField::parse(&self.name, &self.post_field)
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("name", &self.name)
            .field("active", &self.active)
            .field("feed_url", &self.feed_url)
            .field("post_field", &self.post_field)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Login for one account on the posting endpoint
#[derive(Debug)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

/// Selects the text that gets posted for a feed item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostField {
    Title,
    Content,
    TitleContent,
}

impl PostField {
    /// Parse a selector for the named account; empty means `title`
    pub fn parse(account: &str, value: &str) -> Result<Self, ConfigError> {
        value.parse().map_err(|_| ConfigError::InvalidPostField {
            account: account.to_string(),
            value: value.to_string(),
        })
    }

    /// The raw, not yet normalized text for an item
    pub fn select(&self, item: &FeedItem) -> String {
        match self {
            PostField::Title => item.title.clone(),
            PostField::Content => item.content.clone(),
            PostField::TitleContent => format!("{} {}", item.title, item.content),
        }
    }
}

impl FromStr for PostField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "title" | "" => Ok(PostField::Title),
            "content" => Ok(PostField::Content),
            "titlecontent" => Ok(PostField::TitleContent),
            other => Err(format!("unknown post field: {}", other)),
        }
    }
}

/// An entry read from a feed; only `id` outlives the run, inside the dedup record
#[derive(Debug, Clone, PartialEq)]
pub struct FeedItem {
    pub id: String,
    pub title: String,
    pub content: String,
    /// Index in the order the feed declared its entries
    pub position: usize,
}

/// Explicit run settings threaded through a sync run
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Fetch, parse and normalize, but neither post nor touch dedup state
    pub dry_run: bool,
    /// Only run this account, even if it is inactive
    pub only_account: Option<String>,
}
