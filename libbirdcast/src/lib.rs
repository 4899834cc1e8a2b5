//! Birdcast - bridge RSS/Atom feeds to Mastodon accounts
//!
//! For each configured account the library fetches a feed, works out which
//! items were never posted, turns them into plain text and posts them once,
//! oldest first.

pub mod cache;
pub mod config;
pub mod error;
pub mod feed;
pub mod logging;
pub mod platforms;
pub mod processor;
pub mod text;
pub mod trash;
pub mod types;

// Re-export commonly used types
pub use cache::{DedupRecord, DedupStore};
pub use config::Config;
pub use error::{BirdcastError, Result};
pub use processor::{AccountProcessor, AccountRun, SyncReport};
pub use types::{Account, FeedItem, PostField, RunOptions};
