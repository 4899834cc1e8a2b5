//! Error types for Birdcast

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, BirdcastError>;

#[derive(Error, Debug)]
pub enum BirdcastError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Feed error: {0}")]
    Feed(#[from] FeedError),

    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),
}

impl BirdcastError {
    /// Returns the appropriate exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            BirdcastError::Platform(PlatformError::Authentication(_)) => 2,
            BirdcastError::Platform(_) => 1,
            BirdcastError::Config(_) => 1,
            BirdcastError::Storage(_) => 1,
            BirdcastError::Feed(_) => 1,
        }
    }

    /// Whether the error only affects the item being posted.
    ///
    /// Platform errors (authentication, posting) are recovered by skipping the
    /// item and leaving it unmarked; every other error ends the account's run.
    pub fn is_per_item(&self) -> bool {
        matches!(self, BirdcastError::Platform(_))
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Invalid post_field for {account}: \"{value}\" (expected: title|content|titlecontent)")]
    InvalidPostField { account: String, value: String },

    #[error("No such account: {0}")]
    AccountNotFound(String),
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to read state from {}: {reason}", path.display())]
    Read { path: PathBuf, reason: String },

    #[error("Failed to write state to {}: {reason}", path.display())]
    Write { path: PathBuf, reason: String },
}

#[derive(Error, Debug)]
pub enum FeedError {
    #[error("Fetching failed: {0}")]
    Fetch(String),

    #[error("Archiving raw feed failed: {0}")]
    Archive(String),

    #[error("Parsing failed: {0}")]
    Parse(String),
}

#[derive(Error, Debug, Clone)]
pub enum PlatformError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Content validation failed: {0}")]
    Validation(String),

    #[error("Posting failed: {0}")]
    Posting(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),
}
