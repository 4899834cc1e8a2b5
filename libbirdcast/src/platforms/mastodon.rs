//! Mastodon publisher
//!
//! Logs in with the OAuth password grant and posts through the megalodon
//! library, so any server speaking the Mastodon API works (Pleroma, Akkoma,
//! GoToSocial, ...).

use async_trait::async_trait;
use megalodon::megalodon::{GetAccountStatusesInputOptions, PostStatusOutput};
use megalodon::{Megalodon, SNS};
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::Deserialize;
use tracing::debug;

use crate::config::ServerConfig;
use crate::error::{PlatformError, Result};
use crate::platforms::{Pagination, Publisher, Session, TimelinePage, TimelinePost};
use crate::types::Credentials;

/// Hard post length limit of a stock Mastodon server
const CHARACTER_LIMIT: usize = 500;

/// Posts per timeline page when listing
const PAGE_SIZE: u32 = 40;

const TOKEN_SCOPE: &str = "read write";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Publisher for one Mastodon-compatible server and registered app
pub struct MastodonPublisher {
    http: Client,
    instance_url: String,
    client_id: String,
    client_secret: String,
    user_agent: String,
}

impl MastodonPublisher {
    pub fn new(server: &ServerConfig, user_agent: &str) -> Result<Self> {
        let http = Client::builder()
            .user_agent(user_agent)
            .build()
            .map_err(|e| PlatformError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            instance_url: server.instance_url(),
            client_id: server.client_id.clone(),
            client_secret: server.client_secret.clone(),
            user_agent: user_agent.to_string(),
        })
    }

    pub fn instance_url(&self) -> &str {
        &self.instance_url
    }

    fn token_url(&self) -> String {
        format!("{}/oauth/token", self.instance_url)
    }

    /// Exchange username and password for an access token
    async fn request_token(&self, credentials: &Credentials) -> Result<String> {
        let params = [
            ("grant_type", "password"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("username", credentials.username.as_str()),
            ("password", credentials.password.expose_secret()),
            ("scope", TOKEN_SCOPE),
        ];

        let response = self
            .http
            .post(self.token_url())
            .form(&params)
            .send()
            .await
            .map_err(|e| {
                PlatformError::Network(format!(
                    "Mastodon token request to {} failed: {}",
                    self.instance_url, e
                ))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            // The token endpoint answers bad logins with 400 as well as 401
            let error = match status.as_u16() {
                400 | 401 | 403 => PlatformError::Authentication(format!(
                    "Mastodon rejected login for {} (HTTP {}): {}",
                    credentials.username, status, body
                )),
                code => error_for_status(code, "request token", &body),
            };
            return Err(error.into());
        }

        let token: TokenResponse = response.json().await.map_err(|e| {
            PlatformError::Authentication(format!("Unexpected Mastodon token response: {}", e))
        })?;

        Ok(token.access_token)
    }
}

#[async_trait]
impl Publisher for MastodonPublisher {
    async fn authenticate(&self, credentials: &Credentials) -> Result<Box<dyn Session>> {
        debug!(
            "Authenticating {} against {}",
            credentials.username, self.instance_url
        );
        let token = self.request_token(credentials).await?;

        let client = megalodon::generator(
            SNS::Mastodon,
            self.instance_url.clone(),
            Some(token),
            Some(self.user_agent.clone()),
        )
        .map_err(|e| {
            PlatformError::Authentication(format!("Failed to create Mastodon client: {:?}", e))
        })?;

        let account = client
            .verify_account_credentials()
            .await
            .map_err(|e| map_megalodon_error(e, "verify credentials"))?;

        Ok(Box::new(MastodonSession {
            client,
            account_id: account.json.id,
        }))
    }

    fn name(&self) -> &str {
        "mastodon"
    }
}

/// Authenticated megalodon client plus the id of the logged-in account
struct MastodonSession {
    client: Box<dyn Megalodon + Send + Sync>,
    account_id: String,
}

#[async_trait]
impl Session for MastodonSession {
    async fn post(&self, text: &str) -> Result<String> {
        validate_content(text)?;

        let response = self
            .client
            .post_status(text.to_string(), None)
            .await
            .map_err(|e| map_megalodon_error(e, "post status"))?;

        let post_id = match response.json {
            PostStatusOutput::Status(status) => status.id,
            PostStatusOutput::ScheduledStatus(scheduled) => scheduled.id,
        };

        Ok(post_id)
    }

    async fn list_timeline(&self, page: &Pagination) -> Result<TimelinePage> {
        let options = GetAccountStatusesInputOptions {
            limit: Some(PAGE_SIZE),
            max_id: page.max_id.clone(),
            since_id: page.since_id.clone(),
            ..Default::default()
        };

        let response = self
            .client
            .get_account_statuses(self.account_id.clone(), Some(&options))
            .await
            .map_err(|e| map_megalodon_error(e, "list statuses"))?;

        let posts = response
            .json
            .into_iter()
            .map(|status| TimelinePost {
                id: status.id,
                content: status.content,
            })
            .collect();

        Ok(TimelinePage::from_posts(posts))
    }

    async fn delete_post(&self, id: &str) -> Result<()> {
        self.client
            .delete_status(id.to_string())
            .await
            .map_err(|e| map_megalodon_error(e, "delete status"))?;
        Ok(())
    }
}

fn validate_content(content: &str) -> Result<()> {
    if content.trim().is_empty() {
        return Err(PlatformError::Validation("Content cannot be empty".to_string()).into());
    }

    let char_count = content.chars().count();
    if char_count > CHARACTER_LIMIT {
        return Err(PlatformError::Validation(format!(
            "Content exceeds Mastodon's {} character limit (current: {} characters)",
            CHARACTER_LIMIT, char_count
        ))
        .into());
    }

    Ok(())
}

/// Classify an HTTP failure from the server
///
/// - 401/403 → `Authentication`
/// - 422 → `Validation`
/// - 429 → `RateLimit`
/// - anything else → `Network`
fn error_for_status(code: u16, context: &str, detail: &str) -> PlatformError {
    match code {
        401 | 403 => PlatformError::Authentication(format!(
            "Mastodon authentication failed ({}): {}",
            context, detail
        )),
        422 => PlatformError::Validation(format!(
            "Mastodon validation failed ({}): {}",
            context, detail
        )),
        429 => PlatformError::RateLimit(format!(
            "Mastodon rate limit exceeded ({}): {}",
            context, detail
        )),
        500..=599 => PlatformError::Network(format!(
            "Mastodon server error ({}): {}",
            context, detail
        )),
        _ => PlatformError::Network(format!("Mastodon HTTP error ({}): {}", context, detail)),
    }
}

/// Map megalodon errors to PlatformError
///
/// megalodon does not expose the status code in a structured way, so it is
/// recovered from the error text. Without a status, keywords decide.
fn map_megalodon_error(error: megalodon::error::Error, context: &str) -> PlatformError {
    let error_str = error.to_string();

    if let Some(code) = extract_http_status(&error_str) {
        return error_for_status(code, context, &error_str);
    }

    let error_lower = error_str.to_lowercase();
    if error_lower.contains("unauthorized")
        || error_lower.contains("forbidden")
        || error_lower.contains("token")
    {
        PlatformError::Authentication(format!(
            "Mastodon authentication failed ({}): {}",
            context, error_str
        ))
    } else if error_lower.contains("parse")
        || error_lower.contains("json")
        || error_lower.contains("deserialize")
    {
        PlatformError::Posting(format!(
            "Mastodon response parse error ({}): {}",
            context, error_str
        ))
    } else if error_lower.contains("rate limit") || error_lower.contains("too many requests") {
        PlatformError::RateLimit(format!(
            "Mastodon rate limit exceeded ({}): {}",
            context, error_str
        ))
    } else {
        PlatformError::Network(format!("Mastodon error ({}): {}", context, error_str))
    }
}

/// Extract an HTTP status code from an error message
///
/// Looks for "HTTP 401", "status 403", "code: 429", or a bare three-digit
/// code followed by ':' or ' '.
fn extract_http_status(error_str: &str) -> Option<u16> {
    let prefixes = ["HTTP ", "status ", "code: ", "status_code: "];

    for prefix in &prefixes {
        if let Some(pos) = error_str.find(prefix) {
            let after_prefix = &error_str[pos + prefix.len()..];
            if let Some(code) = after_prefix
                .get(0..3)
                .and_then(|s| s.parse::<u16>().ok())
                .filter(|c| (100..=599).contains(c))
            {
                return Some(code);
            }
        }
    }

    let bytes = error_str.as_bytes();
    for (i, window) in bytes.windows(4).enumerate() {
        let is_code = window[..3].iter().all(u8::is_ascii_digit)
            && (window[3] == b':' || window[3] == b' ')
            && (i == 0 || !bytes[i - 1].is_ascii_digit());
        if !is_code {
            continue;
        }
        if let Some(code) = std::str::from_utf8(&window[..3])
            .ok()
            .and_then(|s| s.parse::<u16>().ok())
            .filter(|c| (100..=599).contains(c))
        {
            return Some(code);
        }
    }

    None
}
