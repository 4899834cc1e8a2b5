//! Mock publisher for testing
//!
//! Records every call and can be told to fail authentication a number of
//! times or to reject particular posts. It is compiled into all builds so the
//! integration tests can drive the sync pipeline without a server.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use crate::error::{BirdcastError, PlatformError, Result};
use crate::platforms::{Pagination, Publisher, Session, TimelinePage, TimelinePost};
use crate::types::Credentials;

const PAGE_SIZE: usize = 2;

#[derive(Debug, Default)]
struct MockState {
    auth_calls: usize,
    post_calls: usize,
    /// Remaining authentication attempts that will fail
    auth_failures: usize,
    /// Posts containing any of these substrings are rejected
    reject_containing: Vec<String>,
    /// Accepted posts as (numeric id, text), oldest first
    timeline: Vec<(u64, String)>,
    next_id: u64,
    deleted: Vec<String>,
    failing_deletes: Vec<String>,
    authenticated_users: Vec<String>,
}

/// Mock publisher; clones share state, so a test can keep one to inspect
#[derive(Debug, Clone, Default)]
pub struct MockPublisher {
    state: Arc<Mutex<MockState>>,
}

impl MockPublisher {
    /// A publisher where everything succeeds
    pub fn success() -> Self {
        Self::default()
    }

    /// The first `times` authentication attempts fail
    pub fn auth_failures(times: usize) -> Self {
        let publisher = Self::default();
        publisher.state.lock().unwrap().auth_failures = times;
        publisher
    }

    /// Reject every post whose text contains `needle`
    pub fn reject_posts_containing(self, needle: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .reject_containing
            .push(needle.to_string());
        self
    }

    /// Make deleting the post with this id fail
    pub fn fail_delete_of(self, id: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .failing_deletes
            .push(id.to_string());
        self
    }

    /// Stop rejecting posts (simulates the endpoint recovering)
    pub fn accept_all(&self) {
        self.state.lock().unwrap().reject_containing.clear();
    }

    /// Pre-populate the timeline with existing posts
    pub fn with_existing_posts(self, texts: &[&str]) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            for text in texts {
                state.next_id += 1;
                let id = state.next_id;
                state.timeline.push((id, text.to_string()));
            }
        }
        self
    }

    pub fn auth_call_count(&self) -> usize {
        self.state.lock().unwrap().auth_calls
    }

    pub fn post_call_count(&self) -> usize {
        self.state.lock().unwrap().post_calls
    }

    /// Texts of accepted posts still on the timeline, oldest first
    pub fn posted_content(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .timeline
            .iter()
            .map(|(_, text)| text.clone())
            .collect()
    }

    pub fn deleted_ids(&self) -> Vec<String> {
        self.state.lock().unwrap().deleted.clone()
    }

    pub fn authenticated_users(&self) -> Vec<String> {
        self.state.lock().unwrap().authenticated_users.clone()
    }
}

#[async_trait]
impl Publisher for MockPublisher {
    async fn authenticate(&self, credentials: &Credentials) -> Result<Box<dyn Session>> {
        let mut state = self.state.lock().unwrap();
        state.auth_calls += 1;

        if state.auth_failures > 0 {
            state.auth_failures -= 1;
            return Err(PlatformError::Authentication("Mock authentication failed".to_string()).into());
        }

        state.authenticated_users.push(credentials.username.clone());
        Ok(Box::new(MockSession {
            state: Arc::clone(&self.state),
        }))
    }

    fn name(&self) -> &str {
        "mock"
    }
}

struct MockSession {
    state: Arc<Mutex<MockState>>,
}

#[async_trait]
impl Session for MockSession {
    async fn post(&self, text: &str) -> Result<String> {
        let mut state = self.state.lock().unwrap();
        state.post_calls += 1;

        if state.reject_containing.iter().any(|n| text.contains(n.as_str())) {
            return Err(PlatformError::Network("Mock transport error".to_string()).into());
        }

        state.next_id += 1;
        let id = state.next_id;
        state.timeline.push((id, text.to_string()));
        Ok(id.to_string())
    }

    async fn list_timeline(&self, page: &Pagination) -> Result<TimelinePage> {
        let parse = |cursor: &Option<String>| -> Result<Option<u64>> {
            cursor
                .as_deref()
                .map(|id| {
                    id.parse::<u64>().map_err(|_| {
                        BirdcastError::from(PlatformError::Validation(format!(
                            "Invalid mock cursor: {}",
                            id
                        )))
                    })
                })
                .transpose()
        };
        let max_id = parse(&page.max_id)?;
        let since_id = parse(&page.since_id)?;

        let state = self.state.lock().unwrap();
        let posts = state
            .timeline
            .iter()
            .rev()
            .filter(|(id, _)| max_id.map_or(true, |max| *id < max))
            .filter(|(id, _)| since_id.map_or(true, |since| *id > since))
            .take(PAGE_SIZE)
            .map(|(id, text)| TimelinePost {
                id: id.to_string(),
                content: text.clone(),
            })
            .collect();

        Ok(TimelinePage::from_posts(posts))
    }

    async fn delete_post(&self, id: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();

        if state.failing_deletes.iter().any(|f| f == id) {
            return Err(PlatformError::Posting(format!("Mock delete of {} failed", id)).into());
        }

        let before = state.timeline.len();
        state.timeline.retain(|(post_id, _)| post_id.to_string() != id);
        if state.timeline.len() == before {
            return Err(PlatformError::Posting(format!("No such post: {}", id)).into());
        }

        state.deleted.push(id.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;

    fn credentials() -> Credentials {
        Credentials {
            username: "news@example.org".to_string(),
            password: SecretString::from("pw".to_string()),
        }
    }

    #[tokio::test]
    async fn test_mock_success() {
        let publisher = MockPublisher::success();

        let session = publisher.authenticate(&credentials()).await.unwrap();
        assert_eq!(publisher.auth_call_count(), 1);
        assert_eq!(publisher.authenticated_users(), vec!["news@example.org"]);

        let id = session.post("Test content").await.unwrap();
        assert_eq!(id, "1");
        assert_eq!(publisher.post_call_count(), 1);
        assert_eq!(publisher.posted_content(), vec!["Test content"]);
    }

    #[tokio::test]
    async fn test_mock_auth_failures_then_success() {
        let publisher = MockPublisher::auth_failures(2);

        assert!(publisher.authenticate(&credentials()).await.is_err());
        assert!(publisher.authenticate(&credentials()).await.is_err());
        assert!(publisher.authenticate(&credentials()).await.is_ok());
        assert_eq!(publisher.auth_call_count(), 3);
    }

    #[tokio::test]
    async fn test_mock_rejects_matching_posts() {
        let publisher = MockPublisher::success().reject_posts_containing("bad");
        let session = publisher.authenticate(&credentials()).await.unwrap();

        let err = session.post("a bad post").await.unwrap_err();
        assert!(err.to_string().contains("Mock transport error"));
        assert!(session.post("a good post").await.is_ok());

        publisher.accept_all();
        assert!(session.post("a bad post").await.is_ok());
        assert_eq!(publisher.post_call_count(), 3);
        assert_eq!(publisher.posted_content(), vec!["a good post", "a bad post"]);
    }

    #[tokio::test]
    async fn test_mock_timeline_paging() {
        let publisher = MockPublisher::success().with_existing_posts(&["one", "two", "three"]);
        let session = publisher.authenticate(&credentials()).await.unwrap();

        let first = session.list_timeline(&Pagination::default()).await.unwrap();
        let ids: Vec<&str> = first.posts.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["3", "2"]);

        let next = first.next.unwrap();
        let second = session.list_timeline(&next).await.unwrap();
        let ids: Vec<&str> = second.posts.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["1"]);

        let last = session.list_timeline(&second.next.unwrap()).await.unwrap();
        assert!(last.posts.is_empty());
        assert!(last.next.is_none());
    }

    #[tokio::test]
    async fn test_mock_delete() {
        let publisher = MockPublisher::success()
            .with_existing_posts(&["one", "two"])
            .fail_delete_of("2");
        let session = publisher.authenticate(&credentials()).await.unwrap();

        session.delete_post("1").await.unwrap();
        assert!(session.delete_post("2").await.is_err());
        assert!(session.delete_post("99").await.is_err());

        assert_eq!(publisher.deleted_ids(), vec!["1"]);
        assert_eq!(publisher.posted_content(), vec!["two"]);
    }
}
