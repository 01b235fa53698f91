//! Testing utilities for the story pipelines.
//!
//! This module provides tools for integration testing:
//! - `RecordingPublisher`, a channel stand-in that records every post
//! - `TestHarness` for running submissions and admin commands end to end

use crate::config::{BotConfig, PublishMode};
use crate::intake::SubmitOutcome;
use crate::moderation::{AdminError, PublishOutcome};
use crate::publish::{PublishError, Publisher};
use crate::record::{StoryId, StoryRecord};
use crate::service::{StoryDesk, StoryService};
use crate::store::StoreError;
use async_trait::async_trait;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// User id the harness configures as the only admin.
pub const ADMIN_ID: i64 = 1000;

/// How a [`RecordingPublisher`] answers.
#[derive(Debug, Clone)]
pub enum PublisherBehavior {
    Succeed,
    Fail(PublishError),
    /// Never answer within any reasonable timeout.
    Stall,
}

/// A publisher that records what it was asked to post.
///
/// Attempts are recorded whether or not they succeed.
pub struct RecordingPublisher {
    behavior: Mutex<PublisherBehavior>,
    attempts: Mutex<Vec<String>>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::with_behavior(PublisherBehavior::Succeed)
    }

    pub fn failing() -> Self {
        Self::with_behavior(PublisherBehavior::Fail(PublishError::Unreachable(
            "channel is down".to_string(),
        )))
    }

    pub fn with_behavior(behavior: PublisherBehavior) -> Self {
        Self {
            behavior: Mutex::new(behavior),
            attempts: Mutex::new(Vec::new()),
        }
    }

    /// Change how later publish calls behave.
    pub fn set_behavior(&self, behavior: PublisherBehavior) {
        *self.behavior.lock().unwrap_or_else(|e| e.into_inner()) = behavior;
    }

    /// Every text passed to `publish`, in call order.
    pub fn attempts(&self) -> Vec<String> {
        self.attempts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn attempt_count(&self) -> usize {
        self.attempts.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl Default for RecordingPublisher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Publisher for RecordingPublisher {
    async fn publish(&self, text: &str) -> Result<(), PublishError> {
        self.attempts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(text.to_string());

        let behavior = self
            .behavior
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();

        match behavior {
            PublisherBehavior::Succeed => Ok(()),
            PublisherBehavior::Fail(e) => Err(e),
            PublisherBehavior::Stall => {
                tokio::time::sleep(Duration::from_secs(24 * 60 * 60)).await;
                Ok(())
            }
        }
    }
}

/// Test harness wiring a [`StoryService`] to a [`RecordingPublisher`].
pub struct TestHarness {
    pub service: StoryService,
    pub publisher: Arc<RecordingPublisher>,
}

impl TestHarness {
    /// Create a harness whose story log lives in `dir`, with [`ADMIN_ID`] as
    /// the only admin.
    pub async fn new(dir: impl AsRef<Path>, mode: PublishMode) -> Result<Self, StoreError> {
        let config = BotConfig::new("@test_channel")
            .with_mode(mode)
            .with_admins([ADMIN_ID])
            .with_stories_path(dir.as_ref().join("stories.jsonl"))
            .with_publish_timeout(Duration::from_secs(2));

        Self::with_config(config).await
    }

    /// Create a harness from a complete config.
    pub async fn with_config(config: BotConfig) -> Result<Self, StoreError> {
        let publisher = Arc::new(RecordingPublisher::new());
        let service = StoryService::new(config, publisher.clone()).await?;
        Ok(Self { service, publisher })
    }

    /// Submit as a regular user.
    pub async fn submit(&self, author_id: i64, handle: Option<&str>, text: &str) -> SubmitOutcome {
        self.service
            .submit(author_id, handle.map(str::to_string), text)
            .await
    }

    /// `/list` as the admin.
    pub async fn admin_list(&self, count: usize) -> Result<Vec<StoryRecord>, AdminError> {
        self.service.list_recent(ADMIN_ID, count).await
    }

    /// `/post` as the admin.
    pub async fn admin_publish(&self, id: u64) -> Result<PublishOutcome, AdminError> {
        self.service.publish_by_id(ADMIN_ID, StoryId(id)).await
    }

    /// Number of stories in the log.
    pub async fn stored_count(&self) -> usize {
        self.service.store().len().await.unwrap_or(0)
    }

    /// Number of publish attempts seen by the channel.
    pub fn publish_attempts(&self) -> usize {
        self.publisher.attempt_count()
    }
}

// ============================================================================
// Assertion Helpers
// ============================================================================

/// Assert that the channel received exactly `expected` publish attempts.
#[track_caller]
pub fn assert_publish_attempts(harness: &TestHarness, expected: usize) {
    let actual = harness.publish_attempts();
    assert_eq!(
        actual, expected,
        "Expected {expected} publish attempts, got {actual}"
    );
}

/// Assert that nothing posted to the channel mentions `needle`.
#[track_caller]
pub fn assert_never_published(harness: &TestHarness, needle: &str) {
    for post in harness.publisher.attempts() {
        assert!(
            !post.contains(needle),
            "Expected '{needle}' to never be published, found it in {post:?}"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_recording_publisher_records_failures_too() {
        let publisher = RecordingPublisher::failing();

        assert!(publisher.publish("one").await.is_err());
        publisher.set_behavior(PublisherBehavior::Succeed);
        assert!(publisher.publish("two").await.is_ok());

        assert_eq!(publisher.attempts(), vec!["one", "two"]);
    }

    #[tokio::test]
    async fn test_harness_basic_flow() {
        let dir = tempfile::TempDir::new().unwrap();
        let harness = TestHarness::new(dir.path(), PublishMode::Auto).await.unwrap();

        let outcome = harness.submit(1, Some("alice"), "  Hello  ").await;

        assert_eq!(outcome, SubmitOutcome::SavedAndPublished(StoryId(1)));
        assert_eq!(harness.stored_count().await, 1);
        assert_eq!(harness.publisher.attempts(), vec!["📝 Story #1\n\nHello"]);
        assert_never_published(&harness, "alice");
    }
}
