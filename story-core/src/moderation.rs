//! Admin-only listing and manual publication.

use crate::config::BotConfig;
use crate::format::{publication_text, DEFAULT_LIST_COUNT};
use crate::publish::{publish_with_timeout, Publisher};
use crate::record::{StoryId, StoryRecord};
use crate::store::{RecordStore, StoreError};
use std::sync::Arc;
use thiserror::Error;

/// Errors from admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    /// The caller is not an admin. Callers should not reply at all.
    #[error("caller is not privileged")]
    Unauthorized,

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Result of a manual publish request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    Published(StoryId),
    NotFound(StoryId),
    PublishFailed(StoryId, String),
}

/// Listing and republishing stored stories on admin request.
pub struct Moderation {
    store: Arc<RecordStore>,
    publisher: Arc<dyn Publisher>,
    config: Arc<BotConfig>,
}

impl Moderation {
    pub fn new(
        store: Arc<RecordStore>,
        publisher: Arc<dyn Publisher>,
        config: Arc<BotConfig>,
    ) -> Self {
        Self {
            store,
            publisher,
            config,
        }
    }

    fn authorize(&self, caller_id: i64) -> Result<(), AdminError> {
        if self.config.is_privileged(caller_id) {
            Ok(())
        } else {
            tracing::debug!(caller_id, "ignoring admin command from non-admin");
            Err(AdminError::Unauthorized)
        }
    }

    /// The `count` most recent stories, newest first. A `count` of zero
    /// means [`DEFAULT_LIST_COUNT`].
    pub async fn list_recent(
        &self,
        caller_id: i64,
        count: usize,
    ) -> Result<Vec<StoryRecord>, AdminError> {
        self.authorize(caller_id)?;
        let count = if count == 0 { DEFAULT_LIST_COUNT } else { count };

        let mut records = self.store.list_all().await?;
        let skip = records.len().saturating_sub(count);
        let mut recent = records.split_off(skip);
        recent.reverse();
        Ok(recent)
    }

    /// Post a stored story to the channel.
    ///
    /// The store is not modified, so a story can be published any number of
    /// times, including after a failed automatic attempt.
    pub async fn publish_by_id(
        &self,
        caller_id: i64,
        id: StoryId,
    ) -> Result<PublishOutcome, AdminError> {
        self.authorize(caller_id)?;

        let Some(record) = self.store.lookup(id).await? else {
            return Ok(PublishOutcome::NotFound(id));
        };

        let post = publication_text(&record);
        let outcome =
            match publish_with_timeout(self.publisher.as_ref(), &post, self.config.publish_timeout)
                .await
            {
                Ok(()) => {
                    tracing::info!(story_id = %id, admin_id = caller_id, "story published by admin");
                    PublishOutcome::Published(id)
                }
                Err(e) => {
                    tracing::error!(story_id = %id, error = %e, "manual publication failed");
                    PublishOutcome::PublishFailed(id, e.to_string())
                }
            };

        Ok(outcome)
    }
}
