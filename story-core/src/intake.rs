//! Accepting new stories from users.

use crate::config::{BotConfig, PublishMode};
use crate::format::publication_text;
use crate::publish::{publish_with_timeout, Publisher};
use crate::record::StoryId;
use crate::store::RecordStore;
use std::sync::Arc;

/// What happened to a submitted story.
///
/// Storage failures and publication failures are separate variants: a
/// story that was saved but not posted is never reported as lost.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Blank text; nothing was stored.
    Rejected,

    /// The story could not be saved. Nothing was published.
    SaveFailed,

    /// Saved and posted to the channel.
    SavedAndPublished(StoryId),

    /// Saved, but posting failed. An admin can still publish it.
    SavedNotPublished(StoryId),

    /// Saved and waiting for an admin (manual mode).
    SavedPendingModeration(StoryId),
}

impl SubmitOutcome {
    /// Identifier of the stored story, if it was stored.
    pub fn story_id(&self) -> Option<StoryId> {
        match self {
            SubmitOutcome::Rejected | SubmitOutcome::SaveFailed => None,
            SubmitOutcome::SavedAndPublished(id)
            | SubmitOutcome::SavedNotPublished(id)
            | SubmitOutcome::SavedPendingModeration(id) => Some(*id),
        }
    }
}

/// Validates, stores and (in auto mode) publishes incoming stories.
pub struct Intake {
    store: Arc<RecordStore>,
    publisher: Arc<dyn Publisher>,
    config: Arc<BotConfig>,
}

impl Intake {
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

    /// Handle one submission.
    pub async fn submit(
        &self,
        author_id: i64,
        author_handle: Option<String>,
        raw_text: &str,
    ) -> SubmitOutcome {
        let text = raw_text.trim();
        if text.is_empty() {
            return SubmitOutcome::Rejected;
        }

        let record = match self.store.append(author_id, author_handle, text).await {
            Ok(record) => record,
            Err(e) => {
                tracing::error!(author_id, error = %e, "failed to save story");
                return SubmitOutcome::SaveFailed;
            }
        };

        match self.config.mode {
            PublishMode::Manual => SubmitOutcome::SavedPendingModeration(record.id),
            PublishMode::Auto => {
                let post = publication_text(&record);
                match publish_with_timeout(
                    self.publisher.as_ref(),
                    &post,
                    self.config.publish_timeout,
                )
                .await
                {
                    Ok(()) => {
                        tracing::info!(story_id = %record.id, "story published automatically");
                        SubmitOutcome::SavedAndPublished(record.id)
                    }
                    Err(e) => {
                        tracing::error!(story_id = %record.id, error = %e, "automatic publication failed");
                        SubmitOutcome::SavedNotPublished(record.id)
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_story_id_of_outcome() {
        assert_eq!(SubmitOutcome::Rejected.story_id(), None);
        assert_eq!(SubmitOutcome::SaveFailed.story_id(), None);
        assert_eq!(
            SubmitOutcome::SavedNotPublished(StoryId(4)).story_id(),
            Some(StoryId(4))
        );
        assert_eq!(
            SubmitOutcome::SavedPendingModeration(StoryId(5)).story_id(),
            Some(StoryId(5))
        );
    }
}
