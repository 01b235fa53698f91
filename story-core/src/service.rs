//! StoryService - the API a chat transport drives.
//!
//! The transport only sees [`StoryDesk`]: it hands over submissions and
//! admin commands and turns the outcomes into replies. Storage and the
//! publication channel stay behind it.

use crate::config::BotConfig;
use crate::intake::{Intake, SubmitOutcome};
use crate::moderation::{AdminError, Moderation, PublishOutcome};
use crate::publish::Publisher;
use crate::record::{StoryId, StoryRecord};
use crate::store::{RecordStore, StoreError};
use async_trait::async_trait;
use std::sync::Arc;

/// Operations the core offers to a chat transport.
#[async_trait]
pub trait StoryDesk: Send + Sync {
    /// Accept a story from a user.
    async fn submit(
        &self,
        author_id: i64,
        author_handle: Option<String>,
        text: &str,
    ) -> SubmitOutcome;

    /// The `count` most recent stories, newest first; zero means the
    /// default of 10. Admins only.
    async fn list_recent(
        &self,
        caller_id: i64,
        count: usize,
    ) -> Result<Vec<StoryRecord>, AdminError>;

    /// Publish a stored story. Admins only.
    async fn publish_by_id(
        &self,
        caller_id: i64,
        id: StoryId,
    ) -> Result<PublishOutcome, AdminError>;

    /// The configuration the desk runs with.
    fn config(&self) -> &BotConfig;
}

/// The standard [`StoryDesk`], wiring both pipelines to one store.
pub struct StoryService {
    config: Arc<BotConfig>,
    store: Arc<RecordStore>,
    intake: Intake,
    moderation: Moderation,
}

impl StoryService {
    /// Open the story log named in `config` and build both pipelines.
    pub async fn new(
        config: BotConfig,
        publisher: Arc<dyn Publisher>,
    ) -> Result<Self, StoreError> {
        let store = RecordStore::open(&config.stories_path).await?;
        Ok(Self::with_store(config, store, publisher))
    }

    /// Build a service over an already opened store.
    pub fn with_store(
        config: BotConfig,
        store: RecordStore,
        publisher: Arc<dyn Publisher>,
    ) -> Self {
        let config = Arc::new(config);
        let store = Arc::new(store);

        Self {
            intake: Intake::new(store.clone(), publisher.clone(), config.clone()),
            moderation: Moderation::new(store.clone(), publisher, config.clone()),
            config,
            store,
        }
    }

    /// The underlying story log.
    pub fn store(&self) -> &RecordStore {
        &self.store
    }
}

#[async_trait]
impl StoryDesk for StoryService {
    async fn submit(
        &self,
        author_id: i64,
        author_handle: Option<String>,
        text: &str,
    ) -> SubmitOutcome {
        self.intake.submit(author_id, author_handle, text).await
    }

    async fn list_recent(
        &self,
        caller_id: i64,
        count: usize,
    ) -> Result<Vec<StoryRecord>, AdminError> {
        self.moderation.list_recent(caller_id, count).await
    }

    async fn publish_by_id(
        &self,
        caller_id: i64,
        id: StoryId,
    ) -> Result<PublishOutcome, AdminError> {
        self.moderation.publish_by_id(caller_id, id).await
    }

    fn config(&self) -> &BotConfig {
        &self.config
    }
}
