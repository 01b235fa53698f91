//! Posting stories to the public channel through the Bot API.

use crate::outbox::Outbox;
use crate::replies::Reply;
use async_trait::async_trait;
use std::sync::Arc;
use story_core::format::{split_message, MESSAGE_LIMIT};
use story_core::{PublishError, Publisher};
use telegram::ChatId;

/// Publishes plain-text posts to one channel.
///
/// Posts longer than one Telegram message go out as several consecutive
/// messages.
pub struct ChannelPublisher {
    outbox: Arc<dyn Outbox>,
    channel: ChatId,
}

impl ChannelPublisher {
    pub fn new(outbox: Arc<dyn Outbox>, channel: ChatId) -> Self {
        Self { outbox, channel }
    }
}

#[async_trait]
impl Publisher for ChannelPublisher {
    async fn publish(&self, text: &str) -> Result<(), PublishError> {
        for chunk in split_message(text, MESSAGE_LIMIT) {
            self.outbox
                .send(self.channel.clone(), Reply::plain(chunk))
                .await
                .map_err(to_publish_error)?;
        }
        Ok(())
    }
}

fn to_publish_error(e: telegram::Error) -> PublishError {
    match e {
        telegram::Error::Network(msg) => PublishError::Unreachable(msg),
        other => PublishError::Rejected(other.to_string()),
    }
}
