//! The update loop and per-update handlers.

use crate::outbox::Outbox;
use crate::replies::{self, Reply};
use crate::router::{route, Route};
use futures::{Stream, StreamExt};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use story_core::format::{parse_count, parse_story_id, recent_listing, split_message, MESSAGE_LIMIT};
use story_core::{AdminError, StoryDesk};
use telegram::{ChatId, Update};
use tokio::task::{JoinError, JoinSet};

/// Pause after a failed poll before trying again.
const RETRY_DELAY: Duration = Duration::from_secs(5);

/// Connects Telegram updates to a [`StoryDesk`].
pub struct Bot {
    outbox: Arc<dyn Outbox>,
    desk: Arc<dyn StoryDesk>,
}

impl Bot {
    pub fn new(outbox: Arc<dyn Outbox>, desk: Arc<dyn StoryDesk>) -> Self {
        Self { outbox, desk }
    }

    /// Handle updates until `shutdown` completes or the stream ends.
    ///
    /// Each update is handled in its own task. Tasks still running when the
    /// loop stops are awaited, so an accepted story always gets its
    /// publication attempt and its reply.
    pub async fn run<S, F>(self, mut updates: S, shutdown: F)
    where
        S: Stream<Item = Result<Update, telegram::Error>> + Unpin,
        F: Future<Output = ()>,
    {
        let bot = Arc::new(self);
        let mut tasks = JoinSet::new();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("shutdown requested, stopping update loop");
                    break;
                }
                Some(done) = tasks.join_next(), if !tasks.is_empty() => log_task_failure(done),
                next = updates.next() => {
                    match next {
                        Some(Ok(update)) => {
                            let bot = bot.clone();
                            tasks.spawn(async move { bot.handle(update).await });
                        }
                        Some(Err(e)) => {
                            tracing::warn!(error = %e, "polling for updates failed, retrying");
                            tokio::select! {
                                _ = &mut shutdown => {
                                    tracing::info!("shutdown requested, stopping update loop");
                                    break;
                                }
                                _ = tokio::time::sleep(RETRY_DELAY) => {}
                            }
                        }
                        None => break,
                    }
                }
            }
        }

        if !tasks.is_empty() {
            tracing::info!(pending = tasks.len(), "waiting for in-flight updates");
        }
        while let Some(done) = tasks.join_next().await {
            log_task_failure(done);
        }
    }

    async fn handle(&self, update: Update) {
        let update_id = update.update_id;
        let result = match route(&update) {
            Route::Start { chat_id } => self.send(chat_id, replies::welcome()).await,
            Route::List {
                chat_id,
                user_id,
                arg,
            } => self.list(chat_id, user_id, arg.as_deref()).await,
            Route::Post {
                chat_id,
                user_id,
                arg,
            } => self.post(chat_id, user_id, arg.as_deref()).await,
            Route::Story {
                chat_id,
                user_id,
                username,
                text,
            } => self.story(chat_id, user_id, username, &text).await,
            Route::Button {
                query_id,
                chat_id,
                message_id,
                data,
            } => self.button(&query_id, chat_id, message_id, &data).await,
            Route::Ignore => Ok(()),
        };

        if let Err(e) = result {
            tracing::error!(update_id, error = %e, "failed to handle update");
        }
    }

    async fn story(
        &self,
        chat_id: i64,
        user_id: i64,
        username: Option<String>,
        text: &str,
    ) -> Result<(), telegram::Error> {
        let outcome = self.desk.submit(user_id, username, text).await;
        tracing::debug!(?outcome, "submission handled");

        match replies::for_submission(&outcome) {
            Some(reply) => self.send(chat_id, reply).await,
            None => Ok(()),
        }
    }

    async fn list(
        &self,
        chat_id: i64,
        user_id: i64,
        arg: Option<&str>,
    ) -> Result<(), telegram::Error> {
        let records = match self.desk.list_recent(user_id, parse_count(arg)).await {
            Ok(records) => records,
            Err(AdminError::Unauthorized) => return Ok(()),
            Err(AdminError::Store(e)) => {
                tracing::error!(error = %e, "failed to read stories for /list");
                return self.send(chat_id, replies::storage_error()).await;
            }
        };

        for chunk in split_message(&recent_listing(&records), MESSAGE_LIMIT) {
            self.send(chat_id, Reply::plain(chunk)).await?;
        }
        Ok(())
    }

    async fn post(
        &self,
        chat_id: i64,
        user_id: i64,
        arg: Option<&str>,
    ) -> Result<(), telegram::Error> {
        // Non-admins must not learn that the command exists, not even from
        // an argument error.
        if !self.desk.config().is_privileged(user_id) {
            return Ok(());
        }

        let id = match parse_story_id(arg) {
            Ok(id) => id,
            Err(e) => return self.send(chat_id, Reply::plain(e.to_string())).await,
        };

        match self.desk.publish_by_id(user_id, id).await {
            Ok(outcome) => self.send(chat_id, replies::for_publish(&outcome)).await,
            Err(AdminError::Unauthorized) => Ok(()),
            Err(AdminError::Store(e)) => {
                tracing::error!(story_id = %id, error = %e, "failed to read story for /post");
                self.send(chat_id, replies::storage_error()).await
            }
        }
    }

    async fn button(
        &self,
        query_id: &str,
        chat_id: Option<i64>,
        message_id: Option<i64>,
        data: &str,
    ) -> Result<(), telegram::Error> {
        self.outbox.answer(query_id).await?;

        let (Some(chat_id), Some(message_id)) = (chat_id, message_id) else {
            return Ok(());
        };
        let Some(reply) = replies::for_button(data, self.desk.config().mode) else {
            tracing::debug!(data, "ignoring unknown button");
            return Ok(());
        };

        self.outbox
            .edit(ChatId::from(chat_id), message_id, reply)
            .await
    }

    async fn send(&self, chat_id: i64, reply: Reply) -> Result<(), telegram::Error> {
        self.outbox.send(ChatId::from(chat_id), reply).await
    }
}

fn log_task_failure(done: Result<(), JoinError>) {
    if let Err(e) = done {
        tracing::error!(error = %e, "update handler panicked");
    }
}
