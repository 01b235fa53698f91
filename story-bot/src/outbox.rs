//! Where replies go.

use crate::replies::Reply;
use async_trait::async_trait;
use telegram::{ChatId, EditMessageText, SendMessage, Telegram};

/// The outgoing half of the chat transport.
#[async_trait]
pub trait Outbox: Send + Sync {
    /// Send `reply` as a new message.
    async fn send(&self, chat: ChatId, reply: Reply) -> Result<(), telegram::Error>;

    /// Replace the text and keyboard of an earlier message.
    async fn edit(&self, chat: ChatId, message_id: i64, reply: Reply)
        -> Result<(), telegram::Error>;

    /// Acknowledge an inline button press.
    async fn answer(&self, query_id: &str) -> Result<(), telegram::Error>;
}

#[async_trait]
impl Outbox for Telegram {
    async fn send(&self, chat: ChatId, reply: Reply) -> Result<(), telegram::Error> {
        let mut message = SendMessage::new(chat, reply.text);
        if let Some(mode) = reply.parse_mode {
            message = message.with_parse_mode(mode);
        }
        if let Some(keyboard) = reply.keyboard {
            message = message.with_keyboard(keyboard);
        }
        self.send_message(message).await.map(|_| ())
    }

    async fn edit(
        &self,
        chat: ChatId,
        message_id: i64,
        reply: Reply,
    ) -> Result<(), telegram::Error> {
        let mut edit = EditMessageText::new(chat, message_id, reply.text);
        if let Some(mode) = reply.parse_mode {
            edit = edit.with_parse_mode(mode);
        }
        if let Some(keyboard) = reply.keyboard {
            edit = edit.with_keyboard(keyboard);
        }
        self.edit_message_text(edit).await
    }

    async fn answer(&self, query_id: &str) -> Result<(), telegram::Error> {
        self.answer_callback_query(query_id).await
    }
}

#[cfg(test)]
pub use recording::{RecordingOutbox, Sent};

#[cfg(test)]
mod recording {
    use super::*;
    use std::sync::Mutex;

    /// One call made on a [`RecordingOutbox`].
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Sent {
        Message { chat: ChatId, reply: Reply },
        Edit { chat: ChatId, message_id: i64, reply: Reply },
        Answer { query_id: String },
    }

    /// Outbox that keeps everything instead of talking to Telegram.
    ///
    /// Once `fail_after` sends have succeeded, further sends fail with a
    /// network error.
    #[derive(Default)]
    pub struct RecordingOutbox {
        sent: Mutex<Vec<Sent>>,
        fail_after: Option<usize>,
    }

    impl RecordingOutbox {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn failing_after(successful_sends: usize) -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                fail_after: Some(successful_sends),
            }
        }

        pub fn sent(&self) -> Vec<Sent> {
            self.sent.lock().unwrap().clone()
        }

        /// Texts of plain messages sent to `chat`, in order.
        pub fn texts_to(&self, chat: &ChatId) -> Vec<String> {
            self.sent()
                .into_iter()
                .filter_map(|s| match s {
                    Sent::Message { chat: c, reply } if &c == chat => Some(reply.text),
                    _ => None,
                })
                .collect()
        }

        fn record(&self, sent: Sent) {
            self.sent.lock().unwrap().push(sent);
        }
    }

    #[async_trait]
    impl Outbox for RecordingOutbox {
        async fn send(&self, chat: ChatId, reply: Reply) -> Result<(), telegram::Error> {
            let mut sent = self.sent.lock().unwrap();
            let messages = sent
                .iter()
                .filter(|s| matches!(s, Sent::Message { .. }))
                .count();
            if self.fail_after.is_some_and(|limit| messages >= limit) {
                return Err(telegram::Error::Network("connection reset".to_string()));
            }
            sent.push(Sent::Message { chat, reply });
            Ok(())
        }

        async fn edit(
            &self,
            chat: ChatId,
            message_id: i64,
            reply: Reply,
        ) -> Result<(), telegram::Error> {
            self.record(Sent::Edit {
                chat,
                message_id,
                reply,
            });
            Ok(())
        }

        async fn answer(&self, query_id: &str) -> Result<(), telegram::Error> {
            self.record(Sent::Answer {
                query_id: query_id.to_string(),
            });
            Ok(())
        }
    }
}
