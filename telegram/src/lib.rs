//! Minimal Telegram Bot API client.
//!
//! This crate provides a focused client for the handful of Bot API methods
//! a story bot needs:
//! - Sending and editing text messages, optionally with inline keyboards
//! - Answering callback queries from inline buttons
//! - Long polling for updates, either one batch at a time or as a stream

use futures::StreamExt;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::pin::Pin;
use thiserror::Error;
use tokio_stream::Stream;

const API_BASE: &str = "https://api.telegram.org";

/// Errors that can occur when using the Telegram client.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Bot token not configured")]
    NoToken,

    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Telegram Bot API client.
#[derive(Clone)]
pub struct Telegram {
    client: reqwest::Client,
    token: String,
    api_base: String,
}

impl Telegram {
    /// Create a new client with the given bot token.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                // Must outlive the long-polling timeout passed to getUpdates.
                .timeout(std::time::Duration::from_secs(120))
                .connect_timeout(std::time::Duration::from_secs(30))
                .build()
                .expect("Failed to build HTTP client"),
            token: token.into(),
            api_base: API_BASE.to_string(),
        }
    }

    /// Create a client from the BOT_TOKEN environment variable.
    pub fn from_env() -> Result<Self, Error> {
        let token = std::env::var("BOT_TOKEN").map_err(|_| Error::NoToken)?;
        if token.trim().is_empty() {
            return Err(Error::NoToken);
        }
        Ok(Self::new(token))
    }

    /// Point the client at a different API server (local Bot API server, test double).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// Send a text message.
    pub async fn send_message(&self, request: SendMessage) -> Result<Message, Error> {
        self.call("sendMessage", &request).await
    }

    /// Replace the text (and keyboard) of a message the bot sent earlier.
    pub async fn edit_message_text(&self, request: EditMessageText) -> Result<(), Error> {
        // The result is either the edited Message or `true` for inline messages.
        let _: serde_json::Value = self.call("editMessageText", &request).await?;
        Ok(())
    }

    /// Acknowledge a callback query so the client stops showing a spinner.
    pub async fn answer_callback_query(&self, callback_query_id: &str) -> Result<(), Error> {
        #[derive(Serialize)]
        struct AnswerCallbackQuery<'a> {
            callback_query_id: &'a str,
        }

        let _: bool = self
            .call(
                "answerCallbackQuery",
                &AnswerCallbackQuery { callback_query_id },
            )
            .await?;
        Ok(())
    }

    /// Fetch the next batch of updates using long polling.
    ///
    /// `offset` acknowledges every update with a smaller id.
    pub async fn get_updates(
        &self,
        offset: Option<i64>,
        timeout_secs: u64,
    ) -> Result<Vec<Update>, Error> {
        let request = GetUpdates {
            offset,
            timeout: timeout_secs,
            allowed_updates: vec!["message".to_string(), "callback_query".to_string()],
        };
        self.call("getUpdates", &request).await
    }

    /// Poll updates forever as a stream.
    ///
    /// The offset is tracked internally, so every update is yielded once.
    /// A failed poll is yielded as an `Err` item and the next poll retries
    /// from the same offset; it is up to the consumer to back off.
    pub fn updates(
        &self,
        timeout_secs: u64,
    ) -> Pin<Box<dyn Stream<Item = Result<Update, Error>> + Send>> {
        let state = PollState {
            client: self.clone(),
            offset: None,
            pending: VecDeque::new(),
        };

        let stream = futures::stream::unfold(state, move |mut state| async move {
            loop {
                if let Some(update) = state.pending.pop_front() {
                    return Some((Ok(update), state));
                }

                match state.client.get_updates(state.offset, timeout_secs).await {
                    Ok(batch) => {
                        if let Some(last) = batch.last() {
                            state.offset = Some(last.update_id + 1);
                        }
                        state.pending.extend(batch);
                    }
                    Err(e) => return Some((Err(e), state)),
                }
            }
        });

        stream.boxed()
    }

    async fn call<B, T>(&self, method: &str, body: &B) -> Result<T, Error>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        if self.token.is_empty() {
            return Err(Error::NoToken);
        }

        let response = self
            .client
            .post(self.method_url(method))
            .json(body)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        parse_api_response(status, &body)
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{method}", self.api_base, self.token)
    }
}

struct PollState {
    client: Telegram,
    offset: Option<i64>,
    pending: VecDeque<Update>,
}

/// Unwrap the `{ok, result, description, error_code}` envelope every Bot API
/// method returns.
fn parse_api_response<T: DeserializeOwned>(status: u16, body: &str) -> Result<T, Error> {
    let envelope: ApiResponse<T> = match serde_json::from_str(body) {
        Ok(envelope) => envelope,
        Err(e) if !(200..300).contains(&status) => {
            return Err(Error::Api {
                status,
                message: format!("{body} ({e})"),
            })
        }
        Err(e) => return Err(Error::Parse(e.to_string())),
    };

    if !envelope.ok {
        return Err(Error::Api {
            status: envelope.error_code.unwrap_or(status),
            message: envelope
                .description
                .unwrap_or_else(|| "no description".to_string()),
        });
    }

    envelope
        .result
        .ok_or_else(|| Error::Parse("response is ok but has no result".to_string()))
}

// ============================================================================
// Public types
// ============================================================================

/// Target chat: a numeric id or an `@username` for public channels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChatId {
    Id(i64),
    Username(String),
}

impl ChatId {
    /// Parse a configured chat reference. Numeric strings become ids; anything
    /// else is treated as a username and gets a leading `@` if it lacks one.
    pub fn parse(value: &str) -> Result<Self, Error> {
        let value = value.trim();
        if value.is_empty() {
            return Err(Error::Config("empty chat id".to_string()));
        }
        if let Ok(id) = value.parse::<i64>() {
            return Ok(ChatId::Id(id));
        }
        if value.starts_with('@') {
            Ok(ChatId::Username(value.to_string()))
        } else {
            Ok(ChatId::Username(format!("@{value}")))
        }
    }
}

impl From<i64> for ChatId {
    fn from(id: i64) -> Self {
        ChatId::Id(id)
    }
}

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatId::Id(id) => write!(f, "{id}"),
            ChatId::Username(name) => f.write_str(name),
        }
    }
}

/// Text formatting mode for outgoing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ParseMode {
    #[serde(rename = "HTML")]
    Html,
    #[serde(rename = "MarkdownV2")]
    MarkdownV2,
}

/// A `sendMessage` request.
#[derive(Debug, Clone, Serialize)]
pub struct SendMessage {
    pub chat_id: ChatId,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parse_mode: Option<ParseMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_markup: Option<InlineKeyboardMarkup>,
}

impl SendMessage {
    pub fn new(chat_id: impl Into<ChatId>, text: impl Into<String>) -> Self {
        Self {
            chat_id: chat_id.into(),
            text: text.into(),
            parse_mode: None,
            reply_markup: None,
        }
    }

    pub fn with_parse_mode(mut self, parse_mode: ParseMode) -> Self {
        self.parse_mode = Some(parse_mode);
        self
    }

    pub fn with_keyboard(mut self, keyboard: InlineKeyboardMarkup) -> Self {
        self.reply_markup = Some(keyboard);
        self
    }
}

/// An `editMessageText` request.
#[derive(Debug, Clone, Serialize)]
pub struct EditMessageText {
    pub chat_id: ChatId,
    pub message_id: i64,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parse_mode: Option<ParseMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_markup: Option<InlineKeyboardMarkup>,
}

impl EditMessageText {
    pub fn new(chat_id: impl Into<ChatId>, message_id: i64, text: impl Into<String>) -> Self {
        Self {
            chat_id: chat_id.into(),
            message_id,
            text: text.into(),
            parse_mode: None,
            reply_markup: None,
        }
    }

    pub fn with_parse_mode(mut self, parse_mode: ParseMode) -> Self {
        self.parse_mode = Some(parse_mode);
        self
    }

    pub fn with_keyboard(mut self, keyboard: InlineKeyboardMarkup) -> Self {
        self.reply_markup = Some(keyboard);
        self
    }
}

/// Inline keyboard attached to a message. Each inner vector is one row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InlineKeyboardMarkup {
    pub inline_keyboard: Vec<Vec<InlineKeyboardButton>>,
}

impl InlineKeyboardMarkup {
    /// One button per row, the layout every menu in the bot uses.
    pub fn single_column(buttons: impl IntoIterator<Item = InlineKeyboardButton>) -> Self {
        Self {
            inline_keyboard: buttons.into_iter().map(|b| vec![b]).collect(),
        }
    }
}

/// A button that sends `callback_data` back to the bot when pressed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InlineKeyboardButton {
    pub text: String,
    pub callback_data: String,
}

impl InlineKeyboardButton {
    pub fn callback(text: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            callback_data: data.into(),
        }
    }
}

/// An incoming update. Only the kinds the bot subscribes to are modelled.
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub callback_query: Option<CallbackQuery>,
}

/// A chat message.
#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    #[serde(default)]
    pub from: Option<User>,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

/// The sender of a message or callback query.
#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub username: Option<String>,
}

/// A press on an inline keyboard button.
#[derive(Debug, Clone, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: User,
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub data: Option<String>,
}

// ============================================================================
// Internal API types
// ============================================================================

#[derive(Debug, Serialize)]
struct GetUpdates {
    #[serde(skip_serializing_if = "Option::is_none")]
    offset: Option<i64>,
    timeout: u64,
    allowed_updates: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    error_code: Option<u16>,
}
