//! Text shown to the channel and to admins, plus parsing of admin arguments.

use crate::record::{StoryId, StoryRecord};
use thiserror::Error;

/// How many stories `/list` shows when no usable count is given.
pub const DEFAULT_LIST_COUNT: usize = 10;

/// Characters of story text shown per entry in `/list`.
pub const PREVIEW_CHARS: usize = 100;

/// Telegram rejects messages longer than 4096 characters.
pub const MESSAGE_LIMIT: usize = 4000;

/// The channel post for a story: a header with its number, then the text.
///
/// Nothing about the author goes into the post.
pub fn publication_text(record: &StoryRecord) -> String {
    format!("📝 Story #{}\n\n{}", record.id, record.text)
}

/// Admin listing of the given stories, in the order given.
pub fn recent_listing(records: &[StoryRecord]) -> String {
    if records.is_empty() {
        return "📭 No stories saved yet.".to_string();
    }

    let mut out = format!("📋 Last {} stories:\n\n", records.len());
    for record in records {
        out.push_str(&format!("ID: {} | {}\n", record.id, record.ts_short()));
        out.push_str(&format!("📝 {}\n\n", record.preview(PREVIEW_CHARS)));
    }
    out.push_str("\nUse /post ID to publish a story.");
    out
}

/// Split `text` into chunks of at most `limit` characters.
pub fn split_message(text: &str, limit: usize) -> Vec<String> {
    if limit == 0 || text.chars().count() <= limit {
        return vec![text.to_string()];
    }

    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(limit)
        .map(|chunk| chunk.iter().collect())
        .collect()
}

/// Count argument of `/list`: defaults when missing, not a number, or zero.
pub fn parse_count(arg: Option<&str>) -> usize {
    arg.and_then(|a| a.trim().parse::<usize>().ok())
        .filter(|&n| n > 0)
        .unwrap_or(DEFAULT_LIST_COUNT)
}

/// Problems with the argument of `/post`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdArgError {
    #[error("❌ Specify the story ID: /post ID")]
    Missing,

    #[error("❌ The ID must be a number.")]
    NotANumber,
}

/// Identifier argument of `/post`.
pub fn parse_story_id(arg: Option<&str>) -> Result<StoryId, IdArgError> {
    let arg = arg.map(str::trim).filter(|a| !a.is_empty()).ok_or(IdArgError::Missing)?;
    arg.parse().map_err(|_| IdArgError::NotANumber)
}
