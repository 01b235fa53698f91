//! The persisted story record.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Sequential identifier of a stored story. The first story is #1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoryId(pub u64);

impl StoryId {
    pub const FIRST: StoryId = StoryId(1);

    /// The identifier that follows this one, or `None` once `u64` runs out.
    pub fn next(self) -> Option<StoryId> {
        self.0.checked_add(1).map(StoryId)
    }
}

impl fmt::Display for StoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for StoryId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(StoryId)
    }
}

/// A single submitted story, exactly as it sits in the log.
///
/// The author fields are kept for moderation only and are never part of
/// anything the bot publishes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryRecord {
    pub id: StoryId,

    /// When the store accepted the story.
    #[serde(with = "iso_timestamp")]
    pub ts: DateTime<Local>,

    #[serde(alias = "user_id")]
    pub author_id: i64,

    #[serde(default, alias = "username")]
    pub author_handle: Option<String>,

    pub text: String,
}

impl StoryRecord {
    /// The story text cut to at most `max_chars` characters, with `...`
    /// appended when something was cut.
    pub fn preview(&self, max_chars: usize) -> String {
        // Character count keeps the cut on a UTF-8 boundary.
        if self.text.chars().count() > max_chars {
            let truncated: String = self.text.chars().take(max_chars).collect();
            format!("{truncated}...")
        } else {
            self.text.clone()
        }
    }

    /// Creation time to the minute, as shown in admin listings.
    pub fn ts_short(&self) -> String {
        self.ts.format("%Y-%m-%dT%H:%M").to_string()
    }
}

/// ISO-8601 timestamps. Writes RFC 3339 with offset; also reads offset-less
/// local timestamps written by older versions of the bot.
mod iso_timestamp {
    use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &DateTime<Local>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&ts.to_rfc3339())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Local>, D::Error> {
        let raw = String::deserialize(deserializer)?;

        if let Ok(ts) = DateTime::parse_from_rfc3339(&raw) {
            return Ok(ts.with_timezone(&Local));
        }

        let naive = NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
            .map_err(|e| de::Error::custom(format!("invalid timestamp {raw:?}: {e}")))?;
        Local
            .from_local_datetime(&naive)
            .earliest()
            .ok_or_else(|| de::Error::custom(format!("nonexistent local time {raw:?}")))
    }
}
