//! Append-only story log.
//!
//! Stories live in a single JSON Lines file, one [`StoryRecord`] per line.
//! The file is the whole durable state: there is no index and no counter
//! file, so every read and every identifier assignment is derived from a
//! fresh scan of the log.

use crate::record::{StoryId, StoryRecord};
use chrono::Local;
use serde::Deserialize;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs::{self, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt, SeekFrom};
use tokio::sync::Mutex;

/// Errors from reading or writing the story log.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("no identifier left after {0}")]
    IdsExhausted(StoryId),
}

/// The durable story log.
///
/// Appends are serialized through an internal lock, so one `RecordStore`
/// shared between tasks never hands out the same identifier twice.
#[derive(Debug)]
pub struct RecordStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl RecordStore {
    /// Open the log at `path`, creating its parent directory if needed.
    ///
    /// The file itself is created by the first append.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        Ok(Self {
            path,
            write_lock: Mutex::new(()),
        })
    }

    /// Location of the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a new story and return it as stored.
    ///
    /// The identifier is one more than the largest identifier in the log
    /// (1 for an empty log). On error nothing was written that a later read
    /// would accept as a record.
    pub async fn append(
        &self,
        author_id: i64,
        author_handle: Option<String>,
        text: impl Into<String>,
    ) -> Result<StoryRecord, StoreError> {
        let _guard = self.write_lock.lock().await;

        let log = self.read_log().await?;
        let id = match log.max_id {
            Some(max) => max.next().ok_or(StoreError::IdsExhausted(max))?,
            None => StoryId::FIRST,
        };

        let record = StoryRecord {
            id,
            ts: Local::now(),
            author_id,
            author_handle,
            text: text.into(),
        };

        let mut line = serde_json::to_string(&record)?;
        line.push('\n');
        self.write_line(&line).await?;

        tracing::info!(story_id = %id, author_id, "story saved");
        Ok(record)
    }

    /// Every stored story, oldest first.
    pub async fn list_all(&self) -> Result<Vec<StoryRecord>, StoreError> {
        Ok(self.read_log().await?.records)
    }

    /// The story with the given identifier, if any.
    pub async fn lookup(&self, id: StoryId) -> Result<Option<StoryRecord>, StoreError> {
        Ok(self
            .read_log()
            .await?
            .records
            .into_iter()
            .find(|record| record.id == id))
    }

    /// Number of stored stories.
    pub async fn len(&self) -> Result<usize, StoreError> {
        Ok(self.read_log().await?.records.len())
    }

    pub async fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len().await? == 0)
    }

    async fn read_log(&self) -> Result<Log, StoreError> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Log::default()),
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        Ok(parse_log(&content))
    }

    async fn write_line(&self, line: &str) -> Result<(), StoreError> {
        let io_err = |source: std::io::Error| StoreError::Io {
            path: self.path.clone(),
            source,
        };

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(io_err)?;

        // A crash mid-write can leave a fragment without its newline; start
        // on a fresh line so the new record is not glued onto it.
        let mut buf = String::with_capacity(line.len() + 1);
        if !ends_with_newline(&mut file).await.map_err(io_err)? {
            buf.push('\n');
        }
        buf.push_str(line);

        file.write_all(buf.as_bytes()).await.map_err(io_err)?;
        file.sync_data().await.map_err(io_err)?;
        Ok(())
    }
}

/// True for an empty file or one whose last byte is `\n`.
async fn ends_with_newline(file: &mut fs::File) -> std::io::Result<bool> {
    let len = file.metadata().await?.len();
    if len == 0 {
        return Ok(true);
    }
    file.seek(SeekFrom::End(-1)).await?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last).await?;
    Ok(last[0] == b'\n')
}

/// Parsed view of the log file.
#[derive(Debug, Default)]
struct Log {
    records: Vec<StoryRecord>,
    /// Highest identifier seen, including lines that failed to parse as a
    /// full record but still carried an id.
    max_id: Option<StoryId>,
}

fn parse_log(content: &str) -> Log {
    let mut log = Log::default();

    for (index, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match serde_json::from_str::<StoryRecord>(line) {
            Ok(record) => {
                log.max_id = log.max_id.max(Some(record.id));
                log.records.push(record);
            }
            Err(e) => {
                // Parse just enough to keep the id out of circulation.
                #[derive(Deserialize)]
                struct Partial {
                    id: StoryId,
                }

                let id = serde_json::from_str::<Partial>(line).ok().map(|p| p.id);
                if id.is_some() {
                    log.max_id = log.max_id.max(id);
                }
                tracing::warn!(line = index + 1, ?id, error = %e, "skipping unreadable story log line");
            }
        }
    }

    log
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn temp_store() -> (TempDir, RecordStore) {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let store = RecordStore::open(dir.path().join("stories.jsonl"))
            .await
            .expect("Open should succeed");
        (dir, store)
    }

    #[test]
    fn test_parse_log_skips_blank_and_broken_lines() {
        let content = concat!(
            r#"{"id":1,"ts":"2024-05-01T10:00:00+00:00","author_id":1,"author_handle":null,"text":"a"}"#,
            "\n\n",
            "garbage\n",
            r#"{"id":2,"ts":"2024-05-01T10:01:00+00:00","author_id":2,"author_handle":"b","text":"b"}"#,
            "\n",
        );

        let log = parse_log(content);
        assert_eq!(log.records.len(), 2);
        assert_eq!(log.max_id, Some(StoryId(2)));
    }

    #[test]
    fn test_parse_log_counts_id_of_unreadable_record() {
        let content = concat!(
            r#"{"id":1,"ts":"2024-05-01T10:00:00+00:00","author_id":1,"text":"a"}"#,
            "\n",
            r#"{"id":5,"ts":"not a time","author_id":1,"text":"b"}"#,
            "\n",
        );

        let log = parse_log(content);
        assert_eq!(log.records.len(), 1);
        assert_eq!(log.max_id, Some(StoryId(5)));
    }

    #[tokio::test]
    async fn test_empty_store() {
        let (_dir, store) = temp_store().await;

        assert!(store.list_all().await.unwrap().is_empty());
        assert!(store.lookup(StoryId(1)).await.unwrap().is_none());
        assert!(store.is_empty().await.unwrap());
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn test_append_assigns_sequential_ids() {
        let (_dir, store) = temp_store().await;

        let first = store.append(1, Some("alice".into()), "Hello").await.unwrap();
        let second = store.append(2, Some("bob".into()), "World").await.unwrap();

        assert_eq!(first.id, StoryId(1));
        assert_eq!(second.id, StoryId(2));
        assert_eq!(store.len().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_lookup_returns_appended_record() {
        let (_dir, store) = temp_store().await;

        let saved = store.append(9, None, "line one\n  line two").await.unwrap();
        let found = store.lookup(saved.id).await.unwrap().expect("record exists");

        assert_eq!(found, saved);
        assert_eq!(found.text, "line one\n  line two");
    }

    #[tokio::test]
    async fn test_non_ascii_text_is_written_verbatim() {
        let (_dir, store) = temp_store().await;

        store.append(1, None, "Привет 💌").await.unwrap();
        let raw = std::fs::read_to_string(store.path()).unwrap();

        assert!(raw.contains("Привет 💌"));
        assert!(raw.ends_with('\n'));
    }

    #[tokio::test]
    async fn test_append_after_torn_write() {
        let (_dir, store) = temp_store().await;
        store.append(1, None, "first").await.unwrap();

        // Simulate a crash halfway through writing record #2.
        {
            use std::io::Write;
            let mut file = std::fs::OpenOptions::new()
                .append(true)
                .open(store.path())
                .unwrap();
            file.write_all(br#"{"id":2,"ts":"2024"#).unwrap();
        }

        let next = store.append(1, None, "third").await.unwrap();
        let all = store.list_all().await.unwrap();

        assert_eq!(next.id, StoryId(2));
        assert_eq!(all.len(), 2);
        assert_eq!(all[1].text, "third");
    }

    #[tokio::test]
    async fn test_append_refuses_when_ids_run_out() {
        let (_dir, store) = temp_store().await;
        let last = format!(
            r#"{{"id":{},"ts":"2024-05-01T10:00:00+00:00","author_id":1,"text":"last"}}"#,
            u64::MAX
        );
        std::fs::write(store.path(), format!("{last}\n")).unwrap();

        let result = store.append(2, None, "one too many").await;

        assert!(matches!(result, Err(StoreError::IdsExhausted(StoryId(u64::MAX)))));
        assert_eq!(store.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_open_creates_parent_directory() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data").join("nested").join("stories.jsonl");

        let store = RecordStore::open(&path).await.unwrap();
        store.append(1, None, "x").await.unwrap();

        assert!(path.exists());
    }
}
