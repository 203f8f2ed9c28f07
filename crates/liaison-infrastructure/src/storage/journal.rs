//! Append-only JSON-lines journal of interaction events.

use liaison_core::interaction::InteractionEvent;
use liaison_core::{CoreError, Result};
use std::path::{Path, PathBuf};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// One event per line, flushed to disk before the append is acknowledged.
///
/// ```text
/// data_dir/
/// └── interactions.jsonl
/// ```
pub struct Journal {
    path: PathBuf,
    file: Mutex<JournalFile>,
}

struct JournalFile {
    file: File,
    /// Length of the fully written prefix.
    len: u64,
}

impl Journal {
    /// Opens (or creates) the journal and replays its content.
    ///
    /// A torn trailing line (crash mid-write) is truncated away; a corrupt
    /// line anywhere else is an error.
    pub async fn open(path: &Path) -> Result<(Self, Vec<InteractionEvent>)> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let (events, valid_len) = if fs::try_exists(path).await? {
            let content = fs::read_to_string(path).await?;
            replay(&content, path)?
        } else {
            (Vec::new(), 0)
        };

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;

        let on_disk = file.metadata().await?.len();
        let len = on_disk.min(valid_len);
        if on_disk > valid_len {
            tracing::warn!(
                path = %path.display(),
                dropped_bytes = on_disk - valid_len,
                "Truncating torn trailing journal line"
            );
            file.set_len(valid_len).await?;
        }

        tracing::debug!(path = %path.display(), events = events.len(), "Journal replayed");

        Ok((
            Self {
                path: path.to_path_buf(),
                file: Mutex::new(JournalFile { file, len }),
            },
            events,
        ))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Durably appends one event.
    ///
    /// A failed write is cut back off the file so the journal never keeps a
    /// partial line in the middle.
    ///
    /// # Errors
    ///
    /// `TransientStoreFailure` if the line could not be written and synced.
    pub async fn append(&self, event: &InteractionEvent) -> Result<()> {
        let mut line = serde_json::to_string(event)?;
        line.push('\n');

        let mut journal = self.file.lock().await;
        let written = async {
            journal.file.write_all(line.as_bytes()).await?;
            journal.file.sync_data().await
        }
        .await;

        match written {
            Ok(()) => {
                journal.len += line.len() as u64;
                Ok(())
            }
            Err(e) => {
                let len = journal.len;
                if let Err(truncate_err) = journal.file.set_len(len).await {
                    tracing::warn!(path = %self.path.display(), error = %truncate_err, "Failed to cut back partial journal write");
                }
                Err(CoreError::transient(format!("journal write failed: {}", e)))
            }
        }
    }
}

/// Parses journal content; returns the events and the byte length of the valid prefix.
fn replay(content: &str, path: &Path) -> Result<(Vec<InteractionEvent>, u64)> {
    let mut events = Vec::new();
    let mut valid_len = 0u64;
    let mut offset = 0u64;

    for raw in content.split_inclusive('\n') {
        offset += raw.len() as u64;
        // Only the last segment can lack a newline: the write never finished.
        if !raw.ends_with('\n') {
            break;
        }
        let line = raw.trim_end();
        if !line.is_empty() {
            let event = serde_json::from_str::<InteractionEvent>(line).map_err(|e| {
                CoreError::Serialization {
                    format: "JSONL".to_string(),
                    message: format!("{}: corrupt journal line: {}", path.display(), e),
                }
            })?;
            events.push(event);
        }
        valid_len = offset;
    }

    Ok((events, valid_len))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use liaison_core::UserId;
    use liaison_core::interaction::{InteractionKind, InteractionStatus, NewInteraction};
    use tempfile::TempDir;

    fn event(seq: u64) -> InteractionEvent {
        InteractionEvent::from_new(
            NewInteraction::new(
                UserId::from("a"),
                UserId::from("b"),
                InteractionKind::Visit,
                InteractionStatus::Completed,
            ),
            seq,
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_append_and_replay() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("interactions.jsonl");

        let (journal, replayed) = Journal::open(&path).await.unwrap();
        assert!(replayed.is_empty());
        let first = event(1);
        let second = event(2);
        journal.append(&first).await.unwrap();
        journal.append(&second).await.unwrap();
        drop(journal);

        let (_journal, replayed) = Journal::open(&path).await.unwrap();
        assert_eq!(replayed, vec![first, second]);
    }

    #[tokio::test]
    async fn test_torn_trailing_line_is_truncated() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("interactions.jsonl");
        let good = event(1);
        let mut content = serde_json::to_string(&good).unwrap();
        content.push('\n');
        content.push_str("{\"id\":\"trunc");
        std::fs::write(&path, &content).unwrap();

        let (journal, replayed) = Journal::open(&path).await.unwrap();
        assert_eq!(replayed, vec![good.clone()]);

        let next = event(2);
        journal.append(&next).await.unwrap();
        drop(journal);

        let (_journal, replayed) = Journal::open(&path).await.unwrap();
        assert_eq!(replayed, vec![good, next]);
    }

    #[tokio::test]
    async fn test_corrupt_middle_line_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("interactions.jsonl");
        let mut content = String::from("not json\n");
        content.push_str(&serde_json::to_string(&event(1)).unwrap());
        content.push('\n');
        std::fs::write(&path, &content).unwrap();

        let err = Journal::open(&path).await.err().unwrap();
        assert!(matches!(err, CoreError::Serialization { .. }));
    }
}
