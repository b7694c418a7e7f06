//! Action Logger - persists bus traffic to JSONL files
//!
//! The logger is an ordinary bus subscriber: one JSON object per line, every
//! action the session ever dispatched, in dispatch order. Useful for
//! debugging a misbehaving tile graph after the fact.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, error};
use uuid::Uuid;

use super::bus::{ActionHandler, Effects};
use super::types::{Action, ActionLogEntry};

/// Bus subscriber that appends each action to `actions-{session-id}.jsonl`
pub struct ActionLogger {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl ActionLogger {
    /// Create the log file under `dir`, named after the session id
    pub fn create(dir: impl AsRef<Path>, session_id: Uuid) -> eyre::Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let path = dir.join(format!("actions-{session_id}.jsonl"));
        debug!(path = %path.display(), "ActionLogger::create");
        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        Ok(Self {
            path,
            writer: BufWriter::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&mut self, action: &Action) -> eyre::Result<()> {
        let entry = ActionLogEntry::new(action.clone());
        let json = serde_json::to_string(&entry)?;
        writeln!(self.writer, "{}", json)?;
        self.writer.flush()?;
        Ok(())
    }
}

impl ActionHandler for ActionLogger {
    fn handle(&mut self, action: &Action, _effects: &mut Effects) {
        // A broken log must never take the dashboard down with it
        if let Err(e) = self.write(action) {
            error!(error = %e, name = action.name(), "ActionLogger: failed to write action");
        }
    }
}

impl Drop for ActionLogger {
    fn drop(&mut self) {
        let _ = self.writer.flush();
    }
}

/// Read a session's action log back as entries
pub fn read_action_log(path: impl AsRef<Path>) -> eyre::Result<Vec<ActionLogEntry>> {
    let content = fs::read_to_string(path)?;
    let mut entries = Vec::new();
    for line in content.lines() {
        if line.trim().is_empty() {
            continue;
        }
        entries.push(serde_json::from_str(line)?);
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logger_writes_jsonl() {
        let dir = tempfile::tempdir().unwrap();
        let session_id = Uuid::now_v7();
        let mut logger = ActionLogger::create(dir.path(), session_id).unwrap();
        let path = logger.path().to_path_buf();

        let mut effects = Effects::default();
        logger.handle(
            &Action::QuerySubmitted {
                query: "dog".to_string(),
            },
            &mut effects,
        );
        logger.handle(
            &Action::TileDataFailed {
                tile_id: "freqDist".to_string(),
                error: "Internal error: timeout".to_string(),
            },
            &mut effects,
        );
        drop(logger);

        let entries = read_action_log(&path).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].action.name(), "QuerySubmitted");
        assert_eq!(entries[1].action.tile_id(), Some("freqDist"));
    }

    #[test]
    fn test_read_skips_blank_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("actions.jsonl");
        let entry = ActionLogEntry::new(Action::QuerySubmitted {
            query: "dog".to_string(),
        });
        let json = serde_json::to_string(&entry).unwrap();
        fs::write(&path, format!("{json}\n\n{json}\n")).unwrap();

        let entries = read_action_log(&path).unwrap();
        assert_eq!(entries.len(), 2);
    }
}
