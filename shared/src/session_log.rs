//! Session log records and stores.
//!
//! Every interaction is an immutable [`InteractionEvent`] appended to the host's
//! [`SessionLog`]. A store's `append` returning `Ok` means the event reached stable storage.

use crate::{
    error::LogStoreError,
    types::{ActorId, BlockId, InteractionKind, Vec3Data},
};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
    time::Duration,
};
use tempfile::NamedTempFile;

/// A point in the session: wall clock plus time since the session started.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SessionInstant {
    /// Microseconds since the Unix epoch.
    pub wall_clock_micros: i64,
    /// Time since session start.
    pub session_time: Duration,
}

/// One grab or release, with the score at the time it was recorded.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InteractionEvent {
    /// Wall clock, microseconds since the Unix epoch.
    pub timestamp_micros: i64,
    /// Seconds since session start.
    pub game_time: f32,
    pub player_id: ActorId,
    pub block_id: BlockId,
    pub block_name: String,
    pub action: InteractionKind,
    pub position: Vec3Data,
    pub score: u32,
}

/// Everything needed to reconstruct a session afterward.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionLog {
    /// Wall clock at session start, microseconds since the Unix epoch.
    pub session_start_micros: i64,
    pub events: Vec<InteractionEvent>,
}

impl SessionLog {
    pub fn new(session_start_micros: i64) -> Self {
        Self {
            session_start_micros,
            events: Vec::new(),
        }
    }

    /// Load a log previously written by [`JsonFileLogStore`].
    pub fn read_from(path: impl AsRef<Path>) -> Result<Self, LogStoreError> {
        let json = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}

/// Append-only sink for interaction events.
pub trait SessionLogStore {
    /// Append `event` and flush it to stable storage before returning.
    fn append(&mut self, event: InteractionEvent) -> Result<(), LogStoreError>;
}

/// Keeps the log in memory. Used by tests and hosts without a filesystem.
#[derive(Clone, Debug, Default)]
pub struct MemoryLogStore {
    pub log: SessionLog,
}

impl MemoryLogStore {
    pub fn new(session_start_micros: i64) -> Self {
        Self {
            log: SessionLog::new(session_start_micros),
        }
    }

    pub fn events(&self) -> &[InteractionEvent] {
        &self.log.events
    }
}

impl SessionLogStore for MemoryLogStore {
    fn append(&mut self, event: InteractionEvent) -> Result<(), LogStoreError> {
        self.log.events.push(event);
        Ok(())
    }
}

/// Rewrites the whole session as pretty JSON on every append.
///
/// Each rewrite goes to a synced sibling temp file that is then renamed over the log, so the
/// file on disk always holds the last complete document. A failed append leaves both the file
/// and the in-memory log as they were.
#[derive(Debug)]
pub struct JsonFileLogStore {
    path: PathBuf,
    log: SessionLog,
}

impl JsonFileLogStore {
    /// Create `session_<start-micros>.json` in `dir` (creating `dir` if needed) and write the
    /// empty session header.
    pub fn create(dir: impl AsRef<Path>, session_start_micros: i64) -> Result<Self, LogStoreError> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let store = Self {
            path: dir.join(format!("session_{session_start_micros}.json")),
            log: SessionLog::new(session_start_micros),
        };
        store.write()?;
        log::info!("[Logger] Logging to: {}", store.path.display());
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn log(&self) -> &SessionLog {
        &self.log
    }

    fn write(&self) -> Result<(), LogStoreError> {
        let dir = self.path.parent().unwrap_or(Path::new("."));
        let mut file = NamedTempFile::new_in(dir)?;
        {
            let mut writer = BufWriter::new(&mut file);
            serde_json::to_writer_pretty(&mut writer, &self.log)?;
            writer.flush()?;
        }
        file.as_file().sync_all()?;
        file.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}

impl SessionLogStore for JsonFileLogStore {
    fn append(&mut self, event: InteractionEvent) -> Result<(), LogStoreError> {
        self.log.events.push(event);
        if let Err(e) = self.write() {
            self.log.events.pop();
            return Err(e);
        }
        Ok(())
    }
}
