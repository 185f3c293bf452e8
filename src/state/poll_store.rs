//! Poll cursor persistence
//!
//! Keeps the session provider's offer polling state on disk so a restart
//! resumes polling where the last run stopped instead of resyncing from
//! scratch. Nothing here ever fails the caller: a missing or broken file just
//! means a cold start.

use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, error, warn};

use crate::types::PollCursor;

pub struct PollStore {
    path: PathBuf,
}

impl PollStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the cursor saved by a previous run, if any
    pub async fn load(&self) -> Option<PollCursor> {
        let data = match fs::read(&self.path).await {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!(
                    "No poll data at {:?}. If this is the first run, this is expected",
                    self.path
                );
                return None;
            }
            Err(e) => {
                warn!("Error reading poll data from {:?}: {}", self.path, e);
                return None;
            }
        };

        match serde_json::from_slice::<PollCursor>(&data) {
            Ok(cursor) => {
                debug!("Found previous trade offer poll data, resuming from it");
                Some(cursor)
            }
            Err(e) => {
                warn!("Ignoring corrupt poll data in {:?}: {}", self.path, e);
                None
            }
        }
    }

    /// Persist the cursor, replacing the previous one.
    ///
    /// Writes a sibling temp file and renames it into place, so a crash mid
    /// write leaves the old cursor intact. Errors are logged and swallowed.
    pub async fn save(&self, cursor: &PollCursor) {
        if let Err(e) = self.write_atomic(cursor).await {
            error!("Failed to save poll data to {:?}: {}", self.path, e);
        }
    }

    async fn write_atomic(&self, cursor: &PollCursor) -> io::Result<()> {
        let json = serde_json::to_vec(cursor)?;
        let tmp = self.tmp_path();
        fs::write(&tmp, json).await?;
        fs::rename(&tmp, &self.path).await?;
        debug!("Saved poll data at {}", chrono::Utc::now().to_rfc3339());
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "polldata.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}
