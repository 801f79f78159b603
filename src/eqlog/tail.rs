//! Polling reader for a growing log file.

use std::io::SeekFrom;
use std::path::{Path, PathBuf};

use tokio::fs::{self, File};
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tracing::{debug, warn};

/// Longest line kept while waiting for its newline.
pub const MAX_PARTIAL_LINE: usize = 64 * 1024;

/// Returns complete lines appended to a file since the last poll.
#[derive(Debug)]
pub struct LogTail {
    path: PathBuf,
    position: u64,
    partial: String,
    /// Inside an overlong line; drop text up to the next newline.
    discarding: bool,
}

impl LogTail {
    /// Start at the current end of the file; older lines are never read.
    pub async fn open(path: impl Into<PathBuf>) -> std::io::Result<Self> {
        let path = path.into();
        let position = fs::metadata(&path).await?.len();
        Ok(Self {
            path,
            position,
            partial: String::new(),
            discarding: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read whatever was appended. A file that shrank was rotated or
    /// truncated, so reading restarts from its beginning.
    pub async fn poll(&mut self) -> std::io::Result<Vec<String>> {
        let len = fs::metadata(&self.path).await?.len();
        if len < self.position {
            debug!(path = %self.path.display(), "Log file truncated, reading from start");
            self.position = 0;
            self.partial.clear();
            self.discarding = false;
        }
        if len == self.position {
            return Ok(Vec::new());
        }

        let mut file = File::open(&self.path).await?;
        file.seek(SeekFrom::Start(self.position)).await?;
        let mut buf = Vec::with_capacity((len - self.position) as usize);
        file.read_to_end(&mut buf).await?;
        self.position += buf.len() as u64;

        // The client writes Latin-1; anything outside ASCII is dropped later.
        self.partial.push_str(&String::from_utf8_lossy(&buf));

        if self.discarding {
            match self.partial.find('\n') {
                Some(end) => {
                    self.partial.drain(..=end);
                    self.discarding = false;
                }
                None => self.partial.clear(),
            }
        }

        let complete = match self.partial.rfind('\n') {
            Some(last_newline) => {
                let rest = self.partial.split_off(last_newline + 1);
                std::mem::replace(&mut self.partial, rest)
            }
            None => String::new(),
        };

        if self.partial.len() > MAX_PARTIAL_LINE {
            warn!(
                path = %self.path.display(),
                bytes = self.partial.len(),
                "Discarding overlong log line"
            );
            self.partial.clear();
            self.discarding = true;
        }

        Ok(complete
            .lines()
            .map(|line| line.trim_end_matches('\r').to_string())
            .filter(|line| !line.is_empty())
            .collect())
    }
}
