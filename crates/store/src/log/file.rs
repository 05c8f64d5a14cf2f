//! JSON Lines append log
//!
//! Each entry is one line: `{"position":N,"event":{...}}`. The file is opened
//! in append mode and every write happens under a single async mutex, so file
//! order equals position order.
//!
//! Reads take the mutex only long enough to copy the committed length, then
//! stream the file on a separate handle, so a long read never stalls appends.
//!
//! # Recovery
//!
//! On open the file is scanned to recover the last position. A final line
//! that does not parse (the process died mid-write) is cut off with a
//! warning. An unreadable line anywhere else is reported as corruption.

use std::ops::ControlFlow;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use pulse_protocol::Event;
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::{AppendLog, LogEntry, within_time};
use crate::error::{Result, StoreError};

/// Append log backed by a JSON Lines file
#[derive(Debug)]
pub struct FileLog {
    path: PathBuf,
    fsync: bool,
    state: Mutex<WriterState>,
}

#[derive(Debug)]
struct WriterState {
    file: File,
    /// Byte length of the committed prefix
    len: u64,
    last_position: u64,
}

impl FileLog {
    /// Open (or create) the log at `path`
    pub async fn open(path: impl AsRef<Path>, fsync: bool) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::io(parent, e))?;
        }

        let recovered = match fs::read(&path).await {
            Ok(bytes) => recover(&path, &bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Recovered::default(),
            Err(e) => return Err(StoreError::io(&path, e)),
        };

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| StoreError::io(&path, e))?;

        if let Some(torn_at) = recovered.torn_at {
            warn!(
                path = %path.display(),
                offset = torn_at,
                "discarding incomplete final log line"
            );
            file.set_len(recovered.len)
                .await
                .map_err(|e| StoreError::io(&path, e))?;
        }

        info!(
            path = %path.display(),
            last_position = recovered.last_position,
            "opened file log"
        );

        Ok(Self {
            path,
            fsync,
            state: Mutex::new(WriterState {
                file,
                len: recovered.len,
                last_position: recovered.last_position,
            }),
        })
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Byte length and last position of the committed prefix
    async fn committed(&self) -> (u64, u64) {
        let state = self.state.lock().await;
        (state.len, state.last_position)
    }

    /// Walk the first `len` bytes of the log in order until `visit` breaks
    ///
    /// Runs without the writer lock on its own read handle. Bytes past `len`
    /// belong to appends that committed after the caller's snapshot.
    async fn scan<F>(&self, len: u64, mut visit: F) -> Result<()>
    where
        F: FnMut(LogEntry) -> ControlFlow<()> + Send,
    {
        if len == 0 {
            return Ok(());
        }

        let file = File::open(&self.path)
            .await
            .map_err(|e| StoreError::io(&self.path, e))?;
        let mut lines = BufReader::new(file).take(len).lines();
        let mut line_no = 0usize;

        while let Some(line) = lines
            .next_line()
            .await
            .map_err(|e| StoreError::io(&self.path, e))?
        {
            line_no += 1;
            if line.is_empty() {
                continue;
            }
            let entry: LogEntry =
                serde_json::from_str(&line).map_err(|e| StoreError::Corrupt {
                    path: self.path.clone(),
                    line: line_no,
                    message: e.to_string(),
                })?;
            if visit(entry).is_break() {
                break;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl AppendLog for FileLog {
    async fn append(&self, event: &Event) -> Result<u64> {
        let mut state = self.state.lock().await;
        let position = state.last_position + 1;

        let mut line = serde_json::to_vec(&LogEntry {
            position,
            event: event.clone(),
        })?;
        line.push(b'\n');

        if let Err(e) = write_line(&mut state.file, &line, self.fsync).await {
            // Drop any partial write so the next line starts clean
            let committed = state.len;
            if let Err(truncate_err) = state.file.set_len(committed).await {
                warn!(
                    path = %self.path.display(),
                    error = %truncate_err,
                    "failed to truncate after write error"
                );
            }
            return Err(StoreError::io(&self.path, e));
        }

        state.len += line.len() as u64;
        state.last_position = position;
        debug!(position, "appended log entry");
        Ok(position)
    }

    async fn range(&self, from: u64, to: u64) -> Result<Vec<LogEntry>> {
        let (len, last_position) = self.committed().await;
        let mut entries = Vec::new();
        if from > to || from > last_position {
            return Ok(entries);
        }

        self.scan(len, |entry| {
            if entry.position > to {
                return ControlFlow::Break(());
            }
            if entry.position >= from {
                entries.push(entry);
            }
            ControlFlow::Continue(())
        })
        .await?;
        Ok(entries)
    }

    async fn range_by_time(&self, from_ms: i64, to_ms: i64) -> Result<Vec<LogEntry>> {
        self.range_by_time_limited(from_ms, to_ms, usize::MAX).await
    }

    async fn range_by_time_limited(
        &self,
        from_ms: i64,
        to_ms: i64,
        limit: usize,
    ) -> Result<Vec<LogEntry>> {
        let (len, _) = self.committed().await;
        let mut entries = Vec::new();
        if limit == 0 {
            return Ok(entries);
        }

        self.scan(len, |entry| {
            if within_time(&entry, from_ms, to_ms) {
                entries.push(entry);
                if entries.len() >= limit {
                    return ControlFlow::Break(());
                }
            }
            ControlFlow::Continue(())
        })
        .await?;
        Ok(entries)
    }

    async fn last_position(&self) -> Result<u64> {
        Ok(self.state.lock().await.last_position)
    }
}

async fn write_line(file: &mut File, line: &[u8], fsync: bool) -> std::io::Result<()> {
    file.write_all(line).await?;
    file.flush().await?;
    if fsync {
        file.sync_data().await?;
    }
    Ok(())
}

#[derive(Debug, Default)]
struct Recovered {
    len: u64,
    last_position: u64,
    torn_at: Option<u64>,
}

/// Scan existing file contents for the committed prefix
fn recover(path: &Path, bytes: &[u8]) -> Result<Recovered> {
    let mut recovered = Recovered::default();
    let mut offset = 0usize;
    let mut line_no = 0usize;

    while offset < bytes.len() {
        line_no += 1;
        let rest = &bytes[offset..];
        let (line, consumed, terminated) = match rest.iter().position(|b| *b == b'\n') {
            Some(i) => (&rest[..i], i + 1, true),
            None => (rest, rest.len(), false),
        };

        if line.is_empty() {
            offset += consumed;
            recovered.len = offset as u64;
            continue;
        }

        match serde_json::from_slice::<LogEntry>(line) {
            Ok(entry) if terminated => {
                recovered.last_position = recovered.last_position.max(entry.position);
                offset += consumed;
                recovered.len = offset as u64;
            }
            // Parsed but never got its newline: treat as torn
            Ok(_) => {
                recovered.torn_at = Some(offset as u64);
                break;
            }
            Err(_) if offset + consumed >= bytes.len() => {
                recovered.torn_at = Some(offset as u64);
                break;
            }
            Err(e) => {
                return Err(StoreError::Corrupt {
                    path: path.to_path_buf(),
                    line: line_no,
                    message: e.to_string(),
                });
            }
        }
    }

    Ok(recovered)
}

#[cfg(test)]
#[path = "file_test.rs"]
mod tests;
