use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::metrics::Snapshot;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("failed to write snapshot to {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Append-only destination for snapshots
pub trait SnapshotSink: Send {
    fn append(&mut self, snapshot: &Snapshot) -> Result<(), SinkError>;
}

/// Appends one line per snapshot to a text file
#[derive(Debug)]
pub struct FileSink {
    path: PathBuf,
    file: File,
}

impl FileSink {
    /// Opens (or creates) `path` in append mode
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SinkError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| SinkError::Io {
                path: path.clone(),
                source,
            })?;

        info!("Snapshot log opened at {}", path.display());
        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SnapshotSink for FileSink {
    fn append(&mut self, snapshot: &Snapshot) -> Result<(), SinkError> {
        let mut line = snapshot.to_line();
        line.push('\n');

        // A single write per line keeps a failed append from leaving half a record
        self.file
            .write_all(line.as_bytes())
            .and_then(|_| self.file.flush())
            .map_err(|source| SinkError::Io {
                path: self.path.clone(),
                source,
            })?;

        debug!("Appended snapshot with {} entries", snapshot.round().len());
        Ok(())
    }
}

/// Snapshots decoded from a log file
#[derive(Debug, Default)]
pub struct SnapshotLog {
    pub snapshots: Vec<Snapshot>,
    pub skipped_lines: usize,
}

/// Read every parseable snapshot from `path`; blank lines are ignored, and
/// malformed or non-UTF-8 ones are counted in `skipped_lines`
pub fn read_snapshots(path: impl AsRef<Path>) -> io::Result<SnapshotLog> {
    let reader = BufReader::new(File::open(path.as_ref())?);
    let mut log = SnapshotLog::default();

    for (number, raw) in reader.split(b'\n').enumerate() {
        let raw = raw?;
        let line = match String::from_utf8(raw) {
            Ok(line) => line,
            Err(e) => {
                warn!("Skipping line {}: {}", number + 1, e);
                log.skipped_lines += 1;
                continue;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        match Snapshot::parse_line(&line) {
            Ok(snapshot) => log.snapshots.push(snapshot),
            Err(e) => {
                warn!("Skipping line {}: {}", number + 1, e);
                log.skipped_lines += 1;
            }
        }
    }

    Ok(log)
}
