//! Size-bounded shard files
//!
//! A [`ShardBuffer`] collects records of one kind in memory and writes them
//! out as a pretty-printed JSON array once their estimated serialized size
//! crosses the configured threshold. Shard boundaries carry no meaning: the
//! union of all shards of a kind is one logical collection.

use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Approximate size of one pretty-printed interaction-like record (bytes)
pub const INTERACTION_RECORD_SIZE: u64 = 273;

/// Approximate size of one pretty-printed post record (bytes)
pub const POST_RECORD_SIZE: u64 = 1010;

/// Errors that can occur while writing shard files
#[derive(Debug, Error)]
pub enum ShardError {
    #[error("Data directory {0} cannot be created, a file with the same name exists")]
    NotADirectory(PathBuf),

    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Result type for shard operations
pub type ShardResult<T> = Result<T, ShardError>;

/// Kind of record a shard holds; decides file prefix and size estimate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Post,
    Interaction,
    User,
    /// Author page info, written once as a single object
    PageInfo,
    /// Links collected by the polling mode
    Link,
}

impl RecordKind {
    /// File name prefix, `<prefix>data_<n>.json`
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Post => "post_",
            Self::Interaction => "interaction_",
            Self::User => "user_",
            Self::PageInfo => "user_page_info_",
            Self::Link => "",
        }
    }

    /// Estimated serialized size of one record of this kind
    pub fn record_size(&self) -> u64 {
        match self {
            Self::Post => POST_RECORD_SIZE,
            Self::Interaction | Self::User | Self::PageInfo | Self::Link => {
                INTERACTION_RECORD_SIZE
            }
        }
    }
}

/// Returns the first `<prefix>data_<n>.json` not present in `dir`
pub fn next_shard_path(dir: &Path, prefix: &str) -> PathBuf {
    let mut counter: u64 = 0;
    loop {
        let candidate = dir.join(shard_file_name(prefix, counter));
        if !candidate.exists() {
            return candidate;
        }
        counter += 1;
    }
}

fn shard_file_name(prefix: &str, counter: u64) -> String {
    format!("{}data_{}.json", prefix, counter)
}

/// Creates `dir` (and its parents) unless it already exists as a directory
pub fn ensure_data_dir(dir: &Path) -> ShardResult<()> {
    if dir.is_dir() {
        return Ok(());
    }
    if dir.exists() {
        return Err(ShardError::NotADirectory(dir.to_path_buf()));
    }
    std::fs::create_dir_all(dir).map_err(|source| ShardError::Io {
        path: dir.to_path_buf(),
        source,
    })
}

/// Writes `value` as indented JSON to a new shard file in `dir`
///
/// The file is created exclusively, so an existing shard is never
/// overwritten, and it is synced to disk before returning.
pub fn write_shard<T: Serialize + ?Sized>(
    dir: &Path,
    prefix: &str,
    value: &T,
) -> ShardResult<PathBuf> {
    ensure_data_dir(dir)?;

    let (path, file) = create_next_shard(dir, prefix)?;
    let io_err = |source| ShardError::Io {
        path: path.clone(),
        source,
    };

    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.flush().map_err(io_err)?;
    writer.get_ref().sync_all().map_err(io_err)?;

    Ok(path)
}

fn create_next_shard(dir: &Path, prefix: &str) -> ShardResult<(PathBuf, File)> {
    let mut path = next_shard_path(dir, prefix);
    loop {
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => return Ok((path, file)),
            // Lost a race against another writer, take the next free name
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                path = next_shard_path(dir, prefix);
            }
            Err(source) => return Err(ShardError::Io { path, source }),
        }
    }
}

/// In-memory batch of records of one kind, flushed to numbered shard files
///
/// Records leave memory at the flush that writes them. Whatever is still
/// pending when the buffer is dropped is flushed as well, so no exit path
/// loses accumulated records.
#[derive(Debug)]
pub struct ShardBuffer<T: Serialize> {
    kind: RecordKind,
    dir: PathBuf,
    threshold: u64,
    pending: Vec<T>,
    written: Vec<PathBuf>,
}

impl<T: Serialize> ShardBuffer<T> {
    /// Creates an empty buffer writing to `dir`
    ///
    /// # Arguments
    ///
    /// * `kind` - Record kind, decides prefix and per-record size estimate
    /// * `dir` - Destination directory, created on first flush
    /// * `threshold` - Estimated byte size above which the buffer flushes
    pub fn new(kind: RecordKind, dir: impl Into<PathBuf>, threshold: u64) -> Self {
        Self {
            kind,
            dir: dir.into(),
            threshold,
            pending: Vec::new(),
            written: Vec::new(),
        }
    }

    /// Appends a record, flushing when the size estimate exceeds the threshold
    ///
    /// # Returns
    ///
    /// * `Ok(Some(path))` - The append triggered a flush into `path`
    /// * `Ok(None)` - The record is pending
    pub fn append(&mut self, record: T) -> ShardResult<Option<PathBuf>> {
        self.pending.push(record);

        if self.estimated_size() > self.threshold {
            return self.flush();
        }
        Ok(None)
    }

    /// Writes every pending record to a new shard, even below the threshold
    ///
    /// Does nothing when no record is pending.
    pub fn flush(&mut self) -> ShardResult<Option<PathBuf>> {
        if self.pending.is_empty() {
            return Ok(None);
        }

        let path = write_shard(&self.dir, self.kind.prefix(), &self.pending)?;
        tracing::debug!(
            "Flushed {} {:?} records to {}",
            self.pending.len(),
            self.kind,
            path.display()
        );

        self.pending.clear();
        self.written.push(path.clone());
        Ok(Some(path))
    }

    /// Estimated serialized size of the pending records
    pub fn estimated_size(&self) -> u64 {
        self.pending.len() as u64 * self.kind.record_size()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn kind(&self) -> RecordKind {
        self.kind
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Shard files written by this buffer, in write order
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }
}

impl<T: Serialize> Drop for ShardBuffer<T> {
    fn drop(&mut self) {
        if self.pending.is_empty() {
            return;
        }

        let count = self.pending.len();
        match self.flush() {
            Ok(Some(path)) => tracing::info!(
                "Flushed {} pending {:?} records on shutdown to {}",
                count,
                self.kind,
                path.display()
            ),
            Ok(None) => {}
            Err(e) => tracing::error!(
                "Lost {} pending {:?} records on shutdown: {}",
                count,
                self.kind,
                e
            ),
        }
    }
}
