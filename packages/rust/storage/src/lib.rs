//! Keyword store: the durable queue behind the generation pipeline.
//!
//! The [`KeywordStore`] keeps every [`KeywordRecord`] in one CSV table.
//!
//! **Access rules:**
//! - Reads are lock-free: writes replace the file atomically (temp + rename),
//!   so a reader always sees a complete table.
//! - Every mutation is a full read-modify-write cycle under a [`StoreLock`].
//! - Status transitions go through [`KeywordStore::compare_and_swap_status`],
//!   so two runs racing for the same keyword fail fast instead of both
//!   processing it.

mod lock;
pub mod table;

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use seopress_shared::{KeywordRecord, KeywordStatus, Result, SeoPressError};
use tracing::{debug, info, instrument, warn};

pub use lock::StoreLock;
pub use table::{COLUMNS, parse_table, render_table};

/// Default time to wait for another writer to release the table.
const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// Pick the next keyword to generate: queued records only, stable-sorted by
/// priority (`high` first). Ties keep their table order.
pub fn select_next(records: &[KeywordRecord]) -> Option<&KeywordRecord> {
    let mut queued: Vec<&KeywordRecord> = records
        .iter()
        .filter(|r| r.status == KeywordStatus::Queued)
        .collect();
    queued.sort_by_key(|r| r.priority);
    queued.into_iter().next()
}

/// CSV-backed keyword table.
#[derive(Debug, Clone)]
pub struct KeywordStore {
    path: PathBuf,
    lock_timeout: Duration,
}

impl KeywordStore {
    /// Open a store at `path`. The file is created on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }

    /// Override how long writers wait for the lock.
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    // -----------------------------------------------------------------------
    // Whole-table operations
    // -----------------------------------------------------------------------

    /// Read every record. A missing table is an empty queue.
    pub fn read_all(&self) -> Result<Vec<KeywordRecord>> {
        match std::fs::read_to_string(&self.path) {
            Ok(text) => table::parse_table(&text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "keyword table not found, treating as empty");
                Ok(Vec::new())
            }
            Err(e) => Err(SeoPressError::io(&self.path, e)),
        }
    }

    /// Replace the whole table atomically.
    pub fn write_all(&self, records: &[KeywordRecord]) -> Result<()> {
        let _lock = StoreLock::acquire(&self.path, self.lock_timeout)?;
        self.write_table(records)
    }

    /// Locked read-modify-write. The table is only written when `f` succeeds.
    pub fn update<T>(&self, f: impl FnOnce(&mut Vec<KeywordRecord>) -> Result<T>) -> Result<T> {
        let _lock = StoreLock::acquire(&self.path, self.lock_timeout)?;
        let mut records = self.read_all()?;
        let out = f(&mut records)?;
        self.write_table(&records)?;
        Ok(out)
    }

    // -----------------------------------------------------------------------
    // Record operations
    // -----------------------------------------------------------------------

    pub fn find_by_keyword(&self, keyword: &str) -> Result<Option<KeywordRecord>> {
        let keyword = keyword.trim();
        Ok(self.read_all()?.into_iter().find(|r| r.keyword == keyword))
    }

    /// Move `keyword` from `expected` to `new`, applying `mutate` to the
    /// record in the same write. Fails with [`SeoPressError::Conflict`] when
    /// the stored status is not `expected`.
    #[instrument(skip(self, mutate), fields(table = %self.path.display()))]
    pub fn compare_and_swap_status(
        &self,
        keyword: &str,
        expected: KeywordStatus,
        new: KeywordStatus,
        mutate: impl FnOnce(&mut KeywordRecord),
    ) -> Result<KeywordRecord> {
        self.update(|records| {
            let record = records
                .iter_mut()
                .find(|r| r.keyword == keyword)
                .ok_or_else(|| SeoPressError::Conflict(format!("'{keyword}' no longer exists")))?;

            if record.status != expected {
                return Err(SeoPressError::Conflict(format!(
                    "'{keyword}' is {} (expected {expected})",
                    record.status
                )));
            }

            record.status = new;
            mutate(record);
            debug!(%keyword, from = %expected, to = %new, "status transition");
            Ok(record.clone())
        })
    }

    /// Append a record. Keywords must stay unique.
    pub fn insert(&self, record: KeywordRecord) -> Result<()> {
        if record.keyword.trim().is_empty() {
            return Err(SeoPressError::validation("keyword must not be empty"));
        }
        self.update(|records| {
            if records.iter().any(|r| r.keyword == record.keyword) {
                return Err(SeoPressError::validation(format!(
                    "keyword '{}' already exists",
                    record.keyword
                )));
            }
            info!(keyword = %record.keyword, "keyword added");
            records.push(record);
            Ok(())
        })
    }

    /// Remove a record. Returns `false` when it did not exist.
    pub fn delete(&self, keyword: &str) -> Result<bool> {
        let keyword = keyword.trim();
        self.update(|records| {
            let before = records.len();
            records.retain(|r| r.keyword != keyword);
            let removed = records.len() != before;
            if removed {
                info!(%keyword, "keyword removed");
            }
            Ok(removed)
        })
    }

    /// Put a record back in the queue regardless of its current status.
    pub fn requeue(&self, keyword: &str) -> Result<KeywordRecord> {
        let keyword = keyword.trim();
        self.update(|records| {
            let record = records
                .iter_mut()
                .find(|r| r.keyword == keyword)
                .ok_or_else(|| SeoPressError::validation(format!("unknown keyword '{keyword}'")))?;
            record.status = KeywordStatus::Queued;
            info!(%keyword, "keyword requeued");
            Ok(record.clone())
        })
    }

    /// Mark records stuck in `generating` for longer than `max_age` as
    /// `failed`. A `generating` record without a timestamp is always stale.
    /// Returns the affected keywords; the table is untouched when none are.
    pub fn reconcile_stale(
        &self,
        max_age: chrono::Duration,
        now: DateTime<Utc>,
    ) -> Result<Vec<String>> {
        let is_stale = |r: &KeywordRecord| {
            r.status == KeywordStatus::Generating
                && r.last_generated.is_none_or(|started| now - started > max_age)
        };

        if !self.read_all()?.iter().any(is_stale) {
            return Ok(Vec::new());
        }

        self.update(|records| {
            let mut reconciled = Vec::new();
            for record in records.iter_mut().filter(|r| is_stale(&**r)) {
                warn!(keyword = %record.keyword, started = ?record.last_generated, "marking stale generation as failed");
                record.status = KeywordStatus::Failed;
                reconciled.push(record.keyword.clone());
            }
            Ok(reconciled)
        })
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    /// Write to a temp file next to the table, then rename over it.
    fn write_table(&self, records: &[KeywordRecord]) -> Result<()> {
        for (i, r) in records.iter().enumerate() {
            if records[..i].iter().any(|earlier| earlier.keyword == r.keyword) {
                return Err(SeoPressError::validation(format!(
                    "duplicate keyword '{}' in table",
                    r.keyword
                )));
            }
        }

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| SeoPressError::io(parent, e))?;
        }

        let file_name = self
            .path
            .file_name()
            .ok_or_else(|| SeoPressError::Storage(format!("{} has no file name", self.path.display())))?
            .to_string_lossy();
        let temp = self.path.with_file_name(format!(".{file_name}.tmp"));

        std::fs::write(&temp, table::render_table(records)).map_err(|e| SeoPressError::io(&temp, e))?;
        std::fs::rename(&temp, &self.path).map_err(|e| SeoPressError::io(&self.path, e))?;

        debug!(path = %self.path.display(), rows = records.len(), "keyword table written");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
