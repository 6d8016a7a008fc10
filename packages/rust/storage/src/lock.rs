//! Advisory lock file guarding read-modify-write cycles on the table.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};

use seopress_shared::{Result, SeoPressError};
use tracing::{debug, warn};

/// A lock file older than this is assumed to belong to a crashed writer.
const STALE_LOCK_AGE: Duration = Duration::from_secs(60);

/// Delay between acquisition attempts.
const RETRY_INTERVAL: Duration = Duration::from_millis(50);

/// Held while a writer owns the table. Removes the lock file on drop.
#[derive(Debug)]
pub struct StoreLock {
    path: PathBuf,
}

impl StoreLock {
    /// Lock path for a table: `keywords.csv` → `keywords.csv.lock`.
    pub fn path_for(table: &Path) -> PathBuf {
        let mut name = table.file_name().unwrap_or_default().to_os_string();
        name.push(".lock");
        table.with_file_name(name)
    }

    /// Create the lock file, waiting up to `timeout` for another holder.
    pub fn acquire(table: &Path, timeout: Duration) -> Result<Self> {
        let path = Self::path_for(table);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| SeoPressError::io(parent, e))?;
        }

        let deadline = Instant::now() + timeout;
        loop {
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut file) => {
                    let _ = writeln!(file, "{}", std::process::id());
                    debug!(path = %path.display(), "acquired store lock");
                    return Ok(Self { path });
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    if is_stale(&path) {
                        warn!(path = %path.display(), "breaking abandoned store lock");
                        let _ = std::fs::remove_file(&path);
                        continue;
                    }
                    if Instant::now() >= deadline {
                        return Err(SeoPressError::Busy(format!(
                            "{} is held by another writer",
                            path.display()
                        )));
                    }
                    std::thread::sleep(RETRY_INTERVAL);
                }
                Err(e) => return Err(SeoPressError::io(&path, e)),
            }
        }
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), error = %e, "failed to release store lock");
        }
    }
}

fn is_stale(path: &Path) -> bool {
    std::fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|modified| SystemTime::now().duration_since(modified).ok())
        .is_some_and(|age| age > STALE_LOCK_AGE)
}
