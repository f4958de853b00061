//! On-disk cache provider.
//!
//! One file per key under a root directory. File names are the SHA-256 of
//! the key, so arbitrary region names map to safe, fixed-length paths. Values
//! are written to a temp file and renamed into place, so a reader never sees
//! a partially written entry.
//!
//! The size budget only rejects single values larger than the budget. Stored
//! entries are never evicted by a write; they are removed by `delete`, an
//! explicit [`Cache::gc`] (oldest first, down to the budget), or
//! [`DiskCacheProvider::clear`]. Temp files of writes still in progress are
//! never swept.
//!
//! ```text
//! <root>/
//! ├── 3f1c…9a.entry
//! └── 3f1c…9a.17.tmp      (in-flight write; removed by gc once abandoned)
//! ```

use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Instant, SystemTime};

use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::cache::traits::{validate_key, BoxFuture, Cache, GcResult, ServiceCacheError};

const ENTRY_EXTENSION: &str = "entry";
const TEMP_EXTENSION: &str = "tmp";

#[derive(Debug, Default, Clone, Copy)]
struct Usage {
    bytes: u64,
    entries: u64,
}

/// Durable file-per-key cache.
pub struct DiskCacheProvider {
    root: PathBuf,
    max_size_bytes: AtomicU64,
    usage: Mutex<Usage>,
    temp_counter: AtomicU64,
    /// Temp files of writes that have not been renamed into place yet.
    in_flight: Mutex<HashSet<PathBuf>>,
}

/// Registers a temp file as in flight until dropped.
struct InFlightTemp<'a> {
    set: &'a Mutex<HashSet<PathBuf>>,
    path: PathBuf,
}

impl<'a> InFlightTemp<'a> {
    fn register(set: &'a Mutex<HashSet<PathBuf>>, path: PathBuf) -> Self {
        set.lock().insert(path.clone());
        Self { set, path }
    }
}

impl Drop for InFlightTemp<'_> {
    fn drop(&mut self) {
        self.set.lock().remove(&self.path);
    }
}

impl DiskCacheProvider {
    /// Open (creating if needed) a cache rooted at `root`.
    ///
    /// Existing entries are counted so size reporting is correct from the
    /// start.
    pub fn open(root: impl Into<PathBuf>, max_size_bytes: u64) -> Result<Self, ServiceCacheError> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;

        let mut usage = Usage::default();
        for entry in std::fs::read_dir(&root)? {
            let entry = entry?;
            if has_extension(&entry.path(), ENTRY_EXTENSION) {
                usage.bytes += entry.metadata()?.len();
                usage.entries += 1;
            }
        }

        info!(
            root = %root.display(),
            entries = usage.entries,
            bytes = usage.bytes,
            "Opened disk cache"
        );

        Ok(Self {
            root,
            max_size_bytes: AtomicU64::new(max_size_bytes),
            usage: Mutex::new(usage),
            temp_counter: AtomicU64::new(0),
            in_flight: Mutex::new(HashSet::new()),
        })
    }

    /// Cache root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Remove every entry and abandoned temp file.
    pub async fn clear(&self) -> Result<GcResult, ServiceCacheError> {
        let start = Instant::now();
        let mut result = GcResult::default();

        let mut dir = tokio::fs::read_dir(&self.root).await?;
        while let Some(entry) = dir.next_entry().await? {
            let path = entry.path();
            let is_entry = has_extension(&path, ENTRY_EXTENSION);
            if !is_entry && !self.is_abandoned_temp(&path) {
                continue;
            }
            let len = entry.metadata().await.map(|m| m.len()).unwrap_or(0);
            if remove_if_present(&path).await? {
                result.entries_removed += 1;
                result.bytes_freed += len;
            }
        }

        *self.usage.lock() = Usage::default();
        result.duration_ms = start.elapsed().as_millis() as u64;
        info!(root = %self.root.display(), %result, "Disk cache cleared");
        Ok(result)
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.root
            .join(format!("{}.{}", key_digest(key), ENTRY_EXTENSION))
    }

    fn temp_path(&self, key: &str) -> PathBuf {
        let n = self.temp_counter.fetch_add(1, Ordering::Relaxed);
        self.root
            .join(format!("{}.{}.{}", key_digest(key), n, TEMP_EXTENSION))
    }

    fn is_abandoned_temp(&self, path: &Path) -> bool {
        has_extension(path, TEMP_EXTENSION) && !self.in_flight.lock().contains(path)
    }

    fn record_write(&self, previous_len: Option<u64>, new_len: u64) {
        let mut usage = self.usage.lock();
        match previous_len {
            Some(old) => usage.bytes = usage.bytes.saturating_sub(old) + new_len,
            None => {
                usage.bytes += new_len;
                usage.entries += 1;
            }
        }
    }

    fn record_delete(&self, len: u64) {
        let mut usage = self.usage.lock();
        usage.bytes = usage.bytes.saturating_sub(len);
        usage.entries = usage.entries.saturating_sub(1);
    }

    /// Sweep abandoned temp files, then remove the oldest entries until the
    /// total fits the size budget.
    async fn collect(&self) -> Result<GcResult, ServiceCacheError> {
        let start = Instant::now();
        let mut result = GcResult::default();
        let mut entries: Vec<(PathBuf, u64, SystemTime)> = Vec::new();

        let mut dir = tokio::fs::read_dir(&self.root).await?;
        while let Some(entry) = dir.next_entry().await? {
            let path = entry.path();
            let metadata = match entry.metadata().await {
                Ok(m) => m,
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };

            if has_extension(&path, TEMP_EXTENSION) {
                if !self.is_abandoned_temp(&path) {
                    continue;
                }
                if remove_if_present(&path).await? {
                    result.entries_removed += 1;
                    result.bytes_freed += metadata.len();
                }
            } else if has_extension(&path, ENTRY_EXTENSION) {
                let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
                entries.push((path, metadata.len(), modified));
            }
        }

        let max = self.max_size_bytes();
        let mut total: u64 = entries.iter().map(|(_, len, _)| len).sum();
        let mut remaining = entries.len() as u64;

        if total > max {
            entries.sort_by_key(|(_, _, modified)| *modified);
            for (path, len, _) in &entries {
                if total <= max {
                    break;
                }
                if remove_if_present(path).await? {
                    total = total.saturating_sub(*len);
                    remaining -= 1;
                    result.entries_removed += 1;
                    result.bytes_freed += len;
                }
            }
        }

        *self.usage.lock() = Usage {
            bytes: total,
            entries: remaining,
        };
        result.duration_ms = start.elapsed().as_millis() as u64;

        debug!(root = %self.root.display(), %result, "Disk cache GC complete");
        Ok(result)
    }
}

impl Cache for DiskCacheProvider {
    fn set(&self, key: &str, value: Vec<u8>) -> BoxFuture<'_, Result<(), ServiceCacheError>> {
        let key = key.to_string();
        Box::pin(async move {
            validate_key(&key)?;
            let max = self.max_size_bytes();
            if value.len() as u64 > max {
                return Err(ServiceCacheError::ValueTooLarge {
                    size: value.len(),
                    max,
                });
            }

            let path = self.entry_path(&key);
            let temp = self.temp_path(&key);
            let _in_flight = InFlightTemp::register(&self.in_flight, temp.clone());
            tokio::fs::write(&temp, &value).await?;

            let previous_len = tokio::fs::metadata(&path).await.ok().map(|m| m.len());
            if let Err(e) = tokio::fs::rename(&temp, &path).await {
                if let Err(cleanup) = tokio::fs::remove_file(&temp).await {
                    warn!(path = %temp.display(), error = %cleanup, "Failed to remove temp file");
                }
                return Err(e.into());
            }
            self.record_write(previous_len, value.len() as u64);

            if self.size_bytes() > max {
                debug!(
                    root = %self.root.display(),
                    size = self.size_bytes(),
                    max,
                    "Disk cache over budget; run gc to trim"
                );
            }
            Ok(())
        })
    }

    fn get(&self, key: &str) -> BoxFuture<'_, Result<Option<Vec<u8>>, ServiceCacheError>> {
        let path = self.entry_path(key);
        Box::pin(async move {
            match tokio::fs::read(&path).await {
                Ok(bytes) => Ok(Some(bytes)),
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
    }

    fn delete(&self, key: &str) -> BoxFuture<'_, Result<bool, ServiceCacheError>> {
        let path = self.entry_path(key);
        Box::pin(async move {
            let len = match tokio::fs::metadata(&path).await {
                Ok(m) => m.len(),
                Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
                Err(e) => return Err(e.into()),
            };
            let removed = remove_if_present(&path).await?;
            if removed {
                self.record_delete(len);
            }
            Ok(removed)
        })
    }

    fn contains(&self, key: &str) -> BoxFuture<'_, Result<bool, ServiceCacheError>> {
        let path = self.entry_path(key);
        Box::pin(async move { Ok(tokio::fs::try_exists(&path).await?) })
    }

    fn size_bytes(&self) -> u64 {
        self.usage.lock().bytes
    }

    fn entry_count(&self) -> u64 {
        self.usage.lock().entries
    }

    fn max_size_bytes(&self) -> u64 {
        self.max_size_bytes.load(Ordering::Relaxed)
    }

    fn set_max_size(&self, size_bytes: u64) -> BoxFuture<'_, Result<(), ServiceCacheError>> {
        self.max_size_bytes.store(size_bytes, Ordering::Relaxed);
        Box::pin(async { Ok(()) })
    }

    fn gc(&self) -> BoxFuture<'_, Result<GcResult, ServiceCacheError>> {
        Box::pin(self.collect())
    }
}

/// Lowercase hex SHA-256 of a cache key.
fn key_digest(key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some(extension)
}

async fn remove_if_present(path: &Path) -> Result<bool, ServiceCacheError> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}
