//! Time-bounded in-memory catalog of satellite records.
//!
//! The catalog owns the most recent successful fetch together with its
//! timestamp. Callers ask for satellites within an inclination window; the
//! catalog refetches when its snapshot is missing, empty, or older than the
//! freshness window.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use super::source::{ElementSetSource, FetchError};
use super::{filter_by_inclination, parse_element_sets, InclinationRange, SatelliteRecord};
use super::DEFAULT_MAX_RECORDS;
use crate::clock::Clock;

/// Default freshness window for fetched element sets (2 hours).
pub const DEFAULT_FRESHNESS: Duration = Duration::from_secs(2 * 60 * 60);

/// Default bound on a single fetch.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

struct CatalogSnapshot {
    satellites: Arc<Vec<SatelliteRecord>>,
    fetched_at_ms: i64,
}

/// In-memory fetch cache of satellite records.
pub struct SatelliteCatalog {
    source: Arc<dyn ElementSetSource>,
    clock: Arc<dyn Clock>,
    freshness: Duration,
    max_records: usize,
    fetch_timeout: Duration,
    snapshot: RwLock<Option<CatalogSnapshot>>,
    /// Serializes refetches so concurrent callers share one download.
    refresh: tokio::sync::Mutex<()>,
}

impl SatelliteCatalog {
    /// Create an empty catalog over `source`.
    pub fn new(source: Arc<dyn ElementSetSource>, clock: Arc<dyn Clock>) -> Self {
        Self {
            source,
            clock,
            freshness: DEFAULT_FRESHNESS,
            max_records: DEFAULT_MAX_RECORDS,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            snapshot: RwLock::new(None),
            refresh: tokio::sync::Mutex::new(()),
        }
    }

    pub fn with_freshness(mut self, freshness: Duration) -> Self {
        self.freshness = freshness;
        self
    }

    pub fn with_max_records(mut self, max_records: usize) -> Self {
        self.max_records = max_records;
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Whether the current snapshot is non-empty and younger than the
    /// freshness window at `now_ms`.
    pub fn is_fresh(&self, now_ms: i64) -> bool {
        match self.snapshot.read().as_ref() {
            Some(snapshot) => {
                !snapshot.satellites.is_empty()
                    && now_ms - snapshot.fetched_at_ms < self.freshness.as_millis() as i64
            }
            None => false,
        }
    }

    /// Timestamp of the last successful fetch, if any.
    pub fn fetched_at_ms(&self) -> Option<i64> {
        self.snapshot.read().as_ref().map(|s| s.fetched_at_ms)
    }

    /// Number of records in the current snapshot.
    pub fn len(&self) -> usize {
        self.snapshot
            .read()
            .as_ref()
            .map_or(0, |s| s.satellites.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop the current snapshot so the next request refetches.
    pub fn invalidate(&self) {
        *self.snapshot.write() = None;
    }

    /// Satellites whose inclination falls within `range`.
    ///
    /// Refetches when the snapshot is not fresh. A failed or timed-out fetch
    /// yields an empty list and leaves the previous snapshot in place.
    pub async fn satellites(&self, range: InclinationRange) -> Vec<SatelliteRecord> {
        match self.current().await {
            Ok(all) => {
                let filtered = filter_by_inclination(&all, range);
                debug!(
                    total = all.len(),
                    selected = filtered.len(),
                    min_deg = range.min_deg,
                    max_deg = range.max_deg,
                    "Filtered satellites by inclination"
                );
                filtered
            }
            Err(e) => {
                warn!(source = %self.source.describe(), error = %e, "Failed to fetch element sets");
                Vec::new()
            }
        }
    }

    /// Fetch unconditionally and replace the snapshot on success.
    ///
    /// Returns the number of parsed records.
    pub async fn refresh(&self) -> Result<usize, FetchError> {
        let _guard = self.refresh.lock().await;
        self.fetch_and_store().await.map(|s| s.len())
    }

    async fn current(&self) -> Result<Arc<Vec<SatelliteRecord>>, FetchError> {
        if let Some(satellites) = self.fresh_snapshot() {
            return Ok(satellites);
        }

        let _guard = self.refresh.lock().await;
        // Another caller may have refreshed while we waited
        if let Some(satellites) = self.fresh_snapshot() {
            return Ok(satellites);
        }
        self.fetch_and_store().await
    }

    fn fresh_snapshot(&self) -> Option<Arc<Vec<SatelliteRecord>>> {
        if !self.is_fresh(self.clock.now_millis()) {
            return None;
        }
        self.snapshot.read().as_ref().map(|s| Arc::clone(&s.satellites))
    }

    async fn fetch_and_store(&self) -> Result<Arc<Vec<SatelliteRecord>>, FetchError> {
        let text = tokio::time::timeout(self.fetch_timeout, self.source.fetch())
            .await
            .map_err(|_| FetchError::Timeout(self.fetch_timeout))??;

        let parsed = parse_element_sets(&text, self.max_records);
        let satellites = Arc::new(parsed.records);
        let fetched_at_ms = self.clock.now_millis();

        info!(
            source = %self.source.describe(),
            records = satellites.len(),
            skipped = parsed.skipped,
            "Fetched element sets"
        );

        *self.snapshot.write() = Some(CatalogSnapshot {
            satellites: Arc::clone(&satellites),
            fetched_at_ms,
        });
        Ok(satellites)
    }
}
