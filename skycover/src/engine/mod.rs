//! Coverage run orchestration.
//!
//! ```text
//! Region ──► Tessellate ──► ┌─────────────┐
//!                           │ Region lock │ (one computation per region key)
//!                           └──────┬──────┘
//!                                  ▼
//!                           ┌─────────────┐
//!                           │ Cache check │──► Fresh ──► CoverageSource::Cache
//!                           └──────┬──────┘
//!                                  │ Miss / stale
//!                                  ▼
//!                           ┌─────────────┐
//!                           │  Catalog    │──► Empty ──► CoverageSource::NoData
//!                           └──────┬──────┘
//!                                  ▼
//!                           ┌─────────────┐
//!                           │  Sampler    │ (blocking pool, rayon)
//!                           └──────┬──────┘
//!                                  ▼
//!                     aggregate ──► cache put ──► CoverageSource::Computed
//! ```
//!
//! Runs for different region keys never contend. A second run for a key
//! that is already being computed waits for the first, then finds the fresh
//! entry in the cache instead of sampling again.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cache::CoverageCacheClient;
use crate::clock::Clock;
use crate::config::{ConfigError, CoverageConfig};
use crate::coverage::{aggregate, Aggregate, CoverageError, CoverageSampler};
use crate::geometry::{tessellate_region, Cell, Propagator, Tessellator};
use crate::region::Region;
use crate::render::{render, CoverageReport, RenderMode, RenderedCell};
use crate::satellite::SatelliteCatalog;

/// Errors that stop a run before it produces a result.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Coverage(#[from] CoverageError),
}

/// Where a run's aggregate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoverageSource {
    /// Fresh cache entry.
    Cache,
    /// Sampled during this run and stored.
    Computed,
    /// No cells or no satellites; nothing was computed or stored.
    NoData,
}

impl fmt::Display for CoverageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoverageSource::Cache => write!(f, "cache"),
            CoverageSource::Computed => write!(f, "computed"),
            CoverageSource::NoData => write!(f, "no data"),
        }
    }
}

/// Result of one coverage run.
#[derive(Debug, Clone)]
pub struct CoverageRun {
    pub region_id: String,
    pub cells: Vec<Cell>,
    pub aggregate: Aggregate,
    pub source: CoverageSource,
    /// Satellites sampled; zero unless computed.
    pub satellites: usize,
    pub mode: RenderMode,
    pub started_at: DateTime<Utc>,
}

impl CoverageRun {
    pub fn has_data(&self) -> bool {
        self.source != CoverageSource::NoData
    }

    pub fn rendered(&self) -> Vec<RenderedCell> {
        render(&self.cells, &self.aggregate, self.mode)
    }

    pub fn report(&self) -> CoverageReport {
        CoverageReport::from_rendered(&self.rendered())
    }
}

/// Coverage engine.
pub struct CoverageEngine {
    tessellator: Arc<dyn Tessellator>,
    propagator: Arc<dyn Propagator>,
    catalog: Arc<SatelliteCatalog>,
    cache: CoverageCacheClient,
    clock: Arc<dyn Clock>,
    in_flight: DashMap<String, Arc<tokio::sync::Mutex<()>>>,
}

impl CoverageEngine {
    pub fn new(
        tessellator: Arc<dyn Tessellator>,
        propagator: Arc<dyn Propagator>,
        catalog: Arc<SatelliteCatalog>,
        cache: CoverageCacheClient,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            tessellator,
            propagator,
            catalog,
            cache,
            clock,
            in_flight: DashMap::new(),
        }
    }

    pub fn catalog(&self) -> &SatelliteCatalog {
        &self.catalog
    }

    pub fn cache(&self) -> &CoverageCacheClient {
        &self.cache
    }

    /// Region keys with a run currently holding or waiting for the lock.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Run coverage estimation for `region`.
    ///
    /// A fresh cache entry for `config.region_id` is served as is. Otherwise
    /// the region is sampled and the result stored. When the region yields
    /// no cells or the catalog yields no satellites the run reports
    /// [`CoverageSource::NoData`] and leaves the cache untouched.
    ///
    /// # Errors
    ///
    /// Fails on invalid `config`, or with [`CoverageError::Cancelled`] when
    /// `cancel` fires during sampling. A cancelled run stores nothing.
    pub async fn run(
        &self,
        region: &Region,
        config: &CoverageConfig,
        cancel: &CancellationToken,
    ) -> Result<CoverageRun, EngineError> {
        config.validate()?;
        let started = Instant::now();
        let started_at = self.clock.now();
        let key = config.region_id.clone();

        let cells = self.tessellate(region, config.resolution).await?;

        let run = CoverageRun {
            region_id: key.clone(),
            cells,
            aggregate: Aggregate::new(),
            source: CoverageSource::NoData,
            satellites: 0,
            mode: config.render_mode(),
            started_at,
        };
        if run.cells.is_empty() {
            warn!(region = %key, "Region produced no cells");
            return Ok(run);
        }

        let lock = self.region_lock(&key);
        let result = {
            let _guard = lock.lock().await;
            self.run_locked(run, config, cancel).await
        };
        drop(lock);
        self.release_region_lock(&key);

        let run = result?;
        info!(
            region = %key,
            source = %run.source,
            cells = run.cells.len(),
            covered = run.aggregate.len(),
            satellites = run.satellites,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Coverage run finished"
        );
        Ok(run)
    }

    /// Drop the cached result for `region_id`.
    pub async fn invalidate(&self, region_id: &str) -> bool {
        self.cache.invalidate(region_id).await
    }

    async fn run_locked(
        &self,
        mut run: CoverageRun,
        config: &CoverageConfig,
        cancel: &CancellationToken,
    ) -> Result<CoverageRun, EngineError> {
        let now_ms = self.clock.now_millis();
        if let Some(entry) = self.cache.entry(&run.region_id).await {
            if entry.is_fresh(now_ms, config.freshness_window_ms) {
                debug!(region = %run.region_id, age_ms = entry.age_ms(now_ms), "Serving cached coverage");
                run.aggregate = entry.aggregate;
                run.source = CoverageSource::Cache;
                return Ok(run);
            }
            debug!(region = %run.region_id, age_ms = entry.age_ms(now_ms), "Cached coverage is stale");
        }

        let mut satellites = self.catalog.satellites(config.inclination_range()).await;
        satellites.truncate(config.satellite_cap());
        if satellites.is_empty() {
            warn!(region = %run.region_id, "No satellites available, skipping coverage computation");
            return Ok(run);
        }
        run.satellites = satellites.len();

        let horizon = config.horizon(self.clock.now());
        let sampler = CoverageSampler::with_config(self.propagator.clone(), config.sampler_config());
        let cells = std::mem::take(&mut run.cells);
        let token = cancel.clone();

        let (cells, sampled) = tokio::task::spawn_blocking(move || {
            let sampled = sampler.sample(&cells, &satellites, &horizon, &token);
            (cells, sampled)
        })
        .await
        .map_err(|e| CoverageError::Worker(e.to_string()))?;
        run.cells = cells;

        let accumulator = sampled?;
        let ids: Vec<_> = run.cells.iter().map(|c| c.id.clone()).collect();
        run.aggregate = aggregate(&accumulator, &ids, horizon.len());
        run.source = CoverageSource::Computed;

        self.cache.put(&run.region_id, &run.aggregate).await;
        Ok(run)
    }

    async fn tessellate(&self, region: &Region, resolution: u8) -> Result<Vec<Cell>, EngineError> {
        let tessellator = self.tessellator.clone();
        let boundary = region.boundary.clone();
        let cells = tokio::task::spawn_blocking(move || {
            tessellate_region(tessellator.as_ref(), &boundary, resolution)
        })
        .await
        .map_err(|e| CoverageError::Worker(e.to_string()))?;
        Ok(cells)
    }

    fn region_lock(&self, key: &str) -> Arc<tokio::sync::Mutex<()>> {
        self.in_flight
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    /// Remove the lock once no other run holds a reference to it.
    fn release_region_lock(&self, key: &str) {
        self.in_flight
            .remove_if(key, |_, lock| Arc::strong_count(lock) == 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{Cache, MemoryCacheProvider};
    use crate::satellite::FetchError;
    use crate::clock::ManualClock;
    use crate::coord::GeoPoint;
    use crate::coverage::sampler::tests::ScriptedPropagator;
    use crate::geometry::tests::GridTessellator;
    use crate::geometry::RegionBoundary;
    use crate::satellite::tests::synthetic_document;
    use crate::satellite::StaticElementSource;
    use chrono::TimeZone;
    use std::collections::HashMap;
    use std::time::Duration;

    struct Harness {
        engine: Arc<CoverageEngine>,
        clock: Arc<ManualClock>,
        source: Arc<StaticElementSource>,
        store: Arc<MemoryCacheProvider>,
    }

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
    }

    /// One-degree square at (9, 38) in (lat, lon).
    fn region() -> Region {
        Region::new(
            "square",
            RegionBoundary::Polygon(vec![
                GeoPoint::new(9.0, 38.0),
                GeoPoint::new(10.0, 38.0),
                GeoPoint::new(10.0, 39.0),
                GeoPoint::new(9.0, 39.0),
            ]),
        )
    }

    /// Every synthetic satellite sits over the square at every instant.
    fn harness(inclinations: &[f64], source: StaticElementSource) -> Harness {
        let clock = Arc::new(ManualClock::new(start()));
        let mut positions = HashMap::new();
        for (i, _) in inclinations.iter().enumerate() {
            for step in 0..4 {
                positions.insert(
                    (format!("STARLINK-{}", 1000 + i), start() + chrono::Duration::hours(step)),
                    GeoPoint::new(9.5, 38.5),
                );
            }
        }

        let source = Arc::new(source);
        let store = Arc::new(MemoryCacheProvider::new(1024 * 1024));
        let catalog = Arc::new(SatelliteCatalog::new(source.clone(), clock.clone()));
        let cache = CoverageCacheClient::new(store.clone(), clock.clone());
        let engine = CoverageEngine::new(
            Arc::new(GridTessellator { max_abs_lat: 80.0 }),
            Arc::new(ScriptedPropagator { positions }),
            catalog,
            cache,
            clock.clone(),
        );
        Harness {
            engine: Arc::new(engine),
            clock,
            source,
            store,
        }
    }

    fn config() -> CoverageConfig {
        CoverageConfig::default()
            .with_region_id("square")
            .with_horizon(4, 60)
    }

    #[tokio::test]
    async fn test_computes_then_serves_from_cache() {
        let h = harness(&[53.0, 53.0], StaticElementSource::new(synthetic_document(&[53.0, 53.0])));
        let cancel = CancellationToken::new();

        let first = h.engine.run(&region(), &config(), &cancel).await.unwrap();
        assert_eq!(first.source, CoverageSource::Computed);
        assert_eq!(first.satellites, 2);
        assert_eq!(first.cells.len(), 1);
        let coverage = first.aggregate.get(&first.cells[0].id).unwrap();
        assert_eq!(coverage.average, 2.0);
        assert_eq!(coverage.stability, 1.0);

        let second = h.engine.run(&region(), &config(), &cancel).await.unwrap();
        assert_eq!(second.source, CoverageSource::Cache);
        assert_eq!(second.aggregate, first.aggregate);
        assert_eq!(h.source.fetch_count(), 1);
        assert_eq!(h.engine.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_stale_entry_is_recomputed() {
        let h = harness(&[53.0], StaticElementSource::new(synthetic_document(&[53.0])));
        let cancel = CancellationToken::new();

        h.engine.run(&region(), &config(), &cancel).await.unwrap();
        h.clock.advance(chrono::Duration::hours(2));

        let run = h.engine.run(&region(), &config(), &cancel).await.unwrap();
        assert_eq!(run.source, CoverageSource::Computed);
    }

    #[tokio::test]
    async fn test_fetch_failure_is_no_data_and_leaves_cache_alone() {
        let h = harness(
            &[53.0],
            StaticElementSource::failing(FetchError::Http("offline".into())),
        );
        let run = h
            .engine
            .run(&region(), &config(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(run.source, CoverageSource::NoData);
        assert!(!run.has_data());
        assert!(run.aggregate.is_empty());
        assert_eq!(run.cells.len(), 1);
        assert_eq!(h.store.entry_count(), 0);
    }

    #[tokio::test]
    async fn test_inclination_filter_can_empty_the_run() {
        let h = harness(&[53.0], StaticElementSource::new(synthetic_document(&[53.0])));
        let config = config().with_inclination(90.0, 100.0);

        let run = h
            .engine
            .run(&region(), &config, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(run.source, CoverageSource::NoData);
    }

    #[tokio::test]
    async fn test_preview_cap_limits_satellites() {
        let inclinations = [53.0, 53.0, 53.0];
        let h = harness(&inclinations, StaticElementSource::new(synthetic_document(&inclinations)));
        let config = config().with_limit_satellites(true).with_preview_satellites(1);

        let run = h
            .engine
            .run(&region(), &config, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(run.satellites, 1);
        assert_eq!(run.mode, RenderMode::Preview);
    }

    #[tokio::test]
    async fn test_preview_entry_serves_full_run_of_same_region() {
        let inclinations = [53.0; 5];
        let h = harness(&inclinations, StaticElementSource::new(synthetic_document(&inclinations)));
        let cancel = CancellationToken::new();
        let preview = config().with_limit_satellites(true).with_preview_satellites(4);

        let first = h.engine.run(&region(), &preview, &cancel).await.unwrap();
        assert_eq!(first.source, CoverageSource::Computed);
        assert_eq!(first.rendered()[0].color, "red");

        let full = h.engine.run(&region(), &config(), &cancel).await.unwrap();
        assert_eq!(full.source, CoverageSource::Cache);
        assert_eq!(full.mode, RenderMode::Full);
        let cell = &full.rendered()[0];
        assert_eq!(cell.average, 4.0);
        assert_eq!(cell.color, "#800000");
    }

    #[tokio::test]
    async fn test_cancelled_run_stores_nothing() {
        let h = harness(&[53.0], StaticElementSource::new(synthetic_document(&[53.0])));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = h.engine.run(&region(), &config(), &cancel).await;
        assert!(matches!(
            result,
            Err(EngineError::Coverage(CoverageError::Cancelled { .. }))
        ));
        assert_eq!(h.store.entry_count(), 0);
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected() {
        let h = harness(&[53.0], StaticElementSource::new(synthetic_document(&[53.0])));
        let result = h
            .engine
            .run(&region(), &config().with_resolution(30), &CancellationToken::new())
            .await;
        assert!(matches!(result, Err(EngineError::Config(_))));
    }

    #[tokio::test]
    async fn test_region_without_cells_is_no_data() {
        let h = harness(&[53.0], StaticElementSource::new(synthetic_document(&[53.0])));
        let polar = Region::new(
            "polar",
            RegionBoundary::Polygon(vec![
                GeoPoint::new(85.0, 85.0),
                GeoPoint::new(86.0, 85.0),
                GeoPoint::new(86.0, 86.0),
            ]),
        );

        let run = h
            .engine
            .run(&polar, &config(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(run.source, CoverageSource::NoData);
        assert!(run.cells.is_empty());
        assert_eq!(h.source.fetch_count(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_runs_for_same_region_compute_once() {
        let h = harness(
            &[53.0],
            StaticElementSource::new(synthetic_document(&[53.0])).with_delay(Duration::from_millis(50)),
        );

        let a = {
            let engine = h.engine.clone();
            tokio::spawn(async move {
                engine.run(&region(), &config(), &CancellationToken::new()).await
            })
        };
        let b = {
            let engine = h.engine.clone();
            tokio::spawn(async move {
                engine.run(&region(), &config(), &CancellationToken::new()).await
            })
        };

        let mut sources = vec![a.await.unwrap().unwrap().source, b.await.unwrap().unwrap().source];
        sources.sort_by_key(|s| *s == CoverageSource::Cache);
        assert_eq!(sources, vec![CoverageSource::Computed, CoverageSource::Cache]);
        assert_eq!(h.source.fetch_count(), 1);
        assert_eq!(h.engine.in_flight(), 0);
    }
}
