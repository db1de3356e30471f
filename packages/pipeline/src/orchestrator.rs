//! The pipeline orchestrator.
//!
//! One [`Pipeline::run`] performs up to `run.max_attempts` attempts. Each
//! attempt fetches all three sources (every fetch with its own retry
//! policy), resolves stations to regions, merges the station counts with
//! the vehicle counts and replaces the persisted output. A failed attempt
//! discards everything it built; nothing is written unless an attempt
//! succeeds end to end.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use ev_map_database::{AggregateRow, DuckDbSink, OutputSink, RunOutput};
use ev_map_population::{RegionPopulation, aggregate_population};
use ev_map_region::{AxisOrder, RegionResolver, parse_boundaries};
use ev_map_source::progress::{ProgressCallback, null_progress};
use ev_map_source::retry::{fetch_bytes_with_retry, fetch_with_retry};
use ev_map_source::snapshot::write_snapshot;
use ev_map_source::{
    DataSource, RetryPolicy, SourceError, build_http_client, decode_json_records,
    source_from_definition,
};
use ev_map_station::{METADATA_KEYS, NormalizedStation, build_station_table, normalize_stations};
use serde::Serialize;

use crate::config::PipelineConfig;
use crate::state::PipelineState;
use crate::PipelineError;

/// Stations, boundaries and population.
const SOURCE_COUNT: u64 = 3;

/// The three datasets a pipeline consumes.
pub struct PipelineSources {
    /// Charging station records.
    pub stations: Box<dyn DataSource>,
    /// Region boundary `GeoJSON`.
    pub boundaries: Box<dyn DataSource>,
    /// Vehicle registration records.
    pub population: Box<dyn DataSource>,
}

impl PipelineSources {
    /// Builds HTTP or file sources from the configured definitions.
    #[must_use]
    pub fn from_config(config: &PipelineConfig, client: &reqwest::Client) -> Self {
        Self {
            stations: source_from_definition(&config.stations, client),
            boundaries: source_from_definition(&config.boundaries.source, client),
            population: source_from_definition(&config.population, client),
        }
    }
}

/// Summary of a successful run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// Whole-run attempts used (1 = first try).
    pub attempts: u32,
    /// Station records fetched.
    pub raw_stations: usize,
    /// Stations left after normalization.
    pub normalized_stations: usize,
    /// Stations that fell inside a region.
    pub resolved: usize,
    /// Stations that fell inside no region.
    pub unresolved: usize,
    /// Resolved stations that only matched with latitude and longitude
    /// swapped.
    pub swapped_axis_matches: usize,
    /// Aggregate rows written.
    pub rows_written: u64,
    /// Final state (always [`PipelineState::Done`] for a returned report).
    pub state: PipelineState,
}

#[derive(Debug, Default)]
struct ResolveCounts {
    resolved: usize,
    unresolved: usize,
    swapped: usize,
}

/// Drives fetch, resolution, aggregation and persistence.
pub struct Pipeline {
    config: PipelineConfig,
    sources: PipelineSources,
    sink: Box<dyn OutputSink>,
    progress: Arc<dyn ProgressCallback>,
    fetch_progress: Arc<dyn ProgressCallback>,
    state: PipelineState,
    station_counts: BTreeMap<String, u64>,
}

impl Pipeline {
    /// Creates a pipeline over explicit sources and sink.
    #[must_use]
    pub fn new(
        config: PipelineConfig,
        sources: PipelineSources,
        sink: Box<dyn OutputSink>,
    ) -> Self {
        Self {
            config,
            sources,
            sink,
            progress: null_progress(),
            fetch_progress: null_progress(),
            state: PipelineState::Idle,
            station_counts: BTreeMap::new(),
        }
    }

    /// Creates a pipeline with the configured sources, writing to the
    /// configured `DuckDB` file.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if the config is invalid or the HTTP
    /// client cannot be built.
    pub fn from_config(config: PipelineConfig) -> Result<Self, PipelineError> {
        config.validate()?;
        let client = build_http_client()?;
        let sources = PipelineSources::from_config(&config, &client);
        let sink = Box::new(DuckDbSink::new(config.output.database_path()));
        Ok(Self::new(config, sources, sink))
    }

    /// Reports station resolution progress to `progress`.
    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn ProgressCallback>) -> Self {
        self.progress = progress;
        self
    }

    /// Reports per-source fetch progress (one step per source) to
    /// `progress`.
    #[must_use]
    pub fn with_fetch_progress(mut self, progress: Arc<dyn ProgressCallback>) -> Self {
        self.fetch_progress = progress;
        self
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> PipelineState {
        self.state
    }

    /// Runs the pipeline to completion.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Exhausted`] wrapping the last attempt's
    /// error once `run.max_attempts` attempts have failed. Nothing is
    /// persisted in that case.
    pub async fn run(&mut self) -> Result<RunReport, PipelineError> {
        let max_attempts = self.config.run.max_attempts.max(1);
        let mut attempt = 1u32;

        loop {
            log::info!("Pipeline attempt {attempt}/{max_attempts}");

            match self.run_attempt(attempt).await {
                Ok(report) => {
                    self.state = PipelineState::Done;
                    log::info!(
                        "Pipeline done: {} rows written, {} of {} stations resolved",
                        report.rows_written,
                        report.resolved,
                        report.normalized_stations
                    );
                    return Ok(report);
                }
                Err(e) if attempt >= max_attempts => {
                    self.state = PipelineState::Failed;
                    self.station_counts.clear();
                    log::error!("Pipeline failed after {attempt} attempt(s): {e}");
                    return Err(PipelineError::Exhausted {
                        attempts: attempt,
                        last: Box::new(e),
                    });
                }
                Err(e) => {
                    let delay = Duration::from_secs(
                        self.config
                            .run
                            .retry_delay_secs
                            .saturating_mul(u64::from(attempt)),
                    );
                    log::warn!(
                        "Pipeline attempt {attempt}/{max_attempts} failed in {}: {e}; retrying in {delay:?}...",
                        self.state
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    async fn run_attempt(&mut self, attempt: u32) -> Result<RunReport, PipelineError> {
        self.station_counts.clear();
        self.state = PipelineState::FetchingAll;
        self.fetch_progress.set_total(SOURCE_COUNT);

        let records = self
            .fetch(
                self.sources.stations.as_ref(),
                &self.config.stations.retry,
                decode_json_records,
            )
            .await?;
        let stations = normalize_stations(&records);
        let station_details = self
            .config
            .output
            .station_details
            .then(|| build_station_table(&records, METADATA_KEYS));

        let name_property = self.config.boundaries.name_property.as_str();
        let regions = self
            .fetch(
                self.sources.boundaries.as_ref(),
                &self.config.boundaries.source.retry,
                |bytes| {
                    parse_boundaries(bytes, name_property).map_err(|e| SourceError::Malformed {
                        message: e.to_string(),
                    })
                },
            )
            .await?;
        if regions.is_empty() {
            log::warn!("Boundary dataset has no named regions; every station will be unresolved");
        }
        let resolver = RegionResolver::new(regions);

        let population_records = self
            .fetch(
                self.sources.population.as_ref(),
                &self.config.population.retry,
                decode_json_records,
            )
            .await?;
        let population = aggregate_population(&population_records);
        self.fetch_progress.finish(format!("Fetched {SOURCE_COUNT} sources"));

        self.state = PipelineState::Resolving;
        let counts = self.resolve_stations(&resolver, &stations);

        self.state = PipelineState::Aggregating;
        let rows = merge_counts(&self.station_counts, &population);

        self.state = PipelineState::Persisting;
        let output = RunOutput {
            rows,
            station_details,
        };
        let rows_written = self.sink.replace_output(&output)?;

        Ok(RunReport {
            attempts: attempt,
            raw_stations: records.len(),
            normalized_stations: stations.len(),
            resolved: counts.resolved,
            unresolved: counts.unresolved,
            swapped_axis_matches: counts.swapped,
            rows_written,
            state: PipelineState::Done,
        })
    }

    /// Fetches and decodes one source, snapshotting the raw payload.
    async fn fetch<T, F>(
        &self,
        source: &dyn DataSource,
        policy: &RetryPolicy,
        decode: F,
    ) -> Result<T, SourceError>
    where
        F: Fn(&[u8]) -> Result<T, SourceError>,
    {
        log::info!("Fetching {} ({})...", source.name(), source.id());
        self.fetch_progress.set_message(format!("Fetching {}", source.name()));
        let fetched = fetch_with_retry(source, policy, decode).await?;
        self.fetch_progress.inc(1);
        log::info!(
            "{}: fetched {} bytes in {} attempt(s)",
            source.id(),
            fetched.payload.len(),
            fetched.attempts
        );

        if let Some(dir) = self.config.output.snapshot_path() {
            if let Err(e) = write_snapshot(&dir, source.id(), &fetched.payload) {
                log::warn!("{}: failed to write snapshot: {e}", source.id());
            }
        }

        Ok(fetched.value)
    }

    fn resolve_stations(
        &mut self,
        resolver: &RegionResolver,
        stations: &[NormalizedStation],
    ) -> ResolveCounts {
        let mut counts = ResolveCounts::default();

        self.progress.set_total(stations.len() as u64);
        self.progress.set_message("Resolving stations".to_string());

        for station in stations {
            match resolver.resolve_with_order(station.coordinate) {
                Some(resolution) => {
                    counts.resolved += 1;
                    if resolution.order == AxisOrder::LatLng {
                        counts.swapped += 1;
                        log::debug!(
                            "Station at ({}, {}) matched {} only with axes swapped",
                            station.coordinate.latitude,
                            station.coordinate.longitude,
                            resolution.name
                        );
                    }
                    *self
                        .station_counts
                        .entry(resolution.name.to_string())
                        .or_insert(0) += 1;
                }
                None => counts.unresolved += 1,
            }
            self.progress.inc(1);
        }

        self.progress.finish(format!(
            "Resolved {} stations ({} unresolved)",
            counts.resolved, counts.unresolved
        ));

        if counts.swapped > 0 {
            log::warn!(
                "{} station(s) only resolved with latitude and longitude swapped",
                counts.swapped
            );
        }
        if counts.unresolved > 0 {
            log::info!("{} station(s) fell outside every region", counts.unresolved);
        }

        counts
    }
}

/// Merges station counts with vehicle counts.
///
/// Emits one row per region with at least one station, sorted by region
/// name. Regions without a population record get a vehicle count of 0.
#[must_use]
pub fn merge_counts(
    counts: &BTreeMap<String, u64>,
    population: &RegionPopulation,
) -> Vec<AggregateRow> {
    counts
        .iter()
        .filter(|(_, count)| **count > 0)
        .map(|(name, count)| AggregateRow::new(name.clone(), *count, population.get(name)))
        .collect()
}

/// Fetches the configured boundary source and builds a resolver from it.
///
/// # Errors
///
/// Returns [`PipelineError::Source`] if the boundaries cannot be fetched
/// and [`PipelineError::Region`] if they cannot be parsed.
pub async fn fetch_resolver(
    config: &PipelineConfig,
    client: &reqwest::Client,
) -> Result<RegionResolver, PipelineError> {
    let source = source_from_definition(&config.boundaries.source, client);
    let bytes = fetch_bytes_with_retry(source.as_ref(), &config.boundaries.source.retry).await?;
    let regions = parse_boundaries(&bytes, &config.boundaries.name_property)?;
    Ok(RegionResolver::new(regions))
}
