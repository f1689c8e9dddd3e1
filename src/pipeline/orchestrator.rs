//! Tile orchestration: partition, fetch with retry, normalize, deduplicate.

use std::time::Duration;

use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::place_set::PlaceSet;
use super::progress::{ProgressEvent, ProgressSink, TileOutcome, TileState};
use super::retry::RetryPolicy;
use crate::error::Result;
use crate::models::{GeoArea, Place, SearchSpec};
use crate::normalize::normalize;
use crate::overpass::{query, FetchClient, RawRecord};
use crate::tiling::{Partitioner, DEFAULT_MAX_TILES};

/// Tunables for one investigation run.
#[derive(Debug, Clone, PartialEq)]
pub struct InvestigationSettings {
    pub max_tiles: usize,
    /// Tiles fetched at the same time; 1 keeps strict submission order
    pub concurrency: usize,
    /// Pause after every request, to stay polite with public Overpass instances
    pub request_delay: Duration,
    /// Extra client-side wait on top of the server-side query timeout
    pub http_grace: Duration,
}

impl Default for InvestigationSettings {
    fn default() -> Self {
        Self {
            max_tiles: DEFAULT_MAX_TILES,
            concurrency: 2,
            request_delay: Duration::from_millis(500),
            http_grace: Duration::from_secs(15),
        }
    }
}

/// A tile that ended in `Failed`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TileFailure {
    pub index: usize,
    pub area: GeoArea,
    pub reason: String,
    /// Network failure that exhausted its retries, as opposed to a service error
    pub transient: bool,
}

/// Result of an investigation: the places found plus an account of any
/// tiles that could not be fetched.
#[derive(Debug, Clone, Serialize)]
pub struct Investigation {
    pub places: Vec<Place>,
    pub tiles_total: usize,
    pub failed_tiles: Vec<TileFailure>,
    pub records_received: usize,
    pub duplicates_removed: usize,
}

impl Investigation {
    pub fn failed_count(&self) -> usize {
        self.failed_tiles.len()
    }

    /// True when every tile was fetched, so an empty result means "nothing there".
    pub fn is_complete(&self) -> bool {
        self.failed_tiles.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QueryKind {
    /// Names matching the search term
    Targeted,
    /// Every named place
    Broad,
}

struct TileResult {
    index: usize,
    area: GeoArea,
    attempts: u32,
    outcome: Result<Vec<RawRecord>>,
}

/// Drives a tiled search against a [`FetchClient`].
pub struct Investigator<C> {
    client: C,
    partitioner: Partitioner,
    retry: RetryPolicy,
    settings: InvestigationSettings,
}

impl<C: FetchClient> Investigator<C> {
    pub fn new(client: C) -> Self {
        Self {
            client,
            partitioner: Partitioner::default(),
            retry: RetryPolicy::default(),
            settings: InvestigationSettings::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_settings(mut self, settings: InvestigationSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_partitioner(mut self, partitioner: Partitioner) -> Self {
        self.partitioner = partitioner;
        self
    }

    pub fn settings(&self) -> &InvestigationSettings {
        &self.settings
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Find places whose name matches `spec` inside `area`.
    ///
    /// Returns once every tile is terminal. Tile failures are reported in the
    /// result, never as an error; only an unusable area fails the call.
    pub async fn investigate(
        &self,
        spec: &SearchSpec,
        area: &GeoArea,
        sink: &impl ProgressSink,
    ) -> Result<Investigation> {
        self.run(spec, area, QueryKind::Targeted, sink).await
    }

    /// Collect every named place in `area` that passes the type filters of `spec`.
    pub async fn investigate_broad(
        &self,
        spec: &SearchSpec,
        area: &GeoArea,
        sink: &impl ProgressSink,
    ) -> Result<Investigation> {
        self.run(spec, area, QueryKind::Broad, sink).await
    }

    async fn run(
        &self,
        spec: &SearchSpec,
        area: &GeoArea,
        kind: QueryKind,
        sink: &impl ProgressSink,
    ) -> Result<Investigation> {
        let tiles = self.partitioner.partition(area, self.settings.max_tiles)?;
        let total = tiles.len();

        info!(
            "Area {} is {:.2} square degrees; querying {} tile(s)",
            area,
            area.extent(),
            total
        );

        let mut places = PlaceSet::new();
        let mut failed_tiles = Vec::new();
        let mut records_received = 0usize;

        let mut results = stream::iter(tiles.into_iter().enumerate())
            .map(|(index, tile)| self.fetch_tile(spec, kind, index, total, tile))
            .buffer_unordered(self.settings.concurrency.max(1));

        // Single writer: only this loop touches the place set.
        while let Some(result) = results.next().await {
            let outcome = match result.outcome {
                Ok(records) => {
                    let count = records.len();
                    records_received += count;
                    for record in records {
                        places.insert(normalize(record));
                    }
                    info!("Tile {}/{}: {} elements", result.index + 1, total, count);
                    TileOutcome::Succeeded {
                        records: count,
                        attempts: result.attempts,
                    }
                }
                Err(e) => {
                    warn!("Tile {}/{} failed: {}", result.index + 1, total, e);
                    failed_tiles.push(TileFailure {
                        index: result.index,
                        area: result.area,
                        reason: e.to_string(),
                        transient: e.is_transient(),
                    });
                    TileOutcome::Failed {
                        reason: e.to_string(),
                        attempts: result.attempts,
                    }
                }
            };

            sink.on_tile(&ProgressEvent {
                index: result.index,
                total,
                area: result.area,
                outcome,
            });
        }

        failed_tiles.sort_by_key(|f: &TileFailure| f.index);

        if places.duplicates() > 0 {
            info!("Removed {} duplicate entries", places.duplicates());
        }
        info!(
            "Completed {}/{} tiles successfully",
            total - failed_tiles.len(),
            total
        );

        Ok(Investigation {
            duplicates_removed: places.duplicates(),
            places: places.into_places(),
            tiles_total: total,
            failed_tiles,
            records_received,
        })
    }

    async fn fetch_tile(
        &self,
        spec: &SearchSpec,
        kind: QueryKind,
        index: usize,
        total: usize,
        area: GeoArea,
    ) -> TileResult {
        let query = match kind {
            QueryKind::Targeted => query::build(spec, &area),
            QueryKind::Broad => query::build_broad(spec, &area),
        };
        let timeout = spec.timeout() + self.settings.http_grace;
        let max_attempts = self.retry.attempts();

        let mut state = TileState::Pending;
        let mut attempt = 0;

        loop {
            attempt += 1;
            transition(index, &mut state, TileState::Fetching { attempt });

            let result = self.client.fetch(&query, &area, timeout).await;

            if !self.settings.request_delay.is_zero() {
                tokio::time::sleep(self.settings.request_delay).await;
            }

            match result {
                Ok(records) => {
                    transition(index, &mut state, TileState::Succeeded);
                    return TileResult {
                        index,
                        area,
                        attempts: attempt,
                        outcome: Ok(records),
                    };
                }
                Err(e) if e.is_transient() && attempt < max_attempts => {
                    let wait = self.retry.backoff(attempt);
                    warn!(
                        "Tile {}/{} attempt {}/{} failed: {} (retrying in {:?})",
                        index + 1,
                        total,
                        attempt,
                        max_attempts,
                        e,
                        wait
                    );
                    transition(index, &mut state, TileState::Retrying { attempt });
                    if !wait.is_zero() {
                        tokio::time::sleep(wait).await;
                    }
                }
                Err(e) => {
                    transition(index, &mut state, TileState::Failed);
                    return TileResult {
                        index,
                        area,
                        attempts: attempt,
                        outcome: Err(e),
                    };
                }
            }
        }
    }
}

fn transition(index: usize, state: &mut TileState, next: TileState) {
    debug!("Tile {}: {:?} -> {:?}", index + 1, state, next);
    debug_assert!(!state.is_terminal(), "tile {} left a terminal state", index);
    *state = next;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DetectiveError;
    use crate::models::{GeoPoint, MatchMode, OsmType};
    use crate::pipeline::NoProgress;
    use std::collections::{BTreeMap, HashMap};
    use std::sync::Mutex;

    /// Scripted client: per-area queue of responses, then a default.
    /// Areas given a delay answer only after sleeping that long.
    #[derive(Default)]
    struct ScriptedClient {
        script: Mutex<HashMap<String, Vec<Result<Vec<RawRecord>>>>>,
        delays: HashMap<String, Duration>,
        calls: Mutex<Vec<String>>,
        queries: Mutex<Vec<String>>,
    }

    impl ScriptedClient {
        fn respond(self, area: &GeoArea, responses: Vec<Result<Vec<RawRecord>>>) -> Self {
            self.script
                .lock()
                .unwrap()
                .insert(area.to_string(), responses);
            self
        }

        fn delay(mut self, area: &GeoArea, delay: Duration) -> Self {
            self.delays.insert(area.to_string(), delay);
            self
        }

        fn calls_for(&self, area: &GeoArea) -> usize {
            let key = area.to_string();
            self.calls.lock().unwrap().iter().filter(|c| **c == key).count()
        }
    }

    impl FetchClient for ScriptedClient {
        async fn fetch(
            &self,
            query: &str,
            area: &GeoArea,
            _timeout: Duration,
        ) -> Result<Vec<RawRecord>> {
            let key = area.to_string();
            self.calls.lock().unwrap().push(key.clone());
            self.queries.lock().unwrap().push(query.to_string());
            if let Some(delay) = self.delays.get(&key) {
                tokio::time::sleep(*delay).await;
            }
            let mut script = self.script.lock().unwrap();
            match script.get_mut(&key) {
                Some(queue) if !queue.is_empty() => queue.remove(0),
                _ => Ok(Vec::new()),
            }
        }
    }

    fn node(id: i64, name: &str) -> RawRecord {
        let mut tags = BTreeMap::new();
        tags.insert("name".to_string(), name.to_string());
        RawRecord {
            kind: OsmType::Node,
            id,
            coordinate: Some(GeoPoint { lat: 1.0, lon: 1.0 }),
            tags,
        }
    }

    fn network(area: &GeoArea) -> DetectiveError {
        DetectiveError::Network {
            area: *area,
            message: "connection reset".into(),
        }
    }

    fn settings(concurrency: usize) -> InvestigationSettings {
        InvestigationSettings {
            max_tiles: 16,
            concurrency,
            request_delay: Duration::ZERO,
            http_grace: Duration::ZERO,
        }
    }

    fn investigator(client: ScriptedClient) -> Investigator<ScriptedClient> {
        Investigator::new(client)
            .with_retry(RetryPolicy::immediate(3))
            .with_settings(settings(1))
    }

    fn spec() -> SearchSpec {
        SearchSpec::new("McDonald", MatchMode::Partial).unwrap()
    }

    #[tokio::test]
    async fn test_single_tile_duplicates_collapse() {
        let area = GeoArea::new(13.5, 100.1, 14.2, 100.9).unwrap();
        let client =
            ScriptedClient::default().respond(&area, vec![Ok(vec![node(42, "McDonald's"), node(42, "McDonald's")])]);
        let investigation = investigator(client)
            .investigate(&spec(), &area, &NoProgress)
            .await
            .unwrap();

        assert_eq!(investigation.tiles_total, 1);
        assert_eq!(investigation.places.len(), 1);
        assert_eq!(investigation.places[0].id.osm_id, 42);
        assert_eq!(investigation.records_received, 2);
        assert_eq!(investigation.duplicates_removed, 1);
        assert!(investigation.is_complete());
    }

    #[tokio::test]
    async fn test_duplicates_across_tiles_collapse() {
        let area = GeoArea::new(0.0, 0.0, 2.0, 2.0).unwrap();
        let tiles = Partitioner::default().partition(&area, 16).unwrap();
        assert_eq!(tiles.len(), 4);

        let client = ScriptedClient::default()
            .respond(&tiles[0], vec![Ok(vec![node(42, "Edge"), node(1, "A")])])
            .respond(&tiles[1], vec![Ok(vec![node(42, "Edge"), node(2, "B")])]);

        let investigation = investigator(client)
            .investigate(&spec(), &area, &NoProgress)
            .await
            .unwrap();

        let ids: Vec<i64> = investigation.places.iter().map(|p| p.id.osm_id).collect();
        assert_eq!(ids, vec![42, 1, 2]);
        assert_eq!(investigation.duplicates_removed, 1);
    }

    #[tokio::test]
    async fn test_network_errors_are_retried_then_succeed() {
        let area = GeoArea::new(13.5, 100.1, 14.2, 100.9).unwrap();
        let client = ScriptedClient::default().respond(
            &area,
            vec![Err(network(&area)), Err(network(&area)), Ok(vec![node(1, "A")])],
        );
        let investigator = investigator(client);
        let events = Mutex::new(Vec::new());
        let sink = |event: &ProgressEvent| events.lock().unwrap().push(event.clone());

        let investigation = investigator.investigate(&spec(), &area, &sink).await.unwrap();

        assert_eq!(investigation.places.len(), 1);
        assert_eq!(investigator.client.calls_for(&area), 3);
        let events = events.into_inner().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(
            events[0].outcome,
            TileOutcome::Succeeded {
                records: 1,
                attempts: 3
            }
        );
    }

    #[tokio::test]
    async fn test_service_errors_are_not_retried() {
        let area = GeoArea::new(13.5, 100.1, 14.2, 100.9).unwrap();
        let client = ScriptedClient::default().respond(
            &area,
            vec![Err(DetectiveError::Service {
                area,
                message: "malformed".into(),
            })],
        );
        let investigator = investigator(client);
        let investigation = investigator
            .investigate(&spec(), &area, &NoProgress)
            .await
            .unwrap();

        assert_eq!(investigator.client.calls_for(&area), 1);
        assert_eq!(investigation.failed_count(), 1);
        assert!(!investigation.failed_tiles[0].transient);
        assert!(investigation.places.is_empty());
    }

    #[tokio::test]
    async fn test_partial_failure_keeps_successful_tiles() {
        // 5 x 1 degree strip: five 1x1 tiles
        let area = GeoArea::new(0.0, 0.0, 1.0, 5.0).unwrap();
        let tiles = Partitioner::default().partition(&area, 5).unwrap();
        assert_eq!(tiles.len(), 5);

        let always_down = |t: &GeoArea| vec![Err(network(t)), Err(network(t)), Err(network(t))];
        let client = ScriptedClient::default()
            .respond(&tiles[0], vec![Ok(vec![node(1, "A")])])
            .respond(&tiles[1], always_down(&tiles[1]))
            .respond(&tiles[2], vec![Ok(vec![node(2, "B")])])
            .respond(&tiles[3], always_down(&tiles[3]))
            .respond(&tiles[4], vec![Ok(vec![node(3, "C")])]);

        let investigator = investigator(client).with_settings(InvestigationSettings {
            max_tiles: 5,
            ..settings(3)
        });
        let investigation = investigator
            .investigate(&spec(), &area, &NoProgress)
            .await
            .unwrap();

        assert_eq!(investigation.tiles_total, 5);
        assert_eq!(investigation.failed_count(), 2);
        let failed: Vec<usize> = investigation.failed_tiles.iter().map(|f| f.index).collect();
        assert_eq!(failed, vec![1, 3]);
        assert!(investigation.failed_tiles.iter().all(|f| f.transient));
        assert_eq!(investigation.places.len(), 3);
        assert_eq!(investigator.client.calls_for(&tiles[1]), 3);
    }

    #[tokio::test]
    async fn test_every_tile_reports_progress() {
        let area = GeoArea::new(0.0, 0.0, 2.0, 2.0).unwrap();
        let investigator =
            investigator(ScriptedClient::default()).with_settings(settings(4));
        let events = Mutex::new(Vec::new());
        let sink = |event: &ProgressEvent| events.lock().unwrap().push(event.index);

        investigator.investigate(&spec(), &area, &sink).await.unwrap();

        let mut seen = events.into_inner().unwrap();
        seen.sort();
        assert_eq!(seen, vec![0, 1, 2, 3]);
    }

    #[tokio::test]
    async fn test_progress_follows_completion_order() {
        let area = GeoArea::new(0.0, 0.0, 2.0, 2.0).unwrap();
        let tiles = Partitioner::default().partition(&area, 16).unwrap();
        let client = ScriptedClient::default()
            .delay(&tiles[0], Duration::from_millis(200))
            .respond(&tiles[0], vec![Ok(vec![node(1, "McDonald's")])])
            .respond(&tiles[3], vec![Ok(vec![node(1, "McDonald's")])]);
        let investigator = investigator(client).with_settings(settings(4));

        let events = Mutex::new(Vec::new());
        let sink = |event: &ProgressEvent| events.lock().unwrap().push(event.index);
        let investigation = investigator.investigate(&spec(), &area, &sink).await.unwrap();

        // the slow first tile reports last, and loses the duplicate to tile 3
        let seen = events.into_inner().unwrap();
        assert_eq!(seen.len(), 4);
        assert_eq!(seen.last(), Some(&0));
        assert_eq!(investigation.places.len(), 1);
        assert_eq!(investigation.duplicates_removed, 1);
    }

    #[tokio::test]
    async fn test_broad_search_uses_name_presence_query() {
        let area = GeoArea::new(13.5, 100.1, 14.2, 100.9).unwrap();
        let investigator = investigator(ScriptedClient::default());
        investigator
            .investigate_broad(&spec(), &area, &NoProgress)
            .await
            .unwrap();

        let queries = investigator.client.queries.lock().unwrap();
        assert_eq!(queries.len(), 1);
        assert!(queries[0].contains(r#"node["name"](13.5"#));
        assert!(!queries[0].contains("McDonald"));
    }

    #[tokio::test]
    async fn test_zero_tile_budget_fails_whole_call() {
        let area = GeoArea::new(0.0, 0.0, 2.0, 2.0).unwrap();
        let investigator = investigator(ScriptedClient::default()).with_settings(InvestigationSettings {
            max_tiles: 0,
            ..settings(1)
        });
        let err = investigator
            .investigate(&spec(), &area, &NoProgress)
            .await
            .unwrap_err();
        assert!(matches!(err, DetectiveError::InvalidArea(_)));
        assert!(investigator.client.calls.lock().unwrap().is_empty());
    }
}
