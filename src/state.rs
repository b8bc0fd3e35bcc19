use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::analytics::{self, AnalyticsReport, Jitter};
use crate::config::{AnalyticsConfig, Config};
use crate::data::aggregate::Aggregator;
use crate::data::loader::{self, ParseOptions};
use crate::data::model::{DatasetSummary, SummaryId};
use crate::error::IngestError;
use crate::history::{JsonFileHistory, MemoryHistory, SummaryStore};
use crate::rng::SimpleRng;

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// Result of a successful ingestion.
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    /// The summary now stored in the history.
    pub summary: DatasetSummary,
    /// The record pushed out of the history to make room, if any.
    pub evicted: Option<DatasetSummary>,
}

/// The engine behind every front end: ingestion, history and analytics.
///
/// Constructed explicitly and handed to whoever needs it; there is no global
/// instance. All methods take `&self`, so one state can be shared across
/// threads behind an `Arc`.
pub struct AppState {
    parse_options: ParseOptions,
    aggregator: Aggregator,
    store: Arc<dyn SummaryStore>,
    analytics: AnalyticsConfig,
}

impl AppState {
    /// Build a state over an existing store. Ids continue after the highest
    /// id the store has ever accepted, including evicted ones.
    pub fn new(store: Arc<dyn SummaryStore>, config: &Config) -> anyhow::Result<Self> {
        let next_id = store.last_issued().map_or(1, |id| id.0 + 1);

        Ok(Self {
            parse_options: config.ingest.parse_options()?,
            aggregator: Aggregator::starting_at(
                SummaryId(next_id),
                config.ingest.empty_column_policy(),
            ),
            store,
            analytics: config.analytics.clone(),
        })
    }

    /// State backed by the JSON history file named in the configuration.
    pub fn open(config: &Config) -> anyhow::Result<Self> {
        let store = JsonFileHistory::open(&config.history.path, config.history.capacity)?;
        log::debug!(
            "opened history at {} with {} retained datasets",
            store.path().display(),
            store.len()
        );
        Self::new(Arc::new(store), config)
    }

    /// State with a fresh in-memory history.
    pub fn in_memory(config: &Config) -> anyhow::Result<Self> {
        Self::new(
            Arc::new(MemoryHistory::new(config.history.capacity)),
            config,
        )
    }

    /// Parse, summarize and retain an uploaded file.
    pub fn ingest(&self, filename: &str, bytes: &[u8]) -> Result<IngestOutcome, IngestError> {
        self.ingest_at(filename, bytes, Utc::now())
    }

    /// [`ingest`](Self::ingest) with an explicit upload time.
    pub fn ingest_at(
        &self,
        filename: &str,
        bytes: &[u8],
        now: DateTime<Utc>,
    ) -> Result<IngestOutcome, IngestError> {
        let table = loader::parse_with(bytes, self.parse_options)?;
        let summary = self.aggregator.summarize(&table, filename, now)?;
        let evicted = self.store.insert(summary.clone())?;

        log::info!(
            "Ingested '{}' as dataset {} ({} rows)",
            summary.filename(),
            summary.id(),
            summary.total_equipment()
        );

        Ok(IngestOutcome { summary, evicted })
    }

    /// Most recent summaries first, at most `limit`.
    pub fn history(&self, limit: usize) -> Vec<DatasetSummary> {
        self.store.list_recent(limit)
    }

    pub fn latest(&self) -> Option<DatasetSummary> {
        self.store.list_recent(1).into_iter().next()
    }

    pub fn find(&self, id: SummaryId) -> Option<DatasetSummary> {
        self.store.get(id)
    }

    pub fn capacity(&self) -> usize {
        self.store.capacity()
    }

    /// Derived analytics for one summary.
    ///
    /// With a configured seed the jitter depends only on the seed and the
    /// summary id, so repeated calls agree.
    pub fn analyze(&self, summary: &DatasetSummary) -> AnalyticsReport {
        let mut rng = match self.analytics.seed {
            Some(seed) => SimpleRng::new(seed ^ summary.id().0),
            None => SimpleRng::from_clock(),
        };

        let jitter_amplitude = self.analytics.jitter_amplitude;
        let trend = if jitter_amplitude > 0.0 {
            analytics::trend_series(
                summary,
                self.analytics.trend_points,
                Some(Jitter {
                    source: &mut rng,
                    amplitude: jitter_amplitude,
                }),
            )
        } else {
            analytics::trend_series(summary, self.analytics.trend_points, None)
        };

        let scatter = analytics::scatter_sample(summary, &mut rng);

        AnalyticsReport {
            summary_id: summary.id(),
            health_index: analytics::health_index_with(summary, &self.analytics.baselines()),
            correlation: analytics::correlation_matrix(summary),
            trend,
            scatter_fit: analytics::linear_fit(&scatter),
            scatter,
        }
    }
}
