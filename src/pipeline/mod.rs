//! Log-to-report pipeline
//!
//! Records are pulled one at a time from the CSV input and pushed through
//! normalization, session deduplication and country enrichment before the
//! next record is read. Only the hit table is materialized, and it is
//! returned once the input is exhausted.

pub mod error;
pub mod normalize;
pub mod report;

pub use error::PipelineError;
pub use normalize::RecordNormalizer;
pub use report::{ReportWriter, REPORT_HEADERS};

use std::collections::HashSet;
use std::io::Read;
use std::sync::Arc;
use tracing::{debug, info};

use crate::analytics::{CountryLookup, HitAggregator, HitKey, SessionDeduplicator};
use crate::config::SessionConfig;
use crate::models::RawLogLine;
use crate::resolver::{CachedResolver, IdentifierResolver};

/// Counters describing one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub rows_read: u64,
    pub rows_excluded: u64,
    pub requests_normalized: u64,
    pub hits_emitted: u64,
}

/// Result of a completed run
#[derive(Debug)]
pub struct PipelineOutput {
    pub hits: HitAggregator,
    pub stats: PipelineStats,
}

/// One run's worth of pipeline state
///
/// Every lookup table (resolver cache, session state, hit table) is owned
/// here, so a fresh `Pipeline` starts from nothing. `run` consumes it.
pub struct Pipeline {
    normalizer: RecordNormalizer,
    sessions: SessionDeduplicator,
    geo: Arc<dyn CountryLookup>,
    hits: HitAggregator,
    stats: PipelineStats,
}

impl Pipeline {
    pub fn new(
        resolver: Arc<dyn IdentifierResolver>,
        excluded_urls: HashSet<String>,
        geo: Arc<dyn CountryLookup>,
        session: &SessionConfig,
    ) -> Self {
        let resolver = Arc::new(CachedResolver::new(resolver, excluded_urls));

        Self {
            normalizer: RecordNormalizer::new(resolver),
            sessions: SessionDeduplicator::from_config(session),
            geo,
            hits: HitAggregator::new(),
            stats: PipelineStats::default(),
        }
    }

    /// Feed a single log line through every stage
    pub async fn process(&mut self, line: u64, raw: RawLogLine) -> Result<(), PipelineError> {
        self.stats.rows_read += 1;

        let Some(request) = self.normalizer.normalize(line, raw).await? else {
            self.stats.rows_excluded += 1;
            return Ok(());
        };
        self.stats.requests_normalized += 1;

        for hit in self.sessions.observe(&request) {
            let country = self.geo.lookup_country(&hit.ip, hit.date);
            self.hits.record(HitKey::from_hit(&hit, country));
            self.stats.hits_emitted += 1;
        }

        Ok(())
    }

    /// Consume headerless four-column CSV until exhausted
    pub async fn run<R: Read>(mut self, input: R) -> Result<PipelineOutput, PipelineError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(input);

        let mut record = csv::StringRecord::new();
        while reader
            .read_record(&mut record)
            .map_err(PipelineError::Input)?
        {
            let raw = RawLogLine::from_record(&record)?;
            let line = record.position().map(|p| p.line()).unwrap_or(0);
            self.process(line, raw).await?;
        }

        debug!(session_keys = self.sessions.len(), "input exhausted");
        info!(
            rows_read = self.stats.rows_read,
            rows_excluded = self.stats.rows_excluded,
            requests = self.stats.requests_normalized,
            hits = self.stats.hits_emitted,
            hit_keys = self.hits.len(),
            "pipeline finished"
        );

        Ok(PipelineOutput {
            hits: self.hits,
            stats: self.stats,
        })
    }
}
