use chrono::NaiveDateTime;
use csv::StringRecord;
use std::sync::Arc;
use tracing::debug;

use crate::models::{NormalizedRequest, RawLogLine, TIMESTAMP_FORMAT};
use crate::pipeline::PipelineError;
use crate::resolver::{IdentifierResolver, ResolveError};

impl RawLogLine {
    /// Build a log line from a CSV record of exactly four fields
    pub fn from_record(record: &StringRecord) -> Result<Self, PipelineError> {
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        if record.len() != 4 {
            return Err(PipelineError::MalformedRow {
                line,
                found: record.len(),
            });
        }

        Ok(Self {
            timestamp: record[0].to_string(),
            ip: record[1].to_string(),
            url: record[2].to_string(),
            user_agent: record[3].to_string(),
        })
    }
}

/// Turns raw log lines into requests carrying resolved identifiers
pub struct RecordNormalizer {
    resolver: Arc<dyn IdentifierResolver>,
}

impl RecordNormalizer {
    pub fn new(resolver: Arc<dyn IdentifierResolver>) -> Self {
        Self { resolver }
    }

    /// Normalize one line; `None` means the URL is excluded
    pub async fn normalize(
        &self,
        line: u64,
        raw: RawLogLine,
    ) -> Result<Option<NormalizedRequest>, PipelineError> {
        let timestamp = parse_timestamp(line, &raw.timestamp)?;

        let identifiers = match self.resolver.resolve(&raw.url).await {
            Ok(identifiers) => identifiers,
            Err(ResolveError::Excluded) => {
                debug!(url = %raw.url, "dropping excluded URL");
                return Ok(None);
            }
            Err(e) => {
                return Err(PipelineError::Resolution {
                    message: e.to_string(),
                    url: raw.url,
                    timestamp: raw.timestamp,
                })
            }
        };

        Ok(Some(NormalizedRequest {
            timestamp,
            ip: raw.ip,
            identifiers,
            user_agent: raw.user_agent,
        }))
    }
}

pub fn parse_timestamp(line: u64, value: &str) -> Result<NaiveDateTime, PipelineError> {
    NaiveDateTime::parse_from_str(value.trim(), TIMESTAMP_FORMAT).map_err(|source| {
        PipelineError::InvalidTimestamp {
            line,
            timestamp: value.to_string(),
            source,
        }
    })
}
