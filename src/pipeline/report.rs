use serde::Serialize;
use std::io::Write;

use crate::analytics::{HitCount, HitKey};
use crate::pipeline::PipelineError;

pub const REPORT_HEADERS: [&str; 6] = [
    "measure_id",
    "timestamp",
    "work_uri",
    "country_uri",
    "event_uri",
    "value",
];

#[derive(Debug, Serialize)]
struct ReportRow<'a> {
    measure_id: &'a str,
    timestamp: String,
    work_uri: &'a str,
    country_uri: &'a str,
    event_uri: &'a str,
    value: u64,
}

/// Serializes aggregated hits as measure CSV rows
pub struct ReportWriter<W: Write> {
    writer: csv::Writer<W>,
    measure_uri: String,
}

impl<W: Write> ReportWriter<W> {
    pub fn new(output: W, measure_uri: &str, add_headers: bool) -> Result<Self, PipelineError> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(output);

        if add_headers {
            writer
                .write_record(REPORT_HEADERS)
                .map_err(PipelineError::Report)?;
        }

        Ok(Self {
            writer,
            measure_uri: measure_uri.to_string(),
        })
    }

    pub fn write_row(&mut self, key: &HitKey, value: HitCount) -> Result<(), PipelineError> {
        self.writer
            .serialize(ReportRow {
                measure_id: &self.measure_uri,
                timestamp: key.date.format("%Y-%m-%d").to_string(),
                work_uri: &key.uri,
                country_uri: &key.country,
                event_uri: "",
                value: value.count,
            })
            .map_err(PipelineError::Report)
    }

    pub fn write_all<'a>(
        &mut self,
        rows: impl IntoIterator<Item = &'a (HitKey, HitCount)>,
    ) -> Result<(), PipelineError> {
        for (key, value) in rows {
            self.write_row(key, *value)?;
        }
        Ok(())
    }

    /// Flush buffered rows and hand back the output
    pub fn finish(self) -> Result<W, PipelineError> {
        self.writer
            .into_inner()
            .map_err(|e| PipelineError::Io(e.into_error()))
    }
}
