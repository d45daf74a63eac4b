//! End-to-end pipeline tests with in-process collaborators
//!
//! These tests run whole CSV inputs through `Pipeline` and the report
//! writer, with deterministic resolver and country lookups.

use async_trait::async_trait;
use chrono::NaiveDate;
use readership::analytics::{CountryLookup, HitKey};
use readership::config::SessionConfig;
use readership::models::Identifier;
use readership::pipeline::{Pipeline, PipelineError, ReportWriter};
use readership::resolver::{IdentifierResolver, ResolveError, ResolveResult};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

const MEASURE: &str = "https://metrics.example/measures/sessions/v1";

/// Resolver with a fixed URL table that records every call it receives
#[derive(Default)]
struct TableResolver {
    table: HashMap<String, Vec<String>>,
    calls: Mutex<Vec<String>>,
}

impl TableResolver {
    fn with(entries: Vec<(&str, Vec<&str>)>) -> Self {
        Self {
            table: entries
                .into_iter()
                .map(|(url, uris)| (url.to_string(), uris.into_iter().map(String::from).collect()))
                .collect(),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn calls_for(&self, url: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| *c == url).count()
    }
}

#[async_trait]
impl IdentifierResolver for TableResolver {
    async fn resolve(&self, url: &str) -> ResolveResult<Vec<Identifier>> {
        self.calls.lock().unwrap().push(url.to_string());
        match self.table.get(url) {
            Some(uris) => Ok(uris.iter().map(Identifier::new).collect()),
            None => Err(ResolveError::NotFound),
        }
    }
}

/// Country by first octet, counting lookups
#[derive(Default)]
struct OctetCountry {
    lookups: AtomicUsize,
}

impl CountryLookup for OctetCountry {
    fn lookup_country(&self, ip: &str, _date: NaiveDate) -> String {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        match ip.split('.').next() {
            Some("81") => "urn:iso:std:3166:-2:GB".to_string(),
            Some("90") => "urn:iso:std:3166:-2:FR".to_string(),
            _ => String::new(),
        }
    }
}

fn session(timeout_secs: i64, rollover: bool) -> SessionConfig {
    SessionConfig {
        timeout_secs,
        rollover,
    }
}

async fn report(pipeline: Pipeline, input: &str, add_headers: bool) -> Result<String, PipelineError> {
    let mut output = pipeline.run(input.as_bytes()).await?;
    let mut writer = ReportWriter::new(Vec::new(), MEASURE, add_headers)?;
    writer.write_all(output.hits.drain().iter())?;
    Ok(String::from_utf8(writer.finish()?).unwrap())
}

#[tokio::test]
async fn fixed_window_scenario_counts_twice() {
    let resolver = Arc::new(TableResolver::with(vec![("https://press.example/book", vec!["X"])]));
    let pipeline = Pipeline::new(
        resolver,
        Default::default(),
        Arc::new(OctetCountry::default()),
        &session(1800, false),
    );

    // t0, t0+60s, t0+2400s
    let input = "\
2024-05-01 08:00:00,81.2.69.160,https://press.example/book,U
2024-05-01 08:01:00,81.2.69.160,https://press.example/book,U
2024-05-01 08:40:00,81.2.69.160,https://press.example/book,U
";
    let output = pipeline.run(input.as_bytes()).await.unwrap();

    assert_eq!(output.stats.hits_emitted, 2);
    let key = HitKey {
        date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
        uri: "X".to_string(),
        country: "urn:iso:std:3166:-2:GB".to_string(),
    };
    assert_eq!(output.hits.get(&key).map(|v| v.count), Some(2));
}

#[tokio::test]
async fn rollover_scenario_counts_once() {
    let resolver = Arc::new(TableResolver::with(vec![("https://press.example/book", vec!["X"])]));
    let pipeline = Pipeline::new(
        resolver,
        Default::default(),
        Arc::new(OctetCountry::default()),
        &session(1800, true),
    );

    // t0, t0+1700s, t0+3300s
    let input = "\
2024-05-01 08:00:00,81.2.69.160,https://press.example/book,U
2024-05-01 08:28:20,81.2.69.160,https://press.example/book,U
2024-05-01 08:55:00,81.2.69.160,https://press.example/book,U
";
    let output = pipeline.run(input.as_bytes()).await.unwrap();

    assert_eq!(output.stats.hits_emitted, 1);
    assert_eq!(output.hits.total(), 1);
}

#[tokio::test]
async fn distinct_hits_with_same_key_are_summed() {
    let resolver = Arc::new(TableResolver::with(vec![("https://press.example/book", vec!["X"])]));
    let pipeline = Pipeline::new(
        resolver,
        Default::default(),
        Arc::new(OctetCountry::default()),
        &session(1800, false),
    );

    // Two visitors from the same country on the same day
    let input = "\
2024-05-01 08:00:00,81.2.69.160,https://press.example/book,U
2024-05-01 19:00:00,81.2.69.161,https://press.example/book,U
";
    let out = report(pipeline, input, false).await.unwrap();

    assert_eq!(out, format!("{MEASURE},2024-05-01,X,urn:iso:std:3166:-2:GB,,2\n"));
}

#[tokio::test]
async fn repeated_urls_are_resolved_once_per_run() {
    let resolver = Arc::new(TableResolver::with(vec![
        ("https://press.example/a", vec!["A"]),
        ("https://press.example/b", vec!["B"]),
    ]));
    let pipeline = Pipeline::new(
        resolver.clone(),
        Default::default(),
        Arc::new(OctetCountry::default()),
        &session(1800, false),
    );

    let input = "\
2024-05-01 08:00:00,81.2.69.160,https://press.example/a,U
2024-05-01 08:00:01,90.1.1.1,https://press.example/b,U
2024-05-01 08:00:02,81.2.69.160,https://press.example/a,V
2024-05-02 08:00:03,90.1.1.1,https://press.example/a,U
";
    pipeline.run(input.as_bytes()).await.unwrap();

    assert_eq!(resolver.calls_for("https://press.example/a"), 1);
    assert_eq!(resolver.calls_for("https://press.example/b"), 1);
}

#[tokio::test]
async fn fresh_pipelines_do_not_share_state() {
    let resolver = Arc::new(TableResolver::with(vec![("https://press.example/a", vec!["A"])]));
    let input = "2024-05-01 08:00:00,81.2.69.160,https://press.example/a,U\n";

    for _ in 0..2 {
        let pipeline = Pipeline::new(
            resolver.clone(),
            Default::default(),
            Arc::new(OctetCountry::default()),
            &session(1800, false),
        );
        let output = pipeline.run(input.as_bytes()).await.unwrap();
        assert_eq!(output.stats.hits_emitted, 1);
    }

    // Each run owns its own resolver cache
    assert_eq!(resolver.calls_for("https://press.example/a"), 2);
}

#[tokio::test]
async fn excluded_urls_contribute_nothing() {
    let resolver = Arc::new(TableResolver::with(vec![("https://press.example/a", vec!["A"])]));
    let pipeline = Pipeline::new(
        resolver.clone(),
        ["https://press.example/favicon.ico".to_string()].into_iter().collect(),
        Arc::new(OctetCountry::default()),
        &session(1800, false),
    );

    let input = "\
2024-05-01 08:00:00,81.2.69.160,https://press.example/favicon.ico,U
2024-05-01 08:00:00,81.2.69.160,https://press.example/a,U
";
    let output = pipeline.run(input.as_bytes()).await.unwrap();

    assert_eq!(output.stats.rows_excluded, 1);
    assert_eq!(output.hits.len(), 1);
    assert_eq!(resolver.calls_for("https://press.example/favicon.ico"), 0);
}

#[tokio::test]
async fn each_identifier_is_a_separate_session() {
    let resolver = Arc::new(TableResolver::with(vec![(
        "https://press.example/book",
        vec!["info:doi:10.1/book", "urn:isbn:9781"],
    )]));
    let geo = Arc::new(OctetCountry::default());
    let pipeline = Pipeline::new(resolver, Default::default(), geo.clone(), &session(1800, false));

    let input = "\
2024-05-01 08:00:00,90.1.1.1,https://press.example/book,U
2024-05-01 08:05:00,90.1.1.1,https://press.example/book,U
";
    let out = report(pipeline, input, true).await.unwrap();

    assert_eq!(
        out,
        format!(
            "measure_id,timestamp,work_uri,country_uri,event_uri,value\n\
             {MEASURE},2024-05-01,info:doi:10.1/book,urn:iso:std:3166:-2:FR,,1\n\
             {MEASURE},2024-05-01,urn:isbn:9781,urn:iso:std:3166:-2:FR,,1\n"
        )
    );
    // Only accepted hits are enriched
    assert_eq!(geo.lookups.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn output_follows_first_seen_key_order() {
    let resolver = Arc::new(TableResolver::with(vec![
        ("https://press.example/a", vec!["A"]),
        ("https://press.example/b", vec!["B"]),
    ]));
    let pipeline = Pipeline::new(
        resolver,
        Default::default(),
        Arc::new(OctetCountry::default()),
        &session(1800, false),
    );

    let input = "\
2024-05-02 08:00:00,90.1.1.1,https://press.example/b,U
2024-05-01 08:00:00,81.2.69.160,https://press.example/a,U
2024-05-02 09:00:00,10.0.0.1,https://press.example/b,U
2024-05-02 10:00:00,90.1.1.2,https://press.example/b,U
";
    let out = report(pipeline, input, false).await.unwrap();
    let keys: Vec<String> = out
        .lines()
        .map(|line| {
            let fields: Vec<&str> = line.split(',').collect();
            format!("{} {} {} {}", fields[1], fields[2], fields[3], fields[5])
        })
        .collect();

    assert_eq!(
        keys,
        vec![
            "2024-05-02 B urn:iso:std:3166:-2:FR 2",
            "2024-05-01 A urn:iso:std:3166:-2:GB 1",
            "2024-05-02 B  1",
        ]
    );
}

#[tokio::test]
async fn bad_timestamp_aborts_without_output() {
    let resolver = Arc::new(TableResolver::with(vec![("https://press.example/a", vec!["A"])]));
    let pipeline = Pipeline::new(
        resolver,
        Default::default(),
        Arc::new(OctetCountry::default()),
        &session(1800, false),
    );

    let input = "\
2024-05-01 08:00:00,81.2.69.160,https://press.example/a,U
01/05/2024 08:00,81.2.69.160,https://press.example/a,U
";
    let err = report(pipeline, input, true).await.unwrap_err();
    assert!(matches!(err, PipelineError::InvalidTimestamp { line: 2, .. }));
}

#[tokio::test]
async fn unresolvable_url_reports_diagnostic() {
    let resolver = Arc::new(TableResolver::default());
    let pipeline = Pipeline::new(
        resolver,
        Default::default(),
        Arc::new(OctetCountry::default()),
        &session(1800, false),
    );

    let input = "2024-05-01 08:00:00,81.2.69.160,https://press.example/gone,U\n";
    let err = pipeline.run(input.as_bytes()).await.unwrap_err();

    assert_eq!(
        err.to_string(),
        "No identifiers found: https://press.example/gone (2024-05-01 08:00:00)"
    );
}
