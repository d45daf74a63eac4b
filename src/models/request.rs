use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Fixed timestamp format of the access log
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One input CSV row, as read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLogLine {
    pub timestamp: String,
    pub ip: String,
    pub url: String,
    pub user_agent: String,
}

/// A log line after its URL has been resolved to content identifiers
#[derive(Debug, Clone)]
pub struct NormalizedRequest {
    pub timestamp: NaiveDateTime,
    pub ip: String,
    pub identifiers: Vec<Identifier>,
    pub user_agent: String,
}

/// One canonical content reference returned by the identifier resolver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identifier {
    #[serde(rename = "URI")]
    pub uri: String,

    /// Whatever else the resolver sent along with the URI
    #[serde(flatten)]
    pub metadata: Map<String, Value>,
}

impl Identifier {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            metadata: Map::new(),
        }
    }
}
