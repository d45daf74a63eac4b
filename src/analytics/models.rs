//! Data models for session deduplication and hit aggregation

use chrono::NaiveDate;

/// Identity used to decide whether a request continues an existing session
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct SessionKey {
    pub ip: String,
    pub user_agent: String,
    pub uri: String,
}

impl SessionKey {
    pub fn new(ip: &str, user_agent: &str, uri: &str) -> Self {
        Self {
            ip: ip.to_string(),
            user_agent: user_agent.to_string(),
            uri: uri.to_string(),
        }
    }
}

/// A request that started a new session
///
/// Country resolution happens downstream, so a hit only carries the
/// address it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hit {
    /// Request timestamp truncated to day granularity
    pub date: NaiveDate,

    /// Client IP address as it appeared in the log
    pub ip: String,

    /// Resolved content identifier
    pub uri: String,
}

/// Aggregated hit key for grouping
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct HitKey {
    pub date: NaiveDate,
    pub uri: String,
    pub country: String,
}

impl HitKey {
    /// Create a new hit key from a hit and its resolved country
    pub fn from_hit(hit: &Hit, country: String) -> Self {
        Self {
            date: hit.date,
            uri: hit.uri.clone(),
            country,
        }
    }
}
