//! Session deduplication
//!
//! Decides, per (IP, user agent, identifier), whether a request opens a new
//! session and should be counted, or continues one that was already counted.
//!
//! Two window policies are supported:
//! - fixed: the window is measured from the last *counted* request, so a
//!   burst of closely spaced requests never extends it
//! - rollover: every observed request moves the window forward, so a session
//!   lasts as long as no gap between consecutive requests reaches the timeout

use chrono::{NaiveDateTime, TimeDelta};
use std::collections::HashMap;
use tracing::trace;

use crate::analytics::models::{Hit, SessionKey};
use crate::config::SessionConfig;
use crate::models::NormalizedRequest;

/// Session state machine for one run
pub struct SessionDeduplicator {
    /// Timestamp anchoring the current session window of each key
    last: HashMap<SessionKey, NaiveDateTime>,
    timeout: TimeDelta,
    rollover: bool,
}

impl SessionDeduplicator {
    pub fn new(timeout: TimeDelta, rollover: bool) -> Self {
        Self {
            last: HashMap::new(),
            timeout,
            rollover,
        }
    }

    /// Timeouts beyond the `TimeDelta` range saturate to `TimeDelta::MAX`
    pub fn from_config(config: &SessionConfig) -> Self {
        let timeout = TimeDelta::try_seconds(config.timeout_secs).unwrap_or(TimeDelta::MAX);
        Self::new(timeout, config.rollover)
    }

    /// Hits emitted by one request, one per identifier that opens a session
    ///
    /// The returned iterator is lazy: session state for an identifier is only
    /// updated once the iterator reaches it.
    pub fn observe<'a>(
        &'a mut self,
        request: &'a NormalizedRequest,
    ) -> impl Iterator<Item = Hit> + 'a {
        request.identifiers.iter().filter_map(move |identifier| {
            self.accept(
                &request.ip,
                &request.user_agent,
                &identifier.uri,
                request.timestamp,
            )
        })
    }

    /// Apply the session policy to a single (key, timestamp) observation
    pub fn accept(
        &mut self,
        ip: &str,
        user_agent: &str,
        uri: &str,
        timestamp: NaiveDateTime,
    ) -> Option<Hit> {
        let key = SessionKey::new(ip, user_agent, uri);

        let Some(anchor) = self.last.get_mut(&key) else {
            self.last.insert(key, timestamp);
            return Some(Self::hit(ip, uri, timestamp));
        };

        let prev = *anchor;
        if self.rollover {
            *anchor = timestamp;
        }

        // Out-of-order input yields a negative offset and stays suppressed
        if timestamp - prev < self.timeout {
            trace!(ip, uri, %timestamp, %prev, "request continues session");
            return None;
        }

        if !self.rollover {
            *anchor = timestamp;
        }

        Some(Self::hit(ip, uri, timestamp))
    }

    /// Number of distinct session keys seen so far
    pub fn len(&self) -> usize {
        self.last.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last.is_empty()
    }

    fn hit(ip: &str, uri: &str, timestamp: NaiveDateTime) -> Hit {
        Hit {
            date: timestamp.date(),
            ip: ip.to_string(),
            uri: uri.to_string(),
        }
    }
}
