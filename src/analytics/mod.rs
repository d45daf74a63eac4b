//! Readership analytics
//!
//! Session deduplication, country enrichment and hit aggregation. None of
//! these touch the network; the identifier resolver lives in `resolver`.

pub mod aggregator;
pub mod geoip;
pub mod models;
pub mod sessions;

pub use aggregator::{HitAggregator, HitCount};
pub use geoip::{country_uri, CountryLookup, GeoIpService};
pub use models::{Hit, HitKey, SessionKey};
pub use sessions::SessionDeduplicator;
