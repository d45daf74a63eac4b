//! Country lookup using MaxMind GeoLite2/GeoIP2 MMDB
//!
//! The enricher only needs a country per hit. A Country or City database
//! both work, since City data is a superset of Country data.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use maxminddb::{geoip2, Mmap, Reader};
use std::net::IpAddr;
use std::sync::Arc;
use tracing::debug;

/// Prefix of ISO 3166-1 alpha-2 country URIs
pub const COUNTRY_URI_PREFIX: &str = "urn:iso:std:3166:-2:";

/// Maps a hit's address and date to a country identifier
///
/// Implementations are total: an address that cannot be placed resolves to
/// an empty identifier rather than an error.
pub trait CountryLookup: Send + Sync {
    fn lookup_country(&self, ip: &str, date: NaiveDate) -> String;
}

/// Render an ISO country code as a country URI
pub fn country_uri(iso_code: &str) -> String {
    format!("{COUNTRY_URI_PREFIX}{iso_code}")
}

/// GeoIP lookup service backed by an optional memory-mapped database
#[derive(Clone)]
pub struct GeoIpService {
    reader: Option<Arc<Reader<Mmap>>>,
}

impl GeoIpService {
    /// Create a new GeoIP service from an MMDB file path
    ///
    /// Without a path every lookup resolves to an empty country.
    pub fn new(path: Option<&str>) -> Result<Self> {
        let reader = if let Some(path) = path {
            let reader = unsafe { Reader::open_mmap(path) }
                .with_context(|| format!("Failed to open GeoIP database at {}", path))?;
            Some(Arc::new(reader))
        } else {
            None
        };

        Ok(Self { reader })
    }

    /// ISO country code for an address, if the database knows it
    pub fn lookup_iso_code(&self, ip: IpAddr) -> Option<String> {
        let reader = self.reader.as_ref()?;
        let result = reader.lookup(ip).ok()?;

        match result.decode::<geoip2::Country>() {
            Ok(Some(country)) => country.country.iso_code.map(|s| s.to_string()),
            _ => None,
        }
    }
}

impl CountryLookup for GeoIpService {
    // MMDB files are snapshots, so the date plays no part in the lookup
    fn lookup_country(&self, ip: &str, _date: NaiveDate) -> String {
        let Ok(addr) = ip.trim().parse::<IpAddr>() else {
            debug!(ip, "unparsable client address, country left empty");
            return String::new();
        };

        match self.lookup_iso_code(addr) {
            Some(code) => country_uri(&code),
            None => {
                debug!(ip, "no country found for address");
                String::new()
            }
        }
    }
}
