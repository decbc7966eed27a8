//! When a cached artifact must be checked against, and re-fetched from,
//! its upstream.

use std::time::Duration;

use chrono::{DateTime, Utc};

use depot_core::time::truncate_to_seconds;

/// How an upstream last-modified is compared with the cached one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FreshnessComparator {
    /// Re-fetch only when upstream is newer than the cache.
    #[default]
    StrictlyNewer,
    /// Re-fetch whenever the two timestamps differ.
    Differs,
}

impl FreshnessComparator {
    /// Whether the cached copy is out of date. Compares whole seconds.
    pub fn needs_fetch(&self, upstream: DateTime<Utc>, cached: DateTime<Utc>) -> bool {
        let upstream = truncate_to_seconds(upstream);
        let cached = truncate_to_seconds(cached);
        match self {
            Self::StrictlyNewer => upstream > cached,
            Self::Differs => upstream != cached,
        }
    }
}

impl std::str::FromStr for FreshnessComparator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "strictly_newer" | "newer" => Ok(Self::StrictlyNewer),
            "differs" | "different" => Ok(Self::Differs),
            other => Err(format!("unknown freshness comparator: {other}")),
        }
    }
}

/// Revalidation settings for a proxy store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FreshnessPolicy {
    pub comparator: FreshnessComparator,
    /// How long a successful upstream check stays valid. Zero checks on
    /// every request.
    pub revalidate_after: Duration,
}

impl FreshnessPolicy {
    /// Whether a check performed `elapsed` ago must be repeated.
    pub fn must_revalidate(&self, elapsed: Duration) -> bool {
        self.revalidate_after.is_zero() || elapsed >= self.revalidate_after
    }
}
