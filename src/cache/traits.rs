//! Result types describing where served data came from.

use chrono::{DateTime, Duration, Utc};

/// Result from a cache-backed fetch, including data and metadata about the source.
#[derive(Debug, Clone)]
pub struct CacheResult<T> {
  /// The actual data
  pub data: T,
  /// Where the data came from
  pub source: CacheSource,
  /// When the data was cached (if from cache)
  pub cached_at: Option<DateTime<Utc>>,
}

impl<T> CacheResult<T> {
  /// Create a new cache result from fresh network data.
  pub fn from_network(data: T) -> Self {
    Self {
      data,
      source: CacheSource::Network,
      cached_at: None,
    }
  }

  /// Create a new cache result from a snapshot served because the network failed.
  pub fn from_cache(data: T, cached_at: DateTime<Utc>, is_stale: bool) -> Self {
    Self {
      data,
      source: if is_stale {
        CacheSource::CacheStale
      } else {
        CacheSource::CacheFresh
      },
      cached_at: Some(cached_at),
    }
  }

  /// True when the data is a fallback snapshot rather than a live response.
  pub fn is_degraded(&self) -> bool {
    self.source != CacheSource::Network
  }

  /// Age of the served data relative to `now`. Network data has no age.
  pub fn age_at(&self, now: DateTime<Utc>) -> Option<Duration> {
    self.cached_at.map(|at| now - at)
  }

  pub fn age(&self) -> Option<Duration> {
    self.age_at(Utc::now())
  }
}

/// Indicates where served data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
  /// Fresh data from network
  Network,
  /// Network failed; snapshot is still within its TTL
  CacheFresh,
  /// Network failed; snapshot is older than its TTL
  CacheStale,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_network_result_has_no_age() {
    let result = CacheResult::from_network(vec![1, 2, 3]);
    assert_eq!(result.source, CacheSource::Network);
    assert!(!result.is_degraded());
    assert_eq!(result.age(), None);
  }

  #[test]
  fn test_cached_result_reports_age() {
    let cached_at = Utc::now() - Duration::minutes(7);
    let result = CacheResult::from_cache("snapshot", cached_at, true);
    assert_eq!(result.source, CacheSource::CacheStale);
    assert!(result.is_degraded());
    assert_eq!(
      result.age_at(cached_at + Duration::minutes(7)),
      Some(Duration::minutes(7))
    );
  }

  #[test]
  fn test_fresh_snapshot_source() {
    let result = CacheResult::from_cache((), Utc::now(), false);
    assert_eq!(result.source, CacheSource::CacheFresh);
  }
}
