//! TaskNotes client that falls back to the last snapshot when the API is unreachable.

use color_eyre::Result;
use tracing::warn;

use crate::cache::{CacheResult, SqliteStorage, TaskCache};
use crate::config::Config;

use super::client::TaskNotesClient;
use super::error::ApiError;
use super::filter::TaskFilter;
use super::types::{ConnectionStatus, FilterOptions, Task, TaskCreateInput};

/// TaskNotes client with a degraded read-only mode.
///
/// This wraps `TaskNotesClient` and provides the same API. List reads refresh
/// the snapshot on success and are served from it on failure, annotated with
/// its age. Writes always go to the API.
#[derive(Clone)]
pub struct CachedTaskNotesClient {
  inner: TaskNotesClient,
  cache: TaskCache,
}

impl CachedTaskNotesClient {
  /// Create a client backed by the configured (or default) cache database.
  pub fn new(config: &Config) -> Result<Self> {
    let storage = match &config.cache.path {
      Some(path) => SqliteStorage::open(path)?,
      None => SqliteStorage::open_default()?,
    };
    let cache = TaskCache::new(storage).with_ttl(config.cache.ttl());

    Ok(Self::with_cache(config, cache)?)
  }

  pub fn with_cache(config: &Config, cache: TaskCache) -> Result<Self, ApiError> {
    let inner = TaskNotesClient::new(config)?.with_cache(cache.clone());
    Ok(Self { inner, cache })
  }

  pub fn client(&self) -> &TaskNotesClient {
    &self.inner
  }

  pub fn cache(&self) -> &TaskCache {
    &self.cache
  }

  /// Fetch tasks, serving the snapshot if the API call fails.
  ///
  /// The original error is returned only when there is no snapshot to serve.
  pub async fn fetch_tasks(
    &self,
    filter: Option<&TaskFilter>,
  ) -> Result<CacheResult<Vec<Task>>, ApiError> {
    let err = match self.inner.fetch_tasks(filter).await {
      Ok(tasks) => return Ok(CacheResult::from_network(tasks)),
      Err(err) => err,
    };

    let (Some(cached), Some(cached_at)) = (self.cache.get_cached_tasks(), self.cache.cached_at())
    else {
      return Err(err);
    };

    warn!(error = %err, cached_at = %cached_at, "API unavailable, serving cached tasks");
    let tasks = match filter {
      Some(filter) => filter.apply(cached, self.inner.completed_statuses()),
      None => cached,
    };
    let is_stale = !self.cache.is_cache_valid();

    Ok(CacheResult::from_cache(tasks, cached_at, is_stale))
  }

  pub async fn check_connection(&self) -> ConnectionStatus {
    self.inner.check_connection().await
  }

  /// Create a task (not cached - write operation).
  pub async fn create_task(&self, input: &TaskCreateInput) -> Result<Task, ApiError> {
    self.inner.create_task(input).await
  }

  /// Toggle task status (not cached - write operation).
  pub async fn toggle_task_status(&self, id: &str) -> Result<Task, ApiError> {
    self.inner.toggle_task_status(id).await
  }

  /// Get filter options (not cached - small and only useful online).
  pub async fn fetch_filter_options(&self) -> Result<FilterOptions, ApiError> {
    self.inner.fetch_filter_options().await
  }
}
