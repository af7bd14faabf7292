use reqwest::RequestBuilder;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::cache::TaskCache;
use crate::config::Config;

use super::error::{ApiError, Operation};
use super::filter::{FilterMode, TaskFilter};
use super::types::{ConnectionStatus, FilterOptions, Task, TaskCreateInput};
use super::wire::{decode, ApiFilterOptions, ApiTaskList, ApiTaskPayload};

/// TaskNotes API client.
///
/// Every call is single-shot and bounded by `timeout`; retrying is up to the caller.
#[derive(Clone)]
pub struct TaskNotesClient {
  http: reqwest::Client,
  base_url: Url,
  token: Option<String>,
  timeout: Duration,
  filter_mode: FilterMode,
  completed_statuses: Vec<String>,
  /// Receives every successful list fetch
  cache: Option<TaskCache>,
}

impl TaskNotesClient {
  pub fn new(config: &Config) -> Result<Self, ApiError> {
    let raw_url = config.api.base_url();
    let base_url = Url::parse(&raw_url)
      .map_err(|e| ApiError::Config(format!("invalid API address {}: {}", raw_url, e)))?;
    if base_url.cannot_be_a_base() {
      return Err(ApiError::Config(format!(
        "invalid API address {}",
        raw_url
      )));
    }

    let http = reqwest::Client::builder()
      .build()
      .map_err(|e| ApiError::Config(format!("failed to create HTTP client: {}", e)))?;

    Ok(Self {
      http,
      base_url,
      token: config
        .api
        .token
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from),
      timeout: config.api.timeout(),
      filter_mode: config.api.filter_mode,
      completed_statuses: config.completed_statuses.clone(),
      cache: None,
    })
  }

  /// Write successful list fetches to `cache`.
  pub fn with_cache(mut self, cache: TaskCache) -> Self {
    self.cache = Some(cache);
    self
  }

  pub fn base_url(&self) -> &Url {
    &self.base_url
  }

  pub fn completed_statuses(&self) -> &[String] {
    &self.completed_statuses
  }

  /// Probe the API with a one-item list request.
  ///
  /// Connectivity failures are reported in the returned status, not as errors.
  pub async fn check_connection(&self) -> ConnectionStatus {
    let mut url = self.endpoint(&["api", "tasks"]);
    url.query_pairs_mut().append_pair("limit", "1");
    debug!(url = %url, "Checking connection");

    match self
      .execute(Operation::CheckConnection, self.http.get(url))
      .await
    {
      Ok(_) => ConnectionStatus::connected(),
      Err(ApiError::Http { status, .. }) => ConnectionStatus::disconnected(format!("HTTP {}", status)),
      Err(e) => ConnectionStatus::disconnected(e.message()),
    }
  }

  /// Fetch tasks, filtered according to the configured filter mode.
  ///
  /// On success the returned list replaces the cached snapshot.
  pub async fn fetch_tasks(&self, filter: Option<&TaskFilter>) -> Result<Vec<Task>, ApiError> {
    let operation = Operation::FetchTasks;
    let mut url = self.endpoint(&["api", "tasks"]);

    if let Some(filter) = filter {
      let pairs = filter.query_pairs();
      if self.filter_mode.sends_query() && !pairs.is_empty() {
        url.query_pairs_mut().extend_pairs(pairs);
      }
    }
    debug!(url = %url, "Fetching tasks");

    let body = self.execute(operation, self.http.get(url)).await?;
    let mut tasks = decode::<ApiTaskList>(operation, &body)?.into_tasks();

    if let Some(filter) = filter {
      let local = if self.filter_mode.filters_locally() {
        filter.clone()
      } else {
        filter.local_only()
      };
      tasks = local.apply(tasks, &self.completed_statuses);
    }

    if let Some(cache) = &self.cache {
      if let Err(e) = cache.set_cached_tasks(&tasks) {
        warn!(error = %e, "Failed to update task cache");
      }
    }

    debug!(count = tasks.len(), "Fetched tasks");
    Ok(tasks)
  }

  /// Create a task. Blank titles are rejected without contacting the API.
  pub async fn create_task(&self, input: &TaskCreateInput) -> Result<Task, ApiError> {
    let operation = Operation::CreateTask;
    let title = input.title.trim();
    if title.is_empty() {
      return Err(ApiError::Validation("Title is required".to_string()));
    }

    let input = TaskCreateInput {
      title: title.to_string(),
      ..input.clone()
    };
    let url = self.endpoint(&["api", "tasks"]);
    debug!(url = %url, title = %input.title, "Creating task");

    let body = self
      .execute(operation, self.http.post(url).json(&input))
      .await?;
    Ok(decode::<ApiTaskPayload>(operation, &body)?.into_task())
  }

  /// Toggle a task between its open and completed states.
  pub async fn toggle_task_status(&self, id: &str) -> Result<Task, ApiError> {
    let operation = Operation::ToggleTaskStatus;
    if id.is_empty() {
      return Err(ApiError::Validation("Task id is required".to_string()));
    }

    let url = self.endpoint(&["api", "tasks", id, "toggle-status"]);
    debug!(url = %url, "Toggling task status");

    let body = self.execute(operation, self.http.post(url)).await?;
    Ok(decode::<ApiTaskPayload>(operation, &body)?.into_task())
  }

  /// Get the projects, tags and priority vocabulary known to the vault.
  pub async fn fetch_filter_options(&self) -> Result<FilterOptions, ApiError> {
    let operation = Operation::FetchFilterOptions;
    let url = self.endpoint(&["api", "filter-options"]);
    debug!(url = %url, "Fetching filter options");

    let body = self.execute(operation, self.http.get(url)).await?;
    Ok(decode::<ApiFilterOptions>(operation, &body)?.into_options())
  }

  /// Build a URL from path segments; each segment is percent-encoded.
  fn endpoint(&self, segments: &[&str]) -> Url {
    let mut url = self.base_url.clone();
    // Checked in `new`: the base URL can always carry a path
    if let Ok(mut path) = url.path_segments_mut() {
      path.pop_if_empty().extend(segments);
    }
    url
  }

  fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
    match &self.token {
      Some(token) => request.bearer_auth(token),
      None => request,
    }
  }

  /// Send a request and read a successful body, all within the timeout.
  ///
  /// When the deadline passes the request future is dropped, which aborts
  /// the exchange and releases its connection.
  async fn execute(
    &self,
    operation: Operation,
    request: RequestBuilder,
  ) -> Result<Vec<u8>, ApiError> {
    let request = self.authorize(request);

    match tokio::time::timeout(self.timeout, exchange(operation, request)).await {
      Ok(result) => result,
      Err(_) => {
        let timeout_ms = self.timeout.as_millis() as u64;
        debug!(%operation, timeout_ms, "Request timed out");
        Err(ApiError::Timeout {
          operation,
          timeout_ms,
        })
      }
    }
  }
}

async fn exchange(operation: Operation, request: RequestBuilder) -> Result<Vec<u8>, ApiError> {
  let response = request
    .send()
    .await
    .map_err(|e| ApiError::network(operation, &e))?;

  let status = response.status();
  debug!(%operation, status = status.as_u16(), "Response received");
  if !status.is_success() {
    return Err(ApiError::Http {
      operation,
      status: status.as_u16(),
      status_text: status.to_string(),
    });
  }

  let body = response
    .bytes()
    .await
    .map_err(|e| ApiError::network(operation, &e))?;
  Ok(body.to_vec())
}
