//! Serde-deserializable types matching TaskNotes API responses.
//!
//! Response bodies come either bare or wrapped in `{"data": ...}`, and task
//! objects have drifted between versions (numeric vs labeled priority,
//! boolean `completed` vs string `status`). Everything is normalized here so
//! the rest of the crate only sees the canonical types.

use serde::{de::DeserializeOwned, Deserialize, Deserializer};

use super::error::{ApiError, Operation};
use super::types::{FilterOptions, PriorityOption, Task};

/// A response payload, bare or nested under `data`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Envelope<T> {
  Wrapped { data: T },
  Bare(T),
}

impl<T> Envelope<T> {
  pub fn into_inner(self) -> T {
    match self {
      Envelope::Wrapped { data } => data,
      Envelope::Bare(inner) => inner,
    }
  }
}

/// Decode a response body through the envelope.
pub fn decode<T: DeserializeOwned>(operation: Operation, body: &[u8]) -> Result<T, ApiError> {
  serde_json::from_slice::<Envelope<T>>(body)
    .map(Envelope::into_inner)
    .map_err(|e| ApiError::Decode {
      operation,
      detail: e.to_string(),
    })
}

/// List payload: a bare array or `{"tasks": [...]}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ApiTaskList {
  Keyed { tasks: Vec<ApiTask> },
  Bare(Vec<ApiTask>),
}

impl ApiTaskList {
  pub fn into_tasks(self) -> Vec<Task> {
    let tasks = match self {
      ApiTaskList::Keyed { tasks } => tasks,
      ApiTaskList::Bare(tasks) => tasks,
    };
    tasks.into_iter().map(ApiTask::into_task).collect()
  }
}

/// Single-task payload: a bare task or `{"task": {...}}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ApiTaskPayload {
  Keyed { task: ApiTask },
  Bare(ApiTask),
}

impl ApiTaskPayload {
  pub fn into_task(self) -> Task {
    match self {
      ApiTaskPayload::Keyed { task } => task.into_task(),
      ApiTaskPayload::Bare(task) => task.into_task(),
    }
  }
}

/// Priority as sent by either schema version.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ApiPriority {
  Label(String),
  Level(serde_json::Number),
}

impl ApiPriority {
  fn into_label(self) -> String {
    match self {
      ApiPriority::Label(label) => label,
      ApiPriority::Level(level) => match (level.as_i64(), level.as_f64()) {
        (Some(int), _) => int.to_string(),
        // 2.0 reads as "2", matching integer levels
        (None, Some(float)) if float.fract() == 0.0 && float.abs() < i64::MAX as f64 => {
          (float as i64).to_string()
        }
        _ => level.to_string(),
      },
    }
  }
}

/// Task object as it appears on the wire.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiTask {
  pub id: String,
  #[serde(default, deserialize_with = "null_as_default")]
  pub path: String,
  pub title: String,
  pub status: Option<String>,
  /// Older payloads carry a boolean instead of a status
  pub completed: Option<bool>,
  pub priority: Option<ApiPriority>,
  pub due: Option<String>,
  pub scheduled: Option<String>,
  #[serde(default, deserialize_with = "null_as_default")]
  pub contexts: Vec<String>,
  #[serde(default, deserialize_with = "null_as_default")]
  pub projects: Vec<String>,
  #[serde(default, deserialize_with = "null_as_default")]
  pub tags: Vec<String>,
  #[serde(default, deserialize_with = "null_as_default")]
  pub date_created: String,
  #[serde(default, deserialize_with = "null_as_default")]
  pub date_modified: String,
  #[serde(default, deserialize_with = "null_as_default")]
  pub archived: bool,
}

/// Filter vocabulary as it appears on the wire.
///
/// All three lists must be present (they may be `null`), so an error body
/// such as `{"success": false, "error": "..."}` is not mistaken for an empty
/// vocabulary.
#[derive(Debug, Deserialize)]
pub struct ApiFilterOptions {
  #[serde(deserialize_with = "null_as_default")]
  pub projects: Vec<String>,
  #[serde(deserialize_with = "null_as_default")]
  pub tags: Vec<String>,
  #[serde(deserialize_with = "null_as_default")]
  pub priorities: Vec<PriorityOption>,
}

impl ApiFilterOptions {
  pub fn into_options(self) -> FilterOptions {
    FilterOptions {
      projects: self.projects,
      tags: self.tags,
      priorities: self.priorities,
    }
  }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
  D: Deserializer<'de>,
  T: Default + Deserialize<'de>,
{
  Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl ApiTask {
  pub fn into_task(self) -> Task {
    let status = match (self.status, self.completed) {
      (Some(status), _) => status,
      (None, Some(true)) => "done".to_string(),
      (None, Some(false)) | (None, None) => "open".to_string(),
    };

    let priority = self
      .priority
      .map(ApiPriority::into_label)
      .unwrap_or_default();

    Task {
      id: self.id,
      path: self.path,
      title: self.title,
      status,
      priority,
      due: self.due,
      scheduled: self.scheduled,
      contexts: self.contexts,
      projects: self.projects,
      tags: self.tags,
      date_created: self.date_created,
      date_modified: self.date_modified,
      archived: self.archived,
    }
  }
}
