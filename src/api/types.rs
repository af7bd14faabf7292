//! Domain types shared by the client, the cache and the CLI.
//!
//! These are the canonical shapes. Wire-format variations are absorbed in
//! `wire.rs` before anything reaches these types.

use serde::{Deserialize, Serialize};

/// A task tracked by TaskNotes.
///
/// Also the persisted cache format, hence the camelCase field names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
  pub id: String,
  /// Vault-relative path of the task note
  #[serde(default)]
  pub path: String,
  pub title: String,
  /// Open-ended lifecycle status, e.g. "open", "in-progress", "done"
  pub status: String,
  /// Priority label from the vault's configured vocabulary
  #[serde(default)]
  pub priority: String,
  pub due: Option<String>,
  pub scheduled: Option<String>,
  #[serde(default)]
  pub contexts: Vec<String>,
  #[serde(default)]
  pub projects: Vec<String>,
  #[serde(default)]
  pub tags: Vec<String>,
  #[serde(default)]
  pub date_created: String,
  #[serde(default)]
  pub date_modified: String,
  #[serde(default)]
  pub archived: bool,
}

impl Task {
  /// Whether the task's status is one of `completed_statuses`.
  pub fn is_completed(&self, completed_statuses: &[String]) -> bool {
    completed_statuses.iter().any(|s| *s == self.status)
  }
}

/// Body of a create request. Only the title is required.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskCreateInput {
  pub title: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub due: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub scheduled: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub priority: Option<String>,
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub tags: Vec<String>,
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub projects: Vec<String>,
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub contexts: Vec<String>,
}

impl TaskCreateInput {
  pub fn new(title: impl Into<String>) -> Self {
    Self {
      title: title.into(),
      ..Default::default()
    }
  }
}

/// One entry of the priority vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PriorityOption {
  pub id: String,
  pub value: String,
  pub label: String,
  #[serde(default)]
  pub color: String,
  #[serde(default)]
  pub weight: i32,
}

/// Values available for filtering, as reported by the API.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterOptions {
  pub projects: Vec<String>,
  pub tags: Vec<String>,
  pub priorities: Vec<PriorityOption>,
}

/// Outcome of a connectivity probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionStatus {
  pub connected: bool,
  /// HTTP status or transport error when not connected
  pub error: Option<String>,
}

impl ConnectionStatus {
  pub fn connected() -> Self {
    Self {
      connected: true,
      error: None,
    }
  }

  pub fn disconnected(error: impl Into<String>) -> Self {
    Self {
      connected: false,
      error: Some(error.into()),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_is_completed_uses_configured_statuses() {
    let task: Task =
      serde_json::from_str(r#"{"id":"1","title":"t","status":"cancelled","due":null,"scheduled":null}"#)
        .unwrap();
    assert!(!task.is_completed(&["done".to_string()]));
    assert!(task.is_completed(&["done".to_string(), "cancelled".to_string()]));
  }

  #[test]
  fn test_create_input_omits_absent_fields() {
    let body = serde_json::to_value(TaskCreateInput::new("Buy milk")).unwrap();
    assert_eq!(body, serde_json::json!({ "title": "Buy milk" }));
  }

  #[test]
  fn test_create_input_includes_optional_fields() {
    let input = TaskCreateInput {
      due: Some("2025-03-01".to_string()),
      tags: vec!["errand".to_string()],
      ..TaskCreateInput::new("Buy milk")
    };
    let body = serde_json::to_value(input).unwrap();
    assert_eq!(
      body,
      serde_json::json!({ "title": "Buy milk", "due": "2025-03-01", "tags": ["errand"] })
    );
  }

  #[test]
  fn test_task_serializes_camel_case() {
    let task = Task {
      id: "1".to_string(),
      path: "a.md".to_string(),
      title: "t".to_string(),
      status: "open".to_string(),
      priority: "high".to_string(),
      due: None,
      scheduled: None,
      contexts: vec![],
      projects: vec![],
      tags: vec![],
      date_created: "c".to_string(),
      date_modified: "m".to_string(),
      archived: false,
    };
    let value = serde_json::to_value(&task).unwrap();
    assert_eq!(value["dateCreated"], "c");
    assert_eq!(value["dateModified"], "m");
  }
}
