//! Task filter criteria and where they are evaluated.

use serde::Deserialize;

use super::types::Task;

/// Where filter criteria are evaluated.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FilterMode {
  /// Fetch the full list and filter locally (the API ignores filter params)
  #[default]
  Client,
  /// Send criteria as query parameters and trust the server's result
  Server,
  /// Send query parameters and also filter locally; safe either way
  Auto,
}

impl FilterMode {
  /// Whether criteria are encoded as query parameters.
  pub fn sends_query(self) -> bool {
    matches!(self, FilterMode::Server | FilterMode::Auto)
  }

  /// Whether the server-capable criteria are re-checked locally.
  pub fn filters_locally(self) -> bool {
    matches!(self, FilterMode::Client | FilterMode::Auto)
  }
}

/// Optional filter criteria. `None` leaves that dimension unfiltered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
  /// Substring of any project reference
  pub project: Option<String>,
  /// Exact tag
  pub tag: Option<String>,
  /// Exact priority label
  pub priority: Option<String>,
  /// Keep only completed (`true`) or only not-completed (`false`) tasks
  pub completed: Option<bool>,
  /// Case-insensitive title substring. Never sent to the server.
  pub search: Option<String>,
}

impl TaskFilter {
  pub fn is_empty(&self) -> bool {
    *self == TaskFilter::default()
  }

  /// Only the criteria that are evaluated client-side regardless of mode.
  pub fn local_only(&self) -> TaskFilter {
    TaskFilter {
      search: self.search.clone(),
      ..Default::default()
    }
  }

  pub fn matches(&self, task: &Task, completed_statuses: &[String]) -> bool {
    if let Some(completed) = self.completed {
      if task.is_completed(completed_statuses) != completed {
        return false;
      }
    }

    if let Some(project) = &self.project {
      if !task.projects.iter().any(|p| p.contains(project.as_str())) {
        return false;
      }
    }

    if let Some(tag) = &self.tag {
      if !task.tags.iter().any(|t| t == tag) {
        return false;
      }
    }

    if let Some(priority) = &self.priority {
      if task.priority != *priority {
        return false;
      }
    }

    if let Some(search) = &self.search {
      if !task.title.to_lowercase().contains(&search.to_lowercase()) {
        return false;
      }
    }

    true
  }

  /// Keep matching tasks, preserving order.
  pub fn apply(&self, tasks: Vec<Task>, completed_statuses: &[String]) -> Vec<Task> {
    if self.is_empty() {
      return tasks;
    }
    tasks
      .into_iter()
      .filter(|t| self.matches(t, completed_statuses))
      .collect()
  }

  /// Query parameters for server-side filtering.
  pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
    let mut pairs = Vec::new();
    if let Some(project) = &self.project {
      pairs.push(("project", project.clone()));
    }
    if let Some(tag) = &self.tag {
      pairs.push(("tag", tag.clone()));
    }
    if let Some(priority) = &self.priority {
      pairs.push(("priority", priority.clone()));
    }
    if let Some(completed) = self.completed {
      pairs.push(("completed", completed.to_string()));
    }
    pairs
  }
}
