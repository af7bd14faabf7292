use std::fmt;
use thiserror::Error;

/// The remote operation an error belongs to, used in messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
  CheckConnection,
  FetchTasks,
  CreateTask,
  ToggleTaskStatus,
  FetchFilterOptions,
}

impl fmt::Display for Operation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let s = match self {
      Operation::CheckConnection => "check connection",
      Operation::FetchTasks => "fetch tasks",
      Operation::CreateTask => "create task",
      Operation::ToggleTaskStatus => "toggle task status",
      Operation::FetchFilterOptions => "fetch filter options",
    };
    f.write_str(s)
  }
}

/// Uniform failure value for every remote interaction.
///
/// `Timeout` and `Network` are both transport failures: neither carries a
/// code, and `is_transport` is true for both.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
  /// A response arrived with a non-success status
  #[error("Failed to {operation}: HTTP {status_text}")]
  Http {
    operation: Operation,
    status: u16,
    /// Status line, e.g. "404 Not Found"
    status_text: String,
  },

  /// The request never completed (refused, reset, DNS, ...)
  #[error("Failed to {operation}: Network error ({detail})")]
  Network { operation: Operation, detail: String },

  /// The request did not complete within the deadline and was cancelled
  #[error("Failed to {operation}: Request timed out after {timeout_ms}ms")]
  Timeout { operation: Operation, timeout_ms: u64 },

  /// A 2xx response whose body did not match any accepted shape
  #[error("Failed to {operation}: Unexpected response ({detail})")]
  Decode { operation: Operation, detail: String },

  /// Rejected locally before any request was made
  #[error("{0}")]
  Validation(String),

  #[error("Invalid configuration: {0}")]
  Config(String),
}

impl ApiError {
  /// Human-readable message.
  pub fn message(&self) -> String {
    self.to_string()
  }

  /// Machine-readable code: the HTTP status for `Http`, otherwise none.
  pub fn code(&self) -> Option<String> {
    match self {
      ApiError::Http { status, .. } => Some(status.to_string()),
      _ => None,
    }
  }

  /// True when the transport never completed, whether by timeout or refusal.
  pub fn is_transport(&self) -> bool {
    matches!(self, ApiError::Network { .. } | ApiError::Timeout { .. })
  }

  pub(crate) fn network(operation: Operation, err: &reqwest::Error) -> Self {
    ApiError::Network {
      operation,
      detail: error_chain(err),
    }
  }
}

/// Render an error with its sources, e.g. "error sending request: connection refused".
fn error_chain(err: &dyn std::error::Error) -> String {
  let mut message = err.to_string();
  let mut source = err.source();
  while let Some(cause) = source {
    let cause_text = cause.to_string();
    if !message.contains(&cause_text) {
      message.push_str(": ");
      message.push_str(&cause_text);
    }
    source = cause.source();
  }
  message
}
