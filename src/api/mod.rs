//! Client for the TaskNotes local HTTP API.

pub mod cached_client;
pub mod client;
mod error;
mod filter;
pub mod types;
mod wire;

#[cfg(test)]
mod test_server;

pub use cached_client::CachedTaskNotesClient;
pub use client::TaskNotesClient;
pub use error::{ApiError, Operation};
pub use filter::{FilterMode, TaskFilter};
pub use types::{ConnectionStatus, FilterOptions, PriorityOption, Task, TaskCreateInput};
