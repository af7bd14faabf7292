use clap::{Args as ClapArgs, Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use tasknotes::api::{CachedTaskNotesClient, Task, TaskCreateInput, TaskFilter};
use tasknotes::cache::{CacheResult, CacheSource};
use tasknotes::config::{self, ApiConfig, Config};

#[derive(Parser, Debug)]
#[command(name = "tasknotes")]
#[command(about = "View, filter, create and complete TaskNotes tasks")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/tasknotes/config.yaml)
  #[arg(short, long, global = true)]
  config: Option<PathBuf>,

  /// TaskNotes API port
  #[arg(short, long, global = true)]
  port: Option<u16>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Check that the TaskNotes API is reachable and refresh the local snapshot
  Check {
    /// Extra attempts when the API cannot be reached
    #[arg(long, default_value_t = 0)]
    retries: u32,
  },
  /// List tasks (open tasks unless --completed or --all)
  List(ListArgs),
  /// Create a task
  Add(AddArgs),
  /// Toggle tasks between open and completed
  Toggle {
    #[arg(required = true)]
    ids: Vec<String>,
  },
  /// Show the projects, tags and priorities known to TaskNotes
  Filters,
  /// Inspect or clear the local task snapshot
  Cache {
    #[command(subcommand)]
    action: CacheAction,
  },
}

#[derive(ClapArgs, Debug)]
struct ListArgs {
  /// Substring of a project reference
  #[arg(long)]
  project: Option<String>,
  /// Exact tag
  #[arg(long)]
  tag: Option<String>,
  /// Exact priority label
  #[arg(long)]
  priority: Option<String>,
  /// Only completed tasks
  #[arg(long, conflicts_with = "all")]
  completed: bool,
  /// Open and completed tasks
  #[arg(long)]
  all: bool,
  /// Case-insensitive title search
  #[arg(short, long)]
  search: Option<String>,
  /// Extra attempts before settling for the cached snapshot
  #[arg(long, default_value_t = 0)]
  retries: u32,
}

impl ListArgs {
  fn filter(&self) -> TaskFilter {
    TaskFilter {
      project: self.project.clone(),
      tag: self.tag.clone(),
      priority: self.priority.clone(),
      completed: if self.all { None } else { Some(self.completed) },
      search: self.search.clone(),
    }
  }
}

#[derive(ClapArgs, Debug)]
struct AddArgs {
  /// Task title
  #[arg(required = true)]
  title: Vec<String>,
  #[arg(long)]
  due: Option<String>,
  #[arg(long)]
  scheduled: Option<String>,
  #[arg(long)]
  priority: Option<String>,
  /// Repeatable
  #[arg(long = "tag")]
  tags: Vec<String>,
  /// Repeatable
  #[arg(long = "project")]
  projects: Vec<String>,
  /// Repeatable
  #[arg(long = "context")]
  contexts: Vec<String>,
}

impl AddArgs {
  fn into_input(self) -> TaskCreateInput {
    TaskCreateInput {
      title: self.title.join(" "),
      due: self.due,
      scheduled: self.scheduled,
      priority: self.priority,
      tags: self.tags,
      projects: self.projects,
      contexts: self.contexts,
    }
  }
}

#[derive(Subcommand, Debug)]
enum CacheAction {
  /// Show what the snapshot holds and how old it is
  Show,
  /// Delete the snapshot
  Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();
  // Logging is best-effort; commands like `cache clear` must still work without it
  let _log_guard = match init_logging() {
    Ok(guard) => Some(guard),
    Err(e) => {
      eprintln!("Logging disabled: {}", e);
      None
    }
  };

  // Load configuration
  let config = Config::load(args.config.as_deref())?;

  // Override port if specified on command line
  let config = if let Some(port) = args.port {
    Config {
      api: ApiConfig { port, ..config.api },
      ..config
    }
  } else {
    config
  };

  let client = CachedTaskNotesClient::new(&config)?;
  info!(base_url = %client.client().base_url(), command = ?args.command, "Starting");

  match args.command {
    Command::Check { retries } => check(&client, retries).await,
    Command::List(list_args) => list(&client, &list_args).await,
    Command::Add(add_args) => add(&client, add_args).await,
    Command::Toggle { ids } => toggle(&client, &ids).await,
    Command::Filters => filters(&client).await,
    Command::Cache { action } => cache(&client, action),
  }
}

/// Log to a file in the data directory; stdout is reserved for command output.
fn init_logging() -> Result<WorkerGuard> {
  let log_dir = config::data_dir()?;
  std::fs::create_dir_all(&log_dir)
    .map_err(|e| eyre!("Failed to create log directory {}: {}", log_dir.display(), e))?;

  let appender = tracing_appender::rolling::never(&log_dir, "tasknotes.log");
  let (writer, guard) = tracing_appender::non_blocking(appender);

  let filter =
    EnvFilter::try_from_env("TASKNOTES_LOG").unwrap_or_else(|_| EnvFilter::new("tasknotes=info"));

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(writer)
    .with_ansi(false)
    .init();

  Ok(guard)
}

async fn check(client: &CachedTaskNotesClient, retries: u32) -> Result<()> {
  let base_url = client.client().base_url().clone();

  let mut attempt = 0;
  let status = loop {
    let status = client.check_connection().await;
    if status.connected || attempt >= retries {
      break status;
    }
    attempt += 1;
    warn!(attempt, retries, error = ?status.error, "Connection check failed, retrying");
  };

  if status.connected {
    println!("Connected to {}", base_url);
    // Refresh the snapshot while we know the API is up
    match client.client().fetch_tasks(None).await {
      Ok(tasks) => println!("Cached {} tasks", tasks.len()),
      Err(e) => eprintln!("Connected, but fetching tasks failed: {}", e),
    }
    return Ok(());
  }

  let error = status.error.unwrap_or_default();
  println!("Not connected to {}: {}", base_url, error);

  let cache = client.cache();
  if cache.is_cache_valid() {
    if let (Some(tasks), Some(cached_at)) = (cache.get_cached_tasks(), cache.cached_at()) {
      let age = chrono::Utc::now() - cached_at;
      println!(
        "Offline snapshot available: {} tasks, {}",
        tasks.len(),
        describe_age(age)
      );
    }
  }

  Err(eyre!("TaskNotes API is not reachable"))
}

async fn list(client: &CachedTaskNotesClient, args: &ListArgs) -> Result<()> {
  let filter = args.filter();

  let mut attempt = 0;
  let result = loop {
    match client.fetch_tasks(Some(&filter)).await {
      Ok(result) if !result.is_degraded() || attempt >= args.retries => break result,
      Err(e) if attempt >= args.retries => return Err(e.into()),
      Ok(_) => warn!(attempt, retries = args.retries, "Fetch failed, snapshot served"),
      Err(e) => warn!(attempt, retries = args.retries, error = %e, "Fetch failed"),
    }
    attempt += 1;
  };

  report_source(&result);
  print_tasks(&result.data, client.client().completed_statuses());
  Ok(())
}

async fn add(client: &CachedTaskNotesClient, args: AddArgs) -> Result<()> {
  let task = client.create_task(&args.into_input()).await?;
  println!("Created \"{}\" ({})", task.title, task.id);
  Ok(())
}

async fn toggle(client: &CachedTaskNotesClient, ids: &[String]) -> Result<()> {
  let results =
    futures::future::join_all(ids.iter().map(|id| client.toggle_task_status(id))).await;

  let mut failed = 0;
  for (id, result) in ids.iter().zip(results) {
    match result {
      Ok(task) => println!("{} -> {}", task.title, task.status),
      Err(e) => {
        failed += 1;
        eprintln!("{}: {}", id, e);
      }
    }
  }

  if failed > 0 {
    return Err(eyre!("{} of {} toggles failed", failed, ids.len()));
  }
  Ok(())
}

async fn filters(client: &CachedTaskNotesClient) -> Result<()> {
  let mut options = client.fetch_filter_options().await?;
  options.priorities.sort_by_key(|p| std::cmp::Reverse(p.weight));

  println!("Projects:");
  for project in &options.projects {
    println!("  {}", project);
  }
  println!("Tags:");
  for tag in &options.tags {
    println!("  {}", tag);
  }
  println!("Priorities:");
  for priority in &options.priorities {
    println!("  {:<12} {}", priority.value, priority.label);
  }
  Ok(())
}

fn cache(client: &CachedTaskNotesClient, action: CacheAction) -> Result<()> {
  let cache = client.cache();
  match action {
    CacheAction::Show => {
      match (cache.get_cached_tasks(), cache.cached_at()) {
        (Some(tasks), Some(cached_at)) => {
          let age = chrono::Utc::now() - cached_at;
          let freshness = if cache.is_cache_valid() { "fresh" } else { "stale" };
          println!(
            "{} tasks, {} ({})",
            tasks.len(),
            describe_age(age),
            freshness
          );
        }
        _ => println!("No cached tasks"),
      }
      Ok(())
    }
    CacheAction::Clear => {
      cache.clear_cache()?;
      println!("Cache cleared");
      Ok(())
    }
  }
}

fn report_source(result: &CacheResult<Vec<Task>>) {
  let Some(age) = result.age() else {
    return;
  };
  let note = match result.source {
    CacheSource::CacheStale => " (stale)",
    _ => "",
  };
  eprintln!(
    "TaskNotes API unavailable; showing cached tasks, {}{}",
    describe_age(age),
    note
  );
}

fn print_tasks(tasks: &[Task], completed_statuses: &[String]) {
  if tasks.is_empty() {
    println!("No tasks found");
    return;
  }

  for task in tasks {
    let mark = if task.is_completed(completed_statuses) {
      "[x]"
    } else {
      "[ ]"
    };
    println!("{} {}", mark, task.title);

    let mut details = vec![task.status.clone()];
    if !task.priority.is_empty() {
      details.push(task.priority.clone());
    }
    if let Some(due) = &task.due {
      details.push(format!("due {}", due));
    }
    if !task.projects.is_empty() {
      details.push(task.projects.join(", "));
    }
    println!("    {}  {}", task.id, details.join(" · "));
  }
}

fn describe_age(age: chrono::Duration) -> String {
  match age.num_minutes() {
    m if m <= 0 => "updated just now".to_string(),
    1 => "updated 1 minute ago".to_string(),
    m => format!("updated {} minutes ago", m),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::atomic::{AtomicUsize, Ordering};
  use std::sync::Arc;
  use tasknotes::cache::{SqliteStorage, TaskCache};
  use tokio::io::{AsyncReadExt, AsyncWriteExt};
  use tokio::net::TcpListener;

  /// Answers every request with 500 and counts them.
  async fn failing_server() -> (u16, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let hits = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&hits);
    tokio::spawn(async move {
      while let Ok((mut stream, _)) = listener.accept().await {
        let counter = Arc::clone(&counter);
        tokio::spawn(async move {
          let mut buf = Vec::new();
          let mut chunk = [0u8; 1024];
          while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
            match stream.read(&mut chunk).await {
              Ok(0) | Err(_) => return,
              Ok(n) => buf.extend_from_slice(&chunk[..n]),
            }
          }
          counter.fetch_add(1, Ordering::SeqCst);
          let response =
            "HTTP/1.1 500 Internal Server Error\r\nContent-Length: 2\r\nConnection: close\r\n\r\n{}";
          let _ = stream.write_all(response.as_bytes()).await;
        });
      }
    });

    (port, hits)
  }

  fn list_args(retries: u32) -> ListArgs {
    ListArgs {
      project: None,
      tag: None,
      priority: None,
      completed: false,
      all: false,
      search: None,
      retries,
    }
  }

  fn client(port: u16, cache: TaskCache) -> CachedTaskNotesClient {
    let mut config = Config::default();
    config.api.port = port;
    CachedTaskNotesClient::with_cache(&config, cache).unwrap()
  }

  #[tokio::test]
  async fn test_list_retries_when_no_snapshot() {
    let (port, hits) = failing_server().await;
    let cache = TaskCache::new(SqliteStorage::open_in_memory().unwrap());

    let err = list(&client(port, cache), &list_args(2)).await.unwrap_err();

    assert_eq!(hits.load(Ordering::SeqCst), 3);
    assert!(err.to_string().contains("500"));
  }

  #[tokio::test]
  async fn test_list_retries_then_serves_snapshot() {
    let (port, hits) = failing_server().await;
    let cache = TaskCache::new(SqliteStorage::open_in_memory().unwrap());
    cache.set_cached_tasks(&[]).unwrap();

    list(&client(port, cache), &list_args(1)).await.unwrap();

    assert_eq!(hits.load(Ordering::SeqCst), 2);
  }

  #[tokio::test]
  async fn test_list_without_retries_tries_once() {
    let (port, hits) = failing_server().await;
    let cache = TaskCache::new(SqliteStorage::open_in_memory().unwrap());

    assert!(list(&client(port, cache), &list_args(0)).await.is_err());
    assert_eq!(hits.load(Ordering::SeqCst), 1);
  }

  #[test]
  fn test_list_filter_defaults_to_open_tasks() {
    assert_eq!(list_args(0).filter().completed, Some(false));
    let all = ListArgs {
      all: true,
      ..list_args(0)
    };
    assert_eq!(all.filter().completed, None);
  }
}
