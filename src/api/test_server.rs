//! Minimal HTTP responder for exercising the client over real sockets.

use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

#[derive(Debug, Clone)]
enum Behavior {
  Respond { status: u16, body: String },
  /// Accept the connection, read the request, never answer
  Hang,
}

#[derive(Debug, Clone)]
pub struct RecordedRequest {
  pub method: String,
  pub target: String,
  headers: Vec<(String, String)>,
  pub body: String,
}

impl RecordedRequest {
  pub fn header(&self, name: &str) -> Option<&str> {
    let name = name.to_ascii_lowercase();
    self
      .headers
      .iter()
      .find(|(k, _)| *k == name)
      .map(|(_, v)| v.as_str())
  }
}

pub struct MockServer {
  pub port: u16,
  requests: Arc<Mutex<Vec<RecordedRequest>>>,
  handle: JoinHandle<()>,
}

impl MockServer {
  /// Answer every request with `status` and a JSON `body`.
  pub async fn respond(status: u16, body: impl Into<String>) -> Self {
    Self::start(Behavior::Respond {
      status,
      body: body.into(),
    })
    .await
  }

  pub async fn hang() -> Self {
    Self::start(Behavior::Hang).await
  }

  async fn start(behavior: Behavior) -> Self {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let requests = Arc::new(Mutex::new(Vec::new()));

    let recorded = Arc::clone(&requests);
    let handle = tokio::spawn(async move {
      while let Ok((stream, _)) = listener.accept().await {
        let recorded = Arc::clone(&recorded);
        let behavior = behavior.clone();
        tokio::spawn(async move {
          let _ = serve(stream, behavior, recorded).await;
        });
      }
    });

    Self {
      port,
      requests,
      handle,
    }
  }

  pub fn requests(&self) -> Vec<RecordedRequest> {
    self.requests.lock().unwrap().clone()
  }
}

impl Drop for MockServer {
  fn drop(&mut self) {
    self.handle.abort();
  }
}

/// A local port with nothing listening on it.
pub async fn closed_port() -> u16 {
  let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
  listener.local_addr().unwrap().port()
}

async fn serve(
  mut stream: TcpStream,
  behavior: Behavior,
  recorded: Arc<Mutex<Vec<RecordedRequest>>>,
) -> std::io::Result<()> {
  let mut buf = Vec::new();
  let mut chunk = [0u8; 4096];

  let header_end = loop {
    let n = stream.read(&mut chunk).await?;
    if n == 0 {
      return Ok(());
    }
    buf.extend_from_slice(&chunk[..n]);
    if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
      break pos + 4;
    }
  };

  let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
  let mut lines = head.split("\r\n");
  let mut request_line = lines.next().unwrap_or_default().split_whitespace();
  let method = request_line.next().unwrap_or_default().to_string();
  let target = request_line.next().unwrap_or_default().to_string();

  let headers: Vec<(String, String)> = lines
    .filter_map(|line| line.split_once(':'))
    .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
    .collect();

  let content_length = headers
    .iter()
    .find(|(k, _)| k == "content-length")
    .and_then(|(_, v)| v.parse::<usize>().ok())
    .unwrap_or(0);

  while buf.len() < header_end + content_length {
    let n = stream.read(&mut chunk).await?;
    if n == 0 {
      break;
    }
    buf.extend_from_slice(&chunk[..n]);
  }
  let body = String::from_utf8_lossy(&buf[header_end..]).to_string();

  recorded.lock().unwrap().push(RecordedRequest {
    method,
    target,
    headers,
    body,
  });

  match behavior {
    Behavior::Hang => std::future::pending::<()>().await,
    Behavior::Respond { status, body } => {
      let reason = match status {
        200 => "OK",
        201 => "Created",
        401 => "Unauthorized",
        404 => "Not Found",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Unknown",
      };
      let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        reason,
        body.len(),
        body
      );
      stream.write_all(response.as_bytes()).await?;
      stream.flush().await?;
    }
  }

  Ok(())
}
