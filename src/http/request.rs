//! HTTP request head reading module
//!
//! Reads the request head line by line and extracts the requested resource path.
//! Only the resource-fetch request kind (`GET`) is recognized.

use std::fmt;
use std::io;
use std::time::Duration;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

use crate::logger::Logger;

/// Prefix of the only recognized request line
pub const RESOURCE_FETCH_TOKEN: &str = "GET";

/// Resource name relative to the content root
///
/// Built from the request-line token with one leading `/` removed.
/// No normalization is applied here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourcePath(String);

impl ResourcePath {
    pub fn from_token(token: &str) -> Self {
        Self(token.strip_prefix('/').unwrap_or(token).to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ResourcePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Bounds applied while reading a request head
#[derive(Debug, Clone, Copy)]
pub struct HeadLimits {
    /// Maximum bytes consumed before the head counts as truncated
    pub max_bytes: u64,
    /// Per-line read deadline
    pub read_timeout: Option<Duration>,
}

impl Default for HeadLimits {
    fn default() -> Self {
        Self {
            max_bytes: 8192,
            read_timeout: None,
        }
    }
}

/// What was learned from one request head
#[derive(Debug, Default)]
pub struct RequestHead {
    /// First line of the request, kept for access logging
    pub request_line: Option<String>,
    /// Resource named by the first recognized request line
    pub path: Option<ResourcePath>,
    /// Transport failure that ended the read, timeouts excluded
    pub error: Option<io::Error>,
}

/// Extract the resource path from a request line
///
/// Returns `None` unless the line starts with [`RESOURCE_FETCH_TOKEN`] and
/// carries a second whitespace-delimited token.
///
/// # Examples
/// ```
/// use webworker::http::request::extract_resource_path;
///
/// let path = extract_resource_path("GET /index.html HTTP/1.1").unwrap();
/// assert_eq!(path.as_str(), "index.html");
/// assert!(extract_resource_path("POST /index.html HTTP/1.1").is_none());
/// assert!(extract_resource_path("GE").is_none());
/// ```
pub fn extract_resource_path(line: &str) -> Option<ResourcePath> {
    if !line.starts_with(RESOURCE_FETCH_TOKEN) {
        return None;
    }
    let mut tokens = line.split_whitespace();
    tokens.next()?;
    tokens.next().map(ResourcePath::from_token)
}

/// Read request lines until the blank line that ends the head
///
/// I/O failures, timeouts, and a stream that ends (or exceeds
/// `limits.max_bytes`) before the blank line all yield no resource path.
/// I/O failures other than the read deadline are handed back in
/// [`RequestHead::error`]. Lines are decoded leniently, so non-UTF-8 header
/// bytes never discard the request line.
pub async fn read_request_head<R>(reader: &mut R, limits: HeadLimits, log: &dyn Logger) -> RequestHead
where
    R: AsyncBufRead + Unpin,
{
    let mut head = RequestHead::default();
    let mut limited = reader.take(limits.max_bytes);
    let mut buf = Vec::with_capacity(256);

    loop {
        buf.clear();
        match next_line(&mut limited, &mut buf, limits.read_timeout).await {
            Ok(0) => {
                log.debug("Request ended before the blank line");
                head.path = None;
                return head;
            }
            Ok(_) if !buf.ends_with(b"\n") => {
                log.debug("Request head truncated");
                head.path = None;
                return head;
            }
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::TimedOut => {
                log.debug(&format!("Request error: {e}"));
                head.path = None;
                return head;
            }
            Err(e) => {
                head.path = None;
                head.error = Some(e);
                return head;
            }
        }

        let decoded = String::from_utf8_lossy(&buf);
        let line = decoded.trim_end_matches('\n').trim_end_matches('\r');
        log.debug(&format!("Request line: ({line})"));

        if line.is_empty() {
            return head;
        }
        if head.request_line.is_none() {
            head.request_line = Some(line.to_string());
        }
        if head.path.is_none() {
            head.path = extract_resource_path(line);
        }
    }
}

async fn next_line<R>(reader: &mut R, buf: &mut Vec<u8>, deadline: Option<Duration>) -> io::Result<usize>
where
    R: AsyncBufRead + Unpin,
{
    match deadline {
        Some(d) => tokio::time::timeout(d, reader.read_until(b'\n', buf))
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "request read timed out"))?,
        None => reader.read_until(b'\n', buf).await,
    }
}
