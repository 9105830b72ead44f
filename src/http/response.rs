//! HTTP response writing module
//!
//! Writes the fixed status line, the fixed header set and the body straight
//! to the connection. No Content-Length is sent; the body ends when the
//! connection closes.

use std::io;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::config::HttpConfig;

/// The only status line this server emits
pub const STATUS_LINE: &str = "HTTP/1.1 200 OK";

/// Format a timestamp as an RFC 1123 HTTP date in GMT
///
/// # Examples
/// ```
/// use chrono::{TimeZone, Utc};
/// use webworker::http::response::format_http_date;
///
/// let t = Utc.with_ymd_and_hms(2026, 10, 20, 8, 1, 2).unwrap();
/// assert_eq!(format_http_date(t), "Tue, 20 Oct 2026 08:01:02 GMT");
/// ```
pub fn format_http_date(now: DateTime<Utc>) -> String {
    now.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Fixed header values shared by every response
#[derive(Debug, Clone)]
pub struct ResponseHeaders {
    pub server_name: String,
    pub connection: String,
    pub content_type: String,
}

impl ResponseHeaders {
    pub fn from_config(http: &HttpConfig) -> Self {
        Self {
            server_name: http.server_name.clone(),
            connection: http.connection.clone(),
            content_type: http.content_type.clone(),
        }
    }

    /// Build the status line and header block, including the blank line
    pub fn head(&self, content_type: &str, now: DateTime<Utc>) -> String {
        format!(
            "{STATUS_LINE}\r\nDate: {}\r\nServer: {}\r\nConnection: {}\r\nContent-Type: {}\r\n\r\n",
            format_http_date(now),
            sanitize(&self.server_name),
            sanitize(&self.connection),
            sanitize(content_type),
        )
    }

    /// Write a complete response using the configured content type
    pub async fn write<W>(&self, writer: &mut W, body: &[u8]) -> io::Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        write_response(writer, self, &self.content_type, body).await
    }
}

/// Write status line, headers, blank line, then the body verbatim
///
/// The Date header is computed at call time. The stream is flushed but not
/// closed.
pub async fn write_response<W>(
    writer: &mut W,
    headers: &ResponseHeaders,
    content_type: &str,
    body: &[u8],
) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let head = headers.head(content_type, Utc::now());
    writer.write_all(head.as_bytes()).await?;
    writer.write_all(body).await?;
    writer.flush().await
}

/// Run a write under an optional deadline
pub async fn with_write_deadline<F>(deadline: Option<Duration>, write: F) -> io::Result<()>
where
    F: std::future::Future<Output = io::Result<()>>,
{
    match deadline {
        Some(d) => tokio::time::timeout(d, write)
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "response write timed out"))?,
        None => write.await,
    }
}

/// Header values come from configuration; never let them break the header block
fn sanitize(value: &str) -> String {
    value.replace(['\r', '\n'], " ")
}
