//! Connection handling module
//!
//! One [`ConnectionHandler`] serves exactly one request per stream:
//! read the request head, resolve the resource, substitute markers,
//! write the response, close.

pub mod resolver;
pub mod template;

use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};

use crate::config::Config;
use crate::http::request::{read_request_head, HeadLimits};
use crate::http::response::{with_write_deadline, ResponseHeaders};
use crate::logger::{AccessLogEntry, Logger};

pub use resolver::{ResourceResolver, Resolved, NOT_FOUND_PAGE};
pub use template::{TemplateRenderer, DATE_MARKER, SERVER_MARKER};

/// Stages of one exchange, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Start,
    ReadingRequest,
    Resolving,
    Rendering,
    WritingResponse,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Start => "start",
            Self::ReadingRequest => "reading request",
            Self::Resolving => "resolving",
            Self::Rendering => "rendering",
            Self::WritingResponse => "writing response",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

/// Per-connection request pipeline
///
/// Holds only immutable configuration, so one instance is shared by every
/// connection task.
pub struct ConnectionHandler {
    limits: HeadLimits,
    resolver: ResourceResolver,
    renderer: TemplateRenderer,
    headers: ResponseHeaders,
    write_timeout: Option<Duration>,
    access_log_format: Option<String>,
    logger: Arc<dyn Logger>,
}

impl ConnectionHandler {
    pub fn new(config: &Config, logger: Arc<dyn Logger>) -> Self {
        Self {
            limits: HeadLimits {
                max_bytes: config.http.max_head_size,
                read_timeout: config.performance.read_deadline(),
            },
            resolver: ResourceResolver::from_config(&config.content),
            renderer: TemplateRenderer::from_config(&config.template),
            headers: ResponseHeaders::from_config(&config.http),
            write_timeout: config.performance.write_deadline(),
            access_log_format: config
                .logging
                .access_log
                .then(|| config.logging.access_log_format.clone()),
            logger,
        }
    }

    /// Serve one request on `stream`, then close it
    ///
    /// Never fails: transport errors are logged at error level with the
    /// stage they happened in. A failed read still gets the not-found page;
    /// a failed write ends the exchange early.
    pub async fn handle<S>(&self, stream: S, peer: Option<SocketAddr>)
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        self.logger.debug("Handling connection...");
        let started = Instant::now();
        let mut entry = AccessLogEntry::new(peer.map(|p| p.to_string()));

        match self.exchange(stream, &mut entry).await {
            Ok(()) => {
                entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
                if let Some(format) = &self.access_log_format {
                    self.logger.access(&entry.format(format));
                }
            }
            Err((stage, e)) => {
                self.logger.error(&format!("Output error while {stage}: {e}"));
            }
        }

        self.logger.debug("Done handling connection.");
    }

    async fn exchange<S>(&self, mut stream: S, entry: &mut AccessLogEntry) -> Result<(), (Stage, io::Error)>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let mut stage = Stage::Start;
        self.logger.debug(&format!("Stage: {stage}"));

        stage = self.advance(stage);
        let head = {
            let mut reader = BufReader::new(&mut stream);
            read_request_head(&mut reader, self.limits, self.logger.as_ref()).await
        };
        if let Some(e) = &head.error {
            self.logger.error(&format!("Input error while {stage}: {e}"));
        }

        stage = self.advance(stage);
        let resolved = self
            .resolver
            .resolve(head.path.as_ref(), self.logger.as_ref())
            .await;

        stage = self.advance(stage);
        let body = self.renderer.render_now(&resolved.payload);

        stage = self.advance(stage);
        let written = with_write_deadline(self.write_timeout, async {
            self.headers.write(&mut stream, &body).await?;
            stream.shutdown().await
        })
        .await;
        written.map_err(|e| (stage, e))?;

        entry.request_line = head.request_line;
        entry.path = head.path.map(|p| p.to_string());
        entry.outcome = resolved.outcome;
        entry.body_bytes = body.len();

        self.advance(stage);
        Ok(())
    }

    fn advance(&self, stage: Stage) -> Stage {
        let next = match stage {
            Stage::Start => Stage::ReadingRequest,
            Stage::ReadingRequest => Stage::Resolving,
            Stage::Resolving => Stage::Rendering,
            Stage::Rendering => Stage::WritingResponse,
            Stage::WritingResponse | Stage::Done => Stage::Done,
        };
        self.logger.debug(&format!("Stage: {next}"));
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::STATUS_LINE;
    use crate::logger::testing::MemoryLogger;
    use crate::logger::LogLevel;
    use std::path::PathBuf;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use tokio::io::{AsyncReadExt, DuplexStream};

    fn site(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "webworker-handler-{name}-{}",
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("index.html"),
            "<html><body>\n<cs371date>\n<p>about</p>\n<cs371server>\n</body></html>\n",
        )
        .unwrap();
        dir
    }

    fn handler_for(root: &std::path::Path, log: Arc<MemoryLogger>) -> ConnectionHandler {
        let mut config = Config::default();
        config.content.root = root.to_string_lossy().into_owned();
        config.performance.read_timeout = 1;
        ConnectionHandler::new(&config, log)
    }

    /// Send `request`, run the handler, return everything the client received
    async fn exchange(handler: &ConnectionHandler, request: &[u8]) -> String {
        let (mut client, server): (DuplexStream, DuplexStream) = tokio::io::duplex(64 * 1024);
        client.write_all(request).await.unwrap();

        handler.handle(server, None).await;

        let mut response = Vec::new();
        client.read_to_end(&mut response).await.unwrap();
        String::from_utf8(response).unwrap()
    }

    fn split(response: &str) -> (&str, &str) {
        response.split_once("\r\n\r\n").unwrap()
    }

    #[tokio::test]
    async fn test_missing_file_gets_not_found_page() {
        let dir = site("missing");
        let log = Arc::new(MemoryLogger::default());
        let handler = handler_for(&dir, log.clone());

        let response = exchange(&handler, b"GET /missing.html HTTP/1.1\r\nHost: x\r\n\r\n").await;
        let (head, body) = split(&response);
        assert!(head.starts_with(STATUS_LINE));
        assert!(body.contains("404 error"));
        assert_eq!(body, NOT_FOUND_PAGE);
        assert_eq!(log.access_count(), 1);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_markers_substituted_end_to_end() {
        let dir = site("markers");
        let log = Arc::new(MemoryLogger::default());
        let handler = handler_for(&dir, log);

        let response = exchange(&handler, b"GET /index.html HTTP/1.1\r\n\r\n").await;
        let (head, body) = split(&response);
        assert_eq!(head.lines().count(), 5);
        assert!(!body.contains(DATE_MARKER));
        assert!(!body.contains(SERVER_MARKER));
        assert!(body.contains(crate::config::DEFAULT_SERVER_DESCRIPTION));

        let today = chrono::Local::now().date_naive().format("%m/%d/%y").to_string();
        assert!(body.contains(&format!("<h3>{today}</h3>")));
        assert!(body.contains("<p>about</p>"));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_empty_request_gets_not_found_page() {
        let dir = site("empty");
        let handler = handler_for(&dir, Arc::new(MemoryLogger::default()));

        let response = exchange(&handler, b"\r\n").await;
        let (head, body) = split(&response);
        assert!(head.starts_with("HTTP/1.1 200 OK\r\n"));
        assert_eq!(body, NOT_FOUND_PAGE);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_unrecognized_method_gets_not_found_page() {
        let dir = site("method");
        let handler = handler_for(&dir, Arc::new(MemoryLogger::default()));

        let response = exchange(&handler, b"DELETE /index.html HTTP/1.1\r\n\r\n").await;
        assert_eq!(split(&response).1, NOT_FOUND_PAGE);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_client_that_never_finishes_still_answered() {
        let dir = site("stall");
        let handler = handler_for(&dir, Arc::new(MemoryLogger::default()));

        // No blank line; the read deadline ends the head
        let response = exchange(&handler, b"GET /index.html HTTP/1.1\r\n").await;
        assert_eq!(split(&response).1, NOT_FOUND_PAGE);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_write_failure_logged_not_raised() {
        let dir = site("closed");
        let log = Arc::new(MemoryLogger::default());
        let handler = handler_for(&dir, log.clone());

        let (mut client, server) = tokio::io::duplex(1024);
        client.write_all(b"GET /index.html HTTP/1.1\r\n\r\n").await.unwrap();
        drop(client);

        handler.handle(server, None).await;
        assert!(log.contains(LogLevel::Error, "writing response"));
        assert!(log.contains(LogLevel::Debug, "Done handling connection."));
        assert_eq!(log.access_count(), 0);

        let _ = std::fs::remove_dir_all(&dir);
    }

    /// Stream whose reads fail with a reset and whose writes are collected
    #[derive(Default)]
    struct ResetStream {
        written: Vec<u8>,
    }

    impl AsyncRead for ResetStream {
        fn poll_read(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &mut tokio::io::ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            Poll::Ready(Err(io::Error::new(io::ErrorKind::ConnectionReset, "connection reset by peer")))
        }
    }

    impl AsyncWrite for ResetStream {
        fn poll_write(mut self: Pin<&mut Self>, _cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
            self.written.extend_from_slice(buf);
            Poll::Ready(Ok(buf.len()))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn test_read_failure_logged_and_answered() {
        let dir = site("reset");
        let log = Arc::new(MemoryLogger::default());
        let handler = handler_for(&dir, log.clone());

        let mut stream = ResetStream::default();
        handler.handle(&mut stream, None).await;
        assert!(log.contains(LogLevel::Error, "reading request"));
        assert!(log.contains(LogLevel::Error, "connection reset"));

        let response = String::from_utf8(stream.written).unwrap();
        assert!(response.starts_with(STATUS_LINE));
        assert_eq!(split(&response).1, NOT_FOUND_PAGE);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_stages_logged_in_order() {
        let dir = site("stages");
        let log = Arc::new(MemoryLogger::default());
        let handler = handler_for(&dir, log.clone());
        exchange(&handler, b"GET /index.html HTTP/1.1\r\n\r\n").await;

        let stages: Vec<String> = log
            .lines
            .lock()
            .unwrap()
            .iter()
            .filter_map(|(_, m)| m.strip_prefix("Stage: ").map(str::to_string))
            .collect();
        assert_eq!(
            stages,
            [
                "start",
                "reading request",
                "resolving",
                "rendering",
                "writing response",
                "done"
            ]
        );

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_access_log_disabled() {
        let dir = site("quiet");
        let log = Arc::new(MemoryLogger::default());
        let mut config = Config::default();
        config.content.root = dir.to_string_lossy().into_owned();
        config.logging.access_log = false;
        let handler = ConnectionHandler::new(&config, log.clone());

        exchange(&handler, b"GET /index.html HTTP/1.1\r\n\r\n").await;
        assert_eq!(log.access_count(), 0);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
