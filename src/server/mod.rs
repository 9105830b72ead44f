// Server module entry point
// Accept loop that hands each connection to its own task

pub mod listener;
pub mod signal;

use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};

use crate::handler::ConnectionHandler;
use crate::logger::Logger;

pub use listener::create_listener;
pub use signal::shutdown_signal;

/// Accept connections until `shutdown` resolves
///
/// Every accepted connection runs `handler` in a spawned task. Connections
/// over `max_connections` are dropped without a response.
pub async fn run<F>(
    listener: TcpListener,
    handler: Arc<ConnectionHandler>,
    logger: Arc<dyn Logger>,
    max_connections: Option<u64>,
    shutdown: F,
) where
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    let active_connections = Arc::new(AtomicUsize::new(0));

    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => accept_connection(
                        stream,
                        peer_addr,
                        &handler,
                        logger.as_ref(),
                        &active_connections,
                        max_connections,
                    ),
                    Err(e) => logger.error(&format!("Failed to accept connection: {e}")),
                }
            }

            () = &mut shutdown => {
                logger.info("Shutdown requested, no longer accepting connections");
                return;
            }
        }
    }
}

/// Accept and process a connection, checking limits and logging.
fn accept_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    handler: &Arc<ConnectionHandler>,
    logger: &dyn Logger,
    conn_counter: &Arc<AtomicUsize>,
    max_connections: Option<u64>,
) {
    // Increment counter first, then check limit (prevents race condition)
    let prev_count = conn_counter.fetch_add(1, Ordering::SeqCst);

    if let Some(max_conn) = max_connections {
        if prev_count >= usize::try_from(max_conn).unwrap_or(usize::MAX) {
            conn_counter.fetch_sub(1, Ordering::SeqCst);
            logger.warn(&format!(
                "Max connections reached: {prev_count}/{max_conn}. Connection rejected."
            ));
            drop(stream);
            return;
        }
    }

    logger.debug(&format!("[Connection] Accepted from: {peer_addr}"));

    let handler = Arc::clone(handler);
    let conn_counter = Arc::clone(conn_counter);
    tokio::spawn(async move {
        handler.handle(stream, Some(peer_addr)).await;
        conn_counter.fetch_sub(1, Ordering::SeqCst);
    });
}
