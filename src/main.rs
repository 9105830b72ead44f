use std::sync::Arc;

use webworker::config::Config;
use webworker::handler::ConnectionHandler;
use webworker::logger::{self, LogWriter, Logger};
use webworker::server;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Optional first argument: config file path without extension
    let config_path = std::env::args().nth(1).unwrap_or_else(|| "config".to_string());
    let cfg = Config::load_from(&config_path)?;
    let log: Arc<dyn Logger> = Arc::new(LogWriter::new(&cfg.logging)?);

    // Runtime thread count follows server.workers when set
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
    }
    let runtime = runtime_builder.build()?;

    runtime.block_on(async_main(cfg, log))
}

async fn async_main(cfg: Config, log: Arc<dyn Logger>) -> Result<(), Box<dyn std::error::Error>> {
    let addr = cfg.socket_addr()?;
    let listener = server::create_listener(addr, cfg.server.backlog)?;

    logger::log_server_start(log.as_ref(), &listener.local_addr()?, &cfg);

    let handler = Arc::new(ConnectionHandler::new(&cfg, Arc::clone(&log)));
    server::run(
        listener,
        handler,
        Arc::clone(&log),
        cfg.server.max_connections,
        server::shutdown_signal(),
    )
    .await;

    log.info("Server stopped");
    Ok(())
}
