//! gfxd-daemon - isolated graphics worker
//!
//! Long-lived service that reads one framed command per connection off
//! a local socket, executes it on a bounded worker pool and answers on
//! the same connection. Image decoding runs here, not in the client, so
//! a crashing codec only costs this process.

use anyhow::Result;
use gfxd_core::GfxProcessor;
use tokio::net::UnixListener;
use tracing_subscriber::EnvFilter;

mod config;
mod dispatch;
mod pool;
mod provider;
mod server;

use config::DaemonConfig;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("gfxd=info".parse()?))
        .init();

    tracing::info!("gfxd-daemon starting");

    let config = DaemonConfig::default();
    tracing::info!(
        workers = config.thread_count,
        queue = config.max_queue_size,
        socket = ?config.socket_path,
        "configuration loaded"
    );

    if let Some(parent) = config.socket_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let _ = std::fs::remove_file(&config.socket_path);

    let listener = UnixListener::bind(&config.socket_path)?;
    tracing::info!(socket = ?config.socket_path, "listening");

    let provider = provider::ThumbnailProvider::new(&config.output_dir)?;
    let pool = pool::WorkerPool::new(config.thread_count, config.max_queue_size);
    let dispatcher = dispatch::RequestProcessor::new(GfxProcessor::new(provider), pool)
        .with_timeouts(config.read_timeout, config.write_timeout);

    server::run(listener, dispatcher).await?;

    tracing::info!("gfxd-daemon stopped");
    Ok(())
}
