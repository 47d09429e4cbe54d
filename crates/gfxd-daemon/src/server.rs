//! Unix socket accept loop
//!
//! Accepts and dispatches sequentially: a single producer feeding the
//! worker pool, so a full admission queue backpressures accepting
//! instead of piling up connections.

use gfxd_core::GfxProvider;
use tokio::net::UnixListener;

use crate::dispatch::RequestProcessor;

/// Run until a SHUTDOWN command arrives, then drain the pool.
pub async fn run<P: GfxProvider + 'static>(
    listener: UnixListener,
    dispatcher: RequestProcessor<P>,
) -> std::io::Result<()> {
    loop {
        let (stream, _) = listener.accept().await?;
        tracing::debug!("connection accepted");

        if dispatcher.process(stream).await {
            tracing::info!("shutdown command received, no longer accepting");
            break;
        }
    }

    dispatcher.shutdown().await;
    Ok(())
}
