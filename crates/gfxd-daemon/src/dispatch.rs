//! Request dispatcher
//!
//! One connection carries exactly one command: read it, hand execution
//! to the worker pool, let the pool job write the single response and
//! release the endpoint. Only the SHUTDOWN type leaks back out of here,
//! as the flag telling the accept loop to stop.

use std::sync::Arc;
use std::time::Duration;

use gfxd_core::commands::{CommandType, FormatsResponse, GfxResponse, Request, Response, WireCommand};
use gfxd_core::protocol::{ProtocolReader, ProtocolWriter, DEFAULT_READ_TIMEOUT, DEFAULT_WRITE_TIMEOUT};
use gfxd_core::{Endpoint, GfxProcessor, GfxProvider, TaskStatus};

use crate::pool::WorkerPool;

pub struct RequestProcessor<P> {
    processor: Arc<GfxProcessor<P>>,
    pool: WorkerPool,
    read_timeout: Duration,
    write_timeout: Duration,
}

impl<P: GfxProvider + 'static> RequestProcessor<P> {
    pub fn new(processor: GfxProcessor<P>, pool: WorkerPool) -> Self {
        Self {
            processor: Arc::new(processor),
            pool,
            read_timeout: DEFAULT_READ_TIMEOUT,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_timeouts(mut self, read: Duration, write: Duration) -> Self {
        self.read_timeout = read;
        self.write_timeout = write;
        self
    }

    /// Handle one accepted connection. Returns `true` when the command
    /// was SHUTDOWN, so the accept loop stops; the shutdown ack itself
    /// still goes through the pool like any other command.
    pub async fn process<E: Endpoint + 'static>(&self, mut endpoint: E) -> bool {
        let frame = match ProtocolReader::new(&mut endpoint).read_frame(self.read_timeout).await {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!(error = %e, "could not read command, dropping connection");
                return false;
            }
        };

        // Unknown command type: deliberate silent no-op (no response),
        // so a newer client talking to this worker does not kill it.
        let Some(kind) = CommandType::from_u8(frame.command) else {
            tracing::debug!(command = frame.command, "ignoring unrecognized command type");
            return false;
        };

        let request = match Request::decode_body(kind, &frame.payload) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!(command = kind.as_str(), error = %e, "malformed payload, dropping connection");
                return false;
            }
        };

        let stop = matches!(request, Request::Shutdown);
        tracing::info!(command = kind.as_str(), "executing command in the worker pool");

        let processor = Arc::clone(&self.processor);
        let write_timeout = self.write_timeout;
        let submitted = self
            .pool
            .push(async move {
                // The job owns the endpoint exclusively until the
                // response is written; no other writer exists.
                handle_command(processor, endpoint, request, write_timeout).await;
            })
            .await;

        if let Err(e) = submitted {
            tracing::error!(error = %e, "could not submit command to pool");
        }

        stop
    }

    /// Stop the pool, draining jobs that were already accepted.
    pub async fn shutdown(self) {
        let status = self.pool.status();
        tracing::info!(executed = status.executed, "draining worker pool");
        self.pool.shutdown().await;
    }
}

async fn handle_command<P: GfxProvider + 'static, E: Endpoint>(
    processor: Arc<GfxProcessor<P>>,
    mut endpoint: E,
    request: Request,
    write_timeout: Duration,
) {
    let response = match request {
        Request::Hello => Response::Hello,
        Request::Shutdown => Response::Shutdown,
        Request::NewGfx(task) => Response::NewGfx(new_gfx(processor, task).await),
        Request::SupportFormats => {
            let result = tokio::task::spawn_blocking(move || FormatsResponse {
                formats: processor.supported_formats(),
                videoformats: processor.supported_video_formats(),
            })
            .await;
            match result {
                Ok(formats) => Response::SupportFormats(formats),
                Err(e) => {
                    tracing::error!(error = %e, "format query panicked, dropping connection");
                    return;
                }
            }
        }
    };

    let mut writer = ProtocolWriter::new(&mut endpoint);
    if let Err(e) = writer.write_command(&response, write_timeout).await {
        // The work is done but the response is lost; nothing is rolled
        // back. The connection is abandoned, not repaired.
        tracing::error!(error = %e, "failed to write response");
        return;
    }
    if let Err(e) = endpoint.close().await {
        tracing::debug!(error = %e, "error closing endpoint");
    }
}

/// Run the processor off the async workers; image decoding is blocking
/// CPU work. A task failure is a normal response with a nonzero code,
/// never a protocol failure.
async fn new_gfx<P: GfxProvider + 'static>(
    processor: Arc<GfxProcessor<P>>,
    task: gfxd_core::GfxTask,
) -> GfxResponse {
    let requested = task.dimensions.len();
    let result = match tokio::task::spawn_blocking(move || processor.process(task)).await {
        Ok(result) => result,
        Err(e) => {
            tracing::error!(error = %e, "gfx processing panicked");
            gfxd_core::GfxTaskResult::failed(requested)
        }
    };

    let (error_code, error_text) = match result.status {
        TaskStatus::Success => (0, "OK"),
        _ => (1, "ERROR"),
    };
    tracing::info!(result = error_text, "gfx result");

    GfxResponse {
        error_code,
        error_text: error_text.to_owned(),
        images: result.outputs,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gfxd_core::{Dimension, GfxTask, GfxdError, Result};
    use std::path::{Path, PathBuf};
    use tokio::io::AsyncReadExt;

    const T: Duration = Duration::from_millis(500);

    struct StubProvider;

    impl GfxProvider for StubProvider {
        fn generate_images(&self, _path: &Path, dimensions: &[Dimension]) -> Result<Vec<String>> {
            Ok(dimensions.iter().map(|d| format!("/out/{d}.jpg")).collect())
        }
        fn supported_formats(&self) -> Option<String> {
            Some(".jpg".into())
        }
        fn supported_video_formats(&self) -> Option<String> {
            None
        }
    }

    struct FailingProvider;

    impl GfxProvider for FailingProvider {
        fn generate_images(&self, _path: &Path, _dimensions: &[Dimension]) -> Result<Vec<String>> {
            Err(GfxdError::Generation("decoder crashed".into()))
        }
        fn supported_formats(&self) -> Option<String> {
            None
        }
        fn supported_video_formats(&self) -> Option<String> {
            None
        }
    }

    fn dispatcher<P: GfxProvider + 'static>(provider: P) -> RequestProcessor<P> {
        RequestProcessor::new(GfxProcessor::new(provider), WorkerPool::new(2, 4))
            .with_timeouts(T, T)
    }

    async fn send(client: &mut tokio::io::DuplexStream, request: &Request) {
        ProtocolWriter::new(client).write_command(request, T).await.unwrap();
    }

    async fn recv(client: &mut tokio::io::DuplexStream) -> Response {
        ProtocolReader::new(client).read_command(T).await.unwrap()
    }

    #[tokio::test]
    async fn hello_gets_an_ack_and_no_stop() {
        let d = dispatcher(StubProvider);
        let (mut client, server) = tokio::io::duplex(64 * 1024);

        send(&mut client, &Request::Hello).await;
        let stop = d.process(server).await;

        assert!(!stop);
        assert_eq!(recv(&mut client).await, Response::Hello);
        d.shutdown().await;
    }

    #[tokio::test]
    async fn shutdown_reports_stop_and_still_acks() {
        let d = dispatcher(StubProvider);
        let (mut client, server) = tokio::io::duplex(64 * 1024);

        send(&mut client, &Request::Shutdown).await;
        let stop = d.process(server).await;

        assert!(stop);
        assert_eq!(recv(&mut client).await, Response::Shutdown);
        d.shutdown().await;
    }

    #[tokio::test]
    async fn new_gfx_response_preserves_request_order() {
        let d = dispatcher(StubProvider);
        let (mut client, server) = tokio::io::duplex(64 * 1024);

        send(
            &mut client,
            &Request::NewGfx(GfxTask {
                path: PathBuf::from("/tmp/a.jpg"),
                dimensions: vec![
                    Dimension::new(200, 200),
                    Dimension::new(1000, 0),
                    Dimension::new(40, 40),
                ],
            }),
        )
        .await;
        d.process(server).await;

        let Response::NewGfx(r) = recv(&mut client).await else {
            panic!("expected NEW_GFX response");
        };
        assert_eq!(r.error_code, 0);
        assert_eq!(r.error_text, "OK");
        assert_eq!(
            r.images,
            vec!["/out/200x200.jpg", "/out/1000x0.jpg", "/out/40x40.jpg"]
        );
        d.shutdown().await;
    }

    #[tokio::test]
    async fn task_failure_is_a_response_not_a_disconnect() {
        let d = dispatcher(FailingProvider);
        let (mut client, server) = tokio::io::duplex(64 * 1024);

        send(
            &mut client,
            &Request::NewGfx(GfxTask {
                path: PathBuf::from("/tmp/a.jpg"),
                dimensions: vec![Dimension::new(10, 10)],
            }),
        )
        .await;
        d.process(server).await;

        let Response::NewGfx(r) = recv(&mut client).await else {
            panic!("expected NEW_GFX response");
        };
        assert_eq!(r.error_code, 1);
        assert_eq!(r.error_text, "ERROR");
        assert_eq!(r.images, vec![""]);
        d.shutdown().await;
    }

    #[tokio::test]
    async fn support_formats_includes_worker_extras() {
        let d = dispatcher(StubProvider);
        let (mut client, server) = tokio::io::duplex(64 * 1024);

        send(&mut client, &Request::SupportFormats).await;
        d.process(server).await;

        let Response::SupportFormats(r) = recv(&mut client).await else {
            panic!("expected SUPPORT_FORMATS response");
        };
        assert!(r.formats.starts_with(".jpg"));
        assert!(r.formats.contains(".tiff"));
        assert_eq!(r.videoformats, "");
        d.shutdown().await;
    }

    #[tokio::test]
    async fn unrecognized_command_type_is_a_silent_no_op() {
        let d = dispatcher(StubProvider);
        let (mut client, server) = tokio::io::duplex(1024);

        // Valid frame, unknown type byte 0x63.
        let raw = [0, 0, 0, 2, gfxd_core::protocol::LATEST_SERIALIZE_VERSION, 0x63];
        Endpoint::write_all(&mut client, &raw, T).await.unwrap();

        let stop = d.process(server).await;
        assert!(!stop);

        // No response: the worker end is simply gone.
        let mut buf = [0u8; 1];
        assert_eq!(client.read(&mut buf).await.unwrap(), 0);
        d.shutdown().await;
    }

    #[tokio::test]
    async fn malformed_frame_drops_the_connection() {
        let d = dispatcher(StubProvider);
        let (mut client, server) = tokio::io::duplex(1024);

        Endpoint::write_all(&mut client, &[0, 0, 0, 1, 9], T).await.unwrap();

        let stop = d.process(server).await;
        assert!(!stop);

        let mut buf = [0u8; 1];
        assert_eq!(client.read(&mut buf).await.unwrap(), 0);
        d.shutdown().await;
    }
}
