//! Bidirectional byte-stream endpoint over the local transport
//!
//! The transport itself (unix socket, pipe) is bound and accepted
//! elsewhere; this seam only needs timed reads and writes plus close.

use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::{GfxdError, Result};

/// One connected transport endpoint.
///
/// Each operation carries its own timeout; a timed-out operation leaves
/// the stream in an unknown state and the connection must be abandoned.
#[async_trait]
pub trait Endpoint: Send {
    async fn read_exact(&mut self, buf: &mut [u8], timeout: Duration) -> Result<()>;

    async fn write_all(&mut self, buf: &[u8], timeout: Duration) -> Result<()>;

    async fn close(&mut self) -> Result<()>;
}

#[async_trait]
impl<T> Endpoint for T
where
    T: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn read_exact(&mut self, buf: &mut [u8], timeout: Duration) -> Result<()> {
        match tokio::time::timeout(timeout, AsyncReadExt::read_exact(self, buf)).await {
            Ok(res) => {
                res?;
                Ok(())
            }
            Err(_) => Err(GfxdError::Timeout { op: "read", after: timeout }),
        }
    }

    async fn write_all(&mut self, buf: &[u8], timeout: Duration) -> Result<()> {
        match tokio::time::timeout(timeout, AsyncWriteExt::write_all(self, buf)).await {
            Ok(res) => {
                res?;
                Ok(())
            }
            Err(_) => Err(GfxdError::Timeout { op: "write", after: timeout }),
        }
    }

    async fn close(&mut self) -> Result<()> {
        AsyncWriteExt::shutdown(self).await?;
        Ok(())
    }
}
