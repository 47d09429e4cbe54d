//! Command framing over an [`Endpoint`]
//!
//! Wire frame: `length: u32 | version: u8 | command_type: u8 | payload`,
//! all integers big-endian, `length` counting everything after itself.

use std::time::Duration;

use crate::commands::WireCommand;
use crate::endpoint::Endpoint;
use crate::{CommandType, GfxdError, Result};

/// Highest serialize version this build understands. A frame tagged
/// above this is rejected outright, never best-effort parsed.
pub const LATEST_SERIALIZE_VERSION: u8 = 1;

/// Upper bound on one frame body, matching what a worst-case thumbnail
/// batch response can reasonably occupy.
pub const MAX_FRAME_LEN: usize = 10 * 1024 * 1024;

/// Per-I/O-operation timeouts, not per command lifecycle.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(5000);
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_millis(5000);

/// One decoded-but-uninterpreted frame.
///
/// `command` stays a raw byte here so the dispatcher can treat unknown
/// types as a no-op instead of a decode failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub version: u8,
    pub command: u8,
    pub payload: Vec<u8>,
}

/// Reads framed commands from an endpoint.
pub struct ProtocolReader<'a, E: Endpoint> {
    endpoint: &'a mut E,
}

impl<'a, E: Endpoint> ProtocolReader<'a, E> {
    pub fn new(endpoint: &'a mut E) -> Self {
        Self { endpoint }
    }

    /// Read one complete frame. Each underlying read is bounded by
    /// `timeout`; the version check fails closed before the payload is
    /// interpreted.
    pub async fn read_frame(&mut self, timeout: Duration) -> Result<Frame> {
        let mut len_buf = [0u8; 4];
        self.endpoint.read_exact(&mut len_buf, timeout).await?;
        let len = u32::from_be_bytes(len_buf) as usize;

        if len < 2 {
            return Err(GfxdError::MalformedFrame(format!("frame length {len} too short")));
        }
        if len > MAX_FRAME_LEN {
            return Err(GfxdError::MalformedFrame(format!("frame length {len} exceeds limit")));
        }

        let mut body = vec![0u8; len];
        self.endpoint.read_exact(&mut body, timeout).await?;

        let version = body[0];
        if version == 0 || version > LATEST_SERIALIZE_VERSION {
            return Err(GfxdError::UnsupportedVersion(version));
        }

        Ok(Frame {
            version,
            command: body[1],
            payload: body[2..].to_vec(),
        })
    }

    /// Read one frame and decode it as a known command. Unknown command
    /// types are malformed at this level; server-side code that wants
    /// to tolerate them reads the raw frame instead.
    pub async fn read_command<C: WireCommand>(&mut self, timeout: Duration) -> Result<C> {
        let frame = self.read_frame(timeout).await?;
        let kind = CommandType::from_u8(frame.command)
            .ok_or_else(|| GfxdError::MalformedFrame(format!("unknown command type {}", frame.command)))?;
        C::decode_body(kind, &frame.payload)
    }
}

/// Writes framed commands to an endpoint.
pub struct ProtocolWriter<'a, E: Endpoint> {
    endpoint: &'a mut E,
}

impl<'a, E: Endpoint> ProtocolWriter<'a, E> {
    pub fn new(endpoint: &'a mut E) -> Self {
        Self { endpoint }
    }

    /// Serialize and write one whole frame within `timeout`. A partial
    /// write is fatal for the connection; the caller abandons it.
    pub async fn write_command<C: WireCommand>(&mut self, cmd: &C, timeout: Duration) -> Result<()> {
        let mut frame = Vec::with_capacity(64);
        frame.extend_from_slice(&[0u8; 4]); // length placeholder
        frame.push(LATEST_SERIALIZE_VERSION);
        frame.push(cmd.command_type() as u8);
        cmd.encode_body(&mut frame);

        let len = (frame.len() - 4) as u32;
        frame[..4].copy_from_slice(&len.to_be_bytes());

        self.endpoint.write_all(&frame, timeout).await
    }
}
