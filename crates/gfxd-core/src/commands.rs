//! Wire commands and their binary payload encoding
//!
//! Each command kind has a request shape and a response shape sharing one
//! type tag. Payloads use fixed-width big-endian integers; strings and
//! path bytes are length-prefixed so embedded bytes are legal.

use std::os::unix::ffi::{OsStrExt, OsStringExt};
use std::path::PathBuf;

use crate::tasks::{Dimension, GfxTask};
use crate::{GfxdError, Result};

/// Command type tag carried in every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CommandType {
    Hello = 1,
    Shutdown = 2,
    NewGfx = 3,
    SupportFormats = 4,
}

impl CommandType {
    #[must_use]
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            1 => Some(Self::Hello),
            2 => Some(Self::Shutdown),
            3 => Some(Self::NewGfx),
            4 => Some(Self::SupportFormats),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hello => "HELLO",
            Self::Shutdown => "SHUTDOWN",
            Self::NewGfx => "NEW_GFX",
            Self::SupportFormats => "SUPPORT_FORMATS",
        }
    }
}

/// A client-to-worker command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Liveness handshake, empty payload.
    Hello,
    /// Stop accepting connections after acking, empty payload.
    Shutdown,
    /// Generate thumbnails for one file.
    NewGfx(GfxTask),
    /// Query supported format extension lists, empty payload.
    SupportFormats,
}

/// A worker-to-client command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Hello,
    Shutdown,
    NewGfx(GfxResponse),
    SupportFormats(FormatsResponse),
}

/// NEW_GFX response payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GfxResponse {
    /// 0 on success, nonzero on failure.
    pub error_code: u32,
    pub error_text: String,
    /// Generated artifact paths, aligned with the request's dimensions.
    pub images: Vec<String>,
}

/// SUPPORT_FORMATS response payload: delimited extension lists, opaque
/// at this layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatsResponse {
    pub formats: String,
    pub videoformats: String,
}

/// Serialization shared by both command directions.
pub trait WireCommand: Sized {
    fn command_type(&self) -> CommandType;

    /// Append the type-specific payload to `buf`.
    fn encode_body(&self, buf: &mut Vec<u8>);

    /// Decode a payload for a known command type. Fails on truncated
    /// fields or trailing bytes.
    fn decode_body(kind: CommandType, payload: &[u8]) -> Result<Self>;
}

impl WireCommand for Request {
    fn command_type(&self) -> CommandType {
        match self {
            Self::Hello => CommandType::Hello,
            Self::Shutdown => CommandType::Shutdown,
            Self::NewGfx(_) => CommandType::NewGfx,
            Self::SupportFormats => CommandType::SupportFormats,
        }
    }

    fn encode_body(&self, buf: &mut Vec<u8>) {
        match self {
            Self::Hello | Self::Shutdown | Self::SupportFormats => {}
            Self::NewGfx(task) => {
                put_bytes(buf, task.path.as_os_str().as_bytes());
                put_u32(buf, task.dimensions.len() as u32);
                for d in &task.dimensions {
                    put_u32(buf, d.width());
                    put_u32(buf, d.height());
                }
            }
        }
    }

    fn decode_body(kind: CommandType, payload: &[u8]) -> Result<Self> {
        let mut dec = Decoder::new(payload);
        let cmd = match kind {
            CommandType::Hello => Self::Hello,
            CommandType::Shutdown => Self::Shutdown,
            CommandType::SupportFormats => Self::SupportFormats,
            CommandType::NewGfx => {
                let path = PathBuf::from(std::ffi::OsString::from_vec(dec.take_bytes()?));
                let count = dec.take_u32()? as usize;
                let mut dimensions = Vec::with_capacity(count.min(MAX_PREALLOC));
                for _ in 0..count {
                    let w = dec.take_u32()?;
                    let h = dec.take_u32()?;
                    dimensions.push(Dimension::new(w, h));
                }
                Self::NewGfx(GfxTask { path, dimensions })
            }
        };
        dec.finish()?;
        Ok(cmd)
    }
}

impl WireCommand for Response {
    fn command_type(&self) -> CommandType {
        match self {
            Self::Hello => CommandType::Hello,
            Self::Shutdown => CommandType::Shutdown,
            Self::NewGfx(_) => CommandType::NewGfx,
            Self::SupportFormats(_) => CommandType::SupportFormats,
        }
    }

    fn encode_body(&self, buf: &mut Vec<u8>) {
        match self {
            Self::Hello | Self::Shutdown => {}
            Self::NewGfx(r) => {
                put_u32(buf, r.error_code);
                put_str(buf, &r.error_text);
                put_u32(buf, r.images.len() as u32);
                for image in &r.images {
                    put_str(buf, image);
                }
            }
            Self::SupportFormats(r) => {
                put_str(buf, &r.formats);
                put_str(buf, &r.videoformats);
            }
        }
    }

    fn decode_body(kind: CommandType, payload: &[u8]) -> Result<Self> {
        let mut dec = Decoder::new(payload);
        let cmd = match kind {
            CommandType::Hello => Self::Hello,
            CommandType::Shutdown => Self::Shutdown,
            CommandType::NewGfx => {
                let error_code = dec.take_u32()?;
                let error_text = dec.take_str()?;
                let count = dec.take_u32()? as usize;
                let mut images = Vec::with_capacity(count.min(MAX_PREALLOC));
                for _ in 0..count {
                    images.push(dec.take_str()?);
                }
                Self::NewGfx(GfxResponse { error_code, error_text, images })
            }
            CommandType::SupportFormats => {
                let formats = dec.take_str()?;
                let videoformats = dec.take_str()?;
                Self::SupportFormats(FormatsResponse { formats, videoformats })
            }
        };
        dec.finish()?;
        Ok(cmd)
    }
}

/// Cap for `Vec::with_capacity` on counts read off the wire.
const MAX_PREALLOC: usize = 1024;

fn put_u32(buf: &mut Vec<u8>, v: u32) {
    buf.extend_from_slice(&v.to_be_bytes());
}

fn put_bytes(buf: &mut Vec<u8>, b: &[u8]) {
    put_u32(buf, b.len() as u32);
    buf.extend_from_slice(b);
}

fn put_str(buf: &mut Vec<u8>, s: &str) {
    put_bytes(buf, s.as_bytes());
}

/// Bounds-checked payload cursor.
struct Decoder<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Decoder<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.buf.len())
            .ok_or_else(|| GfxdError::MalformedFrame("truncated payload".into()))?;
        let slice = &self.buf[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn take_u32(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn take_bytes(&mut self) -> Result<Vec<u8>> {
        let len = self.take_u32()? as usize;
        Ok(self.take(len)?.to_vec())
    }

    fn take_str(&mut self) -> Result<String> {
        String::from_utf8(self.take_bytes()?)
            .map_err(|_| GfxdError::MalformedFrame("invalid utf-8 in string field".into()))
    }

    fn finish(self) -> Result<()> {
        if self.pos == self.buf.len() {
            Ok(())
        } else {
            Err(GfxdError::MalformedFrame(format!(
                "{} trailing bytes after payload",
                self.buf.len() - self.pos
            )))
        }
    }
}
