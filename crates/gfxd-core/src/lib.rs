//! # gfxd-core
//!
//! Protocol and processing core for the gfxd graphics worker.
//!
//! The worker runs crash-prone image decoding isolated from the client
//! process, driven over a local byte-stream transport. This crate holds
//! everything both sides of that transport share:
//! - task and dimension value types
//! - the versioned binary command protocol and its framing
//! - the endpoint abstraction over the transport
//! - the image task processor (ordering, dispatch, reassembly)

pub mod commands;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod processor;
pub mod protocol;
pub mod tasks;

pub use commands::{CommandType, FormatsResponse, GfxResponse, Request, Response};
pub use endpoint::Endpoint;
pub use error::GfxdError;
pub use processor::{GfxProcessor, GfxProvider};
pub use tasks::{Dimension, GfxTask, GfxTaskResult, TaskStatus};

/// Crate-level result type
pub type Result<T> = std::result::Result<T, GfxdError>;
