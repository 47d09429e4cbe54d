//! Daemon configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use gfxd_core::protocol::{DEFAULT_READ_TIMEOUT, DEFAULT_WRITE_TIMEOUT};

/// Configuration for the daemon
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Path to the Unix socket
    pub socket_path: PathBuf,

    /// Number of concurrent pool executors
    pub thread_count: usize,

    /// Admission bound on queued-but-not-running jobs
    pub max_queue_size: usize,

    /// Directory for generated thumbnails
    pub output_dir: PathBuf,

    /// Per-read-operation timeout
    pub read_timeout: Duration,

    /// Per-write-operation timeout
    pub write_timeout: Duration,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            socket_path: gfxd_core::config::default_socket_path(),
            thread_count: 4,
            max_queue_size: 8,
            output_dir: std::env::temp_dir().join("gfxd"),
            read_timeout: DEFAULT_READ_TIMEOUT,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
        }
    }
}
