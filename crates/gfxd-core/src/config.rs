//! Shared configuration helpers

use std::path::PathBuf;

/// Get the default socket path from the `GFXD_SOCKET` env var or the
/// system default.
///
/// Returns:
/// - `$GFXD_SOCKET` if set (for development)
/// - `/run/gfxd/gfxd.sock` otherwise (production)
pub fn default_socket_path() -> PathBuf {
    std::env::var("GFXD_SOCKET")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/run/gfxd/gfxd.sock"))
}
