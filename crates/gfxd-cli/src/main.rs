//! gfxd CLI - drive the graphics worker over its socket

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use gfxd_core::commands::{Request, Response};
use gfxd_core::config::default_socket_path;
use gfxd_core::protocol::{ProtocolReader, ProtocolWriter, DEFAULT_WRITE_TIMEOUT};
use gfxd_core::{Dimension, GfxTask};
use tokio::net::UnixStream;

#[derive(Parser)]
#[command(name = "gfxd")]
#[command(author, version, about = "Client for the gfxd graphics worker")]
struct Cli {
    /// Socket path (defaults to GFXD_SOCKET env var or /run/gfxd/gfxd.sock)
    #[arg(short, long, global = true)]
    socket: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that the worker is alive
    Ping,

    /// Ask the worker to stop accepting new connections
    Shutdown,

    /// Print the worker's supported format lists
    Formats,

    /// Generate thumbnails for a file
    Thumb {
        /// Absolute path to the source image
        path: PathBuf,

        /// Target sizes as WxH (repeatable); height 0 keeps aspect ratio
        #[arg(short = 'd', long = "dimension", required = true)]
        dimensions: Vec<Dimension>,

        /// Seconds to wait for the generation response
        #[arg(short, long, default_value = "60")]
        timeout: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let socket = cli.socket.unwrap_or_else(default_socket_path);

    match cli.command {
        Commands::Ping => {
            let response = roundtrip(&socket, &Request::Hello, Duration::from_secs(5)).await?;
            match response {
                Response::Hello => println!("worker is alive"),
                other => bail!("unexpected response: {other:?}"),
            }
        }
        Commands::Shutdown => {
            let response = roundtrip(&socket, &Request::Shutdown, Duration::from_secs(5)).await?;
            match response {
                Response::Shutdown => println!("shutdown acknowledged"),
                other => bail!("unexpected response: {other:?}"),
            }
        }
        Commands::Formats => {
            let response =
                roundtrip(&socket, &Request::SupportFormats, Duration::from_secs(5)).await?;
            match response {
                Response::SupportFormats(r) => {
                    println!("formats: {}", r.formats);
                    println!("videoformats: {}", r.videoformats);
                }
                other => bail!("unexpected response: {other:?}"),
            }
        }
        Commands::Thumb { path, dimensions, timeout } => {
            let request = Request::NewGfx(GfxTask { path, dimensions });
            let response = roundtrip(&socket, &request, Duration::from_secs(timeout)).await?;
            match response {
                Response::NewGfx(r) => {
                    for image in &r.images {
                        println!("{}", if image.is_empty() { "<none>" } else { image });
                    }
                    if r.error_code != 0 {
                        bail!("generation failed: {}", r.error_text);
                    }
                }
                other => bail!("unexpected response: {other:?}"),
            }
        }
    }

    Ok(())
}

/// One command per connection: connect, write the request, read the
/// single response.
async fn roundtrip(
    socket: &PathBuf,
    request: &Request,
    read_timeout: Duration,
) -> Result<Response> {
    let mut stream = UnixStream::connect(socket)
        .await
        .with_context(|| format!("connecting to {}", socket.display()))?;

    ProtocolWriter::new(&mut stream)
        .write_command(request, DEFAULT_WRITE_TIMEOUT)
        .await
        .context("writing request")?;

    ProtocolReader::new(&mut stream)
        .read_command(read_timeout)
        .await
        .context("reading response")
}
