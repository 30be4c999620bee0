//! TCP connect probing.
use async_trait::async_trait;
use log::{debug, warn};
use std::{net::SocketAddr, time::Duration};
use tokio::{
    io::{self, AsyncWriteExt},
    net::TcpStream,
    time,
};

/// Answers a single question: does `socket` accept a TCP connection?
///
/// Implementations never fail. Refused, unreachable and timed out
/// connections are all reported as `false`.
#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, socket: SocketAddr, timeout: Duration) -> bool;
}

/// The real prober, backed by tokio sockets.
#[derive(Debug, Default, Clone, Copy)]
pub struct TcpProber;

impl TcpProber {
    async fn connect(socket: SocketAddr, timeout: Duration) -> io::Result<TcpStream> {
        time::timeout(timeout, TcpStream::connect(socket)).await?
    }
}

#[async_trait]
impl Prober for TcpProber {
    /// Connects once, then shuts the stream down without sending anything.
    async fn probe(&self, socket: SocketAddr, timeout: Duration) -> bool {
        match Self::connect(socket, timeout).await {
            Ok(tcp_stream) => {
                debug!("Connection was successful, shutting down stream {socket}");
                if let Err(e) = { tcp_stream }.shutdown().await {
                    debug!("Shutdown stream error {e}");
                }
                true
            }
            Err(e) => {
                if e.to_string().to_lowercase().contains("too many open files") {
                    warn!("Too many open files while probing {socket}. Lower the batch sizes or raise --ulimit.");
                } else {
                    debug!("{socket} closed: {e}");
                }
                false
            }
        }
    }
}
