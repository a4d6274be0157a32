//! Raw TCP link to a network-attached Protocol 2000 device.
//!
//! Switchers and matrices expose Protocol 2000 on a plain TCP socket, port
//! [`DEFAULT_PORT`] unless reconfigured on the device. Every request and
//! answer is a run of 4-byte frames with no length prefix and no request id,
//! so [`TcpTransport`] reads whole frames with
//! [`receive_exact`](Transport::receive_exact) and can throw away answers
//! that turned up after their exchange gave up with
//! [`discard_pending`](Transport::discard_pending).
//!
//! A link that the device closes or resets is dropped on the spot;
//! [`is_connected`](Transport::is_connected) reports `false` from then on.
//!
//! # Example
//!
//! ```no_run
//! use p2k_core::transport::Transport;
//! use p2k_transport::{endpoint, TcpTransport, DEFAULT_CONNECT_TIMEOUT};
//! use std::time::Duration;
//!
//! # async fn example() -> p2k_core::Result<()> {
//! let mut link =
//!     TcpTransport::connect(&endpoint("192.168.1.39", None), DEFAULT_CONNECT_TIMEOUT).await?;
//!
//! // QUERY_PANEL_LOCK to every machine, then one answer frame back.
//! link.send(&[0x1f, 0x80, 0x80, 0xc1]).await?;
//! let mut frame = [0u8; 4];
//! link.receive_exact(&mut frame, Duration::from_secs(1)).await?;
//! # Ok(())
//! # }
//! ```

use std::io::ErrorKind;
use std::time::Duration;

use async_trait::async_trait;
use p2k_core::error::{Error, Result};
use p2k_core::transport::Transport;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, info, trace, warn};

/// TCP port Protocol 2000 devices listen on by default.
pub const DEFAULT_PORT: u16 = 5000;

/// How long [`TcpTransport::connect`] callers usually wait for the device.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Format a `host:port` address, falling back to [`DEFAULT_PORT`].
pub fn endpoint(host: &str, port: Option<u16>) -> String {
    format!("{}:{}", host, port.unwrap_or(DEFAULT_PORT))
}

/// TCP connection to one Protocol 2000 device.
#[derive(Debug)]
pub struct TcpTransport {
    link: Option<TcpStream>,
    peer: String,
}

impl TcpTransport {
    /// Open a connection to `addr` (`host:port`), giving up after
    /// `connect_timeout`.
    pub async fn connect(addr: &str, connect_timeout: Duration) -> Result<Self> {
        debug!(peer = %addr, timeout_ms = connect_timeout.as_millis(), "connecting to device");

        let stream = match timeout(connect_timeout, TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                warn!(peer = %addr, error = %e, "device refused connection");
                return Err(io_failure(e, addr));
            }
            Err(_) => {
                warn!(peer = %addr, "device did not accept connection in time");
                return Err(Error::Timeout);
            }
        };

        // A frame is 4 bytes; Nagle would hold every request back.
        if let Err(e) = stream.set_nodelay(true) {
            warn!(peer = %addr, error = %e, "could not disable Nagle, continuing");
        }

        info!(peer = %addr, "connected to device");
        Ok(Self {
            link: Some(stream),
            peer: addr.to_string(),
        })
    }

    /// Map an I/O failure and forget the socket if the device is gone.
    fn fail(&mut self, e: std::io::Error) -> Error {
        let err = io_failure(e, &self.peer);
        if matches!(err, Error::ConnectionLost) && self.link.take().is_some() {
            warn!(peer = %self.peer, "device dropped the connection");
        }
        err
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        let link = self.link.as_mut().ok_or(Error::NotConnected)?;
        trace!(peer = %self.peer, frames = data.len() / 4, data = ?data, "writing frames");

        let written = match link.write_all(data).await {
            Ok(()) => link.flush().await,
            Err(e) => Err(e),
        };
        written.map_err(|e| self.fail(e))
    }

    async fn receive(&mut self, buf: &mut [u8], wait: Duration) -> Result<usize> {
        let link = self.link.as_mut().ok_or(Error::NotConnected)?;
        match timeout(wait, link.read(buf)).await {
            Ok(Ok(0)) => Err(self.fail(ErrorKind::UnexpectedEof.into())),
            Ok(Ok(n)) => {
                trace!(peer = %self.peer, data = ?&buf[..n], "read bytes");
                Ok(n)
            }
            Ok(Err(e)) => Err(self.fail(e)),
            Err(_) => Err(Error::Timeout),
        }
    }

    async fn receive_exact(&mut self, buf: &mut [u8], wait: Duration) -> Result<()> {
        let link = self.link.as_mut().ok_or(Error::NotConnected)?;
        match timeout(wait, link.read_exact(buf)).await {
            Ok(Ok(_)) => {
                trace!(peer = %self.peer, frames = buf.len() / 4, data = ?buf, "read frames");
                Ok(())
            }
            Ok(Err(e)) => Err(self.fail(e)),
            Err(_) => {
                debug!(
                    peer = %self.peer,
                    expected = buf.len(),
                    timeout_ms = wait.as_millis(),
                    "device answered short"
                );
                Err(Error::Timeout)
            }
        }
    }

    async fn discard_pending(&mut self, settle: Duration) -> Result<usize> {
        let mut scratch = [0u8; 64];
        let mut discarded = 0;
        loop {
            let link = self.link.as_mut().ok_or(Error::NotConnected)?;
            match timeout(settle, link.read(&mut scratch)).await {
                Err(_) => break,
                Ok(Ok(0)) => return Err(self.fail(ErrorKind::UnexpectedEof.into())),
                Ok(Ok(n)) => {
                    trace!(peer = %self.peer, data = ?&scratch[..n], "dropping stale bytes");
                    discarded += n;
                }
                Ok(Err(e)) => return Err(self.fail(e)),
            }
        }
        Ok(discarded)
    }

    async fn close(&mut self) -> Result<()> {
        let Some(mut link) = self.link.take() else {
            return Ok(());
        };
        if let Err(e) = link.shutdown().await {
            debug!(peer = %self.peer, error = %e, "shutdown failed, dropping socket anyway");
        }
        info!(peer = %self.peer, "disconnected from device");
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.link.is_some()
    }
}

/// Translate a socket error into the crate error.
///
/// Anything that means the device is no longer on the other end becomes
/// [`Error::ConnectionLost`].
fn io_failure(e: std::io::Error, peer: &str) -> Error {
    match e.kind() {
        ErrorKind::ConnectionRefused => Error::Transport(format!("connection refused: {peer}")),
        ErrorKind::UnexpectedEof
        | ErrorKind::ConnectionReset
        | ErrorKind::ConnectionAborted
        | ErrorKind::BrokenPipe
        | ErrorKind::NotConnected => Error::ConnectionLost,
        _ => Error::Io(e),
    }
}
