//! Mock TCP server for end-to-end tests over a real socket.
//!
//! [`MockTcpServer`] listens on a random localhost port and plays back
//! scripted byte exchanges, so a `TcpTransport`-backed switch can be tested
//! without a device on the network.
//!
//! # Example
//!
//! ```
//! use p2k_test_harness::MockTcpServer;
//!
//! # async fn example() -> p2k_core::Result<()> {
//! let mut server = MockTcpServer::new().await?;
//! // QUERY_PANEL_LOCK -> locked
//! server.expect(&[0x1f, 0x80, 0x80, 0xc1], &[0x5f, 0x80, 0x81, 0xc1]);
//! server.start();
//! let addr = server.addr().to_string();
//! // ... connect a TcpTransport to `addr` and drive it ...
//! server.wait().await.map_err(p2k_core::Error::Protocol)?;
//! # Ok(())
//! # }
//! ```

use p2k_core::error::{Error, Result};
use std::collections::VecDeque;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

#[derive(Debug, Clone)]
struct TcpExpectation {
    request: Vec<u8>,
    response: Vec<u8>,
}

/// A mock TCP server that accepts one client and replays expectations.
///
/// For each expectation the server reads exactly `request.len()` bytes,
/// compares them, and writes the response. The first mismatch ends the
/// session and is reported by [`wait`](MockTcpServer::wait).
pub struct MockTcpServer {
    addr: String,
    listener: Option<TcpListener>,
    expectations: VecDeque<TcpExpectation>,
    server_handle: Option<JoinHandle<std::result::Result<(), String>>>,
}

impl MockTcpServer {
    /// Bind a new server on a random localhost port.
    pub async fn new() -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| Error::Transport(format!("failed to bind mock TCP server: {}", e)))?;
        let addr = listener.local_addr().map_err(Error::Io)?.to_string();
        Ok(Self {
            addr,
            listener: Some(listener),
            expectations: VecDeque::new(),
            server_handle: None,
        })
    }

    /// Add an expected request/response pair.
    pub fn expect(&mut self, request: &[u8], response: &[u8]) {
        self.expectations.push_back(TcpExpectation {
            request: request.to_vec(),
            response: response.to_vec(),
        });
    }

    /// The `host:port` address the server listens on.
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Start serving in a background task.
    ///
    /// The listener is already bound, so a client may connect as soon as
    /// this returns. Calling `start` twice has no effect.
    pub fn start(&mut self) {
        let Some(listener) = self.listener.take() else {
            return;
        };
        let expectations: Vec<TcpExpectation> = self.expectations.drain(..).collect();

        let handle = tokio::spawn(async move {
            let (mut stream, _) = listener
                .accept()
                .await
                .map_err(|e| format!("failed to accept connection: {}", e))?;

            for (i, expectation) in expectations.iter().enumerate() {
                let mut buf = vec![0u8; expectation.request.len()];
                stream
                    .read_exact(&mut buf)
                    .await
                    .map_err(|e| format!("expectation {}: read error: {}", i, e))?;

                if buf != expectation.request {
                    return Err(format!(
                        "expectation {}: request mismatch: expected {:02X?}, got {:02X?}",
                        i, expectation.request, buf
                    ));
                }

                stream
                    .write_all(&expectation.response)
                    .await
                    .map_err(|e| format!("expectation {}: write error: {}", i, e))?;
                stream
                    .flush()
                    .await
                    .map_err(|e| format!("expectation {}: flush error: {}", i, e))?;
            }
            Ok(())
        });

        self.server_handle = Some(handle);
    }

    /// Wait for the server task and report any expectation failure.
    pub async fn wait(self) -> std::result::Result<(), String> {
        match self.server_handle {
            Some(handle) => handle
                .await
                .map_err(|e| format!("server task panicked: {}", e))?,
            None => Ok(()),
        }
    }
}
