//! Mock transport for deterministic testing of the frame layer.
//!
//! [`MockTransport`] implements the [`Transport`] trait with pre-loaded
//! request/response byte pairs. This lets you test frame encoding and
//! response decoding without a switcher on the bench.
//!
//! # Example
//!
//! ```
//! use p2k_test_harness::MockTransport;
//!
//! let mut mock = MockTransport::new();
//! // QUERY_PANEL_LOCK -> panel unlocked
//! mock.expect(&[0x1f, 0x80, 0x80, 0xc1], &[0x5f, 0x80, 0x80, 0xc1]);
//! ```

use async_trait::async_trait;
use std::collections::VecDeque;
use std::time::Duration;

use p2k_core::error::{Error, Result};
use p2k_core::transport::Transport;

/// A pre-loaded request/response pair.
#[derive(Debug, Clone)]
struct Expectation {
    request: Vec<u8>,
    response: Vec<u8>,
    late: Vec<u8>,
}

/// A mock [`Transport`] for testing without hardware.
///
/// Expectations are consumed in order. Each `send()` is matched against
/// the next expectation and its response is queued for `receive()`. The
/// response may be handed out over several `receive()` calls, either
/// because the caller's buffer is small or because
/// [`set_chunk_size`](MockTransport::set_chunk_size) splits it, which
/// mimics a device trickling bytes onto a socket.
///
/// Bytes registered with [`expect_late`](MockTransport::expect_late) stay
/// out of reach until a `receive()` has timed out, which is how a slow
/// device looks from the client side.
#[derive(Debug)]
pub struct MockTransport {
    expectations: VecDeque<Expectation>,
    pending: VecDeque<u8>,
    late: VecDeque<u8>,
    chunk_size: Option<usize>,
    connected: bool,
    sent_log: Vec<Vec<u8>>,
}

impl MockTransport {
    /// Create a new mock transport in the connected state.
    pub fn new() -> Self {
        MockTransport {
            expectations: VecDeque::new(),
            pending: VecDeque::new(),
            late: VecDeque::new(),
            chunk_size: None,
            connected: true,
            sent_log: Vec::new(),
        }
    }

    /// Add an expected request/response pair.
    pub fn expect(&mut self, request: &[u8], response: &[u8]) {
        self.expect_late(request, response, &[]);
    }

    /// Add a request whose answer is split: `response` is available at
    /// once, `late` only after the next `receive()` times out.
    pub fn expect_late(&mut self, request: &[u8], response: &[u8], late: &[u8]) {
        self.expectations.push_back(Expectation {
            request: request.to_vec(),
            response: response.to_vec(),
            late: late.to_vec(),
        });
    }

    /// Limit how many bytes a single `receive()` returns.
    pub fn set_chunk_size(&mut self, size: usize) {
        self.chunk_size = Some(size.max(1));
    }

    /// All data sent through this transport, one element per `send()` call.
    pub fn sent_data(&self) -> &[Vec<u8>] {
        &self.sent_log
    }

    /// Number of expectations not yet consumed.
    pub fn remaining_expectations(&self) -> usize {
        self.expectations.len()
    }

    /// Set the connected state. When `false`, `send()` and `receive()`
    /// return [`Error::NotConnected`].
    pub fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        if !self.connected {
            return Err(Error::NotConnected);
        }
        self.sent_log.push(data.to_vec());

        let expectation = self.expectations.pop_front().ok_or_else(|| {
            Error::Protocol("no more expectations in mock transport".into())
        })?;
        if data != expectation.request.as_slice() {
            return Err(Error::Protocol(format!(
                "unexpected send data: expected {:02X?}, got {:02X?}",
                expectation.request, data
            )));
        }
        self.pending.extend(expectation.response);
        self.late.extend(expectation.late);
        Ok(())
    }

    async fn receive(&mut self, buf: &mut [u8], _timeout: Duration) -> Result<usize> {
        if !self.connected {
            return Err(Error::NotConnected);
        }
        if self.pending.is_empty() {
            // Whatever was late shows up once the caller has given up.
            self.pending.extend(self.late.drain(..));
            return Err(Error::Timeout);
        }
        let limit = self.chunk_size.unwrap_or(usize::MAX);
        let n = self.pending.len().min(buf.len()).min(limit);
        for (slot, byte) in buf.iter_mut().zip(self.pending.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    async fn close(&mut self) -> Result<()> {
        self.connected = false;
        self.pending.clear();
        self.late.clear();
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUERY: [u8; 4] = [0x1f, 0x80, 0x80, 0xc1];
    const REPLY: [u8; 4] = [0x5f, 0x80, 0x81, 0xc1];

    #[tokio::test]
    async fn send_then_receive() {
        let mut mock = MockTransport::new();
        mock.expect(&QUERY, &REPLY);

        mock.send(&QUERY).await.unwrap();
        let mut buf = [0u8; 16];
        let n = mock
            .receive(&mut buf, Duration::from_millis(100))
            .await
            .unwrap();
        assert_eq!(&buf[..n], &REPLY);
        assert_eq!(mock.sent_data(), &[QUERY.to_vec()]);
        assert_eq!(mock.remaining_expectations(), 0);
    }

    #[tokio::test]
    async fn mismatched_request_is_protocol_error() {
        let mut mock = MockTransport::new();
        mock.expect(&QUERY, &REPLY);
        let result = mock.send(&[0x01, 0x81, 0x81, 0xc1]).await;
        assert!(matches!(result, Err(Error::Protocol(_))));
    }

    #[tokio::test]
    async fn exhausted_expectations_is_protocol_error() {
        let mut mock = MockTransport::new();
        assert!(matches!(mock.send(&QUERY).await, Err(Error::Protocol(_))));
    }

    #[tokio::test]
    async fn receive_without_pending_times_out() {
        let mut mock = MockTransport::new();
        let mut buf = [0u8; 4];
        let result = mock.receive(&mut buf, Duration::from_millis(10)).await;
        assert!(matches!(result, Err(Error::Timeout)));
    }

    #[tokio::test]
    async fn chunked_receive() {
        let mut mock = MockTransport::new();
        mock.set_chunk_size(3);
        mock.expect(&QUERY, &REPLY);
        mock.send(&QUERY).await.unwrap();

        let mut buf = [0u8; 16];
        let n = mock.receive(&mut buf, Duration::ZERO).await.unwrap();
        assert_eq!(&buf[..n], &REPLY[..3]);
        let n = mock.receive(&mut buf, Duration::ZERO).await.unwrap();
        assert_eq!(&buf[..n], &REPLY[3..]);
    }

    #[tokio::test]
    async fn late_bytes_arrive_after_timeout() {
        let mut mock = MockTransport::new();
        mock.expect_late(&QUERY, &[], &REPLY);
        mock.send(&QUERY).await.unwrap();

        let mut buf = [0u8; 16];
        assert!(matches!(
            mock.receive(&mut buf, Duration::ZERO).await,
            Err(Error::Timeout)
        ));
        let n = mock.receive(&mut buf, Duration::ZERO).await.unwrap();
        assert_eq!(&buf[..n], &REPLY);
    }

    #[tokio::test]
    async fn receive_exact_collects_chunks() {
        let mut mock = MockTransport::new();
        mock.set_chunk_size(1);
        mock.expect(&QUERY, &REPLY);
        mock.send(&QUERY).await.unwrap();

        let mut buf = [0u8; 4];
        mock.receive_exact(&mut buf, Duration::ZERO).await.unwrap();
        assert_eq!(buf, REPLY);
    }

    #[tokio::test]
    async fn discard_pending_drops_leftovers() {
        let mut mock = MockTransport::new();
        mock.expect(&QUERY, &[0x5f, 0x80, 0x81, 0xc1, 0x5f, 0x80]);
        mock.send(&QUERY).await.unwrap();

        let mut buf = [0u8; 4];
        mock.receive_exact(&mut buf, Duration::ZERO).await.unwrap();
        assert_eq!(mock.discard_pending(Duration::ZERO).await.unwrap(), 2);
        assert_eq!(mock.discard_pending(Duration::ZERO).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn disconnected_mock_refuses_io() {
        let mut mock = MockTransport::new();
        mock.close().await.unwrap();
        assert!(!mock.is_connected());
        assert!(matches!(mock.send(&QUERY).await, Err(Error::NotConnected)));

        mock.set_connected(true);
        assert!(mock.is_connected());
    }
}
