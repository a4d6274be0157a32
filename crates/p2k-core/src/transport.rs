//! Transport trait for device communication.
//!
//! The [`Transport`] trait abstracts over the physical link to a switch or
//! matrix. The TCP implementation lives in `p2k-transport`; a scripted mock
//! lives in `p2k-test-harness`.
//!
//! Protocol 2000 answers carry no request id, so a byte that arrives late
//! for one exchange is indistinguishable from the answer to the next. The
//! trait therefore offers two operations beyond plain send/receive:
//! [`receive_exact`](Transport::receive_exact) to collect a whole response
//! batch, and [`discard_pending`](Transport::discard_pending) to throw away
//! anything left over before a new request goes out.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::{Error, Result};

/// Asynchronous byte-level transport to a device.
///
/// Implementations handle buffering and error mapping at the physical
/// layer. Framing and command semantics belong to the protocol layer.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send raw bytes to the device.
    ///
    /// Implementations should not return until all bytes have been handed
    /// to the underlying link.
    async fn send(&mut self, data: &[u8]) -> Result<()>;

    /// Receive bytes from the device into the provided buffer.
    ///
    /// Returns the number of bytes actually read. Will wait up to `timeout`
    /// for data to arrive; returns [`Error::Timeout`] if nothing is
    /// received within the deadline.
    async fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize>;

    /// Fill `buf` completely.
    ///
    /// Fails with [`Error::Timeout`] when the device goes quiet before the
    /// buffer is full. Bytes read so far are lost to the caller, so a
    /// timed-out exchange must be followed by
    /// [`discard_pending`](Transport::discard_pending).
    async fn receive_exact(&mut self, buf: &mut [u8], timeout: Duration) -> Result<()> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.receive(&mut buf[filled..], timeout).await? {
                0 => return Err(Error::ConnectionLost),
                n => filled += n,
            }
        }
        Ok(())
    }

    /// Drop every byte that arrives until the link has been quiet for
    /// `settle`, and return how many were dropped.
    ///
    /// With a zero `settle` only bytes that are already buffered are
    /// dropped.
    async fn discard_pending(&mut self, settle: Duration) -> Result<usize> {
        let mut scratch = [0u8; 64];
        let mut discarded = 0;
        loop {
            match self.receive(&mut scratch, settle).await {
                Ok(0) | Err(Error::Timeout) => return Ok(discarded),
                Ok(n) => discarded += n,
                Err(e) => return Err(e),
            }
        }
    }

    /// Close the transport connection.
    ///
    /// After calling `close()`, subsequent `send()` and `receive()` calls
    /// should return [`Error::NotConnected`].
    async fn close(&mut self) -> Result<()>;

    /// Check whether the transport is currently connected.
    fn is_connected(&self) -> bool;
}
