//! [`TransportDevice`] -- a [`Device`] speaking Protocol 2000 over a
//! byte [`Transport`].
//!
//! One `process()` call is one exchange: the whole batch is written in a
//! single send, then exactly one 4-byte frame per instruction is read back
//! and decoded in order. There is no background reader and no retry; a
//! silent device surfaces as [`Error::Timeout`](p2k_core::Error::Timeout).
//!
//! Frames carry no request id, so leftovers from an earlier exchange would
//! be read as answers to the next one. Anything already waiting on the link
//! is discarded before each send. After a failed exchange the device is
//! marked out of step, and the next exchange first waits up to one
//! `command_timeout` for stragglers to arrive and be dropped.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, trace, warn};

use p2k_core::device::Device;
use p2k_core::error::Result;
use p2k_core::instruction::{Instruction, FRAME_LEN};
use p2k_core::transport::Transport;

use crate::codec;

/// Default time to wait for each read of a response batch.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(1);

/// Protocol 2000 device on top of a byte transport.
pub struct TransportDevice {
    transport: Box<dyn Transport>,
    command_timeout: Duration,
    out_of_step: bool,
}

impl TransportDevice {
    pub fn new(transport: Box<dyn Transport>) -> Self {
        Self::with_timeout(transport, DEFAULT_COMMAND_TIMEOUT)
    }

    pub fn with_timeout(transport: Box<dyn Transport>, command_timeout: Duration) -> Self {
        TransportDevice {
            transport,
            command_timeout,
            out_of_step: false,
        }
    }

    /// Time allowed for each read while collecting a response batch.
    pub fn command_timeout(&self) -> Duration {
        self.command_timeout
    }

    /// Whether the underlying transport is still connected.
    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    /// Drop bytes that no outstanding request is waiting for.
    async fn resync(&mut self) -> Result<()> {
        let settle = if self.out_of_step {
            self.command_timeout
        } else {
            Duration::ZERO
        };
        let discarded = self.transport.discard_pending(settle).await?;
        if discarded > 0 {
            warn!(
                discarded,
                after_failure = self.out_of_step,
                "discarding stale bytes before sending"
            );
        }
        self.out_of_step = false;
        Ok(())
    }

    async fn exchange(&mut self, instructions: &[Instruction]) -> Result<Vec<Instruction>> {
        let request = codec::encode_batch(instructions);
        trace!(frames = instructions.len(), data = ?request, "sending instruction batch");
        self.transport.send(&request).await?;

        let mut response = vec![0u8; instructions.len() * FRAME_LEN];
        self.transport
            .receive_exact(&mut response, self.command_timeout)
            .await?;
        trace!(data = ?response, "received response batch");
        codec::decode_batch(&response)
    }
}

#[async_trait]
impl Device for TransportDevice {
    async fn process(&mut self, instructions: &[Instruction]) -> Result<Vec<Instruction>> {
        if instructions.is_empty() {
            return Ok(Vec::new());
        }

        self.resync().await?;
        let result = self.exchange(instructions).await;
        if let Err(e) = &result {
            debug!(error = %e, frames = instructions.len(), "exchange failed, link out of step");
            self.out_of_step = true;
        }
        result
    }

    async fn close(&mut self) -> Result<()> {
        self.transport.close().await
    }
}
