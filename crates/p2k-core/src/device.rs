//! The [`Device`] trait -- instruction-level exchange with a switch.
//!
//! A device accepts an ordered batch of [`Instruction`]s and returns the
//! device's responses in the same order. Protocol 2000 frames carry no
//! request identifier, so this ordering is the only thing tying a response
//! to its request. Implementations must never reorder, merge, or drop
//! responses within a batch.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::Result;
use crate::instruction::Instruction;

/// Instruction-level link to a Protocol 2000 device.
///
/// Devices are not reentrant: a second `process` call must not start
/// before the first has returned. [`SharedDevice`] enforces this when
/// several engines address the same physical link.
#[async_trait]
pub trait Device: Send {
    /// Send `instructions` in order and return one response per instruction,
    /// in the same order.
    ///
    /// Transport failures surface as transport-level [`Error`](crate::Error)
    /// variants; nothing is retried.
    async fn process(&mut self, instructions: &[Instruction]) -> Result<Vec<Instruction>>;

    /// Send a single instruction and return its response.
    async fn process_one(&mut self, instruction: Instruction) -> Result<Instruction> {
        let mut responses = self.process(std::slice::from_ref(&instruction)).await?;
        match responses.len() {
            1 => Ok(responses.remove(0)),
            n => Err(crate::Error::Protocol(format!(
                "expected 1 response to {}, got {n}",
                instruction.name()
            ))),
        }
    }

    /// Release the underlying link.
    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// A device shared between engines.
///
/// Each engine holds the lock for the whole of one operation, so calls from
/// engines sharing one link are serialized.
pub type SharedDevice = Arc<Mutex<Box<dyn Device>>>;

/// Wrap a device for sharing between engines.
pub fn shared(device: impl Device + 'static) -> SharedDevice {
    Arc::new(Mutex::new(Box::new(device)))
}
